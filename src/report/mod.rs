pub mod chart;
pub mod pdf;
pub mod summary;

use crate::error::AppError;
use crate::telemetry::metrics::REPORT_GENERATION_DURATION;

const HISTOGRAM_BINS: usize = 10;

/// CSV bytes in, single-page PDF out. Any parse or render failure becomes
/// `AppError::Report`, whose message is surfaced to the caller.
#[tracing::instrument(name = "report generate", skip(csv_bytes), fields(report.rows))]
pub fn generate(csv_bytes: &[u8]) -> Result<Vec<u8>, AppError> {
    let start = std::time::Instant::now();

    let summary = summary::summarize(csv_bytes).map_err(|e| AppError::Report(e.to_string()))?;

    let hist = summary
        .first_numeric_column()
        .map(|(name, values)| chart::histogram(name, values, HISTOGRAM_BINS));

    let bytes = pdf::render(&summary, hist.as_ref()).map_err(|e| AppError::Report(e.to_string()))?;

    REPORT_GENERATION_DURATION.record(start.elapsed().as_secs_f64(), &[]);
    tracing::Span::current().record("report.rows", summary.row_count);

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_end_to_end() {
        let csv = b"suburb,price\nPaddington,1250000\nNew Farm,1600000\nTeneriffe,1400000\n";
        let pdf = generate(csv).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn test_generate_surfaces_parse_errors() {
        let err = generate(b"").unwrap_err();
        match err {
            AppError::Report(msg) => assert!(msg.contains("no columns")),
            other => panic!("expected Report error, got {other:?}"),
        }
    }
}

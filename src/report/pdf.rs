use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Polygon,
    Rgb,
};

use super::chart::Histogram;
use super::summary::TableSummary;

// US letter, matching the original report layout. All geometry is f32
// because `Mm` wraps an f32.
const PAGE_WIDTH_MM: f32 = 215.9;
const PAGE_HEIGHT_MM: f32 = 279.4;
const MARGIN_MM: f32 = 20.0;

const CHART_LEFT: f32 = 30.0;
const CHART_BOTTOM: f32 = 60.0;
const CHART_WIDTH: f32 = 155.0;
const CHART_HEIGHT: f32 = 100.0;

/// Renders the single-page report: title, summary paragraph, histogram. The
/// histogram is drawn as vector rectangles so no fonts or images need to be
/// bundled.
pub fn render(summary: &TableSummary, hist: Option<&Histogram>) -> anyhow::Result<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new(
        "Data Analysis Report",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "report",
    );
    let font = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    let font_bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
    let layer = doc.get_page(page).get_layer(layer);

    layer.use_text(
        "Data Analysis Report",
        22.0,
        Mm(MARGIN_MM),
        Mm(PAGE_HEIGHT_MM - 30.0),
        &font_bold,
    );

    let mut y = PAGE_HEIGHT_MM - 45.0;
    layer.use_text("Data Summary", 13.0, Mm(MARGIN_MM), Mm(y), &font_bold);
    y -= 8.0;

    layer.use_text(
        format!("Total rows: {}", summary.row_count),
        10.0,
        Mm(MARGIN_MM),
        Mm(y),
        &font,
    );
    y -= 6.0;

    layer.use_text(
        format!("Columns: {}", summary.column_names().join(", ")),
        10.0,
        Mm(MARGIN_MM),
        Mm(y),
        &font,
    );
    y -= 6.0;

    for column in &summary.columns {
        layer.use_text(
            format!("  {}: {} missing value(s)", column.name, column.missing),
            10.0,
            Mm(MARGIN_MM),
            Mm(y),
            &font,
        );
        y -= 6.0;
    }

    if let Some(hist) = hist {
        layer.use_text(
            format!("Distribution of {}", hist.column),
            13.0,
            Mm(CHART_LEFT),
            Mm(CHART_BOTTOM + CHART_HEIGHT + 10.0),
            &font_bold,
        );
        draw_histogram(&layer, &font, hist);
    }

    let bytes = doc.save_to_bytes()?;
    Ok(bytes)
}

fn draw_histogram(layer: &PdfLayerReference, font: &IndirectFontRef, hist: &Histogram) {
    let max_count = hist.max_count();

    layer.set_outline_color(Color::Rgb(Rgb::new(0.2, 0.2, 0.2, None)));
    layer.set_outline_thickness(0.6);

    // Axes.
    layer.add_line(axis_line(
        (CHART_LEFT, CHART_BOTTOM),
        (CHART_LEFT + CHART_WIDTH, CHART_BOTTOM),
    ));
    layer.add_line(axis_line(
        (CHART_LEFT, CHART_BOTTOM),
        (CHART_LEFT, CHART_BOTTOM + CHART_HEIGHT),
    ));

    if max_count == 0 {
        layer.use_text(
            "(no data)",
            10.0,
            Mm(CHART_LEFT + CHART_WIDTH / 2.0 - 8.0),
            Mm(CHART_BOTTOM + CHART_HEIGHT / 2.0),
            font,
        );
        return;
    }

    let bins = hist.counts.len();
    let slot = CHART_WIDTH / bins as f32;
    let bar_width = slot * 0.82;

    layer.set_fill_color(Color::Rgb(Rgb::new(0.27, 0.45, 0.77, None)));

    for (i, &count) in hist.counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        let height = CHART_HEIGHT * (count as f32 / max_count as f32);
        let x = CHART_LEFT + slot * i as f32 + (slot - bar_width) / 2.0;
        layer.add_polygon(bar(x, CHART_BOTTOM, bar_width, height));
    }

    // Axis labels: range endpoints and the peak count.
    layer.use_text(
        trim_number(hist.min),
        8.0,
        Mm(CHART_LEFT),
        Mm(CHART_BOTTOM - 5.0),
        font,
    );
    layer.use_text(
        trim_number(hist.max),
        8.0,
        Mm(CHART_LEFT + CHART_WIDTH - 12.0),
        Mm(CHART_BOTTOM - 5.0),
        font,
    );
    layer.use_text(
        format!("{max_count}"),
        8.0,
        Mm(CHART_LEFT - 8.0),
        Mm(CHART_BOTTOM + CHART_HEIGHT - 2.0),
        font,
    );
    layer.use_text(
        "Frequency",
        8.0,
        Mm(CHART_LEFT - 8.0),
        Mm(CHART_BOTTOM + CHART_HEIGHT + 4.0),
        font,
    );
}

fn axis_line(from: (f32, f32), to: (f32, f32)) -> Line {
    Line {
        points: vec![
            (Point::new(Mm(from.0), Mm(from.1)), false),
            (Point::new(Mm(to.0), Mm(to.1)), false),
        ],
        is_closed: false,
    }
}

fn bar(x: f32, y: f32, width: f32, height: f32) -> Polygon {
    Polygon {
        rings: vec![vec![
            (Point::new(Mm(x), Mm(y)), false),
            (Point::new(Mm(x + width), Mm(y)), false),
            (Point::new(Mm(x + width), Mm(y + height)), false),
            (Point::new(Mm(x), Mm(y + height)), false),
        ]],
        mode: PaintMode::Fill,
        winding_order: WindingOrder::NonZero,
    }
}

fn trim_number(value: f64) -> String {
    if value.fract().abs() < 1e-9 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::chart::histogram;
    use crate::report::summary::summarize;

    #[test]
    fn test_render_produces_pdf_bytes() {
        let summary = summarize(b"suburb,price\nPaddington,1250000\nNew Farm,1600000\n").unwrap();
        let hist = summary
            .first_numeric_column()
            .map(|(name, values)| histogram(name, values, 10));

        let bytes = render(&summary, hist.as_ref()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }

    #[test]
    fn test_render_without_numeric_column() {
        let summary = summarize(b"a,b\nx,y\n").unwrap();
        let bytes = render(&summary, None).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_trim_number() {
        assert_eq!(trim_number(100.0), "100");
        assert_eq!(trim_number(1.25), "1.25");
    }
}

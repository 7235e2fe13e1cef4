use anyhow::Context;

/// Per-column view of an uploaded table. `numeric` is populated when every
/// non-empty cell parses as a float and at least one cell is non-empty.
#[derive(Debug, Clone)]
pub struct ColumnSummary {
    pub name: String,
    pub missing: usize,
    pub numeric: Option<Vec<f64>>,
}

#[derive(Debug, Clone)]
pub struct TableSummary {
    pub row_count: usize,
    pub columns: Vec<ColumnSummary>,
}

impl TableSummary {
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// The histogram target: the first column whose cells are all numeric.
    pub fn first_numeric_column(&self) -> Option<(&str, &[f64])> {
        self.columns
            .iter()
            .find_map(|c| c.numeric.as_deref().map(|values| (c.name.as_str(), values)))
    }
}

pub fn summarize(bytes: &[u8]) -> anyhow::Result<TableSummary> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);

    let headers = reader.headers().context("failed to read CSV headers")?.clone();
    if headers.is_empty() {
        anyhow::bail!("CSV has no columns");
    }

    let mut row_count = 0usize;
    let mut missing = vec![0usize; headers.len()];
    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];

    for record in reader.records() {
        let record = record.context("failed to parse CSV record")?;
        row_count += 1;

        for (i, _) in headers.iter().enumerate() {
            let value = record.get(i).unwrap_or("").trim();
            if value.is_empty() {
                missing[i] += 1;
            } else {
                cells[i].push(value.to_string());
            }
        }
    }

    let columns = headers
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let numeric = parse_numeric(&cells[i]);
            ColumnSummary {
                name: name.to_string(),
                missing: missing[i],
                numeric,
            }
        })
        .collect();

    Ok(TableSummary { row_count, columns })
}

fn parse_numeric(values: &[String]) -> Option<Vec<f64>> {
    if values.is_empty() {
        return None;
    }
    values
        .iter()
        .map(|v| v.replace(',', "").parse::<f64>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "suburb,price,bedrooms\n\
                          Paddington,1250000,3\n\
                          New Farm,1600000,4\n\
                          Teneriffe,,3\n";

    #[test]
    fn test_summarize_counts_rows_and_columns() {
        let summary = summarize(SAMPLE.as_bytes()).unwrap();
        assert_eq!(summary.row_count, 3);
        assert_eq!(summary.column_names(), vec!["suburb", "price", "bedrooms"]);
    }

    #[test]
    fn test_summarize_counts_missing_values() {
        let summary = summarize(SAMPLE.as_bytes()).unwrap();
        assert_eq!(summary.columns[0].missing, 0);
        assert_eq!(summary.columns[1].missing, 1);
        assert_eq!(summary.columns[2].missing, 0);
    }

    #[test]
    fn test_first_numeric_column_skips_text() {
        let summary = summarize(SAMPLE.as_bytes()).unwrap();
        let (name, values) = summary.first_numeric_column().unwrap();
        assert_eq!(name, "price");
        assert_eq!(values, &[1250000.0, 1600000.0]);
    }

    #[test]
    fn test_mixed_column_is_not_numeric() {
        let data = "a,b\n1,x\n2,3\n";
        let summary = summarize(data.as_bytes()).unwrap();
        assert!(summary.columns[0].numeric.is_some());
        assert!(summary.columns[1].numeric.is_none());
    }

    #[test]
    fn test_numeric_with_thousands_separators() {
        let data = "price\n\"1,250,000\"\n\"900,000\"\n";
        let summary = summarize(data.as_bytes()).unwrap();
        let (_, values) = summary.first_numeric_column().unwrap();
        assert_eq!(values, &[1250000.0, 900000.0]);
    }

    #[test]
    fn test_no_numeric_column() {
        let data = "a,b\nx,y\n";
        let summary = summarize(data.as_bytes()).unwrap();
        assert!(summary.first_numeric_column().is_none());
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(summarize(b"").is_err());
    }

    #[test]
    fn test_headers_only_is_zero_rows() {
        let summary = summarize(b"a,b,c\n").unwrap();
        assert_eq!(summary.row_count, 0);
        assert!(summary.first_numeric_column().is_none());
    }
}

/// Fixed-width histogram of one numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub column: String,
    pub min: f64,
    pub max: f64,
    pub bin_width: f64,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    pub fn bin_start(&self, index: usize) -> f64 {
        self.min + self.bin_width * index as f64
    }
}

pub fn histogram(column: &str, values: &[f64], bins: usize) -> Histogram {
    let bins = bins.max(1);

    if values.is_empty() {
        return Histogram {
            column: column.to_string(),
            min: 0.0,
            max: 0.0,
            bin_width: 0.0,
            counts: vec![0; bins],
        };
    }

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    // A constant column collapses into a single occupied bin.
    if (max - min).abs() < f64::EPSILON {
        let mut counts = vec![0; bins];
        counts[0] = values.len();
        return Histogram {
            column: column.to_string(),
            min,
            max,
            bin_width: 1.0,
            counts,
        };
    }

    let bin_width = (max - min) / bins as f64;
    let mut counts = vec![0; bins];

    for &value in values {
        let index = ((value - min) / bin_width) as usize;
        counts[index.min(bins - 1)] += 1;
    }

    Histogram {
        column: column.to_string(),
        min,
        max,
        bin_width,
        counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_counts_all_values() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let hist = histogram("price", &values, 10);
        assert_eq!(hist.counts.iter().sum::<usize>(), values.len());
        assert_eq!(hist.min, 1.0);
        assert_eq!(hist.max, 10.0);
    }

    #[test]
    fn test_max_lands_in_last_bin() {
        let values = [0.0, 10.0];
        let hist = histogram("x", &values, 5);
        assert_eq!(hist.counts[0], 1);
        assert_eq!(hist.counts[4], 1);
    }

    #[test]
    fn test_constant_column_single_bin() {
        let values = [7.0, 7.0, 7.0];
        let hist = histogram("x", &values, 10);
        assert_eq!(hist.counts[0], 3);
        assert_eq!(hist.counts[1..].iter().sum::<usize>(), 0);
        assert_eq!(hist.max_count(), 3);
    }

    #[test]
    fn test_empty_values() {
        let hist = histogram("x", &[], 10);
        assert_eq!(hist.counts.len(), 10);
        assert_eq!(hist.max_count(), 0);
    }

    #[test]
    fn test_bin_start() {
        let values = [0.0, 100.0];
        let hist = histogram("x", &values, 10);
        assert_eq!(hist.bin_start(0), 0.0);
        assert_eq!(hist.bin_start(5), 50.0);
    }
}

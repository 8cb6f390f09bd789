//! Feature binning for histogram-based tree growing.
//!
//! Each feature column is discretised into at most `max_bins` ordered bins
//! with edges at quantiles of its non-missing values. NaN values get one
//! extra bin at index `missing_bin(feature)`.

/// Bin index type. `max_bins` is capped at 255 so the missing bin fits too.
pub type BinIdx = u16;

pub const MAX_BINS_LIMIT: usize = 255;

#[derive(Debug, Clone)]
pub struct BinMapper {
    /// Per-feature upper edges: a value `x` lands in bin `b` when
    /// `edges[b - 1] < x <= edges[b]`.
    edges: Vec<Vec<f64>>,
}

impl BinMapper {
    /// Learn bin edges from row-major training data.
    pub fn fit(rows: &[Vec<f64>], n_features: usize, max_bins: usize) -> Self {
        let max_bins = max_bins.clamp(2, MAX_BINS_LIMIT);
        let edges = (0..n_features)
            .map(|f| {
                let mut values: Vec<f64> = rows
                    .iter()
                    .map(|row| row[f])
                    .filter(|v| !v.is_nan())
                    .collect();
                values.sort_by(f64::total_cmp);
                feature_edges(&values, max_bins)
            })
            .collect();
        Self { edges }
    }

    pub fn n_features(&self) -> usize {
        self.edges.len()
    }

    /// Number of non-missing bins for a feature.
    pub fn n_bins(&self, feature: usize) -> usize {
        self.edges[feature].len() + 1
    }

    /// Index of the bin holding NaN values for a feature.
    pub fn missing_bin(&self, feature: usize) -> BinIdx {
        self.n_bins(feature) as BinIdx
    }

    /// Real-valued threshold matching "bin <= `bin`". The last non-missing
    /// bin maps to +inf so every finite value falls on the left.
    pub fn threshold(&self, feature: usize, bin: BinIdx) -> f64 {
        self.edges[feature]
            .get(bin as usize)
            .copied()
            .unwrap_or(f64::INFINITY)
    }

    pub fn bin_value(&self, feature: usize, value: f64) -> BinIdx {
        if value.is_nan() {
            return self.missing_bin(feature);
        }
        self.edges[feature].partition_point(|&edge| edge < value) as BinIdx
    }

    /// Bin row-major data into column-major bin indices.
    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<BinIdx>> {
        (0..self.n_features())
            .map(|f| rows.iter().map(|row| self.bin_value(f, row[f])).collect())
            .collect()
    }
}

/// Edges for one sorted, NaN-free column.
fn feature_edges(sorted: &[f64], max_bins: usize) -> Vec<f64> {
    let mut distinct = sorted.to_vec();
    distinct.dedup();

    if distinct.len() <= max_bins {
        return distinct.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
    }

    let n = sorted.len();
    let mut edges: Vec<f64> = (1..max_bins)
        .map(|j| {
            let pos = j as f64 * (n - 1) as f64 / max_bins as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            (sorted[lo] + sorted[hi]) / 2.0
        })
        .collect();
    edges.dedup();
    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(values: &[f64]) -> Vec<Vec<f64>> {
        values.iter().map(|&v| vec![v]).collect()
    }

    #[test]
    fn few_distinct_values_get_midpoint_edges() {
        let rows = column(&[3.0, 1.0, 2.0, 2.0, 1.0]);
        let mapper = BinMapper::fit(&rows, 1, 255);

        assert_eq!(mapper.n_bins(0), 3);
        assert_eq!(mapper.threshold(0, 0), 1.5);
        assert_eq!(mapper.threshold(0, 1), 2.5);
        assert_eq!(mapper.threshold(0, 2), f64::INFINITY);
        assert_eq!(mapper.bin_value(0, 1.0), 0);
        assert_eq!(mapper.bin_value(0, 2.0), 1);
        assert_eq!(mapper.bin_value(0, 3.0), 2);
        assert_eq!(mapper.bin_value(0, 100.0), 2);
    }

    #[test]
    fn nan_goes_to_missing_bin() {
        let rows = column(&[1.0, f64::NAN, 2.0]);
        let mapper = BinMapper::fit(&rows, 1, 255);
        assert_eq!(mapper.missing_bin(0), 2);
        assert_eq!(mapper.bin_value(0, f64::NAN), 2);

        let binned = mapper.transform(&rows);
        assert_eq!(binned, vec![vec![0, 2, 1]]);
    }

    #[test]
    fn many_values_are_capped() {
        let values: Vec<f64> = (0..1000).map(|i| i as f64).collect();
        let mapper = BinMapper::fit(&column(&values), 1, 16);
        assert!(mapper.n_bins(0) <= 16);

        let binned = mapper.transform(&column(&values));
        // Bins are monotone in the value.
        assert!(binned[0].windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(binned[0][0], 0);
        assert_eq!(binned[0][999] as usize, mapper.n_bins(0) - 1);
    }

    #[test]
    fn all_missing_feature_has_one_empty_bin() {
        let rows = column(&[f64::NAN, f64::NAN]);
        let mapper = BinMapper::fit(&rows, 1, 255);
        assert_eq!(mapper.n_bins(0), 1);
        assert_eq!(mapper.bin_value(0, f64::NAN), 1);
    }

    #[test]
    fn bin_and_threshold_agree() {
        let values: Vec<f64> = (0..500).map(|i| ((i * 37) % 101) as f64 * 0.5).collect();
        let mapper = BinMapper::fit(&column(&values), 1, 32);
        for &v in &values {
            let b = mapper.bin_value(0, v);
            assert!(v <= mapper.threshold(0, b));
            if b > 0 {
                assert!(v > mapper.threshold(0, b - 1));
            }
        }
    }
}

//! Data matrix and quantile binning.
//!
//! [`DataMatrix`] owns the raw row-major feature matrix, optional labels,
//! and, after [`DataMatrix::create_bins`] or [`DataMatrix::apply_bins`],
//! per-column [`BinInfo`] plus the row-major `u8` binned matrix the
//! histogram kernels consume.

mod csv;

use rayon::prelude::*;

use crate::error::{BoostError, Result};

/// Sentinel for missing feature values.
pub const MISSING_VALUE: f32 = f32::NAN;

// ============================================================================
// BinInfo
// ============================================================================

/// Bin type tag. Only numerical bins exist today; the tag is kept so the
/// model shape has room for categorical bins later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinKind {
    #[default]
    Numerical,
}

/// Bin boundaries for one feature column.
///
/// `splits` is an ordered list of thresholds `s0 <= s1 <= ...`. A finite
/// value `v` maps to the upper-bound position (count of thresholds
/// `<= v`), so a value equal to an edge falls into the upper bin.
/// Missing values (NaN) map to the dedicated last bin `splits.len()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BinInfo {
    pub kind: BinKind,
    pub splits: Vec<f32>,
}

impl BinInfo {
    /// Map a raw value to its bin index.
    #[inline]
    pub fn get_bin(&self, value: f32) -> u32 {
        if value.is_nan() {
            return self.splits.len() as u32;
        }
        self.splits.partition_point(|&s| s <= value) as u32
    }
}

// ============================================================================
// DataMatrix
// ============================================================================

/// Dense row-major feature matrix with optional labels and a derived
/// binned representation.
///
/// The raw matrix is immutable after construction; `create_bins` /
/// `apply_bins` populate `bin_info` and the binned matrix exactly once.
#[derive(Debug, Clone, Default)]
pub struct DataMatrix {
    n_rows: usize,
    n_cols: usize,
    /// Raw features, `n_rows * n_cols`, row-major.
    features: Vec<f32>,
    /// Labels; empty or of length `n_rows`.
    labels: Vec<f32>,
    /// Binned features, empty before binning, `n_rows * n_cols` after.
    binned: Vec<u8>,
    /// Per-column bin edges, empty before binning.
    bin_info: Vec<BinInfo>,
}

impl DataMatrix {
    /// Build a matrix from a flat row-major feature vector.
    pub fn from_parts(
        features: Vec<f32>,
        labels: Vec<f32>,
        n_rows: usize,
        n_cols: usize,
    ) -> Result<Self> {
        if features.len() != n_rows * n_cols {
            return Err(BoostError::ShapeMismatch(format!(
                "feature vector has {} values, expected {} ({} rows x {} cols)",
                features.len(),
                n_rows * n_cols,
                n_rows,
                n_cols
            )));
        }
        if !labels.is_empty() && labels.len() != n_rows {
            return Err(BoostError::ShapeMismatch(format!(
                "label vector has {} values, expected {}",
                labels.len(),
                n_rows
            )));
        }
        Ok(Self {
            n_rows,
            n_cols,
            features,
            labels,
            binned: Vec::new(),
            bin_info: Vec::new(),
        })
    }

    /// Load a matrix from a CSV file.
    ///
    /// A header line is required; `label_column` < 0 means no label.
    pub fn from_csv(path: &str, label_column: i32) -> Result<Self> {
        csv::load_csv(path, label_column)
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    #[inline]
    pub fn labels(&self) -> &[f32] {
        &self.labels
    }

    #[inline]
    pub fn bin_info(&self) -> &[BinInfo] {
        &self.bin_info
    }

    /// Whether `create_bins` / `apply_bins` has run.
    #[inline]
    pub fn is_binned(&self) -> bool {
        !self.binned.is_empty()
    }

    /// Raw feature value at (row, col).
    #[inline]
    pub fn get_feature(&self, row: usize, col: usize) -> f32 {
        self.features[row * self.n_cols + col]
    }

    /// One raw row as a slice.
    #[inline]
    pub fn row(&self, row: usize) -> &[f32] {
        &self.features[row * self.n_cols..(row + 1) * self.n_cols]
    }

    /// Bin index at (row, col). Only valid after binning.
    #[inline]
    pub fn get_binned(&self, row: usize, col: usize) -> u8 {
        self.binned[row * self.n_cols + col]
    }

    /// Full binned matrix (row-major). Only valid after binning.
    #[inline]
    pub fn binned(&self) -> &[u8] {
        &self.binned
    }

    /// Build quantile-style bin edges independently per column, then bin
    /// every cell.
    ///
    /// A column with fewer than `n_bins` distinct finite values uses the
    /// values themselves as edges; otherwise exactly `n_bins - 1` edges
    /// are drawn by equal-quantile sampling, leaving the last bin index
    /// for missing values. Every resulting bin index is `<= n_bins - 1`,
    /// so it fits the `u8` binned matrix for up to 256 bins.
    pub fn create_bins(&mut self, n_bins: u32) {
        let n_bins = n_bins as usize;
        let n_rows = self.n_rows;
        let n_cols = self.n_cols;
        let features = &self.features;

        let bin_info: Vec<BinInfo> = (0..n_cols)
            .into_par_iter()
            .map(|col| {
                let mut values: Vec<f32> = (0..n_rows)
                    .map(|row| features[row * n_cols + col])
                    .filter(|v| !v.is_nan())
                    .collect();
                values.sort_by(|a, b| a.partial_cmp(b).unwrap());
                values.dedup();

                let splits = if values.len() < n_bins {
                    values
                } else {
                    // Equal-quantile edges; the last bin stays reserved
                    // for missing values.
                    (0..n_bins - 1)
                        .map(|i| values[(i + 1) * values.len() / n_bins])
                        .collect()
                };

                BinInfo {
                    kind: BinKind::Numerical,
                    splits,
                }
            })
            .collect();

        self.bin_info = bin_info;
        self.fill_binned();
    }

    /// Bin this matrix with edges computed on another (training) matrix.
    ///
    /// No new edges are computed; this is what keeps train and test
    /// binning consistent. Idempotent.
    pub fn apply_bins(&mut self, other: &DataMatrix) -> Result<()> {
        if other.bin_info.len() != self.n_cols {
            return Err(BoostError::ShapeMismatch(format!(
                "bin info covers {} columns, matrix has {}",
                other.bin_info.len(),
                self.n_cols
            )));
        }
        self.bin_info = other.bin_info.clone();
        self.fill_binned();
        Ok(())
    }

    fn fill_binned(&mut self) {
        let n_cols = self.n_cols;
        let features = &self.features;
        let bin_info = &self.bin_info;

        let mut binned = vec![0u8; self.n_rows * n_cols];
        binned
            .par_chunks_mut(n_cols)
            .enumerate()
            .for_each(|(row, out)| {
                for (col, slot) in out.iter_mut().enumerate() {
                    let value = features[row * n_cols + col];
                    *slot = bin_info[col].get_bin(value) as u8;
                }
            });
        self.binned = binned;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn column_matrix(values: Vec<f32>) -> DataMatrix {
        let n = values.len();
        DataMatrix::from_parts(values, Vec::new(), n, 1).unwrap()
    }

    #[test]
    fn from_parts_checks_shapes() {
        assert!(matches!(
            DataMatrix::from_parts(vec![1.0, 2.0, 3.0], Vec::new(), 2, 2),
            Err(BoostError::ShapeMismatch(_))
        ));
        assert!(matches!(
            DataMatrix::from_parts(vec![1.0, 2.0], vec![0.0], 1, 2),
            Err(BoostError::ShapeMismatch(_))
        ));
        assert!(DataMatrix::from_parts(vec![1.0, 2.0], vec![0.0], 1, 2).is_ok());
    }

    #[test]
    fn get_bin_upper_bound_semantics() {
        let info = BinInfo {
            kind: BinKind::Numerical,
            splits: vec![1.0, 2.0, 3.0],
        };
        assert_eq!(info.get_bin(0.5), 0);
        // A value equal to an edge falls into the upper bin.
        assert_eq!(info.get_bin(1.0), 1);
        assert_eq!(info.get_bin(1.5), 1);
        assert_eq!(info.get_bin(2.0), 2);
        assert_eq!(info.get_bin(10.0), 3);
        // Missing values take the dedicated last bin.
        assert_eq!(info.get_bin(f32::NAN), 3);
    }

    #[test]
    fn few_distinct_values_become_edges() {
        let mut data = column_matrix(vec![3.0, 1.0, 2.0, 1.0, 3.0]);
        data.create_bins(256);
        assert_eq!(data.bin_info()[0].splits, vec![1.0, 2.0, 3.0]);
        assert!(data.is_binned());
    }

    #[test]
    fn quantile_edges_partition_evenly() {
        // 1..=1000 with 10 bins: 9 strictly increasing edges, ten bins
        // of 100 values each (within one).
        let mut data = column_matrix((1..=1000).map(|i| i as f32).collect());
        data.create_bins(10);

        let splits = &data.bin_info()[0].splits;
        assert_eq!(splits.len(), 9);
        for pair in splits.windows(2) {
            assert!(pair[0] < pair[1], "edges must be strictly increasing");
        }

        let mut counts = [0usize; 10];
        for row in 0..data.n_rows() {
            counts[data.get_binned(row, 0) as usize] += 1;
        }
        for &count in &counts {
            assert!(
                (99..=101).contains(&count),
                "bins should be equally populated, got {count}"
            );
        }
    }

    #[test]
    fn exactly_n_bins_distinct_values_stay_in_range() {
        // 256 distinct values with 256 bins: edges are capped at 255 so
        // every bin index (missing included) fits in u8.
        let mut data = column_matrix((0..256).map(|i| i as f32).collect());
        data.create_bins(256);
        assert_eq!(data.bin_info()[0].splits.len(), 255);
        for row in 0..data.n_rows() {
            assert!(data.get_binned(row, 0) as usize <= data.bin_info()[0].splits.len());
        }
    }

    #[test]
    fn missing_maps_to_last_bin() {
        let mut data = column_matrix(vec![1.0, f32::NAN, 2.0, 3.0]);
        data.create_bins(8);
        let n_splits = data.bin_info()[0].splits.len() as u8;
        assert_eq!(data.get_binned(1, 0), n_splits);
    }

    #[test]
    fn binned_entries_bounded_by_split_count() {
        let mut data = DataMatrix::from_parts(
            vec![1.0, 5.0, 2.0, f32::NAN, 3.0, -1.0, 4.0, 9.0],
            Vec::new(),
            4,
            2,
        )
        .unwrap();
        data.create_bins(4);
        for row in 0..data.n_rows() {
            for col in 0..data.n_cols() {
                assert!(
                    (data.get_binned(row, col) as usize) <= data.bin_info()[col].splits.len()
                );
            }
        }
    }

    #[test]
    fn apply_bins_reuses_training_edges() {
        let mut train = column_matrix((0..100).map(|i| i as f32).collect());
        train.create_bins(8);

        let mut test = column_matrix(vec![-5.0, 3.0, 50.0, 1e6, f32::NAN]);
        test.apply_bins(&train).unwrap();

        assert_eq!(test.bin_info(), train.bin_info());
        let splits = &train.bin_info()[0].splits;
        // Below every edge -> bin 0; above every edge -> last real bin;
        // missing -> dedicated bin.
        assert_eq!(test.get_binned(0, 0), 0);
        assert_eq!(test.get_binned(3, 0) as usize, splits.len());
        assert_eq!(test.get_binned(4, 0) as usize, splits.len());
    }

    #[test]
    fn apply_bins_is_idempotent() {
        let mut train = column_matrix((0..50).map(|i| (i % 7) as f32).collect());
        train.create_bins(16);

        let mut test = column_matrix(vec![0.0, 3.5, 6.0, f32::NAN]);
        test.apply_bins(&train).unwrap();
        let first = test.binned().to_vec();
        test.apply_bins(&train).unwrap();
        assert_eq!(test.binned(), &first[..]);
    }

    #[test]
    fn apply_bins_rejects_column_mismatch() {
        let mut train = column_matrix(vec![1.0, 2.0]);
        train.create_bins(4);
        let mut test =
            DataMatrix::from_parts(vec![1.0, 2.0, 3.0, 4.0], Vec::new(), 2, 2).unwrap();
        assert!(matches!(
            test.apply_bins(&train),
            Err(BoostError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn all_missing_column_has_no_edges() {
        let mut data = column_matrix(vec![f32::NAN, f32::NAN, f32::NAN]);
        data.create_bins(16);
        assert!(data.bin_info()[0].splits.is_empty());
        for row in 0..3 {
            assert_eq!(data.get_binned(row, 0), 0);
        }
    }
}

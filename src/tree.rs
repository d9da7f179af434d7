//! Single decision tree: growth by recursive partitioning and per-row
//! inference.
//!
//! Nodes live in a flat array with node 0 as the root. Growth is
//! depth-first: an internal node's slot is reserved before its children
//! are built and backfilled once both child indices are known, so the
//! array order is pre-order. Serialization relabels nodes
//! breadth-first, making the in-memory order an implementation detail.

use rayon::prelude::*;

use crate::config::GBDTConfig;
use crate::data::DataMatrix;
use crate::error::{BoostError, Result};
use crate::kernels;

// ============================================================================
// SplitInfo
// ============================================================================

/// A fully-resolved split decision for one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitInfo {
    pub feature_id: u32,
    pub bin_id: u32,
    /// Raw-value threshold; rows with `value <= threshold` go left.
    pub threshold: f32,
    pub gain: f32,
    pub left_sum_gradients: f32,
    pub left_sum_hessians: f32,
    pub right_sum_gradients: f32,
    pub right_sum_hessians: f32,
}

impl SplitInfo {
    /// Sentinel for "no split found".
    pub fn none() -> Self {
        Self {
            feature_id: 0,
            bin_id: 0,
            threshold: f32::NAN,
            gain: f32::NEG_INFINITY,
            left_sum_gradients: 0.0,
            left_sum_hessians: 0.0,
            right_sum_gradients: 0.0,
            right_sum_hessians: 0.0,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.gain > f32::NEG_INFINITY
    }
}

// ============================================================================
// TreeNode
// ============================================================================

/// One node of a tree. Children reference siblings through indices into
/// the owning tree's node array; there are no back pointers.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    Leaf {
        /// Depth in the tree, kept for diagnostics.
        depth: u32,
        /// Raw-score contribution of rows reaching this leaf.
        weight: f32,
    },
    Split {
        depth: u32,
        feature_id: u32,
        /// Rows with `value <= threshold` descend left; NaN goes right.
        threshold: f32,
        left_child: u32,
        right_child: u32,
        gain: f32,
    },
}

impl TreeNode {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf { .. })
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        match *self {
            TreeNode::Leaf { depth, .. } | TreeNode::Split { depth, .. } => depth,
        }
    }
}

// ============================================================================
// Tree
// ============================================================================

/// A regression tree over binned training data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tree {
    nodes: Vec<TreeNode>,
}

impl Tree {
    /// Build a tree from per-row gradients/hessians over the given row
    /// subset, considering only `features` as split candidates.
    ///
    /// `data` must already be binned; gradients and hessians are indexed
    /// by absolute row id.
    pub fn fit(
        config: &GBDTConfig,
        data: &DataMatrix,
        gradients: &[f32],
        hessians: &[f32],
        row_indices: &[u32],
        features: &[u32],
    ) -> Self {
        assert!(data.is_binned(), "tree growth requires a binned matrix");
        assert_eq!(gradients.len(), data.n_rows());
        assert_eq!(hessians.len(), data.n_rows());

        let mut builder = TreeBuilder {
            config,
            data,
            gradients,
            hessians,
            features,
            nodes: Vec::new(),
        };
        builder.build_node(row_indices, 0);

        Tree {
            nodes: builder.nodes,
        }
    }

    /// Rebuild a tree from an already-validated node array (model load).
    pub(crate) fn from_nodes(nodes: Vec<TreeNode>) -> Self {
        Tree { nodes }
    }

    #[inline]
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Raw-score output for one row of raw feature values.
    ///
    /// Missing values (NaN) always route to the right child.
    pub fn predict_row(&self, features: &[f32]) -> f32 {
        debug_assert!(!self.nodes.is_empty(), "tree is not built yet");

        let mut node_idx = 0usize;
        loop {
            match self.nodes[node_idx] {
                TreeNode::Leaf { weight, .. } => return weight,
                TreeNode::Split {
                    feature_id,
                    threshold,
                    left_child,
                    right_child,
                    ..
                } => {
                    let value = features[feature_id as usize];
                    node_idx = if value.is_nan() {
                        right_child as usize
                    } else if value <= threshold {
                        left_child as usize
                    } else {
                        right_child as usize
                    };
                }
            }
        }
    }

    /// Raw-score outputs for every row of a matrix.
    pub fn predict(&self, data: &DataMatrix) -> Result<Vec<f32>> {
        if self.nodes.is_empty() {
            return Err(BoostError::NotTrained);
        }
        Ok((0..data.n_rows())
            .into_par_iter()
            .map(|row| self.predict_row(data.row(row)))
            .collect())
    }
}

// ============================================================================
// TreeBuilder
// ============================================================================

struct TreeBuilder<'a> {
    config: &'a GBDTConfig,
    data: &'a DataMatrix,
    gradients: &'a [f32],
    hessians: &'a [f32],
    features: &'a [u32],
    nodes: Vec<TreeNode>,
}

impl TreeBuilder<'_> {
    /// Grow the subtree for `row_indices` at `depth`; returns the index
    /// of the subtree root in the node array.
    fn build_node(&mut self, row_indices: &[u32], depth: u32) -> u32 {
        let mut sum_gradients = 0.0f32;
        let mut sum_hessians = 0.0f32;
        for &row in row_indices {
            sum_gradients += self.gradients[row as usize];
            sum_hessians += self.hessians[row as usize];
        }

        if depth >= self.config.max_depth
            || sum_hessians < self.config.min_child_weight
            || row_indices.len() <= self.config.min_data_in_leaf as usize
        {
            return self.emit_leaf(depth, sum_gradients, sum_hessians);
        }

        let best_split = self.find_best_split(row_indices, sum_gradients, sum_hessians);
        if !best_split.is_valid() {
            return self.emit_leaf(depth, sum_gradients, sum_hessians);
        }

        let (left_rows, right_rows) = self.split_rows(row_indices, &best_split);
        if left_rows.is_empty() || right_rows.is_empty() {
            return self.emit_leaf(depth, sum_gradients, sum_hessians);
        }

        // Reserve the internal node's slot, then backfill once both
        // child indices exist.
        let node_idx = self.nodes.len() as u32;
        self.nodes.push(TreeNode::Leaf { depth, weight: 0.0 });

        let left_child = self.build_node(&left_rows, depth + 1);
        let right_child = self.build_node(&right_rows, depth + 1);

        self.nodes[node_idx as usize] = TreeNode::Split {
            depth,
            feature_id: best_split.feature_id,
            threshold: best_split.threshold,
            left_child,
            right_child,
            gain: best_split.gain,
        };

        node_idx
    }

    fn emit_leaf(&mut self, depth: u32, sum_gradients: f32, sum_hessians: f32) -> u32 {
        let weight = -sum_gradients / (sum_hessians + self.config.reg_lambda);
        self.nodes.push(TreeNode::Leaf { depth, weight });
        (self.nodes.len() - 1) as u32
    }

    /// Best split across the candidate features.
    ///
    /// Features are scanned in parallel; ties on gain resolve to the
    /// lowest (feature, bin) pair so results do not depend on the
    /// reduction order.
    fn find_best_split(
        &self,
        row_indices: &[u32],
        sum_gradients: f32,
        sum_hessians: f32,
    ) -> SplitInfo {
        let n_bins = self.config.n_bins as usize;

        self.features
            .par_iter()
            .map(|&feature_id| {
                let mut grad_hist = vec![0.0f32; n_bins];
                let mut hess_hist = vec![0.0f32; n_bins];
                kernels::gradient_histogram(
                    self.data.binned(),
                    self.data.n_cols(),
                    feature_id as usize,
                    row_indices,
                    self.gradients,
                    self.hessians,
                    &mut grad_hist,
                    &mut hess_hist,
                );

                let scan = kernels::find_best_split(
                    &grad_hist,
                    &hess_hist,
                    sum_gradients,
                    sum_hessians,
                    self.config.min_child_weight,
                    self.config.reg_lambda,
                );
                if !scan.is_valid() {
                    return SplitInfo::none();
                }

                // A winning bin at or past the last real edge has no
                // threshold; the candidate is discarded.
                let splits = &self.data.bin_info()[feature_id as usize].splits;
                let Some(&threshold) = splits.get(scan.bin as usize) else {
                    return SplitInfo::none();
                };

                SplitInfo {
                    feature_id,
                    bin_id: scan.bin,
                    threshold,
                    gain: scan.gain,
                    left_sum_gradients: scan.left_grad,
                    left_sum_hessians: scan.left_hess,
                    right_sum_gradients: sum_gradients - scan.left_grad,
                    right_sum_hessians: sum_hessians - scan.left_hess,
                }
            })
            .reduce(SplitInfo::none, |best, candidate| {
                if candidate.gain > best.gain
                    || (candidate.gain == best.gain
                        && candidate.is_valid()
                        && (candidate.feature_id, candidate.bin_id)
                            < (best.feature_id, best.bin_id))
                {
                    candidate
                } else {
                    best
                }
            })
    }

    /// Partition rows by the raw-value test `value <= threshold`;
    /// missing values go right.
    fn split_rows(&self, row_indices: &[u32], split: &SplitInfo) -> (Vec<u32>, Vec<u32>) {
        let mut left = Vec::with_capacity(row_indices.len());
        let mut right = Vec::with_capacity(row_indices.len());

        for &row in row_indices {
            let value = self.data.get_feature(row as usize, split.feature_id as usize);
            if value.is_nan() {
                right.push(row);
            } else if value <= split.threshold {
                left.push(row);
            } else {
                right.push(row);
            }
        }

        (left, right)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Task;
    use approx::assert_abs_diff_eq;

    fn test_config(max_depth: u32) -> GBDTConfig {
        GBDTConfig {
            task: Task::Regression,
            max_depth,
            min_data_in_leaf: 1,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            n_bins: 32,
            ..GBDTConfig::default()
        }
    }

    /// Single feature 0..n, positive gradients below the midpoint and
    /// negative above: one clean split.
    fn ramp_data(n: usize) -> (DataMatrix, Vec<f32>, Vec<f32>, Vec<u32>) {
        let features: Vec<f32> = (0..n).map(|i| i as f32).collect();
        let mut data = DataMatrix::from_parts(features, Vec::new(), n, 1).unwrap();
        data.create_bins(32);

        let gradients: Vec<f32> = (0..n).map(|i| if i < n / 2 { 1.0 } else { -1.0 }).collect();
        let hessians = vec![1.0f32; n];
        let rows: Vec<u32> = (0..n as u32).collect();
        (data, gradients, hessians, rows)
    }

    fn all_features(data: &DataMatrix) -> Vec<u32> {
        (0..data.n_cols() as u32).collect()
    }

    #[test]
    fn depth_one_tree_splits_the_ramp() {
        let (data, gradients, hessians, rows) = ramp_data(20);
        let config = test_config(1);
        let tree = Tree::fit(&config, &data, &gradients, &hessians, &rows, &all_features(&data));

        assert_eq!(tree.n_nodes(), 3);
        assert!(!tree.nodes()[0].is_leaf());

        // The best histogram candidate is the bin boundary after the
        // tenth value, whose threshold is the raw value 10.0; the raw
        // partition `v <= 10` therefore carries 11 rows (G=9, H=11)
        // left and 9 rows (G=-9, H=9) right.
        let low = tree.predict_row(&[0.0]);
        let high = tree.predict_row(&[19.0]);
        assert_abs_diff_eq!(low, -9.0 / 12.0, epsilon = 1e-6);
        assert_abs_diff_eq!(high, 9.0 / 10.0, epsilon = 1e-6);
    }

    #[test]
    fn structural_invariants_hold() {
        let (data, gradients, hessians, rows) = ramp_data(200);
        let config = test_config(4);
        let tree = Tree::fit(&config, &data, &gradients, &hessians, &rows, &all_features(&data));

        let n = tree.n_nodes() as u32;
        for node in tree.nodes() {
            match *node {
                TreeNode::Split {
                    left_child,
                    right_child,
                    depth,
                    ..
                } => {
                    assert!(left_child < n && right_child < n);
                    assert!(left_child != right_child);
                    assert!(depth < config.max_depth);
                }
                TreeNode::Leaf { depth, .. } => {
                    assert!(depth <= config.max_depth);
                }
            }
        }
    }

    #[test]
    fn constant_feature_yields_single_leaf() {
        let features = vec![5.0f32; 50];
        let mut data = DataMatrix::from_parts(features, Vec::new(), 50, 1).unwrap();
        data.create_bins(32);

        let gradients: Vec<f32> = (0..50).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let hessians = vec![1.0f32; 50];
        let rows: Vec<u32> = (0..50).collect();

        let config = test_config(6);
        let tree = Tree::fit(&config, &data, &gradients, &hessians, &rows, &all_features(&data));

        assert_eq!(tree.n_nodes(), 1);
        assert!(tree.nodes()[0].is_leaf());
    }

    #[test]
    fn min_data_in_leaf_stops_growth() {
        let (data, gradients, hessians, rows) = ramp_data(20);
        let config = GBDTConfig {
            min_data_in_leaf: 20,
            ..test_config(6)
        };
        let tree = Tree::fit(&config, &data, &gradients, &hessians, &rows, &all_features(&data));
        assert_eq!(tree.n_nodes(), 1);
    }

    #[test]
    fn tiny_hessian_leaf_weight_is_finite() {
        let (data, gradients, _, rows) = ramp_data(10);
        // Hessians sum far below min_child_weight: immediate leaf, and
        // the weight -G/(H + lambda) must not blow up.
        let hessians = vec![1e-8f32; 10];
        let config = test_config(6);
        let tree = Tree::fit(&config, &data, &gradients, &hessians, &rows, &all_features(&data));
        assert_eq!(tree.n_nodes(), 1);
        match tree.nodes()[0] {
            TreeNode::Leaf { weight, .. } => assert!(weight.is_finite()),
            _ => panic!("expected a leaf"),
        }
    }

    #[test]
    fn nan_rows_partition_right_during_training() {
        // Feature values: NaN rows carry strongly negative gradients.
        // If NaN routed left the split statistics would drag them along;
        // the resulting leaf weights reveal the side they landed on.
        let features = vec![1.0, 2.0, 3.0, 4.0, f32::NAN, f32::NAN];
        let mut data = DataMatrix::from_parts(features, Vec::new(), 6, 1).unwrap();
        data.create_bins(8);

        let gradients = vec![1.0, 1.0, -1.0, -1.0, -3.0, -3.0];
        let hessians = vec![1.0f32; 6];
        let rows: Vec<u32> = (0..6).collect();
        let config = GBDTConfig {
            min_child_weight: 0.5,
            ..test_config(1)
        };
        let tree = Tree::fit(&config, &data, &gradients, &hessians, &rows, &all_features(&data));

        assert_eq!(tree.n_nodes(), 3);
        // A NaN probe and a large-value probe must reach the same leaf.
        let nan_pred = tree.predict_row(&[f32::NAN]);
        let big_pred = tree.predict_row(&[1e9]);
        assert_eq!(nan_pred, big_pred);
    }

    #[test]
    fn feature_subset_restricts_splits() {
        // Two features; only feature 1 is allowed and it is constant,
        // so no split can be made.
        let features: Vec<f32> = (0..40).flat_map(|i| [i as f32, 7.0]).collect();
        let mut data = DataMatrix::from_parts(features, Vec::new(), 40, 2).unwrap();
        data.create_bins(16);

        let gradients: Vec<f32> = (0..40).map(|i| if i < 20 { 1.0 } else { -1.0 }).collect();
        let hessians = vec![1.0f32; 40];
        let rows: Vec<u32> = (0..40).collect();
        let config = test_config(4);

        let tree = Tree::fit(&config, &data, &gradients, &hessians, &rows, &[1]);
        assert_eq!(tree.n_nodes(), 1);

        let tree = Tree::fit(&config, &data, &gradients, &hessians, &rows, &[0]);
        assert!(tree.n_nodes() > 1);
    }

    #[test]
    fn predict_on_unbuilt_tree_errors() {
        let data = DataMatrix::from_parts(vec![1.0], Vec::new(), 1, 1).unwrap();
        let tree = Tree::default();
        assert!(matches!(tree.predict(&data), Err(BoostError::NotTrained)));
    }
}

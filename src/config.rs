//! Training configuration.
//!
//! [`GBDTConfig`] is a flat, validated parameter record. It is carried by
//! the ensemble, serialized into the native model shape, and checked once
//! at `train` entry, so out-of-range values never reach the training loop.

use serde::{Deserialize, Serialize};

// ============================================================================
// Task
// ============================================================================

/// Learning task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    /// Squared-error regression.
    #[default]
    Regression,
    /// Binary classification with a logistic link.
    Binary,
}

impl Task {
    /// Default evaluation metric name for this task.
    pub fn default_metric(self) -> &'static str {
        match self {
            Task::Regression => "rmse",
            Task::Binary => "logloss",
        }
    }
}

// ============================================================================
// GBDTConfig
// ============================================================================

/// Configuration for GBDT training.
///
/// Defaults match the reference implementation: 100 rounds of depth-6
/// trees at learning rate 0.1 with 256 histogram bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GBDTConfig {
    /// Task type (regression or binary classification).
    pub task: Task,
    /// Number of boosting rounds.
    pub n_rounds: u32,
    /// Shrinkage applied to each tree's contribution, in (0, 1].
    pub learning_rate: f32,
    /// Maximum tree depth, in [1, 32].
    pub max_depth: u32,
    /// Minimum number of rows in a leaf.
    pub min_data_in_leaf: u32,
    /// Minimum sum of hessians in a child.
    pub min_child_weight: f32,
    /// L2 regularization on leaf weights.
    pub reg_lambda: f32,
    /// Number of histogram bins per feature, in [1, 256].
    pub n_bins: u32,
    /// Row subsampling ratio per round, in (0, 1].
    pub subsample: f32,
    /// Feature subsampling ratio per tree, in (0, 1].
    pub colsample: f32,
    /// Seed for the subsampling and CV shuffle RNG streams.
    pub seed: u64,
    /// Worker threads; -1 uses all available cores.
    pub n_threads: i32,
    /// Evaluation metric name (rmse, mae, logloss, auc).
    pub metric: String,
}

impl Default for GBDTConfig {
    fn default() -> Self {
        Self {
            task: Task::Regression,
            n_rounds: 100,
            learning_rate: 0.1,
            max_depth: 6,
            min_data_in_leaf: 20,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            n_bins: 256,
            subsample: 1.0,
            colsample: 1.0,
            seed: 0,
            n_threads: -1,
            metric: "rmse".to_string(),
        }
    }
}

impl GBDTConfig {
    /// Default configuration for the given task, with the task's
    /// default metric.
    pub fn for_task(task: Task) -> Self {
        Self {
            task,
            metric: task.default_metric().to_string(),
            ..Self::default()
        }
    }

    /// Check that every parameter is inside its valid range.
    ///
    /// Pure; `train` rejects an invalid configuration before touching
    /// any data.
    pub fn validate(&self) -> bool {
        if self.n_rounds == 0 {
            return false;
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return false;
        }
        if self.max_depth == 0 || self.max_depth > 32 {
            return false;
        }
        if self.min_data_in_leaf == 0 {
            return false;
        }
        if !(self.min_child_weight > 0.0) {
            return false;
        }
        if !(self.reg_lambda >= 0.0) {
            return false;
        }
        if self.n_bins == 0 || self.n_bins > 256 {
            return false;
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return false;
        }
        if !(self.colsample > 0.0 && self.colsample <= 1.0) {
            return false;
        }
        true
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn default_config_is_valid() {
        assert!(GBDTConfig::default().validate());
        assert!(GBDTConfig::for_task(Task::Binary).validate());
    }

    #[test]
    fn default_metric_follows_task() {
        assert_eq!(GBDTConfig::for_task(Task::Regression).metric, "rmse");
        assert_eq!(GBDTConfig::for_task(Task::Binary).metric, "logloss");
    }

    #[rstest]
    #[case::zero_rounds(|c: &mut GBDTConfig| c.n_rounds = 0)]
    #[case::lr_zero(|c: &mut GBDTConfig| c.learning_rate = 0.0)]
    #[case::lr_above_one(|c: &mut GBDTConfig| c.learning_rate = 1.5)]
    #[case::lr_nan(|c: &mut GBDTConfig| c.learning_rate = f32::NAN)]
    #[case::depth_zero(|c: &mut GBDTConfig| c.max_depth = 0)]
    #[case::depth_too_large(|c: &mut GBDTConfig| c.max_depth = 33)]
    #[case::leaf_zero(|c: &mut GBDTConfig| c.min_data_in_leaf = 0)]
    #[case::child_weight_zero(|c: &mut GBDTConfig| c.min_child_weight = 0.0)]
    #[case::negative_lambda(|c: &mut GBDTConfig| c.reg_lambda = -0.1)]
    #[case::zero_bins(|c: &mut GBDTConfig| c.n_bins = 0)]
    #[case::too_many_bins(|c: &mut GBDTConfig| c.n_bins = 257)]
    #[case::subsample_zero(|c: &mut GBDTConfig| c.subsample = 0.0)]
    #[case::subsample_above_one(|c: &mut GBDTConfig| c.subsample = 1.01)]
    #[case::colsample_zero(|c: &mut GBDTConfig| c.colsample = 0.0)]
    fn out_of_range_field_fails_validation(#[case] mutate: fn(&mut GBDTConfig)) {
        let mut config = GBDTConfig::default();
        mutate(&mut config);
        assert!(!config.validate());
    }

    #[test]
    fn task_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Task::Binary).unwrap(), "\"binary\"");
        assert_eq!(
            serde_json::to_string(&Task::Regression).unwrap(),
            "\"regression\""
        );
    }

    #[test]
    fn config_roundtrips_through_json() {
        let config = GBDTConfig {
            task: Task::Binary,
            n_rounds: 7,
            metric: "auc".to_string(),
            ..GBDTConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: GBDTConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn config_load_tolerates_missing_fields() {
        let back: GBDTConfig = serde_json::from_str(r#"{"task":"binary","n_rounds":3}"#).unwrap();
        assert_eq!(back.task, Task::Binary);
        assert_eq!(back.n_rounds, 3);
        assert_eq!(back.n_bins, 256);
    }
}

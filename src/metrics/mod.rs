//! Evaluation metrics.
//!
//! Metrics are pure `(labels, predictions) -> f32` functions, modeled as
//! an enum with a name resolver rather than trait objects: the set is
//! closed and selection happens once per training run.
//!
//! Classification metrics expect probabilities, not raw scores; the
//! trainer applies the logistic link before evaluating a binary model.

mod classification;
mod regression;

pub use classification::{auc, logloss};
pub use regression::{mae, rmse};

/// A dynamically-selected evaluation metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Root mean squared error.
    Rmse,
    /// Mean absolute error.
    Mae,
    /// Binary cross-entropy on probabilities.
    LogLoss,
    /// Area under the ROC curve.
    Auc,
}

impl Metric {
    /// Resolve a metric by its CLI/config name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "rmse" => Some(Self::Rmse),
            "mae" => Some(Self::Mae),
            "logloss" => Some(Self::LogLoss),
            "auc" => Some(Self::Auc),
            _ => None,
        }
    }

    /// All resolvable metric names.
    pub fn available() -> &'static [&'static str] {
        &["rmse", "mae", "logloss", "auc"]
    }

    /// Canonical name, as used in round log lines.
    pub fn name(self) -> &'static str {
        match self {
            Self::Rmse => "rmse",
            Self::Mae => "mae",
            Self::LogLoss => "logloss",
            Self::Auc => "auc",
        }
    }

    /// Whether larger values indicate a better model.
    pub fn higher_is_better(self) -> bool {
        matches!(self, Self::Auc)
    }

    /// Evaluate the metric.
    ///
    /// # Panics
    /// Panics if `labels` and `predictions` differ in length.
    pub fn compute(self, labels: &[f32], predictions: &[f32]) -> f32 {
        assert_eq!(
            labels.len(),
            predictions.len(),
            "labels and predictions must have equal length"
        );
        match self {
            Self::Rmse => rmse(labels, predictions),
            Self::Mae => mae(labels, predictions),
            Self::LogLoss => logloss(labels, predictions),
            Self::Auc => auc(labels, predictions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name() {
        for &name in Metric::available() {
            let metric = Metric::from_name(name).unwrap();
            assert_eq!(metric.name(), name);
        }
        assert!(Metric::from_name("ndcg").is_none());
    }

    #[test]
    fn only_auc_is_higher_better() {
        assert!(Metric::Auc.higher_is_better());
        assert!(!Metric::Rmse.higher_is_better());
        assert!(!Metric::Mae.higher_is_better());
        assert!(!Metric::LogLoss.higher_is_better());
    }

    #[test]
    #[should_panic(expected = "equal length")]
    fn length_mismatch_panics() {
        Metric::Rmse.compute(&[1.0], &[1.0, 2.0]);
    }
}

//! Gradient boosted ensemble: training loop, prediction, and k-fold
//! cross-validation.

use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::config::{GBDTConfig, Task};
use crate::data::DataMatrix;
use crate::error::{BoostError, Result};
use crate::kernels;
use crate::logger::{TrainingLogger, Verbosity};
use crate::metrics::Metric;
use crate::tree::Tree;
use crate::utils::run_with_threads;

// ============================================================================
// GBDT
// ============================================================================

/// An additive ensemble of regression trees with a shared base score.
///
/// Mutated only by [`GBDT::train`]; read-only afterwards and after load.
#[derive(Debug, Clone)]
pub struct GBDT {
    config: GBDTConfig,
    base_score: f32,
    trees: Vec<Tree>,
    verbosity: Verbosity,
}

impl GBDT {
    /// Create an untrained ensemble. Fails fast on an invalid config.
    pub fn new(config: GBDTConfig) -> Result<Self> {
        if !config.validate() {
            return Err(BoostError::InvalidConfig(
                "one or more parameters are out of range".to_string(),
            ));
        }
        Ok(Self {
            config,
            base_score: 0.0,
            trees: Vec::new(),
            verbosity: Verbosity::default(),
        })
    }

    /// Rebuild an ensemble from deserialized parts (model load).
    pub(crate) fn from_parts(config: GBDTConfig, base_score: f32, trees: Vec<Tree>) -> Self {
        Self {
            config,
            base_score,
            trees,
            verbosity: Verbosity::default(),
        }
    }

    /// Silence or enable the per-round training log.
    pub fn set_verbosity(&mut self, verbosity: Verbosity) {
        self.verbosity = verbosity;
    }

    #[inline]
    pub fn config(&self) -> &GBDTConfig {
        &self.config
    }

    #[inline]
    pub fn base_score(&self) -> f32 {
        self.base_score
    }

    #[inline]
    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    #[inline]
    pub fn is_trained(&self) -> bool {
        !self.trees.is_empty()
    }

    // ========================================================================
    // Training
    // ========================================================================

    /// Train the ensemble on a labeled matrix.
    pub fn train(&mut self, data: &DataMatrix) -> Result<()> {
        if data.n_rows() == 0 || data.n_cols() == 0 {
            return Err(BoostError::ShapeMismatch("empty dataset".to_string()));
        }
        if data.labels().is_empty() {
            return Err(BoostError::ShapeMismatch(
                "dataset has no labels".to_string(),
            ));
        }
        let metric = Metric::from_name(&self.config.metric).ok_or_else(|| {
            BoostError::InvalidConfig(format!("unknown metric {:?}", self.config.metric))
        })?;

        let n_threads = self.config.n_threads;
        run_with_threads(n_threads, || self.train_inner(data, metric))
    }

    fn train_inner(&mut self, data: &DataMatrix, metric: Metric) -> Result<()> {
        let logger = TrainingLogger::new(self.verbosity);
        let n_rows = data.n_rows();
        let labels = data.labels().to_vec();

        // The training copy carries the binned representation; the raw
        // features in it are identical to the caller's matrix.
        let mut binned = data.clone();
        binned.create_bins(self.config.n_bins);
        logger.info(&format!(
            "Created {} bins over {} columns",
            self.config.n_bins,
            binned.n_cols()
        ));

        self.base_score = self.compute_base_score(&labels);
        let mut predictions = vec![self.base_score; n_rows];

        let mut gradients = vec![0.0f32; n_rows];
        let mut hessians = vec![0.0f32; n_rows];
        self.compute_gradients(&labels, &predictions, &mut gradients, &mut hessians);

        let all_rows: Vec<u32> = (0..n_rows as u32).collect();
        // One RNG stream for row subsampling, advanced monotonically
        // across rounds.
        let mut row_rng = Xoshiro256PlusPlus::seed_from_u64(self.config.seed);

        self.trees.clear();
        self.trees.reserve(self.config.n_rounds as usize);

        for round in 0..self.config.n_rounds {
            let sampled_rows: Vec<u32> = if self.config.subsample < 1.0 {
                all_rows
                    .iter()
                    .copied()
                    .filter(|_| row_rng.gen::<f32>() < self.config.subsample)
                    .collect()
            } else {
                all_rows.clone()
            };

            let features = sample_features(
                binned.n_cols(),
                self.config.colsample,
                self.config.seed.wrapping_add(round as u64),
            );

            let tree = Tree::fit(
                &self.config,
                &binned,
                &gradients,
                &hessians,
                &sampled_rows,
                &features,
            );

            // The new tree scores every row, sampled or not.
            let tree_preds = tree.predict(&binned)?;
            for (pred, tp) in predictions.iter_mut().zip(&tree_preds) {
                *pred += self.config.learning_rate * tp;
            }
            self.compute_gradients(&labels, &predictions, &mut gradients, &mut hessians);

            self.trees.push(tree);

            let eval = metric.compute(&labels, &self.eval_predictions(&predictions));
            logger.log_round(round, metric.name(), eval);
        }

        logger.info(&format!(
            "Training completed with {} trees",
            self.trees.len()
        ));
        Ok(())
    }

    fn compute_base_score(&self, labels: &[f32]) -> f32 {
        let mean = labels.iter().sum::<f32>() / labels.len() as f32;
        match self.config.task {
            Task::Regression => mean,
            Task::Binary => {
                // Log-odds of the clipped positive rate.
                let p = mean.clamp(0.01, 0.99);
                (p / (1.0 - p)).ln()
            }
        }
    }

    fn compute_gradients(
        &self,
        labels: &[f32],
        predictions: &[f32],
        gradients: &mut [f32],
        hessians: &mut [f32],
    ) {
        match self.config.task {
            Task::Binary => kernels::binary_gradients(labels, predictions, gradients, hessians),
            Task::Regression => {
                kernels::regression_gradients(labels, predictions, gradients, hessians)
            }
        }
    }

    /// Metric inputs: raw scores for regression, probabilities for the
    /// logistic objective.
    fn eval_predictions(&self, raw: &[f32]) -> Vec<f32> {
        match self.config.task {
            Task::Regression => raw.to_vec(),
            Task::Binary => raw.iter().map(|&s| kernels::sigmoid(s)).collect(),
        }
    }

    // ========================================================================
    // Prediction
    // ========================================================================

    /// Predict every row of `data`: regression values, or probabilities
    /// for binary classification.
    pub fn predict(&self, data: &DataMatrix) -> Result<Vec<f32>> {
        self.predict_with(data, self.trees.len())
    }

    /// Predict with only the first `n_trees` trees of the ensemble.
    pub fn predict_with(&self, data: &DataMatrix, n_trees: usize) -> Result<Vec<f32>> {
        if self.trees.is_empty() {
            return Err(BoostError::NotTrained);
        }
        let mut raw = vec![self.base_score; data.n_rows()];
        for tree in &self.trees[..n_trees.min(self.trees.len())] {
            let tree_preds = tree.predict(data)?;
            for (pred, tp) in raw.iter_mut().zip(&tree_preds) {
                *pred += self.config.learning_rate * tp;
            }
        }
        Ok(self.eval_predictions(&raw))
    }

    // ========================================================================
    // Cross-validation
    // ========================================================================

    /// k-fold cross-validation; returns the per-round metric averaged
    /// over folds (length `n_rounds`).
    pub fn cv(&self, data: &DataMatrix, n_folds: u32) -> Result<Vec<f32>> {
        if n_folds < 2 {
            return Err(BoostError::InvalidConfig(
                "cross-validation needs at least 2 folds".to_string(),
            ));
        }
        if (data.n_rows() as u32) < n_folds {
            return Err(BoostError::ShapeMismatch(format!(
                "{} folds exceed {} rows",
                n_folds,
                data.n_rows()
            )));
        }
        if data.labels().is_empty() {
            return Err(BoostError::ShapeMismatch(
                "dataset has no labels".to_string(),
            ));
        }
        let metric = Metric::from_name(&self.config.metric).ok_or_else(|| {
            BoostError::InvalidConfig(format!("unknown metric {:?}", self.config.metric))
        })?;
        let logger = TrainingLogger::new(self.verbosity);

        // Deterministic shuffle, then round-robin fold assignment.
        let mut indices: Vec<u32> = (0..data.n_rows() as u32).collect();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.seed);
        indices.shuffle(&mut rng);

        let mut fold_indices: Vec<Vec<u32>> = vec![Vec::new(); n_folds as usize];
        for (i, &row) in indices.iter().enumerate() {
            fold_indices[i % n_folds as usize].push(row);
        }

        let mut mean_metrics = vec![0.0f32; self.config.n_rounds as usize];

        for fold in 0..n_folds as usize {
            let train_rows: Vec<u32> = fold_indices
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != fold)
                .flat_map(|(_, rows)| rows.iter().copied())
                .collect();
            let test_rows = &fold_indices[fold];

            let train_data = gather_rows(data, &train_rows)?;
            let test_data = gather_rows(data, test_rows)?;

            let mut fold_model = GBDT::new(self.config.clone())?;
            fold_model.set_verbosity(self.verbosity);
            fold_model.train(&train_data)?;

            // Incremental evaluation: extend the raw scores one tree at
            // a time instead of re-running the ensemble per round.
            let mut raw = vec![fold_model.base_score; test_data.n_rows()];
            for round in 0..self.config.n_rounds as usize {
                let tree_preds = fold_model.trees[round].predict(&test_data)?;
                for (pred, tp) in raw.iter_mut().zip(&tree_preds) {
                    *pred += self.config.learning_rate * tp;
                }
                let eval = metric.compute(
                    test_data.labels(),
                    &fold_model.eval_predictions(&raw),
                );
                mean_metrics[round] += eval / n_folds as f32;
            }
        }

        logger.info("Cross-validation results:");
        for (round, value) in mean_metrics.iter().enumerate() {
            logger.info(&format!("Round {round}: {} = {value}", metric.name()));
        }

        Ok(mean_metrics)
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    /// Save in the native JSON shape.
    pub fn save_model(&self, path: &str) -> Result<()> {
        crate::io::save_model(self, path)
    }

    /// Load from the native JSON shape.
    pub fn load_model(path: &str) -> Result<GBDT> {
        crate::io::load_model(path)
    }

    /// Convert to the XGBoost-compatible JSON shape.
    pub fn to_xgboost_json(&self) -> Result<serde_json::Value> {
        crate::io::to_xgboost_json(self)
    }

    /// Rebuild from the XGBoost-compatible JSON shape.
    pub fn from_xgboost_json(json: &serde_json::Value) -> Result<GBDT> {
        crate::io::from_xgboost_json(json)
    }

    /// Save in the XGBoost-compatible JSON shape.
    pub fn save_xgboost_model(&self, path: &str) -> Result<()> {
        crate::io::save_xgboost_model(self, path)
    }

    /// Load from the XGBoost-compatible JSON shape.
    pub fn load_xgboost_model(path: &str) -> Result<GBDT> {
        crate::io::load_xgboost_model(path)
    }
}

// ============================================================================
// Sampling helpers
// ============================================================================

/// Draw a sorted feature subset without replacement; all features when
/// `colsample >= 1`.
fn sample_features(n_cols: usize, colsample: f32, seed: u64) -> Vec<u32> {
    if colsample >= 1.0 {
        return (0..n_cols as u32).collect();
    }
    let keep = ((n_cols as f32 * colsample).ceil() as usize).clamp(1, n_cols);
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

    // Partial Fisher-Yates: the first `keep` slots end up sampled.
    let mut indices: Vec<u32> = (0..n_cols as u32).collect();
    for i in 0..keep {
        let j = rng.gen_range(i..n_cols);
        indices.swap(i, j);
    }
    let mut sampled = indices[..keep].to_vec();
    sampled.sort_unstable();
    sampled
}

/// Materialize a row subset of `data` as a fresh matrix.
fn gather_rows(data: &DataMatrix, rows: &[u32]) -> Result<DataMatrix> {
    let n_cols = data.n_cols();
    let mut features = Vec::with_capacity(rows.len() * n_cols);
    let mut labels = Vec::with_capacity(rows.len());
    for &row in rows {
        features.extend_from_slice(data.row(row as usize));
        labels.push(data.labels()[row as usize]);
    }
    DataMatrix::from_parts(features, labels, rows.len(), n_cols)
}

// ============================================================================
// Tests
// ============================================================================

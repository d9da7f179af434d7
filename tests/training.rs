//! End-to-end training scenarios.

mod common;

use approx::assert_abs_diff_eq;
use histboost::{metrics, DataMatrix, GBDTConfig, Task, Verbosity, GBDT};

use common::{additive_regression, head_rows, tail_rows, xor_sign_classification};

fn quiet(config: GBDTConfig) -> GBDT {
    let mut model = GBDT::new(config).unwrap();
    model.set_verbosity(Verbosity::Silent);
    model
}

#[test]
fn regression_converges_on_additive_target() {
    let data = additive_regression(1000, 42);
    let config = GBDTConfig {
        task: Task::Regression,
        n_rounds: 50,
        learning_rate: 0.1,
        max_depth: 4,
        n_bins: 32,
        ..GBDTConfig::default()
    };

    let mut model = quiet(config);
    model.train(&data).unwrap();

    // Uniform in [-1, 1]^2: the label mean sits near zero.
    assert_abs_diff_eq!(model.base_score(), 0.0, epsilon = 0.05);

    let preds = model.predict(&data).unwrap();
    let rmse = metrics::rmse(data.labels(), &preds);
    assert!(rmse < 0.05, "training rmse {rmse} should be below 0.05");
}

#[test]
fn binary_separates_xor_sign_classes() {
    let data = xor_sign_classification(1000, 42);
    let train = head_rows(&data, 800);
    let test = tail_rows(&data, 800);

    let config = GBDTConfig {
        n_rounds: 50,
        learning_rate: 0.1,
        max_depth: 4,
        ..GBDTConfig::for_task(Task::Binary)
    };

    let mut model = quiet(config);
    model.train(&train).unwrap();

    let preds = model.predict(&test).unwrap();
    let auc = metrics::auc(test.labels(), &preds);
    assert!(auc >= 0.85, "held-out auc {auc} should reach 0.85");
}

#[test]
fn missing_values_follow_the_right_child() {
    // Tiny two-row set; whatever tree shape training settles on, a NaN
    // probe must score exactly like a probe larger than any threshold.
    let train = DataMatrix::from_parts(vec![1.0, 2.0, 3.0, 4.0], vec![0.0, 1.0], 2, 2).unwrap();
    let config = GBDTConfig {
        n_rounds: 1,
        max_depth: 1,
        min_data_in_leaf: 1,
        ..GBDTConfig::default()
    };
    let mut model = quiet(config);
    model.train(&train).unwrap();

    let nan_row = DataMatrix::from_parts(vec![f32::NAN, 2.0], Vec::new(), 1, 2).unwrap();
    let big_row = DataMatrix::from_parts(vec![1e9, 2.0], Vec::new(), 1, 2).unwrap();

    let nan_pred = model.predict(&nan_row).unwrap()[0];
    let big_pred = model.predict(&big_row).unwrap()[0];
    assert_eq!(nan_pred, big_pred);
}

#[test]
fn cv_mean_metric_has_one_entry_per_round() {
    let data = additive_regression(200, 42);
    let config = GBDTConfig {
        n_rounds: 20,
        max_depth: 4,
        min_data_in_leaf: 5,
        n_bins: 32,
        ..GBDTConfig::default()
    };

    let model = quiet(config);
    let mean_metrics = model.cv(&data, 5).unwrap();

    assert_eq!(mean_metrics.len(), 20);
    assert!(mean_metrics.iter().all(|m| m.is_finite()));
    let best = mean_metrics.iter().cloned().fold(f32::INFINITY, f32::min);
    assert!(
        best < mean_metrics[0],
        "boosting should improve on the first round"
    );
}

#[test]
fn subsampled_training_stays_deterministic() {
    let data = additive_regression(500, 9);
    let config = GBDTConfig {
        n_rounds: 15,
        max_depth: 3,
        subsample: 0.7,
        colsample: 0.5,
        seed: 11,
        n_threads: 1,
        ..GBDTConfig::default()
    };

    let mut a = quiet(config.clone());
    a.train(&data).unwrap();
    let mut b = quiet(config);
    b.train(&data).unwrap();

    assert_eq!(a.predict(&data).unwrap(), b.predict(&data).unwrap());
}

#[test]
fn depth_limit_holds_across_the_ensemble() {
    let data = additive_regression(400, 3);
    let config = GBDTConfig {
        n_rounds: 10,
        max_depth: 3,
        min_data_in_leaf: 2,
        ..GBDTConfig::default()
    };
    let mut model = quiet(config);
    model.train(&data).unwrap();

    for tree in model.trees() {
        for node in tree.nodes() {
            assert!(node.depth() <= 3);
        }
    }
}

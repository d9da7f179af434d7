//! Shared dataset builders for the integration suites.
#![allow(dead_code)]

use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

use histboost::DataMatrix;

/// `y = x0 + x1` on `n` uniform points in `[-1, 1]^2`.
pub fn additive_regression(n: usize, seed: u64) -> DataMatrix {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut features = Vec::with_capacity(n * 2);
    let mut labels = Vec::with_capacity(n);
    for _ in 0..n {
        let x0 = rng.gen::<f32>() * 2.0 - 1.0;
        let x1 = rng.gen::<f32>() * 2.0 - 1.0;
        features.push(x0);
        features.push(x1);
        labels.push(x0 + x1);
    }
    DataMatrix::from_parts(features, labels, n, 2).unwrap()
}

/// XOR-sign classification: `y = 1` iff `x0 * x1 > 0`.
pub fn xor_sign_classification(n: usize, seed: u64) -> DataMatrix {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut features = Vec::with_capacity(n * 2);
    let mut labels = Vec::with_capacity(n);
    for _ in 0..n {
        let x0 = rng.gen::<f32>() * 2.0 - 1.0;
        let x1 = rng.gen::<f32>() * 2.0 - 1.0;
        features.push(x0);
        features.push(x1);
        labels.push(if x0 * x1 > 0.0 { 1.0 } else { 0.0 });
    }
    DataMatrix::from_parts(features, labels, n, 2).unwrap()
}

/// First `n` rows of `data` as a fresh matrix.
pub fn head_rows(data: &DataMatrix, n: usize) -> DataMatrix {
    let mut features = Vec::with_capacity(n * data.n_cols());
    let mut labels = Vec::with_capacity(n);
    for row in 0..n {
        features.extend_from_slice(data.row(row));
        if !data.labels().is_empty() {
            labels.push(data.labels()[row]);
        }
    }
    DataMatrix::from_parts(features, labels, n, data.n_cols()).unwrap()
}

/// Rows `from..` of `data` as a fresh matrix.
pub fn tail_rows(data: &DataMatrix, from: usize) -> DataMatrix {
    let n = data.n_rows() - from;
    let mut features = Vec::with_capacity(n * data.n_cols());
    let mut labels = Vec::with_capacity(n);
    for row in from..data.n_rows() {
        features.extend_from_slice(data.row(row));
        if !data.labels().is_empty() {
            labels.push(data.labels()[row]);
        }
    }
    DataMatrix::from_parts(features, labels, n, data.n_cols()).unwrap()
}

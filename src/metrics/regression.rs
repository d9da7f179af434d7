//! Regression metrics.

/// Root mean squared error.
pub fn rmse(labels: &[f32], predictions: &[f32]) -> f32 {
    if labels.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = labels
        .iter()
        .zip(predictions)
        .map(|(&y, &p)| {
            let d = (p - y) as f64;
            d * d
        })
        .sum();
    (sum_sq / labels.len() as f64).sqrt() as f32
}

/// Mean absolute error.
pub fn mae(labels: &[f32], predictions: &[f32]) -> f32 {
    if labels.is_empty() {
        return 0.0;
    }
    let sum_abs: f64 = labels
        .iter()
        .zip(predictions)
        .map(|(&y, &p)| ((p - y) as f64).abs())
        .sum();
    (sum_abs / labels.len() as f64) as f32
}

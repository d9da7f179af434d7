//! Elementwise gradient/hessian computation for the two objectives.
//!
//! Rows are independent, so the buffers are cut into chunks processed in
//! parallel by rayon; inside a chunk the logistic objective runs 8 lanes
//! at a time when the `simd` feature is on.
//!
//! - Binary:     `p = sigmoid(pred)`, `g = p - y`, `h = p * (1 - p)`
//! - Regression: `g = pred - y`, `h = 1`

use rayon::prelude::*;

/// Rows per parallel work item.
const CHUNK: usize = 4096;

/// Squared-error gradients: `g = pred - y`, `h = 1`.
pub fn regression_gradients(
    labels: &[f32],
    predictions: &[f32],
    gradients: &mut [f32],
    hessians: &mut [f32],
) {
    debug_assert_eq!(labels.len(), predictions.len());
    debug_assert_eq!(labels.len(), gradients.len());
    debug_assert_eq!(labels.len(), hessians.len());

    gradients
        .par_chunks_mut(CHUNK)
        .zip_eq(hessians.par_chunks_mut(CHUNK))
        .enumerate()
        .for_each(|(chunk, (grad_out, hess_out))| {
            let offset = chunk * CHUNK;
            let labels = &labels[offset..offset + grad_out.len()];
            let preds = &predictions[offset..offset + grad_out.len()];
            for i in 0..grad_out.len() {
                grad_out[i] = preds[i] - labels[i];
                hess_out[i] = 1.0;
            }
        });
}

/// Logistic gradients: `g = sigmoid(pred) - y`, `h = p * (1 - p)`.
pub fn binary_gradients(
    labels: &[f32],
    predictions: &[f32],
    gradients: &mut [f32],
    hessians: &mut [f32],
) {
    debug_assert_eq!(labels.len(), predictions.len());
    debug_assert_eq!(labels.len(), gradients.len());
    debug_assert_eq!(labels.len(), hessians.len());

    gradients
        .par_chunks_mut(CHUNK)
        .zip_eq(hessians.par_chunks_mut(CHUNK))
        .enumerate()
        .for_each(|(chunk, (grad_out, hess_out))| {
            let offset = chunk * CHUNK;
            let labels = &labels[offset..offset + grad_out.len()];
            let preds = &predictions[offset..offset + grad_out.len()];
            binary_chunk(labels, preds, grad_out, hess_out);
        });
}

#[cfg(feature = "simd")]
fn binary_chunk(labels: &[f32], preds: &[f32], grad_out: &mut [f32], hess_out: &mut [f32]) {
    use wide::f32x8;

    const LANES: usize = 8;
    let n = grad_out.len();
    let aligned = n - n % LANES;

    let one = f32x8::ONE;
    let mut i = 0;
    while i < aligned {
        let pred: [f32; LANES] = preds[i..i + LANES].try_into().unwrap();
        let label: [f32; LANES] = labels[i..i + LANES].try_into().unwrap();
        let pred = f32x8::from(pred);
        let label = f32x8::from(label);

        let prob = one / (one + (-pred).exp());
        let grad = prob - label;
        let hess = prob * (one - prob);

        grad_out[i..i + LANES].copy_from_slice(&grad.to_array());
        hess_out[i..i + LANES].copy_from_slice(&hess.to_array());
        i += LANES;
    }

    for i in aligned..n {
        let prob = sigmoid(preds[i]);
        grad_out[i] = prob - labels[i];
        hess_out[i] = prob * (1.0 - prob);
    }
}

#[cfg(not(feature = "simd"))]
fn binary_chunk(labels: &[f32], preds: &[f32], grad_out: &mut [f32], hess_out: &mut [f32]) {
    for i in 0..grad_out.len() {
        let prob = sigmoid(preds[i]);
        grad_out[i] = prob - labels[i];
        hess_out[i] = prob * (1.0 - prob);
    }
}

/// Logistic link.
#[inline]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn regression_gradient_is_residual() {
        let labels = [1.0, 2.0, 3.0];
        let preds = [1.5, 1.5, 1.5];
        let mut grads = [0.0; 3];
        let mut hess = [0.0; 3];
        regression_gradients(&labels, &preds, &mut grads, &mut hess);
        assert_abs_diff_eq!(grads[0], 0.5);
        assert_abs_diff_eq!(grads[1], -0.5);
        assert_abs_diff_eq!(grads[2], -1.5);
        assert_eq!(hess, [1.0; 3]);
    }

    #[test]
    fn binary_gradient_at_zero_score() {
        // sigmoid(0) = 0.5 -> g = 0.5 - y, h = 0.25
        let labels = [1.0, 0.0];
        let preds = [0.0, 0.0];
        let mut grads = [0.0; 2];
        let mut hess = [0.0; 2];
        binary_gradients(&labels, &preds, &mut grads, &mut hess);
        assert_abs_diff_eq!(grads[0], -0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(grads[1], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(hess[0], 0.25, epsilon = 1e-6);
        assert_abs_diff_eq!(hess[1], 0.25, epsilon = 1e-6);
    }

    #[test]
    fn binary_matches_scalar_reference_on_odd_lengths() {
        // 19 rows exercises the vector body and the tail together.
        let labels: Vec<f32> = (0..19).map(|i| (i % 2) as f32).collect();
        let preds: Vec<f32> = (0..19).map(|i| (i as f32 - 9.0) / 3.0).collect();
        let mut grads = vec![0.0; 19];
        let mut hess = vec![0.0; 19];
        binary_gradients(&labels, &preds, &mut grads, &mut hess);

        for i in 0..19 {
            let p = sigmoid(preds[i]);
            assert_abs_diff_eq!(grads[i], p - labels[i], epsilon = 1e-5);
            assert_abs_diff_eq!(hess[i], p * (1.0 - p), epsilon = 1e-5);
        }
    }

    #[test]
    fn sigmoid_saturates_cleanly() {
        assert!(sigmoid(40.0) > 0.999_999);
        assert!(sigmoid(-40.0) < 1e-6);
        assert_abs_diff_eq!(sigmoid(0.0), 0.5);
    }
}

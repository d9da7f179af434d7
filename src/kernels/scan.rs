//! Best-split scan over a per-feature histogram.
//!
//! Candidate split after bin `b` puts bins `0..=b` on the left. The
//! scan keeps running left-side sums, gates both children on
//! `min_child_weight`, and scores
//!
//! ```text
//! gain = Lg^2/(Lh + lambda) + Rg^2/(Rh + lambda) - G^2/(H + lambda)
//! ```
//!
//! Every variant subtracts the parent term, so the gain stored on tree
//! nodes is comparable across nodes. Ties resolve to the lowest bin:
//! a later candidate replaces the best only on strictly greater gain.
//!
//! The vectorized variants first materialize the prefix sums (the scan
//! is inherently sequential), then evaluate the gain formula over 8
//! (wide) or 4 (narrow) candidate bins per step, with the child-weight
//! mask deciding which lanes may compete for the argmax.

#[cfg(feature = "simd")]
use wide::{f32x4, f32x8, CmpGe};

/// Outcome of a scan: the best candidate bin and its left-side sums.
///
/// `gain == -inf` means no candidate passed the constraints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanResult {
    pub gain: f32,
    pub bin: u32,
    pub left_grad: f32,
    pub left_hess: f32,
}

impl ScanResult {
    pub fn none() -> Self {
        Self {
            gain: f32::NEG_INFINITY,
            bin: 0,
            left_grad: 0.0,
            left_hess: 0.0,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.gain > f32::NEG_INFINITY
    }
}

/// Scan with the variant selected at build time.
#[inline]
pub fn find_best_split(
    grad_hist: &[f32],
    hess_hist: &[f32],
    sum_grad: f32,
    sum_hess: f32,
    min_child_weight: f32,
    reg_lambda: f32,
) -> ScanResult {
    #[cfg(feature = "simd")]
    {
        find_best_split_wide(
            grad_hist,
            hess_hist,
            sum_grad,
            sum_hess,
            min_child_weight,
            reg_lambda,
        )
    }
    #[cfg(not(feature = "simd"))]
    {
        find_best_split_scalar(
            grad_hist,
            hess_hist,
            sum_grad,
            sum_hess,
            min_child_weight,
            reg_lambda,
        )
    }
}

/// Scalar fallback: running sums, one candidate per iteration.
pub fn find_best_split_scalar(
    grad_hist: &[f32],
    hess_hist: &[f32],
    sum_grad: f32,
    sum_hess: f32,
    min_child_weight: f32,
    reg_lambda: f32,
) -> ScanResult {
    let parent = sum_grad * sum_grad / (sum_hess + reg_lambda);
    let mut best = ScanResult::none();

    let mut left_grad = 0.0f32;
    let mut left_hess = 0.0f32;

    for bin in 0..grad_hist.len() {
        left_grad += grad_hist[bin];
        left_hess += hess_hist[bin];

        let right_grad = sum_grad - left_grad;
        let right_hess = sum_hess - left_hess;

        if left_hess < min_child_weight || right_hess < min_child_weight {
            continue;
        }

        let gain = left_grad * left_grad / (left_hess + reg_lambda)
            + right_grad * right_grad / (right_hess + reg_lambda)
            - parent;

        if gain > best.gain {
            best = ScanResult {
                gain,
                bin: bin as u32,
                left_grad,
                left_hess,
            };
        }
    }

    best
}

/// Prefix sums shared by the vectorized variants.
#[cfg(feature = "simd")]
fn prefix_sums(grad_hist: &[f32], hess_hist: &[f32]) -> (Vec<f32>, Vec<f32>) {
    let n = grad_hist.len();
    let mut prefix_grad = vec![0.0f32; n];
    let mut prefix_hess = vec![0.0f32; n];
    let mut acc_grad = 0.0f32;
    let mut acc_hess = 0.0f32;
    for bin in 0..n {
        acc_grad += grad_hist[bin];
        acc_hess += hess_hist[bin];
        prefix_grad[bin] = acc_grad;
        prefix_hess[bin] = acc_hess;
    }
    (prefix_grad, prefix_hess)
}

/// Wide variant: 8 candidate bins per step.
#[cfg(feature = "simd")]
pub fn find_best_split_wide(
    grad_hist: &[f32],
    hess_hist: &[f32],
    sum_grad: f32,
    sum_hess: f32,
    min_child_weight: f32,
    reg_lambda: f32,
) -> ScanResult {
    const LANES: usize = 8;

    let n = grad_hist.len();
    let (prefix_grad, prefix_hess) = prefix_sums(grad_hist, hess_hist);
    let parent = sum_grad * sum_grad / (sum_hess + reg_lambda);

    let lambda_v = f32x8::splat(reg_lambda);
    let sum_grad_v = f32x8::splat(sum_grad);
    let sum_hess_v = f32x8::splat(sum_hess);
    let mcw_v = f32x8::splat(min_child_weight);
    let parent_v = f32x8::splat(parent);

    let mut best = ScanResult::none();

    let mut bin = 0usize;
    while bin + LANES <= n {
        let lg: [f32; LANES] = prefix_grad[bin..bin + LANES].try_into().unwrap();
        let lh: [f32; LANES] = prefix_hess[bin..bin + LANES].try_into().unwrap();
        let left_grad = f32x8::from(lg);
        let left_hess = f32x8::from(lh);
        let right_grad = sum_grad_v - left_grad;
        let right_hess = sum_hess_v - left_hess;

        // Mask lanes are all-ones (NaN as f32) when valid, zero otherwise.
        let valid = (left_hess.cmp_ge(mcw_v) & right_hess.cmp_ge(mcw_v)).to_array();
        let gains = left_grad * left_grad / (left_hess + lambda_v)
            + right_grad * right_grad / (right_hess + lambda_v)
            - parent_v;

        for (lane, &gain) in gains.to_array().iter().enumerate() {
            if valid[lane] != 0.0 && gain > best.gain {
                best = ScanResult {
                    gain,
                    bin: (bin + lane) as u32,
                    left_grad: prefix_grad[bin + lane],
                    left_hess: prefix_hess[bin + lane],
                };
            }
        }

        bin += LANES;
    }

    scan_tail(
        &prefix_grad,
        &prefix_hess,
        bin,
        sum_grad,
        sum_hess,
        min_child_weight,
        reg_lambda,
        parent,
        &mut best,
    );

    best
}

/// Narrow variant: 4 candidate bins per step.
#[cfg(feature = "simd")]
pub fn find_best_split_narrow(
    grad_hist: &[f32],
    hess_hist: &[f32],
    sum_grad: f32,
    sum_hess: f32,
    min_child_weight: f32,
    reg_lambda: f32,
) -> ScanResult {
    const LANES: usize = 4;

    let n = grad_hist.len();
    let (prefix_grad, prefix_hess) = prefix_sums(grad_hist, hess_hist);
    let parent = sum_grad * sum_grad / (sum_hess + reg_lambda);

    let lambda_v = f32x4::splat(reg_lambda);
    let sum_grad_v = f32x4::splat(sum_grad);
    let sum_hess_v = f32x4::splat(sum_hess);
    let mcw_v = f32x4::splat(min_child_weight);
    let parent_v = f32x4::splat(parent);

    let mut best = ScanResult::none();

    let mut bin = 0usize;
    while bin + LANES <= n {
        let lg: [f32; LANES] = prefix_grad[bin..bin + LANES].try_into().unwrap();
        let lh: [f32; LANES] = prefix_hess[bin..bin + LANES].try_into().unwrap();
        let left_grad = f32x4::from(lg);
        let left_hess = f32x4::from(lh);
        let right_grad = sum_grad_v - left_grad;
        let right_hess = sum_hess_v - left_hess;

        let valid = (left_hess.cmp_ge(mcw_v) & right_hess.cmp_ge(mcw_v)).to_array();
        let gains = left_grad * left_grad / (left_hess + lambda_v)
            + right_grad * right_grad / (right_hess + lambda_v)
            - parent_v;

        for (lane, &gain) in gains.to_array().iter().enumerate() {
            if valid[lane] != 0.0 && gain > best.gain {
                best = ScanResult {
                    gain,
                    bin: (bin + lane) as u32,
                    left_grad: prefix_grad[bin + lane],
                    left_hess: prefix_hess[bin + lane],
                };
            }
        }

        bin += LANES;
    }

    scan_tail(
        &prefix_grad,
        &prefix_hess,
        bin,
        sum_grad,
        sum_hess,
        min_child_weight,
        reg_lambda,
        parent,
        &mut best,
    );

    best
}

/// Scalar tail over the prefix arrays for bins the vector loop missed.
#[cfg(feature = "simd")]
#[allow(clippy::too_many_arguments)]
fn scan_tail(
    prefix_grad: &[f32],
    prefix_hess: &[f32],
    start: usize,
    sum_grad: f32,
    sum_hess: f32,
    min_child_weight: f32,
    reg_lambda: f32,
    parent: f32,
    best: &mut ScanResult,
) {
    for bin in start..prefix_grad.len() {
        let left_grad = prefix_grad[bin];
        let left_hess = prefix_hess[bin];
        let right_grad = sum_grad - left_grad;
        let right_hess = sum_hess - left_hess;

        if left_hess < min_child_weight || right_hess < min_child_weight {
            continue;
        }

        let gain = left_grad * left_grad / (left_hess + reg_lambda)
            + right_grad * right_grad / (right_hess + reg_lambda)
            - parent;

        if gain > best.gain {
            *best = ScanResult {
                gain,
                bin: bin as u32,
                left_grad,
                left_hess,
            };
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

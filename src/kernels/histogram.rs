//! Per-feature gradient/hessian histogram accumulation.
//!
//! The inner loop is a gather over a row-index set: bin indices come
//! from the row-major binned matrix, gradients and hessians from the
//! per-row buffers. Scatter-adds into the histogram defeat lane-parallel
//! stores, so this kernel batches four rows per iteration and leaves
//! lane parallelism to the scan and objective kernels.

/// Accumulate gradient and hessian histograms for one feature over the
/// rows in `rows`.
///
/// `grad_hist` / `hess_hist` must both be `n_bins` long; they are
/// cleared first. Bin indices must be `< n_bins` for every row.
pub fn gradient_histogram(
    binned: &[u8],
    n_cols: usize,
    feature: usize,
    rows: &[u32],
    gradients: &[f32],
    hessians: &[f32],
    grad_hist: &mut [f32],
    hess_hist: &mut [f32],
) {
    debug_assert_eq!(grad_hist.len(), hess_hist.len());

    grad_hist.fill(0.0);
    hess_hist.fill(0.0);

    let mut quads = rows.chunks_exact(4);
    for quad in &mut quads {
        let b0 = binned[quad[0] as usize * n_cols + feature] as usize;
        let b1 = binned[quad[1] as usize * n_cols + feature] as usize;
        let b2 = binned[quad[2] as usize * n_cols + feature] as usize;
        let b3 = binned[quad[3] as usize * n_cols + feature] as usize;

        grad_hist[b0] += gradients[quad[0] as usize];
        grad_hist[b1] += gradients[quad[1] as usize];
        grad_hist[b2] += gradients[quad[2] as usize];
        grad_hist[b3] += gradients[quad[3] as usize];

        hess_hist[b0] += hessians[quad[0] as usize];
        hess_hist[b1] += hessians[quad[1] as usize];
        hess_hist[b2] += hessians[quad[2] as usize];
        hess_hist[b3] += hessians[quad[3] as usize];
    }

    for &row in quads.remainder() {
        let row = row as usize;
        let bin = binned[row * n_cols + feature] as usize;
        grad_hist[bin] += gradients[row];
        hess_hist[bin] += hessians[row];
    }
}

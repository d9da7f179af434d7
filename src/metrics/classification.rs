//! Binary classification metrics.
//!
//! Both metrics take predicted probabilities in [0, 1] and 0/1 labels.

/// Probability clamp for logloss; keeps log() finite at the extremes.
const EPS: f32 = 1e-7;

/// Binary cross-entropy.
pub fn logloss(labels: &[f32], predictions: &[f32]) -> f32 {
    if labels.is_empty() {
        return 0.0;
    }
    let sum: f64 = labels
        .iter()
        .zip(predictions)
        .map(|(&y, &p)| {
            let p = p.clamp(EPS, 1.0 - EPS) as f64;
            let y = y as f64;
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
        .sum();
    (sum / labels.len() as f64) as f32
}

/// Area under the ROC curve, computed by the rank-sum (Mann-Whitney)
/// formulation with tied predictions receiving their average rank.
///
/// Degenerate inputs with a single class have no ROC curve; this returns
/// 0.5 so aggregated scores (CV means) stay finite.
pub fn auc(labels: &[f32], predictions: &[f32]) -> f32 {
    let n = labels.len();
    if n == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        predictions[a]
            .partial_cmp(&predictions[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut rank_sum_pos = 0.0f64;
    let mut n_pos = 0u64;

    // Walk runs of tied predictions; every element of a run gets the
    // run's average rank (1-based).
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j < n && predictions[order[j]] == predictions[order[i]] {
            j += 1;
        }
        let avg_rank = (i + 1 + j) as f64 / 2.0;
        for &idx in &order[i..j] {
            if labels[idx] > 0.5 {
                rank_sum_pos += avg_rank;
                n_pos += 1;
            }
        }
        i = j;
    }

    let n_neg = n as u64 - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.5;
    }

    let auc = (rank_sum_pos - (n_pos * (n_pos + 1)) as f64 / 2.0) / (n_pos * n_neg) as f64;
    auc as f32
}

//! Variance reduction for engagement scores.

const VARIANCE_EPSILON: f64 = 1e-10;

/// Linear-interpolation percentile of a sample (the numpy convention).
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = (pct / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let frac = rank - lo as f64;
    if lo + 1 >= n {
        sorted[n - 1]
    } else {
        sorted[lo] + frac * (sorted[lo + 1] - sorted[lo])
    }
}

/// Cap outlier scores at the given upper percentile of the same sample.
/// Never raises a value.
pub fn winsorize_scores(scores: &[f64], pct: f64) -> Vec<f64> {
    if scores.is_empty() {
        return Vec::new();
    }
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let cap = percentile(&sorted, pct);
    scores.iter().map(|s| s.min(cap)).collect()
}

/// CUPED adjustment: `Y - theta * (X - mean(X))` with
/// `theta = cov(Y, X) / var(X)`.
///
/// Falls back to the unadjusted scores on length mismatch, empty input,
/// or a numerically zero pre-score variance.
pub fn cuped_adjust(scores: &[f64], pre_scores: &[f64]) -> Vec<f64> {
    if scores.is_empty() || pre_scores.is_empty() || scores.len() != pre_scores.len() {
        return scores.to_vec();
    }
    let n = scores.len() as f64;
    let mean_x = pre_scores.iter().sum::<f64>() / n;
    let var_x = pre_scores.iter().map(|x| (x - mean_x).powi(2)).sum::<f64>() / n;
    if var_x < VARIANCE_EPSILON {
        return scores.to_vec();
    }
    let mean_y = scores.iter().sum::<f64>() / n;
    let cov = scores
        .iter()
        .zip(pre_scores)
        .map(|(y, x)| (y - mean_y) * (x - mean_x))
        .sum::<f64>()
        / n;
    let theta = cov / var_x;
    scores
        .iter()
        .zip(pre_scores)
        .map(|(y, x)| y - theta * (x - mean_x))
        .collect()
}

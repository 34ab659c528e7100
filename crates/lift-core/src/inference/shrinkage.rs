//! James-Stein shrinkage across a project's experiments.
//!
//! Raw effect sizes from completed experiments overestimate future
//! performance (winner's curse). Shrinking each estimate toward the grand
//! mean trades a little bias for a large reduction in aggregate error.

const SS_EPSILON: f64 = 1e-10;

/// Minimum number of effects before shrinkage is meaningful.
pub const MIN_EFFECTS_FOR_SHRINKAGE: usize = 3;

/// Apply James-Stein shrinkage toward the grand mean.
///
/// With fewer than three effects, or a near-zero spread, the input is
/// returned unchanged. The shrinkage factor is
/// `B = max(0, 1 - (n-2) * mean(se^2) / sum((e - grand_mean)^2))`;
/// shrunk values are never farther from the grand mean than the raw ones
/// and relative ranking is preserved.
pub fn james_stein_shrink(effects: &[f64], standard_errors: &[f64]) -> Vec<f64> {
    let n = effects.len();
    if n < MIN_EFFECTS_FOR_SHRINKAGE || standard_errors.len() != n {
        return effects.to_vec();
    }

    let grand_mean = effects.iter().sum::<f64>() / n as f64;
    let mean_se_sq = standard_errors.iter().map(|se| se * se).sum::<f64>() / n as f64;
    let ss = effects
        .iter()
        .map(|e| (e - grand_mean).powi(2))
        .sum::<f64>();
    if ss < SS_EPSILON {
        return effects.to_vec();
    }

    let factor = (1.0 - (n as f64 - 2.0) * mean_se_sq / ss).max(0.0);
    effects
        .iter()
        .map(|e| grand_mean + factor * (e - grand_mean))
        .collect()
}

/// Shrink the current experiment's effect using project history.
///
/// Appends the current effect to the past ones, applies James-Stein, and
/// returns the shrunk value for the current experiment. `None` with fewer
/// than three effects in total. Past experiments are assumed to carry a
/// standard error comparable to the current one.
pub fn shrink_current_effect(
    past_effects: &[f64],
    current_effect: f64,
    current_se: f64,
) -> Option<f64> {
    let mut effects = past_effects.to_vec();
    effects.push(current_effect);
    if effects.len() < MIN_EFFECTS_FOR_SHRINKAGE {
        return None;
    }
    let ses = vec![current_se; effects.len()];
    james_stein_shrink(&effects, &ses).last().copied()
}

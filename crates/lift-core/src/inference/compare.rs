//! Monte Carlo comparators over variant posteriors.
//!
//! Each posterior has closed-form summaries on its own; quantities that
//! compare variants (probability of being best, expected loss, difference
//! intervals) do not. These estimators draw matched sample rounds from a
//! single seeded generator per call, so results are reproducible for a
//! given seed and comparisons across variants share their randomness.

use crate::inference::posterior::Posterior;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

/// Default draw count for probability and loss estimators.
pub const DEFAULT_COMPARISON_SAMPLES: usize = 50_000;

/// Errors raised by the comparators.
#[derive(Debug, Error)]
pub enum CompareError {
    #[error("at least one posterior model is required")]
    NoModels,
}

/// Draw one sample column per model, all from the same generator.
///
/// Returned as one `Vec` per model, each of length `n_samples`. Shared by
/// the probability-best, expected-loss, and allocation estimators.
pub fn draw_sample_matrix(
    models: &[Posterior],
    n_samples: usize,
    rng: &mut StdRng,
) -> Vec<Vec<f64>> {
    models
        .iter()
        .map(|model| model.sample_with(rng, n_samples))
        .collect()
}

/// Monte Carlo estimate of P(rate_B > rate_A).
pub fn probability_b_beats_a(a: &Posterior, b: &Posterior, n_samples: usize, seed: u64) -> f64 {
    let n = n_samples.max(1);
    let mut rng = StdRng::seed_from_u64(seed);
    let samples_a = a.sample_with(&mut rng, n);
    let samples_b = b.sample_with(&mut rng, n);
    let wins = samples_a
        .iter()
        .zip(&samples_b)
        .filter(|(sa, sb)| sb > sa)
        .count();
    wins as f64 / n as f64
}

/// Monte Carlo estimate of P(variant i is best) for each variant.
///
/// The returned fractions sum to ~1. With no observations anywhere this
/// degenerates to a near-uniform prior-only comparison, which is the
/// intended behavior, not an error.
pub fn probability_best(
    models: &[Posterior],
    n_samples: usize,
    seed: u64,
) -> Result<Vec<f64>, CompareError> {
    if models.is_empty() {
        return Err(CompareError::NoModels);
    }
    let n = n_samples.max(1);
    let mut rng = StdRng::seed_from_u64(seed);
    let columns = draw_sample_matrix(models, n, &mut rng);

    let mut wins = vec![0u64; models.len()];
    for row in 0..n {
        let mut best = 0;
        for (j, column) in columns.iter().enumerate().skip(1) {
            if column[row] > columns[best][row] {
                best = j;
            }
        }
        wins[best] += 1;
    }
    Ok(wins.iter().map(|w| *w as f64 / n as f64).collect())
}

/// Expected loss (regret) per variant: E[max_j(theta_j) - theta_i].
///
/// Always non-negative; the best-performing variant carries the lowest
/// loss. A lower value means less risk in committing to that variant.
pub fn expected_loss(
    models: &[Posterior],
    n_samples: usize,
    seed: u64,
) -> Result<Vec<f64>, CompareError> {
    if models.is_empty() {
        return Err(CompareError::NoModels);
    }
    let n = n_samples.max(1);
    let mut rng = StdRng::seed_from_u64(seed);
    let columns = draw_sample_matrix(models, n, &mut rng);

    let mut totals = vec![0.0f64; models.len()];
    for row in 0..n {
        let best = columns
            .iter()
            .map(|column| column[row])
            .fold(f64::NEG_INFINITY, f64::max);
        for (j, column) in columns.iter().enumerate() {
            totals[j] += best - column[row];
        }
    }
    Ok(totals.iter().map(|t| t / n as f64).collect())
}

/// Highest density interval from Monte Carlo samples.
///
/// Sorts the draws and slides a fixed-size index window across them,
/// returning the narrowest window covering `credible_mass` of the sample.
pub fn hdi_from_samples(samples: &[f64], credible_mass: f64) -> (f64, f64) {
    if samples.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    let window = ((credible_mass * n as f64).ceil() as usize).max(1);
    if window >= n {
        return (sorted[0], sorted[n - 1]);
    }

    let mut best_start = 0;
    let mut best_width = f64::INFINITY;
    for start in 0..=(n - window) {
        let width = sorted[start + window - 1] - sorted[start];
        if width < best_width {
            best_width = width;
            best_start = start;
        }
    }
    (sorted[best_start], sorted[best_start + window - 1])
}

/// HDI of the Monte Carlo difference distribution `B - A`.
pub fn difference_hdi(
    a: &Posterior,
    b: &Posterior,
    credible_mass: f64,
    n_samples: usize,
    seed: u64,
) -> (f64, f64) {
    let n = n_samples.max(1);
    let mut rng = StdRng::seed_from_u64(seed);
    let samples_a = a.sample_with(&mut rng, n);
    let samples_b = b.sample_with(&mut rng, n);
    let diffs: Vec<f64> = samples_b
        .iter()
        .zip(&samples_a)
        .map(|(sb, sa)| sb - sa)
        .collect();
    hdi_from_samples(&diffs, credible_mass)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    fn model(conversions: u64, visitors: u64) -> Posterior {
        Posterior::platform_default()
            .update(conversions, visitors)
            .expect("valid counts")
    }

    #[test]
    fn clear_winner_beats_baseline() {
        let p = probability_b_beats_a(&model(2, 100), &model(20, 100), 50_000, 42);
        assert!(p > 0.99, "got {p}");
    }

    #[test]
    fn prior_only_comparison_is_a_coin_flip() {
        let p = probability_b_beats_a(&model(0, 0), &model(0, 0), 50_000, 42);
        assert!(approx_eq(p, 0.5, 0.03), "got {p}");
    }

    #[test]
    fn probability_best_uniform_for_identical_models() {
        let models = vec![model(5, 100); 4];
        let probs = probability_best(&models, 50_000, 42).expect("non-empty");
        for p in &probs {
            assert!(approx_eq(*p, 0.25, 0.02), "got {probs:?}");
        }
    }

    #[test]
    fn probability_best_sums_to_one() {
        let models = vec![model(2, 100), model(9, 100), model(5, 100)];
        let probs = probability_best(&models, 20_000, 7).expect("non-empty");
        assert!(approx_eq(probs.iter().sum::<f64>(), 1.0, 1e-9));
    }

    #[test]
    fn probability_best_rejects_empty_input() {
        assert!(matches!(
            probability_best(&[], 1000, 42),
            Err(CompareError::NoModels)
        ));
    }

    #[test]
    fn expected_loss_nonnegative_and_ranked() {
        let models = vec![model(2, 100), model(20, 100)];
        let losses = expected_loss(&models, 50_000, 137).expect("non-empty");
        assert!(losses.iter().all(|l| *l >= 0.0));
        // Higher posterior mean carries lower regret.
        assert!(losses[1] < losses[0]);
    }

    #[test]
    fn expected_loss_is_deterministic_for_a_seed() {
        let models = vec![model(3, 50), model(4, 50)];
        let a = expected_loss(&models, 10_000, 9).expect("non-empty");
        let b = expected_loss(&models, 10_000, 9).expect("non-empty");
        assert_eq!(a, b);
    }

    #[test]
    fn hdi_from_samples_covers_requested_mass() {
        let draws = model(5, 95).sample(100_000, 42);
        let (lo, hi) = hdi_from_samples(&draws, 0.95);
        let covered = draws.iter().filter(|v| **v >= lo && **v <= hi).count() as f64
            / draws.len() as f64;
        assert!(approx_eq(covered, 0.95, 0.02), "covered {covered}");
    }

    #[test]
    fn hdi_from_samples_degenerate_inputs() {
        let (lo, hi) = hdi_from_samples(&[0.4], 0.95);
        assert_eq!((lo, hi), (0.4, 0.4));
        let (lo, hi) = hdi_from_samples(&[], 0.95);
        assert!(lo.is_nan() && hi.is_nan());
    }

    #[test]
    fn difference_hdi_spans_zero_for_identical_models() {
        let (lo, hi) = difference_hdi(&model(5, 100), &model(5, 100), 0.95, 50_000, 42);
        assert!(lo < 0.0 && hi > 0.0);
    }

    #[test]
    fn difference_hdi_positive_for_clear_winner() {
        let (lo, _hi) = difference_hdi(&model(2, 100), &model(20, 100), 0.95, 50_000, 42);
        assert!(lo > 0.0, "lower bound {lo}");
    }
}

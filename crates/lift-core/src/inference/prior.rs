//! Prior resolution for experiment analysis.
//!
//! Three sources of prior information, in strict priority order:
//! 1. User-elicited: an expected rate plus a confidence (pseudo-observation
//!    count) from the experiment configuration.
//! 2. Project-historical: an empirical-Bayes moment-matched fit over the
//!    project's completed-experiment conversion rates.
//! 3. Platform default: Beta(1, 19).
//!
//! Invalid elicited values fall through to the next source rather than
//! failing the analysis; the standalone [`elicited_prior`] entry point
//! surfaces them as typed errors.

use crate::inference::posterior::Posterior;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Completed experiments required before the historical fit is trusted.
pub const MIN_HISTORY_FOR_FIT: usize = 3;

const ELICITED_FLOOR: f64 = 0.01;
const FIT_FLOOR: f64 = 0.1;
const FIT_CAP: f64 = 1000.0;
const WEAK_PRIOR_STRENGTH: f64 = 5.0;

/// Errors raised by the standalone prior constructors.
#[derive(Debug, Error)]
pub enum PriorError {
    #[error("expected rate must lie strictly between 0 and 1, got {rate}")]
    InvalidRate { rate: f64 },
    #[error("prior confidence must be positive, got {confidence}")]
    InvalidConfidence { confidence: f64 },
    #[error("moment matching needs at least 2 rates, got {count}")]
    NotEnoughRates { count: usize },
}

/// Where a resolved prior came from. Exactly one tag accompanies every
/// resolved prior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorProvenance {
    UserSpecified,
    ProjectHistorical,
    PlatformDefault,
}

/// An elicited rate + confidence pair from the experiment owner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ElicitedPrior {
    pub expected_rate: f64,
    pub confidence: f64,
}

/// A prior together with its provenance tag.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ResolvedPrior {
    pub model: Posterior,
    pub provenance: PriorProvenance,
}

/// Build a prior from a user-specified expected rate and confidence.
///
/// `alpha = rate * confidence`, `beta = (1 - rate) * confidence`, floored
/// at 0.01 each so extreme rates still produce a valid Beta.
pub fn elicited_prior(expected_rate: f64, confidence: f64) -> Result<Posterior, PriorError> {
    if !(expected_rate > 0.0 && expected_rate < 1.0) {
        return Err(PriorError::InvalidRate {
            rate: expected_rate,
        });
    }
    if !(confidence > 0.0 && confidence.is_finite()) {
        return Err(PriorError::InvalidConfidence { confidence });
    }
    let alpha = (expected_rate * confidence).max(ELICITED_FLOOR);
    let beta = ((1.0 - expected_rate) * confidence).max(ELICITED_FLOOR);
    // Both parameters are floored positive, so construction cannot fail.
    Posterior::new(alpha, beta).or(Ok(Posterior::platform_default()))
}

/// Fit Beta parameters to observed rates via moment matching.
///
/// Degenerate inputs produce defined fallbacks rather than errors: a mean
/// outside (0, 1) yields the platform default, and a variance that is
/// non-positive or too large for any Beta yields a weak prior centered at
/// the observed mean. Fitted parameters are clamped to [0.1, 1000].
pub fn fit_beta_moments(rates: &[f64]) -> Result<(f64, f64), PriorError> {
    if rates.len() < 2 {
        return Err(PriorError::NotEnoughRates { count: rates.len() });
    }
    let n = rates.len() as f64;
    let mean = rates.iter().sum::<f64>() / n;
    let variance = rates.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);

    if mean <= 0.0 || mean >= 1.0 {
        return Ok((
            crate::inference::posterior::PLATFORM_PRIOR_ALPHA,
            crate::inference::posterior::PLATFORM_PRIOR_BETA,
        ));
    }
    if variance <= 0.0 || variance >= mean * (1.0 - mean) {
        return Ok((
            mean * WEAK_PRIOR_STRENGTH,
            (1.0 - mean) * WEAK_PRIOR_STRENGTH,
        ));
    }

    let common = mean * (1.0 - mean) / variance - 1.0;
    let alpha = (mean * common).clamp(FIT_FLOOR, FIT_CAP);
    let beta = ((1.0 - mean) * common).clamp(FIT_FLOOR, FIT_CAP);
    Ok((alpha, beta))
}

/// Empirical-Bayes prior from a project's completed experiments, or
/// `None` when fewer than [`MIN_HISTORY_FOR_FIT`] usable rates exist.
/// Rates outside (0, 1) are discarded before fitting.
pub fn historical_prior(rates: &[f64]) -> Option<Posterior> {
    let usable: Vec<f64> = rates
        .iter()
        .copied()
        .filter(|r| *r > 0.0 && *r < 1.0)
        .collect();
    if usable.len() < MIN_HISTORY_FOR_FIT {
        return None;
    }
    let (alpha, beta) = fit_beta_moments(&usable).ok()?;
    Posterior::new(alpha, beta).ok()
}

/// Resolve the best available prior via the fallback chain.
pub fn resolve_prior(historical_rates: &[f64], elicited: Option<ElicitedPrior>) -> ResolvedPrior {
    if let Some(e) = elicited {
        match elicited_prior(e.expected_rate, e.confidence) {
            Ok(model) => {
                return ResolvedPrior {
                    model,
                    provenance: PriorProvenance::UserSpecified,
                }
            }
            Err(err) => debug!(%err, "ignoring invalid elicited prior"),
        }
    }
    if let Some(model) = historical_prior(historical_rates) {
        return ResolvedPrior {
            model,
            provenance: PriorProvenance::ProjectHistorical,
        };
    }
    ResolvedPrior {
        model: Posterior::platform_default(),
        provenance: PriorProvenance::PlatformDefault,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn elicited_basic_mapping() {
        // rate 0.05 at confidence 20 is exactly the platform default shape.
        let prior = elicited_prior(0.05, 20.0).expect("valid");
        assert!(approx_eq(prior.alpha(), 1.0, 1e-12));
        assert!(approx_eq(prior.beta(), 19.0, 1e-12));
    }

    #[test]
    fn elicited_mean_matches_rate() {
        let prior = elicited_prior(0.10, 40.0).expect("valid");
        assert!(approx_eq(prior.mean(), 0.10, 1e-12));
    }

    #[test]
    fn elicited_confidence_tightens_prior() {
        let loose = elicited_prior(0.05, 10.0).expect("valid");
        let tight = elicited_prior(0.05, 100.0).expect("valid");
        assert!(tight.variance() < loose.variance());
    }

    #[test]
    fn elicited_rejects_boundary_rates() {
        assert!(matches!(
            elicited_prior(0.0, 20.0),
            Err(PriorError::InvalidRate { .. })
        ));
        assert!(matches!(
            elicited_prior(1.0, 20.0),
            Err(PriorError::InvalidRate { .. })
        ));
    }

    #[test]
    fn elicited_rejects_non_positive_confidence() {
        assert!(matches!(
            elicited_prior(0.05, 0.0),
            Err(PriorError::InvalidConfidence { .. })
        ));
        assert!(matches!(
            elicited_prior(0.05, -3.0),
            Err(PriorError::InvalidConfidence { .. })
        ));
    }

    #[test]
    fn moment_matching_preserves_mean() {
        let rates = [0.04, 0.06, 0.05, 0.03, 0.07];
        let (alpha, beta) = fit_beta_moments(&rates).expect("enough rates");
        let sample_mean = rates.iter().sum::<f64>() / rates.len() as f64;
        assert!(approx_eq(alpha / (alpha + beta), sample_mean, 0.02));
    }

    #[test]
    fn moment_matching_needs_two_rates() {
        assert!(matches!(
            fit_beta_moments(&[0.05]),
            Err(PriorError::NotEnoughRates { count: 1 })
        ));
    }

    #[test]
    fn moment_matching_zero_variance_falls_back_to_weak_prior() {
        let (alpha, beta) = fit_beta_moments(&[0.05, 0.05, 0.05]).expect("enough rates");
        assert!(alpha > 0.0 && beta > 0.0);
        assert!(approx_eq(alpha / (alpha + beta), 0.05, 1e-9));
    }

    #[test]
    fn moment_matching_degenerate_mean_falls_back_to_default() {
        let (alpha, beta) = fit_beta_moments(&[0.0, 0.0, 0.0]).expect("enough rates");
        assert_eq!((alpha, beta), (1.0, 19.0));
    }

    #[test]
    fn moment_matching_clamps_concentration() {
        // Tiny variance drives the fit toward huge pseudo-counts; the cap
        // keeps it at 1000.
        let rates = [0.05, 0.0500001, 0.0499999, 0.05];
        let (alpha, beta) = fit_beta_moments(&rates).expect("enough rates");
        assert!(alpha <= 1000.0 && beta <= 1000.0);
    }

    #[test]
    fn historical_prior_filters_unusable_rates() {
        // Only two usable rates survive the filter.
        assert!(historical_prior(&[0.0, 1.0, 0.05, 0.04]).is_none());
        assert!(historical_prior(&[0.05, 0.04, 0.06]).is_some());
    }

    #[test]
    fn resolve_prefers_elicited() {
        let resolved = resolve_prior(
            &[0.03, 0.05, 0.04],
            Some(ElicitedPrior {
                expected_rate: 0.2,
                confidence: 10.0,
            }),
        );
        assert_eq!(resolved.provenance, PriorProvenance::UserSpecified);
        assert!(approx_eq(resolved.model.mean(), 0.2, 1e-12));
    }

    #[test]
    fn resolve_invalid_elicited_falls_through_to_history() {
        let resolved = resolve_prior(
            &[0.03, 0.05, 0.04, 0.06],
            Some(ElicitedPrior {
                expected_rate: 1.5,
                confidence: 10.0,
            }),
        );
        assert_eq!(resolved.provenance, PriorProvenance::ProjectHistorical);
    }

    #[test]
    fn resolve_historical_mean_tracks_sample_mean() {
        let rates = [0.03, 0.05, 0.04, 0.06, 0.05];
        let resolved = resolve_prior(&rates, None);
        assert_eq!(resolved.provenance, PriorProvenance::ProjectHistorical);
        let sample_mean = rates.iter().sum::<f64>() / rates.len() as f64;
        assert!(approx_eq(resolved.model.mean(), sample_mean, 0.02));
    }

    #[test]
    fn resolve_defaults_without_history() {
        let resolved = resolve_prior(&[], None);
        assert_eq!(resolved.provenance, PriorProvenance::PlatformDefault);
        assert_eq!(resolved.model.mean(), 0.05);
    }
}

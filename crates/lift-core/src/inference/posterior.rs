//! Conjugate Beta-Binomial posterior over a variant's conversion rate.
//!
//! The model is an immutable value type: `update` returns a *new*
//! `Posterior`, so callers can hold pre- and post-update beliefs side by
//! side. Conjugacy keeps updates O(1) and exact; Monte Carlo is reserved
//! for cross-variant quantities that have no closed form (see
//! [`crate::inference::compare`]).

use lift_math::{beta_mean, beta_quantile, beta_variance};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Beta as BetaDist, Distribution};
use serde::Serialize;
use thiserror::Error;

/// Platform default prior Beta(1, 19), encoding a ~5% expected
/// conversion rate typical of web funnels.
pub const PLATFORM_PRIOR_ALPHA: f64 = 1.0;
pub const PLATFORM_PRIOR_BETA: f64 = 19.0;

/// Errors raised by posterior construction and summaries.
#[derive(Debug, Error)]
pub enum PosteriorError {
    #[error("posterior parameters must be finite and positive: alpha={alpha}, beta={beta}")]
    InvalidParameters { alpha: f64, beta: f64 },
    #[error("conversions ({successes}) cannot exceed visitors ({trials})")]
    SuccessesExceedTrials { successes: u64, trials: u64 },
    #[error("interval width must lie strictly between 0 and 1, got {width}")]
    InvalidWidth { width: f64 },
    #[error("credible mass must lie strictly between 0 and 1, got {mass}")]
    InvalidMass { mass: f64 },
}

/// Immutable Beta posterior over a conversion probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Posterior {
    alpha: f64,
    beta: f64,
}

impl Posterior {
    /// Build a posterior from explicit Beta parameters.
    pub fn new(alpha: f64, beta: f64) -> Result<Self, PosteriorError> {
        if !(alpha.is_finite() && beta.is_finite() && alpha > 0.0 && beta > 0.0) {
            return Err(PosteriorError::InvalidParameters { alpha, beta });
        }
        Ok(Self { alpha, beta })
    }

    /// The platform default prior: Beta(1, 19), mean exactly 1/20.
    pub fn platform_default() -> Self {
        Self {
            alpha: PLATFORM_PRIOR_ALPHA,
            beta: PLATFORM_PRIOR_BETA,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Conjugate update: returns a new posterior after observing
    /// `successes` conversions out of `trials` visitors. The receiver is
    /// left untouched.
    pub fn update(&self, successes: u64, trials: u64) -> Result<Self, PosteriorError> {
        if successes > trials {
            return Err(PosteriorError::SuccessesExceedTrials { successes, trials });
        }
        Ok(Self {
            alpha: self.alpha + successes as f64,
            beta: self.beta + (trials - successes) as f64,
        })
    }

    /// Posterior mean: alpha / (alpha + beta).
    pub fn mean(&self) -> f64 {
        beta_mean(self.alpha, self.beta)
    }

    /// Posterior variance.
    pub fn variance(&self) -> f64 {
        beta_variance(self.alpha, self.beta)
    }

    /// Quantile of the posterior Beta distribution.
    pub fn quantile(&self, p: f64) -> f64 {
        beta_quantile(p, self.alpha, self.beta)
    }

    /// Equal-tailed credible interval at the given width (e.g. 0.95).
    pub fn credible_interval(&self, width: f64) -> Result<(f64, f64), PosteriorError> {
        if !(width > 0.0 && width < 1.0) {
            return Err(PosteriorError::InvalidWidth { width });
        }
        let tail = (1.0 - width) / 2.0;
        Ok((self.quantile(tail), self.quantile(1.0 - tail)))
    }

    /// Highest density interval: the narrowest interval holding
    /// `credible_mass` of the posterior.
    ///
    /// Minimizes `quantile(t + mass) - quantile(t)` over the lower-tail
    /// offset `t` with golden-section search; the width is unimodal in
    /// `t` for the unimodal Beta posteriors this engine produces.
    pub fn hdi(&self, credible_mass: f64) -> Result<(f64, f64), PosteriorError> {
        if !(credible_mass > 0.0 && credible_mass < 1.0) {
            return Err(PosteriorError::InvalidMass {
                mass: credible_mass,
            });
        }
        let width = |t: f64| self.quantile(t + credible_mass) - self.quantile(t);
        let inv_phi = (5.0_f64.sqrt() - 1.0) / 2.0;

        let mut lo = 0.0;
        let mut hi = 1.0 - credible_mass;
        let mut c = hi - inv_phi * (hi - lo);
        let mut d = lo + inv_phi * (hi - lo);
        let mut wc = width(c);
        let mut wd = width(d);
        for _ in 0..100 {
            if wc < wd {
                hi = d;
                d = c;
                wd = wc;
                c = hi - inv_phi * (hi - lo);
                wc = width(c);
            } else {
                lo = c;
                c = d;
                wc = wd;
                d = lo + inv_phi * (hi - lo);
                wd = width(d);
            }
            if hi - lo < 1e-10 {
                break;
            }
        }
        let t = 0.5 * (lo + hi);
        Ok((self.quantile(t), self.quantile(t + credible_mass)))
    }

    /// Draw one sample from the posterior.
    pub fn draw(&self, rng: &mut StdRng) -> f64 {
        match BetaDist::new(self.alpha, self.beta) {
            Ok(dist) => dist.sample(rng),
            // Unreachable for validated parameters; degrade to the mean.
            Err(_) => self.mean(),
        }
    }

    /// Draw `n` samples using the supplied generator.
    pub fn sample_with(&self, rng: &mut StdRng, n: usize) -> Vec<f64> {
        match BetaDist::new(self.alpha, self.beta) {
            Ok(dist) => (0..n).map(|_| dist.sample(rng)).collect(),
            Err(_) => vec![self.mean(); n],
        }
    }

    /// Draw `n` samples; deterministic for a given seed.
    pub fn sample(&self, n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.sample_with(&mut rng, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn platform_default_mean_is_one_twentieth() {
        let prior = Posterior::platform_default();
        assert_eq!(prior.mean(), 1.0 / 20.0);
    }

    #[test]
    fn new_rejects_non_positive_parameters() {
        assert!(Posterior::new(0.0, 19.0).is_err());
        assert!(Posterior::new(1.0, -2.0).is_err());
        assert!(Posterior::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn update_is_pure_and_conjugate() {
        let prior = Posterior::platform_default();
        let posterior = prior.update(7, 100).expect("valid update");
        assert_eq!(prior.alpha(), 1.0);
        assert_eq!(prior.beta(), 19.0);
        assert_eq!(posterior.alpha(), 8.0);
        assert_eq!(posterior.beta(), 112.0);
    }

    #[test]
    fn update_rejects_successes_over_trials() {
        let err = Posterior::platform_default().update(5, 3).unwrap_err();
        assert!(matches!(err, PosteriorError::SuccessesExceedTrials { .. }));
    }

    #[test]
    fn update_with_zero_trials_is_identity() {
        let prior = Posterior::platform_default();
        let same = prior.update(0, 0).expect("valid update");
        assert_eq!(prior, same);
    }

    #[test]
    fn variance_matches_closed_form() {
        let model = Posterior::new(2.0, 5.0).expect("valid");
        assert!(approx_eq(model.variance(), 10.0 / 392.0, 1e-13));
    }

    #[test]
    fn credible_interval_brackets_mean_and_widens() {
        let model = Posterior::platform_default().update(9, 200).expect("valid");
        let mean = model.mean();
        let (lo95, hi95) = model.credible_interval(0.95).expect("valid width");
        let (lo50, hi50) = model.credible_interval(0.50).expect("valid width");
        assert!(lo95 < mean && mean < hi95);
        assert!(lo50 < mean && mean < hi50);
        assert!(hi95 - lo95 >= hi50 - lo50);
    }

    #[test]
    fn credible_interval_rejects_bad_width() {
        let model = Posterior::platform_default();
        assert!(model.credible_interval(0.0).is_err());
        assert!(model.credible_interval(1.0).is_err());
        assert!(model.credible_interval(1.5).is_err());
    }

    #[test]
    fn hdi_contains_mean() {
        let model = Posterior::platform_default().update(5, 50).expect("valid");
        let (lo, hi) = model.hdi(0.95).expect("valid mass");
        let mean = model.mean();
        assert!(lo < mean && mean < hi);
    }

    #[test]
    fn hdi_no_wider_than_equal_tailed() {
        // Skewed posterior: the HDI should be the narrower interval.
        let model = Posterior::platform_default().update(2, 100).expect("valid");
        let (hlo, hhi) = model.hdi(0.95).expect("valid mass");
        let (clo, chi) = model.credible_interval(0.95).expect("valid width");
        assert!(hhi - hlo <= chi - clo + 1e-3);
    }

    #[test]
    fn hdi_symmetric_matches_equal_tailed() {
        let model = Posterior::new(40.0, 40.0).expect("valid");
        let (hlo, hhi) = model.hdi(0.95).expect("valid mass");
        let (clo, chi) = model.credible_interval(0.95).expect("valid width");
        assert!(approx_eq(hlo, clo, 1e-3));
        assert!(approx_eq(hhi, chi, 1e-3));
    }

    #[test]
    fn sampling_is_deterministic_for_a_seed() {
        let model = Posterior::platform_default().update(12, 300).expect("valid");
        let a = model.sample(1000, 7);
        let b = model.sample(1000, 7);
        assert_eq!(a, b);
        assert!(a.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn sample_mean_tracks_posterior_mean() {
        let model = Posterior::platform_default().update(50, 500).expect("valid");
        let draws = model.sample(50_000, 42);
        let sample_mean = draws.iter().sum::<f64>() / draws.len() as f64;
        assert!(approx_eq(sample_mean, model.mean(), 0.005));
    }
}

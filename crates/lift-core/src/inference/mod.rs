//! Bayesian inference: posteriors, priors, comparators, shrinkage.

pub mod compare;
pub mod posterior;
pub mod prior;
pub mod shrinkage;

pub use compare::{
    difference_hdi, draw_sample_matrix, expected_loss, hdi_from_samples, probability_b_beats_a,
    probability_best, CompareError, DEFAULT_COMPARISON_SAMPLES,
};
pub use posterior::{Posterior, PosteriorError};
pub use prior::{
    elicited_prior, fit_beta_moments, historical_prior, resolve_prior, ElicitedPrior, PriorError,
    PriorProvenance, ResolvedPrior,
};
pub use shrinkage::{james_stein_shrink, shrink_current_effect};

//! Lift math utilities.
//!
//! Numerically stable primitives backing the Beta-Binomial conversion
//! model: log-gamma, the regularized incomplete beta function, and the
//! Beta quantile. Invalid parameters yield NaN rather than panicking;
//! callers that need typed validation do it at their own boundary.

pub mod beta;
pub mod stable;

pub use beta::{beta_cdf, beta_mean, beta_quantile, beta_variance};
pub use stable::{log_beta, log_gamma};

//! Lift core library: Bayesian A/B experiment analysis.
//!
//! Turns raw per-variant visitor/conversion counts into posterior
//! distributions, comparative probabilities, risk estimates, traffic
//! allocations, and a machine-checkable ship/no-ship decision:
//! - Conjugate Beta-Binomial posteriors and prior resolution
//! - Monte Carlo comparators (probability-best, expected loss, HDIs)
//! - ROPE practical-equivalence rules
//! - Thompson and top-two Thompson traffic allocators
//! - Engagement proxies with calibration and variance reduction
//! - James-Stein shrinkage across a project's experiments
//!
//! The engine is stateless and synchronous: every analysis call is a
//! pure computation over caller-supplied inputs, deterministic for a
//! configured seed. Persistence, transport, and auth belong to the
//! calling layer. The binary entry point is in `main.rs`.

pub mod analyze;
pub mod config;
pub mod decision;
pub mod engagement;
pub mod experiment;
pub mod inference;
pub mod logging;

pub use analyze::{analyze_experiment, AnalysisError, ExperimentAnalysis, VariantResult};
pub use config::{AllocatorKind, AnalysisConfig};
pub use decision::{Decision, DecisionStatus};
pub use experiment::{ExperimentRequest, ProjectHistory, VariantObservation};
pub use inference::{Posterior, PriorProvenance};

//! Analysis configuration.
//!
//! Experiment-level thresholds arrive from the caller's store; sampling
//! controls are tunables, not hard constants, since larger draw counts
//! tighten Monte Carlo variance at linear CPU cost.

use crate::decision::bandit::{DEFAULT_MIN_ALLOCATION, DEFAULT_TOP_TWO_BETA};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Which allocator produces the suggested traffic split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AllocatorKind {
    /// Plain Thompson Sampling win fractions.
    Thompson,
    /// Top-two Thompson Sampling with a traffic floor.
    TopTwo { min_allocation: f64, beta: f64 },
}

impl AllocatorKind {
    pub fn top_two_default() -> Self {
        AllocatorKind::TopTwo {
            min_allocation: DEFAULT_MIN_ALLOCATION,
            beta: DEFAULT_TOP_TWO_BETA,
        }
    }
}

/// Tunables for one analysis call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Expected-loss ceiling below which shipping is safe.
    pub loss_threshold: f64,
    /// Half-width of the practical-equivalence band around zero.
    pub rope_width: f64,
    /// Width of per-variant credible intervals and HDIs.
    pub credible_mass: f64,
    /// Draws for probability and expected-loss estimators.
    pub comparison_samples: usize,
    /// Simulated rounds for the allocation estimate.
    pub allocation_rounds: usize,
    /// `Some(seed)` reproduces identical analyses for identical inputs;
    /// `None` draws a fresh seed from OS entropy per call.
    pub seed: Option<u64>,
    /// Allocator for the suggested traffic split.
    pub allocator: AllocatorKind,
    /// Conversions each variant needs before engagement proxies are
    /// skipped.
    pub min_conversions: u64,
    /// Upper percentile at which engagement scores are winsorized.
    pub winsorize_percentile: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            loss_threshold: 0.005,
            rope_width: 0.01,
            credible_mass: 0.95,
            comparison_samples: crate::inference::compare::DEFAULT_COMPARISON_SAMPLES,
            allocation_rounds: crate::decision::bandit::DEFAULT_ALLOCATION_ROUNDS,
            seed: Some(42),
            allocator: AllocatorKind::Thompson,
            min_conversions: crate::engagement::MIN_CONVERSIONS_FOR_DIRECT,
            winsorize_percentile: 95.0,
        }
    }
}

impl AnalysisConfig {
    /// The seed for this call: the configured one, or fresh entropy.
    pub fn effective_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| rand::rng().random())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_reproducible() {
        let config = AnalysisConfig::default();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.effective_seed(), 42);
    }

    #[test]
    fn deserializes_with_partial_fields() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"loss_threshold": 0.02, "rope_width": 0.05}"#)
                .expect("valid json");
        assert_eq!(config.loss_threshold, 0.02);
        assert_eq!(config.rope_width, 0.05);
        assert_eq!(config.comparison_samples, 50_000);
    }

    #[test]
    fn allocator_round_trips_through_json() {
        let top_two = AllocatorKind::top_two_default();
        let json = serde_json::to_string(&top_two).expect("serializable");
        let back: AllocatorKind = serde_json::from_str(&json).expect("deserializable");
        assert_eq!(back, top_two);
    }
}

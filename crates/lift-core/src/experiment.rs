//! Caller-supplied experiment inputs.
//!
//! The engine owns no persistence: the orchestration layer collects
//! per-variant counts and engagement events from its event store and
//! hands them over in these structures.

use crate::engagement::EngagementEvent;
use crate::inference::prior::ElicitedPrior;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Observed counts for one variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantObservation {
    pub variant_key: String,
    pub visitors: u64,
    pub conversions: u64,
}

impl VariantObservation {
    pub fn conversion_rate(&self) -> f64 {
        if self.visitors == 0 {
            0.0
        } else {
            self.conversions as f64 / self.visitors as f64
        }
    }
}

/// Cross-experiment history for prior resolution and shrinkage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectHistory {
    /// Overall conversion rates of completed experiments.
    pub conversion_rates: Vec<f64>,
    /// Raw effect sizes of completed experiments.
    pub effect_sizes: Vec<f64>,
}

/// Everything the caller supplies for one analysis call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentRequest {
    pub variants: Vec<VariantObservation>,
    /// Optional elicited prior from the experiment owner.
    pub elicited_prior: Option<ElicitedPrior>,
    /// Optional project history.
    pub history: Option<ProjectHistory>,
    /// Raw engagement events per variant key, consulted only when
    /// conversions are too sparse for a direct comparison.
    pub engagement_events: BTreeMap<String, Vec<EngagementEvent>>,
    /// Pre-experiment engagement scores per variant, aligned with the
    /// per-visitor score order (visitors sorted by id). Enables CUPED.
    pub pre_engagement_scores: BTreeMap<String, Vec<f64>>,
    /// Calibrated engagement weights, if the project has them.
    pub engagement_weights: Option<crate::engagement::EngagementWeights>,
}

//! Region-of-practical-equivalence decision rule.
//!
//! Two variants are treated as interchangeable when the HDI of their
//! sampled rate difference lies entirely inside a band around zero,
//! regardless of whether the difference is "statistically significant".

use crate::inference::compare::{difference_hdi, hdi_from_samples};
use crate::inference::posterior::Posterior;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use thiserror::Error;

/// Credible mass of the difference HDI used for classification.
pub const ROPE_CREDIBLE_MASS: f64 = 0.95;

/// Errors raised by the multi-variant ROPE comparison.
#[derive(Debug, Error)]
pub enum RopeError {
    #[error("at least one posterior model is required")]
    NoModels,
    #[error("got {keys} variant keys for {models} models")]
    KeyCountMismatch { keys: usize, models: usize },
}

/// Outcome of a pairwise ROPE comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RopeOutcome {
    Equivalent,
    ShipA,
    ShipB,
    Undecided,
}

/// Pairwise ROPE classification of the difference `B - A`.
#[derive(Debug, Clone, Serialize)]
pub struct RopeResult {
    pub decision: RopeOutcome,
    pub hdi: (f64, f64),
    pub rope: (f64, f64),
    pub hdi_in_rope: bool,
    pub hdi_outside_rope: bool,
}

/// One leader-vs-challenger comparison in the multi-variant case.
#[derive(Debug, Clone, Serialize)]
pub struct PairwiseRope {
    pub variant: String,
    pub result: RopeResult,
}

/// Multi-variant ROPE analysis: leader plus pairwise comparisons.
#[derive(Debug, Clone, Serialize)]
pub struct MultiRopeResult {
    pub leader: String,
    pub pairwise: Vec<PairwiseRope>,
    pub all_equivalent: bool,
}

/// Either shape of ROPE analysis, tagged for serialization.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RopeAnalysis {
    Pairwise(RopeResult),
    MultiVariant(MultiRopeResult),
}

impl RopeAnalysis {
    /// Whether the analysis declares all compared variants equivalent.
    pub fn is_equivalent(&self) -> bool {
        match self {
            RopeAnalysis::Pairwise(result) => result.decision == RopeOutcome::Equivalent,
            RopeAnalysis::MultiVariant(multi) => multi.all_equivalent,
        }
    }
}

fn classify(hdi: (f64, f64), rope_width: f64) -> RopeResult {
    let (lo, hi) = hdi;
    let rope = (-rope_width, rope_width);
    let hdi_in_rope = lo >= rope.0 && hi <= rope.1;
    let hdi_outside_rope = lo > rope.1 || hi < rope.0;
    let decision = if hdi_in_rope {
        RopeOutcome::Equivalent
    } else if lo > rope.1 {
        RopeOutcome::ShipB
    } else if hi < rope.0 {
        RopeOutcome::ShipA
    } else {
        RopeOutcome::Undecided
    };
    RopeResult {
        decision,
        hdi,
        rope,
        hdi_in_rope,
        hdi_outside_rope,
    }
}

/// Classify the difference `B - A` against a band of half-width
/// `rope_width` around zero.
pub fn rope_decision(
    a: &Posterior,
    b: &Posterior,
    rope_width: f64,
    n_samples: usize,
    seed: u64,
) -> RopeResult {
    let hdi = difference_hdi(a, b, ROPE_CREDIBLE_MASS, n_samples, seed);
    classify(hdi, rope_width)
}

/// Run pairwise ROPE comparisons between the leader (highest posterior
/// mean) and every other variant.
///
/// `all_equivalent` is the orchestrator's trigger for a global
/// practical-equivalence call; it is false for a single-variant input.
pub fn multi_variant_rope_decision(
    models: &[Posterior],
    keys: &[String],
    rope_width: f64,
    n_samples: usize,
    seed: u64,
) -> Result<MultiRopeResult, RopeError> {
    if models.is_empty() {
        return Err(RopeError::NoModels);
    }
    if keys.len() != models.len() {
        return Err(RopeError::KeyCountMismatch {
            keys: keys.len(),
            models: models.len(),
        });
    }

    let mut leader = 0;
    for (i, model) in models.iter().enumerate().skip(1) {
        if model.mean() > models[leader].mean() {
            leader = i;
        }
    }

    let n = n_samples.max(1);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut pairwise = Vec::with_capacity(models.len().saturating_sub(1));
    for (i, model) in models.iter().enumerate() {
        if i == leader {
            continue;
        }
        // Difference is leader minus challenger, so ShipB means the
        // leader's advantage clears the band.
        let challenger = model.sample_with(&mut rng, n);
        let leader_draws = models[leader].sample_with(&mut rng, n);
        let diffs: Vec<f64> = leader_draws
            .iter()
            .zip(&challenger)
            .map(|(l, c)| l - c)
            .collect();
        let hdi = hdi_from_samples(&diffs, ROPE_CREDIBLE_MASS);
        pairwise.push(PairwiseRope {
            variant: keys[i].clone(),
            result: classify(hdi, rope_width),
        });
    }

    let all_equivalent = !pairwise.is_empty()
        && pairwise
            .iter()
            .all(|p| p.result.decision == RopeOutcome::Equivalent);

    Ok(MultiRopeResult {
        leader: keys[leader].clone(),
        pairwise,
        all_equivalent,
    })
}

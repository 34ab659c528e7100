//! Experiment analysis orchestrator.
//!
//! One synchronous, CPU-bound pass over caller-supplied counts: resolve a
//! prior, build a posterior per variant, run the comparators, ROPE rule,
//! and allocator, fall back to engagement proxies when conversions are
//! sparse, shrink the effect size against project history, and apply the
//! decision hierarchy. Each stage's result is an explicit struct; the
//! whole output is a read-only snapshot with no lifecycle of its own.

use crate::config::{AllocatorKind, AnalysisConfig};
use crate::decision::bandit::{ThompsonSampler, TopTwoThompsonSampler};
use crate::decision::recommend::{generate_recommendation, Decision, RecommendationInput};
use crate::decision::rope::{multi_variant_rope_decision, rope_decision, RopeAnalysis};
use crate::engagement::{
    compare_variants, compute_engagement_score, cuped_adjust, has_sufficient_conversion_data,
    winsorize_scores, EngagementComparison, EngagementEvent, EngagementWeights,
};
use crate::experiment::ExperimentRequest;
use crate::inference::compare::{expected_loss, probability_b_beats_a, probability_best};
use crate::inference::posterior::{Posterior, PosteriorError};
use crate::inference::prior::{resolve_prior, PriorProvenance};
use crate::inference::shrinkage::shrink_current_effect;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Errors raised before any analysis runs.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("experiment has no variants")]
    NoVariants,
    #[error("variant {variant_key}: conversions ({conversions}) exceed visitors ({visitors})")]
    InvalidCounts {
        variant_key: String,
        visitors: u64,
        conversions: u64,
    },
    #[error(transparent)]
    Posterior(#[from] PosteriorError),
}

/// Per-variant analysis row.
#[derive(Debug, Clone, Serialize)]
pub struct VariantResult {
    pub variant_key: String,
    pub visitors: u64,
    pub conversions: u64,
    pub conversion_rate: f64,
    pub posterior_mean: f64,
    pub credible_interval: (f64, f64),
    pub hdi: (f64, f64),
    pub engagement_score: Option<f64>,
}

/// The complete analysis snapshot returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentAnalysis {
    pub total_visitors: u64,
    pub variants: Vec<VariantResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability_b_beats_a: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability_best: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_loss: Option<BTreeMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_allocation: Option<BTreeMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement_comparison: Option<EngagementComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rope_analysis: Option<RopeAnalysis>,
    pub decision: Decision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_effect_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shrunk_effect_size: Option<f64>,
    pub prior_used: PriorProvenance,
}

// Stage offsets keep the per-stage draws distinct while everything stays
// reproducible from one configured seed.
const SEED_COMPARE: u64 = 0;
const SEED_LOSS: u64 = 1;
const SEED_ROPE: u64 = 2;
const SEED_ALLOCATION: u64 = 3;

/// Run the full analysis pipeline.
pub fn analyze_experiment(
    request: &ExperimentRequest,
    config: &AnalysisConfig,
) -> Result<ExperimentAnalysis, AnalysisError> {
    if request.variants.is_empty() {
        return Err(AnalysisError::NoVariants);
    }
    for obs in &request.variants {
        if obs.conversions > obs.visitors {
            return Err(AnalysisError::InvalidCounts {
                variant_key: obs.variant_key.clone(),
                visitors: obs.visitors,
                conversions: obs.conversions,
            });
        }
    }

    let seed = config.effective_seed();
    let history = request.history.clone().unwrap_or_default();
    let prior = resolve_prior(&history.conversion_rates, request.elicited_prior);
    debug!(provenance = ?prior.provenance, alpha = prior.model.alpha(), beta = prior.model.beta(), "resolved prior");

    let mut models = Vec::with_capacity(request.variants.len());
    let mut variants = Vec::with_capacity(request.variants.len());
    for obs in &request.variants {
        let model = prior.model.update(obs.conversions, obs.visitors)?;
        variants.push(VariantResult {
            variant_key: obs.variant_key.clone(),
            visitors: obs.visitors,
            conversions: obs.conversions,
            conversion_rate: obs.conversion_rate(),
            posterior_mean: model.mean(),
            credible_interval: model.credible_interval(config.credible_mass)?,
            hdi: model.hdi(config.credible_mass)?,
            engagement_score: None,
        });
        models.push(model);
    }
    let total_visitors: u64 = variants.iter().map(|v| v.visitors).sum();
    let keys: Vec<String> = variants.iter().map(|v| v.variant_key.clone()).collect();

    let (prob_pairwise, prob_best) = comparator_stage(&models, config, seed);
    let losses = if models.len() >= 2 {
        expected_loss(&models, config.comparison_samples, seed.wrapping_add(SEED_LOSS)).ok()
    } else {
        None
    };
    let rope = rope_stage(&models, &keys, config, seed);
    let allocation = allocation_stage(&models, &keys, config, seed);

    let engagement = engagement_stage(request, &mut variants, config);

    let (raw_effect, shrunk_effect) = effect_stage(&models, &history.effect_sizes);

    let loss_map = losses.as_ref().map(|l| {
        keys.iter()
            .cloned()
            .zip(l.iter().copied())
            .collect::<BTreeMap<String, f64>>()
    });

    let decision = generate_recommendation(&RecommendationInput {
        variants: &request.variants,
        probability_best: prob_best.as_deref(),
        probability_b_beats_a: prob_pairwise,
        expected_loss: losses.as_deref(),
        engagement_summary: engagement.as_ref().map(|e| e.summary.as_str()),
        rope: rope.as_ref(),
        loss_threshold: config.loss_threshold,
    });

    Ok(ExperimentAnalysis {
        total_visitors,
        variants,
        probability_b_beats_a: prob_pairwise,
        probability_best: prob_best,
        expected_loss: loss_map,
        suggested_allocation: allocation,
        engagement_comparison: engagement,
        rope_analysis: rope,
        decision,
        raw_effect_size: raw_effect,
        shrunk_effect_size: shrunk_effect,
        prior_used: prior.provenance,
    })
}

fn comparator_stage(
    models: &[Posterior],
    config: &AnalysisConfig,
    seed: u64,
) -> (Option<f64>, Option<Vec<f64>>) {
    let n = config.comparison_samples;
    match models.len() {
        0 | 1 => (None, None),
        2 => {
            let p = probability_b_beats_a(
                &models[0],
                &models[1],
                n,
                seed.wrapping_add(SEED_COMPARE),
            );
            (Some(p), Some(vec![1.0 - p, p]))
        }
        _ => {
            let probs = probability_best(models, n, seed.wrapping_add(SEED_COMPARE)).ok();
            (None, probs)
        }
    }
}

fn rope_stage(
    models: &[Posterior],
    keys: &[String],
    config: &AnalysisConfig,
    seed: u64,
) -> Option<RopeAnalysis> {
    let n = config.comparison_samples;
    let rope_seed = seed.wrapping_add(SEED_ROPE);
    match models.len() {
        0 | 1 => None,
        2 => Some(RopeAnalysis::Pairwise(rope_decision(
            &models[0],
            &models[1],
            config.rope_width,
            n,
            rope_seed,
        ))),
        _ => multi_variant_rope_decision(models, keys, config.rope_width, n, rope_seed)
            .ok()
            .map(RopeAnalysis::MultiVariant),
    }
}

fn allocation_stage(
    models: &[Posterior],
    keys: &[String],
    config: &AnalysisConfig,
    seed: u64,
) -> Option<BTreeMap<String, f64>> {
    if models.len() < 2 {
        return None;
    }
    let alloc_seed = seed.wrapping_add(SEED_ALLOCATION);
    let fractions = match config.allocator {
        AllocatorKind::Thompson => ThompsonSampler::new(models.to_vec())
            .ok()?
            .allocation(config.allocation_rounds, alloc_seed),
        AllocatorKind::TopTwo {
            min_allocation,
            beta,
        } => TopTwoThompsonSampler::new(models.to_vec(), min_allocation, beta)
            .ok()?
            .allocation(config.allocation_rounds, alloc_seed),
    };
    Some(keys.iter().cloned().zip(fractions).collect())
}

fn engagement_stage(
    request: &ExperimentRequest,
    variants: &mut [VariantResult],
    config: &AnalysisConfig,
) -> Option<EngagementComparison> {
    let conversions: BTreeMap<String, u64> = variants
        .iter()
        .map(|v| (v.variant_key.clone(), v.conversions))
        .collect();
    if has_sufficient_conversion_data(&conversions, config.min_conversions) {
        return None;
    }

    let weights = request.engagement_weights.unwrap_or_default();
    let mut variant_scores: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut any_scores = false;

    for variant in variants.iter_mut() {
        let events = request
            .engagement_events
            .get(&variant.variant_key)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let scores = per_visitor_scores(events, &weights);
        let scores = winsorize_scores(&scores, config.winsorize_percentile);
        let scores = match request.pre_engagement_scores.get(&variant.variant_key) {
            Some(pre) => cuped_adjust(&scores, pre),
            None => scores,
        };

        if !scores.is_empty() {
            any_scores = true;
            let mean = scores.iter().sum::<f64>() / scores.len() as f64;
            variant.engagement_score = Some((mean * 10_000.0).round() / 10_000.0);
        }
        variant_scores.insert(variant.variant_key.clone(), scores);
    }

    if !any_scores {
        return None;
    }
    debug!("conversions sparse, comparing engagement proxies");
    Some(compare_variants(&variant_scores))
}

/// Group a variant's events by visitor and score each visitor.
fn per_visitor_scores(events: &[EngagementEvent], weights: &EngagementWeights) -> Vec<f64> {
    let mut by_visitor: BTreeMap<&str, Vec<EngagementEvent>> = BTreeMap::new();
    for event in events {
        let visitor = event.visitor_id.as_deref().unwrap_or("");
        by_visitor.entry(visitor).or_default().push(event.clone());
    }
    by_visitor
        .values()
        .map(|events| compute_engagement_score(events, weights))
        .collect()
}

fn effect_stage(models: &[Posterior], past_effects: &[f64]) -> (Option<f64>, Option<f64>) {
    if models.len() < 2 {
        return (None, None);
    }
    let mut best = 0;
    let mut worst = 0;
    for (i, model) in models.iter().enumerate().skip(1) {
        if model.mean() > models[best].mean() {
            best = i;
        }
        if model.mean() < models[worst].mean() {
            worst = i;
        }
    }
    let raw = models[best].mean() - models[worst].mean();
    let se = (models[best].variance() + models[worst].variance()).sqrt();
    let shrunk = shrink_current_effect(past_effects, raw, se);
    (Some(raw), shrunk)
}

//! Decision hierarchy and plain-language recommendation generation.
//!
//! Turns the comparator outputs into one machine-checkable decision. The
//! branches run top-down and the first match wins; every branch also
//! fills a markdown-ish text string for older text-only consumers. No
//! branch errors on well-formed input: missing optional analyses degrade
//! to the nearest matching branch.

use crate::decision::rope::RopeAnalysis;
use crate::experiment::VariantObservation;
use serde::Serialize;

/// Visitors required before any comparison is attempted.
const MIN_VISITORS: u64 = 10;

/// Total conversions at or below which the data is too sparse for a
/// Bayesian call regardless of the computed probabilities.
const SPARSE_CONVERSIONS: u64 = 2;

const SHIP_PROBABILITY: f64 = 0.90;
const LEAN_PROBABILITY: f64 = 0.75;

/// Machine-checkable decision status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    CollectingData,
    KeepTesting,
    ReadyToShip,
    PracticallyEquivalent,
}

/// Confidence attached to the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    None,
    Low,
    Medium,
    High,
}

/// The structured decision handed back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    #[serde(rename = "decision_status")]
    pub status: DecisionStatus,
    pub winning_variant: Option<String>,
    #[serde(rename = "confidence_level")]
    pub confidence: ConfidenceLevel,
    pub recommendation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rope_analysis: Option<RopeAnalysis>,
}

/// Comparator outputs feeding the hierarchy.
#[derive(Debug, Clone, Default)]
pub struct RecommendationInput<'a> {
    pub variants: &'a [VariantObservation],
    pub probability_best: Option<&'a [f64]>,
    pub probability_b_beats_a: Option<f64>,
    pub expected_loss: Option<&'a [f64]>,
    pub engagement_summary: Option<&'a str>,
    pub rope: Option<&'a RopeAnalysis>,
    pub loss_threshold: f64,
}

struct BestVariant<'a> {
    index: usize,
    probability: f64,
    key: &'a str,
}

fn find_best<'a>(input: &RecommendationInput<'a>) -> Option<BestVariant<'a>> {
    if let Some(probs) = input.probability_best {
        if probs.len() == input.variants.len() && !probs.is_empty() {
            let mut best = 0;
            for (i, p) in probs.iter().enumerate().skip(1) {
                if *p > probs[best] {
                    best = i;
                }
            }
            return Some(BestVariant {
                index: best,
                probability: probs[best],
                key: &input.variants[best].variant_key,
            });
        }
    }
    if let (Some(p), 2) = (input.probability_b_beats_a, input.variants.len()) {
        let (index, probability) = if p > 0.5 { (1, p) } else { (0, 1.0 - p) };
        return Some(BestVariant {
            index,
            probability,
            key: &input.variants[index].variant_key,
        });
    }
    None
}

fn expected_gain(input: &RecommendationInput<'_>, best_index: usize) -> String {
    if let Some(losses) = input.expected_loss {
        if losses.len() == input.variants.len() && !losses.is_empty() {
            let worst = losses.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let gain = worst - losses[best_index];
            if gain > 0.0001 {
                return format!(" Expected gain: +{:.1}% conversion rate.", gain * 100.0);
            }
        }
    }
    String::new()
}

fn collecting(recommendation: String) -> Decision {
    Decision {
        status: DecisionStatus::CollectingData,
        winning_variant: None,
        confidence: ConfidenceLevel::None,
        recommendation,
        rope_analysis: None,
    }
}

fn too_early(total_visitors: u64) -> String {
    format!(
        "**Too early to tell.** After {total_visitors} visitors, \
         the variants look similar. Keep testing."
    )
}

/// Apply the decision hierarchy to the comparator outputs.
pub fn generate_recommendation(input: &RecommendationInput<'_>) -> Decision {
    let total_visitors: u64 = input.variants.iter().map(|v| v.visitors).sum();
    let total_conversions: u64 = input.variants.iter().map(|v| v.conversions).sum();

    // 1. Barely any traffic at all.
    if total_visitors < MIN_VISITORS {
        let plural = if total_visitors == 1 { "" } else { "s" };
        return collecting(format!(
            "**Just getting started.** Only {total_visitors} visitor{plural} so far. \
             Need more data for any meaningful comparison."
        ));
    }

    // 2. Traffic but no conversions; lean on engagement if present.
    if total_conversions == 0 {
        if let Some(summary) = input.engagement_summary {
            return collecting(format!(
                "**Not enough conversions yet**, but engagement data is available. \
                 {summary} This usually predicts better conversion."
            ));
        }
        return collecting(format!(
            "**Too early to tell.** After {total_visitors} visitors, \
             no conversions have been recorded. Keep testing."
        ));
    }

    // 3. No usable comparator output.
    let Some(best) = find_best(input) else {
        return collecting(too_early(total_visitors));
    };

    // 4. A conversion or two is still too sparse for a Bayesian call.
    if total_conversions <= SPARSE_CONVERSIONS {
        if let Some(summary) = input.engagement_summary {
            let mut summary_text = summary.to_string();
            if let Some(first) = summary_text.get_mut(0..1) {
                first.make_ascii_lowercase();
            }
            return collecting(format!(
                "**Not enough conversions yet**, but variant {} visitors {summary_text} \
                 This usually predicts better conversion.",
                best.key
            ));
        }
        return collecting(too_early(total_visitors));
    }

    let gain = expected_gain(input, best.index);

    // 5. Epsilon stopping: committing now risks less than the threshold.
    if let Some(losses) = input.expected_loss {
        if losses.len() == input.variants.len() && !losses.is_empty() {
            let mut min_index = 0;
            for (i, loss) in losses.iter().enumerate().skip(1) {
                if *loss < losses[min_index] {
                    min_index = i;
                }
            }
            if losses[min_index] < input.loss_threshold {
                let key = &input.variants[min_index].variant_key;
                return Decision {
                    status: DecisionStatus::ReadyToShip,
                    winning_variant: Some(key.clone()),
                    confidence: ConfidenceLevel::High,
                    recommendation: format!(
                        "**Variant {key} is ready to ship.** Expected loss from committing \
                         now is {:.2}%, below your {:.2}% threshold.{gain} \
                         We recommend switching.",
                        losses[min_index] * 100.0,
                        input.loss_threshold * 100.0
                    ),
                    rope_analysis: input.rope.cloned(),
                };
            }
        }
    }

    // 6. Practical equivalence across all compared variants.
    if let Some(rope) = input.rope {
        if rope.is_equivalent() {
            return Decision {
                status: DecisionStatus::PracticallyEquivalent,
                winning_variant: None,
                confidence: ConfidenceLevel::High,
                recommendation: format!(
                    "**The variants are practically equivalent.** After {total_visitors} \
                     visitors, any difference falls inside your equivalence band. \
                     Either choice is acceptable."
                ),
                rope_analysis: input.rope.cloned(),
            };
        }
    }

    let probability_pct = best.probability * 100.0;

    // 7. High-confidence winner.
    if best.probability >= SHIP_PROBABILITY {
        return Decision {
            status: DecisionStatus::ReadyToShip,
            winning_variant: Some(best.key.to_string()),
            confidence: ConfidenceLevel::High,
            recommendation: format!(
                "**Variant {} is winning.** {probability_pct:.0}% chance it converts \
                 better.{gain} We recommend switching.",
                best.key
            ),
            rope_analysis: input.rope.cloned(),
        };
    }

    // 8. Moderate lean.
    if best.probability >= LEAN_PROBABILITY {
        return Decision {
            status: DecisionStatus::KeepTesting,
            winning_variant: Some(best.key.to_string()),
            confidence: ConfidenceLevel::Medium,
            recommendation: format!(
                "**Variant {} is likely better** ({probability_pct:.0}% probability).{gain} \
                 Keep running for more confidence before committing.",
                best.key
            ),
            rope_analysis: input.rope.cloned(),
        };
    }

    // 9. Too close to call.
    Decision {
        status: DecisionStatus::CollectingData,
        winning_variant: None,
        confidence: ConfidenceLevel::Low,
        recommendation: too_early(total_visitors),
        rope_analysis: input.rope.cloned(),
    }
}

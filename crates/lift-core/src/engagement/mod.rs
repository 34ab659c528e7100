//! Engagement proxy metrics for conversion-sparse experiments.
//!
//! With one or two conversions there is no meaningful Bayesian call to
//! make, but behavioral signals still carry information. The composite
//! score folds four normalized signals into a single [0, 1] value per
//! visitor: scroll depth, active time, click count, and a binary form
//! interaction flag.
//!
//! Event payloads arrive as loose JSON from tracking SDKs with drifting
//! field names; extraction tolerates the known aliases and degrades
//! malformed values to zero contribution instead of failing.

pub mod calibrate;
pub mod variance;

pub use calibrate::{calibrate_weights, CalibrationRow, MIN_CALIBRATION_ROWS};
pub use variance::{cuped_adjust, winsorize_scores};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

const MAX_SCROLL_DEPTH: f64 = 100.0;
const MAX_ACTIVE_TIME_SECS: f64 = 300.0;
const MAX_CLICK_COUNT: f64 = 20.0;
const SIMILAR_GAP: f64 = 0.05;

/// Minimum conversions per variant before direct comparison is trusted.
pub const MIN_CONVERSIONS_FOR_DIRECT: u64 = 3;

/// Signal weights for the composite score. Defaults sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementWeights {
    pub scroll_depth: f64,
    pub time_on_page: f64,
    pub click_count: f64,
    pub form_engagement: f64,
}

impl Default for EngagementWeights {
    fn default() -> Self {
        Self {
            scroll_depth: 0.3,
            time_on_page: 0.2,
            click_count: 0.2,
            form_engagement: 0.3,
        }
    }
}

/// One raw tracking event for a visitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementEvent {
    #[serde(default)]
    pub visitor_id: Option<String>,
    pub event_type: String,
    #[serde(default)]
    pub payload: Value,
}

/// Engagement comparison across variants.
#[derive(Debug, Clone, Serialize)]
pub struct EngagementComparison {
    pub means: BTreeMap<String, f64>,
    pub differences: BTreeMap<String, f64>,
    pub summary: String,
}

/// True iff every variant has at least `min_conversions` conversions.
/// When false, the orchestrator leans on engagement proxies instead of
/// raw conversion comparison.
pub fn has_sufficient_conversion_data(
    conversions_per_variant: &BTreeMap<String, u64>,
    min_conversions: u64,
) -> bool {
    !conversions_per_variant.is_empty()
        && conversions_per_variant
            .values()
            .all(|c| *c >= min_conversions)
}

fn numeric_field(payload: &Value, keys: &[&str]) -> Option<f64> {
    for key in keys {
        match payload.get(key) {
            Some(Value::Number(n)) => return n.as_f64(),
            Some(Value::String(s)) => {
                if let Ok(v) = s.parse::<f64>() {
                    return Some(v);
                }
            }
            _ => {}
        }
    }
    None
}

/// Composite engagement score for one visitor's events.
///
/// Scroll depth comes from `maxDepth` / `max_depth` / `depth` (first hit
/// wins); active time prefers the millisecond `activeTimeMs` field over
/// the second-based `active_time` / `time_on_page`. Returns 0.0 for an
/// empty event list.
pub fn compute_engagement_score(events: &[EngagementEvent], weights: &EngagementWeights) -> f64 {
    if events.is_empty() {
        return 0.0;
    }

    let mut max_scroll = 0.0f64;
    let mut max_active_secs = 0.0f64;
    let mut clicks = 0u64;
    let mut touched_form = false;

    for event in events {
        match event.event_type.as_str() {
            "scroll" => {
                if let Some(depth) =
                    numeric_field(&event.payload, &["maxDepth", "max_depth", "depth"])
                {
                    max_scroll = max_scroll.max(depth);
                }
            }
            "page_view" | "heartbeat" | "engagement" => {
                let secs = match numeric_field(&event.payload, &["activeTimeMs"]) {
                    Some(ms) if ms != 0.0 => ms / 1000.0,
                    _ => numeric_field(&event.payload, &["active_time", "time_on_page"])
                        .unwrap_or(0.0),
                };
                max_active_secs = max_active_secs.max(secs);
            }
            "click" => clicks += 1,
            "form_interaction" | "form_submit" => touched_form = true,
            _ => {}
        }
    }

    let scroll_score = (max_scroll / MAX_SCROLL_DEPTH).clamp(0.0, 1.0);
    let time_score = (max_active_secs / MAX_ACTIVE_TIME_SECS).clamp(0.0, 1.0);
    let click_score = (clicks as f64 / MAX_CLICK_COUNT).clamp(0.0, 1.0);
    let form_score = if touched_form { 1.0 } else { 0.0 };

    let score = weights.scroll_depth * scroll_score
        + weights.time_on_page * time_score
        + weights.click_count * click_score
        + weights.form_engagement * form_score;
    (score * 10_000.0).round() / 10_000.0
}

/// Compare mean engagement across variants.
///
/// Difference keys are `"<later>_vs_<earlier>"` in key order. The summary
/// calls variants similar below a 0.05 absolute gap, otherwise phrases
/// the best-vs-worst gap as a percentage.
pub fn compare_variants(variant_scores: &BTreeMap<String, Vec<f64>>) -> EngagementComparison {
    let mut means = BTreeMap::new();
    for (key, scores) in variant_scores {
        let mean = if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        };
        means.insert(key.clone(), mean);
    }

    let entries: Vec<(&String, f64)> = means.iter().map(|(k, v)| (k, *v)).collect();
    let mut differences = BTreeMap::new();
    for (i, (first, first_mean)) in entries.iter().enumerate() {
        for (second, second_mean) in entries.iter().skip(i + 1) {
            let diff = second_mean - first_mean;
            differences.insert(
                format!("{second}_vs_{first}"),
                (diff * 10_000.0).round() / 10_000.0,
            );
        }
    }

    let mut ranked = entries.clone();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    let summary = match (ranked.first(), ranked.last()) {
        (Some((worst, worst_mean)), Some((best, best_mean))) if ranked.len() >= 2 => {
            let gap = best_mean - worst_mean;
            if gap < SIMILAR_GAP {
                "Engagement is similar between variants. Need more data to differentiate."
                    .to_string()
            } else {
                let pct = gap / worst_mean.max(0.001) * 100.0;
                format!(
                    "Variant {best} shows {pct:.0}% higher engagement than {worst} \
                     ({best_mean:.3} vs {worst_mean:.3})."
                )
            }
        }
        _ => "Need at least two variants to compare engagement.".to_string(),
    };

    EngagementComparison {
        means,
        differences,
        summary,
    }
}

//! OLS calibration of engagement weights against conversion outcomes.
//!
//! Regresses the four normalized signals on a binary converted label
//! over historical per-visitor rows. The normal equations get a small
//! ridge term; a fit that cannot be solved, or whose weights sum to
//! nothing after taking absolute values, yields `None` rather than a
//! garbage weighting.

use crate::engagement::EngagementWeights;
use serde::{Deserialize, Serialize};

/// Historical rows required before calibration is attempted.
pub const MIN_CALIBRATION_ROWS: usize = 10;

const RIDGE: f64 = 1e-6;
const PIVOT_EPSILON: f64 = 1e-12;

/// One historical visitor: normalized signals plus the conversion label.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationRow {
    pub scroll_depth: f64,
    pub time_on_page: f64,
    pub click_count: f64,
    pub form_engagement: f64,
    pub converted: f64,
}

impl CalibrationRow {
    fn signals(&self) -> [f64; 4] {
        [
            self.scroll_depth,
            self.time_on_page,
            self.click_count,
            self.form_engagement,
        ]
    }
}

/// Solve a 4x4 system by Gaussian elimination with partial pivoting.
fn solve_linear(mut a: [[f64; 4]; 4], mut b: [f64; 4]) -> Option<[f64; 4]> {
    for col in 0..4 {
        let mut pivot = col;
        for row in (col + 1)..4 {
            if a[row][col].abs() > a[pivot][col].abs() {
                pivot = row;
            }
        }
        if a[pivot][col].abs() < PIVOT_EPSILON {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..4 {
            let factor = a[row][col] / a[col][col];
            for k in col..4 {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0f64; 4];
    for col in (0..4).rev() {
        let mut sum = b[col];
        for k in (col + 1)..4 {
            sum -= a[col][k] * x[k];
        }
        x[col] = sum / a[col][col];
    }
    Some(x)
}

/// Calibrate engagement weights from historical conversion outcomes.
///
/// Returns `None` with fewer than [`MIN_CALIBRATION_ROWS`] rows or a
/// degenerate fit. Weights are absolute values renormalized to sum 1.
pub fn calibrate_weights(rows: &[CalibrationRow]) -> Option<EngagementWeights> {
    if rows.len() < MIN_CALIBRATION_ROWS {
        return None;
    }

    let mut xtx = [[0.0f64; 4]; 4];
    let mut xty = [0.0f64; 4];
    for row in rows {
        let x = row.signals();
        for i in 0..4 {
            for j in 0..4 {
                xtx[i][j] += x[i] * x[j];
            }
            xty[i] += x[i] * row.converted;
        }
    }
    for (i, row) in xtx.iter_mut().enumerate() {
        row[i] += RIDGE;
    }

    let beta = solve_linear(xtx, xty)?;
    let magnitudes: Vec<f64> = beta.iter().map(|b| b.abs()).collect();
    let total: f64 = magnitudes.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return None;
    }

    let rounded = |v: f64| (v / total * 10_000.0).round() / 10_000.0;
    Some(EngagementWeights {
        scroll_depth: rounded(magnitudes[0]),
        time_on_page: rounded(magnitudes[1]),
        click_count: rounded(magnitudes[2]),
        form_engagement: rounded(magnitudes[3]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(scroll: f64, time: f64, clicks: f64, form: f64, converted: f64) -> CalibrationRow {
        CalibrationRow {
            scroll_depth: scroll,
            time_on_page: time,
            click_count: clicks,
            form_engagement: form,
            converted,
        }
    }

    #[test]
    fn too_few_rows_returns_none() {
        let rows = vec![row(0.5, 0.5, 0.5, 0.0, 1.0); 5];
        assert!(calibrate_weights(&rows).is_none());
    }

    #[test]
    fn predictive_signal_dominates_the_weights() {
        // Scroll depth separates converters from non-converters; the
        // other signals cycle through unrelated values.
        let mut rows = Vec::new();
        for i in 0..50 {
            let noise = (i % 10) as f64 / 10.0;
            rows.push(row(0.85 + noise * 0.01, noise, 1.0 - noise, 0.0, 1.0));
            rows.push(row(0.10 + noise * 0.01, 1.0 - noise, noise, 0.0, 0.0));
        }
        let weights = calibrate_weights(&rows).expect("enough rows");
        assert!(weights.scroll_depth > weights.time_on_page);
        assert!(weights.scroll_depth > weights.click_count);
    }

    #[test]
    fn weights_sum_to_one() {
        let mut rows = Vec::new();
        for i in 0..60 {
            let a = (i % 7) as f64 / 7.0;
            let b = (i % 5) as f64 / 5.0;
            let c = (i % 3) as f64 / 3.0;
            let form = (i % 2) as f64;
            let converted = if a + form > 1.0 { 1.0 } else { 0.0 };
            rows.push(row(a, b, c, form, converted));
        }
        let weights = calibrate_weights(&rows).expect("enough rows");
        let total = weights.scroll_depth
            + weights.time_on_page
            + weights.click_count
            + weights.form_engagement;
        assert!((total - 1.0).abs() < 0.01, "got {total}");
    }

    #[test]
    fn all_zero_labels_yield_none() {
        let rows = vec![row(0.0, 0.0, 0.0, 0.0, 0.0); 20];
        // Ridge keeps the system solvable but the weights sum to zero.
        assert!(calibrate_weights(&rows).is_none());
    }
}

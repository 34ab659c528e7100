//! Beta distribution: moments, CDF, and quantile.
//!
//! The CDF is the regularized incomplete beta function I_x(a, b),
//! evaluated with the modified Lentz continued fraction. The quantile
//! inverts the CDF by Newton steps bracketed with bisection.

use crate::stable::log_beta;

const CF_MAX_ITERS: usize = 300;
const CF_EPS: f64 = 1e-14;
const CF_TINY: f64 = 1e-30;

fn params_valid(alpha: f64, beta: f64) -> bool {
    alpha.is_finite() && beta.is_finite() && alpha > 0.0 && beta > 0.0
}

/// Mean of Beta(alpha, beta): alpha / (alpha + beta).
pub fn beta_mean(alpha: f64, beta: f64) -> f64 {
    if !params_valid(alpha, beta) {
        return f64::NAN;
    }
    alpha / (alpha + beta)
}

/// Variance of Beta(alpha, beta).
pub fn beta_variance(alpha: f64, beta: f64) -> f64 {
    if !params_valid(alpha, beta) {
        return f64::NAN;
    }
    let n = alpha + beta;
    alpha * beta / (n * n * (n + 1.0))
}

/// Regularized incomplete beta function I_x(alpha, beta).
pub fn beta_cdf(x: f64, alpha: f64, beta: f64) -> f64 {
    if x.is_nan() || !params_valid(alpha, beta) {
        return f64::NAN;
    }
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let front = (alpha * x.ln() + beta * (-x).ln_1p() - log_beta(alpha, beta)).exp();
    // The continued fraction converges fastest for x below the pivot;
    // above it, use the symmetry I_x(a,b) = 1 - I_{1-x}(b,a).
    if x < (alpha + 1.0) / (alpha + beta + 2.0) {
        front * lentz_fraction(x, alpha, beta) / alpha
    } else {
        1.0 - front * lentz_fraction(1.0 - x, beta, alpha) / beta
    }
}

/// Quantile (inverse CDF) of Beta(alpha, beta).
///
/// Newton iteration seeded at the mean, with a shrinking bisection
/// bracket as a safeguard when a step leaves the bracket or the density
/// underflows near 0 or 1.
pub fn beta_quantile(p: f64, alpha: f64, beta: f64) -> f64 {
    if p.is_nan() || !params_valid(alpha, beta) {
        return f64::NAN;
    }
    if p <= 0.0 {
        return 0.0;
    }
    if p >= 1.0 {
        return 1.0;
    }

    let ln_b = log_beta(alpha, beta);
    let mut lo = 0.0_f64;
    let mut hi = 1.0_f64;
    let mut x = beta_mean(alpha, beta);

    for _ in 0..200 {
        let err = beta_cdf(x, alpha, beta) - p;
        if err.abs() < 1e-13 {
            return x;
        }
        if err > 0.0 {
            hi = x;
        } else {
            lo = x;
        }
        let log_pdf = (alpha - 1.0) * x.ln() + (beta - 1.0) * (-x).ln_1p() - ln_b;
        let mut next = x - err / log_pdf.exp();
        if !next.is_finite() || next <= lo || next >= hi {
            next = 0.5 * (lo + hi);
        }
        if (next - x).abs() < 1e-15 {
            return next;
        }
        x = next;
    }
    x
}

fn lentz_fraction(x: f64, a: f64, b: f64) -> f64 {
    let mut c = 1.0_f64;
    let mut d = 1.0 - (a + b) * x / (a + 1.0);
    if d.abs() < CF_TINY {
        d = CF_TINY;
    }
    d = 1.0 / d;
    let mut value = d;

    for m in 1..=CF_MAX_ITERS {
        let mf = m as f64;
        // Even step.
        let num = mf * (b - mf) * x / ((a + 2.0 * mf - 1.0) * (a + 2.0 * mf));
        d = 1.0 + num * d;
        if d.abs() < CF_TINY {
            d = CF_TINY;
        }
        c = 1.0 + num / c;
        if c.abs() < CF_TINY {
            c = CF_TINY;
        }
        d = 1.0 / d;
        value *= d * c;

        // Odd step.
        let num = -(a + mf) * (a + b + mf) * x / ((a + 2.0 * mf) * (a + 2.0 * mf + 1.0));
        d = 1.0 + num * d;
        if d.abs() < CF_TINY {
            d = CF_TINY;
        }
        c = 1.0 + num / c;
        if c.abs() < CF_TINY {
            c = CF_TINY;
        }
        d = 1.0 / d;
        let delta = d * c;
        value *= delta;
        if (delta - 1.0).abs() < CF_EPS {
            break;
        }
    }
    value
}

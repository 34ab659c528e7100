//! Log-domain special functions.

use std::f64::consts::PI;

// Lanczos approximation, g = 7, n = 9 (published coefficients).
const G: f64 = 7.0;
#[allow(clippy::excessive_precision)]
const COEFFS: [f64; 9] = [
    0.999_999_999_999_809_93,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_59,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_571_6e-6,
    1.505_632_735_149_311_6e-7,
];
const HALF_LOG_TWO_PI: f64 = 0.918_938_533_204_672_8;

/// Natural log of |Gamma(z)|.
///
/// Lanczos approximation for z >= 0.5, reflection formula below that.
/// NaN for NaN input and for the poles at z = 0, -1, -2, ...
pub fn log_gamma(z: f64) -> f64 {
    if z.is_nan() || z == f64::NEG_INFINITY {
        return f64::NAN;
    }
    if z == f64::INFINITY {
        return f64::INFINITY;
    }
    if z <= 0.0 && (z - z.round()).abs() < 1e-15 {
        return f64::NAN;
    }
    if z < 0.5 {
        // Gamma(z) * Gamma(1-z) = pi / sin(pi z)
        let sin_term = (PI * z).sin().abs();
        if sin_term == 0.0 {
            return f64::NAN;
        }
        return PI.ln() - sin_term.ln() - log_gamma(1.0 - z);
    }

    let x = z - 1.0;
    let mut series = COEFFS[0];
    for (i, c) in COEFFS.iter().enumerate().skip(1) {
        series += c / (x + i as f64);
    }
    let t = x + G + 0.5;
    HALF_LOG_TWO_PI + (x + 0.5) * t.ln() - t + series.ln()
}

/// log B(a, b) = log Gamma(a) + log Gamma(b) - log Gamma(a + b).
pub fn log_beta(a: f64, b: f64) -> f64 {
    log_gamma(a) + log_gamma(b) - log_gamma(a + b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() || b.is_nan() {
            return false;
        }
        (a - b).abs() <= tol
    }

    #[test]
    fn log_gamma_integers() {
        // Gamma(n) = (n-1)!
        assert!(approx_eq(log_gamma(1.0), 0.0, 1e-12));
        assert!(approx_eq(log_gamma(2.0), 0.0, 1e-12));
        assert!(approx_eq(log_gamma(6.0), 120.0f64.ln(), 1e-10));
    }

    #[test]
    fn log_gamma_half() {
        // Gamma(1/2) = sqrt(pi)
        assert!(approx_eq(log_gamma(0.5), 0.5 * PI.ln(), 1e-10));
    }

    #[test]
    fn log_gamma_recurrence() {
        // Gamma(z+1) = z Gamma(z)
        let z = 3.7;
        assert!(approx_eq(log_gamma(z + 1.0), z.ln() + log_gamma(z), 1e-10));
    }

    #[test]
    fn log_gamma_poles_are_nan() {
        assert!(log_gamma(0.0).is_nan());
        assert!(log_gamma(-3.0).is_nan());
    }

    #[test]
    fn log_beta_uniform() {
        // B(1, 1) = 1
        assert!(approx_eq(log_beta(1.0, 1.0), 0.0, 1e-12));
    }

    #[test]
    fn log_beta_symmetric() {
        assert!(approx_eq(log_beta(2.5, 7.0), log_beta(7.0, 2.5), 1e-12));
    }

    #[test]
    fn log_beta_known_value() {
        // B(2, 5) = 1!·4!/6! = 1/30
        assert!(approx_eq(log_beta(2.0, 5.0), (1.0f64 / 30.0).ln(), 1e-10));
    }
}

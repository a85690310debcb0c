//! Finite-f64 helpers.
//!
//! All arithmetic runs on plain doubles; the rule everywhere is that a
//! non-finite intermediate or result is an error, never a value. These
//! helpers keep that check in one place.

use crate::error::CalcError;

/// Tolerance for "effectively zero" guards (variance checks and the like).
pub const NEAR_ZERO: f64 = 1e-12;

/// Pass a finite number through, or fail naming what overflowed.
pub fn ensure_finite(x: f64, what: &str) -> Result<f64, CalcError> {
    if x.is_finite() {
        Ok(x)
    } else {
        Err(CalcError::not_finite(what))
    }
}

/// Round to a number of decimal digits. Negative digits round to tens,
/// hundreds and so on.
pub fn round_to_digits(x: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (x * scale).round() / scale
}

/// Absolute-difference comparison.
pub fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

/// An f64 that is exactly a (small) integer, or nothing.
pub fn as_exact_int(x: f64) -> Option<i64> {
    if x.is_finite() && x.fract() == 0.0 && x.abs() <= i64::MAX as f64 {
        Some(x as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_finite() {
        assert_eq!(ensure_finite(1.5, "x").unwrap(), 1.5);
        assert!(ensure_finite(f64::INFINITY, "x").is_err());
        assert!(ensure_finite(f64::NAN, "x").is_err());
    }

    #[test]
    fn test_round_to_digits() {
        assert_eq!(round_to_digits(2.678, 2), 2.68);
        assert_eq!(round_to_digits(1234.5, -2), 1200.0);
        assert_eq!(round_to_digits(1.5, 0), 2.0);
    }

    #[test]
    fn test_as_exact_int() {
        assert_eq!(as_exact_int(4.0), Some(4));
        assert_eq!(as_exact_int(-2.0), Some(-2));
        assert_eq!(as_exact_int(4.5), None);
        assert_eq!(as_exact_int(f64::NAN), None);
    }
}

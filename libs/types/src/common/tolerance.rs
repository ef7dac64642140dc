//! Tolerant floating-point comparison
//!
//! Load amounts are accumulated and subtracted many times per round; exact
//! comparison against zero starves on rounding residue.

use std::cmp::Ordering;

/// Two amounts closer than this are treated as equal
pub const DOUBLE_TOLERANCE: f64 = 1e-6;

/// Compare `a` and `b`, treating values within [`DOUBLE_TOLERANCE`] as equal.
///
/// NaN sorts after every number so that `sort_by(compare_double)` never panics.
pub fn compare_double(a: f64, b: f64) -> Ordering {
    if (a - b).abs() <= DOUBLE_TOLERANCE {
        Ordering::Equal
    } else {
        a.total_cmp(&b)
    }
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    compare_double(a, b) == Ordering::Equal
}

pub fn approx_zero(value: f64) -> bool {
    approx_eq(value, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_tolerance_is_equal() {
        assert_eq!(compare_double(1.0, 1.0 + DOUBLE_TOLERANCE / 2.0), Ordering::Equal);
        assert!(approx_zero(0.1 + 0.2 - 0.3));
    }

    #[test]
    fn test_outside_tolerance_orders() {
        assert_eq!(compare_double(1.0, 1.1), Ordering::Less);
        assert_eq!(compare_double(2.0, 1.0), Ordering::Greater);
        assert_eq!(compare_double(-0.01, 0.0), Ordering::Less);
    }
}

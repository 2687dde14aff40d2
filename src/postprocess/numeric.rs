//! Numerically safe handling of solved continuous values.
//!
//! Solver values carry floating-point noise. Rounding them to two decimals
//! can push the left-hand side of a capacity row above its right-hand side,
//! so persisted and re-validated values are truncated toward zero instead.

/// Decimal places kept when persisting solved values
pub const TRUNCATION_DIGITS: u32 = 2;

/// Truncated values below `-NEGATIVE_TOLERANCE` are reported as anomalies
pub const NEGATIVE_TOLERANCE: f64 = 1e-6;

/// Absolute tolerance of the demand conservation check, scaled by `max(1, demand)`
pub const DEMAND_TOLERANCE: f64 = 1e-6;

/// Assignments at or below this value are not reported as shipments
pub const SHIPMENT_EPSILON: f64 = 1e-6;

/// Scaled magnitudes from here on are all integers in f64
const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

/// Truncate toward zero at `digits` decimal places.
///
/// Returns the multiple of `10^-digits` with the largest magnitude not
/// exceeding `|value|`, computed in the same floating-point arithmetic the
/// result is compared in. Consequently `truncate(v).abs() <= v.abs()` and
/// `truncate(truncate(v)) == truncate(v)` hold for every finite `v`.
/// Non-finite values, and values too large to carry a fractional part at
/// this precision, are returned unchanged.
pub fn truncate(value: f64, digits: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scale = 10f64.powi(digits as i32);
    let magnitude = value.abs();
    if !(magnitude * scale < EXACT_INTEGER_LIMIT) {
        return value;
    }

    let mut units = (magnitude * scale).floor();
    // `magnitude * scale` is itself rounded; step back or forward one unit
    // so the result is the largest representable multiple below `magnitude`.
    if units / scale > magnitude {
        units -= 1.0;
    } else if (units + 1.0) / scale <= magnitude {
        units += 1.0;
    }

    let truncated = units / scale;
    if value.is_sign_negative() {
        -truncated
    } else {
        truncated
    }
}

/// Naive half-away-from-zero rounding.
///
/// Kept to show why it is unsafe for capacity rows, see [`truncate`].
pub fn round_half_away(value: f64, digits: u32) -> f64 {
    let scale = 10f64.powi(digits as i32);
    (value * scale).round() / scale
}

/// Sum of truncated terms; never exceeds the sum of the original
/// non-negative terms
pub fn truncated_sum<I: IntoIterator<Item = f64>>(values: I, digits: u32) -> f64 {
    values.into_iter().map(|v| truncate(v, digits)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_truncates_instead_of_rounding() {
        assert_eq!(truncate(12.995, 2), 12.99);
        assert_ne!(truncate(12.995, 2), 13.0);
        assert_eq!(truncate(12.999, 2), 12.99);
        assert_eq!(round_half_away(12.999, 2), 13.0);
    }

    #[test]
    fn test_exact_decimals_survive() {
        // 0.29 * 100 evaluates to 28.999999999999996
        assert_eq!(truncate(0.29, 2), 0.29);
        assert_eq!(truncate(200.0, 2), 200.0);
        assert_eq!(truncate(0.0, 2), 0.0);
    }

    #[test]
    fn test_negative_values_truncate_toward_zero() {
        assert_eq!(truncate(-1.239, 2), -1.23);
        assert_eq!(truncate(-0.001, 2), 0.0);
        assert!(truncate(-0.5, 2) < 0.0);
    }

    #[test]
    fn test_non_finite_passthrough() {
        assert!(truncate(f64::NAN, 2).is_nan());
        assert_eq!(truncate(f64::INFINITY, 2), f64::INFINITY);
    }

    #[test]
    fn test_huge_values_are_left_alone() {
        assert_eq!(truncate(1.0e307, 2), 1.0e307);
        assert_eq!(truncate(f64::MAX, 2), f64::MAX);
        assert_eq!(truncate(-f64::MAX, 2), -f64::MAX);
        assert_eq!(truncate(1.0e16, 2), 1.0e16);
        // Still truncated just below the limit
        assert_eq!(truncate(1.0e12 + 0.375, 2), 1.0e12 + 0.37);
    }

    #[test]
    fn test_rounding_breaks_capacity_truncation_keeps_it() {
        // One slow charger (capacity 200) serving three customers
        let capacity = 200.0;
        let flows = [66.667, 66.667, 66.666];

        let rounded: f64 = flows.iter().map(|f| round_half_away(*f, 2)).sum();
        assert!(rounded > capacity, "rounded sum {} should exceed capacity", rounded);

        let truncated = truncated_sum(flows, 2);
        assert!(truncated <= truncate(capacity, 2));
        assert!((truncated - 199.98).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_truncation_never_increases(v in 0.0f64..1e9) {
            prop_assert!(truncate(v, 2) <= v);
        }

        #[test]
        fn prop_truncation_never_grows_any_finite(v in proptest::num::f64::NORMAL) {
            let t = truncate(v, 2);
            prop_assert!(t.is_finite());
            prop_assert!(t.abs() <= v.abs());
        }

        #[test]
        fn prop_truncation_is_idempotent(v in -1e9f64..1e9) {
            let once = truncate(v, 2);
            prop_assert_eq!(truncate(once, 2), once);
        }

        #[test]
        fn prop_truncation_loses_less_than_one_unit(v in 0.0f64..1e6) {
            prop_assert!(v - truncate(v, 2) < 0.01 + 1e-9);
        }

        #[test]
        fn prop_truncated_sum_bounded(values in proptest::collection::vec(0.0f64..1e4, 0..20)) {
            let total: f64 = values.iter().sum();
            prop_assert!(truncated_sum(values.iter().copied(), 2) <= total + 1e-9);
        }
    }
}

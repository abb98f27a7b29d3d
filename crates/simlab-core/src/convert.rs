//! Conversions between the money domain (`Decimal`) and the statistics domain (`f64`).

use num_traits::ToPrimitive;
use rust_decimal::Decimal;

/// Convert a float into a `Decimal`, rejecting NaN and infinities.
pub fn decimal_from_f64(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::try_from(value).ok()
}

/// Convert a `Decimal` into a float. Values outside the `f64` range map to 0.
pub fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decimal_from_f64() {
        assert_eq!(decimal_from_f64(100.0), Some(dec!(100)));
        assert_eq!(decimal_from_f64(0.25), Some(dec!(0.25)));
        assert!(decimal_from_f64(f64::NAN).is_none());
        assert!(decimal_from_f64(f64::INFINITY).is_none());
    }

    #[test]
    fn test_decimal_to_f64() {
        assert!((decimal_to_f64(dec!(10098.95)) - 10098.95).abs() < 1e-9);
        assert_eq!(decimal_to_f64(Decimal::ZERO), 0.0);
    }
}

//! Parameter-set decoding shared by the reference strategies.

use simlab_core::error::StrategyError;
use simlab_core::traits::ParamSet;

/// Reject parameter names a strategy does not understand.
pub(crate) fn check_known(params: &ParamSet, known: &[&str]) -> Result<(), StrategyError> {
    match params.keys().find(|k| !known.contains(&k.as_str())) {
        Some(unknown) => Err(StrategyError::InvalidConfig(format!(
            "unknown parameter '{}', expected one of: {}",
            unknown,
            known.join(", ")
        ))),
        None => Ok(()),
    }
}

/// A whole, positive period.
pub(crate) fn period(name: &str, value: f64) -> Result<usize, StrategyError> {
    if value >= 1.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
        Ok(value as usize)
    } else {
        Err(StrategyError::InvalidConfig(format!(
            "{} must be a positive whole number, got {}",
            name, value
        )))
    }
}

pub(crate) fn flag(value: f64) -> bool {
    value >= 0.5
}

/// Zero disables an optional percentage.
pub(crate) fn optional_pct(value: f64) -> Option<f64> {
    (value > 0.0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period() {
        assert_eq!(period("p", 14.0).unwrap(), 14);
        assert!(period("p", 0.0).is_err());
        assert!(period("p", 2.5).is_err());
        assert!(period("p", -3.0).is_err());
    }

    #[test]
    fn test_check_known() {
        let params = ParamSet::from([("fast".to_string(), 1.0)]);
        assert!(check_known(&params, &["fast", "slow"]).is_ok());
        assert!(check_known(&params, &["slow"]).is_err());
    }
}

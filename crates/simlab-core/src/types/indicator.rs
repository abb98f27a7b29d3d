//! Closed enumeration of the indicators available to strategies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::IndicatorError;

/// An indicator request: kind plus its fixed parameter set.
///
/// Parses from compact strings such as `sma:20`, `macd:12:26:9` or
/// `bbands:20:2`. Unknown kinds and bad parameters are rejected up front.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndicatorSpec {
    Sma { period: usize },
    Ema { period: usize },
    Rsi { period: usize },
    Atr { period: usize },
    Macd { fast: usize, slow: usize, signal: usize },
    Bollinger { period: usize, multiplier: f64 },
}

impl IndicatorSpec {
    /// Check the parameter set.
    pub fn validate(&self) -> Result<(), IndicatorError> {
        match *self {
            IndicatorSpec::Sma { period } | IndicatorSpec::Ema { period } => {
                require_period(period, 1)
            }
            IndicatorSpec::Rsi { period } | IndicatorSpec::Atr { period } => {
                require_period(period, 1)
            }
            IndicatorSpec::Macd { fast, slow, signal } => {
                require_period(fast, 1)?;
                require_period(signal, 1)?;
                if fast >= slow {
                    return Err(IndicatorError::InvalidParameter(format!(
                        "MACD fast period ({}) must be less than slow period ({})",
                        fast, slow
                    )));
                }
                Ok(())
            }
            IndicatorSpec::Bollinger { period, multiplier } => {
                require_period(period, 2)?;
                if !(multiplier.is_finite() && multiplier > 0.0) {
                    return Err(IndicatorError::InvalidParameter(format!(
                        "Bollinger multiplier must be positive, got {}",
                        multiplier
                    )));
                }
                Ok(())
            }
        }
    }

    /// Minimum number of bars before a value is produced.
    pub fn warmup(&self) -> usize {
        match *self {
            IndicatorSpec::Sma { period }
            | IndicatorSpec::Ema { period }
            | IndicatorSpec::Bollinger { period, .. } => period,
            IndicatorSpec::Rsi { period } | IndicatorSpec::Atr { period } => period + 1,
            IndicatorSpec::Macd { slow, signal, .. } => slow + signal - 1,
        }
    }

    /// Bars of history an evaluation looks at: three warmups.
    ///
    /// Recursive indicators (EMA, RSI, ATR, MACD) are seeded at the start of
    /// this window, so older history has no effect on the value.
    pub fn lookback(&self) -> usize {
        self.warmup() * 3
    }
}

fn require_period(period: usize, min: usize) -> Result<(), IndicatorError> {
    if period < min {
        return Err(IndicatorError::InvalidParameter(format!(
            "period must be at least {}, got {}",
            min, period
        )));
    }
    Ok(())
}

impl fmt::Display for IndicatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorSpec::Sma { period } => write!(f, "sma:{}", period),
            IndicatorSpec::Ema { period } => write!(f, "ema:{}", period),
            IndicatorSpec::Rsi { period } => write!(f, "rsi:{}", period),
            IndicatorSpec::Atr { period } => write!(f, "atr:{}", period),
            IndicatorSpec::Macd { fast, slow, signal } => {
                write!(f, "macd:{}:{}:{}", fast, slow, signal)
            }
            IndicatorSpec::Bollinger { period, multiplier } => {
                write!(f, "bbands:{}:{}", period, multiplier)
            }
        }
    }
}

impl FromStr for IndicatorSpec {
    type Err = IndicatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split(':');
        let kind = parts.next().unwrap_or_default().to_lowercase();
        let args: Vec<&str> = parts.collect();

        let int = |i: usize| -> Result<usize, IndicatorError> {
            let raw = args.get(i).ok_or_else(|| {
                IndicatorError::InvalidParameter(format!("{}: missing argument {}", s, i + 1))
            })?;
            raw.parse::<usize>().map_err(|_| {
                IndicatorError::InvalidParameter(format!("{}: '{}' is not a period", s, raw))
            })
        };

        let spec = match kind.as_str() {
            "sma" => IndicatorSpec::Sma { period: int(0)? },
            "ema" => IndicatorSpec::Ema { period: int(0)? },
            "rsi" => IndicatorSpec::Rsi { period: int(0)? },
            "atr" => IndicatorSpec::Atr { period: int(0)? },
            "macd" => IndicatorSpec::Macd {
                fast: int(0)?,
                slow: int(1)?,
                signal: int(2)?,
            },
            "bbands" | "bollinger" => {
                let multiplier = match args.get(1) {
                    Some(raw) => raw.parse::<f64>().map_err(|_| {
                        IndicatorError::InvalidParameter(format!(
                            "{}: '{}' is not a multiplier",
                            s, raw
                        ))
                    })?,
                    None => 2.0,
                };
                IndicatorSpec::Bollinger {
                    period: int(0)?,
                    multiplier,
                }
            }
            other => return Err(IndicatorError::UnknownKind(other.to_string())),
        };

        spec.validate()?;
        Ok(spec)
    }
}

/// Indicator output for a single bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IndicatorValue {
    Single { value: f64 },
    Macd { macd: f64, signal: f64, histogram: f64 },
    Bands { upper: f64, middle: f64, lower: f64 },
}

impl IndicatorValue {
    /// The scalar value for single-output indicators.
    pub fn as_single(&self) -> Option<f64> {
        match self {
            IndicatorValue::Single { value } => Some(*value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_specs() {
        assert_eq!(
            "sma:20".parse::<IndicatorSpec>().unwrap(),
            IndicatorSpec::Sma { period: 20 }
        );
        assert_eq!(
            "MACD:12:26:9".parse::<IndicatorSpec>().unwrap(),
            IndicatorSpec::Macd { fast: 12, slow: 26, signal: 9 }
        );
        assert_eq!(
            "bbands:20".parse::<IndicatorSpec>().unwrap(),
            IndicatorSpec::Bollinger { period: 20, multiplier: 2.0 }
        );
    }

    #[test]
    fn test_rejects_unknown_kind() {
        assert_eq!(
            "vwap:10".parse::<IndicatorSpec>(),
            Err(IndicatorError::UnknownKind("vwap".to_string()))
        );
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert!("sma:0".parse::<IndicatorSpec>().is_err());
        assert!("ema:abc".parse::<IndicatorSpec>().is_err());
        assert!("macd:26:12:9".parse::<IndicatorSpec>().is_err());
        assert!("bbands:20:-1".parse::<IndicatorSpec>().is_err());
        assert!("rsi".parse::<IndicatorSpec>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        let spec = IndicatorSpec::Macd { fast: 5, slow: 35, signal: 5 };
        assert_eq!(spec.to_string().parse::<IndicatorSpec>().unwrap(), spec);
    }

    #[test]
    fn test_warmup() {
        assert_eq!(IndicatorSpec::Rsi { period: 14 }.warmup(), 15);
        assert_eq!(IndicatorSpec::Macd { fast: 12, slow: 26, signal: 9 }.warmup(), 34);
    }
}

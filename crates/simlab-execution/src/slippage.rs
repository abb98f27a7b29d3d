//! Slippage models.
//!
//! A model returns a signed fraction of the reference price. Buys receive a
//! positive fraction (pay more), sells a negative one (receive less).

use serde::{Deserialize, Serialize};
use simlab_core::types::Side;

use crate::error::ExecutionError;

/// Slippage calculation method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlippageModel {
    /// Fills at the reference price
    None,
    /// Constant fraction regardless of size
    Fixed { rate: f64 },
    /// `base_rate * (1 + ln(1 + notional / reference_size) / 10)`
    SizeScaled { base_rate: f64, reference_size: f64 },
    /// Size-scaled impact further multiplied by `1 + volatility * volatility_scalar`
    VolatilityScaled {
        base_rate: f64,
        reference_size: f64,
        volatility_scalar: f64,
        /// Used when the caller has no volatility estimate
        default_volatility: f64,
    },
}

impl Default for SlippageModel {
    fn default() -> Self {
        SlippageModel::SizeScaled {
            base_rate: 0.0001,
            reference_size: 10_000.0,
        }
    }
}

impl SlippageModel {
    /// Volatility-aware model with the stock constants.
    pub fn volatility_scaled() -> Self {
        SlippageModel::VolatilityScaled {
            base_rate: 0.0001,
            reference_size: 10_000.0,
            volatility_scalar: 10.0,
            default_volatility: 0.02,
        }
    }

    /// Signed slippage fraction for a fill of `notional` at `price`.
    pub fn slippage(&self, price: f64, notional: f64, side: Side) -> f64 {
        self.slippage_with_volatility(price, notional, side, None)
    }

    /// Same as [`slippage`](Self::slippage), with a volatility estimate for
    /// the volatility-scaled variant. Other variants ignore it.
    pub fn slippage_with_volatility(
        &self,
        price: f64,
        notional: f64,
        side: Side,
        volatility: Option<f64>,
    ) -> f64 {
        if !(price.is_finite() && price > 0.0) {
            return 0.0;
        }

        let magnitude = match *self {
            SlippageModel::None => 0.0,
            SlippageModel::Fixed { rate } => rate,
            SlippageModel::SizeScaled {
                base_rate,
                reference_size,
            } => base_rate * size_factor(notional, reference_size),
            SlippageModel::VolatilityScaled {
                base_rate,
                reference_size,
                volatility_scalar,
                default_volatility,
            } => {
                let vol = volatility
                    .filter(|v| v.is_finite() && *v >= 0.0)
                    .unwrap_or(default_volatility);
                base_rate * size_factor(notional, reference_size) * (1.0 + vol * volatility_scalar)
            }
        };

        match side {
            Side::Buy => magnitude,
            Side::Sell => -magnitude,
        }
    }

    pub fn validate(&self) -> Result<(), ExecutionError> {
        let non_negative = |name: &str, v: f64| {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(ExecutionError::InvalidSlippageModel(format!(
                    "{} must be a non-negative number, got {}",
                    name, v
                )))
            }
        };
        let positive = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(ExecutionError::InvalidSlippageModel(format!(
                    "{} must be positive, got {}",
                    name, v
                )))
            }
        };

        match *self {
            SlippageModel::None => Ok(()),
            SlippageModel::Fixed { rate } => non_negative("rate", rate),
            SlippageModel::SizeScaled {
                base_rate,
                reference_size,
            } => {
                non_negative("base_rate", base_rate)?;
                positive("reference_size", reference_size)
            }
            SlippageModel::VolatilityScaled {
                base_rate,
                reference_size,
                volatility_scalar,
                default_volatility,
            } => {
                non_negative("base_rate", base_rate)?;
                positive("reference_size", reference_size)?;
                non_negative("volatility_scalar", volatility_scalar)?;
                non_negative("default_volatility", default_volatility)
            }
        }
    }
}

/// Logarithmic growth of impact with order size relative to a reference size.
fn size_factor(notional: f64, reference_size: f64) -> f64 {
    1.0 + (notional.abs() / reference_size).ln_1p() / 10.0
}

//! Backtest configuration.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use simlab_core::types::Timeframe;
use simlab_execution::{FeeModel, SlippageModel};

use crate::error::BacktestError;

/// Backtest configuration. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// First bar included (inclusive). `None` starts at the first bar.
    pub start: Option<DateTime<Utc>>,
    /// Last bar included (inclusive). `None` runs to the last bar.
    pub end: Option<DateTime<Utc>>,
    /// Starting cash
    pub initial_capital: Decimal,
    pub fee_model: FeeModel,
    pub slippage_model: SlippageModel,
    /// Cap on a signal's size fraction of equity
    pub max_position_pct: Decimal,
    /// Peak-to-current drawdown that force-closes everything and ends the run
    pub max_drawdown_pct: Decimal,
    /// Bar interval of the input data
    pub timeframe: Timeframe,
    /// Annual risk-free rate for Sharpe/Sortino
    pub risk_free_rate: f64,
    /// Close-to-close returns used to estimate volatility for slippage
    pub volatility_lookback: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            initial_capital: dec!(10000),
            fee_model: FeeModel::default(),
            slippage_model: SlippageModel::default(),
            max_position_pct: dec!(0.25),
            max_drawdown_pct: dec!(0.20),
            timeframe: Timeframe::Daily,
            risk_free_rate: 0.05,
            volatility_lookback: 20,
        }
    }
}

impl BacktestConfig {
    pub fn with_range(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn with_capital(mut self, capital: Decimal) -> Self {
        self.initial_capital = capital;
        self
    }

    pub fn with_fee_model(mut self, model: FeeModel) -> Self {
        self.fee_model = model;
        self
    }

    pub fn with_slippage_model(mut self, model: SlippageModel) -> Self {
        self.slippage_model = model;
        self
    }

    pub fn with_max_position_pct(mut self, pct: Decimal) -> Self {
        self.max_position_pct = pct;
        self
    }

    pub fn with_max_drawdown_pct(mut self, pct: Decimal) -> Self {
        self.max_drawdown_pct = pct;
        self
    }

    /// Check run-invalidating settings.
    pub fn validate(&self) -> Result<(), BacktestError> {
        if self.initial_capital <= Decimal::ZERO {
            return Err(BacktestError::InvalidConfig(format!(
                "initial_capital must be positive, got {}",
                self.initial_capital
            )));
        }

        if let (Some(start), Some(end)) = (self.start, self.end) {
            if end <= start {
                return Err(BacktestError::InvalidConfig(format!(
                    "end ({}) must be after start ({})",
                    end, start
                )));
            }
        }

        let in_unit_range = |v: Decimal| v > Decimal::ZERO && v <= Decimal::ONE;
        if !in_unit_range(self.max_position_pct) {
            return Err(BacktestError::InvalidConfig(format!(
                "max_position_pct must be in (0, 1], got {}",
                self.max_position_pct
            )));
        }
        if !in_unit_range(self.max_drawdown_pct) {
            return Err(BacktestError::InvalidConfig(format!(
                "max_drawdown_pct must be in (0, 1], got {}",
                self.max_drawdown_pct
            )));
        }

        if !self.risk_free_rate.is_finite() {
            return Err(BacktestError::InvalidConfig(
                "risk_free_rate must be finite".into(),
            ));
        }
        if self.volatility_lookback < 2 {
            return Err(BacktestError::InvalidConfig(
                "volatility_lookback must be at least 2".into(),
            ));
        }

        self.fee_model.validate()?;
        self.slippage_model.validate()?;
        Ok(())
    }

    pub(crate) fn start_millis(&self) -> i64 {
        self.start.map(|t| t.timestamp_millis()).unwrap_or(i64::MIN)
    }

    pub(crate) fn end_millis(&self) -> i64 {
        self.end.map(|t| t.timestamp_millis()).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_is_valid() {
        assert!(BacktestConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_capital_and_range() {
        let config = BacktestConfig::default().with_capital(dec!(0));
        assert!(matches!(config.validate(), Err(BacktestError::InvalidConfig(_))));

        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let config = BacktestConfig::default().with_range(Some(start), Some(end));
        assert!(matches!(config.validate(), Err(BacktestError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_out_of_range_limits() {
        let config = BacktestConfig::default().with_max_position_pct(dec!(1.5));
        assert!(config.validate().is_err());

        let config = BacktestConfig::default().with_max_drawdown_pct(dec!(0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_invalid_models() {
        let config = BacktestConfig::default()
            .with_slippage_model(SlippageModel::Fixed { rate: -1.0 });
        assert!(matches!(config.validate(), Err(BacktestError::Execution(_))));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let json = serde_json::json!({ "initial_capital": "5000" });
        let config: BacktestConfig = serde_json::from_value(json).unwrap();

        assert_eq!(config.initial_capital, dec!(5000));
        assert_eq!(config.max_position_pct, dec!(0.25));
        assert_eq!(config.timeframe, Timeframe::Daily);
    }
}

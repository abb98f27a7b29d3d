//! RSI-based Trading Strategy.
//!
//! Buys when RSI crosses back above the oversold level and exits once it
//! reaches the overbought exit level. Optionally mirrors the rule for shorts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use simlab_core::error::StrategyError;
use simlab_core::traits::{ParamSet, Strategy, StrategyContext};
use simlab_core::types::{IndicatorSpec, Side, Signal};
use tracing::debug;

use crate::params::{check_known, flag, period};

/// Configuration for the RSI strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiConfig {
    /// RSI calculation period
    pub period: usize,
    /// Overbought threshold (short entries cross below this)
    pub overbought: f64,
    /// Oversold threshold (long entries cross above this)
    pub oversold: f64,
    /// Exit level for longs
    pub exit_overbought: f64,
    /// Exit level for shorts
    pub exit_oversold: f64,
    /// Allow short positions
    pub allow_short: bool,
    /// Fraction of equity per entry
    pub size_fraction: f64,
}

impl Default for RsiConfig {
    fn default() -> Self {
        Self {
            period: 14,
            overbought: 70.0,
            oversold: 30.0,
            exit_overbought: 70.0,
            exit_oversold: 30.0,
            allow_short: false,
            size_fraction: 0.2,
        }
    }
}

impl RsiConfig {
    pub const PARAMS: &'static [&'static str] = &[
        "period",
        "overbought",
        "oversold",
        "exit_overbought",
        "exit_oversold",
        "allow_short",
        "size_fraction",
    ];

    /// Defaults overridden by any parameters present in `params`.
    pub fn from_params(params: &ParamSet) -> Result<Self, StrategyError> {
        check_known(params, Self::PARAMS)?;
        let mut config = Self::default();
        for (name, &value) in params {
            match name.as_str() {
                "period" => config.period = period(name, value)?,
                "overbought" => config.overbought = value,
                "oversold" => config.oversold = value,
                "exit_overbought" => config.exit_overbought = value,
                "exit_oversold" => config.exit_oversold = value,
                "allow_short" => config.allow_short = flag(value),
                "size_fraction" => config.size_fraction = value,
                _ => {}
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.period < 2 {
            return Err(StrategyError::InvalidConfig(
                "RSI period must be at least 2".into(),
            ));
        }
        if self.overbought <= self.oversold {
            return Err(StrategyError::InvalidConfig(
                "Overbought must be greater than oversold".into(),
            ));
        }
        let levels = [self.overbought, self.oversold, self.exit_overbought, self.exit_oversold];
        if levels.iter().any(|l| !(0.0..=100.0).contains(l)) {
            return Err(StrategyError::InvalidConfig(
                "RSI thresholds must be between 0 and 100".into(),
            ));
        }
        if !(self.size_fraction > 0.0 && self.size_fraction <= 1.0) {
            return Err(StrategyError::InvalidConfig(
                "Size fraction must be in (0, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// RSI-based Trading Strategy.
pub struct RsiStrategy {
    config: RsiConfig,
    prev_rsi: BTreeMap<String, f64>,
    signals_generated: usize,
}

impl RsiStrategy {
    pub fn new(config: RsiConfig) -> Result<Self, StrategyError> {
        config.validate()?;
        Ok(Self {
            config,
            prev_rsi: BTreeMap::new(),
            signals_generated: 0,
        })
    }

    pub fn config(&self) -> &RsiConfig {
        &self.config
    }

    pub fn signals_generated(&self) -> usize {
        self.signals_generated
    }

    /// Decide on one symbol given the previous and current RSI and the open side.
    fn decide(&self, symbol: &str, prev: f64, current: f64, open: Option<Side>) -> Option<Signal> {
        let c = &self.config;
        match open {
            None if prev <= c.oversold && current > c.oversold => {
                Some(Signal::buy(symbol, c.size_fraction))
            }
            None if c.allow_short && prev >= c.overbought && current < c.overbought => {
                Some(Signal::sell(symbol, c.size_fraction))
            }
            Some(Side::Buy) if current >= c.exit_overbought => Some(Signal::close(symbol)),
            Some(Side::Sell) if current <= c.exit_oversold => Some(Signal::close(symbol)),
            _ => None,
        }
    }
}

impl Strategy for RsiStrategy {
    fn name(&self) -> &str {
        "rsi"
    }

    fn init(&mut self, _ctx: &dyn StrategyContext) {
        self.prev_rsi.clear();
        self.signals_generated = 0;
    }

    fn next(&mut self, ctx: &dyn StrategyContext) -> Vec<Signal> {
        let spec = IndicatorSpec::Rsi {
            period: self.config.period,
        };
        let mut signals = Vec::new();

        for symbol in ctx.symbols() {
            let Some(current) = ctx.indicator(symbol, &spec).and_then(|v| v.as_single()) else {
                continue;
            };
            if let Some(&prev) = self.prev_rsi.get(symbol) {
                let open = ctx.position(symbol).map(|p| p.side);
                if let Some(signal) = self.decide(symbol, prev, current, open) {
                    debug!(symbol = %symbol, rsi = current, action = %signal.action, "RSI signal");
                    signals.push(signal);
                }
            }
            self.prev_rsi.insert(symbol.clone(), current);
        }

        self.signals_generated += signals.len();
        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simlab_backtest::{BacktestConfig, BacktestEngine};
    use simlab_core::types::{Bar, SignalAction};

    fn strategy(allow_short: bool) -> RsiStrategy {
        RsiStrategy::new(RsiConfig {
            period: 5,
            allow_short,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_config_validation() {
        assert!(RsiConfig::default().validate().is_ok());

        let config = RsiConfig {
            overbought: 30.0,
            oversold: 70.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RsiConfig {
            exit_overbought: 120.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_params() {
        let params = ParamSet::from([("period".to_string(), 7.0), ("allow_short".to_string(), 1.0)]);
        let config = RsiConfig::from_params(&params).unwrap();
        assert_eq!(config.period, 7);
        assert!(config.allow_short);

        let params = ParamSet::from([("period".to_string(), 1.0)]);
        assert!(RsiConfig::from_params(&params).is_err());
    }

    #[test]
    fn test_decisions() {
        let long_only = strategy(false);

        let entry = long_only.decide("X", 25.0, 35.0, None).unwrap();
        assert_eq!(entry.action, SignalAction::Buy);
        assert!(long_only.decide("X", 35.0, 40.0, None).is_none());
        assert!(long_only.decide("X", 75.0, 65.0, None).is_none());

        let exit = long_only.decide("X", 60.0, 72.0, Some(Side::Buy)).unwrap();
        assert_eq!(exit.action, SignalAction::Close);
        assert!(long_only.decide("X", 60.0, 65.0, Some(Side::Buy)).is_none());

        let both = strategy(true);
        let short = both.decide("X", 75.0, 65.0, None).unwrap();
        assert_eq!(short.action, SignalAction::Sell);
        let cover = both.decide("X", 35.0, 28.0, Some(Side::Sell)).unwrap();
        assert_eq!(cover.action, SignalAction::Close);
    }

    #[test]
    fn test_oversold_recovery_trades() {
        let prices = [
            100.0, 99.0, 98.0, 97.0, 96.0, // Initial decline
            95.0, 94.0, 93.0, 92.0, 91.0, // Continued decline (oversold)
            92.0, 93.0, 94.0, 95.0, 96.0, 97.0, 98.0, // Recovery
        ];
        let bars = prices
            .iter()
            .enumerate()
            .map(|(i, &p)| Bar::flat(i as i64 * 86_400_000, p))
            .collect();
        let data = BTreeMap::from([("TEST".to_string(), bars)]);

        let mut rsi = strategy(false);
        let result = BacktestEngine::new(BacktestConfig::default())
            .run(&mut rsi, &data)
            .unwrap();

        assert!(!result.fills.is_empty());
        assert_eq!(result.fills[0].side, Side::Buy);
        assert!(rsi.signals_generated() >= 1);
    }
}

//! Moving Average Crossover Strategy.
//!
//! Goes long when the fast MA crosses above the slow MA and closes when it
//! crosses back below.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use simlab_core::error::StrategyError;
use simlab_core::traits::{ParamSet, Strategy, StrategyContext};
use simlab_core::types::{IndicatorSpec, Signal};
use tracing::debug;

use crate::params::{check_known, flag, optional_pct, period};

/// Configuration for the MA Crossover strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaCrossoverConfig {
    /// Fast moving average period
    pub fast_period: usize,
    /// Slow moving average period
    pub slow_period: usize,
    /// Use EMA instead of SMA
    pub use_ema: bool,
    /// Minimum crossover magnitude to act on (fraction of the slow MA)
    pub signal_threshold: f64,
    /// Fraction of equity per entry
    pub size_fraction: f64,
    /// Stop distance below entry, as a fraction of price
    pub stop_loss_pct: Option<f64>,
    /// Target distance above entry, as a fraction of price
    pub take_profit_pct: Option<f64>,
}

impl Default for MaCrossoverConfig {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            use_ema: true,
            signal_threshold: 0.001,
            size_fraction: 0.2,
            stop_loss_pct: None,
            take_profit_pct: None,
        }
    }
}

impl MaCrossoverConfig {
    pub const PARAMS: &'static [&'static str] = &[
        "fast_period",
        "slow_period",
        "use_ema",
        "signal_threshold",
        "size_fraction",
        "stop_loss_pct",
        "take_profit_pct",
    ];

    /// Defaults overridden by any parameters present in `params`.
    pub fn from_params(params: &ParamSet) -> Result<Self, StrategyError> {
        check_known(params, Self::PARAMS)?;
        let mut config = Self::default();
        for (name, &value) in params {
            match name.as_str() {
                "fast_period" => config.fast_period = period(name, value)?,
                "slow_period" => config.slow_period = period(name, value)?,
                "use_ema" => config.use_ema = flag(value),
                "signal_threshold" => config.signal_threshold = value,
                "size_fraction" => config.size_fraction = value,
                "stop_loss_pct" => config.stop_loss_pct = optional_pct(value),
                "take_profit_pct" => config.take_profit_pct = optional_pct(value),
                _ => {}
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.fast_period == 0 {
            return Err(StrategyError::InvalidConfig(
                "Fast period must be greater than 0".into(),
            ));
        }
        if self.fast_period >= self.slow_period {
            return Err(StrategyError::InvalidConfig(
                "Fast period must be less than slow period".into(),
            ));
        }
        if !(self.signal_threshold >= 0.0) {
            return Err(StrategyError::InvalidConfig(
                "Signal threshold must be non-negative".into(),
            ));
        }
        if !(self.size_fraction > 0.0 && self.size_fraction <= 1.0) {
            return Err(StrategyError::InvalidConfig(
                "Size fraction must be in (0, 1]".into(),
            ));
        }
        for pct in [self.stop_loss_pct, self.take_profit_pct].into_iter().flatten() {
            if !(pct > 0.0 && pct < 1.0) {
                return Err(StrategyError::InvalidConfig(format!(
                    "Stop and target percentages must be in (0, 1), got {}",
                    pct
                )));
            }
        }
        Ok(())
    }

    fn spec(&self, period: usize) -> IndicatorSpec {
        if self.use_ema {
            IndicatorSpec::Ema { period }
        } else {
            IndicatorSpec::Sma { period }
        }
    }
}

/// Moving Average Crossover Strategy.
pub struct MaCrossoverStrategy {
    config: MaCrossoverConfig,
    /// Last (fast, slow) pair per symbol
    prev: BTreeMap<String, (f64, f64)>,
    signals_generated: usize,
}

impl MaCrossoverStrategy {
    pub fn new(config: MaCrossoverConfig) -> Result<Self, StrategyError> {
        config.validate()?;
        Ok(Self {
            config,
            prev: BTreeMap::new(),
            signals_generated: 0,
        })
    }

    pub fn config(&self) -> &MaCrossoverConfig {
        &self.config
    }

    pub fn signals_generated(&self) -> usize {
        self.signals_generated
    }

    fn entry(&self, symbol: &str, price: f64) -> Signal {
        let mut signal = Signal::buy(symbol, self.config.size_fraction);
        if let Some(pct) = self.config.stop_loss_pct {
            signal = signal.with_stop_loss(price * (1.0 - pct));
        }
        if let Some(pct) = self.config.take_profit_pct {
            signal = signal.with_take_profit(price * (1.0 + pct));
        }
        signal
    }
}

impl Strategy for MaCrossoverStrategy {
    fn name(&self) -> &str {
        "ma_crossover"
    }

    fn init(&mut self, _ctx: &dyn StrategyContext) {
        self.prev.clear();
        self.signals_generated = 0;
    }

    fn next(&mut self, ctx: &dyn StrategyContext) -> Vec<Signal> {
        let fast_spec = self.config.spec(self.config.fast_period);
        let slow_spec = self.config.spec(self.config.slow_period);
        let mut signals = Vec::new();

        for symbol in ctx.symbols() {
            let (Some(fast), Some(slow), Some(price)) = (
                ctx.indicator(symbol, &fast_spec).and_then(|v| v.as_single()),
                ctx.indicator(symbol, &slow_spec).and_then(|v| v.as_single()),
                ctx.get_price(symbol),
            ) else {
                continue;
            };

            if let Some(&(prev_fast, prev_slow)) = self.prev.get(symbol) {
                let magnitude = if slow != 0.0 { ((fast - slow) / slow).abs() } else { 0.0 };
                let strong_enough = magnitude >= self.config.signal_threshold;
                let holding = ctx.has_position(symbol);

                // Bullish crossover: fast crosses above slow
                if prev_fast <= prev_slow && fast > slow && strong_enough && !holding {
                    debug!(symbol = %symbol, fast, slow, "Bullish crossover");
                    signals.push(self.entry(symbol, price));
                }
                // Bearish crossover: fast crosses below slow
                else if prev_fast >= prev_slow && fast < slow && strong_enough && holding {
                    debug!(symbol = %symbol, fast, slow, "Bearish crossover");
                    signals.push(Signal::close(symbol.clone()));
                }
            }
            self.prev.insert(symbol.clone(), (fast, slow));
        }

        self.signals_generated += signals.len();
        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use simlab_backtest::{BacktestConfig, BacktestEngine};
    use simlab_core::types::{Bar, SignalAction};

    fn series(prices: &[f64]) -> BTreeMap<String, Vec<Bar>> {
        let bars = prices
            .iter()
            .enumerate()
            .map(|(i, &p)| Bar::new(i as i64 * 86_400_000, p, p + 1.0, p - 1.0, p, 1000.0))
            .collect();
        BTreeMap::from([("TEST".to_string(), bars)])
    }

    fn sma_config() -> MaCrossoverConfig {
        MaCrossoverConfig {
            fast_period: 3,
            slow_period: 5,
            use_ema: false,
            signal_threshold: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(MaCrossoverConfig::default().validate().is_ok());

        let config = MaCrossoverConfig {
            fast_period: 30,
            slow_period: 20,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = MaCrossoverConfig {
            stop_loss_pct: Some(1.5),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_params() {
        let params = ParamSet::from([
            ("fast_period".to_string(), 5.0),
            ("slow_period".to_string(), 20.0),
            ("use_ema".to_string(), 0.0),
            ("stop_loss_pct".to_string(), 0.05),
        ]);
        let config = MaCrossoverConfig::from_params(&params).unwrap();

        assert_eq!(config.fast_period, 5);
        assert_eq!(config.slow_period, 20);
        assert!(!config.use_ema);
        assert_eq!(config.stop_loss_pct, Some(0.05));
        assert_eq!(config.take_profit_pct, None);

        let typo = ParamSet::from([("fast".to_string(), 5.0)]);
        assert!(MaCrossoverConfig::from_params(&typo).is_err());

        let inverted = ParamSet::from([("fast_period".to_string(), 40.0)]);
        assert!(MaCrossoverConfig::from_params(&inverted).is_err());
    }

    #[test]
    fn test_crossover_round_trip() {
        let prices = [
            100.0, 99.0, 98.0, 97.0, 96.0, 95.0, // Downtrend
            97.0, 100.0, 104.0, 108.0, 112.0, // Uptrend
            108.0, 103.0, 98.0, 94.0, 90.0, // Downtrend
        ];
        let mut strategy = MaCrossoverStrategy::new(sma_config()).unwrap();
        let engine = BacktestEngine::new(BacktestConfig::default().with_capital(dec!(10000)));

        let result = engine.run(&mut strategy, &series(&prices)).unwrap();

        assert_eq!(result.trades.len(), 1);
        assert!(result.trades[0].entry_time < result.trades[0].exit_time);
        assert_eq!(strategy.signals_generated(), 2);
    }

    #[test]
    fn test_entry_carries_stop_and_target() {
        let config = MaCrossoverConfig {
            stop_loss_pct: Some(0.1),
            take_profit_pct: Some(0.2),
            ..sma_config()
        };
        let strategy = MaCrossoverStrategy::new(config).unwrap();
        let signal = strategy.entry("TEST", 100.0);

        assert_eq!(signal.action, SignalAction::Buy);
        assert!((signal.stop_loss.unwrap() - 90.0).abs() < 1e-9);
        assert!((signal.take_profit.unwrap() - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_signals_during_warmup() {
        let mut strategy = MaCrossoverStrategy::new(sma_config()).unwrap();
        let engine = BacktestEngine::new(BacktestConfig::default());

        let result = engine.run(&mut strategy, &series(&[100.0, 101.0, 99.0, 102.0])).unwrap();
        assert!(result.fills.is_empty());
    }
}

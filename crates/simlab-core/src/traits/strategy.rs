//! Strategy trait definitions.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::convert::decimal_from_f64;
use crate::error::StrategyError;
use crate::types::{Bar, Fill, IndicatorSpec, IndicatorValue, Position, Signal};

/// Named numeric strategy parameters, as produced by a parameter grid.
pub type ParamSet = BTreeMap<String, f64>;

/// Read-only view of the simulation handed to a strategy on every hook.
///
/// Only bars up to and including the current one are visible.
pub trait StrategyContext {
    /// Timestamp of the current bar (Unix milliseconds).
    fn timestamp(&self) -> i64;

    /// Account equity marked to the current close.
    fn equity(&self) -> Decimal;

    /// Uncommitted cash.
    fn cash(&self) -> Decimal;

    /// Open positions keyed by symbol.
    fn positions(&self) -> &BTreeMap<String, Position>;

    /// Symbols being simulated.
    fn symbols(&self) -> &[String];

    /// Close of the current bar for `symbol`.
    fn get_price(&self, symbol: &str) -> Option<f64>;

    /// Up to `lookback` most recent bars for `symbol`, oldest first.
    fn get_bars(&self, symbol: &str, lookback: usize) -> &[Bar];

    /// Indicator value at the current bar, or `None` during warmup.
    fn indicator(&self, symbol: &str, spec: &IndicatorSpec) -> Option<IndicatorValue>;

    fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions().get(symbol)
    }

    fn has_position(&self, symbol: &str) -> bool {
        self.positions().contains_key(symbol)
    }

    /// Unrealized PnL of every open position at the current close, net of
    /// entry fees. Positions without a usable price are left out.
    fn unrealized_pnl(&self) -> Decimal {
        self.positions()
            .values()
            .filter_map(|p| {
                let price = self
                    .get_price(&p.symbol)
                    .filter(|c| *c > 0.0)
                    .and_then(decimal_from_f64)?;
                Some(p.unrealized_pnl(price))
            })
            .sum()
    }
}

/// Core strategy trait.
///
/// The engine calls `init` once before the first bar, `next` on every bar,
/// `on_trade` after every fill and `on_end` once after the last bar.
pub trait Strategy: Send {
    /// Unique name of this strategy.
    fn name(&self) -> &str;

    /// One-time setup before the first bar.
    fn init(&mut self, _ctx: &dyn StrategyContext) {}

    /// Process the current bar and return zero or more signals.
    fn next(&mut self, ctx: &dyn StrategyContext) -> Vec<Signal>;

    /// Observer hook called after each fill.
    fn on_trade(&mut self, _ctx: &dyn StrategyContext, _fill: &Fill) {}

    /// Called once after the last bar.
    fn on_end(&mut self, _ctx: &dyn StrategyContext) {}
}

/// Builds a fresh strategy for a parameter set.
///
/// Every optimizer evaluation gets its own instance, so strategies never
/// share state across parallel units.
pub trait StrategyFactory: Send + Sync {
    fn build(&self, params: &ParamSet) -> Result<Box<dyn Strategy>, StrategyError>;
}

impl<F> StrategyFactory for F
where
    F: Fn(&ParamSet) -> Result<Box<dyn Strategy>, StrategyError> + Send + Sync,
{
    fn build(&self, params: &ParamSet) -> Result<Box<dyn Strategy>, StrategyError> {
        self(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Idle {
        bars_seen: usize,
    }

    impl Strategy for Idle {
        fn name(&self) -> &str {
            "idle"
        }

        fn next(&mut self, _ctx: &dyn StrategyContext) -> Vec<Signal> {
            self.bars_seen += 1;
            Vec::new()
        }
    }

    #[test]
    fn test_closure_factory() {
        let factory = |params: &ParamSet| -> Result<Box<dyn Strategy>, StrategyError> {
            if params.get("period").copied().unwrap_or(0.0) < 1.0 {
                return Err(StrategyError::InvalidConfig("period must be >= 1".into()));
            }
            Ok(Box::new(Idle { bars_seen: 0 }))
        };

        let mut params = ParamSet::new();
        assert!(factory.build(&params).is_err());

        params.insert("period".to_string(), 5.0);
        let strategy = factory.build(&params).unwrap();
        assert_eq!(strategy.name(), "idle");
    }
}

//! Strategy-facing view of the simulation.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use simlab_core::traits::StrategyContext;
use simlab_core::types::{Bar, IndicatorSpec, IndicatorValue, Position};
use simlab_indicators::evaluate;
use tracing::warn;

/// Snapshot handed to strategy hooks.
///
/// Only the first `visible` aligned bars of each symbol can be seen, so a
/// strategy never observes data past the current bar.
pub struct SimulationContext<'a> {
    pub(crate) timestamp: i64,
    pub(crate) equity: Decimal,
    pub(crate) cash: Decimal,
    pub(crate) positions: &'a BTreeMap<String, Position>,
    pub(crate) symbols: &'a [String],
    pub(crate) bars: &'a BTreeMap<String, Vec<Bar>>,
    pub(crate) visible: usize,
}

impl<'a> SimulationContext<'a> {
    fn history(&self, symbol: &str) -> &'a [Bar] {
        match self.bars.get(symbol) {
            Some(bars) => &bars[..self.visible.min(bars.len())],
            None => &[],
        }
    }
}

impl StrategyContext for SimulationContext<'_> {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn equity(&self) -> Decimal {
        self.equity
    }

    fn cash(&self) -> Decimal {
        self.cash
    }

    fn positions(&self) -> &BTreeMap<String, Position> {
        self.positions
    }

    fn symbols(&self) -> &[String] {
        self.symbols
    }

    fn get_price(&self, symbol: &str) -> Option<f64> {
        self.history(symbol).last().map(|b| b.close)
    }

    fn get_bars(&self, symbol: &str, lookback: usize) -> &[Bar] {
        let history = self.history(symbol);
        &history[history.len().saturating_sub(lookback)..]
    }

    fn indicator(&self, symbol: &str, spec: &IndicatorSpec) -> Option<IndicatorValue> {
        match evaluate(spec, self.history(symbol)) {
            Ok(value) => value,
            Err(e) => {
                warn!(symbol, spec = %spec, error = %e, "Indicator request rejected");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bars() -> BTreeMap<String, Vec<Bar>> {
        let series = (0..10).map(|i| Bar::flat(i, 100.0 + i as f64)).collect();
        BTreeMap::from([("AAA".to_string(), series)])
    }

    #[test]
    fn test_history_is_bounded_by_cursor() {
        let data = bars();
        let positions = BTreeMap::new();
        let symbols = vec!["AAA".to_string()];
        let ctx = SimulationContext {
            timestamp: 4,
            equity: dec!(1000),
            cash: dec!(1000),
            positions: &positions,
            symbols: &symbols,
            bars: &data,
            visible: 5,
        };

        assert_eq!(ctx.get_price("AAA"), Some(104.0));
        assert_eq!(ctx.get_bars("AAA", 3).len(), 3);
        assert_eq!(ctx.get_bars("AAA", 50).len(), 5);
        assert_eq!(ctx.get_bars("AAA", 3)[0].close, 102.0);
        assert_eq!(ctx.get_price("ZZZ"), None);
        assert!(ctx.get_bars("ZZZ", 3).is_empty());
    }

    #[test]
    fn test_unrealized_pnl_marks_at_current_close() {
        let data = bars();
        let position = |symbol: &str| Position {
            symbol: symbol.to_string(),
            side: simlab_core::types::Side::Buy,
            size: dec!(10),
            entry_price: dec!(100),
            entry_time: 0,
            stop_loss: None,
            take_profit: None,
            entry_fee: dec!(0.5),
        };
        let positions = BTreeMap::from([
            ("AAA".to_string(), position("AAA")),
            // No bars, so no price to mark at
            ("ZZZ".to_string(), position("ZZZ")),
        ]);
        let symbols = vec!["AAA".to_string()];
        let ctx = SimulationContext {
            timestamp: 4,
            equity: dec!(1000),
            cash: dec!(1000),
            positions: &positions,
            symbols: &symbols,
            bars: &data,
            visible: 5,
        };

        // (104 - 100) * 10 - 0.5
        assert_eq!(ctx.unrealized_pnl(), dec!(39.5));
    }

    #[test]
    fn test_indicator_warmup_and_value() {
        let data = bars();
        let positions = BTreeMap::new();
        let symbols = vec!["AAA".to_string()];
        let mut ctx = SimulationContext {
            timestamp: 1,
            equity: dec!(1000),
            cash: dec!(1000),
            positions: &positions,
            symbols: &symbols,
            bars: &data,
            visible: 2,
        };
        let sma = IndicatorSpec::Sma { period: 3 };

        assert_eq!(ctx.indicator("AAA", &sma), None);

        ctx.visible = 3;
        assert_eq!(ctx.indicator("AAA", &sma), Some(IndicatorValue::Single { value: 101.0 }));

        // Invalid parameters never reach the indicator
        assert_eq!(ctx.indicator("AAA", &IndicatorSpec::Sma { period: 0 }), None);
    }
}

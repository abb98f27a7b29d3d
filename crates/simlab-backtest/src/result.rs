//! Backtest result.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use simlab_core::convert::decimal_to_f64;
use simlab_core::types::{EquityCurve, Fill, Trade};
use uuid::Uuid;

use crate::config::BacktestConfig;
use crate::metrics::PerformanceMetrics;

/// Why the bar loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum TerminationReason {
    /// Every aligned bar was processed
    DataExhausted,
    /// Drawdown circuit breaker fired at `timestamp`
    RiskLimitBreach { timestamp: i64, drawdown: f64 },
}

impl TerminationReason {
    pub fn is_early(&self) -> bool {
        matches!(self, TerminationReason::RiskLimitBreach { .. })
    }
}

/// Outcome of one completed run. Produced once, never mutated.
///
/// Metrics are flattened into the top level when serialized. An infinite
/// profit factor serializes as `null`.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    pub run_id: Uuid,
    pub strategy: String,
    /// Symbols that were simulated
    pub symbols: Vec<String>,
    /// Symbols dropped because they had no bars in range
    pub skipped_symbols: Vec<String>,
    pub initial_capital: Decimal,
    pub final_equity: Decimal,
    #[serde(flatten)]
    pub metrics: PerformanceMetrics,
    pub bars_processed: usize,
    pub termination: TerminationReason,
    /// Signals the engine refused to execute
    pub rejected_signals: usize,
    pub equity_curve: EquityCurve,
    pub trades: Vec<Trade>,
    pub fills: Vec<Fill>,
    pub config: BacktestConfig,
}

impl BacktestResult {
    /// Net PnL of every closed trade, in close order.
    pub fn trade_pnls(&self) -> Vec<f64> {
        self.trades.iter().map(|t| decimal_to_f64(t.net_pnl)).collect()
    }

    /// Whether any symbol was dropped.
    pub fn is_degraded(&self) -> bool {
        !self.skipped_symbols.is_empty()
    }

    pub fn start_time(&self) -> Option<i64> {
        self.equity_curve.first().map(|p| p.timestamp)
    }

    pub fn end_time(&self) -> Option<i64> {
        self.equity_curve.last().map(|p| p.timestamp)
    }
}

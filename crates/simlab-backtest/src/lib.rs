//! Backtesting engine.
//!
//! [`BacktestEngine`] drives a [`Strategy`](simlab_core::Strategy) over aligned
//! bar histories, accounting every fill through a FIFO ledger, and hands the
//! resulting equity curve and trades to [`MetricsCalculator`].

mod config;
mod context;
mod engine;
mod error;
mod metrics;
mod report;
mod result;

pub use config::BacktestConfig;
pub use context::SimulationContext;
pub use engine::BacktestEngine;
pub use error::BacktestError;
pub use metrics::{percentile, periodic_sharpe, MetricsCalculator, PerformanceMetrics};
pub use result::{BacktestResult, TerminationReason};

//! Backtest errors.

use simlab_core::error::{CurveError, StrategyError};
use simlab_execution::ExecutionError;
use thiserror::Error;

/// Run-invalidating errors, raised before the bar loop starts.
///
/// Per-fill problems never surface here; they are logged and the signal is
/// rejected.
#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("Invalid backtest configuration: {0}")]
    InvalidConfig(String),

    #[error("No data: {0}")]
    NoData(String),

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("Equity curve error: {0}")]
    Curve(#[from] CurveError),
}

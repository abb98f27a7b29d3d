//! Validation errors.

use simlab_backtest::BacktestError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid validation configuration: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("No window produced a parameter set meeting the trade floor ({windows} window(s) evaluated)")]
    NoQualifiedWindows { windows: usize },

    #[error("Validation run cancelled")]
    Cancelled,

    #[error("Backtest error: {0}")]
    Backtest(#[from] BacktestError),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

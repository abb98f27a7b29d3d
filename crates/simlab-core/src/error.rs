//! Error types shared across the workspace.

use thiserror::Error;

/// Strategy construction and evaluation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Strategy not found: {0}")]
    NotFound(String),

    #[error("Strategy error: {0}")]
    Internal(String),
}

/// Historical data errors.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("No data available for {symbol} in the requested range")]
    NoDataAvailable { symbol: String },

    #[error("Invalid timeframe: {0}")]
    InvalidTimeframe(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Indicator configuration errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("Unknown indicator kind: {0}")]
    UnknownKind(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Equity curve append errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CurveError {
    #[error("equity sample at {timestamp} does not follow the last sample at {last}")]
    NonIncreasing { last: i64, timestamp: i64 },
}

//! Execution errors.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by [`PositionLedger`](crate::PositionLedger).
///
/// A failed `apply` leaves the ledger unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Invalid price for {symbol}: {price} (must be positive)")]
    InvalidPrice { symbol: String, price: Decimal },

    #[error("Invalid size for {symbol}: {size} (must be positive)")]
    InvalidSize { symbol: String, size: Decimal },
}

/// Execution model configuration errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("Invalid fee model: {0}")]
    InvalidFeeModel(String),

    #[error("Invalid slippage model: {0}")]
    InvalidSlippageModel(String),
}

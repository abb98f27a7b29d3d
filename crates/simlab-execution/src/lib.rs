//! Execution models and position accounting.
//!
//! - [`FeeModel`]: fixed-rate or volume-tiered maker/taker fees
//! - [`SlippageModel`]: signed price impact as a fraction of the reference price
//! - [`PositionLedger`]: FIFO lot matcher producing realized PnL

mod error;
mod fee;
mod ledger;
mod slippage;

pub use error::{ExecutionError, LedgerError};
pub use fee::{FeeModel, FeeTier};
pub use ledger::{Lot, PositionLedger};
pub use slippage::SlippageModel;

//! Core types and traits for strategy simulation.
//!
//! This crate provides the shared vocabulary of the workspace:
//! - Market data (`Bar`, `Timeframe`)
//! - Execution records (`Fill`, `Position`, `Trade`, `EquityCurve`)
//! - Strategy signals and the closed indicator enumeration
//! - Traits for strategies, indicators and historical data sources

pub mod convert;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{CurveError, DataError, IndicatorError, StrategyError};
pub use traits::*;
pub use types::*;

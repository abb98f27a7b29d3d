//! Reference strategy implementations.
//!
//! - Moving Average Crossover (long-only, optional stop/target)
//! - RSI oversold/overbought reversal
//!
//! [`StrategyRegistry`] builds either from a JSON config or a parameter set.

mod ma_crossover;
mod params;
mod registry;
mod rsi_strategy;

pub use ma_crossover::{MaCrossoverConfig, MaCrossoverStrategy};
pub use registry::{StrategyInfo, StrategyRegistry};
pub use rsi_strategy::{RsiConfig, RsiStrategy};

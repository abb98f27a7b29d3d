//! Core data types for the simulation.

mod equity;
mod indicator;
mod ohlcv;
mod order;
mod position;
mod signal;
mod timeframe;

pub use equity::{EquityCurve, EquityPoint};
pub use indicator::{IndicatorSpec, IndicatorValue};
pub use ohlcv::Bar;
pub use order::{Fill, Liquidity, Side};
pub use position::{ExitReason, Position, Trade};
pub use signal::{Signal, SignalAction};
pub use timeframe::Timeframe;

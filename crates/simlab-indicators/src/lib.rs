//! Technical indicators.
//!
//! Batch implementations of the indicator set exposed to strategies:
//! - Moving averages (SMA, EMA)
//! - Momentum (RSI, MACD)
//! - Volatility (ATR, Bollinger Bands, standard deviation)
//!
//! [`evaluate`] maps an [`IndicatorSpec`](simlab_core::IndicatorSpec) onto
//! these implementations for a bar history.

mod evaluate;
pub mod momentum;
pub mod moving_average;
mod smoothing;
pub mod volatility;

pub use evaluate::evaluate;
pub use momentum::{Macd, MacdOutput, Rsi};
pub use moving_average::{Ema, Sma};
pub use volatility::{Atr, BollingerBands, BollingerOutput, StdDev};

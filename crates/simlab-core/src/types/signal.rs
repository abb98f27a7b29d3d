//! Strategy signals.

use serde::{Deserialize, Serialize};

use super::Side;

/// Action requested by a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalAction {
    /// Open a long position
    Buy,
    /// Open a short position
    Sell,
    /// Close the open position in the symbol
    Close,
}

impl std::fmt::Display for SignalAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalAction::Buy => write!(f, "BUY"),
            SignalAction::Sell => write!(f, "SELL"),
            SignalAction::Close => write!(f, "CLOSE"),
        }
    }
}

/// A trading instruction emitted by a strategy for the current bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub action: SignalAction,
    pub symbol: String,
    /// Fraction of current equity to commit. Ignored for `Close`.
    pub size_fraction: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

impl Signal {
    pub fn buy(symbol: impl Into<String>, size_fraction: f64) -> Self {
        Self::open(SignalAction::Buy, symbol, size_fraction)
    }

    pub fn sell(symbol: impl Into<String>, size_fraction: f64) -> Self {
        Self::open(SignalAction::Sell, symbol, size_fraction)
    }

    pub fn close(symbol: impl Into<String>) -> Self {
        Self::open(SignalAction::Close, symbol, 0.0)
    }

    fn open(action: SignalAction, symbol: impl Into<String>, size_fraction: f64) -> Self {
        Self {
            action,
            symbol: symbol.into(),
            size_fraction,
            stop_loss: None,
            take_profit: None,
        }
    }

    pub fn with_stop_loss(mut self, price: f64) -> Self {
        self.stop_loss = Some(price);
        self
    }

    pub fn with_take_profit(mut self, price: f64) -> Self {
        self.take_profit = Some(price);
        self
    }

    /// Side of the opening fill, or `None` for `Close`.
    pub fn side(&self) -> Option<Side> {
        match self.action {
            SignalAction::Buy => Some(Side::Buy),
            SignalAction::Sell => Some(Side::Sell),
            SignalAction::Close => None,
        }
    }
}

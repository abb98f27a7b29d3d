//! Open positions and closed trades.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Side;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Strategy emitted a CLOSE signal
    Signal,
    StopLoss,
    TakeProfit,
    /// Drawdown circuit breaker fired
    RiskLimit,
    /// Data exhausted; closed at the last available price
    EndOfData,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExitReason::Signal => "signal",
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::RiskLimit => "risk_limit",
            ExitReason::EndOfData => "end_of_data",
        };
        write!(f, "{}", s)
    }
}

/// An open position in a single symbol.
///
/// At most one position exists per symbol and `size` is strictly positive
/// while it is open. The position commits `size * entry_price` of cash as
/// collateral regardless of side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub side: Side,
    /// Base quantity held
    pub size: Decimal,
    /// Average execution price of the opening fill
    pub entry_price: Decimal,
    /// Unix timestamp in milliseconds
    pub entry_time: i64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    /// Fee paid on the opening fill
    pub entry_fee: Decimal,
}

impl Position {
    /// Cash committed when the position was opened.
    pub fn collateral(&self) -> Decimal {
        self.size * self.entry_price
    }

    /// Price PnL at `price`, before fees.
    pub fn gross_pnl(&self, price: Decimal) -> Decimal {
        self.side.sign() * (price - self.entry_price) * self.size
    }

    /// Unrealized PnL at `price`, net of the entry fee.
    pub fn unrealized_pnl(&self, price: Decimal) -> Decimal {
        self.gross_pnl(price) - self.entry_fee
    }

    /// Contribution of this position to account equity at `price`.
    pub fn market_value(&self, price: Decimal) -> Decimal {
        self.collateral() + self.gross_pnl(price)
    }

    /// Check whether the close crosses the stop or the target.
    ///
    /// The stop is checked first, so a bar that crosses both reports `StopLoss`.
    pub fn exit_trigger(&self, close: f64) -> Option<ExitReason> {
        let (stop_hit, target_hit) = match self.side {
            Side::Buy => (
                self.stop_loss.is_some_and(|s| close <= s),
                self.take_profit.is_some_and(|t| close >= t),
            ),
            Side::Sell => (
                self.stop_loss.is_some_and(|s| close >= s),
                self.take_profit.is_some_and(|t| close <= t),
            ),
        };

        if stop_hit {
            Some(ExitReason::StopLoss)
        } else if target_hit {
            Some(ExitReason::TakeProfit)
        } else {
            None
        }
    }
}

/// A closed round trip. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    /// Side of the opening fill
    pub side: Side,
    pub size: Decimal,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub entry_time: i64,
    pub exit_time: i64,
    /// Realized PnL reported by the FIFO ledger
    pub gross_pnl: Decimal,
    /// Entry plus exit fees
    pub fees: Decimal,
    /// `gross_pnl - fees`
    pub net_pnl: Decimal,
    pub exit_reason: ExitReason,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.net_pnl > Decimal::ZERO
    }

    /// Net PnL relative to the committed collateral.
    pub fn return_pct(&self) -> Decimal {
        let collateral = self.size * self.entry_price;
        if collateral.is_zero() {
            Decimal::ZERO
        } else {
            self.net_pnl / collateral
        }
    }

    /// Holding time in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        self.exit_time - self.entry_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn long_position() -> Position {
        Position {
            symbol: "ETH".to_string(),
            side: Side::Buy,
            size: dec!(10),
            entry_price: dec!(100),
            entry_time: 0,
            stop_loss: Some(95.0),
            take_profit: Some(110.0),
            entry_fee: dec!(0.5),
        }
    }

    #[test]
    fn test_long_valuation() {
        let pos = long_position();

        assert_eq!(pos.collateral(), dec!(1000));
        assert_eq!(pos.unrealized_pnl(dec!(110)), dec!(99.5));
        assert_eq!(pos.market_value(dec!(90)), dec!(900));
    }

    #[test]
    fn test_short_valuation() {
        let pos = Position {
            side: Side::Sell,
            ..long_position()
        };

        assert_eq!(pos.gross_pnl(dec!(90)), dec!(100));
        assert_eq!(pos.market_value(dec!(110)), dec!(900));
    }

    #[test]
    fn test_exit_trigger_long() {
        let pos = long_position();

        assert_eq!(pos.exit_trigger(100.0), None);
        assert_eq!(pos.exit_trigger(94.0), Some(ExitReason::StopLoss));
        assert_eq!(pos.exit_trigger(111.0), Some(ExitReason::TakeProfit));
    }

    #[test]
    fn test_exit_trigger_short() {
        let pos = Position {
            side: Side::Sell,
            stop_loss: Some(105.0),
            take_profit: Some(90.0),
            ..long_position()
        };

        assert_eq!(pos.exit_trigger(106.0), Some(ExitReason::StopLoss));
        assert_eq!(pos.exit_trigger(89.0), Some(ExitReason::TakeProfit));
        assert_eq!(pos.exit_trigger(100.0), None);
    }

    #[test]
    fn test_trade_return() {
        let trade = Trade {
            symbol: "ETH".to_string(),
            side: Side::Buy,
            size: dec!(10),
            entry_price: dec!(100),
            exit_price: dec!(110),
            entry_time: 0,
            exit_time: 86_400_000,
            gross_pnl: dec!(100),
            fees: dec!(1.05),
            net_pnl: dec!(98.95),
            exit_reason: ExitReason::Signal,
        };

        assert!(trade.is_winner());
        assert_eq!(trade.return_pct(), dec!(0.09895));
        assert_eq!(trade.duration_ms(), 86_400_000);
    }
}

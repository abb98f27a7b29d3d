//! FIFO position ledger.
//!
//! Open inventory is a queue of lots all on one side. A fill on the opposite
//! side consumes lots oldest first, realizing PnL per matched quantity; any
//! quantity left over opens a fresh lot on the fill's side.

use std::collections::VecDeque;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use simlab_core::types::Side;
use tracing::trace;

use crate::error::LedgerError;

/// An open quantity acquired at a single price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    pub quantity: Decimal,
    pub price: Decimal,
}

/// Per-symbol FIFO lot matcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionLedger {
    symbol: String,
    side: Option<Side>,
    lots: VecDeque<Lot>,
    realized_pnl: Decimal,
    matches: u64,
}

impl PositionLedger {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            side: None,
            lots: VecDeque::new(),
            realized_pnl: Decimal::ZERO,
            matches: 0,
        }
    }

    /// Apply a fill sized in quote currency.
    ///
    /// Returns the PnL realized by this fill alone.
    pub fn apply(
        &mut self,
        side: Side,
        price: Decimal,
        quote_size: Decimal,
    ) -> Result<Decimal, LedgerError> {
        self.check_price(price)?;
        if quote_size <= Decimal::ZERO {
            return Err(LedgerError::InvalidSize {
                symbol: self.symbol.clone(),
                size: quote_size,
            });
        }
        self.apply_quantity(side, price, quote_size / price)
    }

    /// Apply a fill sized in base units.
    pub fn apply_quantity(
        &mut self,
        side: Side,
        price: Decimal,
        quantity: Decimal,
    ) -> Result<Decimal, LedgerError> {
        self.check_price(price)?;
        if quantity <= Decimal::ZERO {
            return Err(LedgerError::InvalidSize {
                symbol: self.symbol.clone(),
                size: quantity,
            });
        }

        match self.side {
            Some(open) if open != side => Ok(self.reduce(open, side, price, quantity)),
            _ => {
                self.side = Some(side);
                self.lots.push_back(Lot { quantity, price });
                Ok(Decimal::ZERO)
            }
        }
    }

    fn reduce(&mut self, open: Side, side: Side, price: Decimal, quantity: Decimal) -> Decimal {
        let mut remaining = quantity;
        let mut realized = Decimal::ZERO;

        while remaining > Decimal::ZERO {
            let Some(lot) = self.lots.front_mut() else {
                break;
            };

            let matched = remaining.min(lot.quantity);
            let pnl = match open {
                Side::Buy => (price - lot.price) * matched,
                Side::Sell => (lot.price - price) * matched,
            };
            trace!(
                symbol = %self.symbol,
                entry = %lot.price,
                exit = %price,
                quantity = %matched,
                pnl = %pnl,
                "Matched lot"
            );

            realized += pnl;
            remaining -= matched;
            lot.quantity -= matched;
            self.matches += 1;

            if lot.quantity.is_zero() {
                self.lots.pop_front();
            }
        }

        if self.lots.is_empty() {
            self.side = None;
        }
        if remaining > Decimal::ZERO {
            // Residual flips the position
            self.side = Some(side);
            self.lots.push_back(Lot {
                quantity: remaining,
                price,
            });
        }

        self.realized_pnl += realized;
        realized
    }

    fn check_price(&self, price: Decimal) -> Result<(), LedgerError> {
        if price <= Decimal::ZERO {
            return Err(LedgerError::InvalidPrice {
                symbol: self.symbol.clone(),
                price,
            });
        }
        Ok(())
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Side of the open inventory, `None` when flat.
    pub fn side(&self) -> Option<Side> {
        self.side
    }

    /// Signed open quantity: positive long, negative short.
    pub fn net_position(&self) -> Decimal {
        let total: Decimal = self.lots.iter().map(|l| l.quantity).sum();
        match self.side {
            Some(side) => side.sign() * total,
            None => Decimal::ZERO,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.lots.is_empty()
    }

    /// Open lots, oldest first.
    pub fn lots(&self) -> impl Iterator<Item = &Lot> {
        self.lots.iter()
    }

    /// Quantity-weighted entry price of the open lots.
    pub fn average_entry_price(&self) -> Option<Decimal> {
        let quantity: Decimal = self.lots.iter().map(|l| l.quantity).sum();
        if quantity.is_zero() {
            return None;
        }
        let cost: Decimal = self.lots.iter().map(|l| l.quantity * l.price).sum();
        Some(cost / quantity)
    }

    /// Cumulative realized PnL across all fills.
    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    /// Number of lot matches performed.
    pub fn match_count(&self) -> u64 {
        self.matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_same_direction_realizes_nothing() {
        let mut ledger = PositionLedger::new("BTC");

        assert_eq!(ledger.apply(Side::Buy, dec!(100), dec!(1000)).unwrap(), dec!(0));
        assert_eq!(ledger.apply(Side::Buy, dec!(200), dec!(1000)).unwrap(), dec!(0));

        assert_eq!(ledger.net_position(), dec!(15));
        assert_eq!(ledger.lots().count(), 2);
        assert_eq!(ledger.realized_pnl(), dec!(0));
    }

    #[test]
    fn test_round_trip_long() {
        let mut ledger = PositionLedger::new("BTC");

        ledger.apply_quantity(Side::Buy, dec!(100), dec!(2)).unwrap();
        let pnl = ledger.apply_quantity(Side::Sell, dec!(110), dec!(2)).unwrap();

        assert_eq!(pnl, dec!(20));
        assert!(ledger.is_flat());
        assert_eq!(ledger.side(), None);
        assert_eq!(ledger.realized_pnl(), dec!(20));
    }

    #[test]
    fn test_round_trip_short() {
        let mut ledger = PositionLedger::new("ETH");

        ledger.apply_quantity(Side::Sell, dec!(50), dec!(4)).unwrap();
        assert_eq!(ledger.net_position(), dec!(-4));

        let pnl = ledger.apply_quantity(Side::Buy, dec!(45), dec!(4)).unwrap();
        assert_eq!(pnl, dec!(20));
        assert!(ledger.is_flat());
    }

    #[test]
    fn test_partial_fifo_matching() {
        let mut ledger = PositionLedger::new("BTC");

        ledger.apply_quantity(Side::Buy, dec!(100), dec!(1)).unwrap();
        ledger.apply_quantity(Side::Buy, dec!(120), dec!(1)).unwrap();

        // Consumes the whole 100 lot and half of the 120 lot
        let pnl = ledger.apply_quantity(Side::Sell, dec!(130), dec!(1.5)).unwrap();
        assert_eq!(pnl, dec!(30) + dec!(5));
        assert_eq!(ledger.match_count(), 2);

        let lots: Vec<_> = ledger.lots().copied().collect();
        assert_eq!(
            lots,
            vec![Lot {
                quantity: dec!(0.5),
                price: dec!(120)
            }]
        );
        assert_eq!(ledger.net_position(), dec!(0.5));
    }

    #[test]
    fn test_residual_flips_side() {
        let mut ledger = PositionLedger::new("BTC");

        ledger.apply_quantity(Side::Buy, dec!(100), dec!(1)).unwrap();
        let pnl = ledger.apply_quantity(Side::Sell, dec!(90), dec!(3)).unwrap();

        assert_eq!(pnl, dec!(-10));
        assert_eq!(ledger.side(), Some(Side::Sell));
        assert_eq!(ledger.net_position(), dec!(-2));
        assert_eq!(ledger.average_entry_price(), Some(dec!(90)));
    }

    #[test]
    fn test_invalid_input_leaves_state_unchanged() {
        let mut ledger = PositionLedger::new("BTC");
        ledger.apply_quantity(Side::Buy, dec!(100), dec!(1)).unwrap();

        let err = ledger.apply(Side::Sell, dec!(0), dec!(100)).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidPrice { .. }));

        let err = ledger.apply(Side::Sell, dec!(100), dec!(-5)).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidSize { .. }));

        assert_eq!(ledger.net_position(), dec!(1));
        assert_eq!(ledger.realized_pnl(), dec!(0));
        assert_eq!(ledger.match_count(), 0);
    }

    #[test]
    fn test_average_entry_price() {
        let mut ledger = PositionLedger::new("BTC");
        assert_eq!(ledger.average_entry_price(), None);

        ledger.apply_quantity(Side::Buy, dec!(100), dec!(1)).unwrap();
        ledger.apply_quantity(Side::Buy, dec!(130), dec!(2)).unwrap();
        assert_eq!(ledger.average_entry_price(), Some(dec!(120)));
    }
}

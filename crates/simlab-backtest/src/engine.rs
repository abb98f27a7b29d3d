//! Backtesting engine.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use simlab_core::convert::{decimal_from_f64, decimal_to_f64};
use simlab_core::traits::Strategy;
use simlab_core::types::{
    Bar, EquityCurve, ExitReason, Fill, Liquidity, Position, Side, Signal, Trade,
};
use simlab_execution::{LedgerError, PositionLedger};
use statrs::statistics::Statistics;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::BacktestConfig;
use crate::context::SimulationContext;
use crate::error::BacktestError;
use crate::metrics::MetricsCalculator;
use crate::result::{BacktestResult, TerminationReason};

/// Why a signal or forced exit was not executed.
#[derive(Debug, Error)]
enum Rejection {
    #[error("symbol is not part of the run")]
    UnknownSymbol,

    #[error("position already open (no pyramiding)")]
    AlreadyOpen,

    #[error("no open position")]
    NoPosition,

    #[error("size fraction {0} must be positive")]
    InvalidFraction(f64),

    #[error("price {0} cannot be represented")]
    UnusablePrice(f64),

    #[error("insufficient cash: need {required}, have {available}")]
    InsufficientCash { required: Decimal, available: Decimal },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Bars of every simulated symbol restricted to their common timestamps.
struct AlignedData {
    symbols: Vec<String>,
    bars: BTreeMap<String, Vec<Bar>>,
    timestamps: Vec<i64>,
    skipped: Vec<String>,
}

/// Cash, open positions and per-symbol ledgers of one run.
struct Book<'c> {
    config: &'c BacktestConfig,
    cash: Decimal,
    positions: BTreeMap<String, Position>,
    ledgers: BTreeMap<String, PositionLedger>,
    /// Last strictly positive close per symbol
    last_price: BTreeMap<String, f64>,
    trades: Vec<Trade>,
    fills: Vec<Fill>,
    rejected: usize,
}

impl<'c> Book<'c> {
    fn new(config: &'c BacktestConfig) -> Self {
        Self {
            config,
            cash: config.initial_capital,
            positions: BTreeMap::new(),
            ledgers: BTreeMap::new(),
            last_price: BTreeMap::new(),
            trades: Vec::new(),
            fills: Vec::new(),
            rejected: 0,
        }
    }

    fn update_prices(&mut self, data: &AlignedData, index: usize) {
        for (symbol, bars) in &data.bars {
            let close = bars[index].close;
            if close.is_finite() && close > 0.0 {
                self.last_price.insert(symbol.clone(), close);
            }
        }
    }

    /// Cash plus every position marked at its last valid close.
    fn equity(&self) -> Decimal {
        let marked: Decimal = self
            .positions
            .values()
            .map(|p| {
                let price = self
                    .last_price
                    .get(&p.symbol)
                    .and_then(|c| decimal_from_f64(*c))
                    .unwrap_or(p.entry_price);
                p.market_value(price)
            })
            .sum();
        self.cash + marked
    }

    fn context<'a>(&'a self, data: &'a AlignedData, timestamp: i64, visible: usize) -> SimulationContext<'a> {
        SimulationContext {
            timestamp,
            equity: self.equity(),
            cash: self.cash,
            positions: &self.positions,
            symbols: &data.symbols,
            bars: &data.bars,
            visible,
        }
    }

    fn apply_signal(
        &mut self,
        signal: &Signal,
        data: &AlignedData,
        index: usize,
        timestamp: i64,
    ) -> Result<(), Rejection> {
        let bars = data.bars.get(&signal.symbol).ok_or(Rejection::UnknownSymbol)?;
        let close = bars[index].close;
        let volatility = realized_volatility(&bars[..=index], self.config.volatility_lookback);

        match signal.side() {
            Some(side) => self.open(signal, side, close, timestamp, volatility),
            None => self.close(&signal.symbol, close, timestamp, ExitReason::Signal, volatility),
        }
    }

    /// Close moved by the slippage model, with the signed fraction applied.
    fn execution_price(
        &self,
        close: f64,
        notional: f64,
        side: Side,
        volatility: Option<f64>,
    ) -> Result<(Decimal, f64), Rejection> {
        let slippage = self
            .config
            .slippage_model
            .slippage_with_volatility(close, notional, side, volatility);
        let price =
            decimal_from_f64(close * (1.0 + slippage)).ok_or(Rejection::UnusablePrice(close))?;
        Ok((price, slippage))
    }

    fn open(
        &mut self,
        signal: &Signal,
        side: Side,
        close: f64,
        timestamp: i64,
        volatility: Option<f64>,
    ) -> Result<(), Rejection> {
        if self.positions.contains_key(&signal.symbol) {
            return Err(Rejection::AlreadyOpen);
        }

        let fraction = decimal_from_f64(signal.size_fraction)
            .filter(|f| *f > Decimal::ZERO)
            .ok_or(Rejection::InvalidFraction(signal.size_fraction))?
            .min(self.config.max_position_pct);

        let notional = self.equity() * fraction;
        let fee = self.config.fee_model.fee(notional, Liquidity::Taker);
        if notional <= Decimal::ZERO || notional + fee > self.cash {
            return Err(Rejection::InsufficientCash {
                required: notional + fee,
                available: self.cash,
            });
        }

        let (price, slippage) =
            self.execution_price(close, decimal_to_f64(notional), side, volatility)?;

        let ledger = self
            .ledgers
            .entry(signal.symbol.clone())
            .or_insert_with(|| PositionLedger::new(signal.symbol.clone()));
        ledger.apply(side, price, notional)?;

        let position = Position {
            symbol: signal.symbol.clone(),
            side,
            size: notional / price,
            entry_price: price,
            entry_time: timestamp,
            stop_loss: signal.stop_loss,
            take_profit: signal.take_profit,
            entry_fee: fee,
        };
        self.cash -= position.collateral() + fee;

        debug!(
            symbol = %position.symbol,
            side = %side,
            price = %price,
            size = %position.size,
            fee = %fee,
            "Opened position"
        );

        self.fills.push(Fill {
            symbol: position.symbol.clone(),
            side,
            notional,
            quantity: position.size,
            price,
            fee,
            slippage,
            liquidity: Liquidity::Taker,
            timestamp,
        });
        self.positions.insert(position.symbol.clone(), position);
        Ok(())
    }

    fn close(
        &mut self,
        symbol: &str,
        close: f64,
        timestamp: i64,
        reason: ExitReason,
        volatility: Option<f64>,
    ) -> Result<(), Rejection> {
        let position = self.positions.get(symbol).cloned().ok_or(Rejection::NoPosition)?;
        let side = position.side.opposite();

        let (price, slippage) =
            self.execution_price(close, decimal_to_f64(position.size) * close, side, volatility)?;

        let ledger = self.ledgers.get_mut(symbol).ok_or(Rejection::NoPosition)?;
        let gross = ledger.apply_quantity(side, price, position.size)?;

        let notional = price * position.size;
        let fee = self.config.fee_model.fee(notional, Liquidity::Taker);
        self.cash += position.collateral() + gross - fee;
        self.positions.remove(symbol);

        let fees = position.entry_fee + fee;
        let trade = Trade {
            symbol: position.symbol.clone(),
            side: position.side,
            size: position.size,
            entry_price: position.entry_price,
            exit_price: price,
            entry_time: position.entry_time,
            exit_time: timestamp,
            gross_pnl: gross,
            fees,
            net_pnl: gross - fees,
            exit_reason: reason,
        };

        debug!(
            symbol,
            reason = %reason,
            price = %price,
            net_pnl = %trade.net_pnl,
            "Closed position"
        );

        self.fills.push(Fill {
            symbol: position.symbol,
            side,
            notional,
            quantity: position.size,
            price,
            fee,
            slippage,
            liquidity: Liquidity::Taker,
            timestamp,
        });
        self.trades.push(trade);
        Ok(())
    }

    /// Close every open position at its last valid close.
    fn close_all(&mut self, data: &AlignedData, index: usize, timestamp: i64, reason: ExitReason) {
        let open: Vec<String> = self.positions.keys().cloned().collect();
        for symbol in open {
            let Some(&price) = self.last_price.get(&symbol) else {
                warn!(symbol = %symbol, "No valid price to close position");
                continue;
            };
            let volatility = data
                .bars
                .get(&symbol)
                .and_then(|bars| realized_volatility(&bars[..=index], self.config.volatility_lookback));

            if let Err(e) = self.close(&symbol, price, timestamp, reason, volatility) {
                warn!(symbol = %symbol, reason = %reason, error = %e, "Forced close failed");
            }
        }
    }

    /// Close positions whose stop or target the current close crossed.
    fn check_exits(&mut self, data: &AlignedData, index: usize, timestamp: i64) {
        let open: Vec<String> = self.positions.keys().cloned().collect();
        for symbol in open {
            let Some(bars) = data.bars.get(&symbol) else {
                continue;
            };
            let close = bars[index].close;
            if !(close.is_finite() && close > 0.0) {
                continue;
            }
            let Some(reason) = self.positions.get(&symbol).and_then(|p| p.exit_trigger(close)) else {
                continue;
            };

            let volatility = realized_volatility(&bars[..=index], self.config.volatility_lookback);
            if let Err(e) = self.close(&symbol, close, timestamp, reason, volatility) {
                warn!(symbol = %symbol, reason = %reason, error = %e, "Exit order failed");
            }
        }
    }
}

/// Sample standard deviation of the last `lookback` close-to-close returns.
fn realized_volatility(history: &[Bar], lookback: usize) -> Option<f64> {
    let start = history.len().saturating_sub(lookback + 1);
    let returns: Vec<f64> = history[start..]
        .windows(2)
        .filter(|w| w[0].close > 0.0)
        .map(|w| w[1].close / w[0].close - 1.0)
        .collect();

    if returns.len() < 2 {
        return None;
    }
    let std = returns.std_dev();
    std.is_finite().then_some(std)
}

/// Backtesting engine.
///
/// Runs are sequential and deterministic: bar `t` is fully processed before
/// bar `t + 1`, and the same inputs always produce the same result.
pub struct BacktestEngine {
    config: BacktestConfig,
}

impl BacktestEngine {
    /// Create a new backtest engine.
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Run `strategy` over `data`.
    ///
    /// Symbols without bars in range are skipped and reported; the run fails
    /// only when no symbol has data or the configuration is invalid.
    pub fn run(
        &self,
        strategy: &mut dyn Strategy,
        data: &BTreeMap<String, Vec<Bar>>,
    ) -> Result<BacktestResult, BacktestError> {
        self.config.validate()?;
        let aligned = self.align(data)?;

        if self.config.timeframe.is_intraday() {
            warn!(
                timeframe = %self.config.timeframe,
                "Metrics annualize over 365 periods; intraday bars will be misstated"
            );
        }
        info!(
            strategy = strategy.name(),
            symbols = aligned.symbols.len(),
            bars = aligned.timestamps.len(),
            capital = %self.config.initial_capital,
            "Starting backtest"
        );

        let mut book = Book::new(&self.config);
        let mut curve = EquityCurve::new();
        let mut peak = self.config.initial_capital;
        let mut termination = TerminationReason::DataExhausted;
        let mut bars_processed = 0;
        let last_index = aligned.timestamps.len() - 1;

        strategy.init(&book.context(&aligned, aligned.timestamps[0], 0));

        for (index, &timestamp) in aligned.timestamps.iter().enumerate() {
            let visible = index + 1;
            bars_processed = visible;
            book.update_prices(&aligned, index);

            let equity = book.equity();
            peak = peak.max(equity);
            let drawdown = if peak > Decimal::ZERO {
                (peak - equity) / peak
            } else {
                Decimal::ZERO
            };

            if drawdown > self.config.max_drawdown_pct {
                warn!(
                    timestamp,
                    drawdown = %drawdown,
                    limit = %self.config.max_drawdown_pct,
                    "Drawdown limit breached, closing all positions"
                );
                let before = book.fills.len();
                book.close_all(&aligned, index, timestamp, ExitReason::RiskLimit);
                notify(strategy, &book, &aligned, timestamp, visible, before);

                curve.push(timestamp, book.equity())?;
                termination = TerminationReason::RiskLimitBreach {
                    timestamp,
                    drawdown: decimal_to_f64(drawdown),
                };
                break;
            }

            let before = book.fills.len();
            book.check_exits(&aligned, index, timestamp);
            notify(strategy, &book, &aligned, timestamp, visible, before);

            let signals = strategy.next(&book.context(&aligned, timestamp, visible));
            for signal in &signals {
                let before = book.fills.len();
                match book.apply_signal(signal, &aligned, index, timestamp) {
                    Ok(()) => notify(strategy, &book, &aligned, timestamp, visible, before),
                    Err(rejection) => {
                        debug!(
                            symbol = %signal.symbol,
                            action = %signal.action,
                            reason = %rejection,
                            "Signal rejected"
                        );
                        book.rejected += 1;
                    }
                }
            }

            if index == last_index {
                let before = book.fills.len();
                book.close_all(&aligned, index, timestamp, ExitReason::EndOfData);
                notify(strategy, &book, &aligned, timestamp, visible, before);
            }

            curve.push(timestamp, book.equity())?;
        }

        let end_timestamp = aligned.timestamps[bars_processed - 1];
        strategy.on_end(&book.context(&aligned, end_timestamp, bars_processed));

        let metrics = MetricsCalculator::new(self.config.risk_free_rate).calculate(
            &curve,
            &book.trades,
            self.config.initial_capital,
        );
        let final_equity = curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.config.initial_capital);

        info!(
            strategy = strategy.name(),
            bars = bars_processed,
            trades = book.trades.len(),
            rejected = book.rejected,
            final_equity = %final_equity,
            total_return = metrics.total_return,
            "Backtest complete"
        );

        Ok(BacktestResult {
            run_id: Uuid::new_v4(),
            strategy: strategy.name().to_string(),
            symbols: aligned.symbols,
            skipped_symbols: aligned.skipped,
            initial_capital: self.config.initial_capital,
            final_equity,
            metrics,
            bars_processed,
            termination,
            rejected_signals: book.rejected,
            equity_curve: curve,
            trades: book.trades,
            fills: book.fills,
            config: self.config.clone(),
        })
    }

    /// Restrict every symbol to the configured range and to the timestamps
    /// all symbols share.
    fn align(&self, data: &BTreeMap<String, Vec<Bar>>) -> Result<AlignedData, BacktestError> {
        let (start, end) = (self.config.start_millis(), self.config.end_millis());
        let mut series: BTreeMap<String, Vec<Bar>> = BTreeMap::new();
        let mut skipped = Vec::new();

        for (symbol, bars) in data {
            let mut in_range: Vec<Bar> = bars
                .iter()
                .filter(|b| b.timestamp >= start && b.timestamp <= end)
                .copied()
                .collect();
            in_range.sort_by_key(|b| b.timestamp);
            in_range.dedup_by_key(|b| b.timestamp);

            if in_range.is_empty() {
                warn!(symbol = %symbol, "No bars in range, skipping symbol");
                skipped.push(symbol.clone());
            } else {
                series.insert(symbol.clone(), in_range);
            }
        }

        let mut shared: Option<BTreeSet<i64>> = None;
        for bars in series.values() {
            let stamps: BTreeSet<i64> = bars.iter().map(|b| b.timestamp).collect();
            shared = Some(match shared {
                Some(acc) => acc.intersection(&stamps).copied().collect(),
                None => stamps,
            });
        }

        let timestamps: Vec<i64> = match shared {
            Some(stamps) if !stamps.is_empty() => stamps.into_iter().collect(),
            Some(_) => {
                return Err(BacktestError::NoData(
                    "symbols share no common timestamps in range".into(),
                ))
            }
            None => {
                return Err(BacktestError::NoData(format!(
                    "no bars in range for any of {} symbol(s)",
                    data.len()
                )))
            }
        };

        let common: BTreeSet<i64> = timestamps.iter().copied().collect();
        for bars in series.values_mut() {
            bars.retain(|b| common.contains(&b.timestamp));
        }

        Ok(AlignedData {
            symbols: series.keys().cloned().collect(),
            bars: series,
            timestamps,
            skipped,
        })
    }
}

/// Pass fills recorded since `from` to the strategy.
fn notify(
    strategy: &mut dyn Strategy,
    book: &Book<'_>,
    data: &AlignedData,
    timestamp: i64,
    visible: usize,
    from: usize,
) {
    if book.fills.len() == from {
        return;
    }
    let ctx = book.context(data, timestamp, visible);
    for fill in &book.fills[from..] {
        strategy.on_trade(&ctx, fill);
    }
}

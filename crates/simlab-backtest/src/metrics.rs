//! Risk and return statistics.
//!
//! All outputs are plain `f64`. Ratios whose denominator is zero are reported
//! as 0 rather than NaN or infinity; the only infinite output is the profit
//! factor of a run with winning trades and no losing ones.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use simlab_core::convert::decimal_to_f64;
use simlab_core::types::{EquityCurve, Trade};
use statrs::statistics::Statistics;

/// Periods in the annualization year, regardless of bar interval.
pub const PERIODS_PER_YEAR: f64 = 365.0;

/// Confidence level for VaR and CVaR.
const VAR_CONFIDENCE: f64 = 0.95;

/// Annualized volatility below this is float noise on a constant return series.
const MIN_VOLATILITY: f64 = 1e-12;

/// Performance metrics of a single run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// `final / initial - 1`
    pub total_return: f64,
    pub annualized_return: f64,
    /// Annualized sample standard deviation of per-bar returns
    pub volatility: f64,
    /// Annualized standard deviation of negative returns only
    pub downside_volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    /// Deepest peak-to-trough decline as a fraction in [0, 1]
    pub max_drawdown: f64,
    /// Longest run of bars spent below a prior peak
    pub max_drawdown_duration_bars: usize,
    pub max_drawdown_duration_ms: i64,
    /// One-bar 95% value at risk, positive magnitude
    pub var_95: f64,
    /// Mean loss beyond the VaR threshold, positive magnitude
    pub cvar_95: f64,

    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    /// Gross profit over gross loss; infinite with wins and no losses
    pub profit_factor: f64,
    pub avg_win: f64,
    /// Negative or zero
    pub avg_loss: f64,
    pub largest_win: f64,
    /// Negative or zero
    pub largest_loss: f64,
    pub total_fees: f64,
}

/// Computes [`PerformanceMetrics`] from an equity curve and closed trades.
#[derive(Debug, Clone, Copy)]
pub struct MetricsCalculator {
    risk_free_rate: f64,
    periods_per_year: f64,
}

impl Default for MetricsCalculator {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl MetricsCalculator {
    pub fn new(risk_free_rate: f64) -> Self {
        Self {
            risk_free_rate,
            periods_per_year: PERIODS_PER_YEAR,
        }
    }

    pub fn risk_free_rate(&self) -> f64 {
        self.risk_free_rate
    }

    /// Compute every metric. Open positions are ignored by the trade stats.
    pub fn calculate(
        &self,
        curve: &EquityCurve,
        trades: &[Trade],
        initial_capital: Decimal,
    ) -> PerformanceMetrics {
        let returns = curve.returns();
        let mut metrics = self.calculate_returns(&returns, initial_capital, curve);
        self.fill_trade_stats(&mut metrics, trades);
        metrics
    }

    fn calculate_returns(
        &self,
        returns: &[f64],
        initial_capital: Decimal,
        curve: &EquityCurve,
    ) -> PerformanceMetrics {
        let capital = decimal_to_f64(initial_capital);
        let final_equity = curve.last().map(|p| decimal_to_f64(p.equity)).unwrap_or(capital);

        let total_return = if capital > 0.0 {
            final_equity / capital - 1.0
        } else {
            0.0
        };
        let annualized_return = self.annualize(total_return, returns.len());

        let volatility = sample_std(returns) * self.periods_per_year.sqrt();
        let negatives: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
        let downside_volatility = sample_std(&negatives) * self.periods_per_year.sqrt();

        let (max_drawdown, duration_bars, duration_ms) = drawdown_stats(curve);

        // Risk-adjusted ratios are undefined without return variance
        let (sharpe_ratio, sortino_ratio, calmar_ratio) = if volatility > MIN_VOLATILITY {
            let excess = annualized_return - self.risk_free_rate;
            (
                safe_ratio(excess, volatility),
                safe_ratio(excess, downside_volatility),
                safe_ratio(annualized_return, max_drawdown),
            )
        } else {
            (0.0, 0.0, 0.0)
        };

        let (var_95, cvar_95) = value_at_risk(returns, VAR_CONFIDENCE);

        PerformanceMetrics {
            total_return,
            annualized_return,
            volatility,
            downside_volatility,
            sharpe_ratio,
            sortino_ratio,
            calmar_ratio,
            max_drawdown,
            max_drawdown_duration_bars: duration_bars,
            max_drawdown_duration_ms: duration_ms,
            var_95,
            cvar_95,
            ..PerformanceMetrics::default()
        }
    }

    /// Compound `total_return` over `periods` bars into a yearly rate.
    fn annualize(&self, total_return: f64, periods: usize) -> f64 {
        if periods == 0 {
            return 0.0;
        }
        let growth = 1.0 + total_return;
        if growth <= 0.0 {
            return -1.0;
        }
        let annualized = growth.powf(self.periods_per_year / periods as f64) - 1.0;
        if annualized.is_finite() {
            annualized
        } else {
            0.0
        }
    }

    fn fill_trade_stats(&self, metrics: &mut PerformanceMetrics, trades: &[Trade]) {
        let pnls: Vec<f64> = trades.iter().map(|t| decimal_to_f64(t.net_pnl)).collect();
        let wins: Vec<f64> = pnls.iter().copied().filter(|p| *p > 0.0).collect();
        let losses: Vec<f64> = pnls.iter().copied().filter(|p| *p < 0.0).collect();

        metrics.total_trades = trades.len();
        metrics.winning_trades = wins.len();
        metrics.losing_trades = losses.len();
        metrics.total_fees = trades.iter().map(|t| decimal_to_f64(t.fees)).sum();

        if trades.is_empty() {
            return;
        }

        metrics.win_rate = wins.len() as f64 / trades.len() as f64;

        let gross_profit: f64 = wins.iter().sum();
        let gross_loss: f64 = losses.iter().map(|l| l.abs()).sum();
        metrics.profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else if gross_profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        if !wins.is_empty() {
            metrics.avg_win = gross_profit / wins.len() as f64;
            metrics.largest_win = wins.iter().copied().fold(f64::MIN, f64::max);
        }
        if !losses.is_empty() {
            metrics.avg_loss = -gross_loss / losses.len() as f64;
            metrics.largest_loss = losses.iter().copied().fold(f64::MAX, f64::min);
        }
    }
}

fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let ratio = numerator / denominator;
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}

/// Mean over sample standard deviation of `returns`, annualized by
/// `sqrt(365)`, with no risk-free rate.
///
/// Used for Monte Carlo trials and stitched walk-forward curves. 0 for fewer
/// than two returns or a deviation at float-noise level.
pub fn periodic_sharpe(returns: &[f64]) -> f64 {
    let std = sample_std(returns);
    if std <= MIN_VOLATILITY {
        return 0.0;
    }
    safe_ratio(returns.iter().mean(), std) * PERIODS_PER_YEAR.sqrt()
}

/// Sample standard deviation; 0 for fewer than two observations.
fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let std = values.std_dev();
    if std.is_finite() {
        std
    } else {
        0.0
    }
}

/// Maximum drawdown magnitude and the longest underwater stretch.
fn drawdown_stats(curve: &EquityCurve) -> (f64, usize, i64) {
    let points = curve.points();
    let Some(first) = points.first() else {
        return (0.0, 0, 0);
    };

    let mut peak = decimal_to_f64(first.equity);
    let mut peak_idx = 0;
    let mut max_dd = 0.0_f64;
    let mut longest_bars = 0;
    let mut longest_ms = 0;

    for (i, point) in points.iter().enumerate() {
        let equity = decimal_to_f64(point.equity);
        if equity >= peak {
            peak = equity;
            peak_idx = i;
            continue;
        }

        if peak > 0.0 {
            max_dd = max_dd.max((peak - equity) / peak);
        }
        let bars = i - peak_idx;
        if bars > longest_bars {
            longest_bars = bars;
            longest_ms = point.timestamp - points[peak_idx].timestamp;
        }
    }

    (max_dd.clamp(0.0, 1.0), longest_bars, longest_ms)
}

/// Historical VaR and CVaR at `confidence`, as positive loss magnitudes.
fn value_at_risk(returns: &[f64], confidence: f64) -> (f64, f64) {
    if returns.is_empty() {
        return (0.0, 0.0);
    }

    let threshold = percentile(returns, (1.0 - confidence) * 100.0);
    let tail: Vec<f64> = returns.iter().copied().filter(|r| *r <= threshold).collect();
    let tail_mean = if tail.is_empty() { threshold } else { tail.iter().mean() };

    ((-threshold).max(0.0), (-tail_mean).max(0.0))
}

/// Percentile `pct` (0..=100) with linear interpolation between closest ranks.
///
/// Returns 0 for an empty slice.
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use simlab_core::types::{ExitReason, Side};

    const DAY: i64 = 86_400_000;

    fn curve(values: &[Decimal]) -> EquityCurve {
        let mut curve = EquityCurve::new();
        for (i, v) in values.iter().enumerate() {
            curve.push(i as i64 * DAY, *v).unwrap();
        }
        curve
    }

    fn trade(net: Decimal) -> Trade {
        Trade {
            symbol: "TEST".into(),
            side: Side::Buy,
            size: dec!(1),
            entry_price: dec!(100),
            exit_price: dec!(100) + net,
            entry_time: 0,
            exit_time: DAY,
            gross_pnl: net,
            fees: dec!(0),
            net_pnl: net,
            exit_reason: ExitReason::Signal,
        }
    }

    #[test]
    fn test_flat_curve_has_zero_ratios() {
        let calc = MetricsCalculator::new(0.05);
        let flat = curve(&[dec!(1000); 30]);

        let m = calc.calculate(&flat, &[], dec!(1000));
        assert_eq!(m.total_return, 0.0);
        assert_eq!(m.volatility, 0.0);
        assert_eq!(m.sharpe_ratio, 0.0);
        assert_eq!(m.sortino_ratio, 0.0);
        assert_eq!(m.calmar_ratio, 0.0);
        assert_eq!(m.max_drawdown, 0.0);
        assert_eq!(m.profit_factor, 0.0);
    }

    #[test]
    fn test_constant_decline_has_zero_ratios() {
        let calc = MetricsCalculator::new(0.0);
        let mut values = vec![dec!(1000)];
        for _ in 0..9 {
            let next = values[values.len() - 1] * dec!(0.99);
            values.push(next);
        }

        let m = calc.calculate(&curve(&values), &[], dec!(1000));
        assert!(m.max_drawdown > 0.0);
        assert_eq!(m.sharpe_ratio, 0.0);
        assert_eq!(m.sortino_ratio, 0.0);
        assert_eq!(m.calmar_ratio, 0.0);
    }

    #[test]
    fn test_non_decreasing_curve_has_no_drawdown() {
        let calc = MetricsCalculator::default();
        let rising = curve(&[dec!(100), dec!(101), dec!(101), dec!(105), dec!(110)]);

        let m = calc.calculate(&rising, &[], dec!(100));
        assert_eq!(m.max_drawdown, 0.0);
        assert_eq!(m.max_drawdown_duration_bars, 0);
        assert!((m.total_return - 0.10).abs() < 1e-12);
        assert!(m.annualized_return > m.total_return);
    }

    #[test]
    fn test_drawdown_magnitude_and_duration() {
        let calc = MetricsCalculator::default();
        // Peak 120, trough 90, recovers on the last bar
        let path = curve(&[
            dec!(100),
            dec!(120),
            dec!(110),
            dec!(90),
            dec!(100),
            dec!(125),
        ]);

        let m = calc.calculate(&path, &[], dec!(100));
        assert!((m.max_drawdown - 0.25).abs() < 1e-12);
        assert_eq!(m.max_drawdown_duration_bars, 3);
        assert_eq!(m.max_drawdown_duration_ms, 3 * DAY);
        assert!(m.max_drawdown >= 0.0 && m.max_drawdown <= 1.0);
    }

    #[test]
    fn test_ongoing_drawdown_counts() {
        let calc = MetricsCalculator::default();
        let path = curve(&[dec!(100), dec!(90), dec!(95), dec!(96)]);

        let m = calc.calculate(&path, &[], dec!(100));
        assert_eq!(m.max_drawdown_duration_bars, 3);
    }

    #[test]
    fn test_sharpe_matches_definition() {
        let calc = MetricsCalculator::new(0.02);
        let path = curve(&[dec!(100), dec!(102), dec!(101), dec!(104), dec!(103), dec!(107)]);

        let m = calc.calculate(&path, &[], dec!(100));
        let expected = (m.annualized_return - 0.02) / m.volatility;
        assert!((m.sharpe_ratio - expected).abs() < 1e-9);
        assert!(m.sortino_ratio > m.sharpe_ratio);
    }

    #[test]
    fn test_periodic_sharpe() {
        let returns = [0.01, -0.005, 0.02, 0.0, 0.015];
        let mean = 0.008;
        let std = sample_std(&returns);
        let expected = mean / std * 365f64.sqrt();
        assert!((periodic_sharpe(&returns) - expected).abs() < 1e-9);

        assert_eq!(periodic_sharpe(&[0.01]), 0.0);
        assert_eq!(periodic_sharpe(&[0.01; 10]), 0.0);
        assert_eq!(periodic_sharpe(&[]), 0.0);
    }

    #[test]
    fn test_trade_stats() {
        let calc = MetricsCalculator::default();
        let trades = vec![trade(dec!(50)), trade(dec!(-30)), trade(dec!(20)), trade(dec!(-10))];

        let m = calc.calculate(&curve(&[dec!(1000), dec!(1030)]), &trades, dec!(1000));
        assert_eq!(m.total_trades, 4);
        assert_eq!(m.winning_trades, 2);
        assert_eq!(m.losing_trades, 2);
        assert!((m.win_rate - 0.5).abs() < 1e-12);
        assert!((m.profit_factor - 70.0 / 40.0).abs() < 1e-12);
        assert!((m.avg_win - 35.0).abs() < 1e-12);
        assert!((m.avg_loss + 20.0).abs() < 1e-12);
        assert_eq!(m.largest_win, 50.0);
        assert_eq!(m.largest_loss, -30.0);
    }

    #[test]
    fn test_profit_factor_infinite_without_losses() {
        let calc = MetricsCalculator::default();
        let trades = vec![trade(dec!(10)), trade(dec!(5))];

        let m = calc.calculate(&curve(&[dec!(100), dec!(115)]), &trades, dec!(100));
        assert!(m.profit_factor.is_infinite());
        assert_eq!(m.win_rate, 1.0);
    }

    #[test]
    fn test_var_and_cvar_are_positive_magnitudes() {
        let returns: Vec<f64> = (0..100).map(|i| (i as f64 - 50.0) / 1000.0).collect();
        let (var, cvar) = value_at_risk(&returns, 0.95);

        assert!(var > 0.0);
        assert!(cvar >= var);
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 50.0), 3.0);
        assert_eq!(percentile(&values, 100.0), 5.0);
        assert!((percentile(&values, 25.0) - 2.0).abs() < 1e-12);
        assert!((percentile(&values, 10.0) - 1.4).abs() < 1e-12);
        assert_eq!(percentile(&[], 50.0), 0.0);
    }
}

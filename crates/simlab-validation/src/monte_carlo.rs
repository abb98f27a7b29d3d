//! Monte Carlo trade-order resampling.
//!
//! Every trial replays the same closed-trade PnLs in a random order. Total
//! PnL and win rate are order-invariant; drawdown, Sharpe and ruin are not,
//! and their spread shows how much of a result depends on trade sequencing.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use simlab_backtest::{percentile, periodic_sharpe, BacktestResult};
use simlab_core::convert::decimal_to_f64;
use statrs::statistics::Statistics;
use tracing::{debug, info};

use crate::error::ValidationError;
use crate::pool::{build_pool, CancellationFlag};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    pub trials: usize,
    /// Trial `i` is seeded with `seed + i`
    pub seed: u64,
    /// A trial is ruined once equity falls below `initial_capital * ruin_fraction`
    pub ruin_fraction: f64,
    pub threads: Option<usize>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            trials: 1000,
            seed: 42,
            ruin_fraction: 0.5,
            threads: None,
        }
    }
}

impl MonteCarloConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.trials == 0 {
            return Err(ValidationError::InvalidConfig("trials must be positive".into()));
        }
        if !(self.ruin_fraction > 0.0 && self.ruin_fraction < 1.0) {
            return Err(ValidationError::InvalidConfig(format!(
                "ruin_fraction must be in (0, 1), got {}",
                self.ruin_fraction
            )));
        }
        Ok(())
    }
}

/// Distribution of one metric across trials.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub mean: f64,
    /// Sample standard deviation
    pub std: f64,
    pub p5: f64,
    pub p95: f64,
    pub min: f64,
    pub max: f64,
}

impl MetricSummary {
    fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let std = if samples.len() > 1 { samples.std_dev() } else { 0.0 };
        Self {
            mean: samples.mean(),
            std: if std.is_finite() { std } else { 0.0 },
            p5: percentile(samples, 5.0),
            p95: percentile(samples, 95.0),
            min: samples.iter().copied().fold(f64::INFINITY, f64::min),
            max: samples.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
    pub trials: usize,
    pub trade_count: usize,
    pub initial_capital: f64,
    pub sharpe: MetricSummary,
    pub max_drawdown: MetricSummary,
    pub total_pnl: MetricSummary,
    pub win_rate: MetricSummary,
    /// Fraction of trials whose equity fell below `ruin_threshold`
    pub risk_of_ruin: f64,
    pub ruin_threshold: f64,
}

impl MonteCarloResult {
    pub fn summary(&self) -> String {
        let row = |name: &str, m: &MetricSummary, scale: f64| {
            format!(
                "  {:<14} {:>10.3} {:>10.3} {:>10.3} {:>10.3}\n",
                name,
                m.mean * scale,
                m.std * scale,
                m.p5 * scale,
                m.p95 * scale
            )
        };

        let mut s = String::new();
        s.push_str("═══════════════════════════════════════════════════════════\n");
        s.push_str("                  MONTE CARLO SIMULATION                    \n");
        s.push_str("═══════════════════════════════════════════════════════════\n");
        s.push_str(&format!("  Trials:              {}\n", self.trials));
        s.push_str(&format!("  Trades per Trial:    {}\n", self.trade_count));
        s.push_str(&format!("  Initial Capital:     ${:.2}\n", self.initial_capital));
        s.push_str(&format!("  Ruin Threshold:      ${:.2}\n", self.ruin_threshold));
        s.push_str(&format!("  Risk of Ruin:        {:.2}%\n", self.risk_of_ruin * 100.0));
        s.push('\n');
        s.push_str(&format!(
            "  {:<14} {:>10} {:>10} {:>10} {:>10}\n",
            "METRIC", "MEAN", "STD", "P5", "P95"
        ));
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&row("Sharpe", &self.sharpe, 1.0));
        s.push_str(&row("Max DD %", &self.max_drawdown, 100.0));
        s.push_str(&row("Total PnL", &self.total_pnl, 1.0));
        s.push_str(&row("Win Rate %", &self.win_rate, 100.0));
        s.push_str("═══════════════════════════════════════════════════════════\n");
        s
    }
}

#[derive(Debug, Clone, Copy)]
struct Trial {
    sharpe: f64,
    max_drawdown: f64,
    total_pnl: f64,
    win_rate: f64,
    ruined: bool,
}

/// Replays shuffled trade sequences on a rayon pool.
pub struct MonteCarloSimulator {
    config: MonteCarloConfig,
    cancel: CancellationFlag,
}

impl MonteCarloSimulator {
    pub fn new(config: MonteCarloConfig) -> Self {
        Self {
            config,
            cancel: CancellationFlag::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &MonteCarloConfig {
        &self.config
    }

    /// Resample the closed trades of a finished backtest.
    pub fn from_result(&self, result: &BacktestResult) -> Result<MonteCarloResult, ValidationError> {
        self.run(&result.trade_pnls(), decimal_to_f64(result.initial_capital))
    }

    /// Run all trials over `trade_pnls` starting from `initial_capital`.
    pub fn run(&self, trade_pnls: &[f64], initial_capital: f64) -> Result<MonteCarloResult, ValidationError> {
        self.config.validate()?;
        if !(initial_capital.is_finite() && initial_capital > 0.0) {
            return Err(ValidationError::InvalidConfig(format!(
                "initial capital must be positive, got {}",
                initial_capital
            )));
        }
        if trade_pnls.iter().any(|p| !p.is_finite()) {
            return Err(ValidationError::InvalidConfig("trade PnL contains a non-finite value".into()));
        }
        self.cancel.check()?;

        let ruin_threshold = initial_capital * self.config.ruin_fraction;
        if trade_pnls.is_empty() {
            debug!("No trades to resample");
            return Ok(MonteCarloResult {
                trials: self.config.trials,
                trade_count: 0,
                initial_capital,
                sharpe: MetricSummary::default(),
                max_drawdown: MetricSummary::default(),
                total_pnl: MetricSummary::default(),
                win_rate: MetricSummary::default(),
                risk_of_ruin: 0.0,
                ruin_threshold,
            });
        }

        info!(
            trials = self.config.trials,
            trades = trade_pnls.len(),
            seed = self.config.seed,
            "Starting Monte Carlo simulation"
        );

        let pool = build_pool(self.config.threads)?;
        let trials: Vec<Trial> = pool.install(|| {
            (0..self.config.trials)
                .into_par_iter()
                .map(|i| {
                    self.cancel.check()?;
                    let seed = self.config.seed.wrapping_add(i as u64);
                    Ok(run_trial(trade_pnls, initial_capital, ruin_threshold, seed))
                })
                .collect::<Result<Vec<_>, ValidationError>>()
        })?;

        let column = |f: fn(&Trial) -> f64| trials.iter().map(f).collect::<Vec<f64>>();
        let ruined = trials.iter().filter(|t| t.ruined).count();
        let result = MonteCarloResult {
            trials: trials.len(),
            trade_count: trade_pnls.len(),
            initial_capital,
            sharpe: MetricSummary::from_samples(&column(|t| t.sharpe)),
            max_drawdown: MetricSummary::from_samples(&column(|t| t.max_drawdown)),
            total_pnl: MetricSummary::from_samples(&column(|t| t.total_pnl)),
            win_rate: MetricSummary::from_samples(&column(|t| t.win_rate)),
            risk_of_ruin: ruined as f64 / trials.len() as f64,
            ruin_threshold,
        };

        info!(
            risk_of_ruin = result.risk_of_ruin,
            mean_drawdown = result.max_drawdown.mean,
            "Monte Carlo simulation complete"
        );
        Ok(result)
    }
}

fn run_trial(pnls: &[f64], capital: f64, ruin_threshold: f64, seed: u64) -> Trial {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut order = pnls.to_vec();
    order.shuffle(&mut rng);

    let mut equity = capital;
    let mut peak = capital;
    let mut max_drawdown = 0.0_f64;
    let mut min_equity = capital;
    let mut returns = Vec::with_capacity(order.len());

    for pnl in &order {
        returns.push(if equity > 0.0 { pnl / equity } else { 0.0 });
        equity += pnl;
        min_equity = min_equity.min(equity);
        if equity > peak {
            peak = equity;
        } else if peak > 0.0 {
            max_drawdown = max_drawdown.max(((peak - equity) / peak).clamp(0.0, 1.0));
        }
    }

    let sharpe = periodic_sharpe(&returns);

    let winners = order.iter().filter(|p| **p > 0.0).count();
    Trial {
        sharpe,
        max_drawdown,
        total_pnl: equity - capital,
        win_rate: winners as f64 / order.len() as f64,
        ruined: min_equity < ruin_threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRADES: [f64; 6] = [100.0, -60.0, -60.0, 50.0, 30.0, -20.0];

    fn simulator(trials: usize, threads: usize, ruin_fraction: f64) -> MonteCarloSimulator {
        MonteCarloSimulator::new(MonteCarloConfig {
            trials,
            seed: 7,
            ruin_fraction,
            threads: Some(threads),
        })
    }

    #[test]
    fn test_total_pnl_is_order_invariant() {
        let result = simulator(200, 2, 0.5).run(&TRADES, 1000.0).unwrap();

        assert_eq!(result.trials, 200);
        assert_eq!(result.trade_count, 6);
        assert!((result.total_pnl.mean - 40.0).abs() < 1e-9);
        assert!(result.total_pnl.std.abs() < 1e-9);
        assert!((result.win_rate.mean - 0.5).abs() < 1e-12);
        assert!(result.max_drawdown.max <= 1.0);
        assert!(result.max_drawdown.min >= 0.0);
    }

    #[test]
    fn test_same_seed_same_result_across_thread_counts() {
        let a = simulator(300, 1, 0.9).run(&TRADES, 1000.0).unwrap();
        let b = simulator(300, 4, 0.9).run(&TRADES, 1000.0).unwrap();
        assert_eq!(a, b);

        let c = MonteCarloSimulator::new(MonteCarloConfig {
            seed: 8,
            ..simulator(300, 4, 0.9).config().clone()
        })
        .run(&TRADES, 1000.0)
        .unwrap();
        assert_ne!(a.max_drawdown, c.max_drawdown);
    }

    #[test]
    fn test_risk_of_ruin_depends_on_threshold() {
        // Worst ordering bottoms out at 860; best never drops below 1040
        let lenient = simulator(1000, 2, 0.5).run(&TRADES, 1000.0).unwrap();
        assert_eq!(lenient.risk_of_ruin, 0.0);
        assert_eq!(lenient.ruin_threshold, 500.0);

        let strict = simulator(1000, 2, 0.9).run(&TRADES, 1000.0).unwrap();
        assert!(strict.risk_of_ruin > 0.0 && strict.risk_of_ruin < 1.0);
        assert!(strict.max_drawdown.max > strict.max_drawdown.min);
    }

    #[test]
    fn test_five_trade_scenario() {
        let trades = [50.0, -30.0, 20.0, -80.0, 10.0];

        let result = simulator(10_000, 4, 0.5).run(&trades, 1000.0).unwrap();
        assert!((result.total_pnl.mean + 30.0).abs() < 1e-9);
        assert_eq!(result.risk_of_ruin, 0.0);
        // Both losses back to back from the start: 1000 -> 890
        assert!((result.max_drawdown.max - 0.11).abs() < 1e-12);

        let strict = simulator(10_000, 4, 0.9).run(&trades, 1000.0).unwrap();
        assert!(strict.risk_of_ruin > 0.0 && strict.risk_of_ruin < 0.5);
    }

    #[test]
    fn test_no_trades() {
        let result = simulator(50, 1, 0.5).run(&[], 1000.0).unwrap();
        assert_eq!(result.trade_count, 0);
        assert_eq!(result.risk_of_ruin, 0.0);
        assert_eq!(result.sharpe, MetricSummary::default());
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            simulator(0, 1, 0.5).run(&TRADES, 1000.0),
            Err(ValidationError::InvalidConfig(_))
        ));
        assert!(matches!(
            simulator(10, 1, 0.5).run(&TRADES, 0.0),
            Err(ValidationError::InvalidConfig(_))
        ));
        assert!(matches!(
            simulator(10, 1, 0.5).run(&[1.0, f64::NAN], 1000.0),
            Err(ValidationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_cancelled() {
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let err = simulator(10, 1, 0.5)
            .with_cancellation(cancel)
            .run(&TRADES, 1000.0)
            .unwrap_err();
        assert!(matches!(err, ValidationError::Cancelled));
    }

    #[test]
    fn test_metric_summary() {
        let m = MetricSummary::from_samples(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(m.mean, 3.0);
        assert_eq!(m.min, 1.0);
        assert_eq!(m.max, 5.0);
        assert!((m.std - 2.5f64.sqrt()).abs() < 1e-12);
        assert!((m.p5 - 1.2).abs() < 1e-12);
        assert!((m.p95 - 4.8).abs() < 1e-12);
    }

    #[test]
    fn test_summary_text() {
        let result = simulator(20, 1, 0.5).run(&TRADES, 1000.0).unwrap();
        let text = result.summary();
        assert!(text.contains("MONTE CARLO"));
        assert!(text.contains("Risk of Ruin"));
    }
}

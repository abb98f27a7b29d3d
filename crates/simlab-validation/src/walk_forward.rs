//! Walk-forward optimization.
//!
//! The available range is cut into rolling (in-sample, out-of-sample) window
//! pairs. For each window every parameter combination is backtested on the
//! in-sample slice, the best combination by the chosen objective is re-run on
//! the out-of-sample slice, and the out-of-sample results are stitched
//! together.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use simlab_backtest::{
    periodic_sharpe, BacktestConfig, BacktestEngine, BacktestError, BacktestResult, MetricsCalculator,
    PerformanceMetrics,
};
use simlab_core::traits::{ParamSet, StrategyFactory};
use simlab_core::types::{Bar, EquityCurve, Trade};
use tracing::{debug, info, warn};

use crate::error::ValidationError;
use crate::pool::{build_pool, CancellationFlag};

const DAY_MS: i64 = 86_400_000;

/// Metric maximized during in-sample selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveMetric {
    #[default]
    Sharpe,
    Sortino,
    Calmar,
    TotalReturn,
    AnnualizedReturn,
    ProfitFactor,
    WinRate,
}

impl ObjectiveMetric {
    pub fn value(&self, metrics: &PerformanceMetrics) -> f64 {
        match self {
            ObjectiveMetric::Sharpe => metrics.sharpe_ratio,
            ObjectiveMetric::Sortino => metrics.sortino_ratio,
            ObjectiveMetric::Calmar => metrics.calmar_ratio,
            ObjectiveMetric::TotalReturn => metrics.total_return,
            ObjectiveMetric::AnnualizedReturn => metrics.annualized_return,
            ObjectiveMetric::ProfitFactor => metrics.profit_factor,
            ObjectiveMetric::WinRate => metrics.win_rate,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectiveMetric::Sharpe => "sharpe",
            ObjectiveMetric::Sortino => "sortino",
            ObjectiveMetric::Calmar => "calmar",
            ObjectiveMetric::TotalReturn => "total_return",
            ObjectiveMetric::AnnualizedReturn => "annualized_return",
            ObjectiveMetric::ProfitFactor => "profit_factor",
            ObjectiveMetric::WinRate => "win_rate",
        }
    }
}

impl fmt::Display for ObjectiveMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectiveMetric {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "sharpe" | "sharpe_ratio" => Ok(ObjectiveMetric::Sharpe),
            "sortino" | "sortino_ratio" => Ok(ObjectiveMetric::Sortino),
            "calmar" | "calmar_ratio" => Ok(ObjectiveMetric::Calmar),
            "total_return" | "return" => Ok(ObjectiveMetric::TotalReturn),
            "annualized_return" | "cagr" => Ok(ObjectiveMetric::AnnualizedReturn),
            "profit_factor" => Ok(ObjectiveMetric::ProfitFactor),
            "win_rate" => Ok(ObjectiveMetric::WinRate),
            other => Err(ValidationError::InvalidConfig(format!(
                "unknown objective metric '{}'",
                other
            ))),
        }
    }
}

/// Walk-forward configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardConfig {
    pub in_sample_days: u32,
    pub out_of_sample_days: u32,
    /// Distance between consecutive window starts
    pub step_days: u32,
    pub objective: ObjectiveMetric,
    /// In-sample trades a combination needs to be eligible
    pub min_trades: usize,
    /// Weight of the consistency term in the robustness score
    pub robustness_weight: f64,
    /// Worker threads; one per CPU when unset
    pub threads: Option<usize>,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            in_sample_days: 90,
            out_of_sample_days: 30,
            step_days: 30,
            objective: ObjectiveMetric::Sharpe,
            min_trades: 20,
            robustness_weight: 0.5,
            threads: None,
        }
    }
}

impl WalkForwardConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.in_sample_days == 0 || self.out_of_sample_days == 0 || self.step_days == 0 {
            return Err(ValidationError::InvalidConfig(
                "window lengths and step must be at least one day".into(),
            ));
        }
        if self.step_days < self.out_of_sample_days {
            return Err(ValidationError::InvalidConfig(format!(
                "step_days ({}) shorter than out_of_sample_days ({}) would overlap out-of-sample ranges",
                self.step_days, self.out_of_sample_days
            )));
        }
        if !(0.0..=1.0).contains(&self.robustness_weight) {
            return Err(ValidationError::InvalidConfig(format!(
                "robustness_weight must be in [0, 1], got {}",
                self.robustness_weight
            )));
        }
        Ok(())
    }
}

/// One in-sample/out-of-sample pair. Ranges are half-open, in Unix ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkForwardWindow {
    pub index: usize,
    pub in_sample_start: i64,
    pub in_sample_end: i64,
    pub out_of_sample_start: i64,
    pub out_of_sample_end: i64,
}

impl fmt::Display for WalkForwardWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let day = |ms: i64| {
            DateTime::from_timestamp_millis(ms)
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| ms.to_string())
        };
        write!(
            f,
            "#{} IS {}..{} OOS {}..{}",
            self.index,
            day(self.in_sample_start),
            day(self.in_sample_end),
            day(self.out_of_sample_start),
            day(self.out_of_sample_end)
        )
    }
}

/// Slide the window pair across `[first, data_end)` until an out-of-sample
/// range would run past the data.
///
/// Fails on a configuration `validate` rejects, such as a zero step.
pub fn generate_windows(
    first: i64,
    data_end: i64,
    config: &WalkForwardConfig,
) -> Result<Vec<WalkForwardWindow>, ValidationError> {
    config.validate()?;
    let in_sample = i64::from(config.in_sample_days) * DAY_MS;
    let out_of_sample = i64::from(config.out_of_sample_days) * DAY_MS;
    let step = i64::from(config.step_days) * DAY_MS;

    let mut windows = Vec::new();
    let mut start = first;
    loop {
        let split = start + in_sample;
        let end = split + out_of_sample;
        if end > data_end {
            debug!(window = windows.len(), "Next window would extend past available data");
            break;
        }
        windows.push(WalkForwardWindow {
            index: windows.len(),
            in_sample_start: start,
            in_sample_end: split,
            out_of_sample_start: split,
            out_of_sample_end: end,
        });
        start += step;
    }
    Ok(windows)
}

/// Named lists of candidate values, searched exhaustively.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterGrid {
    params: BTreeMap<String, Vec<f64>>,
}

impl ParameterGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.add(name, values);
        self
    }

    pub fn add(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.params.insert(name.into(), values);
    }

    /// Parse `name=v1,v2,...` into a grid entry.
    pub fn parse_entry(spec: &str) -> Result<(String, Vec<f64>), ValidationError> {
        let (name, values) = spec.split_once('=').ok_or_else(|| {
            ValidationError::InvalidConfig(format!("grid entry '{}' must be name=v1,v2,...", spec))
        })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::InvalidConfig(format!(
                "grid entry '{}' has an empty name",
                spec
            )));
        }

        let values = values
            .split(',')
            .map(|v| {
                v.trim().parse::<f64>().map_err(|_| {
                    ValidationError::InvalidConfig(format!("'{}' in grid entry '{}' is not a number", v, name))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok((name.to_string(), values))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Number of combinations.
    pub fn len(&self) -> usize {
        self.params.values().map(Vec::len).product()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, values) in &self.params {
            if values.is_empty() {
                return Err(ValidationError::InvalidConfig(format!(
                    "parameter '{}' has no candidate values",
                    name
                )));
            }
            if values.iter().any(|v| !v.is_finite()) {
                return Err(ValidationError::InvalidConfig(format!(
                    "parameter '{}' has a non-finite value",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Cartesian product in lexicographic order of parameter name, with the
    /// last name varying fastest. An empty grid yields one empty set.
    pub fn combinations(&self) -> Vec<ParamSet> {
        let mut combos = vec![ParamSet::new()];
        for (name, values) in &self.params {
            combos = combos
                .into_iter()
                .flat_map(|base| {
                    values.iter().map(move |v| {
                        let mut next = base.clone();
                        next.insert(name.clone(), *v);
                        next
                    })
                })
                .collect();
        }
        combos
    }
}

/// Outcome of a window that produced an out-of-sample run.
#[derive(Debug, Clone, Serialize)]
pub struct WindowResult {
    pub window: WalkForwardWindow,
    pub best_params: ParamSet,
    pub in_sample: PerformanceMetrics,
    pub out_of_sample: PerformanceMetrics,
    pub in_sample_objective: f64,
    pub out_of_sample_objective: f64,
    /// Combinations that completed in-sample
    pub combinations_evaluated: usize,
    pub out_of_sample_equity: EquityCurve,
    #[serde(skip)]
    out_of_sample_trades: Vec<Trade>,
}

/// A window excluded from aggregation.
#[derive(Debug, Clone, Serialize)]
pub struct UnqualifiedWindow {
    pub window: WalkForwardWindow,
    pub reason: String,
}

/// Mean, population std and coefficient of variation of a chosen parameter
/// across windows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParameterStability {
    pub mean: f64,
    pub std: f64,
    pub coefficient_of_variation: f64,
}

/// Aggregated walk-forward outcome.
#[derive(Debug, Clone, Serialize)]
pub struct WalkForwardResult {
    pub objective: ObjectiveMetric,
    pub combinations: usize,
    pub windows: Vec<WindowResult>,
    pub unqualified: Vec<UnqualifiedWindow>,
    /// Out-of-sample equity, each segment rescaled to continue the previous one
    pub stitched_equity: EquityCurve,
    pub total_return: f64,
    /// Mean over std of stitched per-bar returns, times `sqrt(365)`
    pub sharpe_ratio: f64,
    pub parameter_stability: BTreeMap<String, ParameterStability>,
    pub robustness_score: f64,
}

impl WalkForwardResult {
    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str("═══════════════════════════════════════════════════════════\n");
        s.push_str("                  WALK-FORWARD ANALYSIS                     \n");
        s.push_str("═══════════════════════════════════════════════════════════\n");
        s.push_str(&format!("  Objective:           {}\n", self.objective));
        s.push_str(&format!("  Combinations:        {}\n", self.combinations));
        s.push_str(&format!(
            "  Windows:             {} qualified, {} unqualified\n",
            self.windows.len(),
            self.unqualified.len()
        ));
        s.push_str(&format!("  OOS Total Return:    {:.2}%\n", self.total_return * 100.0));
        s.push_str(&format!("  OOS Sharpe Ratio:    {:.2}\n", self.sharpe_ratio));
        s.push_str(&format!("  Robustness Score:    {:.3}\n", self.robustness_score));
        s.push('\n');

        s.push_str("WINDOWS\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        for w in &self.windows {
            let params: Vec<String> = w.best_params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            s.push_str(&format!(
                "  {}\n      IS {:.3}  OOS {:.3}  [{}]\n",
                w.window,
                w.in_sample_objective,
                w.out_of_sample_objective,
                params.join(", ")
            ));
        }
        for u in &self.unqualified {
            s.push_str(&format!("  {}\n      skipped: {}\n", u.window, u.reason));
        }
        s.push('\n');

        if !self.parameter_stability.is_empty() {
            s.push_str("PARAMETER STABILITY\n");
            s.push_str("───────────────────────────────────────────────────────────\n");
            for (name, stat) in &self.parameter_stability {
                s.push_str(&format!(
                    "  {:<20} mean {:.4}  std {:.4}  cv {:.3}\n",
                    name, stat.mean, stat.std, stat.coefficient_of_variation
                ));
            }
            s.push('\n');
        }

        s.push_str("═══════════════════════════════════════════════════════════\n");
        s
    }
}

enum WindowOutcome {
    Qualified(Box<WindowResult>),
    Unqualified(UnqualifiedWindow),
}

/// Rolling in-sample optimization with out-of-sample confirmation.
pub struct WalkForwardOptimizer {
    config: WalkForwardConfig,
    backtest: BacktestConfig,
    cancel: CancellationFlag,
}

impl WalkForwardOptimizer {
    pub fn new(config: WalkForwardConfig, backtest: BacktestConfig) -> Self {
        Self {
            config,
            backtest,
            cancel: CancellationFlag::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &WalkForwardConfig {
        &self.config
    }

    /// Windows that fit the data after applying the backtest date range.
    pub fn windows(&self, data: &BTreeMap<String, Vec<Bar>>) -> Result<Vec<WalkForwardWindow>, ValidationError> {
        let data = self.restrict(data);
        let (first, last) = bounds(&data)
            .ok_or_else(|| ValidationError::InsufficientData("no bars in the configured range".into()))?;
        let data_end = last + self.backtest.timeframe.as_millis();
        generate_windows(first, data_end, &self.config)
    }

    /// Run the full optimization.
    pub fn optimize(
        &self,
        factory: &dyn StrategyFactory,
        grid: &ParameterGrid,
        data: &BTreeMap<String, Vec<Bar>>,
    ) -> Result<WalkForwardResult, ValidationError> {
        self.config.validate()?;
        self.backtest.validate()?;
        grid.validate()?;

        let data = self.restrict(data);
        let windows = self.windows(&data)?;
        if windows.is_empty() {
            let needed = self.config.in_sample_days + self.config.out_of_sample_days;
            return Err(ValidationError::InsufficientData(format!(
                "one window needs {} days of data",
                needed
            )));
        }

        let combos = grid.combinations();
        info!(
            windows = windows.len(),
            combinations = combos.len(),
            objective = %self.config.objective,
            "Starting walk-forward optimization"
        );

        let pool = build_pool(self.config.threads)?;
        let outcomes: Vec<Result<WindowOutcome, ValidationError>> = pool.install(|| {
            windows
                .par_iter()
                .map(|window| self.run_window(window, factory, &combos, &data))
                .collect()
        });
        self.cancel.check()?;

        let mut qualified = Vec::new();
        let mut unqualified = Vec::new();
        for outcome in outcomes {
            match outcome? {
                WindowOutcome::Qualified(result) => qualified.push(*result),
                WindowOutcome::Unqualified(skip) => {
                    warn!(window = %skip.window, reason = %skip.reason, "Window excluded from aggregation");
                    unqualified.push(skip);
                }
            }
        }

        if qualified.is_empty() {
            return Err(ValidationError::NoQualifiedWindows {
                windows: windows.len(),
            });
        }

        self.aggregate(grid, combos.len(), qualified, unqualified)
    }

    fn run_window(
        &self,
        window: &WalkForwardWindow,
        factory: &dyn StrategyFactory,
        combos: &[ParamSet],
        data: &BTreeMap<String, Vec<Bar>>,
    ) -> Result<WindowOutcome, ValidationError> {
        self.cancel.check()?;

        let unqualified = |reason: String| -> Result<WindowOutcome, ValidationError> {
            Ok(WindowOutcome::Unqualified(UnqualifiedWindow {
                window: *window,
                reason,
            }))
        };

        let in_sample = slice(data, window.in_sample_start, window.in_sample_end);
        if in_sample.is_empty() {
            return unqualified("no in-sample bars".into());
        }

        let evaluated: Vec<(&ParamSet, BacktestResult)> = combos
            .par_iter()
            .filter_map(|params| {
                if self.cancel.is_cancelled() {
                    return None;
                }
                match self.evaluate(factory, params, &in_sample) {
                    Ok(result) => Some((params, result)),
                    Err(e) => {
                        warn!(window = window.index, params = ?params, error = %e, "Parameter evaluation failed, skipping");
                        None
                    }
                }
            })
            .collect();
        self.cancel.check()?;

        let objective = self.config.objective;
        let mut best: Option<(&ParamSet, &BacktestResult, f64)> = None;
        for (params, result) in &evaluated {
            if result.metrics.total_trades < self.config.min_trades {
                continue;
            }
            let score = objective.value(&result.metrics);
            if score.is_nan() {
                continue;
            }
            if best.map_or(true, |(_, _, top)| score > top) {
                best = Some((params, result, score));
            }
        }

        let Some((params, in_sample_result, in_sample_objective)) = best else {
            return unqualified(format!(
                "no combination reached {} in-sample trades ({} evaluated)",
                self.config.min_trades,
                evaluated.len()
            ));
        };

        let out_of_sample = slice(data, window.out_of_sample_start, window.out_of_sample_end);
        if out_of_sample.is_empty() {
            return unqualified("no out-of-sample bars".into());
        }
        let oos = match self.evaluate(factory, params, &out_of_sample) {
            Ok(result) => result,
            Err(e) => return unqualified(format!("out-of-sample run failed: {}", e)),
        };

        debug!(
            window = window.index,
            params = ?params,
            in_sample = in_sample_objective,
            out_of_sample = objective.value(&oos.metrics),
            "Window complete"
        );

        Ok(WindowOutcome::Qualified(Box::new(WindowResult {
            window: *window,
            best_params: params.clone(),
            in_sample: in_sample_result.metrics.clone(),
            out_of_sample_objective: objective.value(&oos.metrics),
            out_of_sample: oos.metrics,
            in_sample_objective,
            combinations_evaluated: evaluated.len(),
            out_of_sample_equity: oos.equity_curve,
            out_of_sample_trades: oos.trades,
        })))
    }

    fn evaluate(
        &self,
        factory: &dyn StrategyFactory,
        params: &ParamSet,
        data: &BTreeMap<String, Vec<Bar>>,
    ) -> Result<BacktestResult, ValidationError> {
        let mut strategy = factory
            .build(params)
            .map_err(BacktestError::from)?;
        let engine = BacktestEngine::new(self.backtest.clone().with_range(None, None));
        Ok(engine.run(strategy.as_mut(), data)?)
    }

    fn aggregate(
        &self,
        grid: &ParameterGrid,
        combinations: usize,
        mut windows: Vec<WindowResult>,
        unqualified: Vec<UnqualifiedWindow>,
    ) -> Result<WalkForwardResult, ValidationError> {
        windows.sort_by_key(|w| w.window.index);

        let mut stitched = EquityCurve::new();
        for w in &windows {
            let segment = &w.out_of_sample_equity;
            match (stitched.last(), segment.first()) {
                (Some(prev), Some(first)) if first.equity > Decimal::ZERO => {
                    stitched
                        .extend_from(&segment.scaled(prev.equity / first.equity))
                        .map_err(BacktestError::from)?;
                }
                _ => stitched.extend_from(segment).map_err(BacktestError::from)?,
            }
        }

        let trades: Vec<Trade> = windows
            .iter()
            .flat_map(|w| w.out_of_sample_trades.iter().cloned())
            .collect();
        let stitched_metrics = MetricsCalculator::new(self.backtest.risk_free_rate).calculate(
            &stitched,
            &trades,
            self.backtest.initial_capital,
        );

        let mut parameter_stability = BTreeMap::new();
        for name in grid.names() {
            let values: Vec<f64> = windows
                .iter()
                .filter_map(|w| w.best_params.get(name).copied())
                .collect();
            if let Some(stat) = stability(&values) {
                parameter_stability.insert(name.to_string(), stat);
            }
        }

        let in_sample: Vec<f64> = windows.iter().map(|w| w.in_sample_objective).collect();
        let out_of_sample: Vec<f64> = windows.iter().map(|w| w.out_of_sample_objective).collect();
        let robustness_score = robustness(&in_sample, &out_of_sample, self.config.robustness_weight);

        info!(
            qualified = windows.len(),
            unqualified = unqualified.len(),
            total_return = stitched_metrics.total_return,
            robustness = robustness_score,
            "Walk-forward optimization complete"
        );

        Ok(WalkForwardResult {
            objective: self.config.objective,
            combinations,
            windows,
            unqualified,
            total_return: stitched_metrics.total_return,
            sharpe_ratio: periodic_sharpe(&stitched.returns()),
            stitched_equity: stitched,
            parameter_stability,
            robustness_score,
        })
    }

    fn restrict(&self, data: &BTreeMap<String, Vec<Bar>>) -> BTreeMap<String, Vec<Bar>> {
        let start = self.backtest.start.map(|t| t.timestamp_millis()).unwrap_or(i64::MIN);
        let end = self
            .backtest
            .end
            .map(|t| t.timestamp_millis().saturating_add(1))
            .unwrap_or(i64::MAX);
        slice(data, start, end)
    }
}

/// Copy of every symbol's bars in `[start, end)`. Symbols left empty are dropped.
fn slice(data: &BTreeMap<String, Vec<Bar>>, start: i64, end: i64) -> BTreeMap<String, Vec<Bar>> {
    data.iter()
        .filter_map(|(symbol, bars)| {
            let part: Vec<Bar> = bars
                .iter()
                .filter(|b| b.timestamp >= start && b.timestamp < end)
                .copied()
                .collect();
            (!part.is_empty()).then(|| (symbol.clone(), part))
        })
        .collect()
}

/// Earliest and latest timestamp across all symbols.
fn bounds(data: &BTreeMap<String, Vec<Bar>>) -> Option<(i64, i64)> {
    let first = data.values().filter_map(|b| b.iter().map(|x| x.timestamp).min()).min()?;
    let last = data.values().filter_map(|b| b.iter().map(|x| x.timestamp).max()).max()?;
    Some((first, last))
}

fn mean_and_population_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

fn stability(values: &[f64]) -> Option<ParameterStability> {
    if values.is_empty() {
        return None;
    }
    let (mean, std) = mean_and_population_std(values);
    let coefficient_of_variation = if mean != 0.0 { std / mean.abs() } else { 0.0 };
    Some(ParameterStability {
        mean,
        std,
        coefficient_of_variation,
    })
}

/// `weight * consistency + (1 - weight) * efficiency`.
///
/// Consistency is `1 - std/|mean|` of the out-of-sample objective, floored at
/// 0. Efficiency is the mean out-of-sample/in-sample ratio over windows with
/// a positive in-sample objective, clamped to [0, 1]. Non-finite objective
/// values are ignored.
pub(crate) fn robustness(in_sample: &[f64], out_of_sample: &[f64], weight: f64) -> f64 {
    let oos: Vec<f64> = out_of_sample.iter().copied().filter(|v| v.is_finite()).collect();
    let consistency = if oos.is_empty() {
        0.0
    } else {
        let (mean, std) = mean_and_population_std(&oos);
        if mean != 0.0 {
            (1.0 - std / mean.abs()).max(0.0)
        } else {
            0.0
        }
    };

    let ratios: Vec<f64> = in_sample
        .iter()
        .zip(out_of_sample)
        .filter(|(is, oos)| is.is_finite() && oos.is_finite() && **is > 0.0)
        .map(|(is, oos)| oos / is)
        .collect();
    let efficiency = if ratios.is_empty() {
        0.0
    } else {
        (ratios.iter().sum::<f64>() / ratios.len() as f64).clamp(0.0, 1.0)
    };

    weight * consistency + (1.0 - weight) * efficiency
}

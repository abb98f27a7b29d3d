//! Monte Carlo command implementation.

use anyhow::{Context, Result};
use simlab_backtest::BacktestEngine;
use simlab_config::AppConfig;
use simlab_strategies::StrategyRegistry;
use simlab_validation::MonteCarloSimulator;
use tracing::info;

use super::common::{build_strategy, cancel_on_ctrl_c, load_data};
use crate::cli::{MonteCarloArgs, OutputFormat};

pub async fn run(args: MonteCarloArgs, mut config: AppConfig) -> Result<()> {
    let mc = &mut config.monte_carlo;
    if let Some(trials) = args.trials {
        mc.trials = trials;
    }
    if let Some(seed) = args.seed {
        mc.seed = seed;
    }
    if let Some(fraction) = args.ruin_fraction {
        mc.ruin_fraction = fraction;
    }
    if args.threads.is_some() {
        mc.threads = args.threads;
    }

    let registry = StrategyRegistry::new();
    let mut strategy = build_strategy(&registry, &args.strategy)?;
    let data = load_data(&args.data, &mut config).await?;

    let backtest = BacktestEngine::new(config.backtest.clone()).run(strategy.as_mut(), &data)?;
    info!(
        trades = backtest.trades.len(),
        final_equity = %backtest.final_equity,
        "Backtest complete, resampling trades"
    );

    let (cancel, watcher) = cancel_on_ctrl_c();
    let simulator = MonteCarloSimulator::new(config.monte_carlo.clone()).with_cancellation(cancel);
    let result = tokio::task::spawn_blocking(move || simulator.from_result(&backtest))
        .await
        .context("Monte Carlo worker panicked")?;
    watcher.abort();
    let result = result?;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => println!("{}", result.summary()),
    }

    Ok(())
}

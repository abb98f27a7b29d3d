//! Walk-forward command implementation.

use anyhow::{Context, Result};
use simlab_config::AppConfig;
use simlab_strategies::StrategyRegistry;
use simlab_validation::{ParameterGrid, WalkForwardOptimizer};
use tracing::info;

use super::common::{cancel_on_ctrl_c, load_data, save};
use crate::cli::{OutputFormat, WalkForwardArgs};

pub async fn run(args: WalkForwardArgs, mut config: AppConfig) -> Result<()> {
    let wf = &mut config.walk_forward;
    if let Some(objective) = &args.objective {
        wf.objective = objective.parse()?;
    }
    if let Some(days) = args.in_sample_days {
        wf.in_sample_days = days;
    }
    if let Some(days) = args.out_of_sample_days {
        wf.out_of_sample_days = days;
    }
    if let Some(days) = args.step_days {
        wf.step_days = days;
    }
    if let Some(min_trades) = args.min_trades {
        wf.min_trades = min_trades;
    }
    if args.threads.is_some() {
        wf.threads = args.threads;
    }

    let mut grid = ParameterGrid::new();
    for entry in &args.grid {
        let (name, values) = ParameterGrid::parse_entry(entry)?;
        grid.add(name, values);
    }

    let registry = StrategyRegistry::new();
    let factory = registry.factory(&args.strategy)?;
    let data = load_data(&args.data, &mut config).await?;

    info!(strategy = %args.strategy, combinations = grid.len(), "Starting walk-forward analysis");

    let (cancel, watcher) = cancel_on_ctrl_c();
    let optimizer = WalkForwardOptimizer::new(config.walk_forward.clone(), config.backtest.clone())
        .with_cancellation(cancel);
    let result = tokio::task::spawn_blocking(move || optimizer.optimize(factory.as_ref(), &grid, &data))
        .await
        .context("Walk-forward worker panicked")?;
    watcher.abort();
    let result = result?;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => println!("{}", result.summary()),
    }
    if let Some(path) = &args.save {
        save(path, &serde_json::to_string_pretty(&result)?)?;
    }

    Ok(())
}

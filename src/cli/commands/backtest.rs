//! Backtest command implementation.

use anyhow::{Context, Result};
use simlab_backtest::BacktestEngine;
use simlab_config::AppConfig;
use simlab_core::convert::decimal_from_f64;
use simlab_strategies::StrategyRegistry;
use tracing::info;

use super::common::{build_strategy, load_data, save};
use crate::cli::{BacktestArgs, OutputFormat};

pub async fn run(args: BacktestArgs, mut config: AppConfig) -> Result<()> {
    info!(strategy = %args.strategy.strategy, "Starting backtest");

    if let Some(capital) = args.capital {
        config.backtest.initial_capital =
            decimal_from_f64(capital).with_context(|| format!("Invalid capital {}", capital))?;
    }

    let registry = StrategyRegistry::new();
    let mut strategy = build_strategy(&registry, &args.strategy)?;
    let data = load_data(&args.data, &mut config).await?;

    let engine = BacktestEngine::new(config.backtest.clone());
    let result = engine.run(strategy.as_mut(), &data)?;

    match args.output {
        OutputFormat::Json => println!("{}", result.to_json()?),
        OutputFormat::Text => println!("{}", result.summary()),
    }

    if let Some(path) = &args.save {
        save(path, &result.to_json()?)?;
    }
    if let Some(path) = &args.equity_csv {
        result
            .write_equity_csv(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    if let Some(path) = &args.trades_csv {
        result
            .write_trades_csv(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    Ok(())
}

//! Helpers shared by the simulation commands.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use simlab_config::AppConfig;
use simlab_core::traits::{ParamSet, Strategy};
use simlab_core::types::{Bar, Timeframe};
use simlab_data::{load_symbols, CachedDataSource, CsvDataSource, DataCache};
use simlab_strategies::StrategyRegistry;
use simlab_validation::{CancellationFlag, ParameterGrid};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cli::{DataArgs, StrategyArgs};

/// Midnight UTC of a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", value))?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .with_context(|| format!("Invalid date '{}'", value))
}

/// Apply the data overrides to `config` and load every requested symbol.
pub async fn load_data(args: &DataArgs, config: &mut AppConfig) -> Result<BTreeMap<String, Vec<Bar>>> {
    if let Some(timeframe) = &args.timeframe {
        config.data.timeframe = timeframe.parse::<Timeframe>()?;
    }
    if let Some(dir) = &args.data {
        config.data.dir = dir.clone();
    }
    config.backtest.timeframe = config.data.timeframe;

    let start = args.start.as_deref().map(parse_date).transpose()?;
    let end = args.end.as_deref().map(parse_date).transpose()?;
    if start.is_some() || end.is_some() {
        config.backtest.start = start;
        config.backtest.end = end;
    }

    let source = CachedDataSource::new(
        CsvDataSource::new(&config.data.dir)
            .with_context(|| format!("Cannot read data directory {}", config.data.dir.display()))?,
        DataCache::new(config.data.cache_ttl(), config.data.cache_max_entries),
    );

    let data = load_symbols(
        &source,
        &args.symbols,
        config.data.timeframe,
        config.backtest.start.unwrap_or(DateTime::<Utc>::MIN_UTC),
        config.backtest.end.unwrap_or(DateTime::<Utc>::MAX_UTC),
        config.data.exchange.as_deref(),
    )
    .await;

    if data.values().all(Vec::is_empty) {
        bail!(
            "No data found for {} in {}",
            args.symbols.join(", "),
            config.data.dir.display()
        );
    }
    Ok(data)
}

/// `name=value` pairs into a parameter set.
pub fn parse_params(entries: &[String]) -> Result<ParamSet> {
    let mut params = ParamSet::new();
    for entry in entries {
        let (name, values) = ParameterGrid::parse_entry(entry)?;
        match values.as_slice() {
            [value] => {
                params.insert(name, *value);
            }
            _ => bail!("Parameter '{}' takes exactly one value", name),
        }
    }
    Ok(params)
}

pub fn build_strategy(registry: &StrategyRegistry, args: &StrategyArgs) -> Result<Box<dyn Strategy>> {
    let strategy = if let Some(path) = &args.strategy_config {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read strategy config {}", path.display()))?;
        let config: serde_json::Value = serde_json::from_str(&raw)
            .with_context(|| format!("Strategy config {} is not valid JSON", path.display()))?;
        registry.create(&args.strategy, config)?
    } else if !args.params.is_empty() {
        registry.create_from_params(&args.strategy, &parse_params(&args.params)?)?
    } else {
        registry.create_default(&args.strategy)?
    };
    info!(strategy = strategy.name(), "Strategy ready");
    Ok(strategy)
}

/// Flag flipped by Ctrl-C. Abort the handle once the guarded work is done.
pub fn cancel_on_ctrl_c() -> (CancellationFlag, JoinHandle<()>) {
    let cancel = CancellationFlag::new();
    let flag = cancel.clone();
    let handle = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing running units and stopping");
            flag.cancel();
        }
    });
    (cancel, handle)
}

pub fn save(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "Saved output");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-01-15").unwrap().timestamp_millis(), 1_705_276_800_000);
        assert!(parse_date("15/01/2024").is_err());
    }

    #[test]
    fn test_parse_params() {
        let params = parse_params(&["fast_period=5".to_string(), "use_ema=0".to_string()]).unwrap();
        assert_eq!(params["fast_period"], 5.0);
        assert_eq!(params["use_ema"], 0.0);

        assert!(parse_params(&["fast_period=5,10".to_string()]).is_err());
        assert!(parse_params(&["fast_period".to_string()]).is_err());
    }
}

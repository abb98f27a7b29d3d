//! Validate configuration command.

use std::path::Path;

use anyhow::Result;
use simlab_config::{load_config, to_toml, validate};

pub fn run(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());

    let config = match load_config(config_path).and_then(|config| validate(&config).map(|_| config)) {
        Ok(config) => config,
        Err(e) => {
            println!("Configuration error: {}", e);
            return Err(e.into());
        }
    };

    println!("Configuration is valid!");
    println!();
    println!("App: {}", config.app.name);
    println!("Environment: {}", config.app.environment);
    println!("Log level: {}", config.logging.level);
    println!("Initial capital: {}", config.backtest.initial_capital);
    println!("Max drawdown: {}", config.backtest.max_drawdown_pct);
    println!(
        "Walk-forward: {}d in-sample / {}d out-of-sample, objective {}",
        config.walk_forward.in_sample_days, config.walk_forward.out_of_sample_days, config.walk_forward.objective
    );
    println!();
    println!("Effective configuration:");
    println!("{}", to_toml(&config)?);

    Ok(())
}

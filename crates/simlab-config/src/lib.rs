//! Configuration management.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `SIMLAB__<SECTION>__<KEY>` environment variables.

mod settings;

pub use settings::{AppConfig, AppSettings, DataSettings, LoggingConfig};

use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use thiserror::Error;

const ENV_PREFIX: &str = "SIMLAB";

/// Configuration loading and validation errors.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

/// Load configuration from file and environment.
pub fn load_config(path: &Path) -> Result<AppConfig, SettingsError> {
    let config = Config::builder()
        .add_source(File::from(path).required(true))
        .add_source(environment())
        .build()?;

    Ok(config.try_deserialize()?)
}

/// Like [`load_config`], but a missing path falls back to defaults plus environment.
pub fn load_config_or_default(path: Option<&Path>) -> Result<AppConfig, SettingsError> {
    match path {
        Some(path) if path.exists() => load_config(path),
        _ => {
            let config = Config::builder().add_source(environment()).build()?;
            Ok(config.try_deserialize()?)
        }
    }
}

/// Check every section, reporting the first problem found.
pub fn validate(config: &AppConfig) -> Result<(), SettingsError> {
    let invalid = |section: &str, e: &dyn std::fmt::Display| SettingsError::Invalid(format!("[{}] {}", section, e));

    config.backtest.validate().map_err(|e| invalid("backtest", &e))?;
    config.walk_forward.validate().map_err(|e| invalid("walk_forward", &e))?;
    config.monte_carlo.validate().map_err(|e| invalid("monte_carlo", &e))?;

    if !matches!(config.logging.format.as_str(), "pretty" | "json") {
        return Err(invalid(
            "logging",
            &format!("format must be 'pretty' or 'json', got '{}'", config.logging.format),
        ));
    }
    if config.logging.level.trim().is_empty() {
        return Err(invalid("logging", &"level must not be empty"));
    }
    if config.data.cache_max_entries == 0 {
        return Err(invalid("data", &"cache_max_entries must be positive"));
    }
    Ok(())
}

/// Render a configuration as TOML.
pub fn to_toml(config: &AppConfig) -> Result<String, SettingsError> {
    Ok(toml::to_string_pretty(config)?)
}

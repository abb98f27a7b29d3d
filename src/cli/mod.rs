//! CLI definitions.

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "simlab")]
#[command(author, version, about = "Strategy simulation and overfitting validation")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", env = "SIMLAB_CONFIG")]
    pub config: PathBuf,

    /// Log level, overriding the configured one
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a single backtest
    Backtest(BacktestArgs),
    /// Rolling in-sample optimization with out-of-sample confirmation
    WalkForward(WalkForwardArgs),
    /// Backtest, then resample the trade order
    MonteCarlo(MonteCarloArgs),
    /// List available strategies
    Strategies,
    /// Validate configuration
    ValidateConfig,
}

/// Which bars to load.
#[derive(clap::Args)]
pub struct DataArgs {
    /// Symbols to simulate (comma-separated)
    #[arg(short = 'S', long, value_delimiter = ',', required = true)]
    pub symbols: Vec<String>,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<String>,

    /// End date (YYYY-MM-DD), inclusive
    #[arg(long)]
    pub end: Option<String>,

    /// Timeframe, overriding the configured one
    #[arg(short, long)]
    pub timeframe: Option<String>,

    /// Directory of `<symbol>.csv` files, overriding the configured one
    #[arg(long)]
    pub data: Option<PathBuf>,
}

/// Which strategy to run and how to configure it.
#[derive(clap::Args)]
pub struct StrategyArgs {
    /// Strategy name
    #[arg(short, long)]
    pub strategy: String,

    /// Strategy configuration file (JSON)
    #[arg(long, conflicts_with = "params")]
    pub strategy_config: Option<PathBuf>,

    /// Strategy parameter as name=value (repeatable)
    #[arg(short = 'p', long = "param")]
    pub params: Vec<String>,
}

#[derive(clap::Args)]
pub struct BacktestArgs {
    #[command(flatten)]
    pub strategy: StrategyArgs,

    #[command(flatten)]
    pub data: DataArgs,

    /// Initial capital, overriding the configured one
    #[arg(long)]
    pub capital: Option<f64>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Save the JSON result to a file
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Write the equity curve as CSV
    #[arg(long)]
    pub equity_csv: Option<PathBuf>,

    /// Write closed trades as CSV
    #[arg(long)]
    pub trades_csv: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct WalkForwardArgs {
    /// Strategy name
    #[arg(short, long)]
    pub strategy: String,

    #[command(flatten)]
    pub data: DataArgs,

    /// Parameter grid entry as name=v1,v2,... (repeatable)
    #[arg(short, long = "grid", required = true)]
    pub grid: Vec<String>,

    /// Objective metric (sharpe, sortino, calmar, total_return, ...)
    #[arg(long)]
    pub objective: Option<String>,

    #[arg(long)]
    pub in_sample_days: Option<u32>,

    #[arg(long)]
    pub out_of_sample_days: Option<u32>,

    #[arg(long)]
    pub step_days: Option<u32>,

    /// Minimum in-sample trades for a combination to qualify
    #[arg(long)]
    pub min_trades: Option<usize>,

    /// Worker threads (default: one per CPU)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Save the JSON result to a file
    #[arg(long)]
    pub save: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct MonteCarloArgs {
    #[command(flatten)]
    pub strategy: StrategyArgs,

    #[command(flatten)]
    pub data: DataArgs,

    #[arg(long)]
    pub trials: Option<usize>,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Fraction of starting capital below which a trial counts as ruined
    #[arg(long)]
    pub ruin_fraction: Option<f64>,

    /// Worker threads (default: one per CPU)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

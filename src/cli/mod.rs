//! CLI definitions.

pub mod commands;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use quant_config::{load_config, AppConfig};
use quant_core::types::Timeframe;
use quant_data::PairRanking;

/// Configuration file used when `--config` is not given and the file exists.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Parser)]
#[command(name = "quant")]
#[command(author, version, about = "Quantitative strategy research pipeline")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "QUANT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (defaults to logging.level from the configuration)
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// The explicit `--config`, or the default file when present.
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(|| {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            default.exists().then(|| default.to_path_buf())
        })
    }

    pub fn load_config(&self) -> Result<AppConfig> {
        let path = self.config_path();
        load_config(path.as_deref()).with_context(|| match &path {
            Some(p) => format!("Failed to load configuration from {}", p.display()),
            None => "Failed to load configuration from defaults and environment".to_string(),
        })
    }
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
    /// Download market data into the cache
    Fetch(FetchArgs),
    /// Print the selected pair universe
    Pairs(PairsArgs),
    /// Run the strategy over every pair and report metrics
    Backtest(BacktestArgs),
    /// List available strategies
    Strategies,
    /// Validate configuration
    ValidateConfig,
}

/// Options that narrow the data window and universe.
#[derive(clap::Args, Clone, Default)]
pub struct WindowArgs {
    /// Pairs to use (comma-separated); selected from the exchange when omitted
    #[arg(short, long, value_delimiter = ',')]
    pub pairs: Vec<String>,

    /// Number of pairs to select
    #[arg(short = 'n', long)]
    pub max_pairs: Option<usize>,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// End date (YYYY-MM-DD, exclusive)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Timeframe
    #[arg(short, long)]
    pub timeframe: Option<Timeframe>,

    /// Pair ranking (lexical, volume)
    #[arg(long)]
    pub ranking: Option<PairRanking>,
}

impl WindowArgs {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(n) = self.max_pairs {
            config.data.max_pairs = n;
        }
        if let Some(start) = self.start {
            config.data.start_date = start;
        }
        if let Some(end) = self.end {
            config.data.end_date = end;
        }
        if let Some(tf) = self.timeframe {
            config.data.timeframe = tf;
        }
        if let Some(ranking) = self.ranking {
            config.data.ranking = ranking;
        }
    }
}

#[derive(clap::Args)]
pub struct FetchArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Refetch cached pairs; only a complete fetch replaces the entry
    #[arg(long)]
    pub refresh: bool,
}

#[derive(clap::Args)]
pub struct PairsArgs {
    /// Quote asset
    #[arg(short, long)]
    pub quote: Option<String>,

    /// Number of pairs
    #[arg(short = 'n', long)]
    pub max_pairs: Option<usize>,

    /// Pair ranking (lexical, volume)
    #[arg(long)]
    pub ranking: Option<PairRanking>,
}

#[derive(clap::Args)]
pub struct BacktestArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Strategy to backtest (defaults to the configured strategy)
    #[arg(short, long)]
    pub strategy: Option<String>,

    /// Strategy parameters as JSON, e.g. '{"fast_period": 5}'
    #[arg(long)]
    pub params: Option<String>,

    /// Fast moving average window
    #[arg(long)]
    pub fast: Option<usize>,

    /// Slow moving average window
    #[arg(long)]
    pub slow: Option<usize>,

    /// Initial capital
    #[arg(long)]
    pub capital: Option<f64>,

    /// Commission rate per fill
    #[arg(long)]
    pub commission: Option<f64>,

    /// Slippage rate per fill
    #[arg(long)]
    pub slippage: Option<f64>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Save the report and equity curves to this directory
    /// (defaults to backtest.output_dir when given without a value)
    #[arg(long, num_args = 0..=1)]
    pub save: Option<Option<PathBuf>>,
}

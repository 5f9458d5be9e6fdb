//! Configuration structures.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use quant_core::error::{QuantError, QuantResult};
use quant_core::types::{CostModel, Timeframe};
use quant_data::{FetchConfig, PairRanking, BINANCE_API_URL};
use quant_strategies::StrategySpec;

/// Main application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub data: DataSettings,
    #[serde(default)]
    pub backtest: BacktestSettings,
    #[serde(default)]
    pub strategy: StrategySpec,
}

/// General app settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "quant".to_string(),
            environment: "research".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
    /// Directory for daily-rolling log files
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}

/// Market data acquisition settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub cache_dir: PathBuf,
    pub exchange_url: String,
    pub timeframe: Timeframe,
    /// First day of the window (inclusive, UTC midnight)
    pub start_date: NaiveDate,
    /// End of the window (exclusive, UTC midnight)
    pub end_date: NaiveDate,
    /// Quote asset of the pair universe
    pub quote_asset: String,
    pub max_pairs: usize,
    pub ranking: PairRanking,
    pub fetch: FetchConfig,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("data"),
            exchange_url: BINANCE_API_URL.to_string(),
            timeframe: Timeframe::Minute1,
            start_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2025, 2, 28).unwrap_or_default(),
            quote_asset: "BTC".to_string(),
            max_pairs: 100,
            ranking: PairRanking::Lexical,
            fetch: FetchConfig::default(),
        }
    }
}

fn midnight_ms(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::default()).and_utc().timestamp_millis()
}

impl DataSettings {
    pub fn start_ms(&self) -> i64 {
        midnight_ms(self.start_date)
    }

    pub fn end_ms(&self) -> i64 {
        midnight_ms(self.end_date)
    }
}

/// Backtest settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    pub initial_capital: f64,
    /// Commission rate per fill
    pub commission: f64,
    /// Slippage rate per fill
    pub slippage: f64,
    /// Sharpe annualization; derived from the timeframe when unset
    pub periods_per_year: Option<f64>,
    pub output_dir: PathBuf,
    /// Pairs simulated at once
    pub concurrency: usize,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            commission: 0.001,
            slippage: 0.0005,
            periods_per_year: None,
            output_dir: PathBuf::from("results"),
            concurrency: 4,
        }
    }
}

impl BacktestSettings {
    pub fn costs(&self) -> CostModel {
        CostModel {
            commission: self.commission,
            slippage: self.slippage,
        }
    }
}

impl AppConfig {
    /// Check cross-field rules; every failure is a `QuantError::Config`.
    pub fn validate(&self) -> QuantResult<()> {
        let config_err = |msg: String| Err(QuantError::Config(msg));

        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            other => return config_err(format!("logging.format must be pretty or json, got {}", other)),
        }

        let data = &self.data;
        if data.start_date >= data.end_date {
            return config_err(format!(
                "data.start_date ({}) must be before data.end_date ({})",
                data.start_date, data.end_date
            ));
        }
        if data.quote_asset.trim().is_empty() {
            return config_err("data.quote_asset must not be empty".into());
        }
        if data.max_pairs == 0 {
            return config_err("data.max_pairs must be at least 1".into());
        }
        if data.exchange_url.trim().is_empty() {
            return config_err("data.exchange_url must not be empty".into());
        }
        data.fetch.validate().map_err(QuantError::Config)?;

        let bt = &self.backtest;
        if !bt.initial_capital.is_finite() || bt.initial_capital <= 0.0 {
            return config_err(format!(
                "backtest.initial_capital must be positive, got {}",
                bt.initial_capital
            ));
        }
        if let Some(ppy) = bt.periods_per_year {
            if !ppy.is_finite() || ppy <= 0.0 {
                return config_err(format!("backtest.periods_per_year must be positive, got {}", ppy));
            }
        }
        if bt.concurrency == 0 {
            return config_err("backtest.concurrency must be at least 1".into());
        }
        bt.costs()
            .validate()
            .map_err(|e| QuantError::Config(e.to_string()))?;

        self.strategy
            .validate()
            .map_err(|e| QuantError::Config(e.to_string()))?;

        Ok(())
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> QuantResult<String> {
        toml::to_string_pretty(self).map_err(|e| QuantError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quant_strategies::MACrossoverConfig;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.data.start_ms(), 1_738_368_000_000);
        assert_eq!(config.data.end_ms() - config.data.start_ms(), 27 * 86_400_000);
        assert_eq!(config.backtest.costs(), CostModel::new(0.001, 0.0005).unwrap());
    }

    #[test]
    fn test_rejects_empty_window() {
        let mut config = AppConfig::default();
        config.data.end_date = config.data.start_date;
        assert!(matches!(config.validate(), Err(QuantError::Config(_))));
    }

    #[test]
    fn test_rejects_bad_windows() {
        let mut config = AppConfig::default();
        config.strategy = StrategySpec::MaCrossover(MACrossoverConfig {
            fast_period: 30,
            slow_period: 30,
            ..Default::default()
        });
        assert!(config.validate().is_err());

        config.strategy = StrategySpec::MaCrossover(MACrossoverConfig {
            fast_period: 0,
            slow_period: 30,
            ..Default::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_costs_and_capital() {
        let mut config = AppConfig::default();
        config.backtest.commission = -0.001;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.backtest.slippage = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.backtest.initial_capital = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_log_format() {
        let mut config = AppConfig::default();
        config.logging.format = "xml".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = AppConfig::default();
        let text = config.to_toml().unwrap();
        assert!(text.contains("[data.fetch.retry]"));
        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}

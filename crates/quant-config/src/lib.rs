//! Configuration management.

mod settings;

pub use settings::{AppConfig, AppSettings, BacktestSettings, DataSettings, LoggingConfig};

use config::{Config, Environment, File};
use std::path::Path;
use quant_core::error::{QuantError, QuantResult};

/// Load configuration from an optional file and `QUANT__SECTION__KEY`
/// environment variables, then validate it.
///
/// A path that is given must exist; without one only defaults and the
/// environment apply.
pub fn load_config(path: Option<&Path>) -> QuantResult<AppConfig> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }

    let config: AppConfig = builder
        .add_source(
            Environment::with_prefix("QUANT")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| QuantError::Config(e.to_string()))?;

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use quant_core::types::Timeframe;
    use quant_data::PairRanking;

    #[test]
    fn test_load_file_with_partial_sections() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[data]
timeframe = "5m"
start_date = "2025-01-01"
end_date = "2025-01-15"
ranking = "volume"

[data.fetch]
limit = 500

[backtest]
initial_capital = 2500.0

[strategy]
type = "ma_crossover"
fast_period = 5
slow_period = 20
"#
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.data.timeframe, Timeframe::Minute5);
        assert_eq!(config.data.ranking, PairRanking::Volume);
        assert_eq!(config.data.fetch.limit, 500);
        assert_eq!(config.data.fetch.retry.max_attempts, 3);
        assert_eq!(config.backtest.initial_capital, 2500.0);
        assert_eq!(config.strategy.min_bars(), 20);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = load_config(Some(Path::new("/nonexistent/quant.toml")));
        assert!(matches!(result, Err(QuantError::Config(_))));
    }

    #[test]
    fn test_invalid_file_fails_validation() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[strategy]\ntype = \"ma_crossover\"\nfast_period = 40\nslow_period = 20").unwrap();

        let result = load_config(Some(file.path()));
        assert!(matches!(result, Err(QuantError::Config(_))));
    }
}

//! Validate configuration command.

use anyhow::Result;

use crate::cli::Cli;

pub async fn run(cli: &Cli) -> Result<()> {
    match cli.config_path() {
        Some(path) => println!("Validating configuration: {:?}", path),
        None => println!("Validating built-in defaults and environment"),
    }

    match cli.load_config() {
        Ok(config) => {
            println!("Configuration is valid!");
            println!();
            println!("App: {}", config.app.name);
            println!("Environment: {}", config.app.environment);
            println!("Log level: {}", config.logging.level);
            println!("Cache dir: {}", config.data.cache_dir.display());
            println!(
                "Window: {} → {} ({})",
                config.data.start_date, config.data.end_date, config.data.timeframe
            );
            println!(
                "Universe: {} pairs quoted in {} ({})",
                config.data.max_pairs, config.data.quote_asset, config.data.ranking
            );
            println!(
                "Costs: commission {}, slippage {}",
                config.backtest.commission, config.backtest.slippage
            );
            println!("Strategy: {:?}", config.strategy);
        }
        Err(e) => {
            println!("Configuration error: {:#}", e);
            return Err(e);
        }
    }

    Ok(())
}

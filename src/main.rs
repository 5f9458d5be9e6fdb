//! Quant research pipeline CLI application.

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use quant_monitor::setup_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Commands that report on the configuration itself must run without it
    match &cli.command {
        Commands::ValidateConfig => {
            let _guard = init_logging(&cli, None);
            return cli::commands::validate::run(&cli).await;
        }
        Commands::Strategies => {
            let _guard = init_logging(&cli, None);
            return cli::commands::strategies::run().await;
        }
        _ => {}
    }

    let config = cli.load_config()?;
    let _guard = init_logging(&cli, Some(&config));

    match cli.command {
        Commands::Fetch(args) => cli::commands::fetch::run(args, config).await,
        Commands::Pairs(args) => cli::commands::pairs::run(args, config).await,
        Commands::Backtest(args) => cli::commands::backtest::run(args, config).await,
        Commands::Strategies | Commands::ValidateConfig => Ok(()),
    }
}

fn init_logging(
    cli: &Cli,
    config: Option<&quant_config::AppConfig>,
) -> Option<quant_monitor::WorkerGuard> {
    let logging = config.map(|c| c.logging.clone()).unwrap_or_default();
    let level = cli
        .log_level
        .map(|l| l.as_str().to_string())
        .unwrap_or(logging.level);
    let format = if cli.json_logs { "json" } else { logging.format.as_str() };

    setup_logging(&level, format, logging.file.as_deref().map(std::path::Path::new))
}

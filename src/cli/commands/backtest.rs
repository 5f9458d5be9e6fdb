//! Backtest command implementation.

use anyhow::{Context, Result};
use quant_backtest::{BatchConfig, BatchRunner, SimulationConfig, Simulator};
use quant_config::AppConfig;
use quant_strategies::{StrategyRegistry, StrategySpec};
use tracing::info;

use super::{market_fetcher, market_source, resolve_pairs};
use crate::cli::{BacktestArgs, OutputFormat};

fn apply_overrides(args: &BacktestArgs, config: &mut AppConfig) -> Result<()> {
    args.window.apply(config);

    if args.strategy.is_some() || args.params.is_some() {
        let name = args
            .strategy
            .clone()
            .unwrap_or_else(|| config.strategy.name().to_string());
        let params = match &args.params {
            Some(raw) => serde_json::from_str(raw).context("--params must be a JSON object")?,
            None => serde_json::Value::Null,
        };
        config.strategy = StrategyRegistry::new()
            .spec(&name, params)
            .with_context(|| format!("Failed to configure strategy {}", name))?;
    }

    match &mut config.strategy {
        StrategySpec::MaCrossover(ma) => {
            if let Some(fast) = args.fast {
                ma.fast_period = fast;
            }
            if let Some(slow) = args.slow {
                ma.slow_period = slow;
            }
        }
    }

    if let Some(capital) = args.capital {
        config.backtest.initial_capital = capital;
    }
    if let Some(commission) = args.commission {
        config.backtest.commission = commission;
    }
    if let Some(slippage) = args.slippage {
        config.backtest.slippage = slippage;
    }

    config.validate()?;
    Ok(())
}

pub async fn run(args: BacktestArgs, mut config: AppConfig) -> Result<()> {
    apply_overrides(&args, &mut config)?;

    let save_dir = args
        .save
        .clone()
        .map(|dir| dir.unwrap_or_else(|| config.backtest.output_dir.clone()));

    let source = market_source(&config)?;
    let fetcher = market_fetcher(&config, source.clone())?;
    let pairs = resolve_pairs(&config, source.as_ref(), &args.window.pairs).await?;

    info!(
        strategy = config.strategy.name(),
        pairs = pairs.len(),
        "Starting backtest"
    );

    let simulator = Simulator::new(SimulationConfig {
        initial_capital: config.backtest.initial_capital,
        periods_per_year: config.backtest.periods_per_year,
    })?;
    let runner = BatchRunner::new(
        fetcher,
        simulator,
        BatchConfig {
            timeframe: config.data.timeframe,
            start_ms: config.data.start_ms(),
            end_ms: config.data.end_ms(),
            strategy: config.strategy.clone(),
            costs: config.backtest.costs(),
            concurrency: config.backtest.concurrency,
            equity_dir: save_dir.as_ref().map(|dir| dir.join("equity")),
        },
    );

    let report = runner.run(&pairs).await.context("Backtest failed")?;

    match args.output {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Text => println!("{}", report.summary()),
    }

    if let Some(dir) = &save_dir {
        let written = report
            .save(dir)
            .with_context(|| format!("Failed to save results to {}", dir.display()))?;
        info!(files = written.len(), "Results saved to {:?}", dir);
    }

    Ok(())
}

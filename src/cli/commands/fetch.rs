//! Fetch command implementation.

use anyhow::Result;
use quant_config::AppConfig;
use tracing::{info, warn};

use super::{market_fetcher, market_source, resolve_pairs};
use crate::cli::FetchArgs;

pub async fn run(args: FetchArgs, mut config: AppConfig) -> Result<()> {
    args.window.apply(&mut config);
    config.validate()?;

    let source = market_source(&config)?;
    let fetcher = market_fetcher(&config, source.clone())?;
    let pairs = resolve_pairs(&config, source.as_ref(), &args.window.pairs).await?;

    let timeframe = config.data.timeframe;
    let (start_ms, end_ms) = (config.data.start_ms(), config.data.end_ms());
    info!(
        pairs = pairs.len(),
        %timeframe,
        start = %config.data.start_date,
        end = %config.data.end_date,
        "Fetching market data"
    );

    let mut loaded = 0usize;
    let mut failed = Vec::new();
    for pair in &pairs {
        let result = if args.refresh {
            fetcher.refresh(pair, timeframe, start_ms, end_ms).await
        } else {
            fetcher.load(pair, timeframe, start_ms, end_ms).await
        };

        match result {
            Ok(series) => {
                loaded += 1;
                println!("  {:<12} {:>8} bars", pair, series.len());
            }
            Err(e) => {
                warn!(pair = %pair, cause = e.kind(), error = %e, "Failed to load pair");
                failed.push((pair.clone(), e.kind()));
            }
        }
    }

    println!();
    println!("Loaded data for {} pairs.", loaded);
    if !failed.is_empty() {
        println!("Failed:");
        for (pair, cause) in &failed {
            println!("  {:<12} {}", pair, cause);
        }
    }

    Ok(())
}

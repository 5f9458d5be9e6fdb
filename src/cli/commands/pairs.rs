//! Pair universe command.

use anyhow::Result;
use quant_config::AppConfig;

use super::{market_source, resolve_pairs};
use crate::cli::PairsArgs;

pub async fn run(args: PairsArgs, mut config: AppConfig) -> Result<()> {
    if let Some(quote) = args.quote {
        config.data.quote_asset = quote.to_uppercase();
    }
    if let Some(n) = args.max_pairs {
        config.data.max_pairs = n;
    }
    if let Some(ranking) = args.ranking {
        config.data.ranking = ranking;
    }
    config.validate()?;

    let source = market_source(&config)?;
    let pairs = resolve_pairs(&config, source.as_ref(), &[]).await?;

    println!(
        "{} pairs quoted in {} ({} ranking)",
        pairs.len(),
        config.data.quote_asset,
        config.data.ranking
    );
    for pair in pairs {
        println!("  {}", pair);
    }

    Ok(())
}

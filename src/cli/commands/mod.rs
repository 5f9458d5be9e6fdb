//! CLI command implementations.

pub mod backtest;
pub mod fetch;
pub mod pairs;
pub mod strategies;
pub mod validate;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use quant_config::AppConfig;
use quant_core::traits::MarketDataSource;
use quant_data::{select_pairs, BinanceConfig, BinanceSource, MarketDataFetcher, ParquetCache};

/// Exchange client from the `data` section.
pub fn market_source(config: &AppConfig) -> Result<Arc<dyn MarketDataSource>> {
    let source = BinanceSource::with_config(BinanceConfig {
        base_url: config.data.exchange_url.clone(),
        timeout: Duration::from_secs(config.data.fetch.request_timeout_secs),
    })
    .context("Failed to create exchange client")?;
    Ok(Arc::new(source))
}

/// Fetcher backed by the configured cache directory.
pub fn market_fetcher(
    config: &AppConfig,
    source: Arc<dyn MarketDataSource>,
) -> Result<Arc<MarketDataFetcher>> {
    let cache = ParquetCache::new(&config.data.cache_dir).with_context(|| {
        format!(
            "Failed to open cache directory {}",
            config.data.cache_dir.display()
        )
    })?;
    Ok(Arc::new(MarketDataFetcher::new(
        source,
        Arc::new(cache),
        config.data.fetch.clone(),
    )))
}

/// Explicit pairs, or the configured universe.
pub async fn resolve_pairs(
    config: &AppConfig,
    source: &dyn MarketDataSource,
    explicit: &[String],
) -> Result<Vec<String>> {
    if !explicit.is_empty() {
        return Ok(explicit.iter().map(|p| p.to_uppercase()).collect());
    }

    let pairs = select_pairs(
        source,
        &config.data.quote_asset,
        config.data.max_pairs,
        config.data.ranking,
    )
    .await
    .context("Failed to select pairs")?;

    if pairs.is_empty() {
        anyhow::bail!("No pairs quoted in {} found", config.data.quote_asset);
    }
    Ok(pairs)
}

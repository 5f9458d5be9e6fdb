//! Trading pair universe selection.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use quant_core::error::DataError;
use quant_core::traits::MarketDataSource;
use tracing::info;

/// How the first `n` pairs of a quote asset are chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairRanking {
    /// Alphabetical order of the unified symbol
    #[default]
    Lexical,
    /// Descending 24h quote volume; requires a source that reports volume
    Volume,
}

impl std::fmt::Display for PairRanking {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PairRanking::Lexical => write!(f, "lexical"),
            PairRanking::Volume => write!(f, "volume"),
        }
    }
}

impl std::str::FromStr for PairRanking {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lexical" => Ok(PairRanking::Lexical),
            "volume" => Ok(PairRanking::Volume),
            _ => Err(format!("Unknown pair ranking: {}", s)),
        }
    }
}

/// Select up to `n` symbols quoted in `quote` (e.g. `BTC` picks `ETH/BTC`).
pub async fn select_pairs(
    source: &dyn MarketDataSource,
    quote: &str,
    n: usize,
    ranking: PairRanking,
) -> Result<Vec<String>, DataError> {
    let suffix = format!("/{}", quote.to_uppercase());
    let mut pairs: Vec<String> = source
        .load_markets()
        .await?
        .into_iter()
        .filter(|s| s.ends_with(&suffix))
        .collect();
    pairs.sort();
    pairs.dedup();

    if ranking == PairRanking::Volume {
        let volumes = source.quote_volumes().await?;
        // stable sort keeps lexical order among equal volumes
        pairs.sort_by(|a, b| {
            let va = volumes.get(a).copied().unwrap_or(0.0);
            let vb = volumes.get(b).copied().unwrap_or(0.0);
            vb.partial_cmp(&va).unwrap_or(Ordering::Equal)
        });
    }

    pairs.truncate(n);
    info!(
        quote,
        %ranking,
        selected = pairs.len(),
        "Selected pairs from {}",
        source.name()
    );
    Ok(pairs)
}

//! Market data source trait definitions.

use crate::error::DataError;
use crate::types::{Bar, Timeframe};
use async_trait::async_trait;
use std::collections::HashMap;

/// Trait for paginated historical OHLCV sources.
///
/// Symbols use the unified `BASE/QUOTE` form (e.g. `ETH/BTC`); each source
/// maps them to its own wire format.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetch up to `limit` bars starting at `since_ms` (inclusive).
    ///
    /// # Returns
    /// Bars ordered from oldest to newest. An empty vector means the source
    /// has nothing at or after `since_ms`.
    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since_ms: i64,
        limit: usize,
    ) -> Result<Vec<Bar>, DataError>;

    /// List all tradeable symbols.
    async fn load_markets(&self) -> Result<Vec<String>, DataError>;

    /// Traded quote volume per symbol over the last 24 hours.
    ///
    /// Needed only for volume-ranked symbol selection; sources that cannot
    /// provide it keep the default.
    async fn quote_volumes(&self) -> Result<HashMap<String, f64>, DataError> {
        Err(DataError::Unsupported(format!(
            "{} does not report traded volume",
            self.name()
        )))
    }

    /// Get the data source name.
    fn name(&self) -> &str;
}

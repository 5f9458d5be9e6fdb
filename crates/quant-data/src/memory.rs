//! In-memory market data source.
//!
//! Serves fixed bar sets through the same paginated contract as a remote
//! exchange. Used for offline runs and for exercising the fetcher: it counts
//! requests, records every cursor it was asked for, and can inject failures
//! or latency on chosen requests.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use quant_core::error::DataError;
use quant_core::traits::MarketDataSource;
use quant_core::types::{Bar, Timeframe};

/// Market data source backed by in-memory bars.
#[derive(Default)]
pub struct InMemorySource {
    bars: BTreeMap<String, Vec<Bar>>,
    volumes: Option<HashMap<String, f64>>,
    failing_requests: HashSet<usize>,
    latency: Option<Duration>,
    requests: AtomicUsize,
    cursors: Mutex<Vec<i64>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `bars` (oldest first) for `symbol`.
    pub fn with_series(mut self, symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        self.bars.insert(symbol.into(), bars);
        self
    }

    /// Report these 24h quote volumes.
    pub fn with_volumes(mut self, volumes: HashMap<String, f64>) -> Self {
        self.volumes = Some(volumes);
        self
    }

    /// Fail the given `fetch_ohlcv` calls (0-based call index) with a transient error.
    pub fn failing_requests(mut self, requests: impl IntoIterator<Item = usize>) -> Self {
        self.failing_requests.extend(requests);
        self
    }

    /// Delay every `fetch_ohlcv` response.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of `fetch_ohlcv` calls served so far, failed ones included.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// `since` cursor of every `fetch_ohlcv` call, in call order.
    pub fn cursors(&self) -> Vec<i64> {
        self.cursors.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl MarketDataSource for InMemorySource {
    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        since_ms: i64,
        limit: usize,
    ) -> Result<Vec<Bar>, DataError> {
        let call = self.requests.fetch_add(1, Ordering::SeqCst);
        self.cursors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(since_ms);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing_requests.contains(&call) {
            return Err(DataError::Remote(format!("injected failure on request {}", call)));
        }

        let bars = self
            .bars
            .get(symbol)
            .ok_or_else(|| DataError::SymbolNotFound(symbol.to_string()))?;

        Ok(bars
            .iter()
            .filter(|b| b.timestamp >= since_ms)
            .take(limit)
            .copied()
            .collect())
    }

    async fn load_markets(&self) -> Result<Vec<String>, DataError> {
        Ok(self.bars.keys().cloned().collect())
    }

    async fn quote_volumes(&self) -> Result<HashMap<String, f64>, DataError> {
        self.volumes
            .clone()
            .ok_or_else(|| DataError::Unsupported("in-memory source has no volumes".into()))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minute_bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| Bar::new(i as i64 * 60_000, 1.0, 1.0, 1.0, 1.0, 1.0))
            .collect()
    }

    #[tokio::test]
    async fn test_pages_from_cursor() {
        let source = InMemorySource::new().with_series("ETH/BTC", minute_bars(10));

        let page = source
            .fetch_ohlcv("ETH/BTC", Timeframe::Minute1, 120_000, 3)
            .await
            .unwrap();
        assert_eq!(
            page.iter().map(|b| b.timestamp).collect::<Vec<_>>(),
            vec![120_000, 180_000, 240_000]
        );
        assert_eq!(source.request_count(), 1);
        assert_eq!(source.cursors(), vec![120_000]);
    }

    #[tokio::test]
    async fn test_unknown_symbol_and_injected_failure() {
        let source = InMemorySource::new()
            .with_series("ETH/BTC", minute_bars(3))
            .failing_requests([0]);

        let first = source.fetch_ohlcv("ETH/BTC", Timeframe::Minute1, 0, 10).await;
        assert!(matches!(first, Err(DataError::Remote(_))));

        let unknown = source.fetch_ohlcv("XRP/BTC", Timeframe::Minute1, 0, 10).await;
        assert!(matches!(unknown, Err(DataError::SymbolNotFound(_))));
    }

    #[tokio::test]
    async fn test_volumes_are_optional() {
        let source = InMemorySource::new();
        assert!(matches!(
            source.quote_volumes().await,
            Err(DataError::Unsupported(_))
        ));
    }
}

//! Paginated market data acquisition with a read-through cache.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use quant_core::error::DataError;
use quant_core::traits::MarketDataSource;
use quant_core::types::{Bar, BarSeries, Timeframe};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::ParquetCache;
use crate::retry::RetryPolicy;

/// The cursor moves one minute past the last bar returned.
pub const CURSOR_STEP_MS: i64 = 60_000;

/// Fetch pacing, timeouts and retry settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Maximum bars per request
    pub limit: usize,
    /// Minimum delay between consecutive requests (rate-limit compliance)
    pub request_interval_ms: u64,
    /// Timeout for a single remote request
    pub request_timeout_secs: u64,
    /// Timeout for one cache read or write
    pub io_timeout_secs: u64,
    /// Retry policy for failed requests
    pub retry: RetryPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            limit: 1000,
            request_interval_ms: 100,
            request_timeout_secs: 30,
            io_timeout_secs: 60,
            retry: RetryPolicy::default(),
        }
    }
}

impl FetchConfig {
    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.limit == 0 {
            return Err("data.fetch.limit must be at least 1".into());
        }
        if self.request_timeout_secs == 0 || self.io_timeout_secs == 0 {
            return Err("data.fetch timeouts must be at least 1 second".into());
        }
        self.retry.validate()
    }
}

/// Bars collected for one window, and whether the window was walked to its end.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedSeries {
    pub series: BarSeries,
    /// The cursor reached `end_ms` or the source ran out of bars. False when
    /// a request failed after its retries or the source stopped advancing.
    pub complete: bool,
}

/// Pulls OHLCV windows from a remote source and keeps them in the cache.
pub struct MarketDataFetcher {
    source: Arc<dyn MarketDataSource>,
    cache: Arc<ParquetCache>,
    config: FetchConfig,
}

impl MarketDataFetcher {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        cache: Arc<ParquetCache>,
        config: FetchConfig,
    ) -> Self {
        Self {
            source,
            cache,
            config,
        }
    }

    pub fn source(&self) -> &Arc<dyn MarketDataSource> {
        &self.source
    }

    pub fn cache(&self) -> &Arc<ParquetCache> {
        &self.cache
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Return the cached series for the key, or fetch `[start_ms, end_ms)` and
    /// commit it to the cache before returning it.
    ///
    /// A cache hit issues no remote request. The cached entry is taken as
    /// the complete series for the key regardless of the requested window.
    /// An incomplete fetch is returned to the caller but never cached.
    pub async fn load(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<BarSeries, DataError> {
        let key = symbol.to_string();
        if let Some(series) = self
            .with_cache(move |cache| cache.get(&key, timeframe))
            .await?
        {
            info!(symbol, %timeframe, bars = series.len(), "Loaded series from cache");
            return Ok(series);
        }

        self.refresh(symbol, timeframe, start_ms, end_ms).await
    }

    /// Fetch `[start_ms, end_ms)` and replace the cached entry when the window
    /// completed. The previous entry survives a failed or partial fetch.
    pub async fn refresh(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<BarSeries, DataError> {
        let FetchedSeries { series, complete } =
            self.fetch(symbol, timeframe, start_ms, end_ms).await?;

        if complete {
            let to_store = series.clone();
            self.with_cache(move |cache| cache.put(&to_store)).await?;
        } else {
            warn!(
                symbol,
                %timeframe,
                bars = series.len(),
                "Fetch incomplete, series not cached"
            );
        }

        Ok(series)
    }

    /// Fetch `[start_ms, end_ms)` from the remote source, bypassing the cache.
    ///
    /// Stops when the cursor reaches `end_ms`, when the source returns an
    /// empty page, or when a request still fails after its retries; in the
    /// last case the bars collected so far are returned flagged incomplete.
    /// Fails with `DataUnavailable` when nothing was collected.
    pub async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<FetchedSeries, DataError> {
        let mut bars: Vec<Bar> = Vec::new();
        let mut cursor = start_ms;
        let mut last_request: Option<Instant> = None;
        let mut pages = 0usize;
        let mut complete = true;

        while cursor < end_ms {
            self.pace(&mut last_request).await;

            let page = match self.request_page(symbol, timeframe, cursor).await {
                Ok(page) => page,
                Err(e) if bars.is_empty() && !e.is_transient() => return Err(e),
                Err(e) => {
                    warn!(
                        symbol,
                        cursor,
                        collected = bars.len(),
                        error = %e,
                        "Fetch aborted, keeping bars collected so far"
                    );
                    complete = false;
                    break;
                }
            };
            pages += 1;

            let Some(last_returned) = page.last().map(|b| b.timestamp) else {
                debug!(symbol, cursor, "Source returned an empty page");
                break;
            };

            let before = bars.len();
            for bar in page {
                if bar.timestamp < cursor || bar.timestamp >= end_ms {
                    continue;
                }
                if bars.last().is_some_and(|prev| bar.timestamp <= prev.timestamp) {
                    continue;
                }
                if let Err(e) = bar.validate() {
                    warn!(symbol, error = %e, "Dropping invalid bar");
                    continue;
                }
                bars.push(bar);
            }

            debug!(
                symbol,
                cursor,
                page = pages,
                added = bars.len() - before,
                total = bars.len(),
                "Fetched page"
            );

            let next = last_returned + CURSOR_STEP_MS;
            if next <= cursor {
                warn!(symbol, cursor, last_returned, "Source did not move past the cursor");
                complete = false;
                break;
            }
            cursor = next;
        }

        if bars.is_empty() {
            return Err(DataError::DataUnavailable {
                symbol: symbol.to_string(),
                timeframe,
            });
        }

        let series = BarSeries::from_bars(symbol, timeframe, bars)?;
        info!(
            symbol,
            %timeframe,
            bars = series.len(),
            pages,
            complete,
            "Fetched series from {}",
            self.source.name()
        );
        Ok(FetchedSeries { series, complete })
    }

    async fn request_page(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since_ms: i64,
    ) -> Result<Vec<Bar>, DataError> {
        let timeout = self.config.request_timeout();
        let limit = self.config.limit;
        let label = format!("{} {} since {}", symbol, timeframe, since_ms);

        self.config
            .retry
            .run(&label, || async move {
                tokio::time::timeout(
                    timeout,
                    self.source.fetch_ohlcv(symbol, timeframe, since_ms, limit),
                )
                .await
                .unwrap_or(Err(DataError::Timeout(timeout)))
            })
            .await
    }

    async fn pace(&self, last_request: &mut Option<Instant>) {
        let interval = self.config.request_interval();
        if let Some(previous) = *last_request {
            let elapsed = previous.elapsed();
            if elapsed < interval {
                tokio::time::sleep(interval - elapsed).await;
            }
        }
        *last_request = Some(Instant::now());
    }

    /// Run a cache operation on the blocking pool under the I/O timeout.
    async fn with_cache<T, F>(&self, op: F) -> Result<T, DataError>
    where
        F: FnOnce(&ParquetCache) -> Result<T, DataError> + Send + 'static,
        T: Send + 'static,
    {
        let cache = Arc::clone(&self.cache);
        let timeout = self.config.io_timeout();
        let task = tokio::task::spawn_blocking(move || op(&cache));

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(DataError::Cache(format!("cache task failed: {}", e))),
            Err(_) => Err(DataError::Cache(format!(
                "cache operation timed out after {:?}",
                timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemorySource;

    const START: i64 = 1_738_368_000_000; // 2025-02-01T00:00:00Z

    fn minute_bars(start: i64, n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let price = 0.05 + i as f64 * 1e-5;
                Bar::new(start + i as i64 * 60_000, price, price, price, price, 10.0)
            })
            .collect()
    }

    fn quiet_config() -> FetchConfig {
        FetchConfig {
            limit: 1000,
            request_interval_ms: 0,
            retry: RetryPolicy {
                max_attempts: 2,
                initial_backoff_ms: 0,
                max_backoff_ms: 0,
                multiplier: 1.0,
            },
            ..Default::default()
        }
    }

    fn fetcher(
        source: Arc<InMemorySource>,
        dir: &tempfile::TempDir,
        config: FetchConfig,
    ) -> MarketDataFetcher {
        let cache = Arc::new(ParquetCache::new(dir.path()).unwrap());
        MarketDataFetcher::new(source, cache, config)
    }

    #[tokio::test]
    async fn test_paginates_until_end() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(InMemorySource::new().with_series("ETH/BTC", minute_bars(START, 2500)));
        let fetcher = fetcher(source.clone(), &dir, quiet_config());

        let end = START + 2500 * 60_000;
        let series = fetcher
            .fetch("ETH/BTC", Timeframe::Minute1, START, end)
            .await
            .unwrap()
            .series;

        assert_eq!(series.len(), 2500);
        // each cursor is one minute past the last bar of the previous page
        assert_eq!(
            source.cursors(),
            vec![START, START + 1000 * 60_000, START + 2000 * 60_000]
        );
    }

    #[tokio::test]
    async fn test_stops_on_empty_page() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(InMemorySource::new().with_series("ETH/BTC", minute_bars(START, 1500)));
        let fetcher = fetcher(source.clone(), &dir, quiet_config());

        let end = START + 10_000 * 60_000;
        let series = fetcher
            .fetch("ETH/BTC", Timeframe::Minute1, START, end)
            .await
            .unwrap()
            .series;

        assert_eq!(series.len(), 1500);
        assert_eq!(source.request_count(), 3);
        assert!(fetcher
            .fetch("ETH/BTC", Timeframe::Minute1, START, end)
            .await
            .unwrap()
            .complete);
    }

    #[tokio::test]
    async fn test_drops_bars_past_end() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(InMemorySource::new().with_series("ETH/BTC", minute_bars(START, 100)));
        let fetcher = fetcher(source, &dir, quiet_config());

        let series = fetcher
            .fetch("ETH/BTC", Timeframe::Minute1, START, START + 40 * 60_000)
            .await
            .unwrap()
            .series;

        assert_eq!(series.len(), 40);
        assert_eq!(series.last().unwrap().timestamp, START + 39 * 60_000);
    }

    #[tokio::test]
    async fn test_empty_first_page_is_data_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        // all bars lie before the requested window
        let source = Arc::new(
            InMemorySource::new().with_series("ETH/BTC", minute_bars(START - 500 * 60_000, 100)),
        );
        let fetcher = fetcher(source.clone(), &dir, quiet_config());

        let result = fetcher
            .fetch("ETH/BTC", Timeframe::Minute1, START, START + 60 * 60_000)
            .await;

        assert!(matches!(result, Err(DataError::DataUnavailable { .. })));
        assert_eq!(source.request_count(), 1);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(
            InMemorySource::new()
                .with_series("ETH/BTC", minute_bars(START, 2000))
                .failing_requests([1]),
        );
        let fetcher = fetcher(source.clone(), &dir, quiet_config());

        let series = fetcher
            .fetch("ETH/BTC", Timeframe::Minute1, START, START + 2000 * 60_000)
            .await
            .unwrap()
            .series;

        assert_eq!(series.len(), 2000);
        assert_eq!(source.request_count(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_return_partial_series() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(
            InMemorySource::new()
                .with_series("ETH/BTC", minute_bars(START, 3000))
                .failing_requests(1..100),
        );
        let fetcher = fetcher(source.clone(), &dir, quiet_config());

        let fetched = fetcher
            .fetch("ETH/BTC", Timeframe::Minute1, START, START + 3000 * 60_000)
            .await
            .unwrap();

        assert_eq!(fetched.series.len(), 1000);
        assert!(!fetched.complete);
        // one good page, then max_attempts tries of the second page
        assert_eq!(source.request_count(), 3);
    }

    #[tokio::test]
    async fn test_failure_before_any_data_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(
            InMemorySource::new()
                .with_series("ETH/BTC", minute_bars(START, 10))
                .failing_requests(0..10),
        );
        let fetcher = fetcher(source, &dir, quiet_config());

        let result = fetcher
            .fetch("ETH/BTC", Timeframe::Minute1, START, START + 10 * 60_000)
            .await;
        assert!(matches!(result, Err(DataError::DataUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_unknown_symbol_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(InMemorySource::new());
        let fetcher = fetcher(source, &dir, quiet_config());

        let result = fetcher
            .fetch("NOPE/BTC", Timeframe::Minute1, START, START + 60_000)
            .await;
        assert!(matches!(result, Err(DataError::SymbolNotFound(_))));
    }

    #[tokio::test]
    async fn test_load_writes_through_and_reuses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(InMemorySource::new().with_series("ETH/BTC", minute_bars(START, 1200)));
        let fetcher = fetcher(source.clone(), &dir, quiet_config());
        let end = START + 1200 * 60_000;

        let first = fetcher
            .load("ETH/BTC", Timeframe::Minute1, START, end)
            .await
            .unwrap();
        let requests_after_first = source.request_count();
        assert!(requests_after_first > 0);
        assert!(fetcher.cache().contains("ETH/BTC", Timeframe::Minute1));

        let second = fetcher
            .load("ETH/BTC", Timeframe::Minute1, START, end)
            .await
            .unwrap();

        assert_eq!(source.request_count(), requests_after_first);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_partial_load_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let end = START + 3000 * 60_000;

        let flaky = Arc::new(
            InMemorySource::new()
                .with_series("ETH/BTC", minute_bars(START, 3000))
                .failing_requests(1..100),
        );
        let first = fetcher(flaky, &dir, quiet_config())
            .load("ETH/BTC", Timeframe::Minute1, START, end)
            .await
            .unwrap();
        assert_eq!(first.len(), 1000);

        // a healthy source sharing the cache directory fetches the whole window
        let healthy = Arc::new(InMemorySource::new().with_series("ETH/BTC", minute_bars(START, 3000)));
        let fetcher = fetcher(healthy.clone(), &dir, quiet_config());
        assert!(!fetcher.cache().contains("ETH/BTC", Timeframe::Minute1));

        let second = fetcher
            .load("ETH/BTC", Timeframe::Minute1, START, end)
            .await
            .unwrap();
        assert_eq!(second.len(), 3000);
        assert!(healthy.request_count() > 0);
        assert!(fetcher.cache().contains("ETH/BTC", Timeframe::Minute1));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_cached_entry() {
        let dir = tempfile::tempdir().unwrap();
        let end = START + 1500 * 60_000;

        let healthy = Arc::new(InMemorySource::new().with_series("ETH/BTC", minute_bars(START, 1500)));
        fetcher(healthy, &dir, quiet_config())
            .load("ETH/BTC", Timeframe::Minute1, START, end)
            .await
            .unwrap();

        let flaky = Arc::new(
            InMemorySource::new()
                .with_series("ETH/BTC", minute_bars(START, 1500))
                .failing_requests(1..100),
        );
        let fetcher = fetcher(flaky, &dir, quiet_config());
        let partial = fetcher
            .refresh("ETH/BTC", Timeframe::Minute1, START, end)
            .await
            .unwrap();
        assert_eq!(partial.len(), 1000);

        let cached = fetcher.cache().get("ETH/BTC", Timeframe::Minute1).unwrap().unwrap();
        assert_eq!(cached.len(), 1500);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_cache_empty() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(InMemorySource::new().with_series("ETH/BTC", Vec::new()));
        let fetcher = fetcher(source, &dir, quiet_config());

        let result = fetcher
            .load("ETH/BTC", Timeframe::Minute1, START, START + 60_000)
            .await;

        assert!(matches!(result, Err(DataError::DataUnavailable { .. })));
        assert!(!fetcher.cache().contains("ETH/BTC", Timeframe::Minute1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_are_paced() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(InMemorySource::new().with_series("ETH/BTC", minute_bars(START, 30)));
        let config = FetchConfig {
            limit: 10,
            request_interval_ms: 250,
            ..quiet_config()
        };
        let fetcher = fetcher(source.clone(), &dir, config);

        let started = Instant::now();
        fetcher
            .fetch("ETH/BTC", Timeframe::Minute1, START, START + 30 * 60_000)
            .await
            .unwrap();

        assert_eq!(source.request_count(), 3);
        assert!(started.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_request_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(
            InMemorySource::new()
                .with_series("ETH/BTC", minute_bars(START, 10))
                .with_latency(Duration::from_secs(3600)),
        );
        let config = FetchConfig {
            request_timeout_secs: 5,
            ..quiet_config()
        };
        let fetcher = fetcher(source.clone(), &dir, config);

        let result = fetcher
            .fetch("ETH/BTC", Timeframe::Minute1, START, START + 10 * 60_000)
            .await;

        assert!(matches!(result, Err(DataError::DataUnavailable { .. })));
        assert_eq!(source.request_count(), 2);
    }
}

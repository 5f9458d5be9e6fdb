//! Market data acquisition: remote sources, paginated fetching and the
//! Parquet cache.

mod binance;
mod cache;
mod fetcher;
mod memory;
mod retry;
mod universe;

pub use binance::{BinanceConfig, BinanceSource, BINANCE_API_URL};
pub use cache::ParquetCache;
pub use fetcher::{FetchConfig, FetchedSeries, MarketDataFetcher, CURSOR_STEP_MS};
pub use memory::InMemorySource;
pub use retry::RetryPolicy;
pub use universe::{select_pairs, PairRanking};

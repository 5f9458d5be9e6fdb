//! Core data types for the research pipeline.

mod costs;
mod ohlcv;
mod signal;
mod timeframe;

pub use costs::CostModel;
pub use ohlcv::{Bar, BarSeries};
pub use signal::SignalPair;
pub use timeframe::Timeframe;

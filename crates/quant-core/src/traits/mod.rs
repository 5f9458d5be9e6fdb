//! Core traits for the research pipeline.

mod data_source;
mod indicator;
mod strategy;

pub use data_source::MarketDataSource;
pub use indicator::Indicator;
pub use strategy::{Strategy, StrategyConfig};

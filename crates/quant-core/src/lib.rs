//! Core types and traits for the research pipeline.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Bar, BarSeries, Timeframe)
//! - Entry/exit signal sequences and the transaction cost model
//! - Core traits for strategies, indicators, and market data sources
//! - The error taxonomy shared by every stage

pub mod types;
pub mod traits;
pub mod error;

pub use error::{QuantError, QuantResult};
pub use types::*;
pub use traits::*;

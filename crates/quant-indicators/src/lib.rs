//! Technical indicators.
//!
//! Batch moving averages over close prices:
//! - Simple moving average (SMA)
//! - Exponential moving average (EMA), seeded with the SMA of the first window

pub mod moving_average;

pub use moving_average::{Ema, Sma};

//! Trading strategy implementations.
//!
//! Strategies turn a price series into aligned entry/exit sequences:
//! - Moving Average Crossover (simple or exponential averages)
//!
//! Strategies are selected by configuration through [`StrategySpec`] and
//! listed by the [`StrategyRegistry`].

mod ma_crossover;
mod registry;

pub use ma_crossover::{MACrossoverConfig, MACrossoverStrategy, MovingAverageType};
pub use registry::{StrategyInfo, StrategyRegistry, StrategySpec};

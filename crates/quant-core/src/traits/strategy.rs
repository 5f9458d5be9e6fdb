//! Strategy trait definitions.

use crate::error::StrategyError;
use crate::types::{BarSeries, CostModel, SignalPair};

/// Configuration trait for strategies.
pub trait StrategyConfig: Send + Sync + Clone + 'static {
    /// Validate the configuration.
    fn validate(&self) -> Result<(), StrategyError>;
}

/// Core strategy trait.
///
/// A strategy turns an immutable price series into entry/exit sequences
/// aligned with it. It also carries the transaction costs the simulator
/// applies when executing those signals; the signal math never uses them.
pub trait Strategy: Send + Sync {
    /// Get the unique name of this strategy.
    fn name(&self) -> &str;

    /// Generate entry and exit signals for the whole series.
    ///
    /// The returned pair has exactly `series.len()` elements in each sequence
    /// and never sets an entry and an exit at the same index.
    fn generate_signals(&self, series: &BarSeries) -> Result<SignalPair, StrategyError>;

    /// Minimum number of bars the strategy needs before it can signal.
    fn min_bars(&self) -> usize;

    /// Commission and slippage to apply when simulating this strategy.
    fn costs(&self) -> CostModel;

    /// Get a description of the strategy.
    fn description(&self) -> &str {
        ""
    }
}

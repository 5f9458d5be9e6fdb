//! Moving Average Crossover Strategy.
//!
//! Enters when the fast MA crosses above the slow MA,
//! and exits when the fast MA crosses below the slow MA.

use serde::{Deserialize, Serialize};
use quant_core::traits::Indicator;
use quant_core::{
    error::{IndicatorError, StrategyError},
    traits::{Strategy, StrategyConfig},
    types::{BarSeries, CostModel, SignalPair},
};
use quant_indicators::{Ema, Sma};
use tracing::debug;

/// Which average the crossover compares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovingAverageType {
    #[default]
    Simple,
    Exponential,
}

/// Configuration for the MA Crossover strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MACrossoverConfig {
    /// Fast moving average window
    pub fast_period: usize,
    /// Slow moving average window
    pub slow_period: usize,
    /// Average used for both windows
    pub ma_type: MovingAverageType,
}

impl Default for MACrossoverConfig {
    fn default() -> Self {
        Self {
            fast_period: 10,
            slow_period: 30,
            ma_type: MovingAverageType::Simple,
        }
    }
}

impl StrategyConfig for MACrossoverConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        if self.fast_period == 0 {
            return Err(StrategyError::InvalidConfig(
                "Fast period must be greater than 0".into(),
            ));
        }
        if self.fast_period >= self.slow_period {
            return Err(StrategyError::InvalidConfig(format!(
                "Fast period ({}) must be less than slow period ({})",
                self.fast_period, self.slow_period
            )));
        }
        Ok(())
    }
}

/// Moving Average Crossover Strategy.
#[derive(Debug, Clone)]
pub struct MACrossoverStrategy {
    config: MACrossoverConfig,
    costs: CostModel,
}

impl MACrossoverStrategy {
    /// Create a new MA Crossover strategy, rejecting invalid windows or costs.
    pub fn new(config: MACrossoverConfig, costs: CostModel) -> Result<Self, StrategyError> {
        config.validate()?;
        costs.validate()?;
        Ok(Self { config, costs })
    }

    pub fn config(&self) -> &MACrossoverConfig {
        &self.config
    }

    fn moving_average(
        &self,
        closes: &[f64],
        period: usize,
    ) -> Result<Vec<Option<f64>>, StrategyError> {
        let invalid = |e: IndicatorError| StrategyError::InvalidConfig(e.to_string());
        Ok(match self.config.ma_type {
            MovingAverageType::Simple => {
                Sma::try_new(period).map_err(invalid)?.calculate_aligned(closes)
            }
            MovingAverageType::Exponential => {
                Ema::try_new(period).map_err(invalid)?.calculate_aligned(closes)
            }
        })
    }
}

impl Strategy for MACrossoverStrategy {
    fn name(&self) -> &str {
        "ma_crossover"
    }

    fn description(&self) -> &str {
        "Enters when the fast moving average crosses above the slow one, exits on the reverse cross"
    }

    fn generate_signals(&self, series: &BarSeries) -> Result<SignalPair, StrategyError> {
        let closes = series.closes();
        let fast = self.moving_average(&closes, self.config.fast_period)?;
        let slow = self.moving_average(&closes, self.config.slow_period)?;

        let mut signals = SignalPair::empty(closes.len());
        // relation at the previous bar; None until both averages exist
        let mut prev: Option<(f64, f64)> = None;

        for (i, (f, s)) in fast.iter().zip(slow.iter()).enumerate() {
            let (Some(f), Some(s)) = (*f, *s) else {
                continue;
            };

            let was_above = prev.is_some_and(|(pf, ps)| pf > ps);
            let was_below = prev.is_some_and(|(pf, ps)| pf < ps);

            signals.entries[i] = f > s && !was_above;
            signals.exits[i] = f < s && !was_below;

            prev = Some((f, s));
        }

        let cleared = signals.resolve_conflicts();
        if cleared > 0 {
            debug!(symbol = %series.symbol, cleared, "Dropped entries that coincide with exits");
        }

        debug!(
            symbol = %series.symbol,
            bars = series.len(),
            entries = signals.entry_count(),
            exits = signals.exit_count(),
            "Generated crossover signals"
        );

        Ok(signals)
    }

    fn min_bars(&self) -> usize {
        self.config.slow_period
    }

    fn costs(&self) -> CostModel {
        self.costs
    }
}

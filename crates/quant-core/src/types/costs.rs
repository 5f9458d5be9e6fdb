//! Transaction cost model.

use serde::{Deserialize, Serialize};

use crate::error::StrategyError;

/// Per-leg commission rate and slippage rate, both as fractions.
///
/// `commission = 0.001` charges 0.1% of notional on each fill;
/// `slippage = 0.0005` moves buys up and sells down by 0.05% of the close.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    pub commission: f64,
    pub slippage: f64,
}

impl CostModel {
    pub fn new(commission: f64, slippage: f64) -> Result<Self, StrategyError> {
        let costs = Self {
            commission,
            slippage,
        };
        costs.validate()?;
        Ok(costs)
    }

    /// Zero commission and zero slippage.
    pub fn free() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<(), StrategyError> {
        if !self.commission.is_finite() || self.commission < 0.0 {
            return Err(StrategyError::InvalidConfig(format!(
                "Commission must be a non-negative rate, got {}",
                self.commission
            )));
        }
        if !self.slippage.is_finite() || !(0.0..1.0).contains(&self.slippage) {
            return Err(StrategyError::InvalidConfig(format!(
                "Slippage must be a rate in [0, 1), got {}",
                self.slippage
            )));
        }
        Ok(())
    }

    /// Execution price for a buy at `close`.
    #[inline]
    pub fn buy_price(&self, close: f64) -> f64 {
        close * (1.0 + self.slippage)
    }

    /// Execution price for a sell at `close`.
    #[inline]
    pub fn sell_price(&self, close: f64) -> f64 {
        close * (1.0 - self.slippage)
    }

    /// Commission charged on a fill of the given notional.
    #[inline]
    pub fn fee(&self, notional: f64) -> f64 {
        notional * self.commission
    }
}

//! Performance statistics derived from a simulation.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::engine::SimulationResult;

/// Scalar performance summary for one simulation.
///
/// Every field is finite, including for runs without trades.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    /// `final_equity / initial_capital - 1`
    pub total_return: f64,
    /// Annualized mean over sample deviation of bar returns
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough decline as a positive fraction
    pub max_drawdown: f64,
    /// Share of closed trades with positive pnl
    pub win_rate: f64,
    /// Mean pnl per closed trade, in quote currency
    pub expectancy: f64,
    /// Share of bars with an open position
    pub exposure_time: f64,
    pub total_trades: usize,
    pub final_equity: f64,
}

/// Reduce a simulation to its metrics.
pub fn compute(result: &SimulationResult, initial_capital: f64, periods_per_year: f64) -> MetricsRecord {
    let equity: Vec<f64> = result.equity_curve.iter().map(|p| p.equity).collect();
    let final_equity = equity.last().copied().unwrap_or(initial_capital);

    let total_return = if initial_capital > 0.0 {
        final_equity / initial_capital - 1.0
    } else {
        0.0
    };

    let pnls: Vec<f64> = result.trades.iter().map(|t| t.pnl).collect();
    let total_trades = pnls.len();
    let (win_rate, expectancy) = if total_trades == 0 {
        (0.0, 0.0)
    } else {
        let wins = pnls.iter().filter(|&&p| p > 0.0).count();
        (wins as f64 / total_trades as f64, pnls.iter().mean())
    };

    let exposure_time = if result.long_flags.is_empty() {
        0.0
    } else {
        result.bars_in_market() as f64 / result.long_flags.len() as f64
    };

    MetricsRecord {
        total_return: finite_or_zero(total_return),
        sharpe_ratio: sharpe_ratio(&bar_returns(&equity), periods_per_year),
        max_drawdown: max_drawdown(&equity),
        win_rate,
        expectancy: finite_or_zero(expectancy),
        exposure_time,
        total_trades,
        final_equity,
    }
}

/// Simple returns between consecutive equity points.
pub fn bar_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

/// Sharpe ratio with a zero risk-free rate.
///
/// Zero when fewer than two returns exist or their deviation vanishes.
pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = returns.iter().mean();
    let std_dev = returns.iter().std_dev();
    if !std_dev.is_finite() || std_dev <= f64::EPSILON {
        return 0.0;
    }
    finite_or_zero(mean / std_dev * periods_per_year.sqrt())
}

/// Largest `(peak - equity) / peak` over the running peak.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0_f64;
    for &e in equity {
        peak = peak.max(e);
        if peak > 0.0 {
            worst = worst.max((peak - e) / peak);
        }
    }
    finite_or_zero(worst)
}

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

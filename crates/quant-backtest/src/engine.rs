//! Flat/long portfolio simulation.

use serde::{Deserialize, Serialize};
use quant_core::error::{QuantError, QuantResult, SimulationError};
use quant_core::traits::Strategy;
use quant_core::types::{BarSeries, CostModel, SignalPair, Timeframe};
use tracing::{debug, error};

use crate::metrics::{self, MetricsRecord};

/// Simulation configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Starting cash, in quote currency
    pub initial_capital: f64,
    /// Annualization factor for the Sharpe ratio; derived from the series
    /// timeframe when unset
    pub periods_per_year: Option<f64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            periods_per_year: None,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(format!(
                "Initial capital must be positive, got {}",
                self.initial_capital
            ));
        }
        if let Some(ppy) = self.periods_per_year {
            if !ppy.is_finite() || ppy <= 0.0 {
                return Err(format!("periods_per_year must be positive, got {}", ppy));
            }
        }
        Ok(())
    }

    pub fn periods_per_year_for(&self, timeframe: Timeframe) -> f64 {
        self.periods_per_year
            .unwrap_or_else(|| timeframe.periods_per_year())
    }
}

/// An open long position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub entry_index: usize,
    pub entry_timestamp: i64,
    /// Bar close at entry
    pub entry_close: f64,
    /// Fill price after slippage
    pub entry_price: f64,
    /// Units held (fractional)
    pub size: f64,
    /// `size * entry_price`
    pub cost: f64,
    pub entry_fee: f64,
}

/// A closed round trip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_index: usize,
    pub exit_index: usize,
    pub entry_timestamp: i64,
    pub exit_timestamp: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub size: f64,
    pub entry_fee: f64,
    pub exit_fee: f64,
    /// `entry_fee + exit_fee`
    pub fee_paid: f64,
    /// Value lost to slippage on both legs
    pub slippage_cost: f64,
    /// Net of both fee legs
    pub pnl: f64,
    /// `pnl` relative to the capital committed at entry
    pub return_pct: f64,
}

impl Trade {
    pub fn bars_held(&self) -> usize {
        self.exit_index - self.entry_index
    }
}

/// Equity at one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: i64,
    pub equity: f64,
}

/// Output of one simulation pass. Never modified after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub initial_capital: f64,
    pub costs: CostModel,
    /// One point per bar
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<Trade>,
    /// Whether a position was held at the close of each bar
    pub long_flags: Vec<bool>,
    /// Position still open after the last bar; marked to market, not traded
    pub open_position: Option<Position>,
}

impl SimulationResult {
    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.initial_capital)
    }

    pub fn bars_in_market(&self) -> usize {
        self.long_flags.iter().filter(|&&long| long).count()
    }
}

/// Metrics plus the simulation they were derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestOutcome {
    pub strategy: String,
    pub metrics: MetricsRecord,
    pub result: SimulationResult,
}

/// Runs entry/exit signals against a price series.
#[derive(Debug, Clone)]
pub struct Simulator {
    config: SimulationConfig,
}

impl Simulator {
    pub fn new(config: SimulationConfig) -> QuantResult<Self> {
        config.validate().map_err(QuantError::Config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Generate signals for `series`, simulate them with the strategy's
    /// costs and compute metrics.
    pub fn run(&self, strategy: &dyn Strategy, series: &BarSeries) -> QuantResult<BacktestOutcome> {
        let required = strategy.min_bars();
        if series.len() < required {
            return Err(SimulationError::InsufficientData {
                required,
                available: series.len(),
            }
            .into());
        }

        let signals = strategy.generate_signals(series)?;
        let result = self.simulate(series, &signals, strategy.costs())?;
        let metrics = metrics::compute(
            &result,
            self.config.initial_capital,
            self.config.periods_per_year_for(series.timeframe),
        );

        Ok(BacktestOutcome {
            strategy: strategy.name().to_string(),
            metrics,
            result,
        })
    }

    /// Single forward pass of the flat/long state machine.
    ///
    /// On each bar the exit is evaluated before the entry; an entry on a bar
    /// that also carries an exit is dropped. Every entry commits all cash.
    pub fn simulate(
        &self,
        series: &BarSeries,
        signals: &SignalPair,
        costs: CostModel,
    ) -> Result<SimulationResult, SimulationError> {
        let n = series.len();
        if !signals.is_aligned_with(n) {
            let err = SimulationError::MisalignedSignals {
                bars: n,
                entries: signals.entries.len(),
                exits: signals.exits.len(),
            };
            error!(symbol = %series.symbol, error = %err, "Signal arrays do not match the series");
            return Err(err);
        }

        let mut capital = self.config.initial_capital;
        let mut position: Option<Position> = None;
        let mut trades = Vec::new();
        let mut equity_curve = Vec::with_capacity(n);
        let mut long_flags = Vec::with_capacity(n);

        for (i, bar) in series.iter().enumerate() {
            let close = bar.close;
            let exit = signals.exits[i];
            let entry = signals.entries[i];

            if exit {
                if let Some(pos) = position.take() {
                    let exit_price = costs.sell_price(close);
                    let proceeds = pos.size * exit_price;
                    let exit_fee = costs.fee(proceeds);
                    let committed = pos.cost + pos.entry_fee;
                    let pnl = (proceeds - exit_fee) - committed;
                    let slippage_cost =
                        pos.size * (pos.entry_price - pos.entry_close) + pos.size * (close - exit_price);
                    capital = proceeds - exit_fee;

                    debug!(
                        symbol = %series.symbol,
                        entry_index = pos.entry_index,
                        exit_index = i,
                        pnl,
                        "Closed position"
                    );
                    trades.push(Trade {
                        entry_index: pos.entry_index,
                        exit_index: i,
                        entry_timestamp: pos.entry_timestamp,
                        exit_timestamp: bar.timestamp,
                        entry_price: pos.entry_price,
                        exit_price,
                        size: pos.size,
                        entry_fee: pos.entry_fee,
                        exit_fee,
                        fee_paid: pos.entry_fee + exit_fee,
                        slippage_cost,
                        pnl,
                        return_pct: if committed > 0.0 { pnl / committed } else { 0.0 },
                    });
                }
            } else if entry && position.is_none() {
                let entry_price = costs.buy_price(close);
                let size = capital / (entry_price * (1.0 + costs.commission));
                if size.is_finite() && size > 0.0 {
                    let cost = size * entry_price;
                    let entry_fee = costs.fee(cost);
                    capital -= cost + entry_fee;
                    position = Some(Position {
                        entry_index: i,
                        entry_timestamp: bar.timestamp,
                        entry_close: close,
                        entry_price,
                        size,
                        cost,
                        entry_fee,
                    });
                }
            }

            let equity = match &position {
                Some(pos) => capital + pos.size * close,
                None => capital,
            };
            equity_curve.push(EquityPoint {
                timestamp: bar.timestamp,
                equity,
            });
            long_flags.push(position.is_some());
        }

        Ok(SimulationResult {
            symbol: series.symbol.clone(),
            timeframe: series.timeframe,
            initial_capital: self.config.initial_capital,
            costs,
            equity_curve,
            trades,
            long_flags,
            open_position: position,
        })
    }
}

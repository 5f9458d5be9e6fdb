//! Portfolio simulation, metrics and batch backtests.

mod engine;
pub mod metrics;
mod report;
mod runner;

pub use engine::{
    BacktestOutcome, EquityPoint, Position, SimulationConfig, SimulationResult, Simulator, Trade,
};
pub use metrics::MetricsRecord;
pub use report::{BatchReport, PairResult, SkippedPair};
pub use runner::{equity_file_name, write_equity_csv, BatchConfig, BatchRunner};

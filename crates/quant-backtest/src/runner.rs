//! Batch backtests over a universe of pairs.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use quant_core::error::{QuantError, QuantResult};
use quant_core::traits::Strategy;
use quant_core::types::{BarSeries, CostModel, Timeframe};
use quant_data::MarketDataFetcher;
use quant_strategies::StrategySpec;
use tracing::{info, warn};

use crate::engine::{BacktestOutcome, EquityPoint, Simulator};
use crate::report::{BatchReport, PairResult, SkippedPair};

/// What to run and over which window.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub timeframe: Timeframe,
    pub start_ms: i64,
    pub end_ms: i64,
    pub strategy: StrategySpec,
    pub costs: CostModel,
    /// Pairs in flight at once
    pub concurrency: usize,
    /// Directory for per-pair equity CSVs; nothing is written when unset
    pub equity_dir: Option<PathBuf>,
}

/// Loads, simulates and scores every pair, skipping the ones that fail.
pub struct BatchRunner {
    fetcher: Arc<MarketDataFetcher>,
    simulator: Simulator,
    config: BatchConfig,
}

impl BatchRunner {
    pub fn new(fetcher: Arc<MarketDataFetcher>, simulator: Simulator, config: BatchConfig) -> Self {
        Self {
            fetcher,
            simulator,
            config,
        }
    }

    /// Run every pair. Per-pair failures end up in the report's skipped
    /// list; only an unusable strategy or output directory fails the batch.
    pub async fn run(&self, pairs: &[String]) -> QuantResult<BatchReport> {
        let strategy: Arc<dyn Strategy> = Arc::from(self.config.strategy.build(self.config.costs)?);

        if let Some(dir) = &self.config.equity_dir {
            std::fs::create_dir_all(dir)?;
        }

        info!(
            pairs = pairs.len(),
            strategy = strategy.name(),
            timeframe = %self.config.timeframe,
            concurrency = self.config.concurrency,
            "Starting batch backtest"
        );

        let outcomes: Vec<(String, QuantResult<(usize, BacktestOutcome)>)> =
            stream::iter(pairs.iter().cloned())
                .map(|symbol| {
                    let strategy = Arc::clone(&strategy);
                    async move {
                        let outcome = self.run_pair(&symbol, strategy).await;
                        (symbol, outcome)
                    }
                })
                .buffer_unordered(self.config.concurrency.max(1))
                .collect()
                .await;

        let mut results = Vec::new();
        let mut skipped = Vec::new();
        for (symbol, outcome) in outcomes {
            match outcome {
                Ok((bars, outcome)) => {
                    info!(
                        symbol = %symbol,
                        bars,
                        trades = outcome.metrics.total_trades,
                        total_return = outcome.metrics.total_return,
                        sharpe = outcome.metrics.sharpe_ratio,
                        "Pair complete"
                    );
                    results.push(PairResult {
                        symbol,
                        bars,
                        metrics: outcome.metrics,
                    });
                }
                Err(e) => {
                    warn!(symbol = %symbol, cause = e.kind(), error = %e, "Skipping pair");
                    skipped.push(SkippedPair {
                        symbol,
                        cause: e.kind().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }
        results.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        skipped.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        Ok(BatchReport {
            strategy: strategy.name().to_string(),
            spec: self.config.strategy.clone(),
            timeframe: self.config.timeframe,
            start_ms: self.config.start_ms,
            end_ms: self.config.end_ms,
            costs: self.config.costs,
            initial_capital: self.simulator.config().initial_capital,
            results,
            skipped,
        })
    }

    async fn run_pair(
        &self,
        symbol: &str,
        strategy: Arc<dyn Strategy>,
    ) -> QuantResult<(usize, BacktestOutcome)> {
        let series = self
            .fetcher
            .load(symbol, self.config.timeframe, self.config.start_ms, self.config.end_ms)
            .await?;

        let simulator = self.simulator.clone();
        let equity_dir = self.config.equity_dir.clone();

        tokio::task::spawn_blocking(move || -> QuantResult<(usize, BacktestOutcome)> {
            let outcome = simulator.run(strategy.as_ref(), &series)?;
            if let Some(dir) = equity_dir {
                write_equity_csv(&dir, &series, &outcome.result.equity_curve)?;
            }
            Ok((series.len(), outcome))
        })
        .await
        .map_err(|e| QuantError::Internal(format!("simulation task failed: {}", e)))?
    }
}

#[derive(Serialize)]
struct EquityRow {
    timestamp: i64,
    datetime: String,
    close: f64,
    equity: f64,
}

/// File name of a pair's equity CSV: `ETH_BTC_1m_equity.csv`.
pub fn equity_file_name(symbol: &str, timeframe: Timeframe) -> String {
    format!("{}_{}_equity.csv", symbol.replace('/', "_"), timeframe)
}

/// Write the equity curve next to the closes it was marked against.
pub fn write_equity_csv(dir: &Path, series: &BarSeries, curve: &[EquityPoint]) -> QuantResult<PathBuf> {
    let path = dir.join(equity_file_name(&series.symbol, series.timeframe));
    let mut writer = csv::Writer::from_path(&path).map_err(csv_err)?;

    for (bar, point) in series.iter().zip(curve) {
        writer
            .serialize(EquityRow {
                timestamp: point.timestamp,
                datetime: bar.datetime().to_rfc3339(),
                close: bar.close,
                equity: point.equity,
            })
            .map_err(csv_err)?;
    }
    writer.flush()?;
    Ok(path)
}

pub(crate) fn csv_err(e: csv::Error) -> QuantError {
    QuantError::Serialization(e.to_string())
}

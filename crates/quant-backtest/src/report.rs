//! Batch report generation.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use quant_core::error::{QuantError, QuantResult};
use quant_core::types::{CostModel, Timeframe};
use quant_strategies::StrategySpec;

use crate::metrics::MetricsRecord;
use crate::runner::csv_err;

/// Metrics for one pair that completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairResult {
    pub symbol: String,
    pub bars: usize,
    pub metrics: MetricsRecord,
}

/// A pair that produced no result, with the stable cause label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedPair {
    pub symbol: String,
    pub cause: String,
    pub message: String,
}

/// Complete batch report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub strategy: String,
    /// Strategy parameters used
    pub spec: StrategySpec,
    pub timeframe: Timeframe,
    pub start_ms: i64,
    pub end_ms: i64,
    pub costs: CostModel,
    pub initial_capital: f64,
    /// Sorted by symbol
    pub results: Vec<PairResult>,
    /// Sorted by symbol
    pub skipped: Vec<SkippedPair>,
}

#[derive(Serialize)]
struct MetricsRow<'a> {
    symbol: &'a str,
    bars: usize,
    total_return: f64,
    sharpe_ratio: f64,
    max_drawdown: f64,
    win_rate: f64,
    expectancy: f64,
    exposure_time: f64,
    total_trades: usize,
    final_equity: f64,
}

impl<'a> From<&'a PairResult> for MetricsRow<'a> {
    fn from(r: &'a PairResult) -> Self {
        let m = &r.metrics;
        Self {
            symbol: &r.symbol,
            bars: r.bars,
            total_return: m.total_return,
            sharpe_ratio: m.sharpe_ratio,
            max_drawdown: m.max_drawdown,
            win_rate: m.win_rate,
            expectancy: m.expectancy,
            exposure_time: m.exposure_time,
            total_trades: m.total_trades,
            final_equity: m.final_equity,
        }
    }
}

fn format_date(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ms.to_string())
}

impl BatchReport {
    /// Mean of a metric over completed pairs.
    fn mean_of(&self, f: impl Fn(&MetricsRecord) -> f64) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        self.results.iter().map(|r| f(&r.metrics)).sum::<f64>() / self.results.len() as f64
    }

    /// Pair with the highest total return.
    pub fn best(&self) -> Option<&PairResult> {
        self.results.iter().max_by(|a, b| {
            a.metrics
                .total_return
                .total_cmp(&b.metrics.total_return)
        })
    }

    /// Generate a text summary.
    pub fn summary(&self) -> String {
        let mut s = String::new();

        s.push_str("═══════════════════════════════════════════════════════════════════════════\n");
        s.push_str("                             BACKTEST REPORT                               \n");
        s.push_str("═══════════════════════════════════════════════════════════════════════════\n\n");

        s.push_str("RUN\n");
        s.push_str("───────────────────────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Strategy:            {}\n", self.strategy));
        s.push_str(&format!("  Timeframe:           {}\n", self.timeframe));
        s.push_str(&format!(
            "  Window:              {} → {}\n",
            format_date(self.start_ms),
            format_date(self.end_ms)
        ));
        s.push_str(&format!(
            "  Costs:               commission {:.4}%, slippage {:.4}%\n",
            self.costs.commission * 100.0,
            self.costs.slippage * 100.0
        ));
        s.push_str(&format!("  Initial Capital:     {:.2}\n", self.initial_capital));
        s.push_str(&format!(
            "  Pairs:               {} completed, {} skipped\n",
            self.results.len(),
            self.skipped.len()
        ));
        s.push('\n');

        s.push_str("RESULTS\n");
        s.push_str("───────────────────────────────────────────────────────────────────────────\n");
        s.push_str(&format!(
            "  {:<12} {:>10} {:>8} {:>9} {:>8} {:>11} {:>9} {:>7}\n",
            "Pair", "Return", "Sharpe", "MaxDD", "WinRate", "Expectancy", "Exposure", "Trades"
        ));
        for r in &self.results {
            let m = &r.metrics;
            s.push_str(&format!(
                "  {:<12} {:>9.2}% {:>8.2} {:>8.2}% {:>7.1}% {:>11.4} {:>8.1}% {:>7}\n",
                r.symbol,
                m.total_return * 100.0,
                m.sharpe_ratio,
                m.max_drawdown * 100.0,
                m.win_rate * 100.0,
                m.expectancy,
                m.exposure_time * 100.0,
                m.total_trades
            ));
        }
        if !self.results.is_empty() {
            s.push('\n');
            s.push_str(&format!(
                "  Mean Return:         {:.2}%\n",
                self.mean_of(|m| m.total_return) * 100.0
            ));
            s.push_str(&format!(
                "  Mean Sharpe:         {:.2}\n",
                self.mean_of(|m| m.sharpe_ratio)
            ));
            if let Some(best) = self.best() {
                s.push_str(&format!(
                    "  Best Pair:           {} ({:.2}%)\n",
                    best.symbol,
                    best.metrics.total_return * 100.0
                ));
            }
        }
        s.push('\n');

        if !self.skipped.is_empty() {
            s.push_str("SKIPPED\n");
            s.push_str("───────────────────────────────────────────────────────────────────────────\n");
            for p in &self.skipped {
                s.push_str(&format!("  {:<12} {:<18} {}\n", p.symbol, p.cause, p.message));
            }
            s.push('\n');
        }

        s.push_str("═══════════════════════════════════════════════════════════════════════════\n");

        s
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Metrics table as CSV, one row per completed pair.
    pub fn metrics_csv(&self) -> QuantResult<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for r in &self.results {
            writer.serialize(MetricsRow::from(r)).map_err(csv_err)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| QuantError::Serialization(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| QuantError::Serialization(e.to_string()))
    }

    /// Write `report.json`, `metrics.csv` and `summary.txt` into `dir`.
    pub fn save(&self, dir: &Path) -> QuantResult<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;

        let json = self
            .to_json()
            .map_err(|e| QuantError::Serialization(e.to_string()))?;
        let files = [
            ("report.json", json),
            ("metrics.csv", self.metrics_csv()?),
            ("summary.txt", self.summary()),
        ];

        let mut written = Vec::with_capacity(files.len());
        for (name, contents) in files {
            let path = dir.join(name);
            fs::write(&path, contents)?;
            written.push(path);
        }
        Ok(written)
    }
}

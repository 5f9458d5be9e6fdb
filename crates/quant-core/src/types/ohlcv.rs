//! OHLCV (Open, High, Low, Close, Volume) data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Timeframe;
use crate::error::DataError;

/// Compact OHLCV bar.
/// Uses f64 for fast indicator calculations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub struct Bar {
    /// Unix timestamp in milliseconds (UTC, bar open)
    pub timestamp: i64,
    /// Opening price
    pub open: f64,
    /// Highest price
    pub high: f64,
    /// Lowest price
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Trading volume
    pub volume: f64,
}

impl Bar {
    /// Create a new bar.
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Check the price/volume invariants of a single bar.
    ///
    /// Prices must be finite and strictly positive, volume finite and
    /// non-negative, and `high >= max(open, close) >= min(open, close) >= low`.
    pub fn validate(&self) -> Result<(), DataError> {
        let prices = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ];
        for (field, value) in prices {
            if !value.is_finite() || value <= 0.0 {
                return Err(DataError::InvalidSeries(format!(
                    "bar at {}: {} must be finite and positive, got {}",
                    self.timestamp, field, value
                )));
            }
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(DataError::InvalidSeries(format!(
                "bar at {}: volume must be finite and non-negative, got {}",
                self.timestamp, self.volume
            )));
        }
        let body_high = self.open.max(self.close);
        let body_low = self.open.min(self.close);
        if self.high < body_high || self.low > body_low {
            return Err(DataError::InvalidSeries(format!(
                "bar at {}: high/low ({}/{}) do not bracket open/close ({}/{})",
                self.timestamp, self.high, self.low, self.open, self.close
            )));
        }
        Ok(())
    }

    /// Get the timestamp as a DateTime.
    pub fn datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp).unwrap_or(DateTime::UNIX_EPOCH)
    }
}

/// Ordered price series for one (symbol, timeframe).
///
/// Timestamps are strictly increasing. Gaps are allowed, duplicates and
/// out-of-order bars are not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    /// Symbol identifier, e.g. `ETH/BTC`
    pub symbol: String,
    /// Timeframe of the bars
    pub timeframe: Timeframe,
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Create a new empty bar series.
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            bars: Vec::new(),
        }
    }

    /// Build a series from bars, validating every bar and the ordering.
    pub fn from_bars(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        bars: Vec<Bar>,
    ) -> Result<Self, DataError> {
        let mut series = Self::new(symbol, timeframe);
        series.bars.reserve(bars.len());
        for bar in bars {
            series.push(bar)?;
        }
        Ok(series)
    }

    /// Append a bar. It must be valid and newer than the last bar.
    pub fn push(&mut self, bar: Bar) -> Result<(), DataError> {
        bar.validate()?;
        if let Some(last) = self.bars.last() {
            if bar.timestamp <= last.timestamp {
                return Err(DataError::InvalidSeries(format!(
                    "{}: timestamp {} is not after {}",
                    self.symbol, bar.timestamp, last.timestamp
                )));
            }
        }
        self.bars.push(bar);
        Ok(())
    }

    /// Get the number of bars.
    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Check if the series is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Get all bars as a slice.
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Get the first bar.
    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    /// Get the last bar.
    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Get a bar by index (0 = oldest).
    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    /// Extract close prices as a vector.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Extract timestamps as a vector.
    pub fn timestamps(&self) -> Vec<i64> {
        self.bars.iter().map(|b| b.timestamp).collect()
    }

    /// Get an iterator over the bars.
    pub fn iter(&self) -> impl Iterator<Item = &Bar> {
        self.bars.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(ts: i64, close: f64) -> Bar {
        Bar::new(ts, close, close + 1.0, close - 1.0, close, 1000.0)
    }

    #[test]
    fn test_bar_validation() {
        assert!(Bar::new(1000, 100.0, 110.0, 95.0, 105.0, 1000000.0)
            .validate()
            .is_ok());
        // high below close
        assert!(Bar::new(1000, 100.0, 104.0, 95.0, 105.0, 1.0)
            .validate()
            .is_err());
        // low above open
        assert!(Bar::new(1000, 100.0, 110.0, 101.0, 105.0, 1.0)
            .validate()
            .is_err());
        assert!(Bar::new(1000, 0.0, 1.0, 0.0, 1.0, 1.0).validate().is_err());
        assert!(Bar::new(1000, 1.0, 1.0, 1.0, 1.0, -1.0).validate().is_err());
        assert!(Bar::new(1000, f64::NAN, 1.0, 1.0, 1.0, 1.0)
            .validate()
            .is_err());
        // zero volume is fine
        assert!(Bar::new(1000, 1.0, 1.0, 1.0, 1.0, 0.0).validate().is_ok());
    }

    #[test]
    fn test_series_rejects_out_of_order() {
        let mut series = BarSeries::new("ETH/BTC", Timeframe::Minute1);
        series.push(bar(60_000, 100.0)).unwrap();
        series.push(bar(180_000, 101.0)).unwrap(); // gap is fine

        assert!(series.push(bar(180_000, 102.0)).is_err());
        assert!(series.push(bar(120_000, 102.0)).is_err());
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_from_bars() {
        let series = BarSeries::from_bars(
            "ETH/BTC",
            Timeframe::Minute1,
            vec![bar(0, 100.0), bar(60_000, 101.0)],
        )
        .unwrap();
        assert_eq!(series.closes(), vec![100.0, 101.0]);
        assert_eq!(series.timestamps(), vec![0, 60_000]);

        let err = BarSeries::from_bars(
            "ETH/BTC",
            Timeframe::Minute1,
            vec![bar(60_000, 100.0), bar(0, 101.0)],
        );
        assert!(matches!(err, Err(DataError::InvalidSeries(_))));
    }

    #[test]
    fn test_bar_datetime() {
        let b = bar(1_738_368_000_000, 1.0);
        assert_eq!(b.datetime().to_rfc3339(), "2025-02-01T00:00:00+00:00");
    }
}

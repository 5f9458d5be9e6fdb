//! Error types for the research pipeline.

use thiserror::Error;

use crate::types::Timeframe;

/// Top-level pipeline error.
#[derive(Error, Debug)]
pub enum QuantError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimulationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl QuantError {
    /// Stable cause label used when a pair is skipped in a report.
    pub fn kind(&self) -> &'static str {
        match self {
            QuantError::Config(_) => "ConfigError",
            QuantError::Strategy(_) => "StrategyError",
            QuantError::Data(e) => e.kind(),
            QuantError::Simulation(e) => e.kind(),
            QuantError::Io(_) => "IOFailure",
            QuantError::Serialization(_) => "SerializationError",
            QuantError::Internal(_) => "InternalError",
        }
    }
}

/// Strategy-specific errors.
#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Strategy not found: {0}")]
    NotFound(String),
}

/// Data acquisition and cache errors.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("No data available for {symbol} ({timeframe}) in the requested window")]
    DataUnavailable { symbol: String, timeframe: Timeframe },

    #[error("Invalid series: {0}")]
    InvalidSeries(String),

    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Remote request failed: {0}")]
    Remote(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Rate limited: retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Unsupported by this data source: {0}")]
    Unsupported(String),
}

impl DataError {
    /// Whether a failed remote request may succeed if repeated.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DataError::Remote(_) | DataError::RateLimited { .. } | DataError::Timeout(_)
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DataError::DataUnavailable { .. } => "DataUnavailable",
            DataError::InvalidSeries(_) => "InvalidSeries",
            DataError::SymbolNotFound(_) => "SymbolNotFound",
            DataError::Remote(_)
            | DataError::Rejected(_)
            | DataError::RateLimited { .. }
            | DataError::Timeout(_) => "RemoteError",
            DataError::Parse(_) => "ParseError",
            DataError::Cache(_) => "IOFailure",
            DataError::Unsupported(_) => "Unsupported",
        }
    }
}

/// Portfolio simulation errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SimulationError {
    #[error("Insufficient data: need {required} bars, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Misaligned signals: {bars} bars, {entries} entries, {exits} exits")]
    MisalignedSignals {
        bars: usize,
        entries: usize,
        exits: usize,
    },
}

impl SimulationError {
    pub fn kind(&self) -> &'static str {
        match self {
            SimulationError::InsufficientData { .. } => "InsufficientData",
            SimulationError::MisalignedSignals { .. } => "MisalignedSignals",
        }
    }
}

/// Indicator calculation errors.
#[derive(Error, Debug)]
pub enum IndicatorError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type alias for pipeline operations.
pub type QuantResult<T> = Result<T, QuantError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        let err: QuantError = DataError::DataUnavailable {
            symbol: "ETH/BTC".into(),
            timeframe: Timeframe::Minute1,
        }
        .into();
        assert_eq!(err.kind(), "DataUnavailable");

        let err: QuantError = SimulationError::InsufficientData {
            required: 30,
            available: 10,
        }
        .into();
        assert_eq!(err.kind(), "InsufficientData");

        let err: QuantError = DataError::Cache("disk full".into()).into();
        assert_eq!(err.kind(), "IOFailure");
    }

    #[test]
    fn test_transient_classification() {
        assert!(DataError::Remote("reset".into()).is_transient());
        assert!(DataError::RateLimited { retry_after_secs: 1 }.is_transient());
        assert!(!DataError::Parse("bad".into()).is_transient());
        assert!(!DataError::SymbolNotFound("X/Y".into()).is_transient());
        assert!(!DataError::Rejected("HTTP 403".into()).is_transient());
    }
}

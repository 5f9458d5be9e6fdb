//! Binance spot REST market data.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use quant_core::error::DataError;
use quant_core::traits::MarketDataSource;
use quant_core::types::{Bar, Timeframe};
use tracing::debug;

pub const BINANCE_API_URL: &str = "https://api.binance.com";

/// Binance error code for an unknown symbol.
const INVALID_SYMBOL: i64 = -1121;

/// Binance client configuration.
#[derive(Debug, Clone)]
pub struct BinanceConfig {
    pub base_url: String,
    /// Transport-level timeout for a single HTTP request
    pub timeout: Duration,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            base_url: BINANCE_API_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    status: String,
    base_asset: String,
    quote_asset: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker24h {
    symbol: String,
    quote_volume: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: i64,
    msg: String,
}

/// Binance public market data source.
pub struct BinanceSource {
    config: BinanceConfig,
    client: Client,
    /// Wire symbol (`ETHBTC`) to unified symbol (`ETH/BTC`), filled by `load_markets`
    markets: Mutex<HashMap<String, String>>,
}

impl BinanceSource {
    pub fn new() -> Result<Self, DataError> {
        Self::with_config(BinanceConfig::default())
    }

    pub fn with_config(config: BinanceConfig) -> Result<Self, DataError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DataError::Remote(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            markets: Mutex::new(HashMap::new()),
        })
    }

    /// `ETH/BTC` -> `ETHBTC`
    fn wire_symbol(symbol: &str) -> String {
        symbol.replace('/', "")
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Response, DataError> {
        let url = format!("{}{}", self.config.base_url, path);
        debug!(url = %url, "Binance request");

        self.client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DataError::Timeout(self.config.timeout)
                } else {
                    DataError::Remote(e.to_string())
                }
            })
    }

    fn known_markets(&self) -> HashMap<String, String> {
        self.markets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl MarketDataSource for BinanceSource {
    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since_ms: i64,
        limit: usize,
    ) -> Result<Vec<Bar>, DataError> {
        let query = [
            ("symbol", Self::wire_symbol(symbol)),
            ("interval", timeframe.to_string()),
            ("startTime", since_ms.to_string()),
            ("limit", limit.to_string()),
        ];
        let response = self.get("/api/v3/klines", &query).await?;
        let response = check_status(response, symbol).await?;

        let rows: Vec<Vec<Value>> = response
            .json()
            .await
            .map_err(|e| DataError::Parse(format!("klines for {}: {}", symbol, e)))?;

        parse_klines(&rows)
    }

    async fn load_markets(&self) -> Result<Vec<String>, DataError> {
        let response = self.get("/api/v3/exchangeInfo", &[]).await?;
        let response = check_status(response, "exchangeInfo").await?;

        let info: ExchangeInfo = response
            .json()
            .await
            .map_err(|e| DataError::Parse(format!("exchangeInfo: {}", e)))?;

        let markets = trading_markets(info);
        let symbols: Vec<String> = markets.values().cloned().collect();
        *self.markets.lock().unwrap_or_else(|e| e.into_inner()) = markets;

        Ok(symbols)
    }

    async fn quote_volumes(&self) -> Result<HashMap<String, f64>, DataError> {
        if self.known_markets().is_empty() {
            self.load_markets().await?;
        }
        let markets = self.known_markets();

        let response = self.get("/api/v3/ticker/24hr", &[]).await?;
        let response = check_status(response, "ticker/24hr").await?;

        let tickers: Vec<Ticker24h> = response
            .json()
            .await
            .map_err(|e| DataError::Parse(format!("ticker/24hr: {}", e)))?;

        Ok(tickers
            .into_iter()
            .filter_map(|t| {
                let unified = markets.get(&t.symbol)?;
                let volume = t.quote_volume.parse::<f64>().ok()?;
                Some((unified.clone(), volume))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "binance"
    }
}

/// Classify a non-success response.
async fn check_status(response: Response, context: &str) -> Result<Response, DataError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 418 {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(DataError::RateLimited { retry_after_secs });
    }

    let body = response.text().await.unwrap_or_default();
    if status.is_server_error() {
        return Err(DataError::Remote(format!("{} returned {}: {}", context, status, body)));
    }

    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(err) if err.code == INVALID_SYMBOL => Err(DataError::SymbolNotFound(context.to_string())),
        Ok(err) => Err(DataError::Rejected(format!(
            "{} returned {} (code {}): {}",
            context, status, err.code, err.msg
        ))),
        Err(_) => Err(DataError::Rejected(format!("{} returned {}: {}", context, status, body))),
    }
}

/// Parse kline rows: `[openTime, open, high, low, close, volume, closeTime, ...]`.
fn parse_klines(rows: &[Vec<Value>]) -> Result<Vec<Bar>, DataError> {
    rows.iter()
        .map(|row| {
            if row.len() < 6 {
                return Err(DataError::Parse(format!(
                    "kline row has {} fields, expected at least 6",
                    row.len()
                )));
            }
            let timestamp = row[0]
                .as_i64()
                .ok_or_else(|| DataError::Parse(format!("bad kline open time: {}", row[0])))?;

            Ok(Bar::new(
                timestamp,
                number(&row[1])?,
                number(&row[2])?,
                number(&row[3])?,
                number(&row[4])?,
                number(&row[5])?,
            ))
        })
        .collect()
}

/// Binance sends prices as strings; accept plain numbers too.
fn number(value: &Value) -> Result<f64, DataError> {
    match value {
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|_| DataError::Parse(format!("not a number: {:?}", s))),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| DataError::Parse(format!("not a number: {}", n))),
        other => Err(DataError::Parse(format!("not a number: {}", other))),
    }
}

fn trading_markets(info: ExchangeInfo) -> HashMap<String, String> {
    info.symbols
        .into_iter()
        .filter(|s| s.status == "TRADING")
        .map(|s| (s.symbol, format!("{}/{}", s.base_asset, s.quote_asset)))
        .collect()
}

//! Parquet-backed series cache.
//!
//! One SNAPPY-compressed Parquet file per (symbol, timeframe) with columns
//! `[timestamp, open, high, low, close, volume]`. A file is either a complete
//! series or absent: writes go to a temporary file in the cache directory and
//! are renamed into place.

use arrow::array::{Array, ArrayRef, Float64Array, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::collections::HashMap;
use std::fmt::Display;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use quant_core::error::DataError;
use quant_core::types::{Bar, BarSeries, Timeframe};
use tracing::{debug, info, warn};

/// Attempts per `get` or `put` before the failure is surfaced.
const IO_ATTEMPTS: usize = 2;

/// OHLCV bar schema.
pub fn bar_schema() -> Schema {
    Schema::new(vec![
        Field::new(
            "timestamp",
            DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())),
            false,
        ),
        Field::new("open", DataType::Float64, false),
        Field::new("high", DataType::Float64, false),
        Field::new("low", DataType::Float64, false),
        Field::new("close", DataType::Float64, false),
        Field::new("volume", DataType::Float64, false),
    ])
}

fn cache_err(context: &Path, e: impl Display) -> DataError {
    DataError::Cache(format!("{}: {}", context.display(), e))
}

/// Durable (symbol, timeframe) → series store.
pub struct ParquetCache {
    cache_dir: PathBuf,
    /// Serializes writers of the same file; distinct keys never contend.
    write_locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl ParquetCache {
    /// Open a cache rooted at `cache_dir`, creating the directory if needed.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self, DataError> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir).map_err(|e| cache_err(&cache_dir, e))?;
        Ok(Self {
            cache_dir,
            write_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Get cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Deterministic file name for a key, e.g. `ETH_BTC_1m.parquet`.
    pub fn file_name(symbol: &str, timeframe: Timeframe) -> String {
        format!("{}_{}.parquet", symbol.replace('/', "_"), timeframe)
    }

    /// Full path of the file backing a key.
    pub fn path_for(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.cache_dir.join(Self::file_name(symbol, timeframe))
    }

    /// Whether an entry exists for the key.
    pub fn contains(&self, symbol: &str, timeframe: Timeframe) -> bool {
        self.path_for(symbol, timeframe).is_file()
    }

    /// Read a cached series. `Ok(None)` when the key is absent. A failed read
    /// is retried once.
    pub fn get(&self, symbol: &str, timeframe: Timeframe) -> Result<Option<BarSeries>, DataError> {
        let path = self.path_for(symbol, timeframe);
        if !path.is_file() {
            debug!(symbol, %timeframe, "Cache miss");
            return Ok(None);
        }

        let series = with_retry("read", &path, || {
            read_bars(&path).and_then(|bars| {
                BarSeries::from_bars(symbol, timeframe, bars).map_err(|e| cache_err(&path, e))
            })
        })?;

        debug!(symbol, %timeframe, bars = series.len(), path = %path.display(), "Cache hit");
        Ok(Some(series))
    }

    /// Store a complete series under its (symbol, timeframe), replacing any
    /// previous entry atomically. A failed write is retried once.
    pub fn put(&self, series: &BarSeries) -> Result<(), DataError> {
        let path = self.path_for(&series.symbol, series.timeframe);
        let lock = self.key_lock(&path);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        with_retry("write", &path, || self.write_atomic(&path, series))?;
        info!(
            symbol = %series.symbol,
            timeframe = %series.timeframe,
            bars = series.len(),
            path = %path.display(),
            "Committed series to cache"
        );
        Ok(())
    }

    fn key_lock(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.write_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(path.to_path_buf()).or_default().clone()
    }

    fn write_atomic(&self, path: &Path, series: &BarSeries) -> Result<(), DataError> {
        let mut tmp = tempfile::Builder::new()
            .prefix(".")
            .suffix(".parquet.tmp")
            .tempfile_in(&self.cache_dir)
            .map_err(|e| cache_err(&self.cache_dir, e))?;

        write_bars(tmp.as_file_mut(), series.bars()).map_err(|e| cache_err(path, e))?;
        tmp.as_file_mut().flush().map_err(|e| cache_err(path, e))?;
        tmp.as_file().sync_all().map_err(|e| cache_err(path, e))?;

        tmp.persist(path).map_err(|e| cache_err(path, e.error))?;
        Ok(())
    }
}

/// Run a cache I/O operation, retrying it once on failure.
fn with_retry<T>(
    op_name: &str,
    path: &Path,
    mut op: impl FnMut() -> Result<T, DataError>,
) -> Result<T, DataError> {
    let mut last_error = None;
    for attempt in 1..=IO_ATTEMPTS {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(attempt, op = op_name, error = %e, path = %path.display(), "Cache I/O failed");
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| cache_err(path, format!("{} failed", op_name))))
}

fn write_bars<W: Write + Send>(writer: W, bars: &[Bar]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let schema = Arc::new(bar_schema());
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(writer, schema.clone(), Some(props))?;

    let column = |f: fn(&Bar) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from(bars.iter().map(f).collect::<Vec<f64>>()))
    };
    let timestamps: Vec<i64> = bars.iter().map(|b| b.timestamp).collect();

    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(TimestampMillisecondArray::from(timestamps).with_timezone("UTC")) as ArrayRef,
            column(|b| b.open),
            column(|b| b.high),
            column(|b| b.low),
            column(|b| b.close),
            column(|b| b.volume),
        ],
    )?;

    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn typed_column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Option<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|column| column.as_any().downcast_ref::<T>())
}

fn read_bars(path: &Path) -> Result<Vec<Bar>, DataError> {
    let file = File::open(path).map_err(|e| cache_err(path, e))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .and_then(|builder| builder.build())
        .map_err(|e| cache_err(path, e))?;

    let mut bars = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|e| cache_err(path, e))?;

        let missing = |name: &str| cache_err(path, format!("missing or mistyped column '{}'", name));
        let ts = typed_column::<TimestampMillisecondArray>(&batch, "timestamp")
            .ok_or_else(|| missing("timestamp"))?;
        let open = typed_column::<Float64Array>(&batch, "open").ok_or_else(|| missing("open"))?;
        let high = typed_column::<Float64Array>(&batch, "high").ok_or_else(|| missing("high"))?;
        let low = typed_column::<Float64Array>(&batch, "low").ok_or_else(|| missing("low"))?;
        let close = typed_column::<Float64Array>(&batch, "close").ok_or_else(|| missing("close"))?;
        let volume =
            typed_column::<Float64Array>(&batch, "volume").ok_or_else(|| missing("volume"))?;

        bars.reserve(batch.num_rows());
        for i in 0..batch.num_rows() {
            bars.push(Bar::new(
                ts.value(i),
                open.value(i),
                high.value(i),
                low.value(i),
                close.value(i),
                volume.value(i),
            ));
        }
    }

    Ok(bars)
}

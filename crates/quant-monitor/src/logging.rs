//! Logging setup.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log files are named `quant.log.YYYY-MM-DD`.
pub const LOG_FILE_PREFIX: &str = "quant.log";

/// Setup logging with the given level.
///
/// `format` is `json` or anything else for human-readable output. `RUST_LOG`
/// overrides `level`. With `file`, events are also written to a daily-rolling
/// file in that directory; keep the returned guard alive until exit so
/// buffered lines are flushed.
pub fn setup_logging(level: &str, format: &str, file: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match file {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // an already installed subscriber stays in place
    let _ = if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(fmt::layer().pretty())
            .try_init()
    };

    guard
}

//! Logging Setup
//!
//! Console output always; a daily-rolling file when a log directory is
//! configured. `RUST_LOG` overrides the configured level.

use std::fs;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::domain::config::LoggingConfig;
use crate::error::Result;

/// File name prefix for rolling log files
pub const LOG_FILE_PREFIX: &str = "crop-dashboard.log";

/// Keeps the non-blocking file writer alive
///
/// Dropping it flushes buffered log lines, so hold it until exit.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Build the filter from `RUST_LOG`, falling back to `default_level`
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the global subscriber
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard> {
    let console_layer = fmt::layer().with_target(true);

    let (file_layer, file_guard) = match &config.directory {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter(&config.level))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| crate::error::Error::Invalid {
            message: format!("logging already initialized: {e}"),
        })?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

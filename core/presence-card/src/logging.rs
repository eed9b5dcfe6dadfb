//! Logging setup for the host process.
//!
//! Console output always; an additional plain-text file layer when a log
//! directory is given. Filter comes from `RUST_LOG`, defaulting to `info`, or
//! is forced to `debug` by `PRESENCE_CARD_DEBUG_LOG`.

use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_NAME: &str = "presence-card.log";

/// Keeps the file writer alive; dropping it flushes the log file.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

fn env_filter(debug_enabled: bool) -> EnvFilter {
    if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

pub fn init(log_dir: Option<&Path>) -> io::Result<LoggingGuard> {
    let filter = env_filter(presence_core::config::debug_log_enabled());
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(io::stderr);

    let Some(log_dir) = log_dir else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .init();
        return Ok(LoggingGuard { _file_guard: None });
    };

    fs_err::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE_NAME);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: Some(file_guard),
    })
}

//! Logging infrastructure for the tile engine.
//!
//! Provides structured logging with file output and console output:
//! - Writes to `logs/tilepane.log` (cleared on session start)
//! - Optionally prints to stdout for CLI tailing
//! - Configurable via the `RUST_LOG` environment variable
//!
//! Interactive terminal frontends use [`init_file_logging`], since writing
//! log lines to stdout would corrupt a full-screen interface.

use std::fs;
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard will flush and close the log file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initialize logging to both the log file and stdout.
///
/// Creates the log directory if needed and clears the previous log file.
///
/// # Arguments
///
/// * `log_dir` - Directory for log files (e.g., "logs")
/// * `log_file` - Log filename (e.g., "tilepane.log")
///
/// # Returns
///
/// LoggingGuard that must be kept alive for logging to work
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or the log file
/// cannot be cleared.
pub fn init_logging(log_dir: &str, log_file: &str) -> Result<LoggingGuard, io::Error> {
    let (non_blocking_file, file_guard) = prepare_log_writer(log_dir, log_file)?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .pretty();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_ansi(true)
        .with_span_events(FmtSpan::CLOSE)
        .pretty();

    tracing_subscriber::registry()
        .with(default_env_filter())
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Initialize logging to the log file only.
///
/// For full-screen terminal frontends where stdout belongs to the
/// interface. Same file handling as [`init_logging`].
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or the log file
/// cannot be cleared.
pub fn init_file_logging(log_dir: &str, log_file: &str) -> Result<LoggingGuard, io::Error> {
    let (non_blocking_file, file_guard) = prepare_log_writer(log_dir, log_file)?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .pretty();

    tracing_subscriber::registry()
        .with(default_env_filter())
        .with(file_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Create the log directory, clear the previous session's file, and build
/// the non-blocking writer for it.
fn prepare_log_writer(log_dir: &str, log_file: &str) -> Result<(NonBlocking, WorkerGuard), io::Error> {
    fs::create_dir_all(log_dir)?;

    // Clear previous log file by writing empty content. This handles both
    // existing and non-existing files.
    let log_path = Path::new(log_dir).join(log_file);
    fs::write(&log_path, "")?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    Ok(tracing_appender::non_blocking(file_appender))
}

/// Env filter defaulting to INFO when RUST_LOG is not set.
fn default_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Get default log directory path.
pub fn default_log_dir() -> &'static str {
    "logs"
}

/// Get default log file name.
pub fn default_log_file() -> &'static str {
    "tilepane.log"
}

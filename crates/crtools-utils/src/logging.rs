//! # Logging Utilities
//!
//! Logging setup for the crtools binaries, built on `tracing`.
//!
//! Logs always go to stderr so that stdout stays free for command output
//! (diff reports, builder lists). A copy can additionally be written to a
//! daily-rolled file.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use crtools_utils::init_logging;
//!
//! // Keep the guard alive for the whole run so file logs are flushed.
//! let _guard = init_logging().expect("Failed to initialize logging");
//! tracing::info!("Application started");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Level filter (e.g., `RUST_LOG=debug`, `RUST_LOG=crtools_size=trace`)
//! - `CRTOOLS_LOG_FORMAT`: Output format (`json` or `pretty`, default: `pretty`)
//! - `CRTOOLS_LOG_FILE`: Optional path to an additional log file

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Variable selecting the output format.
pub const LOG_FORMAT_VAR: &str = "CRTOOLS_LOG_FORMAT";

/// Variable naming an additional log file.
pub const LOG_FILE_VAR: &str = "CRTOOLS_LOG_FILE";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat
{
    /// Human-readable format (default)
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(LogFormat::Pretty),
            "json" | "prod" | "production" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(format!("{s}. Use 'pretty' or 'json'"))),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level (default)
    Info,
    /// Debug level
    Debug,
    /// Trace level (most verbose)
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(format!(
                "{s}. Use 'error', 'warn', 'info', 'debug', or 'trace'"
            ))),
        }
    }
}

/// Keeps the background file writer alive.
///
/// Dropping it flushes any buffered file output; hold it until the program
/// exits.
#[derive(Debug, Default)]
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard
{
    file: Option<WorkerGuard>,
}

/// Initialize logging from the environment.
///
/// The format comes from `CRTOOLS_LOG_FORMAT` (an unknown value falls back
/// to pretty), the filter from `RUST_LOG` (default `info`) and the optional
/// file from `CRTOOLS_LOG_FILE`.
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging() -> Result<LoggingGuard, LoggingError>
{
    let format = env::var(LOG_FORMAT_VAR)
        .ok()
        .and_then(|s| LogFormat::from_str(&s).ok())
        .unwrap_or(LogFormat::Pretty);

    let directives = env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| Level::INFO.to_string());
    init_logging_internal(format, &directives)
}

/// Initialize logging with an explicit level and format.
///
/// The level overrides `RUST_LOG`. `CRTOOLS_LOG_FILE` is still honored.
///
/// ## Example
///
/// ```rust,no_run
/// use crtools_utils::{init_logging_with_level, LogFormat, LogLevel};
///
/// let _guard = init_logging_with_level(LogLevel::Debug, LogFormat::Json)
///     .expect("Failed to initialize logging");
/// ```
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<LoggingGuard, LoggingError>
{
    init_logging_internal(format, &Level::from(level).to_string())
}

fn env_filter(directives: &str) -> EnvFilter
{
    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()))
}

fn daily_file_writer(path: &Path) -> (tracing_appender::non_blocking::NonBlocking, WorkerGuard)
{
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let appender = tracing_appender::rolling::daily(dir, path.file_name().unwrap_or_default());
    tracing_appender::non_blocking(appender)
}

fn init_logging_internal(format: LogFormat, directives: &str) -> Result<LoggingGuard, LoggingError>
{
    let log_file = env::var(LOG_FILE_VAR).ok().map(PathBuf::from);

    let mut guard = LoggingGuard::default();
    let result = match format {
        LogFormat::Pretty => {
            let console_layer = fmt::layer()
                .with_target(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_ansi(true)
                .with_writer(io::stderr)
                .with_filter(env_filter(directives));

            if let Some(path) = log_file {
                let (writer, file_guard) = daily_file_writer(&path);
                guard.file = Some(file_guard);
                let file_layer = fmt::layer()
                    .with_writer(writer)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .with_filter(env_filter(directives));
                Registry::default().with(console_layer).with(file_layer).try_init()
            } else {
                Registry::default().with(console_layer).try_init()
            }
        }
        LogFormat::Json => {
            let console_layer = fmt::layer()
                .json()
                .with_target(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_current_span(true)
                .with_span_list(true)
                .with_writer(io::stderr)
                .with_filter(env_filter(directives));

            if let Some(path) = log_file {
                let (writer, file_guard) = daily_file_writer(&path);
                guard.file = Some(file_guard);
                let file_layer = fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_filter(env_filter(directives));
                Registry::default().with(console_layer).with(file_layer).try_init()
            } else {
                Registry::default().with(console_layer).try_init()
            }
        }
    };

    result.map_err(|e| LoggingError::InitializationFailed(e.to_string()))?;
    Ok(guard)
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),
}

//! # Logging Utilities
//!
//! Logging setup for worm binaries using `tracing`.
//!
//! This module provides:
//! - Pretty (human-readable) or JSON output
//! - Environment-driven configuration with programmatic overrides
//! - Optional tee to a daily-rolling log file
//!
//! Console output goes to stderr, so it never interleaves with data a command
//! prints on stdout (hexdumps, region tables).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use worm_utils::init_logging;
//!
//! // Keep the guard alive until exit so file output is flushed
//! let _guard = init_logging().expect("Failed to initialize logging");
//! tracing::info!("Application started");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Filter directives (e.g., `RUST_LOG=debug`, `RUST_LOG=worm_core=trace`)
//! - `WORM_LOG_FORMAT`: Output format (`json` or `pretty`, default: `pretty`)
//! - `WORM_LOG_FILE`: Optional path of a log file; rotated daily
//!
//! ## Examples
//!
//! ```rust,no_run
//! use worm_utils::{init_logging_with, LogConfig, LogFormat, LogLevel};
//!
//! // Environment first, then an explicit level on top
//! let config = LogConfig::from_env()?.with_level(LogLevel::Debug).with_format(LogFormat::Json);
//! let _guard = init_logging_with(&config)?;
//! # Ok::<(), worm_utils::LoggingError>(())
//! ```

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Environment variable selecting the output format.
pub const FORMAT_ENV: &str = "WORM_LOG_FORMAT";

/// Environment variable naming an optional log file.
pub const FILE_ENV: &str = "WORM_LOG_FILE";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Pretty-printed, human-readable format (default)
    #[default]
    Pretty,
    /// JSON format, one object per line
    Json,
}

impl FromStr for LogFormat
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(LogFormat::Pretty),
            "json" | "prod" | "production" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {s}. Use 'pretty' or 'json'")),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
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
    /// Trace level (most verbose; logs every transfer)
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

impl fmt::Display for LogLevel
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::Display::fmt(&Level::from(*self), f)
    }
}

impl FromStr for LogLevel
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!(
                "Unknown log level: {s}. Use 'error', 'warn', 'info', 'debug', or 'trace'"
            )),
        }
    }
}

/// Logging configuration
///
/// Built from the environment with [`LogConfig::from_env`], then adjusted
/// with the `with_*` methods (typically from command-line flags, which take
/// precedence).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig
{
    /// Explicit level; overrides `RUST_LOG` when set
    pub level: Option<LogLevel>,
    /// Output format for console and file
    pub format: LogFormat,
    /// Optional log file, rotated daily
    pub file: Option<PathBuf>,
}

impl LogConfig
{
    /// Read `WORM_LOG_FORMAT` and `WORM_LOG_FILE`
    ///
    /// `RUST_LOG` is not read here; it is consulted when the filter is built,
    /// unless an explicit level is set.
    ///
    /// ## Errors
    ///
    /// - `InvalidFormat`: `WORM_LOG_FORMAT` is set to an unknown format
    pub fn from_env() -> Result<Self, LoggingError>
    {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LoggingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let format = match lookup(FORMAT_ENV).filter(|value| !value.is_empty()) {
            Some(value) => value.parse().map_err(LoggingError::InvalidFormat)?,
            None => LogFormat::default(),
        };
        let file = lookup(FILE_ENV).filter(|value| !value.is_empty()).map(PathBuf::from);

        Ok(Self {
            level: None,
            format,
            file,
        })
    }

    /// Set an explicit level.
    pub fn with_level(mut self, level: LogLevel) -> Self
    {
        self.level = Some(level);
        self
    }

    /// Set the output format.
    pub fn with_format(mut self, format: LogFormat) -> Self
    {
        self.format = format;
        self
    }

    /// Tee output to `path`.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self
    {
        self.file = Some(path.into());
        self
    }

    /// Filter directives this configuration resolves to, given `rust_log`
    ///
    /// Priority:
    /// 1. An explicit level (from `--log-level`)
    /// 2. `RUST_LOG`, which may carry per-crate directives like `worm_core=trace`
    /// 3. `info`
    pub fn directives(&self, rust_log: Option<&str>) -> String
    {
        match (self.level, rust_log) {
            (Some(level), _) => level.to_string().to_lowercase(),
            (None, Some(directives)) if !directives.trim().is_empty() => directives.to_string(),
            _ => Level::INFO.to_string().to_lowercase(),
        }
    }

    fn env_filter(&self) -> EnvFilter
    {
        let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
        EnvFilter::try_new(self.directives(rust_log.as_deref()))
            .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()))
    }
}

/// Keeps background log writers alive
///
/// Dropping it flushes and stops the file writer, so hold it until the
/// program exits.
#[must_use = "dropping the guard stops file logging"]
#[derive(Debug)]
pub struct LoggingGuard
{
    file: Option<WorkerGuard>,
}

impl LoggingGuard
{
    /// Whether a log file is being written.
    pub fn has_file(&self) -> bool
    {
        self.file.is_some()
    }
}

/// Initialize logging from the environment
///
/// Equivalent to `init_logging_with(&LogConfig::from_env()?)`.
///
/// ## Errors
///
/// Returns an error if:
/// - Logging is already initialized
/// - `WORM_LOG_FORMAT` holds an unknown format
/// - The log file cannot be created (if `WORM_LOG_FILE` is set)
pub fn init_logging() -> Result<LoggingGuard, LoggingError>
{
    init_logging_with(&LogConfig::from_env()?)
}

/// Initialize logging with an explicit configuration
///
/// ## Errors
///
/// Returns an error if logging is already initialized or the log file cannot
/// be created.
pub fn init_logging_with(config: &LogConfig) -> Result<LoggingGuard, LoggingError>
{
    let console_layer = format_layer(config.format, io::stderr, true).with_filter(config.env_filter());

    let (file_layer, file_guard) = match &config.file {
        Some(path) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender(path)?);
            // No ANSI in files
            let layer = format_layer(config.format, non_blocking, false).with_filter(config.env_filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;

    Ok(LoggingGuard { file: file_guard })
}

/// Formatting layer shared by console and file output.
fn format_layer<S, W>(format: LogFormat, writer: W, ansi: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(ansi)
            .with_writer(writer)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(writer)
            .boxed(),
    }
}

/// Daily-rolling appender writing `<dir>/<name>.<date>`.
fn file_appender(path: &Path) -> Result<RollingFileAppender, LoggingError>
{
    let file_name = path.file_name().ok_or_else(|| {
        LoggingError::FileError(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("log file path has no file name: {}", path.display()),
        ))
    })?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(file_name.to_string_lossy())
        .build(dir)
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}

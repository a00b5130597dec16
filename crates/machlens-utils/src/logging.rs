//! # Logging Utilities
//!
//! Logging for machlens using `tracing`.
//!
//! Console output goes to stderr so that it never mixes with the tables and
//! listings the CLI prints on stdout. An optional log file receives the same
//! events without ANSI colors.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use machlens_utils::init_logging;
//!
//! init_logging().expect("Failed to initialize logging");
//! tracing::info!("loaded file");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Log filter (e.g. `RUST_LOG=debug`, `RUST_LOG=machlens_core=debug`)
//! - `MACHLENS_LOG_FORMAT`: `json` or `pretty` (default: `pretty`)
//! - `MACHLENS_LOG_FILE`: Optional path of a log file; `{date}` in the file
//!   name becomes the current UTC date (`machlens-{date}.log`)

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use chrono::Utc;
use tracing::Level;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Variable selecting the output format
pub const LOG_FORMAT_VAR: &str = "MACHLENS_LOG_FORMAT";
/// Variable naming the log file
pub const LOG_FILE_VAR: &str = "MACHLENS_LOG_FILE";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Human-readable lines
    #[default]
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
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(s.to_string())),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    Error,
    Warn,
    Info,
    Debug,
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
            _ => Err(LoggingError::InvalidLevel(s.to_string())),
        }
    }
}

/// Logging configuration
///
/// Filter priority: an explicit `level`, then `RUST_LOG`, then `WARN`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig
{
    pub level: Option<LogLevel>,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

impl LogConfig
{
    /// Read `MACHLENS_LOG_FORMAT` and `MACHLENS_LOG_FILE`.
    ///
    /// ## Errors
    ///
    /// `LoggingError::InvalidFormat` if the format variable is not recognized.
    pub fn from_env() -> Result<Self, LoggingError>
    {
        Self::from_vars(env::var(LOG_FORMAT_VAR).ok().as_deref(), env::var_os(LOG_FILE_VAR).map(PathBuf::from))
    }

    fn from_vars(format: Option<&str>, file: Option<PathBuf>) -> Result<Self, LoggingError>
    {
        Ok(Self {
            level: None,
            format: format.map(str::parse).transpose()?.unwrap_or_default(),
            file: file.filter(|path| !path.as_os_str().is_empty()),
        })
    }

    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self
    {
        self.level = Some(level);
        self
    }

    fn filter(&self) -> EnvFilter
    {
        match self.level {
            Some(level) => EnvFilter::new(Level::from(level).to_string()),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::WARN.to_string())),
        }
    }
}

/// Initialize logging from the environment.
///
/// ## Errors
///
/// Returns an error if:
/// - Logging is already initialized
/// - `MACHLENS_LOG_FORMAT` has an unknown value
/// - The file named by `MACHLENS_LOG_FILE` cannot be opened
pub fn init_logging() -> Result<(), LoggingError>
{
    init_logging_with(&LogConfig::from_env()?)
}

/// Initialize logging with an explicit level and format.
///
/// ## Example
///
/// ```rust,no_run
/// use machlens_utils::{LogFormat, LogLevel, init_logging_with_level};
///
/// init_logging_with_level(LogLevel::Debug, LogFormat::Json).expect("Failed to initialize logging");
/// ```
///
/// ## Errors
///
/// Returns an error if logging is already initialized or the log file
/// cannot be opened.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<(), LoggingError>
{
    let config = LogConfig {
        format,
        ..LogConfig::from_env()?
    };
    init_logging_with(&config.with_level(level))
}

/// Initialize logging from a prepared configuration.
///
/// ## Errors
///
/// Returns an error if logging is already initialized or the log file
/// cannot be opened.
pub fn init_logging_with(config: &LogConfig) -> Result<(), LoggingError>
{
    let mut layers: Vec<BoxedLayer> = vec![console_layer(config.format)];
    if let Some(path) = &config.file {
        layers.push(file_layer(path, config.format)?);
    }

    Registry::default()
        .with(layers)
        .with(config.filter())
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))
}

fn console_layer(format: LogFormat) -> BoxedLayer
{
    let layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_writer(io::stderr);
    match format {
        LogFormat::Pretty => layer.with_ansi(true).boxed(),
        LogFormat::Json => layer.json().with_current_span(true).with_span_list(true).boxed(),
    }
}

fn file_layer(path: &Path, format: LogFormat) -> Result<BoxedLayer, LoggingError>
{
    let name = path
        .file_name()
        .map(|name| dated_file_name(&name.to_string_lossy()))
        .ok_or_else(|| LoggingError::InvalidFile(path.display().to_string()))?;
    let directory = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(directory)?;

    let appender = tracing_appender::rolling::never(directory, name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    // flushes on drop; logging lives as long as the process
    std::mem::forget(guard);

    let layer = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_ansi(false);
    Ok(match format {
        LogFormat::Pretty => layer.boxed(),
        LogFormat::Json => layer.json().with_current_span(true).with_span_list(true).boxed(),
    })
}

/// Replace `{date}` with today's UTC date.
fn dated_file_name(name: &str) -> String
{
    if name.contains("{date}") {
        name.replace("{date}", &Utc::now().format("%Y-%m-%d").to_string())
    } else {
        name.to_string()
    }
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    #[error("Invalid log format: {0}. Use 'pretty' or 'json'")]
    InvalidFormat(String),

    #[error("Invalid log level: {0}. Use 'error', 'warn', 'info', 'debug', or 'trace'")]
    InvalidLevel(String),

    #[error("Invalid log file: {0}")]
    InvalidFile(String),

    /// Usually a second initialization
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}

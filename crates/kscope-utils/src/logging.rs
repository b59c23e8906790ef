//! # Logging Utilities
//!
//! Logging setup for kscope using `tracing`.
//!
//! Diagnostics go to stderr so that command output on stdout stays
//! machine-readable. Optionally a copy is written to a file.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kscope_utils::{init_logging, LogConfig};
//!
//! let _guard = init_logging(&LogConfig::from_env()?)?;
//! tracing::info!("kscope started");
//! # Ok::<(), kscope_utils::LoggingError>(())
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: filter directives (`debug`, `kscope_core=trace`)
//! - `KSCOPE_LOG_FORMAT`: `pretty` (default) or `json`
//! - `KSCOPE_LOG_FILE`: also write logs to this file
//!
//! An explicit level (for example from a `--log-level` flag) takes
//! precedence over `RUST_LOG`.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use chrono::Utc;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

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
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {s}. Use 'pretty' or 'json'")),
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

/// Resolved logging settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig
{
    /// Overrides `RUST_LOG` when set
    pub level: Option<LogLevel>,
    pub format: LogFormat,
    /// Extra log file next to stderr
    pub file: Option<PathBuf>,
}

impl LogConfig
{
    /// Read `KSCOPE_LOG_FORMAT` and `KSCOPE_LOG_FILE`
    ///
    /// ## Errors
    ///
    /// `InvalidFormat` if `KSCOPE_LOG_FORMAT` is set to an unknown format.
    pub fn from_env() -> Result<Self, LoggingError>
    {
        Self::from_vars(
            env::var("KSCOPE_LOG_FORMAT").ok().as_deref(),
            env::var("KSCOPE_LOG_FILE").ok().as_deref(),
        )
    }

    fn from_vars(format: Option<&str>, file: Option<&str>) -> Result<Self, LoggingError>
    {
        let format = match format.filter(|s| !s.is_empty()) {
            Some(s) => LogFormat::from_str(s).map_err(LoggingError::InvalidFormat)?,
            None => LogFormat::default(),
        };
        Ok(Self {
            level: None,
            format,
            file: file.filter(|s| !s.is_empty()).map(PathBuf::from),
        })
    }

    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self
    {
        self.level = Some(level);
        self
    }

    #[must_use]
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self
    {
        self.file = Some(file.into());
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

/// Dated log file under `~/.kscope`, or the temp dir without a home
///
/// ## Errors
///
/// `FileError` if the directory cannot be created.
pub fn default_log_file() -> Result<PathBuf, LoggingError>
{
    let dir = match env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".kscope"),
        None => env::temp_dir(),
    };
    std::fs::create_dir_all(&dir)?;
    Ok(dated_log_file(&dir))
}

fn dated_log_file(dir: &Path) -> PathBuf
{
    let today = Utc::now().format("%Y-%m-%d");
    dir.join(format!("{today}-kscope.log"))
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn stderr_layer(format: LogFormat, filter: EnvFilter) -> BoxedLayer
{
    let layer = fmt::layer()
        .with_target(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_writer(io::stderr);
    match format {
        LogFormat::Pretty => layer.with_ansi(true).with_filter(filter).boxed(),
        LogFormat::Json => layer.json().with_current_span(true).with_filter(filter).boxed(),
    }
}

fn file_layer(format: LogFormat, filter: EnvFilter, path: &Path) -> (BoxedLayer, WorkerGuard)
{
    let appender = tracing_appender::rolling::never(
        path.parent().unwrap_or(Path::new(".")),
        path.file_name().unwrap_or_default(),
    );
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let layer = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_ansi(false);
    let layer = match format {
        LogFormat::Pretty => layer.with_filter(filter).boxed(),
        LogFormat::Json => layer.json().with_span_list(true).with_filter(filter).boxed(),
    };
    (layer, guard)
}

/// Install the global subscriber
///
/// Returns the file writer's guard when file logging is on; keep it alive
/// until exit or buffered lines are lost.
///
/// ## Errors
///
/// `InitializationFailed` if a subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>, LoggingError>
{
    let mut layers = vec![stderr_layer(config.format, config.filter())];
    let guard = config.file.as_deref().map(|path| {
        let (layer, guard) = file_layer(config.format, config.filter(), path);
        layers.push(layer);
        guard
    });
    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;
    Ok(guard)
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

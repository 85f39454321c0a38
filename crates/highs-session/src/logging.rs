//! Structured logging setup.
//!
//! The library only emits `tracing` events; applications that do not bring
//! their own subscriber can call [`init_logging`].

use std::env;
use std::fs::{File, OpenOptions};
use std::io;
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter directive used when no level is given, e.g. `debug` or
/// `highs_session=trace`.
pub const TRACE_ENV: &str = "HIGHS_SESSION_TRACE";
/// `pretty` (default) or `json`.
pub const LOG_FORMAT_ENV: &str = "HIGHS_SESSION_LOG_FORMAT";
/// Optional file receiving a copy of every event.
pub const LOG_FILE_ENV: &str = "HIGHS_SESSION_LOG_FILE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggingError {
    InvalidFilter(String),
    InvalidFormat(String),
    LogFile { path: String, reason: String },
    Init(String),
}

impl LoggingError {
    pub fn code(&self) -> &'static str {
        match self {
            LoggingError::InvalidFilter(_) => "LOG_FILTER_INVALID",
            LoggingError::InvalidFormat(_) => "LOG_FORMAT_INVALID",
            LoggingError::LogFile { .. } => "LOG_FILE_UNAVAILABLE",
            LoggingError::Init(_) => "LOG_INIT_FAILED",
        }
    }
}

impl std::fmt::Display for LoggingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoggingError::InvalidFilter(reason) => {
                write!(f, "[{}] Invalid log filter: {}", self.code(), reason)
            }
            LoggingError::InvalidFormat(format) => write!(
                f,
                "[{}] Invalid {} '{}' (expected 'json' or 'pretty')",
                self.code(),
                LOG_FORMAT_ENV,
                format
            ),
            LoggingError::LogFile { path, reason } => write!(
                f,
                "[{}] Failed to open log file '{}': {}",
                self.code(),
                path,
                reason
            ),
            LoggingError::Init(reason) => {
                write!(f, "[{}] Failed to initialize logging: {}", self.code(), reason)
            }
        }
    }
}

impl std::error::Error for LoggingError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Result<Self, LoggingError> {
        if value.eq_ignore_ascii_case("pretty") {
            Ok(LogFormat::Pretty)
        } else if value.eq_ignore_ascii_case("json") {
            Ok(LogFormat::Json)
        } else {
            Err(LoggingError::InvalidFormat(value.to_string()))
        }
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

fn fmt_layer<W>(writer: W, format: LogFormat, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi);
    match format {
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

fn open_log_file(path: &str) -> Result<File, LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| LoggingError::LogFile {
            path: path.to_string(),
            reason: err.to_string(),
        })
}

fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    if level.eq_ignore_ascii_case("off") {
        Ok(EnvFilter::default().add_directive(LevelFilter::OFF.into()))
    } else {
        EnvFilter::try_new(level).map_err(|err| LoggingError::InvalidFilter(err.to_string()))
    }
}

/// Install a global subscriber.
///
/// When `level` is `None`, this reads `HIGHS_SESSION_TRACE` if set, and
/// defaults to `off` otherwise. Returns `Ok(true)` when logging is
/// initialized, `Ok(false)` if a subscriber is already configured.
pub fn init_logging(level: Option<&str>) -> Result<bool, LoggingError> {
    if tracing::dispatcher::has_been_set() {
        return Ok(false);
    }

    let level = level
        .map(str::to_string)
        .or_else(|| env::var(TRACE_ENV).ok())
        .unwrap_or_else(|| "off".to_string());
    let filter = build_filter(&level)?;
    let format = LogFormat::parse(
        &env::var(LOG_FORMAT_ENV).unwrap_or_else(|_| "pretty".to_string()),
    )?;

    let mut layers: Vec<BoxedLayer> = vec![fmt_layer(io::stderr, format, true)];
    if let Ok(path) = env::var(LOG_FILE_ENV) {
        let file = open_log_file(&path)?;
        layers.push(fmt_layer(Mutex::new(file), format, false));
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|err| LoggingError::Init(err.to_string()))?;
    Ok(true)
}

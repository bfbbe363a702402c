/// Structured logging for the petroleum supply monitoring service
///
/// Provides context-rich logging with data-source tags and series
/// identifiers on top of `tracing`. Supports console output and an
/// append-only log file for scheduled runs.

use crate::model::EiaError;
use std::fmt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use serde::Deserialize;
use thiserror::Error;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt as tfmt, EnvFilter};

/// Environment variable that overrides the configured level with a full
/// `tracing` filter directive (e.g. `petromon_service=debug`).
pub const LOG_FILTER_ENV: &str = "PETROMON_LOG";

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    #[serde(alias = "warn")]
    Warning,
    Error,
}

impl LogLevel {
    /// Filter directive understood by `EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Eia,
    Snapshot,
    Analysis,
    Chart,
    System,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Eia => write!(f, "EIA"),
            DataSource::Snapshot => write!(f, "SNAP"),
            DataSource::Analysis => write!(f, "ANALYSIS"),
            DataSource::Chart => write!(f, "CHART"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - e.g. no snapshot saved yet for a series
    Expected,
    /// Unexpected failure - indicates service degradation or configuration issue
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Setup
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("logger already initialized: {0}")]
    Init(String),
}

/// Initialize the global subscriber.
///
/// Console output goes to stderr so that reports printed on stdout stay
/// clean. When `log_file` is set, every event is also appended there
/// without ANSI colors. `PETROMON_LOG` takes precedence over `min_level`.
pub fn init_logger(min_level: LogLevel, log_file: Option<&Path>) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(min_level.as_directive()));

    let console = tfmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| LoggingError::LogFile {
                    path: path.to_path_buf(),
                    source,
                })?;
            Some(
                tfmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Log a general informational message
pub fn info(source: DataSource, series_id: Option<&str>, message: &str) {
    tracing::info!(source = %source, series = series_id.unwrap_or("-"), "{}", message);
}

/// Log a warning message
pub fn warn(source: DataSource, series_id: Option<&str>, message: &str) {
    tracing::warn!(source = %source, series = series_id.unwrap_or("-"), "{}", message);
}

/// Log an error message
pub fn error(source: DataSource, series_id: Option<&str>, message: &str) {
    tracing::error!(source = %source, series = series_id.unwrap_or("-"), "{}", message);
}

/// Log a debug message
pub fn debug(source: DataSource, series_id: Option<&str>, message: &str) {
    tracing::debug!(source = %source, series = series_id.unwrap_or("-"), "{}", message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a fetch or pipeline failure by its error variant
pub fn classify_eia_failure(err: &EiaError) -> FailureType {
    match err {
        // Replay mode before `fetch` has ever been run
        EiaError::Snapshot { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
            FailureType::Expected
        }
        // The API may lag a release, or the window may simply be too narrow
        EiaError::NoDataAvailable(_) | EiaError::EmptySeries(_) | EiaError::NoOverlap => {
            FailureType::Unknown
        }
        // Everything else points at the network, the key, or an API change
        _ => FailureType::Unexpected,
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a series failure with automatic classification
pub fn log_fetch_failure(source: DataSource, series_id: &str, operation: &str, err: &EiaError) {
    let failure_type = classify_eia_failure(err);

    let message = format!("{} failed [{}]: {}", operation, failure_type, err);

    match failure_type {
        FailureType::Expected => debug(source, Some(series_id), &message),
        FailureType::Unexpected => error(source, Some(series_id), &message),
        FailureType::Unknown => warn(source, Some(series_id), &message),
    }
}

// ---------------------------------------------------------------------------
// Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of a multi-series run (fetch, verify)
pub fn log_fetch_summary(source: DataSource, total: usize, successful: usize, failed: usize) {
    let message = format!(
        "Run complete: {}/{} successful, {} failed",
        successful, total, failed
    );

    if failed == 0 {
        info(source, None, &message);
    } else if successful == 0 {
        error(source, None, &message);
    } else {
        warn(source, None, &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn test_log_level_parses_common_spellings() {
        assert_eq!("warn".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert_eq!("WARNING".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert_eq!(" debug ".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert!("verbose".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Warning.as_directive(), "warn");
    }

    #[test]
    fn test_failure_classification() {
        let missing = EiaError::Snapshot {
            path: PathBuf::from("snapshots/wti_spot.json"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(classify_eia_failure(&missing), FailureType::Expected);

        let empty = EiaError::NoDataAvailable("total_supply".into());
        assert_eq!(classify_eia_failure(&empty), FailureType::Unknown);

        assert_eq!(classify_eia_failure(&EiaError::Http(500)), FailureType::Unexpected);
        assert_eq!(classify_eia_failure(&EiaError::MissingApiKey), FailureType::Unexpected);
    }

    #[test]
    fn test_logging_without_subscriber_is_a_no_op() {
        // No subscriber installed in unit tests; these must not panic.
        info(DataSource::System, None, "hello");
        log_fetch_failure(DataSource::Eia, "wti_spot", "fetch", &EiaError::Http(503));
        log_fetch_summary(DataSource::Eia, 2, 1, 1);
    }
}

//! Service configuration.
//!
//! Settings come from three layers, later ones winning:
//! 1. built-in defaults,
//! 2. a TOML file (`petromon.toml` in the working directory, or `--config`),
//! 3. the environment (`EIA_API_KEY`, optionally from a `.env` file).
//!
//! CLI flags are applied on top by the binary.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use crate::analysis::align::DEFAULT_TOLERANCE_DAYS;
use crate::freshness::DEFAULT_MAX_AGE_DAYS;
use crate::ingest::eia::{EIA_BASE_URL, MAX_PAGE_LENGTH};
use crate::logging::LogLevel;

pub const DEFAULT_CONFIG_FILE: &str = "petromon.toml";
pub const API_KEY_ENV: &str = "EIA_API_KEY";

/// Longest rolling window offered for trend smoothing, in weeks.
pub const MAX_ROLLING_WEEKS: usize = 12;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub eia: EiaConfig,
    pub analysis: AnalysisConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EiaConfig {
    /// Prefer the environment for this; a key in a committed file leaks.
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
    pub page_length: usize,
    /// Upper bound on pages per series, guarding against a bad `total`.
    pub max_pages: usize,
    /// Replay snapshots from this directory instead of calling the API.
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for EiaConfig {
    fn default() -> Self {
        EiaConfig {
            api_key: None,
            base_url: EIA_BASE_URL.to_string(),
            timeout_secs: 30,
            page_length: MAX_PAGE_LENGTH,
            max_pages: 20,
            snapshot_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Start of the single-series history views.
    pub history_start: NaiveDate,
    /// Default start of the supply vs price comparison.
    pub compare_start: NaiveDate,
    pub rolling_weeks: usize,
    pub tolerance_days: i64,
    pub max_age_days: i64,
    pub show_scatter: bool,
    /// Replaces the built-in event list when set.
    pub events_file: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            history_start: NaiveDate::from_ymd_opt(2012, 1, 1).unwrap_or_default(),
            compare_start: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or_default(),
            rolling_weeks: 1,
            tolerance_days: DEFAULT_TOLERANCE_DAYS,
            max_age_days: DEFAULT_MAX_AGE_DAYS,
            show_scatter: true,
            events_file: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            dir: PathBuf::from("output"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
            file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Parse TOML text without touching the environment.
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The API key, if one is configured and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.eia
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Overlay `EIA_API_KEY` when it is set and non-blank.
    pub fn apply_env_key(&mut self, env_key: Option<String>) {
        if let Some(key) = env_key.filter(|k| !k.trim().is_empty()) {
            self.eia.api_key = Some(key);
        }
    }

    /// Reject settings the pipeline cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let a = &self.analysis;
        if a.rolling_weeks == 0 || a.rolling_weeks > MAX_ROLLING_WEEKS {
            return Err(ConfigError::Invalid(format!(
                "analysis.rolling_weeks must be between 1 and {}, got {}",
                MAX_ROLLING_WEEKS, a.rolling_weeks
            )));
        }
        if a.tolerance_days < 0 {
            return Err(ConfigError::Invalid("analysis.tolerance_days must not be negative".into()));
        }
        if a.max_age_days < 0 {
            return Err(ConfigError::Invalid("analysis.max_age_days must not be negative".into()));
        }
        let e = &self.eia;
        if e.page_length == 0 || e.page_length > MAX_PAGE_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "eia.page_length must be between 1 and {}, got {}",
                MAX_PAGE_LENGTH, e.page_length
            )));
        }
        if e.max_pages == 0 {
            return Err(ConfigError::Invalid("eia.max_pages must be at least 1".into()));
        }
        if e.timeout_secs == 0 {
            return Err(ConfigError::Invalid("eia.timeout_secs must be at least 1".into()));
        }
        Ok(())
    }
}

/// Load configuration.
///
/// With an explicit `path` the file must exist. Without one,
/// `petromon.toml` is used if present and defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    dotenv::dotenv().ok();

    let file = match path {
        Some(p) => Some(p.to_path_buf()),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.exists().then_some(default)
        }
    };

    let mut config = match file {
        Some(p) => {
            let text = fs::read_to_string(&p).map_err(|source| ConfigError::Io {
                path: p.clone(),
                source,
            })?;
            AppConfig::from_toml_str(&text, &p)?
        }
        None => AppConfig::default(),
    };

    config.apply_env_key(env::var(API_KEY_ENV).ok());
    config.validate()?;
    Ok(config)
}

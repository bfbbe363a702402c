/// Core data types for the petroleum supply monitoring service.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no logic and no I/O: only types and the crate-wide fetch error.

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Field names
// ---------------------------------------------------------------------------

/// Row field holding the reporting period (e.g. "2024-05-03").
pub const FIELD_PERIOD: &str = "period";

/// Row field holding the numeric value. EIA sends it as a string, a number
/// or null depending on the dataset.
pub const FIELD_VALUE: &str = "value";

/// Fields every `response.data` row must carry to be usable.
pub const REQUIRED_FIELDS: &[&str] = &[FIELD_PERIOD, FIELD_VALUE];

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

/// A single row of an EIA API v2 `response.data` array, before cleaning.
///
/// `value` is kept as text so that cleaning can decide what is numeric;
/// the API mixes `"8812"`, `8812` and `null` across datasets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRecord {
    pub period: Option<String>,
    pub value: Option<String>,
    pub series: Option<String>,
    pub product_name: Option<String>,
    pub units: Option<String>,
}

impl RawRecord {
    /// Shorthand used heavily by tests and fixtures.
    pub fn new(period: &str, value: &str) -> Self {
        RawRecord {
            period: Some(period.to_string()),
            value: Some(value.to_string()),
            ..Default::default()
        }
    }
}

/// One cleaned weekly data point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub week: NaiveDate,
    pub value: f64,
}

impl Observation {
    pub fn new(week: NaiveDate, value: f64) -> Self {
        Observation { week, value }
    }
}

/// A week on which both supply and price are known, plus the smoothed values
/// used for plotting.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub week: NaiveDate,
    pub supply: f64,
    pub price: f64,
    pub supply_avg: Option<f64>,
    pub price_avg: Option<f64>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching or processing EIA data.
#[derive(Debug, Error)]
pub enum EiaError {
    /// Non-2xx HTTP response from the EIA API.
    #[error("HTTP error: {0}")]
    Http(u16),

    /// The request never produced a response (DNS, TLS, timeout).
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with an `error` object instead of data.
    #[error("EIA API error: {0}")]
    Api(String),

    /// The response body could not be deserialized.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Rows arrived without fields the pipeline depends on.
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    /// The series was requested but the API returned no rows for it.
    #[error("No data available for series: {0}")]
    NoDataAvailable(String),

    /// Nothing left after cleaning or filtering.
    #[error("Empty series: {0}")]
    EmptySeries(String),

    /// Supply and price share no week within the alignment tolerance.
    #[error("No overlapping weeks after matching supply and price")]
    NoOverlap,

    #[error("Start date {start} must be before end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Rolling window must be between 1 and 12 weeks, got {0}")]
    InvalidRollingWindow(usize),

    #[error("Missing EIA API key (set EIA_API_KEY or pass --api-key)")]
    MissingApiKey,

    #[error("Unknown series: {0}")]
    UnknownSeries(String),

    #[error("Snapshot {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A cleaned series violated the value schema.
    #[error(transparent)]
    Schema(#[from] crate::validation::SchemaError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_record_new_sets_period_and_value_only() {
        let r = RawRecord::new("2024-05-03", "8812");
        assert_eq!(r.period.as_deref(), Some("2024-05-03"));
        assert_eq!(r.value.as_deref(), Some("8812"));
        assert!(r.series.is_none());
        assert!(r.units.is_none());
    }

    #[test]
    fn test_error_messages_carry_context() {
        assert_eq!(EiaError::Http(403).to_string(), "HTTP error: 403");
        assert_eq!(
            EiaError::MissingFields(vec!["period".into(), "value".into()]).to_string(),
            "Missing required fields: period, value"
        );
        assert_eq!(
            EiaError::NoDataAvailable("wti_spot".into()).to_string(),
            "No data available for series: wti_spot"
        );
    }

    #[test]
    fn test_required_fields_cover_period_and_value() {
        assert!(REQUIRED_FIELDS.contains(&FIELD_PERIOD));
        assert!(REQUIRED_FIELDS.contains(&FIELD_VALUE));
    }
}

//! Historical event annotations for supply and price charts.
//!
//! Events are drawn as vertical reference lines. A built-in list covers the
//! shocks most often cited for U.S. petroleum demand; a TOML file can replace
//! it:
//!
//! ```toml
//! [[event]]
//! name = "COVID-19 declared a pandemic"
//! date = "2020-03-11"
//! description = "Travel collapses; gasoline and jet fuel demand fall sharply"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistoricalEvent {
    pub name: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
}

impl HistoricalEvent {
    pub fn new(name: &str, date: NaiveDate, description: &str) -> Self {
        HistoricalEvent {
            name: name.to_string(),
            date,
            description: Some(description.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EventsFile {
    #[serde(default, rename = "event")]
    events: Vec<HistoricalEvent>,
}

#[derive(Debug, Error)]
pub enum EventsError {
    #[error("cannot read events file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid events file {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

const BUILT_IN: &[(&str, (i32, u32, u32), &str)] = &[
    ("Lehman Brothers collapse", (2008, 9, 15), "Financial crisis deepens; demand and prices fall through year end"),
    ("OPEC holds output", (2014, 11, 27), "OPEC declines to cut production; the 2014-2016 price collapse accelerates"),
    ("Hurricane Harvey", (2017, 8, 25), "Gulf Coast refinery outages disrupt product supply"),
    ("COVID-19 declared a pandemic", (2020, 3, 11), "Lockdowns cut travel; product supplied drops to multi-decade lows"),
    ("WTI futures settle below zero", (2020, 4, 20), "Storage at Cushing nears capacity"),
    ("Russia invades Ukraine", (2022, 2, 24), "Crude prices spike above $100/bbl"),
    ("SPR emergency release", (2022, 3, 31), "180 million barrel Strategic Petroleum Reserve release announced"),
];

/// The built-in event list, in date order.
pub fn default_events() -> Vec<HistoricalEvent> {
    BUILT_IN
        .iter()
        .filter_map(|(name, (y, m, d), description)| {
            NaiveDate::from_ymd_opt(*y, *m, *d).map(|date| HistoricalEvent::new(name, date, description))
        })
        .collect()
}

/// Parse events from TOML text.
pub fn parse_events(text: &str, path: &Path) -> Result<Vec<HistoricalEvent>, EventsError> {
    let file: EventsFile = toml::from_str(text).map_err(|source| EventsError::Toml {
        path: path.to_path_buf(),
        source,
    })?;
    let mut events = file.events;
    events.sort_by_key(|e| e.date);
    Ok(events)
}

/// Load events from a TOML file with `[[event]]` tables.
pub fn load_events(path: &Path) -> Result<Vec<HistoricalEvent>, EventsError> {
    let text = fs::read_to_string(path).map_err(|source| EventsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_events(&text, path)
}

/// Events that fall inside `[start, end]`, sorted by date.
pub fn events_within(
    events: &[HistoricalEvent],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<HistoricalEvent> {
    let mut out: Vec<HistoricalEvent> = events
        .iter()
        .filter(|e| e.date >= start && e.date <= end)
        .cloned()
        .collect();
    out.sort_by_key(|e| e.date);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_default_events_are_sorted_and_complete() {
        let events = default_events();
        assert_eq!(events.len(), BUILT_IN.len());
        assert!(events.windows(2).all(|w| w[0].date <= w[1].date));
        assert!(events.iter().any(|e| e.name.contains("COVID-19")));
    }

    #[test]
    fn test_parse_events_from_toml() {
        let text = r#"
            [[event]]
            name = "Later"
            date = "2021-02-15"

            [[event]]
            name = "Earlier"
            date = "2019-09-14"
            description = "Abqaiq attack"
        "#;
        let events = parse_events(text, Path::new("events.toml")).expect("valid toml");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "Earlier");
        assert_eq!(events[0].description.as_deref(), Some("Abqaiq attack"));
        assert_eq!(events[1].description, None);
    }

    #[test]
    fn test_parse_events_rejects_bad_date() {
        let text = "[[event]]\nname = \"x\"\ndate = \"2021-13-40\"\n";
        assert!(matches!(
            parse_events(text, Path::new("events.toml")),
            Err(EventsError::Toml { .. })
        ));
    }

    #[test]
    fn test_empty_file_has_no_events() {
        assert!(parse_events("", Path::new("events.toml")).unwrap().is_empty());
    }

    #[test]
    fn test_events_within_range() {
        let inside = events_within(&default_events(), d("2020-01-01"), d("2020-12-31"));
        let names: Vec<_> = inside.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["COVID-19 declared a pandemic", "WTI futures settle below zero"]);
    }

    #[test]
    fn test_load_events_missing_file() {
        let err = load_events(Path::new("/nonexistent/events.toml")).unwrap_err();
        assert!(matches!(err, EventsError::Io { .. }));
    }
}

//! Value schema for cleaned weekly series.
//!
//! Product supplied volumes and spot prices are both non-negative. A
//! negative or non-finite value means the row was misread upstream, so the
//! whole series is rejected instead of being plotted.

use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;

use crate::model::Observation;

/// One value that broke the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub week: NaiveDate,
    pub value: f64,
    pub check: Check,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Finite,
    NonNegative,
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::Finite => write!(f, "finite"),
            Check::NonNegative => write!(f, "greater_than_or_equal_to(0)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", describe(.violations))]
pub struct SchemaError {
    /// Never empty.
    pub violations: Vec<Violation>,
}

fn describe(violations: &[Violation]) -> String {
    match violations.first() {
        Some(first) => format!(
            "schema check failed for {} value(s), first at {}: {} fails {}",
            violations.len(),
            first.week,
            first.value,
            first.check
        ),
        None => "schema check failed".to_string(),
    }
}

/// Validate every observation, collecting all violations.
pub fn validate_observations(obs: &[Observation]) -> Result<(), SchemaError> {
    let violations: Vec<Violation> = obs
        .iter()
        .filter_map(|o| {
            let check = if !o.value.is_finite() {
                Check::Finite
            } else if o.value < 0.0 {
                Check::NonNegative
            } else {
                return None;
            };
            Some(Violation {
                week: o.week,
                value: o.value,
                check,
            })
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(SchemaError { violations })
    }
}

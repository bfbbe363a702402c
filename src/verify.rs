//! Data Source Verification Module
//!
//! Checks every registered series against the live EIA API before a run:
//! is the route answering, does it return rows, and do the rows carry the
//! fields the pipeline needs. Requests are one small page per series.

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::ingest::eia::{self, DataPage};
use crate::logging::{self, DataSource};
use crate::model::{EiaError, REQUIRED_FIELDS};
use crate::series::{SeriesDefinition, SERIES_REGISTRY};

/// Rows requested per series when verifying.
pub const SAMPLE_LENGTH: usize = 5;

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub results: Vec<SeriesVerification>,
    pub summary: VerificationSummary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub working: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesVerification {
    pub series_id: String,
    pub name: String,
    pub status: VerificationStatus,
    pub api_responsive: bool,
    pub sample_data_count: usize,
    /// Row count the API reports across all pages.
    pub total_reported: Option<u64>,
    pub fields_missing: Vec<String>,
    pub units_seen: Vec<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum VerificationStatus {
    Success,
    PartialSuccess,
    Failed,
}

// ============================================================================
// Series Verification
// ============================================================================

/// Turn the outcome of a sample request into a verification result.
pub fn evaluate_sample(
    series: &SeriesDefinition,
    outcome: Result<DataPage, EiaError>,
) -> SeriesVerification {
    let mut result = SeriesVerification {
        series_id: series.id.to_string(),
        name: series.name.to_string(),
        status: VerificationStatus::Failed,
        api_responsive: false,
        sample_data_count: 0,
        total_reported: None,
        fields_missing: Vec::new(),
        units_seen: Vec::new(),
        error_message: None,
    };

    let page = match outcome {
        Ok(page) => page,
        Err(e) => {
            result.error_message = Some(format!("API request failed: {}", e));
            return result;
        }
    };

    result.api_responsive = true;
    result.sample_data_count = page.rows.len();
    result.total_reported = page.total;

    if page.rows.is_empty() {
        result.status = VerificationStatus::PartialSuccess;
        result.error_message = Some("API answered with no rows".to_string());
        return result;
    }

    for field in REQUIRED_FIELDS {
        if page.rows.iter().any(|row| !row.contains_key(*field)) {
            result.fields_missing.push(field.to_string());
        }
    }

    for row in &page.rows {
        if let Some(units) = row.get("units").and_then(|u| u.as_str()) {
            if !result.units_seen.iter().any(|seen| seen == units) {
                result.units_seen.push(units.to_string());
            }
        }
    }

    result.status = if result.fields_missing.is_empty() {
        VerificationStatus::Success
    } else {
        VerificationStatus::PartialSuccess
    };
    result
}

/// Request one small page of `series` and evaluate it.
pub fn verify_series(
    client: &reqwest::blocking::Client,
    base_url: &str,
    api_key: &str,
    series: &SeriesDefinition,
) -> SeriesVerification {
    let url = eia::build_data_url(base_url, api_key, series, 0, SAMPLE_LENGTH);
    evaluate_sample(series, eia::fetch_page(client, &url))
}

// ============================================================================
// Full Verification Runner
// ============================================================================

pub fn run_full_verification(config: &AppConfig) -> Result<VerificationReport, EiaError> {
    let api_key = config.api_key().ok_or(EiaError::MissingApiKey)?;
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(config.eia.timeout_secs))
        .build()?;

    let mut report = VerificationReport {
        timestamp: Utc::now().to_rfc3339(),
        results: Vec::new(),
        summary: VerificationSummary {
            total: SERIES_REGISTRY.len(),
            ..Default::default()
        },
    };

    println!("🔍 Verifying EIA series...");
    for series in SERIES_REGISTRY {
        print!("  {} ... ", series.id);
        let result = verify_series(&client, &config.eia.base_url, api_key, series);

        match result.status {
            VerificationStatus::Success => {
                println!("✓ OK ({} sample rows)", result.sample_data_count);
                report.summary.working += 1;
            }
            VerificationStatus::PartialSuccess => {
                if result.fields_missing.is_empty() {
                    println!("⚠ Responsive but no data");
                } else {
                    println!("⚠ Partial (missing: {:?})", result.fields_missing);
                }
                report.summary.working += 1;
            }
            VerificationStatus::Failed => {
                println!("✗ FAILED: {}", result.error_message.as_deref().unwrap_or("Unknown"));
                report.summary.failed += 1;
            }
        }

        report.results.push(result);
    }

    logging::log_fetch_summary(
        DataSource::Eia,
        report.summary.total,
        report.summary.working,
        report.summary.failed,
    );
    Ok(report)
}

pub fn success_rate(summary: &VerificationSummary) -> f64 {
    if summary.total > 0 {
        (summary.working as f64 / summary.total as f64) * 100.0
    } else {
        0.0
    }
}

pub fn print_summary(report: &VerificationReport) {
    let rule = "═".repeat(59);
    println!("\n{}", rule);
    println!("📊 VERIFICATION SUMMARY");
    println!("{}", rule);
    println!();
    for result in &report.results {
        let total = result
            .total_reported
            .map(|t| t.to_string())
            .unwrap_or_else(|| "?".to_string());
        println!(
            "{:<14} {:?}  ({} rows available, units: {})",
            result.series_id,
            result.status,
            total,
            if result.units_seen.is_empty() {
                "-".to_string()
            } else {
                result.units_seen.join(", ")
            }
        );
    }
    println!();
    println!(
        "Overall Success Rate: {:.1}% ({}/{})",
        success_rate(&report.summary),
        report.summary.working,
        report.summary.total
    );
    println!("{}", rule);
}

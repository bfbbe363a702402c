//! Metrics summaries and tabular exports.
//!
//! The text report mirrors the dashboard's headline metrics; the markdown
//! report is meant for committing next to the charts. Both end with the
//! caveats that apply to every reading of this data.

use std::io;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::freshness;
use crate::model::{ComparisonRow, Observation};
use crate::pipeline::Comparison;

/// Known unknowns printed with every report.
pub const CAVEATS: &[&str] = &[
    "Product supplied is a proxy for consumption, not a direct measure of it.",
    "Correlation describes association between the series, not causation.",
    "Weekly figures are estimates and are revised in later monthly data.",
];

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Round to a whole number and group thousands: 20512.6 -> "20,513".
pub fn format_thousands(v: f64) -> String {
    let rounded = v.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if rounded < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

fn fmt_opt(v: Option<f64>, f: impl Fn(f64) -> String) -> String {
    v.map(f).unwrap_or_else(|| "-".to_string())
}

// ---------------------------------------------------------------------------
// Dashboard metrics
// ---------------------------------------------------------------------------

/// Headline numbers for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub title: String,
    pub weeks: usize,
    pub first_week: Option<NaiveDate>,
    pub last_week: Option<NaiveDate>,
    /// Latest period as reported upstream; freshness is measured from here.
    pub data_through: Option<NaiveDate>,
    pub latest_supply: Option<f64>,
    pub latest_price: Option<f64>,
    pub correlation: Option<f64>,
    pub rolling_weeks: Option<usize>,
    pub stale: bool,
}

impl Dashboard {
    /// Metrics for a single series view.
    pub fn for_series(
        title: &str,
        obs: &[Observation],
        is_price: bool,
        max_age_days: i64,
        now: DateTime<Utc>,
    ) -> Self {
        let first_week = obs.iter().map(|o| o.week).min();
        let last_week = obs.iter().map(|o| o.week).max();
        let latest = crate::analysis::cleaning::latest_value(obs).ok();
        Dashboard {
            title: title.to_string(),
            weeks: obs.len(),
            first_week,
            last_week,
            data_through: last_week,
            latest_supply: if is_price { None } else { latest },
            latest_price: if is_price { latest } else { None },
            correlation: None,
            rolling_weeks: None,
            stale: last_week
                .map(|w| freshness::is_stale_at(w, max_age_days, now))
                .unwrap_or(true),
        }
    }

    /// Metrics for the supply vs price comparison.
    ///
    /// Rows carry anchored weeks, so `data_through` is the latest period the
    /// inputs were reported for (see `pipeline::latest_reported`). Without it
    /// the last row's week is used.
    pub fn for_comparison(
        title: &str,
        cmp: &Comparison,
        data_through: Option<NaiveDate>,
        max_age_days: i64,
        now: DateTime<Utc>,
    ) -> Self {
        let latest = cmp.latest();
        let last_week = latest.map(|r| r.week);
        let data_through = data_through.or(last_week);
        Dashboard {
            title: title.to_string(),
            weeks: cmp.rows.len(),
            first_week: cmp.rows.first().map(|r| r.week),
            last_week,
            data_through,
            latest_supply: latest.map(|r| r.supply),
            latest_price: latest.map(|r| r.price),
            correlation: cmp.correlation,
            rolling_weeks: Some(cmp.rolling_weeks),
            stale: data_through
                .map(|w| freshness::is_stale_at(w, max_age_days, now))
                .unwrap_or(true),
        }
    }

    fn range_text(&self) -> String {
        match (self.first_week, self.last_week) {
            (Some(a), Some(b)) => format!("{} to {}", a, b),
            _ => "-".to_string(),
        }
    }

    fn metric_lines(&self) -> Vec<(&'static str, String)> {
        let mut lines = vec![
            ("Weeks in dataset", format_thousands(self.weeks as f64)),
            ("Date range", self.range_text()),
        ];
        if let Some(reported) = self.data_through.filter(|d| Some(*d) != self.last_week) {
            lines.push(("Data reported through", reported.to_string()));
        }
        if self.latest_supply.is_some() {
            lines.push((
                "Latest total product supplied (kb/d)",
                fmt_opt(self.latest_supply, format_thousands),
            ));
        }
        if self.latest_price.is_some() {
            lines.push((
                "Latest WTI (USD/bbl)",
                fmt_opt(self.latest_price, |v| format!("{:.2}", v)),
            ));
        }
        if let Some(window) = self.rolling_weeks {
            lines.push((
                "Correlation (supply vs WTI)",
                fmt_opt(self.correlation, |v| format!("{:.2}", v)),
            ));
            lines.push(("Rolling average (weeks)", window.to_string()));
        }
        lines
    }

    pub fn render_text(&self) -> String {
        let mut out = format!("{}\n{}\n", self.title, "=".repeat(self.title.chars().count()));
        for (label, value) in self.metric_lines() {
            out.push_str(&format!("{:<38} {}\n", label, value));
        }
        if self.stale {
            out.push_str("\nWARNING: latest week is older than the freshness threshold\n");
        }
        out.push('\n');
        for caveat in CAVEATS {
            out.push_str(&format!("Note: {}\n", caveat));
        }
        out
    }

    pub fn render_markdown(&self, charts: &[(&str, &str)]) -> String {
        let mut md = format!("# {}\n\n", self.title);
        md.push_str("| Metric | Value |\n|---|---|\n");
        for (label, value) in self.metric_lines() {
            md.push_str(&format!("| {} | {} |\n", label, value));
        }
        if self.stale {
            md.push_str("\n> **Stale data:** the latest week is older than the freshness threshold.\n");
        }
        if !charts.is_empty() {
            md.push_str("\n## Charts\n\n");
            for (caption, file) in charts {
                md.push_str(&format!("![{}]({})\n\n", caption, file));
            }
        }
        md.push_str("\n## Known unknowns\n\n");
        for caveat in CAVEATS {
            md.push_str(&format!("- {}\n", caveat));
        }
        md
    }
}

// ---------------------------------------------------------------------------
// CSV export
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ObservationCsvRow {
    week: NaiveDate,
    value: f64,
}

#[derive(Serialize)]
struct ComparisonCsvRow {
    week: NaiveDate,
    total_product_supplied: f64,
    wti_usd_per_bbl: f64,
    supply_rolling: Option<f64>,
    wti_rolling: Option<f64>,
}

impl From<&ComparisonRow> for ComparisonCsvRow {
    fn from(r: &ComparisonRow) -> Self {
        ComparisonCsvRow {
            week: r.week,
            total_product_supplied: r.supply,
            wti_usd_per_bbl: r.price,
            supply_rolling: r.supply_avg,
            wti_rolling: r.price_avg,
        }
    }
}

/// Write `week,value` rows, newest first as in the dashboard table.
pub fn write_observations_csv<W: io::Write>(writer: W, obs: &[Observation]) -> Result<(), csv::Error> {
    let mut sorted = obs.to_vec();
    sorted.sort_by(|a, b| b.week.cmp(&a.week));
    let mut wtr = csv::Writer::from_writer(writer);
    for o in &sorted {
        wtr.serialize(ObservationCsvRow {
            week: o.week,
            value: o.value,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the merged comparison table in week order.
pub fn write_comparison_csv<W: io::Write>(writer: W, rows: &[ComparisonRow]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(ComparisonCsvRow::from(row))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Convenience wrapper writing observations to a file path.
pub fn save_observations_csv(path: &Path, obs: &[Observation]) -> Result<(), csv::Error> {
    let file = std::fs::File::create(path)?;
    write_observations_csv(file, obs)
}

/// Convenience wrapper writing comparison rows to a file path.
pub fn save_comparison_csv(path: &Path, rows: &[ComparisonRow]) -> Result<(), csv::Error> {
    let file = std::fs::File::create(path)?;
    write_comparison_csv(file, rows)
}

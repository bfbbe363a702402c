//! Offline pipeline tests
//!
//! Runs the whole flow on snapshot fixtures written to a temp directory:
//! replay -> clean/aggregate -> align -> charts -> report -> CSV.
//! No network or API key needed.
//!
//! Run with: cargo test --test pipeline_integration

use std::fs;
use std::path::Path;

use chrono::{NaiveDate, TimeZone, Utc};

use petromon_service::chart::{DualAxisChart, LineChart, ScatterChart};
use petromon_service::events::{default_events, events_within};
use petromon_service::ingest::{snapshot, SeriesSource};
use petromon_service::logging::{classify_eia_failure, FailureType};
use petromon_service::model::EiaError;
use petromon_service::pipeline::{compare, latest_reported, prepare_series, DateWindow, WeekAnchor};
use petromon_service::report::{save_comparison_csv, Dashboard};
use petromon_service::series::{require_series, TOTAL_SUPPLY_ID, WTI_SPOT_ID};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Two products per week, as `petroleum/cons/wpsup` returns them, plus a
/// withheld value.
const SUPPLY_BODY: &str = r#"{
    "response": {
        "total": 7,
        "frequency": "weekly",
        "data": [
            {"period": "2020-03-06", "product-name": "Finished Motor Gasoline", "value": 9000, "units": "MBBL/D"},
            {"period": "2020-03-06", "product-name": "Other Oils", "value": 11000, "units": "MBBL/D"},
            {"period": "2020-03-13", "product-name": "Finished Motor Gasoline", "value": 8800, "units": "MBBL/D"},
            {"period": "2020-03-13", "product-name": "Other Oils", "value": 10900, "units": "MBBL/D"},
            {"period": "2020-03-20", "product-name": "Finished Motor Gasoline", "value": 8000, "units": "MBBL/D"},
            {"period": "2020-03-20", "product-name": "Other Oils", "value": 10000, "units": "MBBL/D"},
            {"period": "2020-03-20", "product-name": "Kerosene", "value": null, "units": "MBBL/D"}
        ]
    }
}"#;

const WTI_BODY: &str = r#"{
    "response": {
        "total": "3",
        "frequency": "weekly",
        "data": [
            {"period": "2020-03-06", "series": "RWTC", "value": "45.90", "units": "$/BBL"},
            {"period": "2020-03-13", "series": "RWTC", "value": "32.91", "units": "$/BBL"},
            {"period": "2020-03-20", "series": "RWTC", "value": "25.22", "units": "$/BBL"}
        ]
    }
}"#;

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn write_fixtures(dir: &Path) {
    fs::write(dir.join("total_supply.json"), SUPPLY_BODY).expect("write supply fixture");
    fs::write(dir.join("wti_spot.json"), WTI_BODY).expect("write wti fixture");
}

fn march_2020() -> DateWindow {
    DateWindow::between(d("2020-03-01"), d("2020-03-31"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_supply_history_from_snapshot() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixtures(dir.path());
    let source = SeriesSource::replay(dir.path());
    let supply = require_series(TOTAL_SUPPLY_ID).unwrap();

    let records = source.fetch(supply).expect("replay supply");
    assert_eq!(records.len(), 7);

    let obs = prepare_series(supply, &records, DateWindow::since(d("2012-01-01")), WeekAnchor::AsReported)
        .expect("prepare supply");
    let values: Vec<f64> = obs.iter().map(|o| o.value).collect();
    assert_eq!(values, vec![20000.0, 19700.0, 18000.0]);
    assert_eq!(obs[2].week, d("2020-03-20"));

    let chart = LineChart {
        title: supply.name.to_string(),
        x_label: "Week".into(),
        y_label: supply.value_label.into(),
        points: obs.iter().map(|o| (o.week, o.value)).collect(),
        events: events_within(&default_events(), obs[0].week, obs[2].week),
    };
    let svg = chart.render().expect("line chart");
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("COVID-19 declared a pandemic"));
    assert!(!svg.contains("No data"));
}

#[test]
fn test_compare_supply_and_price() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixtures(dir.path());
    let source = SeriesSource::replay(dir.path());
    let supply_def = require_series(TOTAL_SUPPLY_ID).unwrap();
    let price_def = require_series(WTI_SPOT_ID).unwrap();

    let supply_records = source.fetch(supply_def).unwrap();
    let price_records = source.fetch(price_def).unwrap();
    let supply = prepare_series(supply_def, &supply_records, march_2020(), WeekAnchor::WeekStart).unwrap();
    let price = prepare_series(price_def, &price_records, march_2020(), WeekAnchor::WeekStart).unwrap();

    let cmp = compare(&supply, &price, 2, 7).expect("series overlap");
    let weeks: Vec<NaiveDate> = cmp.rows.iter().map(|r| r.week).collect();
    assert_eq!(weeks, vec![d("2020-03-02"), d("2020-03-09"), d("2020-03-16")]);
    assert_eq!(cmp.rows[0].supply_avg, None);
    assert_eq!(cmp.rows[1].supply_avg, Some(19850.0));
    assert!((cmp.rows[2].price_avg.unwrap() - 29.065).abs() < 1e-9);

    let r = cmp.correlation.expect("correlation");
    assert!(r > 0.8 && r <= 1.0, "r = {}", r);

    let trend = DualAxisChart {
        title: "Total product supplied vs WTI".into(),
        x_label: "Week".into(),
        left_label: supply_def.value_label.into(),
        right_label: price_def.value_label.into(),
        left: cmp.rows.iter().map(|r| (r.week, r.supply)).collect(),
        right: cmp.rows.iter().map(|r| (r.week, r.price)).collect(),
        events: events_within(&default_events(), d("2020-03-01"), d("2020-03-31")),
    }
    .render()
    .expect("trend chart");
    assert!(trend.contains(supply_def.value_label));
    assert!(trend.contains("WTI spot price (USD/barrel)"));

    let scatter = ScatterChart {
        title: "Supply vs WTI".into(),
        x_label: price_def.value_label.into(),
        y_label: supply_def.value_label.into(),
        points: cmp.rows.iter().map(|r| (r.price, r.supply)).collect(),
    }
    .render()
    .expect("scatter chart");
    assert_eq!(scatter.matches("<circle").count(), 3);

    let data_through = latest_reported(&supply_records, march_2020(), WeekAnchor::WeekStart)
        .min(latest_reported(&price_records, march_2020(), WeekAnchor::WeekStart));
    assert_eq!(data_through, Some(d("2020-03-20")));

    // 17 days after the last anchored Monday, 13 after the reported Friday
    let now = Utc.with_ymd_and_hms(2020, 4, 2, 12, 0, 0).unwrap();
    let dashboard = Dashboard::for_comparison("Supply vs WTI", &cmp, data_through, 14, now);
    assert!(!dashboard.stale);
    let text = dashboard.render_text();
    assert!(text.contains("18,000"));
    assert!(text.contains("25.22"));
}

#[test]
fn test_comparison_csv_export() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixtures(dir.path());
    let source = SeriesSource::replay(dir.path());
    let supply_def = require_series(TOTAL_SUPPLY_ID).unwrap();
    let price_def = require_series(WTI_SPOT_ID).unwrap();

    let supply =
        prepare_series(supply_def, &source.fetch(supply_def).unwrap(), march_2020(), WeekAnchor::WeekStart)
            .unwrap();
    let price =
        prepare_series(price_def, &source.fetch(price_def).unwrap(), march_2020(), WeekAnchor::WeekStart)
            .unwrap();
    let cmp = compare(&supply, &price, 1, 7).unwrap();

    let csv_path = dir.path().join("compare.csv");
    save_comparison_csv(&csv_path, &cmp.rows).expect("write csv");
    let text = fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[1].starts_with("2020-03-02,20000.0,45.9,"));
}

#[test]
fn test_snapshot_copy_replays_identically() {
    let original = tempfile::tempdir().expect("tempdir");
    let copy = tempfile::tempdir().expect("tempdir");
    write_fixtures(original.path());
    let wti = require_series(WTI_SPOT_ID).unwrap();

    let rows = SeriesSource::replay(original.path()).fetch_rows(wti).unwrap();
    snapshot::save_snapshot(copy.path(), wti.id, &rows).expect("save snapshot");

    let a = SeriesSource::replay(original.path()).fetch(wti).unwrap();
    let b = SeriesSource::replay(copy.path()).fetch(wti).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_window_without_data_is_empty_series() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixtures(dir.path());
    let wti = require_series(WTI_SPOT_ID).unwrap();
    let records = SeriesSource::replay(dir.path()).fetch(wti).unwrap();

    let result = prepare_series(
        wti,
        &records,
        DateWindow::between(d("2021-01-01"), d("2021-06-30")),
        WeekAnchor::WeekStart,
    );
    assert!(matches!(result, Err(EiaError::EmptySeries(_))));
}

#[test]
fn test_missing_snapshot_is_expected_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let supply = require_series(TOTAL_SUPPLY_ID).unwrap();
    let err = SeriesSource::replay(dir.path()).fetch(supply).unwrap_err();
    assert!(matches!(err, EiaError::Snapshot { .. }));
    assert_eq!(classify_eia_failure(&err), FailureType::Expected);
}

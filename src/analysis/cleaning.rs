//! Row cleaning, weekly bucketing and simple series queries.
//!
//! Rows that do not parse are dropped rather than failing the run: EIA
//! occasionally publishes placeholder periods or withheld values, and one bad
//! row should not hide years of good data.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Weekday};

use crate::model::{EiaError, Observation, RawRecord};

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse an EIA period.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps (date part is kept) and
/// `YYYY-MM`, which maps to the first of the month.
pub fn parse_period(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d").ok()
}

/// Coerce a value to a finite number. Empty, non-numeric, NaN and infinite
/// inputs all become `None`.
pub fn coerce_value(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Turn raw rows into observations, dropping rows whose period or value
/// cannot be parsed. Input order is preserved.
pub fn build_observations(records: &[RawRecord]) -> Vec<Observation> {
    records
        .iter()
        .filter_map(|r| {
            let week = parse_period(r.period.as_deref()?)?;
            let value = coerce_value(r.value.as_deref()?)?;
            Some(Observation::new(week, value))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Filtering and queries
// ---------------------------------------------------------------------------

/// Keep observations on or after `start`.
pub fn filter_since(obs: &[Observation], start: NaiveDate) -> Vec<Observation> {
    obs.iter().copied().filter(|o| o.week >= start).collect()
}

/// Keep observations with `start <= week <= end`.
pub fn filter_range(obs: &[Observation], start: NaiveDate, end: NaiveDate) -> Vec<Observation> {
    obs.iter()
        .copied()
        .filter(|o| o.week >= start && o.week <= end)
        .collect()
}

/// Value at the most recent week, whatever the input order.
///
/// When several observations share the latest week the first one wins.
pub fn latest_value(obs: &[Observation]) -> Result<f64, EiaError> {
    let mut latest: Option<&Observation> = None;
    for o in obs {
        match latest {
            Some(best) if o.week <= best.week => {}
            _ => latest = Some(o),
        }
    }
    latest
        .map(|o| o.value)
        .ok_or_else(|| EiaError::EmptySeries("no observations to take the latest value from".into()))
}

/// Sum observations that share a week. Output is sorted by week.
pub fn sum_by_week(obs: &[Observation]) -> Vec<Observation> {
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for o in obs {
        *totals.entry(o.week).or_insert(0.0) += o.value;
    }
    totals
        .into_iter()
        .map(|(week, value)| Observation::new(week, value))
        .collect()
}

/// Keep one observation per week, the last one seen. Output is sorted by week.
pub fn last_by_week(obs: &[Observation]) -> Vec<Observation> {
    let mut latest: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for o in obs {
        latest.insert(o.week, o.value);
    }
    latest
        .into_iter()
        .map(|(week, value)| Observation::new(week, value))
        .collect()
}

// ---------------------------------------------------------------------------
// Week anchoring
// ---------------------------------------------------------------------------

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// The Friday on or after `date`. EIA weekly stocks and supply are reported
/// for weeks ending Friday.
pub fn week_ending_friday(date: NaiveDate) -> NaiveDate {
    let today = date.weekday().num_days_from_monday() as i64;
    let friday = Weekday::Fri.num_days_from_monday() as i64;
    date + Duration::days((friday - today).rem_euclid(7))
}

/// Move every observation to the Monday of its week. Series published on
/// different weekdays line up after this.
pub fn anchor_to_week_start(obs: &[Observation]) -> Vec<Observation> {
    obs.iter()
        .map(|o| Observation::new(week_start(o.week), o.value))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn obs(week: &str, value: f64) -> Observation {
        Observation::new(d(week), value)
    }

    #[test]
    fn test_build_observations_drops_bad_rows() {
        // valid row, invalid date, invalid value
        let records = vec![
            RawRecord::new("2012-01-06", "100"),
            RawRecord::new("not-a-date", "200"),
            RawRecord::new("2012-01-13", "not-a-number"),
        ];
        let out = build_observations(&records);
        assert_eq!(out, vec![obs("2012-01-06", 100.0)]);
    }

    #[test]
    fn test_build_observations_drops_missing_fields() {
        let records = vec![
            RawRecord { period: None, value: Some("1".into()), ..Default::default() },
            RawRecord { period: Some("2012-01-06".into()), value: None, ..Default::default() },
        ];
        assert!(build_observations(&records).is_empty());
    }

    #[test]
    fn test_coerce_value_rejects_non_finite_and_blank() {
        assert_eq!(coerce_value(" 10 "), Some(10.0));
        assert_eq!(coerce_value("8812.5"), Some(8812.5));
        assert_eq!(coerce_value("NaN"), None);
        assert_eq!(coerce_value("inf"), None);
        assert_eq!(coerce_value(""), None);
        assert_eq!(coerce_value("W"), None);
    }

    #[test]
    fn test_parse_period_formats() {
        assert_eq!(parse_period("2024-05-03"), Some(d("2024-05-03")));
        assert_eq!(parse_period("2024-05-03T00:00:00Z"), Some(d("2024-05-03")));
        assert_eq!(parse_period("2024-05"), Some(d("2024-05-01")));
        assert_eq!(parse_period("2024-13-01"), None);
        assert_eq!(parse_period(""), None);
    }

    #[test]
    fn test_filter_since_keeps_2012_and_after() {
        let data = vec![obs("2011-12-30", 1.0), obs("2012-01-06", 2.0)];
        let out = filter_since(&data, d("2012-01-01"));
        assert_eq!(out, vec![obs("2012-01-06", 2.0)]);
    }

    #[test]
    fn test_filter_range_is_inclusive() {
        let data = vec![
            obs("2020-01-03", 1.0),
            obs("2020-01-10", 2.0),
            obs("2020-01-17", 3.0),
            obs("2020-01-24", 4.0),
        ];
        let out = filter_range(&data, d("2020-01-10"), d("2020-01-17"));
        assert_eq!(out, vec![obs("2020-01-10", 2.0), obs("2020-01-17", 3.0)]);
    }

    #[test]
    fn test_latest_value_ignores_input_order() {
        let data = vec![
            obs("2012-01-13", 300.0),
            obs("2012-01-06", 100.0),
            obs("2012-01-20", 500.0),
        ];
        assert_eq!(latest_value(&data).unwrap(), 500.0);
    }

    #[test]
    fn test_latest_value_first_wins_on_tie() {
        let data = vec![obs("2012-01-20", 1.0), obs("2012-01-20", 2.0)];
        assert_eq!(latest_value(&data).unwrap(), 1.0);
    }

    #[test]
    fn test_latest_value_errors_on_empty() {
        assert!(matches!(latest_value(&[]), Err(EiaError::EmptySeries(_))));
    }

    #[test]
    fn test_sum_by_week_sums_duplicates() {
        let data = vec![
            obs("2012-01-13", 3.0),
            obs("2012-01-06", 10.0),
            obs("2012-01-06", 7.0),
        ];
        let out = sum_by_week(&data);
        assert_eq!(out, vec![obs("2012-01-06", 17.0), obs("2012-01-13", 3.0)]);
    }

    #[test]
    fn test_last_by_week_keeps_last_seen() {
        let data = vec![obs("2012-01-06", 10.0), obs("2012-01-06", 7.0)];
        assert_eq!(last_by_week(&data), vec![obs("2012-01-06", 7.0)]);
    }

    #[test]
    fn test_week_ending_friday() {
        // Tuesday -> the same week's Friday
        assert_eq!(week_ending_friday(d("2012-01-03")), d("2012-01-06"));
        // Friday stays put
        assert_eq!(week_ending_friday(d("2012-01-06")), d("2012-01-06"));
        // Saturday rolls to the next Friday
        assert_eq!(week_ending_friday(d("2012-01-07")), d("2012-01-13"));
    }

    #[test]
    fn test_week_start_is_monday() {
        assert_eq!(week_start(d("2024-05-03")), d("2024-04-29")); // Friday
        assert_eq!(week_start(d("2024-04-29")), d("2024-04-29")); // Monday
        assert_eq!(week_start(d("2024-05-05")), d("2024-04-29")); // Sunday
    }

    #[test]
    fn test_anchor_to_week_start_lines_up_weekdays() {
        let supply = anchor_to_week_start(&[obs("2024-05-03", 1.0)]);
        let price = anchor_to_week_start(&[obs("2024-04-30", 2.0)]);
        assert_eq!(supply[0].week, price[0].week);
    }
}

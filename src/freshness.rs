/// Weekly data staleness detection.
///
/// EIA publishes the Weekly Petroleum Status Report on Wednesdays for the
/// week ending the previous Friday. A series whose newest week falls far
/// behind that cadence usually means a delayed release or a broken fetch,
/// and the report flags it so a stale chart is not mistaken for a current one.
///
/// # Clock injection
/// `is_stale_at` takes `now` as a parameter rather than calling `Utc::now()`
/// internally, so tests stay deterministic.

use chrono::{DateTime, NaiveDate, Utc};

/// One weekly release plus one missed week.
pub const DEFAULT_MAX_AGE_DAYS: i64 = 14;

/// Age of `latest_week` in whole days relative to `now`.
pub fn age_days_at(latest_week: NaiveDate, now: DateTime<Utc>) -> i64 {
    (now.date_naive() - latest_week).num_days()
}

/// Returns `true` if `latest_week` is older than `max_age_days`.
///
/// Staleness is strictly greater than the threshold:
///   age > max_age_days  ->  stale
///   age == max_age_days ->  not stale
pub fn is_stale_at(latest_week: NaiveDate, max_age_days: i64, now: DateTime<Utc>) -> bool {
    age_days_at(latest_week, now) > max_age_days
}

/// Convenience wrapper that uses the real current time.
pub fn is_stale(latest_week: NaiveDate, max_age_days: i64) -> bool {
    is_stale_at(latest_week, max_age_days, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// Wednesday 2024-05-08 15:00 UTC, a typical release afternoon.
    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 8, 15, 0, 0).unwrap()
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_last_friday_is_not_stale() {
        assert!(!is_stale_at(d("2024-05-03"), DEFAULT_MAX_AGE_DAYS, fixed_now()));
    }

    #[test]
    fn test_exactly_at_threshold_is_not_stale() {
        // 2024-04-24 is 14 days before 2024-05-08
        assert_eq!(age_days_at(d("2024-04-24"), fixed_now()), 14);
        assert!(!is_stale_at(d("2024-04-24"), 14, fixed_now()));
    }

    #[test]
    fn test_one_day_past_threshold_is_stale() {
        assert!(is_stale_at(d("2024-04-23"), 14, fixed_now()));
    }

    #[test]
    fn test_same_week_stale_under_tight_threshold_not_under_loose() {
        let week = d("2024-04-26"); // 12 days old
        assert!(is_stale_at(week, 7, fixed_now()));
        assert!(!is_stale_at(week, 14, fixed_now()));
    }

    #[test]
    fn test_future_week_is_never_stale() {
        assert!(!is_stale_at(d("2024-05-10"), 0, fixed_now()));
    }
}

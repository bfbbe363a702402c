//! From raw API rows to chart-ready series.
//!
//! `prepare_series` turns one dataset into a clean weekly series;
//! `compare` pairs supply with price and derives the smoothed lines and the
//! correlation shown on the dashboard.

use chrono::NaiveDate;

use crate::analysis::align::align_nearest;
use crate::analysis::cleaning::{
    anchor_to_week_start, build_observations, filter_range, filter_since, last_by_week,
    sum_by_week, week_start,
};
use crate::analysis::stats::{pearson, rolling_mean};
use crate::config::MAX_ROLLING_WEEKS;
use crate::logging::{self, DataSource};
use crate::model::{ComparisonRow, EiaError, Observation, RawRecord};
use crate::series::{Aggregation, SeriesDefinition};
use crate::validation::validate_observations;

/// Inclusive date window. An open end means "up to the latest week".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    pub fn since(start: NaiveDate) -> Self {
        DateWindow { start, end: None }
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        DateWindow {
            start,
            end: Some(end),
        }
    }

    /// A closed window must start strictly before it ends.
    pub fn validate(&self) -> Result<(), EiaError> {
        match self.end {
            Some(end) if self.start >= end => Err(EiaError::InvalidDateRange {
                start: self.start,
                end,
            }),
            _ => Ok(()),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && self.end.is_none_or(|end| date <= end)
    }

    fn apply(&self, obs: &[Observation]) -> Vec<Observation> {
        match self.end {
            Some(end) => filter_range(obs, self.start, end),
            None => filter_since(obs, self.start),
        }
    }
}

/// Which date represents a week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekAnchor {
    /// Keep the period EIA reported (week ending Friday for most series).
    AsReported,
    /// Move to the Monday of the week so different series line up.
    WeekStart,
}

/// Clean, aggregate, filter and validate one series.
pub fn prepare_series(
    series: &SeriesDefinition,
    records: &[RawRecord],
    window: DateWindow,
    anchor: WeekAnchor,
) -> Result<Vec<Observation>, EiaError> {
    window.validate()?;

    let mut obs = build_observations(records);
    let dropped = records.len() - obs.len();
    if dropped > 0 {
        logging::debug(
            DataSource::Analysis,
            Some(series.id),
            &format!("dropped {} unparseable rows of {}", dropped, records.len()),
        );
    }

    if anchor == WeekAnchor::WeekStart {
        obs = anchor_to_week_start(&obs);
    }

    let weekly = match series.aggregation {
        Aggregation::SumByWeek => sum_by_week(&obs),
        Aggregation::Single => last_by_week(&obs),
    };

    let filtered = window.apply(&weekly);
    if filtered.is_empty() {
        return Err(EiaError::EmptySeries(format!(
            "{} has no weeks from {}",
            series.id, window.start
        )));
    }

    validate_observations(&filtered)?;
    Ok(filtered)
}

/// Latest period as EIA reported it, among the rows `prepare_series` keeps
/// for the same window and anchor. Freshness is judged on this date: a
/// Monday anchor is up to four days earlier than the data it stands for.
pub fn latest_reported(records: &[RawRecord], window: DateWindow, anchor: WeekAnchor) -> Option<NaiveDate> {
    build_observations(records)
        .into_iter()
        .filter(|o| {
            let key = match anchor {
                WeekAnchor::AsReported => o.week,
                WeekAnchor::WeekStart => week_start(o.week),
            };
            window.contains(key)
        })
        .map(|o| o.week)
        .max()
}

/// Supply and price paired week by week.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub rows: Vec<ComparisonRow>,
    /// Correlation of the unsmoothed aligned values.
    pub correlation: Option<f64>,
    pub rolling_weeks: usize,
}

impl Comparison {
    pub fn supply_values(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.supply).collect()
    }

    pub fn price_values(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.price).collect()
    }

    pub fn latest(&self) -> Option<&ComparisonRow> {
        self.rows.last()
    }
}

/// Align supply with price and add rolling means.
pub fn compare(
    supply: &[Observation],
    price: &[Observation],
    rolling_weeks: usize,
    tolerance_days: i64,
) -> Result<Comparison, EiaError> {
    if rolling_weeks == 0 || rolling_weeks > MAX_ROLLING_WEEKS {
        return Err(EiaError::InvalidRollingWindow(rolling_weeks));
    }

    let aligned = align_nearest(supply, price, tolerance_days);
    if aligned.is_empty() {
        return Err(EiaError::NoOverlap);
    }

    let supply_values: Vec<f64> = aligned.iter().map(|p| p.left).collect();
    let price_values: Vec<f64> = aligned.iter().map(|p| p.right).collect();
    let supply_avg = rolling_mean(&supply_values, rolling_weeks);
    let price_avg = rolling_mean(&price_values, rolling_weeks);
    let correlation = pearson(&supply_values, &price_values);

    let rows = aligned
        .iter()
        .zip(supply_avg)
        .zip(price_avg)
        .map(|((p, s_avg), p_avg)| ComparisonRow {
            week: p.week,
            supply: p.left,
            price: p.right,
            supply_avg: s_avg,
            price_avg: p_avg,
        })
        .collect();

    logging::info(
        DataSource::Analysis,
        None,
        &format!(
            "aligned {} weeks (supply {}, price {})",
            aligned.len(),
            supply.len(),
            price.len()
        ),
    );

    Ok(Comparison {
        rows,
        correlation,
        rolling_weeks,
    })
}

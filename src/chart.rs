//! SVG rendering for the weekly charts.
//!
//! Three chart kinds cover the reports: a single-series line chart with
//! optional event markers, a dual-axis trend chart for supply against price,
//! and a scatter chart of the aligned pairs. Drawing goes through plotters'
//! SVG backend, so each chart is a self-contained SVG document.

use chrono::{Days, NaiveDate};
use plotters::coord::Shift;
use plotters::coord::types::RangedCoordf64;
use plotters::element::DashedPathElement;
use plotters::prelude::*;
use thiserror::Error;

use crate::events::HistoricalEvent;
use crate::report::format_thousands;

pub const WIDTH: u32 = 960;
pub const HEIGHT: u32 = 540;

const PRIMARY: RGBColor = RGBColor(0x1f, 0x77, 0xb4);
const SECONDARY: RGBColor = RGBColor(0xff, 0x7f, 0x0e);
const EVENT: RGBColor = RGBColor(0xd6, 0x27, 0x28);

const FONT: &str = "sans-serif";

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("chart rendering failed: {0}")]
    Render(#[from] DrawingAreaErrorKind<std::io::Error>),
}

type Area<'a> = DrawingArea<SVGBackend<'a>, Shift>;

/// Human-friendly tick label.
pub fn format_tick(v: f64) -> String {
    if v.abs() >= 1000.0 {
        format_thousands(v)
    } else if v.fract() == 0.0 {
        format!("{:.0}", v)
    } else {
        format!("{:.1}", v)
    }
}

fn format_date_tick(date: &NaiveDate, long_span: bool) -> String {
    if long_span {
        date.format("%Y").to_string()
    } else {
        date.format("%Y-%m").to_string()
    }
}

/// Runs `draw` against a fresh white canvas and returns the SVG text.
fn render_svg<F>(draw: F) -> Result<String, ChartError>
where
    F: FnOnce(&Area<'_>) -> Result<(), ChartError>,
{
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE)?;
        draw(&root)?;
        root.present()?;
    }
    Ok(svg)
}

fn no_data(root: &Area<'_>, title: &str) -> Result<(), ChartError> {
    let area = root.titled(title, (FONT, 22))?;
    area.draw(&Text::new(
        "No data",
        (WIDTH as i32 / 2 - 30, HEIGHT as i32 / 2 - 30),
        (FONT, 16).into_font().color(&RGBColor(0x88, 0x88, 0x88)),
    ))?;
    Ok(())
}

/// Finite min/max with 5% head room. A flat series is widened by one unit
/// either side so the axis has a non-zero span.
fn padded_extent(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            None => Some((v, v)),
        })?;
    if hi == lo {
        return Some((lo - 1.0, hi + 1.0));
    }
    let pad = (hi - lo) * 0.05;
    Some((lo - pad, hi + pad))
}

/// First and last date, padded when there is a single week so the time
/// axis is never empty.
fn date_extent(dates: impl Iterator<Item = NaiveDate>) -> Option<(NaiveDate, NaiveDate)> {
    let (first, last) = dates.fold(None, |acc: Option<(NaiveDate, NaiveDate)>, d| match acc {
        Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
        None => Some((d, d)),
    })?;
    if first < last {
        return Some((first, last));
    }
    Some((
        first.checked_sub_days(Days::new(3)).unwrap_or(first),
        last.checked_add_days(Days::new(3)).unwrap_or(last),
    ))
}

fn long_span(start: NaiveDate, end: NaiveDate) -> bool {
    (end - start).num_days() > 3 * 365
}

fn finite_points(points: &[(NaiveDate, f64)]) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
    points.iter().copied().filter(|(_, v)| v.is_finite())
}

/// Dashed vertical rules with a rotated label for events inside `[start, end]`.
fn draw_events(
    chart: &mut ChartContext<'_, SVGBackend<'_>, Cartesian2d<RangedDate<NaiveDate>, RangedCoordf64>>,
    events: &[HistoricalEvent],
    (start, end): (NaiveDate, NaiveDate),
    (lo, hi): (f64, f64),
) -> Result<(), ChartError> {
    let visible: Vec<&HistoricalEvent> = events.iter().filter(|e| e.date >= start && e.date <= end).collect();
    chart.draw_series(
        visible
            .iter()
            .map(|e| DashedPathElement::new(vec![(e.date, lo), (e.date, hi)], 4, 3, EVENT.stroke_width(1))),
    )?;
    let label_style = (FONT, 11)
        .into_font()
        .transform(FontTransform::Rotate90)
        .color(&EVENT);
    chart.draw_series(
        visible
            .iter()
            .map(|e| Text::new(e.name.clone(), (e.date, hi), label_style.clone())),
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Charts
// ---------------------------------------------------------------------------

/// One weekly series over time, with optional event markers.
#[derive(Debug, Clone, Default)]
pub struct LineChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<(NaiveDate, f64)>,
    pub events: Vec<HistoricalEvent>,
}

impl LineChart {
    pub fn render(&self) -> Result<String, ChartError> {
        render_svg(|root| {
            let (Some(dates), Some(values)) = (
                date_extent(finite_points(&self.points).map(|p| p.0)),
                padded_extent(self.points.iter().map(|p| p.1)),
            ) else {
                return no_data(root, &self.title);
            };
            let long = long_span(dates.0, dates.1);

            let mut chart = ChartBuilder::on(root)
                .caption(&self.title, (FONT, 22))
                .margin(10)
                .x_label_area_size(40)
                .y_label_area_size(80)
                .build_cartesian_2d(dates.0..dates.1, values.0..values.1)?;
            chart
                .configure_mesh()
                .x_desc(self.x_label.as_str())
                .y_desc(self.y_label.as_str())
                .x_label_formatter(&|d| format_date_tick(d, long))
                .y_label_formatter(&|v| format_tick(*v))
                .draw()?;

            chart.draw_series(LineSeries::new(finite_points(&self.points), PRIMARY.stroke_width(2)))?;
            draw_events(&mut chart, &self.events, dates, values)?;
            Ok(())
        })
    }
}

/// Two weekly series sharing the time axis, each with its own y axis.
#[derive(Debug, Clone, Default)]
pub struct DualAxisChart {
    pub title: String,
    pub x_label: String,
    pub left_label: String,
    pub right_label: String,
    pub left: Vec<(NaiveDate, f64)>,
    pub right: Vec<(NaiveDate, f64)>,
    pub events: Vec<HistoricalEvent>,
}

impl DualAxisChart {
    pub fn render(&self) -> Result<String, ChartError> {
        render_svg(|root| {
            let (Some(dates), Some(left), Some(right)) = (
                date_extent(finite_points(&self.left).chain(finite_points(&self.right)).map(|p| p.0)),
                padded_extent(self.left.iter().map(|p| p.1)),
                padded_extent(self.right.iter().map(|p| p.1)),
            ) else {
                return no_data(root, &self.title);
            };
            let long = long_span(dates.0, dates.1);

            let mut chart = ChartBuilder::on(root)
                .caption(&self.title, (FONT, 22))
                .margin(10)
                .x_label_area_size(40)
                .y_label_area_size(80)
                .right_y_label_area_size(80)
                .build_cartesian_2d(dates.0..dates.1, left.0..left.1)?
                .set_secondary_coord(dates.0..dates.1, right.0..right.1);
            chart
                .configure_mesh()
                .x_desc(self.x_label.as_str())
                .y_desc(self.left_label.as_str())
                .x_label_formatter(&|d| format_date_tick(d, long))
                .y_label_formatter(&|v| format_tick(*v))
                .label_style((FONT, 12).into_font().color(&PRIMARY))
                .draw()?;
            chart
                .configure_secondary_axes()
                .y_desc(self.right_label.as_str())
                .y_label_formatter(&|v| format_tick(*v))
                .label_style((FONT, 12).into_font().color(&SECONDARY))
                .draw()?;

            chart
                .draw_series(LineSeries::new(finite_points(&self.left), PRIMARY.stroke_width(2)))?
                .label(self.left_label.as_str())
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], PRIMARY.stroke_width(2)));
            chart
                .draw_secondary_series(LineSeries::new(finite_points(&self.right), SECONDARY.stroke_width(2)))?
                .label(self.right_label.as_str())
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], SECONDARY.stroke_width(2)));

            draw_events(&mut chart, &self.events, dates, left)?;

            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperLeft)
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()?;
            Ok(())
        })
    }
}

/// Paired values, one dot per week.
#[derive(Debug, Clone, Default)]
pub struct ScatterChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<(f64, f64)>,
}

impl ScatterChart {
    pub fn render(&self) -> Result<String, ChartError> {
        render_svg(|root| {
            let points: Vec<(f64, f64)> = self
                .points
                .iter()
                .copied()
                .filter(|(x, y)| x.is_finite() && y.is_finite())
                .collect();
            let (Some(xs), Some(ys)) = (
                padded_extent(points.iter().map(|p| p.0)),
                padded_extent(points.iter().map(|p| p.1)),
            ) else {
                return no_data(root, &self.title);
            };

            let mut chart = ChartBuilder::on(root)
                .caption(&self.title, (FONT, 22))
                .margin(10)
                .x_label_area_size(40)
                .y_label_area_size(80)
                .build_cartesian_2d(xs.0..xs.1, ys.0..ys.1)?;
            chart
                .configure_mesh()
                .x_desc(self.x_label.as_str())
                .y_desc(self.y_label.as_str())
                .x_label_formatter(&|v| format_tick(*v))
                .y_label_formatter(&|v| format_tick(*v))
                .draw()?;

            chart.draw_series(
                points
                    .iter()
                    .map(|p| Circle::new(*p, 3, PRIMARY.mix(0.6).filled())),
            )?;
            Ok(())
        })
    }
}

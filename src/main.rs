use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};

use petromon_service::chart::{DualAxisChart, LineChart, ScatterChart};
use petromon_service::config::{self, AppConfig};
use petromon_service::events::{self, HistoricalEvent};
use petromon_service::ingest::{snapshot, SeriesSource};
use petromon_service::logging::{self, DataSource, LogLevel};
use petromon_service::model::{EiaError, Observation};
use petromon_service::pipeline::{self, Comparison, DateWindow, WeekAnchor};
use petromon_service::report::{self, Dashboard};
use petromon_service::series::{self, SeriesDefinition, TOTAL_SUPPLY_ID, WTI_SPOT_ID};
use petromon_service::verify;

/// Weekly U.S. petroleum product supplied vs WTI spot price.
#[derive(Debug, Parser)]
#[command(name = "petromon", version, about)]
struct Cli {
    /// TOML config file (defaults to ./petromon.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// EIA API key
    #[arg(long, global = true, env = "EIA_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Read snapshots from this directory instead of the live API
    #[arg(long, global = true)]
    replay: Option<PathBuf>,

    /// Where charts, CSV files and reports are written
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Also append log lines to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download every registered series and save snapshots
    Fetch {
        /// Snapshot directory (defaults to eia.snapshot_dir, then ./snapshots)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Weekly total product supplied since the history start
    Supply,
    /// Weekly WTI spot price since the history start
    Wti,
    /// Supply against price over a date window
    Compare {
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Defaults to today
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Rolling average window in weeks
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=12))]
        rolling: Option<u8>,
        #[arg(long)]
        no_scatter: bool,
    },
    /// Check that every series answers on the live API
    Verify {
        /// Print the report as JSON after the summary
        #[arg(long)]
        json: bool,
    },
    /// List the historical events used for chart annotations
    Events {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = config::load_config(cli.config.as_deref())?;
    config.apply_env_key(cli.api_key.clone());
    if let Some(dir) = &cli.output_dir {
        config.output.dir = dir.clone();
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(file) = &cli.log_file {
        config.logging.file = Some(file.clone());
    }

    logging::init_logger(config.logging.level, config.logging.file.as_deref())?;

    match cli.command {
        Command::Fetch { dir } => run_fetch(&config, cli.replay.as_deref(), dir),
        Command::Supply => run_series(&config, cli.replay.as_deref(), TOTAL_SUPPLY_ID, false),
        Command::Wti => run_series(&config, cli.replay.as_deref(), WTI_SPOT_ID, true),
        Command::Compare {
            start,
            end,
            rolling,
            no_scatter,
        } => {
            let options = CompareOptions {
                start: start.unwrap_or(config.analysis.compare_start),
                end: end.unwrap_or_else(|| Utc::now().date_naive()),
                rolling_weeks: rolling.map(usize::from).unwrap_or(config.analysis.rolling_weeks),
                scatter: config.analysis.show_scatter && !no_scatter,
            };
            run_compare(&config, cli.replay.as_deref(), &options)
        }
        Command::Verify { json } => run_verify(&config, json),
        Command::Events { from, to } => run_events(&config, from, to),
    }
}

// ---------------------------------------------------------------------------
// Shared setup
// ---------------------------------------------------------------------------

fn open_source(config: &AppConfig, replay: Option<&Path>) -> Result<SeriesSource> {
    if let Some(dir) = replay.or(config.eia.snapshot_dir.as_deref()) {
        logging::info(
            DataSource::Snapshot,
            None,
            &format!("replaying snapshots from {}", dir.display()),
        );
        return Ok(SeriesSource::replay(dir));
    }
    open_live(config)
}

fn open_live(config: &AppConfig) -> Result<SeriesSource> {
    let Some(api_key) = config.api_key() else {
        bail!(
            "{}; set {} (a .env file works) or pass --replay <dir>",
            EiaError::MissingApiKey,
            config::API_KEY_ENV
        );
    };
    let source = SeriesSource::live(
        &config.eia.base_url,
        api_key,
        Duration::from_secs(config.eia.timeout_secs),
        config.eia.page_length,
        config.eia.max_pages,
    )?;
    Ok(source)
}

fn load_event_list(config: &AppConfig) -> Result<Vec<HistoricalEvent>> {
    match &config.analysis.events_file {
        Some(path) => Ok(events::load_events(path)?),
        None => Ok(events::default_events()),
    }
}

fn write_output(dir: &Path, name: &str, contents: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(name);
    fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
    logging::info(DataSource::Chart, None, &format!("wrote {}", path.display()));
    Ok(path)
}

fn points(obs: &[Observation]) -> Vec<(NaiveDate, f64)> {
    obs.iter().map(|o| (o.week, o.value)).collect()
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn run_fetch(config: &AppConfig, replay: Option<&Path>, dir: Option<PathBuf>) -> Result<()> {
    // A configured snapshot_dir is the destination here, not a source.
    let source = match replay {
        Some(from) => SeriesSource::replay(from),
        None => open_live(config)?,
    };
    let dir = dir
        .or_else(|| config.eia.snapshot_dir.clone())
        .unwrap_or_else(|| PathBuf::from("snapshots"));

    let ids = series::all_series_ids();
    let mut failed = 0;
    for id in &ids {
        let def = series::require_series(id)?;
        match source
            .fetch_rows(def)
            .and_then(|rows| snapshot::save_snapshot(&dir, def.id, &rows).map(|p| (rows.len(), p)))
        {
            Ok((count, path)) => println!("{:<14} {:>6} rows -> {}", def.id, count, path.display()),
            Err(e) => {
                println!("{:<14} FAILED: {}", def.id, e);
                failed += 1;
            }
        }
    }

    logging::log_fetch_summary(DataSource::Eia, ids.len(), ids.len() - failed, failed);
    if failed > 0 {
        bail!("{} of {} series could not be fetched", failed, ids.len());
    }
    Ok(())
}

fn run_series(config: &AppConfig, replay: Option<&Path>, id: &str, is_price: bool) -> Result<()> {
    let source = open_source(config, replay)?;
    let def: &SeriesDefinition = series::require_series(id)?;
    let records = source.fetch(def)?;
    let obs = pipeline::prepare_series(
        def,
        &records,
        DateWindow::since(config.analysis.history_start),
        WeekAnchor::AsReported,
    )?;

    let (first, last) = match (obs.first(), obs.last()) {
        (Some(f), Some(l)) => (f.week, l.week),
        _ => bail!(EiaError::EmptySeries(def.id.to_string())),
    };

    let chart = LineChart {
        title: def.name.to_string(),
        x_label: "Week".to_string(),
        y_label: def.value_label.to_string(),
        points: points(&obs),
        events: events::events_within(&load_event_list(config)?, first, last),
    };
    let out = &config.output.dir;
    let svg_name = format!("{}.svg", def.id);
    write_output(out, &svg_name, &chart.render()?)?;

    let csv_path = out.join(format!("{}.csv", def.id));
    report::save_observations_csv(&csv_path, &obs)
        .with_context(|| format!("writing {}", csv_path.display()))?;

    let dashboard = Dashboard::for_series(
        def.name,
        &obs,
        is_price,
        config.analysis.max_age_days,
        Utc::now(),
    );
    write_output(
        out,
        &format!("{}.md", def.id),
        &dashboard.render_markdown(&[(def.value_label, svg_name.as_str())]),
    )?;
    print!("{}", dashboard.render_text());
    Ok(())
}

struct CompareOptions {
    start: NaiveDate,
    end: NaiveDate,
    rolling_weeks: usize,
    scatter: bool,
}

fn run_compare(config: &AppConfig, replay: Option<&Path>, options: &CompareOptions) -> Result<()> {
    let window = DateWindow::between(options.start, options.end);
    window.validate()?;

    let source = open_source(config, replay)?;
    let supply_def = series::require_series(TOTAL_SUPPLY_ID)?;
    let price_def = series::require_series(WTI_SPOT_ID)?;

    let supply_records = source.fetch(supply_def)?;
    let price_records = source.fetch(price_def)?;
    let supply = pipeline::prepare_series(supply_def, &supply_records, window, WeekAnchor::WeekStart)?;
    let price = pipeline::prepare_series(price_def, &price_records, window, WeekAnchor::WeekStart)?;
    // The comparison is only as fresh as the older of its two inputs
    let data_through = pipeline::latest_reported(&supply_records, window, WeekAnchor::WeekStart)
        .min(pipeline::latest_reported(&price_records, window, WeekAnchor::WeekStart));

    let cmp = pipeline::compare(
        &supply,
        &price,
        options.rolling_weeks,
        config.analysis.tolerance_days,
    )?;

    let out = &config.output.dir;
    let events = events::events_within(&load_event_list(config)?, options.start, options.end);
    let mut charts = vec![(
        "Weekly supply and WTI",
        write_trend_chart(out, &cmp, supply_def, price_def, events)?,
    )];
    if options.scatter {
        charts.push((
            "Supply vs WTI, one point per week",
            write_scatter_chart(out, &cmp, supply_def, price_def)?,
        ));
    }

    let csv_path = out.join("compare.csv");
    report::save_comparison_csv(&csv_path, &cmp.rows)
        .with_context(|| format!("writing {}", csv_path.display()))?;

    let dashboard = Dashboard::for_comparison(
        "Total product supplied vs WTI spot price",
        &cmp,
        data_through,
        config.analysis.max_age_days,
        Utc::now(),
    );
    let chart_refs: Vec<(&str, &str)> = charts.iter().map(|(c, f)| (*c, f.as_str())).collect();
    write_output(out, "compare.md", &dashboard.render_markdown(&chart_refs))?;
    print!("{}", dashboard.render_text());
    Ok(())
}

fn write_trend_chart(
    out: &Path,
    cmp: &Comparison,
    supply_def: &SeriesDefinition,
    price_def: &SeriesDefinition,
    events: Vec<HistoricalEvent>,
) -> Result<String> {
    let smoothed = cmp.rolling_weeks > 1;
    let pick = |raw: f64, avg: Option<f64>| if smoothed { avg } else { Some(raw) };
    let suffix = if smoothed {
        format!(" ({}-week avg)", cmp.rolling_weeks)
    } else {
        String::new()
    };

    let chart = DualAxisChart {
        title: format!("Total product supplied vs WTI{}", suffix),
        x_label: "Week".to_string(),
        left_label: supply_def.value_label.to_string(),
        right_label: price_def.value_label.to_string(),
        left: cmp
            .rows
            .iter()
            .filter_map(|r| pick(r.supply, r.supply_avg).map(|v| (r.week, v)))
            .collect(),
        right: cmp
            .rows
            .iter()
            .filter_map(|r| pick(r.price, r.price_avg).map(|v| (r.week, v)))
            .collect(),
        events,
    };
    let name = "compare_trends.svg".to_string();
    write_output(out, &name, &chart.render()?)?;
    Ok(name)
}

fn write_scatter_chart(
    out: &Path,
    cmp: &Comparison,
    supply_def: &SeriesDefinition,
    price_def: &SeriesDefinition,
) -> Result<String> {
    let title = match cmp.correlation {
        Some(r) => format!("Supply vs WTI (r = {:.2})", r),
        None => "Supply vs WTI".to_string(),
    };
    let chart = ScatterChart {
        title,
        x_label: price_def.value_label.to_string(),
        y_label: supply_def.value_label.to_string(),
        points: cmp.price_values().into_iter().zip(cmp.supply_values()).collect(),
    };
    let name = "compare_scatter.svg".to_string();
    write_output(out, &name, &chart.render()?)?;
    Ok(name)
}

fn run_verify(config: &AppConfig, json: bool) -> Result<()> {
    let report = verify::run_full_verification(config)?;
    verify::print_summary(&report);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    if report.summary.working == 0 {
        bail!("no series answered");
    }
    Ok(())
}

fn run_events(config: &AppConfig, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<()> {
    let all = load_event_list(config)?;
    let start = from.unwrap_or(NaiveDate::MIN);
    let end = to.unwrap_or(NaiveDate::MAX);
    for event in events::events_within(&all, start, end) {
        match &event.description {
            Some(d) => println!("{}  {}: {}", event.date, event.name, d),
            None => println!("{}  {}", event.date, event.name),
        }
    }
    Ok(())
}

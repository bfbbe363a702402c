/// Snapshot mode for working without the live API
///
/// `petromon fetch` stores every series as a JSON file shaped like an API
/// response. Pointing the service at that directory replays the saved data,
/// which keeps development and tests independent of the network and of an
/// API key.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use super::eia::{self, Row};
use crate::model::EiaError;
use crate::series::SeriesDefinition;

/// Path of the snapshot file for a series.
pub fn snapshot_path(dir: &Path, series_id: &str) -> PathBuf {
    dir.join(format!("{}.json", series_id))
}

/// Write rows as `<dir>/<series_id>.json`, creating `dir` if needed.
///
/// The file uses the API envelope so it parses with the same code path as a
/// live response.
pub fn save_snapshot(dir: &Path, series_id: &str, rows: &[Row]) -> Result<PathBuf, EiaError> {
    let path = snapshot_path(dir, series_id);
    let io_err = |source| EiaError::Snapshot {
        path: path.clone(),
        source,
    };

    fs::create_dir_all(dir).map_err(io_err)?;

    let data: Vec<Value> = rows.iter().cloned().map(Value::Object).collect();
    let body = json!({
        "response": {
            "total": rows.len(),
            "data": data,
        }
    });
    let text = serde_json::to_string_pretty(&body).map_err(|e| EiaError::Parse(e.to_string()))?;
    fs::write(&path, text).map_err(io_err)?;
    Ok(path)
}

/// Read the raw response body saved for a series.
pub fn load_snapshot(dir: &Path, series_id: &str) -> Result<String, EiaError> {
    let path = snapshot_path(dir, series_id);
    fs::read_to_string(&path).map_err(|source| EiaError::Snapshot { path, source })
}

/// Read a snapshot and return its rows, checked the same way as a live
/// response: an empty file is `NoDataAvailable`, missing fields are
/// `MissingFields`.
pub fn load_snapshot_rows(dir: &Path, series: &SeriesDefinition) -> Result<Vec<Row>, EiaError> {
    let body = load_snapshot(dir, series.id)?;
    let page = eia::parse_data_page(&body)?;
    eia::check_rows(series, page.rows)
}

/// Data ingestion for the petroleum supply monitoring service.
///
/// Submodules:
/// - `eia` : EIA API v2 client: URL building, paging, response parsing.
/// - `snapshot` : saved responses for offline replay.

pub mod eia;
pub mod snapshot;

use std::path::PathBuf;
use std::time::Duration;

use crate::logging::{self, DataSource};
use crate::model::{EiaError, RawRecord};
use crate::series::SeriesDefinition;

/// Where series rows come from for a run.
pub enum SeriesSource {
    /// Live EIA API.
    Live {
        client: reqwest::blocking::Client,
        base_url: String,
        api_key: String,
        page_length: usize,
        max_pages: usize,
    },
    /// Snapshot files written by a previous `fetch`.
    Replay { dir: PathBuf },
}

impl SeriesSource {
    /// Build a live source with the service's HTTP client settings.
    pub fn live(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
        page_length: usize,
        max_pages: usize,
    ) -> Result<Self, EiaError> {
        if api_key.trim().is_empty() {
            return Err(EiaError::MissingApiKey);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("petromon_service/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(SeriesSource::Live {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            page_length,
            max_pages,
        })
    }

    pub fn replay(dir: impl Into<PathBuf>) -> Self {
        SeriesSource::Replay { dir: dir.into() }
    }

    fn data_source(&self) -> DataSource {
        match self {
            SeriesSource::Live { .. } => DataSource::Eia,
            SeriesSource::Replay { .. } => DataSource::Snapshot,
        }
    }

    fn load_rows(&self, series: &SeriesDefinition) -> Result<Vec<eia::Row>, EiaError> {
        match self {
            SeriesSource::Live {
                client,
                base_url,
                api_key,
                page_length,
                max_pages,
            } => eia::fetch_rows(client, base_url, api_key, series, *page_length, *max_pages),
            SeriesSource::Replay { dir } => snapshot::load_snapshot_rows(dir, series),
        }
    }

    /// Load the rows for one series exactly as the API shaped them.
    ///
    /// Both sources reject an empty result and rows missing a required field.
    pub fn fetch_rows(&self, series: &SeriesDefinition) -> Result<Vec<eia::Row>, EiaError> {
        let result = self.load_rows(series);
        if let Err(ref err) = result {
            logging::log_fetch_failure(self.data_source(), series.id, "fetch_rows", err);
        }
        result
    }

    /// Load the raw records for one series.
    pub fn fetch(&self, series: &SeriesDefinition) -> Result<Vec<RawRecord>, EiaError> {
        let result = self
            .load_rows(series)
            .and_then(|rows| eia::records_from_rows(&rows));
        if let Err(ref err) = result {
            logging::log_fetch_failure(self.data_source(), series.id, "fetch", err);
        }
        result
    }
}

/// EIA (U.S. Energy Information Administration) API v2 Client
///
/// Retrieves weekly petroleum series from the EIA open data API. Every
/// dataset is served as `{base}/{route}/data/` with query-string facets,
/// and responses wrap rows in a `response.data` array.
///
/// API Documentation: https://www.eia.gov/opendata/documentation.php
/// Data browser: https://www.eia.gov/opendata/browser/

use crate::logging::{self, DataSource};
use crate::model::{EiaError, RawRecord, FIELD_PERIOD, FIELD_VALUE, REQUIRED_FIELDS};
use crate::series::SeriesDefinition;
use serde::Deserialize;
use serde_json::{Map, Value};

pub const EIA_BASE_URL: &str = "https://api.eia.gov/v2";

/// The API refuses `length` above this.
pub const MAX_PAGE_LENGTH: usize = 5000;

/// A single row as the API sent it.
pub type Row = Map<String, Value>;

// ============================================================================
// EIA API Response Structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct EiaEnvelope {
    response: Option<EiaResponseBody>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct EiaResponseBody {
    /// Row count across all pages. Sent as a number by some API versions
    /// and as a string by others.
    #[serde(default)]
    total: Option<Value>,
    #[serde(default)]
    data: Vec<Row>,
}

/// One page of a data response.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPage {
    pub total: Option<u64>,
    pub rows: Vec<Row>,
}

// ============================================================================
// URL Construction
// ============================================================================

/// Build the data URL for one page of a series.
///
/// Rows are requested in ascending period order so that offsets stay
/// stable while paging.
pub fn build_data_url(
    base_url: &str,
    api_key: &str,
    series: &SeriesDefinition,
    offset: usize,
    length: usize,
) -> String {
    let mut url = format!(
        "{}/{}/data/?api_key={}&frequency={}&data[0]={}",
        base_url.trim_end_matches('/'),
        series.route,
        api_key,
        series.frequency,
        FIELD_VALUE
    );

    for (key, value) in series.facets {
        url.push_str(&format!("&facets[{}][]={}", key, value));
    }

    url.push_str(&format!(
        "&sort[0][column]={}&sort[0][direction]=asc&offset={}&length={}",
        FIELD_PERIOD,
        offset,
        length.min(MAX_PAGE_LENGTH)
    ));
    url
}

/// Replace the `api_key` query value with `***` so URLs can be logged.
pub fn redact_api_key(url: &str) -> String {
    const KEY: &str = "api_key=";
    match url.find(KEY) {
        Some(start) => {
            let value_start = start + KEY.len();
            let value_end = url[value_start..]
                .find('&')
                .map(|i| value_start + i)
                .unwrap_or(url.len());
            format!("{}***{}", &url[..value_start], &url[value_end..])
        }
        None => url.to_string(),
    }
}

// ============================================================================
// Response Parsing
// ============================================================================

/// Parse one response body into its rows and reported total.
pub fn parse_data_page(body: &str) -> Result<DataPage, EiaError> {
    let envelope: EiaEnvelope =
        serde_json::from_str(body).map_err(|e| EiaError::Parse(e.to_string()))?;

    if let Some(err) = envelope.error {
        let message = match err {
            Value::String(s) => s,
            other => other.to_string(),
        };
        return Err(EiaError::Api(message));
    }

    let response = envelope
        .response
        .ok_or_else(|| EiaError::Parse("missing 'response' object".to_string()))?;

    let total = response.total.as_ref().and_then(|t| match t {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    });

    Ok(DataPage {
        total,
        rows: response.data,
    })
}

/// Check that each required field appears in at least one row.
///
/// An empty row set has no fields at all and therefore fails.
pub fn validate_required_fields(rows: &[Row], required: &[&str]) -> Result<(), EiaError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|field| !rows.iter().any(|row| row.contains_key(**field)))
        .map(|field| field.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(EiaError::MissingFields(missing))
    }
}

fn field_text(row: &Row, field: &str) -> Option<String> {
    match row.get(field)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Convert an API row into the pipeline's raw record.
pub fn record_from_row(row: &Row) -> RawRecord {
    RawRecord {
        period: field_text(row, FIELD_PERIOD),
        value: field_text(row, FIELD_VALUE),
        series: field_text(row, "series"),
        product_name: field_text(row, "product-name"),
        units: field_text(row, "units"),
    }
}

/// Convert validated rows into raw records.
pub fn records_from_rows(rows: &[Row]) -> Result<Vec<RawRecord>, EiaError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    validate_required_fields(rows, REQUIRED_FIELDS)?;
    Ok(rows.iter().map(record_from_row).collect())
}

// ============================================================================
// API Client Functions
// ============================================================================

/// Fetch a single page
pub fn fetch_page(
    client: &reqwest::blocking::Client,
    url: &str,
) -> Result<DataPage, EiaError> {
    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()?;

    let status = response.status();
    if !status.is_success() {
        return Err(EiaError::Http(status.as_u16()));
    }

    let body = response.text()?;
    parse_data_page(&body)
}

/// Reject an empty result and rows that lack the required fields.
///
/// Applied to every row set that enters the pipeline, whether it came from
/// the API or from a snapshot.
pub fn check_rows(series: &SeriesDefinition, rows: Vec<Row>) -> Result<Vec<Row>, EiaError> {
    if rows.is_empty() {
        return Err(EiaError::NoDataAvailable(series.id.to_string()));
    }
    validate_required_fields(&rows, REQUIRED_FIELDS)?;
    Ok(rows)
}

/// Page through a series with `fetch(offset, length)` until the reported
/// total is reached, a page comes back empty, or `max_pages` is hit.
///
/// Each offset is the number of rows already received, so a short page
/// never skips rows.
pub fn collect_pages<F>(
    series: &SeriesDefinition,
    page_length: usize,
    max_pages: usize,
    mut fetch: F,
) -> Result<Vec<Row>, EiaError>
where
    F: FnMut(usize, usize) -> Result<DataPage, EiaError>,
{
    let length = page_length.clamp(1, MAX_PAGE_LENGTH);
    let max_pages = max_pages.max(1);
    let mut rows: Vec<Row> = Vec::new();

    for page_index in 0..max_pages {
        let page = fetch(rows.len(), length)?;
        let received = page.rows.len();
        rows.extend(page.rows);

        let done = match page.total {
            Some(total) => rows.len() as u64 >= total,
            None => received < length,
        };
        if received == 0 || done {
            break;
        }
        if page_index + 1 == max_pages {
            logging::warn(
                DataSource::Eia,
                Some(series.id),
                &format!("stopped after {} pages with {} rows", max_pages, rows.len()),
            );
        }
    }

    let rows = check_rows(series, rows)?;
    logging::info(
        DataSource::Eia,
        Some(series.id),
        &format!("received {} rows", rows.len()),
    );
    Ok(rows)
}

/// Fetch every row of a series from the API.
///
/// # Returns
/// The raw API rows, in ascending period order.
pub fn fetch_rows(
    client: &reqwest::blocking::Client,
    base_url: &str,
    api_key: &str,
    series: &SeriesDefinition,
    page_length: usize,
    max_pages: usize,
) -> Result<Vec<Row>, EiaError> {
    if api_key.trim().is_empty() {
        return Err(EiaError::MissingApiKey);
    }

    collect_pages(series, page_length, max_pages, |offset, length| {
        let url = build_data_url(base_url, api_key, series, offset, length);
        logging::debug(
            DataSource::Eia,
            Some(series.id),
            &format!("GET {}", redact_api_key(&url)),
        );
        fetch_page(client, &url)
    })
}

// ============================================================================
// Tests
// ============================================================================

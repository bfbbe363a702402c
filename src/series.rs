/// Series registry for the petroleum supply monitoring service.
///
/// Defines the canonical list of EIA API v2 datasets this service pulls,
/// along with the facets, units and weekly aggregation each one needs.
/// This is the single source of truth for routes and facet codes; all other
/// modules should reference series from here rather than hardcoding them.

use crate::model::EiaError;

// ---------------------------------------------------------------------------
// Series metadata
// ---------------------------------------------------------------------------

/// How duplicate rows for the same week are collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Several products report per week; sum them into one national total.
    SumByWeek,
    /// The facets already select one series; keep one value per week.
    Single,
}

/// Metadata for a single EIA dataset.
#[derive(Debug)]
pub struct SeriesDefinition {
    /// Short identifier used on the command line and for snapshot files.
    pub id: &'static str,
    /// Human-readable name used in chart titles and reports.
    pub name: &'static str,
    pub description: &'static str,
    /// API v2 route below the base URL, without leading or trailing slash.
    pub route: &'static str,
    /// `facets[key][]=value` filters applied to the request.
    pub facets: &'static [(&'static str, &'static str)],
    pub frequency: &'static str,
    pub units: &'static str,
    /// Axis label for charts.
    pub value_label: &'static str,
    pub aggregation: Aggregation,
}

pub const TOTAL_SUPPLY_ID: &str = "total_supply";
pub const WTI_SPOT_ID: &str = "wti_spot";

/// All EIA datasets used by the service.
///
/// Sources:
///   - Routes and facets: EIA API v2 browser (www.eia.gov/opendata/browser)
///   - RWTC: Cushing, OK WTI spot price FOB
pub static SERIES_REGISTRY: &[SeriesDefinition] = &[
    SeriesDefinition {
        id: TOTAL_SUPPLY_ID,
        name: "U.S. Petroleum Products Supplied (Total)",
        description: "Weekly product supplied for every petroleum product, \
                      summed per week into a single national series. \
                      Product supplied approximates domestic demand.",
        route: "petroleum/cons/wpsup",
        facets: &[],
        frequency: "weekly",
        units: "MBBL/D",
        value_label: "Total product supplied (thousand barrels/day)",
        aggregation: Aggregation::SumByWeek,
    },
    SeriesDefinition {
        id: WTI_SPOT_ID,
        name: "WTI Crude Oil Spot Price (Cushing, OK)",
        description: "Weekly average West Texas Intermediate spot price, \
                      free on board at Cushing.",
        route: "petroleum/pri/spt",
        facets: &[("series", "RWTC")],
        frequency: "weekly",
        units: "$/BBL",
        value_label: "WTI spot price (USD/barrel)",
        aggregation: Aggregation::Single,
    },
];

/// Returns the ids of all registered series, in registry order.
pub fn all_series_ids() -> Vec<&'static str> {
    SERIES_REGISTRY.iter().map(|s| s.id).collect()
}

/// Looks up a series by id. Returns `None` if not found.
pub fn find_series(id: &str) -> Option<&'static SeriesDefinition> {
    SERIES_REGISTRY.iter().find(|s| s.id == id)
}

/// Like `find_series`, but as an error for callers that propagate with `?`.
pub fn require_series(id: &str) -> Result<&'static SeriesDefinition, EiaError> {
    find_series(id).ok_or_else(|| EiaError::UnknownSeries(id.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_ids_are_lowercase_snake_case() {
        // Ids double as snapshot file names.
        for series in SERIES_REGISTRY {
            assert!(
                series
                    .id
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'),
                "series id '{}' should be lowercase snake case",
                series.id
            );
        }
    }

    #[test]
    fn test_no_duplicate_series_ids() {
        let mut seen = std::collections::HashSet::new();
        for series in SERIES_REGISTRY {
            assert!(
                seen.insert(series.id),
                "duplicate series id '{}' found in SERIES_REGISTRY",
                series.id
            );
        }
    }

    #[test]
    fn test_routes_have_no_surrounding_slashes() {
        for series in SERIES_REGISTRY {
            assert!(!series.route.starts_with('/'), "route for '{}'", series.id);
            assert!(!series.route.ends_with('/'), "route for '{}'", series.id);
        }
    }

    #[test]
    fn test_facets_are_non_empty() {
        for series in SERIES_REGISTRY {
            for (key, value) in series.facets {
                assert!(!key.is_empty() && !value.is_empty(), "facet on '{}'", series.id);
            }
        }
    }

    #[test]
    fn test_registry_contains_supply_and_wti() {
        let supply = find_series(TOTAL_SUPPLY_ID).expect("supply should be registered");
        assert_eq!(supply.route, "petroleum/cons/wpsup");
        assert_eq!(supply.aggregation, Aggregation::SumByWeek);

        let wti = find_series(WTI_SPOT_ID).expect("wti should be registered");
        assert_eq!(wti.facets, &[("series", "RWTC")]);
        assert_eq!(wti.aggregation, Aggregation::Single);
    }

    #[test]
    fn test_all_series_are_weekly() {
        for series in SERIES_REGISTRY {
            assert_eq!(series.frequency, "weekly");
        }
    }

    #[test]
    fn test_require_series_reports_unknown_id() {
        let err = require_series("brent").unwrap_err();
        assert!(matches!(err, EiaError::UnknownSeries(ref id) if id == "brent"));
        assert_eq!(all_series_ids().len(), SERIES_REGISTRY.len());
    }
}

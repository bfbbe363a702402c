/// Data organization and analysis for the petroleum supply service.
///
/// Submodules:
/// - `cleaning`: parses raw rows, buckets by week, filters date windows.
/// - `align`: pairs supply and price weeks by nearest date.
/// - `stats`: rolling means and correlation.

pub mod align;
pub mod cleaning;
pub mod stats;

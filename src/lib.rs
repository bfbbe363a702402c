//! Weekly U.S. petroleum demand and WTI price monitoring.
//!
//! Data flows `ingest` -> `analysis` (via `pipeline`) -> `chart` / `report`.
//! `verify` checks the upstream API independently of a run.

pub mod analysis;
pub mod chart;
pub mod config;
pub mod events;
pub mod freshness;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod series;
pub mod validation;
pub mod verify;

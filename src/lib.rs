//! Nobel laureate ETL and report tables.
//!
//! Laureate records come either from the paged laureates API or from a flat
//! CSV export. They are flattened to one row per (laureate, prize) pair,
//! written out as a single table, enriched with country and continent, and
//! summarized into a fixed set of aggregate tables for charting.

pub mod analysis;
pub mod config;
pub mod geo;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod report;

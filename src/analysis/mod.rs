/// Aggregation over the enriched laureate table.
///
/// This module computes the fixed set of descriptive tables the report
/// needs. Charts are drawn elsewhere, from the tables written by `report`.
///
/// Submodules:
/// - `aggregates`: first woman, decades, repeat winners, gender shares,
///   birth country/continent counts, gender by continent.

pub mod aggregates;

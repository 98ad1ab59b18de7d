/// Laureate ingestion.
///
/// Submodules:
/// - `nobel_api`: paged retrieval from the public laureates API.
/// - `flat_file`: laureate and country lookup tables read from CSV.

pub mod flat_file;
pub mod nobel_api;

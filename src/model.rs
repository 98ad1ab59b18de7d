/// Core data types for the Nobel laureate pipeline.
///
/// This module defines the shared domain model imported by all other modules:
/// the raw shapes returned by the laureates API, the flat row produced by the
/// normalizer, and the error taxonomy. It contains no I/O.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Placeholder written into every scalar cell whose source value is absent.
///
/// Downstream filters compare against this literal, so it is a real string
/// and not an empty cell. `gender` is the one field that uses `None` instead.
pub const NAN: &str = "NaN";

/// Number of laureates requested per API page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Returns `None` for the sentinel and for empty strings.
pub fn present(value: &str) -> Option<&str> {
    if value == NAN || value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

// ---------------------------------------------------------------------------
// Raw API shapes
// ---------------------------------------------------------------------------

/// A multilingual text object such as `{"en": "Physics", "se": "Fysik"}`.
/// Only the English value is used.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LocalizedText {
    #[serde(default, deserialize_with = "lenient")]
    pub en: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPlace {
    #[serde(default, deserialize_with = "lenient")]
    pub city: Option<LocalizedText>,
    #[serde(default, deserialize_with = "lenient")]
    pub country: Option<LocalizedText>,
    #[serde(default, deserialize_with = "lenient")]
    pub city_now: Option<LocalizedText>,
    #[serde(default, deserialize_with = "lenient")]
    pub country_now: Option<LocalizedText>,
    #[serde(default, deserialize_with = "lenient")]
    pub continent: Option<LocalizedText>,
}

/// A dated event with a location: birth, death, or founding.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawEvent {
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub place: Option<RawPlace>,
}

/// An institution the laureate was attached to when the prize was awarded.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawAffiliation {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<LocalizedText>,
    #[serde(default, deserialize_with = "lenient")]
    pub city: Option<LocalizedText>,
    #[serde(default, deserialize_with = "lenient")]
    pub country: Option<LocalizedText>,
}

/// One `nobelPrizes[]` entry.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPrize {
    #[serde(default, deserialize_with = "lenient_string")]
    pub award_year: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub category: Option<LocalizedText>,
    #[serde(default, deserialize_with = "lenient")]
    pub category_full_name: Option<LocalizedText>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub portion: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub motivation: Option<LocalizedText>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub affiliations: Vec<RawAffiliation>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOrganization {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub org_name: Option<LocalizedText>,
    #[serde(default, deserialize_with = "lenient")]
    pub founded: Option<RawEvent>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub nobel_prizes: Vec<RawPrize>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawIndividual {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub full_name: Option<LocalizedText>,
    #[serde(default, deserialize_with = "lenient")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub birth: Option<RawEvent>,
    #[serde(default, deserialize_with = "lenient")]
    pub death: Option<RawEvent>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub nobel_prizes: Vec<RawPrize>,
}

/// One element of the `laureates[]` array.
///
/// The variant is decided by which name key is present: `orgName` for an
/// organization, `fullName` for a person. Nested values of the wrong shape
/// read as absent, so once the name key is there the record always lands in
/// its variant. Anything without either key is `Unrecognized`.
#[derive(Debug, Clone, PartialEq)]
pub enum RawLaureate {
    Organization(RawOrganization),
    Individual(RawIndividual),
    Unrecognized(serde_json::Value),
}

impl RawLaureate {
    pub fn from_value(value: serde_json::Value) -> Self {
        if value.get("orgName").is_some() {
            match serde_json::from_value(value.clone()) {
                Ok(org) => RawLaureate::Organization(org),
                Err(_) => RawLaureate::Unrecognized(value),
            }
        } else if value.get("fullName").is_some() {
            match serde_json::from_value(value.clone()) {
                Ok(person) => RawLaureate::Individual(person),
                Err(_) => RawLaureate::Unrecognized(value),
            }
        } else {
            RawLaureate::Unrecognized(value)
        }
    }

    /// Source id for log messages, if one can be found.
    pub fn id(&self) -> Option<String> {
        match self {
            RawLaureate::Organization(org) => org.id.clone(),
            RawLaureate::Individual(person) => person.id.clone(),
            RawLaureate::Unrecognized(value) => match value.get("id") {
                Some(serde_json::Value::String(s)) => Some(s.clone()),
                Some(serde_json::Value::Number(n)) => Some(n.to_string()),
                _ => None,
            },
        }
    }
}

impl<'de> Deserialize<'de> for RawLaureate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        serde_json::Value::deserialize(deserializer).map(RawLaureate::from_value)
    }
}

/// Top-level body of one `/laureates` page.
#[derive(Debug, Deserialize)]
pub struct LaureatesPage {
    #[serde(default)]
    pub laureates: Vec<RawLaureate>,
}

/// Accepts `"1903"` and `1903` alike.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// A value of the wrong shape reads as absent instead of failing the record.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(Option::<serde_json::Value>::deserialize(deserializer)?
        .and_then(|value| serde_json::from_value(value).ok()))
}

/// Keeps the list entries that read cleanly; anything but an array is empty.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

// ---------------------------------------------------------------------------
// Flat rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaureateType {
    Individual,
    Organization,
}

impl fmt::Display for LaureateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaureateType::Individual => write!(f, "Individual"),
            LaureateType::Organization => write!(f, "Organization"),
        }
    }
}

impl LaureateType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "individual" => Some(LaureateType::Individual),
            "organization" | "organisation" => Some(LaureateType::Organization),
            _ => None,
        }
    }
}

/// The three cells contributed by one affiliation. Position in the owning
/// `Vec` gives the column number (`affiliation_{i}_*`, 1-indexed).
#[derive(Debug, Clone, PartialEq)]
pub struct AffiliationCells {
    pub name: String,
    pub city: String,
    pub country: String,
}

/// Every column of a flat row except the two integer keys.
#[derive(Debug, Clone, PartialEq)]
pub struct LaureateFields {
    pub category: String,
    pub laureate_type: LaureateType,
    pub full_name: String,
    pub gender: Option<String>,
    pub birth_date: String,
    pub birth_city: String,
    pub birth_city_now: String,
    pub birth_country: String,
    pub birth_country_now: String,
    pub birth_continent: String,
    pub death_date: String,
    pub prize_share: String,
    /// Category full name, a space, and the award year.
    pub prize: String,
    pub motivation: String,
    /// Sparse: only as many entries as this prize actually lists.
    pub affiliations: Vec<AffiliationCells>,
}

/// Normalizer output before `id` and `year` are cast to integers.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub id: String,
    pub year: String,
    pub fields: LaureateFields,
}

/// One (laureate, prize) pair with integer keys.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatLaureateRow {
    pub id: u32,
    pub year: i32,
    pub fields: LaureateFields,
}

/// A flat row after geo enrichment.
///
/// `continent` and `fixed_birth_country` are `None` when no value could be
/// resolved; they are never the `NaN` sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRow {
    pub row: FlatLaureateRow,
    pub fixed_birth_country: Option<String>,
    pub continent: Option<String>,
}

/// One entry of the country lookup file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CountryLookupEntry {
    pub birth_country: String,
    pub fixed_birth_country: String,
    pub continent: String,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// A page request that did not produce a usable page. Ends ingestion early;
/// rows gathered before it are kept.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Status code of 300 or above from the laureates endpoint.
    #[error("HTTP error: {status} (offset {offset})")]
    HttpStatus { status: u16, offset: usize },
    /// The request never produced a response (DNS, TLS, timeout...).
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
    /// The response body could not be deserialized.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// A raw record matching neither the organization nor the individual shape.
/// Logged and skipped; never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaMismatch {
    pub record_id: Option<String>,
    pub reason: String,
}

impl fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.record_id {
            Some(id) => write!(f, "record {}: {}", id, self.reason),
            None => write!(f, "record without id: {}", self.reason),
        }
    }
}

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// `id` or `year` still holds a non-numeric value after normalization.
    #[error("cannot cast {field} value '{value}' to an integer (row {row})")]
    Cast {
        field: &'static str,
        value: String,
        row: usize,
    },
    /// A query whose callers assume at least one match found none.
    #[error("{query} query matched no rows")]
    EmptyResult { query: &'static str },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP client setup failed: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Geographic enrichment for laureate rows.
///
/// Raw birth countries in the flat-file dataset carry historical names
/// ("Prussia (Germany)", "British India (India)"). The country lookup maps
/// each raw value to a present-day country and its continent. Rows from the
/// API already carry `birth_country_now` and `birth_continent`, so they are
/// enriched straight from their own columns.
///
/// Both paths are pure and order-preserving: one output row per input row,
/// and an unmatched country is not an error.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::logging::Stage;
use crate::model::{CountryLookupEntry, EnrichedRow, FlatLaureateRow, present};

// ---------------------------------------------------------------------------
// Lookup table
// ---------------------------------------------------------------------------

/// Read-only index over the country lookup file, keyed by raw birth country.
#[derive(Debug, Clone, Default)]
pub struct CountryLookup {
    entries: HashMap<String, CountryLookupEntry>,
}

impl CountryLookup {
    /// Builds the index. On a duplicated key the first entry wins.
    pub fn new(entries: Vec<CountryLookupEntry>) -> Self {
        let mut index = HashMap::with_capacity(entries.len());
        for entry in entries {
            if index.contains_key(&entry.birth_country) {
                warn!(
                    stage = %Stage::Enrich,
                    "duplicate lookup entry for '{}', keeping the first",
                    entry.birth_country
                );
                continue;
            }
            index.insert(entry.birth_country.clone(), entry);
        }
        Self { entries: index }
    }

    /// Looks up a raw birth country. Returns `None` if not found.
    pub fn find(&self, birth_country: &str) -> Option<&CountryLookupEntry> {
        self.entries.get(birth_country)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Enrichment
// ---------------------------------------------------------------------------

/// Left join of `rows` against `lookup` on `birth_country`.
///
/// Matched rows get the standardized country and continent. Unmatched rows
/// keep their raw birth country as the standardized value and get no
/// continent.
pub fn enrich_with_lookup(rows: &[FlatLaureateRow], lookup: &CountryLookup) -> Vec<EnrichedRow> {
    let mut unmatched = 0usize;

    let enriched: Vec<EnrichedRow> = rows
        .iter()
        .map(|row| {
            let raw_country = present(&row.fields.birth_country);
            match raw_country.and_then(|c| lookup.find(c)) {
                Some(entry) => EnrichedRow {
                    row: row.clone(),
                    fixed_birth_country: present(&entry.fixed_birth_country)
                        .or(raw_country)
                        .map(String::from),
                    continent: present(&entry.continent).map(String::from),
                },
                None => {
                    unmatched += 1;
                    EnrichedRow {
                        row: row.clone(),
                        fixed_birth_country: raw_country.map(String::from),
                        continent: None,
                    }
                }
            }
        })
        .collect();

    debug!(
        stage = %Stage::Enrich,
        "lookup join: {} rows, {} without a match",
        enriched.len(),
        unmatched
    );
    enriched
}

/// Enrichment for sources that already report a present-day country and a
/// continent per row.
pub fn enrich_from_source(rows: &[FlatLaureateRow]) -> Vec<EnrichedRow> {
    rows.iter()
        .map(|row| EnrichedRow {
            row: row.clone(),
            fixed_birth_country: present(&row.fields.birth_country_now)
                .or_else(|| present(&row.fields.birth_country))
                .map(String::from),
            continent: present(&row.fields.birth_continent).map(String::from),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

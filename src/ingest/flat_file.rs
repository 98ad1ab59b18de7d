/// Flat-file ingestion.
///
/// Reads a laureate table that already holds one row per (laureate, prize)
/// pair, plus the country lookup table used by geo enrichment. Both are
/// comma-separated with a header row.
///
/// The laureate file may use the FlatLaureateRow column names or the legacy
/// export names (`laureate_id`, `sex`). Columns outside the schema are ignored.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::logging::Stage;
use crate::model::{
    CountryLookupEntry, LaureateFields, LaureateType, NAN, NormalizedRow, PipelineError,
    SchemaMismatch,
};
use crate::normalize::Normalized;

/// One line of the laureate file as written on disk. Empty cells arrive as
/// `None`.
#[derive(Debug, Deserialize)]
struct FlatFileRecord {
    #[serde(default, alias = "laureate_id")]
    id: Option<String>,
    #[serde(default)]
    year: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    laureate_type: Option<String>,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default, alias = "sex")]
    gender: Option<String>,
    #[serde(default)]
    birth_date: Option<String>,
    #[serde(default)]
    birth_city: Option<String>,
    #[serde(default)]
    birth_city_now: Option<String>,
    #[serde(default)]
    birth_country: Option<String>,
    #[serde(default)]
    birth_country_now: Option<String>,
    #[serde(default)]
    birth_continent: Option<String>,
    #[serde(default)]
    death_date: Option<String>,
    #[serde(default)]
    prize_share: Option<String>,
    #[serde(default)]
    prize: Option<String>,
    #[serde(default)]
    motivation: Option<String>,
}

fn or_nan(value: Option<String>) -> String {
    value.unwrap_or_else(|| NAN.to_string())
}

impl FlatFileRecord {
    fn into_row(self) -> Result<NormalizedRow, SchemaMismatch> {
        let laureate_type = match self.laureate_type.as_deref().and_then(LaureateType::parse) {
            Some(t) => t,
            None => {
                return Err(SchemaMismatch {
                    record_id: self.id,
                    reason: format!(
                        "unknown laureate_type {:?}",
                        self.laureate_type.as_deref().unwrap_or("")
                    ),
                });
            }
        };

        Ok(NormalizedRow {
            id: or_nan(self.id),
            year: or_nan(self.year),
            fields: LaureateFields {
                category: or_nan(self.category),
                laureate_type,
                full_name: or_nan(self.full_name),
                gender: self.gender,
                birth_date: or_nan(self.birth_date),
                birth_city: or_nan(self.birth_city),
                birth_city_now: or_nan(self.birth_city_now),
                birth_country: or_nan(self.birth_country),
                birth_country_now: or_nan(self.birth_country_now),
                birth_continent: or_nan(self.birth_continent),
                death_date: or_nan(self.death_date),
                prize_share: or_nan(self.prize_share),
                prize: or_nan(self.prize),
                motivation: or_nan(self.motivation),
                affiliations: Vec::new(),
            },
        })
    }
}

/// Reads laureate rows from any CSV source.
pub fn read_laureates<R: Read>(reader: R) -> Result<Normalized, PipelineError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut normalized = Normalized::default();

    for record in csv_reader.deserialize::<FlatFileRecord>() {
        match record?.into_row() {
            Ok(row) => normalized.rows.push(row),
            Err(mismatch) => {
                warn!(stage = %Stage::Normalize, "skipping flat-file row: {}", mismatch);
                normalized.mismatches.push(mismatch);
            }
        }
    }

    Ok(normalized)
}

pub fn load_laureates(path: &Path) -> Result<Normalized, PipelineError> {
    let file = File::open(path).map_err(|e| {
        PipelineError::Config(format!(
            "Failed to open laureate file '{}': {}",
            path.display(),
            e
        ))
    })?;
    let normalized = read_laureates(file)?;
    info!(
        stage = %Stage::Normalize,
        "read {} rows from {}",
        normalized.rows.len(),
        path.display()
    );
    Ok(normalized)
}

/// Reads `(birth_country, fixed_birth_country, continent)` entries.
pub fn read_country_lookup<R: Read>(reader: R) -> Result<Vec<CountryLookupEntry>, PipelineError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut entries = Vec::new();
    for entry in csv_reader.deserialize::<CountryLookupEntry>() {
        entries.push(entry?);
    }
    Ok(entries)
}

pub fn load_country_lookup(path: &Path) -> Result<Vec<CountryLookupEntry>, PipelineError> {
    let file = File::open(path).map_err(|e| {
        PipelineError::Config(format!(
            "Failed to open country lookup '{}': {}",
            path.display(),
            e
        ))
    })?;
    read_country_lookup(file)
}

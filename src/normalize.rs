/// Record normalization.
///
/// Turns nested laureate records into flat rows, one per prize entry. A
/// person with two prizes yields two rows; an affiliation list becomes a
/// sparse, ordered set of `affiliation_{i}_*` cells on that prize's row.
///
/// Absent values are written as the `NaN` sentinel, except `gender` which
/// stays `None`. Records matching neither laureate shape are skipped and
/// reported as `SchemaMismatch` warnings.

use tracing::warn;

use crate::logging::Stage;
use crate::model::{
    AffiliationCells, FlatLaureateRow, LaureateFields, LaureateType, LocalizedText, NAN,
    NormalizedRow, PipelineError, RawEvent, RawIndividual, RawLaureate, RawOrganization,
    RawPlace, RawPrize, SchemaMismatch,
};

/// Rows produced from a batch plus the records that had to be skipped.
#[derive(Debug, Default)]
pub struct Normalized {
    pub rows: Vec<NormalizedRow>,
    pub mismatches: Vec<SchemaMismatch>,
}

impl Normalized {
    pub fn extend(&mut self, other: Normalized) {
        self.rows.extend(other.rows);
        self.mismatches.extend(other.mismatches);
    }
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn text(value: Option<&LocalizedText>) -> String {
    value
        .and_then(|t| t.en.clone())
        .unwrap_or_else(|| NAN.to_string())
}

fn plain(value: Option<&String>) -> String {
    value.cloned().unwrap_or_else(|| NAN.to_string())
}

fn place_text(event: Option<&RawEvent>, pick: fn(&RawPlace) -> Option<&LocalizedText>) -> String {
    text(event.and_then(|e| e.place.as_ref()).and_then(pick))
}

fn event_date(event: Option<&RawEvent>) -> String {
    plain(event.and_then(|e| e.date.as_ref()))
}

/// `"{category full name} {year}"`. A missing half stays as the sentinel.
pub fn prize_label(category_full_name: &str, year: &str) -> String {
    format!("{} {}", category_full_name, year)
}

/// Fields shared by both laureate kinds for one prize.
struct PrizeCells {
    year: String,
    category: String,
    prize_share: String,
    prize: String,
    motivation: String,
}

fn prize_cells(prize: &RawPrize) -> PrizeCells {
    let year = plain(prize.award_year.as_ref());
    let category_full_name = text(prize.category_full_name.as_ref());
    PrizeCells {
        prize: prize_label(&category_full_name, &year),
        year,
        category: text(prize.category.as_ref()),
        prize_share: plain(prize.portion.as_ref()),
        motivation: text(prize.motivation.as_ref()),
    }
}

fn affiliation_cells(prize: &RawPrize) -> Vec<AffiliationCells> {
    prize
        .affiliations
        .iter()
        .map(|a| AffiliationCells {
            name: text(a.name.as_ref()),
            city: text(a.city.as_ref()),
            country: text(a.country.as_ref()),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Per-variant flattening
// ---------------------------------------------------------------------------

fn organization_rows(org: &RawOrganization) -> Vec<NormalizedRow> {
    let id = plain(org.id.as_ref());
    let founded = org.founded.as_ref();

    org.nobel_prizes
        .iter()
        .map(|prize| {
            let cells = prize_cells(prize);
            NormalizedRow {
                id: id.clone(),
                year: cells.year,
                fields: LaureateFields {
                    category: cells.category,
                    laureate_type: LaureateType::Organization,
                    full_name: text(org.org_name.as_ref()),
                    gender: None,
                    birth_date: event_date(founded),
                    birth_city: place_text(founded, |p| p.city.as_ref()),
                    birth_city_now: place_text(founded, |p| p.city_now.as_ref()),
                    birth_country: place_text(founded, |p| p.country.as_ref()),
                    birth_country_now: place_text(founded, |p| p.country_now.as_ref()),
                    birth_continent: place_text(founded, |p| p.continent.as_ref()),
                    death_date: NAN.to_string(),
                    prize_share: cells.prize_share,
                    prize: cells.prize,
                    motivation: cells.motivation,
                    affiliations: Vec::new(),
                },
            }
        })
        .collect()
}

fn individual_rows(person: &RawIndividual) -> Vec<NormalizedRow> {
    let id = plain(person.id.as_ref());
    let birth = person.birth.as_ref();
    let death = person.death.as_ref();

    person
        .nobel_prizes
        .iter()
        .map(|prize| {
            let cells = prize_cells(prize);
            NormalizedRow {
                id: id.clone(),
                year: cells.year,
                fields: LaureateFields {
                    category: cells.category,
                    laureate_type: LaureateType::Individual,
                    full_name: text(person.full_name.as_ref()),
                    gender: person.gender.clone(),
                    birth_date: event_date(birth),
                    birth_city: place_text(birth, |p| p.city.as_ref()),
                    birth_city_now: place_text(birth, |p| p.city_now.as_ref()),
                    birth_country: place_text(birth, |p| p.country.as_ref()),
                    birth_country_now: place_text(birth, |p| p.country_now.as_ref()),
                    birth_continent: place_text(birth, |p| p.continent.as_ref()),
                    death_date: event_date(death),
                    prize_share: cells.prize_share,
                    prize: cells.prize,
                    motivation: cells.motivation,
                    affiliations: affiliation_cells(prize),
                },
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Flattens one record into one row per prize entry.
pub fn normalize_record(record: &RawLaureate) -> Result<Vec<NormalizedRow>, SchemaMismatch> {
    match record {
        RawLaureate::Organization(org) => Ok(organization_rows(org)),
        RawLaureate::Individual(person) => Ok(individual_rows(person)),
        RawLaureate::Unrecognized(_) => Err(SchemaMismatch {
            record_id: record.id(),
            reason: "record has neither orgName nor fullName".to_string(),
        }),
    }
}

/// Flattens a batch, logging and collecting the records it has to skip.
pub fn normalize_records<'a, I>(records: I) -> Normalized
where
    I: IntoIterator<Item = &'a RawLaureate>,
{
    let mut normalized = Normalized::default();

    for record in records {
        match normalize_record(record) {
            Ok(rows) => normalized.rows.extend(rows),
            Err(mismatch) => {
                warn!(stage = %Stage::Normalize, "schema mismatch, skipping {}", mismatch);
                normalized.mismatches.push(mismatch);
            }
        }
    }

    normalized
}

/// Widest affiliation list across `rows`.
pub fn max_affiliations<'a, I>(rows: I) -> usize
where
    I: IntoIterator<Item = &'a LaureateFields>,
{
    rows.into_iter()
        .map(|f| f.affiliations.len())
        .max()
        .unwrap_or(0)
}

/// Casts `id` and `year` to integers.
///
/// Fails on the first row still holding a placeholder or any other
/// non-numeric value: by this point every row is expected to be complete.
pub fn cast_rows(rows: Vec<NormalizedRow>) -> Result<Vec<FlatLaureateRow>, PipelineError> {
    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            let id = row.id.trim().parse::<u32>().map_err(|_| PipelineError::Cast {
                field: "id",
                value: row.id.clone(),
                row: index,
            })?;
            let year = row.year.trim().parse::<i32>().map_err(|_| PipelineError::Cast {
                field: "year",
                value: row.year.clone(),
                row: index,
            })?;
            Ok(FlatLaureateRow {
                id,
                year,
                fields: row.fields,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> RawLaureate {
        serde_json::from_str(json).unwrap()
    }

    fn marie_curie() -> RawLaureate {
        parse(
            r#"{
                "id": "6",
                "fullName": {"en": "Marie Curie"},
                "gender": "female",
                "birth": {
                    "date": "1867-11-07",
                    "place": {
                        "city": {"en": "Warsaw"},
                        "country": {"en": "Russian Empire"},
                        "countryNow": {"en": "Poland"},
                        "continent": {"en": "Europe"}
                    }
                },
                "death": {"date": "1934-07-04"},
                "nobelPrizes": [
                    {
                        "awardYear": "1903",
                        "category": {"en": "Physics"},
                        "categoryFullName": {"en": "The Nobel Prize in Physics"},
                        "portion": "1/4",
                        "affiliations": []
                    },
                    {
                        "awardYear": "1911",
                        "category": {"en": "Chemistry"},
                        "categoryFullName": {"en": "The Nobel Prize in Chemistry"},
                        "portion": "1",
                        "affiliations": [
                            {"name": {"en": "Sorbonne University"}, "city": {"en": "Paris"}, "country": {"en": "France"}}
                        ]
                    }
                ]
            }"#,
        )
    }

    #[test]
    fn test_individual_yields_one_row_per_prize() {
        let rows = normalize_record(&marie_curie()).unwrap();
        assert_eq!(rows.len(), 2);

        assert!(rows.iter().all(|r| r.id == "6"));
        assert!(rows.iter().all(|r| r.fields.full_name == "Marie Curie"));
        assert!(rows.iter().all(|r| r.fields.gender.as_deref() == Some("female")));

        assert_eq!(rows[0].year, "1903");
        assert_eq!(rows[0].fields.category, "Physics");
        assert_eq!(rows[1].year, "1911");
        assert_eq!(rows[1].fields.category, "Chemistry");
    }

    #[test]
    fn test_individual_birth_and_prize_fields() {
        let rows = normalize_record(&marie_curie()).unwrap();
        let first = &rows[0].fields;
        assert_eq!(first.birth_date, "1867-11-07");
        assert_eq!(first.birth_city, "Warsaw");
        assert_eq!(first.birth_city_now, NAN);
        assert_eq!(first.birth_country_now, "Poland");
        assert_eq!(first.birth_continent, "Europe");
        assert_eq!(first.death_date, "1934-07-04");
        assert_eq!(first.prize_share, "1/4");
        assert_eq!(first.prize, "The Nobel Prize in Physics 1903");
        assert_eq!(first.motivation, NAN);
    }

    #[test]
    fn test_affiliations_are_kept_per_prize_in_order() {
        let rows = normalize_record(&marie_curie()).unwrap();
        assert!(rows[0].fields.affiliations.is_empty());
        assert_eq!(
            rows[1].fields.affiliations,
            vec![AffiliationCells {
                name: "Sorbonne University".to_string(),
                city: "Paris".to_string(),
                country: "France".to_string(),
            }]
        );
        assert_eq!(max_affiliations(rows.iter().map(|r| &r.fields)), 1);
    }

    #[test]
    fn test_missing_affiliation_parts_become_sentinel() {
        let record = parse(
            r#"{
                "id": "1",
                "fullName": {"en": "A"},
                "nobelPrizes": [{
                    "awardYear": "1950",
                    "affiliations": [{"name": {"en": "X"}}, {"city": {"en": "Y"}}]
                }]
            }"#,
        );
        let rows = normalize_record(&record).unwrap();
        let affiliations = &rows[0].fields.affiliations;
        assert_eq!(affiliations.len(), 2);
        assert_eq!(affiliations[0].city, NAN);
        assert_eq!(affiliations[1].name, NAN);
        assert_eq!(affiliations[1].city, "Y");
        // no gender key: absent, not the sentinel
        assert_eq!(rows[0].fields.gender, None);
    }

    #[test]
    fn test_organization_uses_founding_place() {
        let record = parse(
            r#"{
                "id": "482",
                "orgName": {"en": "International Committee of the Red Cross"},
                "founded": {
                    "date": "1863-00-00",
                    "place": {"city": {"en": "Geneva"}, "country": {"en": "Switzerland"}, "continent": {"en": "Europe"}}
                },
                "nobelPrizes": [
                    {"awardYear": "1917", "category": {"en": "Peace"}, "categoryFullName": {"en": "The Nobel Peace Prize"}, "portion": "1"},
                    {"awardYear": "1944", "category": {"en": "Peace"}, "categoryFullName": {"en": "The Nobel Peace Prize"}, "portion": "1"},
                    {"awardYear": "1963", "category": {"en": "Peace"}, "categoryFullName": {"en": "The Nobel Peace Prize"}, "portion": "1/2"}
                ]
            }"#,
        );
        let rows = normalize_record(&record).unwrap();
        assert_eq!(rows.len(), 3);
        let first = &rows[0].fields;
        assert_eq!(first.laureate_type, LaureateType::Organization);
        assert_eq!(first.full_name, "International Committee of the Red Cross");
        assert_eq!(first.gender, None);
        assert_eq!(first.birth_date, "1863-00-00");
        assert_eq!(first.birth_city, "Geneva");
        assert_eq!(first.birth_continent, "Europe");
        assert_eq!(first.death_date, NAN);
        assert_eq!(rows[2].fields.prize, "The Nobel Peace Prize 1963");
    }

    #[test]
    fn test_record_without_name_is_a_schema_mismatch() {
        let record = parse(r#"{"id": "999", "founded": {"date": "1900-00-00"}, "nobelPrizes": [{"awardYear": "1950"}]}"#);
        let mismatch = normalize_record(&record).unwrap_err();
        assert_eq!(mismatch.record_id.as_deref(), Some("999"));

        let normalized = normalize_records([&record, &marie_curie()]);
        assert_eq!(normalized.rows.len(), 2);
        assert_eq!(normalized.mismatches.len(), 1);
    }

    #[test]
    fn test_prize_label_keeps_sentinel_halves() {
        assert_eq!(prize_label("The Nobel Prize in Physics", "1901"), "The Nobel Prize in Physics 1901");
        assert_eq!(prize_label(NAN, "1901"), "NaN 1901");
        assert_eq!(prize_label("The Nobel Prize in Physics", NAN), "The Nobel Prize in Physics NaN");
    }

    #[test]
    fn test_mistyped_category_still_yields_a_row() {
        let record = parse(
            r#"{"id": "1", "fullName": {"en": "Wilhelm Roentgen"}, "gender": "male",
                "nobelPrizes": [{"awardYear": "1901", "category": "Physics"}]}"#,
        );
        let rows = normalize_record(&record).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].year, "1901");
        assert_eq!(rows[0].fields.full_name, "Wilhelm Roentgen");
        assert_eq!(rows[0].fields.category, NAN);
        assert_eq!(rows[0].fields.prize, "NaN 1901");
    }

    #[test]
    fn test_cast_rows_converts_keys() {
        let rows = normalize_record(&marie_curie()).unwrap();
        let cast = cast_rows(rows).unwrap();
        assert_eq!(cast[0].id, 6);
        assert_eq!(cast[0].year, 1903);
        assert_eq!(cast[1].year, 1911);
    }

    #[test]
    fn test_cast_rows_fails_on_placeholder() {
        let record = parse(r#"{"fullName": {"en": "No Id"}, "nobelPrizes": [{"awardYear": "1999"}]}"#);
        let rows = normalize_record(&record).unwrap();
        match cast_rows(rows) {
            Err(PipelineError::Cast { field, value, row }) => {
                assert_eq!(field, "id");
                assert_eq!(value, NAN);
                assert_eq!(row, 0);
            }
            other => panic!("expected cast failure, got {:?}", other),
        }
    }
}

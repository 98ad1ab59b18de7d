/// Flat table persistence.
///
/// Rows carry only the affiliations their prize actually lists. The table
/// written here is as wide as the widest row: `affiliation_{i}_name`,
/// `affiliation_{i}_city` and `affiliation_{i}_country` for every `i` up to
/// that maximum, with empty cells where a row has fewer affiliations.

use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::logging::Stage;
use crate::model::{FlatLaureateRow, PipelineError};
use crate::normalize::max_affiliations;

/// Columns every row has, in output order.
pub const BASE_COLUMNS: [&str; 16] = [
    "id",
    "year",
    "category",
    "laureate_type",
    "full_name",
    "gender",
    "birth_date",
    "birth_city",
    "birth_city_now",
    "birth_country",
    "birth_country_now",
    "birth_continent",
    "death_date",
    "prize_share",
    "prize",
    "motivation",
];

pub fn affiliation_columns(index: usize) -> [String; 3] {
    [
        format!("affiliation_{}_name", index),
        format!("affiliation_{}_city", index),
        format!("affiliation_{}_country", index),
    ]
}

pub fn table_header(affiliation_width: usize) -> Vec<String> {
    let mut header: Vec<String> = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
    for i in 1..=affiliation_width {
        header.extend(affiliation_columns(i));
    }
    header
}

/// One output line, padded with empty cells up to `affiliation_width`.
pub fn row_cells(row: &FlatLaureateRow, affiliation_width: usize) -> Vec<String> {
    let f = &row.fields;
    let mut cells = vec![
        row.id.to_string(),
        row.year.to_string(),
        f.category.clone(),
        f.laureate_type.to_string(),
        f.full_name.clone(),
        f.gender.clone().unwrap_or_default(),
        f.birth_date.clone(),
        f.birth_city.clone(),
        f.birth_city_now.clone(),
        f.birth_country.clone(),
        f.birth_country_now.clone(),
        f.birth_continent.clone(),
        f.death_date.clone(),
        f.prize_share.clone(),
        f.prize.clone(),
        f.motivation.clone(),
    ];

    for i in 0..affiliation_width {
        match f.affiliations.get(i) {
            Some(a) => cells.extend([a.name.clone(), a.city.clone(), a.country.clone()]),
            None => cells.extend([String::new(), String::new(), String::new()]),
        }
    }
    cells
}

pub fn write_flat_table<W: Write>(writer: W, rows: &[FlatLaureateRow]) -> Result<(), PipelineError> {
    let width = max_affiliations(rows.iter().map(|r| &r.fields));
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record(table_header(width))?;
    for row in rows {
        csv_writer.write_record(row_cells(row, width))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Writes the table to `path`, replacing any previous file.
pub fn save_flat_table(path: &Path, rows: &[FlatLaureateRow]) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(path)?;
    write_flat_table(file, rows)?;
    info!(stage = %Stage::Output, "wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AffiliationCells, LaureateFields, LaureateType, NAN};

    fn row(id: u32, gender: Option<&str>, affiliations: usize) -> FlatLaureateRow {
        FlatLaureateRow {
            id,
            year: 1903,
            fields: LaureateFields {
                category: "Physics".to_string(),
                laureate_type: LaureateType::Individual,
                full_name: format!("Laureate {}", id),
                gender: gender.map(String::from),
                birth_date: NAN.to_string(),
                birth_city: NAN.to_string(),
                birth_city_now: NAN.to_string(),
                birth_country: NAN.to_string(),
                birth_country_now: NAN.to_string(),
                birth_continent: NAN.to_string(),
                death_date: NAN.to_string(),
                prize_share: "1/2".to_string(),
                prize: "The Nobel Prize in Physics 1903".to_string(),
                motivation: NAN.to_string(),
                affiliations: (1..=affiliations)
                    .map(|i| AffiliationCells {
                        name: format!("Univ {}", i),
                        city: format!("City {}", i),
                        country: "France".to_string(),
                    })
                    .collect(),
            },
        }
    }

    fn written(rows: &[FlatLaureateRow]) -> Vec<Vec<String>> {
        let mut buffer = Vec::new();
        write_flat_table(&mut buffer, rows).unwrap();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(buffer.as_slice());
        reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect()
    }

    #[test]
    fn test_header_without_affiliations() {
        assert_eq!(table_header(0).len(), BASE_COLUMNS.len());
    }

    #[test]
    fn test_header_widens_to_max_affiliations() {
        let lines = written(&[row(1, Some("female"), 0), row(2, Some("male"), 2)]);
        let header = &lines[0];
        assert_eq!(header.len(), 16 + 6);
        assert_eq!(header[16], "affiliation_1_name");
        assert_eq!(header[21], "affiliation_2_country");
    }

    #[test]
    fn test_short_rows_are_padded_with_empty_cells() {
        let lines = written(&[row(1, Some("female"), 1), row(2, Some("male"), 2)]);
        let first = &lines[1];
        assert_eq!(first.len(), 22);
        assert_eq!(first[16], "Univ 1");
        assert_eq!(first[19], "");
        assert_eq!(lines[2][19], "Univ 2");
    }

    #[test]
    fn test_absent_gender_is_empty_cell_and_sentinel_is_kept() {
        let lines = written(&[row(7, None, 0)]);
        assert_eq!(lines[1][0], "7");
        assert_eq!(lines[1][5], "");
        assert_eq!(lines[1][6], NAN);
    }

    #[test]
    fn test_save_overwrites_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("nobel.csv");

        save_flat_table(&path, &[row(1, None, 0), row(2, None, 0)]).unwrap();
        save_flat_table(&path, &[row(3, None, 0)]).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.lines().nth(1).unwrap().starts_with("3,"));
    }
}

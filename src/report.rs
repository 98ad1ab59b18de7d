/// Report hand-off.
///
/// The aggregates are turned into plain keyed tables and given to a
/// `ReportSink`. Charting tools read what the sink writes; nothing here
/// renders anything. `CsvReportSink` writes one CSV per table plus a
/// `report.json` that carries the run parameters and the first-woman answer.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::analysis::aggregates::{AggregateSet, countries_in_continent};
use crate::logging::Stage;
use crate::model::PipelineError;

// ---------------------------------------------------------------------------
// Generic tables
// ---------------------------------------------------------------------------

/// One grouped row: key values, a count, and an optional share.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub keys: Vec<String>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateTable {
    pub name: String,
    pub key_columns: Vec<String>,
    pub rows: Vec<AggregateRow>,
}

impl AggregateTable {
    fn new(name: &str, key_columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            key_columns: key_columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    fn push(&mut self, keys: Vec<String>, count: usize) {
        self.rows.push(AggregateRow {
            keys,
            count,
            ratio: None,
        });
    }

    fn has_ratio(&self) -> bool {
        self.rows.iter().any(|r| r.ratio.is_some())
    }

    /// Header row: key columns, `counts`, and `ratio` when any row has one.
    pub fn header(&self) -> Vec<String> {
        let mut header = self.key_columns.clone();
        header.push("counts".to_string());
        if self.has_ratio() {
            header.push("ratio".to_string());
        }
        header
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), PipelineError> {
        let with_ratio = self.has_ratio();
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(self.header())?;
        for row in &self.rows {
            let mut record = row.keys.clone();
            record.push(row.count.to_string());
            if with_ratio {
                record.push(row.ratio.map(|r| r.to_string()).unwrap_or_default());
            }
            writer.write_record(record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportParams {
    pub filter_continent: String,
    pub female_marker: String,
    pub male_marker: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FirstWomanAnswer {
    pub full_name: String,
    pub category: String,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub generated_at: String,
    pub params: ReportParams,
    pub row_count: usize,
    pub first_woman: FirstWomanAnswer,
    /// Category order for the gender-by-category chart.
    pub category_order: Vec<String>,
    pub tables: Vec<AggregateTable>,
}

impl Report {
    pub fn table(&self, name: &str) -> Option<&AggregateTable> {
        self.tables.iter().find(|t| t.name == name)
    }
}

pub fn build_report(set: &AggregateSet<'_>, params: &ReportParams, row_count: usize) -> Report {
    let mut decades = AggregateTable::new("decade_counts", &["decade"]);
    for d in &set.decades {
        decades.push(vec![d.decade.clone()], d.counts);
    }

    let mut prize_numbers = AggregateTable::new("repeat_winner_counts", &["full_name"]);
    for p in &set.repeat_winners.prize_numbers {
        prize_numbers.push(vec![p.full_name.clone()], p.prize_number);
    }

    // Scatter data: one line per prize, counted with the winner's total.
    let mut repeat_prizes =
        AggregateTable::new("repeat_winner_prizes", &["full_name", "year", "category"]);
    for entry in &set.repeat_winners.rows {
        let f = &entry.row.fields;
        let total = set
            .repeat_winners
            .prize_numbers
            .iter()
            .find(|p| p.full_name == f.full_name)
            .map(|p| p.prize_number)
            .unwrap_or(0);
        repeat_prizes.push(
            vec![f.full_name.clone(), entry.row.year.to_string(), f.category.clone()],
            total,
        );
    }

    let mut gender_ratio = AggregateTable::new("gender_ratio", &["gender"]);
    for share in &set.gender_ratio {
        gender_ratio.rows.push(AggregateRow {
            keys: vec![share.gender.clone()],
            count: share.count,
            ratio: Some(share.ratio),
        });
    }

    let mut by_category = AggregateTable::new("gender_by_category", &["category", "gender"]);
    for c in &set.gender_by_category.counts {
        by_category.push(vec![c.category.clone(), c.gender.clone()], c.counts);
    }

    let mut countries = AggregateTable::new("country_counts", &["continent", "fixed_birth_country"]);
    for c in &set.countries {
        countries.push(vec![c.continent.clone(), c.fixed_birth_country.clone()], c.counts);
    }

    let mut one_continent =
        AggregateTable::new("country_counts_filtered", &["continent", "fixed_birth_country"]);
    for c in countries_in_continent(&set.countries, &params.filter_continent) {
        one_continent.push(vec![c.continent, c.fixed_birth_country], c.counts);
    }

    let mut by_continent = AggregateTable::new("gender_by_continent", &["continent", "gender"]);
    for c in &set.gender_by_continent {
        by_continent.push(vec![c.continent.clone(), c.gender.clone()], c.counts);
    }

    let first = &set.first_woman.row;
    Report {
        generated_at: Utc::now().to_rfc3339(),
        params: params.clone(),
        row_count,
        first_woman: FirstWomanAnswer {
            full_name: first.fields.full_name.clone(),
            category: first.fields.category.clone(),
            year: first.year,
        },
        category_order: set.gender_by_category.category_order.clone(),
        tables: vec![
            decades,
            prize_numbers,
            repeat_prizes,
            gender_ratio,
            by_category,
            countries,
            one_continent,
            by_continent,
        ],
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Receives the finished report. Implemented by whatever renders charts.
pub trait ReportSink {
    fn publish(&self, report: &Report) -> Result<(), PipelineError>;
}

/// Writes `<table>.csv` files and `report.json` into a directory.
pub struct CsvReportSink {
    dir: PathBuf,
}

impl CsvReportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ReportSink for CsvReportSink {
    fn publish(&self, report: &Report) -> Result<(), PipelineError> {
        fs::create_dir_all(&self.dir)?;

        for table in &report.tables {
            table.write_csv(&self.dir.join(format!("{}.csv", table.name)))?;
        }

        let json = serde_json::to_string_pretty(report)?;
        fs::write(self.dir.join("report.json"), json)?;

        info!(
            stage = %Stage::Output,
            "published {} tables to {}",
            report.tables.len(),
            self.dir.display()
        );
        Ok(())
    }
}

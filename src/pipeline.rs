//! One batch run, end to end.
//!
//! fetch (or read) → normalize → cast → persist flat table → enrich →
//! aggregate → publish report. Each stage finishes before the next starts
//! and nothing reads back from a later stage.

use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::analysis::aggregates::aggregate_all;
use crate::config::{Config, SourceMode};
use crate::geo::{CountryLookup, enrich_from_source, enrich_with_lookup};
use crate::ingest::flat_file::{load_country_lookup, load_laureates};
use crate::ingest::nobel_api::{NobelApiClient, PageSource, Pages};
use crate::logging::{Stage, log_fetch_failure, log_ingest_summary};
use crate::model::{EnrichedRow, FlatLaureateRow, PipelineError};
use crate::normalize::{Normalized, cast_rows, normalize_records};
use crate::output::save_flat_table;
use crate::report::{CsvReportSink, FirstWomanAnswer, ReportParams, ReportSink, build_report};

// ============================================================================
// Run Summary
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub timestamp: String,
    pub mode: String,
    pub pages_fetched: usize,
    pub raw_records: usize,
    pub rows: usize,
    pub schema_mismatches: usize,
    pub truncated: bool,
    pub truncation_error: Option<String>,
    pub first_woman: Option<FirstWomanAnswer>,
    pub report_tables: usize,
}

impl RunSummary {
    fn new(mode: SourceMode) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            mode: match mode {
                SourceMode::Api => "api".to_string(),
                SourceMode::File => "file".to_string(),
            },
            pages_fetched: 0,
            raw_records: 0,
            rows: 0,
            schema_mismatches: 0,
            truncated: false,
            truncation_error: None,
            first_woman: None,
            report_tables: 0,
        }
    }
}

// ============================================================================
// Runners
// ============================================================================

/// Runs the configured source with the default HTTP client and CSV report sink.
pub fn run(config: &Config) -> Result<RunSummary, PipelineError> {
    let sink = CsvReportSink::new(&config.output.report_dir);
    match config.source.mode {
        SourceMode::Api => {
            let client = NobelApiClient::new(
                &config.api.endpoint,
                Duration::from_secs(config.api.timeout_secs),
            )?;
            info!(stage = %Stage::Fetch, "fetching laureates from {}", client.endpoint());
            run_api(config, &client, &sink)
        }
        SourceMode::File => run_file(config, &sink),
    }
}

/// API mode: page through `source` until exhausted or a request fails.
/// Each page is normalized as it arrives. A failed request keeps every row
/// from the pages before it.
pub fn run_api<S: PageSource, K: ReportSink>(
    config: &Config,
    source: &S,
    sink: &K,
) -> Result<RunSummary, PipelineError> {
    let mut summary = RunSummary::new(SourceMode::Api);
    let mut normalized = Normalized::default();

    let mut pages = Pages::new(source, config.api.page_size);
    while let Some(page) = pages.next() {
        match page {
            Ok(batch) => {
                summary.pages_fetched += 1;
                summary.raw_records += batch.len();
                normalized.extend(normalize_records(&batch));
            }
            Err(err) => {
                log_fetch_failure(pages.offset(), &err);
                summary.truncated = true;
                summary.truncation_error = Some(err.to_string());
            }
        }
    }

    summary.schema_mismatches = normalized.mismatches.len();
    log_ingest_summary(
        summary.pages_fetched,
        summary.raw_records,
        normalized.rows.len(),
        summary.schema_mismatches,
        summary.truncated,
    );

    let rows = cast_rows(normalized.rows)?;
    save_flat_table(&config.output.table, &rows)?;

    let enriched = enrich_from_source(&rows);
    finish(config, &rows, &enriched, sink, summary)
}

/// Flat-file mode: read the laureate table and join it against the country
/// lookup.
pub fn run_file<K: ReportSink>(config: &Config, sink: &K) -> Result<RunSummary, PipelineError> {
    let mut summary = RunSummary::new(SourceMode::File);

    let normalized = load_laureates(&config.file.laureates)?;
    summary.raw_records = normalized.rows.len() + normalized.mismatches.len();
    summary.schema_mismatches = normalized.mismatches.len();
    log_ingest_summary(0, summary.raw_records, normalized.rows.len(), summary.schema_mismatches, false);

    let rows = cast_rows(normalized.rows)?;
    save_flat_table(&config.output.table, &rows)?;

    let lookup = CountryLookup::new(load_country_lookup(&config.file.country_lookup)?);
    if lookup.is_empty() {
        warn!(stage = %Stage::Enrich, "country lookup is empty, no row will get a continent");
    } else {
        info!(stage = %Stage::Enrich, "loaded {} country lookup entries", lookup.len());
    }
    let enriched = enrich_with_lookup(&rows, &lookup);
    finish(config, &rows, &enriched, sink, summary)
}

fn finish<K: ReportSink>(
    config: &Config,
    rows: &[FlatLaureateRow],
    enriched: &[EnrichedRow],
    sink: &K,
    mut summary: RunSummary,
) -> Result<RunSummary, PipelineError> {
    summary.rows = rows.len();

    let markers = config.gender_markers();
    let set = aggregate_all(enriched, &markers)?;
    let params = ReportParams {
        filter_continent: config.report.filter_continent.clone(),
        female_marker: markers.female,
        male_marker: markers.male,
    };
    let report = build_report(&set, &params, enriched.len());

    info!(
        stage = %Stage::Aggregate,
        "The first woman to win a Nobel Prize was {}, in the category of {} ({}).",
        report.first_woman.full_name,
        report.first_woman.category,
        report.first_woman.year
    );

    sink.publish(&report)?;
    summary.first_woman = Some(report.first_woman.clone());
    summary.report_tables = report.tables.len();
    Ok(summary)
}

pub fn print_summary(summary: &RunSummary) {
    println!("\n═══════════════════════════════════════════════════════════");
    println!("📊 RUN SUMMARY ({})", summary.mode);
    println!("═══════════════════════════════════════════════════════════");
    println!();
    if summary.mode == "api" {
        println!("Pages fetched:      {}", summary.pages_fetched);
    }
    println!("Raw records:        {}", summary.raw_records);
    println!("Flat rows:          {}", summary.rows);
    println!("Schema mismatches:  {}", summary.schema_mismatches);
    if let Some(err) = &summary.truncation_error {
        println!("⚠ Ingestion truncated: {}", err);
    }
    if let Some(first) = &summary.first_woman {
        println!();
        println!(
            "First woman laureate: {} ({}, {})",
            first.full_name, first.category, first.year
        );
    }
    println!("Report tables:      {}", summary.report_tables);
    println!("═══════════════════════════════════════════════════════════");
}

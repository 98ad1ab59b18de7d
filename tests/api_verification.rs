//! Live Laureates API Verification
//!
//! These tests hit the public laureates endpoint and check that the record
//! shapes the normalizer depends on are still served. They are ignored by
//! default; run them before changing the paging or record parsing code:
//!
//!     cargo test --test api_verification -- --ignored --nocapture

use std::time::Duration;

use nobel_etl::ingest::nobel_api::{NOBEL_API_URL, NobelApiClient, PageSource, Pages};
use nobel_etl::model::RawLaureate;
use nobel_etl::normalize::{Normalized, cast_rows, normalize_records};

fn client() -> NobelApiClient {
    NobelApiClient::new(NOBEL_API_URL, Duration::from_secs(30)).unwrap()
}

#[test]
#[ignore] // Only run manually - makes real API calls
fn test_first_page_has_both_laureate_kinds() {
    let records = client().fetch_page(0, 100).unwrap();

    let individuals = records
        .iter()
        .filter(|r| matches!(r, RawLaureate::Individual(_)))
        .count();
    let organizations = records
        .iter()
        .filter(|r| matches!(r, RawLaureate::Organization(_)))
        .count();
    let unrecognized = records.len() - individuals - organizations;

    println!("\n🔍 First page of {}:", NOBEL_API_URL);
    println!("═══════════════════════════════════════════════════════════");
    println!("  Records:        {}", records.len());
    println!("  Individuals:    {}", individuals);
    println!("  Organizations:  {}", organizations);
    println!("  Unrecognized:   {}", unrecognized);
    println!("═══════════════════════════════════════════════════════════\n");

    assert_eq!(records.len(), 100, "a full first page was expected");
    assert!(individuals > 0, "no individual laureates on the first page");
    assert_eq!(unrecognized, 0, "the API served records of an unknown shape");
}

#[test]
#[ignore] // Only run manually - makes real API calls
fn test_full_paging_run_casts_cleanly() {
    let client = client();
    let mut normalized = Normalized::default();
    let mut pages = 0;
    let mut records = 0;

    for page in Pages::new(&client, 100) {
        match page {
            Ok(batch) => {
                pages += 1;
                records += batch.len();
                normalized.extend(normalize_records(&batch));
            }
            Err(err) => panic!("paging stopped after {} pages: {}", pages, err),
        }
    }

    println!(
        "\n✓ {} pages, {} records, {} rows, {} mismatches",
        pages,
        records,
        normalized.rows.len(),
        normalized.mismatches.len()
    );

    // There are close to a thousand laureates, and more prizes than people.
    assert!(records > 900);
    assert!(normalized.rows.len() >= records - normalized.mismatches.len());

    let rows = cast_rows(normalized.rows).unwrap();
    assert!(rows.iter().any(|r| r.fields.gender.as_deref() == Some("female")));
    assert!(rows.iter().all(|r| r.year >= 1901));
}

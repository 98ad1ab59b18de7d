/// Descriptive aggregates over the enriched laureate table.
///
/// Every query is read-only and independent of the others. Groupings are
/// built on `BTreeMap`s so their key order is deterministic, and every sort
/// is stable, so ties keep the order the grouping produced.
///
/// Only the first-woman query treats an empty match as an error; the rest
/// return an empty table.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::model::{EnrichedRow, PipelineError};

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecadeCount {
    pub decade: String,
    pub counts: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrizeCount {
    pub full_name: String,
    pub prize_number: usize,
}

/// Laureates credited more than once, and every row that belongs to them.
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatWinners<'a> {
    /// Sorted by `prize_number` descending.
    pub prize_numbers: Vec<PrizeCount>,
    /// In table order.
    pub rows: Vec<&'a EnrichedRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenderShare {
    pub gender: String,
    pub count: usize,
    pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryGenderCount {
    pub category: String,
    pub gender: String,
    pub counts: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenderByCategory {
    pub counts: Vec<CategoryGenderCount>,
    /// Categories ranked by how many rows carry the ordering marker,
    /// descending; categories without any follow alphabetically.
    pub category_order: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryCount {
    pub continent: String,
    pub fixed_birth_country: String,
    pub counts: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContinentGenderCount {
    pub continent: String,
    pub gender: String,
    pub counts: usize,
}

// ---------------------------------------------------------------------------
// 1. First woman
// ---------------------------------------------------------------------------

/// The earliest row whose gender equals `female_marker`. On equal years the
/// row that comes first in the table wins.
pub fn first_woman<'a>(
    table: &'a [EnrichedRow],
    female_marker: &str,
) -> Result<&'a EnrichedRow, PipelineError> {
    table
        .iter()
        .filter(|e| e.row.fields.gender.as_deref() == Some(female_marker))
        .min_by_key(|e| e.row.year)
        .ok_or(PipelineError::EmptyResult {
            query: "first woman",
        })
}

// ---------------------------------------------------------------------------
// 2. Decades
// ---------------------------------------------------------------------------

/// Year with its last digit zeroed.
pub fn decade_of(year: i32) -> i32 {
    year - year.rem_euclid(10)
}

/// `1903` → `"1900s"`.
pub fn decade_label(year: i32) -> String {
    format!("{}s", decade_of(year))
}

/// Rows per decade, oldest decade first. Decades without winners are absent.
pub fn decade_counts(table: &[EnrichedRow]) -> Vec<DecadeCount> {
    let mut by_decade: BTreeMap<i32, usize> = BTreeMap::new();
    for entry in table {
        *by_decade.entry(decade_of(entry.row.year)).or_default() += 1;
    }

    by_decade
        .into_iter()
        .map(|(decade, counts)| DecadeCount {
            decade: decade_label(decade),
            counts,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// 3. Repeat winners
// ---------------------------------------------------------------------------

pub fn repeat_winners(table: &[EnrichedRow]) -> RepeatWinners<'_> {
    let mut by_name: BTreeMap<&str, usize> = BTreeMap::new();
    for entry in table {
        *by_name.entry(entry.row.fields.full_name.as_str()).or_default() += 1;
    }

    let mut prize_numbers: Vec<PrizeCount> = by_name
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(name, n)| PrizeCount {
            full_name: name.to_string(),
            prize_number: n,
        })
        .collect();
    prize_numbers.sort_by(|a, b| b.prize_number.cmp(&a.prize_number));

    let repeat_names: HashSet<&str> = prize_numbers.iter().map(|p| p.full_name.as_str()).collect();
    let rows = table
        .iter()
        .filter(|e| repeat_names.contains(e.row.fields.full_name.as_str()))
        .collect();

    RepeatWinners {
        prize_numbers,
        rows,
    }
}

// ---------------------------------------------------------------------------
// 4. Gender
// ---------------------------------------------------------------------------

/// Share of rows per gender value. Rows without a gender are left out of
/// both numerator and denominator, so the ratios sum to 1.0 whenever any
/// gender is known. Ordered by count descending.
pub fn gender_ratio(table: &[EnrichedRow]) -> Vec<GenderShare> {
    let mut by_gender: BTreeMap<&str, usize> = BTreeMap::new();
    for gender in table.iter().filter_map(|e| e.row.fields.gender.as_deref()) {
        *by_gender.entry(gender).or_default() += 1;
    }

    let total: usize = by_gender.values().sum();
    let mut shares: Vec<GenderShare> = by_gender
        .into_iter()
        .map(|(gender, count)| GenderShare {
            gender: gender.to_string(),
            count,
            ratio: count as f64 / total as f64,
        })
        .collect();
    shares.sort_by(|a, b| b.count.cmp(&a.count));
    shares
}

/// Rows per (category, gender), plus a category ranking by the number of
/// rows whose gender equals `order_marker`.
pub fn gender_by_category(table: &[EnrichedRow], order_marker: &str) -> GenderByCategory {
    let mut by_pair: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for entry in table {
        if let Some(gender) = entry.row.fields.gender.as_deref() {
            *by_pair.entry((entry.row.fields.category.as_str(), gender)).or_default() += 1;
        }
    }

    let mut marker_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for ((category, gender), n) in &by_pair {
        let slot = marker_counts.entry(*category).or_default();
        if *gender == order_marker {
            *slot += n;
        }
    }
    let mut ranked: Vec<(&str, usize)> = marker_counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    GenderByCategory {
        counts: by_pair
            .into_iter()
            .map(|((category, gender), counts)| CategoryGenderCount {
                category: category.to_string(),
                gender: gender.to_string(),
                counts,
            })
            .collect(),
        category_order: ranked.into_iter().map(|(c, _)| c.to_string()).collect(),
    }
}

// ---------------------------------------------------------------------------
// 5. Birth country and continent
// ---------------------------------------------------------------------------

/// Rows per (continent, standardized country), sorted by continent
/// ascending and then count descending. Rows missing either key are left out.
pub fn country_counts(table: &[EnrichedRow]) -> Vec<CountryCount> {
    let mut by_country: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for entry in table {
        if let (Some(continent), Some(country)) =
            (entry.continent.as_deref(), entry.fixed_birth_country.as_deref())
        {
            *by_country.entry((continent, country)).or_default() += 1;
        }
    }

    let mut counts: Vec<CountryCount> = by_country
        .into_iter()
        .map(|((continent, country), counts)| CountryCount {
            continent: continent.to_string(),
            fixed_birth_country: country.to_string(),
            counts,
        })
        .collect();
    counts.sort_by(|a, b| {
        a.continent
            .cmp(&b.continent)
            .then_with(|| b.counts.cmp(&a.counts))
    });
    counts
}

/// The rows of a `country_counts` table for one continent, order kept.
pub fn countries_in_continent(counts: &[CountryCount], continent: &str) -> Vec<CountryCount> {
    counts
        .iter()
        .filter(|c| c.continent == continent)
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// 6. Gender by continent
// ---------------------------------------------------------------------------

/// Rows per (continent, gender). Rows without a continent or gender are
/// excluded before grouping.
pub fn gender_by_continent(table: &[EnrichedRow]) -> Vec<ContinentGenderCount> {
    let mut by_pair: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for entry in table {
        if let (Some(continent), Some(gender)) =
            (entry.continent.as_deref(), entry.row.fields.gender.as_deref())
        {
            *by_pair.entry((continent, gender)).or_default() += 1;
        }
    }

    by_pair
        .into_iter()
        .map(|((continent, gender), counts)| ContinentGenderCount {
            continent: continent.to_string(),
            gender: gender.to_string(),
            counts,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// All at once
// ---------------------------------------------------------------------------

/// Gender labels used by the queries that filter or rank on gender.
#[derive(Debug, Clone, PartialEq)]
pub struct GenderMarkers {
    pub female: String,
    pub male: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSet<'a> {
    pub first_woman: &'a EnrichedRow,
    pub decades: Vec<DecadeCount>,
    pub repeat_winners: RepeatWinners<'a>,
    pub gender_ratio: Vec<GenderShare>,
    pub gender_by_category: GenderByCategory,
    pub countries: Vec<CountryCount>,
    pub gender_by_continent: Vec<ContinentGenderCount>,
}

pub fn aggregate_all<'a>(
    table: &'a [EnrichedRow],
    markers: &GenderMarkers,
) -> Result<AggregateSet<'a>, PipelineError> {
    Ok(AggregateSet {
        first_woman: first_woman(table, &markers.female)?,
        decades: decade_counts(table),
        repeat_winners: repeat_winners(table),
        gender_ratio: gender_ratio(table),
        gender_by_category: gender_by_category(table, &markers.male),
        countries: country_counts(table),
        gender_by_continent: gender_by_continent(table),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

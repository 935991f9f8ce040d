//! Label record normalization.
//!
//! Turns raw label records into validated [`NormalizedLabel`]s. Records
//! missing a usable year, route or ingredient list are rejected with a
//! [`MalformedRecord`] reason rather than failing the run.

use crate::error::MalformedRecord;
use crate::models::{CountingPolicy, LabelRecord, NormalizedLabel, UNKNOWN_DRUG_NAME};
use chrono::{Datelike, NaiveDate};
use std::collections::HashSet;

/// Validates label records and extracts the fields the aggregates need.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    counting: CountingPolicy,
}

impl Normalizer {
    pub fn new(counting: CountingPolicy) -> Self {
        Self { counting }
    }

    pub fn counting(&self) -> CountingPolicy {
        self.counting
    }

    /// Normalize one record.
    pub fn normalize(&self, record: &LabelRecord) -> Result<NormalizedLabel, MalformedRecord> {
        let year = parse_year(record.effective_time.as_deref())?;

        let routes = collect_routes(&record.openfda.route);
        if routes.is_empty() {
            return Err(MalformedRecord::MissingRoute);
        }

        let ingredient_count = count_ingredients(&record.spl_product_data_elements, self.counting);
        if ingredient_count == 0 {
            return Err(MalformedRecord::MissingIngredients);
        }

        Ok(NormalizedLabel {
            year,
            routes,
            ingredient_count,
            drug_name: drug_name(record),
        })
    }
}

/// Extract the year from an `effective_time` value.
///
/// Accepts `YYYYMMDD` (must be a real calendar date) or a bare `YYYY`.
fn parse_year(effective_time: Option<&str>) -> Result<i32, MalformedRecord> {
    let raw = effective_time
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(MalformedRecord::MissingEffectiveTime)?;

    let invalid = || MalformedRecord::InvalidYear(raw.to_string());

    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let year = match raw.len() {
        8 => NaiveDate::parse_from_str(raw, "%Y%m%d")
            .map(|date| date.year())
            .map_err(|_| invalid())?,
        4 => raw.parse::<i32>().map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };

    if (1000..=9999).contains(&year) {
        Ok(year)
    } else {
        Err(invalid())
    }
}

/// Trimmed, upper-cased, non-empty routes without duplicates, in
/// first-seen order. openFDA's harmonized routes are upper case.
fn collect_routes(routes: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    routes
        .iter()
        .map(|r| r.trim().to_uppercase())
        .filter(|r| !r.is_empty())
        .filter(|r| seen.insert(r.clone()))
        .collect()
}

/// Count the whitespace-delimited ingredient elements across all entries.
fn count_ingredients(elements: &[String], counting: CountingPolicy) -> usize {
    let tokens = elements.iter().flat_map(|e| e.split_whitespace());

    match counting {
        CountingPolicy::Raw => tokens.count(),
        CountingPolicy::Distinct => tokens
            .map(|t| t.to_lowercase())
            .collect::<HashSet<_>>()
            .len(),
    }
}

/// First generic name, else first brand name, else a placeholder.
fn drug_name(record: &LabelRecord) -> String {
    record
        .openfda
        .generic_name
        .iter()
        .chain(record.openfda.brand_name.iter())
        .map(|n| n.trim())
        .find(|n| !n.is_empty())
        .unwrap_or(UNKNOWN_DRUG_NAME)
        .to_string()
}

//! Data models for the label analytics pipeline.
//!
//! This module contains the core data structures that flow through
//! the pipeline: raw label records as the API returns them, the
//! normalized entries derived from them, and the aggregate rows and
//! report that come out the other end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Placeholder drug name for labels that carry neither a generic nor a brand name.
pub const UNKNOWN_DRUG_NAME: &str = "UNKNOWN";

/// One element of the label API's `results` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelRecord {
    /// Label document id.
    #[serde(default)]
    pub id: String,
    /// Set id shared by all versions of the same label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_id: Option<String>,
    /// Effective date of the label, `YYYYMMDD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_time: Option<String>,
    /// Product data elements: free text listing the product's ingredients.
    #[serde(default)]
    pub spl_product_data_elements: Vec<String>,
    /// Harmonized fields added by openFDA.
    #[serde(default)]
    pub openfda: OpenFdaFields,
}

/// The `openfda` sub-object of a label record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenFdaFields {
    #[serde(default)]
    pub generic_name: Vec<String>,
    #[serde(default)]
    pub brand_name: Vec<String>,
    #[serde(default)]
    pub manufacturer_name: Vec<String>,
    #[serde(default)]
    pub route: Vec<String>,
}

impl LabelRecord {
    /// Identifier used in logs and skip events.
    pub fn display_id(&self) -> &str {
        if !self.id.is_empty() {
            &self.id
        } else {
            self.set_id.as_deref().unwrap_or("<no id>")
        }
    }
}

/// How ingredient elements are counted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum CountingPolicy {
    /// Every element counts, repeats included.
    #[default]
    Raw,
    /// Case-insensitive distinct elements.
    Distinct,
}

impl fmt::Display for CountingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountingPolicy::Raw => write!(f, "raw"),
            CountingPolicy::Distinct => write!(f, "distinct"),
        }
    }
}

/// A label record that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLabel {
    pub year: i32,
    /// Distinct routes in first-seen order. Never empty.
    pub routes: Vec<String>,
    pub ingredient_count: usize,
    pub drug_name: String,
}

/// Which aggregate a set of entries feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grouping {
    /// Part A: one group per year.
    ByYear,
    /// Part B: one group per (year, route).
    ByYearAndRoute,
}

impl Grouping {
    pub fn label(&self) -> &'static str {
        match self {
            Grouping::ByYear => "ingredients per year",
            Grouping::ByYearAndRoute => "ingredients per year and route",
        }
    }
}

impl NormalizedLabel {
    /// Expand into the entries for one grouping.
    ///
    /// `ByYear` yields a single entry whose route lists every route of the
    /// label. `ByYearAndRoute` yields one entry per route, each carrying the
    /// full ingredient count.
    pub fn entries(&self, grouping: Grouping) -> Vec<NormalizedEntry> {
        match grouping {
            Grouping::ByYear => vec![NormalizedEntry {
                year: self.year,
                route: self.routes.join(", "),
                ingredient_count: self.ingredient_count,
                drug_name: self.drug_name.clone(),
            }],
            Grouping::ByYearAndRoute => self
                .routes
                .iter()
                .map(|route| NormalizedEntry {
                    year: self.year,
                    route: route.clone(),
                    ingredient_count: self.ingredient_count,
                    drug_name: self.drug_name.clone(),
                })
                .collect(),
        }
    }
}

/// The unit the aggregator consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEntry {
    pub year: i32,
    pub route: String,
    pub ingredient_count: usize,
    pub drug_name: String,
}

/// Grouping key of an aggregate row. Orders by year, then route.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    Year(i32),
    YearRoute(i32, String),
}

impl GroupKey {
    pub fn for_entry(entry: &NormalizedEntry, grouping: Grouping) -> Self {
        match grouping {
            Grouping::ByYear => GroupKey::Year(entry.year),
            Grouping::ByYearAndRoute => GroupKey::YearRoute(entry.year, entry.route.clone()),
        }
    }

    pub fn year(&self) -> i32 {
        match self {
            GroupKey::Year(year) | GroupKey::YearRoute(year, _) => *year,
        }
    }

    pub fn route(&self) -> Option<&str> {
        match self {
            GroupKey::Year(_) => None,
            GroupKey::YearRoute(_, route) => Some(route),
        }
    }
}

/// One output row of an aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    /// Distinct drug names, sorted.
    pub drug_names: BTreeSet<String>,
    pub avg_number_of_ingredients: f64,
    /// Number of entries that contributed to the mean.
    pub entries: usize,
}

impl AggregateRow {
    /// Drug names as a single comma-joined string.
    pub fn drug_names_joined(&self) -> String {
        self.drug_names
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// A record the normalizer dropped, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecord {
    pub id: String,
    pub reason: String,
}

/// Counters collected over one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Pages requested from the API.
    pub pages_fetched: usize,
    /// Records received from the API.
    pub records_fetched: usize,
    /// Records that passed normalization.
    pub records_kept: usize,
    /// Every record dropped by the normalizer.
    pub skipped: Vec<SkippedRecord>,
}

impl RunSummary {
    pub fn records_skipped(&self) -> usize {
        self.skipped.len()
    }
}

/// Metadata about one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Manufacturer filter used for the query.
    pub manufacturer: String,
    /// Endpoint that was queried.
    pub api_url: String,
    /// When the report was produced.
    pub generated_at: DateTime<Utc>,
    /// Ingredient counting policy.
    pub counting: CountingPolicy,
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
}

/// The complete analytics report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub summary: RunSummary,
    /// Part A rows. Empty when Part A was not requested.
    pub by_year: Vec<AggregateRow>,
    /// Part B rows. Empty when Part B was not requested.
    pub by_year_and_route: Vec<AggregateRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(routes: &[&str]) -> NormalizedLabel {
        NormalizedLabel {
            year: 2018,
            routes: routes.iter().map(|r| r.to_string()).collect(),
            ingredient_count: 12,
            drug_name: "drugA".to_string(),
        }
    }

    #[test]
    fn test_deserialize_label_record() {
        let json = r#"{
            "id": "abc",
            "effective_time": "20171213",
            "spl_product_data_elements": ["Drug sodium starch"],
            "openfda": {
                "generic_name": ["DRUG"],
                "route": ["ORAL"],
                "manufacturer_name": ["AstraZeneca"]
            },
            "boxed_warning": ["ignored"]
        }"#;

        let record: LabelRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, "abc");
        assert_eq!(record.effective_time.as_deref(), Some("20171213"));
        assert_eq!(record.openfda.route, vec!["ORAL"]);
        assert!(record.openfda.brand_name.is_empty());
    }

    #[test]
    fn test_deserialize_record_with_empty_openfda() {
        let record: LabelRecord = serde_json::from_str(r#"{"id": "x", "openfda": {}}"#).unwrap();
        assert!(record.openfda.route.is_empty());
        assert!(record.spl_product_data_elements.is_empty());
    }

    #[test]
    fn test_display_id_fallbacks() {
        let mut record = LabelRecord::default();
        assert_eq!(record.display_id(), "<no id>");
        record.set_id = Some("set-1".to_string());
        assert_eq!(record.display_id(), "set-1");
        record.id = "id-1".to_string();
        assert_eq!(record.display_id(), "id-1");
    }

    #[test]
    fn test_entries_per_route_keep_full_count() {
        let entries = label(&["ORAL", "INTRAVENOUS"]).entries(Grouping::ByYearAndRoute);
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.ingredient_count == 12));
        assert_eq!(entries[0].route, "ORAL");
        assert_eq!(entries[1].route, "INTRAVENOUS");
    }

    #[test]
    fn test_entries_by_year_is_one_per_record() {
        let entries = label(&["ORAL", "INTRAVENOUS"]).entries(Grouping::ByYear);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].route, "ORAL, INTRAVENOUS");
    }

    #[test]
    fn test_group_key_ordering() {
        let mut keys = vec![
            GroupKey::YearRoute(2019, "ORAL".to_string()),
            GroupKey::YearRoute(2018, "oral".to_string()),
            GroupKey::YearRoute(2018, "injection".to_string()),
        ];
        keys.sort();
        assert_eq!(keys[0], GroupKey::YearRoute(2018, "injection".to_string()));
        assert_eq!(keys[1], GroupKey::YearRoute(2018, "oral".to_string()));
        assert_eq!(keys[2].year(), 2019);
        assert_eq!(GroupKey::Year(2018).route(), None);
    }

    #[test]
    fn test_drug_names_joined() {
        let row = AggregateRow {
            year: 2018,
            route: None,
            drug_names: ["drugB", "drugA"].iter().map(|s| s.to_string()).collect(),
            avg_number_of_ingredients: 21.0,
            entries: 2,
        };
        assert_eq!(row.drug_names_joined(), "drugA,drugB");
    }
}

//! Grouping and averaging of normalized entries.
//!
//! An [`Aggregator`] keeps one accumulator per group and consumes entries
//! one at a time, so the record stream never has to be materialized.
//! Sums are kept as integers, which makes the result independent of the
//! order entries arrive in.

use crate::models::{AggregateRow, GroupKey, Grouping, NormalizedEntry};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Default, Clone)]
struct GroupAccumulator {
    ingredient_sum: u64,
    entries: usize,
    drug_names: BTreeSet<String>,
}

/// Single-pass group-by-and-mean over normalized entries.
#[derive(Debug, Clone)]
pub struct Aggregator {
    grouping: Grouping,
    groups: BTreeMap<GroupKey, GroupAccumulator>,
}

impl Aggregator {
    pub fn new(grouping: Grouping) -> Self {
        Self {
            grouping,
            groups: BTreeMap::new(),
        }
    }

    pub fn grouping(&self) -> Grouping {
        self.grouping
    }

    /// Fold one entry into its group.
    pub fn push(&mut self, entry: &NormalizedEntry) {
        let group = self
            .groups
            .entry(GroupKey::for_entry(entry, self.grouping))
            .or_default();

        group.ingredient_sum += entry.ingredient_count as u64;
        group.entries += 1;
        group.drug_names.insert(entry.drug_name.clone());
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Produce rows ordered by year, then route. Groups are only created by
    /// `push`, so every row has at least one contributing entry.
    pub fn finish(self) -> Vec<AggregateRow> {
        self.groups
            .into_iter()
            .map(|(key, group)| AggregateRow {
                year: key.year(),
                route: key.route().map(String::from),
                avg_number_of_ingredients: group.ingredient_sum as f64 / group.entries as f64,
                entries: group.entries,
                drug_names: group.drug_names,
            })
            .collect()
    }
}

impl Extend<NormalizedEntry> for Aggregator {
    fn extend<I: IntoIterator<Item = NormalizedEntry>>(&mut self, iter: I) {
        for entry in iter {
            self.push(&entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregate<I>(entries: I, grouping: Grouping) -> Vec<AggregateRow>
    where
        I: IntoIterator<Item = NormalizedEntry>,
    {
        let mut aggregator = Aggregator::new(grouping);
        aggregator.extend(entries);
        aggregator.finish()
    }

    fn entry(year: i32, route: &str, count: usize, name: &str) -> NormalizedEntry {
        NormalizedEntry {
            year,
            route: route.to_string(),
            ingredient_count: count,
            drug_name: name.to_string(),
        }
    }

    fn sample_entries() -> Vec<NormalizedEntry> {
        vec![
            entry(2018, "oral", 20, "drugA"),
            entry(2017, "oral", 7, "drugC"),
            entry(2018, "injection", 22, "drugB"),
            entry(2019, "topical", 3, "drugD"),
            entry(2017, "injection", 9, "drugC"),
            entry(2018, "oral", 13, "drugA"),
        ]
    }

    #[test]
    fn test_mean_per_year_with_drug_names() {
        let rows = aggregate(
            vec![
                entry(2018, "oral", 20, "drugA"),
                entry(2018, "oral", 22, "drugB"),
            ],
            Grouping::ByYear,
        );

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].year, 2018);
        assert_eq!(rows[0].route, None);
        assert_eq!(rows[0].drug_names_joined(), "drugA,drugB");
        assert_eq!(rows[0].avg_number_of_ingredients, 21.0);
    }

    #[test]
    fn test_mean_per_year_and_route() {
        let rows = aggregate(
            vec![
                entry(2018, "oral", 10, "drugA"),
                entry(2018, "injection", 20, "drugB"),
            ],
            Grouping::ByYearAndRoute,
        );

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].route.as_deref(), Some("injection"));
        assert_eq!(rows[0].avg_number_of_ingredients, 20.0);
        assert_eq!(rows[1].route.as_deref(), Some("oral"));
        assert_eq!(rows[1].avg_number_of_ingredients, 10.0);
    }

    #[test]
    fn test_rows_ordered_by_year_then_route() {
        let rows = aggregate(sample_entries(), Grouping::ByYearAndRoute);
        let keys: Vec<(i32, &str)> = rows
            .iter()
            .map(|r| (r.year, r.route.as_deref().unwrap_or("")))
            .collect();

        assert_eq!(
            keys,
            vec![
                (2017, "injection"),
                (2017, "oral"),
                (2018, "injection"),
                (2018, "oral"),
                (2019, "topical"),
            ]
        );
    }

    #[test]
    fn test_order_insensitive() {
        let forward = sample_entries();
        let mut reversed = forward.clone();
        reversed.reverse();
        let mut rotated = forward.clone();
        rotated.rotate_left(2);

        for grouping in [Grouping::ByYear, Grouping::ByYearAndRoute] {
            let expected = aggregate(forward.clone(), grouping);
            assert_eq!(aggregate(reversed.clone(), grouping), expected);
            assert_eq!(aggregate(rotated.clone(), grouping), expected);
        }
    }

    #[test]
    fn test_duplicated_identical_entries_keep_mean() {
        let single = aggregate(vec![entry(2018, "oral", 21, "drugA")], Grouping::ByYear);
        let repeated = aggregate(
            std::iter::repeat(entry(2018, "oral", 21, "drugA")).take(5),
            Grouping::ByYear,
        );

        assert_eq!(
            single[0].avg_number_of_ingredients,
            repeated[0].avg_number_of_ingredients
        );
        assert_eq!(repeated[0].entries, 5);
        assert_eq!(repeated[0].drug_names.len(), 1);
    }

    #[test]
    fn test_single_entry_group_reports_exact_count() {
        let rows = aggregate(vec![entry(2020, "oral", 37, "drugA")], Grouping::ByYear);
        assert_eq!(rows[0].avg_number_of_ingredients, 37.0);
        assert_eq!(rows[0].entries, 1);
    }

    #[test]
    fn test_empty_input_produces_no_rows() {
        let aggregator = Aggregator::new(Grouping::ByYear);
        assert!(aggregator.is_empty());
        assert!(aggregator.finish().is_empty());
    }
}

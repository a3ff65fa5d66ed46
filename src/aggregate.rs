//! Aggregation of the paper list into chart summaries.
//!
//! Every summary is a pure function of the row list. Nothing is updated
//! incrementally: a new dataset means a new [`Summaries::compute`].

use crate::dataset::Row;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Label -> count, kept in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    entries: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the count for `label`, inserting it at the end if unseen.
    pub fn add(&mut self, label: &str) {
        match self.index.get(label) {
            Some(&i) => self.entries[i].1 += 1,
            None => {
                self.index.insert(label.to_string(), self.entries.len());
                self.entries.push((label.to_string(), 1));
            }
        }
    }

    /// Count for `label`; absent labels count as zero.
    pub fn get(&self, label: &str) -> u64 {
        self.index
            .get(label)
            .map(|&i| self.entries[i].1)
            .unwrap_or(0)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, n)| n).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(l, n)| (l.as_str(), *n))
    }

    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|(l, _)| l.clone()).collect()
    }

    pub fn values(&self) -> Vec<u64> {
        self.entries.iter().map(|(_, n)| *n).collect()
    }

    /// Reorder entries by label, ascending.
    pub fn sorted_by_label(mut self) -> Self {
        self.entries.sort_by(|a, b| a.0.cmp(&b.0));
        self.reindex();
        self
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, (l, _))| (l.clone(), i))
            .collect();
    }
}

impl Serialize for Tally {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, count) in &self.entries {
            map.serialize_entry(label, count)?;
        }
        map.end()
    }
}

/// Outer label -> inner label -> count.
///
/// Also tracks every inner label ever seen (the series keys), in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrossTab {
    groups: Vec<(String, Tally)>,
    index: HashMap<String, usize>,
    series: Vec<String>,
    series_seen: HashSet<String>,
}

impl CrossTab {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, outer: &str, inner: &str) {
        let i = match self.index.get(outer) {
            Some(&i) => i,
            None => {
                self.index.insert(outer.to_string(), self.groups.len());
                self.groups.push((outer.to_string(), Tally::new()));
                self.groups.len() - 1
            }
        };
        self.groups[i].1.add(inner);
        if self.series_seen.insert(inner.to_string()) {
            self.series.push(inner.to_string());
        }
    }

    /// Cell value; any missing (outer, inner) combination is zero.
    pub fn get(&self, outer: &str, inner: &str) -> u64 {
        self.group(outer).map(|t| t.get(inner)).unwrap_or(0)
    }

    pub fn group(&self, outer: &str) -> Option<&Tally> {
        self.index.get(outer).map(|&i| &self.groups[i].1)
    }

    pub fn labels(&self) -> Vec<String> {
        self.groups.iter().map(|(l, _)| l.clone()).collect()
    }

    pub fn series_keys(&self) -> &[String] {
        &self.series
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Outer labels ordered by their row total, largest first. Ties keep first-seen order.
    pub fn labels_by_total_desc(&self) -> Vec<String> {
        let mut totals: Vec<(&str, u64)> = self
            .groups
            .iter()
            .map(|(l, t)| (l.as_str(), t.total()))
            .collect();
        totals.sort_by(|a, b| b.1.cmp(&a.1));
        totals.into_iter().map(|(l, _)| l.to_string()).collect()
    }
}

impl Serialize for CrossTab {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for (label, tally) in &self.groups {
            map.serialize_entry(label, tally)?;
        }
        map.end()
    }
}

/// A comma-separated multi-value column and the sentinel tokens that mean "nothing".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenField {
    pub column: String,
    /// Matched case-insensitively against each trimmed token
    #[serde(default)]
    pub exclusions: Vec<String>,
}

impl TokenField {
    pub fn new(column: &str, exclusions: &[&str]) -> Self {
        Self {
            column: column.to_string(),
            exclusions: exclusions.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn is_excluded(&self, token: &str) -> bool {
        let token = token.to_lowercase();
        self.exclusions.iter().any(|e| e.to_lowercase() == token)
    }
}

/// Which columns feed which summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AggregationConfig {
    pub year_column: String,
    pub type_column: String,
    pub llms_used: TokenField,
    pub benchmark: TokenField,
    pub metric: TokenField,
    pub category_column: String,
    pub approach_column: String,
    pub venue_column: String,
    pub conference_prefix: String,
    pub journal_prefix: String,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            year_column: "YEAR".to_string(),
            type_column: "PUBLICATION TYPE".to_string(),
            llms_used: TokenField::new("LLMs USED", &["n/s", "none"]),
            benchmark: TokenField::new("BENCHMARK", &["none", "no bmk-ds"]),
            metric: TokenField::new("EVALUATION METRIC", &["none", "no eval."]),
            category_column: "CATEGORY".to_string(),
            approach_column: "LLM APPROACH TYPE".to_string(),
            venue_column: "PUBLISHED INTO".to_string(),
            conference_prefix: "C:".to_string(),
            journal_prefix: "J:".to_string(),
        }
    }
}

/// Split a multi-value cell on commas, trimming tokens and dropping empty ones.
pub fn split_all(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|t| !t.is_empty())
}

/// Like [`split_all`], but each token is kept only once.
pub fn split_tokens(value: &str) -> Vec<&str> {
    let mut seen = HashSet::new();
    split_all(value).filter(|t| seen.insert(*t)).collect()
}

/// Count rows per value of a single column.
pub fn count_by(rows: &[Row], column: &str) -> Tally {
    let mut tally = Tally::new();
    for value in rows.iter().filter_map(|r| r.field(column)) {
        tally.add(value);
    }
    tally
}

/// Count, per token, the rows whose multi-value cell contains that token.
pub fn count_tokens(rows: &[Row], field: &TokenField) -> Tally {
    let mut tally = Tally::new();
    for value in rows.iter().filter_map(|r| r.field(&field.column)) {
        for token in split_tokens(value) {
            if !field.is_excluded(token) {
                tally.add(token);
            }
        }
    }
    tally
}

/// Cross-tabulate two multi-value columns over rows where both are present.
///
/// Every (outer token, inner token) pair counts, repeats included.
pub fn cross_tab(rows: &[Row], outer_column: &str, inner_column: &str) -> CrossTab {
    let mut tab = CrossTab::new();
    for row in rows {
        let (Some(outer), Some(inner)) = (row.field(outer_column), row.field(inner_column)) else {
            continue;
        };
        let inner_tokens: Vec<&str> = split_all(inner).collect();
        for o in split_all(outer) {
            for i in &inner_tokens {
                tab.add(o, i);
            }
        }
    }
    tab
}

/// Cross-tabulate two single-value columns over rows where both are present.
pub fn cross_tab_single(rows: &[Row], outer_column: &str, inner_column: &str) -> CrossTab {
    let mut tab = CrossTab::new();
    for row in rows {
        if let (Some(outer), Some(inner)) = (row.field(outer_column), row.field(inner_column)) {
            tab.add(outer, inner);
        }
    }
    tab
}

/// Venue counts split by a prefix tag on the venue cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VenueCounts {
    pub conferences: Tally,
    pub journals: Tally,
}

/// Route each venue to conferences or journals by its prefix tag, stripping the
/// tag and any whitespace after it. Untagged venues are ignored.
pub fn split_by_prefix(
    rows: &[Row],
    column: &str,
    conference_prefix: &str,
    journal_prefix: &str,
) -> VenueCounts {
    let mut counts = VenueCounts::default();
    for value in rows.iter().filter_map(|r| r.field(column)) {
        if let Some(rest) = value.strip_prefix(conference_prefix) {
            counts.conferences.add(rest.trim_start());
        } else if let Some(rest) = value.strip_prefix(journal_prefix) {
            counts.journals.add(rest.trim_start());
        }
    }
    counts
}

/// Distinct non-empty values of a column, sorted ascending as strings.
pub fn distinct_sorted(rows: &[Row], column: &str) -> Vec<String> {
    rows.iter()
        .filter_map(|r| r.field(column))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Distinct non-empty values of a column, in first-seen order.
pub fn distinct_first_seen(rows: &[Row], column: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter_map(|r| r.field(column))
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

/// All summaries the chart views draw from.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Summaries {
    pub by_year: Tally,
    pub by_type: Tally,
    pub llms_used: Tally,
    pub benchmarks: Tally,
    pub metrics: Tally,
    pub category_by_approach: CrossTab,
    pub venues: VenueCounts,
    pub years: Vec<String>,
    pub publication_types: Vec<String>,
    pub by_year_and_type: CrossTab,
}

impl Summaries {
    pub fn compute(rows: &[Row], config: &AggregationConfig) -> Self {
        Self {
            by_year: count_by(rows, &config.year_column).sorted_by_label(),
            by_type: count_by(rows, &config.type_column),
            llms_used: count_tokens(rows, &config.llms_used),
            benchmarks: count_tokens(rows, &config.benchmark),
            metrics: count_tokens(rows, &config.metric),
            category_by_approach: cross_tab(rows, &config.category_column, &config.approach_column),
            venues: split_by_prefix(
                rows,
                &config.venue_column,
                &config.conference_prefix,
                &config.journal_prefix,
            ),
            years: distinct_sorted(rows, &config.year_column),
            publication_types: distinct_first_seen(rows, &config.type_column),
            by_year_and_type: cross_tab_single(rows, &config.year_column, &config.type_column),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, &str)]) -> Row {
        Row::from_pairs(cells.iter().map(|(k, v)| (k.to_string(), v.to_string())))
    }

    fn sample() -> Vec<Row> {
        vec![
            row(&[("ID", "1"), ("YEAR", "2023"), ("PUBLICATION TYPE", "Journal")]),
            row(&[("ID", "2"), ("YEAR", "2023"), ("PUBLICATION TYPE", "Conference")]),
            row(&[("ID", "3"), ("YEAR", "2024"), ("PUBLICATION TYPE", "Journal")]),
        ]
    }

    #[test]
    fn test_count_by_year() {
        let tally = count_by(&sample(), "YEAR");
        assert_eq!(tally.get("2023"), 2);
        assert_eq!(tally.get("2024"), 1);
        assert_eq!(tally.len(), 2);
    }

    #[test]
    fn test_stacked_cells_default_to_zero() {
        let tab = cross_tab_single(&sample(), "YEAR", "PUBLICATION TYPE");
        assert_eq!(tab.get("2023", "Journal"), 1);
        assert_eq!(tab.get("2023", "Conference"), 1);
        assert_eq!(tab.get("2023", "arXiv"), 0);
        assert_eq!(tab.get("1999", "Journal"), 0);
    }

    #[test]
    fn test_count_tokens_excludes_sentinels() {
        let rows = vec![
            row(&[("LLMs USED", "GPT-4, n/s, Claude")]),
            row(&[("LLMs USED", "NONE")]),
            row(&[("LLMs USED", " GPT-4 ,, ")]),
        ];
        let field = TokenField::new("LLMs USED", &["n/s", "none"]);
        let tally = count_tokens(&rows, &field);
        assert_eq!(tally.get("GPT-4"), 2);
        assert_eq!(tally.get("Claude"), 1);
        assert!(!tally.contains("n/s"));
        assert!(!tally.contains("NONE"));
        assert_eq!(tally.labels(), vec!["GPT-4", "Claude"]);
    }

    #[test]
    fn test_count_tokens_counts_rows_not_repeats() {
        let rows = vec![row(&[("BENCHMARK", "HumanEval, HumanEval")])];
        let tally = count_tokens(&rows, &TokenField::new("BENCHMARK", &[]));
        assert_eq!(tally.get("HumanEval"), 1);
    }

    #[test]
    fn test_cross_tab_pairs() {
        let rows = vec![
            row(&[("CATEGORY", "Testing, Repair"), ("LLM APPROACH TYPE", "Hybrid-Prompting")]),
            row(&[("CATEGORY", "Testing"), ("LLM APPROACH TYPE", "LLM-Pure-FineTune, Hybrid-Prompting")]),
            row(&[("CATEGORY", "Repair")]),
        ];
        let tab = cross_tab(&rows, "CATEGORY", "LLM APPROACH TYPE");
        assert_eq!(tab.get("Testing", "Hybrid-Prompting"), 2);
        assert_eq!(tab.get("Testing", "LLM-Pure-FineTune"), 1);
        assert_eq!(tab.get("Repair", "Hybrid-Prompting"), 1);
        assert_eq!(tab.get("Repair", "LLM-Pure-FineTune"), 0);
        assert_eq!(tab.series_keys(), ["Hybrid-Prompting", "LLM-Pure-FineTune"]);
        assert_eq!(tab.labels_by_total_desc(), vec!["Testing", "Repair"]);
    }

    #[test]
    fn test_cross_tab_counts_repeated_tokens() {
        let rows = vec![row(&[("CATEGORY", "Testing, Testing,"), ("LLM APPROACH TYPE", "None")])];
        let tab = cross_tab(&rows, "CATEGORY", "LLM APPROACH TYPE");
        assert_eq!(tab.get("Testing", "None"), 2);
        assert_eq!(tab.labels(), vec!["Testing"]);
        assert_eq!(tab.series_keys(), ["None"]);
    }

    #[test]
    fn test_split_by_prefix() {
        let rows = vec![
            row(&[("PUBLISHED INTO", "C: ICSE")]),
            row(&[("PUBLISHED INTO", "C:ICSE")]),
            row(&[("PUBLISHED INTO", "J: TOSEM")]),
            row(&[("PUBLISHED INTO", "arXiv")]),
        ];
        let venues = split_by_prefix(&rows, "PUBLISHED INTO", "C:", "J:");
        assert_eq!(venues.conferences.get("ICSE"), 2);
        assert_eq!(venues.journals.get("TOSEM"), 1);
        assert_eq!(venues.conferences.len() + venues.journals.len(), 2);
    }

    #[test]
    fn test_distinct_keys() {
        let mut rows = sample();
        rows.insert(0, row(&[("YEAR", "2025"), ("PUBLICATION TYPE", "arXiv")]));
        assert_eq!(distinct_sorted(&rows, "YEAR"), vec!["2023", "2024", "2025"]);
        assert_eq!(
            distinct_first_seen(&rows, "PUBLICATION TYPE"),
            vec!["arXiv", "Journal", "Conference"]
        );
    }

    #[test]
    fn test_summaries_compute() {
        let summaries = Summaries::compute(&sample(), &AggregationConfig::default());
        assert_eq!(summaries.by_year.labels(), vec!["2023", "2024"]);
        assert_eq!(summaries.by_year.values(), vec![2, 1]);
        assert_eq!(summaries.years, vec!["2023", "2024"]);
        assert!(summaries.llms_used.is_empty());
        assert!(summaries.category_by_approach.is_empty());
    }

    #[test]
    fn test_summaries_default_exclusions() {
        let rows = vec![
            row(&[("BENCHMARK", "HumanEval, None"), ("EVALUATION METRIC", "pass@k, No eval.")]),
            row(&[("BENCHMARK", "no bmk-ds"), ("EVALUATION METRIC", "none")]),
            row(&[("BENCHMARK", "Defects4J"), ("EVALUATION METRIC", "pass@k")]),
        ];
        let summaries = Summaries::compute(&rows, &AggregationConfig::default());
        assert_eq!(summaries.benchmarks.labels(), vec!["HumanEval", "Defects4J"]);
        assert_eq!(summaries.metrics.labels(), vec!["pass@k"]);
        assert_eq!(summaries.metrics.get("pass@k"), 2);
        assert!(!summaries.benchmarks.contains("no bmk-ds"));
        assert!(!summaries.metrics.contains("No eval."));
    }

    #[test]
    fn test_tally_serializes_in_order() -> serde_json::Result<()> {
        let mut tally = Tally::new();
        tally.add("b");
        tally.add("a");
        tally.add("b");
        assert_eq!(serde_json::to_string(&tally)?, r#"{"b":2,"a":1}"#);
        Ok(())
    }
}

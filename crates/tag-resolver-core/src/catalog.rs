//! Local tag catalog parsing and the inverted index over it.
//!
//! # Catalog shape
//!
//! The catalog artifact is JSON and is accepted in two shapes:
//!
//! - a flat array of tag objects, or
//! - any nesting of objects/arrays that eventually carries `"tags"` arrays
//!   (e.g. `{"plants": [{"name": "P1", "tags": [...]}]}`).
//!
//! A tag object is any object with a string `path`; `description`, `unit`,
//! `plant`, and `equipment` are optional. Duplicate paths keep the first
//! occurrence.
//!
//! # Index
//!
//! Every token of a record's `search_blob` becomes a postings key. Postings
//! hold record positions in catalog order and are capped per token.

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::models::TagRecord;
use crate::tokenize::tokenize;

/// Default cap on postings per token.
pub const DEFAULT_MAX_POSTINGS: usize = 1000;

/// Substring fallback hits count half of a token hit.
const SUBSTRING_WEIGHT: f64 = 0.5;

/// Parse catalog JSON text into records.
pub fn parse_catalog_str(text: &str) -> Result<Vec<TagRecord>> {
    let value: Value = serde_json::from_str(text).context("catalog is not valid JSON")?;
    Ok(parse_catalog(&value))
}

/// Collect every tag object reachable from `value`, in document order.
pub fn parse_catalog(value: &Value) -> Vec<TagRecord> {
    let mut records = Vec::new();
    let mut seen = HashSet::new();
    collect_tags(value, &mut records, &mut seen);
    records
}

fn collect_tags(value: &Value, out: &mut Vec<TagRecord>, seen: &mut HashSet<String>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_tags(item, out, seen);
            }
        }
        Value::Object(map) => {
            if let Some(path) = map.get("path").and_then(Value::as_str) {
                let path = path.trim();
                if path.is_empty() {
                    return;
                }
                if !seen.insert(path.to_string()) {
                    debug!(path, "duplicate catalog path skipped");
                    return;
                }
                let field = |key: &str| {
                    map.get(key)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                };
                out.push(TagRecord::new(
                    path,
                    field("description"),
                    field("unit"),
                    field("plant"),
                    field("equipment"),
                ));
                return;
            }
            if let Some(tags) = map.get("tags") {
                collect_tags(tags, out, seen);
                return;
            }
            for nested in map.values() {
                if nested.is_array() || nested.is_object() {
                    collect_tags(nested, out, seen);
                }
            }
        }
        _ => {}
    }
}

/// A local index hit.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalHit<'a> {
    pub record: &'a TagRecord,
    /// Catalog position, the tie-breaker for equal strengths.
    pub position: usize,
    /// Count of distinct matching keywords (halved for substring hits).
    pub match_strength: f64,
    pub matched: Vec<String>,
}

/// Read-only inverted index over the tag catalog.
#[derive(Debug, Default)]
pub struct TagIndex {
    records: Vec<TagRecord>,
    postings: HashMap<String, Vec<usize>>,
    max_postings: usize,
}

impl TagIndex {
    pub fn build(records: Vec<TagRecord>, max_postings: usize) -> Self {
        let mut postings: HashMap<String, Vec<usize>> = HashMap::new();

        for (position, record) in records.iter().enumerate() {
            for token in tokenize(&record.search_blob) {
                let list = postings.entry(token).or_default();
                if list.last() == Some(&position) || list.len() >= max_postings {
                    continue;
                }
                list.push(position);
            }
        }

        debug!(
            records = records.len(),
            tokens = postings.len(),
            "tag index built"
        );

        Self {
            records,
            postings,
            max_postings,
        }
    }

    pub fn empty() -> Self {
        Self::build(Vec::new(), DEFAULT_MAX_POSTINGS)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[TagRecord] {
        &self.records
    }

    pub fn max_postings(&self) -> usize {
        self.max_postings
    }

    pub fn token_count(&self) -> usize {
        self.postings.len()
    }

    /// Catalog positions indexed under `token`.
    pub fn postings(&self, token: &str) -> &[usize] {
        self.postings.get(token).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Exact token search: each distinct keyword adds one to the strength
    /// of every record in its postings list.
    pub fn keyword_search(&self, keywords: &[String], limit: usize) -> Vec<LocalHit<'_>> {
        let mut strengths: HashMap<usize, (f64, Vec<String>)> = HashMap::new();
        let mut seen = HashSet::new();

        for kw in keywords {
            let kw = kw.to_lowercase();
            if !seen.insert(kw.clone()) {
                continue;
            }
            for &position in self.postings(&kw) {
                let entry = strengths.entry(position).or_insert((0.0, Vec::new()));
                entry.0 += 1.0;
                entry.1.push(kw.clone());
            }
        }

        self.collect_hits(strengths, limit)
    }

    /// Substring scan of each record's `search_blob` against the keywords,
    /// at half strength. Stops scanning once `limit` records have matched.
    pub fn substring_search(&self, keywords: &[String], limit: usize) -> Vec<LocalHit<'_>> {
        let mut strengths: HashMap<usize, (f64, Vec<String>)> = HashMap::new();
        let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

        if keywords.is_empty() || limit == 0 {
            return Vec::new();
        }

        for (position, record) in self.records.iter().enumerate() {
            let matched: Vec<String> = keywords
                .iter()
                .filter(|kw| record.search_blob.contains(kw.as_str()))
                .cloned()
                .collect();
            if matched.is_empty() {
                continue;
            }
            strengths.insert(position, (matched.len() as f64 * SUBSTRING_WEIGHT, matched));
            if strengths.len() >= limit {
                break;
            }
        }

        self.collect_hits(strengths, limit)
    }

    fn collect_hits(
        &self,
        strengths: HashMap<usize, (f64, Vec<String>)>,
        limit: usize,
    ) -> Vec<LocalHit<'_>> {
        let mut hits: Vec<LocalHit<'_>> = strengths
            .into_iter()
            .map(|(position, (match_strength, matched))| LocalHit {
                record: &self.records[position],
                position,
                match_strength,
                matched,
            })
            .collect();

        hits.sort_by(|a, b| {
            b.match_strength
                .partial_cmp(&a.match_strength)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.position.cmp(&b.position))
        });
        hits.truncate(limit);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kw(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn sample_index() -> TagIndex {
        let records = parse_catalog(&json!([
            {"path": "Plant.Kiln.Section15.ShellTemp", "description": "Kiln shell temperature section 15", "unit": "degC"},
            {"path": "Plant.Kiln.Inlet.Temperature", "description": "Kiln inlet gas temperature"},
            {"path": "Plant.Cooler.Fan1.Speed", "description": "Cooler fan speed", "unit": "rpm"},
        ]));
        TagIndex::build(records, DEFAULT_MAX_POSTINGS)
    }

    #[test]
    fn test_parse_flat_list() {
        let records = parse_catalog(&json!([
            {"path": "A.B.C", "description": "x"},
            {"path": "A.B.D"},
            {"description": "no path"},
        ]));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "C");
        assert_eq!(records[1].description, "");
    }

    #[test]
    fn test_parse_nested_tags_containers() {
        let records = parse_catalog(&json!({
            "version": 3,
            "plants": [
                {"name": "North", "tags": [{"path": "North.Kiln.Speed"}]},
                {"name": "South", "areas": {"kiln": {"tags": [{"path": "South.Kiln.Speed"}]}}}
            ]
        }));
        let paths: Vec<&str> = records.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["North.Kiln.Speed", "South.Kiln.Speed"]);
    }

    #[test]
    fn test_parse_skips_duplicate_paths() {
        let records = parse_catalog(&json!({"tags": [
            {"path": "A.B", "description": "first"},
            {"path": "A.B", "description": "second"},
        ]}));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].description, "first");
    }

    #[test]
    fn test_parse_invalid_json_errors() {
        assert!(parse_catalog_str("{not json").is_err());
    }

    #[test]
    fn test_postings_preserve_catalog_order() {
        let index = sample_index();
        assert_eq!(index.postings("kiln"), &[0, 1]);
        assert_eq!(index.postings("rpm"), &[2]);
        assert!(index.postings("missing").is_empty());
    }

    #[test]
    fn test_postings_are_capped() {
        let records = (0..10)
            .map(|i| TagRecord::new(format!("P.Kiln.T{}", i), "kiln", "", "", ""))
            .collect();
        let index = TagIndex::build(records, 3);
        assert_eq!(index.postings("kiln"), &[0, 1, 2]);
        assert_eq!(index.postings("t7"), &[7]);
    }

    #[test]
    fn test_keyword_search_ranks_by_distinct_matches() {
        let index = sample_index();
        let hits = index.keyword_search(&kw(&["kiln", "shell", "temperature"]), 10);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].record.path, "Plant.Kiln.Section15.ShellTemp");
        assert_eq!(hits[0].match_strength, 3.0);
        assert_eq!(hits[1].match_strength, 2.0);
    }

    #[test]
    fn test_keyword_search_ties_break_by_catalog_order() {
        let index = sample_index();
        let hits = index.keyword_search(&kw(&["kiln"]), 10);
        assert_eq!(hits[0].position, 0);
        assert_eq!(hits[1].position, 1);
    }

    #[test]
    fn test_keyword_search_respects_limit() {
        let index = sample_index();
        assert_eq!(index.keyword_search(&kw(&["kiln"]), 1).len(), 1);
    }

    #[test]
    fn test_substring_scan_catches_compounds_at_half_strength() {
        let index = sample_index();
        let keywords = kw(&["shelltem"]);
        assert!(index.keyword_search(&keywords, 10).is_empty());

        let hits = index.substring_search(&keywords, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].match_strength, 0.5);
    }

    #[test]
    fn test_substring_scan_stops_early() {
        let records = (0..50)
            .map(|i| TagRecord::new(format!("P.Area{}.Flowrate", i), "", "", "", ""))
            .collect();
        let index = TagIndex::build(records, DEFAULT_MAX_POSTINGS);
        let hits = index.substring_search(&kw(&["flow"]), 5);
        assert_eq!(hits.len(), 5);
        assert_eq!(hits[4].position, 4);
    }

    #[test]
    fn test_empty_index_searches_are_empty() {
        let index = TagIndex::empty();
        assert!(index.is_empty());
        assert!(index.keyword_search(&kw(&["kiln"]), 10).is_empty());
        assert!(index.substring_search(&kw(&["kiln"]), 10).is_empty());
    }
}

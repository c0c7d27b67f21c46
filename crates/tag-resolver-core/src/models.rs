//! Core data types shared across the resolution pipeline.
//!
//! | Type | Lifetime |
//! |------|----------|
//! | [`TagRecord`] | Loaded once from the catalog, read-only afterwards |
//! | [`CandidateMatch`] | Created per request, discarded when it completes |
//! | [`LiveTag`] / [`LiveSearchResponse`] | Wire shape of the live search collaborator |

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A catalog entry for one historian data point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRecord {
    /// Dot-delimited hierarchical identifier, unique within the catalog.
    pub path: String,
    /// Leaf segment of `path`.
    pub name: String,
    pub description: String,
    pub unit: String,
    pub plant: String,
    pub equipment: String,
    /// Lowercase concatenation of all of the above, used for indexing and
    /// the substring fallback.
    pub search_blob: String,
}

impl TagRecord {
    pub fn new(
        path: impl Into<String>,
        description: impl Into<String>,
        unit: impl Into<String>,
        plant: impl Into<String>,
        equipment: impl Into<String>,
    ) -> Self {
        let path = path.into();
        let description = description.into();
        let unit = unit.into();
        let plant = plant.into();
        let equipment = equipment.into();
        let name = path.rsplit('.').next().unwrap_or_default().to_string();
        let search_blob = [
            path.as_str(),
            name.as_str(),
            description.as_str(),
            unit.as_str(),
            plant.as_str(),
            equipment.as_str(),
        ]
        .iter()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

        Self {
            path,
            name,
            description,
            unit,
            plant,
            equipment,
            search_blob,
        }
    }

    /// Non-empty `unit`/`plant`/`equipment` values keyed by field name.
    pub fn attributes(&self) -> BTreeMap<String, String> {
        [
            ("unit", &self.unit),
            ("plant", &self.plant),
            ("equipment", &self.equipment),
        ]
        .into_iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
    }
}

/// Where a candidate was retrieved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandidateSource {
    LiveSearch,
    LocalIndex,
    VectorIndex,
}

impl CandidateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateSource::LiveSearch => "live-search",
            CandidateSource::LocalIndex => "local-index",
            CandidateSource::VectorIndex => "vector-index",
        }
    }
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query keywords that matched a candidate, grouped by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedKeywords {
    pub name: BTreeSet<String>,
    pub path: BTreeSet<String>,
    pub description: BTreeSet<String>,
    pub metadata: BTreeSet<String>,
}

impl MatchedKeywords {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
            && self.path.is_empty()
            && self.description.is_empty()
            && self.metadata.is_empty()
    }

    pub fn union_with(&mut self, other: &MatchedKeywords) {
        self.name.extend(other.name.iter().cloned());
        self.path.extend(other.path.iter().cloned());
        self.description.extend(other.description.iter().cloned());
        self.metadata.extend(other.metadata.iter().cloned());
    }
}

/// A tag under consideration for a single resolution request.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateMatch {
    pub path: String,
    pub name: String,
    pub description: String,
    pub data_type: Option<String>,
    /// Catalog attributes (`unit`, `plant`, `equipment`) when known.
    pub attributes: BTreeMap<String, String>,
    /// Every source that returned this path.
    pub sources: BTreeSet<CandidateSource>,
    /// Strength reported by the retrieving source (match count or cosine).
    pub retrieval_score: f64,
    /// Aggregate field-weighted score, filled in by the scorer.
    pub score: f64,
    pub matched_keywords: MatchedKeywords,
    /// Metadata from the metadata collaborator; `Null` when unavailable.
    pub metadata: serde_json::Value,
}

impl CandidateMatch {
    pub fn new(path: impl Into<String>, name: impl Into<String>, source: CandidateSource) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            description: String::new(),
            data_type: None,
            attributes: BTreeMap::new(),
            sources: BTreeSet::from([source]),
            retrieval_score: 0.0,
            score: 0.0,
            matched_keywords: MatchedKeywords::default(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn from_record(record: &TagRecord, source: CandidateSource, retrieval_score: f64) -> Self {
        Self {
            description: record.description.clone(),
            attributes: record.attributes(),
            retrieval_score,
            ..Self::new(&record.path, &record.name, source)
        }
    }

    pub fn from_live(tag: &LiveTag) -> Self {
        let name = if tag.name.is_empty() {
            tag.path.rsplit('.').next().unwrap_or_default().to_string()
        } else {
            tag.name.clone()
        };
        Self {
            description: tag.description.clone().unwrap_or_default(),
            data_type: tag.data_type.clone(),
            ..Self::new(&tag.path, name, CandidateSource::LiveSearch)
        }
    }

    /// Fold a later duplicate of the same path into this candidate.
    ///
    /// The first occurrence keeps its identity fields; sources, matched
    /// keywords, and any fields this candidate is missing are unioned in.
    pub fn absorb(&mut self, other: CandidateMatch) {
        self.sources.extend(other.sources);
        self.matched_keywords.union_with(&other.matched_keywords);
        if self.description.is_empty() {
            self.description = other.description;
        }
        if self.data_type.is_none() {
            self.data_type = other.data_type;
        }
        for (k, v) in other.attributes {
            self.attributes.entry(k).or_insert(v);
        }
        self.retrieval_score = self.retrieval_score.max(other.retrieval_score);
    }

    /// Metadata view exposed to callers: catalog attributes overlaid with
    /// whatever the metadata collaborator returned.
    pub fn metadata_view(&self) -> serde_json::Value {
        let mut merged = serde_json::Map::new();
        for (k, v) in &self.attributes {
            merged.insert(k.clone(), serde_json::Value::String(v.clone()));
        }
        match &self.metadata {
            serde_json::Value::Object(map) => {
                for (k, v) in map {
                    merged.insert(k.clone(), v.clone());
                }
            }
            serde_json::Value::Null => {}
            other => {
                merged.insert("value".to_string(), other.clone());
            }
        }
        serde_json::Value::Object(merged)
    }
}

/// One tag as returned by the live search collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveTag {
    #[serde(default)]
    pub name: String,
    pub path: String,
    #[serde(rename = "dataType", default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Response of the live search collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveSearchResponse {
    pub success: bool,
    #[serde(default)]
    pub tags: Vec<LiveTag>,
    #[serde(default)]
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_derives_name_and_blob() {
        let r = TagRecord::new(
            "Plant.Kiln.Section15.ShellTemp",
            "Kiln shell temperature",
            "degC",
            "Plant",
            "Kiln",
        );
        assert_eq!(r.name, "ShellTemp");
        assert_eq!(
            r.search_blob,
            "plant.kiln.section15.shelltemp shelltemp kiln shell temperature degc plant kiln"
        );
    }

    #[test]
    fn test_attributes_skip_empty() {
        let r = TagRecord::new("A.B", "", "bar", "", "Cooler");
        let attrs = r.attributes();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs["unit"], "bar");
        assert_eq!(attrs["equipment"], "Cooler");
    }

    #[test]
    fn test_source_serializes_kebab_case() {
        let s = serde_json::to_string(&CandidateSource::VectorIndex).unwrap();
        assert_eq!(s, "\"vector-index\"");
        assert_eq!(CandidateSource::LiveSearch.to_string(), "live-search");
    }

    #[test]
    fn test_absorb_unions_sources_and_keeps_first_identity() {
        let record = TagRecord::new("P.Kiln.Temp", "from catalog", "degC", "", "");
        let mut first = CandidateMatch::from_live(&LiveTag {
            name: "KilnTemp".into(),
            path: "P.Kiln.Temp".into(),
            data_type: Some("Float".into()),
            description: None,
        });
        first.matched_keywords.name.insert("kiln".into());
        let mut second = CandidateMatch::from_record(&record, CandidateSource::LocalIndex, 2.0);
        second.matched_keywords.path.insert("temp".into());

        first.absorb(second);

        assert_eq!(first.name, "KilnTemp");
        assert_eq!(first.description, "from catalog");
        assert_eq!(first.attributes["unit"], "degC");
        assert!(first.sources.contains(&CandidateSource::LiveSearch));
        assert!(first.sources.contains(&CandidateSource::LocalIndex));
        assert!(first.matched_keywords.name.contains("kiln"));
        assert!(first.matched_keywords.path.contains("temp"));
        assert_eq!(first.retrieval_score, 2.0);
    }

    #[test]
    fn test_live_tag_deserializes_data_type() {
        let tag: LiveTag = serde_json::from_value(json!({
            "name": "ShellTemp",
            "path": "P.Kiln.ShellTemp",
            "dataType": "Float8"
        }))
        .unwrap();
        assert_eq!(tag.data_type.as_deref(), Some("Float8"));
        assert_eq!(tag.description, None);
    }

    #[test]
    fn test_metadata_view_overlays_fetched_metadata() {
        let record = TagRecord::new("P.K.T", "", "degC", "P", "");
        let mut c = CandidateMatch::from_record(&record, CandidateSource::LocalIndex, 1.0);
        c.metadata = json!({"unit": "K", "properties": {"engHigh": 1500}});
        let view = c.metadata_view();
        assert_eq!(view["unit"], "K");
        assert_eq!(view["plant"], "P");
        assert_eq!(view["properties"]["engHigh"], 1500);
    }
}

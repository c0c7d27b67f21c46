//! Multi-field weighted match scoring.
//!
//! Every query keyword is checked against four fields, in priority order:
//!
//! | Field | Match rule | Default weight |
//! |-------|------------|----------------|
//! | name | case-insensitive substring of the tag name | 3.0 |
//! | path | substring of any dot-separated path segment | 2.0 |
//! | description | token of the description | 1.0 |
//! | metadata | token of any scalar metadata value (nested included) | 0.5 |
//!
//! Contributions add up across fields. Only the ordering of the weights is
//! a contract: `name > path`, and `metadata` is the smallest positive one.
//!
//! A candidate found by the vector fallback also earns
//! `vector × cosine`, once, on top of a non-zero field score. `vector` must
//! stay below `metadata`.

use anyhow::{bail, Result};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::models::{CandidateMatch, CandidateSource, MatchedKeywords};
use crate::tokenize::tokenize;

/// Per-field contribution of a single matching keyword.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub name: f64,
    pub path: f64,
    pub description: f64,
    pub metadata: f64,
    /// Multiplier on the cosine of vector-index candidates.
    pub vector: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            name: 3.0,
            path: 2.0,
            description: 1.0,
            metadata: 0.5,
            vector: 0.25,
        }
    }
}

impl ScoreWeights {
    /// Reject weight sets that break the field priority ordering.
    pub fn validate(&self) -> Result<()> {
        let all = [
            self.name,
            self.path,
            self.description,
            self.metadata,
            self.vector,
        ];
        if all.iter().any(|w| !w.is_finite() || *w <= 0.0) {
            bail!("scoring weights must all be finite and > 0");
        }
        if self.name <= self.path {
            bail!("scoring.name must be greater than scoring.path");
        }
        if self.metadata >= self.path || self.metadata >= self.description {
            bail!("scoring.metadata must be smaller than scoring.path and scoring.description");
        }
        if self.vector >= self.metadata {
            bail!("scoring.vector must be smaller than scoring.metadata");
        }
        Ok(())
    }
}

/// Score one candidate's fields against the keywords.
pub fn score(
    keywords: &[String],
    name: &str,
    path: &str,
    description: &str,
    metadata: &Value,
    weights: &ScoreWeights,
) -> (f64, MatchedKeywords) {
    let name = name.to_lowercase();
    let segments: Vec<String> = path.split('.').map(str::to_lowercase).collect();
    let description_tokens: BTreeSet<String> = tokenize(description).into_iter().collect();
    let metadata_tokens = metadata_terms(metadata);

    let mut total = 0.0;
    let mut matched = MatchedKeywords::default();

    for kw in keywords {
        let kw = kw.to_lowercase();
        if kw.is_empty() {
            continue;
        }
        if name.contains(&kw) {
            total += weights.name;
            matched.name.insert(kw.clone());
        }
        if segments.iter().any(|s| s.contains(&kw)) {
            total += weights.path;
            matched.path.insert(kw.clone());
        }
        if description_tokens.contains(&kw) {
            total += weights.description;
            matched.description.insert(kw.clone());
        }
        if metadata_tokens.contains(&kw) {
            total += weights.metadata;
            matched.metadata.insert(kw);
        }
    }

    (total, matched)
}

/// Tokens of every string, number, and boolean leaf in `metadata`.
pub fn metadata_terms(metadata: &Value) -> BTreeSet<String> {
    let mut terms = BTreeSet::new();
    collect_terms(metadata, &mut terms);
    terms
}

fn collect_terms(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::String(s) => out.extend(tokenize(s)),
        Value::Number(n) => out.extend(tokenize(&n.to_string())),
        Value::Bool(b) => {
            out.insert(b.to_string());
        }
        Value::Array(items) => items.iter().for_each(|v| collect_terms(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_terms(v, out)),
        Value::Null => {}
    }
}

/// Fill in `score` and `matched_keywords` on a candidate. Catalog
/// attributes count as metadata alongside the fetched metadata.
///
/// A candidate that matches no keyword in any field scores zero, whatever
/// its retrieval similarity.
pub fn score_candidate(
    candidate: &mut CandidateMatch,
    keywords: &[String],
    weights: &ScoreWeights,
) {
    let metadata = candidate.metadata_view();
    let (total, matched) = score(
        keywords,
        &candidate.name,
        &candidate.path,
        &candidate.description,
        &metadata,
        weights,
    );
    let from_vectors = candidate.sources.contains(&CandidateSource::VectorIndex);
    let vector_term = if total > 0.0 && from_vectors {
        weights.vector * candidate.retrieval_score.clamp(0.0, 1.0)
    } else {
        0.0
    };
    candidate.score = total + vector_term;
    candidate.matched_keywords.union_with(&matched);
}

/// Sort by descending score. The sort is stable, so equal scores keep
/// gathering order.
pub fn rank(candidates: &mut [CandidateMatch]) {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

//! Local retrieval strategies and the ordered fallback chain.
//!
//! Each strategy answers the same question ("which local tags look like
//! these keywords?") from a different angle. The chain runs them in order
//! and stops at the first one that returns anything:
//!
//! 1. [`KeywordStrategy`]: exact token postings lookup.
//! 2. [`SubstringStrategy`]: half-strength substring scan, catches
//!    compounding mismatches.
//! 3. [`VectorStrategy`]: cosine similarity over the hash embedding.

use std::sync::Arc;
use tracing::debug;

use crate::catalog::TagIndex;
use crate::models::{CandidateMatch, CandidateSource};
use crate::tokenize::tokenize;
use crate::vector::{VectorIndex, VectorRecord};

/// Cosine floor below which vector hits are discarded.
pub const DEFAULT_MIN_SIMILARITY: f64 = 0.1;

/// Inputs shared by every strategy.
#[derive(Debug, Clone, Copy)]
pub struct LocalQuery<'a> {
    /// Query keywords, stop words removed.
    pub keywords: &'a [String],
    /// The raw description as the caller typed it.
    pub description: &'a str,
}

/// A local candidate source.
pub trait SearchStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn search(&self, query: &LocalQuery<'_>, limit: usize) -> Vec<CandidateMatch>;
}

pub struct KeywordStrategy {
    index: Arc<TagIndex>,
}

impl KeywordStrategy {
    pub fn new(index: Arc<TagIndex>) -> Self {
        Self { index }
    }
}

impl SearchStrategy for KeywordStrategy {
    fn name(&self) -> &'static str {
        "keyword"
    }

    fn search(&self, query: &LocalQuery<'_>, limit: usize) -> Vec<CandidateMatch> {
        self.index
            .keyword_search(query.keywords, limit)
            .into_iter()
            .map(|hit| {
                CandidateMatch::from_record(
                    hit.record,
                    CandidateSource::LocalIndex,
                    hit.match_strength,
                )
            })
            .collect()
    }
}

/// Substring fallback; inert when the raw description is blank.
pub struct SubstringStrategy {
    index: Arc<TagIndex>,
}

impl SubstringStrategy {
    pub fn new(index: Arc<TagIndex>) -> Self {
        Self { index }
    }
}

impl SearchStrategy for SubstringStrategy {
    fn name(&self) -> &'static str {
        "substring"
    }

    fn search(&self, query: &LocalQuery<'_>, limit: usize) -> Vec<CandidateMatch> {
        if query.description.trim().is_empty() {
            return Vec::new();
        }
        self.index
            .substring_search(query.keywords, limit)
            .into_iter()
            .map(|hit| {
                CandidateMatch::from_record(
                    hit.record,
                    CandidateSource::LocalIndex,
                    hit.match_strength,
                )
            })
            .collect()
    }
}

/// Embeds the keywords (not the raw description) so stop words do not
/// dilute the query vector.
///
/// A hit is kept only when its cosine reaches `min_similarity` and the
/// record shares at least one keyword, as a token of its search text or a
/// substring of its path.
pub struct VectorStrategy {
    vectors: Arc<VectorIndex>,
    min_similarity: f64,
}

impl VectorStrategy {
    pub fn new(vectors: Arc<VectorIndex>) -> Self {
        Self {
            vectors,
            min_similarity: DEFAULT_MIN_SIMILARITY,
        }
    }

    pub fn with_min_similarity(mut self, min_similarity: f64) -> Self {
        self.min_similarity = min_similarity;
        self
    }
}

fn shares_keyword(record: &VectorRecord, keywords: &[String]) -> bool {
    let path = record.path.to_lowercase();
    let tokens = tokenize(&record.to_tag_record().search_blob);
    keywords
        .iter()
        .any(|kw| tokens.contains(kw) || path.contains(kw.as_str()))
}

impl SearchStrategy for VectorStrategy {
    fn name(&self) -> &'static str {
        "vector"
    }

    fn search(&self, query: &LocalQuery<'_>, limit: usize) -> Vec<CandidateMatch> {
        let text = query.keywords.join(" ");
        self.vectors
            .search(&text, self.vectors.len())
            .into_iter()
            .filter(|hit| f64::from(hit.score) >= self.min_similarity)
            .filter(|hit| shares_keyword(hit.record, query.keywords))
            .take(limit)
            .map(|hit| {
                CandidateMatch::from_record(
                    &hit.record.to_tag_record(),
                    CandidateSource::VectorIndex,
                    f64::from(hit.score),
                )
            })
            .collect()
    }
}

/// Result of running a [`StrategyChain`].
#[derive(Debug, Default)]
pub struct ChainOutcome {
    /// Name of the strategy that produced the candidates, if any did.
    pub strategy: Option<&'static str>,
    pub candidates: Vec<CandidateMatch>,
}

/// Ordered list of strategies with early exit on the first non-empty result.
#[derive(Default)]
pub struct StrategyChain {
    strategies: Vec<Box<dyn SearchStrategy>>,
}

impl StrategyChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keyword, then substring, then vector (when an artifact is loaded).
    pub fn standard(
        index: Arc<TagIndex>,
        vectors: Option<Arc<VectorIndex>>,
        min_similarity: f64,
    ) -> Self {
        let mut chain = Self::new()
            .with(Box::new(KeywordStrategy::new(Arc::clone(&index))))
            .with(Box::new(SubstringStrategy::new(index)));
        if let Some(v) = vectors {
            chain = chain.with(Box::new(
                VectorStrategy::new(v).with_min_similarity(min_similarity),
            ));
        }
        chain
    }

    pub fn with(mut self, strategy: Box<dyn SearchStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn search(&self, query: &LocalQuery<'_>, limit: usize) -> ChainOutcome {
        for strategy in &self.strategies {
            let candidates = strategy.search(query, limit);
            debug!(
                strategy = strategy.name(),
                hits = candidates.len(),
                "local strategy ran"
            );
            if !candidates.is_empty() {
                return ChainOutcome {
                    strategy: Some(strategy.name()),
                    candidates,
                };
            }
        }
        ChainOutcome::default()
    }
}

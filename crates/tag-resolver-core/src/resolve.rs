//! Resolution orchestrator and the response contract.
//!
//! A request moves through
//! `validating → cache_lookup → gathering → scoring → routing → caching`,
//! exiting early on a validation failure or an empty candidate set. The
//! computed outcome is the tagged union [`Resolution`]; it is converted to
//! the wire shape [`ResolutionResponse`] in exactly one place,
//! [`Resolution::into_response`].
//!
//! Only successfully computed outcomes (a path or a clarification) are
//! cached, and only after the whole computation has finished, so a caller
//! timing out mid-request never leaves a partial entry behind.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::backend::{CatalogProvider, LiveTagSearch, MetadataSource, ResultCache};
use crate::confidence::{classify, ConfidenceLabel, ConfidenceParams, NextStep};
use crate::gather::gather_candidates;
use crate::models::{CandidateMatch, CandidateSource, MatchedKeywords};
use crate::scoring::{rank, score_candidate, ScoreWeights};
use crate::strategy::{LocalQuery, StrategyChain, DEFAULT_MIN_SIMILARITY};
use crate::tokenize::{extract_keywords, normalize_description};

/// Cache namespace for resolution responses.
pub const CACHE_NAMESPACE: &str = "tag_resolution";

const CACHE_CATEGORY: &str = "tag_resolution";

/// Paths quoted in a clarifying question.
const QUESTION_OPTIONS: usize = 3;

/// Resolver tuning, decoupled from application config.
#[derive(Debug, Clone)]
pub struct ResolverParams {
    pub confidence: ConfidenceParams,
    pub weights: ScoreWeights,
    /// Cap on candidates gathered per source and returned to the caller.
    pub max_candidates: usize,
    /// Cap on `alternatives` in the response.
    pub max_alternatives: usize,
    pub cache_ttl: Duration,
    /// Cosine floor for the vector fallback.
    pub vector_min_similarity: f64,
}

impl Default for ResolverParams {
    fn default() -> Self {
        Self {
            confidence: ConfidenceParams::default(),
            weights: ScoreWeights::default(),
            max_candidates: 20,
            max_alternatives: 5,
            cache_ttl: Duration::from_secs(3600),
            vector_min_similarity: DEFAULT_MIN_SIMILARITY,
        }
    }
}

/// Terminal failures. Ambiguity is not among them: it is a computed
/// [`Resolution::Clarify`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("description is empty")]
    EmptyDescription,
    #[error("description has no searchable keywords after removing stop words")]
    NoKeywords,
    #[error("No tags found matching '{0}'")]
    NoTagsFound(String),
    #[error("tag search unavailable: {0}")]
    Upstream(String),
}

impl ResolveError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ResolveError::EmptyDescription | ResolveError::NoKeywords => FailureKind::Validation,
            ResolveError::NoTagsFound(_) => FailureKind::NoCandidates,
            ResolveError::Upstream(_) => FailureKind::UpstreamUnavailable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    NoCandidates,
    UpstreamUnavailable,
}

/// Outcome of one resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Success {
        path: String,
        confidence: f64,
        alternatives: Vec<String>,
        candidates: Vec<CandidateMatch>,
    },
    Clarify {
        question: String,
        confidence: f64,
        alternatives: Vec<String>,
        candidates: Vec<CandidateMatch>,
    },
    Failure(ResolveError),
}

/// A ranked candidate as exposed on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateView {
    pub path: String,
    pub score: f64,
    pub matched_keywords: MatchedKeywords,
    pub metadata: serde_json::Value,
    pub sources: Vec<CandidateSource>,
}

impl From<&CandidateMatch> for CandidateView {
    fn from(c: &CandidateMatch) -> Self {
        Self {
            path: c.path.clone(),
            score: c.score,
            matched_keywords: c.matched_keywords.clone(),
            metadata: c.metadata_view(),
            sources: c.sources.iter().copied().collect(),
        }
    }
}

/// Wire response returned to callers and stored in the result cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResponse {
    pub success: bool,
    pub most_likely_path: Option<String>,
    pub confidence: f64,
    pub confidence_label: ConfidenceLabel,
    pub candidates: Vec<CandidateView>,
    pub alternatives: Vec<String>,
    pub keywords: Vec<String>,
    pub clarifying_question: Option<String>,
    pub next_step: NextStep,
    pub cached: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
}

impl Resolution {
    pub fn is_failure(&self) -> bool {
        matches!(self, Resolution::Failure(_))
    }

    /// The single conversion from the tagged union to the wire contract.
    pub fn into_response(self, keywords: Vec<String>, cached: bool) -> ResolutionResponse {
        match self {
            Resolution::Success {
                path,
                confidence,
                alternatives,
                candidates,
            } => ResolutionResponse {
                success: true,
                most_likely_path: Some(path),
                confidence,
                confidence_label: ConfidenceLabel::High,
                candidates: candidates.iter().map(CandidateView::from).collect(),
                alternatives,
                keywords,
                clarifying_question: None,
                next_step: NextStep::ReturnPath,
                cached,
                error: None,
                error_kind: None,
            },
            Resolution::Clarify {
                question,
                confidence,
                alternatives,
                candidates,
            } => ResolutionResponse {
                success: false,
                most_likely_path: None,
                confidence,
                confidence_label: ConfidenceLabel::Low,
                candidates: candidates.iter().map(CandidateView::from).collect(),
                alternatives,
                keywords,
                clarifying_question: Some(question),
                next_step: NextStep::Clarify,
                cached,
                error: None,
                error_kind: None,
            },
            Resolution::Failure(err) => ResolutionResponse {
                success: false,
                most_likely_path: None,
                confidence: 0.0,
                confidence_label: ConfidenceLabel::Low,
                candidates: Vec::new(),
                alternatives: Vec::new(),
                keywords,
                clarifying_question: None,
                next_step: NextStep::Clarify,
                cached,
                error: Some(err.to_string()),
                error_kind: Some(err.kind()),
            },
        }
    }
}

/// Reject blank descriptions and descriptions made only of stop words.
pub fn validate_description(description: &str) -> Result<Vec<String>, ResolveError> {
    if description.trim().is_empty() {
        return Err(ResolveError::EmptyDescription);
    }
    let keywords = extract_keywords(description);
    if keywords.is_empty() {
        return Err(ResolveError::NoKeywords);
    }
    Ok(keywords)
}

/// Resolves free-text sensor descriptions to tag paths.
///
/// Construct once at startup and share by reference; all per-request state
/// lives on the stack of [`resolve`](Resolver::resolve).
pub struct Resolver {
    catalog: Arc<dyn CatalogProvider>,
    live: Option<Arc<dyn LiveTagSearch>>,
    metadata: Option<Arc<dyn MetadataSource>>,
    cache: Option<Arc<dyn ResultCache>>,
    params: ResolverParams,
}

impl Resolver {
    pub fn new(catalog: Arc<dyn CatalogProvider>, params: ResolverParams) -> Self {
        Self {
            catalog,
            live: None,
            metadata: None,
            cache: None,
            params,
        }
    }

    pub fn with_live_search(mut self, live: Arc<dyn LiveTagSearch>) -> Self {
        self.live = Some(live);
        self
    }

    pub fn with_metadata(mut self, metadata: Arc<dyn MetadataSource>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn params(&self) -> &ResolverParams {
        &self.params
    }

    /// Resolve `description`, consulting and populating the result cache.
    ///
    /// With `bypass_cache`, the lookup is skipped, collaborators are asked
    /// to bypass their own caches, and the fresh result overwrites any
    /// existing entry. Never fails: every outcome is a well-formed
    /// response.
    pub async fn resolve(&self, description: &str, bypass_cache: bool) -> ResolutionResponse {
        let keywords = match validate_description(description) {
            Ok(k) => k,
            Err(e) => {
                debug!(error = %e, "description rejected");
                return Resolution::Failure(e).into_response(Vec::new(), false);
            }
        };

        let cache_key = self.cache.as_ref().map(|c| {
            c.generate_key(
                CACHE_NAMESPACE,
                &normalize_description(description),
                None,
                None,
            )
        });

        if !bypass_cache {
            if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
                if let Some(value) = cache.get(key).await {
                    match serde_json::from_value::<ResolutionResponse>(value) {
                        Ok(mut hit) => {
                            debug!(key = %key, "resolution served from cache");
                            hit.cached = true;
                            return hit;
                        }
                        Err(e) => warn!(key = %key, error = %e, "unreadable cache entry ignored"),
                    }
                }
            }
        }

        let resolution = self.compute(description, &keywords, bypass_cache).await;
        let cacheable = !resolution.is_failure();
        let response = resolution.into_response(keywords, false);

        if cacheable {
            if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
                match serde_json::to_value(&response) {
                    Ok(value) => {
                        if let Err(e) = cache
                            .set(key, value, CACHE_CATEGORY, self.params.cache_ttl)
                            .await
                        {
                            warn!(key = %key, error = %e, "failed to cache resolution");
                        }
                    }
                    Err(e) => warn!(error = %e, "failed to serialize resolution"),
                }
            }
        }

        response
    }

    /// Gathering, scoring, and routing, without the cache.
    pub async fn compute(
        &self,
        description: &str,
        keywords: &[String],
        bypass_cache: bool,
    ) -> Resolution {
        let index = self.catalog.tag_index().await;
        let vectors = self.catalog.vector_index().await;
        let chain = StrategyChain::standard(index, vectors, self.params.vector_min_similarity);
        let query = LocalQuery {
            keywords,
            description,
        };

        let gathered = gather_candidates(
            self.live.as_deref(),
            &chain,
            &query,
            self.params.max_candidates,
            bypass_cache,
        )
        .await;

        let live_error = gathered.live_error;
        let failure = |reason: &str| {
            let err = match &live_error {
                Some(msg) => ResolveError::Upstream(msg.clone()),
                None => ResolveError::NoTagsFound(description.trim().to_string()),
            };
            info!(keywords = ?keywords, error = %err, reason, "resolution failed");
            Resolution::Failure(err)
        };

        let mut candidates = gathered.candidates;
        if candidates.is_empty() {
            return failure("no candidates gathered");
        }

        // Rank the whole merged set before capping it.
        self.score_and_rank(&mut candidates, keywords);
        candidates.truncate(self.params.max_candidates);

        self.enrich(&mut candidates).await;
        self.score_and_rank(&mut candidates, keywords);

        let before = candidates.len();
        candidates.retain(|c| c.score > 0.0);
        if candidates.len() < before {
            debug!(dropped = before - candidates.len(), "unmatched candidates dropped");
        }

        let scores: Vec<f64> = candidates.iter().map(|c| c.score).collect();
        let confidence = classify(&scores, &self.params.confidence);

        let top_path = match candidates.first() {
            Some(top) => top.path.clone(),
            None => return failure("no candidate matched any keyword"),
        };

        info!(
            keywords = ?keywords,
            candidates = candidates.len(),
            local_strategy = gathered.local_strategy.unwrap_or("none"),
            top = %top_path,
            confidence = confidence.score,
            "resolution computed"
        );

        match confidence.next_step {
            NextStep::ReturnPath => Resolution::Success {
                path: top_path,
                confidence: confidence.score,
                alternatives: candidates
                    .iter()
                    .skip(1)
                    .take(self.params.max_alternatives)
                    .map(|c| c.path.clone())
                    .collect(),
                candidates,
            },
            NextStep::Clarify => Resolution::Clarify {
                question: clarifying_question(&candidates, keywords),
                confidence: confidence.score,
                alternatives: candidates
                    .iter()
                    .take(self.params.max_alternatives)
                    .map(|c| c.path.clone())
                    .collect(),
                candidates,
            },
        }
    }

    fn score_and_rank(&self, candidates: &mut [CandidateMatch], keywords: &[String]) {
        for c in candidates.iter_mut() {
            score_candidate(c, keywords, &self.params.weights);
        }
        rank(candidates);
    }

    /// Fetch metadata for every candidate concurrently. A failed fetch
    /// leaves that candidate's metadata `Null`.
    async fn enrich(&self, candidates: &mut [CandidateMatch]) {
        let Some(source) = self.metadata.as_deref() else {
            return;
        };

        let results = join_all(candidates.iter().map(|c| source.get_metadata(&c.path))).await;

        for (candidate, result) in candidates.iter_mut().zip(results) {
            match result {
                Ok((metadata, was_cached)) => {
                    debug!(path = %candidate.path, was_cached, "metadata fetched");
                    candidate.metadata = metadata;
                }
                Err(e) => {
                    warn!(path = %candidate.path, error = %e, "metadata fetch failed");
                }
            }
        }
    }
}

/// Question naming the leading ambiguous paths.
pub fn clarifying_question(candidates: &[CandidateMatch], keywords: &[String]) -> String {
    let query = keywords.join(" ");
    let options: Vec<&str> = candidates
        .iter()
        .take(QUESTION_OPTIONS)
        .map(|c| c.path.as_str())
        .collect();

    match options.as_slice() {
        [] => format!(
            "No tag clearly matches '{}'. Can you describe the sensor in more detail?",
            query
        ),
        [only] => format!(
            "The closest tag for '{}' is {}, but the match is weak. Is this the sensor you mean?",
            query, only
        ),
        [init @ .., last] => format!(
            "Several tags match '{}': {} or {}. Which one do you mean? \
             Naming the equipment or location will narrow it down.",
            query,
            init.join(", "),
            last
        ),
    }
}

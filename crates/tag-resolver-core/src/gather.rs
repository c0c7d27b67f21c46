//! Candidate gathering across live search and the local strategy chain.
//!
//! Sources are queried in a fixed order (live search, then the local
//! chain) and merged by path. The first occurrence of a path wins; later
//! duplicates only contribute their sources, matched keywords, and any
//! fields the first occurrence lacked.

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::backend::LiveTagSearch;
use crate::models::CandidateMatch;
use crate::strategy::{LocalQuery, StrategyChain};

/// Number of keywords folded into the live search pattern.
const PATTERN_KEYWORDS: usize = 2;

/// Result of gathering candidates for one request.
#[derive(Debug, Default)]
pub struct GatherOutcome {
    /// Merged, deduplicated candidates in first-seen order.
    pub candidates: Vec<CandidateMatch>,
    /// Error message when the live search collaborator failed.
    pub live_error: Option<String>,
    /// Local strategy that produced candidates, if any.
    pub local_strategy: Option<&'static str>,
}

/// Wildcard pattern for the live search: the most specific (longest)
/// keywords, kept in query order, e.g. `*shell*temperature*`.
pub fn live_search_pattern(keywords: &[String]) -> String {
    let mut ranked: Vec<(usize, &String)> = keywords.iter().enumerate().collect();
    ranked.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then(a.0.cmp(&b.0)));
    ranked.truncate(PATTERN_KEYWORDS);
    ranked.sort_by_key(|(i, _)| *i);

    let mut pattern = String::from("*");
    for (_, kw) in ranked {
        pattern.push_str(kw);
        pattern.push('*');
    }
    pattern
}

/// Merge candidates by path, first occurrence wins.
pub fn merge_candidates(batches: impl IntoIterator<Item = CandidateMatch>) -> Vec<CandidateMatch> {
    let mut merged: Vec<CandidateMatch> = Vec::new();
    let mut by_path: HashMap<String, usize> = HashMap::new();

    for candidate in batches {
        match by_path.get(&candidate.path) {
            Some(&i) => merged[i].absorb(candidate),
            None => {
                by_path.insert(candidate.path.clone(), merged.len());
                merged.push(candidate);
            }
        }
    }
    merged
}

/// Query live search (when configured) and the local chain, then merge.
///
/// Live search failures are recorded in [`GatherOutcome::live_error`] and
/// do not stop the local chain from running.
pub async fn gather_candidates(
    live: Option<&dyn LiveTagSearch>,
    chain: &StrategyChain,
    query: &LocalQuery<'_>,
    limit: usize,
    bypass_cache: bool,
) -> GatherOutcome {
    let mut live_candidates = Vec::new();
    let mut live_error = None;

    if let Some(live) = live {
        let pattern = live_search_pattern(query.keywords);
        match live.search(&pattern, bypass_cache).await {
            Ok(resp) if resp.success => {
                debug!(pattern = %pattern, count = resp.tags.len(), "live search returned");
                live_candidates = resp
                    .tags
                    .iter()
                    .take(limit)
                    .map(CandidateMatch::from_live)
                    .collect();
            }
            Ok(resp) => {
                let msg = resp
                    .error
                    .unwrap_or_else(|| "live tag search reported failure".to_string());
                warn!(pattern = %pattern, error = %msg, "live search unsuccessful");
                live_error = Some(msg);
            }
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "live search failed");
                live_error = Some(format!("{:#}", e));
            }
        }
    }

    let local = chain.search(query, limit);

    GatherOutcome {
        candidates: merge_candidates(live_candidates.into_iter().chain(local.candidates)),
        live_error,
        local_strategy: local.strategy,
    }
}

//! Query and catalog tokenization.
//!
//! Tokens are runs of ASCII letters and digits, lowercased. Catalog text is
//! indexed with every token it contains; query text additionally drops a
//! fixed set of stop words so that phrasing like "get the average kiln
//! temperature" reduces to the terms that identify a sensor.

use std::collections::HashSet;

/// Words removed from query descriptions before searching.
///
/// Articles, prepositions, request verbs, and aggregation words that
/// describe what to do with a value rather than which sensor it is.
pub const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "of", "for", "in", "on", "at", "to", "from", "by", "with", "and", "or",
    "is", "are", "was", "be", "it", "this", "that", "what", "which", "where", "how", "show",
    "me", "my", "i", "get", "find", "give", "tell", "please", "need", "want", "value",
    "values", "current", "average", "avg", "latest", "data",
];

/// Split text into lowercase alphanumeric tokens, preserving order and
/// duplicates.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_lowercase())
        .collect()
}

/// Returns `true` if `token` is in [`STOP_WORDS`].
pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Extract query keywords: tokens with stop words removed, de-duplicated
/// with first-occurrence order kept.
///
/// ```rust
/// use tag_resolver_core::tokenize::extract_keywords;
///
/// let kw = extract_keywords("Find the kiln shell temperature in section 15");
/// assert_eq!(kw, vec!["kiln", "shell", "temperature", "section", "15"]);
/// ```
pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(text)
        .into_iter()
        .filter(|t| !is_stop_word(t))
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Lowercase and collapse whitespace. Used as the cache key component so
/// that trivially different phrasings of the same text share an entry.
pub fn normalize_description(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

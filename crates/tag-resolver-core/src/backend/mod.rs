//! Collaborator abstractions for the resolution pipeline.
//!
//! The resolver reaches everything outside the core through these traits,
//! so hosts can plug in HTTP clients, on-disk caches, lazily loaded
//! catalogs, or the in-memory implementations in [`memory`].
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`LiveTagSearch`] | Pattern search against the live historian |
//! | [`MetadataSource`] | Per-tag metadata lookup |
//! | [`ResultCache`] | TTL-bounded cache of full resolution responses |
//! | [`CatalogProvider`] | Access to the local tag index and vector index |

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::TagIndex;
use crate::models::LiveSearchResponse;
use crate::vector::VectorIndex;

/// Live tag search on the historian.
#[async_trait]
pub trait LiveTagSearch: Send + Sync {
    /// Search tags matching a wildcard `pattern` (e.g. `*kiln*shell*`).
    async fn search(&self, pattern: &str, bypass_cache: bool) -> Result<LiveSearchResponse>;
}

/// Per-tag metadata lookup.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Returns the metadata map for `path` and whether it came from the
    /// collaborator's own cache. The map may carry nested `properties`.
    async fn get_metadata(&self, path: &str) -> Result<(serde_json::Value, bool)>;
}

/// Key-value cache for resolution responses.
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Returns the cached value, or `None` on a miss or expired entry.
    async fn get(&self, key: &str) -> Option<serde_json::Value>;

    /// Store `value` under `key` for `ttl`.
    async fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        category: &str,
        ttl: Duration,
    ) -> Result<()>;

    /// Build a cache key from a namespace, a tag (here: the normalized
    /// description), and an optional time range.
    fn generate_key(
        &self,
        namespace: &str,
        tag: &str,
        start: Option<&str>,
        end: Option<&str>,
    ) -> String {
        hashed_key(namespace, tag, start, end)
    }
}

/// Access to the local catalog indexes.
///
/// Implementations decide when loading happens; the lazy file-backed
/// provider loads on first call and must do so at most once.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn tag_index(&self) -> Arc<TagIndex>;

    /// `None` when no vector artifact is available.
    async fn vector_index(&self) -> Option<Arc<VectorIndex>>;
}

/// `"{namespace}:{sha256-hex}"` over the `|`-joined components.
pub fn hashed_key(namespace: &str, tag: &str, start: Option<&str>, end: Option<&str>) -> String {
    let material = format!(
        "{}|{}|{}|{}",
        namespace,
        tag,
        start.unwrap_or_default(),
        end.unwrap_or_default()
    );
    format!("{}:{}", namespace, hex::encode(Sha256::digest(material.as_bytes())))
}

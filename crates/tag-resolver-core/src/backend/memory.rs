//! In-memory collaborator implementations for tests and embedded hosts.
//!
//! [`InMemoryCache`] keeps entries in a `HashMap` behind `std::sync::RwLock`
//! with wall-clock expiry. Expired entries are evicted when read and swept
//! on every write. [`StaticCatalog`] serves indexes that were built
//! up front.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;

use super::{CatalogProvider, ResultCache};
use crate::catalog::TagIndex;
use crate::vector::VectorIndex;

struct CacheEntry {
    value: serde_json::Value,
    _category: String,
    expires_at_ms: i64,
}

/// In-process result cache.
#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResultCache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<serde_json::Value> {
        let now = Utc::now().timestamp_millis();
        {
            let entries = self.entries.read().ok()?;
            let entry = entries.get(key)?;
            if entry.expires_at_ms > now {
                return Some(entry.value.clone());
            }
        }
        if let Ok(mut entries) = self.entries.write() {
            if entries.get(key).is_some_and(|e| e.expires_at_ms <= now) {
                entries.remove(key);
            }
        }
        None
    }

    async fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        category: &str,
        ttl: Duration,
    ) -> Result<()> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let now = Utc::now().timestamp_millis();
        let expires_at_ms = now.saturating_add(ttl_ms);
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("cache lock poisoned"))?;
        entries.retain(|_, e| e.expires_at_ms > now);
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                _category: category.to_string(),
                expires_at_ms,
            },
        );
        Ok(())
    }
}

/// Catalog provider over already-built indexes.
pub struct StaticCatalog {
    index: Arc<TagIndex>,
    vectors: Option<Arc<VectorIndex>>,
}

impl StaticCatalog {
    pub fn new(index: TagIndex, vectors: Option<VectorIndex>) -> Self {
        Self {
            index: Arc::new(index),
            vectors: vectors.map(Arc::new),
        }
    }
}

#[async_trait]
impl CatalogProvider for StaticCatalog {
    async fn tag_index(&self) -> Arc<TagIndex> {
        Arc::clone(&self.index)
    }

    async fn vector_index(&self) -> Option<Arc<VectorIndex>> {
        self.vectors.clone()
    }
}

//! On-disk result cache.
//!
//! One JSON file per key under the configured directory, named by the
//! SHA-256 of the key. Each file holds `{key, category, expires_at, value}`.
//! Writes go to a temporary sibling and are renamed into place, so an
//! interrupted write never leaves a half-written entry behind.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use tag_resolver_core::backend::ResultCache;

/// Per-process counter that keeps concurrent temp names distinct.
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    key: String,
    category: String,
    expires_at: DateTime<Utc>,
    value: serde_json::Value,
}

pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let name = hex::encode(Sha256::digest(key.as_bytes()));
        self.dir.join(format!("{}.json", name))
    }
}

#[async_trait]
impl ResultCache for FileCache {
    async fn get(&self, key: &str) -> Option<serde_json::Value> {
        let path = self.entry_path(key);
        let text = tokio::fs::read_to_string(&path).await.ok()?;
        let entry: CacheFile = match serde_json::from_str(&text) {
            Ok(e) => e,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt cache entry ignored");
                return None;
            }
        };
        if entry.key != key {
            return None;
        }
        if entry.expires_at <= Utc::now() {
            debug!(key, "cache entry expired");
            return None;
        }
        Some(entry.value)
    }

    async fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        category: &str,
        ttl: Duration,
    ) -> Result<()> {
        let ttl =
            chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500));
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let entry = CacheFile {
            key: key.to_string(),
            category: category.to_string(),
            expires_at,
            value,
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create cache dir: {}", self.dir.display()))?;

        let path = self.entry_path(key);
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("tmp.{}.{}", std::process::id(), seq));
        let body = serde_json::to_vec(&entry)?;
        tokio::fs::write(&tmp, body)
            .await
            .with_context(|| format!("Failed to write cache entry: {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to commit cache entry: {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_set_then_get_across_instances() {
        let dir = TempDir::new().unwrap();
        let key = "tag_resolution:abc";
        FileCache::new(dir.path())
            .set(key, json!({"confidence": 0.8125}), "resolution", Duration::from_secs(60))
            .await
            .unwrap();

        let reopened = FileCache::new(dir.path());
        assert_eq!(reopened.get(key).await, Some(json!({"confidence": 0.8125})));
        assert_eq!(reopened.get("tag_resolution:other").await, None);
    }

    #[tokio::test]
    async fn test_expired_entry_is_miss() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path());
        cache.set("k", json!(1), "resolution", Duration::ZERO).await.unwrap();
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path().join("nested"));
        cache.set("k", json!("v"), "resolution", Duration::from_secs(60)).await.unwrap();
        let names: Vec<String> = std::fs::read_dir(cache.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with(".json"));
    }

    #[tokio::test]
    async fn test_concurrent_sets_of_same_key() {
        let dir = TempDir::new().unwrap();
        let cache = std::sync::Arc::new(FileCache::new(dir.path()));
        let mut writes = tokio::task::JoinSet::new();
        for i in 0..16 {
            let cache = cache.clone();
            writes.spawn(async move {
                cache
                    .set("k", json!(i), "resolution", Duration::from_secs(60))
                    .await
            });
        }
        while let Some(result) = writes.join_next().await {
            result.unwrap().unwrap();
        }

        let value = cache.get("k").await.unwrap();
        assert!((0..16).any(|i| value == json!(i)));
        let names: Vec<String> = std::fs::read_dir(cache.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1, "{:?}", names);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_miss() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path());
        cache.set("k", json!(1), "resolution", Duration::from_secs(60)).await.unwrap();
        let path = cache.entry_path("k");
        std::fs::write(&path, "garbage").unwrap();
        assert_eq!(cache.get("k").await, None);
    }
}

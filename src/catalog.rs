//! File-backed catalog provider with one-time lazy loading.
//!
//! Nothing is read at construction. The first call to
//! [`CatalogProvider::tag_index`] or [`CatalogProvider::vector_index`]
//! loads the catalog (and the vector artifact, if configured) under a
//! `tokio::sync::OnceCell`, so concurrent first callers wait on a single
//! load and never observe a partially built index.
//!
//! Load problems degrade instead of failing: a missing or invalid catalog
//! yields an empty index, and an unreadable or mismatched vector artifact
//! disables the vector fallback.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use tag_resolver_core::backend::CatalogProvider;
use tag_resolver_core::catalog::{parse_catalog_str, TagIndex};
use tag_resolver_core::embedding::HashEmbedder;
use tag_resolver_core::models::TagRecord;
use tag_resolver_core::vector::{VectorArtifact, VectorIndex};

use crate::config::Config;

struct Loaded {
    index: Arc<TagIndex>,
    vectors: Option<Arc<VectorIndex>>,
}

pub struct LazyCatalog {
    catalog_path: PathBuf,
    vectors_path: Option<PathBuf>,
    max_postings: usize,
    dimension: usize,
    seed: u64,
    loaded: OnceCell<Loaded>,
    loads: AtomicUsize,
}

impl LazyCatalog {
    pub fn from_config(config: &Config) -> Self {
        Self {
            catalog_path: config.catalog.path.clone(),
            vectors_path: config.vectors.path.clone(),
            max_postings: config.catalog.max_postings_per_token,
            dimension: config.vectors.dimension,
            seed: config.vectors.seed,
            loaded: OnceCell::new(),
            loads: AtomicUsize::new(0),
        }
    }

    /// How many times the underlying files have been loaded (0 or 1).
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    async fn get(&self) -> &Loaded {
        self.loaded
            .get_or_init(|| async {
                self.loads.fetch_add(1, Ordering::SeqCst);
                self.load().await
            })
            .await
    }

    async fn load(&self) -> Loaded {
        let records = match read_catalog(&self.catalog_path).await {
            Ok(records) => records,
            Err(e) => {
                warn!(
                    path = %self.catalog_path.display(),
                    error = %format!("{:#}", e),
                    "local tag catalog unavailable, continuing with an empty index"
                );
                Vec::new()
            }
        };
        let index = TagIndex::build(records, self.max_postings);
        info!(
            records = index.len(),
            tokens = index.token_count(),
            "local tag catalog loaded"
        );

        let vectors = match &self.vectors_path {
            Some(path) => match self.load_vectors(path).await {
                Ok(v) => {
                    info!(rows = v.len(), "vector index loaded");
                    Some(Arc::new(v))
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %format!("{:#}", e),
                        "vector index unavailable, vector fallback disabled"
                    );
                    None
                }
            },
            None => None,
        };

        Loaded {
            index: Arc::new(index),
            vectors,
        }
    }

    async fn load_vectors(&self, path: &Path) -> Result<VectorIndex> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read vector artifact: {}", path.display()))?;
        let artifact: VectorArtifact =
            serde_json::from_str(&text).context("vector artifact is not valid JSON")?;
        let embedder = HashEmbedder::new(self.dimension, self.seed)?;
        VectorIndex::from_artifact(artifact, embedder)
    }
}

#[async_trait]
impl CatalogProvider for LazyCatalog {
    async fn tag_index(&self) -> Arc<TagIndex> {
        Arc::clone(&self.get().await.index)
    }

    async fn vector_index(&self) -> Option<Arc<VectorIndex>> {
        self.get().await.vectors.clone()
    }
}

/// Read and parse the catalog JSON at `path`.
pub async fn read_catalog(path: &Path) -> Result<Vec<TagRecord>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read tag catalog: {}", path.display()))?;
    parse_catalog_str(&text).with_context(|| format!("Invalid tag catalog: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CATALOG: &str = r#"{
        "plants": [
            {"name": "North", "tags": [
                {"path": "North.Kiln.ShellTemp", "description": "Kiln shell temperature", "unit": "degC", "plant": "North", "equipment": "Kiln"},
                {"path": "North.Mill.Power", "description": "Mill motor power", "unit": "kW", "plant": "North", "equipment": "Mill"}
            ]}
        ]
    }"#;

    fn config_in(dir: &TempDir) -> Config {
        let catalog = dir.path().join("catalog.json");
        std::fs::write(&catalog, CATALOG).unwrap();
        Config::with_catalog(catalog)
    }

    #[tokio::test]
    async fn test_loads_once_under_concurrency() {
        let dir = TempDir::new().unwrap();
        let catalog = Arc::new(LazyCatalog::from_config(&config_in(&dir)));
        assert_eq!(catalog.load_count(), 0);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let c = Arc::clone(&catalog);
            handles.push(tokio::spawn(async move { c.tag_index().await.len() }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap(), 2);
        }
        assert_eq!(catalog.load_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_catalog_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::with_catalog(dir.path().join("nope.json"));
        let catalog = LazyCatalog::from_config(&cfg);
        assert!(catalog.tag_index().await.is_empty());
        assert!(catalog.vector_index().await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_catalog_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, "{not json").unwrap();
        let catalog = LazyCatalog::from_config(&Config::with_catalog(path));
        assert!(catalog.tag_index().await.is_empty());
    }

    #[tokio::test]
    async fn test_vector_artifact_with_other_seed_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut cfg = config_in(&dir);
        let records = read_catalog(&cfg.catalog.path).await.unwrap();
        let built = VectorIndex::build(&records, HashEmbedder::new(64, 7).unwrap());
        let vectors_path = dir.path().join("vectors.json");
        std::fs::write(
            &vectors_path,
            serde_json::to_string(&built.to_artifact()).unwrap(),
        )
        .unwrap();

        cfg.vectors.path = Some(vectors_path.clone());
        cfg.vectors.dimension = 64;
        cfg.vectors.seed = 7;
        let ok = LazyCatalog::from_config(&cfg);
        assert_eq!(ok.vector_index().await.map(|v| v.len()), Some(2));

        cfg.vectors.seed = 8;
        let mismatched = LazyCatalog::from_config(&cfg);
        assert!(mismatched.vector_index().await.is_none());
        assert_eq!(mismatched.tag_index().await.len(), 2);
    }
}

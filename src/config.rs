//! TOML configuration parsing and validation.
//!
//! Every section except `[catalog]` is optional and every field has a
//! default, so a minimal config is just:
//!
//! ```toml
//! [catalog]
//! path = "data/tag_catalog.json"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tag_resolver_core::catalog::DEFAULT_MAX_POSTINGS;
use tag_resolver_core::confidence::{ConfidenceParams, DEFAULT_CONFIDENCE_THRESHOLD};
use tag_resolver_core::embedding::{DEFAULT_DIMENSION, DEFAULT_SEED};
use tag_resolver_core::resolve::ResolverParams;
use tag_resolver_core::scoring::ScoreWeights;
use tag_resolver_core::strategy::DEFAULT_MIN_SIMILARITY;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub vectors: VectorsConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub historian: Option<HistorianConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    pub path: PathBuf,
    #[serde(default = "default_max_postings")]
    pub max_postings_per_token: usize,
}

fn default_max_postings() -> usize {
    DEFAULT_MAX_POSTINGS
}

#[derive(Debug, Deserialize, Clone)]
pub struct VectorsConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    #[serde(default)]
    pub seed: u64,
    /// Cosine floor for vector fallback hits.
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f64,
}

impl Default for VectorsConfig {
    fn default() -> Self {
        Self {
            path: None,
            dimension: DEFAULT_DIMENSION,
            seed: DEFAULT_SEED,
            min_similarity: DEFAULT_MIN_SIMILARITY,
        }
    }
}

fn default_dimension() -> usize {
    DEFAULT_DIMENSION
}
fn default_min_similarity() -> f64 {
    DEFAULT_MIN_SIMILARITY
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResolverConfig {
    #[serde(default = "default_threshold")]
    pub confidence_threshold: f64,
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    #[serde(default = "default_max_alternatives")]
    pub max_alternatives: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            max_candidates: 20,
            max_alternatives: 5,
            timeout_secs: 30,
            cache_ttl_secs: 3600,
        }
    }
}

fn default_threshold() -> f64 {
    DEFAULT_CONFIDENCE_THRESHOLD
}
fn default_max_candidates() -> usize {
    20
}
fn default_max_alternatives() -> usize {
    5
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_cache_ttl_secs() -> u64 {
    3600
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScoringConfig {
    #[serde(default = "default_name_weight")]
    pub name: f64,
    #[serde(default = "default_path_weight")]
    pub path: f64,
    #[serde(default = "default_description_weight")]
    pub description: f64,
    #[serde(default = "default_metadata_weight")]
    pub metadata: f64,
    #[serde(default = "default_vector_weight")]
    pub vector: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let w = ScoreWeights::default();
        Self {
            name: w.name,
            path: w.path,
            description: w.description,
            metadata: w.metadata,
            vector: w.vector,
        }
    }
}

fn default_name_weight() -> f64 {
    ScoreWeights::default().name
}
fn default_path_weight() -> f64 {
    ScoreWeights::default().path
}
fn default_description_weight() -> f64 {
    ScoreWeights::default().description
}
fn default_metadata_weight() -> f64 {
    ScoreWeights::default().metadata
}
fn default_vector_weight() -> f64 {
    ScoreWeights::default().vector
}

impl ScoringConfig {
    pub fn weights(&self) -> ScoreWeights {
        ScoreWeights {
            name: self.name,
            path: self.path,
            description: self.description,
            metadata: self.metadata,
            vector: self.vector,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CacheConfig {
    /// Directory for on-disk entries. Unset ⇒ in-process cache only.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistorianConfig {
    pub base_url: String,
    #[serde(default = "default_historian_timeout")]
    pub timeout_secs: u64,
    /// Static bearer token, sent as-is.
    #[serde(default)]
    pub token: Option<String>,
}

fn default_historian_timeout() -> u64 {
    10
}

impl Config {
    /// Catalog-only configuration pointing at `catalog_path`.
    pub fn with_catalog(catalog_path: impl Into<PathBuf>) -> Self {
        Self {
            catalog: CatalogConfig {
                path: catalog_path.into(),
                max_postings_per_token: DEFAULT_MAX_POSTINGS,
            },
            vectors: VectorsConfig::default(),
            resolver: ResolverConfig::default(),
            scoring: ScoringConfig::default(),
            cache: CacheConfig::default(),
            historian: None,
        }
    }

    pub fn resolver_params(&self) -> ResolverParams {
        ResolverParams {
            confidence: ConfidenceParams {
                threshold: self.resolver.confidence_threshold,
                ..ConfidenceParams::default()
            },
            weights: self.scoring.weights(),
            max_candidates: self.resolver.max_candidates,
            max_alternatives: self.resolver.max_alternatives,
            cache_ttl: Duration::from_secs(self.resolver.cache_ttl_secs),
            vector_min_similarity: self.vectors.min_similarity,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.catalog.max_postings_per_token == 0 {
            bail!("catalog.max_postings_per_token must be > 0");
        }

        if self.vectors.dimension == 0 {
            bail!("vectors.dimension must be > 0");
        }
        let floor = self.vectors.min_similarity;
        if !(0.0..1.0).contains(&floor) {
            bail!("vectors.min_similarity must be in [0.0, 1.0)");
        }

        let threshold = self.resolver.confidence_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            bail!("resolver.confidence_threshold must be in (0.0, 1.0]");
        }
        if self.resolver.max_candidates == 0 {
            bail!("resolver.max_candidates must be >= 1");
        }
        if self.resolver.timeout_secs == 0 {
            bail!("resolver.timeout_secs must be >= 1");
        }

        self.scoring
            .weights()
            .validate()
            .context("invalid [scoring] weights")?;

        if let Some(h) = &self.historian {
            if !(h.base_url.starts_with("http://") || h.base_url.starts_with("https://")) {
                bail!(
                    "historian.base_url must start with http:// or https://, got '{}'",
                    h.base_url
                );
            }
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}

//! Vector retriever over a precomputed hash-embedding matrix.
//!
//! The matrix is built offline from the catalog with [`VectorIndex::build`]
//! and persisted as a [`VectorArtifact`]. At query time the same
//! [`HashEmbedder`] embeds the query and rows are ranked by cosine
//! similarity. Only positive similarities are returned.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::embedding::{cosine_similarity, EmbeddingProvider, HashEmbedder};
use crate::models::TagRecord;

/// Record metadata stored in parallel with each matrix row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub path: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub plant: String,
    #[serde(default)]
    pub equipment: String,
}

impl VectorRecord {
    pub fn to_tag_record(&self) -> TagRecord {
        TagRecord::new(
            &self.path,
            &self.description,
            &self.unit,
            &self.plant,
            &self.equipment,
        )
    }
}

impl From<&TagRecord> for VectorRecord {
    fn from(r: &TagRecord) -> Self {
        Self {
            path: r.path.clone(),
            description: r.description.clone(),
            unit: r.unit.clone(),
            plant: r.plant.clone(),
            equipment: r.equipment.clone(),
        }
    }
}

/// Serialized form of a [`VectorIndex`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorArtifact {
    pub model: String,
    pub dimension: usize,
    pub seed: u64,
    pub records: Vec<VectorRecord>,
    pub vectors: Vec<Vec<f32>>,
}

/// A vector search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit<'a> {
    pub record: &'a VectorRecord,
    pub score: f32,
}

/// Read-only embedding matrix with parallel record metadata.
#[derive(Debug)]
pub struct VectorIndex {
    embedder: HashEmbedder,
    records: Vec<VectorRecord>,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    /// Embed every record's `search_blob`.
    pub fn build(records: &[TagRecord], embedder: HashEmbedder) -> Self {
        let vectors = records
            .iter()
            .map(|r| embedder.embed(&r.search_blob))
            .collect();
        Self {
            embedder,
            records: records.iter().map(VectorRecord::from).collect(),
            vectors,
        }
    }

    /// Load a persisted artifact, checking it was built with `expected`.
    pub fn from_artifact(artifact: VectorArtifact, expected: HashEmbedder) -> Result<Self> {
        if artifact.dimension != expected.dims() || artifact.seed != expected.seed() {
            bail!(
                "vector artifact built with dimension={} seed={}, expected dimension={} seed={}",
                artifact.dimension,
                artifact.seed,
                expected.dims(),
                expected.seed()
            );
        }
        if artifact.records.len() != artifact.vectors.len() {
            bail!(
                "vector artifact has {} records but {} vectors",
                artifact.records.len(),
                artifact.vectors.len()
            );
        }
        if let Some((row, v)) = artifact
            .vectors
            .iter()
            .enumerate()
            .find(|(_, v)| v.len() != artifact.dimension)
        {
            bail!(
                "vector artifact row {} has {} dims, expected {}",
                row,
                v.len(),
                artifact.dimension
            );
        }
        Ok(Self {
            embedder: expected,
            records: artifact.records,
            vectors: artifact.vectors,
        })
    }

    pub fn to_artifact(&self) -> VectorArtifact {
        VectorArtifact {
            model: self.embedder.model_name().to_string(),
            dimension: self.embedder.dims(),
            seed: self.embedder.seed(),
            records: self.records.clone(),
            vectors: self.vectors.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Top-`limit` rows by cosine similarity to `embed(text)`, ties broken
    /// by row order.
    pub fn search(&self, text: &str, limit: usize) -> Vec<VectorHit<'_>> {
        let query = self.embedder.embed(text);
        if query.iter().all(|x| *x == 0.0) {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(row, v)| (row, cosine_similarity(&query, v)))
            .filter(|(_, s)| *s > 0.0)
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(limit);

        scored
            .into_iter()
            .map(|(row, score)| VectorHit {
                record: &self.records[row],
                score,
            })
            .collect()
    }
}

//! Embedding provider trait, the hashed embedding, and vector utilities.
//!
//! The only provider shipped is [`HashEmbedder`]: a reproducible
//! "bag of hashed features" projection. It is not a learned model. Its one
//! hard requirement is determinism, because the offline vector artifact
//! and the online query path must embed text identically.

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};

use crate::tokenize::tokenize;

/// Default embedding dimensionality.
pub const DEFAULT_DIMENSION: usize = 512;

/// Default hashing seed.
pub const DEFAULT_SEED: u64 = 0;

/// Trait for embedding providers.
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier stored alongside built artifacts.
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality.
    fn dims(&self) -> usize;
    /// Embed a single text.
    fn embed(&self, text: &str) -> Vec<f32>;
}

/// Seeded SHA-256 feature-hashing embedder.
///
/// For every token `t` of the input, `SHA256("{seed}-{t}")` picks a bucket
/// from its first four bytes (big-endian, modulo the dimension) and a sign
/// from the parity of the fifth byte (even ⇒ `+1`, odd ⇒ `-1`). The summed
/// vector is L2-normalized; text without tokens embeds to all zeros.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashEmbedder {
    dimension: usize,
    seed: u64,
}

impl HashEmbedder {
    pub fn new(dimension: usize, seed: u64) -> Result<Self> {
        if dimension == 0 {
            bail!("embedding dimension must be > 0");
        }
        Ok(Self { dimension, seed })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            seed: DEFAULT_SEED,
        }
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn model_name(&self) -> &str {
        "sha256-feature-hash"
    }

    fn dims(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in tokenize(text) {
            let digest = Sha256::digest(format!("{}-{}", self.seed, token).as_bytes());
            let bucket = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize
                % self.dimension;
            let sign = if digest[4] % 2 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        l2_normalize(&mut vector);
        vector
    }
}

/// Scale `vector` to unit length in place. All-zero vectors are left as is.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors, vectors
/// of different lengths, or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

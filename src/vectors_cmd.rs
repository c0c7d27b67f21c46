//! `tagr vectors build`: offline construction of the vector artifact.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use tag_resolver_core::embedding::HashEmbedder;
use tag_resolver_core::vector::VectorIndex;

use crate::catalog::read_catalog;
use crate::config::Config;

/// Embed every catalog record and write the artifact to `output`, falling
/// back to `[vectors] path`. Returns the number of rows written.
pub async fn build_vectors(config: &Config, output: Option<&Path>) -> Result<(PathBuf, usize)> {
    let output = match output.or(config.vectors.path.as_deref()) {
        Some(p) => p.to_path_buf(),
        None => bail!("no output path: pass --output or set [vectors] path"),
    };

    let records = read_catalog(&config.catalog.path).await?;
    if records.is_empty() {
        bail!(
            "tag catalog {} contains no tags",
            config.catalog.path.display()
        );
    }

    let embedder = HashEmbedder::new(config.vectors.dimension, config.vectors.seed)?;
    let index = VectorIndex::build(&records, embedder);
    let body = serde_json::to_vec(&index.to_artifact())?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let tmp = output.with_extension("tmp");
    tokio::fs::write(&tmp, body)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, &output)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(rows = index.len(), path = %output.display(), "vector artifact written");
    Ok((output, index.len()))
}

pub async fn run_vectors_build(config: &Config, output: Option<PathBuf>) -> Result<()> {
    let (path, rows) = build_vectors(config, output.as_deref()).await?;
    println!("vectors build");
    println!("  records: {}", rows);
    println!("  dimension: {}", config.vectors.dimension);
    println!("  seed: {}", config.vectors.seed);
    println!("  output: {}", path.display());
    Ok(())
}

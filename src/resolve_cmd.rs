//! Resolver construction from configuration and the `tagr resolve` command.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use tag_resolver_core::backend::memory::InMemoryCache;
use tag_resolver_core::backend::ResultCache;
use tag_resolver_core::resolve::{Resolution, ResolutionResponse, ResolveError, Resolver};
use tag_resolver_core::tokenize::extract_keywords;

use crate::catalog::LazyCatalog;
use crate::config::Config;
use crate::file_cache::FileCache;
use crate::historian::HistorianClient;

/// Wire the resolver's collaborators from `config`.
///
/// Without a `[historian]` section the resolver runs catalog-only: no live
/// search and no metadata enrichment.
pub fn build_resolver(config: &Config) -> Result<Resolver> {
    let catalog = Arc::new(LazyCatalog::from_config(config));

    let cache: Arc<dyn ResultCache> = match &config.cache.dir {
        Some(dir) => Arc::new(FileCache::new(dir)),
        None => Arc::new(InMemoryCache::new()),
    };

    let mut resolver = Resolver::new(catalog, config.resolver_params()).with_cache(cache);

    if let Some(historian) = &config.historian {
        let client = Arc::new(HistorianClient::new(historian)?);
        resolver = resolver
            .with_live_search(client.clone())
            .with_metadata(client);
    }

    Ok(resolver)
}

/// Resolve `description` with a deadline over the whole orchestration.
///
/// The cache is written only after a computation completes, so expiry
/// never leaves a partial entry behind.
pub async fn resolve_with_timeout(
    resolver: &Resolver,
    description: &str,
    bypass_cache: bool,
    timeout: Duration,
) -> ResolutionResponse {
    match tokio::time::timeout(timeout, resolver.resolve(description, bypass_cache)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(timeout_secs = timeout.as_secs(), "resolution timed out");
            Resolution::Failure(ResolveError::Upstream(format!(
                "resolution timed out after {}s",
                timeout.as_secs()
            )))
            .into_response(extract_keywords(description), false)
        }
    }
}

pub async fn run_resolve(
    config: &Config,
    description: &str,
    bypass_cache: bool,
    json: bool,
) -> Result<()> {
    let resolver = build_resolver(config)?;
    let timeout = Duration::from_secs(config.resolver.timeout_secs);
    let response = resolve_with_timeout(&resolver, description, bypass_cache, timeout).await;
    info!(
        success = response.success,
        confidence = response.confidence,
        cached = response.cached,
        "resolve finished"
    );

    if json {
        let out = serde_json::to_string_pretty(&response)
            .context("Failed to serialize resolution response")?;
        println!("{}", out);
    } else {
        print_summary(&response);
    }
    Ok(())
}

fn print_summary(response: &ResolutionResponse) {
    if let Some(error) = &response.error {
        println!("error: {}", error);
        if !response.keywords.is_empty() {
            println!("  keywords: {}", response.keywords.join(", "));
        }
        return;
    }

    match &response.most_likely_path {
        Some(path) => println!("{}", path),
        None => {
            if let Some(q) = &response.clarifying_question {
                println!("{}", q);
            }
        }
    }
    println!(
        "  confidence: {:.2} ({})",
        response.confidence,
        serde_json::to_value(response.confidence_label)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default()
    );
    println!("  keywords: {}", response.keywords.join(", "));
    if response.cached {
        println!("  cached: true");
    }
    for (i, c) in response.candidates.iter().enumerate() {
        println!("  {}. [{:.2}] {}", i + 1, c.score, c.path);
    }
}

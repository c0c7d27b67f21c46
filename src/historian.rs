//! HTTP client for the historian's tag search and metadata endpoints.
//!
//! | Endpoint | Returns |
//! |----------|---------|
//! | `GET {base}/api/tags/search?pattern=&bypassCache=` | live search response |
//! | `GET {base}/api/tags/metadata?path=` | `{ "metadata": {...}, "cached": bool }` |
//!
//! Requests are single-shot: a non-2xx status or transport error is
//! returned as an error and the resolver degrades around it.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use tag_resolver_core::backend::{LiveTagSearch, MetadataSource};
use tag_resolver_core::models::LiveSearchResponse;

use crate::config::HistorianConfig;

pub struct HistorianClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MetadataResponse {
    #[serde(default)]
    metadata: serde_json::Value,
    #[serde(default)]
    cached: bool,
}

impl HistorianClient {
    pub fn new(config: &HistorianConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build historian HTTP client")?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut request = self.client.get(&url).query(query);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("historian request failed: {}", url))?;
        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("historian error {} from {}: {}", status, endpoint, body_text);
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("unexpected response body from {}", endpoint))
    }
}

#[async_trait]
impl LiveTagSearch for HistorianClient {
    async fn search(&self, pattern: &str, bypass_cache: bool) -> Result<LiveSearchResponse> {
        debug!(pattern, bypass_cache, "historian tag search");
        let bypass = if bypass_cache { "true" } else { "false" };
        self.get_json(
            "/api/tags/search",
            &[("pattern", pattern), ("bypassCache", bypass)],
        )
        .await
    }
}

#[async_trait]
impl MetadataSource for HistorianClient {
    async fn get_metadata(&self, path: &str) -> Result<(serde_json::Value, bool)> {
        let resp: MetadataResponse = self
            .get_json("/api/tags/metadata", &[("path", path)])
            .await?;
        Ok((resp.metadata, resp.cached))
    }
}

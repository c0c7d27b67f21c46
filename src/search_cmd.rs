//! `tagr search`: debug view of the local retrieval chain.
//!
//! Runs keyword, substring, and vector strategies in order against the
//! local catalog, exactly as the resolver's local step does, and prints
//! which strategy answered and its ranked hits. No live search, metadata,
//! or cache involvement.

use anyhow::Result;

use tag_resolver_core::backend::CatalogProvider;
use tag_resolver_core::strategy::{ChainOutcome, LocalQuery, StrategyChain};
use tag_resolver_core::tokenize::extract_keywords;

use crate::catalog::LazyCatalog;
use crate::config::Config;

pub async fn search_local(config: &Config, text: &str, limit: usize) -> ChainOutcome {
    let catalog = LazyCatalog::from_config(config);
    let chain = StrategyChain::standard(
        catalog.tag_index().await,
        catalog.vector_index().await,
        config.vectors.min_similarity,
    );
    let keywords = extract_keywords(text);
    chain.search(
        &LocalQuery {
            keywords: &keywords,
            description: text,
        },
        limit,
    )
}

pub async fn run_search(config: &Config, text: &str, limit: Option<usize>) -> Result<()> {
    let limit = limit.unwrap_or(config.resolver.max_candidates);
    let outcome = search_local(config, text, limit).await;

    let Some(strategy) = outcome.strategy else {
        println!("No results.");
        return Ok(());
    };

    println!("strategy: {}", strategy);
    for (i, c) in outcome.candidates.iter().enumerate() {
        println!("{}. [{:.3}] {}", i + 1, c.retrieval_score, c.path);
        if !c.description.is_empty() {
            println!("    {}", c.description);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> Config {
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"[
                {"path": "North.Kiln.ShellTemp", "description": "kiln shell temperature"},
                {"path": "North.Cooler.FanSpeed", "description": "cooler fan speed"}
            ]"#,
        )
        .unwrap();
        Config::with_catalog(path)
    }

    #[tokio::test]
    async fn test_keyword_strategy_answers_first() {
        let dir = TempDir::new().unwrap();
        let outcome = search_local(&config(&dir), "cooler fan", 10).await;
        assert_eq!(outcome.strategy, Some("keyword"));
        assert_eq!(outcome.candidates[0].path, "North.Cooler.FanSpeed");
    }

    #[tokio::test]
    async fn test_substring_strategy_catches_compounds() {
        let dir = TempDir::new().unwrap();
        let outcome = search_local(&config(&dir), "fanspe", 10).await;
        assert_eq!(outcome.strategy, Some("substring"));
        assert_eq!(outcome.candidates.len(), 1);
    }

    #[tokio::test]
    async fn test_nothing_matches() {
        let dir = TempDir::new().unwrap();
        let outcome = search_local(&config(&dir), "conveyor belt", 10).await;
        assert!(outcome.strategy.is_none());
        assert!(outcome.candidates.is_empty());
    }
}

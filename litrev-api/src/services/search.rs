//! Multi-source paper search
//!
//! `SearchService` fans a query out to every configured bibliographic
//! source. A source that fails or returns nothing does not fail the search;
//! only a total blackout (every requested source erroring) does.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{PaperSource, SearchResult};

/// Search adapter errors
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Response parse error: {0}")]
    Parse(String),
}

/// One bibliographic search backend
#[async_trait]
pub trait SearchSource: Send + Sync {
    fn source(&self) -> PaperSource;

    /// Returns up to `max_results` candidate papers; zero results is not an
    /// error.
    async fn search(&self, query: &str, max_results: usize)
        -> Result<Vec<SearchResult>, SourceError>;
}

/// Aggregates the configured sources behind one search call
pub struct SearchService {
    sources: Vec<Arc<dyn SearchSource>>,
}

impl SearchService {
    pub fn new(sources: Vec<Arc<dyn SearchSource>>) -> Self {
        Self { sources }
    }

    /// Search the requested sources, tolerating partial failure.
    ///
    /// Errors only when every queried source fails; otherwise failed sources
    /// are logged and skipped. Results are deduplicated and truncated to
    /// `max_results`.
    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
        requested: &[PaperSource],
    ) -> Result<Vec<SearchResult>, SourceError> {
        let active: Vec<&Arc<dyn SearchSource>> = self
            .sources
            .iter()
            .filter(|s| requested.contains(&s.source()))
            .collect();

        if active.is_empty() {
            return Ok(Vec::new());
        }

        let futures = active
            .iter()
            .map(|source| source.search(query, max_results));
        let outcomes = futures::future::join_all(futures).await;

        let mut all_results = Vec::new();
        let mut last_error = None;
        let mut failed = 0usize;

        for (source, outcome) in active.iter().zip(outcomes) {
            match outcome {
                Ok(results) => {
                    info!(
                        source = source.source().as_str(),
                        count = results.len(),
                        "Source search succeeded"
                    );
                    all_results.extend(results);
                }
                Err(e) => {
                    warn!(
                        source = source.source().as_str(),
                        error = %e,
                        "Source search failed; continuing with remaining sources"
                    );
                    failed += 1;
                    last_error = Some(e);
                }
            }
        }

        if failed == active.len() {
            // Every source failed; surface the last error
            return Err(last_error
                .unwrap_or_else(|| SourceError::Network("all sources failed".to_string())));
        }

        let mut deduped = dedup_results(all_results);
        deduped.truncate(max_results);
        Ok(deduped)
    }
}

/// Deduplicate by DOI when present, falling back to lowercased title
pub fn dedup_results(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen_dois = HashSet::new();
    let mut seen_titles = HashSet::new();
    let mut unique = Vec::with_capacity(results.len());

    for result in results {
        if let Some(doi) = &result.doi {
            if !seen_dois.insert(doi.clone()) {
                continue;
            }
        } else if !seen_titles.insert(result.title.to_lowercase()) {
            continue;
        }
        unique.push(result);
    }

    unique
}

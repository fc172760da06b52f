//! Semantic Scholar Graph API client
//!
//! Single-call paper search against `/paper/search` requesting the fields
//! the review pipeline needs. An API key is optional; without one the
//! public rate limits apply.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::models::{PaperSource, SearchResult};
use crate::services::search::{SearchSource, SourceError};

const USER_AGENT: &str = "litrev/0.1.0";
const SEARCH_FIELDS: &str =
    "paperId,title,abstract,authors,year,publicationDate,externalIds,url,openAccessPdf";

#[derive(Debug, Deserialize)]
struct S2SearchResponse {
    #[serde(default)]
    data: Vec<S2Paper>,
}

#[derive(Debug, Deserialize)]
struct S2Paper {
    #[serde(rename = "paperId")]
    paper_id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "abstract", default)]
    abstract_text: Option<String>,
    #[serde(default)]
    authors: Vec<S2Author>,
    #[serde(default)]
    year: Option<i32>,
    #[serde(rename = "publicationDate", default)]
    publication_date: Option<String>,
    #[serde(rename = "externalIds", default)]
    external_ids: Option<S2ExternalIds>,
    #[serde(default)]
    url: Option<String>,
    #[serde(rename = "openAccessPdf", default)]
    open_access_pdf: Option<S2OpenAccessPdf>,
}

#[derive(Debug, Deserialize)]
struct S2Author {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S2ExternalIds {
    #[serde(rename = "DOI", default)]
    doi: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S2OpenAccessPdf {
    #[serde(default)]
    url: Option<String>,
}

/// Semantic Scholar search backend
pub struct SemanticScholarClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl SemanticScholarClient {
    pub fn new(base_url: String, api_key: Option<String>) -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
            api_key,
        })
    }
}

fn paper_to_result(paper: S2Paper) -> SearchResult {
    let publication_date = paper
        .publication_date
        .or_else(|| paper.year.map(|y| y.to_string()));

    SearchResult {
        source: PaperSource::SemanticScholar,
        external_id: paper.paper_id,
        title: paper.title.unwrap_or_else(|| "Untitled".to_string()),
        authors: paper
            .authors
            .into_iter()
            .filter_map(|a| a.name)
            .collect(),
        abstract_text: paper.abstract_text,
        publication_date,
        doi: paper.external_ids.and_then(|ids| ids.doi),
        url: paper.url,
        pdf_url: paper.open_access_pdf.and_then(|pdf| pdf.url),
    }
}

#[async_trait]
impl SearchSource for SemanticScholarClient {
    fn source(&self) -> PaperSource {
        PaperSource::SemanticScholar
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SourceError> {
        let url = format!("{}/paper/search", self.base_url);

        tracing::debug!(url = %url, query = %query, "Querying Semantic Scholar");

        let mut request = self.http_client.get(&url).query(&[
            ("query", query),
            ("limit", &max_results.to_string()),
            ("fields", SEARCH_FIELDS),
        ]);

        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SourceError::Api(status.as_u16(), error_text));
        }

        let parsed: S2SearchResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        let results: Vec<SearchResult> = parsed.data.into_iter().map(paper_to_result).collect();

        tracing::info!(count = results.len(), "Retrieved Semantic Scholar results");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paper_parse() {
        let raw = serde_json::json!({
            "data": [{
                "paperId": "abc123",
                "title": "Deep learning for protein folding",
                "abstract": "We show that...",
                "authors": [{"name": "J. Smith"}, {"name": null}],
                "year": 2023,
                "publicationDate": "2023-05-01",
                "externalIds": {"DOI": "10.1/df", "CorpusId": 99},
                "url": "https://www.semanticscholar.org/paper/abc123",
                "openAccessPdf": {"url": "https://example.org/paper.pdf"}
            }]
        });

        let parsed: S2SearchResponse = serde_json::from_value(raw).unwrap();
        let result = paper_to_result(parsed.data.into_iter().next().unwrap());

        assert_eq!(result.source, PaperSource::SemanticScholar);
        assert_eq!(result.external_id, "abc123");
        assert_eq!(result.authors, vec!["J. Smith"]);
        assert_eq!(result.doi.as_deref(), Some("10.1/df"));
        assert_eq!(result.publication_date.as_deref(), Some("2023-05-01"));
        assert_eq!(result.pdf_url.as_deref(), Some("https://example.org/paper.pdf"));
    }

    #[test]
    fn test_sparse_paper_parse() {
        let raw = serde_json::json!({
            "data": [{"paperId": "only-id"}]
        });

        let parsed: S2SearchResponse = serde_json::from_value(raw).unwrap();
        let result = paper_to_result(parsed.data.into_iter().next().unwrap());

        assert_eq!(result.title, "Untitled");
        assert!(result.abstract_text.is_none());
        assert!(result.doi.is_none());
        assert!(result.publication_date.is_none());
    }
}

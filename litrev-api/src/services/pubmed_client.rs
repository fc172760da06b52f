//! PubMed E-utilities client
//!
//! Two-step search against NCBI eutils: `esearch` resolves a free-text query
//! to PMIDs, `esummary` fetches article metadata for those PMIDs. All calls
//! go through a shared rate limiter (NCBI allows 3 req/sec without an API
//! key).

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::models::{PaperSource, SearchResult};
use crate::services::search::{SearchSource, SourceError};

const USER_AGENT: &str = "litrev/0.1.0";

/// esearch response envelope
#[derive(Debug, Deserialize)]
struct ESearchResponse {
    esearchresult: ESearchResult,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

/// esummary response envelope; `result` maps PMID -> document summary,
/// plus a "uids" key listing the PMIDs in order
#[derive(Debug, Deserialize)]
struct ESummaryResponse {
    result: ESummaryResult,
}

#[derive(Debug, Deserialize)]
struct ESummaryResult {
    #[serde(default)]
    uids: Vec<String>,
    #[serde(flatten)]
    docs: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct DocSummary {
    #[serde(default)]
    title: String,
    #[serde(default)]
    pubdate: String,
    #[serde(default)]
    authors: Vec<DocAuthor>,
    #[serde(default)]
    articleids: Vec<ArticleId>,
}

#[derive(Debug, Deserialize)]
struct DocAuthor {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct ArticleId {
    #[serde(default)]
    idtype: String,
    #[serde(default)]
    value: String,
}

/// Rate limiter serializing requests with a minimum interval
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with rate limit
    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// PubMed search backend
pub struct PubmedClient {
    http_client: reqwest::Client,
    base_url: String,
    rate_limiter: Arc<RateLimiter>,
}

impl PubmedClient {
    pub fn new(base_url: String, rate_limit_ms: u64) -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
            rate_limiter: Arc::new(RateLimiter::new(rate_limit_ms)),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, SourceError> {
        self.rate_limiter.wait().await;

        tracing::debug!(url = %url, "Querying PubMed eutils");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SourceError::Api(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))
    }

    async fn search_ids(&self, query: &str, max_results: usize) -> Result<Vec<String>, SourceError> {
        let url = format!(
            "{}/esearch.fcgi?db=pubmed&term={}&retmax={}&retmode=json&sort=relevance",
            self.base_url,
            urlencode(query),
            max_results
        );

        let response: ESearchResponse = self.get_json(&url).await?;
        Ok(response.esearchresult.idlist)
    }

    async fn fetch_summaries(&self, pmids: &[String]) -> Result<Vec<SearchResult>, SourceError> {
        let url = format!(
            "{}/esummary.fcgi?db=pubmed&id={}&retmode=json",
            self.base_url,
            pmids.join(",")
        );

        let response: ESummaryResponse = self.get_json(&url).await?;

        let mut results = Vec::with_capacity(response.result.uids.len());
        for pmid in &response.result.uids {
            let Some(doc) = response.result.docs.get(pmid) else {
                continue;
            };
            let Ok(summary) = serde_json::from_value::<DocSummary>(doc.clone()) else {
                tracing::warn!(pmid = %pmid, "Skipping unparseable PubMed summary");
                continue;
            };
            results.push(summary_to_result(pmid, summary));
        }

        Ok(results)
    }
}

fn summary_to_result(pmid: &str, summary: DocSummary) -> SearchResult {
    let doi = summary
        .articleids
        .iter()
        .find(|id| id.idtype == "doi")
        .map(|id| id.value.clone());

    SearchResult {
        source: PaperSource::Pubmed,
        external_id: pmid.to_string(),
        title: summary.title,
        authors: summary.authors.into_iter().map(|a| a.name).collect(),
        // esummary carries no abstract; scoring treats it as absent
        abstract_text: None,
        publication_date: if summary.pubdate.is_empty() {
            None
        } else {
            Some(summary.pubdate)
        },
        doi,
        url: Some(format!("https://pubmed.ncbi.nlm.nih.gov/{}/", pmid)),
        pdf_url: None,
    }
}

/// Minimal query-string percent-encoding for eutils term parameters
fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[async_trait]
impl SearchSource for PubmedClient {
    fn source(&self) -> PaperSource {
        PaperSource::Pubmed
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SourceError> {
        let pmids = self.search_ids(query, max_results).await?;
        if pmids.is_empty() {
            return Ok(Vec::new());
        }

        let results = self.fetch_summaries(&pmids).await?;

        tracing::info!(count = results.len(), "Retrieved PubMed results");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new(340);
        assert_eq!(limiter.min_interval, Duration::from_millis(340));
    }

    #[tokio::test]
    async fn test_rate_limiter_timing() {
        let limiter = RateLimiter::new(100);

        let start = Instant::now();
        limiter.wait().await;
        limiter.wait().await;

        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn test_urlencode() {
        assert_eq!(urlencode("machine learning"), "machine+learning");
        assert_eq!(urlencode("CRISPR/Cas9"), "CRISPR%2FCas9");
    }

    #[test]
    fn test_esummary_parse() {
        let raw = serde_json::json!({
            "result": {
                "uids": ["12345"],
                "12345": {
                    "title": "A study of things",
                    "pubdate": "2024 Jan",
                    "authors": [{"name": "Smith J"}, {"name": "Doe A"}],
                    "articleids": [
                        {"idtype": "pubmed", "value": "12345"},
                        {"idtype": "doi", "value": "10.1000/xyz"}
                    ]
                }
            }
        });

        let parsed: ESummaryResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.result.uids, vec!["12345"]);

        let doc = parsed.result.docs.get("12345").unwrap();
        let summary: DocSummary = serde_json::from_value(doc.clone()).unwrap();
        let result = summary_to_result("12345", summary);

        assert_eq!(result.title, "A study of things");
        assert_eq!(result.authors, vec!["Smith J", "Doe A"]);
        assert_eq!(result.doi.as_deref(), Some("10.1000/xyz"));
        assert_eq!(result.publication_date.as_deref(), Some("2024 Jan"));
        assert!(result.url.as_deref().unwrap().contains("12345"));
    }
}

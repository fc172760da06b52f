//! Paper records and transient search results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bibliographic source a paper came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperSource {
    Pubmed,
    SemanticScholar,
}

impl PaperSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaperSource::Pubmed => "pubmed",
            PaperSource::SemanticScholar => "semantic_scholar",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pubmed" => Some(PaperSource::Pubmed),
            "semantic_scholar" => Some(PaperSource::SemanticScholar),
            _ => None,
        }
    }
}

/// A search hit not yet attached to a review session.
///
/// Carries no identifier, score or findings; those exist only once the
/// result is persisted as a [`Paper`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub source: PaperSource,
    pub external_id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub publication_date: Option<String>,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub pdf_url: Option<String>,
}

/// A bibliographic record owned by a review session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    pub id: Uuid,
    pub review_id: Uuid,
    pub source: PaperSource,
    pub external_id: String,
    pub title: String,
    pub authors: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub publication_date: Option<String>,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub pdf_url: Option<String>,
    /// Normalized relevance in [0, 1]; None until scored
    pub relevance_score: Option<f64>,
    pub relevance_explanation: Option<String>,
    pub key_findings: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Paper {
    /// Attach a search result to a session as a score-less paper
    pub fn from_result(review_id: Uuid, result: &SearchResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            review_id,
            source: result.source,
            external_id: result.external_id.clone(),
            title: result.title.clone(),
            authors: result.authors.clone(),
            abstract_text: result.abstract_text.clone(),
            publication_date: result.publication_date.clone(),
            doi: result.doi.clone(),
            url: result.url.clone(),
            pdf_url: result.pdf_url.clone(),
            relevance_score: None,
            relevance_explanation: None,
            key_findings: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_string_round_trip() {
        assert_eq!(PaperSource::parse("pubmed"), Some(PaperSource::Pubmed));
        assert_eq!(
            PaperSource::parse("semantic_scholar"),
            Some(PaperSource::SemanticScholar)
        );
        assert_eq!(PaperSource::parse("arxiv"), None);
    }

    #[test]
    fn attached_paper_starts_unscored() {
        let result = SearchResult {
            source: PaperSource::Pubmed,
            external_id: "12345".to_string(),
            title: "A study".to_string(),
            authors: vec!["Doe J".to_string()],
            abstract_text: None,
            publication_date: None,
            doi: None,
            url: None,
            pdf_url: None,
        };

        let paper = Paper::from_result(Uuid::new_v4(), &result);
        assert!(paper.relevance_score.is_none());
        assert!(paper.relevance_explanation.is_none());
        assert!(paper.key_findings.is_empty());
    }

    #[test]
    fn abstract_serializes_under_its_api_name() {
        let result = SearchResult {
            source: PaperSource::SemanticScholar,
            external_id: "abc".to_string(),
            title: "T".to_string(),
            authors: vec![],
            abstract_text: Some("body".to_string()),
            publication_date: None,
            doi: None,
            url: None,
            pdf_url: None,
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"abstract\":\"body\""));
    }
}

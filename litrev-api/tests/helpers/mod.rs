//! Shared test helpers: in-memory database and stubbed pipeline providers

// Not every test binary uses every helper
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;

use litrev_api::models::{InsightDraft, InsightType, Paper, PaperSource, SearchResult};
use litrev_api::services::{
    ComposeInput, InsightSynthesizer, LanguageModel, LlmError, RelevanceScorer,
    RelevanceAssessment, ReviewComposer, SearchService, SearchSource, SourceError, TokenStream,
};
use litrev_api::AppState;
use litrev_common::EventBus;

/// In-memory database with the schema applied.
///
/// A single connection is required: each new in-memory SQLite connection
/// would otherwise open its own empty database.
pub async fn test_pool() -> sqlx::SqlitePool {
    use std::str::FromStr;

    let options = sqlx::sqlite::SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("Invalid connection string")
        .foreign_keys(true);
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("Failed to create in-memory database");

    litrev_api::db::schema::init_schema(&pool)
        .await
        .expect("Failed to initialize schema");

    pool
}

pub fn search_result(source: PaperSource, id: &str, title: &str) -> SearchResult {
    SearchResult {
        source,
        external_id: id.to_string(),
        title: title.to_string(),
        authors: vec!["Test Author".to_string()],
        abstract_text: Some(format!("Abstract of {}", title)),
        publication_date: Some("2024".to_string()),
        doi: None,
        url: None,
        pdf_url: None,
    }
}

/// Search source returning canned results, or failing outright
pub struct FixedSource {
    pub source: PaperSource,
    pub results: Vec<SearchResult>,
    pub fail: bool,
}

#[async_trait]
impl SearchSource for FixedSource {
    fn source(&self) -> PaperSource {
        self.source
    }

    async fn search(
        &self,
        _query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SourceError> {
        if self.fail {
            return Err(SourceError::Network("connection refused".to_string()));
        }
        Ok(self.results.iter().take(max_results).cloned().collect())
    }
}

/// Scorer giving every paper a fixed score, except titles configured to fail
pub struct StubScorer {
    pub score: f64,
    pub fail_titles: Vec<String>,
}

impl StubScorer {
    pub fn scoring_all(score: f64) -> Self {
        Self {
            score,
            fail_titles: vec![],
        }
    }
}

#[async_trait]
impl RelevanceScorer for StubScorer {
    async fn assess(
        &self,
        _research_question: &str,
        _domain: &str,
        paper: &Paper,
    ) -> Result<RelevanceAssessment, LlmError> {
        if self.fail_titles.contains(&paper.title) {
            return Err(LlmError::Api(503, "model overloaded".to_string()));
        }
        Ok(RelevanceAssessment {
            score: self.score,
            explanation: format!("\"{}\" addresses the question.", paper.title),
            key_aspects: vec![],
            key_findings: vec![format!("Finding from {}", paper.title)],
        })
    }
}

/// Synthesizer producing one theme and one conclusion for a non-empty corpus
pub struct StubSynthesizer;

#[async_trait]
impl InsightSynthesizer for StubSynthesizer {
    async fn synthesize(
        &self,
        _research_question: &str,
        _domain: &str,
        papers: &[Paper],
    ) -> Result<Vec<InsightDraft>, LlmError> {
        if papers.is_empty() {
            return Ok(vec![InsightDraft::new(
                InsightType::Conclusion,
                "Insufficient evidence.",
            )]);
        }
        Ok(vec![
            InsightDraft::new(
                InsightType::Theme,
                format!("A theme across {} papers.", papers.len()),
            ),
            InsightDraft::new(InsightType::Conclusion, "The evidence supports X."),
        ])
    }
}

/// Synthesizer that always fails, for run-fatal paths
pub struct FailingSynthesizer;

#[async_trait]
impl InsightSynthesizer for FailingSynthesizer {
    async fn synthesize(
        &self,
        _research_question: &str,
        _domain: &str,
        _papers: &[Paper],
    ) -> Result<Vec<InsightDraft>, LlmError> {
        Err(LlmError::Network("synthesis backend down".to_string()))
    }
}

/// Composer emitting a deterministic review, atomically or in fragments
pub struct StubComposer {
    pub text: String,
    pub fail: bool,
}

impl StubComposer {
    pub fn with_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            text: String::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl ReviewComposer for StubComposer {
    async fn compose(&self, _input: &ComposeInput<'_>) -> Result<String, LlmError> {
        if self.fail {
            return Err(LlmError::Api(503, "model overloaded".to_string()));
        }
        Ok(self.text.clone())
    }

    async fn compose_stream(&self, _input: &ComposeInput<'_>) -> Result<TokenStream, LlmError> {
        if self.fail {
            return Err(LlmError::Api(503, "model overloaded".to_string()));
        }
        let chars: Vec<char> = self.text.chars().collect();
        let fragments: Vec<Result<String, LlmError>> = chars
            .chunks(7)
            .map(|chunk| Ok(chunk.iter().collect()))
            .collect();
        Ok(Box::pin(futures::stream::iter(fragments)))
    }
}

/// Language model stub usable wherever the real client would be
pub struct FixedModel {
    pub response: String,
}

#[async_trait]
impl LanguageModel for FixedModel {
    async fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String, LlmError> {
        Ok(self.response.clone())
    }

    async fn complete_stream(
        &self,
        _prompt: &str,
        _max_tokens: u32,
    ) -> Result<TokenStream, LlmError> {
        let chars: Vec<char> = self.response.chars().collect();
        let chunks: Vec<Result<String, LlmError>> = chars
            .chunks(5)
            .map(|chunk| Ok(chunk.iter().collect()))
            .collect();
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

pub struct StateBuilder {
    pub pool: sqlx::SqlitePool,
    pub sources: Vec<Arc<dyn SearchSource>>,
    pub scorer: Arc<dyn RelevanceScorer>,
    pub synthesizer: Arc<dyn InsightSynthesizer>,
    pub composer: Arc<dyn ReviewComposer>,
}

impl StateBuilder {
    /// Three papers from one source, everything scoring 0.8
    pub async fn happy_path() -> Self {
        Self {
            pool: test_pool().await,
            sources: vec![Arc::new(FixedSource {
                source: PaperSource::Pubmed,
                results: vec![
                    search_result(PaperSource::Pubmed, "1", "Paper A"),
                    search_result(PaperSource::Pubmed, "2", "Paper B"),
                    search_result(PaperSource::Pubmed, "3", "Paper C"),
                ],
                fail: false,
            })],
            scorer: Arc::new(StubScorer::scoring_all(0.8)),
            synthesizer: Arc::new(StubSynthesizer),
            composer: Arc::new(StubComposer::with_text("# Review\n\nBody.")),
        }
    }

    pub fn with_sources(mut self, sources: Vec<Arc<dyn SearchSource>>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn RelevanceScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn InsightSynthesizer>) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn with_composer(mut self, composer: Arc<dyn ReviewComposer>) -> Self {
        self.composer = composer;
        self
    }

    pub fn build(self) -> AppState {
        AppState::with_providers(
            self.pool,
            EventBus::new(100),
            Arc::new(SearchService::new(self.sources)),
            self.scorer,
            self.synthesizer,
            self.composer,
        )
    }
}

//! Final review composition
//!
//! Turns the accumulated papers and insights into prose: a structured
//! literature review in Markdown. The atomic and streaming variants build
//! the identical prompt, so a streamed review concatenates to the same
//! text an atomic call would have produced for the same model output.

use async_trait::async_trait;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::models::{Insight, Paper, ReviewSession};
use crate::services::llm_client::{LanguageModel, LlmError, TokenStream};

const COMPOSE_MAX_TOKENS: u32 = 4000;

/// Everything the composer needs, gathered by the caller
pub struct ComposeInput<'a> {
    pub review: &'a ReviewSession,
    /// Relevant papers only
    pub papers: &'a [Paper],
    pub insights: &'a [Insight],
}

/// Produces the final review text
#[async_trait]
pub trait ReviewComposer: Send + Sync {
    /// Compose the full review in one call
    async fn compose(&self, input: &ComposeInput<'_>) -> Result<String, LlmError>;

    /// Compose the review as a stream of text fragments
    async fn compose_stream(&self, input: &ComposeInput<'_>) -> Result<TokenStream, LlmError>;
}

/// Model-backed composer
pub struct LlmComposer {
    model: Arc<dyn LanguageModel>,
}

impl LlmComposer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

fn compose_prompt(input: &ComposeInput<'_>) -> String {
    let mut sources = String::new();
    for (i, paper) in input.papers.iter().enumerate() {
        let _ = writeln!(sources, "[{}] {} ({})", i + 1, paper.title, paper.source.as_str());
        if !paper.authors.is_empty() {
            let _ = writeln!(sources, "    Authors: {}", paper.authors.join(", "));
        }
        if let Some(score) = paper.relevance_score {
            let _ = writeln!(sources, "    Relevance: {:.2}", score);
        }
        if !paper.key_findings.is_empty() {
            let _ = writeln!(sources, "    Findings: {}", paper.key_findings.join("; "));
        }
    }

    let mut analysis = String::new();
    for insight in input.insights {
        let _ = writeln!(
            analysis,
            "- [{}] {}",
            insight.insight_type.as_str(),
            insight.content
        );
    }

    format!(
        "Write a literature review in Markdown.\n\n\
         Title: {}\n\
         Domain: {}\n\
         Research question: {}\n\n\
         Sources:\n{}\n\
         Analysis insights:\n{}\n\
         Structure the review with these sections: Introduction, \
         Methodology, Findings, Discussion, Conclusion, References. Cite \
         sources by their bracketed numbers. Ground every claim in the \
         sources and insights above; do not invent citations.",
        input.review.title,
        input.review.domain_or_default(),
        input.review.question(),
        sources,
        analysis
    )
}

#[async_trait]
impl ReviewComposer for LlmComposer {
    async fn compose(&self, input: &ComposeInput<'_>) -> Result<String, LlmError> {
        let prompt = compose_prompt(input);
        self.model.complete(&prompt, COMPOSE_MAX_TOKENS).await
    }

    async fn compose_stream(&self, input: &ComposeInput<'_>) -> Result<TokenStream, LlmError> {
        let prompt = compose_prompt(input);
        self.model.complete_stream(&prompt, COMPOSE_MAX_TOKENS).await
    }
}

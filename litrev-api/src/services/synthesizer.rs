//! Cross-paper insight synthesis
//!
//! Takes the relevant, scored papers and asks the model for a structured
//! cross-paper analysis: connections between papers, recurring themes,
//! research gaps, contradictions, and a concluding judgement. The
//! synthesizer always produces at least a conclusion, even when the model
//! omits one or when no relevant papers exist.

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::warn;

use crate::models::{InsightDraft, InsightType, Paper};
use crate::services::llm_client::{strip_code_fences, LanguageModel, LlmError};

const SYNTHESIS_MAX_TOKENS: u32 = 2000;

/// Produces ordered insight drafts from the scored corpus
#[async_trait]
pub trait InsightSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        research_question: &str,
        domain: &str,
        papers: &[Paper],
    ) -> Result<Vec<InsightDraft>, LlmError>;
}

#[derive(Debug, Deserialize)]
struct SynthesisResponse {
    #[serde(default)]
    connections: Vec<ConnectionItem>,
    #[serde(default)]
    themes: Vec<String>,
    #[serde(default)]
    gaps: Vec<String>,
    #[serde(default)]
    contradictions: Vec<String>,
    #[serde(default)]
    conclusion: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConnectionItem {
    #[serde(default)]
    description: String,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Model-backed synthesizer
pub struct LlmSynthesizer {
    model: Arc<dyn LanguageModel>,
}

impl LlmSynthesizer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    fn synthesis_prompt(research_question: &str, domain: &str, papers: &[Paper]) -> String {
        let mut corpus = String::new();
        for (i, paper) in papers.iter().enumerate() {
            let _ = writeln!(corpus, "Paper {}: {}", i + 1, paper.title);
            if let Some(score) = paper.relevance_score {
                let _ = writeln!(corpus, "Relevance: {:.2}", score);
            }
            if !paper.key_findings.is_empty() {
                let _ = writeln!(corpus, "Key findings: {}", paper.key_findings.join("; "));
            }
            if let Some(abstract_text) = &paper.abstract_text {
                let _ = writeln!(corpus, "Abstract: {}", abstract_text);
            }
            corpus.push('\n');
        }

        format!(
            "Perform a cross-paper analysis of the following papers with \
             respect to the research question.\n\n\
             Research question: {}\n\
             Domain: {}\n\n\
             {}\
             Respond with JSON only, in this exact shape:\n\
             {{\"connections\": [{{\"description\": \"...\", \"reasoning\": \"...\"}}],\n \
             \"themes\": [\"...\"],\n \
             \"gaps\": [\"...\"],\n \
             \"contradictions\": [\"...\"],\n \
             \"conclusion\": \"...\"}}\n\
             Every list may be empty, but \"conclusion\" is required: one \
             paragraph answering the research question from the evidence \
             above, noting its strength.",
            research_question, domain, corpus
        )
    }

    fn insufficient_evidence_conclusion(research_question: &str) -> InsightDraft {
        InsightDraft::new(
            InsightType::Conclusion,
            format!(
                "No relevant papers were found for the research question \
                 \"{}\". The available evidence is insufficient to draw \
                 conclusions; broadening the search terms or sources may help.",
                research_question
            ),
        )
    }
}

fn response_to_drafts(response: SynthesisResponse, research_question: &str) -> Vec<InsightDraft> {
    let mut drafts = Vec::new();

    for connection in response.connections {
        if connection.description.is_empty() {
            continue;
        }
        let mut draft = InsightDraft::new(InsightType::Connection, connection.description);
        if let Some(reasoning) = connection.reasoning {
            draft = draft.with_reasoning(reasoning);
        }
        drafts.push(draft);
    }

    for theme in response.themes {
        drafts.push(InsightDraft::new(InsightType::Theme, theme));
    }
    for gap in response.gaps {
        drafts.push(InsightDraft::new(InsightType::Gap, gap));
    }
    for contradiction in response.contradictions {
        drafts.push(InsightDraft::new(InsightType::Contradiction, contradiction));
    }

    // The conclusion always comes last; backfill when the model left it out
    let conclusion = match response.conclusion {
        Some(text) if !text.trim().is_empty() => text,
        _ => format!(
            "The analyzed papers offer partial evidence on \"{}\", but the \
             model did not produce a definitive conclusion; the individual \
             insights above should be weighed directly.",
            research_question
        ),
    };
    drafts.push(InsightDraft::new(InsightType::Conclusion, conclusion));

    drafts
}

#[async_trait]
impl InsightSynthesizer for LlmSynthesizer {
    async fn synthesize(
        &self,
        research_question: &str,
        domain: &str,
        papers: &[Paper],
    ) -> Result<Vec<InsightDraft>, LlmError> {
        if papers.is_empty() {
            // Nothing to analyze: a deterministic conclusion, no model call
            return Ok(vec![Self::insufficient_evidence_conclusion(
                research_question,
            )]);
        }

        let prompt = Self::synthesis_prompt(research_question, domain, papers);
        let raw = self.model.complete(&prompt, SYNTHESIS_MAX_TOKENS).await?;

        let response = match serde_json::from_str::<SynthesisResponse>(strip_code_fences(&raw)) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Unparseable synthesis response; emitting fallback conclusion");
                SynthesisResponse {
                    connections: vec![],
                    themes: vec![],
                    gaps: vec![],
                    contradictions: vec![],
                    conclusion: None,
                }
            }
        };

        Ok(response_to_drafts(response, research_question))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PaperSource, SearchResult};
    use crate::services::llm_client::TokenStream;
    use uuid::Uuid;

    struct FixedModel {
        response: String,
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
            Err(LlmError::Api(500, "not used".to_string()))
        }
    }

    /// Panics if called; proves the empty-corpus path skips the model
    struct PanicModel;

    #[async_trait]
    impl LanguageModel for PanicModel {
        async fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String, LlmError> {
            panic!("model must not be called for an empty corpus");
        }

        async fn complete_stream(
            &self,
            _prompt: &str,
            _max_tokens: u32,
        ) -> Result<TokenStream, LlmError> {
            panic!("model must not be called for an empty corpus");
        }
    }

    fn paper(title: &str) -> Paper {
        let mut p = Paper::from_result(
            Uuid::new_v4(),
            &SearchResult {
                source: PaperSource::Pubmed,
                external_id: title.to_string(),
                title: title.to_string(),
                authors: vec![],
                abstract_text: Some("Abstract.".to_string()),
                publication_date: None,
                doi: None,
                url: None,
                pdf_url: None,
            },
        );
        p.relevance_score = Some(0.8);
        p
    }

    #[tokio::test]
    async fn empty_corpus_yields_single_conclusion_without_model_call() {
        let synthesizer = LlmSynthesizer::new(Arc::new(PanicModel));
        let drafts = synthesizer.synthesize("Does X cause Y?", "general", &[]).await.unwrap();

        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].insight_type, InsightType::Conclusion);
        assert!(drafts[0].content.contains("insufficient"));
    }

    #[tokio::test]
    async fn drafts_are_ordered_with_conclusion_last() {
        let synthesizer = LlmSynthesizer::new(Arc::new(FixedModel {
            response: r#"{
                "connections": [{"description": "A builds on B", "reasoning": "Shared method"}],
                "themes": ["Theme one", "Theme two"],
                "gaps": ["No longitudinal data"],
                "contradictions": ["A and C disagree"],
                "conclusion": "The evidence supports X."
            }"#
            .to_string(),
        }));

        let drafts = synthesizer
            .synthesize("Q?", "general", &[paper("A"), paper("B")])
            .await
            .unwrap();

        let types: Vec<InsightType> = drafts.iter().map(|d| d.insight_type).collect();
        assert_eq!(
            types,
            vec![
                InsightType::Connection,
                InsightType::Theme,
                InsightType::Theme,
                InsightType::Gap,
                InsightType::Contradiction,
                InsightType::Conclusion,
            ]
        );
        assert_eq!(drafts[0].reasoning.as_deref(), Some("Shared method"));
        assert_eq!(drafts.last().unwrap().content, "The evidence supports X.");
    }

    #[test]
    fn prompt_carries_the_session_domain() {
        let prompt = LlmSynthesizer::synthesis_prompt("Q?", "cardiology", &[paper("A")]);
        assert!(prompt.contains("Domain: cardiology"));
    }

    #[tokio::test]
    async fn missing_conclusion_is_backfilled() {
        let synthesizer = LlmSynthesizer::new(Arc::new(FixedModel {
            response: r#"{"themes": ["Only a theme"]}"#.to_string(),
        }));

        let drafts = synthesizer.synthesize("Q?", "general", &[paper("A")]).await.unwrap();

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[1].insight_type, InsightType::Conclusion);
        assert!(!drafts[1].content.is_empty());
    }

    #[tokio::test]
    async fn unparseable_response_still_concludes() {
        let synthesizer = LlmSynthesizer::new(Arc::new(FixedModel {
            response: "not json at all".to_string(),
        }));

        let drafts = synthesizer.synthesize("Q?", "general", &[paper("A")]).await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].insight_type, InsightType::Conclusion);
    }
}

//! Paper relevance scoring
//!
//! Asks the language model to rate each paper against the research question
//! and, for papers clearing the relevance threshold, to extract their key
//! findings. The model's JSON is treated as untrusted: scores are clamped
//! to [0.0, 1.0] and a missing or unparseable score becomes 0.0 with an
//! explanatory note rather than an error.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::Paper;
use crate::services::llm_client::{strip_code_fences, LanguageModel, LlmError};

/// Papers scoring at or above this are considered relevant
pub const RELEVANCE_THRESHOLD: f64 = 0.5;

const SCORE_MAX_TOKENS: u32 = 500;
const FINDINGS_MAX_TOKENS: u32 = 800;

/// Outcome of scoring one paper
#[derive(Debug, Clone)]
pub struct RelevanceAssessment {
    /// Always within [0.0, 1.0]
    pub score: f64,
    pub explanation: String,
    /// Aspects of the paper the model weighed when scoring
    pub key_aspects: Vec<String>,
    /// Empty for papers below the relevance threshold
    pub key_findings: Vec<String>,
}

/// Scores one paper against a research question
#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    async fn assess(
        &self,
        research_question: &str,
        domain: &str,
        paper: &Paper,
    ) -> Result<RelevanceAssessment, LlmError>;
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    relevance_score: Option<serde_json::Value>,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    key_aspects: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FindingsResponse {
    #[serde(default)]
    key_findings: Vec<serde_json::Value>,
}

impl FindingsResponse {
    /// Models return findings as plain strings or as objects with a
    /// `finding` field; accept both
    fn into_findings(self) -> Vec<String> {
        self.key_findings
            .into_iter()
            .filter_map(|value| match value {
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Object(map) => map
                    .get("finding")
                    .and_then(|f| f.as_str())
                    .map(String::from),
                _ => None,
            })
            .collect()
    }
}

/// Model-backed scorer
pub struct LlmScorer {
    model: Arc<dyn LanguageModel>,
}

impl LlmScorer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    fn relevance_prompt(research_question: &str, domain: &str, paper: &Paper) -> String {
        format!(
            "Assess the relevance of this paper to the research question.\n\n\
             Research question: {}\n\
             Domain: {}\n\n\
             Paper title: {}\n\
             Abstract: {}\n\n\
             Respond with JSON only, in this exact shape:\n\
             {{\"relevance_score\": <number between 0.0 and 1.0>, \
             \"explanation\": \"<one or two sentences>\", \
             \"key_aspects\": [\"<aspect of the paper you weighed>\", ...]}}",
            research_question,
            domain,
            paper.title,
            paper
                .abstract_text
                .as_deref()
                .unwrap_or("(no abstract available)")
        )
    }

    fn findings_prompt(research_question: &str, domain: &str, paper: &Paper) -> String {
        format!(
            "Extract the key findings from this paper that bear on the \
             research question.\n\n\
             Research question: {}\n\
             Domain: {}\n\n\
             Paper title: {}\n\
             Abstract: {}\n\n\
             Respond with JSON only, in this exact shape:\n\
             {{\"key_findings\": [\"<finding>\", ...]}}\n\
             List at most 5 findings. If the abstract supports no findings, \
             return an empty list.",
            research_question,
            domain,
            paper.title,
            paper
                .abstract_text
                .as_deref()
                .unwrap_or("(no abstract available)")
        )
    }
}

/// Normalize a raw model score into [0.0, 1.0], annotating `explanation`
/// when the value had to be repaired
fn normalize_score(raw: Option<serde_json::Value>, explanation: &mut String) -> f64 {
    let Some(value) = raw else {
        push_note(explanation, "Score missing from model response; treated as 0.0.");
        return 0.0;
    };

    let parsed = match &value {
        serde_json::Value::Number(n) => n.as_f64(),
        // Tolerate models that quote the number
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(score) if score.is_finite() => {
            if !(0.0..=1.0).contains(&score) {
                push_note(explanation, "Score was out of range and has been clamped.");
            }
            score.clamp(0.0, 1.0)
        }
        _ => {
            push_note(explanation, "Score was not numeric; treated as 0.0.");
            0.0
        }
    }
}

fn push_note(explanation: &mut String, note: &str) {
    if !explanation.is_empty() {
        explanation.push(' ');
    }
    explanation.push_str(note);
}

#[async_trait]
impl RelevanceScorer for LlmScorer {
    async fn assess(
        &self,
        research_question: &str,
        domain: &str,
        paper: &Paper,
    ) -> Result<RelevanceAssessment, LlmError> {
        let prompt = Self::relevance_prompt(research_question, domain, paper);
        let raw = self.model.complete(&prompt, SCORE_MAX_TOKENS).await?;

        let body = strip_code_fences(&raw);
        let (raw_score, mut explanation, key_aspects) =
            match serde_json::from_str::<ScoreResponse>(body) {
                Ok(parsed) => (
                    parsed.relevance_score,
                    parsed.explanation.unwrap_or_default(),
                    parsed.key_aspects,
                ),
                Err(e) => {
                    warn!(paper_id = %paper.id, error = %e, "Unparseable relevance response");
                    (None, String::new(), Vec::new())
                }
            };

        let score = normalize_score(raw_score, &mut explanation);
        debug!(paper_id = %paper.id, score, "Scored paper");

        // Findings extraction only pays off for relevant papers
        let key_findings = if score >= RELEVANCE_THRESHOLD {
            let prompt = Self::findings_prompt(research_question, domain, paper);
            let raw = self.model.complete(&prompt, FINDINGS_MAX_TOKENS).await?;
            match serde_json::from_str::<FindingsResponse>(strip_code_fences(&raw)) {
                Ok(parsed) => parsed.into_findings(),
                Err(e) => {
                    warn!(paper_id = %paper.id, error = %e, "Unparseable findings response");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        Ok(RelevanceAssessment {
            score,
            explanation,
            key_aspects,
            key_findings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PaperSource, SearchResult};
    use crate::services::llm_client::TokenStream;
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Returns canned responses in sequence
    struct ScriptedModel {
        responses: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().rev().map(String::from).collect()),
            }
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String, LlmError> {
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| LlmError::Api(500, "no scripted response".to_string()))
        }

        async fn complete_stream(
            &self,
            _prompt: &str,
            _max_tokens: u32,
        ) -> Result<TokenStream, LlmError> {
            Err(LlmError::Api(500, "streaming not scripted".to_string()))
        }
    }

    fn test_paper() -> Paper {
        Paper::from_result(
            Uuid::new_v4(),
            &SearchResult {
                source: PaperSource::Pubmed,
                external_id: "1".to_string(),
                title: "Test paper".to_string(),
                authors: vec!["A".to_string()],
                abstract_text: Some("An abstract.".to_string()),
                publication_date: None,
                doi: None,
                url: None,
                pdf_url: None,
            },
        )
    }

    #[tokio::test]
    async fn out_of_range_score_is_clamped() {
        let model = Arc::new(ScriptedModel::new(vec![
            r#"{"relevance_score": 1.7, "explanation": "Very relevant."}"#,
            r#"{"key_findings": ["Finding one"]}"#,
        ]));
        let scorer = LlmScorer::new(model);

        let assessment = scorer.assess("Q?", "general", &test_paper()).await.unwrap();
        assert_eq!(assessment.score, 1.0);
        assert!(assessment.explanation.contains("clamped"));
        assert_eq!(assessment.key_findings, vec!["Finding one"]);
    }

    #[tokio::test]
    async fn missing_score_becomes_zero() {
        let model = Arc::new(ScriptedModel::new(vec![
            r#"{"explanation": "Cannot judge."}"#,
        ]));
        let scorer = LlmScorer::new(model);

        let assessment = scorer.assess("Q?", "general", &test_paper()).await.unwrap();
        assert_eq!(assessment.score, 0.0);
        assert!(assessment.explanation.contains("missing"));
        assert!(assessment.key_findings.is_empty());
    }

    #[tokio::test]
    async fn quoted_score_is_parsed() {
        let model = Arc::new(ScriptedModel::new(vec![
            r#"{"relevance_score": "0.8", "explanation": "Good match."}"#,
            r#"{"key_findings": []}"#,
        ]));
        let scorer = LlmScorer::new(model);

        let assessment = scorer.assess("Q?", "general", &test_paper()).await.unwrap();
        assert_eq!(assessment.score, 0.8);
        assert_eq!(assessment.explanation, "Good match.");
    }

    #[tokio::test]
    async fn fenced_response_is_tolerated() {
        let model = Arc::new(ScriptedModel::new(vec![
            "```json\n{\"relevance_score\": 0.3, \"explanation\": \"Marginal.\"}\n```",
        ]));
        let scorer = LlmScorer::new(model);

        let assessment = scorer.assess("Q?", "general", &test_paper()).await.unwrap();
        assert_eq!(assessment.score, 0.3);
        // Below threshold, so no findings call was made
        assert!(assessment.key_findings.is_empty());
    }

    #[tokio::test]
    async fn structured_findings_are_flattened() {
        let model = Arc::new(ScriptedModel::new(vec![
            r#"{"relevance_score": 0.9, "explanation": "Strong match."}"#,
            r#"{"key_findings": [{"finding": "X improves Y", "evidence": "RCT"}, "Plain finding"]}"#,
        ]));
        let scorer = LlmScorer::new(model);

        let assessment = scorer.assess("Q?", "general", &test_paper()).await.unwrap();
        assert_eq!(
            assessment.key_findings,
            vec!["X improves Y", "Plain finding"]
        );
    }

    #[tokio::test]
    async fn key_aspects_are_captured() {
        let model = Arc::new(ScriptedModel::new(vec![
            r#"{"relevance_score": 0.9, "explanation": "Directly on topic.",
                "key_aspects": ["Study design", "Sample size"]}"#,
            r#"{"key_findings": ["Finding one"]}"#,
        ]));
        let scorer = LlmScorer::new(model);

        let assessment = scorer.assess("Q?", "general", &test_paper()).await.unwrap();
        assert_eq!(assessment.key_aspects, vec!["Study design", "Sample size"]);
    }

    #[test]
    fn prompts_carry_the_session_domain() {
        let paper = test_paper();
        let relevance = LlmScorer::relevance_prompt("Q?", "oncology", &paper);
        assert!(relevance.contains("Domain: oncology"));
        assert!(relevance.contains("key_aspects"));

        let findings = LlmScorer::findings_prompt("Q?", "oncology", &paper);
        assert!(findings.contains("Domain: oncology"));
    }

    #[tokio::test]
    async fn garbage_response_scores_zero() {
        let model = Arc::new(ScriptedModel::new(vec!["I think this paper is great!"]));
        let scorer = LlmScorer::new(model);

        let assessment = scorer.assess("Q?", "general", &test_paper()).await.unwrap();
        assert_eq!(assessment.score, 0.0);
    }
}

//! Business logic services

pub mod analysis_orchestrator;
pub mod composer;
pub mod llm_client;
pub mod pubmed_client;
pub mod scorer;
pub mod search;
pub mod semantic_scholar_client;
pub mod synthesizer;

pub use analysis_orchestrator::{AnalysisOrchestrator, AnalysisParams};
pub use composer::{ComposeInput, LlmComposer, ReviewComposer};
pub use llm_client::{LanguageModel, LlmError, OpenAiClient, TokenStream};
pub use pubmed_client::PubmedClient;
pub use scorer::{LlmScorer, RelevanceAssessment, RelevanceScorer, RELEVANCE_THRESHOLD};
pub use search::{SearchService, SearchSource, SourceError};
pub use semantic_scholar_client::SemanticScholarClient;
pub use synthesizer::{InsightSynthesizer, LlmSynthesizer};

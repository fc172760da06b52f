//! litrev-api library interface
//!
//! Exposes the application state, router, and service wiring for both the
//! binary and the integration tests.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use litrev_common::{EventBus, Settings};

use crate::services::{
    AnalysisOrchestrator, InsightSynthesizer, LlmComposer, LlmScorer, LlmSynthesizer,
    OpenAiClient, PubmedClient, RelevanceScorer, ReviewComposer, SearchService,
    SemanticScholarClient,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Aggregated bibliographic search
    pub search: Arc<SearchService>,
    /// Paper relevance scoring
    pub scorer: Arc<dyn RelevanceScorer>,
    /// Cross-paper insight synthesis
    pub synthesizer: Arc<dyn InsightSynthesizer>,
    /// Final review composition
    pub composer: Arc<dyn ReviewComposer>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Wire the production providers from settings
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        settings: &Settings,
    ) -> Result<Self, litrev_common::Error> {
        let model = Arc::new(
            OpenAiClient::new(
                &settings.llm_base_url,
                &settings.llm_api_key,
                &settings.llm_model,
            )
            .map_err(|e| litrev_common::Error::Config(e.to_string()))?,
        );

        let pubmed = PubmedClient::new(
            settings.pubmed_base_url.clone(),
            settings.pubmed_rate_limit_ms,
        )
        .map_err(|e| litrev_common::Error::Config(e.to_string()))?;
        let semantic_scholar = SemanticScholarClient::new(
            settings.semantic_scholar_base_url.clone(),
            settings.semantic_scholar_api_key.clone(),
        )
        .map_err(|e| litrev_common::Error::Config(e.to_string()))?;

        let search = Arc::new(SearchService::new(vec![
            Arc::new(pubmed),
            Arc::new(semantic_scholar),
        ]));

        Ok(Self {
            db,
            event_bus,
            search,
            scorer: Arc::new(LlmScorer::new(model.clone())),
            synthesizer: Arc::new(LlmSynthesizer::new(model.clone())),
            composer: Arc::new(LlmComposer::new(model)),
            startup_time: Utc::now(),
        })
    }

    /// Assemble state from explicit providers, used by tests to stub the
    /// model-backed services
    pub fn with_providers(
        db: SqlitePool,
        event_bus: EventBus,
        search: Arc<SearchService>,
        scorer: Arc<dyn RelevanceScorer>,
        synthesizer: Arc<dyn InsightSynthesizer>,
        composer: Arc<dyn ReviewComposer>,
    ) -> Self {
        Self {
            db,
            event_bus,
            search,
            scorer,
            synthesizer,
            composer,
            startup_time: Utc::now(),
        }
    }

    /// Orchestrator over this state's providers
    pub fn orchestrator(&self) -> Arc<AnalysisOrchestrator> {
        Arc::new(AnalysisOrchestrator::new(
            self.db.clone(),
            self.event_bus.clone(),
            self.search.clone(),
            self.scorer.clone(),
            self.synthesizer.clone(),
        ))
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::review_routes())
        .merge(api::paper_routes())
        .merge(api::analysis_routes())
        .merge(api::sse_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

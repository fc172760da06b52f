//! Analysis pipeline orchestrator
//!
//! Drives one review's analysis run through its three phases: searching,
//! scoring, synthesis. Every state change is persisted before the matching
//! event is broadcast, so a poller that never sees an event still reads a
//! consistent snapshot from the database.
//!
//! Failure policy: a total search failure or a synthesis failure aborts the
//! run and marks the session errored; a single paper's scoring failure is
//! absorbed (the paper is persisted with score 0.0 and a failure note) and
//! the run continues.

mod phase_scoring;
mod phase_searching;
mod phase_synthesis;

use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{error, info};

use litrev_common::{AnalysisEvent, EventBus};

use crate::db;
use crate::error::PipelineError;
use crate::models::{Insight, PaperSource, ReviewSession, ReviewStatus};
use crate::services::scorer::RelevanceScorer;
use crate::services::search::SearchService;
use crate::services::synthesizer::InsightSynthesizer;

/// Caller-supplied parameters for one analysis run
#[derive(Debug, Clone)]
pub struct AnalysisParams {
    pub query: String,
    pub max_results: usize,
    pub sources: Vec<PaperSource>,
}

/// Orchestrates one review's analysis pipeline
pub struct AnalysisOrchestrator {
    db: SqlitePool,
    event_bus: EventBus,
    search: Arc<SearchService>,
    scorer: Arc<dyn RelevanceScorer>,
    synthesizer: Arc<dyn InsightSynthesizer>,
}

impl AnalysisOrchestrator {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        search: Arc<SearchService>,
        scorer: Arc<dyn RelevanceScorer>,
        synthesizer: Arc<dyn InsightSynthesizer>,
    ) -> Self {
        Self {
            db,
            event_bus,
            search,
            scorer,
            synthesizer,
        }
    }

    /// Run the full pipeline for a review already moved into `searching`.
    ///
    /// Run-fatal errors are absorbed here: the session is marked errored and
    /// the failure is broadcast, never propagated to the spawning task.
    pub async fn run(&self, review: ReviewSession, params: AnalysisParams) {
        let review_id = review.id;
        info!(review_id = %review_id, query = %params.query, "Analysis run started");

        match self.execute(&review, &params).await {
            Ok(()) => {
                info!(review_id = %review_id, "Analysis run completed");
            }
            Err(e) => {
                error!(review_id = %review_id, error = %e, "Analysis run failed");
                self.fail_run(review_id, &e.to_string()).await;
            }
        }
    }

    async fn execute(
        &self,
        review: &ReviewSession,
        params: &AnalysisParams,
    ) -> Result<(), PipelineError> {
        self.phase_searching(review, params).await?;

        self.transition(review.id, ReviewStatus::Searching, ReviewStatus::Analyzing)
            .await?;

        self.phase_scoring(review).await?;
        self.phase_synthesis(review).await?;

        db::reviews::set_current_step(&self.db, review.id, "Analysis complete").await?;
        self.transition(review.id, ReviewStatus::Analyzing, ReviewStatus::Completed)
            .await?;
        self.event_bus.emit(AnalysisEvent::Completed {
            review_id: review.id,
            timestamp: Utc::now(),
        });

        Ok(())
    }

    /// Persist a status change, then broadcast it
    pub(super) async fn transition(
        &self,
        review_id: uuid::Uuid,
        from: ReviewStatus,
        to: ReviewStatus,
    ) -> Result<(), PipelineError> {
        db::reviews::set_status(&self.db, review_id, to).await?;
        self.event_bus.emit(AnalysisEvent::StatusChanged {
            review_id,
            old_status: from.as_str().to_string(),
            new_status: to.as_str().to_string(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Broadcast progress counters freshly derived from the store
    pub(super) async fn emit_progress(
        &self,
        review_id: uuid::Uuid,
        current_step: &str,
    ) -> Result<(), PipelineError> {
        let papers_found = db::papers::count(&self.db, review_id).await?;
        let papers_analyzed = db::papers::count_analyzed(&self.db, review_id).await?;
        let insights_generated = db::insights::count(&self.db, review_id).await?;

        self.event_bus.emit(AnalysisEvent::Progress {
            review_id,
            papers_found,
            papers_analyzed,
            insights_generated,
            current_step: current_step.to_string(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Broadcast one appended insight
    pub(super) fn emit_insight(&self, insight: &Insight) {
        self.event_bus.emit(AnalysisEvent::InsightRecorded {
            review_id: insight.review_id,
            step_number: insight.step_number,
            insight_type: insight.insight_type.as_str().to_string(),
            timestamp: Utc::now(),
        });
    }

    async fn fail_run(&self, review_id: uuid::Uuid, message: &str) {
        // Best effort: the run is already lost, so a failing write only logs
        if let Err(e) = db::reviews::fail(&self.db, review_id, message).await {
            error!(review_id = %review_id, error = %e, "Failed to persist error state");
        }

        self.event_bus.emit(AnalysisEvent::Failed {
            review_id,
            message: message.to_string(),
            timestamp: Utc::now(),
        });
    }
}

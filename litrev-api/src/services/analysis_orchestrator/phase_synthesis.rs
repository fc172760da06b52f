//! Phase 3: synthesis
//!
//! Runs cross-paper analysis over the relevant papers and appends the
//! resulting insights to the review's reasoning trail, conclusion last.
//! Unlike scoring, a synthesis failure is run-fatal.

use tracing::info;

use super::AnalysisOrchestrator;
use crate::db;
use crate::error::PipelineError;
use crate::models::ReviewSession;
use crate::services::scorer::RELEVANCE_THRESHOLD;

impl AnalysisOrchestrator {
    pub(super) async fn phase_synthesis(
        &self,
        review: &ReviewSession,
    ) -> Result<(), PipelineError> {
        db::reviews::set_current_step(&self.db, review.id, "Synthesizing insights").await?;
        self.emit_progress(review.id, "Synthesizing insights").await?;

        let relevant =
            db::papers::list_relevant(&self.db, review.id, RELEVANCE_THRESHOLD).await?;

        let drafts = self
            .synthesizer
            .synthesize(review.question(), review.domain_or_default(), &relevant)
            .await
            .map_err(|e| PipelineError::SynthesisUnavailable(e.to_string()))?;

        let appended = drafts.len();
        for draft in &drafts {
            let insight = db::insights::append(&self.db, review.id, draft).await?;
            self.emit_insight(&insight);
        }
        self.emit_progress(review.id, "Synthesizing insights").await?;

        info!(
            review_id = %review.id,
            relevant_papers = relevant.len(),
            insights = appended,
            "Synthesis phase complete"
        );
        Ok(())
    }
}

//! Phase 1: searching
//!
//! Fans the query out to the bibliographic sources and persists the
//! deduplicated candidates. Papers already stored for this review (same
//! source and external id, from an earlier run) are kept, not duplicated.

use tracing::info;

use super::{AnalysisOrchestrator, AnalysisParams};
use crate::db;
use crate::error::PipelineError;
use crate::models::{Paper, ReviewSession};

impl AnalysisOrchestrator {
    pub(super) async fn phase_searching(
        &self,
        review: &ReviewSession,
        params: &AnalysisParams,
    ) -> Result<(), PipelineError> {
        self.emit_progress(review.id, "Searching for papers").await?;

        let results = self
            .search
            .search(&params.query, params.max_results, &params.sources)
            .await
            .map_err(|e| PipelineError::SourceUnavailable(e.to_string()))?;

        let mut stored = 0usize;
        for result in &results {
            let paper = Paper::from_result(review.id, result);
            if db::papers::insert_ignore_duplicate(&self.db, &paper).await? {
                stored += 1;
            }
        }

        let step = format!("Found {} papers", db::papers::count(&self.db, review.id).await?);
        db::reviews::set_current_step(&self.db, review.id, &step).await?;
        self.emit_progress(review.id, &step).await?;

        info!(
            review_id = %review.id,
            retrieved = results.len(),
            stored,
            "Searching phase complete"
        );
        Ok(())
    }
}

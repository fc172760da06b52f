//! Derived analysis status projection

use serde::Serialize;
use uuid::Uuid;

use super::review::ReviewStatus;

/// Queryable snapshot of a pipeline run.
///
/// Counters are derived by counting persisted rows, never tracked as
/// separate mutable state, so a polled snapshot cannot drift from the store.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisStatus {
    pub review_id: Uuid,
    pub status: ReviewStatus,
    pub papers_found: i64,
    pub papers_analyzed: i64,
    pub insights_generated: i64,
    pub current_step: Option<String>,
    pub error_message: Option<String>,
}

/// Default step description when the pipeline has not recorded one
pub fn describe_step(status: ReviewStatus, papers_analyzed: i64, papers_found: i64) -> String {
    match status {
        ReviewStatus::Created => "Not started".to_string(),
        ReviewStatus::Searching => "Searching for papers".to_string(),
        ReviewStatus::Analyzing => {
            format!("Analyzing papers ({}/{})", papers_analyzed, papers_found)
        }
        ReviewStatus::Generating => "Generating literature review".to_string(),
        ReviewStatus::Completed => "Analysis complete".to_string(),
        ReviewStatus::Error => "Error occurred".to_string(),
    }
}

//! Phase 2: scoring
//!
//! Scores every unscored paper against the research question and records
//! one observation insight per paper. A scoring failure does not abort the
//! run: the paper is persisted with score 0.0 and a failure note so the
//! analyzed count still reflects every paper that was attempted.

use tracing::{info, warn};

use super::AnalysisOrchestrator;
use crate::db;
use crate::error::PipelineError;
use crate::models::{InsightDraft, InsightType, Paper, ReviewSession, ReviewStatus};
use crate::models::describe_step;
use crate::services::scorer::RelevanceAssessment;

impl AnalysisOrchestrator {
    pub(super) async fn phase_scoring(&self, review: &ReviewSession) -> Result<(), PipelineError> {
        let papers = db::papers::list_unscored(&self.db, review.id).await?;
        let total = db::papers::count(&self.db, review.id).await?;
        let question = review.question();
        let domain = review.domain_or_default();

        for paper in &papers {
            let analyzed = db::papers::count_analyzed(&self.db, review.id).await?;
            let step = describe_step(ReviewStatus::Analyzing, analyzed, total);
            db::reviews::set_current_step(&self.db, review.id, &step).await?;

            match self.scorer.assess(question, domain, paper).await {
                Ok(assessment) => {
                    db::papers::set_relevance(
                        &self.db,
                        paper.id,
                        assessment.score,
                        &assessment.explanation,
                        &assessment.key_findings,
                    )
                    .await?;

                    let insight = db::insights::append(
                        &self.db,
                        review.id,
                        &observation_draft(paper, &assessment),
                    )
                    .await?;
                    self.emit_insight(&insight);
                }
                Err(e) => {
                    let reason =
                        PipelineError::ScoringUnavailable(e.to_string()).to_string();
                    warn!(
                        review_id = %review.id,
                        paper_id = %paper.id,
                        error = %e,
                        "Scoring failed for paper; recording zero score and continuing"
                    );

                    db::papers::set_relevance(&self.db, paper.id, 0.0, &reason, &[]).await?;

                    let draft = InsightDraft::new(
                        InsightType::Observation,
                        format!(
                            "Paper \"{}\" could not be scored and was excluded \
                             from synthesis: {}",
                            paper.title, reason
                        ),
                    )
                    .for_paper(paper.id);
                    let insight = db::insights::append(&self.db, review.id, &draft).await?;
                    self.emit_insight(&insight);
                }
            }

            let analyzed = db::papers::count_analyzed(&self.db, review.id).await?;
            let step = describe_step(ReviewStatus::Analyzing, analyzed, total);
            self.emit_progress(review.id, &step).await?;
        }

        info!(
            review_id = %review.id,
            scored = papers.len(),
            "Scoring phase complete"
        );
        Ok(())
    }
}

fn observation_draft(paper: &Paper, assessment: &RelevanceAssessment) -> InsightDraft {
    let content = if assessment.key_findings.is_empty() {
        format!(
            "Paper \"{}\" scored {:.2} for relevance.",
            paper.title, assessment.score
        )
    } else {
        format!(
            "Paper \"{}\" (relevance {:.2}): {}",
            paper.title,
            assessment.score,
            assessment.key_findings.join("; ")
        )
    };

    let mut reasoning = assessment.explanation.clone();
    if !assessment.key_aspects.is_empty() {
        if !reasoning.is_empty() {
            reasoning.push(' ');
        }
        reasoning.push_str("Key aspects: ");
        reasoning.push_str(&assessment.key_aspects.join("; "));
        reasoning.push('.');
    }

    let mut draft = InsightDraft::new(InsightType::Observation, content).for_paper(paper.id);
    if !reasoning.is_empty() {
        draft = draft.with_reasoning(reasoning);
    }
    draft
}

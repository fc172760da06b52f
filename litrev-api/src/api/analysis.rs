//! Analysis pipeline endpoints
//!
//! `start` launches the background pipeline and returns an immediate
//! snapshot; `status` serves poll-derived snapshots; `generate-review`
//! composes the final review text from the completed analysis, atomically
//! or as a streamed body.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use futures::TryStreamExt;
use serde::Deserialize;
use uuid::Uuid;

use litrev_common::AnalysisEvent;

use crate::api::papers::{requested_sources, validated_limit};
use crate::error::{ApiError, ApiResult, PipelineError};
use crate::models::{
    describe_step, AnalysisStatus, Insight, InsightDraft, InsightType, PaperSource,
    ReviewSession, ReviewStatus,
};
use crate::services::{AnalysisParams, ComposeInput, RELEVANCE_THRESHOLD};
use crate::{db, AppState};

#[derive(Debug, Deserialize, Default)]
pub struct StartAnalysisRequest {
    /// Defaults to the review's research question
    pub query: Option<String>,
    pub max_results: Option<usize>,
    pub sources: Option<Vec<PaperSource>>,
}

#[derive(Debug, serde::Serialize)]
pub struct InsightListResponse {
    pub insights: Vec<Insight>,
    pub total: i64,
}

#[derive(Debug, serde::Serialize)]
pub struct GenerateReviewResponse {
    pub review_id: Uuid,
    pub final_review: String,
}

async fn status_snapshot(state: &AppState, review: &ReviewSession) -> ApiResult<AnalysisStatus> {
    let papers_found = db::papers::count(&state.db, review.id).await?;
    let papers_analyzed = db::papers::count_analyzed(&state.db, review.id).await?;
    let insights_generated = db::insights::count(&state.db, review.id).await?;

    let current_step = review.current_step.clone().unwrap_or_else(|| {
        describe_step(review.status, papers_analyzed, papers_found)
    });

    Ok(AnalysisStatus {
        review_id: review.id,
        status: review.status,
        papers_found,
        papers_analyzed,
        insights_generated,
        current_step: Some(current_step),
        error_message: review.error_message.clone(),
    })
}

/// POST /api/analysis/{review_id}/start
///
/// Rejected with 409 while a run is active; a completed or errored review
/// may be re-run.
pub async fn start_analysis(
    State(state): State<AppState>,
    Path(review_id): Path<Uuid>,
    Json(request): Json<StartAnalysisRequest>,
) -> ApiResult<(StatusCode, Json<AnalysisStatus>)> {
    let review = db::reviews::require(&state.db, review_id).await?;

    if !review.status.can_start() {
        return Err(ApiError::Conflict(format!(
            "Analysis already running (status: {})",
            review.status.as_str()
        )));
    }

    let query = match request.query {
        Some(q) if !q.trim().is_empty() => q,
        _ => review.question().to_string(),
    };
    let params = AnalysisParams {
        query,
        max_results: validated_limit(request.max_results)?,
        sources: requested_sources(request.sources),
    };

    let old_status = review.status;
    // The status check above is only a fast path; the conditional UPDATE in
    // begin_run is the gate, so two racing starts cannot both pass.
    db::reviews::begin_run(&state.db, review_id).await?;
    state.event_bus.emit(AnalysisEvent::StatusChanged {
        review_id,
        old_status: old_status.as_str().to_string(),
        new_status: ReviewStatus::Searching.as_str().to_string(),
        timestamp: Utc::now(),
    });

    tracing::info!(review_id = %review_id, query = %params.query, "Starting analysis");

    let orchestrator = state.orchestrator();
    let run_review = db::reviews::require(&state.db, review_id).await?;
    tokio::spawn(async move {
        orchestrator.run(run_review, params).await;
    });

    let review = db::reviews::require(&state.db, review_id).await?;
    let snapshot = status_snapshot(&state, &review).await?;
    Ok((StatusCode::ACCEPTED, Json(snapshot)))
}

/// GET /api/analysis/{review_id}/status
pub async fn analysis_status(
    State(state): State<AppState>,
    Path(review_id): Path<Uuid>,
) -> ApiResult<Json<AnalysisStatus>> {
    let review = db::reviews::require(&state.db, review_id).await?;
    Ok(Json(status_snapshot(&state, &review).await?))
}

/// GET /api/analysis/{review_id}/insights
pub async fn list_insights(
    State(state): State<AppState>,
    Path(review_id): Path<Uuid>,
) -> ApiResult<Json<InsightListResponse>> {
    db::reviews::require(&state.db, review_id).await?;

    let insights = db::insights::list(&state.db, review_id).await?;
    let total = insights.len() as i64;
    Ok(Json(InsightListResponse { insights, total }))
}

async fn compose_input_parts(
    state: &AppState,
    review: &ReviewSession,
) -> ApiResult<(Vec<crate::models::Paper>, Vec<Insight>)> {
    let papers = db::papers::list_relevant(&state.db, review.id, RELEVANCE_THRESHOLD).await?;
    let insights = db::insights::list(&state.db, review.id).await?;
    Ok((papers, insights))
}

/// POST /api/analysis/{review_id}/generate-review
///
/// Composes and persists the final review. Only a completed analysis can be
/// composed; a run in flight would have its status clobbered otherwise. On
/// composition failure the session's prior status is restored so the
/// analysis results stay usable.
pub async fn generate_review(
    State(state): State<AppState>,
    Path(review_id): Path<Uuid>,
) -> ApiResult<Json<GenerateReviewResponse>> {
    let review = db::reviews::require(&state.db, review_id).await?;
    if review.status != ReviewStatus::Completed {
        return Err(ApiError::Conflict(format!(
            "Review must complete analysis before composition (status: {})",
            review.status.as_str()
        )));
    }
    let prior_status = review.status;

    let (papers, insights) = compose_input_parts(&state, &review).await?;

    db::reviews::set_status(&state.db, review_id, ReviewStatus::Generating).await?;
    state.event_bus.emit(AnalysisEvent::StatusChanged {
        review_id,
        old_status: prior_status.as_str().to_string(),
        new_status: ReviewStatus::Generating.as_str().to_string(),
        timestamp: Utc::now(),
    });

    let input = ComposeInput {
        review: &review,
        papers: &papers,
        insights: &insights,
    };

    let text = match state.composer.compose(&input).await {
        Ok(text) => text,
        Err(e) => {
            // Composition failed: put the session back where it was
            db::reviews::set_status(&state.db, review_id, prior_status).await?;
            state.event_bus.emit(AnalysisEvent::StatusChanged {
                review_id,
                old_status: ReviewStatus::Generating.as_str().to_string(),
                new_status: prior_status.as_str().to_string(),
                timestamp: Utc::now(),
            });
            return Err(PipelineError::CompositionUnavailable(e.to_string()).into());
        }
    };

    db::reviews::set_final_review(&state.db, review_id, &text).await?;
    db::reviews::set_current_step(&state.db, review_id, "Analysis complete").await?;
    db::reviews::set_status(&state.db, review_id, ReviewStatus::Completed).await?;
    state.event_bus.emit(AnalysisEvent::StatusChanged {
        review_id,
        old_status: ReviewStatus::Generating.as_str().to_string(),
        new_status: ReviewStatus::Completed.as_str().to_string(),
        timestamp: Utc::now(),
    });

    let draft = InsightDraft::new(
        InsightType::Conclusion,
        format!(
            "Final literature review composed from {} relevant papers and {} insights.",
            papers.len(),
            insights.len()
        ),
    );
    db::insights::append(&state.db, review_id, &draft).await?;

    tracing::info!(review_id = %review_id, chars = text.len(), "Final review generated");

    Ok(Json(GenerateReviewResponse {
        review_id,
        final_review: text,
    }))
}

/// GET /api/analysis/{review_id}/generate-review-stream
///
/// Streams the composed review as it is produced. Nothing is persisted and
/// the session status is untouched; the atomic endpoint is the one that
/// stores a final review.
pub async fn generate_review_stream(
    State(state): State<AppState>,
    Path(review_id): Path<Uuid>,
) -> ApiResult<Response> {
    let review = db::reviews::require(&state.db, review_id).await?;
    let (papers, insights) = compose_input_parts(&state, &review).await?;

    let input = ComposeInput {
        review: &review,
        papers: &papers,
        insights: &insights,
    };

    let stream = state
        .composer
        .compose_stream(&input)
        .await
        .map_err(|e| PipelineError::CompositionUnavailable(e.to_string()))?;

    let body = Body::from_stream(
        stream.map_ok(bytes::Bytes::from).map_err(axum::BoxError::from),
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/markdown; charset=utf-8")
        .body(body)
        .map_err(|e| ApiError::Internal(e.to_string()))
}

pub fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route("/api/analysis/:review_id/start", post(start_analysis))
        .route("/api/analysis/:review_id/status", get(analysis_status))
        .route("/api/analysis/:review_id/insights", get(list_insights))
        .route(
            "/api/analysis/:review_id/generate-review",
            post(generate_review),
        )
        .route(
            "/api/analysis/:review_id/generate-review-stream",
            get(generate_review_stream),
        )
}

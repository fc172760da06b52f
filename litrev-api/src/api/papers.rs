//! Paper search and curation endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult, PipelineError};
use crate::models::{Paper, PaperSource, SearchResult};
use crate::{db, AppState};

const DEFAULT_MAX_RESULTS: usize = 10;
const MAX_MAX_RESULTS: usize = 100;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub max_results: Option<usize>,
    /// Defaults to all configured sources
    pub sources: Option<Vec<PaperSource>>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Serialize)]
pub struct PaperListResponse {
    pub papers: Vec<Paper>,
    pub total: i64,
}

pub(crate) fn validated_limit(max_results: Option<usize>) -> ApiResult<usize> {
    let limit = max_results.unwrap_or(DEFAULT_MAX_RESULTS);
    if limit == 0 || limit > MAX_MAX_RESULTS {
        return Err(ApiError::BadRequest(format!(
            "max_results must be between 1 and {}",
            MAX_MAX_RESULTS
        )));
    }
    Ok(limit)
}

pub(crate) fn requested_sources(sources: Option<Vec<PaperSource>>) -> Vec<PaperSource> {
    match sources {
        Some(list) if !list.is_empty() => list,
        _ => vec![PaperSource::Pubmed, PaperSource::SemanticScholar],
    }
}

/// POST /api/papers/search
///
/// Ad-hoc search without attaching results to a review.
pub async fn search_papers(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Json<SearchResponse>> {
    if request.query.trim().is_empty() {
        return Err(ApiError::BadRequest("Query must not be empty".to_string()));
    }
    let limit = validated_limit(request.max_results)?;
    let sources = requested_sources(request.sources);

    let results = state
        .search
        .search(&request.query, limit, &sources)
        .await
        .map_err(|e| PipelineError::SourceUnavailable(e.to_string()))?;

    Ok(Json(SearchResponse {
        query: request.query,
        results,
    }))
}

/// POST /api/papers/{review_id}/add
///
/// Manually attach a paper to a review. Duplicates (same source and
/// external id) are rejected with 409.
pub async fn add_paper(
    State(state): State<AppState>,
    Path(review_id): Path<Uuid>,
    Json(result): Json<SearchResult>,
) -> ApiResult<(StatusCode, Json<Paper>)> {
    db::reviews::require(&state.db, review_id).await?;

    if result.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Title must not be empty".to_string()));
    }

    let paper = Paper::from_result(review_id, &result);
    db::papers::insert(&state.db, &paper).await?;

    tracing::info!(review_id = %review_id, paper_id = %paper.id, "Added paper to review");
    Ok((StatusCode::CREATED, Json(paper)))
}

/// GET /api/papers/{review_id}/list
pub async fn list_papers(
    State(state): State<AppState>,
    Path(review_id): Path<Uuid>,
) -> ApiResult<Json<PaperListResponse>> {
    db::reviews::require(&state.db, review_id).await?;

    let papers = db::papers::list(&state.db, review_id).await?;
    let total = papers.len() as i64;
    Ok(Json(PaperListResponse { papers, total }))
}

/// DELETE /api/papers/{review_id}/{paper_id}
pub async fn remove_paper(
    State(state): State<AppState>,
    Path((review_id, paper_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    db::reviews::require(&state.db, review_id).await?;

    if !db::papers::delete(&state.db, review_id, paper_id).await? {
        return Err(ApiError::NotFound(format!("Paper not found: {}", paper_id)));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub fn paper_routes() -> Router<AppState> {
    Router::new()
        .route("/api/papers/search", post(search_papers))
        .route("/api/papers/:review_id/add", post(add_paper))
        .route("/api/papers/:review_id/list", get(list_papers))
        .route(
            "/api/papers/:review_id/:paper_id",
            axum::routing::delete(remove_paper),
        )
}

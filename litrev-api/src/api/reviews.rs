//! Review session CRUD endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::ReviewSession;
use crate::{db, AppState};

/// Review plus row counts derived from its papers and insights
#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    #[serde(flatten)]
    pub review: ReviewSession,
    pub paper_count: i64,
    pub insight_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub title: String,
    pub domain: Option<String>,
    pub research_question: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReviewRequest {
    pub title: Option<String>,
    pub domain: Option<String>,
    pub research_question: Option<String>,
    pub final_review: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Serialize)]
pub struct ReviewListResponse {
    pub reviews: Vec<ReviewResponse>,
    pub total: i64,
}

async fn with_counts(state: &AppState, review: ReviewSession) -> ApiResult<ReviewResponse> {
    let paper_count = db::papers::count(&state.db, review.id).await?;
    let insight_count = db::insights::count(&state.db, review.id).await?;
    Ok(ReviewResponse {
        review,
        paper_count,
        insight_count,
    })
}

/// POST /api/reviews
pub async fn create_review(
    State(state): State<AppState>,
    Json(request): Json<CreateReviewRequest>,
) -> ApiResult<(StatusCode, Json<ReviewResponse>)> {
    if request.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Title must not be empty".to_string()));
    }

    let review = ReviewSession::new(
        request.title,
        request.domain,
        request.research_question,
    );
    db::reviews::insert(&state.db, &review).await?;

    tracing::info!(review_id = %review.id, title = %review.title, "Created review session");

    let response = with_counts(&state, review).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/reviews
pub async fn list_reviews(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ReviewListResponse>> {
    let sessions = db::reviews::list(&state.db, query.limit, query.offset).await?;
    let total = db::reviews::count(&state.db).await?;

    let mut reviews = Vec::with_capacity(sessions.len());
    for session in sessions {
        reviews.push(with_counts(&state, session).await?);
    }

    Ok(Json(ReviewListResponse { reviews, total }))
}

/// GET /api/reviews/{id}
pub async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ReviewResponse>> {
    let review = db::reviews::require(&state.db, id).await?;
    Ok(Json(with_counts(&state, review).await?))
}

/// PATCH /api/reviews/{id}
pub async fn update_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateReviewRequest>,
) -> ApiResult<Json<ReviewResponse>> {
    let mut review = db::reviews::require(&state.db, id).await?;

    if let Some(title) = request.title {
        if title.trim().is_empty() {
            return Err(ApiError::BadRequest("Title must not be empty".to_string()));
        }
        review.title = title;
    }
    if let Some(domain) = request.domain {
        review.domain = Some(domain);
    }
    if let Some(question) = request.research_question {
        review.research_question = Some(question);
    }
    if let Some(final_review) = request.final_review {
        review.final_review = Some(final_review);
    }

    db::reviews::update(&state.db, &review).await?;
    Ok(Json(with_counts(&state, review).await?))
}

/// DELETE /api/reviews/{id}
pub async fn delete_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !db::reviews::delete(&state.db, id).await? {
        return Err(ApiError::NotFound(format!("Review not found: {}", id)));
    }

    tracing::info!(review_id = %id, "Deleted review session");
    Ok(StatusCode::NO_CONTENT)
}

pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/api/reviews", post(create_review).get(list_reviews))
        .route(
            "/api/reviews/:id",
            get(get_review).patch(update_review).delete(delete_review),
        )
}

//! Error types for litrev-api

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Pipeline error taxonomy.
///
/// The first three kinds carry the run-level policy: a source failure and a
/// synthesis failure are run-fatal, a scoring failure is absorbed per paper.
/// Composition failures never touch session state; they only fail the
/// composing request itself.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Search adapter failed or timed out (run-fatal)
    #[error("Search sources unavailable: {0}")]
    SourceUnavailable(String),

    /// One paper's scoring failed (per-paper degraded-continue)
    #[error("Relevance scoring unavailable: {0}")]
    ScoringUnavailable(String),

    /// Cross-paper synthesis failed (run-fatal)
    #[error("Insight synthesis unavailable: {0}")]
    SynthesisUnavailable(String),

    /// Review composition failed (per-request, session state untouched)
    #[error("Review composition unavailable: {0}")]
    CompositionUnavailable(String),

    /// Persistence failure during a run
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - e.g. analysis already running, duplicate paper
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Pipeline failure surfaced to the caller (502, kind-coded)
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// litrev-common error
    #[error(transparent)]
    Common(#[from] litrev_common::Error),
}

impl From<litrev_common::Error> for PipelineError {
    fn from(e: litrev_common::Error) -> Self {
        match e {
            litrev_common::Error::Database(db) => PipelineError::Database(db),
            // Pipeline store calls only surface database errors in practice
            other => PipelineError::Database(sqlx::Error::Protocol(other.to_string())),
        }
    }
}

impl PipelineError {
    /// Stable machine-readable code for the error envelope
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::SourceUnavailable(_) => "SOURCE_UNAVAILABLE",
            PipelineError::ScoringUnavailable(_) => "SCORING_UNAVAILABLE",
            PipelineError::SynthesisUnavailable(_) => "SYNTHESIS_UNAVAILABLE",
            PipelineError::CompositionUnavailable(_) => "COMPOSITION_UNAVAILABLE",
            PipelineError::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Pipeline(ref err) => {
                let status = match err {
                    PipelineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (status, err.code(), err.to_string())
            }
            ApiError::Common(err) => match err {
                litrev_common::Error::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
                litrev_common::Error::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
                litrev_common::Error::InvalidInput(msg) => {
                    (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
                }
                other => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    other.to_string(),
                ),
            },
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

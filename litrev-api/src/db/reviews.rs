//! Review session persistence

use chrono::Utc;
use litrev_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{ReviewSession, ReviewStatus};

fn row_to_review(row: &sqlx::sqlite::SqliteRow) -> Result<ReviewSession> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|e| Error::Internal(format!("Failed to parse review id: {}", e)))?;

    let status: String = row.get("status");
    let status = ReviewStatus::parse(&status)
        .ok_or_else(|| Error::Internal(format!("Unknown review status: {}", status)))?;

    let created_at: String = row.get("created_at");
    let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| Error::Internal(format!("Failed to parse created_at: {}", e)))?
        .with_timezone(&Utc);

    let updated_at: String = row.get("updated_at");
    let updated_at = chrono::DateTime::parse_from_rfc3339(&updated_at)
        .map_err(|e| Error::Internal(format!("Failed to parse updated_at: {}", e)))?
        .with_timezone(&Utc);

    Ok(ReviewSession {
        id,
        title: row.get("title"),
        domain: row.get("domain"),
        research_question: row.get("research_question"),
        status,
        final_review: row.get("final_review"),
        current_step: row.get("current_step"),
        error_message: row.get("error_message"),
        created_at,
        updated_at,
    })
}

pub async fn insert(pool: &SqlitePool, session: &ReviewSession) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO review_sessions (
            id, title, domain, research_question, status,
            final_review, current_step, error_message, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(session.id.to_string())
    .bind(&session.title)
    .bind(&session.domain)
    .bind(&session.research_question)
    .bind(session.status.as_str())
    .bind(&session.final_review)
    .bind(&session.current_step)
    .bind(&session.error_message)
    .bind(session.created_at.to_rfc3339())
    .bind(session.updated_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Option<ReviewSession>> {
    let row = sqlx::query("SELECT * FROM review_sessions WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_review).transpose()
}

/// Like [`get`] but an absent session is an error
pub async fn require(pool: &SqlitePool, id: Uuid) -> Result<ReviewSession> {
    get(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Review not found: {}", id)))
}

pub async fn list(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<ReviewSession>> {
    let rows = sqlx::query(
        "SELECT * FROM review_sessions ORDER BY created_at DESC LIMIT ? OFFSET ?",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_review).collect()
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM review_sessions")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Persist mutable fields (title, domain, question, final review)
pub async fn update(pool: &SqlitePool, session: &ReviewSession) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE review_sessions
        SET title = ?, domain = ?, research_question = ?, final_review = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&session.title)
    .bind(&session.domain)
    .bind(&session.research_question)
    .bind(&session.final_review)
    .bind(Utc::now().to_rfc3339())
    .bind(session.id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn set_status(pool: &SqlitePool, id: Uuid, status: ReviewStatus) -> Result<()> {
    sqlx::query("UPDATE review_sessions SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn set_current_step(pool: &SqlitePool, id: Uuid, step: &str) -> Result<()> {
    sqlx::query("UPDATE review_sessions SET current_step = ?, updated_at = ? WHERE id = ?")
        .bind(step)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

/// Enter a new pipeline run: status searching, stale error state cleared.
///
/// The status predicate is the gate against concurrent starts: of two racing
/// requests only one can move the row out of a startable state, the other
/// matches zero rows and gets a conflict.
pub async fn begin_run(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE review_sessions
        SET status = 'searching', error_message = NULL,
            current_step = 'Searching for papers', updated_at = ?
        WHERE id = ? AND status IN ('created', 'completed', 'error')
        "#,
    )
    .bind(Utc::now().to_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::Conflict(format!(
            "Analysis already running for review {}",
            id
        )));
    }

    Ok(())
}

/// Mark a run as failed with a human-readable message
pub async fn fail(pool: &SqlitePool, id: Uuid, message: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE review_sessions
        SET status = 'error', error_message = ?, current_step = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(message)
    .bind("Error occurred")
    .bind(Utc::now().to_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn set_final_review(pool: &SqlitePool, id: Uuid, text: &str) -> Result<()> {
    sqlx::query("UPDATE review_sessions SET final_review = ?, updated_at = ? WHERE id = ?")
        .bind(text)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM review_sessions WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Startup recovery: a session left mid-run by a previous process will never
/// progress, since the pipeline runs in a background task that died with it.
/// Mark such sessions as errored so clients stop polling them.
pub async fn fail_interrupted(pool: &SqlitePool) -> Result<usize> {
    let result = sqlx::query(
        r#"
        UPDATE review_sessions
        SET status = 'error',
            error_message = 'Analysis interrupted by service restart',
            current_step = 'Error occurred',
            updated_at = ?
        WHERE status IN ('searching', 'analyzing', 'generating')
        "#,
    )
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() as usize)
}

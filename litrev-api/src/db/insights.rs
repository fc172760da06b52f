//! Insight trail persistence
//!
//! The trail is append-only. Step numbers are allocated inside the INSERT
//! itself with a MAX(step_number)+1 subselect, so a single statement both
//! claims the next number and writes the row; SQLite's single-writer model
//! keeps the sequence contiguous even when scoring work is interleaved.

use chrono::Utc;
use litrev_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{Insight, InsightDraft, InsightType};

fn row_to_insight(row: &sqlx::sqlite::SqliteRow) -> Result<Insight> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|e| Error::Internal(format!("Failed to parse insight id: {}", e)))?;

    let review_id: String = row.get("review_id");
    let review_id = Uuid::parse_str(&review_id)
        .map_err(|e| Error::Internal(format!("Failed to parse review id: {}", e)))?;

    let paper_id: Option<String> = row.get("paper_id");
    let paper_id = paper_id
        .map(|s| Uuid::parse_str(&s))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to parse paper id: {}", e)))?;

    let insight_type: String = row.get("insight_type");
    let insight_type = InsightType::parse(&insight_type)
        .ok_or_else(|| Error::Internal(format!("Unknown insight type: {}", insight_type)))?;

    let created_at: String = row.get("created_at");
    let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| Error::Internal(format!("Failed to parse created_at: {}", e)))?
        .with_timezone(&Utc);

    Ok(Insight {
        id,
        review_id,
        paper_id,
        step_number: row.get("step_number"),
        insight_type,
        content: row.get("content"),
        reasoning: row.get("reasoning"),
        created_at,
    })
}

/// Append a draft to the trail, assigning the next step number
pub async fn append(pool: &SqlitePool, review_id: Uuid, draft: &InsightDraft) -> Result<Insight> {
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO insights (
            id, review_id, paper_id, step_number,
            insight_type, content, reasoning, created_at
        ) VALUES (
            ?, ?, ?,
            (SELECT COALESCE(MAX(step_number), 0) + 1 FROM insights WHERE review_id = ?),
            ?, ?, ?, ?
        )
        "#,
    )
    .bind(id.to_string())
    .bind(review_id.to_string())
    .bind(draft.paper_id.map(|p| p.to_string()))
    .bind(review_id.to_string())
    .bind(draft.insight_type.as_str())
    .bind(&draft.content)
    .bind(&draft.reasoning)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    let row = sqlx::query("SELECT * FROM insights WHERE id = ?")
        .bind(id.to_string())
        .fetch_one(pool)
        .await?;

    row_to_insight(&row)
}

/// Full trail for a review, in step order
pub async fn list(pool: &SqlitePool, review_id: Uuid) -> Result<Vec<Insight>> {
    let rows = sqlx::query("SELECT * FROM insights WHERE review_id = ? ORDER BY step_number")
        .bind(review_id.to_string())
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_to_insight).collect()
}

pub async fn count(pool: &SqlitePool, review_id: Uuid) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM insights WHERE review_id = ?")
        .bind(review_id.to_string())
        .fetch_one(pool)
        .await?;
    Ok(count)
}

//! Paper persistence

use chrono::Utc;
use litrev_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{Paper, PaperSource};

fn row_to_paper(row: &sqlx::sqlite::SqliteRow) -> Result<Paper> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|e| Error::Internal(format!("Failed to parse paper id: {}", e)))?;

    let review_id: String = row.get("review_id");
    let review_id = Uuid::parse_str(&review_id)
        .map_err(|e| Error::Internal(format!("Failed to parse review id: {}", e)))?;

    let source: String = row.get("source");
    let source = PaperSource::parse(&source)
        .ok_or_else(|| Error::Internal(format!("Unknown paper source: {}", source)))?;

    let authors: String = row.get("authors");
    let authors: Vec<String> = serde_json::from_str(&authors)
        .map_err(|e| Error::Internal(format!("Failed to parse authors: {}", e)))?;

    let key_findings: String = row.get("key_findings");
    let key_findings: Vec<String> = serde_json::from_str(&key_findings)
        .map_err(|e| Error::Internal(format!("Failed to parse key findings: {}", e)))?;

    let created_at: String = row.get("created_at");
    let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| Error::Internal(format!("Failed to parse created_at: {}", e)))?
        .with_timezone(&Utc);

    Ok(Paper {
        id,
        review_id,
        source,
        external_id: row.get("external_id"),
        title: row.get("title"),
        authors,
        abstract_text: row.get("abstract"),
        publication_date: row.get("publication_date"),
        doi: row.get("doi"),
        url: row.get("url"),
        pdf_url: row.get("pdf_url"),
        relevance_score: row.get("relevance_score"),
        relevance_explanation: row.get("relevance_explanation"),
        key_findings,
        created_at,
    })
}

/// Insert a paper; a duplicate (review, source, external_id) is a Conflict
pub async fn insert(pool: &SqlitePool, paper: &Paper) -> Result<()> {
    let authors = serde_json::to_string(&paper.authors)
        .map_err(|e| Error::Internal(format!("Failed to serialize authors: {}", e)))?;
    let key_findings = serde_json::to_string(&paper.key_findings)
        .map_err(|e| Error::Internal(format!("Failed to serialize key findings: {}", e)))?;

    let result = sqlx::query(
        r#"
        INSERT INTO papers (
            id, review_id, source, external_id, title, authors, abstract,
            publication_date, doi, url, pdf_url,
            relevance_score, relevance_explanation, key_findings, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(paper.id.to_string())
    .bind(paper.review_id.to_string())
    .bind(paper.source.as_str())
    .bind(&paper.external_id)
    .bind(&paper.title)
    .bind(authors)
    .bind(&paper.abstract_text)
    .bind(&paper.publication_date)
    .bind(&paper.doi)
    .bind(&paper.url)
    .bind(&paper.pdf_url)
    .bind(paper.relevance_score)
    .bind(&paper.relevance_explanation)
    .bind(key_findings)
    .bind(paper.created_at.to_rfc3339())
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(db_err))
            if db_err.kind() == sqlx::error::ErrorKind::UniqueViolation =>
        {
            Err(Error::Conflict(format!(
                "Paper already added to this review: {}:{}",
                paper.source.as_str(),
                paper.external_id
            )))
        }
        Err(e) => Err(e.into()),
    }
}

/// Insert a paper, treating a duplicate as a no-op. Used by the pipeline so
/// a re-run from a terminal state never double-appends papers.
pub async fn insert_ignore_duplicate(pool: &SqlitePool, paper: &Paper) -> Result<bool> {
    match insert(pool, paper).await {
        Ok(()) => Ok(true),
        Err(Error::Conflict(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

pub async fn get(pool: &SqlitePool, review_id: Uuid, paper_id: Uuid) -> Result<Option<Paper>> {
    let row = sqlx::query("SELECT * FROM papers WHERE id = ? AND review_id = ?")
        .bind(paper_id.to_string())
        .bind(review_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_paper).transpose()
}

/// All papers for a review, most relevant first, unscored last
pub async fn list(pool: &SqlitePool, review_id: Uuid) -> Result<Vec<Paper>> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM papers WHERE review_id = ?
        ORDER BY relevance_score IS NULL, relevance_score DESC, created_at
        "#,
    )
    .bind(review_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_paper).collect()
}

/// Papers not yet scored, in search/attach order
pub async fn list_unscored(pool: &SqlitePool, review_id: Uuid) -> Result<Vec<Paper>> {
    let rows = sqlx::query(
        "SELECT * FROM papers WHERE review_id = ? AND relevance_score IS NULL ORDER BY created_at, id",
    )
    .bind(review_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_paper).collect()
}

/// Scored papers at or above `min_score`, most relevant first
pub async fn list_relevant(pool: &SqlitePool, review_id: Uuid, min_score: f64) -> Result<Vec<Paper>> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM papers WHERE review_id = ? AND relevance_score >= ?
        ORDER BY relevance_score DESC, created_at
        "#,
    )
    .bind(review_id.to_string())
    .bind(min_score)
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_paper).collect()
}

/// Persist the scoring outcome for one paper
pub async fn set_relevance(
    pool: &SqlitePool,
    paper_id: Uuid,
    score: f64,
    explanation: &str,
    key_findings: &[String],
) -> Result<()> {
    let key_findings = serde_json::to_string(key_findings)
        .map_err(|e| Error::Internal(format!("Failed to serialize key findings: {}", e)))?;

    sqlx::query(
        r#"
        UPDATE papers
        SET relevance_score = ?, relevance_explanation = ?, key_findings = ?
        WHERE id = ?
        "#,
    )
    .bind(score)
    .bind(explanation)
    .bind(key_findings)
    .bind(paper_id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn delete(pool: &SqlitePool, review_id: Uuid, paper_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM papers WHERE id = ? AND review_id = ?")
        .bind(paper_id.to_string())
        .bind(review_id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count(pool: &SqlitePool, review_id: Uuid) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM papers WHERE review_id = ?")
        .bind(review_id.to_string())
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Papers with a persisted score; the pipeline also persists 0.0 for papers
/// whose scoring failed, so this counts every processed paper.
pub async fn count_analyzed(pool: &SqlitePool, review_id: Uuid) -> Result<i64> {
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM papers WHERE review_id = ? AND relevance_score IS NOT NULL",
    )
    .bind(review_id.to_string())
    .fetch_one(pool)
    .await?;
    Ok(count)
}

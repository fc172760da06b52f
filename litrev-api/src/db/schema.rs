//! Database schema
//!
//! Executed DDL, idempotent via IF NOT EXISTS. The UNIQUE constraints carry
//! two invariants: a (source, external_id) pair appears at most once per
//! review, and insight step numbers are never reused within a review.

use litrev_common::Result;
use sqlx::SqlitePool;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS review_sessions (
    id               TEXT PRIMARY KEY,
    title            TEXT NOT NULL,
    domain           TEXT,
    research_question TEXT,
    status           TEXT NOT NULL DEFAULT 'created',
    final_review     TEXT,
    current_step     TEXT,
    error_message    TEXT,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS papers (
    id               TEXT PRIMARY KEY,
    review_id        TEXT NOT NULL REFERENCES review_sessions(id) ON DELETE CASCADE,
    source           TEXT NOT NULL,
    external_id      TEXT NOT NULL,
    title            TEXT NOT NULL,
    authors          TEXT NOT NULL DEFAULT '[]',
    abstract         TEXT,
    publication_date TEXT,
    doi              TEXT,
    url              TEXT,
    pdf_url          TEXT,
    relevance_score  REAL,
    relevance_explanation TEXT,
    key_findings     TEXT NOT NULL DEFAULT '[]',
    created_at       TEXT NOT NULL,
    UNIQUE (review_id, source, external_id)
);

CREATE TABLE IF NOT EXISTS insights (
    id               TEXT PRIMARY KEY,
    review_id        TEXT NOT NULL REFERENCES review_sessions(id) ON DELETE CASCADE,
    paper_id         TEXT REFERENCES papers(id) ON DELETE SET NULL,
    step_number      INTEGER NOT NULL,
    insight_type     TEXT NOT NULL,
    content          TEXT NOT NULL,
    reasoning        TEXT,
    created_at       TEXT NOT NULL,
    UNIQUE (review_id, step_number)
);

CREATE INDEX IF NOT EXISTS idx_papers_review ON papers(review_id);
CREATE INDEX IF NOT EXISTS idx_insights_review_step ON insights(review_id, step_number);
"#;

/// Create tables and indexes if absent
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    tracing::debug!("Database schema initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn schema_init_is_idempotent() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        init_schema(&pool).await.unwrap();
        init_schema(&pool).await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        assert!(tables.contains(&"review_sessions".to_string()));
        assert!(tables.contains(&"papers".to_string()));
        assert!(tables.contains(&"insights".to_string()));
    }
}

//! SQLite persistence
//!
//! Plain-SQL query functions grouped per table. Ids are UUID v4 stored as
//! TEXT, timestamps RFC 3339 TEXT, list columns (authors, key findings)
//! JSON-encoded TEXT.

pub mod insights;
pub mod papers;
pub mod reviews;
pub mod schema;

use litrev_common::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;

/// Open (creating if missing) the database and bring the schema up
pub async fn init_pool(path: &Path) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    schema::init_schema(&pool).await?;
    Ok(pool)
}

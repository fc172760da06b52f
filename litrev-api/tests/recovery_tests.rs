//! Startup recovery over a file-backed database

use litrev_api::db;
use litrev_api::models::{ReviewSession, ReviewStatus};

#[tokio::test]
async fn interrupted_runs_are_marked_errored_on_startup() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("litrev.db");

    let pool = db::init_pool(&db_path).await.unwrap();

    // One review mid-run, one finished, one untouched
    let running = ReviewSession::new("Running".to_string(), None, None);
    db::reviews::insert(&pool, &running).await.unwrap();
    db::reviews::begin_run(&pool, running.id).await.unwrap();

    let done = ReviewSession::new("Done".to_string(), None, None);
    db::reviews::insert(&pool, &done).await.unwrap();
    db::reviews::set_status(&pool, done.id, ReviewStatus::Completed)
        .await
        .unwrap();

    let idle = ReviewSession::new("Idle".to_string(), None, None);
    db::reviews::insert(&pool, &idle).await.unwrap();

    // Simulate the restart path
    let recovered = db::reviews::fail_interrupted(&pool).await.unwrap();
    assert_eq!(recovered, 1);

    let running = db::reviews::require(&pool, running.id).await.unwrap();
    assert_eq!(running.status, ReviewStatus::Error);
    assert!(running
        .error_message
        .as_deref()
        .unwrap()
        .contains("interrupted"));

    let done = db::reviews::require(&pool, done.id).await.unwrap();
    assert_eq!(done.status, ReviewStatus::Completed);

    let idle = db::reviews::require(&pool, idle.id).await.unwrap();
    assert_eq!(idle.status, ReviewStatus::Created);
}

#[tokio::test]
async fn init_pool_is_reentrant() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("litrev.db");

    let pool = db::init_pool(&db_path).await.unwrap();
    let review = ReviewSession::new("Persisted".to_string(), None, None);
    db::reviews::insert(&pool, &review).await.unwrap();
    pool.close().await;

    // A second open against the same file finds schema and data intact
    let pool = db::init_pool(&db_path).await.unwrap();
    let reloaded = db::reviews::require(&pool, review.id).await.unwrap();
    assert_eq!(reloaded.title, "Persisted");
}

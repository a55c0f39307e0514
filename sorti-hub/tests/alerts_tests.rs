//! Integration tests for the correction sink

use sorti_common::db::init_database;
use sorti_hub::alerts;
use sqlx::SqlitePool;

async fn setup() -> (tempfile::TempDir, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("sorti.db")).await.unwrap();
    (dir, pool)
}

#[tokio::test]
async fn test_report_appends_unresolved_entry() {
    let (_dir, pool) = setup().await;

    let report = alerts::report(&pool, "bin_001", "user-1", "plastic", "glass")
        .await
        .unwrap();

    assert_eq!(report.bin_id, "bin_001");
    assert_eq!(report.user_id, "user-1");
    assert_eq!(report.original_identification, "plastic");
    assert_eq!(report.corrected_identification, "glass");
    assert_eq!(report.alert_type, alerts::SENSOR_ERROR);
    assert!(!report.resolved);

    let queue = alerts::list_unresolved(&pool).await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].alert_id, report.alert_id);
}

#[tokio::test]
async fn test_reports_accumulate_append_only() {
    let (_dir, pool) = setup().await;

    let first = alerts::report(&pool, "bin_001", "user-1", "plastic", "glass")
        .await
        .unwrap();
    let second = alerts::report(&pool, "bin_001", "user-2", "glass", "aluminium")
        .await
        .unwrap();
    assert_ne!(first.alert_id, second.alert_id);

    // Filing the second report did not touch the first
    let queue = alerts::list_unresolved(&pool).await.unwrap();
    assert_eq!(queue.len(), 2);
    assert_eq!(queue[0].original_identification, "plastic");
    assert_eq!(queue[1].original_identification, "glass");
}

#[tokio::test]
async fn test_resolved_reports_leave_the_queue() {
    let (_dir, pool) = setup().await;

    let report = alerts::report(&pool, "bin_001", "user-1", "plastic", "glass")
        .await
        .unwrap();

    // The external moderation workflow flips the flag
    sqlx::query("UPDATE alerts SET resolved = 1 WHERE alert_id = ?")
        .bind(&report.alert_id)
        .execute(&pool)
        .await
        .unwrap();

    assert!(alerts::list_unresolved(&pool).await.unwrap().is_empty());
}

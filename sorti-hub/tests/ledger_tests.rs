//! Integration tests for the points ledger
//!
//! Covers the two award policies, category normalization, the
//! items-equals-sum invariant, and concurrent award safety.

use sorti_common::db::{self, init_database};
use sorti_common::WasteCategory;
use sorti_hub::ledger;
use sqlx::SqlitePool;

async fn setup() -> (tempfile::TempDir, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("sorti.db")).await.unwrap();
    db::insert_user(&pool, "user-1", "Dana", "Levi", "user", None)
        .await
        .unwrap();
    (dir, pool)
}

#[tokio::test]
async fn test_sensor_confirmed_glass_awards_one_point() {
    let (_dir, pool) = setup().await;

    let summary = ledger::award_sensor_confirmed(&pool, "user-1", "glass")
        .await
        .unwrap();

    assert_eq!(summary.category, WasteCategory::Glass);
    assert_eq!(summary.points_awarded, 1);
    assert_eq!(summary.stats.recycle_glass, 1);
    assert_eq!(summary.stats.recycle_plastic, 0);
    assert_eq!(summary.stats.recycle_aluminium, 0);
    assert_eq!(summary.stats.recycle_other, 0);
    assert_eq!(summary.stats.total_points, 1);
    assert!(summary.stats.last_activity.is_some());
}

#[tokio::test]
async fn test_manual_entry_volume_tiers() {
    let (_dir, pool) = setup().await;

    let small = ledger::award_manual(&pool, "user-1", "plastic", 400)
        .await
        .unwrap();
    assert_eq!(small.points_awarded, 1);

    let medium = ledger::award_manual(&pool, "user-1", "plastic", 700)
        .await
        .unwrap();
    assert_eq!(medium.points_awarded, 2);

    let large = ledger::award_manual(&pool, "user-1", "plastic", 1500)
        .await
        .unwrap();
    assert_eq!(large.points_awarded, 3);

    assert_eq!(large.stats.total_points, 1 + 2 + 3);
    assert_eq!(large.stats.recycle_plastic, 3);
}

#[tokio::test]
async fn test_items_recycled_equals_stat_sum_after_every_award() {
    let (_dir, pool) = setup().await;

    ledger::award_sensor_confirmed(&pool, "user-1", "glass")
        .await
        .unwrap();
    let user = db::get_user(&pool, "user-1").await.unwrap().unwrap();
    assert_eq!(user.items_recycled, user.recycled_sum());

    ledger::award_manual(&pool, "user-1", "plastic", 400)
        .await
        .unwrap();
    let user = db::get_user(&pool, "user-1").await.unwrap().unwrap();
    assert_eq!(user.items_recycled, user.recycled_sum());

    ledger::award_manual(&pool, "user-1", "Aluminum", 1500)
        .await
        .unwrap();
    let user = db::get_user(&pool, "user-1").await.unwrap().unwrap();
    assert_eq!(user.items_recycled, user.recycled_sum());
    assert_eq!(user.items_recycled, 3);
}

#[tokio::test]
async fn test_aluminum_spellings_hit_the_same_counter() {
    let (_dir, pool) = setup().await;

    ledger::award_sensor_confirmed(&pool, "user-1", "Aluminum")
        .await
        .unwrap();
    ledger::award_sensor_confirmed(&pool, "user-1", "aluminium")
        .await
        .unwrap();

    let user = db::get_user(&pool, "user-1").await.unwrap().unwrap();
    assert_eq!(user.recycle_aluminium, 2);
    assert_eq!(user.recycle_other, 0);
}

#[tokio::test]
async fn test_award_for_missing_user_is_not_found() {
    let (_dir, pool) = setup().await;

    let err = ledger::award_sensor_confirmed(&pool, "ghost", "glass")
        .await
        .unwrap_err();
    assert!(matches!(err, sorti_hub::Error::NotFound(_)));
}

#[tokio::test]
async fn test_unknown_category_rejected_without_mutation() {
    let (_dir, pool) = setup().await;

    let err = ledger::award_sensor_confirmed(&pool, "user-1", "cardboard")
        .await
        .unwrap_err();
    assert!(matches!(err, sorti_hub::Error::Validation(_)));

    let user = db::get_user(&pool, "user-1").await.unwrap().unwrap();
    assert_eq!(user.total_points, 0);
    assert_eq!(user.items_recycled, 0);
}

#[tokio::test]
async fn test_non_positive_volume_rejected() {
    let (_dir, pool) = setup().await;

    let err = ledger::award_manual(&pool, "user-1", "plastic", 0)
        .await
        .unwrap_err();
    assert!(matches!(err, sorti_hub::Error::Validation(_)));
}

#[tokio::test]
async fn test_concurrent_awards_lose_no_updates() {
    let (_dir, pool) = setup().await;

    // Manual entries racing sensor-confirmed awards for the same user
    let mut handles = Vec::new();
    for i in 0..10 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                ledger::award_sensor_confirmed(&pool, "user-1", "glass").await
            } else {
                ledger::award_manual(&pool, "user-1", "plastic", 400).await
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let user = db::get_user(&pool, "user-1").await.unwrap().unwrap();
    assert_eq!(user.items_recycled, 10);
    assert_eq!(user.total_points, 10);
    assert_eq!(user.recycle_glass, 5);
    assert_eq!(user.recycle_plastic, 5);
    assert_eq!(user.items_recycled, user.recycled_sum());
}

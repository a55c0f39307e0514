//! Integration tests for the family leaderboard

use sorti_common::db::{self, init_database};
use sorti_hub::groups;
use sorti_hub::ledger;
use sorti_hub::Error;
use sqlx::SqlitePool;

async fn setup() -> (tempfile::TempDir, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("sorti.db")).await.unwrap();

    db::insert_group(&pool, "group-1", "The Levis").await.unwrap();
    db::insert_user(&pool, "user-1", "Dana", "Levi", "user", Some("group-1"))
        .await
        .unwrap();
    db::insert_user(&pool, "user-2", "Omer", "Levi", "admin", Some("group-1"))
        .await
        .unwrap();
    db::insert_user(&pool, "user-3", "Noa", "Cohen", "user", None)
        .await
        .unwrap();

    (dir, pool)
}

#[tokio::test]
async fn test_leaderboard_ranks_by_points_descending() {
    let (_dir, pool) = setup().await;

    // user-2 earns more than user-1
    ledger::award_manual(&pool, "user-1", "plastic", 400).await.unwrap();
    ledger::award_manual(&pool, "user-2", "glass", 1500).await.unwrap();
    ledger::award_manual(&pool, "user-2", "glass", 400).await.unwrap();

    let board = groups::leaderboard(&pool, "group-1").await.unwrap();
    assert_eq!(board.group.group_name, "The Levis");
    assert_eq!(board.members.len(), 2);
    assert_eq!(board.members[0].user_id, "user-2");
    assert_eq!(board.members[0].total_points, 4);
    assert_eq!(board.members[1].user_id, "user-1");
    assert_eq!(board.members[1].total_points, 1);
}

#[tokio::test]
async fn test_leaderboard_excludes_non_members() {
    let (_dir, pool) = setup().await;

    ledger::award_manual(&pool, "user-3", "glass", 1500).await.unwrap();

    let board = groups::leaderboard(&pool, "group-1").await.unwrap();
    assert!(board.members.iter().all(|m| m.user_id != "user-3"));
}

#[tokio::test]
async fn test_unknown_group_is_not_found() {
    let (_dir, pool) = setup().await;

    let err = groups::leaderboard(&pool, "group-nope").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

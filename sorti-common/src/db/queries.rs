//! Row-level helpers shared by the hub service and test setup

use crate::db::models::{Group, UserRecord};
use crate::Result;
use chrono::Utc;
use sqlx::SqlitePool;

/// Fetch a user's record, `None` if it does not exist
pub async fn get_user(pool: &SqlitePool, user_id: &str) -> Result<Option<UserRecord>> {
    let user = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Insert a fresh user record with zeroed stats
///
/// Account creation itself belongs to the identity provider; this exists for
/// seeding and tests.
pub async fn insert_user(
    pool: &SqlitePool,
    user_id: &str,
    first_name: &str,
    last_name: &str,
    role: &str,
    group_id: Option<&str>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO users (user_id, first_name, last_name, role, group_id, created_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(first_name)
    .bind(last_name)
    .bind(role)
    .bind(group_id)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

/// Fetch a group, `None` if it does not exist
pub async fn get_group(pool: &SqlitePool, group_id: &str) -> Result<Option<Group>> {
    let group = sqlx::query_as::<_, Group>("SELECT * FROM groups WHERE group_id = ?")
        .bind(group_id)
        .fetch_optional(pool)
        .await?;
    Ok(group)
}

/// Insert a family group
pub async fn insert_group(pool: &SqlitePool, group_id: &str, group_name: &str) -> Result<()> {
    sqlx::query("INSERT INTO groups (group_id, group_name, created_at) VALUES (?, ?, ?)")
        .bind(group_id)
        .bind(group_name)
        .bind(Utc::now())
        .execute(pool)
        .await?;
    Ok(())
}

/// Insert a bin row with a caller-chosen id
///
/// The admin creation path generates ids; fixed ids are used by hardware
/// provisioning and tests.
pub async fn insert_bin(pool: &SqlitePool, bin_id: &str, location: &str) -> Result<()> {
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO bins (bin_id, location, created_at, last_update) VALUES (?, ?, ?, ?)",
    )
    .bind(bin_id)
    .bind(location)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

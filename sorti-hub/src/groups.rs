//! Family group leaderboard

use serde::Serialize;
use sorti_common::db::{self, Group, UserRecord};
use sqlx::SqlitePool;

use crate::error::{Error, Result};

/// A group and its members ranked by points
#[derive(Debug, Clone, Serialize)]
pub struct Leaderboard {
    pub group: Group,
    /// Members sorted by total points, best first
    pub members: Vec<UserRecord>,
}

/// Compute a group's leaderboard.
///
/// Rank is always recomputed from the member rows on read, never persisted,
/// so it cannot go stale.
pub async fn leaderboard(db: &SqlitePool, group_id: &str) -> Result<Leaderboard> {
    let group = db::get_group(db, group_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("group {}", group_id)))?;

    let mut members = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE group_id = ?")
        .bind(group_id)
        .fetch_all(db)
        .await?;

    members.sort_by(|a, b| b.total_points.cmp(&a.total_points));

    Ok(Leaderboard { group, members })
}

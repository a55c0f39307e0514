//! Points ledger: atomic stat and point mutations
//!
//! Both award paths funnel into a single UPDATE statement, so the
//! read-modify-write is atomic per user: a manual entry racing a
//! sensor-confirmed award cannot lose an update.

use chrono::Utc;
use serde::Serialize;
use sorti_common::db::{self, UserRecord};
use sorti_common::WasteCategory;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{Error, Result};

/// Flat award for a sensor-confirmed item; the sensor reports no volume.
pub const SENSOR_CONFIRMED_POINTS: i64 = 1;

/// Points for a manually entered container, tiered by volume in millilitres.
pub fn manual_entry_points(volume_ml: i64) -> i64 {
    if volume_ml < 500 {
        1
    } else if volume_ml < 1000 {
        2
    } else {
        3
    }
}

/// Result of a successful award
#[derive(Debug, Clone, Serialize)]
pub struct AwardSummary {
    pub category: WasteCategory,
    pub points_awarded: i64,
    /// Stats record after the award
    pub stats: UserRecord,
}

/// Credit a sensor-confirmed item: flat 1 point.
pub async fn award_sensor_confirmed(
    db: &SqlitePool,
    user_id: &str,
    label: &str,
) -> Result<AwardSummary> {
    let category = parse_category(label)?;
    apply_award(db, user_id, category, SENSOR_CONFIRMED_POINTS).await
}

/// Credit a manually entered container: volume-tiered points.
///
/// Kept as a separate policy from the sensor path; the two are not unified.
pub async fn award_manual(
    db: &SqlitePool,
    user_id: &str,
    label: &str,
    volume_ml: i64,
) -> Result<AwardSummary> {
    if volume_ml <= 0 {
        return Err(Error::Validation(format!(
            "volume must be positive, got {}",
            volume_ml
        )));
    }
    let category = parse_category(label)?;
    apply_award(db, user_id, category, manual_entry_points(volume_ml)).await
}

fn parse_category(label: &str) -> Result<WasteCategory> {
    WasteCategory::parse(label)
        .ok_or_else(|| Error::Validation(format!("unknown waste category: {}", label)))
}

async fn apply_award(
    db: &SqlitePool,
    user_id: &str,
    category: WasteCategory,
    points: i64,
) -> Result<AwardSummary> {
    let column = stat_column(category);
    let sql = format!(
        "UPDATE users SET {col} = {col} + 1, items_recycled = items_recycled + 1, \
         total_points = total_points + ?, last_activity = ? WHERE user_id = ?",
        col = column
    );

    let result = sqlx::query(&sql)
        .bind(points)
        .bind(Utc::now())
        .bind(user_id)
        .execute(db)
        .await?;

    // Missing user record is fatal for this call; the user must re-authenticate.
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("user {}", user_id)));
    }

    let stats = db::get_user(db, user_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("user {}", user_id)))?;

    info!(
        "Awarded {} point(s) to user {} for {}",
        points, user_id, category
    );

    Ok(AwardSummary {
        category,
        points_awarded: points,
        stats,
    })
}

fn stat_column(category: WasteCategory) -> &'static str {
    match category {
        WasteCategory::Plastic => "recycle_plastic",
        WasteCategory::Glass => "recycle_glass",
        WasteCategory::Aluminium => "recycle_aluminium",
        WasteCategory::Other => "recycle_other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_entry_points_tiers() {
        assert_eq!(manual_entry_points(1), 1);
        assert_eq!(manual_entry_points(400), 1);
        assert_eq!(manual_entry_points(499), 1);
        assert_eq!(manual_entry_points(500), 2);
        assert_eq!(manual_entry_points(700), 2);
        assert_eq!(manual_entry_points(999), 2);
        assert_eq!(manual_entry_points(1000), 3);
        assert_eq!(manual_entry_points(1500), 3);
    }

    #[test]
    fn test_stat_column_covers_all_categories() {
        for category in WasteCategory::ALL {
            assert!(stat_column(category).starts_with("recycle_"));
        }
    }
}

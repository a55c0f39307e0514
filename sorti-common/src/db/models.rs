//! Database models

use crate::waste::WasteCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bin occupancy state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum BinStatus {
    Available,
    Occupied,
}

impl std::fmt::Display for BinStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinStatus::Available => write!(f, "available"),
            BinStatus::Occupied => write!(f, "occupied"),
        }
    }
}

/// Per-category counters, used for bin fill levels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillLevels {
    #[serde(default)]
    pub plastic: i64,
    #[serde(default)]
    pub glass: i64,
    #[serde(default)]
    pub aluminium: i64,
    #[serde(default)]
    pub other: i64,
}

/// A physical receptacle
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bin {
    pub bin_id: String,
    pub status: BinStatus,
    /// User currently holding the bin; set only while occupied
    pub current_user: Option<String>,
    pub location: String,
    pub admin_notes: String,
    pub fill_plastic: i64,
    pub fill_glass: i64,
    pub fill_aluminium: i64,
    pub fill_other: i64,
    pub created_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
}

impl Bin {
    /// Advisory fill levels as one value
    pub fn fill_levels(&self) -> FillLevels {
        FillLevels {
            plastic: self.fill_plastic,
            glass: self.fill_glass,
            aluminium: self.fill_aluminium,
            other: self.fill_other,
        }
    }
}

/// A user's stats record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRecord {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub group_id: Option<String>,
    pub recycle_plastic: i64,
    pub recycle_glass: i64,
    pub recycle_aluminium: i64,
    pub recycle_other: i64,
    pub total_points: i64,
    pub items_recycled: i64,
    pub last_activity: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Counter for one category
    pub fn stat(&self, category: WasteCategory) -> i64 {
        match category {
            WasteCategory::Plastic => self.recycle_plastic,
            WasteCategory::Glass => self.recycle_glass,
            WasteCategory::Aluminium => self.recycle_aluminium,
            WasteCategory::Other => self.recycle_other,
        }
    }

    /// Sum of all category counters; equals `items_recycled` after every
    /// successful award.
    pub fn recycled_sum(&self) -> i64 {
        self.recycle_plastic + self.recycle_glass + self.recycle_aluminium + self.recycle_other
    }
}

/// A family group
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub group_id: String,
    pub group_name: String,
    pub created_at: DateTime<Utc>,
}

/// An appended correction report, queued for human review
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CorrectionReport {
    pub alert_id: String,
    pub bin_id: String,
    pub user_id: String,
    pub original_identification: String,
    pub corrected_identification: String,
    pub message: String,
    pub alert_type: String,
    /// Flipped by the external moderation workflow, never by this service
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}

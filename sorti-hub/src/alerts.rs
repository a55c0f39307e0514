//! Correction sink: append-only record of disputed identifications
//!
//! Reports are never mutated here; an external moderation workflow resolves
//! them later.

use chrono::Utc;
use sorti_common::db::CorrectionReport;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::Result;

/// Alert type tag for correction reports
pub const SENSOR_ERROR: &str = "sensor_error";

/// Append a correction report for a disputed identification.
///
/// Failure propagates to the caller so the correction can be retried; it is
/// never silently dropped.
pub async fn report(
    db: &SqlitePool,
    bin_id: &str,
    user_id: &str,
    original: &str,
    corrected: &str,
) -> Result<CorrectionReport> {
    let report = CorrectionReport {
        alert_id: Uuid::new_v4().to_string(),
        bin_id: bin_id.to_string(),
        user_id: user_id.to_string(),
        original_identification: original.to_string(),
        corrected_identification: corrected.to_string(),
        message: format!("User corrected '{}' to '{}'", original, corrected),
        alert_type: SENSOR_ERROR.to_string(),
        resolved: false,
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO alerts (alert_id, bin_id, user_id, original_identification, \
         corrected_identification, message, alert_type, resolved, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&report.alert_id)
    .bind(&report.bin_id)
    .bind(&report.user_id)
    .bind(&report.original_identification)
    .bind(&report.corrected_identification)
    .bind(&report.message)
    .bind(&report.alert_type)
    .bind(report.resolved)
    .bind(report.created_at)
    .execute(db)
    .await?;

    info!(
        "Correction filed for bin {}: '{}' -> '{}'",
        bin_id, original, corrected
    );
    Ok(report)
}

/// Unresolved reports for the moderation queue, oldest first
pub async fn list_unresolved(db: &SqlitePool) -> Result<Vec<CorrectionReport>> {
    let reports = sqlx::query_as::<_, CorrectionReport>(
        "SELECT * FROM alerts WHERE resolved = 0 ORDER BY created_at ASC",
    )
    .fetch_all(db)
    .await?;
    Ok(reports)
}

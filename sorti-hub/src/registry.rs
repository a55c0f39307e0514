//! Bin registry: occupancy arbitration and bin inventory access
//!
//! The registry is the sole writer of a bin's `status`/`current_user` pair,
//! always mutating both together. Claiming uses a guarded UPDATE so that two
//! users racing for the same bin resolve to exactly one winner; the loser
//! gets a clean rejection and never mutates state.

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sorti_common::db::{Bin, FillLevels};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Outcome of a claim attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// This caller now holds the bin
    Claimed,
    /// Another session holds the bin; nothing was changed
    AlreadyOccupied,
    /// No such bin; surfaced to the user, never retried
    NotFound,
}

/// Claim exclusive occupancy of a bin for a user.
///
/// The status guard in the UPDATE makes the claim atomic: of any number of
/// concurrent callers, exactly one affects a row.
pub async fn claim(db: &SqlitePool, bin_id: &str, user_id: &str) -> Result<ClaimOutcome> {
    let result = sqlx::query(
        "UPDATE bins SET status = 'occupied', current_user = ?, last_update = ? \
         WHERE bin_id = ? AND status = 'available'",
    )
    .bind(user_id)
    .bind(Utc::now())
    .bind(bin_id)
    .execute(db)
    .await?;

    if result.rows_affected() == 1 {
        info!("Bin {} claimed by user {}", bin_id, user_id);
        return Ok(ClaimOutcome::Claimed);
    }

    // Lost the race, or the bin does not exist; a point read tells them apart.
    let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM bins WHERE bin_id = ?")
        .bind(bin_id)
        .fetch_optional(db)
        .await?;

    if exists.is_some() {
        debug!("Claim on {} rejected: already occupied", bin_id);
        Ok(ClaimOutcome::AlreadyOccupied)
    } else {
        Ok(ClaimOutcome::NotFound)
    }
}

/// Release a bin back to available.
///
/// Idempotent: releasing an already-available bin is a no-op success, because
/// a session teardown may race a timeout sweep doing the same thing.
pub async fn release(db: &SqlitePool, bin_id: &str) -> Result<()> {
    let result = sqlx::query(
        "UPDATE bins SET status = 'available', current_user = NULL, last_update = ? \
         WHERE bin_id = ?",
    )
    .bind(Utc::now())
    .bind(bin_id)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("bin {}", bin_id)));
    }

    debug!("Bin {} released", bin_id);
    Ok(())
}

/// Point read of a single bin
pub async fn read(db: &SqlitePool, bin_id: &str) -> Result<Bin> {
    sqlx::query_as::<_, Bin>("SELECT * FROM bins WHERE bin_id = ?")
        .bind(bin_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| Error::NotFound(format!("bin {}", bin_id)))
}

/// All registered bins, newest first
pub async fn list(db: &SqlitePool) -> Result<Vec<Bin>> {
    let bins = sqlx::query_as::<_, Bin>("SELECT * FROM bins ORDER BY created_at DESC")
        .fetch_all(db)
        .await?;
    Ok(bins)
}

/// Create a bin with a generated id (admin workflow)
pub async fn create(db: &SqlitePool, location: &str, admin_notes: &str) -> Result<Bin> {
    let bin_id = generate_bin_id();
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO bins (bin_id, location, admin_notes, created_at, last_update) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&bin_id)
    .bind(location)
    .bind(admin_notes)
    .bind(now)
    .bind(now)
    .execute(db)
    .await?;

    info!("Created bin {} at '{}'", bin_id, location);
    read(db, &bin_id).await
}

/// Record fill levels pushed by the bin-side hardware, stamping `last_update`.
///
/// The core never computes these; they are advisory display counters.
pub async fn record_fill_levels(db: &SqlitePool, bin_id: &str, levels: &FillLevels) -> Result<()> {
    let result = sqlx::query(
        "UPDATE bins SET fill_plastic = ?, fill_glass = ?, fill_aluminium = ?, \
         fill_other = ?, last_update = ? WHERE bin_id = ?",
    )
    .bind(levels.plastic)
    .bind(levels.glass)
    .bind(levels.aluminium)
    .bind(levels.other)
    .bind(Utc::now())
    .bind(bin_id)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("bin {}", bin_id)));
    }
    Ok(())
}

/// Zero a bin's fill levels (admin reset after emptying)
pub async fn reset_fill_levels(db: &SqlitePool, bin_id: &str) -> Result<()> {
    record_fill_levels(db, bin_id, &FillLevels::default()).await
}

/// Generated ids keep the `bin_` prefix so they stay scannable as bare QR
/// tokens.
fn generate_bin_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("bin_{}", suffix.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_scannable_tokens() {
        let id = generate_bin_id();
        assert!(id.starts_with("bin_"));
        assert_eq!(id.len(), "bin_".len() + 8);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = generate_bin_id();
        let b = generate_bin_id();
        assert_ne!(a, b);
    }
}

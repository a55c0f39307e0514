//! Database initialization
//!
//! Opens (creating if missing) the SQLite database and brings the schema up
//! idempotently. Schema creation is safe to run on every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL mode allows concurrent readers with one writer; claim/award traffic
    // from multiple sessions hits the same file.
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    // Back off instead of failing when a writer holds the file
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    // Schema creation (idempotent - safe to call multiple times)
    create_bins_table(&pool).await?;
    create_users_table(&pool).await?;
    create_groups_table(&pool).await?;
    create_alerts_table(&pool).await?;

    Ok(pool)
}

/// Create the bins table
///
/// `status`/`current_user` carry bin occupancy: `current_user` is non-NULL
/// exactly when `status` is 'occupied'. The fill_* columns are advisory
/// display counters written by the bin-side hardware.
async fn create_bins_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bins (
            bin_id TEXT PRIMARY KEY,
            status TEXT NOT NULL DEFAULT 'available',
            current_user TEXT,
            location TEXT NOT NULL DEFAULT '',
            admin_notes TEXT NOT NULL DEFAULT '',
            fill_plastic INTEGER NOT NULL DEFAULT 0,
            fill_glass INTEGER NOT NULL DEFAULT 0,
            fill_aluminium INTEGER NOT NULL DEFAULT 0,
            fill_other INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            last_update TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Create the users table
///
/// Identity fields (name, role) are owned by the external identity provider;
/// the stats columns are owned by the points ledger.
async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            user_id TEXT PRIMARY KEY,
            first_name TEXT NOT NULL DEFAULT '',
            last_name TEXT NOT NULL DEFAULT '',
            role TEXT NOT NULL DEFAULT 'user',
            group_id TEXT,
            recycle_plastic INTEGER NOT NULL DEFAULT 0,
            recycle_glass INTEGER NOT NULL DEFAULT 0,
            recycle_aluminium INTEGER NOT NULL DEFAULT 0,
            recycle_other INTEGER NOT NULL DEFAULT 0,
            total_points INTEGER NOT NULL DEFAULT 0,
            items_recycled INTEGER NOT NULL DEFAULT 0,
            last_activity TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Create the groups table (family groups for the leaderboard)
async fn create_groups_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS groups (
            group_id TEXT PRIMARY KEY,
            group_name TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Create the alerts table (append-only correction reports)
async fn create_alerts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS alerts (
            alert_id TEXT PRIMARY KEY,
            bin_id TEXT NOT NULL,
            user_id TEXT NOT NULL DEFAULT '',
            original_identification TEXT NOT NULL DEFAULT '',
            corrected_identification TEXT NOT NULL DEFAULT '',
            message TEXT NOT NULL DEFAULT '',
            alert_type TEXT NOT NULL,
            resolved INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

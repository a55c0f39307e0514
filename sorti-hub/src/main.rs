//! SortiMate Hub - Main entry point
//!
//! Backend service for the SortiMate recycling tracker: bin occupancy,
//! the recycling-session protocol, point awards and the family leaderboard.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sorti_common::events::EventBus;
use sorti_hub::api::{self, AppContext};
use sorti_hub::feed::IdentificationFeed;
use sorti_hub::session::SessionManager;

/// Command-line arguments for sorti-hub
#[derive(Parser, Debug)]
#[command(name = "sorti-hub")]
#[command(about = "Recycling session hub for SortiMate smart bins")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5830", env = "SORTI_HUB_PORT")]
    port: u16,

    /// Path to the SQLite database
    #[arg(short, long, env = "SORTI_DB")]
    database: Option<PathBuf>,

    /// Seconds of inactivity before an open session is reclaimed
    #[arg(long, default_value = "120", env = "SORTI_SESSION_TIMEOUT_SECS")]
    session_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sorti_hub=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting SortiMate hub on port {}", args.port);

    let db_path = sorti_common::config::resolve_database_path(args.database.as_deref(), "SORTI_DB")
        .context("Failed to resolve database path")?;
    info!("Database: {}", db_path.display());

    let db = sorti_common::db::init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let events = Arc::new(EventBus::new(1000));
    let feed = Arc::new(IdentificationFeed::new(256));
    let sessions = Arc::new(SessionManager::new(
        db.clone(),
        Arc::clone(&events),
        Arc::clone(&feed),
        Duration::from_secs(args.session_timeout_secs),
    ));

    // Reclaims bins whose users walked away
    sessions.spawn_idle_sweeper();

    let ctx = AppContext {
        db,
        events,
        feed,
        sessions,
    };

    api::run(args.port, ctx).await.context("HTTP server failed")?;

    info!("Shutdown complete");
    Ok(())
}

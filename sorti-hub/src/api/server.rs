//! HTTP server setup and routing
//!
//! Sets up the Axum server with routes for the session protocol, sensor
//! ingest, bin administration, stats and SSE.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use sorti_common::events::EventBus;
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::api::{handlers, sse};
use crate::error::Result;
use crate::feed::IdentificationFeed;
use crate::session::SessionManager;

/// Shared application context passed to all handlers
///
/// AppContext implements Clone, which gives us `FromRef<AppContext>` for free
/// via Axum's blanket implementation.
#[derive(Clone)]
pub struct AppContext {
    pub db: SqlitePool,
    pub events: Arc<EventBus>,
    pub feed: Arc<IdentificationFeed>,
    pub sessions: Arc<SessionManager>,
}

/// Run the HTTP API server until shutdown is requested
pub async fn run(port: u16, ctx: AppContext) -> Result<()> {
    let app = router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("HTTP API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Build the full route table
pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/events/stream", get(sse::event_stream))
        // Sensor-facing ingest
        .route("/ingest/identification", post(handlers::ingest_identification))
        .route("/ingest/simulate", post(handlers::simulate_identification))
        // Session protocol
        .route("/session/start", post(handlers::start_session))
        .route("/session/confirm", post(handlers::confirm_session))
        .route("/session/reject", post(handlers::reject_session))
        .route("/session/correction", post(handlers::submit_correction))
        .route("/session/correction/cancel", post(handlers::cancel_correction))
        .route("/session/abandon", post(handlers::abandon_session))
        .route("/session/:user_id", get(handlers::session_snapshot))
        // Manual entry
        .route("/recycle/manual", post(handlers::manual_entry))
        // Bin inventory
        .route("/bins", get(handlers::list_bins).post(handlers::create_bin))
        .route("/bins/:bin_id", get(handlers::get_bin))
        .route("/bins/:bin_id/reset", post(handlers::reset_bin))
        // Stats and leaderboard
        .route("/users/:user_id/stats", get(handlers::user_stats))
        .route("/groups/:group_id/leaderboard", get(handlers::group_leaderboard))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install shutdown handler: {}", err);
    }
    info!("Shutdown requested");
}

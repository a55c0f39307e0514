//! HTTP request handlers
//!
//! Implements the REST endpoints for the session protocol, sensor ingest,
//! bin administration and stats.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sorti_common::db::{self, Bin, CorrectionReport, UserRecord};
use sorti_common::events::RecyclingEvent;
use sorti_common::WasteCategory;
use tracing::{error, info};

use crate::api::server::AppContext;
use crate::error::Error;
use crate::feed::IdentificationEvent;
use crate::groups::{self, Leaderboard};
use crate::identity::Identity;
use crate::ledger::{self, AwardSummary};
use crate::qr;
use crate::registry;
use crate::session::{ConfirmOutcome, SessionSnapshot};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    user_id: String,
    /// Raw scanned payload; all three QR encodings are accepted
    code: String,
}

#[derive(Debug, Deserialize)]
pub struct UserRequest {
    user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CorrectionRequest {
    user_id: String,
    corrected_type: String,
}

#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    award: Option<AwardSummary>,
}

#[derive(Debug, Deserialize)]
pub struct ManualEntryRequest {
    user_id: String,
    waste_type: String,
    volume_ml: i64,
}

#[derive(Debug, Deserialize)]
pub struct SimulateRequest {
    user_id: String,
    waste_type: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateBinRequest {
    user_id: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    admin_notes: String,
}

#[derive(Debug, Serialize)]
pub struct BinListResponse {
    bins: Vec<Bin>,
}

/// Map a hub error onto an HTTP status with a JSON body
type ApiError = (StatusCode, Json<StatusResponse>);

fn error_response(err: Error) -> ApiError {
    let code = match &err {
        Error::Conflict(_) => StatusCode::CONFLICT,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Validation(_) | Error::InvalidState(_) => StatusCode::BAD_REQUEST,
        Error::Forbidden(_) => StatusCode::FORBIDDEN,
        _ => {
            error!("Internal error: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        code,
        Json(StatusResponse {
            status: err.to_string(),
        }),
    )
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "sorti_hub".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Sensor Ingest Endpoints
// ============================================================================

/// POST /ingest/identification - Sensor push of a classification event
///
/// Validates the payload, records the reported fill levels on the bin, then
/// publishes the event to whichever session is listening on that bin.
pub async fn ingest_identification(
    State(ctx): State<AppContext>,
    Json(event): Json<IdentificationEvent>,
) -> Result<Json<StatusResponse>, ApiError> {
    if !(0.0..=1.0).contains(&event.confidence) {
        return Err(error_response(Error::Validation(format!(
            "confidence out of range: {}",
            event.confidence
        ))));
    }
    if !event.is_error && WasteCategory::parse(&event.waste_type).is_none() {
        return Err(error_response(Error::Validation(format!(
            "unknown waste category: {}",
            event.waste_type
        ))));
    }

    if let Some(levels) = &event.fill_levels_after {
        registry::record_fill_levels(&ctx.db, &event.bin_id, levels)
            .await
            .map_err(error_response)?;
        ctx.events.emit_lossy(RecyclingEvent::BinFillUpdated {
            bin_id: event.bin_id.clone(),
            plastic: levels.plastic,
            glass: levels.glass,
            aluminium: levels.aluminium,
            other: levels.other,
            timestamp: Utc::now(),
        });
    }

    info!(
        "Ingested identification for bin {}: {}",
        event.bin_id,
        if event.is_error { "error" } else { event.waste_type.as_str() }
    );
    ctx.feed.publish(event);

    Ok(Json(StatusResponse {
        status: "accepted".to_string(),
    }))
}

/// POST /ingest/simulate - Admin demo: synthesize an identification
///
/// Lets an admin exercise the confirmation flow without a physical sensor.
/// The event is handed straight to the caller's own session.
pub async fn simulate_identification(
    State(ctx): State<AppContext>,
    Json(req): Json<SimulateRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let identity = Identity::load(&ctx.db, &req.user_id)
        .await
        .map_err(error_response)?;
    if !identity.is_admin() {
        return Err(error_response(Error::Forbidden(
            "simulated identification requires the admin role".to_string(),
        )));
    }
    if WasteCategory::parse(&req.waste_type).is_none() {
        return Err(error_response(Error::Validation(format!(
            "unknown waste category: {}",
            req.waste_type
        ))));
    }

    let snapshot = ctx
        .sessions
        .snapshot(&req.user_id)
        .await
        .map_err(error_response)?;

    let event = IdentificationEvent {
        bin_id: snapshot.bin_id.clone(),
        user_id: Some(req.user_id.clone()),
        waste_type: req.waste_type.to_lowercase(),
        confidence: 0.95,
        is_error: false,
        error_message: None,
        latency_ms: Some(25),
        fill_levels_after: None,
        timestamp: Utc::now(),
    };
    ctx.sessions.deliver(&req.user_id, event).await;

    ctx.sessions
        .snapshot(&req.user_id)
        .await
        .map(Json)
        .map_err(error_response)
}

// ============================================================================
// Session Protocol Endpoints
// ============================================================================

/// POST /session/start - Claim a bin from a scanned payload
pub async fn start_session(
    State(ctx): State<AppContext>,
    Json(req): Json<StartSessionRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let bin_id = qr::parse_bin_id(&req.code).ok_or_else(|| {
        error_response(Error::Validation(
            "invalid code: not a recognized bin QR payload".to_string(),
        ))
    })?;

    let identity = Identity::load(&ctx.db, &req.user_id)
        .await
        .map_err(error_response)?;

    ctx.sessions
        .start(identity, &bin_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// GET /session/:user_id - Session snapshot for the UI
pub async fn session_snapshot(
    State(ctx): State<AppContext>,
    Path(user_id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    ctx.sessions
        .snapshot(&user_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /session/confirm - Confirm the pending identification
pub async fn confirm_session(
    State(ctx): State<AppContext>,
    Json(req): Json<UserRequest>,
) -> Result<Json<ConfirmResponse>, ApiError> {
    match ctx.sessions.confirm(&req.user_id).await {
        Ok(ConfirmOutcome::Awarded(summary)) => Ok(Json(ConfirmResponse {
            status: "awarded".to_string(),
            award: Some(summary),
        })),
        Ok(ConfirmOutcome::AlreadyProcessing) => Ok(Json(ConfirmResponse {
            status: "processing".to_string(),
            award: None,
        })),
        Err(err) => Err(error_response(err)),
    }
}

/// POST /session/reject - Dispute the identification, open the correction picker
pub async fn reject_session(
    State(ctx): State<AppContext>,
    Json(req): Json<UserRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    ctx.sessions
        .reject(&req.user_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /session/correction - File the corrected label
pub async fn submit_correction(
    State(ctx): State<AppContext>,
    Json(req): Json<CorrectionRequest>,
) -> Result<Json<CorrectionReport>, ApiError> {
    ctx.sessions
        .submit_correction(&req.user_id, &req.corrected_type)
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /session/correction/cancel - Back to the confirmation prompt
pub async fn cancel_correction(
    State(ctx): State<AppContext>,
    Json(req): Json<UserRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    ctx.sessions
        .cancel_correction(&req.user_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /session/abandon - Leave the bin
pub async fn abandon_session(
    State(ctx): State<AppContext>,
    Json(req): Json<UserRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    ctx.sessions
        .abandon(&req.user_id)
        .await
        .map_err(error_response)?;
    Ok(Json(StatusResponse {
        status: "ok".to_string(),
    }))
}

// ============================================================================
// Manual Entry Endpoint
// ============================================================================

/// POST /recycle/manual - Manually entered container, volume-tiered points
pub async fn manual_entry(
    State(ctx): State<AppContext>,
    Json(req): Json<ManualEntryRequest>,
) -> Result<Json<AwardSummary>, ApiError> {
    let summary = ledger::award_manual(&ctx.db, &req.user_id, &req.waste_type, req.volume_ml)
        .await
        .map_err(error_response)?;

    ctx.events.emit_lossy(RecyclingEvent::PointsAwarded {
        user_id: req.user_id.clone(),
        waste_type: summary.category.to_string(),
        points: summary.points_awarded,
        total_points: summary.stats.total_points,
        timestamp: Utc::now(),
    });

    Ok(Json(summary))
}

// ============================================================================
// Bin Inventory Endpoints
// ============================================================================

/// POST /bins - Create a bin with a generated id (admin only)
pub async fn create_bin(
    State(ctx): State<AppContext>,
    Json(req): Json<CreateBinRequest>,
) -> Result<Json<Bin>, ApiError> {
    let identity = Identity::load(&ctx.db, &req.user_id)
        .await
        .map_err(error_response)?;
    if !identity.is_admin() {
        return Err(error_response(Error::Forbidden(
            "bin creation requires the admin role".to_string(),
        )));
    }

    registry::create(&ctx.db, &req.location, &req.admin_notes)
        .await
        .map(Json)
        .map_err(error_response)
}

/// GET /bins - All registered bins
pub async fn list_bins(State(ctx): State<AppContext>) -> Result<Json<BinListResponse>, ApiError> {
    registry::list(&ctx.db)
        .await
        .map(|bins| Json(BinListResponse { bins }))
        .map_err(error_response)
}

/// GET /bins/:bin_id - Point read of a bin
pub async fn get_bin(
    State(ctx): State<AppContext>,
    Path(bin_id): Path<String>,
) -> Result<Json<Bin>, ApiError> {
    registry::read(&ctx.db, &bin_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /bins/:bin_id/reset - Zero a bin's fill levels after emptying (admin only)
pub async fn reset_bin(
    State(ctx): State<AppContext>,
    Path(bin_id): Path<String>,
    Json(req): Json<UserRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let identity = Identity::load(&ctx.db, &req.user_id)
        .await
        .map_err(error_response)?;
    if !identity.is_admin() {
        return Err(error_response(Error::Forbidden(
            "bin reset requires the admin role".to_string(),
        )));
    }

    registry::reset_fill_levels(&ctx.db, &bin_id)
        .await
        .map_err(error_response)?;
    Ok(Json(StatusResponse {
        status: "ok".to_string(),
    }))
}

// ============================================================================
// Stats Endpoints
// ============================================================================

/// GET /users/:user_id/stats - A user's stats record
pub async fn user_stats(
    State(ctx): State<AppContext>,
    Path(user_id): Path<String>,
) -> Result<Json<UserRecord>, ApiError> {
    let user = db::get_user(&ctx.db, &user_id)
        .await
        .map_err(|e| error_response(e.into()))?
        .ok_or_else(|| error_response(Error::NotFound(format!("user {}", user_id))))?;
    Ok(Json(user))
}

/// GET /groups/:group_id/leaderboard - Family leaderboard, best first
pub async fn group_leaderboard(
    State(ctx): State<AppContext>,
    Path(group_id): Path<String>,
) -> Result<Json<Leaderboard>, ApiError> {
    groups::leaderboard(&ctx.db, &group_id)
        .await
        .map(Json)
        .map_err(error_response)
}

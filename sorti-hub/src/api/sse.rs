//! Server-Sent Events (SSE) broadcaster
//!
//! Streams live session and bin events to connected clients.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::{Stream, StreamExt};
use sorti_common::events::RecyclingEvent;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

use crate::api::server::AppContext;

/// GET /events/stream - SSE event stream
pub async fn event_stream(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("New SSE client connected");

    let rx = ctx.events.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => {
                    let event_type = event_type_str(&event);
                    debug!("Broadcasting SSE event: {}", event_type);
                    Some(Ok(Event::default().event(event_type).data(json)))
                }
                Err(e) => {
                    warn!("Failed to serialize event: {}", e);
                    None
                }
            },
            Err(e) => {
                // BroadcastStream error (lagged or closed)
                warn!("SSE stream error: {:?}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Extract the SSE event field from a RecyclingEvent
fn event_type_str(event: &RecyclingEvent) -> &'static str {
    match event {
        RecyclingEvent::SessionStarted { .. } => "SessionStarted",
        RecyclingEvent::IdentificationPending { .. } => "IdentificationPending",
        RecyclingEvent::SensorFault { .. } => "SensorFault",
        RecyclingEvent::PointsAwarded { .. } => "PointsAwarded",
        RecyclingEvent::CorrectionFiled { .. } => "CorrectionFiled",
        RecyclingEvent::SessionClosed { .. } => "SessionClosed",
        RecyclingEvent::BinFillUpdated { .. } => "BinFillUpdated",
    }
}

//! Event types for the SortiMate event system
//!
//! Provides the shared event definitions and the EventBus used to push live
//! session updates to connected clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// SortiMate event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission to
/// the frontend. All live updates use this central enum so consumers can match
/// exhaustively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RecyclingEvent {
    /// A user claimed a bin and is now waiting for the sensor.
    SessionStarted {
        bin_id: String,
        user_id: String,
        timestamp: DateTime<Utc>,
    },

    /// The sensor classified a deposited item; the user is asked to confirm.
    ///
    /// Re-emitted when a newer classification supersedes an unconfirmed one,
    /// so the prompt always shows the latest identification.
    IdentificationPending {
        bin_id: String,
        user_id: String,
        waste_type: String,
        /// Classifier confidence, 0.0-1.0
        confidence: f64,
        timestamp: DateTime<Utc>,
    },

    /// The sensor reported a failed classification for the user's bin.
    ///
    /// The session keeps waiting; a failed classification is never promoted
    /// to a confirmation prompt.
    SensorFault {
        bin_id: String,
        user_id: String,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Points were credited to a user's stats record.
    PointsAwarded {
        user_id: String,
        waste_type: String,
        points: i64,
        /// User's running total after the award
        total_points: i64,
        timestamp: DateTime<Utc>,
    },

    /// A user disputed the sensor's classification.
    CorrectionFiled {
        bin_id: String,
        user_id: String,
        original_identification: String,
        corrected_identification: String,
        timestamp: DateTime<Utc>,
    },

    /// A session ended and its bin was released.
    SessionClosed {
        bin_id: String,
        user_id: String,
        reason: SessionCloseReason,
        timestamp: DateTime<Utc>,
    },

    /// Bin-side hardware reported new fill levels.
    BinFillUpdated {
        bin_id: String,
        plastic: i64,
        glass: i64,
        aluminium: i64,
        other: i64,
        timestamp: DateTime<Utc>,
    },
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionCloseReason {
    /// User confirmed the identification and points were awarded
    Confirmed,
    /// User filed a correction report instead of confirming
    Corrected,
    /// User left the bin without completing the flow
    Abandoned,
    /// Idle sweeper reclaimed a stale session
    TimedOut,
}

impl std::fmt::Display for SessionCloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionCloseReason::Confirmed => write!(f, "confirmed"),
            SessionCloseReason::Corrected => write!(f, "corrected"),
            SessionCloseReason::Abandoned => write!(f, "abandoned"),
            SessionCloseReason::TimedOut => write!(f, "timedout"),
        }
    }
}

/// Central event distribution bus for application-wide events
///
/// Wraps tokio::broadcast, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RecyclingEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity.
    ///
    /// Older events are dropped for subscribers that fall more than
    /// `capacity` events behind.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events.
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<RecyclingEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers.
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if nobody is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: RecyclingEvent,
    ) -> std::result::Result<usize, broadcast::error::SendError<RecyclingEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring whether anyone is listening.
    ///
    /// Used for UI-facing notifications where a missing subscriber is normal
    /// (no browser connected).
    pub fn emit_lossy(&self, event: RecyclingEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of currently attached subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

//! Session controller: the per-user recycling state machine
//!
//! A session runs from bin claim to release: the user scans a bin, waits for
//! the sensor to identify the deposited item, then confirms (points awarded)
//! or disputes (correction filed) the identification. Transitions for one
//! session are serialized through its mutex; contention between sessions for
//! the same bin is arbitrated by the registry, never here.
//!
//! Sessions are purely in-memory and do not survive a restart. A crash
//! mid-session leaves the bin claimed until the idle sweeper or an admin
//! reclaims it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sorti_common::db::CorrectionReport;
use sorti_common::events::{EventBus, RecyclingEvent, SessionCloseReason};
use sqlx::SqlitePool;
use tokio::sync::{Mutex, RwLock};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::alerts;
use crate::error::{Error, Result};
use crate::feed::{IdentificationEvent, IdentificationFeed};
use crate::identity::Identity;
use crate::ledger::{self, AwardSummary};
use crate::registry::{self, ClaimOutcome};

/// Where a session stands in the scan -> identify -> confirm flow.
///
/// Idle is the absence of a session, not a variant: a user with no entry in
/// the manager's map has no session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Bin claimed, waiting for the sensor
    AwaitingIdentification,
    /// Identification received, waiting for the user's verdict
    Confirming,
    /// User rejected the identification and is choosing the correct label
    Correcting,
    /// Award in flight; entered only for the duration of the ledger call
    Awarding,
    /// Correction report in flight
    Disputing,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::AwaitingIdentification => write!(f, "awaiting_identification"),
            SessionState::Confirming => write!(f, "confirming"),
            SessionState::Correcting => write!(f, "correcting"),
            SessionState::Awarding => write!(f, "awarding"),
            SessionState::Disputing => write!(f, "disputing"),
        }
    }
}

/// Outcome of a confirm call
#[derive(Debug)]
pub enum ConfirmOutcome {
    /// Points were credited; the session is closed
    Awarded(AwardSummary),
    /// A retried confirm arrived while the award was in flight; ignored
    AlreadyProcessing,
}

/// Read-only view of a session for the UI
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub user_id: String,
    pub bin_id: String,
    pub state: SessionState,
    pub pending_identification: Option<IdentificationEvent>,
    pub started_at: DateTime<Utc>,
}

struct RecyclingSession {
    bin_id: String,
    identity: Identity,
    state: SessionState,
    pending_event: Option<IdentificationEvent>,
    started_at: DateTime<Utc>,
    last_transition: DateTime<Utc>,
    /// Set for the duration of the award so a retried confirm is ignored
    processing: bool,
    listener: Option<AbortHandle>,
}

impl RecyclingSession {
    fn touch(&mut self) {
        self.last_transition = Utc::now();
    }

    fn snapshot(&self, user_id: &str) -> SessionSnapshot {
        SessionSnapshot {
            user_id: user_id.to_string(),
            bin_id: self.bin_id.clone(),
            state: self.state,
            pending_identification: self.pending_event.clone(),
            started_at: self.started_at,
        }
    }
}

/// Owns every live session and drives all transitions
pub struct SessionManager {
    db: SqlitePool,
    events: Arc<EventBus>,
    feed: Arc<IdentificationFeed>,
    sessions: RwLock<HashMap<String, Arc<Mutex<RecyclingSession>>>>,
    session_timeout: Duration,
}

impl SessionManager {
    pub fn new(
        db: SqlitePool,
        events: Arc<EventBus>,
        feed: Arc<IdentificationFeed>,
        session_timeout: Duration,
    ) -> Self {
        Self {
            db,
            events,
            feed,
            sessions: RwLock::new(HashMap::new()),
            session_timeout,
        }
    }

    /// Start a session: claim the bin, open the feed listener.
    ///
    /// The identity snapshot is taken by the caller at the session boundary;
    /// no transition re-queries it.
    pub async fn start(self: &Arc<Self>, identity: Identity, bin_id: &str) -> Result<SessionSnapshot> {
        // One open session per user.
        if self.sessions.read().await.contains_key(&identity.user_id) {
            return Err(Error::Conflict(format!(
                "user {} already has an open session",
                identity.user_id
            )));
        }

        match registry::claim(&self.db, bin_id, &identity.user_id).await? {
            ClaimOutcome::Claimed => {}
            ClaimOutcome::AlreadyOccupied => {
                return Err(Error::Conflict(format!(
                    "bin {} is in use by another recycler",
                    bin_id
                )));
            }
            ClaimOutcome::NotFound => {
                return Err(Error::NotFound(format!("bin {}", bin_id)));
            }
        }

        let user_id = identity.user_id.clone();
        let now = Utc::now();
        let session = Arc::new(Mutex::new(RecyclingSession {
            bin_id: bin_id.to_string(),
            identity,
            state: SessionState::AwaitingIdentification,
            pending_event: None,
            started_at: now,
            last_transition: now,
            processing: false,
            listener: None,
        }));

        {
            let mut sessions = self.sessions.write().await;
            if sessions.contains_key(&user_id) {
                // Lost a same-user race after claiming; give the bin back.
                drop(sessions);
                registry::release(&self.db, bin_id).await.ok();
                return Err(Error::Conflict(format!(
                    "user {} already has an open session",
                    user_id
                )));
            }
            sessions.insert(user_id.clone(), Arc::clone(&session));
        }

        // Feed listener: the session's only long-lived suspension point.
        // Push-based; the controller never polls for sensor events.
        let mut subscription = self.feed.subscribe(bin_id, &user_id);
        let manager = Arc::clone(self);
        let listener_user = user_id.clone();
        let handle = tokio::spawn(async move {
            while let Some(event) = subscription.next().await {
                manager.deliver(&listener_user, event).await;
            }
        });
        session.lock().await.listener = Some(handle.abort_handle());

        info!("Session started: user {} on bin {}", user_id, bin_id);
        self.events.emit_lossy(RecyclingEvent::SessionStarted {
            bin_id: bin_id.to_string(),
            user_id: user_id.clone(),
            timestamp: Utc::now(),
        });

        let snapshot = session.lock().await.snapshot(&user_id);
        Ok(snapshot)
    }

    /// Hand a sensor event to a user's session.
    ///
    /// Called by the feed listener, and directly by the admin demo path,
    /// which synthesizes events without a real subscription. A newer
    /// classification supersedes an unconsumed one, so duplicate feed
    /// delivery is harmless. Events flagged as errors never become a
    /// confirmation prompt.
    pub async fn deliver(&self, user_id: &str, event: IdentificationEvent) {
        let Some(session) = self.get(user_id).await else {
            debug!("Dropping identification for {}: no open session", user_id);
            return;
        };
        let mut session = session.lock().await;

        match session.state {
            SessionState::AwaitingIdentification | SessionState::Confirming => {}
            // Mid-correction or mid-award the prompt must not move under the user.
            _ => return,
        }

        // The sensor's user attribution is advisory; the bin is what routes.
        if let Some(event_user) = &event.user_id {
            if event_user != &session.identity.user_id {
                debug!(
                    "Identification attributed to {} delivered to {}'s session on bin {}",
                    event_user, session.identity.user_id, session.bin_id
                );
            }
        }

        if event.is_error {
            let message = event
                .error_message
                .clone()
                .unwrap_or_else(|| "identification failed".to_string());
            warn!("Sensor fault on bin {}: {}", session.bin_id, message);
            self.events.emit_lossy(RecyclingEvent::SensorFault {
                bin_id: session.bin_id.clone(),
                user_id: user_id.to_string(),
                message,
                timestamp: Utc::now(),
            });
            return;
        }

        info!(
            "Identification for user {} on bin {}: {} ({:.0}%)",
            user_id,
            session.bin_id,
            event.waste_type,
            event.confidence * 100.0
        );

        self.events.emit_lossy(RecyclingEvent::IdentificationPending {
            bin_id: session.bin_id.clone(),
            user_id: user_id.to_string(),
            waste_type: event.waste_type.clone(),
            confidence: event.confidence,
            timestamp: Utc::now(),
        });

        session.pending_event = Some(event);
        session.state = SessionState::Confirming;
        session.touch();
    }

    /// Confirm the pending identification and credit points.
    ///
    /// Exactly-once per session: the processing guard makes a concurrent
    /// retry observe `AlreadyProcessing` and do nothing. On ledger failure
    /// the session stays in Confirming for a manual retry.
    pub async fn confirm(&self, user_id: &str) -> Result<ConfirmOutcome> {
        let session = self.require(user_id).await?;

        let (bin_id, pending) = {
            let mut s = session.lock().await;
            if s.processing {
                return Ok(ConfirmOutcome::AlreadyProcessing);
            }
            if s.state != SessionState::Confirming {
                return Err(Error::InvalidState(format!(
                    "cannot confirm from state {}",
                    s.state
                )));
            }
            let pending = s
                .pending_event
                .clone()
                .ok_or_else(|| Error::InvalidState("no pending identification".to_string()))?;
            s.processing = true;
            s.state = SessionState::Awarding;
            s.touch();
            (s.bin_id.clone(), pending)
        };

        match ledger::award_sensor_confirmed(&self.db, user_id, &pending.waste_type).await {
            Ok(summary) => {
                self.events.emit_lossy(RecyclingEvent::PointsAwarded {
                    user_id: user_id.to_string(),
                    waste_type: summary.category.to_string(),
                    points: summary.points_awarded,
                    total_points: summary.stats.total_points,
                    timestamp: Utc::now(),
                });
                self.close_session(user_id, SessionCloseReason::Confirmed).await;
                Ok(ConfirmOutcome::Awarded(summary))
            }
            Err(err) => {
                // All-or-nothing: no points were credited, so the session
                // returns to Confirming and the user may retry or dispute.
                let mut s = session.lock().await;
                s.processing = false;
                s.state = SessionState::Confirming;
                s.touch();
                Err(err)
            }
        }
    }

    /// Reject the pending identification and open the correction picker.
    pub async fn reject(&self, user_id: &str) -> Result<SessionSnapshot> {
        let session = self.require(user_id).await?;
        let mut s = session.lock().await;

        if s.state != SessionState::Confirming {
            return Err(Error::InvalidState(format!(
                "cannot reject from state {}",
                s.state
            )));
        }

        s.state = SessionState::Correcting;
        s.touch();
        Ok(s.snapshot(user_id))
    }

    /// File a correction report with the user-asserted label and close the
    /// session. No points are awarded on this path.
    pub async fn submit_correction(
        &self,
        user_id: &str,
        corrected: &str,
    ) -> Result<CorrectionReport> {
        let session = self.require(user_id).await?;

        let (bin_id, original) = {
            let mut s = session.lock().await;
            if s.state != SessionState::Correcting {
                return Err(Error::InvalidState(format!(
                    "cannot submit a correction from state {}",
                    s.state
                )));
            }
            // Validate before any mutation
            sorti_common::WasteCategory::parse(corrected).ok_or_else(|| {
                Error::Validation(format!("unknown waste category: {}", corrected))
            })?;
            let original = s
                .pending_event
                .as_ref()
                .map(|e| e.waste_type.clone())
                .ok_or_else(|| Error::InvalidState("no pending identification".to_string()))?;
            s.state = SessionState::Disputing;
            s.touch();
            (s.bin_id.clone(), original)
        };

        match alerts::report(&self.db, &bin_id, user_id, &original, corrected).await {
            Ok(report) => {
                self.events.emit_lossy(RecyclingEvent::CorrectionFiled {
                    bin_id: bin_id.clone(),
                    user_id: user_id.to_string(),
                    original_identification: original,
                    corrected_identification: corrected.to_string(),
                    timestamp: Utc::now(),
                });
                self.close_session(user_id, SessionCloseReason::Corrected).await;
                Ok(report)
            }
            Err(err) => {
                // The correction was not recorded; keep the session in
                // Correcting so the user can retry rather than lose it.
                let mut s = session.lock().await;
                s.state = SessionState::Correcting;
                s.touch();
                Err(err)
            }
        }
    }

    /// Return from the correction picker to the confirmation prompt without
    /// recording anything.
    pub async fn cancel_correction(&self, user_id: &str) -> Result<SessionSnapshot> {
        let session = self.require(user_id).await?;
        let mut s = session.lock().await;

        if s.state != SessionState::Correcting {
            return Err(Error::InvalidState(format!(
                "cannot cancel a correction from state {}",
                s.state
            )));
        }

        s.state = SessionState::Confirming;
        s.touch();
        Ok(s.snapshot(user_id))
    }

    /// Tear a session down from any state: release the bin (best-effort) and
    /// stop the feed listener. Safe to call when no session exists.
    pub async fn abandon(&self, user_id: &str) -> Result<()> {
        self.close_session(user_id, SessionCloseReason::Abandoned).await;
        Ok(())
    }

    /// Read-only view of a user's session
    pub async fn snapshot(&self, user_id: &str) -> Result<SessionSnapshot> {
        let session = self.require(user_id).await?;
        let s = session.lock().await;
        Ok(s.snapshot(user_id))
    }

    /// Number of live sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Abandon every session idle longer than the configured timeout.
    ///
    /// Keeps walked-away-from bins from staying claimed forever; the guest
    /// flow in particular never says goodbye.
    pub async fn sweep_idle(&self) {
        let Ok(timeout) = chrono::Duration::from_std(self.session_timeout) else {
            return;
        };
        let cutoff = Utc::now() - timeout;

        let mut stale = Vec::new();
        {
            let sessions = self.sessions.read().await;
            for (user_id, session) in sessions.iter() {
                let s = session.lock().await;
                if s.last_transition < cutoff && !s.processing {
                    stale.push(user_id.clone());
                }
            }
        }

        for user_id in stale {
            warn!("Sweeping idle session for user {}", user_id);
            self.close_session(&user_id, SessionCloseReason::TimedOut).await;
        }
    }

    /// Spawn the periodic idle sweep
    pub fn spawn_idle_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(30));
            loop {
                ticker.tick().await;
                manager.sweep_idle().await;
            }
        })
    }

    async fn get(&self, user_id: &str) -> Option<Arc<Mutex<RecyclingSession>>> {
        self.sessions.read().await.get(user_id).cloned()
    }

    async fn require(&self, user_id: &str) -> Result<Arc<Mutex<RecyclingSession>>> {
        self.get(user_id)
            .await
            .ok_or_else(|| Error::NotFound(format!("no open session for user {}", user_id)))
    }

    /// Remove the session and tear it down. Release failures are logged, not
    /// propagated: the bin stays claimed until the sweep or an admin reset.
    async fn close_session(&self, user_id: &str, reason: SessionCloseReason) {
        let Some(session) = self.sessions.write().await.remove(user_id) else {
            return;
        };

        let (bin_id, listener) = {
            let mut s = session.lock().await;
            (s.bin_id.clone(), s.listener.take())
        };

        if let Some(handle) = listener {
            handle.abort();
        }

        if let Err(err) = registry::release(&self.db, &bin_id).await {
            warn!("Failed to release bin {} ({}): {}", bin_id, reason, err);
        }

        info!("Session closed ({}): user {} off bin {}", reason, user_id, bin_id);
        self.events.emit_lossy(RecyclingEvent::SessionClosed {
            bin_id,
            user_id: user_id.to_string(),
            reason,
            timestamp: Utc::now(),
        });
    }
}

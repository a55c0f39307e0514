//! Identification feed: push channel from the bin-side sensor
//!
//! The sensor posts classification events over HTTP and the feed fans them
//! out to whichever session is listening on the matching bin. Delivery is
//! at-least-once: a broadcast receiver that lags may see an event again after
//! resubscribing, and consumers treat a newer event for the same bin as
//! superseding the previous one, so duplicates are harmless.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sorti_common::db::FillLevels;
use tokio::sync::broadcast;
use tracing::warn;

/// A single sensor classification, attributed to a bin and (advisorily) a
/// user. Ephemeral: consumed by the session controller's confirmation step
/// and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentificationEvent {
    pub bin_id: String,
    /// Whom the sensor believes the item belongs to; advisory only
    #[serde(default)]
    pub user_id: Option<String>,
    pub waste_type: String,
    /// Classifier confidence, 0.0-1.0
    #[serde(default)]
    pub confidence: f64,
    /// True when the classifier failed; `error_message` carries the reason
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub latency_ms: Option<i64>,
    /// Bin fill levels after the drop, as reported by the hardware
    #[serde(default)]
    pub fill_levels_after: Option<FillLevels>,
    pub timestamp: DateTime<Utc>,
}

/// Fan-out channel of sensor identifications
///
/// Push-based: consumers await events rather than polling. Publishing is
/// lossy by design; an identification for a bin no session is waiting on has
/// nobody to prompt.
pub struct IdentificationFeed {
    tx: broadcast::Sender<IdentificationEvent>,
}

impl IdentificationFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to all listening sessions
    pub fn publish(&self, event: IdentificationEvent) {
        let _ = self.tx.send(event);
    }

    /// Open a subscription filtered to one bin.
    ///
    /// The subscription is lazy and restartable; dropping it is the only
    /// teardown required.
    pub fn subscribe(
        &self,
        bin_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> FeedSubscription {
        FeedSubscription {
            bin_id: bin_id.into(),
            user_id: user_id.into(),
            rx: self.tx.subscribe(),
        }
    }

    /// Number of currently attached subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Live subscription to one bin's identification events
pub struct FeedSubscription {
    bin_id: String,
    user_id: String,
    rx: broadcast::Receiver<IdentificationEvent>,
}

impl FeedSubscription {
    /// Next event for this subscription's bin.
    ///
    /// Returns `None` once the feed itself is gone. A lagged receiver skips
    /// to the tail of the stream instead of erroring: an identification
    /// missed under lag would be superseded by the next one anyway.
    pub async fn next(&mut self) -> Option<IdentificationEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.bin_id == self.bin_id => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        "Feed subscription for {} lagged, skipped {} events",
                        self.bin_id, skipped
                    );
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn bin_id(&self) -> &str {
        &self.bin_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_for(bin_id: &str, waste_type: &str) -> IdentificationEvent {
        IdentificationEvent {
            bin_id: bin_id.to_string(),
            user_id: Some("user-1".to_string()),
            waste_type: waste_type.to_string(),
            confidence: 0.95,
            is_error: false,
            error_message: None,
            latency_ms: Some(25),
            fill_levels_after: None,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_subscription_receives_matching_bin() {
        let feed = IdentificationFeed::new(16);
        let mut sub = feed.subscribe("bin_001", "user-1");

        feed.publish(event_for("bin_001", "plastic"));

        let event = sub.next().await.unwrap();
        assert_eq!(event.bin_id, "bin_001");
        assert_eq!(event.waste_type, "plastic");
    }

    #[tokio::test]
    async fn test_subscription_filters_other_bins() {
        let feed = IdentificationFeed::new(16);
        let mut sub = feed.subscribe("bin_001", "user-1");

        feed.publish(event_for("bin_002", "glass"));
        feed.publish(event_for("bin_001", "aluminium"));

        // The bin_002 event is skipped; the bin_001 event comes through.
        let event = sub.next().await.unwrap();
        assert_eq!(event.bin_id, "bin_001");
        assert_eq!(event.waste_type, "aluminium");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_lossy() {
        let feed = IdentificationFeed::new(16);
        // Should not panic or error
        feed.publish(event_for("bin_001", "plastic"));
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_next_returns_none_when_feed_dropped() {
        let feed = IdentificationFeed::new(16);
        let mut sub = feed.subscribe("bin_001", "user-1");
        drop(feed);
        assert!(sub.next().await.is_none());
    }

    #[test]
    fn test_event_deserializes_from_sensor_payload() {
        // Shape the bin-side sensor actually posts
        let json = r#"{
            "bin_id": "bin_001",
            "user_id": "user-1",
            "waste_type": "plastic",
            "confidence": 0.95,
            "is_error": false,
            "latency_ms": 25,
            "fill_levels_after": {"plastic": 3, "glass": 0, "aluminium": 1, "other": 0},
            "timestamp": "2026-08-06T10:00:00Z"
        }"#;

        let event: IdentificationEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.bin_id, "bin_001");
        assert_eq!(event.fill_levels_after.unwrap().plastic, 3);
        assert!(!event.is_error);
    }
}

//! Event types for the AgriSense event system
//!
//! Dispatchers report their state transitions here so a front end can
//! observe them without polling. Delivery is best-effort.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Dispatcher lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum AdvisorEvent {
    /// A request left Idle and is now in flight
    SubmissionStarted {
        form_id: Uuid,
        form: String,
        generation: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An in-flight request resolved and its outcome was applied
    SubmissionSettled {
        form_id: Uuid,
        form: String,
        generation: u64,
        succeeded: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A resolution arrived for a superseded generation and was dropped
    StaleResolutionDiscarded {
        form_id: Uuid,
        form: String,
        generation: u64,
        current_generation: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The dispatcher returned to Idle
    DispatcherReset {
        form_id: Uuid,
        form: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl AdvisorEvent {
    pub fn form_id(&self) -> Uuid {
        match self {
            AdvisorEvent::SubmissionStarted { form_id, .. }
            | AdvisorEvent::SubmissionSettled { form_id, .. }
            | AdvisorEvent::StaleResolutionDiscarded { form_id, .. }
            | AdvisorEvent::DispatcherReset { form_id, .. } => *form_id,
        }
    }
}

/// Broadcast channel for [`AdvisorEvent`]s
///
/// ```
/// use agri_common::events::EventBus;
///
/// let bus = EventBus::new(16);
/// let _rx = bus.subscribe();
/// assert_eq!(bus.subscriber_count(), 1);
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AdvisorEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<AdvisorEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: AdvisorEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_emitted_event() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let form_id = Uuid::new_v4();

        bus.emit_lossy(AdvisorEvent::DispatcherReset {
            form_id,
            form: "crop".to_string(),
            timestamp: chrono::Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.form_id(), form_id);
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let bus = EventBus::new(8);
        bus.emit_lossy(AdvisorEvent::DispatcherReset {
            form_id: Uuid::new_v4(),
            form: "crop".to_string(),
            timestamp: chrono::Utc::now(),
        });
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.capacity(), 8);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = AdvisorEvent::SubmissionStarted {
            form_id: Uuid::nil(),
            form: "weather".to_string(),
            generation: 3,
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "SubmissionStarted");
        assert_eq!(json["generation"], 3);
    }
}

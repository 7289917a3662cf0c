//! Event types and EventBus for AutoCheck
//!
//! Room lifecycle transitions are broadcast on the [`EventBus`] and
//! forwarded to browsers over SSE.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// AutoCheck event types
///
/// Serialized with a `type` tag so SSE clients can dispatch on it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum AutoCheckEvent {
    /// New room entry created, assessment scheduled
    RoomAdded {
        room_id: Uuid,
        generation: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Room image replaced, previous result discarded, assessment rescheduled
    RoomRetaken {
        room_id: Uuid,
        generation: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Assessment finished and was applied to the room
    RoomAssessed {
        room_id: Uuid,
        generation: u64,
        room_label: String,
        score: u8,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Assessment failed and the room moved to error status
    RoomAssessmentFailed {
        room_id: Uuid,
        generation: u64,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Room removed by the user
    RoomRemoved {
        room_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// All rooms removed in one transition
    RoomsReset {
        removed: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Global score and phase recomputed after a room transition
    GlobalSummaryUpdated {
        score: u8,
        phase: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl AutoCheckEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &str {
        match self {
            AutoCheckEvent::RoomAdded { .. } => "RoomAdded",
            AutoCheckEvent::RoomRetaken { .. } => "RoomRetaken",
            AutoCheckEvent::RoomAssessed { .. } => "RoomAssessed",
            AutoCheckEvent::RoomAssessmentFailed { .. } => "RoomAssessmentFailed",
            AutoCheckEvent::RoomRemoved { .. } => "RoomRemoved",
            AutoCheckEvent::RoomsReset { .. } => "RoomsReset",
            AutoCheckEvent::GlobalSummaryUpdated { .. } => "GlobalSummaryUpdated",
        }
    }

    /// Room the event refers to, if any
    pub fn room_id(&self) -> Option<Uuid> {
        match self {
            AutoCheckEvent::RoomAdded { room_id, .. }
            | AutoCheckEvent::RoomRetaken { room_id, .. }
            | AutoCheckEvent::RoomAssessed { room_id, .. }
            | AutoCheckEvent::RoomAssessmentFailed { room_id, .. }
            | AutoCheckEvent::RoomRemoved { room_id, .. } => Some(*room_id),
            AutoCheckEvent::RoomsReset { .. } | AutoCheckEvent::GlobalSummaryUpdated { .. } => None,
        }
    }
}

/// Central event distribution bus
///
/// Wraps `tokio::sync::broadcast`:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged subscribers lose the oldest events
///
/// # Examples
///
/// ```
/// use autocheck_common::events::{AutoCheckEvent, EventBus};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(AutoCheckEvent::RoomsReset {
///     removed: 3,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert_eq!(rx.try_recv().unwrap().event_type(), "RoomsReset");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AutoCheckEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<AutoCheckEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: AutoCheckEvent,
    ) -> Result<usize, broadcast::error::SendError<AutoCheckEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: AutoCheckEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(10);
        let result = bus.emit(AutoCheckEvent::RoomsReset {
            removed: 0,
            timestamp: chrono::Utc::now(),
        });
        assert!(result.is_err());
        assert_eq!(bus.capacity(), 10);
    }

    #[tokio::test]
    async fn test_subscribers_receive_events_in_order() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let room_id = Uuid::new_v4();
        bus.emit_lossy(AutoCheckEvent::RoomAdded {
            room_id,
            generation: 1,
            timestamp: chrono::Utc::now(),
        });
        bus.emit_lossy(AutoCheckEvent::RoomRemoved {
            room_id,
            timestamp: chrono::Utc::now(),
        });

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.event_type(), "RoomAdded");
        assert_eq!(second.event_type(), "RoomRemoved");
        assert_eq!(second.room_id(), Some(room_id));
    }

    #[test]
    fn test_serialization_is_tagged() {
        let event = AutoCheckEvent::RoomAssessed {
            room_id: Uuid::nil(),
            generation: 2,
            room_label: "Cocina".to_string(),
            score: 87,
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "RoomAssessed");
        assert_eq!(json["score"], 87);
        assert_eq!(json["generation"], 2);

        let back: AutoCheckEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}

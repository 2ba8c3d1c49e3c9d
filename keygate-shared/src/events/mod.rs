/// The envelope format Keygate publishes to the broker.
///
/// Consumers see a stable JSON shape regardless of event type:
///
/// ```json
/// {
///   "eventId": "7d9a...",
///   "eventType": "USER_REGISTERED",
///   "payload": { "id": "7d9a...", "login": "ada", "email": "ada@example.com" },
///   "createdAt": "2025-06-12T09:00:00Z"
/// }
/// ```
///
/// The message key on the topic is `eventId`, so redeliveries of the same
/// event land with the same key and consumers can deduplicate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::outbox_event::{OutboxEvent, OutboxEventType};

/// Wire representation of one outbox event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    /// The outbox row id, doubling as the broker message key
    pub event_id: Uuid,

    /// What happened
    pub event_type: OutboxEventType,

    /// Snapshot of the changed entity at commit time
    pub payload: serde_json::Value,

    /// When the event was appended to the outbox
    pub created_at: DateTime<Utc>,
}

impl EventEnvelope {
    /// Builds the envelope for an outbox row.
    pub fn from_event(event: &OutboxEvent) -> Self {
        Self {
            event_id: event.id,
            event_type: event.event_type,
            payload: event.payload.clone(),
            created_at: event.created_at,
        }
    }
}

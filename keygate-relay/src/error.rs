/// Error types for the outbox relay

use thiserror::Error;
use uuid::Uuid;

/// Convenience alias used throughout the relay crate.
pub type RelayResult<T> = Result<T, RelayError>;

/// Everything that can go wrong while draining the outbox.
///
/// Publish failures are per-event: the relay records them on the event row
/// and keeps going. Database failures abort the tick so the affected events
/// stay `NEW` and are picked up again on the next pass.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The outbox store could not be read or updated.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A status update targeted an event id that is not in the table.
    #[error("outbox event {0} does not exist")]
    EventNotFound(Uuid),

    /// The event payload could not be turned into an envelope.
    #[error("failed to serialize event envelope: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The broker rejected or never acknowledged the record.
    #[error("publish failed: {0}")]
    PublishFailed(String),

    /// The Kafka client itself misbehaved (configuration, flush).
    #[error("kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),
}

/// Broker seam and its Kafka implementation
///
/// The relay publishes through [`EventPublisher`] so the tick logic never
/// names Kafka directly; tests swap in a scripted double.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::ClientConfig;

use crate::error::{RelayError, RelayResult};

/// How long a single send may sit in the producer queue before the relay
/// gives up and records the event as failed.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Something that can deliver one keyed record to a topic.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes `value` under `key` and resolves once the broker has
    /// acknowledged the record.
    async fn publish(&self, topic: &str, key: &str, value: &[u8]) -> RelayResult<()>;
}

/// [`EventPublisher`] backed by an rdkafka [`FutureProducer`].
///
/// The producer is idempotent with `acks=all`, so a record that is
/// acknowledged landed on the topic exactly once even if the client retried
/// internally. Duplicates can still reach consumers when the relay itself
/// republishes an event whose `SENT` mark was lost; the message key equals
/// the event id so consumers can deduplicate.
pub struct KafkaEventPublisher {
    producer: FutureProducer,
}

impl KafkaEventPublisher {
    /// Creates a producer for the given comma separated broker list.
    ///
    /// Creation only validates the configuration. The first connection is
    /// made lazily on the first publish.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Kafka`] if the client configuration is
    /// rejected.
    pub fn new(brokers: &str) -> RelayResult<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("enable.idempotence", "true")
            .set("acks", "all")
            .set("message.timeout.ms", "10000")
            .create()?;

        Ok(Self { producer })
    }

    /// Blocks until queued records are delivered or the timeout elapses.
    ///
    /// Called once at shutdown, after the relay loop has stopped.
    pub fn flush(&self, timeout: Duration) -> RelayResult<()> {
        self.producer.flush(timeout)?;
        Ok(())
    }
}

#[async_trait]
impl EventPublisher for KafkaEventPublisher {
    async fn publish(&self, topic: &str, key: &str, value: &[u8]) -> RelayResult<()> {
        let record = FutureRecord::to(topic).key(key).payload(value);

        self.producer
            .send(record, SEND_TIMEOUT)
            .await
            .map_err(|(err, _)| RelayError::PublishFailed(err.to_string()))?;

        Ok(())
    }
}

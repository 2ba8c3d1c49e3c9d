/// The outbox drain loop
///
/// [`OutboxRelay`] polls the outbox on a fixed cadence and pushes `NEW`
/// events to the broker. Each event is handled on its own: a publish
/// failure is recorded on that row and the batch moves on, so one poisoned
/// event never blocks the queue behind it. `FAILED` rows are left for an
/// operator; the relay itself never retries them.
///
/// Ticks run strictly one after another. A slow tick delays the next one
/// but two ticks never overlap, so events are published in creation order
/// within a single relay instance.

use std::sync::Arc;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use keygate_shared::events::EventEnvelope;

use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};
use crate::publisher::EventPublisher;
use crate::source::OutboxSource;

/// What a single tick accomplished
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Events fetched in `NEW` state
    pub fetched: usize,

    /// Events acknowledged by the broker and marked `SENT`
    pub published: usize,

    /// Events marked `FAILED` this tick
    pub failed: usize,
}

/// Moves outbox events from the database to the broker.
///
/// Generic over its storage and broker seams so the drain logic can be
/// exercised without either.
pub struct OutboxRelay<S, P> {
    source: Arc<S>,
    publisher: Arc<P>,
    config: RelayConfig,
    shutdown_token: CancellationToken,
}

impl<S: OutboxSource, P: EventPublisher> OutboxRelay<S, P> {
    /// Creates a relay over the given source and publisher.
    pub fn new(source: Arc<S>, publisher: Arc<P>, config: RelayConfig) -> Self {
        Self {
            source,
            publisher,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Returns a token that stops the run loop when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Drains one batch of `NEW` events.
    ///
    /// Every fetched event ends the tick as `SENT` or `FAILED`, with one
    /// exception: when a status update itself fails, the tick aborts and
    /// the remaining events stay `NEW`. An event that was published but
    /// not marked `SENT` is published again on a later tick, which is why
    /// delivery is at-least-once.
    ///
    /// # Errors
    ///
    /// Returns an error when the outbox cannot be read or a status update
    /// fails. Publish failures are not errors at this level; they show up
    /// in the summary's `failed` count.
    pub async fn tick(&self) -> RelayResult<TickSummary> {
        let events = self.source.fetch_new(self.config.batch_size).await?;
        let mut summary = TickSummary {
            fetched: events.len(),
            ..Default::default()
        };

        for event in events {
            let key = event.id.to_string();
            let envelope = EventEnvelope::from_event(&event);

            let delivery = match serde_json::to_vec(&envelope) {
                Ok(value) => self.publisher.publish(&self.config.topic, &key, &value).await,
                Err(e) => Err(RelayError::Serialization(e)),
            };

            match delivery {
                Ok(()) => {
                    self.source.mark_sent(event.id).await?;
                    summary.published += 1;
                    tracing::debug!(
                        event_id = %event.id,
                        event_type = event.event_type.as_str(),
                        "Outbox event published"
                    );
                }
                Err(e) => {
                    self.source.mark_failed(event.id, &e.to_string()).await?;
                    summary.failed += 1;
                    tracing::warn!(
                        event_id = %event.id,
                        event_type = event.event_type.as_str(),
                        error = %e,
                        "Failed to publish outbox event"
                    );
                }
            }
        }

        Ok(summary)
    }

    /// Runs the drain loop until the shutdown token is cancelled.
    ///
    /// Cancellation is observed between ticks, so a tick that is already
    /// underway finishes before the loop exits.
    pub async fn run(&self) {
        tracing::info!(
            topic = %self.config.topic,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            batch_size = self.config.batch_size,
            "Outbox relay starting"
        );

        loop {
            if self.shutdown_token.is_cancelled() {
                break;
            }

            match self.tick().await {
                Ok(summary) if summary.fetched > 0 => {
                    tracing::info!(
                        fetched = summary.fetched,
                        published = summary.published,
                        failed = summary.failed,
                        "Relay tick complete"
                    );
                }
                Ok(_) => tracing::debug!("Outbox is empty"),
                Err(e) => {
                    tracing::error!(error = %e, "Relay tick aborted; unmarked events stay NEW");
                }
            }

            tokio::select! {
                _ = self.shutdown_token.cancelled() => break,
                _ = sleep(self.config.poll_interval) => {}
            }
        }

        tracing::info!("Outbox relay stopped");
    }
}

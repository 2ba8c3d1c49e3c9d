/// Where the relay reads pending events and records delivery outcomes
///
/// The trait exists so the tick logic can run against an in-memory store in
/// tests. The production implementation wraps a connection pool and
/// delegates to the outbox model.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use keygate_shared::models::outbox_event::{OutboxEvent, OutboxStatus};

use crate::error::{RelayError, RelayResult};

/// Storage operations the relay needs.
///
/// The relay only ever reads `NEW` events and moves them to `SENT` or
/// `FAILED`. Re-flagging a `FAILED` event is an operator action and is
/// deliberately not part of this trait.
#[async_trait]
pub trait OutboxSource: Send + Sync {
    /// Loads up to `limit` events in `NEW` state, oldest first.
    async fn fetch_new(&self, limit: i64) -> RelayResult<Vec<OutboxEvent>>;

    /// Records a broker acknowledgement for the event.
    async fn mark_sent(&self, id: Uuid) -> RelayResult<()>;

    /// Records a failed publish attempt with its error text.
    async fn mark_failed(&self, id: Uuid, error: &str) -> RelayResult<()>;
}

/// [`OutboxSource`] backed by the `outbox_events` table.
#[derive(Debug, Clone)]
pub struct PgOutboxSource {
    pool: PgPool,
}

impl PgOutboxSource {
    /// Wraps a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OutboxSource for PgOutboxSource {
    async fn fetch_new(&self, limit: i64) -> RelayResult<Vec<OutboxEvent>> {
        let mut conn = self.pool.acquire().await?;
        Ok(OutboxEvent::list_by_status(&mut conn, OutboxStatus::New, limit).await?)
    }

    async fn mark_sent(&self, id: Uuid) -> RelayResult<()> {
        let mut conn = self.pool.acquire().await?;
        if !OutboxEvent::mark_sent(&mut conn, id).await? {
            return Err(RelayError::EventNotFound(id));
        }
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> RelayResult<()> {
        let mut conn = self.pool.acquire().await?;
        if !OutboxEvent::mark_failed(&mut conn, id, error).await? {
            return Err(RelayError::EventNotFound(id));
        }
        Ok(())
    }
}

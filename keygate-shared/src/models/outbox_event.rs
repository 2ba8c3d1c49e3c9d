/// Outbox event model and database operations
///
/// The outbox is the only path by which Keygate publishes to the broker.
/// [`OutboxEvent::append`] runs on the same connection as the business
/// mutation it describes, so the event row and the mutation commit or roll
/// back together. The relay later drains `NEW` rows and marks each one
/// `SENT` or `FAILED`; `FAILED` rows stay put until an operator calls
/// [`OutboxEvent::mark_new`].
///
/// # Schema
///
/// ```sql
/// CREATE TABLE outbox_events (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     event_type outbox_event_type NOT NULL,
///     payload JSONB NOT NULL,
///     status outbox_status NOT NULL DEFAULT 'NEW',
///     attempts INTEGER NOT NULL DEFAULT 0,
///     last_error TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     sent_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;

/// Delivery state of an outbox row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "outbox_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OutboxStatus {
    /// Waiting to be published
    New,

    /// Published and acknowledged by the broker
    Sent,

    /// Publish failed, waiting for an operator
    Failed,
}

impl OutboxStatus {
    /// Converts status to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::New => "NEW",
            OutboxStatus::Sent => "SENT",
            OutboxStatus::Failed => "FAILED",
        }
    }
}

/// Kind of domain change an event describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "outbox_event_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboxEventType {
    /// A new account was created
    UserRegistered,

    /// An account's login or email changed
    UserCredentialsUpdated,
}

impl OutboxEventType {
    /// Converts event type to string for the wire and the database
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxEventType::UserRegistered => "USER_REGISTERED",
            OutboxEventType::UserCredentialsUpdated => "USER_CREDENTIALS_UPDATED",
        }
    }
}

/// Outbox event model representing one pending or delivered publish
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OutboxEvent {
    /// Unique event ID, also used as the broker message key
    pub id: Uuid,

    /// What happened
    pub event_type: OutboxEventType,

    /// Snapshot of the changed entity at commit time
    pub payload: serde_json::Value,

    /// Current delivery state
    pub status: OutboxStatus,

    /// How many publish attempts have failed
    pub attempts: i32,

    /// Error text from the most recent failed attempt
    pub last_error: Option<String>,

    /// When the event was appended
    pub created_at: DateTime<Utc>,

    /// When the event was acknowledged by the broker
    pub sent_at: Option<DateTime<Utc>>,
}

impl OutboxEvent {
    /// Appends an event in `NEW` state
    ///
    /// Call this on the same connection as the mutation the event
    /// describes, inside a [`TxManager::run`](crate::db::tx::TxManager::run)
    /// closure, so both land in one commit.
    ///
    /// # Arguments
    ///
    /// * `conn` - Database connection, normally a transaction connection
    /// * `event_type` - Kind of change the event describes
    /// * `payload` - Entity snapshot to carry to the broker
    ///
    /// # Returns
    ///
    /// The newly created event row with generated ID and timestamps
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use keygate_shared::models::outbox_event::{OutboxEvent, OutboxEventType};
    /// # use serde_json::json;
    /// # use sqlx::PgPool;
    /// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
    /// # let mut conn = pool.acquire().await?;
    /// let event = OutboxEvent::append(
    ///     &mut conn,
    ///     OutboxEventType::UserRegistered,
    ///     json!({"id": "7a6e...", "login": "ada"}),
    /// )
    /// .await?;
    /// println!("Appended event: {}", event.id);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn append(
        conn: &mut PgConnection,
        event_type: OutboxEventType,
        payload: serde_json::Value,
    ) -> Result<Self, sqlx::Error> {
        let event = sqlx::query_as::<_, OutboxEvent>(
            r#"
            INSERT INTO outbox_events (event_type, payload)
            VALUES ($1, $2)
            RETURNING id, event_type, payload, status, attempts, last_error,
                      created_at, sent_at
            "#,
        )
        .bind(event_type)
        .bind(payload)
        .fetch_one(&mut *conn)
        .await?;

        Ok(event)
    }

    /// Finds an event by ID
    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let event = sqlx::query_as::<_, OutboxEvent>(
            r#"
            SELECT id, event_type, payload, status, attempts, last_error,
                   created_at, sent_at
            FROM outbox_events
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(event)
    }

    /// Lists events in the given state, oldest first, up to `limit` rows
    pub async fn list_by_status(
        conn: &mut PgConnection,
        status: OutboxStatus,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let events = sqlx::query_as::<_, OutboxEvent>(
            r#"
            SELECT id, event_type, payload, status, attempts, last_error,
                   created_at, sent_at
            FROM outbox_events
            WHERE status = $1
            ORDER BY created_at ASC
            LIMIT $2
            "#,
        )
        .bind(status)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;

        Ok(events)
    }

    /// Marks an event `SENT`
    ///
    /// Records the acknowledgement time and clears any error left by
    /// earlier attempts. Returns false if no row matched the ID.
    pub async fn mark_sent(conn: &mut PgConnection, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE outbox_events
            SET status = $2, sent_at = NOW(), last_error = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(OutboxStatus::Sent)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Marks an event `FAILED`
    ///
    /// Counts the attempt and records the error text. Returns false if no
    /// row matched the ID.
    pub async fn mark_failed(
        conn: &mut PgConnection,
        id: Uuid,
        error: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE outbox_events
            SET status = $2, attempts = attempts + 1, last_error = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(OutboxStatus::Failed)
        .bind(error)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Puts an event back in `NEW` state so the relay picks it up again
    ///
    /// This is an operator action, typically after the cause of a publish
    /// failure has been fixed. The attempt counter and last error are kept
    /// as history until the next successful delivery clears them.
    ///
    /// Returns false if no row matched the ID.
    pub async fn mark_new(conn: &mut PgConnection, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE outbox_events SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(OutboxStatus::New)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts events in the given state
    pub async fn count_by_status(
        conn: &mut PgConnection,
        status: OutboxStatus,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM outbox_events WHERE status = $1")
                .bind(status)
                .fetch_one(&mut *conn)
                .await?;

        Ok(count)
    }
}

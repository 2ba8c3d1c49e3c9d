//! # Keygate Outbox Relay
//!
//! This is the relay binary for Keygate, responsible for draining the
//! transactional outbox to Kafka. It connects to the same PostgreSQL
//! database as the auth service; the auth service owns the schema, so this
//! binary refuses to start against an unmigrated database instead of
//! creating tables itself.
//!
//! ## Architecture
//!
//! The relay:
//! - Polls the `outbox_events` table for `NEW` rows on a fixed cadence
//! - Publishes each event to Kafka, keyed by the event id
//! - Marks rows `SENT` or `FAILED` and leaves `FAILED` rows to an operator
//! - Finishes the in-flight tick and flushes the producer on shutdown
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p keygate-relay
//! ```

use std::sync::Arc;
use std::time::Duration;

use keygate_relay::config::Config;
use keygate_relay::publisher::KafkaEventPublisher;
use keygate_relay::relay::OutboxRelay;
use keygate_relay::source::PgOutboxSource;
use keygate_shared::db::migrations::get_migration_status;
use keygate_shared::db::pool::{close_pool, create_pool, DatabaseConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long shutdown waits for the in-flight tick before giving up.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keygate_relay=debug,keygate_shared=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Keygate Relay v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    // The relay runs one tick at a time, so a small pool is plenty.
    let pool = create_pool(DatabaseConfig {
        url: config.database_url.clone(),
        max_connections: 5,
        min_connections: 1,
        ..Default::default()
    })
    .await?;

    let status = get_migration_status(&pool).await?;
    if status.applied_migrations == 0 {
        anyhow::bail!("database has no schema; start keygate-auth once to run migrations");
    }
    tracing::info!(
        applied = status.applied_migrations,
        latest = status.latest_version,
        "Database schema present"
    );

    let source = Arc::new(PgOutboxSource::new(pool.clone()));
    let publisher = Arc::new(KafkaEventPublisher::new(&config.kafka_brokers)?);

    let relay = OutboxRelay::new(source, Arc::clone(&publisher), config.relay.clone());
    let shutdown = relay.shutdown_token();

    let handle = tokio::spawn(async move { relay.run().await });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, draining in-flight tick...");
    shutdown.cancel();

    match tokio::time::timeout(DRAIN_TIMEOUT, handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "Relay task panicked"),
        Err(_) => tracing::warn!(
            timeout_seconds = DRAIN_TIMEOUT.as_secs(),
            "Relay did not stop in time, exiting anyway"
        ),
    }

    if let Err(e) = publisher.flush(Duration::from_secs(10)) {
        tracing::warn!(error = %e, "Producer flush failed; queued records may be lost");
    }

    close_pool(pool).await;

    tracing::info!("Keygate Relay stopped");
    Ok(())
}

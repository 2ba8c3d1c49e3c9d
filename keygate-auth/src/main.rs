//! # Keygate Auth Service
//!
//! This is the session service for Keygate. It owns the database schema
//! and the session core: on startup it connects to PostgreSQL, applies
//! migrations, and reports the outbox backlog left over from previous
//! runs, then holds the pool open until shutdown.
//!
//! ## Architecture
//!
//! The service is structured around three pieces:
//! - `SessionManager` for account and session operations
//! - The transactional outbox, written by the session core
//! - The relay binary (`keygate-relay`), which drains the outbox
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p keygate-auth
//! ```

use keygate_auth::config::Config;
use keygate_auth::session::SessionManager;
use keygate_shared::db::migrations::run_migrations;
use keygate_shared::db::pool::{close_pool, create_pool, DatabaseConfig};
use keygate_shared::db::tx::TxManager;
use keygate_shared::models::outbox_event::{OutboxEvent, OutboxStatus};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keygate_auth=debug,keygate_shared=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Keygate Auth v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database_url.clone(),
        ..Default::default()
    })
    .await?;

    run_migrations(&pool).await?;

    // Surface any outbox backlog left over from previous runs.
    {
        let mut conn = pool.acquire().await?;
        let pending = OutboxEvent::count_by_status(&mut conn, OutboxStatus::New).await?;
        let failed = OutboxEvent::count_by_status(&mut conn, OutboxStatus::Failed).await?;

        if failed > 0 {
            tracing::warn!(failed, "Outbox has FAILED events awaiting an operator");
        }
        tracing::info!(pending, failed, "Outbox backlog at startup");
    }

    // TODO: serve this over the wire once the transport layer lands
    let _manager = SessionManager::new(
        TxManager::new(pool.clone()),
        config.tokens.clone(),
        config.max_sessions_per_user,
    );

    tracing::info!("Session core ready; waiting for the serving layer");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, exiting...");

    close_pool(pool).await;

    Ok(())
}

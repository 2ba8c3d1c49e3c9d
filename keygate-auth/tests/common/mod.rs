/// Common test utilities for integration tests
///
/// This module provides shared infrastructure for integration tests:
/// - Database setup and migrations
/// - Per-context unique logins and emails so parallel tests never collide
/// - Session fixtures and counters

use keygate_auth::config::TokenConfig;
use keygate_auth::payload::RegisterPayload;
use keygate_auth::session::SessionManager;
use keygate_shared::db::pool::{create_pool, DatabaseConfig};
use keygate_shared::db::tx::TxManager;
use sqlx::PgPool;
use uuid::Uuid;

/// Test context containing the pool and a ready session manager
pub struct TestContext {
    pub pool: PgPool,
    pub manager: SessionManager,
    suffix: String,
}

impl TestContext {
    /// Creates a new test context against the database named by
    /// `DATABASE_URL`. Returns `None` when the variable is not exported;
    /// callers skip the test in that case.
    pub async fn new() -> Option<TestContext> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("skipping: DATABASE_URL is not set");
            return None;
        };

        // Connect to database
        let pool = create_pool(DatabaseConfig {
            url,
            max_connections: 5,
            ..Default::default()
        })
        .await
        .expect("failed to connect to the test database");

        // Run migrations (path relative to Cargo.toml, not this file)
        sqlx::migrate!("../migrations")
            .run(&pool)
            .await
            .expect("failed to run migrations");

        let manager = SessionManager::new(TxManager::new(pool.clone()), test_token_config(), None);

        Some(TestContext {
            pool,
            manager,
            suffix: Uuid::new_v4().simple().to_string(),
        })
    }

    /// A login name unique to this context.
    pub fn login(&self, name: &str) -> String {
        format!("{}_{}", name, self.suffix)
    }

    /// An email address unique to this context.
    pub fn email(&self, name: &str) -> String {
        format!("{}_{}@example.com", name, self.suffix)
    }

    /// A registration payload using this context's fixtures.
    pub fn register_payload(&self, name: &str, password: &str) -> RegisterPayload {
        RegisterPayload {
            login: self.login(name),
            email: self.email(name),
            password: password.to_string(),
        }
    }

    /// Forces every stored session of a user into the past.
    pub async fn expire_sessions(&self, user_id: Uuid) {
        sqlx::query(
            "UPDATE refresh_tokens SET expires_at = NOW() - INTERVAL '1 hour'
             WHERE user_id = $1",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .expect("failed to expire sessions");
    }

    /// Counts a user's live sessions.
    pub async fn active_sessions(&self, user_id: Uuid) -> i64 {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM refresh_tokens
             WHERE user_id = $1 AND revoked_at IS NULL AND expires_at > NOW()",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .expect("failed to count sessions");
        count
    }
}

pub fn test_token_config() -> TokenConfig {
    TokenConfig {
        access_secret: "integration-access-secret-0123456789abcdef".to_string(),
        access_ttl: chrono::Duration::minutes(15),
        refresh_secret: "integration-refresh-secret-0123456789abcdef".to_string(),
        refresh_ttl: chrono::Duration::days(7),
    }
}

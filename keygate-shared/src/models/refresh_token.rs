/// Refresh token model and database operations
///
/// This module provides the RefreshToken model backing long-lived sessions.
/// Each row is one issued refresh token.
///
/// # Security
///
/// - Tokens are stored as Argon2 digests (never plaintext)
/// - Revocation is a one-way transition: `revoked_at` is set once and the
///   row is kept, so a rotated-away or logged-out token presented again is
///   still recognized and rejected
/// - Expiry lives on the row, so replay of an expired token can be told
///   apart from an unknown token
///
/// # Schema
///
/// ```sql
/// CREATE TABLE refresh_tokens (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users (id) ON DELETE CASCADE,
///     token_hash TEXT NOT NULL,
///     expires_at TIMESTAMPTZ NOT NULL,
///     revoked_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

/// Refresh token model representing one session
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshToken {
    /// Unique token ID
    pub id: Uuid,

    /// User this token belongs to
    pub user_id: Uuid,

    /// Argon2 digest of the token (never store plaintext!)
    pub token_hash: String,

    /// When the session stops being refreshable
    pub expires_at: DateTime<Utc>,

    /// When the token was revoked (None if still live)
    pub revoked_at: Option<DateTime<Utc>>,

    /// When the token was issued
    pub created_at: DateTime<Utc>,
}

/// Input for persisting a new refresh token
#[derive(Debug, Clone)]
pub struct CreateRefreshToken {
    /// User the token belongs to
    pub user_id: Uuid,

    /// Argon2 digest of the token (NOT the raw token!)
    pub token_hash: String,

    /// Expiry matching the JWT's `exp` claim
    pub expires_at: DateTime<Utc>,
}

impl RefreshToken {
    /// Creates a new refresh token row
    ///
    /// # Arguments
    ///
    /// * `conn` - Database connection (pooled or inside a transaction)
    /// * `data` - Token creation data with an already-hashed token
    ///
    /// # Returns
    ///
    /// The newly created token row with generated ID and timestamps
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn create(
        conn: &mut PgConnection,
        data: CreateRefreshToken,
    ) -> Result<Self, sqlx::Error> {
        let token = sqlx::query_as::<_, RefreshToken>(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, token_hash, expires_at, revoked_at, created_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.token_hash)
        .bind(data.expires_at)
        .fetch_one(&mut *conn)
        .await?;

        Ok(token)
    }

    /// Loads every unrevoked token a user holds, oldest first
    ///
    /// Expiry is deliberately not filtered here. The rotation scan needs
    /// expired rows so a replay of an expired token is rejected as expired
    /// rather than treated as unknown.
    pub async fn find_unrevoked_by_user(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let tokens = sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT id, user_id, token_hash, expires_at, revoked_at, created_at
            FROM refresh_tokens
            WHERE user_id = $1
              AND revoked_at IS NULL
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(tokens)
    }

    /// Revokes a single token
    ///
    /// Returns false when the row was already revoked or does not exist,
    /// which callers treat as "nothing left to do" rather than an error.
    pub async fn revoke(conn: &mut PgConnection, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = NOW()
            WHERE id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Revokes every unrevoked token a user holds
    ///
    /// # Returns
    ///
    /// The number of tokens that were revoked
    pub async fn revoke_all_for_user(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = NOW()
            WHERE user_id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Checks if the token is still usable (not revoked, not expired)
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none() && !self.is_expired()
    }

    /// Checks if the token is expired
    ///
    /// Returns true if the stored expiry is at or before now
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_token(expires_in: Duration, revoked: bool) -> RefreshToken {
        RefreshToken {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: "$argon2id$fake".to_string(),
            expires_at: Utc::now() + expires_in,
            revoked_at: revoked.then(Utc::now),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_fresh_token_is_active() {
        let token = sample_token(Duration::days(7), false);
        assert!(token.is_active());
        assert!(!token.is_expired());
    }

    #[test]
    fn test_expired_token_is_not_active() {
        let token = sample_token(Duration::hours(-1), false);
        assert!(token.is_expired());
        assert!(!token.is_active());
    }

    #[test]
    fn test_revoked_token_is_not_active() {
        let token = sample_token(Duration::days(7), true);
        assert!(!token.is_active());
        // Revocation does not make it expired.
        assert!(!token.is_expired());
    }

    // Integration tests for database operations are in keygate-auth/tests/.
}

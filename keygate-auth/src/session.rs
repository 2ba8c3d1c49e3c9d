/// The session manager: registration, login, rotation, and revocation
///
/// Every operation that mutates account state runs inside a single
/// transaction through [`TxManager`], and any mutation other systems need
/// to hear about appends an outbox row on the same connection. Reads go
/// straight to the pool.
///
/// Refresh tokens are matched by digest, not by id: the presented token is
/// verified against every unrevoked digest the user holds, oldest first,
/// and the first match wins. A token that matches but has expired is
/// rejected without being revoked, so the stored history stays intact.
///
/// # Example
///
/// ```no_run
/// use keygate_auth::config::TokenConfig;
/// use keygate_auth::payload::RegisterPayload;
/// use keygate_auth::session::SessionManager;
/// use keygate_shared::db::tx::TxManager;
/// use sqlx::PgPool;
///
/// async fn example(pool: PgPool, tokens: TokenConfig) -> anyhow::Result<()> {
///     let manager = SessionManager::new(TxManager::new(pool), tokens, None);
///     let result = manager
///         .register(RegisterPayload {
///             login: "ada".to_string(),
///             email: "ada@example.com".to_string(),
///             password: "correct horse battery staple".to_string(),
///         })
///         .await?;
///     println!("registered {}", result.user.id);
///     Ok(())
/// }
/// ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgConnection;
use uuid::Uuid;
use validator::Validate;

use keygate_shared::auth::jwt::{create_token, validate_refresh_token, Claims, TokenType};
use keygate_shared::auth::password::{hash_password, verify_password};
use keygate_shared::auth::token_digest::{hash_token, verify_token};
use keygate_shared::db::tx::TxManager;
use keygate_shared::models::outbox_event::{OutboxEvent, OutboxEventType};
use keygate_shared::models::refresh_token::{CreateRefreshToken, RefreshToken};
use keygate_shared::models::user::{CreateUser, UpdateUser, User};

use crate::config::TokenConfig;
use crate::error::AuthError;
use crate::payload::{LoginPayload, RegisterPayload, UpdateCredentials};

/// A freshly minted token pair
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tokens {
    /// Short-lived access token
    pub access_token: String,

    /// Long-lived refresh token; its digest is now stored
    pub refresh_token: String,
}

/// The result of a successful registration or login
#[derive(Debug, Clone, Serialize)]
pub struct AuthResult {
    /// The account, without its password digest
    pub user: User,

    /// The new session's tokens
    pub tokens: Tokens,
}

/// Entry point for all session operations
pub struct SessionManager {
    tx: TxManager,
    tokens: TokenConfig,
    max_sessions_per_user: Option<u32>,
}

impl SessionManager {
    /// Creates a session manager.
    ///
    /// # Arguments
    ///
    /// * `tx` - Transaction manager over the service's pool
    /// * `tokens` - Secrets and lifetimes for both token families
    /// * `max_sessions_per_user` - Optional cap on live sessions per user
    pub fn new(tx: TxManager, tokens: TokenConfig, max_sessions_per_user: Option<u32>) -> Self {
        Self {
            tx,
            tokens,
            max_sessions_per_user,
        }
    }

    /// Creates an account, its first session, and a `USER_REGISTERED`
    /// outbox event, all in one transaction.
    ///
    /// # Errors
    ///
    /// - [`AuthError::BadRequest`] when the payload fails validation
    /// - [`AuthError::Conflict`] when the login or email is already taken
    pub async fn register(&self, payload: RegisterPayload) -> Result<AuthResult, AuthError> {
        payload.validate()?;

        let password_hash = hash_password(&payload.password)?;
        let cfg = self.tokens.clone();
        let cap = self.max_sessions_per_user;

        let result = self
            .tx
            .run(move |conn: &mut PgConnection| {
                Box::pin(async move {
                    if User::find_by_login(&mut *conn, &payload.login).await?.is_some() {
                        return Err(AuthError::Conflict("login already in use".to_string()));
                    }
                    if User::find_by_email(&mut *conn, &payload.email).await?.is_some() {
                        return Err(AuthError::Conflict("email already in use".to_string()));
                    }

                    let user = User::create(
                        &mut *conn,
                        CreateUser {
                            login: payload.login,
                            email: payload.email,
                            password_hash,
                        },
                    )
                    .await?;

                    OutboxEvent::append(
                        &mut *conn,
                        OutboxEventType::UserRegistered,
                        user_snapshot(&user),
                    )
                    .await?;

                    let (tokens, token_hash, expires_at) = mint_session(&cfg, &user)?;
                    enforce_session_cap(&mut *conn, user.id, cap).await?;
                    RefreshToken::create(
                        &mut *conn,
                        CreateRefreshToken {
                            user_id: user.id,
                            token_hash,
                            expires_at,
                        },
                    )
                    .await?;

                    Ok(AuthResult { user, tokens })
                })
            })
            .await?;

        tracing::info!(user_id = %result.user.id, "User registered");
        Ok(result)
    }

    /// Authenticates by login or email and issues a new session.
    ///
    /// The identifier is tried as a login first, then as an email. Issuing
    /// a session never revokes the user's other sessions; only the
    /// optional per-user cap can do that.
    ///
    /// # Errors
    ///
    /// - [`AuthError::BadRequest`] when the payload fails validation
    /// - [`AuthError::NotFound`] when no account matches the identifier
    /// - [`AuthError::Unauthorized`] when the password is wrong
    pub async fn login(&self, payload: LoginPayload) -> Result<AuthResult, AuthError> {
        payload.validate()?;

        let user = {
            let mut conn = self.tx.pool().acquire().await?;
            match User::find_by_login(&mut conn, &payload.identifier).await? {
                Some(user) => user,
                None => User::find_by_email(&mut conn, &payload.identifier)
                    .await?
                    .ok_or_else(|| {
                        AuthError::NotFound("no account matches the identifier".to_string())
                    })?,
            }
        };

        if !verify_password(&payload.password, &user.password_hash)? {
            return Err(AuthError::Unauthorized("invalid credentials".to_string()));
        }

        let cfg = self.tokens.clone();
        let cap = self.max_sessions_per_user;
        let (tokens, token_hash, expires_at) = mint_session(&cfg, &user)?;
        let user_id = user.id;

        self.tx
            .run(move |conn: &mut PgConnection| {
                Box::pin(async move {
                    enforce_session_cap(&mut *conn, user_id, cap).await?;
                    RefreshToken::create(
                        &mut *conn,
                        CreateRefreshToken {
                            user_id,
                            token_hash,
                            expires_at,
                        },
                    )
                    .await?;
                    Ok::<(), AuthError>(())
                })
            })
            .await?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(AuthResult { user, tokens })
    }

    /// Rotates a refresh token: revokes the matched session and issues a
    /// new one in the same transaction.
    ///
    /// The presented token must verify as a refresh JWT before any
    /// database work happens. It is then matched against the user's
    /// unrevoked digests in creation order. A match that has expired is
    /// rejected without revocation. A token that matches nothing, such as
    /// one already rotated away, is rejected too; the signed-but-unmatched
    /// case is exactly what a replay of an old token looks like.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Unauthorized`] in every rejection case above
    pub async fn refresh(&self, raw_token: &str) -> Result<Tokens, AuthError> {
        let claims = validate_refresh_token(raw_token, &self.tokens.refresh_secret)
            .map_err(|_| AuthError::Unauthorized("refresh token is invalid".to_string()))?;

        let cfg = self.tokens.clone();
        let cap = self.max_sessions_per_user;
        let raw = raw_token.to_string();
        let user_id = claims.sub;

        let tokens = self
            .tx
            .run(move |conn: &mut PgConnection| {
                Box::pin(async move {
                    let records = RefreshToken::find_unrevoked_by_user(&mut *conn, user_id).await?;

                    let mut matched: Option<RefreshToken> = None;
                    for record in records {
                        if verify_token(&raw, &record.token_hash)? {
                            matched = Some(record);
                            break;
                        }
                    }

                    let record = matched.ok_or_else(|| {
                        AuthError::Unauthorized(
                            "refresh token does not match an active session".to_string(),
                        )
                    })?;

                    if record.is_expired() {
                        return Err(AuthError::Unauthorized(
                            "refresh token session has expired".to_string(),
                        ));
                    }

                    let user = User::find_by_id(&mut *conn, user_id).await?.ok_or_else(|| {
                        AuthError::Unauthorized("account no longer exists".to_string())
                    })?;

                    RefreshToken::revoke(&mut *conn, record.id).await?;

                    let (tokens, token_hash, expires_at) = mint_session(&cfg, &user)?;
                    enforce_session_cap(&mut *conn, user_id, cap).await?;
                    RefreshToken::create(
                        &mut *conn,
                        CreateRefreshToken {
                            user_id,
                            token_hash,
                            expires_at,
                        },
                    )
                    .await?;

                    Ok(tokens)
                })
            })
            .await?;

        tracing::info!(user_id = %user_id, "Session rotated");
        Ok(tokens)
    }

    /// Ends the session the given refresh token belongs to.
    ///
    /// Logout is idempotent: a token that does not verify, or verifies but
    /// matches no unrevoked session, is treated as already logged out.
    pub async fn logout(&self, raw_token: &str) -> Result<(), AuthError> {
        let claims = match validate_refresh_token(raw_token, &self.tokens.refresh_secret) {
            Ok(claims) => claims,
            // Nothing to end; an expired or garbled token holds no session.
            Err(_) => return Ok(()),
        };

        let raw = raw_token.to_string();
        let user_id = claims.sub;

        self.tx
            .run(move |conn: &mut PgConnection| {
                Box::pin(async move {
                    let records = RefreshToken::find_unrevoked_by_user(&mut *conn, user_id).await?;

                    for record in records {
                        if verify_token(&raw, &record.token_hash)? {
                            RefreshToken::revoke(&mut *conn, record.id).await?;
                            tracing::info!(user_id = %user_id, "Session revoked");
                            break;
                        }
                    }

                    Ok(())
                })
            })
            .await
    }

    /// Revokes every session a user holds.
    ///
    /// # Returns
    ///
    /// The number of sessions that were revoked.
    pub async fn logout_all(&self, user_id: Uuid) -> Result<u64, AuthError> {
        let mut conn = self.tx.pool().acquire().await?;
        let revoked = RefreshToken::revoke_all_for_user(&mut conn, user_id).await?;

        tracing::info!(user_id = %user_id, revoked, "Revoked all sessions");
        Ok(revoked)
    }

    /// Changes a user's login, email, or password.
    ///
    /// A password change requires the current password and revokes every
    /// session the user holds. Changing the login or email appends a
    /// `USER_CREDENTIALS_UPDATED` outbox event carrying the updated
    /// account snapshot. All of it commits atomically.
    ///
    /// # Errors
    ///
    /// - [`AuthError::BadRequest`] when nothing would change, a set field
    ///   fails validation, or a new password comes without the current one
    /// - [`AuthError::Unauthorized`] when the user does not exist or the
    ///   current password is wrong
    /// - [`AuthError::Conflict`] when the new login or email is taken
    pub async fn update_credentials(
        &self,
        user_id: Uuid,
        changes: UpdateCredentials,
    ) -> Result<User, AuthError> {
        changes.validate()?;

        if changes.is_noop() {
            return Err(AuthError::BadRequest("no changes requested".to_string()));
        }

        if changes.new_password.is_some() && changes.current_password.is_none() {
            return Err(AuthError::BadRequest(
                "changing the password requires the current password".to_string(),
            ));
        }

        let updated = self
            .tx
            .run(move |conn: &mut PgConnection| {
                Box::pin(async move {
                    let user = User::find_by_id(&mut *conn, user_id).await?.ok_or_else(|| {
                        AuthError::Unauthorized("account no longer exists".to_string())
                    })?;

                    // The unique indexes close the race these checks leave
                    // open; a concurrent winner surfaces as Conflict through
                    // the sqlx error mapping.
                    if let Some(ref login) = changes.login {
                        if let Some(existing) = User::find_by_login(&mut *conn, login).await? {
                            if existing.id != user_id {
                                return Err(AuthError::Conflict(
                                    "login already in use".to_string(),
                                ));
                            }
                        }
                    }
                    if let Some(ref email) = changes.email {
                        if let Some(existing) = User::find_by_email(&mut *conn, email).await? {
                            if existing.id != user_id {
                                return Err(AuthError::Conflict(
                                    "email already in use".to_string(),
                                ));
                            }
                        }
                    }

                    let mut update = UpdateUser {
                        login: changes.login.clone(),
                        email: changes.email.clone(),
                        password_hash: None,
                    };

                    let password_changed = if let Some(ref new_password) = changes.new_password {
                        let current = changes.current_password.as_deref().unwrap_or_default();
                        if !verify_password(current, &user.password_hash)? {
                            return Err(AuthError::Unauthorized(
                                "current password is incorrect".to_string(),
                            ));
                        }
                        update.password_hash = Some(hash_password(new_password)?);
                        true
                    } else {
                        false
                    };

                    let updated = User::update(&mut *conn, user_id, update)
                        .await?
                        .ok_or_else(|| {
                            AuthError::Internal("account vanished during update".to_string())
                        })?;

                    if password_changed {
                        RefreshToken::revoke_all_for_user(&mut *conn, user_id).await?;
                    }

                    if changes.login.is_some() || changes.email.is_some() {
                        OutboxEvent::append(
                            &mut *conn,
                            OutboxEventType::UserCredentialsUpdated,
                            user_snapshot(&updated),
                        )
                        .await?;
                    }

                    Ok(updated)
                })
            })
            .await?;

        tracing::info!(user_id = %user_id, "Credentials updated");
        Ok(updated)
    }

    /// Loads the current state of an account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotFound`] when the account does not exist.
    pub async fn get_current(&self, user_id: Uuid) -> Result<User, AuthError> {
        let mut conn = self.tx.pool().acquire().await?;

        User::find_by_id(&mut conn, user_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("account not found".to_string()))
    }
}

/// Signs an access/refresh pair for the user and digests the refresh
/// token for storage.
fn mint_session(
    cfg: &TokenConfig,
    user: &User,
) -> Result<(Tokens, String, DateTime<Utc>), AuthError> {
    let access_claims = Claims::new(
        user.id,
        &user.login,
        &user.email,
        TokenType::Access,
        cfg.access_ttl,
    );
    let access_token = create_token(&access_claims, &cfg.access_secret)
        .map_err(|e| AuthError::Internal(format!("access token signing failed: {e}")))?;

    let refresh_claims = Claims::new(
        user.id,
        &user.login,
        &user.email,
        TokenType::Refresh,
        cfg.refresh_ttl,
    );
    let refresh_token = create_token(&refresh_claims, &cfg.refresh_secret)
        .map_err(|e| AuthError::Internal(format!("refresh token signing failed: {e}")))?;

    let token_hash = hash_token(&refresh_token)?;
    let expires_at = Utc::now() + cfg.refresh_ttl;

    Ok((
        Tokens {
            access_token,
            refresh_token,
        },
        token_hash,
        expires_at,
    ))
}

/// The account snapshot embedded in outbox payloads. Credential digests
/// never leave the database.
fn user_snapshot(user: &User) -> serde_json::Value {
    serde_json::json!({
        "id": user.id,
        "login": user.login,
        "email": user.email,
        "createdAt": user.created_at,
    })
}

/// Revokes the user's oldest active sessions until one more fits under
/// the cap. No-op when no cap is configured.
async fn enforce_session_cap(
    conn: &mut PgConnection,
    user_id: Uuid,
    cap: Option<u32>,
) -> Result<(), AuthError> {
    let Some(cap) = cap else { return Ok(()) };

    let records = RefreshToken::find_unrevoked_by_user(&mut *conn, user_id).await?;
    let active: Vec<&RefreshToken> = records.iter().filter(|r| r.is_active()).collect();

    if active.len() < cap as usize {
        return Ok(());
    }

    let to_revoke = active.len() + 1 - cap as usize;
    for record in active.into_iter().take(to_revoke) {
        RefreshToken::revoke(&mut *conn, record.id).await?;
        tracing::info!(user_id = %user_id, session_id = %record.id, "Session evicted by cap");
    }

    Ok(())
}

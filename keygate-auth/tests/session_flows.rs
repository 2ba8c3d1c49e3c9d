//! Integration tests for the session lifecycle: registration, login,
//! rotation, revocation, and credential updates.
//!
//! These tests need a PostgreSQL database; export `DATABASE_URL` to run
//! them. Each test builds its fixtures with a unique suffix, so the suite
//! is safe to run in parallel against one database.

mod common;

use common::{test_token_config, TestContext};
use keygate_auth::error::AuthError;
use keygate_auth::payload::{LoginPayload, RegisterPayload, UpdateCredentials};
use keygate_auth::session::SessionManager;
use keygate_shared::db::tx::TxManager;
use uuid::Uuid;

#[tokio::test]
async fn test_register_creates_account_and_first_session() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let result = ctx
        .manager
        .register(ctx.register_payload("reg", "hunter2hunter2"))
        .await
        .expect("registration should succeed");

    assert_eq!(result.user.login, ctx.login("reg"));
    assert_eq!(result.user.email, ctx.email("reg"));
    assert!(!result.tokens.access_token.is_empty());
    assert!(!result.tokens.refresh_token.is_empty());

    assert_eq!(ctx.active_sessions(result.user.id).await, 1);
}

#[tokio::test]
async fn test_register_rejects_duplicate_login_and_email() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    ctx.manager
        .register(ctx.register_payload("dup", "hunter2hunter2"))
        .await
        .expect("first registration should succeed");

    let same_login = ctx
        .manager
        .register(RegisterPayload {
            login: ctx.login("dup"),
            email: ctx.email("dup-other"),
            password: "hunter2hunter2".to_string(),
        })
        .await;
    assert!(matches!(same_login, Err(AuthError::Conflict(_))));

    let same_email = ctx
        .manager
        .register(RegisterPayload {
            login: ctx.login("dup-other"),
            email: ctx.email("dup"),
            password: "hunter2hunter2".to_string(),
        })
        .await;
    assert!(matches!(same_email, Err(AuthError::Conflict(_))));
}

#[tokio::test]
async fn test_concurrent_registration_has_a_single_winner() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let first = ctx.manager.register(RegisterPayload {
        login: ctx.login("race"),
        email: ctx.email("race-a"),
        password: "hunter2hunter2".to_string(),
    });
    let second = ctx.manager.register(RegisterPayload {
        login: ctx.login("race"),
        email: ctx.email("race-b"),
        password: "hunter2hunter2".to_string(),
    });

    let (first, second) = tokio::join!(first, second);

    // Exactly one side wins; the loser sees a conflict either from the
    // pre-check or from the unique index.
    assert!(first.is_ok() != second.is_ok());
    let loser = if first.is_ok() { second } else { first };
    assert!(matches!(loser, Err(AuthError::Conflict(_))));
}

#[tokio::test]
async fn test_register_rejects_invalid_payload() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let bad_email = ctx
        .manager
        .register(RegisterPayload {
            login: ctx.login("badmail"),
            email: "not-an-email".to_string(),
            password: "hunter2hunter2".to_string(),
        })
        .await;
    assert!(matches!(bad_email, Err(AuthError::BadRequest(_))));

    let long_login = ctx
        .manager
        .register(RegisterPayload {
            login: "x".repeat(51),
            email: ctx.email("longlogin"),
            password: "hunter2hunter2".to_string(),
        })
        .await;
    assert!(matches!(long_login, Err(AuthError::BadRequest(_))));
}

#[tokio::test]
async fn test_login_works_with_login_or_email() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    ctx.manager
        .register(ctx.register_payload("who", "hunter2hunter2"))
        .await
        .expect("registration should succeed");

    let by_login = ctx
        .manager
        .login(LoginPayload {
            identifier: ctx.login("who"),
            password: "hunter2hunter2".to_string(),
        })
        .await
        .expect("login by login name should succeed");
    assert_eq!(by_login.user.login, ctx.login("who"));

    let by_email = ctx
        .manager
        .login(LoginPayload {
            identifier: ctx.email("who"),
            password: "hunter2hunter2".to_string(),
        })
        .await
        .expect("login by email should succeed");
    assert_eq!(by_email.user.id, by_login.user.id);
}

#[tokio::test]
async fn test_login_distinguishes_unknown_identifier_from_wrong_password() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    ctx.manager
        .register(ctx.register_payload("errs", "hunter2hunter2"))
        .await
        .expect("registration should succeed");

    let unknown = ctx
        .manager
        .login(LoginPayload {
            identifier: ctx.login("nobody"),
            password: "hunter2hunter2".to_string(),
        })
        .await;
    assert!(matches!(unknown, Err(AuthError::NotFound(_))));

    let wrong_password = ctx
        .manager
        .login(LoginPayload {
            identifier: ctx.login("errs"),
            password: "wrong-password".to_string(),
        })
        .await;
    assert!(matches!(wrong_password, Err(AuthError::Unauthorized(_))));
}

#[tokio::test]
async fn test_login_does_not_disturb_existing_sessions() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let registered = ctx
        .manager
        .register(ctx.register_payload("multi", "hunter2hunter2"))
        .await
        .expect("registration should succeed");

    ctx.manager
        .login(LoginPayload {
            identifier: ctx.login("multi"),
            password: "hunter2hunter2".to_string(),
        })
        .await
        .expect("login should succeed");

    assert_eq!(ctx.active_sessions(registered.user.id).await, 2);

    // The first session still rotates fine.
    ctx.manager
        .refresh(&registered.tokens.refresh_token)
        .await
        .expect("first session should still be refreshable");
}

#[tokio::test]
async fn test_refresh_rotates_and_invalidates_the_old_token() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let registered = ctx
        .manager
        .register(ctx.register_payload("rot", "hunter2hunter2"))
        .await
        .expect("registration should succeed");
    let old_token = registered.tokens.refresh_token;

    let rotated = ctx
        .manager
        .refresh(&old_token)
        .await
        .expect("first refresh should succeed");
    assert_ne!(rotated.refresh_token, old_token);

    // Replaying the rotated-away token must fail.
    let replay = ctx.manager.refresh(&old_token).await;
    assert!(matches!(replay, Err(AuthError::Unauthorized(_))));

    // The freshly issued token keeps working.
    ctx.manager
        .refresh(&rotated.refresh_token)
        .await
        .expect("the new token should refresh");

    // Rotation never grows the session count.
    assert_eq!(ctx.active_sessions(registered.user.id).await, 1);
}

#[tokio::test]
async fn test_refresh_rejects_garbage_and_foreign_tokens() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let garbage = ctx.manager.refresh("not-even-a-jwt").await;
    assert!(matches!(garbage, Err(AuthError::Unauthorized(_))));

    // A structurally valid token signed with the wrong secret.
    let foreign_manager = SessionManager::new(
        TxManager::new(ctx.pool.clone()),
        keygate_auth::config::TokenConfig {
            refresh_secret: "a-different-refresh-secret-entirely!!".to_string(),
            ..test_token_config()
        },
        None,
    );
    let foreign = foreign_manager
        .register(ctx.register_payload("foreign", "hunter2hunter2"))
        .await
        .expect("registration should succeed");

    let rejected = ctx.manager.refresh(&foreign.tokens.refresh_token).await;
    assert!(matches!(rejected, Err(AuthError::Unauthorized(_))));
}

#[tokio::test]
async fn test_expired_session_is_rejected_without_revocation() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let registered = ctx
        .manager
        .register(ctx.register_payload("exp", "hunter2hunter2"))
        .await
        .expect("registration should succeed");

    ctx.expire_sessions(registered.user.id).await;

    let result = ctx.manager.refresh(&registered.tokens.refresh_token).await;
    assert!(matches!(result, Err(AuthError::Unauthorized(_))));

    // The matched record was not revoked, only rejected.
    let (unrevoked,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM refresh_tokens
         WHERE user_id = $1 AND revoked_at IS NULL",
    )
    .bind(registered.user.id)
    .fetch_one(&ctx.pool)
    .await
    .expect("failed to count rows");
    assert_eq!(unrevoked, 1);
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let registered = ctx
        .manager
        .register(ctx.register_payload("out", "hunter2hunter2"))
        .await
        .expect("registration should succeed");
    let token = registered.tokens.refresh_token;

    ctx.manager.logout(&token).await.expect("logout should succeed");
    assert_eq!(ctx.active_sessions(registered.user.id).await, 0);

    // A second logout of the same token, and of garbage, both succeed.
    ctx.manager
        .logout(&token)
        .await
        .expect("repeated logout should succeed");
    ctx.manager
        .logout("not-even-a-jwt")
        .await
        .expect("logout of garbage should succeed");

    // The session is really gone.
    let refresh = ctx.manager.refresh(&token).await;
    assert!(matches!(refresh, Err(AuthError::Unauthorized(_))));
}

#[tokio::test]
async fn test_logout_all_revokes_every_session_and_reports_the_count() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let registered = ctx
        .manager
        .register(ctx.register_payload("all", "hunter2hunter2"))
        .await
        .expect("registration should succeed");

    for _ in 0..2 {
        ctx.manager
            .login(LoginPayload {
                identifier: ctx.login("all"),
                password: "hunter2hunter2".to_string(),
            })
            .await
            .expect("login should succeed");
    }

    let revoked = ctx
        .manager
        .logout_all(registered.user.id)
        .await
        .expect("logout_all should succeed");
    assert_eq!(revoked, 3);
    assert_eq!(ctx.active_sessions(registered.user.id).await, 0);

    // Nothing left to revoke on the second pass.
    let again = ctx
        .manager
        .logout_all(registered.user.id)
        .await
        .expect("repeated logout_all should succeed");
    assert_eq!(again, 0);
}

#[tokio::test]
async fn test_update_credentials_guards_bad_requests() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let registered = ctx
        .manager
        .register(ctx.register_payload("guard", "hunter2hunter2"))
        .await
        .expect("registration should succeed");
    let user_id = registered.user.id;

    let noop = ctx
        .manager
        .update_credentials(user_id, UpdateCredentials::default())
        .await;
    assert!(matches!(noop, Err(AuthError::BadRequest(_))));

    let missing_current = ctx
        .manager
        .update_credentials(
            user_id,
            UpdateCredentials {
                new_password: Some("a-new-password".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(missing_current, Err(AuthError::BadRequest(_))));

    let wrong_current = ctx
        .manager
        .update_credentials(
            user_id,
            UpdateCredentials {
                current_password: Some("wrong-password".to_string()),
                new_password: Some("a-new-password".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(wrong_current, Err(AuthError::Unauthorized(_))));

    let unknown_user = ctx
        .manager
        .update_credentials(
            Uuid::new_v4(),
            UpdateCredentials {
                login: Some(ctx.login("ghost")),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(unknown_user, Err(AuthError::Unauthorized(_))));
}

#[tokio::test]
async fn test_password_change_revokes_all_sessions() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let registered = ctx
        .manager
        .register(ctx.register_payload("pwchg", "old-password-123"))
        .await
        .expect("registration should succeed");

    let second = ctx
        .manager
        .login(LoginPayload {
            identifier: ctx.login("pwchg"),
            password: "old-password-123".to_string(),
        })
        .await
        .expect("login should succeed");

    ctx.manager
        .update_credentials(
            registered.user.id,
            UpdateCredentials {
                current_password: Some("old-password-123".to_string()),
                new_password: Some("new-password-456".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("password change should succeed");

    // Every pre-change session is dead.
    assert_eq!(ctx.active_sessions(registered.user.id).await, 0);
    let old_refresh = ctx.manager.refresh(&registered.tokens.refresh_token).await;
    assert!(matches!(old_refresh, Err(AuthError::Unauthorized(_))));
    let other_refresh = ctx.manager.refresh(&second.tokens.refresh_token).await;
    assert!(matches!(other_refresh, Err(AuthError::Unauthorized(_))));

    // Only the new password opens the account now.
    let old_login = ctx
        .manager
        .login(LoginPayload {
            identifier: ctx.login("pwchg"),
            password: "old-password-123".to_string(),
        })
        .await;
    assert!(matches!(old_login, Err(AuthError::Unauthorized(_))));

    ctx.manager
        .login(LoginPayload {
            identifier: ctx.login("pwchg"),
            password: "new-password-456".to_string(),
        })
        .await
        .expect("login with the new password should succeed");
}

#[tokio::test]
async fn test_update_credentials_rejects_values_held_by_another_account() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    ctx.manager
        .register(ctx.register_payload("holder", "hunter2hunter2"))
        .await
        .expect("registration should succeed");
    let claimant = ctx
        .manager
        .register(ctx.register_payload("claimant", "hunter2hunter2"))
        .await
        .expect("registration should succeed");

    let taken_login = ctx
        .manager
        .update_credentials(
            claimant.user.id,
            UpdateCredentials {
                login: Some(ctx.login("holder")),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(taken_login, Err(AuthError::Conflict(_))));

    let taken_email = ctx
        .manager
        .update_credentials(
            claimant.user.id,
            UpdateCredentials {
                email: Some(ctx.email("holder")),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(taken_email, Err(AuthError::Conflict(_))));

    // Re-asserting your own current values is not a conflict.
    ctx.manager
        .update_credentials(
            claimant.user.id,
            UpdateCredentials {
                login: Some(ctx.login("claimant")),
                ..Default::default()
            },
        )
        .await
        .expect("keeping your own login should succeed");
}

#[tokio::test]
async fn test_session_cap_evicts_the_oldest_session() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let capped = SessionManager::new(
        TxManager::new(ctx.pool.clone()),
        test_token_config(),
        Some(2),
    );

    let first = capped
        .register(ctx.register_payload("cap", "hunter2hunter2"))
        .await
        .expect("registration should succeed");

    let second = capped
        .login(LoginPayload {
            identifier: ctx.login("cap"),
            password: "hunter2hunter2".to_string(),
        })
        .await
        .expect("second session should succeed");

    let third = capped
        .login(LoginPayload {
            identifier: ctx.login("cap"),
            password: "hunter2hunter2".to_string(),
        })
        .await
        .expect("third session should succeed");

    assert_eq!(ctx.active_sessions(first.user.id).await, 2);

    // The oldest session was evicted; the newer two still work.
    let evicted = capped.refresh(&first.tokens.refresh_token).await;
    assert!(matches!(evicted, Err(AuthError::Unauthorized(_))));

    capped
        .refresh(&second.tokens.refresh_token)
        .await
        .expect("second session should survive");
    capped
        .refresh(&third.tokens.refresh_token)
        .await
        .expect("third session should survive");
}

#[tokio::test]
async fn test_get_current_reflects_credential_updates() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let registered = ctx
        .manager
        .register(ctx.register_payload("cur", "hunter2hunter2"))
        .await
        .expect("registration should succeed");

    ctx.manager
        .update_credentials(
            registered.user.id,
            UpdateCredentials {
                login: Some(ctx.login("cur-renamed")),
                ..Default::default()
            },
        )
        .await
        .expect("rename should succeed");

    let current = ctx
        .manager
        .get_current(registered.user.id)
        .await
        .expect("get_current should succeed");
    assert_eq!(current.login, ctx.login("cur-renamed"));
    assert_eq!(current.email, ctx.email("cur"));

    let missing = ctx.manager.get_current(Uuid::new_v4()).await;
    assert!(matches!(missing, Err(AuthError::NotFound(_))));
}

/// Transaction runner for multi-statement mutations
///
/// The session core never writes a business row and its outbox row in
/// separate transactions. [`TxManager::run`] opens a transaction, hands the
/// connection to a closure, and commits only if the closure succeeds. On
/// any error the transaction is rolled back, so a failed mutation leaves
/// neither a business row nor an event row behind.
///
/// # Example
///
/// ```no_run
/// use keygate_shared::db::tx::TxManager;
/// use keygate_shared::models::user::{CreateUser, User};
/// use sqlx::{PgConnection, PgPool};
///
/// async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
///     let tx = TxManager::new(pool);
///     let user = tx
///         .run(move |conn: &mut PgConnection| {
///             Box::pin(async move {
///                 User::create(
///                     &mut *conn,
///                     CreateUser {
///                         login: "ada".to_string(),
///                         email: "ada@example.com".to_string(),
///                         password_hash: "$argon2id$...".to_string(),
///                     },
///                 )
///                 .await
///             })
///         })
///         .await?;
///     println!("created {}", user.id);
///     Ok(())
/// }
/// ```

use futures::future::BoxFuture;
use sqlx::{PgConnection, PgPool};
use tracing::warn;

/// Runs closures inside database transactions
#[derive(Debug, Clone)]
pub struct TxManager {
    pool: PgPool,
}

impl TxManager {
    /// Creates a transaction manager backed by the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool for single-statement reads that do not
    /// need transactional scope.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs `work` inside a transaction.
    ///
    /// The transaction commits only when `work` returns `Ok`; any `Err`
    /// rolls it back and is returned unchanged. A rollback failure is
    /// logged, not surfaced, since the original error is the one callers
    /// need to see.
    ///
    /// Closures must own everything they capture, so clone configuration
    /// values before moving them in:
    ///
    /// ```ignore
    /// let result = tx.run(move |conn: &mut PgConnection| {
    ///     Box::pin(async move {
    ///         // queries against `conn` here
    ///         Ok(value)
    ///     })
    /// }).await?;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or the begin/commit failure converted
    /// through `E: From<sqlx::Error>`.
    pub async fn run<T, E, F>(&self, work: F) -> Result<T, E>
    where
        E: From<sqlx::Error>,
        F: for<'t> FnOnce(&'t mut PgConnection) -> BoxFuture<'t, Result<T, E>>,
    {
        let mut tx = self.pool.begin().await.map_err(E::from)?;

        match work(&mut *tx).await {
            Ok(value) => {
                tx.commit().await.map_err(E::from)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Transaction rollback failed");
                }
                Err(err)
            }
        }
    }
}

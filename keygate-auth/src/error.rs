/// Error types for the auth service
///
/// Every session operation returns [`AuthError`]. The variants map onto
/// the outcomes callers distinguish: bad input, failed authentication, a
/// missing record, a uniqueness conflict, or an internal fault. Database
/// errors are translated in the `From` impl below so business code can
/// use `?` on query results.

use keygate_shared::auth::password::PasswordError;
use keygate_shared::auth::token_digest::DigestError;
use thiserror::Error;

/// Errors returned by session operations
#[derive(Debug, Error)]
pub enum AuthError {
    /// The request payload is malformed or asks for nothing
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Authentication failed; deliberately vague to callers
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The referenced record does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// A unique value is already held by another account
    #[error("conflict: {0}")]
    Conflict(String),

    /// Something went wrong that the caller cannot fix
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AuthError::NotFound("record not found".to_string()),
            sqlx::Error::Database(db_err) => {
                // Unique-index violations surface here when a concurrent
                // writer wins the race past the application-level checks.
                if let Some(constraint) = db_err.constraint() {
                    if constraint.contains("login") {
                        return AuthError::Conflict("login already in use".to_string());
                    }
                    if constraint.contains("email") {
                        return AuthError::Conflict("email already in use".to_string());
                    }
                    return AuthError::Conflict(format!("constraint {constraint} violated"));
                }
                AuthError::Internal(err.to_string())
            }
            _ => AuthError::Internal(err.to_string()),
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<DigestError> for AuthError {
    fn from(err: DigestError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AuthError::BadRequest(errors.to_string())
    }
}

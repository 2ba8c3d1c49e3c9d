/// JWT creation and validation for Keygate tokens
///
/// Both token families are HS256-signed JWTs carrying the same claim set;
/// they differ in the signing secret and the `token_type` claim. Access
/// tokens authenticate requests and are never stored. Refresh tokens are
/// additionally persisted as argon2 digests (see
/// [`token_digest`](crate::auth::token_digest)) so the session store can
/// match and revoke them.
///
/// # Example
///
/// ```
/// use chrono::Duration;
/// use keygate_shared::auth::jwt::{create_token, validate_token, Claims, TokenType};
/// use uuid::Uuid;
///
/// let claims = Claims::new(
///     Uuid::new_v4(),
///     "ada",
///     "ada@example.com",
///     TokenType::Access,
///     Duration::minutes(15),
/// );
/// let token = create_token(&claims, "a-secret-for-doc-tests").unwrap();
/// let decoded = validate_token(&token, "a-secret-for-doc-tests").unwrap();
/// assert_eq!(decoded.sub, claims.sub);
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer claim stamped into and required from every Keygate token
pub const ISSUER: &str = "keygate";

/// Errors that can occur during JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Token creation failed
    #[error("failed to create token: {0}")]
    CreateError(String),

    /// Token validation failed
    #[error("token validation failed: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("token has expired")]
    Expired,

    /// Token was not issued by this service
    #[error("token issuer is not {expected}")]
    InvalidIssuer {
        /// The issuer this service requires
        expected: String,
    },

    /// Token is of the wrong type for the operation
    #[error("expected a {expected} token, got a {actual} token")]
    WrongTokenType {
        /// The token type the caller required
        expected: &'static str,
        /// The token type found in the claims
        actual: &'static str,
    },
}

/// Distinguishes access tokens from refresh tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived token presented on requests
    Access,

    /// Long-lived token exchanged for new token pairs
    Refresh,
}

impl TokenType {
    /// Returns the string representation used in claims and log output.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// Claims carried by every Keygate JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's id
    pub sub: Uuid,

    /// The user's login at issuance time
    pub login: String,

    /// The user's email at issuance time
    pub email: String,

    /// Issuer, always [`ISSUER`]
    pub iss: String,

    /// Unique token id, so two tokens minted in the same second still differ
    pub jti: Uuid,

    /// Issued-at, seconds since the epoch
    pub iat: i64,

    /// Expiration, seconds since the epoch
    pub exp: i64,

    /// Not-before, seconds since the epoch
    pub nbf: i64,

    /// Whether this is an access or a refresh token
    pub token_type: TokenType,
}

impl Claims {
    /// Creates claims for the given user expiring after `expires_in`.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The user the token is issued to
    /// * `login` - The user's current login
    /// * `email` - The user's current email
    /// * `token_type` - Access or refresh
    /// * `expires_in` - Lifetime of the token
    pub fn new(
        user_id: Uuid,
        login: &str,
        email: &str,
        token_type: TokenType,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            login: login.to_string(),
            email: email.to_string(),
            iss: ISSUER.to_string(),
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: now.timestamp(),
            token_type,
        }
    }

    /// Returns true if the expiration timestamp is in the past.
    pub fn is_expired(&self) -> bool {
        self.exp < Utc::now().timestamp()
    }

    /// Returns the time remaining until expiration, or zero if expired.
    pub fn time_until_expiration(&self) -> Duration {
        let remaining = self.exp - Utc::now().timestamp();
        Duration::seconds(remaining.max(0))
    }
}

/// Signs the given claims into a JWT.
///
/// # Arguments
///
/// * `claims` - The claims to encode
/// * `secret` - The signing secret for this token family
///
/// # Errors
///
/// Returns [`JwtError::CreateError`] if encoding fails.
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key).map_err(|e| JwtError::CreateError(e.to_string()))
}

/// Validates a JWT signature and standard claims, returning the claims.
///
/// Enforces the signature, expiration, not-before, and issuer. Callers
/// that care about the token family should use [`validate_access_token`]
/// or [`validate_refresh_token`] instead.
///
/// # Errors
///
/// Returns [`JwtError::Expired`] for expired tokens,
/// [`JwtError::InvalidIssuer`] for tokens minted by someone else, and
/// [`JwtError::ValidationError`] for anything else.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer {
            expected: ISSUER.to_string(),
        },
        _ => JwtError::ValidationError(e.to_string()),
    })?;

    Ok(data.claims)
}

/// Validates a token and requires it to be an access token.
///
/// # Errors
///
/// Returns [`JwtError::WrongTokenType`] if the token is a refresh token,
/// plus everything [`validate_token`] can return.
pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let claims = validate_token(token, secret)?;

    if claims.token_type != TokenType::Access {
        return Err(JwtError::WrongTokenType {
            expected: TokenType::Access.as_str(),
            actual: claims.token_type.as_str(),
        });
    }

    Ok(claims)
}

/// Validates a token and requires it to be a refresh token.
///
/// # Errors
///
/// Returns [`JwtError::WrongTokenType`] if the token is an access token,
/// plus everything [`validate_token`] can return.
pub fn validate_refresh_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let claims = validate_token(token, secret)?;

    if claims.token_type != TokenType::Refresh {
        return Err(JwtError::WrongTokenType {
            expected: TokenType::Refresh.as_str(),
            actual: claims.token_type.as_str(),
        });
    }

    Ok(claims)
}

/// Argon2 digests for refresh tokens at rest
///
/// Refresh tokens are random-looking signed JWTs, not human-chosen
/// secrets, so they get a lighter parameter set than passwords. The
/// rotation scan verifies a presented token against every unrevoked digest
/// a user holds, which makes digest cost a per-request multiplier.
///
/// # Example
///
/// ```
/// use keygate_shared::auth::token_digest::{hash_token, verify_token};
///
/// let digest = hash_token("eyJhbGciOiJIUzI1NiJ9.e30.signature").unwrap();
/// assert!(verify_token("eyJhbGciOiJIUzI1NiJ9.e30.signature", &digest).unwrap());
/// assert!(!verify_token("some-other-token", &digest).unwrap());
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};

/// Errors that can occur while hashing or matching token digests
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    /// Hashing failed
    #[error("failed to hash token: {0}")]
    HashError(String),

    /// Matching failed for a reason other than a non-matching token
    #[error("failed to verify token digest: {0}")]
    VerifyError(String),

    /// The stored digest is not a valid PHC string
    #[error("invalid token digest: {0}")]
    InvalidDigest(String),
}

/// Hashes a refresh token for storage.
///
/// # Errors
///
/// Returns [`DigestError::HashError`] if hashing fails.
pub fn hash_token(token: &str) -> Result<String, DigestError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = ParamsBuilder::new()
        .m_cost(16384) // 16 MB
        .t_cost(2)
        .p_cost(1)
        .output_len(32)
        .build()
        .map_err(|e| DigestError::HashError(e.to_string()))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let digest = argon2
        .hash_password(token.as_bytes(), &salt)
        .map_err(|e| DigestError::HashError(e.to_string()))?;

    Ok(digest.to_string())
}

/// Checks a presented token against a stored digest.
///
/// # Returns
///
/// `Ok(true)` if the token produced this digest, `Ok(false)` otherwise.
///
/// # Errors
///
/// Returns [`DigestError::InvalidDigest`] if the stored digest cannot be
/// parsed, or [`DigestError::VerifyError`] for other failures.
pub fn verify_token(token: &str, digest: &str) -> Result<bool, DigestError> {
    let parsed =
        PasswordHash::new(digest).map_err(|e| DigestError::InvalidDigest(e.to_string()))?;

    match Argon2::default().verify_password(token.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(DigestError::VerifyError(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let digest = hash_token("a.refresh.token").unwrap();
        assert!(verify_token("a.refresh.token", &digest).unwrap());
    }

    #[test]
    fn test_verify_rejects_different_token() {
        let digest = hash_token("a.refresh.token").unwrap();
        assert!(!verify_token("another.refresh.token", &digest).unwrap());
    }

    #[test]
    fn test_same_token_hashes_differently() {
        let first = hash_token("a.refresh.token").unwrap();
        let second = hash_token("a.refresh.token").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_rejects_malformed_digest() {
        let result = verify_token("a.refresh.token", "garbage");
        assert!(matches!(result, Err(DigestError::InvalidDigest(_))));
    }
}

/// Password hashing and verification using Argon2id
///
/// Passwords are hashed with a 64 MB memory cost before they touch the
/// database. Verification reads the parameters back out of the stored PHC
/// string, so parameter changes only affect newly hashed passwords.
///
/// # Example
///
/// ```
/// use keygate_shared::auth::password::{hash_password, verify_password};
///
/// let hash = hash_password("correct horse battery staple").unwrap();
/// assert!(verify_password("correct horse battery staple", &hash).unwrap());
/// assert!(!verify_password("tr0ub4dor&3", &hash).unwrap());
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};

/// Errors that can occur during password operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Hashing failed
    #[error("failed to hash password: {0}")]
    HashError(String),

    /// Verification failed for a reason other than a wrong password
    #[error("failed to verify password: {0}")]
    VerifyError(String),

    /// The stored hash is not a valid PHC string
    #[error("invalid password hash: {0}")]
    InvalidHash(String),
}

/// Hashes a password with Argon2id and a freshly generated salt.
///
/// # Arguments
///
/// * `password` - The plaintext password to hash
///
/// # Returns
///
/// A PHC-format string containing the algorithm, parameters, salt, and
/// digest, suitable for storing in the `password_hash` column.
///
/// # Errors
///
/// Returns [`PasswordError::HashError`] if hashing fails.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = ParamsBuilder::new()
        .m_cost(65536) // 64 MB
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(e.to_string()))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(e.to_string()))?;

    Ok(hash.to_string())
}

/// Verifies a password against a stored hash.
///
/// # Arguments
///
/// * `password` - The plaintext password to check
/// * `hash` - The stored PHC-format hash
///
/// # Returns
///
/// `Ok(true)` if the password matches, `Ok(false)` if it does not.
///
/// # Errors
///
/// Returns [`PasswordError::InvalidHash`] if the stored hash cannot be
/// parsed, or [`PasswordError::VerifyError`] for other failures.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hash = hash_password("my-secure-password").unwrap();
        assert!(verify_password("my-secure-password", &hash).unwrap());
    }

    #[test]
    fn test_verify_rejects_wrong_password() {
        let hash = hash_password("my-secure-password").unwrap();
        assert!(!verify_password("not-my-password", &hash).unwrap());
    }

    #[test]
    fn test_hash_uses_argon2id_phc_format() {
        let hash = hash_password("my-secure-password").unwrap();
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_same_password_hashes_differently() {
        let first = hash_password("my-secure-password").unwrap();
        let second = hash_password("my-secure-password").unwrap();
        // Different salts, different digests.
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        let result = verify_password("anything", "not-a-phc-string");
        assert!(matches!(result, Err(PasswordError::InvalidHash(_))));
    }

    #[test]
    fn test_empty_password_roundtrip() {
        let hash = hash_password("").unwrap();
        assert!(verify_password("", &hash).unwrap());
        assert!(!verify_password("x", &hash).unwrap());
    }

    #[test]
    fn test_unicode_password_roundtrip() {
        let hash = hash_password("пароль-密码-🔑").unwrap();
        assert!(verify_password("пароль-密码-🔑", &hash).unwrap());
    }
}

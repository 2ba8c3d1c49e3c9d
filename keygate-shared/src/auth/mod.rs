/// Authentication primitives for Keygate.
///
/// This module provides the cryptographic building blocks of the session
/// core:
///
/// - [`jwt`]: Signing and validation of access and refresh tokens
/// - [`password`]: Argon2id hashing and verification for user passwords
/// - [`token_digest`]: Cheaper argon2 digests for refresh tokens at rest
///
/// # Security Features
///
/// - Passwords and refresh tokens are only ever stored as salted digests
/// - Access and refresh tokens are signed with separate secrets
/// - Token validation rejects expired, not-yet-valid, and wrong-issuer JWTs

pub mod jwt;
pub mod password;
pub mod token_digest;

//! # Keygate Shared Library
//!
//! Common types and utilities shared between the Keygate auth service and
//! the outbox relay.
//!
//! ## Module Organization
//!
//! - `auth`: JWT handling and argon2 hashing for passwords and refresh tokens
//! - `db`: Connection pooling, migrations, and the transaction runner
//! - `events`: The envelope format published to the message broker
//! - `models`: Database models and their query functions

pub mod auth;
pub mod db;
pub mod events;
pub mod models;

/// Crate version, useful for logging and diagnostics
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

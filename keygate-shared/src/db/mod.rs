/// Database layer for Keygate services.
///
/// This module provides connection pooling, migration management, and the
/// transaction runner that keeps business mutations and their outbox rows
/// in a single commit.
///
/// # Modules
///
/// - [`pool`]: Connection pool creation and lifecycle
/// - [`migrations`]: Schema migration runner and status reporting
/// - [`tx`]: Transaction runner used by the session core

pub mod migrations;
pub mod pool;
pub mod tx;

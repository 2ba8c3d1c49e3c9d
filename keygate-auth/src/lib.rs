//! # Keygate Auth Service
//!
//! The session core of Keygate: account registration, login, refresh-token
//! rotation, and credential updates. Every mutation that other systems
//! care about also appends an outbox row in the same transaction; the
//! relay binary drains those rows to the broker.
//!
//! ## Modules
//!
//! - `config`: Environment-driven configuration
//! - `error`: The service error type and database error mapping
//! - `payload`: Validated request payloads
//! - `session`: The session manager, home of all account operations

pub mod config;
pub mod error;
pub mod payload;
pub mod session;

//! # Keygate Outbox Relay
//!
//! The delivery half of Keygate's transactional outbox. The auth service
//! appends event rows in the same transaction as the mutations they
//! describe; this crate polls those rows and publishes each one to Kafka,
//! recording the outcome per event. Delivery is at-least-once: an event
//! whose `SENT` mark is lost is published again, under the same message
//! key, on a later tick.
//!
//! ## Modules
//!
//! - `config`: Environment-driven configuration
//! - `error`: The relay error type
//! - `source`: Storage seam over the outbox table
//! - `publisher`: Broker seam and the Kafka producer behind it
//! - `relay`: The tick and the drain loop

pub mod config;
pub mod error;
pub mod publisher;
pub mod relay;
pub mod source;

/// Database models for Keygate.
///
/// Every query function in this module takes a `&mut PgConnection` rather
/// than a pool, so the same function works inside a transaction opened by
/// [`TxManager`](crate::db::tx::TxManager) and on a plain pooled
/// connection for single reads.
///
/// # Modules
///
/// - [`user`]: Account records and credential updates
/// - [`refresh_token`]: Persisted refresh-token sessions
/// - [`outbox_event`]: Event rows drained to the broker by the relay

pub mod outbox_event;
pub mod refresh_token;
pub mod user;

/// Configuration management for the outbox relay
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct. A `.env` file is honored in
/// development. The relay shares `DATABASE_URL` with the auth service; the
/// Kafka settings are its own.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `KAFKA_BROKERS`: Comma separated broker list, e.g. `kafka:9092` (required)
/// - `KAFKA_AUTH_TOPIC`: Topic that receives auth events (required)
/// - `OUTBOX_POLL_INTERVAL_MS`: Pause between ticks (default: 2000)
/// - `OUTBOX_BATCH_SIZE`: Max events per tick (default: 50)
///
/// # Example
///
/// ```no_run
/// use keygate_relay::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Publishing to {}", config.relay.topic);
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Settings that shape a single relay tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Topic every envelope is published to
    pub topic: String,

    /// Pause between the end of one tick and the start of the next
    pub poll_interval: Duration,

    /// Upper bound on events fetched per tick
    pub batch_size: i64,
}

/// Complete relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Comma separated Kafka broker list
    pub kafka_brokers: String,

    /// Tick cadence, batch bound and target topic
    pub relay: RelayConfig,
}

impl Config {
    /// Loads configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending variable when a required
    /// variable is missing or an optional one does not parse as a
    /// positive integer.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let kafka_brokers = env::var("KAFKA_BROKERS")
            .map_err(|_| anyhow::anyhow!("KAFKA_BROKERS environment variable is required"))?;

        let topic = env::var("KAFKA_AUTH_TOPIC")
            .map_err(|_| anyhow::anyhow!("KAFKA_AUTH_TOPIC environment variable is required"))?;

        let poll_interval_ms = positive_or_default("OUTBOX_POLL_INTERVAL_MS", 2000)?;
        let batch_size = positive_or_default("OUTBOX_BATCH_SIZE", 50)?;

        Ok(Self {
            database_url,
            kafka_brokers,
            relay: RelayConfig {
                topic,
                poll_interval: Duration::from_millis(u64::from(poll_interval_ms)),
                batch_size: i64::from(batch_size),
            },
        })
    }
}

fn positive_or_default(name: &str, default: u32) -> anyhow::Result<u32> {
    match env::var(name) {
        Ok(raw) => {
            let value: u32 = raw
                .parse()
                .map_err(|_| anyhow::anyhow!("{name} must be a positive integer"))?;
            if value == 0 {
                anyhow::bail!("{name} must be at least 1");
            }
            Ok(value)
        }
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_or_default_falls_back_when_unset() {
        assert_eq!(
            positive_or_default("KEYGATE_TEST_UNSET_VARIABLE", 2000).unwrap(),
            2000
        );
    }

    #[test]
    fn test_positive_or_default_reads_the_variable() {
        env::set_var("KEYGATE_TEST_POLL_INTERVAL", "500");
        assert_eq!(
            positive_or_default("KEYGATE_TEST_POLL_INTERVAL", 2000).unwrap(),
            500
        );
    }

    #[test]
    fn test_positive_or_default_rejects_garbage() {
        env::set_var("KEYGATE_TEST_BATCH_SIZE", "fifty");
        assert!(positive_or_default("KEYGATE_TEST_BATCH_SIZE", 50).is_err());

        env::set_var("KEYGATE_TEST_ZERO_BATCH", "0");
        assert!(positive_or_default("KEYGATE_TEST_ZERO_BATCH", 50).is_err());
    }

    #[test]
    fn test_relay_config_construction() {
        let config = RelayConfig {
            topic: "auth.events".to_string(),
            poll_interval: Duration::from_millis(2000),
            batch_size: 50,
        };

        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.batch_size, 50);
    }
}

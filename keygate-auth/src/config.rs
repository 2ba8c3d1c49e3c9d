/// Configuration management for the auth service
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct. A `.env` file is honored in
/// development. Secrets are validated for minimum length at startup so a
/// misconfigured deployment fails fast instead of signing tokens with a
/// weak key.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `ACCESS_TOKEN_SECRET`: HS256 secret for access tokens, 32+ chars (required)
/// - `REFRESH_TOKEN_SECRET`: HS256 secret for refresh tokens, 32+ chars (required)
/// - `ACCESS_TOKEN_TTL`: Access token lifetime, e.g. `15m` (required)
/// - `REFRESH_TOKEN_TTL`: Refresh token lifetime, e.g. `7d` (required)
/// - `MAX_SESSIONS_PER_USER`: Cap on live sessions per account (optional)
///
/// # Example
///
/// ```no_run
/// use keygate_auth::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Refresh sessions live for {}", config.tokens.refresh_ttl);
/// # Ok(())
/// # }
/// ```

use chrono::Duration;
use std::env;

/// Secrets and lifetimes for the two token families
///
/// Token lifetimes are [`chrono::Duration`]s rather than serialized
/// strings, so this struct stays plain data with no serde derives.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// HS256 secret for access tokens
    pub access_secret: String,

    /// Access token lifetime
    pub access_ttl: Duration,

    /// HS256 secret for refresh tokens
    pub refresh_secret: String,

    /// Refresh token lifetime; also the stored session expiry
    pub refresh_ttl: Duration,
}

/// Complete auth service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Token signing configuration
    pub tokens: TokenConfig,

    /// When set, issuing a session beyond this count revokes the oldest
    pub max_sessions_per_user: Option<u32>,
}

impl Config {
    /// Loads configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending variable when a required
    /// variable is missing, a secret is too short, a TTL does not parse,
    /// or the session cap is zero.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let access_secret = required_secret("ACCESS_TOKEN_SECRET")?;
        let refresh_secret = required_secret("REFRESH_TOKEN_SECRET")?;

        let access_ttl_raw = env::var("ACCESS_TOKEN_TTL")
            .map_err(|_| anyhow::anyhow!("ACCESS_TOKEN_TTL environment variable is required"))?;
        let access_ttl =
            parse_ttl(&access_ttl_raw).map_err(|e| anyhow::anyhow!("ACCESS_TOKEN_TTL: {e}"))?;

        let refresh_ttl_raw = env::var("REFRESH_TOKEN_TTL")
            .map_err(|_| anyhow::anyhow!("REFRESH_TOKEN_TTL environment variable is required"))?;
        let refresh_ttl =
            parse_ttl(&refresh_ttl_raw).map_err(|e| anyhow::anyhow!("REFRESH_TOKEN_TTL: {e}"))?;

        let max_sessions_per_user = match env::var("MAX_SESSIONS_PER_USER") {
            Ok(raw) => {
                let cap: u32 = raw.parse().map_err(|_| {
                    anyhow::anyhow!("MAX_SESSIONS_PER_USER must be a positive integer")
                })?;
                if cap == 0 {
                    anyhow::bail!("MAX_SESSIONS_PER_USER must be at least 1");
                }
                Some(cap)
            }
            Err(_) => None,
        };

        Ok(Self {
            database_url,
            tokens: TokenConfig {
                access_secret,
                access_ttl,
                refresh_secret,
                refresh_ttl,
            },
            max_sessions_per_user,
        })
    }
}

fn required_secret(name: &str) -> anyhow::Result<String> {
    let value =
        env::var(name).map_err(|_| anyhow::anyhow!("{name} environment variable is required"))?;

    if value.len() < 32 {
        anyhow::bail!("{name} must be at least 32 characters long");
    }

    Ok(value)
}

/// Parses a lifetime of the form `<number><unit>` where the unit is one of
/// `s`, `m`, `h`, or `d`.
///
/// # Example
///
/// ```
/// use keygate_auth::config::parse_ttl;
///
/// assert_eq!(parse_ttl("15m").unwrap(), chrono::Duration::minutes(15));
/// assert!(parse_ttl("15").is_err());
/// ```
pub fn parse_ttl(raw: &str) -> Result<Duration, String> {
    let Some(unit) = raw.chars().last() else {
        return Err("TTL must not be empty".to_string());
    };

    let digits = &raw[..raw.len() - unit.len_utf8()];
    let amount: u32 = digits
        .parse()
        .map_err(|_| format!("TTL '{raw}' must be a whole number followed by s, m, h or d"))?;

    if amount == 0 {
        return Err(format!("TTL '{raw}' must be positive"));
    }

    let amount = i64::from(amount);
    match unit {
        's' => Ok(Duration::seconds(amount)),
        'm' => Ok(Duration::minutes(amount)),
        'h' => Ok(Duration::hours(amount)),
        'd' => Ok(Duration::days(amount)),
        other => Err(format!("TTL '{raw}' has unknown unit '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ttl_units() {
        assert_eq!(parse_ttl("900s").unwrap(), Duration::seconds(900));
        assert_eq!(parse_ttl("15m").unwrap(), Duration::minutes(15));
        assert_eq!(parse_ttl("12h").unwrap(), Duration::hours(12));
        assert_eq!(parse_ttl("7d").unwrap(), Duration::days(7));
    }

    #[test]
    fn test_parse_ttl_rejects_bad_input() {
        assert!(parse_ttl("").is_err());
        assert!(parse_ttl("15").is_err());
        assert!(parse_ttl("m").is_err());
        assert!(parse_ttl("15w").is_err());
        assert!(parse_ttl("0s").is_err());
        assert!(parse_ttl("-5s").is_err());
        assert!(parse_ttl("1.5h").is_err());
    }

    #[test]
    fn test_config_construction() {
        let config = Config {
            database_url: "postgres://localhost/keygate".to_string(),
            tokens: TokenConfig {
                access_secret: "an-access-secret-long-enough-for-tests!".to_string(),
                access_ttl: Duration::minutes(15),
                refresh_secret: "a-refresh-secret-long-enough-for-tests".to_string(),
                refresh_ttl: Duration::days(7),
            },
            max_sessions_per_user: Some(5),
        };

        assert_eq!(config.tokens.access_ttl, Duration::minutes(15));
        assert_eq!(config.max_sessions_per_user, Some(5));
    }
}

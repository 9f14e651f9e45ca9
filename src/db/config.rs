//! Connection settings for the PostgreSQL backend.

use std::env;
use std::time::Duration;

/// Pool settings for [`Database`](super::Database).
///
/// Production deployments read these from the environment;
/// [`DatabaseConfig::development`] points at a local database with
/// defaults sized for a single league server.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long to wait for a pooled connection before giving up
    pub acquire_timeout: Duration,
    /// Idle time after which a pooled connection is dropped
    pub idle_timeout: Duration,
    /// Hard cap on any connection's lifetime
    pub max_lifetime: Duration,
}

impl DatabaseConfig {
    /// Read the settings from the environment. `DATABASE_URL` is required;
    /// the pool knobs (`DB_MAX_CONNECTIONS`, `DB_MIN_CONNECTIONS`,
    /// `DB_ACQUIRE_TIMEOUT_SECS`, `DB_IDLE_TIMEOUT_SECS`,
    /// `DB_MAX_LIFETIME_SECS`) fall back to the development defaults.
    ///
    /// # Panics
    ///
    /// Panics if `DATABASE_URL` is missing or a pool knob is set but not
    /// numeric.
    pub fn from_env() -> Self {
        let base = Self::development();
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            max_connections: env_number("DB_MAX_CONNECTIONS", base.max_connections),
            min_connections: env_number("DB_MIN_CONNECTIONS", base.min_connections),
            acquire_timeout: env_seconds("DB_ACQUIRE_TIMEOUT_SECS", base.acquire_timeout),
            idle_timeout: env_seconds("DB_IDLE_TIMEOUT_SECS", base.idle_timeout),
            max_lifetime: env_seconds("DB_MAX_LIFETIME_SECS", base.max_lifetime),
        }
    }

    /// Settings for a local development database.
    pub fn development() -> Self {
        Self {
            database_url: "postgres://postgres@localhost/matchpoint_dev".to_string(),
            max_connections: 20,
            min_connections: 5,
            acquire_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::development()
    }
}

fn env_number(name: &str, default: u32) -> u32 {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{name} must be a number")),
        Err(_) => default,
    }
}

fn env_seconds(name: &str, default: Duration) -> Duration {
    match env::var(name) {
        Ok(raw) => Duration::from_secs(
            raw.parse()
                .unwrap_or_else(|_| panic!("{name} must be a number of seconds")),
        ),
        Err(_) => default,
    }
}

use crate::error::ListenerError;
use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;
use std::time::Duration;

/// Shortest wait between two failed reconnection attempts.
pub const DEFAULT_MIN_RECONNECT_INTERVAL_SECS: u64 = 10;
/// Upper bound the reconnection wait doubles up to.
pub const DEFAULT_MAX_RECONNECT_INTERVAL_SECS: u64 = 60;
/// `application_name` reported by the listener's connections.
pub const DEFAULT_APPLICATION_NAME: &str = "pgevents";

/// Connection settings for a [`Listener`](crate::Listener).
#[derive(Clone, Deserialize)]
pub struct ListenerConfig {
    /// PostgreSQL connection URL, shared by the DDL connection and the subscription.
    pub database_url: String,
    #[serde(default = "default_min_reconnect_interval_secs")]
    pub min_reconnect_interval_secs: u64,
    #[serde(default = "default_max_reconnect_interval_secs")]
    pub max_reconnect_interval_secs: u64,
    /// Shows up in `pg_stat_activity` for both listener connections.
    #[serde(default = "default_application_name")]
    pub application_name: String,
}

fn default_min_reconnect_interval_secs() -> u64 {
    DEFAULT_MIN_RECONNECT_INTERVAL_SECS
}

fn default_max_reconnect_interval_secs() -> u64 {
    DEFAULT_MAX_RECONNECT_INTERVAL_SECS
}

fn default_application_name() -> String {
    DEFAULT_APPLICATION_NAME.to_string()
}

impl ListenerConfig {
    /// Create a config with default reconnection intervals.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            min_reconnect_interval_secs: DEFAULT_MIN_RECONNECT_INTERVAL_SECS,
            max_reconnect_interval_secs: DEFAULT_MAX_RECONNECT_INTERVAL_SECS,
            application_name: default_application_name(),
        }
    }

    /// Build a config from the `DATABASE_URL` environment variable.
    pub fn from_env() -> Result<Self, ListenerError> {
        std::env::var("DATABASE_URL")
            .map(Self::new)
            .map_err(|_| {
                ListenerError::InvalidConfig("DATABASE_URL environment variable not set".into())
            })
    }

    pub fn min_reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.min_reconnect_interval_secs)
    }

    pub fn max_reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.max_reconnect_interval_secs)
    }

    /// Parsed connection options, tagged with `application_name`.
    pub fn connect_options(&self) -> Result<PgConnectOptions, sqlx::Error> {
        Ok(self
            .database_url
            .parse::<PgConnectOptions>()?
            .application_name(&self.application_name))
    }

    /// Check the config before any connection is attempted.
    pub fn validate(&self) -> Result<(), ListenerError> {
        if self.database_url.trim().is_empty() {
            return Err(ListenerError::InvalidConfig(
                "database_url must not be empty".into(),
            ));
        }
        if self.min_reconnect_interval_secs == 0 {
            return Err(ListenerError::InvalidConfig(
                "min_reconnect_interval_secs must be greater than zero".into(),
            ));
        }
        if self.min_reconnect_interval_secs > self.max_reconnect_interval_secs {
            return Err(ListenerError::InvalidConfig(format!(
                "min_reconnect_interval_secs ({}) exceeds max_reconnect_interval_secs ({})",
                self.min_reconnect_interval_secs, self.max_reconnect_interval_secs
            )));
        }
        Ok(())
    }
}

// The URL usually carries a password.
impl std::fmt::Debug for ListenerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerConfig")
            .field("database_url", &"<redacted>")
            .field(
                "min_reconnect_interval_secs",
                &self.min_reconnect_interval_secs,
            )
            .field(
                "max_reconnect_interval_secs",
                &self.max_reconnect_interval_secs,
            )
            .field("application_name", &self.application_name)
            .finish()
    }
}

//! TOML file configuration structures.
//!
//! These structs directly map to the `pgevents-demo.toml` file format. Every
//! section is optional.

use pgevents_core::config::{
    DEFAULT_APPLICATION_NAME, DEFAULT_MAX_RECONNECT_INTERVAL_SECS,
    DEFAULT_MIN_RECONNECT_INTERVAL_SECS,
};
use serde::Deserialize;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub listener: ListenerSection,
    #[serde(default)]
    pub writer: WriterSection,
}

/// Reconnection settings for the subscription connection.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenerSection {
    #[serde(default = "default_min_reconnect_interval_secs")]
    pub min_reconnect_interval_secs: u64,
    #[serde(default = "default_max_reconnect_interval_secs")]
    pub max_reconnect_interval_secs: u64,
    #[serde(default = "default_application_name")]
    pub application_name: String,
}

impl Default for ListenerSection {
    fn default() -> Self {
        Self {
            min_reconnect_interval_secs: DEFAULT_MIN_RECONNECT_INTERVAL_SECS,
            max_reconnect_interval_secs: DEFAULT_MAX_RECONNECT_INTERVAL_SECS,
            application_name: default_application_name(),
        }
    }
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

/// The periodic row writer.
#[derive(Debug, Clone, Deserialize)]
pub struct WriterSection {
    /// Table the demo creates, attaches and writes to.
    #[serde(default = "default_table")]
    pub table: String,
    /// Seconds between two inserted rows.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for WriterSection {
    fn default() -> Self {
        Self {
            table: default_table(),
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_table() -> String {
    "example_tables".to_string()
}

fn default_interval_secs() -> u64 {
    5
}

//! Configuration types for the listener.
//!
//! The demo binary reads these from a TOML file; library users usually build
//! them with [`ListenerConfig::new`] or [`ListenerConfig::from_env`].

mod listener;

pub use listener::{
    DEFAULT_APPLICATION_NAME, DEFAULT_MAX_RECONNECT_INTERVAL_SECS,
    DEFAULT_MIN_RECONNECT_INTERVAL_SECS, ListenerConfig,
};

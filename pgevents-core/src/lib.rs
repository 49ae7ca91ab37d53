//! Row-level change notifications from PostgreSQL tables.
//!
//! A [`Listener`] installs a trigger procedure that turns every insert, update
//! and delete on an attached table into a JSON notification on the
//! `pgevents_event` channel, subscribes to that channel, and hands each
//! decoded [`TableEvent`] to the registered callbacks.
//!
//! ```rust,no_run
//! use pgevents_core::{Listener, ListenerConfig};
//!
//! # async fn example() -> Result<(), pgevents_core::ListenerError> {
//! let listener = Listener::open(ListenerConfig::from_env()?).await?;
//! listener.attach("orders").await?;
//! listener.on_event(|event| println!("{} on {}: {}", event.action, event.table, event.data));
//! listener.on_reconnect(|| println!("reconnected, some events may be missing"));
//! // ...
//! listener.close().await;
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod config;
pub mod error;
pub mod events;
pub mod framework;
pub mod installer;
pub mod listener;
pub mod processors;
pub mod registry;
pub mod statements;
pub mod transport;
pub mod utils;

#[cfg(test)]
mod testing;

pub use config::ListenerConfig;
pub use error::ListenerError;
pub use events::{Action, TableEvent};
pub use listener::Listener;
pub use statements::{CHANNEL_NAME, PROCEDURE_NAME};

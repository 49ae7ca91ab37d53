//! Event types flowing from the transport to application callbacks.
//!
//! # Event Flow
//!
//! 1. The trigger procedure publishes a JSON payload on `pgevents_event`
//! 2. The transport yields a [`Signal`] (`Data` or `Reconnect`), or the
//!    event loop produces `Timeout` after a quiet minute
//! 3. `Data` payloads are decoded into a [`TableEvent`]
//! 4. The event loop hands a [`ListenerEvent`] to the callback registry

pub mod signal;
pub mod types;

pub use signal::{Notification, Signal};
pub use types::{Action, ListenerEvent, TableEvent};

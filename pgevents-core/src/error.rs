//! Error types surfaced by the [`Listener`](crate::Listener).
//!
//! Every variant names the step that failed. Failures inside the event loop
//! (malformed payloads, probe failures, transient transport errors) are never
//! returned here; they are logged by the loop and swallowed.

use crate::transport::TransportError;
use thiserror::Error;

/// Errors returned by the listener's public operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The dedicated DDL connection or the subscription transport could not be opened.
    #[error("failed to open sql connection: {0}")]
    Connect(#[source] sqlx::Error),

    /// Installing `pgevents_notify_event()` failed.
    #[error("failed to create postgres notify function: {0}")]
    InstallProcedure(#[source] sqlx::Error),

    /// `LISTEN pgevents_event` failed.
    #[error("failed to listen to postgres events: {0}")]
    Subscribe(#[source] TransportError),

    /// Replacing the trigger on a table failed. The listener stays usable.
    #[error("failed to attach listener to table {table}: {source}")]
    Attach {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    /// The table name cannot be turned into a safe identifier.
    #[error("invalid table name {0:?}: {1}")]
    InvalidTableName(String, &'static str),

    /// Listener configuration failed validation.
    #[error("invalid listener configuration: {0}")]
    InvalidConfig(String),
}

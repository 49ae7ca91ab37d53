//! The subscription side of the listener.
//!
//! A [`NotificationTransport`] owns one connection subscribed to a channel and
//! turns whatever arrives on it into a [`Signal`]. It is expected to handle
//! reconnection itself and report each completed reconnection as
//! [`Signal::Reconnect`].

mod postgres;

pub use postgres::PgTransport;

use crate::events::Signal;
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use thiserror::Error;

/// Errors reported by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The transport will never produce another signal.
    #[error("transport closed")]
    Closed,
}

#[async_trait]
pub trait NotificationTransport: Send + 'static {
    /// Subscribe to `channel`.
    async fn listen(&mut self, channel: &str) -> Result<(), TransportError>;

    /// Wait for the next signal.
    ///
    /// Must be cancel-safe: the event loop drops this future whenever the stop
    /// signal or the inactivity timeout wins the race.
    async fn recv(&mut self) -> Result<Signal, TransportError>;

    /// A liveness probe that can run detached from the transport.
    fn probe(&self) -> BoxFuture<'static, Result<(), TransportError>>;

    /// Unsubscribe and release the connection.
    async fn close(&mut self);
}

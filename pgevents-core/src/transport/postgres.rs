//! `PgListener`-backed transport.

use super::{NotificationTransport, TransportError};
use crate::config::ListenerConfig;
use crate::events::Signal;
use crate::utils::backoff::ReconnectBackoff;
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use sqlx::PgPool;
use sqlx::postgres::{PgListener, PgPoolOptions};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Subscription over a dedicated PostgreSQL connection.
///
/// `PgListener` reconnects eagerly: when the connection drops it re-connects
/// and re-issues `LISTEN` before reporting the loss, which is surfaced here
/// as [`Signal::Reconnect`]. If re-connecting fails, the error is returned and
/// further attempts are spaced by a [`ReconnectBackoff`]; the first attempt
/// that succeeds again yields `Signal::Reconnect`.
///
/// The probe runs `SELECT 1` on the same connection, so the connection sits
/// behind an async mutex shared with the detached probe task. The listener
/// draws its connection from a private one-connection pool, which `close`
/// shuts down.
pub struct PgTransport {
    pool: PgPool,
    listener: Arc<Mutex<Option<PgListener>>>,
    backoff: ReconnectBackoff,
}

impl PgTransport {
    pub async fn connect(config: &ListenerConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_with(config.connect_options()?)
            .await?;
        let listener = match PgListener::connect_with(&pool).await {
            Ok(listener) => listener,
            Err(e) => {
                pool.close().await;
                return Err(e);
            }
        };
        Ok(Self {
            pool,
            listener: Arc::new(Mutex::new(Some(listener))),
            backoff: ReconnectBackoff::new(
                config.min_reconnect_interval(),
                config.max_reconnect_interval(),
            ),
        })
    }

    async fn retry_connection(&mut self) -> Result<Signal, TransportError> {
        let mut guard = self.listener.lock().await;
        let listener = guard.as_mut().ok_or(TransportError::Closed)?;
        // Going through the executor re-connects and re-subscribes.
        match sqlx::query("SELECT 1").execute(listener).await {
            Ok(_) => {
                self.backoff.on_success();
                info!("Notification connection re-established");
                Ok(Signal::Reconnect)
            }
            Err(sqlx::Error::PoolClosed) => Err(TransportError::Closed),
            Err(e) => {
                let wait = self.backoff.on_failure();
                warn!(error = %e, retry_in = ?wait, "Failed to re-establish notification connection");
                Err(e.into())
            }
        }
    }
}

/// Whether `e` means the subscription connection is gone.
///
/// Covers socket and TLS failures, a connect attempt that timed out, and the
/// SQLSTATE classes for connection exceptions (`08`) and operator
/// intervention such as `admin_shutdown` (`57P`).
pub(crate) fn is_connection_loss(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => db
            .code()
            .is_some_and(|code| code.starts_with("08") || code.starts_with("57P")),
        _ => false,
    }
}

/// Log a receive failure. Only a lost connection arms the backoff, and with
/// it the retry that reports [`Signal::Reconnect`].
fn record_failure(backoff: &mut ReconnectBackoff, e: sqlx::Error) -> TransportError {
    if matches!(e, sqlx::Error::PoolClosed) {
        return TransportError::Closed;
    }
    if is_connection_loss(&e) {
        let wait = backoff.on_failure();
        warn!(error = %e, retry_in = ?wait, "Lost notification connection");
    } else {
        warn!(error = %e, "Notification receive failed");
    }
    e.into()
}

#[async_trait]
impl NotificationTransport for PgTransport {
    async fn listen(&mut self, channel: &str) -> Result<(), TransportError> {
        let mut guard = self.listener.lock().await;
        let listener = guard.as_mut().ok_or(TransportError::Closed)?;
        listener.listen(channel).await?;
        debug!(channel, "Subscribed");
        Ok(())
    }

    async fn recv(&mut self) -> Result<Signal, TransportError> {
        if let Some(deadline) = self.backoff.next_attempt() {
            tokio::time::sleep_until(deadline).await;
            return self.retry_connection().await;
        }

        let mut guard = self.listener.lock().await;
        let listener = guard.as_mut().ok_or(TransportError::Closed)?;
        match listener.try_recv().await {
            Ok(Some(notification)) => Ok(Signal::Data(notification.into())),
            Ok(None) => Ok(Signal::Reconnect),
            Err(e) => Err(record_failure(&mut self.backoff, e)),
        }
    }

    fn probe(&self) -> BoxFuture<'static, Result<(), TransportError>> {
        // Grab the connection now, while the event loop is not receiving, so
        // the probe runs before the next receive instead of queueing behind it.
        let guard = self.listener.clone().try_lock_owned();
        let listener = self.listener.clone();
        Box::pin(async move {
            let mut guard = match guard {
                Ok(guard) => guard,
                Err(_) => listener.lock_owned().await,
            };
            let listener = guard.as_mut().ok_or(TransportError::Closed)?;
            sqlx::query("SELECT 1").execute(listener).await?;
            Ok(())
        })
    }

    async fn close(&mut self) {
        let listener = self.listener.lock().await.take();
        if let Some(mut listener) = listener {
            if let Err(e) = listener.unlisten_all().await {
                debug!(error = %e, "UNLISTEN failed while closing");
            }
            // Hands the connection back to the pool so `close` below can end it.
            drop(listener);
        }
        self.pool.close().await;
        debug!("Notification connection closed");
    }
}

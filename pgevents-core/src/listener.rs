//! The listener facade: open, attach, register callbacks, close.

use crate::config::ListenerConfig;
use crate::error::ListenerError;
use crate::events::TableEvent;
use crate::framework::{DatabaseProcessor, StatementExecutor};
use crate::installer::TriggerInstaller;
use crate::processors::EventLoop;
use crate::registry::CallbackRegistry;
use crate::statements::CHANNEL_NAME;
use crate::transport::{NotificationTransport, PgTransport};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Delivers row changes on attached tables to registered callbacks.
///
/// A listener owns two connections: one for DDL (installing the procedure and
/// attaching triggers) and one subscribed to `pgevents_event`. A single
/// background task receives notifications and runs every callback, one at a
/// time, in registration order.
///
/// Dropping a listener stops its task; [`close`](Listener::close) does the
/// same but also waits for the task to finish.
pub struct Listener {
    installer: TriggerInstaller,
    registry: CallbackRegistry,
    shutdown_tx: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Listener {
    /// Connect to PostgreSQL, install the notify procedure, subscribe and
    /// start the event loop.
    pub async fn open(config: ListenerConfig) -> Result<Self, ListenerError> {
        config.validate()?;

        let options = config.connect_options().map_err(ListenerError::Connect)?;
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(ListenerError::Connect)?;
        let installer = TriggerInstaller::new(Arc::new(DatabaseProcessor { pool }));

        if let Err(e) = installer.install_procedure().await {
            installer.close().await;
            return Err(e);
        }

        let transport = match PgTransport::connect(&config).await {
            Ok(transport) => transport,
            Err(e) => {
                installer.close().await;
                return Err(ListenerError::Connect(e));
            }
        };

        Self::start(Box::new(transport), installer).await
    }

    /// Open a listener over caller-provided collaborators.
    ///
    /// Runs the same steps as [`open`](Listener::open) minus connecting. Both
    /// collaborators are owned by the listener from here on and are closed on
    /// failure.
    pub async fn open_with<T: NotificationTransport>(
        transport: T,
        executor: Arc<dyn StatementExecutor>,
    ) -> Result<Self, ListenerError> {
        let installer = TriggerInstaller::new(executor);
        let mut transport: Box<dyn NotificationTransport> = Box::new(transport);

        if let Err(e) = installer.install_procedure().await {
            transport.close().await;
            installer.close().await;
            return Err(e);
        }

        Self::start(transport, installer).await
    }

    async fn start(
        mut transport: Box<dyn NotificationTransport>,
        installer: TriggerInstaller,
    ) -> Result<Self, ListenerError> {
        if let Err(e) = transport.listen(CHANNEL_NAME).await {
            transport.close().await;
            installer.close().await;
            return Err(ListenerError::Subscribe(e));
        }

        let registry = CallbackRegistry::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = tokio::spawn(EventLoop::new(transport, registry.clone()).run(shutdown_rx));

        info!(channel = CHANNEL_NAME, "Listener opened");

        Ok(Self {
            installer,
            registry,
            shutdown_tx,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Make `table` publish its row changes to this listener.
    ///
    /// Accepts `table` or `schema.table`. Re-attaching a table replaces its
    /// trigger. A failure leaves the listener usable for other tables.
    pub async fn attach(&self, table: &str) -> Result<(), ListenerError> {
        self.installer.attach(table).await
    }

    /// Register a callback for row changes.
    ///
    /// Callbacks run on the listener's task in registration order. Register
    /// them before changes start flowing; a callback registered later only
    /// sees events dispatched after it was added.
    pub fn on_event<F>(&self, callback: F)
    where
        F: Fn(&TableEvent) + Send + Sync + 'static,
    {
        self.registry.on_event(callback);
    }

    /// Register a callback for re-established subscriptions.
    ///
    /// The subscription connection dropped and came back. Notifications sent
    /// while it was down are gone and nothing says which ones; re-read the
    /// attached tables if the gap matters.
    pub fn on_reconnect<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.registry.on_reconnect(callback);
    }

    /// Whether [`close`](Listener::close) has been called.
    pub fn is_closed(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Stop the event loop, close the subscription and the DDL connection.
    ///
    /// No callback runs once this returns. Calling it again, concurrently or
    /// later, is a no-op.
    pub async fn close(&self) {
        self.shutdown_tx.send_replace(true);

        let mut worker = self.worker.lock().await;
        let Some(handle) = worker.take() else {
            return;
        };

        if let Err(e) = handle.await {
            error!(error = %e, "Listener task terminated abnormally");
        }
        self.installer.close().await;

        info!("Listener closed");
    }
}

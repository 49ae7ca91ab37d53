//! In-memory collaborators for exercising the listener without a database.

use crate::events::{Notification, Signal};
use crate::framework::StatementExecutor;
use crate::statements::CHANNEL_NAME;
use crate::transport::{NotificationTransport, TransportError};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{Notify, mpsc};

#[derive(Default)]
struct MemoryState {
    listened: Mutex<Vec<String>>,
    fail_listen: AtomicBool,
    fail_probes: AtomicBool,
    hang_probes: AtomicBool,
    probes: AtomicUsize,
    probed: Notify,
    probe_dropped: AtomicBool,
    probe_dropped_notify: Notify,
    closed: AtomicBool,
    closed_notify: Notify,
}

/// Transport fed by a [`MemoryHandle`]: `Some(payload)` is a notification,
/// `None` a dropped-and-restored connection.
pub struct MemoryTransport {
    rx: mpsc::UnboundedReceiver<Option<String>>,
    state: Arc<MemoryState>,
}

pub struct MemoryHandle {
    tx: Mutex<Option<mpsc::UnboundedSender<Option<String>>>>,
    state: Arc<MemoryState>,
}

pub fn memory_transport() -> (MemoryTransport, MemoryHandle) {
    let (tx, rx) = mpsc::unbounded_channel();
    let state = Arc::new(MemoryState::default());
    (
        MemoryTransport {
            rx,
            state: state.clone(),
        },
        MemoryHandle {
            tx: Mutex::new(Some(tx)),
            state,
        },
    )
}

impl MemoryHandle {
    fn send(&self, signal: Option<String>) {
        if let Some(tx) = self.tx.lock().as_ref() {
            let _ = tx.send(signal);
        }
    }

    pub fn notify(&self, payload: &str) {
        self.send(Some(payload.to_owned()));
    }

    pub fn drop_connection(&self) {
        self.send(None);
    }

    /// Drop the sending side; the transport then reports `Closed`.
    pub fn disconnect(&self) {
        self.tx.lock().take();
    }

    pub fn fail_listen(&self) {
        self.state.fail_listen.store(true, Ordering::SeqCst);
    }

    pub fn fail_probes(&self) {
        self.state.fail_probes.store(true, Ordering::SeqCst);
    }

    /// Probes started from now on never complete.
    pub fn hang_probes(&self) {
        self.state.hang_probes.store(true, Ordering::SeqCst);
    }

    pub fn listened(&self) -> Vec<String> {
        self.state.listened.lock().clone()
    }

    pub fn probes(&self) -> usize {
        self.state.probes.load(Ordering::SeqCst)
    }

    pub async fn wait_probe(&self) {
        self.state.probed.notified().await;
    }

    /// Resolves once a started probe future has been dropped, whether it
    /// completed or was aborted.
    pub async fn wait_probe_dropped(&self) {
        loop {
            let notified = self.state.probe_dropped_notify.notified();
            if self.state.probe_dropped.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }

    pub async fn wait_closed(&self) {
        loop {
            let notified = self.state.closed_notify.notified();
            if self.is_closed() {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl NotificationTransport for MemoryTransport {
    async fn listen(&mut self, channel: &str) -> Result<(), TransportError> {
        if self.state.fail_listen.load(Ordering::SeqCst) {
            return Err(TransportError::Database(sqlx::Error::Protocol(
                "permission denied".into(),
            )));
        }
        self.state.listened.lock().push(channel.to_owned());
        Ok(())
    }

    async fn recv(&mut self) -> Result<Signal, TransportError> {
        match self.rx.recv().await {
            Some(Some(payload)) => Ok(Signal::Data(Notification {
                channel: CHANNEL_NAME.to_owned(),
                payload,
            })),
            Some(None) => Ok(Signal::Reconnect),
            None => Err(TransportError::Closed),
        }
    }

    fn probe(&self) -> BoxFuture<'static, Result<(), TransportError>> {
        let state = self.state.clone();
        Box::pin(async move {
            let _dropped = DropFlag(state.clone());
            state.probes.fetch_add(1, Ordering::SeqCst);
            state.probed.notify_one();
            if state.hang_probes.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if state.fail_probes.load(Ordering::SeqCst) {
                return Err(TransportError::Database(sqlx::Error::PoolTimedOut));
            }
            Ok(())
        })
    }

    async fn close(&mut self) {
        self.state.closed.store(true, Ordering::SeqCst);
        self.state.closed_notify.notify_waiters();
    }
}

struct DropFlag(Arc<MemoryState>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.probe_dropped.store(true, Ordering::SeqCst);
        self.0.probe_dropped_notify.notify_waiters();
    }
}

/// Executor that records statements instead of running them.
#[derive(Default)]
pub struct RecordingExecutor {
    statements: Mutex<Vec<String>>,
    transactions: Mutex<Vec<Vec<String>>>,
    fail_marker: Option<String>,
    closed: AtomicBool,
}

impl RecordingExecutor {
    /// Fail any statement containing `marker`.
    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_marker: Some(marker.to_owned()),
            ..Self::default()
        }
    }

    fn check(&self, statement: &str) -> Result<(), sqlx::Error> {
        match &self.fail_marker {
            Some(marker) if statement.contains(marker.as_str()) => {
                Err(sqlx::Error::Protocol(format!("rejected statement: {statement}")))
            }
            _ => Ok(()),
        }
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().clone()
    }

    pub fn transactions(&self) -> Vec<Vec<String>> {
        self.transactions.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatementExecutor for RecordingExecutor {
    async fn execute(&self, statement: &str) -> Result<(), sqlx::Error> {
        self.check(statement)?;
        self.statements.lock().push(statement.to_owned());
        Ok(())
    }

    async fn execute_in_transaction(&self, statements: &[String]) -> Result<(), sqlx::Error> {
        for statement in statements {
            self.check(statement)?;
        }
        self.transactions.lock().push(statements.to_vec());
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

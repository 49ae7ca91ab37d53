//! The listener's event loop.
//!
//! One loop runs per listener, on its own task. It waits on the stop signal,
//! the transport, and an inactivity timer, whichever is ready first:
//!
//! - stop signal: the loop exits (the only terminal transition)
//! - `Signal::Data`: the payload is decoded and event callbacks run
//! - `Signal::Reconnect`: reconnect callbacks run
//! - timeout: a detached liveness probe is spawned
//!
//! Callbacks run inline, so a slow callback delays everything behind it.

use crate::events::{ListenerEvent, Notification, Signal, TableEvent};
use crate::registry::CallbackRegistry;
use crate::statements::CHANNEL_NAME;
use crate::transport::{NotificationTransport, TransportError};
use kanau::processor::Processor;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How long the loop may sit idle before it probes the connection.
///
/// Restarts on every loop iteration.
pub const PROBE_INTERVAL: Duration = Duration::from_secs(60);

pub struct EventLoop {
    transport: Box<dyn NotificationTransport>,
    registry: CallbackRegistry,
    /// In-flight liveness probe, if any.
    probe: Option<JoinHandle<()>>,
}

impl EventLoop {
    pub fn new(transport: Box<dyn NotificationTransport>, registry: CallbackRegistry) -> Self {
        Self {
            transport,
            registry,
            probe: None,
        }
    }

    /// Run until the stop signal fires, its sender is dropped, or the
    /// transport closes for good. Closes the transport on the way out.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(channel = CHANNEL_NAME, "Listening for table events");

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let signal = tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Listener received shutdown signal");
                        break;
                    }
                    continue;
                }

                received = self.transport.recv() => match received {
                    Ok(signal) => signal,
                    Err(TransportError::Closed) => {
                        warn!("Notification transport closed");
                        break;
                    }
                    Err(e) => {
                        debug!(error = %e, "Failed to receive notification");
                        continue;
                    }
                },

                _ = tokio::time::sleep(PROBE_INTERVAL) => Signal::Timeout,
            };

            self.handle(signal).await;
        }

        if let Some(probe) = self.probe.take() {
            probe.abort();
        }
        self.transport.close().await;

        info!("Finished listening for table events");
    }

    async fn handle(&mut self, signal: Signal) {
        match signal {
            Signal::Data(notification) => self.emit(notification).await,
            Signal::Reconnect => {
                warn!("Notification connection was re-established, events may have been missed");
                let _ = self.registry.process(ListenerEvent::Reconnected).await;
            }
            Signal::Timeout => self.spawn_probe(),
        }
    }

    async fn emit(&mut self, notification: Notification) {
        debug!(channel = %notification.channel, "Received data from channel");

        let event = match TableEvent::from_payload(&notification.payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, channel = %notification.channel, "Failed to decode table event");
                return;
            }
        };

        debug!(table = %event.table, action = %event.action, "Dispatching table event");
        let _ = self.registry.process(ListenerEvent::Table(event)).await;
    }

    fn spawn_probe(&mut self) {
        if self.probe.as_ref().is_some_and(|probe| !probe.is_finished()) {
            debug!("Previous liveness probe still running");
            return;
        }

        info!(idle = ?PROBE_INTERVAL, "No events received, checking connection");
        let probe = self.transport.probe();
        self.probe = Some(tokio::spawn(async move {
            match probe.await {
                Ok(()) => debug!("Liveness probe succeeded"),
                Err(e) => warn!(error = %e, "Liveness probe failed"),
            }
        }));
    }
}

//! Ordered callback lists owned by a listener.

use crate::events::{ListenerEvent, TableEvent};
use kanau::processor::Processor;
use parking_lot::RwLock;
use std::convert::Infallible;
use std::sync::Arc;

/// Handler for decoded row changes.
pub type EventCallback = Arc<dyn Fn(&TableEvent) + Send + Sync>;
/// Handler for re-established subscriptions.
pub type ReconnectCallback = Arc<dyn Fn() + Send + Sync>;

/// Append-only, ordered callback registry.
///
/// Cloning shares the same lists. Dispatch runs on a snapshot taken under a
/// short read lock, so callbacks may register further callbacks; those are
/// picked up from the next dispatch on.
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    events: RwLock<Vec<EventCallback>>,
    reconnects: RwLock<Vec<ReconnectCallback>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_event<F>(&self, callback: F)
    where
        F: Fn(&TableEvent) + Send + Sync + 'static,
    {
        self.inner.events.write().push(Arc::new(callback));
    }

    pub fn on_reconnect<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.reconnects.write().push(Arc::new(callback));
    }

    /// Invoke every event callback, in registration order.
    pub fn emit_event(&self, event: &TableEvent) {
        let callbacks = self.inner.events.read().clone();
        for callback in &callbacks {
            callback(event);
        }
    }

    /// Invoke every reconnect callback, in registration order.
    pub fn emit_reconnect(&self) {
        let callbacks = self.inner.reconnects.read().clone();
        for callback in &callbacks {
            callback();
        }
    }

    pub fn event_callbacks(&self) -> usize {
        self.inner.events.read().len()
    }

    pub fn reconnect_callbacks(&self) -> usize {
        self.inner.reconnects.read().len()
    }
}

impl Processor<ListenerEvent> for CallbackRegistry {
    type Output = ();
    type Error = Infallible;

    async fn process(&self, event: ListenerEvent) -> Result<(), Infallible> {
        match event {
            ListenerEvent::Table(event) => self.emit_event(&event),
            ListenerEvent::Reconnected => self.emit_reconnect(),
        }
        Ok(())
    }
}

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::trace;

use ybf_types::events::ChangeEvent;

const CHANNEL_CAPACITY: usize = 1024;

/// Fans committed row changes out to every live list.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// All subscribers receive all changes and filter locally.
    broadcast_tx: broadcast::Sender<ChangeEvent>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(DispatcherInner { broadcast_tx }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Publish a change. Call only after the write has committed.
    pub fn broadcast(&self, event: ChangeEvent) {
        trace!(table = %event.table, kind = ?event.kind, "Publishing change");
        // No receivers is fine.
        let _ = self.inner.broadcast_tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.broadcast_tx.receiver_count()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

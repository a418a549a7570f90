//! Bridge implementation that maps client events to a broadcast channel.
//!
//! The [`BroadcastEventBridge`] lets any number of consumers subscribe to
//! the events the client emits.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use super::emitter::EventEmitter;
use super::{ClientEvent, ConnectionEvent, LibraryEvent, StatusEvent, SubsystemEvent};

/// Bridges client events to a `tokio::sync::broadcast` channel.
///
/// The bridge also forwards to an optional external emitter that can be set
/// after construction.
///
/// # Thread Safety
///
/// The bridge is `Send + Sync` and can be shared across async tasks.
/// The external emitter uses `RwLock` to allow setting it after construction.
#[derive(Clone)]
pub struct BroadcastEventBridge {
    tx: broadcast::Sender<ClientEvent>,
    /// Optional external emitter for additional delivery
    external_emitter: Arc<RwLock<Option<Arc<dyn EventEmitter>>>>,
}

impl BroadcastEventBridge {
    /// Creates a new bridge with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            external_emitter: Arc::new(RwLock::new(None)),
        }
    }

    /// Sets an external emitter that receives every event as well.
    pub fn set_external_emitter(&self, emitter: Arc<dyn EventEmitter>) {
        *self.external_emitter.write() = Some(emitter);
    }

    /// Returns a new receiver for the broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }
}

/// Generates an [`EventEmitter`] method that forwards to the external emitter
/// (if set) and then sends to the broadcast channel.
macro_rules! impl_emit {
    ($method:ident, $event_ty:ty, $variant:ident) => {
        fn $method(&self, event: $event_ty) {
            if let Some(ref emitter) = *self.external_emitter.read() {
                emitter.$method(event.clone());
            }
            if let Err(e) = self.tx.send(ClientEvent::$variant(event)) {
                log::trace!("[EventBridge] No broadcast receivers: {}", e);
            }
        }
    };
}

impl EventEmitter for BroadcastEventBridge {
    impl_emit!(emit_connection, ConnectionEvent, Connection);
    impl_emit!(emit_status, StatusEvent, Status);
    impl_emit!(emit_library, LibraryEvent, Library);
    impl_emit!(emit_subsystem, SubsystemEvent, Subsystem);
}

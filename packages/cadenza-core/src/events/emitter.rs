//! Event emitter abstraction for decoupling the client from transport.
//!
//! The client depends on the [`EventEmitter`] trait rather than concrete
//! broadcast channels, enabling testing and alternative delivery.

use super::{ConnectionEvent, LibraryEvent, StatusEvent, SubsystemEvent};

/// Trait for emitting client events without knowledge of transport.
///
/// # Example
///
/// ```ignore
/// struct Watcher {
///     emitter: Arc<dyn EventEmitter>,
/// }
///
/// impl Watcher {
///     fn on_update(&self) {
///         self.emitter.emit_library(LibraryEvent::Updated { timestamp: 0 });
///     }
/// }
/// ```
pub trait EventEmitter: Send + Sync {
    /// Emits a session lifecycle event.
    fn emit_connection(&self, event: ConnectionEvent);

    /// Emits a playback status snapshot.
    fn emit_status(&self, event: StatusEvent);

    /// Emits a library update notification.
    fn emit_library(&self, event: LibraryEvent);

    /// Emits a raw subsystem notification.
    fn emit_subsystem(&self, event: SubsystemEvent);
}

/// No-op emitter for headless use or testing.
///
/// Events are silently discarded.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit_connection(&self, _event: ConnectionEvent) {}

    fn emit_status(&self, _event: StatusEvent) {}

    fn emit_library(&self, _event: LibraryEvent) {}

    fn emit_subsystem(&self, _event: SubsystemEvent) {}
}

/// Logging emitter for debugging and development.
///
/// Logs all events at debug level.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit_connection(&self, event: ConnectionEvent) {
        tracing::debug!(?event, "connection_event");
    }

    fn emit_status(&self, event: StatusEvent) {
        tracing::debug!(?event, "status_event");
    }

    fn emit_library(&self, event: LibraryEvent) {
        tracing::debug!(?event, "library_event");
    }

    fn emit_subsystem(&self, event: SubsystemEvent) {
        tracing::debug!(?event, "subsystem_event");
    }
}

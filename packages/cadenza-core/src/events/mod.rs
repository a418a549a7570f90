//! Event system for upward change notifications.
//!
//! This module provides:
//! - [`EventEmitter`] trait for the client to emit events
//! - [`BroadcastEventBridge`] for fan-out to any number of subscribers
//! - Event types for each category (connection, status, library, subsystem)

mod bridge;
mod emitter;

pub use bridge::BroadcastEventBridge;
pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Serialize, Serializer};

use crate::state::{ConnectionState, PlayerStatus};

/// Events raised by the client.
///
/// Each category has its own inner event type with specific variants.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Session lifecycle changes.
    Connection(ConnectionEvent),

    /// Playback snapshots from the status poll.
    Status(StatusEvent),

    /// The server finished a database update.
    Library(LibraryEvent),

    /// Raw subsystem notifications from the event-wait connection.
    Subsystem(SubsystemEvent),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ConnectionEvent {
    /// The session moved to a new state.
    StateChanged {
        state: ConnectionState,
        /// Failure that caused the transition, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// An automatic reconnect attempt will start after `delay_ms`.
    ReconnectScheduled {
        /// One-based attempt number.
        attempt: u32,
        #[serde(rename = "maxAttempts")]
        max_attempts: u32,
        #[serde(rename = "delayMs")]
        delay_ms: u64,
        timestamp: u64,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StatusEvent {
    Changed {
        status: PlayerStatus,
        timestamp: u64,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LibraryEvent {
    Updated { timestamp: u64 },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SubsystemEvent {
    Changed {
        subsystems: Vec<Subsystem>,
        timestamp: u64,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Subsystems
// ─────────────────────────────────────────────────────────────────────────────

/// A server-defined category of state change.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Database,
    Update,
    StoredPlaylist,
    Playlist,
    Player,
    Mixer,
    Output,
    Options,
    Partition,
    Sticker,
    Subscription,
    Message,
    Neighbor,
    Mount,
    Other(String),
}

impl Subsystem {
    /// Subsystems the event-wait connection listens on.
    ///
    /// SYNC REQUIRED: must match [`crate::protocol_constants::IDLE_SUBSYSTEMS`].
    pub const IDLE_SET: [Subsystem; 6] = [
        Subsystem::Playlist,
        Subsystem::Player,
        Subsystem::Mixer,
        Subsystem::Output,
        Subsystem::Options,
        Subsystem::Update,
    ];

    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "database" => Self::Database,
            "update" => Self::Update,
            "stored_playlist" => Self::StoredPlaylist,
            "playlist" => Self::Playlist,
            "player" => Self::Player,
            "mixer" => Self::Mixer,
            "output" => Self::Output,
            "options" => Self::Options,
            "partition" => Self::Partition,
            "sticker" => Self::Sticker,
            "subscription" => Self::Subscription,
            "message" => Self::Message,
            "neighbor" => Self::Neighbor,
            "mount" => Self::Mount,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Database => "database",
            Self::Update => "update",
            Self::StoredPlaylist => "stored_playlist",
            Self::Playlist => "playlist",
            Self::Player => "player",
            Self::Mixer => "mixer",
            Self::Output => "output",
            Self::Options => "options",
            Self::Partition => "partition",
            Self::Sticker => "sticker",
            Self::Subscription => "subscription",
            Self::Message => "message",
            Self::Neighbor => "neighbor",
            Self::Mount => "mount",
            Self::Other(name) => name,
        }
    }

    /// True if a change here can alter the `status` reply.
    pub fn affects_status(&self) -> bool {
        matches!(
            self,
            Self::Player | Self::Mixer | Self::Options | Self::Playlist
        )
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Subsystem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Returns the current Unix timestamp in milliseconds.
///
/// Returns 0 if the system clock is before the Unix epoch.
#[must_use]
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// From implementations for converting inner events to ClientEvent
impl From<ConnectionEvent> for ClientEvent {
    fn from(event: ConnectionEvent) -> Self {
        ClientEvent::Connection(event)
    }
}

impl From<StatusEvent> for ClientEvent {
    fn from(event: StatusEvent) -> Self {
        ClientEvent::Status(event)
    }
}

impl From<LibraryEvent> for ClientEvent {
    fn from(event: LibraryEvent) -> Self {
        ClientEvent::Library(event)
    }
}

impl From<SubsystemEvent> for ClientEvent {
    fn from(event: SubsystemEvent) -> Self {
        ClientEvent::Subsystem(event)
    }
}

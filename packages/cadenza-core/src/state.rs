//! Client configuration and session state types.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::library::Identity;
use crate::protocol::{Response, ServerAddress};
use crate::protocol_constants::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_POOL_SIZE, DEFAULT_STATUS_INTERVAL_MS,
    EVENT_CHANNEL_CAPACITY, RECONNECT_DELAYS_MS,
};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Automatic reconnection after a session fails.
///
/// `max_attempts = 0` disables reconnection. Attempt `n` waits
/// `delays_ms[n]` first; the last delay repeats when the list is shorter
/// than `max_attempts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub delays_ms: Vec<u64>,
}

impl ReconnectPolicy {
    /// A policy that never reconnects.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            delays_ms: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_attempts > 0
    }

    /// Delay before attempt number `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ms = self
            .delays_ms
            .get(attempt as usize)
            .or(self.delays_ms.last())
            .copied()
            .unwrap_or_default();
        Duration::from_millis(ms)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: RECONNECT_DELAYS_MS.len() as u32,
            delays_ms: RECONNECT_DELAYS_MS.to_vec(),
        }
    }
}

/// Configuration for one music-server client.
///
/// All fields have sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server to connect to.
    pub address: ServerAddress,

    /// Credential sent on every new connection, if set.
    pub password: Option<String>,

    /// Number of pooled command connections.
    pub pool_size: usize,

    /// Period of the status poll (milliseconds).
    pub status_interval_ms: u64,

    /// Timeout for opening one connection (milliseconds).
    pub connect_timeout_ms: u64,

    /// Capacity of the event broadcast channel.
    pub event_channel_capacity: usize,

    pub reconnect: ReconnectPolicy,
}

impl ClientConfig {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.pool_size == 0 {
            return Err("pool_size must be >= 1".to_string());
        }
        if self.status_interval_ms == 0 {
            return Err("status_interval_ms must be >= 1".to_string());
        }
        if self.connect_timeout_ms == 0 {
            return Err("connect_timeout_ms must be >= 1".to_string());
        }
        if self.event_channel_capacity == 0 {
            return Err(
                "event_channel_capacity must be >= 1 (broadcast::channel panics on 0)".to_string(),
            );
        }
        if self.reconnect.is_enabled() && self.reconnect.delays_ms.is_empty() {
            return Err("reconnect.delays_ms must not be empty when reconnecting".to_string());
        }
        Ok(())
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: ServerAddress::default(),
            password: None,
            pool_size: DEFAULT_POOL_SIZE,
            status_interval_ms: DEFAULT_STATUS_INTERVAL_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            event_channel_capacity: EVENT_CHANNEL_CAPACITY,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session State
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle state of the client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum ConnectionState {
    #[default]
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Disconnecting = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Disconnecting,
            _ => Self::Disconnected,
        }
    }
}

/// Session state shared between the client and its pool.
///
/// Written only by the client's state transitions; read from any task
/// holding a pooled connection.
#[derive(Debug, Default)]
pub struct SessionFlags {
    state: AtomicU8,
    connected: AtomicBool,
    connecting: AtomicBool,
}

impl SessionFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Stores `state` and returns the previous one.
    pub fn set_state(&self, state: ConnectionState) -> ConnectionState {
        self.connecting
            .store(state == ConnectionState::Connecting, Ordering::Release);
        self.connected
            .store(state == ConnectionState::Connected, Ordering::Release);
        ConnectionState::from_u8(self.state.swap(state as u8, Ordering::AcqRel))
    }

    /// Moves from `from` to `to` only if the current state is `from`.
    pub fn transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        let moved = self
            .state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if moved {
            self.connecting
                .store(to == ConnectionState::Connecting, Ordering::Release);
            self.connected
                .store(to == ConnectionState::Connected, Ordering::Release);
        }
        moved
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn is_connecting(&self) -> bool {
        self.connecting.load(Ordering::Acquire)
    }

    /// True while a pooled connection may be returned rather than retired.
    pub fn accepts_returns(&self) -> bool {
        self.is_connected() || self.is_connecting()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Player Status
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackState {
    Play,
    Pause,
    #[default]
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SingleMode {
    #[default]
    Off,
    On,
    Oneshot,
}

/// Playback snapshot parsed from one `status` reply.
///
/// Unknown keys are ignored and malformed numbers become `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatus {
    /// Volume 0-100; `None` when the server has no mixer.
    pub volume: Option<u8>,
    pub repeat: bool,
    pub random: bool,
    pub single: SingleMode,
    pub consume: bool,
    /// Queue version, bumped on every queue change.
    pub playlist_version: Option<u32>,
    pub playlist_length: Option<u32>,
    pub state: PlaybackState,
    pub song: Option<u32>,
    pub song_id: Option<u32>,
    pub next_song: Option<u32>,
    pub next_song_id: Option<u32>,
    pub elapsed: Option<Duration>,
    pub duration: Option<Duration>,
    /// Instantaneous bitrate in kbit/s.
    pub bitrate: Option<u32>,
    pub crossfade: Option<u32>,
    /// Output format as `rate:bits:channels`.
    pub audio: Option<String>,
    /// Job id of a running database update.
    pub updating_db: Option<u32>,
    pub error: Option<String>,
}

impl PlayerStatus {
    pub fn from_response(response: &Response) -> Self {
        let mut status = Self::default();
        for tag in &response.tags {
            let value = tag.value.trim();
            match tag.name.to_ascii_lowercase().as_str() {
                "volume" => status.volume = value.parse::<u8>().ok().filter(|v| *v <= 100),
                "repeat" => status.repeat = value == "1",
                "random" => status.random = value == "1",
                "single" => {
                    status.single = match value {
                        "1" => SingleMode::On,
                        "oneshot" => SingleMode::Oneshot,
                        _ => SingleMode::Off,
                    }
                }
                "consume" => status.consume = value == "1" || value == "oneshot",
                "playlist" => status.playlist_version = value.parse().ok(),
                "playlistlength" => status.playlist_length = value.parse().ok(),
                "state" => {
                    status.state = match value {
                        "play" => PlaybackState::Play,
                        "pause" => PlaybackState::Pause,
                        _ => PlaybackState::Stop,
                    }
                }
                "song" => status.song = value.parse().ok(),
                "songid" => status.song_id = value.parse().ok(),
                "nextsong" => status.next_song = value.parse().ok(),
                "nextsongid" => status.next_song_id = value.parse().ok(),
                "elapsed" => status.elapsed = parse_seconds(value),
                "duration" => status.duration = parse_seconds(value),
                "bitrate" => status.bitrate = value.parse().ok(),
                "xfade" => status.crossfade = value.parse().ok(),
                "audio" => status.audio = Some(value.to_string()).filter(|v| !v.is_empty()),
                "updating_db" => status.updating_db = value.parse().ok(),
                "error" => status.error = Some(value.to_string()).filter(|v| !v.is_empty()),
                _ => {}
            }
        }
        status
    }

    /// Queue identity of the current song, if any.
    pub fn current_entry(&self) -> Option<Identity> {
        self.song_id
            .map(|id| Identity::queue_entry(&id.to_string()))
    }
}

fn parse_seconds(value: &str) -> Option<Duration> {
    value
        .parse::<f64>()
        .ok()
        .and_then(|s| Duration::try_from_secs_f64(s).ok())
}

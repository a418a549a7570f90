//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by the music-server protocol or by the session
//! model of this crate. Tunable values live in [`crate::state::ClientConfig`].

// ─────────────────────────────────────────────────────────────────────────────
// Wire Protocol
// ─────────────────────────────────────────────────────────────────────────────

/// Default TCP port of the music server.
pub const DEFAULT_PORT: u16 = 6600;

/// Prefix of the greeting line sent by the server on a fresh connection.
pub const GREETING_PREFIX: &str = "OK MPD ";

/// Line terminating a successful reply.
pub const REPLY_OK: &str = "OK";

/// Prefix of a failed reply line.
pub const REPLY_ACK_PREFIX: &str = "ACK ";

/// Key announcing a raw binary payload of the given length.
pub const BINARY_KEY: &str = "binary";

/// Key carrying the declared total size of a chunked binary reply.
pub const BINARY_SIZE_KEY: &str = "size";

/// Upper bound for a single reply line (bytes).
///
/// Guards against a misbehaving server streaming an unbounded line.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Upper bound for the accumulated size of one binary resource (bytes).
pub const MAX_BINARY_BYTES: usize = 32 * 1024 * 1024;

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

pub const CMD_PASSWORD: &str = "password";
pub const CMD_STATUS: &str = "status";
pub const CMD_IDLE: &str = "idle";
pub const CMD_CLOSE: &str = "close";
pub const CMD_ALBUM_ART: &str = "albumart";
pub const CMD_READ_PICTURE: &str = "readpicture";
pub const CMD_LIST: &str = "list";
pub const CMD_FIND: &str = "find";
pub const CMD_SEARCH: &str = "search";
pub const CMD_LIST_ALL_INFO: &str = "listallinfo";
pub const CMD_UPDATE: &str = "update";
pub const CMD_PLAYLIST_INFO: &str = "playlistinfo";
pub const CMD_ADD_ID: &str = "addid";
pub const CMD_DELETE_ID: &str = "deleteid";
pub const CMD_MOVE_ID: &str = "moveid";
pub const CMD_CLEAR: &str = "clear";
pub const CMD_LIST_PLAYLISTS: &str = "listplaylists";
pub const CMD_LIST_PLAYLIST_INFO: &str = "listplaylistinfo";
pub const CMD_LOAD: &str = "load";
pub const CMD_SAVE: &str = "save";
pub const CMD_RM: &str = "rm";

/// Key of each changed subsystem in an `idle` reply.
pub const IDLE_CHANGED_KEY: &str = "changed";

/// Subsystems the event-wait connection listens on.
///
/// SYNC REQUIRED: must stay in step with [`crate::events::Subsystem::IDLE_SET`].
pub const IDLE_SUBSYSTEMS: [&str; 6] = ["playlist", "player", "mixer", "output", "options", "update"];

// ─────────────────────────────────────────────────────────────────────────────
// Tag Stream Boundaries
// ─────────────────────────────────────────────────────────────────────────────

/// Boundary key separating songs in a reply.
pub const SONG_BOUNDARY: &str = "file";

/// Boundary key separating stored playlists in a `listplaylists` reply.
pub const PLAYLIST_BOUNDARY: &str = "playlist";

// ─────────────────────────────────────────────────────────────────────────────
// Session Defaults
// ─────────────────────────────────────────────────────────────────────────────

/// Default number of pooled command connections.
pub const DEFAULT_POOL_SIZE: usize = 5;

/// Default period of the status poll (milliseconds).
pub const DEFAULT_STATUS_INTERVAL_MS: u64 = 1000;

/// Default timeout for opening a connection (milliseconds).
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

/// Capacity of the upward event broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Delays before each automatic reconnect attempt (milliseconds).
pub const RECONNECT_DELAYS_MS: [u64; 3] = [1000, 2000, 5000];

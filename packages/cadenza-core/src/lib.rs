//! Cadenza Core - client library for MPD-dialect music servers.
//!
//! This crate holds everything below the UI: protocol connections, the
//! session manager with its connection pool, and the query services that
//! turn flat tag replies into tracks, albums, artists, queue entries and
//! playlists with stable identities.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`protocol`]: Request lines, reply parsing and server connections
//! - [`pool`]: Bounded pool of command connections
//! - [`client`]: Session manager (connect, status poll, change notifications)
//! - [`library`]: Identities, tag segmentation and domain extraction
//! - [`services`]: Library, queue, playlist and artwork queries
//! - [`events`]: Upward notifications for collaborators
//! - [`state`]: Configuration and session state
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning background tasks
//! - [`EventEmitter`](events::EventEmitter): Emitting client events
//! - [`Connector`](protocol::Connector) / [`Connection`](protocol::Connection):
//!   Opening and talking to a server
//! - [`CommandExecutor`](services::CommandExecutor): What the query services
//!   need from a client

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod error;
pub mod events;
pub mod library;
pub mod pool;
pub mod protocol;
pub mod protocol_constants;
pub mod runtime;
pub mod services;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::{ConnectionKind, MpdClient};
pub use error::{CadenzaError, CadenzaResult, ErrorCode};
pub use events::{
    BroadcastEventBridge, ClientEvent, ConnectionEvent, EventEmitter, LibraryEvent,
    LoggingEventEmitter, NoopEventEmitter, StatusEvent, Subsystem, SubsystemEvent,
};
pub use library::{
    AlbumInfo, ArtistAliasTable, ArtistInfo, ArtistRoles, DomainExtractor, EntityKind, Identity,
    PlaylistInfo, PlaylistTrackInfo, QueueTrackInfo, TrackInfo,
};
pub use protocol::{Command, Connection, Connector, MpdConnector, Response, ServerAddress, Tag};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use services::{
    Artwork, ArtworkOrigin, ArtworkService, CommandExecutor, LibraryService, PlaylistService,
    QueueService,
};
pub use state::{ClientConfig, ConnectionState, PlayerStatus, ReconnectPolicy};

/// Image returned when a track has no artwork of its own.
pub const DEFAULT_ARTWORK: &[u8] = include_bytes!("../assets/default-cover.png");

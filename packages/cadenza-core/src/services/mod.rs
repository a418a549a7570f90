//! Query services.
//!
//! Services turn library, queue and playlist questions into commands and
//! their replies into domain records. They talk to the server only through
//! [`CommandExecutor`], which [`MpdClient`](crate::client::MpdClient)
//! implements by leasing a pooled connection per command.

pub mod artwork;
pub mod library;
pub mod playlist;
pub mod queue;

pub use artwork::{Artwork, ArtworkOrigin, ArtworkService};
pub use library::LibraryService;
pub use playlist::PlaylistService;
pub use queue::QueueService;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::error::CadenzaResult;
use crate::library::{segment, DomainExtractor, TrackInfo};
use crate::protocol::{Command, Response, Tag};
use crate::protocol_constants::SONG_BOUNDARY;

/// Executes commands on behalf of the query services.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Sends one command and returns its reply.
    async fn send(&self, command: Command) -> CadenzaResult<Response>;

    /// Reads a chunked binary resource for `uri` with `command`.
    ///
    /// Returns empty bytes when the server has no such resource.
    async fn read_binary(
        &self,
        command: &str,
        uri: &str,
        cancel: &CancellationToken,
    ) -> CadenzaResult<Bytes>;
}

/// Segments a song listing and extracts every group that names a file.
///
/// `directory` and `playlist` entries in mixed listings carry no `file`
/// tag and are dropped.
pub(crate) fn extract_tracks(extractor: &DomainExtractor, tags: Vec<Tag>) -> Vec<TrackInfo> {
    segment(tags, SONG_BOUNDARY)
        .map(|group| extractor.extract_track(&group))
        .filter(|track| !track.file.is_empty())
        .collect()
}

//! Stored playlists.

use std::sync::Arc;

use super::{extract_tracks, CommandExecutor};
use crate::error::CadenzaResult;
use crate::library::{
    consolidate_playlists, segment, DomainExtractor, EntityKind, Identity, PlaylistInfo,
    PlaylistTrackInfo,
};
use crate::protocol::Command;
use crate::protocol_constants::{
    CMD_LIST_PLAYLISTS, CMD_LIST_PLAYLIST_INFO, CMD_LOAD, CMD_RM, CMD_SAVE, PLAYLIST_BOUNDARY,
};

pub struct PlaylistService {
    executor: Arc<dyn CommandExecutor>,
    extractor: DomainExtractor,
}

impl PlaylistService {
    pub fn new(executor: Arc<dyn CommandExecutor>, extractor: DomainExtractor) -> Self {
        Self {
            executor,
            extractor,
        }
    }

    /// Lists stored playlists without their tracks.
    pub async fn list(&self) -> CadenzaResult<Vec<PlaylistInfo>> {
        let reply = self.executor.send(Command::new(CMD_LIST_PLAYLISTS)).await?;
        let playlists = segment(reply.tags, PLAYLIST_BOUNDARY)
            .map(|group| self.extractor.extract_playlist_header(&group))
            .filter(|playlist| !playlist.name.is_empty())
            .collect();
        Ok(consolidate_playlists(playlists))
    }

    /// Returns the entries of `playlist`, numbered from zero.
    pub async fn tracks(&self, playlist: &Identity) -> CadenzaResult<Vec<PlaylistTrackInfo>> {
        playlist.expect_kind(EntityKind::Playlist)?;
        let reply = self
            .executor
            .send(Command::new(CMD_LIST_PLAYLIST_INFO).arg(playlist.value()))
            .await?;

        Ok(extract_tracks(&self.extractor, reply.tags)
            .into_iter()
            .zip(0u32..)
            .map(|(track, position)| PlaylistTrackInfo { position, track })
            .collect())
    }

    /// Appends `playlist` to the queue.
    pub async fn load(&self, playlist: &Identity) -> CadenzaResult<()> {
        playlist.expect_kind(EntityKind::Playlist)?;
        self.executor
            .send(Command::new(CMD_LOAD).arg(playlist.value()))
            .await?;
        Ok(())
    }

    /// Saves the current queue as a new playlist named `name`.
    pub async fn save_queue(&self, name: &str) -> CadenzaResult<Identity> {
        self.executor.send(Command::new(CMD_SAVE).arg(name)).await?;
        log::debug!("[Playlist] Saved queue as {}", name);
        Ok(Identity::playlist(name))
    }

    pub async fn delete(&self, playlist: &Identity) -> CadenzaResult<()> {
        playlist.expect_kind(EntityKind::Playlist)?;
        self.executor
            .send(Command::new(CMD_RM).arg(playlist.value()))
            .await?;
        Ok(())
    }
}

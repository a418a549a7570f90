//! Play queue queries and edits.

use std::sync::Arc;

use super::CommandExecutor;
use crate::error::{CadenzaError, CadenzaResult};
use crate::library::{consolidate_queue, segment, DomainExtractor, EntityKind, Identity, QueueTrackInfo};
use crate::protocol::Command;
use crate::protocol_constants::{
    CMD_ADD_ID, CMD_CLEAR, CMD_DELETE_ID, CMD_MOVE_ID, CMD_PLAYLIST_INFO, SONG_BOUNDARY,
};

/// Reply key carrying the song id assigned by `addid`.
const SONG_ID_KEY: &str = "Id";

pub struct QueueService {
    executor: Arc<dyn CommandExecutor>,
    extractor: DomainExtractor,
}

impl QueueService {
    pub fn new(executor: Arc<dyn CommandExecutor>, extractor: DomainExtractor) -> Self {
        Self {
            executor,
            extractor,
        }
    }

    /// Returns the queue in position order.
    pub async fn list(&self) -> CadenzaResult<Vec<QueueTrackInfo>> {
        let reply = self.executor.send(Command::new(CMD_PLAYLIST_INFO)).await?;
        let entries = segment(reply.tags, SONG_BOUNDARY)
            .map(|group| self.extractor.extract_queue_entry(&group))
            .filter(|entry| !entry.id.is_empty())
            .collect();
        let mut entries = consolidate_queue(entries);
        entries.sort_by_key(|entry| entry.position);
        Ok(entries)
    }

    /// Appends `uri` and returns the identity of the new queue slot.
    pub async fn add(&self, uri: &str) -> CadenzaResult<Identity> {
        let reply = self.executor.send(Command::new(CMD_ADD_ID).arg(uri)).await?;
        let id = reply
            .get(SONG_ID_KEY)
            .ok_or_else(|| CadenzaError::Protocol(format!("{CMD_ADD_ID} reply without Id")))?;
        log::debug!("[Queue] Added {} as {}", uri, id);
        Ok(Identity::queue_entry(id))
    }

    pub async fn remove(&self, entry: &Identity) -> CadenzaResult<()> {
        entry.expect_kind(EntityKind::QueueEntry)?;
        self.executor
            .send(Command::new(CMD_DELETE_ID).arg(entry.value()))
            .await?;
        Ok(())
    }

    pub async fn clear(&self) -> CadenzaResult<()> {
        self.executor.send(Command::new(CMD_CLEAR)).await?;
        Ok(())
    }

    /// Moves `entry` to the zero-based `position`.
    pub async fn move_entry(&self, entry: &Identity, position: u32) -> CadenzaResult<()> {
        entry.expect_kind(EntityKind::QueueEntry)?;
        self.executor
            .send(
                Command::new(CMD_MOVE_ID)
                    .arg(entry.value())
                    .arg(position.to_string()),
            )
            .await?;
        Ok(())
    }
}

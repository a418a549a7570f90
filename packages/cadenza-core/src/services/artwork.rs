//! Cover art retrieval with fallback.
//!
//! Lookup order for a track:
//! 1. the cover file in the song's directory (`albumart`)
//! 2. the picture embedded in the song (`readpicture`)
//! 3. the built-in default image
//!
//! A failed or empty lookup falls through to the next step.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::CommandExecutor;
use crate::library::TrackInfo;
use crate::protocol_constants::{CMD_ALBUM_ART, CMD_READ_PICTURE};
use crate::DEFAULT_ARTWORK;

/// Where resolved artwork came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ArtworkOrigin {
    CoverFile,
    Embedded,
    Default,
}

impl fmt::Display for ArtworkOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CoverFile => f.write_str("cover file"),
            Self::Embedded => f.write_str("embedded picture"),
            Self::Default => f.write_str("default"),
        }
    }
}

/// Image bytes for a track.
#[derive(Debug, Clone)]
pub struct Artwork {
    pub bytes: Bytes,
    pub origin: ArtworkOrigin,
}

impl Artwork {
    /// The built-in image.
    pub fn fallback() -> Self {
        Self {
            bytes: Bytes::from_static(DEFAULT_ARTWORK),
            origin: ArtworkOrigin::Default,
        }
    }

    pub fn is_default(&self) -> bool {
        self.origin == ArtworkOrigin::Default
    }
}

pub struct ArtworkService {
    executor: Arc<dyn CommandExecutor>,
}

impl ArtworkService {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    /// Resolves artwork for `track`. Never fails; the default image is the
    /// last resort.
    ///
    /// Cancelling `cancel` stops the lookups and yields the default image.
    pub async fn resolve(&self, track: &TrackInfo, cancel: &CancellationToken) -> Artwork {
        if track.file.is_empty() {
            return Artwork::fallback();
        }

        let steps = [
            (CMD_ALBUM_ART, ArtworkOrigin::CoverFile),
            (CMD_READ_PICTURE, ArtworkOrigin::Embedded),
        ];
        for (command, origin) in steps {
            if cancel.is_cancelled() {
                break;
            }
            match self.executor.read_binary(command, &track.file, cancel).await {
                Ok(bytes) if !bytes.is_empty() => {
                    log::debug!(
                        "[Artwork] {} bytes of {} for {}",
                        bytes.len(),
                        origin,
                        track.file
                    );
                    return Artwork { bytes, origin };
                }
                Ok(_) => log::debug!("[Artwork] No {} for {}", origin, track.file),
                Err(e) => log::warn!("[Artwork] {} lookup for {} failed: {}", origin, track.file, e),
            }
        }

        Artwork::fallback()
    }
}

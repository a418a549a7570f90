//! Raw spellings seen for each canonical artist.
//!
//! Lookups by artist must be issued with every spelling the server has
//! indexed, so the table records each raw name the extractor resolves. It
//! only grows during a session and is discarded with it.

use dashmap::DashMap;

use super::identity::{EntityKind, Identity};

/// Concurrent, append-only map from artist identity to raw spellings.
#[derive(Debug, Default)]
pub struct ArtistAliasTable {
    /// Canonical artist identity -> raw spellings in first-seen order
    aliases: DashMap<Identity, Vec<String>>,
}

impl ArtistAliasTable {
    /// Creates a new empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `raw` as a spelling of `artist`.
    ///
    /// Returns true if the spelling was not known before. Blank spellings and
    /// non-artist identities are ignored.
    pub fn record(&self, artist: &Identity, raw: &str) -> bool {
        let raw = raw.trim();
        if raw.is_empty() || artist.kind() != EntityKind::Artist {
            return false;
        }

        let mut entry = self.aliases.entry(artist.clone()).or_default();
        if entry.iter().any(|known| known == raw) {
            return false;
        }
        entry.push(raw.to_string());
        true
    }

    /// Returns every spelling recorded for `artist`, in first-seen order.
    pub fn aliases_of(&self, artist: &Identity) -> Vec<String> {
        self.aliases
            .get(artist)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    /// Number of artists with at least one recorded spelling.
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Forgets every spelling. Called when a session ends.
    pub fn clear(&self) {
        self.aliases.clear();
    }
}

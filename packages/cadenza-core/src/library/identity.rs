//! Stable typed identities for library entities.
//!
//! An identity is a short kind tag plus an opaque value, rendered as
//! `"<TAG>:<value>"`. Album identities carry a reversible encoding of the
//! album title and its sorted album-artist identities.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Separates the title component from the artist-list component.
const COMPONENT_SEPARATOR: char = '\u{1F}';

/// Separates artist identities inside the artist-list component.
const ARTIST_SEPARATOR: char = '\u{1E}';

/// Errors raised while decoding an identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("invalid identity format: {0}")]
    InvalidFormat(String),

    #[error("expected {expected} identity, got {actual}")]
    KindMismatch {
        expected: EntityKind,
        actual: EntityKind,
    },
}

/// Kind of entity an identity refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    Album,
    Artist,
    Track,
    QueueEntry,
    Playlist,
}

impl EntityKind {
    /// Returns the short tag used in the string form.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Album => "ALB",
            Self::Artist => "ART",
            Self::Track => "TRK",
            Self::QueueEntry => "QUE",
            Self::Playlist => "PLS",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "ALB" => Some(Self::Album),
            "ART" => Some(Self::Artist),
            "TRK" => Some(Self::Track),
            "QUE" => Some(Self::QueueEntry),
            "PLS" => Some(Self::Playlist),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A typed, string-backed identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity {
    kind: EntityKind,
    value: String,
}

impl Identity {
    /// Creates an identity from an already-derived value.
    pub fn new(kind: EntityKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// The identity with an empty value, used when nothing could be derived.
    pub fn empty(kind: EntityKind) -> Self {
        Self::new(kind, String::new())
    }

    /// Artist identity derived from the canonical form of `name`.
    pub fn artist(name: &str) -> Self {
        Self::new(EntityKind::Artist, canonical_artist_name(name))
    }

    /// Track identity for a song file path.
    pub fn track(file: &str) -> Self {
        Self::new(EntityKind::Track, file)
    }

    /// Queue entry identity for a server song id.
    pub fn queue_entry(song_id: &str) -> Self {
        Self::new(EntityKind::QueueEntry, song_id.trim())
    }

    /// Playlist identity for a stored playlist name.
    pub fn playlist(name: &str) -> Self {
        Self::new(EntityKind::Playlist, name)
    }

    /// Album identity for a title and its album artists.
    ///
    /// The title is trimmed; artist order and duplicates do not matter.
    pub fn album(title: &str, album_artists: &[Identity]) -> Self {
        Self::new(EntityKind::Album, encode(title.trim(), album_artists))
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Returns an error unless this identity has the `expected` kind.
    pub fn expect_kind(&self, expected: EntityKind) -> Result<(), IdentityError> {
        if self.kind == expected {
            Ok(())
        } else {
            Err(IdentityError::KindMismatch {
                expected,
                actual: self.kind,
            })
        }
    }

    /// Decodes an album identity into its title and album-artist identities.
    pub fn decode_album(&self) -> Result<(String, Vec<Identity>), IdentityError> {
        self.expect_kind(EntityKind::Album)?;
        decode(&self.value, |s| {
            let id: Identity = s.parse()?;
            id.expect_kind(EntityKind::Artist)?;
            Ok(id)
        })
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.tag(), self.value)
    }
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tag, value) = s
            .split_once(':')
            .ok_or_else(|| IdentityError::InvalidFormat(format!("missing kind tag in {s:?}")))?;
        let kind = EntityKind::from_tag(tag)
            .ok_or_else(|| IdentityError::InvalidFormat(format!("unknown kind tag {tag:?}")))?;
        Ok(Self::new(kind, value))
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Canonical Names
// ─────────────────────────────────────────────────────────────────────────────

/// Canonical form of an artist name: trimmed, inner whitespace collapsed
/// to one space, lower-cased.
pub fn canonical_artist_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ─────────────────────────────────────────────────────────────────────────────
// Composite Codec
// ─────────────────────────────────────────────────────────────────────────────

/// Encodes a title and an artist-identity list into one opaque string.
///
/// Every component is base64-encoded on its own, so the separators never
/// occur inside one. Artist identities are deduplicated and sorted
/// ordinally first, so any permutation of the same set encodes identically.
pub fn encode(title: &str, artist_ids: &[Identity]) -> String {
    let mut artists: Vec<String> = artist_ids.iter().map(ToString::to_string).collect();
    artists.sort();
    artists.dedup();

    let mut out = URL_SAFE_NO_PAD.encode(title.as_bytes());
    if !artists.is_empty() {
        out.push(COMPONENT_SEPARATOR);
        for (i, artist) in artists.iter().enumerate() {
            if i > 0 {
                out.push(ARTIST_SEPARATOR);
            }
            out.push_str(&URL_SAFE_NO_PAD.encode(artist.as_bytes()));
        }
    }
    out
}

/// Decodes a string produced by [`encode`].
///
/// An empty input decodes to an empty title with no artists. A missing
/// artist component yields a title-only result.
///
/// # Errors
/// `InvalidFormat` if any component is not valid base64 or UTF-8, or if
/// `parse_artist` rejects an artist identity. Nothing is returned on failure.
pub fn decode<F>(opaque: &str, parse_artist: F) -> Result<(String, Vec<Identity>), IdentityError>
where
    F: Fn(&str) -> Result<Identity, IdentityError>,
{
    if opaque.is_empty() {
        return Ok((String::new(), Vec::new()));
    }

    let mut components = opaque.split(COMPONENT_SEPARATOR);
    let title = decode_component(components.next().unwrap_or_default())?;

    let artists = match components.next() {
        None => Vec::new(),
        Some(list) => {
            let mut artists = list
                .split(ARTIST_SEPARATOR)
                .filter(|s| !s.is_empty())
                .map(|component| decode_component(component).and_then(|s| parse_artist(&s)))
                .collect::<Result<Vec<_>, _>>()?;
            artists.sort();
            artists.dedup();
            artists
        }
    };

    if components.next().is_some() {
        return Err(IdentityError::InvalidFormat(
            "unexpected trailing component".into(),
        ));
    }

    Ok((title, artists))
}

fn decode_component(component: &str) -> Result<String, IdentityError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(component)
        .map_err(|e| IdentityError::InvalidFormat(format!("bad base64: {e}")))?;
    String::from_utf8(bytes).map_err(|e| IdentityError::InvalidFormat(format!("bad UTF-8: {e}")))
}

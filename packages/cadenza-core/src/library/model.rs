//! Library value types.
//!
//! All records are rebuilt from server replies on every query; none of them
//! is mutated after extraction.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::identity::Identity;

// ─────────────────────────────────────────────────────────────────────────────
// Artist Roles
// ─────────────────────────────────────────────────────────────────────────────

/// Set of roles an artist holds on a track or album.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtistRoles(u16);

impl ArtistRoles {
    pub const NONE: Self = Self(0);
    pub const PERFORMER: Self = Self(1 << 0);
    pub const ENSEMBLE: Self = Self(1 << 1);
    pub const COMPOSER: Self = Self(1 << 2);
    pub const CONDUCTOR: Self = Self(1 << 3);
    pub const ARRANGER: Self = Self(1 << 4);
    pub const SOLOIST: Self = Self(1 << 5);
    pub const ALBUM_ARTIST: Self = Self(1 << 6);
    pub const ARTIST: Self = Self(1 << 7);

    const NAMES: [(Self, &'static str); 8] = [
        (Self::PERFORMER, "performer"),
        (Self::ENSEMBLE, "ensemble"),
        (Self::COMPOSER, "composer"),
        (Self::CONDUCTOR, "conductor"),
        (Self::ARRANGER, "arranger"),
        (Self::SOLOIST, "soloist"),
        (Self::ALBUM_ARTIST, "albumartist"),
        (Self::ARTIST, "artist"),
    ];

    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns true if every role in `other` is also in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ArtistRoles {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for ArtistRoles {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl fmt::Display for ArtistRoles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (role, name) in Self::NAMES {
            if self.contains(role) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Release Dates
// ─────────────────────────────────────────────────────────────────────────────

/// A release date at year, year-month or full-date granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReleaseDate {
    pub year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
}

impl ReleaseDate {
    /// Parses `YYYY`, `YYYY-MM` or `YYYY-MM-DD`.
    ///
    /// Any other shape, or an impossible calendar date, yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.trim().split('-');
        let year = parse_fixed(parts.next()?, 4)?;
        let month = match parts.next() {
            Some(m) => Some(parse_fixed(m, 2)?),
            None => None,
        };
        let day = match parts.next() {
            Some(d) => Some(parse_fixed(d, 2)?),
            None => None,
        };
        if parts.next().is_some() {
            return None;
        }

        let year = i32::try_from(year).ok()?;
        match (month, day) {
            (None, _) => Some(Self {
                year,
                month: None,
                day: None,
            }),
            (Some(month), None) => (1..=12).contains(&month).then_some(Self {
                year,
                month: Some(month),
                day: None,
            }),
            (Some(month), Some(day)) => {
                NaiveDate::from_ymd_opt(year, month, day).map(|_| Self {
                    year,
                    month: Some(month),
                    day: Some(day),
                })
            }
        }
    }
}

fn parse_fixed(digits: &str, len: usize) -> Option<u32> {
    if digits.len() != len || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

impl fmt::Display for ReleaseDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.year)?;
        if let Some(month) = self.month {
            write!(f, "-{month:02}")?;
        }
        if let Some(day) = self.day {
            write!(f, "-{day:02}")?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Entities
// ─────────────────────────────────────────────────────────────────────────────

/// Classical work and movement metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkInfo {
    pub work: Option<String>,
    pub movement: Option<String>,
    pub movement_number: Option<u32>,
    pub movement_count: Option<u32>,
}

impl WorkInfo {
    pub fn is_empty(&self) -> bool {
        self.work.is_none()
            && self.movement.is_none()
            && self.movement_number.is_none()
            && self.movement_count.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetKind {
    FrontCover,
}

/// Reference to a binary resource; `id` names the track file it is read from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRef {
    pub kind: AssetKind,
    pub id: Identity,
}

/// An artist credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistInfo {
    pub id: Identity,
    /// First raw spelling seen for this artist.
    pub name: String,
    pub sort_name: Option<String>,
    pub roles: ArtistRoles,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub id: Identity,
    pub file: String,
    pub title: Option<String>,
    pub duration: Option<Duration>,
    pub release_date: Option<ReleaseDate>,
    pub work: Option<WorkInfo>,
    /// Back-reference to the album this track belongs to.
    pub album_id: Option<Identity>,
    pub album_title: Option<String>,
    pub credits: Vec<ArtistInfo>,
    pub assets: Vec<AssetRef>,
}

impl TrackInfo {
    /// Credits holding any of `roles`.
    pub fn artists_with(&self, roles: ArtistRoles) -> impl Iterator<Item = &ArtistInfo> {
        self.credits
            .iter()
            .filter(move |a| a.roles.0 & roles.0 != 0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumInfo {
    pub id: Identity,
    pub title: String,
    pub release_date: Option<ReleaseDate>,
    pub album_artists: Vec<ArtistInfo>,
    /// Artists credited on the album's tracks, aggregated.
    pub track_artists: Vec<ArtistInfo>,
    /// Filled only when the album was loaded with its tracks.
    pub tracks: Vec<TrackInfo>,
    pub assets: Vec<AssetRef>,
}

/// One slot of the play queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueTrackInfo {
    pub id: Identity,
    pub position: u32,
    pub track: TrackInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistTrackInfo {
    pub position: u32,
    pub track: TrackInfo,
}

/// A stored playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistInfo {
    pub id: Identity,
    pub name: String,
    pub last_modified: Option<String>,
    pub tracks: Vec<PlaylistTrackInfo>,
}

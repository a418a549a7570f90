//! Turns tag groups into library records.
//!
//! Extraction walks one tag group once and never fails: unparseable values
//! become `None`. Consolidation merges records sharing an identity, taking
//! scalar fields from the first record and unioning list fields.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::aliases::ArtistAliasTable;
use super::identity::{EntityKind, Identity};
use super::model::{
    AlbumInfo, ArtistInfo, ArtistRoles, AssetKind, AssetRef, PlaylistInfo, PlaylistTrackInfo,
    QueueTrackInfo, ReleaseDate, TrackInfo, WorkInfo,
};
use super::tagging::{StandardTagScheme, TagField, TagScheme};
use crate::protocol::Tag;

/// Extracts typed records from tag groups using one [`TagScheme`].
///
/// Every artist spelling resolved during extraction is recorded in the
/// shared [`ArtistAliasTable`].
#[derive(Clone)]
pub struct DomainExtractor {
    scheme: Arc<dyn TagScheme>,
    aliases: Arc<ArtistAliasTable>,
}

/// Fields of one item beyond the track itself.
#[derive(Default)]
struct ItemExtras {
    position: Option<u32>,
    song_id: Option<String>,
    playlist: Option<String>,
    last_modified: Option<String>,
}

impl DomainExtractor {
    pub fn new(scheme: Arc<dyn TagScheme>, aliases: Arc<ArtistAliasTable>) -> Self {
        Self { scheme, aliases }
    }

    /// Creates an extractor using [`StandardTagScheme`].
    pub fn standard(aliases: Arc<ArtistAliasTable>) -> Self {
        Self::new(Arc::new(StandardTagScheme), aliases)
    }

    pub fn scheme(&self) -> &dyn TagScheme {
        self.scheme.as_ref()
    }

    pub fn aliases(&self) -> &Arc<ArtistAliasTable> {
        &self.aliases
    }

    pub fn extract_track(&self, tags: &[Tag]) -> TrackInfo {
        self.extract_item(tags).0
    }

    /// Extracts a single-track album seed from one tag group.
    pub fn extract_album(&self, tags: &[Tag]) -> AlbumInfo {
        album_seed(self.extract_track(tags))
    }

    /// Extracts a queue slot. Uses `Pos` for the position and `Id` for the
    /// slot identity.
    pub fn extract_queue_entry(&self, tags: &[Tag]) -> QueueTrackInfo {
        let (track, extras) = self.extract_item(tags);
        QueueTrackInfo {
            id: extras
                .song_id
                .as_deref()
                .map(Identity::queue_entry)
                .unwrap_or_else(|| Identity::empty(EntityKind::QueueEntry)),
            position: extras.position.unwrap_or_default(),
            track,
        }
    }

    /// Extracts one stored-playlist entry at `position`.
    pub fn extract_playlist_entry(&self, tags: &[Tag], position: u32) -> PlaylistTrackInfo {
        PlaylistTrackInfo {
            position,
            track: self.extract_track(tags),
        }
    }

    /// Extracts a playlist header from a `listplaylists` group.
    pub fn extract_playlist_header(&self, tags: &[Tag]) -> PlaylistInfo {
        let (_, extras) = self.extract_item(tags);
        let name = extras.playlist.unwrap_or_default();
        PlaylistInfo {
            id: Identity::playlist(&name),
            name,
            last_modified: extras.last_modified,
            tracks: Vec::new(),
        }
    }

    /// Returns an accumulator merging artist names into one list.
    pub fn artist_accumulator(&self) -> ArtistAccumulator<'_> {
        ArtistAccumulator {
            extractor: self,
            artists: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn field(&self, tag: &Tag) -> Option<TagField> {
        self.scheme.field(&tag.name)
    }

    fn extract_item(&self, tags: &[Tag]) -> (TrackInfo, ItemExtras) {
        let mut file = String::new();
        let mut title = None;
        let mut album_title = None;
        let mut duration = None;
        let mut legacy_time = None;
        let mut date = None;
        let mut original_date = None;
        let mut work = WorkInfo::default();
        let mut extras = ItemExtras::default();

        let mut artist_tags: Vec<(TagField, &str)> = Vec::new();
        let mut artist_sorts: Vec<&str> = Vec::new();
        let mut album_artist_sorts: Vec<&str> = Vec::new();

        for tag in tags {
            let Some(field) = self.field(tag) else {
                continue;
            };
            let value = tag.value.as_str();

            if field.role().is_some() {
                artist_tags.push((field, value));
                continue;
            }

            match field {
                TagField::File => file = value.to_string(),
                TagField::Title => title = title.or_else(|| non_empty(value)),
                TagField::Album => album_title = album_title.or_else(|| non_empty(value)),
                TagField::ArtistSort => artist_sorts.push(value),
                TagField::AlbumArtistSort => album_artist_sorts.push(value),
                TagField::Work => work.work = work.work.or_else(|| non_empty(value)),
                TagField::Movement => {
                    work.movement = work.movement.or_else(|| non_empty(value))
                }
                TagField::MovementNumber => work.movement_number = parse_u32(value),
                TagField::MovementTotal => work.movement_count = parse_u32(value),
                TagField::Date => date = date.or_else(|| ReleaseDate::parse(value)),
                TagField::OriginalDate => {
                    original_date = original_date.or_else(|| ReleaseDate::parse(value))
                }
                TagField::Duration => duration = parse_seconds(value),
                TagField::Time => legacy_time = value.trim().parse().ok().map(Duration::from_secs),
                TagField::Position => extras.position = parse_u32(value),
                TagField::Id => extras.song_id = non_empty(value),
                TagField::Playlist => extras.playlist = non_empty(value),
                TagField::LastModified => extras.last_modified = non_empty(value),
                _ => {}
            }
        }

        let credits = self.build_credits(&artist_tags, &artist_sorts, &album_artist_sorts);
        let album_id = album_title
            .as_deref()
            .map(|t| Identity::album(t, &album_artist_ids(&credits)));

        let assets = if file.is_empty() {
            Vec::new()
        } else {
            vec![AssetRef {
                kind: AssetKind::FrontCover,
                id: Identity::track(&file),
            }]
        };

        let track = TrackInfo {
            id: if file.is_empty() {
                Identity::empty(EntityKind::Track)
            } else {
                Identity::track(&file)
            },
            file,
            title,
            duration: duration.or(legacy_time),
            release_date: date.or(original_date),
            work: (!work.is_empty()).then_some(work),
            album_id,
            album_title,
            credits,
            assets,
        };
        (track, extras)
    }

    /// Builds the credit list, merging spellings that share a canonical name.
    ///
    /// Sort names pair positionally with the `Artist` and `AlbumArtist` tags.
    fn build_credits(
        &self,
        artist_tags: &[(TagField, &str)],
        artist_sorts: &[&str],
        album_artist_sorts: &[&str],
    ) -> Vec<ArtistInfo> {
        let mut credits: Vec<ArtistInfo> = Vec::new();
        let (mut artist_seen, mut album_artist_seen) = (0usize, 0usize);

        for &(field, raw) in artist_tags {
            let sort_name = match field {
                TagField::Artist => {
                    artist_seen += 1;
                    artist_sorts.get(artist_seen - 1)
                }
                TagField::AlbumArtist => {
                    album_artist_seen += 1;
                    album_artist_sorts.get(album_artist_seen - 1)
                }
                _ => None,
            }
            .and_then(|s| non_empty(s));

            let Some(artist) = self.resolve_artist(raw, field.role().unwrap_or_default(), sort_name)
            else {
                continue;
            };
            merge_credit(&mut credits, artist);
        }
        credits
    }

    /// Resolves a raw name to an artist credit and records the spelling.
    fn resolve_artist(
        &self,
        raw: &str,
        roles: ArtistRoles,
        sort_name: Option<String>,
    ) -> Option<ArtistInfo> {
        let id = Identity::artist(raw);
        if id.is_empty() {
            return None;
        }
        self.aliases.record(&id, raw);
        Some(ArtistInfo {
            id,
            name: raw.trim().to_string(),
            sort_name,
            roles,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Consolidation
// ─────────────────────────────────────────────────────────────────────────────

/// Groups tracks into albums by album identity, in first-seen order.
///
/// Tracks without an album tag belong to no album and are skipped.
pub fn consolidate_albums(tracks: Vec<TrackInfo>) -> Vec<AlbumInfo> {
    let mut albums: Vec<AlbumInfo> = Vec::new();
    let mut index: HashMap<Identity, usize> = HashMap::new();

    for track in tracks {
        let Some(album_id) = track.album_id.clone() else {
            continue;
        };
        match index.get(&album_id) {
            Some(&i) => merge_into_album(&mut albums[i], track),
            None => {
                index.insert(album_id, albums.len());
                albums.push(album_seed(track));
            }
        }
    }
    albums
}

/// Merges album records sharing an identity, in first-seen order.
pub fn merge_albums(seeds: Vec<AlbumInfo>) -> Vec<AlbumInfo> {
    let mut albums: Vec<AlbumInfo> = Vec::new();
    let mut index: HashMap<Identity, usize> = HashMap::new();

    for seed in seeds {
        match index.get(&seed.id) {
            Some(&i) => {
                let album = &mut albums[i];
                for artist in seed.album_artists {
                    merge_credit(&mut album.album_artists, artist);
                }
                for track in seed.tracks {
                    merge_into_album(album, track);
                }
            }
            None => {
                index.insert(seed.id.clone(), albums.len());
                albums.push(seed);
            }
        }
    }
    albums
}

/// Drops repeated queue slots, keeping the first record of each.
pub fn consolidate_queue(entries: Vec<QueueTrackInfo>) -> Vec<QueueTrackInfo> {
    let mut seen = std::collections::HashSet::new();
    entries
        .into_iter()
        .filter(|e| e.id.is_empty() || seen.insert(e.id.clone()))
        .collect()
}

/// Merges playlist records sharing an identity, concatenating their tracks.
pub fn consolidate_playlists(playlists: Vec<PlaylistInfo>) -> Vec<PlaylistInfo> {
    let mut merged: Vec<PlaylistInfo> = Vec::new();
    let mut index: HashMap<Identity, usize> = HashMap::new();

    for playlist in playlists {
        match index.get(&playlist.id) {
            Some(&i) => merged[i].tracks.extend(playlist.tracks),
            None => {
                index.insert(playlist.id.clone(), merged.len());
                merged.push(playlist);
            }
        }
    }
    merged
}

fn album_seed(track: TrackInfo) -> AlbumInfo {
    let album_artists: Vec<ArtistInfo> = album_artists(&track.credits).cloned().collect();
    let id = track
        .album_id
        .clone()
        .unwrap_or_else(|| Identity::album("", &album_artist_ids(&track.credits)));

    let mut album = AlbumInfo {
        id,
        title: track.album_title.clone().unwrap_or_default(),
        release_date: track.release_date,
        album_artists,
        track_artists: Vec::new(),
        tracks: Vec::new(),
        assets: Vec::new(),
    };
    merge_into_album(&mut album, track);
    album
}

fn merge_into_album(album: &mut AlbumInfo, track: TrackInfo) {
    if album.tracks.iter().any(|t| t.id == track.id) {
        return;
    }

    for artist in track.credits.iter().filter(|a| is_track_artist(a)) {
        merge_credit(&mut album.track_artists, artist.clone());
    }
    if album.release_date.is_none() {
        album.release_date = track.release_date;
    }
    if album.assets.is_empty() && !track.file.is_empty() {
        album.assets = track
            .assets
            .iter()
            .filter(|a| a.kind == AssetKind::FrontCover)
            .take(1)
            .cloned()
            .collect();
    }
    album.tracks.push(track);
}

/// Adds `artist` to `credits`, unioning roles with an existing entry.
fn merge_credit(credits: &mut Vec<ArtistInfo>, artist: ArtistInfo) {
    match credits.iter_mut().find(|c| c.id == artist.id) {
        Some(existing) => {
            existing.roles |= artist.roles;
            if existing.sort_name.is_none() {
                existing.sort_name = artist.sort_name;
            }
        }
        None => credits.push(artist),
    }
}

/// Album artists of a credit list, falling back to the plain artists when
/// no album-artist tag is present.
fn album_artists(credits: &[ArtistInfo]) -> impl Iterator<Item = &ArtistInfo> {
    let has_album_artist = credits
        .iter()
        .any(|a| a.roles.contains(ArtistRoles::ALBUM_ARTIST));
    let wanted = if has_album_artist {
        ArtistRoles::ALBUM_ARTIST
    } else {
        ArtistRoles::ARTIST
    };
    credits.iter().filter(move |a| a.roles.contains(wanted))
}

fn album_artist_ids(credits: &[ArtistInfo]) -> Vec<Identity> {
    album_artists(credits).map(|a| a.id.clone()).collect()
}

fn is_track_artist(artist: &ArtistInfo) -> bool {
    artist.roles != ArtistRoles::ALBUM_ARTIST
}

// ─────────────────────────────────────────────────────────────────────────────
// Artist Accumulator
// ─────────────────────────────────────────────────────────────────────────────

/// Collects artist names from several replies into one deduplicated list.
///
/// Names sharing a canonical identity merge into one entry whose roles are
/// the union of every role they were seen under.
pub struct ArtistAccumulator<'a> {
    extractor: &'a DomainExtractor,
    artists: Vec<ArtistInfo>,
    index: HashMap<Identity, usize>,
}

impl ArtistAccumulator<'_> {
    /// Adds one raw name under `roles`.
    pub fn add(&mut self, raw: &str, roles: ArtistRoles) {
        if let Some(artist) = self.extractor.resolve_artist(raw, roles, None) {
            self.add_credit(artist);
        }
    }

    /// Adds an already-extracted credit.
    pub fn add_credit(&mut self, artist: ArtistInfo) {
        match self.index.get(&artist.id) {
            Some(&i) => {
                let existing = &mut self.artists[i];
                existing.roles |= artist.roles;
                if existing.sort_name.is_none() {
                    existing.sort_name = artist.sort_name;
                }
            }
            None => {
                self.index.insert(artist.id.clone(), self.artists.len());
                self.artists.push(artist);
            }
        }
    }

    /// Adds every artist-bearing tag of a reply, with the role its tag implies.
    pub fn add_tags(&mut self, tags: &[Tag]) {
        for tag in tags {
            if let Some(role) = self.extractor.field(tag).and_then(TagField::role) {
                self.add(&tag.value, role);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.artists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artists.is_empty()
    }

    /// Returns the merged list, ordered by sort name (or name), ignoring case.
    pub fn finish(self) -> Vec<ArtistInfo> {
        let mut artists = self.artists;
        artists.sort_by_cached_key(|a| {
            (
                a.sort_name.as_deref().unwrap_or(&a.name).to_lowercase(),
                a.id.clone(),
            )
        });
        artists
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Value Parsing
// ─────────────────────────────────────────────────────────────────────────────

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Parses a leading integer, accepting the `N/M` form some taggers write.
fn parse_u32(value: &str) -> Option<u32> {
    value.split('/').next()?.trim().parse().ok()
}

fn parse_seconds(value: &str) -> Option<Duration> {
    let secs: f64 = value.trim().parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

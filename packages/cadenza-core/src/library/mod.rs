//! Library model: identities, tag segmentation and record extraction.

pub mod aliases;
pub mod extractor;
pub mod identity;
pub mod model;
pub mod segmenter;
pub mod tagging;

pub use aliases::ArtistAliasTable;
pub use extractor::{
    consolidate_albums, consolidate_playlists, consolidate_queue, merge_albums,
    ArtistAccumulator, DomainExtractor,
};
pub use identity::{canonical_artist_name, EntityKind, Identity, IdentityError};
pub use model::{
    AlbumInfo, ArtistInfo, ArtistRoles, AssetKind, AssetRef, PlaylistInfo, PlaylistTrackInfo,
    QueueTrackInfo, ReleaseDate, TrackInfo, WorkInfo,
};
pub use segmenter::{segment, TagGroups};
pub use tagging::{StandardTagScheme, TagField, TagScheme};

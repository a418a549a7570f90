//! Mapping of raw tag names to the fields the extractor understands.

use super::model::ArtistRoles;

/// Field a raw tag contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagField {
    File,
    Title,
    Album,
    Artist,
    ArtistSort,
    AlbumArtist,
    AlbumArtistSort,
    Composer,
    Performer,
    Conductor,
    Ensemble,
    Arranger,
    Soloist,
    Work,
    Movement,
    MovementNumber,
    MovementTotal,
    Date,
    OriginalDate,
    Duration,
    Time,
    Position,
    Id,
    Playlist,
    LastModified,
}

impl TagField {
    /// Role flag carried by an artist-bearing field, if any.
    pub fn role(self) -> Option<ArtistRoles> {
        match self {
            Self::Artist => Some(ArtistRoles::ARTIST),
            Self::AlbumArtist => Some(ArtistRoles::ALBUM_ARTIST),
            Self::Composer => Some(ArtistRoles::COMPOSER),
            Self::Performer => Some(ArtistRoles::PERFORMER),
            Self::Conductor => Some(ArtistRoles::CONDUCTOR),
            Self::Ensemble => Some(ArtistRoles::ENSEMBLE),
            Self::Arranger => Some(ArtistRoles::ARRANGER),
            Self::Soloist => Some(ArtistRoles::SOLOIST),
            _ => None,
        }
    }
}

/// Tagging convention used to interpret replies.
///
/// Only one scheme is active per session. It decides which raw tag names
/// populate which fields and which tags enumerate artists by role.
pub trait TagScheme: Send + Sync {
    /// Maps a raw tag name to a field, or `None` for tags the scheme ignores.
    fn field(&self, name: &str) -> Option<TagField>;

    /// Returns the server tag name used to enumerate or filter by `field`.
    fn tag_name(&self, field: TagField) -> &'static str;

    /// Fields whose values are enumerated to build the artist list.
    fn artist_enumeration_fields(&self) -> &[TagField];
}

/// The server's standard tag names.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardTagScheme;

const STANDARD_TAGS: &[(&str, TagField)] = &[
    ("file", TagField::File),
    ("Title", TagField::Title),
    ("Album", TagField::Album),
    ("Artist", TagField::Artist),
    ("ArtistSort", TagField::ArtistSort),
    ("AlbumArtist", TagField::AlbumArtist),
    ("AlbumArtistSort", TagField::AlbumArtistSort),
    ("Composer", TagField::Composer),
    ("Performer", TagField::Performer),
    ("Conductor", TagField::Conductor),
    ("Ensemble", TagField::Ensemble),
    ("Arranger", TagField::Arranger),
    ("Soloist", TagField::Soloist),
    ("Work", TagField::Work),
    ("Movement", TagField::Movement),
    ("MovementNumber", TagField::MovementNumber),
    ("MovementTotal", TagField::MovementTotal),
    ("Date", TagField::Date),
    ("OriginalDate", TagField::OriginalDate),
    ("duration", TagField::Duration),
    ("Time", TagField::Time),
    ("Pos", TagField::Position),
    ("Id", TagField::Id),
    ("playlist", TagField::Playlist),
    ("Last-Modified", TagField::LastModified),
];

const ARTIST_ENUMERATION: &[TagField] = &[
    TagField::Artist,
    TagField::AlbumArtist,
    TagField::Composer,
    TagField::Performer,
    TagField::Conductor,
    TagField::Ensemble,
];

impl TagScheme for StandardTagScheme {
    fn field(&self, name: &str) -> Option<TagField> {
        STANDARD_TAGS
            .iter()
            .find(|(tag, _)| tag.eq_ignore_ascii_case(name))
            .map(|&(_, field)| field)
    }

    fn tag_name(&self, field: TagField) -> &'static str {
        STANDARD_TAGS
            .iter()
            .find(|&&(_, f)| f == field)
            .map(|&(tag, _)| tag)
            .unwrap_or("any")
    }

    fn artist_enumeration_fields(&self) -> &[TagField] {
        ARTIST_ENUMERATION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_match_case_insensitively() {
        let scheme = StandardTagScheme;
        assert_eq!(scheme.field("albumartist"), Some(TagField::AlbumArtist));
        assert_eq!(scheme.field("FILE"), Some(TagField::File));
        assert_eq!(scheme.field("MUSICBRAINZ_TRACKID"), None);
    }

    #[test]
    fn every_field_has_a_tag_name() {
        let scheme = StandardTagScheme;
        for &(tag, field) in STANDARD_TAGS {
            assert_eq!(scheme.tag_name(field), tag);
        }
    }

    #[test]
    fn enumeration_fields_all_carry_roles() {
        let scheme = StandardTagScheme;
        assert!(scheme
            .artist_enumeration_fields()
            .iter()
            .all(|f| f.role().is_some()));
    }
}

//! Artist, album and track queries.
//!
//! Artist-scoped lookups fan out over every spelling recorded in the alias
//! table and every artist role tag, so an album indexed under an alternate
//! spelling is still found.

use std::sync::Arc;

use futures::future::join_all;

use super::{extract_tracks, CommandExecutor};
use crate::error::{CadenzaError, CadenzaResult};
use crate::library::{
    consolidate_albums, AlbumInfo, ArtistInfo, DomainExtractor, EntityKind, Identity, TagField,
    TrackInfo,
};
use crate::protocol::{Command, Response, Tag};
use crate::protocol_constants::{CMD_FIND, CMD_LIST, CMD_LIST_ALL_INFO, CMD_SEARCH, CMD_UPDATE};

/// Reply key carrying the job id of a started database update.
const UPDATE_JOB_KEY: &str = "updating_db";

/// Library queries over a [`CommandExecutor`].
pub struct LibraryService {
    executor: Arc<dyn CommandExecutor>,
    extractor: DomainExtractor,
}

impl LibraryService {
    pub fn new(executor: Arc<dyn CommandExecutor>, extractor: DomainExtractor) -> Self {
        Self {
            executor,
            extractor,
        }
    }

    pub fn extractor(&self) -> &DomainExtractor {
        &self.extractor
    }

    /// Lists every artist under any role, deduplicated and name-sorted.
    ///
    /// One `list <tag>` is issued per role tag, concurrently. A failed
    /// enumeration is skipped; only if all of them fail is an error returned.
    pub async fn list_artists(&self) -> CadenzaResult<Vec<ArtistInfo>> {
        let scheme = self.extractor.scheme();
        let commands = scheme
            .artist_enumeration_fields()
            .iter()
            .map(|&field| Command::new(CMD_LIST).arg(scheme.tag_name(field)))
            .collect();

        let replies = self.send_all(commands).await?;

        let mut accumulator = self.extractor.artist_accumulator();
        for reply in &replies {
            accumulator.add_tags(&reply.tags);
        }
        let artists = accumulator.finish();
        log::debug!("[Library] Listed {} artist(s)", artists.len());
        Ok(artists)
    }

    /// Lists the albums `artist` appears on under any role and any known spelling.
    ///
    /// `find` matches exactly, so it is only used with recorded spellings.
    /// Without any, the canonical name goes through the case-insensitive
    /// `search` and only tracks crediting `artist` are kept.
    pub async fn albums_by_artist(&self, artist: &Identity) -> CadenzaResult<Vec<AlbumInfo>> {
        artist.expect_kind(EntityKind::Artist)?;

        let mut spellings = self.extractor.aliases().aliases_of(artist);
        let verb = if spellings.is_empty() {
            spellings.push(artist.value().to_string());
            CMD_SEARCH
        } else {
            CMD_FIND
        };

        let scheme = self.extractor.scheme();
        let fields = scheme.artist_enumeration_fields();
        let commands = spellings
            .iter()
            .flat_map(|spelling| {
                fields.iter().map(move |&field| {
                    Command::new(verb)
                        .arg(scheme.tag_name(field))
                        .arg(spelling.as_str())
                })
            })
            .collect::<Vec<_>>();
        log::debug!(
            "[Library] Looking up {} via {} under {} spelling(s), {} queries",
            artist,
            verb,
            spellings.len(),
            commands.len()
        );

        let replies = self.send_all(commands).await?;
        let tags: Vec<Tag> = replies.into_iter().flat_map(Response::into_tags).collect();
        let mut tracks = extract_tracks(&self.extractor, tags);
        if verb == CMD_SEARCH {
            // Substring matches of other artists
            tracks.retain(|track| track.credits.iter().any(|credit| &credit.id == artist));
        }
        Ok(consolidate_albums(tracks))
    }

    /// Loads one album with all of its tracks.
    ///
    /// # Errors
    /// `InvalidFormat` for an undecodable identity, `NotFound` if no track
    /// of the server reduces to this album.
    pub async fn album(&self, album: &Identity) -> CadenzaResult<AlbumInfo> {
        let (title, album_artists) = album.decode_album()?;

        let mut command = Command::new(CMD_FIND)
            .arg(self.extractor.scheme().tag_name(TagField::Album))
            .arg(title.as_str());
        for artist in &album_artists {
            // Filters must use a spelling the server indexed
            if let Some(spelling) = self.extractor.aliases().aliases_of(artist).into_iter().next() {
                command = command
                    .arg(self.extractor.scheme().tag_name(TagField::AlbumArtist))
                    .arg(spelling);
            }
        }

        let reply = self.executor.send(command).await?;
        consolidate_albums(extract_tracks(&self.extractor, reply.tags))
            .into_iter()
            .find(|candidate| &candidate.id == album)
            .ok_or_else(|| CadenzaError::NotFound(format!("album {title}")))
    }

    /// Lists every album of the database with its tracks.
    pub async fn list_albums(&self) -> CadenzaResult<Vec<AlbumInfo>> {
        let reply = self.executor.send(Command::new(CMD_LIST_ALL_INFO)).await?;
        let albums = consolidate_albums(extract_tracks(&self.extractor, reply.tags));
        log::debug!("[Library] Listed {} album(s)", albums.len());
        Ok(albums)
    }

    /// Searches every tag for `query`, ignoring case.
    pub async fn search(&self, query: &str) -> CadenzaResult<Vec<TrackInfo>> {
        let reply = self
            .executor
            .send(Command::new(CMD_SEARCH).arg("any").arg(query))
            .await?;
        Ok(extract_tracks(&self.extractor, reply.tags))
    }

    /// Starts a database update of `path` (everything when `None`).
    ///
    /// Returns the server's update job id.
    pub async fn update_library(&self, path: Option<&str>) -> CadenzaResult<u32> {
        let reply = self
            .executor
            .send(Command::new(CMD_UPDATE).arg_opt(path))
            .await?;
        reply.parse(UPDATE_JOB_KEY).ok_or_else(|| {
            CadenzaError::Protocol(format!("{CMD_UPDATE} reply without {UPDATE_JOB_KEY}"))
        })
    }

    /// Sends `commands` concurrently and keeps the successful replies.
    ///
    /// Failures are logged and skipped. If every command failed, the first
    /// error is returned.
    async fn send_all(&self, commands: Vec<Command>) -> CadenzaResult<Vec<Response>> {
        if commands.is_empty() {
            return Ok(Vec::new());
        }

        let futures = commands.into_iter().map(|command| {
            let executor = Arc::clone(&self.executor);
            async move {
                let line = command.to_string();
                executor.send(command).await.map_err(|e| (line, e))
            }
        });
        let results = join_all(futures).await;

        let mut replies = Vec::with_capacity(results.len());
        let mut first_error = None;
        for result in results {
            match result {
                Ok(reply) => replies.push(reply),
                Err((line, e)) => {
                    log::warn!("[Library] Skipping failed query `{}`: {}", line, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if replies.is_empty() => Err(e),
            _ => Ok(replies),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{ArtistAliasTable, ArtistRoles};
    use crate::services::fake::FakeExecutor;
    use crate::test_support::{ack, reply};

    fn service(executor: FakeExecutor) -> (Arc<FakeExecutor>, LibraryService) {
        let executor = Arc::new(executor);
        let service = LibraryService::new(
            executor.clone(),
            DomainExtractor::standard(Arc::new(ArtistAliasTable::new())),
        );
        (executor, service)
    }

    fn song(file: &str, album: &str, album_artist: &str) -> Vec<(&'static str, String)> {
        vec![
            ("file", file.to_string()),
            ("Title", format!("{file} title")),
            ("Album", album.to_string()),
            ("AlbumArtist", album_artist.to_string()),
        ]
    }

    fn reply_of(songs: &[Vec<(&'static str, String)>]) -> Response {
        Response {
            tags: songs
                .iter()
                .flatten()
                .map(|(n, v)| Tag::new(*n, v.as_str()))
                .collect(),
            binary: None,
        }
    }

    #[tokio::test]
    async fn list_artists_merges_roles_across_enumerations() {
        let (executor, service) = service(FakeExecutor::new(|command| {
            match command.arguments().first().map(String::as_str) {
                Some("Artist") => Ok(reply(&[("Artist", "Bach"), ("Artist", "Glenn Gould")])),
                Some("Composer") => Ok(reply(&[("Composer", "bach")])),
                Some("Conductor") => Err(ack(50, "list", "no such tag")),
                _ => Ok(Response::default()),
            }
        }));

        let artists = service.list_artists().await.unwrap();

        assert_eq!(executor.sent().len(), 6);
        assert_eq!(artists.len(), 2);
        assert_eq!(artists[0].name, "Bach");
        assert!(artists[0].roles.contains(ArtistRoles::COMPOSER));
        assert!(artists[0].roles.contains(ArtistRoles::ARTIST));
        assert_eq!(artists[1].name, "Glenn Gould");
    }

    #[tokio::test]
    async fn list_artists_fails_when_every_enumeration_fails() {
        let (_, service) = service(FakeExecutor::new(|_| Err(CadenzaError::NotConnected)));
        assert!(matches!(
            service.list_artists().await,
            Err(CadenzaError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn albums_by_artist_queries_every_spelling_and_role() {
        let (executor, service) = service(FakeExecutor::new(|command| {
            let args = command.arguments();
            match (args[0].as_str(), args[1].as_str()) {
                ("AlbumArtist", "Leonard Bernstein") => {
                    Ok(reply_of(&[song("a/1.flac", "Mass", "Leonard Bernstein")]))
                }
                ("Conductor", "LEONARD BERNSTEIN") => Ok(reply_of(&[
                    song("b/1.flac", "Candide", "Leonard Bernstein"),
                    song("b/2.flac", "Candide", "Leonard Bernstein"),
                ])),
                // Same song reported by a second role query
                ("Artist", "Leonard Bernstein") => {
                    Ok(reply_of(&[song("a/1.flac", "Mass", "Leonard Bernstein")]))
                }
                _ => Ok(Response::default()),
            }
        }));
        let artist = Identity::artist("Leonard Bernstein");
        service.extractor().aliases().record(&artist, "Leonard Bernstein");
        service.extractor().aliases().record(&artist, "LEONARD BERNSTEIN");

        let albums = service.albums_by_artist(&artist).await.unwrap();

        let sent = executor.sent();
        assert_eq!(sent.len(), 12);
        assert!(sent.contains(&"find Conductor \"LEONARD BERNSTEIN\"".to_string()));
        assert!(sent.contains(&"find AlbumArtist \"Leonard Bernstein\"".to_string()));

        let mut titles: Vec<_> = albums.iter().map(|a| a.title.as_str()).collect();
        titles.sort_unstable();
        assert_eq!(titles, vec!["Candide", "Mass"]);
        let mass = albums.iter().find(|a| a.title == "Mass").unwrap();
        assert_eq!(mass.tracks.len(), 1);
        let candide = albums.iter().find(|a| a.title == "Candide").unwrap();
        assert_eq!(candide.tracks.len(), 2);
    }

    #[tokio::test]
    async fn albums_by_artist_without_spellings_searches_ignoring_case() {
        let (executor, service) = service(FakeExecutor::new(|command| {
            let args = command.arguments();
            match (command.name(), args[0].as_str()) {
                ("search", "AlbumArtist") => Ok(reply_of(&[
                    song("n/1.flac", "Pastel Blues", "Nina Simone"),
                    song("t/1.flac", "Homage", "Nina Simone Tribute Band"),
                ])),
                _ => Ok(Response::default()),
            }
        }));

        let albums = service
            .albums_by_artist(&Identity::artist("Nina Simone"))
            .await
            .unwrap();

        assert_eq!(albums.len(), 1);
        assert_eq!(albums[0].title, "Pastel Blues");
        let sent = executor.sent();
        assert!(sent.contains(&"search AlbumArtist \"nina simone\"".to_string()));
        assert!(sent.iter().all(|line| line.starts_with("search ")));
    }

    #[tokio::test]
    async fn albums_by_artist_skips_failed_lookups() {
        let (_, service) = service(FakeExecutor::new(|command| {
            if command.arguments()[0] == "Composer" {
                Err(CadenzaError::Network("reset".into()))
            } else if command.arguments()[0] == "AlbumArtist" {
                Ok(reply_of(&[song("x.flac", "Blue", "Joni Mitchell")]))
            } else {
                Ok(Response::default())
            }
        }));
        let albums = service
            .albums_by_artist(&Identity::artist("Joni Mitchell"))
            .await
            .unwrap();
        assert_eq!(albums.len(), 1);
        assert_eq!(albums[0].title, "Blue");
    }

    #[tokio::test]
    async fn albums_by_artist_rejects_other_kinds() {
        let (_, service) = service(FakeExecutor::new(|_| Ok(Response::default())));
        assert!(matches!(
            service.albums_by_artist(&Identity::track("a.flac")).await,
            Err(CadenzaError::InvalidFormat(_))
        ));
    }

    #[tokio::test]
    async fn album_filters_by_title_and_known_spelling() {
        let (executor, service) = service(FakeExecutor::new(|_| {
            Ok(reply_of(&[
                song("1.flac", "Blue", "Joni Mitchell"),
                song("2.flac", "Blue", "Joni Mitchell"),
                song("3.flac", "Blue", "Someone Else"),
            ]))
        }));
        let artist = Identity::artist("Joni Mitchell");
        service.extractor().aliases().record(&artist, "Joni Mitchell");
        let id = Identity::album("Blue", &[artist]);

        let album = service.album(&id).await.unwrap();

        assert_eq!(album.id, id);
        assert_eq!(album.tracks.len(), 2);
        assert_eq!(
            executor.sent(),
            vec!["find Album Blue AlbumArtist \"Joni Mitchell\"".to_string()]
        );
    }

    #[tokio::test]
    async fn missing_album_is_not_found() {
        let (_, service) = service(FakeExecutor::new(|_| Ok(Response::default())));
        let id = Identity::album("Nothing", &[Identity::artist("Nobody")]);
        assert!(matches!(
            service.album(&id).await,
            Err(CadenzaError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn malformed_album_identity_is_invalid_format() {
        let (_, service) = service(FakeExecutor::new(|_| Ok(Response::default())));
        let id = Identity::new(EntityKind::Album, "***");
        assert!(matches!(
            service.album(&id).await,
            Err(CadenzaError::InvalidFormat(_))
        ));
    }

    #[tokio::test]
    async fn list_albums_ignores_directories() {
        let (_, service) = service(FakeExecutor::new(|_| {
            let mut tags = vec![Tag::new("directory", "a")];
            tags.extend(reply_of(&[song("a/1.flac", "One", "X")]).tags);
            tags.push(Tag::new("directory", "b"));
            tags.extend(reply_of(&[song("b/1.flac", "Two", "Y")]).tags);
            Ok(Response { tags, binary: None })
        }));

        let albums = service.list_albums().await.unwrap();
        assert_eq!(albums.len(), 2);
        assert!(albums.iter().all(|a| a.tracks.len() == 1));
    }

    #[tokio::test]
    async fn search_returns_tracks() {
        let (executor, service) = service(FakeExecutor::new(|_| {
            Ok(reply_of(&[song("1.flac", "A", "X"), song("2.flac", "B", "Y")]))
        }));
        let tracks = service.search("blue").await.unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(executor.sent(), vec!["search any blue".to_string()]);
    }

    #[tokio::test]
    async fn update_returns_job_id() {
        let (executor, service) =
            service(FakeExecutor::new(|_| Ok(reply(&[("updating_db", "7")]))));
        assert_eq!(service.update_library(Some("jazz")).await.unwrap(), 7);
        assert_eq!(service.update_library(None).await.unwrap(), 7);
        assert_eq!(
            executor.sent(),
            vec!["update jazz".to_string(), "update".to_string()]
        );
    }
}

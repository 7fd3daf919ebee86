//! Track resolution against a release catalog, with an LLM fallback and a
//! graceful degradation to local tags. Unlike movies and shows a music
//! file always yields a path once it has any tags at all.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::{Provenance, TrackIdentity};
use crate::pipeline::{describe_error, Corrector, MusicCatalog, Resolution, SkipReason};
use crate::providers::musicbrainz::{release_query, ReleaseCandidate, ReleaseTrack};
use crate::tags::AudioTags;

/// Minimum provider score when the query came from local tags.
const LOCAL_TAGS_MIN_SCORE: u32 = 70;
/// Lower bar for LLM-derived queries, which are inherently less certain.
const LLM_MIN_SCORE: u32 = 65;

const SEARCH_LIMIT: u32 = 5;

/// Album labels that name no real release and should be replaced when the
/// artist and title are recognizable.
static RE_GENERIC_ALBUM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(misc|various artists|unknown|greatest hits|compilation)$").unwrap()
});

pub struct MusicPipeline<'a> {
    pub catalog: Option<&'a dyn MusicCatalog>,
    pub corrector: Option<&'a dyn Corrector>,
    /// Render full error chains instead of one-line causes.
    pub debug: bool,
}

impl MusicPipeline<'_> {
    /// Resolve one audio file to a canonical artist/album/track.
    pub async fn resolve(
        &self,
        filename: &str,
        tags: Option<&AudioTags>,
    ) -> Resolution<TrackIdentity> {
        let Some(tags) = tags.filter(|t| !t.is_empty()) else {
            return Resolution::Skipped(SkipReason::NoUsableTags);
        };

        if let Some(catalog) = self.catalog {
            if let Some(identity) = self.match_from_local_tags(catalog, tags).await {
                return Resolution::Resolved {
                    identity,
                    provenance: Provenance::Authoritative,
                };
            }

            if let Some(corrector) = self.corrector {
                match self
                    .match_from_llm(catalog, corrector, filename, tags)
                    .await
                {
                    Ok(Some(identity)) => {
                        return Resolution::Resolved {
                            identity,
                            provenance: Provenance::Authoritative,
                        };
                    }
                    Ok(None) => {}
                    Err(e) => {
                        // Music degrades to tag-derived naming instead of
                        // skipping; the local tags are still trustworthy.
                        tracing::warn!(
                            "LLM music correction failed: {}",
                            describe_error(&e, self.debug)
                        );
                    }
                }
            }
        }

        Resolution::Resolved {
            identity: identity_from_tags(filename, tags),
            provenance: Provenance::EmbeddedTags,
        }
    }

    /// Stage 2: release search seeded by the local album tag.
    async fn match_from_local_tags(
        &self,
        catalog: &dyn MusicCatalog,
        tags: &AudioTags,
    ) -> Option<TrackIdentity> {
        let album = tags.album.as_deref()?;
        let artist = tags.album_artist.as_deref().or(tags.artist.as_deref());
        let query = release_query(album, artist, tags.year);

        self.search_and_match(
            catalog,
            &query,
            LOCAL_TAGS_MIN_SCORE,
            tags.title.as_deref(),
            None,
            tags.track_number,
        )
        .await
    }

    /// Stage 3: LLM-corrected query at the lower threshold.
    async fn match_from_llm(
        &self,
        catalog: &dyn MusicCatalog,
        corrector: &dyn Corrector,
        filename: &str,
        tags: &AudioTags,
    ) -> anyhow::Result<Option<TrackIdentity>> {
        let suggestion = corrector
            .correct_music(
                filename,
                tags.artist.as_deref(),
                tags.album.as_deref(),
                tags.title.as_deref(),
            )
            .await?;

        let artist = suggestion
            .artist
            .as_deref()
            .or(tags.album_artist.as_deref())
            .or(tags.artist.as_deref());

        // Query construction prefers the explicit album field; a title-only
        // suggestion still searches at the release level, imprecise as that
        // is, because local tags gave us nothing better.
        let query = if let Some(album) = suggestion.album.as_deref() {
            release_query(album, artist, suggestion.year)
        } else if let Some(title) = suggestion.title.as_deref() {
            release_query(title, artist, suggestion.year)
        } else if let Some(album) = tags.album.as_deref().filter(|a| !is_generic_album(a)) {
            release_query(album, artist, suggestion.year.or(tags.year))
        } else {
            return Ok(None);
        };

        let track_number = suggestion.track_number.or(tags.track_number);
        Ok(self
            .search_and_match(
                catalog,
                &query,
                LLM_MIN_SCORE,
                suggestion.title.as_deref(),
                tags.title.as_deref(),
                track_number,
            )
            .await)
    }

    /// Search releases, filter by score, and run two-pass track matching
    /// against each candidate's track list in ranked order. The first
    /// release+track pair wins.
    async fn search_and_match(
        &self,
        catalog: &dyn MusicCatalog,
        query: &str,
        min_score: u32,
        title: Option<&str>,
        fallback_title: Option<&str>,
        track_number: Option<u32>,
    ) -> Option<TrackIdentity> {
        let releases = match catalog.search_releases(query, SEARCH_LIMIT).await {
            Ok(releases) => releases,
            Err(e) => {
                tracing::warn!("Release search failed: {}", describe_error(&e, self.debug));
                return None;
            }
        };

        for release in releases.into_iter().filter(|r| r.score >= min_score) {
            let tracks = match catalog.release_tracks(&release.id).await {
                Ok(tracks) => tracks,
                Err(e) => {
                    tracing::warn!(
                        "Track list fetch failed for {}: {}",
                        release.id,
                        describe_error(&e, self.debug)
                    );
                    continue;
                }
            };

            let matched = match_track(&tracks, title, track_number)
                .or_else(|| fallback_title.and_then(|t| match_track(&tracks, Some(t), track_number)));

            if let Some(track) = matched {
                return Some(identity_from_match(&release, track));
            }
        }
        None
    }
}

/// Two-pass track matching.
///
/// Pass 1 needs a track number: equal numbers match outright when either
/// title is missing, and need an exact (case-insensitive) title match when
/// both are present. Pass 2 matches by title alone: an exact match wins,
/// otherwise the shortest track title containing the search title is
/// accepted.
pub(crate) fn match_track<'a>(
    tracks: &'a [ReleaseTrack],
    title: Option<&str>,
    track_number: Option<u32>,
) -> Option<&'a ReleaseTrack> {
    if let Some(number) = track_number {
        let by_number = tracks.iter().filter(|t| t.number == Some(number));
        for track in by_number {
            match title {
                Some(title) if !track.title.is_empty() => {
                    if track.title.eq_ignore_ascii_case(title) {
                        return Some(track);
                    }
                }
                _ => return Some(track),
            }
        }
    }

    let title = title?;
    if let Some(exact) = tracks.iter().find(|t| t.title.eq_ignore_ascii_case(title)) {
        return Some(exact);
    }

    let title_lower = title.to_lowercase();
    tracks
        .iter()
        .filter(|t| t.title.to_lowercase().contains(&title_lower))
        .min_by_key(|t| t.title.len())
}

/// True when the album tag is a placeholder rather than a real release.
pub(crate) fn is_generic_album(album: &str) -> bool {
    RE_GENERIC_ALBUM.is_match(album.trim())
}

fn identity_from_match(release: &ReleaseCandidate, track: &ReleaseTrack) -> TrackIdentity {
    TrackIdentity {
        artist: track
            .artist
            .clone()
            .or_else(|| release.primary_artist().map(str::to_string))
            .unwrap_or_else(|| "Unknown Artist".to_string()),
        album: release.title.clone(),
        title: track.title.clone(),
        track_number: track.number,
        compilation: release.is_compilation(),
    }
}

/// Stage 4: tag-derived identity when nothing authoritative matched.
fn identity_from_tags(filename: &str, tags: &AudioTags) -> TrackIdentity {
    let stem = std::path::Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);

    TrackIdentity {
        artist: tags
            .album_artist
            .clone()
            .or_else(|| tags.artist.clone())
            .unwrap_or_else(|| "Unknown Artist".to_string()),
        album: tags.album.clone().unwrap_or_else(|| "Unknown Album".to_string()),
        title: tags.title.clone().unwrap_or_else(|| stem.to_string()),
        track_number: tags.track_number,
        compilation: false,
    }
}

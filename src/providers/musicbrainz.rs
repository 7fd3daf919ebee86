// MusicBrainz release catalog client
// API Documentation: https://musicbrainz.org/doc/MusicBrainz_API

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;

const MUSICBRAINZ_API_BASE: &str = "https://musicbrainz.org/ws/2";

// MusicBrainz rejects requests without an identifying User-Agent.
const USER_AGENT: &str = concat!("mediasort/", env!("CARGO_PKG_VERSION"));

/// MusicBrainz API client
pub struct MusicBrainzClient {
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ReleaseSearchResults {
    #[serde(default)]
    releases: Vec<ReleaseResult>,
}

#[derive(Debug, Deserialize)]
struct ReleaseResult {
    id: String,
    title: String,
    #[serde(default)]
    score: u32,
    date: Option<String>,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<ArtistCredit>,
    #[serde(rename = "release-group")]
    release_group: Option<ReleaseGroup>,
}

#[derive(Debug, Deserialize)]
struct ArtistCredit {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ReleaseGroup {
    #[serde(rename = "primary-type")]
    primary_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReleaseLookup {
    #[serde(default)]
    media: Vec<Medium>,
}

#[derive(Debug, Deserialize)]
struct Medium {
    #[serde(default)]
    tracks: Vec<TrackResult>,
}

#[derive(Debug, Deserialize)]
struct TrackResult {
    title: String,
    position: Option<u32>,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<ArtistCredit>,
}

/// One ranked candidate from a release search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseCandidate {
    pub id: String,
    pub title: String,
    /// Provider confidence, 0-100.
    pub score: u32,
    pub year: Option<i32>,
    pub artists: Vec<String>,
    pub release_group_type: Option<String>,
}

impl ReleaseCandidate {
    pub fn primary_artist(&self) -> Option<&str> {
        self.artists.first().map(String::as_str)
    }

    /// Compilations are routed under a "Various Artists" folder.
    pub fn is_compilation(&self) -> bool {
        self.release_group_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("compilation"))
            || self
                .artists
                .iter()
                .any(|a| a.eq_ignore_ascii_case("various artists"))
    }
}

/// One track from a release's media listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTrack {
    pub title: String,
    pub number: Option<u32>,
    pub artist: Option<String>,
}

impl MusicBrainzClient {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Search releases with a Lucene query string, ranked by the provider's
    /// confidence score.
    pub async fn search_releases(&self, query: &str, limit: u32) -> Result<Vec<ReleaseCandidate>> {
        let url = format!(
            "{}/release?query={}&limit={}&fmt=json",
            MUSICBRAINZ_API_BASE,
            urlencoding::encode(query),
            limit
        );

        let response: ReleaseSearchResults = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to search MusicBrainz releases")?
            .json()
            .await
            .context("Failed to parse MusicBrainz release search response")?;

        Ok(response
            .releases
            .into_iter()
            .map(|r| ReleaseCandidate {
                id: r.id,
                title: r.title,
                score: r.score,
                year: r
                    .date
                    .as_deref()
                    .and_then(|d| d.split('-').next())
                    .and_then(|y| y.parse().ok()),
                artists: r.artist_credit.into_iter().map(|a| a.name).collect(),
                release_group_type: r.release_group.and_then(|g| g.primary_type),
            })
            .collect())
    }

    /// Fetch the full track list for a release.
    pub async fn release_tracks(&self, release_id: &str) -> Result<Vec<ReleaseTrack>> {
        let url = format!(
            "{}/release/{}?inc=recordings+artist-credits&fmt=json",
            MUSICBRAINZ_API_BASE, release_id
        );

        let response: ReleaseLookup = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to look up MusicBrainz release")?
            .json()
            .await
            .context("Failed to parse MusicBrainz release lookup response")?;

        Ok(response
            .media
            .into_iter()
            .flat_map(|m| m.tracks)
            .map(|t| ReleaseTrack {
                title: t.title,
                number: t.position,
                artist: t.artist_credit.into_iter().next().map(|a| a.name),
            })
            .collect())
    }
}

impl Default for MusicBrainzClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a Lucene release query from whatever fields are known.
pub fn release_query(album: &str, artist: Option<&str>, year: Option<i32>) -> String {
    let mut query = format!("release:\"{}\"", album.replace('"', ""));
    if let Some(artist) = artist {
        query.push_str(&format!(" AND artist:\"{}\"", artist.replace('"', "")));
    }
    if let Some(year) = year {
        query.push_str(&format!(" AND date:{}", year));
    }
    query
}

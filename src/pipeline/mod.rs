//! Identity resolution pipelines.
//!
//! Each media kind has its own pipeline that chains local parsing,
//! authoritative lookups, and an LLM corrector into a final identity, with
//! explicit precedence rules for which source wins. Providers sit behind
//! traits so tests can drive the pipelines with scripted responders.

pub mod movie;
pub mod music;
pub mod show;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::models::Provenance;
use crate::providers::llm::{LlmClient, MovieSuggestion, MusicSuggestion, ShowSuggestion};
use crate::providers::musicbrainz::{MusicBrainzClient, ReleaseCandidate, ReleaseTrack};
use crate::providers::tmdb::{EpisodeEntry, MovieMatch, ShowMatch, TmdbClient};

/// Final state of one file's resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    Resolved { identity: T, provenance: Provenance },
    Skipped(SkipReason),
}

/// Why a file was left in place. Carried into the run summary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    /// The filename yielded no usable title or episode numbers.
    #[error("could not parse filename")]
    Unparsed,
    /// A music file with no embedded tags at all.
    #[error("no usable embedded tags")]
    NoUsableTags,
    /// The LLM corrector failed; an unconfirmed guess is worse than no
    /// action, so the file is never renamed from the raw parse here.
    #[error("LLM correction failed: {0}")]
    LlmFailed(String),
    /// Every resolution stage came up empty.
    #[error("no resolution stage produced an identity")]
    NothingResolved,
    /// Sanitization removed every character from a path segment.
    #[error("name was empty after sanitization")]
    EmptyAfterSanitize,
    /// 100 duplicate-suffix probes were exhausted.
    #[error("too many duplicates at target path")]
    CollisionExhausted,
    #[error("move failed: {0}")]
    MoveFailed(String),
}

/// One-line cause by default; the full context chain when debug output is
/// enabled.
pub fn describe_error(e: &anyhow::Error, debug: bool) -> String {
    if debug {
        format!("{e:#}")
    } else {
        e.to_string()
    }
}

/// Authoritative movie lookup.
#[async_trait]
pub trait MovieLookup: Send + Sync {
    async fn search_movie(&self, title: &str, year: Option<i32>) -> Result<Option<MovieMatch>>;
}

/// Authoritative series lookup plus per-season episode lists.
#[async_trait]
pub trait ShowLookup: Send + Sync {
    async fn search_show(&self, name: &str, year: Option<i32>) -> Result<Option<ShowMatch>>;
    async fn season_episodes(&self, show_id: i64, season: u32) -> Result<Vec<EpisodeEntry>>;
}

/// Authoritative music release catalog.
#[async_trait]
pub trait MusicCatalog: Send + Sync {
    async fn search_releases(&self, query: &str, limit: u32) -> Result<Vec<ReleaseCandidate>>;
    async fn release_tracks(&self, release_id: &str) -> Result<Vec<ReleaseTrack>>;
}

/// LLM corrector for names no authoritative lookup could resolve.
#[async_trait]
pub trait Corrector: Send + Sync {
    async fn correct_movie(
        &self,
        filename: &str,
        hint_title: &str,
        hint_year: Option<i32>,
    ) -> Result<MovieSuggestion>;

    async fn correct_show(
        &self,
        filename: &str,
        hint_title: &str,
        hint_year: Option<i32>,
    ) -> Result<ShowSuggestion>;

    async fn correct_music(
        &self,
        filename: &str,
        artist: Option<&str>,
        album: Option<&str>,
        title: Option<&str>,
    ) -> Result<MusicSuggestion>;
}

#[async_trait]
impl MovieLookup for TmdbClient {
    async fn search_movie(&self, title: &str, year: Option<i32>) -> Result<Option<MovieMatch>> {
        TmdbClient::search_movie(self, title, year).await
    }
}

#[async_trait]
impl ShowLookup for TmdbClient {
    async fn search_show(&self, name: &str, year: Option<i32>) -> Result<Option<ShowMatch>> {
        TmdbClient::search_show(self, name, year).await
    }

    async fn season_episodes(&self, show_id: i64, season: u32) -> Result<Vec<EpisodeEntry>> {
        TmdbClient::season_episodes(self, show_id, season).await
    }
}

#[async_trait]
impl MusicCatalog for MusicBrainzClient {
    async fn search_releases(&self, query: &str, limit: u32) -> Result<Vec<ReleaseCandidate>> {
        MusicBrainzClient::search_releases(self, query, limit).await
    }

    async fn release_tracks(&self, release_id: &str) -> Result<Vec<ReleaseTrack>> {
        MusicBrainzClient::release_tracks(self, release_id).await
    }
}


#[async_trait]
impl Corrector for LlmClient {
    async fn correct_movie(
        &self,
        filename: &str,
        hint_title: &str,
        hint_year: Option<i32>,
    ) -> Result<MovieSuggestion> {
        LlmClient::correct_movie(self, filename, hint_title, hint_year).await
    }

    async fn correct_show(
        &self,
        filename: &str,
        hint_title: &str,
        hint_year: Option<i32>,
    ) -> Result<ShowSuggestion> {
        LlmClient::correct_show(self, filename, hint_title, hint_year).await
    }

    async fn correct_music(
        &self,
        filename: &str,
        artist: Option<&str>,
        album: Option<&str>,
        title: Option<&str>,
    ) -> Result<MusicSuggestion> {
        LlmClient::correct_music(self, filename, artist, album, title).await
    }
}

//! Per-file records threaded through the resolution pipelines.
//!
//! Everything here is created fresh for a single input file and discarded
//! once the file has been moved or skipped; nothing persists across files
//! or runs.

use std::fmt;
use std::path::PathBuf;

/// Which kind of media a scanned file was classified as, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Movie,
    Show,
    Music,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Movie => write!(f, "movie"),
            MediaKind::Show => write!(f, "show"),
            MediaKind::Music => write!(f, "music"),
        }
    }
}

/// Where a resolved identity ultimately came from. Used for logging and for
/// deciding whether an authoritative ID is available for follow-up calls;
/// never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Filename,
    EmbeddedTags,
    Authoritative,
    LlmFallback,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Filename => write!(f, "filename"),
            Provenance::EmbeddedTags => write!(f, "embedded tags"),
            Provenance::Authoritative => write!(f, "authoritative"),
            Provenance::LlmFallback => write!(f, "llm fallback"),
        }
    }
}

/// Result of parsing a movie filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMovieInfo {
    pub title: String,
    pub year: Option<i32>,
    pub original_filename: String,
}

/// Result of parsing an episode filename.
///
/// `episode_end` holds the second number of a multi-episode marker such as
/// `S01E01-E02`; it is captured but only `episode` is used downstream, so
/// multi-episode files resolve as their first covered episode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedShowInfo {
    pub series_title: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub episode_end: Option<u32>,
    pub episode_title: Option<String>,
    pub year: Option<i32>,
    pub original_filename: String,
}

/// Canonical movie identity produced by the resolution pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieIdentity {
    pub title: String,
    pub year: Option<i32>,
}

/// Canonical episode identity produced by the resolution pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeIdentity {
    pub series_title: String,
    pub series_year: Option<i32>,
    pub season: u32,
    pub episode: u32,
    pub episode_title: Option<String>,
}

/// Canonical track identity produced by the music resolution pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackIdentity {
    pub artist: String,
    pub album: String,
    pub title: String,
    pub track_number: Option<u32>,
    /// Forces the artist folder to "Various Artists".
    pub compilation: bool,
}

/// Destination layout for one music file. Derived, never persisted;
/// recomputed per file from whichever source won.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MusicPathComponents {
    pub artist_folder: String,
    pub album_folder: String,
    pub file_name: String,
    pub full_path: PathBuf,
}

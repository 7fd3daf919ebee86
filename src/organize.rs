//! Canonical destination layout, path sanitization, and collision-safe
//! placement.
//!
//! Layouts:
//!   Movies/Title (Year)/Title (Year).ext
//!   Shows/Series/Season NN/Series - SnnEnn - Episode Title.ext
//!   Music/Artist/Album/NN - Title.ext
//! Compilations go under "Various Artists" with the track artist folded
//! into the filename.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::models::{EpisodeIdentity, MovieIdentity, MusicPathComponents, TrackIdentity};
use crate::pipeline::SkipReason;

/// Duplicate-suffix probes before giving up on a target.
const MAX_DUP_PROBES: u32 = 100;

const FORBIDDEN: &[char] = &['/', '?', '%', '*', ':', '|', '"', '<', '>', '.'];

/// Where a file should go, or that it is already there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    AlreadyInPlace,
    MoveTo(PathBuf),
}

/// Strip filesystem-hostile characters from one path segment. A segment
/// with nothing left is a hard error for the file.
pub fn sanitize(segment: &str) -> Result<String, SkipReason> {
    let cleaned: String = segment.chars().filter(|c| !FORBIDDEN.contains(c)).collect();
    let cleaned = cleaned.trim().to_string();
    if cleaned.is_empty() {
        return Err(SkipReason::EmptyAfterSanitize);
    }
    Ok(cleaned)
}

/// `Movies/Title (Year)/Title (Year).ext`
pub fn movie_path(
    library_root: &Path,
    identity: &MovieIdentity,
    extension: &str,
) -> Result<PathBuf, SkipReason> {
    let folder = match identity.year {
        Some(year) => sanitize(&format!("{} ({})", identity.title, year))?,
        None => sanitize(&identity.title)?,
    };
    Ok(library_root
        .join("Movies")
        .join(&folder)
        .join(with_extension(&folder, extension)))
}

/// `Shows/Series/Season NN/Series - SnnEnn - Episode Title.ext`
pub fn show_path(
    library_root: &Path,
    identity: &EpisodeIdentity,
    extension: &str,
) -> Result<PathBuf, SkipReason> {
    let series = sanitize(&identity.series_title)?;
    let mut file_name = format!(
        "{} - S{:02}E{:02}",
        series, identity.season, identity.episode
    );
    if let Some(title) = &identity.episode_title {
        file_name.push_str(&format!(" - {}", title));
    }
    let file_name = sanitize(&file_name)?;

    Ok(library_root
        .join("Shows")
        .join(&series)
        .join(format!("Season {:02}", identity.season))
        .join(with_extension(&file_name, extension)))
}

/// `Music/Artist/Album/NN - Title.ext`, with compilations forced under
/// "Various Artists" and the track artist folded into the filename.
pub fn music_path(
    library_root: &Path,
    identity: &TrackIdentity,
    extension: &str,
) -> Result<MusicPathComponents, SkipReason> {
    let artist_folder = if identity.compilation {
        "Various Artists".to_string()
    } else {
        sanitize(&identity.artist)?
    };
    let album_folder = sanitize(&identity.album)?;

    let track_artist_differs =
        identity.compilation && !identity.artist.eq_ignore_ascii_case("Various Artists");

    let mut parts = Vec::new();
    if let Some(number) = identity.track_number {
        parts.push(format!("{:02}", number));
    }
    if track_artist_differs {
        parts.push(identity.artist.clone());
    }
    parts.push(identity.title.clone());
    let file_name = sanitize(&parts.join(" - "))?;

    let full_path = library_root
        .join("Music")
        .join(&artist_folder)
        .join(&album_folder)
        .join(with_extension(&file_name, extension));

    Ok(MusicPathComponents {
        artist_folder,
        album_folder,
        file_name,
        full_path,
    })
}

fn with_extension(file_name: &str, extension: &str) -> String {
    if extension.is_empty() {
        file_name.to_string()
    } else {
        format!("{}.{}", file_name, extension)
    }
}

/// Decide where a file actually lands. The canonical path is used as-is
/// when free; an occupied target is probed with `_dup_N` suffixes. A file
/// already at its canonical path is left alone.
pub fn place(canonical: &Path, current: &Path) -> Result<Placement, SkipReason> {
    if canonical == current {
        return Ok(Placement::AlreadyInPlace);
    }
    if !canonical.exists() {
        return Ok(Placement::MoveTo(canonical.to_path_buf()));
    }

    let stem = canonical
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let extension = canonical
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let parent = canonical.parent().unwrap_or_else(|| Path::new(""));

    for n in 1..=MAX_DUP_PROBES {
        let candidate = parent.join(with_extension(&format!("{}_dup_{}", stem, n), extension));
        if candidate == current {
            return Ok(Placement::AlreadyInPlace);
        }
        if !candidate.exists() {
            return Ok(Placement::MoveTo(candidate));
        }
    }

    Err(SkipReason::CollisionExhausted)
}

/// Move a file into place, creating parent directories as needed. Falls
/// back to copy+remove when rename crosses filesystems.
pub async fn move_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    match tokio::fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(_) => {
            tokio::fs::copy(src, dst)
                .await
                .with_context(|| format!("Failed to copy to {}", dst.display()))?;
            tokio::fs::remove_file(src)
                .await
                .with_context(|| format!("Failed to remove {}", src.display()))?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(title: &str, year: Option<i32>) -> MovieIdentity {
        MovieIdentity {
            title: title.to_string(),
            year,
        }
    }

    #[test]
    fn test_sanitize_strips_forbidden_chars() {
        assert_eq!(sanitize("What? The: Movie*").unwrap(), "What The Movie");
        assert_eq!(sanitize("A.B.C").unwrap(), "ABC");
    }

    #[test]
    fn test_sanitize_empty_is_error() {
        assert_eq!(sanitize("???").unwrap_err(), SkipReason::EmptyAfterSanitize);
        assert_eq!(sanitize("  ").unwrap_err(), SkipReason::EmptyAfterSanitize);
    }

    #[test]
    fn test_movie_layout() {
        let path = movie_path(Path::new("/lib"), &movie("The Matrix", Some(1999)), "mkv").unwrap();
        assert_eq!(
            path,
            Path::new("/lib/Movies/The Matrix (1999)/The Matrix (1999).mkv")
        );
    }

    #[test]
    fn test_movie_layout_without_year() {
        let path = movie_path(Path::new("/lib"), &movie("Some Film", None), "mkv").unwrap();
        assert_eq!(path, Path::new("/lib/Movies/Some Film/Some Film.mkv"));
    }

    #[test]
    fn test_show_layout() {
        let identity = EpisodeIdentity {
            series_title: "Breaking Bad".to_string(),
            series_year: Some(2008),
            season: 1,
            episode: 2,
            episode_title: Some("Cat's in the Bag...".to_string()),
        };
        let path = show_path(Path::new("/lib"), &identity, "mkv").unwrap();
        assert_eq!(
            path,
            Path::new(
                "/lib/Shows/Breaking Bad/Season 01/Breaking Bad - S01E02 - Cat's in the Bag.mkv"
            )
        );
    }

    #[test]
    fn test_music_layout() {
        let identity = TrackIdentity {
            artist: "Radiohead".to_string(),
            album: "OK Computer".to_string(),
            title: "Karma Police".to_string(),
            track_number: Some(6),
            compilation: false,
        };
        let components = music_path(Path::new("/lib"), &identity, "flac").unwrap();
        assert_eq!(
            components.full_path,
            Path::new("/lib/Music/Radiohead/OK Computer/06 - Karma Police.flac")
        );
    }

    #[test]
    fn test_compilation_routes_to_various_artists() {
        let identity = TrackIdentity {
            artist: "Radiohead".to_string(),
            album: "Now That's Music".to_string(),
            title: "Karma Police".to_string(),
            track_number: Some(3),
            compilation: true,
        };
        let components = music_path(Path::new("/lib"), &identity, "mp3").unwrap();
        assert_eq!(components.artist_folder, "Various Artists");
        assert_eq!(
            components.full_path,
            Path::new("/lib/Music/Various Artists/Now That's Music/03 - Radiohead - Karma Police.mp3")
        );
    }

    #[test]
    fn test_place_free_target() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = dir.path().join("X.mkv");
        let placement = place(&canonical, &dir.path().join("src.mkv")).unwrap();
        assert_eq!(placement, Placement::MoveTo(canonical));
    }

    #[test]
    fn test_place_already_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = dir.path().join("X.mkv");
        std::fs::write(&canonical, b"x").unwrap();
        let placement = place(&canonical, &canonical).unwrap();
        assert_eq!(placement, Placement::AlreadyInPlace);
    }

    #[test]
    fn test_collision_suffixes_increment() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = dir.path().join("X.mkv");
        let src = dir.path().join("src.mkv");

        std::fs::write(&canonical, b"x").unwrap();
        let first = place(&canonical, &src).unwrap();
        assert_eq!(first, Placement::MoveTo(dir.path().join("X_dup_1.mkv")));

        std::fs::write(dir.path().join("X_dup_1.mkv"), b"x").unwrap();
        let second = place(&canonical, &src).unwrap();
        assert_eq!(second, Placement::MoveTo(dir.path().join("X_dup_2.mkv")));
    }

    #[test]
    fn test_collision_exhaustion() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = dir.path().join("X.mkv");
        std::fs::write(&canonical, b"x").unwrap();
        for n in 1..=100 {
            std::fs::write(dir.path().join(format!("X_dup_{}.mkv", n)), b"x").unwrap();
        }

        let result = place(&canonical, &dir.path().join("src.mkv"));
        assert_eq!(result.unwrap_err(), SkipReason::CollisionExhausted);
    }
}

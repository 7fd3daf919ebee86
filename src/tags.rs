// Embedded tag extraction using ffprobe

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

/// Tags read from a video container (mkv/mp4 global metadata).
#[derive(Debug, Clone, Default)]
pub struct VideoTags {
    pub title: Option<String>,
    pub series_title: Option<String>,
    pub episode_title: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub year: Option<i32>,
}

impl VideoTags {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.series_title.is_none()
            && self.episode_title.is_none()
            && self.season.is_none()
            && self.episode.is_none()
    }
}

/// Tags read from an audio file (ID3, Vorbis comments, MP4 atoms).
#[derive(Debug, Clone, Default)]
pub struct AudioTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<i32>,
    pub track_number: Option<u32>,
    pub total_tracks: Option<u32>,
}

impl AudioTags {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.artist.is_none() && self.album.is_none()
    }
}

/// ffprobe JSON output structure
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    tags: Option<HashMap<String, String>>,
}

/// Find ffprobe binary - checks FFPROBE_PATH env var, then common locations
fn find_ffprobe() -> String {
    if let Ok(path) = std::env::var("FFPROBE_PATH") {
        return path;
    }

    let paths = [
        "/usr/bin/ffprobe",
        "/usr/local/bin/ffprobe",
        "/opt/homebrew/bin/ffprobe",
    ];

    for path in paths {
        if std::path::Path::new(path).exists() {
            return path.to_string();
        }
    }

    // Fall back to PATH lookup
    "ffprobe".to_string()
}

/// Run ffprobe and return the container-level tag map with lowercased keys.
fn probe_format_tags(path: &Path) -> Result<HashMap<String, String>> {
    let ffprobe = find_ffprobe();

    let output = Command::new(&ffprobe)
        .args(["-v", "quiet", "-print_format", "json", "-show_format"])
        .arg(path)
        .output()
        .with_context(|| {
            format!(
                "Failed to run ffprobe at '{}'. Is ffmpeg installed?",
                ffprobe
            )
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("ffprobe failed: {}", stderr);
    }

    let json_output = String::from_utf8_lossy(&output.stdout);
    let probe: FfprobeOutput =
        serde_json::from_str(&json_output).context("Failed to parse ffprobe output")?;

    let tags = probe.format.and_then(|f| f.tags).unwrap_or_default();
    Ok(tags
        .into_iter()
        .map(|(k, v)| (k.to_lowercase(), v.trim().to_string()))
        .filter(|(_, v)| !v.is_empty())
        .collect())
}

fn parse_year(value: &str) -> Option<i32> {
    // Dates come through as "2003" or "2003-05-12"; the leading 4 digits
    // are all we want.
    let digits: String = value.chars().take_while(|c| c.is_ascii_digit()).collect();
    (digits.len() == 4).then(|| digits.parse().ok()).flatten()
}

fn parse_track_number(value: &str) -> Option<(u32, Option<u32>)> {
    // "3" or "3/12"
    let mut parts = value.splitn(2, '/');
    let number = parts.next()?.trim().parse().ok()?;
    let total = parts.next().and_then(|t| t.trim().parse().ok());
    Some((number, total))
}

fn video_tags_from_map(tags: &HashMap<String, String>) -> VideoTags {
    VideoTags {
        title: tags.get("title").cloned(),
        series_title: tags.get("show").or_else(|| tags.get("series")).cloned(),
        episode_title: tags.get("episode_id").cloned(),
        season: tags.get("season_number").and_then(|v| v.parse().ok()),
        episode: tags.get("episode_sort").and_then(|v| v.parse().ok()),
        year: tags
            .get("date")
            .or_else(|| tags.get("year"))
            .and_then(|v| parse_year(v)),
    }
}

fn audio_tags_from_map(tags: &HashMap<String, String>) -> AudioTags {
    let (track_number, total_tracks) = tags
        .get("track")
        .and_then(|v| parse_track_number(v))
        .map(|(n, t)| (Some(n), t))
        .unwrap_or((None, None));

    AudioTags {
        title: tags.get("title").cloned(),
        artist: tags.get("artist").cloned(),
        album_artist: tags.get("album_artist").cloned(),
        album: tags.get("album").cloned(),
        year: tags
            .get("date")
            .or_else(|| tags.get("year"))
            .and_then(|v| parse_year(v)),
        track_number,
        total_tracks,
    }
}

/// Best-effort video tag extraction. Probe failures are logged at debug
/// level and surface as `None`; resolution then falls back to the filename.
pub async fn extract_video_tags(path: &Path) -> Option<VideoTags> {
    let path_buf = path.to_path_buf();
    let result = tokio::task::spawn_blocking(move || probe_format_tags(&path_buf)).await;

    match result {
        Ok(Ok(tags)) => {
            let video = video_tags_from_map(&tags);
            (!video.is_empty()).then_some(video)
        }
        Ok(Err(e)) => {
            tracing::debug!("No embedded tags for {}: {e:#}", path.display());
            None
        }
        Err(e) => {
            tracing::debug!("ffprobe task failed for {}: {e}", path.display());
            None
        }
    }
}

/// Best-effort audio tag extraction, same failure contract as
/// [`extract_video_tags`].
pub async fn extract_audio_tags(path: &Path) -> Option<AudioTags> {
    let path_buf = path.to_path_buf();
    let result = tokio::task::spawn_blocking(move || probe_format_tags(&path_buf)).await;

    match result {
        Ok(Ok(tags)) => {
            let audio = audio_tags_from_map(&tags);
            (!audio.is_empty()).then_some(audio)
        }
        Ok(Err(e)) => {
            tracing::debug!("No embedded tags for {}: {e:#}", path.display());
            None
        }
        Err(e) => {
            tracing::debug!("ffprobe task failed for {}: {e}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_year_from_full_date() {
        assert_eq!(parse_year("2003-05-12"), Some(2003));
        assert_eq!(parse_year("2003"), Some(2003));
        assert_eq!(parse_year("n/a"), None);
    }

    #[test]
    fn test_parse_track_number_with_total() {
        assert_eq!(parse_track_number("3/12"), Some((3, Some(12))));
        assert_eq!(parse_track_number("3"), Some((3, None)));
        assert_eq!(parse_track_number("abc"), None);
    }

    #[test]
    fn test_audio_tags_from_map() {
        let tags = audio_tags_from_map(&map(&[
            ("title", "Karma Police"),
            ("artist", "Radiohead"),
            ("album", "OK Computer"),
            ("date", "1997-06-16"),
            ("track", "6/12"),
        ]));
        assert_eq!(tags.title.as_deref(), Some("Karma Police"));
        assert_eq!(tags.artist.as_deref(), Some("Radiohead"));
        assert_eq!(tags.album.as_deref(), Some("OK Computer"));
        assert_eq!(tags.year, Some(1997));
        assert_eq!(tags.track_number, Some(6));
        assert_eq!(tags.total_tracks, Some(12));
    }

    #[test]
    fn test_video_tags_from_map() {
        let tags = video_tags_from_map(&map(&[
            ("show", "Breaking Bad"),
            ("season_number", "1"),
            ("episode_sort", "1"),
            ("title", "Pilot"),
        ]));
        assert_eq!(tags.series_title.as_deref(), Some("Breaking Bad"));
        assert_eq!(tags.season, Some(1));
        assert_eq!(tags.episode, Some(1));
        assert!(!tags.is_empty());
    }

    #[test]
    fn test_empty_map_yields_empty_tags() {
        assert!(audio_tags_from_map(&HashMap::new()).is_empty());
        assert!(video_tags_from_map(&HashMap::new()).is_empty());
    }
}

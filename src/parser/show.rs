//! Episode filename parsing: series title, season/episode numbers, and an
//! optional episode title extracted from release-style names.

use regex::{Captures, Regex};
use std::path::Path;
use std::sync::LazyLock;

use crate::models::ParsedShowInfo;
use crate::parser::trim_separators;
use crate::segmenter::{self, WordList};

/// Season/episode numbers pulled out of one marker match.
struct EpisodeMarker {
    season: Option<u32>,
    episode: u32,
    episode_end: Option<u32>,
}

type Extractor = fn(&Captures) -> Option<EpisodeMarker>;

/// Season/episode patterns in priority order; the first regex that matches
/// wins and its extractor interprets the capture groups. Adding or
/// reordering a pattern is a table change only.
static EPISODE_PATTERNS: LazyLock<Vec<(Regex, Extractor)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"(?i)\bS(\d{1,2})\s*E(\d{1,3})(?:\s*-?\s*E(\d{1,3}))?").unwrap(),
            extract_season_episode as Extractor,
        ),
        (
            Regex::new(r"(?i)\bSeason\s*(\d{1,2})\s*[-,]?\s*Episode\s*(\d{1,3})()?\b").unwrap(),
            extract_season_episode as Extractor,
        ),
        (
            Regex::new(r"(?i)\b(\d{1,2})\s*x\s*(\d{1,3})(?:\s*-\s*(\d{1,3}))?\b").unwrap(),
            extract_season_episode as Extractor,
        ),
        (
            Regex::new(r"(?i)\b(?:Episode|Part|Ep|Pt)\s*(\d{1,3})\b").unwrap(),
            extract_episode_only as Extractor,
        ),
    ]
});

/// Anything from the first of these onward is release junk, never part of
/// an episode title.
const QUALITY_TAGS: &[&str] = &[
    "1080p", "720p", "480p", "HDTV", "WEB-DL", "WEBRip", "BluRay", "x264", "x265", "AAC", "DTS",
];

static RE_TRAILING_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\(\[]?(\d{4})[\)\]]?$").unwrap());

fn extract_season_episode(caps: &Captures) -> Option<EpisodeMarker> {
    Some(EpisodeMarker {
        season: Some(caps.get(1)?.as_str().parse().ok()?),
        episode: caps.get(2)?.as_str().parse().ok()?,
        episode_end: caps.get(3).and_then(|m| m.as_str().parse().ok()),
    })
}

fn extract_episode_only(caps: &Captures) -> Option<EpisodeMarker> {
    Some(EpisodeMarker {
        season: None,
        episode: caps.get(1)?.as_str().parse().ok()?,
        episode_end: None,
    })
}

/// Parse an episode filename.
///
/// Separators are normalized up front but full segmentation is applied
/// only to the extracted series title, so marker tokens like `S01E01` stay
/// intact while matching.
pub fn parse_show(
    filename: &str,
    dictionary: Option<&WordList>,
    split_words: bool,
) -> ParsedShowInfo {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    let normalized = normalize_separators(stem);

    let mut info = ParsedShowInfo {
        original_filename: filename.to_string(),
        ..Default::default()
    };

    let matched = EPISODE_PATTERNS.iter().find_map(|(regex, extract)| {
        let caps = regex.captures(&normalized)?;
        let range = caps.get(0)?.range();
        extract(&caps).map(|marker| (range, marker))
    });

    let Some((range, marker)) = matched else {
        let title = segmenter::segment(&normalized, dictionary, split_words);
        info.series_title = (!title.is_empty()).then_some(title);
        return info;
    };

    info.season = marker.season;
    info.episode = Some(marker.episode);
    info.episode_end = marker.episode_end;

    let (title, year) = split_trailing_year(trim_separators(&normalized[..range.start]));
    if !title.is_empty() {
        info.series_title = Some(segmenter::segment(title, dictionary, split_words));
    }
    info.year = year;

    let episode_title = cut_at_quality_tag(trim_separators(&normalized[range.end..]));
    info.episode_title = (!episode_title.is_empty()).then(|| episode_title.to_string());

    if info.season.is_none() && info.episode.is_some() && info.series_title.is_some() {
        info.season = Some(1);
    }

    info
}

fn normalize_separators(raw: &str) -> String {
    let spaced = raw.replace(['.', '_'], " ");
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split a trailing `(year)` or bare year off a title candidate. A title
/// that is nothing but a year is kept whole.
fn split_trailing_year(candidate: &str) -> (&str, Option<i32>) {
    if let Some(caps) = RE_TRAILING_YEAR.captures(candidate) {
        if let (Some(m), Some(year)) = (caps.get(0), caps.get(1)) {
            let title = trim_separators(&candidate[..m.start()]);
            if !title.is_empty() {
                return (title, year.as_str().parse().ok());
            }
        }
    }
    (candidate, None)
}

/// Everything before the earliest known quality/source tag.
fn cut_at_quality_tag(text: &str) -> &str {
    let lower = text.to_lowercase();
    let cutoff = QUALITY_TAGS
        .iter()
        .filter_map(|tag| lower.find(&tag.to_lowercase()))
        .min();
    match cutoff {
        Some(pos) => trim_separators(&text[..pos]),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(name: &str) -> ParsedShowInfo {
        parse_show(name, None, false)
    }

    #[test]
    fn test_standard_marker_with_quality_cutoff() {
        let info = parse("Breaking.Bad.S01E01.Pilot.1080p.BluRay.mkv");
        assert_eq!(info.series_title.as_deref(), Some("Breaking Bad"));
        assert_eq!(info.season, Some(1));
        assert_eq!(info.episode, Some(1));
        assert_eq!(info.episode_title.as_deref(), Some("Pilot"));
    }

    #[test]
    fn test_earliest_quality_tag_wins() {
        let info = parse("Show.S02E03.The.Heist.HDTV.x264.mkv");
        assert_eq!(info.episode_title.as_deref(), Some("The Heist"));
    }

    #[test]
    fn test_multi_episode_keeps_first() {
        let info = parse("Show.S01E01-E02.mkv");
        assert_eq!(info.episode, Some(1));
        assert_eq!(info.episode_end, Some(2));
    }

    #[test]
    fn test_spelled_out_marker() {
        let info = parse("My Show Season 2 Episode 5.mkv");
        assert_eq!(info.series_title.as_deref(), Some("My Show"));
        assert_eq!(info.season, Some(2));
        assert_eq!(info.episode, Some(5));
    }

    #[test]
    fn test_numeric_cross_marker() {
        let info = parse("Show.Name.3x07.mkv");
        assert_eq!(info.series_title.as_deref(), Some("Show Name"));
        assert_eq!(info.season, Some(3));
        assert_eq!(info.episode, Some(7));
    }

    #[test]
    fn test_episode_only_defaults_season() {
        let info = parse("Firefly Episode 4.mkv");
        assert_eq!(info.series_title.as_deref(), Some("Firefly"));
        assert_eq!(info.season, Some(1));
        assert_eq!(info.episode, Some(4));
    }

    #[test]
    fn test_episode_only_without_title_keeps_season_unset() {
        let info = parse("Episode 4.mkv");
        assert_eq!(info.series_title, None);
        assert_eq!(info.season, None);
        assert_eq!(info.episode, Some(4));
    }

    #[test]
    fn test_trailing_year_split() {
        let info = parse("The.Wire.2002.S01E01.mkv");
        assert_eq!(info.series_title.as_deref(), Some("The Wire"));
        assert_eq!(info.year, Some(2002));
    }

    #[test]
    fn test_parenthesized_year_split() {
        let info = parse("The Wire (2002) S01E01.mkv");
        assert_eq!(info.series_title.as_deref(), Some("The Wire"));
        assert_eq!(info.year, Some(2002));
    }

    #[test]
    fn test_no_marker_is_title_only() {
        let info = parse("Planet.Earth.mkv");
        assert_eq!(info.series_title.as_deref(), Some("Planet Earth"));
        assert_eq!(info.season, None);
        assert_eq!(info.episode, None);
    }

    #[test]
    fn test_sxxeyy_beats_episode_word() {
        // "Part" appears in the episode title but the SxxEyy marker has
        // higher priority in the pattern table.
        let info = parse("Show.S01E02.Part.Two.mkv");
        assert_eq!(info.season, Some(1));
        assert_eq!(info.episode, Some(2));
        assert_eq!(info.episode_title.as_deref(), Some("Part Two"));
    }
}

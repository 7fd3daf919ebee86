//! Movie filename parsing: extract (title, year) from a release-style name.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::models::ParsedMovieInfo;
use crate::parser::trim_separators;
use crate::segmenter::{self, WordList};

static RE_PAREN_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\((\d{4})\)").unwrap());

/// Parse a movie filename into a title and optional year.
///
/// A parenthesized year wins outright. Otherwise every standalone 4-digit
/// run is a candidate: the last one in the string supplies the year, since
/// years tend to follow the title, while the title is everything before
/// the first candidate. `1080` immediately followed by `p` is never a
/// candidate.
pub fn parse_movie(
    filename: &str,
    dictionary: Option<&WordList>,
    split_words: bool,
) -> ParsedMovieInfo {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    let cleaned = segmenter::segment(stem, dictionary, split_words);

    if let Some(caps) = RE_PAREN_YEAR.captures(&cleaned) {
        if let (Some(m), Some(year)) = (caps.get(0), caps.get(1)) {
            let title = trim_separators(&cleaned[..m.start()]);
            if !title.is_empty() {
                return ParsedMovieInfo {
                    title: title.to_string(),
                    year: year.as_str().parse().ok(),
                    original_filename: filename.to_string(),
                };
            }
        }
    }

    let candidates = standalone_years(&cleaned);
    if let (Some(first), Some(last)) = (candidates.first(), candidates.last()) {
        let title = trim_separators(&cleaned[..first.0]);
        if !title.is_empty() {
            return ParsedMovieInfo {
                title: title.to_string(),
                year: Some(last.1),
                original_filename: filename.to_string(),
            };
        }
    }

    ParsedMovieInfo {
        title: cleaned,
        year: None,
        original_filename: filename.to_string(),
    }
}

/// Byte offsets and values of every standalone 4-digit run, in order,
/// skipping resolution markers like `1080p`.
fn standalone_years(cleaned: &str) -> Vec<(usize, i32)> {
    let bytes = cleaned.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;
    while i + 4 <= bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let mut end = i;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        let bounded_left = i == 0 || !bytes[i - 1].is_ascii_alphanumeric();
        let bounded_right = end == bytes.len() || !bytes[end].is_ascii_alphanumeric();
        let resolution = &cleaned[i..end] == "1080"
            && bytes.get(end).map(|b| b.eq_ignore_ascii_case(&b'p')) == Some(true);
        if end - i == 4 && bounded_left && bounded_right && !resolution {
            if let Ok(year) = cleaned[i..end].parse::<i32>() {
                found.push((i, year));
            }
        }
        i = end;
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(name: &str) -> ParsedMovieInfo {
        parse_movie(name, None, false)
    }

    #[test]
    fn test_parenthetical_year() {
        let info = parse("My Movie (2023).mkv");
        assert_eq!(info.title, "My Movie");
        assert_eq!(info.year, Some(2023));
    }

    #[test]
    fn test_parenthetical_wins_over_other_years() {
        let info = parse("My Movie (2023) 1994.mkv");
        assert_eq!(info.title, "My Movie");
        assert_eq!(info.year, Some(2023));
    }

    #[test]
    fn test_last_standalone_year_wins() {
        let info = parse("Movie.Title.2001.Remastered.2020.mkv");
        assert_eq!(info.title, "Movie Title");
        assert_eq!(info.year, Some(2020));
    }

    #[test]
    fn test_resolution_is_not_a_year() {
        let info = parse("Movie.Title.1080p.mkv");
        assert_eq!(info.title, "Movie Title 1080p");
        assert_eq!(info.year, None);
    }

    #[test]
    fn test_year_then_resolution() {
        let info = parse("Movie.Title.2019.1080p.mkv");
        assert_eq!(info.title, "Movie Title");
        assert_eq!(info.year, Some(2019));
    }

    #[test]
    fn test_no_year_falls_back_to_whole_name() {
        let info = parse("Some.Film.mkv");
        assert_eq!(info.title, "Some Film");
        assert_eq!(info.year, None);
    }

    #[test]
    fn test_leading_year_leaves_empty_title() {
        // A year with nothing before it cannot produce a title, so the
        // whole cleaned name is kept and the year discarded.
        let info = parse("2001.mkv");
        assert_eq!(info.title, "2001");
        assert_eq!(info.year, None);
    }

    #[test]
    fn test_original_filename_preserved() {
        let info = parse("The.Matrix.1999.mkv");
        assert_eq!(info.original_filename, "The.Matrix.1999.mkv");
        assert_eq!(info.title, "The Matrix");
        assert_eq!(info.year, Some(1999));
    }
}

//! Filename parsers for movies and episodes. Both operate on segmented
//! names and return structured parse results; resolution happens later.

pub mod movie;
pub mod show;

pub use movie::parse_movie;
pub use show::parse_show;

/// Trailing separator characters left behind once a year or episode marker
/// has been cut out of a name.
pub(crate) const TRAILING_SEPARATORS: &[char] = &[' ', '-', '.', '_', '(', '[', ','];

pub(crate) fn trim_separators(s: &str) -> &str {
    s.trim_matches(|c: char| TRAILING_SEPARATORS.contains(&c) || c == ')' || c == ']')
}

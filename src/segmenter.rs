//! Filename segmentation: turns raw release-style names into
//! word-boundary-aware strings before pattern matching.

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{LazyLock, OnceLock};

static RE_CAMEL_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z])([A-Z])").unwrap());
static RE_ACRONYM_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").unwrap());
static RE_SPACE_COLLAPSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static GLOBAL_WORDLIST: OnceLock<Option<WordList>> = OnceLock::new();

/// Dictionary used for greedy word segmentation of concatenated filename
/// blocks. Held as an explicit value so tests can supply a fixed small
/// dictionary instead of the on-disk wordlist.
#[derive(Debug, Clone)]
pub struct WordList {
    words: HashSet<String>,
    max_len: usize,
}

impl WordList {
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words: HashSet<String> = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        let max_len = words.iter().map(|w| w.chars().count()).max().unwrap_or(0);
        Self { words, max_len }
    }

    /// Load a newline-delimited wordlist file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read wordlist at {}", path.display()))?;
        Ok(Self::from_words(contents.lines()))
    }

    /// Idempotent process-global load. The wordlist is read at most once;
    /// if the resource is missing a single warning is logged and dictionary
    /// splitting stays disabled for the rest of the process.
    pub fn ensure_loaded(path: &Path) -> Option<&'static WordList> {
        GLOBAL_WORDLIST
            .get_or_init(|| match Self::load(path) {
                Ok(list) => {
                    tracing::debug!("Loaded {} dictionary words", list.words.len());
                    Some(list)
                }
                Err(e) => {
                    tracing::warn!("Word splitting disabled: {e:#}");
                    None
                }
            })
            .as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Longest dictionary match starting at `start` (char index) in the
    /// lowercased block, returning the exclusive end index.
    fn longest_match(&self, lower: &[char], start: usize) -> Option<usize> {
        let remaining = lower.len() - start;
        let upper = self.max_len.min(remaining);
        for len in (1..=upper).rev() {
            let candidate: String = lower[start..start + len].iter().collect();
            if self.words.contains(&candidate) {
                return Some(start + len);
            }
        }
        None
    }
}

/// Clean a raw filename stem into a space-separated, word-boundary-aware
/// string. Steps run in order, each on the output of the previous:
/// separator normalization, camelCase and acronym boundary splits, then
/// optional dictionary-guided greedy segmentation.
pub fn segment(raw: &str, dictionary: Option<&WordList>, split_words: bool) -> String {
    let name = raw.replace(['.', '_'], " ");
    let name = RE_CAMEL_BOUNDARY.replace_all(&name, "$1 $2");
    let name = RE_ACRONYM_BOUNDARY.replace_all(&name, "$1 $2");

    let name = match dictionary {
        Some(list) if split_words && !list.is_empty() => name
            .split_whitespace()
            .map(|block| split_block(block, list))
            .collect::<Vec<_>>()
            .join(" "),
        _ => name.into_owned(),
    };

    RE_SPACE_COLLAPSE.replace_all(&name, " ").trim().to_string()
}

/// Greedy longest-match segmentation of one whitespace-delimited block.
/// Unmatched text grows char by char until a dictionary word becomes
/// matchable again, then is emitted as-is.
fn split_block(block: &str, list: &WordList) -> String {
    let chars: Vec<char> = block.chars().collect();
    let lower: Vec<char> = chars.iter().map(|c| c.to_ascii_lowercase()).collect();

    let mut parts: Vec<String> = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if let Some(end) = list.longest_match(&lower, i) {
            parts.push(chars[i..end].iter().collect());
            i = end;
        } else {
            let start = i;
            let mut j = i + 1;
            while j < chars.len() && list.longest_match(&lower, j).is_none() {
                j += 1;
            }
            parts.push(chars[start..j].iter().collect());
            i = j;
        }
    }
    parts.join(" ")
}

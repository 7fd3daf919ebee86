//! Episode resolution: merged tag/filename seed, authoritative series
//! lookup with LLM correction, then a per-episode title fetch when an
//! authoritative series id is available.

use crate::models::{EpisodeIdentity, ParsedShowInfo, Provenance};
use crate::parser;
use crate::pipeline::{describe_error, Corrector, Resolution, ShowLookup, SkipReason};
use crate::segmenter::WordList;
use crate::tags::VideoTags;

pub struct ShowPipeline<'a> {
    pub lookup: Option<&'a dyn ShowLookup>,
    pub corrector: Option<&'a dyn Corrector>,
    pub dictionary: Option<&'a WordList>,
    pub split_words: bool,
    /// Render full error chains instead of one-line causes.
    pub debug: bool,
}

/// Working record accumulated across the stages.
struct Seed {
    series_title: String,
    year: Option<i32>,
    season: u32,
    episode: u32,
    episode_title: Option<String>,
}

impl ShowPipeline<'_> {
    /// Resolve one episode file to a canonical series/season/episode.
    pub async fn resolve(
        &self,
        filename: &str,
        tags: Option<&VideoTags>,
    ) -> Resolution<EpisodeIdentity> {
        let parsed = parser::parse_show(filename, None, false);
        let Some(seed) = merge_seed(tags, &parsed) else {
            return Resolution::Skipped(SkipReason::Unparsed);
        };

        let Some(lookup) = self.lookup else {
            return self.resolve_local_only(filename, tags);
        };

        match lookup.search_show(&seed.series_title, seed.year).await {
            Ok(Some(found)) => {
                let episode_title = self
                    .episode_title_from_provider(lookup, found.id, &seed)
                    .await;
                return Resolution::Resolved {
                    identity: EpisodeIdentity {
                        series_title: found.name,
                        series_year: found.year,
                        season: seed.season,
                        episode: seed.episode,
                        episode_title,
                    },
                    provenance: Provenance::Authoritative,
                };
            }
            Ok(None) => {
                tracing::debug!("No authoritative match for series '{}'", seed.series_title);
            }
            Err(e) => {
                tracing::warn!(
                    "Authoritative series lookup failed for '{}': {}",
                    seed.series_title,
                    describe_error(&e, self.debug)
                );
            }
        }

        let Some(corrector) = self.corrector else {
            return Resolution::Skipped(SkipReason::NothingResolved);
        };

        let suggestion = match corrector
            .correct_show(filename, &seed.series_title, seed.year)
            .await
        {
            Ok(s) => s,
            Err(e) => {
                return Resolution::Skipped(SkipReason::LlmFailed(describe_error(
                    &e, self.debug,
                )))
            }
        };

        if suggestion.series_title.trim().is_empty() {
            return Resolution::Skipped(SkipReason::NothingResolved);
        }

        match lookup
            .search_show(&suggestion.series_title, suggestion.series_year)
            .await
        {
            Ok(Some(found)) => {
                let episode_title = self
                    .episode_title_from_provider(lookup, found.id, &seed)
                    .await;
                Resolution::Resolved {
                    identity: EpisodeIdentity {
                        series_title: found.name,
                        series_year: found.year,
                        season: seed.season,
                        episode: seed.episode,
                        episode_title,
                    },
                    provenance: Provenance::Authoritative,
                }
            }
            Ok(None) | Err(_) => Resolution::Resolved {
                identity: EpisodeIdentity {
                    series_title: suggestion.series_title,
                    series_year: suggestion.series_year,
                    season: seed.season,
                    episode: seed.episode,
                    episode_title: seed.episode_title.clone(),
                },
                provenance: Provenance::LlmFallback,
            },
        }
    }

    /// One extra authoritative call for the episode title. Only possible
    /// with a confirmed series id; any failure keeps the carried title.
    async fn episode_title_from_provider(
        &self,
        lookup: &dyn ShowLookup,
        show_id: i64,
        seed: &Seed,
    ) -> Option<String> {
        match lookup.season_episodes(show_id, seed.season).await {
            Ok(episodes) => episodes
                .into_iter()
                .find(|e| e.episode_number == seed.episode)
                .map(|e| e.name)
                .or_else(|| seed.episode_title.clone()),
            Err(e) => {
                tracing::warn!(
                    "Episode list lookup failed for season {}: {}",
                    seed.season,
                    describe_error(&e, self.debug)
                );
                seed.episode_title.clone()
            }
        }
    }

    fn resolve_local_only(
        &self,
        filename: &str,
        tags: Option<&VideoTags>,
    ) -> Resolution<EpisodeIdentity> {
        let parsed = parser::parse_show(filename, self.dictionary, self.split_words);
        let Some(seed) = merge_seed(tags, &parsed) else {
            return Resolution::Skipped(SkipReason::Unparsed);
        };
        let provenance = if tags.is_some_and(|t| t.series_title.is_some()) {
            Provenance::EmbeddedTags
        } else {
            Provenance::Filename
        };
        Resolution::Resolved {
            identity: EpisodeIdentity {
                series_title: seed.series_title,
                series_year: seed.year,
                season: seed.season,
                episode: seed.episode,
                episode_title: seed.episode_title,
            },
            provenance,
        }
    }
}

/// Field-by-field merge: embedded tags win per field, filename fills the
/// gaps. The filename year is adopted only while the filename's series
/// title is still the one in use.
fn merge_seed(tags: Option<&VideoTags>, parsed: &ParsedShowInfo) -> Option<Seed> {
    let series_title = tags
        .and_then(|t| t.series_title.clone())
        .or_else(|| parsed.series_title.clone());
    let season = tags.and_then(|t| t.season).or(parsed.season);
    let episode = tags.and_then(|t| t.episode).or(parsed.episode);
    let episode_title = tags
        .and_then(|t| t.episode_title.clone())
        .or_else(|| parsed.episode_title.clone());

    let series_title = series_title?;
    let episode = episode?;

    let title_from_filename = parsed.series_title.as_deref() == Some(series_title.as_str());
    let year = title_from_filename.then_some(parsed.year).flatten();

    Some(Seed {
        series_title,
        year,
        season: season.unwrap_or(1),
        episode,
        episode_title,
    })
}

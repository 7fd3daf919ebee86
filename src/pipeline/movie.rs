//! Movie resolution: embedded tags, then an authoritative lookup, then an
//! LLM correction with an authoritative re-check.

use crate::models::{MovieIdentity, Provenance};
use crate::parser;
use crate::pipeline::{describe_error, Corrector, MovieLookup, Resolution, SkipReason};
use crate::segmenter::WordList;
use crate::tags::VideoTags;

pub struct MoviePipeline<'a> {
    pub lookup: Option<&'a dyn MovieLookup>,
    pub corrector: Option<&'a dyn Corrector>,
    pub dictionary: Option<&'a WordList>,
    pub split_words: bool,
    /// Render full error chains instead of one-line causes.
    pub debug: bool,
}

impl MoviePipeline<'_> {
    /// Resolve one movie file to a canonical (title, year).
    pub async fn resolve(
        &self,
        filename: &str,
        tags: Option<&VideoTags>,
    ) -> Resolution<MovieIdentity> {
        // Seed for the authoritative query: embedded tags win, else a
        // gentle (unsegmented) parse whose title the provider's own search
        // can tolerate.
        let (seed_title, seed_year, seed_source) = match tags.and_then(usable_title) {
            Some((title, year)) => (title, year, Provenance::EmbeddedTags),
            None => {
                let parsed = parser::parse_movie(filename, None, false);
                if parsed.title.is_empty() {
                    return Resolution::Skipped(SkipReason::Unparsed);
                }
                (parsed.title, parsed.year, Provenance::Filename)
            }
        };

        let Some(lookup) = self.lookup else {
            // No provider configured: local sources are canonical, with the
            // full segmenter applied since no search will smooth it over.
            return self.resolve_local_only(filename, tags);
        };

        match lookup.search_movie(&seed_title, seed_year).await {
            Ok(Some(found)) => {
                tracing::debug!("Movie confirmed from {seed_source} seed: {}", found.title);
                return Resolution::Resolved {
                    identity: MovieIdentity {
                        title: found.title,
                        year: found.year,
                    },
                    provenance: Provenance::Authoritative,
                };
            }
            Ok(None) => {
                tracing::debug!("No authoritative match for '{seed_title}'");
            }
            Err(e) => {
                tracing::warn!(
                    "Authoritative movie lookup failed for '{seed_title}': {}",
                    describe_error(&e, self.debug)
                );
            }
        }

        let Some(corrector) = self.corrector else {
            return Resolution::Skipped(SkipReason::NothingResolved);
        };

        let suggestion = match corrector
            .correct_movie(filename, &seed_title, seed_year)
            .await
        {
            Ok(s) => s,
            Err(e) => {
                return Resolution::Skipped(SkipReason::LlmFailed(describe_error(
                    &e, self.debug,
                )))
            }
        };

        if suggestion.title.trim().is_empty() {
            return Resolution::Skipped(SkipReason::NothingResolved);
        }

        match lookup
            .search_movie(&suggestion.title, suggestion.year)
            .await
        {
            Ok(Some(found)) => Resolution::Resolved {
                identity: MovieIdentity {
                    title: found.title,
                    year: found.year,
                },
                provenance: Provenance::Authoritative,
            },
            Ok(None) | Err(_) => Resolution::Resolved {
                identity: MovieIdentity {
                    title: suggestion.title,
                    year: suggestion.year,
                },
                provenance: Provenance::LlmFallback,
            },
        }
    }

    fn resolve_local_only(
        &self,
        filename: &str,
        tags: Option<&VideoTags>,
    ) -> Resolution<MovieIdentity> {
        if let Some((title, year)) = tags.and_then(usable_title) {
            return Resolution::Resolved {
                identity: MovieIdentity { title, year },
                provenance: Provenance::EmbeddedTags,
            };
        }

        let parsed = parser::parse_movie(filename, self.dictionary, self.split_words);
        if parsed.title.is_empty() {
            return Resolution::Skipped(SkipReason::Unparsed);
        }
        Resolution::Resolved {
            identity: MovieIdentity {
                title: parsed.title,
                year: parsed.year,
            },
            provenance: Provenance::Filename,
        }
    }
}

fn usable_title(tags: &VideoTags) -> Option<(String, Option<i32>)> {
    let title = tags.title.as_deref()?.trim();
    (!title.is_empty()).then(|| (title.to_string(), tags.year))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::{
        ChainFailingCorrector, FailingCorrector, ScriptedCorrector, ScriptedMovies,
    };
    use crate::providers::tmdb::MovieMatch;

    fn pipeline<'a>(
        lookup: Option<&'a dyn crate::pipeline::MovieLookup>,
        corrector: Option<&'a dyn Corrector>,
    ) -> MoviePipeline<'a> {
        MoviePipeline {
            lookup,
            corrector,
            dictionary: None,
            split_words: false,
            debug: false,
        }
    }

    #[tokio::test]
    async fn test_authoritative_match_wins() {
        let movies = ScriptedMovies::with_match(MovieMatch {
            id: 603,
            title: "The Matrix".to_string(),
            year: Some(1999),
        });
        let p = pipeline(Some(&movies), None);

        let resolution = p.resolve("The.Matrix.1999.mkv", None).await;
        assert_eq!(
            resolution,
            Resolution::Resolved {
                identity: MovieIdentity {
                    title: "The Matrix".to_string(),
                    year: Some(1999),
                },
                provenance: Provenance::Authoritative,
            }
        );
    }

    #[tokio::test]
    async fn test_llm_failure_skips_file() {
        // Authoritative miss plus a failing corrector must skip; the raw
        // filename parse is never used as a substitute identity here.
        let movies = ScriptedMovies::empty();
        let corrector = FailingCorrector;
        let p = pipeline(Some(&movies), Some(&corrector));

        let resolution = p.resolve("Obscure.Film.2010.mkv", None).await;
        assert!(matches!(
            resolution,
            Resolution::Skipped(SkipReason::LlmFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_skip_message_verbosity_follows_debug() {
        let movies = ScriptedMovies::empty();
        let corrector = ChainFailingCorrector;
        let mut p = pipeline(Some(&movies), Some(&corrector));

        // Default output carries the one-line cause only.
        let resolution = p.resolve("Obscure.Film.2010.mkv", None).await;
        assert_eq!(
            resolution,
            Resolution::Skipped(SkipReason::LlmFailed("LLM request failed".to_string()))
        );

        // Debug output carries the whole context chain.
        p.debug = true;
        let resolution = p.resolve("Obscure.Film.2010.mkv", None).await;
        assert_eq!(
            resolution,
            Resolution::Skipped(SkipReason::LlmFailed(
                "LLM request failed: connection refused".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_llm_fallback_when_retry_misses() {
        let movies = ScriptedMovies::empty();
        let corrector = ScriptedCorrector::movie("Obscure Film", Some(2010));
        let p = pipeline(Some(&movies), Some(&corrector));

        let resolution = p.resolve("0bscur3.F1lm.mkv", None).await;
        assert_eq!(
            resolution,
            Resolution::Resolved {
                identity: MovieIdentity {
                    title: "Obscure Film".to_string(),
                    year: Some(2010),
                },
                provenance: Provenance::LlmFallback,
            }
        );
    }

    #[tokio::test]
    async fn test_no_corrector_skips_on_miss() {
        let movies = ScriptedMovies::empty();
        let p = pipeline(Some(&movies), None);

        let resolution = p.resolve("Obscure.Film.2010.mkv", None).await;
        assert_eq!(resolution, Resolution::Skipped(SkipReason::NothingResolved));
    }

    #[tokio::test]
    async fn test_local_only_uses_filename_parse() {
        let p = pipeline(None, None);

        let resolution = p.resolve("My.Movie.2020.mkv", None).await;
        assert_eq!(
            resolution,
            Resolution::Resolved {
                identity: MovieIdentity {
                    title: "My Movie".to_string(),
                    year: Some(2020),
                },
                provenance: Provenance::Filename,
            }
        );
    }

    #[tokio::test]
    async fn test_embedded_tags_seed_preferred() {
        let movies = ScriptedMovies::recording();
        let p = pipeline(Some(&movies), None);

        let tags = VideoTags {
            title: Some("Actual Title".to_string()),
            year: Some(2001),
            ..Default::default()
        };
        let _ = p.resolve("garbled-rip.mkv", Some(&tags)).await;
        assert_eq!(
            movies.queries(),
            vec![("Actual Title".to_string(), Some(2001))]
        );
    }
}

mod config;
mod models;
mod organize;
mod parser;
mod pipeline;
mod providers;
mod scanner;
mod segmenter;
mod tags;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::models::MediaKind;
use crate::organize::Placement;
use crate::pipeline::movie::MoviePipeline;
use crate::pipeline::music::MusicPipeline;
use crate::pipeline::show::ShowPipeline;
use crate::pipeline::{describe_error, Resolution, SkipReason};
use crate::providers::llm::LlmClient;
use crate::providers::musicbrainz::MusicBrainzClient;
use crate::providers::tmdb::TmdbClient;
use crate::segmenter::WordList;

/// Sort media files into a canonical library layout
#[derive(Parser, Debug)]
#[command(name = "mediasort", version, about)]
struct Args {
    /// Directory to scan for unorganized media files
    source: PathBuf,

    /// Library root (overrides the config file)
    #[arg(short, long)]
    library: Option<PathBuf>,

    /// Apply all moves without prompting
    #[arg(short = 'y', long)]
    yes: bool,

    /// Resolve and print targets without moving anything
    #[arg(long)]
    dry_run: bool,

    /// Show full error chains instead of one-line causes
    #[arg(long)]
    debug: bool,
}

/// Interactive answer for one proposed move.
enum Answer {
    Yes,
    No,
    All,
    SkipAll,
    Quit,
}

/// What happened to one file.
#[derive(Debug, PartialEq)]
enum Outcome {
    Moved(PathBuf),
    /// Dry run: the move was planned but not performed.
    DryRun(PathBuf),
    AlreadyInPlace,
    Skipped(SkipReason),
    /// User declined this move.
    Declined,
}

struct Run<'a> {
    library_root: PathBuf,
    dictionary: Option<&'a WordList>,
    split_words: bool,
    tmdb: Option<TmdbClient>,
    musicbrainz: Option<MusicBrainzClient>,
    llm: Option<LlmClient>,
    dry_run: bool,
    debug: bool,
    confirm_all: bool,
    skip_all: bool,
    quit: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mediasort=info")),
        )
        .init();

    let args = Args::parse();
    let config = AppConfig::load();
    config.log_config();

    let library_root = args
        .library
        .or_else(|| config.library_root.clone())
        .context("No library root configured; pass --library or set library.root in config.toml")?;

    let dictionary = if config.split_words {
        WordList::ensure_loaded(&config.wordlist_path)
    } else {
        None
    };

    let mut run = Run {
        library_root,
        dictionary,
        split_words: config.split_words,
        tmdb: config.tmdb_api_key.clone().map(TmdbClient::new),
        musicbrainz: config.musicbrainz_enabled.then(MusicBrainzClient::new),
        llm: config
            .llm
            .as_ref()
            .map(|s| LlmClient::new(s.base_url.clone(), s.api_key.clone(), s.model.clone())),
        dry_run: args.dry_run,
        debug: args.debug,
        confirm_all: args.yes,
        skip_all: false,
        quit: false,
    };

    let files = scanner::scan(&args.source).await?;
    tracing::info!("Found {} media files under {}", files.len(), args.source.display());

    let mut moved = 0u32;
    let mut planned = 0u32;
    let mut skipped: Vec<(PathBuf, String)> = Vec::new();

    for file in files {
        // One bad file must never abort the run.
        let outcome = match run.process_file(&file).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let detail = describe_error(&e, run.debug);
                tracing::error!("Unexpected error for {}: {detail}", file.display());
                Outcome::Skipped(SkipReason::MoveFailed(detail))
            }
        };

        match outcome {
            Outcome::Moved(target) => {
                tracing::info!("{} -> {}", file.display(), target.display());
                moved += 1;
            }
            Outcome::DryRun(_) => {
                planned += 1;
            }
            Outcome::AlreadyInPlace => {
                tracing::debug!("Already organized: {}", file.display());
            }
            Outcome::Skipped(reason) => {
                tracing::warn!("Skipped {}: {}", file.display(), reason);
                skipped.push((file, reason.to_string()));
            }
            Outcome::Declined => {
                skipped.push((file, "declined".to_string()));
            }
        }

        if run.quit {
            tracing::info!("Stopping at user request");
            break;
        }
    }

    if args.dry_run {
        tracing::info!("Dry run: {} moves planned, {} skipped", planned, skipped.len());
    } else {
        tracing::info!("Done: {} moved, {} skipped", moved, skipped.len());
    }
    for (path, reason) in &skipped {
        tracing::info!("  skipped {} ({})", path.display(), reason);
    }

    Ok(())
}

impl Run<'_> {
    /// Resolve one file end to end: classify, resolve identity, compute the
    /// target, confirm, move.
    async fn process_file(&mut self, path: &Path) -> Result<Outcome> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .context("Non-UTF8 filename")?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();

        let (kind, target) = if scanner::is_audio_file(path) {
            let audio_tags = tags::extract_audio_tags(path).await;
            let pipeline = MusicPipeline {
                catalog: self
                    .musicbrainz
                    .as_ref()
                    .map(|c| c as &dyn pipeline::MusicCatalog),
                corrector: self.llm.as_ref().map(|c| c as &dyn pipeline::Corrector),
                debug: self.debug,
            };
            match pipeline.resolve(filename, audio_tags.as_ref()).await {
                Resolution::Resolved { identity, provenance } => {
                    tracing::info!(
                        "{}: {} / {} / {} [{}]",
                        filename,
                        identity.artist,
                        identity.album,
                        identity.title,
                        provenance
                    );
                    let components =
                        match organize::music_path(&self.library_root, &identity, &extension) {
                            Ok(c) => c,
                            Err(reason) => return Ok(Outcome::Skipped(reason)),
                        };
                    (MediaKind::Music, components.full_path)
                }
                Resolution::Skipped(reason) => return Ok(Outcome::Skipped(reason)),
            }
        } else {
            let video_tags = tags::extract_video_tags(path).await;
            if self.looks_like_episode(filename, video_tags.as_ref()) {
                let pipeline = ShowPipeline {
                    lookup: self.tmdb.as_ref().map(|c| c as &dyn pipeline::ShowLookup),
                    corrector: self.llm.as_ref().map(|c| c as &dyn pipeline::Corrector),
                    dictionary: self.dictionary,
                    split_words: self.split_words,
                    debug: self.debug,
                };
                match pipeline.resolve(filename, video_tags.as_ref()).await {
                    Resolution::Resolved { identity, provenance } => {
                        tracing::info!(
                            "{}: {} S{:02}E{:02} [{}]",
                            filename,
                            identity.series_title,
                            identity.season,
                            identity.episode,
                            provenance
                        );
                        match organize::show_path(&self.library_root, &identity, &extension) {
                            Ok(p) => (MediaKind::Show, p),
                            Err(reason) => return Ok(Outcome::Skipped(reason)),
                        }
                    }
                    Resolution::Skipped(reason) => return Ok(Outcome::Skipped(reason)),
                }
            } else {
                let pipeline = MoviePipeline {
                    lookup: self.tmdb.as_ref().map(|c| c as &dyn pipeline::MovieLookup),
                    corrector: self.llm.as_ref().map(|c| c as &dyn pipeline::Corrector),
                    dictionary: self.dictionary,
                    split_words: self.split_words,
                    debug: self.debug,
                };
                match pipeline.resolve(filename, video_tags.as_ref()).await {
                    Resolution::Resolved { identity, provenance } => {
                        tracing::info!(
                            "{}: {}{} [{}]",
                            filename,
                            identity.title,
                            identity
                                .year
                                .map(|y| format!(" ({y})"))
                                .unwrap_or_default(),
                            provenance
                        );
                        match organize::movie_path(&self.library_root, &identity, &extension) {
                            Ok(p) => (MediaKind::Movie, p),
                            Err(reason) => return Ok(Outcome::Skipped(reason)),
                        }
                    }
                    Resolution::Skipped(reason) => return Ok(Outcome::Skipped(reason)),
                }
            }
        };

        let placement = match organize::place(&target, path) {
            Ok(p) => p,
            Err(reason) => return Ok(Outcome::Skipped(reason)),
        };
        let Placement::MoveTo(target) = placement else {
            return Ok(Outcome::AlreadyInPlace);
        };

        if self.dry_run {
            tracing::info!("[dry-run] {} {} -> {}", kind, path.display(), target.display());
            return Ok(Outcome::DryRun(target));
        }

        if self.skip_all {
            return Ok(Outcome::Declined);
        }
        if !self.confirm_all && !self.apply_answer(prompt_move(path, &target)?) {
            return Ok(Outcome::Declined);
        }

        match organize::move_file(path, &target).await {
            Ok(()) => Ok(Outcome::Moved(target)),
            Err(e) => Ok(Outcome::Skipped(SkipReason::MoveFailed(describe_error(
                &e, self.debug,
            )))),
        }
    }

    /// Apply one prompt answer to the run state; returns whether the
    /// pending move still proceeds. Quit stops the run only after the
    /// current file completes, so its move is performed.
    fn apply_answer(&mut self, answer: Answer) -> bool {
        match answer {
            Answer::Yes => true,
            Answer::No => false,
            Answer::All => {
                self.confirm_all = true;
                true
            }
            Answer::SkipAll => {
                self.skip_all = true;
                false
            }
            Answer::Quit => {
                self.quit = true;
                true
            }
        }
    }

    /// A video file is treated as an episode when its tags carry series
    /// info or its filename has a season/episode marker.
    fn looks_like_episode(&self, filename: &str, video_tags: Option<&tags::VideoTags>) -> bool {
        if video_tags.is_some_and(|t| t.series_title.is_some() || t.episode.is_some()) {
            return true;
        }
        let parsed = parser::parse_show(filename, None, false);
        parsed.episode.is_some()
    }
}

/// Blocking y/n/a/s/q prompt between path computation and the move.
fn prompt_move(src: &Path, dst: &Path) -> Result<Answer> {
    loop {
        print!(
            "Move\n  {}\n  -> {}\n[y]es / [n]o / [a]ll / [s]kip all / [q]uit after this one: ",
            src.display(),
            dst.display()
        );
        std::io::stdout().flush()?;

        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .context("Failed to read from stdin")?;

        match line.trim().to_lowercase().as_str() {
            "y" | "yes" => return Ok(Answer::Yes),
            "n" | "no" => return Ok(Answer::No),
            "a" | "all" => return Ok(Answer::All),
            "s" | "skip" => return Ok(Answer::SkipAll),
            "q" | "quit" => return Ok(Answer::Quit),
            _ => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run() -> Run<'static> {
        Run {
            library_root: PathBuf::new(),
            dictionary: None,
            split_words: false,
            tmdb: None,
            musicbrainz: None,
            llm: None,
            dry_run: false,
            debug: false,
            confirm_all: false,
            skip_all: false,
            quit: false,
        }
    }

    #[test]
    fn test_quit_still_performs_pending_move() {
        let mut run = run();
        assert!(run.apply_answer(Answer::Quit));
        assert!(run.quit);
    }

    #[test]
    fn test_skip_all_declines_current_move() {
        let mut run = run();
        assert!(!run.apply_answer(Answer::SkipAll));
        assert!(run.skip_all);
    }

    #[test]
    fn test_all_confirms_current_move() {
        let mut run = run();
        assert!(run.apply_answer(Answer::All));
        assert!(run.confirm_all);
    }

    #[tokio::test]
    async fn test_dry_run_plans_without_moving() {
        let source = tempfile::tempdir().unwrap();
        let library = tempfile::tempdir().unwrap();
        let file = source.path().join("My.Movie.2020.mkv");
        std::fs::write(&file, b"x").unwrap();

        let mut run = run();
        run.library_root = library.path().to_path_buf();
        run.dry_run = true;

        let outcome = run.process_file(&file).await.unwrap();
        assert_eq!(
            outcome,
            Outcome::DryRun(
                library
                    .path()
                    .join("Movies/My Movie (2020)/My Movie (2020).mkv")
            )
        );
        assert!(file.exists());
    }
}

//! External metadata providers: TMDB for movies/shows, MusicBrainz for
//! music releases, and an OpenAI-compatible LLM used to correct names the
//! authoritative lookups cannot resolve.

pub mod llm;
pub mod musicbrainz;
pub mod tmdb;

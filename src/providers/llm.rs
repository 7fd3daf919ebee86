// LLM corrector client (OpenAI-compatible chat completions endpoint)

use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

/// Attempts beyond the first request. Failures after the last retry are
/// returned to the caller, which treats them as fatal for the file.
const MAX_RETRIES: u32 = 2;

/// Client for an OpenAI-compatible chat completions endpoint, used to
/// correct media names that authoritative lookups could not resolve.
pub struct LlmClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

/// Corrected movie identity.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MovieSuggestion {
    pub title: String,
    pub year: Option<i32>,
}

/// Corrected series identity.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ShowSuggestion {
    pub series_title: String,
    pub series_year: Option<i32>,
}

/// Corrected track identity. Fields the model could not determine are null.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct MusicSuggestion {
    pub artist: Option<String>,
    pub album: Option<String>,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub track_number: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

const MOVIE_SYSTEM_PROMPT: &str = "You identify movies from messy filenames. \
Respond with a single JSON object: {\"title\": string, \"year\": number or null}. \
No prose, no markdown.";

const SHOW_SYSTEM_PROMPT: &str = "You identify TV series from messy filenames. \
Respond with a single JSON object: {\"series_title\": string, \"series_year\": number or null}. \
No prose, no markdown.";

const MUSIC_SYSTEM_PROMPT: &str = "You identify music tracks from filenames and partial tags. \
If the album tag looks generic (misc, unknown, greatest hits, compilation, various artists) \
and you recognize the artist and title, replace it with the canonical studio album. \
Respond with a single JSON object: {\"artist\": string or null, \"album\": string or null, \
\"title\": string or null, \"year\": number or null, \"track_number\": number or null}. \
No prose, no markdown.";

impl LlmClient {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }

    /// Suggest a corrected movie identity for a filename.
    pub async fn correct_movie(
        &self,
        filename: &str,
        hint_title: &str,
        hint_year: Option<i32>,
    ) -> Result<MovieSuggestion> {
        let mut user = format!("Filename: {filename}\nBest guess title: {hint_title}");
        if let Some(year) = hint_year {
            user.push_str(&format!("\nBest guess year: {year}"));
        }
        self.complete(MOVIE_SYSTEM_PROMPT, &user).await
    }

    /// Suggest a corrected series identity for a filename.
    pub async fn correct_show(
        &self,
        filename: &str,
        hint_title: &str,
        hint_year: Option<i32>,
    ) -> Result<ShowSuggestion> {
        let mut user = format!("Filename: {filename}\nBest guess series: {hint_title}");
        if let Some(year) = hint_year {
            user.push_str(&format!("\nBest guess year: {year}"));
        }
        self.complete(SHOW_SYSTEM_PROMPT, &user).await
    }

    /// Suggest a corrected track identity from a filename and local tags.
    pub async fn correct_music(
        &self,
        filename: &str,
        artist: Option<&str>,
        album: Option<&str>,
        title: Option<&str>,
    ) -> Result<MusicSuggestion> {
        let mut user = format!("Filename: {filename}");
        if let Some(artist) = artist {
            user.push_str(&format!("\nTagged artist: {artist}"));
        }
        if let Some(album) = album {
            user.push_str(&format!("\nTagged album: {album}"));
        }
        if let Some(title) = title {
            user.push_str(&format!("\nTagged title: {title}"));
        }
        self.complete(MUSIC_SYSTEM_PROMPT, &user).await
    }

    /// One chat completion, parsed into the expected schema, with a small
    /// bounded retry. Returns an error only once every attempt has failed.
    async fn complete<T: DeserializeOwned>(&self, system: &str, user: &str) -> Result<T> {
        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                tracing::debug!("Retrying LLM call (attempt {})", attempt + 1);
            }
            match self.try_complete(system, user).await {
                Ok(value) => return Ok(value),
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow::anyhow!("LLM call failed"))
            .context(format!("LLM call failed after {} retries", MAX_RETRIES)))
    }

    async fn try_complete<T: DeserializeOwned>(&self, system: &str, user: &str) -> Result<T> {
        let body = json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to reach LLM endpoint")?;

        if !response.status().is_success() {
            anyhow::bail!("LLM endpoint returned status {}", response.status());
        }

        let chat: ChatResponse = response
            .json()
            .await
            .context("Failed to parse LLM response")?;

        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .context("LLM response contained no choices")?;

        serde_json::from_str(strip_code_fences(content))
            .with_context(|| format!("LLM output was not schema-valid: {content}"))
    }
}

/// Models sometimes wrap JSON in a markdown code fence despite instructions.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.trim_end_matches('`').trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn test_movie_suggestion_schema() {
        let s: MovieSuggestion =
            serde_json::from_str("{\"title\": \"The Matrix\", \"year\": 1999}").unwrap();
        assert_eq!(s.title, "The Matrix");
        assert_eq!(s.year, Some(1999));
    }

    #[test]
    fn test_music_suggestion_allows_nulls() {
        let s: MusicSuggestion = serde_json::from_str(
            "{\"artist\": \"Radiohead\", \"album\": null, \"title\": \"Creep\", \
             \"year\": null, \"track_number\": null}",
        )
        .unwrap();
        assert_eq!(s.artist.as_deref(), Some("Radiohead"));
        assert_eq!(s.album, None);
    }

    #[test]
    fn test_missing_required_field_is_rejected() {
        let result: Result<MovieSuggestion, _> = serde_json::from_str("{\"year\": 1999}");
        assert!(result.is_err());
    }
}

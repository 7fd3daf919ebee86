// TMDB metadata provider service
// API Documentation: https://developer.themoviedb.org/reference/intro/getting-started

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;

const TMDB_API_BASE: &str = "https://api.themoviedb.org/3";

/// TMDB API client
pub struct TmdbClient {
    client: Client,
    api_key: String,
}

/// Search result for movies
#[derive(Debug, Deserialize)]
struct MovieSearchResults {
    results: Vec<MovieSearchResult>,
}

#[derive(Debug, Deserialize)]
struct MovieSearchResult {
    id: i64,
    title: String,
    release_date: Option<String>,
}

/// Search result for TV shows
#[derive(Debug, Deserialize)]
struct TvSearchResults {
    results: Vec<TvSearchResult>,
}

#[derive(Debug, Deserialize)]
struct TvSearchResult {
    id: i64,
    name: String,
    first_air_date: Option<String>,
}

/// Season details
#[derive(Debug, Deserialize)]
struct SeasonDetails {
    episodes: Option<Vec<SeasonEpisode>>,
}

#[derive(Debug, Deserialize)]
struct SeasonEpisode {
    episode_number: u32,
    name: String,
}

/// Best movie match returned by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieMatch {
    pub id: i64,
    pub title: String,
    pub year: Option<i32>,
}

/// Best series match returned by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowMatch {
    pub id: i64,
    pub name: String,
    pub year: Option<i32>,
}

/// One episode from a season's episode list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeEntry {
    pub episode_number: u32,
    pub name: String,
}

fn year_from_date(date: Option<&str>) -> Option<i32> {
    date.and_then(|d| d.split('-').next())
        .and_then(|y| y.parse().ok())
}

impl TmdbClient {
    /// Create a new TMDB client
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }

    /// Search for a movie; the first result is taken as the match.
    pub async fn search_movie(&self, title: &str, year: Option<i32>) -> Result<Option<MovieMatch>> {
        let mut url = format!(
            "{}/search/movie?api_key={}&query={}&include_adult=false",
            TMDB_API_BASE,
            self.api_key,
            urlencoding::encode(title)
        );

        if let Some(y) = year {
            url.push_str(&format!("&year={}", y));
        }

        let response: MovieSearchResults = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to search TMDB for movies")?
            .json()
            .await
            .context("Failed to parse TMDB movie search response")?;

        Ok(response.results.into_iter().next().map(|r| MovieMatch {
            id: r.id,
            title: r.title,
            year: year_from_date(r.release_date.as_deref()),
        }))
    }

    /// Search for a TV series; the first result is taken as the match.
    pub async fn search_show(&self, name: &str, year: Option<i32>) -> Result<Option<ShowMatch>> {
        let mut url = format!(
            "{}/search/tv?api_key={}&query={}&include_adult=false",
            TMDB_API_BASE,
            self.api_key,
            urlencoding::encode(name)
        );

        if let Some(y) = year {
            url.push_str(&format!("&first_air_date_year={}", y));
        }

        let response: TvSearchResults = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to search TMDB for TV shows")?
            .json()
            .await
            .context("Failed to parse TMDB TV search response")?;

        Ok(response.results.into_iter().next().map(|r| ShowMatch {
            id: r.id,
            name: r.name,
            year: year_from_date(r.first_air_date.as_deref()),
        }))
    }

    /// Fetch the episode list for one season of a series.
    pub async fn season_episodes(&self, show_id: i64, season: u32) -> Result<Vec<EpisodeEntry>> {
        let url = format!(
            "{}/tv/{}/season/{}?api_key={}",
            TMDB_API_BASE, show_id, season, self.api_key
        );

        let response: SeasonDetails = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to get TMDB season details")?
            .json()
            .await
            .context("Failed to parse TMDB season details response")?;

        Ok(response
            .episodes
            .unwrap_or_default()
            .into_iter()
            .map(|e| EpisodeEntry {
                episode_number: e.episode_number,
                name: e.name,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_from_date() {
        assert_eq!(year_from_date(Some("1999-03-31")), Some(1999));
        assert_eq!(year_from_date(Some("1999")), Some(1999));
        assert_eq!(year_from_date(Some("")), None);
        assert_eq!(year_from_date(None), None);
    }
}

// Configuration module for mediasort
// Handles XDG-compliant config discovery and the TOML configuration file

use serde::Deserialize;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "mediasort";
const CONFIG_FILENAME: &str = "config.toml";

const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
const DEFAULT_WORDLIST: &str = "/usr/share/dict/words";

/// TOML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Library layout configuration
    pub library: LibraryConfig,

    /// Metadata provider configuration
    pub metadata: MetadataConfig,

    /// LLM corrector configuration
    pub llm: LlmConfig,

    /// Filename parsing configuration
    pub parsing: ParsingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Destination library root (Movies/, Shows/, Music/ are created here)
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// TMDB API key (optional, enables authoritative movie/show lookups)
    pub tmdb_api_key: Option<String>,

    /// Query MusicBrainz for music releases (default: true, no key needed)
    pub musicbrainz: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API key for the corrector endpoint (optional, enables LLM fallback)
    pub api_key: Option<String>,

    /// OpenAI-compatible base URL
    pub base_url: Option<String>,

    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    /// Dictionary-guided word splitting for concatenated filenames
    /// (default: true; disabled automatically when the wordlist is missing)
    pub split_words: Option<bool>,

    /// Newline-delimited wordlist used for splitting
    pub wordlist_path: Option<PathBuf>,
}

/// LLM corrector settings, present only when a key is configured.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

/// Application configuration - combines the TOML file with environment
/// overrides
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub library_root: Option<PathBuf>,
    pub tmdb_api_key: Option<String>,
    pub musicbrainz_enabled: bool,
    pub llm: Option<LlmSettings>,
    pub split_words: bool,
    pub wordlist_path: PathBuf,
}

impl AppConfig {
    /// Load configuration from the TOML file and environment.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. TOML config file
    /// 3. Default values
    pub fn load() -> Self {
        let config_dir = Self::find_config_dir();
        let config_file = Self::load_config_file(&config_dir);
        Self::build(config_file)
    }

    /// Find the config directory (for locating config.toml)
    fn find_config_dir() -> PathBuf {
        if let Ok(path) = std::env::var("MEDIASORT_CONFIG_DIR") {
            return PathBuf::from(path);
        }

        if let Some(dir) = dirs::config_dir() {
            return dir.join(APP_NAME);
        }

        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }

    /// Load and parse the TOML config file
    fn load_config_file(config_dir: &Path) -> ConfigFile {
        let config_path = config_dir.join(CONFIG_FILENAME);

        if !config_path.exists() {
            tracing::debug!(
                "No config file found at {}, using defaults",
                config_path.display()
            );
            return ConfigFile::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", config_path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse config file {}: {}. Using defaults.",
                        config_path.display(),
                        e
                    );
                    ConfigFile::default()
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to read config file {}: {}. Using defaults.",
                    config_path.display(),
                    e
                );
                ConfigFile::default()
            }
        }
    }

    /// Build configuration from the config file with environment overrides
    fn build(config_file: ConfigFile) -> Self {
        let library_root = std::env::var("MEDIASORT_LIBRARY")
            .ok()
            .map(PathBuf::from)
            .or(config_file.library.root);

        let tmdb_api_key = std::env::var("TMDB_API_KEY")
            .ok()
            .or(config_file.metadata.tmdb_api_key);

        let musicbrainz_enabled = std::env::var("MEDIASORT_MUSICBRAINZ")
            .ok()
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .or(config_file.metadata.musicbrainz)
            .unwrap_or(true);

        let llm_api_key = std::env::var("LLM_API_KEY").ok().or(config_file.llm.api_key);
        let llm = llm_api_key.map(|api_key| LlmSettings {
            api_key,
            base_url: std::env::var("LLM_BASE_URL")
                .ok()
                .or(config_file.llm.base_url)
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            model: std::env::var("LLM_MODEL")
                .ok()
                .or(config_file.llm.model)
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
        });

        let split_words = config_file.parsing.split_words.unwrap_or(true);
        let wordlist_path = std::env::var("MEDIASORT_WORDLIST")
            .ok()
            .map(PathBuf::from)
            .or(config_file.parsing.wordlist_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WORDLIST));

        Self {
            library_root,
            tmdb_api_key,
            musicbrainz_enabled,
            llm,
            split_words,
            wordlist_path,
        }
    }

    /// Log configuration status
    pub fn log_config(&self) {
        if self.tmdb_api_key.is_some() {
            tracing::info!("Movie/show lookups: TMDB");
        } else {
            tracing::info!("Movie/show lookups: disabled (local parsing only)");
            tracing::info!("Hint: add tmdb_api_key to config.toml or set TMDB_API_KEY");
        }

        if self.musicbrainz_enabled {
            tracing::info!("Music lookups: MusicBrainz");
        } else {
            tracing::info!("Music lookups: disabled (embedded tags only)");
        }

        match &self.llm {
            Some(llm) => tracing::info!("LLM corrector: {} at {}", llm.model, llm.base_url),
            None => tracing::debug!("LLM corrector: disabled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_file() {
        let config = ConfigFile::default();
        assert!(config.library.root.is_none());
        assert!(config.metadata.tmdb_api_key.is_none());
        assert!(config.llm.api_key.is_none());
        assert!(config.parsing.split_words.is_none());
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
[library]
root = "/srv/media"

[metadata]
tmdb_api_key = "test_key"
musicbrainz = false

[llm]
api_key = "sk-test"
model = "gpt-4o"

[parsing]
split_words = false
"#;
        let config: ConfigFile = toml::from_str(toml_str).unwrap();
        assert_eq!(config.library.root, Some(PathBuf::from("/srv/media")));
        assert_eq!(config.metadata.tmdb_api_key, Some("test_key".to_string()));
        assert_eq!(config.metadata.musicbrainz, Some(false));
        assert_eq!(config.llm.api_key, Some("sk-test".to_string()));
        assert_eq!(config.llm.model, Some("gpt-4o".to_string()));
        assert_eq!(config.parsing.split_words, Some(false));
    }

    #[test]
    fn test_partial_config_toml() {
        // Partial configs work (only specify what you need)
        let toml_str = r#"
[metadata]
tmdb_api_key = "abc"
"#;
        let config: ConfigFile = toml::from_str(toml_str).unwrap();
        assert_eq!(config.metadata.tmdb_api_key, Some("abc".to_string()));
        assert!(config.library.root.is_none());
    }
}

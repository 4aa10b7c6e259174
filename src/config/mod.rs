//! Configuration management

pub mod commands;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::translate::extractor::ExtractorOptions;
use crate::translate::store::{DEFAULT_CATEGORY, GlossaryStore};
use crate::translate::translator::{RetryPolicy, TranslateOptions};

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_NAME: &str = "docxlate";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub translation: TranslationConfig,

    #[serde(default)]
    pub glossary: GlossaryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Default translation backend (google, deepl)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// DeepL API key (free or pro)
    #[serde(default)]
    pub deepl_api_key: Option<String>,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "google".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            deepl_api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Default target language
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Segments per backend request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Parallel backend requests per document, and parallel documents in batch mode
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Attempts per request, first call included
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Responses longer than `input * ratio` (or `input + slack`) are rejected
    #[serde(default = "default_max_length_ratio")]
    pub max_length_ratio: f64,

    #[serde(default = "default_length_slack")]
    pub length_slack: usize,

    #[serde(default = "default_true")]
    pub use_cache: bool,

    #[serde(default = "default_true")]
    pub skip_symbol_cells: bool,
}

fn default_source_language() -> String {
    "auto".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_batch_size() -> usize {
    20
}

fn default_concurrency() -> usize {
    4
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_max_length_ratio() -> f64 {
    3.0
}

fn default_length_slack() -> usize {
    40
}

fn default_true() -> bool {
    true
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            source_language: default_source_language(),
            default_language: default_language(),
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            max_length_ratio: default_max_length_ratio(),
            length_slack: default_length_slack(),
            use_cache: true,
            skip_symbol_cells: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlossaryConfig {
    /// Glossary database; defaults to the platform data directory
    #[serde(default)]
    pub database: Option<String>,

    #[serde(default = "default_category")]
    pub category: String,

    /// Source languages matched by substring instead of whole words
    #[serde(default = "default_substring_languages")]
    pub substring_match_languages: Vec<String>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_substring_languages() -> Vec<String> {
    ["zh", "ja", "ko", "th"].iter().map(|s| s.to_string()).collect()
}

impl Default for GlossaryConfig {
    fn default() -> Self {
        Self {
            database: None,
            category: default_category(),
            substring_match_languages: default_substring_languages(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(APP_NAME))
    }

    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join(CONFIG_FILE_NAME))
    }

    /// Load config from default location
    pub fn load() -> Result<Self> {
        let path = Self::config_path().context("Could not determine config path")?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Save config to default location
    pub fn save(&self) -> Result<PathBuf> {
        let dir = Self::config_dir().context("Could not determine config directory")?;
        fs::create_dir_all(&dir).context("Failed to create config directory")?;

        let path = dir.join(CONFIG_FILE_NAME);
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, content).context("Failed to write config file")?;

        Ok(path)
    }

    /// Get API key for the specified provider
    pub fn get_api_key(&self, provider: &str) -> Option<String> {
        match provider.to_lowercase().as_str() {
            "deepl" => self
                .api
                .deepl_api_key
                .clone()
                .or_else(|| std::env::var("DEEPL_API_KEY").ok()),
            _ => None,
        }
    }

    pub fn glossary_path(&self) -> Option<PathBuf> {
        self.glossary
            .database
            .as_ref()
            .map(PathBuf::from)
            .or_else(GlossaryStore::default_path)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn translate_options(&self) -> TranslateOptions {
        let t = &self.translation;
        TranslateOptions {
            batch_size: t.batch_size.max(1),
            concurrency: t.concurrency.max(1),
            retry: RetryPolicy {
                max_attempts: t.max_retries.max(1),
                base_delay: Duration::from_millis(t.retry_base_delay_ms),
            },
            max_length_ratio: t.max_length_ratio,
            length_slack: t.length_slack,
        }
    }

    pub fn extractor_options(&self) -> ExtractorOptions {
        ExtractorOptions {
            skip_symbol_cells: self.translation.skip_symbol_cells,
        }
    }
}

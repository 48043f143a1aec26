//! Configuration management for Gazette
//!
//! Configuration is an explicit value injected into the pipeline components
//! at construction. Word-list edits produce a new value rather than mutating
//! shared state, so an in-flight run never observes a half-updated list.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Hard character budget for a composed post
pub const DEFAULT_MAX_POST_CHARS: usize = 300;

/// Default cap on candidates taken from a single source per run
pub const DEFAULT_MAX_ARTICLES_PER_SOURCE: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    /// Ordered tag rules; assignment order follows this list
    #[serde(default)]
    pub tags: Vec<TagRule>,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

/// Word lists consumed by the keyword filter engine.
///
/// All matching is case-insensitive substring matching.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub bad_words: Vec<String>,
    #[serde(default)]
    pub good_words: Vec<String>,
    #[serde(default)]
    pub super_bad_words: Vec<String>,
}

/// A topical label plus the keywords that assign it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagRule {
    pub name: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_post_chars")]
    pub max_post_chars: usize,
    #[serde(default = "default_max_articles_per_source")]
    pub max_articles_per_source: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_post_chars: DEFAULT_MAX_POST_CHARS,
            max_articles_per_source: DEFAULT_MAX_ARTICLES_PER_SOURCE,
        }
    }
}

fn default_max_post_chars() -> usize {
    DEFAULT_MAX_POST_CHARS
}

fn default_max_articles_per_source() -> usize {
    DEFAULT_MAX_ARTICLES_PER_SOURCE
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Write configuration to a specific path, creating parent directories
    pub fn save_to_path(&self, path: &PathBuf) -> Result<()> {
        let rendered = toml::to_string_pretty(self).map_err(ConfigError::SerializeError)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::WriteError)?;
        }
        std::fs::write(path, rendered).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            database: DatabaseConfig {
                path: "~/.local/share/gazette/history.db".to_string(),
            },
            filter: FilterConfig::default(),
            tags: Vec::new(),
            limits: LimitsConfig::default(),
            log_level: default_log_level(),
        }
    }

    /// Reject malformed configuration before any pipeline run is attempted
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::MissingField("database.path".to_string()).into());
        }
        if self.limits.max_post_chars == 0 {
            return Err(
                ConfigError::Malformed("limits.max_post_chars must be positive".to_string()).into(),
            );
        }
        for list in [
            &self.filter.bad_words,
            &self.filter.good_words,
            &self.filter.super_bad_words,
        ] {
            if list.iter().any(|w| w.trim().is_empty()) {
                return Err(ConfigError::Malformed(
                    "word lists must not contain empty entries".to_string(),
                )
                .into());
            }
        }
        for rule in &self.tags {
            if rule.name.trim().is_empty() {
                return Err(
                    ConfigError::Malformed("tag rule with empty name".to_string()).into(),
                );
            }
            if rule.keywords.is_empty() {
                return Err(ConfigError::Malformed(format!(
                    "tag rule '{}' has no keywords",
                    rule.name
                ))
                .into());
            }
        }
        Ok(())
    }
}

impl FilterConfig {
    /// New list value with `words` appended, skipping case-insensitive duplicates
    fn adding(list: &[String], words: &[String]) -> Vec<String> {
        let mut next = list.to_vec();
        for word in words {
            if !next.iter().any(|w| w.eq_ignore_ascii_case(word)) {
                next.push(word.clone());
            }
        }
        next
    }

    /// New list value with `words` removed case-insensitively
    fn removing(list: &[String], words: &[String]) -> Vec<String> {
        list.iter()
            .filter(|w| !words.iter().any(|r| r.eq_ignore_ascii_case(w)))
            .cloned()
            .collect()
    }

    pub fn adding_bad_words(&self, words: &[String]) -> Self {
        Self {
            bad_words: Self::adding(&self.bad_words, words),
            ..self.clone()
        }
    }

    pub fn removing_bad_words(&self, words: &[String]) -> Self {
        Self {
            bad_words: Self::removing(&self.bad_words, words),
            ..self.clone()
        }
    }

    pub fn adding_good_words(&self, words: &[String]) -> Self {
        Self {
            good_words: Self::adding(&self.good_words, words),
            ..self.clone()
        }
    }

    pub fn removing_good_words(&self, words: &[String]) -> Self {
        Self {
            good_words: Self::removing(&self.good_words, words),
            ..self.clone()
        }
    }

    pub fn adding_super_bad_words(&self, words: &[String]) -> Self {
        Self {
            super_bad_words: Self::adding(&self.super_bad_words, words),
            ..self.clone()
        }
    }

    pub fn removing_super_bad_words(&self, words: &[String]) -> Self {
        Self {
            super_bad_words: Self::removing(&self.super_bad_words, words),
            ..self.clone()
        }
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("GAZETTE_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("gazette").join("config.toml"))
}

//! Configuration management for Anime Nexus.
//!
//! This module handles loading and parsing configuration from TOML files,
//! with sensible defaults for all settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory settings
    pub data: DataConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Jikan API settings
    pub jikan: JikanConfig,

    /// Type-ahead suggestion settings
    #[serde(default)]
    pub suggestions: SuggestionConfig,
}

/// Data directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root data directory path
    pub root_dir: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log directory path (relative to data directory or absolute)
    pub log_dir: String,

    /// Default log level (trace, debug, info, warn, error)
    pub default_level: String,

    /// Enable console output
    pub console: bool,

    /// Enable file output
    pub file: bool,

    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

/// Jikan API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JikanConfig {
    /// Jikan API base URL
    pub base_url: String,

    /// Items requested per search page
    pub page_size: u32,

    /// Consecutive rate-limit responses tolerated before giving up
    pub max_retries: u32,

    /// Delay before reissuing a rate-limited request, in milliseconds
    pub retry_delay_ms: u64,

    /// How the retry delay grows between attempts
    #[serde(default)]
    pub backoff: BackoffKind,

    /// Upper bound for a single request, in milliseconds
    pub request_timeout_ms: u64,

    /// Client-side request pacing
    pub pacing: PacingConfig,
}

/// Retry delay growth
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// Wait `retry_delay_ms` before every retry
    #[default]
    Fixed,
    /// Double the delay after every retry
    Exponential,
}

/// Request pacing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Maximum requests per second
    pub requests_per_second: f64,

    /// Maximum requests per minute
    pub requests_per_minute: u32,
}

/// Suggestion (type-ahead) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionConfig {
    /// Quiet period after the last keystroke before fetching, in milliseconds
    pub debounce_ms: u64,

    /// Shortest trimmed query that triggers a fetch
    pub min_query_chars: usize,

    /// Results requested per category
    pub limit_per_category: u32,
}

impl JikanConfig {
    /// Delay before the first retry of a rate-limited request
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl SuggestionConfig {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            min_query_chars: 2,
            limit_per_category: 5,
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        // Jikan's published limits
        Self {
            requests_per_second: 3.0,
            requests_per_minute: 60,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig {
                root_dir: "data".to_string(),
            },
            logging: LoggingConfig {
                log_dir: "logs".to_string(),
                default_level: "info".to_string(),
                console: true,
                file: false,
                json_format: false,
            },
            jikan: JikanConfig {
                base_url: "https://api.jikan.moe/v4".to_string(),
                page_size: 20,
                max_retries: 3,
                retry_delay_ms: 1000,
                backoff: BackoffKind::Fixed,
                request_timeout_ms: 15_000,
                pacing: PacingConfig::default(),
            },
            suggestions: SuggestionConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns the default configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Load configuration from a TOML file or create default if not found
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::from_file(path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load config, using defaults");
            Self::default()
        })
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration saved successfully"
        );

        Ok(())
    }

    /// Get the path for the data directory
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data.root_dir)
    }

    /// Get the absolute path for the log directory
    pub fn log_dir(&self) -> PathBuf {
        let log_path = Path::new(&self.logging.log_dir);
        if log_path.is_absolute() {
            log_path.to_path_buf()
        } else {
            self.data_dir().join(log_path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.data.root_dir, "data");
        assert_eq!(config.jikan.page_size, 20);
        assert_eq!(config.jikan.max_retries, 3);
        assert_eq!(config.jikan.backoff, BackoffKind::Fixed);
        assert_eq!(config.suggestions.debounce_ms, 300);
        assert_eq!(config.suggestions.min_query_chars, 2);
    }

    #[test]
    fn test_save_and_load_config() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.toml");

        let mut original_config = Config::default();
        original_config.jikan.backoff = BackoffKind::Exponential;
        original_config.save(&config_path)?;

        assert!(config_path.exists());

        let loaded_config = Config::from_file(&config_path)?;
        assert_eq!(loaded_config.data.root_dir, original_config.data.root_dir);
        assert_eq!(loaded_config.jikan.base_url, original_config.jikan.base_url);
        assert_eq!(loaded_config.jikan.backoff, BackoffKind::Exponential);

        Ok(())
    }

    #[test]
    fn test_missing_suggestions_section_uses_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.toml");

        let mut value = toml::Value::try_from(Config::default())?;
        if let Some(table) = value.as_table_mut() {
            table.remove("suggestions");
        }
        std::fs::write(&config_path, toml::to_string(&value)?)?;

        let loaded = Config::from_file(&config_path)?;
        assert_eq!(loaded.suggestions.debounce_ms, 300);

        Ok(())
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.data.root_dir, "data");
    }

    #[test]
    fn test_path_resolution() {
        let config = Config::default();

        let log_dir = config.log_dir();
        assert!(log_dir.ends_with("data/logs"));
    }

    #[test]
    fn test_durations() {
        let config = Config::default();
        assert_eq!(config.jikan.retry_delay(), Duration::from_millis(1000));
        assert_eq!(config.suggestions.debounce_window(), Duration::from_millis(300));
        assert_eq!(config.jikan.request_timeout(), Duration::from_secs(15));
    }
}

//! Configuration management for TrendMingle

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::calendar::DEFAULT_PREVIEW_LIMIT;
use crate::error::{ConfigError, Result};
use crate::logging::LogFormat;
use crate::suggestions::{SuggestionCategory, SuggestionLibrary};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub suggestions: SuggestionsConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "~/.local/share/trendmingle/mingle.db".to_string(),
        }
    }
}

/// Timings for the simulated account collaborator and auto-sync.
///
/// Durations are humantime strings such as `1500ms` or `6h`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_delay")]
    pub connect_delay: String,
    #[serde(default = "default_delay")]
    pub sync_delay: String,
    #[serde(default = "default_true")]
    pub auto_sync: bool,
    #[serde(default = "default_auto_sync_interval")]
    pub auto_sync_interval: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            connect_delay: default_delay(),
            sync_delay: default_delay(),
            auto_sync: true,
            auto_sync_interval: default_auto_sync_interval(),
        }
    }
}

impl SyncConfig {
    pub fn connect_delay(&self) -> Result<Duration> {
        parse_duration("sync.connect_delay", &self.connect_delay)
    }

    pub fn sync_delay(&self) -> Result<Duration> {
        parse_duration("sync.sync_delay", &self.sync_delay)
    }

    /// `None` when auto-sync is switched off.
    pub fn auto_sync_interval(&self) -> Result<Option<Duration>> {
        if !self.auto_sync {
            return Ok(None);
        }
        parse_duration("sync.auto_sync_interval", &self.auto_sync_interval).map(Some)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionsConfig {
    #[serde(default = "default_delay")]
    pub delay: String,
    /// Keyed by category name: `hashtags`, `caption` or `idea`.
    #[serde(default)]
    pub seeds: BTreeMap<String, String>,
    #[serde(default)]
    pub pools: BTreeMap<String, Vec<String>>,
}

impl Default for SuggestionsConfig {
    fn default() -> Self {
        Self {
            delay: default_delay(),
            seeds: BTreeMap::new(),
            pools: BTreeMap::new(),
        }
    }
}

impl SuggestionsConfig {
    pub fn delay(&self) -> Result<Duration> {
        parse_duration("suggestions.delay", &self.delay)
    }

    /// Built-in library overlaid with configured seeds and pools.
    pub fn library(&self) -> Result<SuggestionLibrary> {
        SuggestionLibrary::new(by_category(&self.seeds)?, by_category(&self.pools)?)
    }
}

fn by_category<V: Clone>(
    entries: &BTreeMap<String, V>,
) -> Result<BTreeMap<SuggestionCategory, V>> {
    entries
        .iter()
        .map(|(key, value)| -> Result<(SuggestionCategory, V)> {
            let category = key.parse::<SuggestionCategory>().map_err(|e| {
                ConfigError::InvalidValue {
                    field: format!("suggestions.{}", key),
                    message: e.to_string(),
                }
            })?;
            Ok((category, value.clone()))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_preview_limit")]
    pub preview_limit: usize,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            preview_limit: DEFAULT_PREVIEW_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            level: default_log_level(),
        }
    }
}

impl LoggingSection {
    pub fn format(&self) -> Result<LogFormat> {
        self.format.parse().map_err(|message| {
            ConfigError::InvalidValue {
                field: "logging.format".to_string(),
                message,
            }
            .into()
        })
    }
}

fn default_delay() -> String {
    "1500ms".to_string()
}

fn default_true() -> bool {
    true
}

fn default_auto_sync_interval() -> String {
    "6h".to_string()
}

fn default_preview_limit() -> usize {
    DEFAULT_PREVIEW_LIMIT
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn parse_duration(field: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value).map_err(|e| {
        ConfigError::InvalidValue {
            field: field.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

impl Config {
    /// Load configuration from the default location
    ///
    /// A missing file yields the default configuration.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "No config file, using defaults");
            return Ok(Self::default_config());
        }
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Check every derived value so a bad file fails at startup.
    pub fn validate(&self) -> Result<()> {
        self.sync.connect_delay()?;
        self.sync.sync_delay()?;
        self.sync.auto_sync_interval()?;
        self.suggestions.delay()?;
        self.suggestions.library()?;
        self.logging.format()?;
        if self.calendar.preview_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "calendar.preview_limit".to_string(),
                message: "must be at least 1".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Resolve the configuration file path following the XDG Base Directory layout
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("MINGLE_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("trendmingle").join("config.toml"))
}

/// Resolve the data directory path following the XDG Base Directory layout
pub fn resolve_data_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| ConfigError::MissingField("data directory".to_string()))?;

    Ok(data_dir.join("trendmingle"))
}

/// Expand `~` and environment variables in the configured database path.
pub fn resolve_db_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path).map_err(|e| ConfigError::InvalidValue {
        field: "database.path".to_string(),
        message: e.to_string(),
    })?;
    Ok(PathBuf::from(expanded.as_ref()))
}

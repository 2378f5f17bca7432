//! Centralized logging configuration for TrendMingle hosts
//!
//! Provides consistent logging setup with support for:
//! - Text, JSON, and pretty-printed output
//! - Environment variable configuration
//! - Per-module log level filtering
//!
//! # Examples
//!
//! ```no_run
//! use libtrendmingle::logging::{LoggingConfig, LogFormat};
//!
//! let config = LoggingConfig::new(LogFormat::Json, "info".to_string(), false);
//! config.init().ok();
//!
//! // Or use default settings (respects env vars)
//! libtrendmingle::logging::init_default().ok();
//!
//! // Or follow the `[logging]` section of the config file
//! let file = libtrendmingle::config::Config::load()?;
//! libtrendmingle::logging::init_from_config(&file)?;
//! # Ok::<(), libtrendmingle::MingleError>(())
//! ```

use std::str::FromStr;

use crate::config::Config;
use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable text output (no colors, for piping)
    Text,
    /// Machine-parseable JSON (one JSON object per line)
    Json,
    /// Pretty-printed with colors (for development)
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(format!(
                "Invalid log format: '{}'. Valid options: text, json, pretty",
                s
            )),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
            LogFormat::Pretty => write!(f, "pretty"),
        }
    }
}

/// Configuration for logging initialization
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: String,
    pub verbose: bool,
}

impl LoggingConfig {
    /// Create a new logging configuration
    ///
    /// # Arguments
    ///
    /// * `format` - Log output format (text, json, or pretty)
    /// * `level` - Minimum log level or an `EnvFilter` directive
    /// * `verbose` - If true, defaults to debug level
    pub fn new(format: LogFormat, level: String, verbose: bool) -> Self {
        Self {
            format,
            level,
            verbose,
        }
    }

    /// Build from the `[logging]` section of the config file.
    pub fn from_section(section: &crate::config::LoggingSection) -> Result<Self> {
        Ok(Self::new(section.format()?, section.level.clone(), false))
    }

    /// Settings from the config file, with `MINGLE_LOG_FORMAT` and
    /// `MINGLE_LOG_LEVEL` taking precedence.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut logging = Self::from_section(&config.logging)?;
        if let Some(format) = std::env::var("MINGLE_LOG_FORMAT")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            logging.format = format;
        }
        if let Ok(level) = std::env::var("MINGLE_LOG_LEVEL") {
            logging.level = level;
        }
        Ok(logging)
    }

    /// Install the global subscriber.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a subscriber is already
    /// installed for this process.
    pub fn init(&self) -> Result<()> {
        use tracing_subscriber::EnvFilter;

        let filter = if self.verbose {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
        };

        let installed = match self.format {
            LogFormat::Json => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .with_span_list(true)
                .flatten_event(true)
                .with_target(true)
                .with_line_number(true)
                .with_file(true)
                .try_init(),
            LogFormat::Pretty => tracing_subscriber::fmt()
                .pretty()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true)
                .with_file(true)
                .try_init(),
            LogFormat::Text => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true)
                .try_init(),
        };

        installed.map_err(|e| {
            ConfigError::InvalidValue {
                field: "logging".to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }
}

/// Initialize logging with default settings
///
/// Respects `MINGLE_LOG_FORMAT` and `MINGLE_LOG_LEVEL` environment variables.
/// Falls back to text format with info level if not set.
pub fn init_default() -> Result<()> {
    let format = std::env::var("MINGLE_LOG_FORMAT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(LogFormat::Text);

    let level = std::env::var("MINGLE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    LoggingConfig::new(format, level, false).init()
}

/// Initialize logging from a loaded configuration unless the host already
/// installed a subscriber.
///
/// Returns `true` when this call installed the subscriber.
pub fn init_from_config(config: &Config) -> Result<bool> {
    let logging = LoggingConfig::from_config(config)?;
    if tracing::dispatcher::has_been_set() {
        tracing::debug!(format = %logging.format, "Log subscriber already installed");
        return Ok(false);
    }
    logging.init()?;
    Ok(true)
}

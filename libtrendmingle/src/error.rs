//! Error types for TrendMingle

use thiserror::Error;

use crate::accounts::SyncOperation;
use crate::suggestions::SuggestionCategory;
use crate::types::Platform;

pub type Result<T> = std::result::Result<T, MingleError>;

#[derive(Error, Debug)]
pub enum MingleError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid transition: cannot {action} {subject} while it is {state}")]
    InvalidTransition {
        subject: String,
        action: &'static str,
        state: String,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{platform} {operation} failed: {source}")]
    Sync {
        platform: Platform,
        operation: SyncOperation,
        #[source]
        source: PlatformError,
    },

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("No signed-in user")]
    Unauthenticated,
}

impl MingleError {
    pub(crate) fn invalid_transition(
        subject: impl Into<String>,
        action: &'static str,
        state: impl std::fmt::Display,
    ) -> Self {
        MingleError::InvalidTransition {
            subject: subject.into(),
            action,
            state: state.to_string(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        MingleError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Whether retrying the same call can succeed without changing its input.
    ///
    /// Collaborator failures roll the entity back to its pre-operation state,
    /// so the caller may simply issue the operation again.
    pub fn is_recoverable(&self) -> bool {
        match self {
            MingleError::Sync { .. } => true,
            MingleError::Store(StoreError::Sqlx(_)) | MingleError::Store(StoreError::Io(_)) => true,
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Suggestion pool for '{0}' is empty")]
    EmptyPool(SuggestionCategory),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database operation failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stored record is invalid: {0}")]
    Corrupt(String),
}

/// Failure reported by the account synchronization collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Request rejected: {0}")]
    Rejected(String),
}

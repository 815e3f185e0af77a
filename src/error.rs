//! Error types for freshcache
//!
//! All modules use `CacheResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// All errors that can occur in freshcache
#[derive(Error, Debug)]
pub enum CacheError {
    // Loader errors
    #[error("Failed to load dataset {dataset}: {reason}")]
    Loader { dataset: String, reason: String },

    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),

    // Store errors
    #[error("Cached value under {key} has an unexpected type")]
    TypeMismatch { key: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl CacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a loader failure for a dataset
    pub fn loader(dataset: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Loader {
            dataset: dataset.into(),
            reason: reason.into(),
        }
    }

    /// Check if error is retryable
    ///
    /// Loader and IO failures are never cached, so the next call retries them.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Loader { .. } | Self::Io { .. } | Self::PathNotFound(_) | Self::Csv(_)
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::PathNotFound(_) => Some("Check data.data_dir and data.lookup_dir in the config"),
            Self::UnknownDataset(_) => Some("Run: freshcache stats to list known datasets"),
            Self::ConfigInvalid { .. } => Some("Run: freshcache config init --force"),
            _ => None,
        }
    }
}

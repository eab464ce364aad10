//! Error types for collate-core
//!
//! Only configuration and IO problems surface as errors. Bad cell data never
//! does: the pipeline recovers from it in place.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for collate-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in collate-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be found
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// Failed to parse YAML configuration
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Invalid configuration value
    #[error("invalid configuration: {message}")]
    ConfigInvalid {
        /// Description of what's invalid
        message: String,
    },

    /// A delimited-text file could not be read or written
    #[error("CSV error in '{path}': {source}")]
    Csv {
        /// File being read or written
        path: PathBuf,
        /// Underlying csv error
        #[source]
        source: csv::Error,
    },

    /// Directory traversal error while discovering input tables
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for [`Error::ConfigInvalid`]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }
}

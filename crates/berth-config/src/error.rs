//! Configuration error types.

use std::io;

use thiserror::Error;

/// Configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the manifest file.
    #[error("Failed to read manifest at {path}: {source}")]
    ReadError {
        /// Path to the manifest that could not be read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Failed to parse the manifest.
    #[error("Failed to parse {format} manifest at {path}: {message}")]
    ParseError {
        /// Path to the manifest that failed to parse.
        path: String,
        /// The format the file was parsed as.
        format: &'static str,
        /// Parser error message.
        message: String,
    },

    /// Manifest validation failed.
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// Field that failed validation.
        field: String,
        /// Validation failure description.
        message: String,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

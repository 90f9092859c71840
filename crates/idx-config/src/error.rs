//! Error types for idx configuration.

use std::{io, path::PathBuf};

use thiserror::Error;
use toml::de;

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Failed to parse TOML configuration.
    #[error("failed to parse config file {path}: {source}")]
    ParseToml {
        /// Path to the file that could not be parsed.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: de::Error,
    },

    /// An accuracy bucket list was empty where at least one bucket is required.
    #[error("accuracy list for {field} must not be empty")]
    EmptyAccuracy {
        /// The field the accuracy list belongs to.
        field: &'static str,
    },

    /// The configured storage block size was not a power of two, or too small.
    #[error("storage block size must be a power of two >= 512, got {0}")]
    InvalidBlockSize(u32),

    /// Failed to determine a default storage/config root directory.
    #[error("could not determine a default data directory")]
    NoDataDirectory,
}

//! Error types for the block storage volume.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors raised while reading, writing, or maintaining a storage volume.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred against the volume file.
    #[error("I/O error on volume {path}: {source}")]
    Io {
        /// Path to the volume file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The volume has been closed and no longer accepts operations.
    #[error("volume {path} is closed")]
    Closed {
        /// Path to the volume file.
        path: PathBuf,
    },

    /// No record exists at the requested offset, or it has been deleted.
    #[error("no record at offset {offset} in volume {path}")]
    NotFound {
        /// Path to the volume file.
        path: PathBuf,
        /// The requested offset.
        offset: u64,
    },

    /// A write would cross the volume's maximum offset.
    #[error("write at offset {offset} would exceed the volume's addressable range")]
    Eof {
        /// The offset the write attempted to start at.
        offset: u64,
    },

    /// The volume directory contains no volume files matching the expected pattern.
    #[error("no volume file found matching pattern {pattern:?} in {dir}")]
    NoFile {
        /// Directory searched.
        dir: PathBuf,
        /// Glob-like pattern searched for.
        pattern: String,
    },

    /// A record's checksum, framing, or header did not match what was expected.
    #[error("corrupt volume {path} at offset {offset}: {detail}")]
    CorruptVolume {
        /// Path to the volume file.
        path: PathBuf,
        /// Offset of the corrupt record.
        offset: u64,
        /// Human-readable detail.
        detail: String,
    },
}

impl StorageError {
    /// Wraps an I/O error with the path it occurred against.
    pub(crate) fn io(path: &std::path::Path, source: io::Error) -> Self {
        Self::Io { path: path.to_path_buf(), source }
    }
}

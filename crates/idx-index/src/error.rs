//! Error types for the idx-index crate.

use std::{io, path::PathBuf};

use thiserror::Error;

use idx_geo::{EwktError, GeoSpatialError};
use idx_value::{CastError, ValueError};

/// Errors that can occur when working with the underlying search index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Failed to open or create the index.
    #[error("failed to open index at {path}: {message}")]
    OpenIndex {
        /// Path to the index directory.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Failed to write to the index.
    #[error("failed to write to index: {0}")]
    Write(String),

    /// Failed to commit changes to the index.
    #[error("failed to commit index: {0}")]
    Commit(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid stemmer language.
    #[error("unsupported stemmer language: {0}")]
    InvalidLanguage(String),
}

impl IndexError {
    /// Creates an `OpenIndex` error from a path and Tantivy error.
    pub(crate) fn open_index(path: PathBuf, source: &tantivy::TantivyError) -> Self {
        Self::OpenIndex { path, message: source.to_string() }
    }

    /// Creates a `Write` error from a Tantivy error.
    pub(crate) fn write(source: &tantivy::TantivyError) -> Self {
        Self::Write(source.to_string())
    }

    /// Creates a `Commit` error from a Tantivy error.
    pub(crate) fn commit(source: &tantivy::TantivyError) -> Self {
        Self::Commit(source.to_string())
    }
}

/// Errors raised while serializing or type-guessing a scalar value (C1).
#[derive(Debug, Error, PartialEq)]
pub enum SerialiseError {
    /// A value was syntactically well-formed but outside the representable range.
    #[error("value out of range for {kind}: {detail}")]
    OutOfRange {
        /// The target scalar kind.
        kind: &'static str,
        /// Human-readable detail.
        detail: String,
    },

    /// A value could not be serialized as the requested type.
    #[error("cannot serialise value as {kind}: {detail}")]
    Serialisation {
        /// The target scalar kind.
        kind: &'static str,
        /// Human-readable detail.
        detail: String,
    },
}

/// Errors raised by the schema engine (C6) while resolving an effective
/// specification for a document path.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    /// An attempt was made to change an immutable persisted property.
    #[error("it is not allowed to change {property} for field '{path}': was {old}, requested {new}")]
    Consistency {
        /// Dotted field path.
        path: String,
        /// Name of the immutable property.
        property: &'static str,
        /// The persisted value.
        old: String,
        /// The newly requested value.
        new: String,
    },

    /// `strict` is set and a field's type could not be determined.
    #[error("field '{path}' has no type and strict mode forbids inference")]
    MissingType {
        /// Dotted field path.
        path: String,
    },

    /// A value was found nested under a field that must stay scalar
    /// (e.g. a `foreign` field, or a field with a fixed concrete type).
    #[error("field '{path}' cannot be nested: {reason}")]
    InvalidNesting {
        /// Dotted field path.
        path: String,
        /// Human-readable detail.
        reason: String,
    },

    /// Persisted properties JSON did not have the expected shape.
    #[error("corrupt schema at '{path}': {detail}")]
    Corruption {
        /// Dotted field path.
        path: String,
        /// Human-readable detail.
        detail: String,
    },
}

/// The union of everything that can go wrong while indexing one document
/// (C7). Mirrors the "data error vs consistency error vs storage error"
/// grouping described in the error-handling design.
#[derive(Debug, Error)]
pub enum IndexingError {
    /// The input document's shape was invalid (§7 data errors).
    #[error(transparent)]
    Value(#[from] ValueError),

    /// A `{"_tag": value}` cast envelope failed to resolve.
    #[error(transparent)]
    Cast(#[from] CastError),

    /// An EWKT string failed to parse.
    #[error(transparent)]
    Ewkt(#[from] EwktError),

    /// A geometry failed to index into HTM ranges.
    #[error(transparent)]
    GeoSpatial(#[from] GeoSpatialError),

    /// Serialization or type guessing failed.
    #[error(transparent)]
    Serialise(#[from] SerialiseError),

    /// The schema engine rejected the write (§7 consistency/missing-type errors).
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The external index rejected the write.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Persisting the document's opaque payload to a block-storage volume
    /// failed.
    #[error(transparent)]
    Storage(#[from] idx_storage::StorageError),
}

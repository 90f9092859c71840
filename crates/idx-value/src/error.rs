//! Error types for the value model and cast resolver.

use thiserror::Error;

/// Errors raised while walking or coercing a [`crate::Value`] tree.
#[derive(Debug, Error, PartialEq)]
pub enum ValueError {
    /// A map or array value was found where a scalar was required.
    #[error("value at {path} cannot be nested: expected a scalar, found {found}")]
    CannotNest {
        /// Dotted path at which the error occurred.
        path: String,
        /// Description of what was found instead.
        found: &'static str,
    },

    /// A cast envelope could not be resolved.
    #[error(transparent)]
    Cast(#[from] CastError),
}

/// Errors raised while resolving a `{"_tag": value}` cast envelope.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CastError {
    /// The object had more than one key, so it is not a valid cast envelope.
    #[error("cast envelope must have exactly one key, found {0}")]
    MultipleTags(usize),

    /// The single key did not match any recognized cast tag.
    #[error("unrecognized cast tag: {0}")]
    UnknownTag(String),

    /// The tagged value could not be coerced to the target type.
    #[error("cannot cast value to {tag}: {reason}")]
    Coercion {
        /// The cast tag that was requested.
        tag: &'static str,
        /// Human-readable reason the coercion failed.
        reason: String,
    },
}

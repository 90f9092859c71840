//! Error types for EWKT lexing, parsing, and range generation.

use std::fmt;

use thiserror::Error;

/// Lexer error with position information, in the style of a hand-written
/// recursive-descent tokenizer: carries enough context to point at the
/// offending character.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("ewkt syntax error at byte {position}: {message}")]
pub struct LexError {
    /// Error message.
    pub message: String,
    /// Byte position in input where the error occurred.
    pub position: usize,
    /// The original input string.
    pub input: String,
}

impl LexError {
    /// Creates a new lexer error.
    pub fn new(message: impl Into<String>, position: usize, input: &str) -> Self {
        Self { message: message.into(), position, input: input.to_string() }
    }

    /// Formats the error with a position indicator showing where it occurred.
    pub fn format_with_context(&self) -> String {
        format!(
            "ewkt syntax error: {}\n  {}\n  {}^",
            self.message,
            self.input,
            " ".repeat(self.position)
        )
    }
}

/// Parser error: the token stream did not match the EWKT grammar.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("ewkt parse error: {message}")]
pub struct ParseError {
    /// Error message.
    pub message: String,
    /// Index into the token stream where the error occurred, if known.
    pub token_index: Option<usize>,
}

impl ParseError {
    /// Creates a new parse error.
    pub fn new(message: impl Into<String>, token_index: Option<usize>) -> Self {
        Self { message: message.into(), token_index }
    }
}

/// A unified EWKT error combining lexing and parsing failures.
#[derive(Debug, Clone, Error)]
pub struct EwktError {
    /// What stage failed.
    pub kind: EwktErrorKind,
    /// The original EWKT text, if available.
    pub input: Option<String>,
}

/// The stage at which an EWKT string failed to resolve to a shape.
#[derive(Debug, Clone)]
pub enum EwktErrorKind {
    /// Tokenization failed.
    Lex(LexError),
    /// The token stream didn't match the grammar.
    Parse(ParseError),
}

impl fmt::Display for EwktError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            EwktErrorKind::Lex(e) => write!(f, "{e}"),
            EwktErrorKind::Parse(e) => write!(f, "{e}"),
        }
    }
}

impl From<LexError> for EwktError {
    fn from(err: LexError) -> Self {
        Self { input: Some(err.input.clone()), kind: EwktErrorKind::Lex(err) }
    }
}

impl From<ParseError> for EwktError {
    fn from(err: ParseError) -> Self {
        Self { input: None, kind: EwktErrorKind::Parse(err) }
    }
}

/// Errors raised while deriving HTM ranges, centroids, or fingerprints
/// from an already-parsed shape.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoSpatialError {
    /// A polygon or convex ring had fewer than 3 points.
    #[error("ring needs at least 3 points, found {0}")]
    DegenerateRing(usize),

    /// A circle's radius was not positive.
    #[error("circle radius must be positive, got {0}")]
    InvalidRadius(f64),

    /// The requested HTM level was out of the supported range.
    #[error("htm level {0} out of range (0..=15)")]
    InvalidHtmLevel(u8),
}

//! Centralized error types for mail2matrix.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mail2matrix library.
#[derive(Error, Debug)]
pub enum Mail2MatrixError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The message framing (header block) could not be parsed.
    #[error("Parse error: {reason}")]
    Parse { reason: String },

    /// The message template failed to compile or render.
    #[error("Template error: {source}")]
    Template {
        #[from]
        source: minijinja::Error,
    },

    /// A configured skip pattern is not a valid regular expression.
    #[error("Invalid skip pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: regex::Error,
    },

    /// The configuration file is missing, unreadable or incomplete.
    #[error("Configuration error in '{path}': {reason}")]
    Config { path: PathBuf, reason: String },

    /// The message could not be handed to the Matrix homeserver.
    #[error("Delivery error: {0}")]
    Delivery(String),
}

/// Convenience alias for `Result<T, Mail2MatrixError>`.
pub type Result<T> = std::result::Result<T, Mail2MatrixError>;

impl Mail2MatrixError {
    /// Create a `Parse` variant.
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
        }
    }
}

/// Allow `?` on `std::io::Error` inside functions returning `Mail2MatrixError`
/// when no path context is available (stdin, mostly).
impl From<std::io::Error> for Mail2MatrixError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<stdin>"),
            source,
        }
    }
}

impl From<reqwest::Error> for Mail2MatrixError {
    fn from(err: reqwest::Error) -> Self {
        Self::Delivery(err.to_string())
    }
}

/// Reasons the Part Selector gave up on a multipart body.
///
/// These never reach the caller as errors: the extractor records them in
/// [`crate::model::message::RawReason::Degraded`] and falls back to the raw body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
    /// A `multipart/alternative` body had neither a `text/plain` nor a `text/html` part.
    #[error("multipart/alternative has no text/plain or text/html part")]
    UnsupportedAlternative,

    /// The multipart tree could not be parsed at all.
    #[error("multipart body could not be parsed")]
    Unparsable,
}

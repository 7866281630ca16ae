//! The extracted message and the context handed to the template renderer.

use std::fmt;

use serde::Serialize;

use crate::error::SelectError;

/// Multipart subtypes the Part Selector knows how to flatten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultipartKind {
    /// `multipart/alternative`: pick one rendition.
    Alternative,
    /// `multipart/mixed`: concatenate the text parts.
    Mixed,
}

impl MultipartKind {
    /// Map a lower-cased media type to a selector policy.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        match media_type {
            "multipart/alternative" => Some(Self::Alternative),
            "multipart/mixed" => Some(Self::Mixed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alternative => "multipart/alternative",
            Self::Mixed => "multipart/mixed",
        }
    }
}

/// Why the body was taken verbatim from the message instead of from the
/// Part Selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawReason {
    /// The top-level media type is not `multipart/*`.
    NotMultipart,
    /// `multipart/*` without a `boundary` parameter.
    MissingBoundary,
    /// A multipart subtype other than `alternative` or `mixed`.
    UnrecognizedMultipart(String),
    /// Selection was attempted and failed.
    Degraded(SelectError),
}

/// Where [`ExtractedMessage::body`] came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodySource {
    /// Produced by the Part Selector.
    Structured(MultipartKind),
    /// The verbatim body stream.
    Raw(RawReason),
}

impl BodySource {
    /// `true` when the Part Selector was tried and its result discarded.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Raw(RawReason::Degraded(_)))
    }
}

impl fmt::Display for BodySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structured(kind) => write!(f, "{}", kind.as_str()),
            Self::Raw(RawReason::NotMultipart) => f.write_str("raw (not multipart)"),
            Self::Raw(RawReason::MissingBoundary) => f.write_str("raw (missing boundary)"),
            Self::Raw(RawReason::UnrecognizedMultipart(subtype)) => {
                write!(f, "raw (unrecognized multipart/{subtype})")
            }
            Self::Raw(RawReason::Degraded(err)) => write!(f, "raw (degraded: {err})"),
        }
    }
}

/// Subject and plain-text body of one email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedMessage {
    /// The `Subject` header exactly as sent (encoded-words are not decoded).
    pub subject: String,

    /// Plain-text body.
    pub body: String,

    /// How the body was obtained.
    pub source: BodySource,
}

/// Values available to a message template.
///
/// Field names are serialized in the casing templates use:
/// `Preface`, `Subject`, `Body`, `Epilogue`.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RenderContext<'a> {
    pub preface: &'a str,
    pub subject: &'a str,
    pub body: &'a str,
    pub epilogue: &'a str,
}

impl<'a> RenderContext<'a> {
    /// Combine an extracted message with the configured preface and epilogue.
    pub fn new(message: &'a ExtractedMessage, preface: &'a str, epilogue: &'a str) -> Self {
        Self {
            preface,
            subject: &message.subject,
            body: &message.body,
            epilogue,
        }
    }
}

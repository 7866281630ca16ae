//! Message Extractor and Part Selector.
//!
//! The multipart tree is parsed by `mail-parser`, which also undoes
//! transfer encodings and charsets. The tree is rooted at the boundary this
//! module classified, and every part is then classified from its own raw
//! header block, so top-level and part classification share one code path.

use std::collections::HashMap;

use mail_parser::{MessageParser, MessagePart};
use tracing::{debug, warn};

use crate::error::{Result, SelectError};
use crate::model::content_type::{ContentTypeInfo, DispositionInfo};
use crate::model::message::{BodySource, ExtractedMessage, MultipartKind, RawReason};
use crate::parser::content_type::{content_type, disposition};
use crate::parser::header::{split_message, HeaderMap};
use crate::parser::html;

/// One MIME body part, alive only while a multipart body is walked.
#[derive(Debug, Clone)]
pub struct Part {
    pub content_type: ContentTypeInfo,
    pub disposition: DispositionInfo,
    /// Decoded content, or `None` when the part could not be read.
    pub content: Option<String>,
}

/// Extract the subject and plain-text body of a raw RFC 5322 message.
///
/// Only unparsable framing is an error. Anything the Part Selector cannot
/// handle falls back to the undecoded body, and [`ExtractedMessage::source`]
/// records why.
pub fn extract(raw: &[u8]) -> Result<ExtractedMessage> {
    let framed = split_message(raw)?;
    let subject = framed.headers.get("subject").unwrap_or_default().to_string();
    let top = content_type(&framed.headers);

    let (body, source) = match select_body(framed.body, &top) {
        Ok((body, kind)) => (body, BodySource::Structured(kind)),
        Err(reason) => {
            let source = BodySource::Raw(reason);
            debug!(media_type = %top.media_type, %source, "Using raw message body");
            (String::from_utf8_lossy(framed.body).into_owned(), source)
        }
    };

    Ok(ExtractedMessage {
        subject,
        body,
        source,
    })
}

/// Run the Part Selector when the top-level type allows it.
fn select_body(
    body: &[u8],
    top: &ContentTypeInfo,
) -> std::result::Result<(String, MultipartKind), RawReason> {
    if !top.is_multipart() {
        return Err(RawReason::NotMultipart);
    }
    let Some(boundary) = top.boundary() else {
        return Err(RawReason::MissingBoundary);
    };
    let Some(kind) = MultipartKind::from_media_type(&top.media_type) else {
        return Err(RawReason::UnrecognizedMultipart(top.subtype().to_string()));
    };

    let parts = read_parts(&top.media_type, boundary, body).map_err(RawReason::Degraded)?;
    let body = match kind {
        MultipartKind::Alternative => select_alternative(parts).map_err(RawReason::Degraded)?,
        MultipartKind::Mixed => select_mixed(parts),
    };
    Ok((body, kind))
}

/// Pick one rendition of a `multipart/alternative` body.
///
/// `text/plain` wins over `text/html` regardless of order. When several
/// parts share a media type, the last one wins. HTML is sanitized.
pub fn select_alternative(
    parts: impl IntoIterator<Item = Part>,
) -> std::result::Result<String, SelectError> {
    let mut by_type: HashMap<String, String> = HashMap::new();

    for part in parts {
        // Only text renditions can ever be chosen
        if !is_body_text(&part) {
            continue;
        }
        let Some(content) = part.content else {
            warn!(media_type = %part.content_type.media_type, "Skipping unreadable part");
            continue;
        };
        by_type.insert(part.content_type.media_type, content);
    }

    if let Some(plain) = by_type.remove("text/plain") {
        return Ok(plain);
    }
    if let Some(html) = by_type.get("text/html") {
        return Ok(html::sanitize(html));
    }
    Err(SelectError::UnsupportedAlternative)
}

/// Concatenate the text parts of a `multipart/mixed` body in document order,
/// exactly one blank line between parts. Attachments and non-text parts are
/// dropped.
pub fn select_mixed(parts: impl IntoIterator<Item = Part>) -> String {
    let mut out = String::new();

    for part in parts {
        if !is_body_text(&part) {
            continue;
        }
        let Some(content) = part.content else {
            warn!(media_type = %part.content_type.media_type, "Skipping unreadable part");
            continue;
        };
        let text = if part.content_type.media_type == "text/html" {
            html::sanitize(&content)
        } else {
            content
        };

        if out.is_empty() {
            out = text;
            continue;
        }
        let text = text.trim_start_matches(['\r', '\n']);
        if text.is_empty() {
            continue;
        }
        let kept = out.trim_end_matches(['\r', '\n']).len();
        out.truncate(kept);
        out.push_str("\n\n");
        out.push_str(text);
    }

    out
}

/// Whether a part may contribute to the body: inline and textual.
fn is_body_text(part: &Part) -> bool {
    if part.disposition.is_attachment {
        debug!(
            media_type = %part.content_type.media_type,
            filename = part.disposition.filename().unwrap_or_default(),
            "Skipping attachment"
        );
        return false;
    }
    part.content_type.is_text()
}

/// Parse a multipart body and return the direct children of its root.
///
/// The body is re-framed under a single `Content-Type` built from the
/// already classified media type and boundary, so the tree always follows
/// the same header the message was dispatched on. A root that still does
/// not come out as multipart (e.g. the boundary never occurs) is
/// unparsable.
fn read_parts(
    media_type: &str,
    boundary: &str,
    body: &[u8],
) -> std::result::Result<Vec<Part>, SelectError> {
    let mut message = format!(
        "Content-Type: {media_type}; boundary=\"{}\"\r\n\r\n",
        boundary.replace('\\', "\\\\").replace('"', "\\\"")
    )
    .into_bytes();
    message.extend_from_slice(body);

    let parsed = MessageParser::default()
        .parse(&message)
        .ok_or(SelectError::Unparsable)?;

    let Some(ids) = parsed.root_part().sub_parts() else {
        debug!(boundary, "Boundary never found in multipart body");
        return Err(SelectError::Unparsable);
    };

    let parts = ids
        .iter()
        .filter_map(|&id| parsed.part(id))
        .map(|part| read_part(&message, part))
        .collect();
    Ok(parts)
}

/// Classify one part from its raw headers and take its decoded content.
fn read_part(message: &[u8], part: &MessagePart<'_>) -> Part {
    let start = part.raw_header_offset() as usize;
    let end = part.raw_body_offset() as usize;

    let headers = match message.get(start..end).map(HeaderMap::parse) {
        Some(Ok(headers)) => headers,
        _ => {
            debug!(start, end, "Part headers could not be read");
            return Part {
                content_type: ContentTypeInfo::default(),
                disposition: DispositionInfo::default(),
                content: None,
            };
        }
    };

    let content = if part.is_encoding_problem {
        None
    } else {
        part.text_contents()
            .map(|text| text.strip_suffix('\r').unwrap_or(text).to_string())
    };

    Part {
        content_type: content_type(&headers),
        disposition: disposition(&headers),
        content,
    }
}

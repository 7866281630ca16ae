//! Content Classifier: `Content-Type` and `Content-Disposition` parsing.
//!
//! Both headers share the RFC 2045 / RFC 2183 shape
//! `token [ "/" token ] *( ";" name "=" ( token / quoted-string ) )`.

use std::collections::BTreeMap;

use crate::model::content_type::{ContentTypeInfo, DispositionInfo};
use crate::parser::header::HeaderMap;

/// Classify a header block by its `Content-Type`.
///
/// Falls back to `text/plain; charset=us-ascii` when the header is absent
/// or its media type cannot be parsed.
pub fn content_type(headers: &HeaderMap) -> ContentTypeInfo {
    headers
        .get("content-type")
        .and_then(parse_media_type)
        .unwrap_or_default()
}

/// Classify a header block by its `Content-Disposition`.
///
/// Only a disposition type of exactly `attachment` (any case) marks the part
/// as an attachment; absence or a parse failure means inline content.
pub fn disposition(headers: &HeaderMap) -> DispositionInfo {
    let Some((kind, parameters)) = headers.get("content-disposition").and_then(parse_value) else {
        return DispositionInfo::default();
    };
    if kind == "attachment" {
        DispositionInfo {
            is_attachment: true,
            parameters,
        }
    } else {
        DispositionInfo::default()
    }
}

/// Parse a `Content-Type` value such as `multipart/mixed; boundary="XYZ"`.
///
/// Returns `None` unless the value starts with a `type/subtype` pair.
pub fn parse_media_type(value: &str) -> Option<ContentTypeInfo> {
    let (media_type, parameters) = parse_value(value)?;
    let (main, sub) = media_type.split_once('/')?;
    if !is_token(main) || !is_token(sub) {
        return None;
    }
    Some(ContentTypeInfo {
        media_type,
        parameters,
    })
}

/// Split a structured header value into its lower-cased leading token and
/// its parameters. Malformed parameters are skipped.
fn parse_value(value: &str) -> Option<(String, BTreeMap<String, String>)> {
    let mut rest = value.trim();
    let end = rest.find(';').unwrap_or(rest.len());
    let head = rest[..end].trim().to_ascii_lowercase();
    if head.is_empty() || !head.split('/').all(is_token) || head.matches('/').count() > 1 {
        return None;
    }
    rest = &rest[end..];

    let mut parameters = BTreeMap::new();
    while let Some(after_semi) = rest.strip_prefix(';') {
        let (param, remaining) = next_parameter(after_semi);
        rest = remaining;
        if let Some((name, val)) = param {
            // First occurrence wins
            parameters.entry(name).or_insert(val);
        }
    }

    Some((head, parameters))
}

/// Read one `name=value` pair. Returns the pair (if well-formed) and the
/// unconsumed input, positioned at the next `;` or at the end.
fn next_parameter(input: &str) -> (Option<(String, String)>, &str) {
    let input = input.trim_start();
    let Some(eq) = input.find('=') else {
        return (None, skip_to_semicolon(input));
    };
    let name = input[..eq].trim();
    if name.contains(';') {
        // `; junk; name=value`: drop the junk and retry from the next `;`
        return (None, skip_to_semicolon(input));
    }
    let after_eq = input[eq + 1..].trim_start();

    let (value, remaining) = if let Some(quoted) = after_eq.strip_prefix('"') {
        match read_quoted(quoted) {
            Some((value, remaining)) => (value, remaining),
            None => return (None, ""),
        }
    } else {
        let end = after_eq.find(';').unwrap_or(after_eq.len());
        (after_eq[..end].trim().to_string(), &after_eq[end..])
    };

    let remaining = skip_to_semicolon(remaining);
    if !is_token(name) {
        return (None, remaining);
    }
    (Some((name.to_ascii_lowercase(), value)), remaining)
}

/// Read a quoted-string body (opening quote already consumed), honouring
/// backslash escapes. `None` when the closing quote is missing.
fn read_quoted(input: &str) -> Option<(String, &str)> {
    let mut value = String::new();
    let mut chars = input.char_indices();
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '"' => return Some((value, &input[idx + 1..])),
            '\\' => {
                let (_, escaped) = chars.next()?;
                value.push(escaped);
            }
            _ => value.push(ch),
        }
    }
    None
}

fn skip_to_semicolon(input: &str) -> &str {
    match input.find(';') {
        Some(pos) => &input[pos..],
        None => "",
    }
}

/// RFC 2045 token: printable ASCII except space and tspecials.
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?=".contains(&b)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(raw: &str) -> HeaderMap {
        HeaderMap::parse(raw.as_bytes()).unwrap()
    }

    #[test]
    fn test_content_type_with_boundary() {
        let ct = content_type(&headers(
            "Content-Type: Multipart/Mixed; boundary=\"----=_Part_1\"\n",
        ));
        assert_eq!(ct.media_type, "multipart/mixed");
        assert_eq!(ct.boundary(), Some("----=_Part_1"));
    }

    #[test]
    fn test_content_type_absent_uses_default() {
        let ct = content_type(&headers("Subject: hi\n"));
        assert_eq!(ct, ContentTypeInfo::default());
    }

    #[test]
    fn test_content_type_unparsable_uses_default() {
        let ct = content_type(&headers("Content-Type: not a media type\n"));
        assert_eq!(ct, ContentTypeInfo::default());
        let ct = content_type(&headers("Content-Type: text\n"));
        assert_eq!(ct, ContentTypeInfo::default());
    }

    #[test]
    fn test_parameters_are_lowercased_and_unquoted() {
        let ct = parse_media_type("text/plain; CHARSET=UTF-8; format=\"flowed\"").unwrap();
        assert_eq!(ct.media_type, "text/plain");
        assert_eq!(ct.param("charset"), Some("UTF-8"));
        assert_eq!(ct.param("format"), Some("flowed"));
    }

    #[test]
    fn test_quoted_parameter_with_semicolon_and_escape() {
        let ct = parse_media_type(r#"multipart/mixed; boundary="a;b\"c"; charset=x"#).unwrap();
        assert_eq!(ct.boundary(), Some("a;b\"c"));
        assert_eq!(ct.param("charset"), Some("x"));
    }

    #[test]
    fn test_malformed_parameter_is_skipped() {
        let ct = parse_media_type("multipart/alternative; junk; boundary=XYZ").unwrap();
        assert_eq!(ct.boundary(), Some("XYZ"));
    }

    #[test]
    fn test_unterminated_quote_drops_parameter() {
        let ct = parse_media_type("multipart/mixed; boundary=\"XYZ").unwrap();
        assert_eq!(ct.boundary(), None);
    }

    #[test]
    fn test_disposition_attachment() {
        let d = disposition(&headers(
            "Content-Disposition: ATTACHMENT; filename=\"report.pdf\"\n",
        ));
        assert!(d.is_attachment);
        assert_eq!(d.filename(), Some("report.pdf"));
    }

    #[test]
    fn test_disposition_inline_and_absent() {
        assert!(!disposition(&headers("Content-Disposition: inline\n")).is_attachment);
        assert!(!disposition(&headers("Subject: x\n")).is_attachment);
        assert!(!disposition(&headers("Content-Disposition: attachments\n")).is_attachment);
    }

    #[test]
    fn test_disposition_unparsable_is_inline() {
        assert!(!disposition(&headers("Content-Disposition: \"attachment\"\n")).is_attachment);
    }
}

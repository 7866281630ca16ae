//! RFC 5322 framing: header/body split, header unfolding and the typed header map.

use crate::error::{Mail2MatrixError, Result};

/// Header fields of a message or MIME part, in the order they were sent.
///
/// Names keep their original spelling; lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    fields: Vec<(String, String)>,
}

impl HeaderMap {
    /// Parse a header block (everything before the blank line).
    ///
    /// Continuation lines (starting with space or tab) are joined to the
    /// previous field with a single space. A line that is neither a field
    /// nor a continuation is a framing error.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let text = decode_header_bytes(raw);
        let mut fields: Vec<(String, String)> = Vec::new();

        for (idx, line) in text.lines().enumerate() {
            if line.is_empty() {
                // Only trailing blank lines can reach here (the caller slices
                // at the first blank line).
                continue;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                let Some(last) = fields.last_mut() else {
                    return Err(Mail2MatrixError::parse(format!(
                        "malformed initial header line: {line:?}"
                    )));
                };
                let cont = line.trim();
                if !cont.is_empty() {
                    if !last.1.is_empty() {
                        last.1.push(' ');
                    }
                    last.1.push_str(cont);
                }
                continue;
            }

            let Some((name, value)) = line.split_once(':') else {
                return Err(Mail2MatrixError::parse(format!(
                    "malformed header line {}: {line:?}",
                    idx + 1
                )));
            };
            if !is_valid_field_name(name) {
                return Err(Mail2MatrixError::parse(format!(
                    "invalid header name {name:?} on line {}",
                    idx + 1
                )));
            }
            fields.push((name.to_string(), value.trim().to_string()));
        }

        Ok(Self { fields })
    }

    /// First value of a header (case-insensitive name match).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A message split into its header map and undecoded body bytes.
#[derive(Debug)]
pub struct Framed<'a> {
    pub headers: HeaderMap,
    pub body: &'a [u8],
}

/// Split a raw RFC 5322 message into headers and body.
///
/// A leading UTF-8 BOM and an MBOX `From ` envelope line (as prepended by
/// some MTAs) are skipped. A message without a blank line is all headers and
/// has an empty body. Empty input is a framing error.
pub fn split_message(raw: &[u8]) -> Result<Framed<'_>> {
    let start = skip_envelope(raw);
    let data = &raw[start..];
    if data.is_empty() {
        return Err(Mail2MatrixError::parse("empty message"));
    }

    let (header_end, body_start) = find_header_end(data).unwrap_or((data.len(), data.len()));
    let headers = HeaderMap::parse(&data[..header_end])?;

    Ok(Framed {
        headers,
        body: &data[body_start..],
    })
}

/// Find where the header block ends.
///
/// Returns `(end of headers, start of body)`. A message that opens with a
/// blank line has no headers at all.
fn find_header_end(data: &[u8]) -> Option<(usize, usize)> {
    if data.starts_with(b"\r\n") {
        return Some((0, 2));
    }
    if data.starts_with(b"\n") {
        return Some((0, 1));
    }
    // Look for \n\n or \n\r\n
    for i in 0..data.len() {
        if data[i] != b'\n' {
            continue;
        }
        match data.get(i + 1..) {
            Some([b'\n', ..]) => return Some((i + 1, i + 2)),
            Some([b'\r', b'\n', ..]) => return Some((i + 1, i + 3)),
            _ => {}
        }
    }
    None
}

/// Offset past a leading BOM and MBOX `From ` separator line.
fn skip_envelope(data: &[u8]) -> usize {
    let mut pos = 0;
    if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        pos = 3;
    }
    if data[pos..].starts_with(b"From ") {
        if let Some(nl) = data[pos..].iter().position(|&b| b == b'\n') {
            return pos + nl + 1;
        }
    }
    pos
}

/// RFC 5322 field names are printable ASCII without spaces or colons.
fn is_valid_field_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_graphic() && b != b':')
}

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
fn decode_header_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_simple_message() {
        let raw = b"From: a@b.com\nSubject: Hi\n\nBody\n";
        let framed = split_message(raw).unwrap();
        assert_eq!(framed.headers.get("subject"), Some("Hi"));
        assert_eq!(framed.headers.get("FROM"), Some("a@b.com"));
        assert_eq!(framed.body, b"Body\n");
        assert_eq!(framed.headers.len(), 2);
    }

    #[test]
    fn test_split_crlf_message() {
        let raw = b"Subject: Hi\r\nX-Test: 1\r\n\r\nBody\r\n";
        let framed = split_message(raw).unwrap();
        assert_eq!(framed.headers.get("subject"), Some("Hi"));
        assert_eq!(framed.headers.get("x-test"), Some("1"));
        assert_eq!(framed.body, b"Body\r\n");
    }

    #[test]
    fn test_split_headerless_message() {
        let framed = split_message(b"\nhello\n").unwrap();
        assert!(framed.headers.is_empty());
        assert_eq!(framed.body, b"hello\n");
    }

    #[test]
    fn test_split_headers_only() {
        let framed = split_message(b"Subject: only headers\n").unwrap();
        assert_eq!(framed.headers.get("subject"), Some("only headers"));
        assert!(framed.body.is_empty());
    }

    #[test]
    fn test_split_skips_mbox_envelope() {
        let raw = b"From user@example.com Thu Jan 01 00:00:00 2024\nSubject: Test\n\nBody\n";
        let framed = split_message(raw).unwrap();
        assert_eq!(framed.headers.get("subject"), Some("Test"));
        assert_eq!(framed.headers.len(), 1);
        assert_eq!(framed.body, b"Body\n");
    }

    #[test]
    fn test_empty_message_is_parse_error() {
        assert!(matches!(
            split_message(b""),
            Err(Mail2MatrixError::Parse { .. })
        ));
    }

    #[test]
    fn test_line_without_colon_is_parse_error() {
        let err = split_message(b"hello\n").unwrap_err();
        assert!(err.to_string().contains("malformed header line"));
    }

    #[test]
    fn test_unfold_continuation_lines() {
        let raw = b"Subject: a long\n  subject line\n\tcontinued\nTo: x@y.z\n";
        let headers = HeaderMap::parse(raw).unwrap();
        assert_eq!(
            headers.get("subject"),
            Some("a long subject line continued")
        );
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_leading_continuation_is_parse_error() {
        assert!(HeaderMap::parse(b" folded\nSubject: x\n").is_err());
    }

    #[test]
    fn test_get_returns_first_duplicate() {
        let headers = HeaderMap::parse(b"Received: one\nReceived: two\n").unwrap();
        assert_eq!(headers.get("received"), Some("one"));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_latin1_header_bytes() {
        let headers = HeaderMap::parse(b"Subject: caf\xe9\n").unwrap();
        assert_eq!(headers.get("subject"), Some("café"));
    }
}

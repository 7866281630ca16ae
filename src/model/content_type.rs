//! Typed results of the Content Classifier.
//!
//! Header parameters are kept in a [`BTreeMap`] keyed by lower-cased
//! parameter name, so lookups never depend on the casing used by the sender.

use std::collections::BTreeMap;

/// Media type used when a message or part has no usable `Content-Type`
/// (RFC 2045 §5.2).
pub const DEFAULT_MEDIA_TYPE: &str = "text/plain";

/// Charset paired with [`DEFAULT_MEDIA_TYPE`].
pub const DEFAULT_CHARSET: &str = "us-ascii";

/// Parsed `Content-Type` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentTypeInfo {
    /// Lower-cased `type/subtype`, e.g. `"multipart/mixed"`.
    pub media_type: String,

    /// Parameters with lower-cased names and unquoted values.
    pub parameters: BTreeMap<String, String>,
}

impl ContentTypeInfo {
    pub fn new(media_type: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Look up a parameter by (case-insensitive) name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The `boundary` parameter, if present and non-empty.
    pub fn boundary(&self) -> Option<&str> {
        self.param("boundary").filter(|b| !b.is_empty())
    }

    /// `true` for any `multipart/*` media type.
    pub fn is_multipart(&self) -> bool {
        self.media_type.starts_with("multipart/")
    }

    /// `true` for any `text/*` media type.
    pub fn is_text(&self) -> bool {
        self.media_type.starts_with("text/")
    }

    /// The part after the `/`, or the empty string.
    pub fn subtype(&self) -> &str {
        self.media_type
            .split_once('/')
            .map(|(_, sub)| sub)
            .unwrap_or("")
    }
}

impl Default for ContentTypeInfo {
    fn default() -> Self {
        let mut parameters = BTreeMap::new();
        parameters.insert("charset".to_string(), DEFAULT_CHARSET.to_string());
        Self {
            media_type: DEFAULT_MEDIA_TYPE.to_string(),
            parameters,
        }
    }
}

/// Parsed `Content-Disposition` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispositionInfo {
    /// `true` only when the disposition type is `attachment`.
    pub is_attachment: bool,

    /// Disposition parameters (`filename`, `size`, ...). Empty unless
    /// `is_attachment` is set.
    pub parameters: BTreeMap<String, String>,
}

impl DispositionInfo {
    /// The `filename` parameter of an attachment.
    pub fn filename(&self) -> Option<&str> {
        self.parameters.get("filename").map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_rfc2045_plain_text() {
        let ct = ContentTypeInfo::default();
        assert_eq!(ct.media_type, "text/plain");
        assert_eq!(ct.param("charset"), Some("us-ascii"));
        assert!(ct.is_text());
        assert!(!ct.is_multipart());
    }

    #[test]
    fn test_param_lookup_is_case_insensitive() {
        let mut ct = ContentTypeInfo::new("multipart/mixed");
        ct.parameters
            .insert("boundary".to_string(), "XYZ".to_string());
        assert_eq!(ct.param("Boundary"), Some("XYZ"));
        assert_eq!(ct.boundary(), Some("XYZ"));
        assert_eq!(ct.subtype(), "mixed");
    }

    #[test]
    fn test_empty_boundary_is_missing() {
        let mut ct = ContentTypeInfo::new("multipart/mixed");
        ct.parameters.insert("boundary".to_string(), String::new());
        assert_eq!(ct.boundary(), None);
    }
}

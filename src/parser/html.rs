//! HTML Sanitizer: strict tag stripping, entity decoding, blank-line normalization.

use std::sync::LazyLock;

use regex::Regex;

/// Runs of two or more line breaks.
static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{2,}").expect("valid regex"));

/// Longest entity we try to decode on its own (`&CounterClockwiseContourIntegral;`).
const MAX_ENTITY_LEN: usize = 40;

/// Elements whose content is dropped together with the tags.
const SKIPPED_ELEMENTS: [&str; 2] = ["script", "style"];

/// Convert an HTML fragment or document to plain text.
///
/// - Removes every tag and attribute (no markup survives)
/// - Removes comments and the contents of `<script>` and `<style>`
/// - Decodes HTML entities
/// - Collapses every run of blank lines into a single blank line
///
/// Decoded text can spell markup or entities again (`&lt;b&gt;`,
/// `&amp;amp;`), so passes repeat until the text is stable and sanitizing
/// twice changes nothing. Never fails; text without markup passes through
/// with only entity and whitespace normalization applied.
pub fn sanitize(html: &str) -> String {
    let mut text = sanitize_pass(html);
    // Every pass that changes the text drops an `&` or shortens it
    loop {
        let next = sanitize_pass(&text);
        if next == text {
            return text;
        }
        text = next;
    }
}

fn sanitize_pass(html: &str) -> String {
    let stripped = strip_tags(html);
    let decoded = decode_entities(&stripped);
    fix_whitespace(&decoded)
}

/// Normalize line endings and collapse `\n\n+` to exactly `\n\n`.
pub fn fix_whitespace(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    BLANK_RUNS.replace_all(&text, "\n\n").into_owned()
}

/// Remove markup, keeping text content.
///
/// `<` only opens a tag when followed by a letter, `/`, `!` or `?`;
/// otherwise it is literal text (as in `a < b`).
fn strip_tags(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(lt) = rest.find('<') {
        result.push_str(&rest[..lt]);
        let tag = &rest[lt..];

        if tag.starts_with("<!--") {
            rest = match tag[4..].find("-->") {
                Some(end) => &tag[4 + end + 3..],
                None => "",
            };
            continue;
        }

        let opens_tag = tag[1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?'));
        if !opens_tag {
            result.push('<');
            rest = &tag[1..];
            continue;
        }

        let Some(gt) = find_tag_end(tag) else {
            // Unterminated tag: drop the rest of the input
            rest = "";
            break;
        };

        let name = tag_name(&tag[1..gt]);
        rest = &tag[gt + 1..];

        if let Some(skipped) = SKIPPED_ELEMENTS.iter().find(|e| name.eq_ignore_ascii_case(e)) {
            if !tag[..gt].ends_with('/') {
                rest = skip_element_content(rest, skipped);
            }
        }
    }

    result.push_str(rest);
    result
}

/// Index of the `>` closing a tag, ignoring `>` inside quoted attribute values.
fn find_tag_end(tag: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (idx, ch) in tag.char_indices().skip(1) {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '>') => return Some(idx),
            (None, _) => {}
        }
    }
    None
}

/// Element name of a tag body such as `script type="x"` or `/p`.
fn tag_name(inner: &str) -> &str {
    let inner = inner.trim_start_matches('/');
    let end = inner
        .find(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
        .unwrap_or(inner.len());
    &inner[..end]
}

/// Skip past the closing tag of `element`, or to the end of input.
fn skip_element_content<'a>(rest: &'a str, element: &str) -> &'a str {
    let lower = rest.to_ascii_lowercase();
    let close = format!("</{element}");
    match lower.find(&close) {
        Some(pos) => {
            let after = &rest[pos..];
            match find_tag_end(after) {
                Some(gt) => &after[gt + 1..],
                None => "",
            }
        }
        None => "",
    }
}

/// Decode HTML entities.
///
/// `htmlescape` rejects the whole input on the first malformed entity, so on
/// failure each `&...;` candidate is decoded on its own and anything that is
/// not a valid entity is kept literally.
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    if let Ok(decoded) = htmlescape::decode_html(text) {
        return decoded;
    }

    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        result.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        let decoded = candidate
            .find(';')
            .filter(|&semi| semi <= MAX_ENTITY_LEN)
            .and_then(|semi| {
                htmlescape::decode_html(&candidate[..=semi])
                    .ok()
                    .map(|s| (s, semi))
            });
        match decoded {
            Some((s, semi)) => {
                result.push_str(&s);
                rest = &candidate[semi + 1..];
            }
            None => {
                result.push('&');
                rest = &candidate[1..];
            }
        }
    }
    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_paragraph() {
        assert_eq!(
            sanitize("<p>this should be sanitized</p>"),
            "this should be sanitized"
        );
    }

    #[test]
    fn test_sanitize_strips_attributes() {
        let html = r#"<a href="http://x.test/?a=1&b=2" title="a > b">link</a> text"#;
        assert_eq!(sanitize(html), "link text");
    }

    #[test]
    fn test_sanitize_decodes_entities() {
        assert_eq!(sanitize("Tom &amp; Jerry &lt;3&gt; &#169; &#x41;"), "Tom & Jerry <3> © A");
    }

    #[test]
    fn test_sanitize_keeps_malformed_entities() {
        assert_eq!(sanitize("AT&T &amp; friends &bogus; end"), "AT&T & friends &bogus; end");
    }

    #[test]
    fn test_sanitize_removes_script_style_and_comments() {
        let html = "Before<script type=\"text/javascript\">alert('<b>x</b>')</script>\
                    <style>p { color: red }</style><!-- hidden -->After";
        assert_eq!(sanitize(html), "BeforeAfter");
    }

    #[test]
    fn test_sanitize_literal_less_than() {
        assert_eq!(sanitize("1 < 2 and 3 <= 4"), "1 < 2 and 3 <= 4");
    }

    #[test]
    fn test_sanitize_collapses_blank_lines() {
        let html = "<div>one</div>\n\n\n\n<div>two</div>\r\n\r\n\r\n<div>three</div>\n";
        assert_eq!(sanitize(html), "one\n\ntwo\n\nthree\n");
    }

    #[test]
    fn test_sanitize_keeps_single_newlines() {
        assert_eq!(sanitize("a<br>\nb\nc"), "a\nb\nc");
    }

    #[test]
    fn test_sanitize_decoded_markup_is_stripped() {
        assert_eq!(sanitize("&lt;b&gt;hi&lt;/b&gt;"), "hi");
        assert_eq!(sanitize("&amp;amp;"), "&");
        assert_eq!(sanitize("a &lt;!-- b"), "a ");
        assert_eq!(sanitize("&amp;lt;script&amp;gt;x&amp;lt;/script&amp;gt;y"), "y");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let fragments = [
            "&lt;b&gt;",
            "&amp;amp;",
            "&lt;!--",
            "&amp;lt;",
            "&#38;#60;",
            "<p>",
            "</p>",
            "<!-- c -->",
            "&bogus;",
            "AT&T",
            " < ",
            "\n\n\n",
            "\r\n\r\n",
            "&lt;script&gt;",
            "text",
        ];
        for a in fragments {
            for b in fragments {
                for c in fragments {
                    let input = format!("{a}{b}{c}");
                    let once = sanitize(&input);
                    assert_eq!(sanitize(&once), once, "not idempotent for {input:?}");
                }
            }
        }
    }

    #[test]
    fn test_sanitize_never_leaves_tags() {
        let out = sanitize("<div class='x'><span>a</span><img src=\"y.png\"/><br/></div>");
        assert!(!out.contains('<'));
        assert_eq!(out, "a");
    }

    #[test]
    fn test_fix_whitespace() {
        assert_eq!(fix_whitespace("a\n\n\n\nb\n\nc\nd"), "a\n\nb\n\nc\nd");
    }
}

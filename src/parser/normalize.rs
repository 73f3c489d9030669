//! Message body normalization: transport decoding, HTML-to-text conversion
//! and line cleanup.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;

/// Separator used to rebuild `raw_text` from the normalized lines.
pub const LINE_SEPARATOR: &str = "\n";

/// Prefix every notification document starts with (compared case-insensitively).
const HTML_MARKER: &str = "<!doctype html";

/// Lines made only of one of these are template debris, not content.
const QUOTE_MARKS: &[&str] = &["\"", "'", "\u{201c}", "\u{201d}", "\u{2018}", "\u{2019}"];

/// Tags whose boundaries start a new line of text.
const BLOCK_TAGS: &[&str] = &[
    "br", "p", "div", "tr", "td", "th", "table", "tbody", "thead", "li", "ul", "ol", "h1", "h2",
    "h3", "h4", "h5", "h6", "hr",
];

/// Standard alphabet, padding optional: message sources usually drop it.
const TRANSPORT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// An HTML notification reduced to its ordered text lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedContent {
    /// The decoded HTML document.
    pub html: String,
    /// Trimmed, non-empty lines in document order.
    pub lines: Vec<String>,
}

impl NormalizedContent {
    /// Lines re-joined with [`LINE_SEPARATOR`].
    pub fn raw_text(&self) -> String {
        self.lines.join(LINE_SEPARATOR)
    }
}

/// Decode a base64url body payload into trimmed text.
///
/// `-`/`_` are mapped back to `+`/`/` before a standard decode. Returns
/// `None` if the payload is not valid base64.
pub fn decode_transport(data: &str) -> Option<String> {
    let sanitized: String = data
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    let bytes = TRANSPORT.decode(sanitized.as_bytes()).ok()?;
    Some(String::from_utf8_lossy(&bytes).trim().to_string())
}

/// Encode a document the way message sources ship body parts.
pub fn encode_transport(content: &str) -> String {
    base64::engine::general_purpose::URL_SAFE.encode(content.as_bytes())
}

/// Whether the decoded content starts with an HTML document marker.
pub fn is_html_document(decoded: &str) -> bool {
    decoded
        .get(..HTML_MARKER.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(HTML_MARKER))
}

/// Normalize a decoded document into its line sequence.
///
/// Returns `None` when the content is not an HTML document; that is a
/// normal outcome for non-notification messages.
pub fn normalize(decoded: &str) -> Option<NormalizedContent> {
    if !is_html_document(decoded) {
        return None;
    }

    let text = html_to_text(decoded);
    Some(NormalizedContent {
        html: decoded.to_string(),
        lines: split_lines(&text),
    })
}

/// Split rendered text into trimmed lines, dropping blanks and stray quotes.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !QUOTE_MARKS.contains(line))
        .map(String::from)
        .collect()
}

/// Convert HTML to plain text, one block element per line.
///
/// - Removes `<head>`, `<script>` and `<style>` blocks and comments
/// - Block-level tags (`<p>`, `<tr>`, `<td>`, `<br>`, ...) become line breaks
/// - All other tags are dropped, their text kept inline
/// - Named and numeric character references are decoded
pub fn html_to_text(html: &str) -> String {
    // `</head>` is optional in HTML5; `<body` closes the head as well.
    let mut text = remove_tag_block(html, "head", Some("<body"));
    for tag in ["script", "style"] {
        text = remove_tag_block(&text, tag, None);
    }

    let mut result = String::with_capacity(text.len());
    let mut rest = text.as_str();

    while let Some(start) = rest.find('<') {
        result.push_str(&rest[..start]);
        let after = &rest[start..];

        if after.starts_with("<!--") {
            rest = match after.find("-->") {
                Some(end) => &after[end + 3..],
                None => "",
            };
            continue;
        }

        match after.find('>') {
            Some(end) => {
                if BLOCK_TAGS.contains(&tag_name(&after[1..end]).as_str()) {
                    result.push('\n');
                }
                rest = &after[end + 1..];
            }
            None => {
                // Unterminated tag: drop the remainder
                rest = "";
            }
        }
    }
    result.push_str(rest);

    decode_entities(&result)
}

/// Lowercased element name of a tag body such as `/td` or `br /`.
fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('/')
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Remove an entire tag block (e.g. `<script>…</script>`), case-insensitively.
///
/// Without a closing tag the block ends where `implied_end` opens (which is
/// kept). With neither, an `implied_end` block keeps the rest of the
/// document; any other block swallows it.
fn remove_tag_block(html: &str, tag: &str, implied_end: Option<&str>) -> String {
    let mut result = String::with_capacity(html.len());
    let mut remaining = html;
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    // ASCII lowercasing keeps byte offsets aligned with `remaining`.
    while let Some(start) = find_open_tag(&remaining.to_ascii_lowercase(), &open) {
        result.push_str(&remaining[..start]);
        let after = &remaining[start..];
        let after_lower = after.to_ascii_lowercase();
        if let Some(end) = after_lower.find(&close) {
            remaining = &after[end + close.len()..];
            continue;
        }
        match implied_end {
            Some(next) => {
                match find_open_tag(&after_lower[open.len()..], next) {
                    Some(pos) => remaining = &after[open.len() + pos..],
                    None => remaining = after.find('>').map_or("", |gt| &after[gt + 1..]),
                }
                // Keep what follows; nothing more to strip for this tag.
                break;
            }
            None => {
                remaining = "";
                break;
            }
        }
    }
    result.push_str(remaining);
    result
}

/// Find `<tag` followed by `>` or whitespace, so `<head` does not match `<header`.
fn find_open_tag(haystack: &str, open: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(open) {
        let at = from + pos;
        match haystack[at + open.len()..].chars().next() {
            Some(c) if c == '>' || c == '/' || c.is_whitespace() => return Some(at),
            None => return Some(at),
            _ => from = at + open.len(),
        }
    }
    None
}

/// Decode named (`&amp;`) and numeric (`&#7889;`, `&#x1ED1;`) character references.
fn decode_entities(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        result.push_str(&rest[..amp]);
        let after = &rest[amp..];

        let decoded = after
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&after[1..semi]).map(|ch| (ch, semi)));

        match decoded {
            Some((ch, semi)) => {
                result.push(ch);
                rest = &after[semi + 1..];
            }
            None => {
                result.push('&');
                rest = &after[1..];
            }
        }
    }
    result.push_str(rest);
    result
}

fn decode_entity(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return match char::from_u32(code)? {
            '\u{a0}' => Some(' '),
            ch => Some(ch),
        };
    }

    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => None,
    }
}

//! OFX header block and dialect autodetection.
//!
//! OFX 1.x files open with a block of `KEY:VALUE` lines before the SGML
//! body; OFX 2.x files carry the same keys as attributes of an
//! `<?OFX ...?>` processing instruction. Detection only ever looks at the
//! first [`AUTODETECT_PREFIX_LEN`] bytes.

use crate::Dialect;
use serde::Serialize;

/// Number of leading bytes inspected by [`detect_dialect`].
pub const AUTODETECT_PREFIX_LEN: usize = 4096;

/// Infer the dialect from the document prefix.
///
/// Returns `None` when the prefix carries no recognizable signature.
pub fn detect_dialect(bytes: &[u8]) -> Option<Dialect> {
    let text = String::from_utf8_lossy(prefix(bytes)).to_ascii_uppercase();
    let leading = text.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{feff}');

    if text.contains("<?OFX") || text.contains("OFXHEADER=\"200\"") {
        Some(Dialect::OfxXml)
    } else if text.contains("OFXHEADER:") {
        Some(Dialect::OfxSgml)
    } else if text.contains("<OFC>") {
        Some(Dialect::Ofc)
    } else if text.contains("<OFX>") {
        if leading.starts_with("<?XML") {
            Some(Dialect::OfxXml)
        } else {
            Some(Dialect::OfxSgml)
        }
    } else {
        None
    }
}

/// Byte offset of the SGML body, i.e. the first `<`.
pub fn body_start(bytes: &[u8]) -> usize {
    bytes.iter().position(|&b| b == b'<').unwrap_or(bytes.len())
}

fn prefix(bytes: &[u8]) -> &[u8] {
    &bytes[..bytes.len().min(AUTODETECT_PREFIX_LEN)]
}

/// Key/value pairs from the document header, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OfxHeader {
    pub fields: Vec<(String, String)>,
}

impl OfxHeader {
    /// Parse the header of either dialect.
    ///
    /// Returns `None` when the document has no header at all, which is
    /// legal for bare `<OFX>` bodies.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let text = String::from_utf8_lossy(prefix(bytes));
        let header = match find_ignore_case(&text, "<?OFX") {
            Some(start) => Self::parse_instruction(&text[start + 5..]),
            None => Self::parse_lines(&text[..body_start(text.as_bytes())]),
        };

        if header.fields.is_empty() {
            None
        } else {
            Some(header)
        }
    }

    fn parse_lines(block: &str) -> Self {
        let fields = block
            .lines()
            .filter_map(|line| line.split_once(':'))
            .map(|(key, value)| (key.trim().to_ascii_uppercase(), value.trim().to_string()))
            .filter(|(key, _)| !key.is_empty())
            .collect();
        OfxHeader { fields }
    }

    fn parse_instruction(rest: &str) -> Self {
        let body = match rest.find("?>") {
            Some(end) => &rest[..end],
            None => rest,
        };

        let mut fields = Vec::new();
        let mut remaining = body;
        while let Some(eq) = remaining.find('=') {
            let key = remaining[..eq].trim().to_ascii_uppercase();
            let after = remaining[eq + 1..].trim_start();
            let quote = match after.chars().next() {
                Some(q @ ('"' | '\'')) => q,
                _ => break,
            };
            let value_start = &after[1..];
            let Some(close) = value_start.find(quote) else {
                break;
            };
            fields.push((key, value_start[..close].to_string()));
            remaining = &value_start[close + 1..];
        }
        OfxHeader { fields }
    }

    /// Look up a header field; keys are matched case-insensitively.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn version(&self) -> Option<&str> {
        self.get("VERSION")
    }

    pub fn charset(&self) -> Option<&str> {
        self.get("CHARSET")
    }

    pub fn encoding(&self) -> Option<&str> {
        self.get("ENCODING")
    }
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .to_ascii_uppercase()
        .find(&needle.to_ascii_uppercase())
}

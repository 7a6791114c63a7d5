//! Byte stream to structural events.
//!
//! Two front ends feed the same [`Event`] type:
//!
//! - SGML (OFX 1.x and OFC): a byte lexer followed by the [`TagSoup`]
//!   normalizer, which infers the closing tags these files routinely omit.
//! - XML (OFX 2.x): `quick_xml`, which rejects mismatched end tags.
//!
//! Either way the aggregator downstream sees `Open`/`Text`/`Close` events
//! with every close matching the innermost open element.

use crate::aggregator::is_aggregate;
use crate::error::{Error, Result};
use crate::header::body_start;
use crate::Dialect;
use log::debug;
use quick_xml::events::Event as XmlEvent;
use quick_xml::Reader;
use std::borrow::Cow;
use std::collections::VecDeque;

/// A structural token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Open(String),
    Close(String),
    Text(String),
}

/// A token and the byte offset it was produced at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub offset: usize,
    pub token: Token,
}

impl Event {
    fn new(offset: usize, token: Token) -> Self {
        Event { offset, token }
    }
}

/// Lazy, single-pass event source for one document.
pub enum Tokenizer<'a> {
    Sgml(TagSoup<SgmlLexer<'a>>),
    Xml(XmlLexer<'a>),
}

impl<'a> Tokenizer<'a> {
    pub fn new(dialect: Dialect, input: &'a [u8]) -> Self {
        if dialect.is_sgml() {
            Tokenizer::Sgml(TagSoup::new(SgmlLexer::new(input)))
        } else {
            Tokenizer::Xml(XmlLexer::new(input))
        }
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Tokenizer::Sgml(tokens) => tokens.next(),
            Tokenizer::Xml(tokens) => tokens.next(),
        }
    }
}

/// Raw SGML lexer: tags and text exactly as written, no inference.
pub struct SgmlLexer<'a> {
    input: &'a [u8],
    pos: usize,
    pending_close: Option<Event>,
    done: bool,
}

impl<'a> SgmlLexer<'a> {
    /// Start lexing at the first `<`; the header block is not markup.
    pub fn new(input: &'a [u8]) -> Self {
        SgmlLexer {
            input,
            pos: body_start(input),
            pending_close: None,
            done: false,
        }
    }

    fn next_event(&mut self) -> Result<Option<Event>> {
        if let Some(event) = self.pending_close.take() {
            return Ok(Some(event));
        }

        while self.pos < self.input.len() {
            let start = self.pos;
            let event = if self.input[start] == b'<' {
                self.lex_markup(start)?
            } else {
                self.lex_text(start)?
            };
            if event.is_some() {
                return Ok(event);
            }
        }

        Ok(None)
    }

    fn lex_markup(&mut self, start: usize) -> Result<Option<Event>> {
        let rest = &self.input[start..];

        if rest.starts_with(b"<!--") {
            let end = find(rest, b"-->")
                .ok_or_else(|| Error::malformed(start, "unterminated comment"))?;
            self.pos = start + end + 3;
            return Ok(None);
        }
        if rest.starts_with(b"<!") || rest.starts_with(b"<?") {
            self.pos = self.scan_tag_end(start)? + 1;
            return Ok(None);
        }

        let closing = rest.get(1) == Some(&b'/');
        let end = self.scan_tag_end(start)?;
        let mut inner = &self.input[start + if closing { 2 } else { 1 }..end];

        let self_closing = !closing && inner.last() == Some(&b'/');
        if self_closing {
            inner = &inner[..inner.len() - 1];
        }

        let name_len = inner
            .iter()
            .position(|b| b.is_ascii_whitespace())
            .unwrap_or(inner.len());
        let name = &inner[..name_len];
        if !is_valid_name(name) {
            return Err(Error::malformed(
                start,
                format!("invalid tag name {:?}", String::from_utf8_lossy(name)),
            ));
        }

        let name = String::from_utf8_lossy(name).to_ascii_uppercase();
        self.pos = end + 1;

        if closing {
            return Ok(Some(Event::new(start, Token::Close(name))));
        }
        if self_closing {
            self.pending_close = Some(Event::new(start, Token::Close(name.clone())));
        }
        Ok(Some(Event::new(start, Token::Open(name))))
    }

    /// Position of the `>` ending the tag that starts at `start`.
    fn scan_tag_end(&self, start: usize) -> Result<usize> {
        let mut i = start + 1;
        while i < self.input.len() {
            match self.input[i] {
                b'>' => return Ok(i),
                b'<' => return Err(Error::malformed(start, "unterminated tag")),
                quote @ (b'"' | b'\'') => {
                    // A quoted value may not run past the next tag.
                    let close = self.input[i + 1..]
                        .iter()
                        .position(|&b| b == quote || b == b'<')
                        .map(|p| i + 1 + p);
                    match close {
                        Some(j) if self.input[j] == quote => i = j,
                        _ => return Err(Error::malformed(i, "unterminated quoted value")),
                    }
                }
                b if is_control(b) => return Err(Error::malformed(i, "unexpected control byte")),
                _ => {}
            }
            i += 1;
        }
        Err(Error::malformed(start, "unterminated tag"))
    }

    fn lex_text(&mut self, start: usize) -> Result<Option<Event>> {
        let end = self.input[start..]
            .iter()
            .position(|&b| b == b'<')
            .map_or(self.input.len(), |p| start + p);
        let raw = &self.input[start..end];

        if let Some(bad) = raw.iter().position(|&b| is_control(b)) {
            return Err(Error::malformed(start + bad, "unexpected control byte"));
        }
        self.pos = end;

        let bytes = decode_bytes(raw);
        let text = decode_entities(&bytes);
        let text = text.trim();
        if text.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Event::new(start, Token::Text(text.to_string()))))
        }
    }
}

impl Iterator for SgmlLexer<'_> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_event() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

struct OpenElement {
    name: String,
    has_text: bool,
    has_children: bool,
}

impl OpenElement {
    fn is_leaf(&self) -> bool {
        !self.has_children && (self.has_text || !is_aggregate(&self.name))
    }
}

/// Infers omitted closing tags.
///
/// An element with no child elements is a leaf when it received text or is
/// not a known aggregate; the next open tag closes it, so an empty `<MEMO>`
/// does not swallow its siblings. An explicit close tag closes everything opened after
/// the matching element. Close tags that match nothing are dropped, and
/// whatever is still open at end of input is closed.
pub struct TagSoup<I> {
    inner: I,
    open: Vec<OpenElement>,
    pending: VecDeque<Event>,
    last_offset: usize,
    done: bool,
}

impl<I> TagSoup<I>
where
    I: Iterator<Item = Result<Event>>,
{
    pub fn new(inner: I) -> Self {
        TagSoup {
            inner,
            open: Vec::new(),
            pending: VecDeque::new(),
            last_offset: 0,
            done: false,
        }
    }

    fn normalize(&mut self, event: Event) {
        let offset = event.offset;
        self.last_offset = offset;

        match event.token {
            Token::Open(name) => {
                self.close_leaf(offset);
                if let Some(parent) = self.open.last_mut() {
                    parent.has_children = true;
                }
                self.open.push(OpenElement {
                    name: name.clone(),
                    has_text: false,
                    has_children: false,
                });
                self.pending.push_back(Event::new(offset, Token::Open(name)));
            }
            Token::Text(text) => {
                if let Some(top) = self.open.last_mut() {
                    top.has_text = true;
                }
                self.pending.push_back(Event::new(offset, Token::Text(text)));
            }
            Token::Close(name) => match self.open.iter().rposition(|el| el.name == name) {
                Some(index) => {
                    while self.open.len() > index + 1 {
                        if let Some(el) = self.open.pop() {
                            debug!("implicitly closing <{}> before </{}>", el.name, name);
                            self.pending.push_back(Event::new(offset, Token::Close(el.name)));
                        }
                    }
                    self.open.pop();
                    self.pending.push_back(Event::new(offset, Token::Close(name)));
                }
                None => debug!("ignoring unmatched </{}> at byte {}", name, offset),
            },
        }
    }

    fn close_leaf(&mut self, offset: usize) {
        if self.open.last().is_some_and(OpenElement::is_leaf) {
            if let Some(el) = self.open.pop() {
                self.pending.push_back(Event::new(offset, Token::Close(el.name)));
            }
        }
    }

    fn close_all(&mut self) {
        while let Some(el) = self.open.pop() {
            if !el.is_leaf() {
                debug!("closing <{}> at end of input", el.name);
            }
            self.pending
                .push_back(Event::new(self.last_offset, Token::Close(el.name)));
        }
    }
}

impl<I> Iterator for TagSoup<I>
where
    I: Iterator<Item = Result<Event>>,
{
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            if self.done {
                return None;
            }
            match self.inner.next() {
                Some(Ok(event)) => self.normalize(event),
                Some(Err(err)) => {
                    self.done = true;
                    return Some(Err(err));
                }
                None => {
                    self.done = true;
                    self.close_all();
                }
            }
        }
    }
}

/// OFX 2.x front end over `quick_xml`.
pub struct XmlLexer<'a> {
    input: &'a [u8],
    reader: Reader<&'a [u8]>,
    pending: VecDeque<Event>,
    done: bool,
}

impl<'a> XmlLexer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        let mut reader = Reader::from_reader(input);
        reader.config_mut().trim_text(true);
        XmlLexer {
            input,
            reader,
            pending: VecDeque::new(),
            done: false,
        }
    }

    fn next_event(&mut self) -> Result<Option<Event>> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(Some(event));
        }

        loop {
            let offset = self.reader.buffer_position() as usize;
            let event = match self.reader.read_event() {
                Ok(event) => event,
                Err(err) => {
                    let at = self.reader.error_position() as usize;
                    return Err(Error::malformed(at, err.to_string()));
                }
            };

            // quick_xml passes control bytes through untouched.
            let end = (self.reader.buffer_position() as usize).min(self.input.len());
            if let Some(bad) = self.input[offset.min(end)..end]
                .iter()
                .position(|&b| is_control(b))
            {
                return Err(Error::malformed(offset + bad, "unexpected control byte"));
            }

            match event {
                XmlEvent::Start(e) => {
                    return Ok(Some(Event::new(offset, Token::Open(element_name(e.name().as_ref())))));
                }
                XmlEvent::End(e) => {
                    return Ok(Some(Event::new(offset, Token::Close(element_name(e.name().as_ref())))));
                }
                XmlEvent::Empty(e) => {
                    let name = element_name(e.name().as_ref());
                    self.pending
                        .push_back(Event::new(offset, Token::Close(name.clone())));
                    return Ok(Some(Event::new(offset, Token::Open(name))));
                }
                XmlEvent::Text(t) => {
                    let text = t
                        .unescape()
                        .map_err(|err| Error::malformed(offset, err.to_string()))?;
                    let text = text.trim();
                    if !text.is_empty() {
                        return Ok(Some(Event::new(offset, Token::Text(text.to_string()))));
                    }
                }
                XmlEvent::CData(c) => {
                    let raw = c.into_inner();
                    let text = String::from_utf8_lossy(&raw);
                    let text = text.trim();
                    if !text.is_empty() {
                        return Ok(Some(Event::new(offset, Token::Text(text.to_string()))));
                    }
                }
                XmlEvent::Eof => return Ok(None),
                _ => {}
            }
        }
    }
}

impl Iterator for XmlLexer<'_> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_event() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

fn element_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn is_valid_name(name: &[u8]) -> bool {
    match name.first() {
        Some(first) if first.is_ascii_alphabetic() => name
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_' | b':')),
        _ => false,
    }
}

/// Control bytes that never occur in a text document.
fn is_control(b: u8) -> bool {
    (b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0c)) || b == 0x7f
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// UTF-8 when valid, Latin-1 otherwise.
fn decode_bytes(raw: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(raw) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(raw.iter().map(|&b| b as char).collect()),
    }
}

fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| entity_char(&tail[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn entity_char(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let code = name.strip_prefix('#')?;
            let value = match code.strip_prefix(|c: char| c == 'x' || c == 'X') {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tokens(dialect: Dialect, input: &str) -> Vec<Token> {
        Tokenizer::new(dialect, input.as_bytes())
            .map(|event| event.map(|e| e.token))
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    fn open(name: &str) -> Token {
        Token::Open(name.to_string())
    }

    fn close(name: &str) -> Token {
        Token::Close(name.to_string())
    }

    fn text(value: &str) -> Token {
        Token::Text(value.to_string())
    }

    #[test]
    fn test_sgml_infers_leaf_closing() {
        let input = "OFXHEADER:100\nDATA:OFXSGML\n\n<STATUS>\n<CODE>0\n<SEVERITY>INFO\n</STATUS>\n";
        assert_eq!(
            tokens(Dialect::OfxSgml, input),
            vec![
                open("STATUS"),
                open("CODE"),
                text("0"),
                close("CODE"),
                open("SEVERITY"),
                text("INFO"),
                close("SEVERITY"),
                close("STATUS"),
            ]
        );
    }

    #[test]
    fn test_tag_soup_matches_fully_closed_document() {
        let soup = "<OFX><STMTTRN><TRNTYPE>DEBIT<TRNAMT>-20.00<MEMO>Coffee</STMTTRN>\
                    <STMTTRN><TRNTYPE>CREDIT</STMTTRN></OFX>";
        let closed = "<OFX><STMTTRN><TRNTYPE>DEBIT</TRNTYPE><TRNAMT>-20.00</TRNAMT>\
                      <MEMO>Coffee</MEMO></STMTTRN><STMTTRN><TRNTYPE>CREDIT</TRNTYPE>\
                      </STMTTRN></OFX>";
        assert_eq!(tokens(Dialect::OfxSgml, soup), tokens(Dialect::OfxSgml, closed));
        assert_eq!(tokens(Dialect::OfxSgml, closed), tokens(Dialect::OfxXml, closed));
    }

    #[test]
    fn test_unmatched_close_is_dropped_and_eof_closes_everything() {
        assert_eq!(
            tokens(Dialect::OfxSgml, "<OFX><NAME>Joe</BOGUS><MEMO>hi"),
            vec![
                open("OFX"),
                open("NAME"),
                text("Joe"),
                close("NAME"),
                open("MEMO"),
                text("hi"),
                close("MEMO"),
                close("OFX"),
            ]
        );
    }

    #[test]
    fn test_sgml_names_entities_and_comments() {
        let input = "<ofx><!-- generated --><NAME>Smith &amp; Sons &#65;&unknown</NAME><EMPTY/></ofx>";
        assert_eq!(
            tokens(Dialect::OfxSgml, input),
            vec![
                open("OFX"),
                open("NAME"),
                text("Smith & Sons A&unknown"),
                close("NAME"),
                open("EMPTY"),
                close("EMPTY"),
                close("OFX"),
            ]
        );
    }

    #[test]
    fn test_sgml_latin1_fallback() {
        let input = b"<NAME>Caf\xe9</NAME>";
        let tokens: Vec<Token> = Tokenizer::new(Dialect::OfxSgml, input)
            .map(|event| event.unwrap().token)
            .collect();
        assert_eq!(tokens[1], text("Café"));
    }

    #[test]
    fn test_unterminated_quote_reports_offset() {
        let input = "<OFX>\n<NAME id=\"abc>Joe\n<MEMO>x\n</OFX>";
        let quote = input.find('"').unwrap();
        let err = Tokenizer::new(Dialect::OfxSgml, input.as_bytes())
            .find_map(|event| event.err())
            .unwrap();
        assert_eq!(err.kind(), crate::ErrorKind::MalformedDocument);
        assert_eq!(err.offset(), Some(quote));
    }

    #[test]
    fn test_binary_garbage_is_malformed() {
        let input = b"<OFX><NAME>ab\x00\x01cd</NAME></OFX>";
        let err = Tokenizer::new(Dialect::OfxSgml, input)
            .find_map(|event| event.err())
            .unwrap();
        assert_eq!(err.offset(), Some(13));
    }

    #[test]
    fn test_unterminated_tag_is_malformed() {
        let err = Tokenizer::new(Dialect::OfxSgml, b"<OFX><STMTTRN")
            .find_map(|event| event.err())
            .unwrap();
        assert_eq!(err.offset(), Some(5));

        let err = Tokenizer::new(Dialect::OfxSgml, b"<OFX>< 5>")
            .find_map(|event| event.err())
            .unwrap();
        assert_eq!(err.offset(), Some(5));
    }

    #[test]
    fn test_error_ends_the_stream() {
        let mut tokens = Tokenizer::new(Dialect::OfxSgml, b"<OFX><NAME a=\"x>");
        assert!(matches!(tokens.next(), Some(Ok(_))));
        assert!(matches!(tokens.next(), Some(Err(_))));
        assert!(tokens.next().is_none());
    }

    #[test]
    fn test_xml_tokens() {
        let input = "<?xml version=\"1.0\"?>\n<?OFX OFXHEADER=\"200\"?>\n\
                     <OFX>\n  <NAME>A &amp; B</NAME>\n  <MEMO/>\n</OFX>";
        assert_eq!(
            tokens(Dialect::OfxXml, input),
            vec![
                open("OFX"),
                open("NAME"),
                text("A & B"),
                close("NAME"),
                open("MEMO"),
                close("MEMO"),
                close("OFX"),
            ]
        );
    }

    #[test]
    fn test_xml_binary_garbage_is_malformed() {
        let input = b"<OFX><NAME>ab\x00\x01cd</NAME></OFX>";
        let err = Tokenizer::new(Dialect::OfxXml, input)
            .find_map(|event| event.err())
            .unwrap();
        assert_eq!(err.kind(), crate::ErrorKind::MalformedDocument);
        assert_eq!(err.offset(), Some(13));
    }

    #[test]
    fn test_empty_leaf_does_not_swallow_siblings() {
        let soup = "<OFX><BANKACCTFROM><BANKID>1<BRANCHID><ACCTID>2<ACCTTYPE>CHECKING\
                    </BANKACCTFROM><STMTTRN><MEMO><TRNAMT>0.00</STMTTRN></OFX>";
        let closed = "<OFX><BANKACCTFROM><BANKID>1</BANKID><BRANCHID></BRANCHID>\
                      <ACCTID>2</ACCTID><ACCTTYPE>CHECKING</ACCTTYPE></BANKACCTFROM>\
                      <STMTTRN><MEMO></MEMO><TRNAMT>0.00</TRNAMT></STMTTRN></OFX>";
        assert_eq!(tokens(Dialect::OfxSgml, soup), tokens(Dialect::OfxSgml, closed));
        assert_eq!(tokens(Dialect::OfxSgml, closed), tokens(Dialect::OfxXml, closed));
        assert_eq!(
            tokens(Dialect::OfxSgml, "<OFX><MEMO><NAME>x</OFX>"),
            vec![
                open("OFX"),
                open("MEMO"),
                close("MEMO"),
                open("NAME"),
                text("x"),
                close("NAME"),
                close("OFX"),
            ]
        );
    }

    #[test]
    fn test_xml_mismatched_close_is_malformed() {
        let err = Tokenizer::new(Dialect::OfxXml, b"<OFX><CODE>0</OFX>")
            .find_map(|event| event.err())
            .unwrap();
        assert_eq!(err.kind(), crate::ErrorKind::MalformedDocument);
    }
}

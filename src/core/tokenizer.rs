//! XML Tokenizer - State machine for XML token extraction
//!
//! Implements a pull-parser style tokenizer that extracts XML tokens:
//! - Element start/end tags
//! - Text content (entities decoded)
//! - CDATA sections
//! - Comments
//! - Processing instructions and the XML declaration
//! - DOCTYPE declarations (kept raw)
//!
//! Every well-formedness violation the tokenizer can see locally is reported
//! as a `ParseError`; nesting rules are checked by the reader above it.

use super::attributes::is_qname;
use super::entities::{decode_text, UnknownEntity};
use super::scanner::{is_whitespace, Scanner};
use crate::error::{ParseError, ParseErrorCode};
use std::borrow::Cow;

/// Current parsing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// Initial state before parsing starts
    Init,
    /// Between markup constructs
    Content,
    /// End of input reached or an error was returned
    Done,
}

/// Type of XML token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Element start tag: <element>
    StartTag,
    /// Element end tag: </element>
    EndTag,
    /// Empty element: <element/>
    EmptyTag,
    /// Text content
    Text,
    /// CDATA section: <![CDATA[...]]>
    CData,
    /// Comment: <!--...-->
    Comment,
    /// Processing instruction: <?target ...?>
    ProcessingInstruction,
    /// XML declaration: <?xml ...?>
    XmlDeclaration,
    /// DOCTYPE declaration
    DocType,
    /// End of file
    Eof,
}

/// A parsed XML token
#[derive(Debug, Clone)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Raw span in input (start, end)
    pub span: (usize, usize),
    /// Tag name, PI target or DOCTYPE root name
    pub name: Option<&'a str>,
    /// Text and CDATA content, comment body, PI data, raw attribute list of
    /// a start tag, or the DOCTYPE remainder after the name
    pub content: Option<Cow<'a, str>>,
    /// Offset of the first content byte, used to report errors inside it
    pub content_start: usize,
}

impl<'a> Token<'a> {
    fn new(kind: TokenKind, span: (usize, usize)) -> Self {
        Token {
            kind,
            span,
            name: None,
            content: None,
            content_start: span.0,
        }
    }

    fn with_name(mut self, name: &'a str) -> Self {
        self.name = Some(name);
        self
    }

    fn with_content(mut self, content: impl Into<Cow<'a, str>>, start: usize) -> Self {
        self.content = Some(content.into());
        self.content_start = start;
        self
    }
}

/// XML tokenizer implementing a pull-parser pattern
pub struct Tokenizer<'a> {
    scanner: Scanner<'a>,
    state: ParseState,
    saw_doctype: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Tokenizer {
            scanner: Scanner::new(input),
            state: ParseState::Init,
            saw_doctype: false,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn position(&self) -> usize {
        self.scanner.position()
    }

    /// How references to non-predefined entities are treated. A DOCTYPE may
    /// declare them, so once one is seen they are passed through verbatim.
    pub fn unknown_entities(&self) -> UnknownEntity {
        if self.saw_doctype {
            UnknownEntity::Keep
        } else {
            UnknownEntity::Reject
        }
    }

    pub fn next_token(&mut self) -> Result<Token<'a>, ParseError> {
        let result = self.read_token();
        if !matches!(result, Ok(Token { kind: TokenKind::Eof, .. }) | Err(_)) {
            return result;
        }
        self.state = ParseState::Done;
        result
    }

    fn read_token(&mut self) -> Result<Token<'a>, ParseError> {
        let at_start = self.state == ParseState::Init;
        self.state = ParseState::Content;

        let pos = self.scanner.position();
        match self.scanner.peek() {
            None => Ok(Token::new(TokenKind::Eof, (pos, pos))),
            Some(b'<') => self.parse_markup(at_start),
            Some(_) => self.parse_text(),
        }
    }

    fn error(&self, code: ParseErrorCode, message: impl Into<String>, position: usize) -> ParseError {
        ParseError::new(code, message, position)
    }

    /// Parse markup starting with '<'
    fn parse_markup(&mut self, at_start: bool) -> Result<Token<'a>, ParseError> {
        let start = self.scanner.position();
        self.scanner.advance(1); // Skip '<'

        match self.scanner.peek() {
            Some(b'/') => self.parse_end_tag(start),
            Some(b'!') => self.parse_bang_markup(start),
            Some(b'?') => self.parse_pi(start, at_start),
            _ => self.parse_start_tag(start),
        }
    }

    /// Parse a start tag or empty element tag
    fn parse_start_tag(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        let name = self.scanner.read_name().ok_or_else(|| {
            self.error(ParseErrorCode::NameRequired, "StartTag: invalid element name", start)
        })?;
        if !is_qname(name) {
            return Err(self.error(
                ParseErrorCode::NameRequired,
                format!("Failed to parse QName '{}'", name),
                start,
            ));
        }
        let attrs_start = self.scanner.position();

        let end = self.scanner.find_tag_end_quoted().ok_or_else(|| {
            self.error(
                ParseErrorCode::GtRequired,
                format!("Couldn't find end of Start Tag {}", name),
                start,
            )
        })?;

        let is_empty = end > attrs_start && self.scanner.slice(end - 1, end) == "/";
        let attrs_end = if is_empty { end - 1 } else { end };

        self.scanner.set_position(end + 1);

        let kind = if is_empty { TokenKind::EmptyTag } else { TokenKind::StartTag };
        Ok(Token::new(kind, (start, end + 1))
            .with_name(name)
            .with_content(self.scanner.slice(attrs_start, attrs_end), attrs_start))
    }

    /// Parse an end tag
    fn parse_end_tag(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(1); // Skip '/'

        let name = self.scanner.read_name().ok_or_else(|| {
            self.error(ParseErrorCode::NameRequired, "EndTag: '</' not followed by a name", start)
        })?;

        self.scanner.skip_whitespace();
        if self.scanner.peek() != Some(b'>') {
            return Err(self.error(
                ParseErrorCode::GtRequired,
                format!("expected '>' to close end tag {}", name),
                self.scanner.position(),
            ));
        }
        self.scanner.advance(1);

        Ok(Token::new(TokenKind::EndTag, (start, self.scanner.position())).with_name(name))
    }

    /// Parse markup starting with '!' (comment, CDATA, DOCTYPE)
    fn parse_bang_markup(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(1); // Skip '!'

        if self.scanner.starts_with(b"--") {
            self.parse_comment(start)
        } else if self.scanner.starts_with(b"[CDATA[") {
            self.parse_cdata(start)
        } else if self.scanner.starts_with(b"DOCTYPE") {
            self.parse_doctype(start)
        } else {
            Err(self.error(
                ParseErrorCode::NameRequired,
                "Invalid declaration: expected comment, CDATA or DOCTYPE",
                start,
            ))
        }
    }

    /// Parse a comment <!--...-->
    fn parse_comment(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(2); // Skip '--'
        let content_start = self.scanner.position();

        let end = self.scanner.find_seq(b"-->").ok_or_else(|| {
            self.error(ParseErrorCode::CommentNotFinished, "Comment not terminated", start)
        })?;
        let content = self.scanner.slice(content_start, end);

        if let Some(i) = content.find("--") {
            return Err(self.error(
                ParseErrorCode::HyphenInComment,
                "Double hyphen within comment",
                content_start + i,
            ));
        }
        if content.ends_with('-') {
            return Err(self.error(ParseErrorCode::HyphenInComment, "Comment ends with '-'", end - 1));
        }

        self.scanner.set_position(end + 3);
        Ok(Token::new(TokenKind::Comment, (start, end + 3)).with_content(content, content_start))
    }

    /// Parse a CDATA section <![CDATA[...]]>
    fn parse_cdata(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(7); // Skip '[CDATA['
        let content_start = self.scanner.position();

        let end = self.scanner.find_seq(b"]]>").ok_or_else(|| {
            self.error(ParseErrorCode::CdataNotFinished, "CData section not finished", start)
        })?;

        self.scanner.set_position(end + 3);
        Ok(Token::new(TokenKind::CData, (start, end + 3)).with_content(self.scanner.slice(content_start, end), content_start))
    }

    /// Parse a DOCTYPE declaration. The internal subset is skipped as raw
    /// text, honouring quotes and brackets, and kept for pass-through.
    fn parse_doctype(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(7); // Skip 'DOCTYPE'
        if self.scanner.skip_whitespace() == 0 {
            return Err(self.error(
                ParseErrorCode::DoctypeNotFinished,
                "Space required after 'DOCTYPE'",
                self.scanner.position(),
            ));
        }

        let name = self.scanner.read_name().ok_or_else(|| {
            self.error(ParseErrorCode::NameRequired, "DOCTYPE: name expected", self.scanner.position())
        })?;

        let rest_start = self.scanner.position();
        let rest = self.scanner.rest().as_bytes();
        let mut quote: Option<u8> = None;
        let mut depth = 0usize;
        let mut end = None;
        for (i, &b) in rest.iter().enumerate() {
            match (quote, b) {
                (Some(q), _) if q == b => quote = None,
                (Some(_), _) => {}
                (None, b'"' | b'\'') => quote = Some(b),
                (None, b'[') => depth += 1,
                (None, b']') => depth = depth.saturating_sub(1),
                (None, b'>') if depth == 0 => {
                    end = Some(rest_start + i);
                    break;
                }
                _ => {}
            }
        }
        let end = end.ok_or_else(|| {
            self.error(ParseErrorCode::DoctypeNotFinished, "DOCTYPE improperly terminated", start)
        })?;

        self.saw_doctype = true;
        self.scanner.set_position(end + 1);

        let token = Token::new(TokenKind::DocType, (start, end + 1)).with_name(name);
        let body = self.scanner.slice(rest_start, end).trim();
        Ok(if body.is_empty() { token } else { token.with_content(body, rest_start) })
    }

    /// Parse a processing instruction or, at the very start, the XML declaration
    fn parse_pi(&mut self, start: usize, at_start: bool) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(1); // Skip '?'

        let target = self.scanner.read_name().ok_or_else(|| {
            self.error(
                ParseErrorCode::PiNotFinished,
                "xmlParsePI : no target name",
                start,
            )
        })?;

        let is_xml_decl = target.eq_ignore_ascii_case("xml");
        if is_xml_decl && !(at_start && start == 0 && target == "xml") {
            return Err(self.error(
                ParseErrorCode::ReservedXmlName,
                "XML declaration allowed only at the start of the document",
                start,
            ));
        }

        let had_space = self.scanner.skip_whitespace() > 0;
        let data_start = self.scanner.position();
        let end = self.scanner.find_seq(b"?>").ok_or_else(|| {
            let code = if is_xml_decl {
                ParseErrorCode::XmlDeclNotFinished
            } else {
                ParseErrorCode::PiNotFinished
            };
            self.error(code, format!("PI {} never end ...", target), start)
        })?;
        if !had_space && end != data_start {
            return Err(self.error(
                ParseErrorCode::PiNotFinished,
                "ParsePI: PI target space expected",
                data_start,
            ));
        }

        self.scanner.set_position(end + 2);

        let kind = if is_xml_decl {
            TokenKind::XmlDeclaration
        } else {
            TokenKind::ProcessingInstruction
        };
        let token = Token::new(kind, (start, end + 2)).with_name(target);
        Ok(if end == data_start {
            token
        } else {
            token.with_content(self.scanner.slice(data_start, end), data_start)
        })
    }

    /// Parse text content up to the next '<'
    fn parse_text(&mut self) -> Result<Token<'a>, ParseError> {
        let start = self.scanner.position();
        let end = self.scanner.find_tag_start().unwrap_or(self.scanner.len());
        let content = self.scanner.slice(start, end);

        if let Some(i) = content.find("]]>") {
            return Err(self.error(
                ParseErrorCode::MisplacedCdataEnd,
                "Sequence ']]>' not allowed in content",
                start + i,
            ));
        }

        let decoded = decode_text(content, start, self.unknown_entities())?;
        self.scanner.set_position(end);

        Ok(Token::new(TokenKind::Text, (start, end)).with_content(decoded, start))
    }
}

/// Iterator adapter for tokenizer. Stops after `Eof` or the first error.
impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<Token<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == ParseState::Done {
            return None;
        }
        match self.next_token() {
            Ok(token) if token.kind == TokenKind::Eof => None,
            other => Some(other),
        }
    }
}

/// True if `s` is made only of XML whitespace.
#[inline]
pub fn is_blank(s: &str) -> bool {
    s.bytes().all(is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Tokenizer::new(input).map(|t| t.unwrap().kind).collect()
    }

    #[test]
    fn test_simple_element() {
        let mut tok = Tokenizer::new("<root>content</root>");

        let t1 = tok.next_token().unwrap();
        assert_eq!(t1.kind, TokenKind::StartTag);
        assert_eq!(t1.name, Some("root"));

        let t2 = tok.next_token().unwrap();
        assert_eq!(t2.kind, TokenKind::Text);
        assert_eq!(t2.content.as_deref(), Some("content"));

        let t3 = tok.next_token().unwrap();
        assert_eq!(t3.kind, TokenKind::EndTag);
        assert_eq!(t3.name, Some("root"));

        assert_eq!(tok.next_token().unwrap().kind, TokenKind::Eof);
        assert_eq!(tok.state(), ParseState::Done);
    }

    #[test]
    fn test_empty_element() {
        let mut tok = Tokenizer::new("<br a='/'/>");
        let t = tok.next_token().unwrap();
        assert_eq!(t.kind, TokenKind::EmptyTag);
        assert_eq!(t.name, Some("br"));
        assert_eq!(t.content.as_deref(), Some(" a='/'"));
    }

    #[test]
    fn test_cdata() {
        let mut tok = Tokenizer::new("<![CDATA[<script>code</script>]]>");
        let t = tok.next_token().unwrap();
        assert_eq!(t.kind, TokenKind::CData);
        assert_eq!(t.content.as_deref(), Some("<script>code</script>"));
    }

    #[test]
    fn test_comment() {
        let mut tok = Tokenizer::new("<!-- comment -->");
        let t = tok.next_token().unwrap();
        assert_eq!(t.kind, TokenKind::Comment);
        assert_eq!(t.content.as_deref(), Some(" comment "));
    }

    #[test]
    fn test_comment_double_hyphen() {
        let err = Tokenizer::new("<!-- a -- b -->").next_token().unwrap_err();
        assert_eq!(err.code, ParseErrorCode::HyphenInComment);
        assert_eq!(err.position, 7);
    }

    #[test]
    fn test_unterminated_constructs() {
        let cases = [
            ("<!-- open", ParseErrorCode::CommentNotFinished),
            ("<![CDATA[ open", ParseErrorCode::CdataNotFinished),
            ("<?pi open", ParseErrorCode::PiNotFinished),
            ("<a x='1'", ParseErrorCode::GtRequired),
            ("<!DOCTYPE a [", ParseErrorCode::DoctypeNotFinished),
        ];
        for (input, code) in cases {
            let err = Tokenizer::new(input).next_token().unwrap_err();
            assert_eq!(err.code, code, "input: {}", input);
        }
    }

    #[test]
    fn test_processing_instruction_data() {
        let mut tok = Tokenizer::new("<?qux quux=\"quuux\"?>");
        let t = tok.next_token().unwrap();
        assert_eq!(t.kind, TokenKind::ProcessingInstruction);
        assert_eq!(t.name, Some("qux"));
        assert_eq!(t.content.as_deref(), Some("quux=\"quuux\""));

        let t = Tokenizer::new("<?bare?>").next_token().unwrap();
        assert_eq!(t.name, Some("bare"));
        assert!(t.content.is_none());
    }

    #[test]
    fn test_xml_declaration_only_at_start() {
        let t = Tokenizer::new("<?xml version=\"1.0\"?><r/>").next_token().unwrap();
        assert_eq!(t.kind, TokenKind::XmlDeclaration);

        let mut tok = Tokenizer::new(" <?xml version=\"1.0\"?><r/>");
        assert_eq!(tok.next_token().unwrap().kind, TokenKind::Text);
        let err = tok.next_token().unwrap_err();
        assert_eq!(err.code, ParseErrorCode::ReservedXmlName);
    }

    #[test]
    fn test_doctype_with_internal_subset() {
        let input = "<!DOCTYPE note [<!ENTITY w \"]>\">]><note/>";
        let mut tok = Tokenizer::new(input);
        let t = tok.next_token().unwrap();
        assert_eq!(t.kind, TokenKind::DocType);
        assert_eq!(t.name, Some("note"));
        assert_eq!(t.content.as_deref(), Some("[<!ENTITY w \"]>\">]"));
        assert_eq!(tok.unknown_entities(), UnknownEntity::Keep);
        assert_eq!(tok.next_token().unwrap().kind, TokenKind::EmptyTag);
    }

    #[test]
    fn test_text_entities_decoded() {
        let t = Tokenizer::new("a &lt; b").next_token().unwrap();
        assert_eq!(t.content.as_deref(), Some("a < b"));
    }

    #[test]
    fn test_cdata_end_in_text() {
        let mut tok = Tokenizer::new("<a>x]]>y</a>");
        tok.next_token().unwrap();
        let err = tok.next_token().unwrap_err();
        assert_eq!(err.code, ParseErrorCode::MisplacedCdataEnd);
        assert_eq!(err.position, 4);
    }

    #[test]
    fn test_iterator_sequence() {
        assert_eq!(
            kinds("<?p?><!--c--><a>t<![CDATA[d]]></a>"),
            vec![
                TokenKind::ProcessingInstruction,
                TokenKind::Comment,
                TokenKind::StartTag,
                TokenKind::Text,
                TokenKind::CData,
                TokenKind::EndTag,
            ]
        );
    }

    #[test]
    fn test_end_tag_with_garbage() {
        let mut tok = Tokenizer::new("<a></a b>");
        tok.next_token().unwrap();
        let err = tok.next_token().unwrap_err();
        assert_eq!(err.code, ParseErrorCode::GtRequired);
    }
}

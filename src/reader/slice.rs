//! Zero-Copy Slice Reader
//!
//! Turns tokenizer output into events. Names and unescaped content borrow
//! the input directly.

use super::events::{EndElement, StartElement, XmlEvent};
use crate::core::attributes::parse_attributes;
use crate::core::tokenizer::{ParseState, Token, TokenKind, Tokenizer};
use crate::error::{ParseError, ParseErrorCode};
use std::borrow::Cow;

/// Zero-copy XML reader over a validated string
pub struct SliceReader<'a> {
    tokenizer: Tokenizer<'a>,
    last_span: (usize, usize),
}

impl<'a> SliceReader<'a> {
    pub fn new(input: &'a str) -> Self {
        SliceReader {
            tokenizer: Tokenizer::new(input),
            last_span: (0, 0),
        }
    }

    /// Byte span of the markup behind the most recent event
    pub fn last_span(&self) -> (usize, usize) {
        self.last_span
    }

    /// Get the next XML event
    pub fn next_event(&mut self) -> Result<XmlEvent<'a>, ParseError> {
        let token = self.tokenizer.next_token()?;
        self.last_span = token.span;

        let event = match token.kind {
            TokenKind::Eof => XmlEvent::EndDocument,
            TokenKind::StartTag => XmlEvent::StartElement(self.start_element(token)?),
            TokenKind::EmptyTag => XmlEvent::EmptyElement(self.start_element(token)?),
            TokenKind::EndTag => XmlEvent::EndElement(EndElement::new(token.name.unwrap_or_default())),
            TokenKind::Text => XmlEvent::Text(token.content.unwrap_or_default()),
            TokenKind::CData => XmlEvent::CData(token.content.unwrap_or_default()),
            TokenKind::Comment => XmlEvent::Comment(token.content.unwrap_or_default()),
            TokenKind::ProcessingInstruction => XmlEvent::ProcessingInstruction {
                target: token.name.unwrap_or_default(),
                data: token.content,
            },
            TokenKind::XmlDeclaration => self.xml_declaration(token)?,
            TokenKind::DocType => XmlEvent::DocType {
                name: token.name.unwrap_or_default(),
                body: token.content,
            },
        };
        Ok(event)
    }

    fn start_element(&self, token: Token<'a>) -> Result<StartElement<'a>, ParseError> {
        let name = token.name.unwrap_or_default();
        let attrs = match token.content {
            Some(Cow::Borrowed(raw)) => parse_attributes(raw, token.content_start, self.tokenizer.unknown_entities())?,
            _ => Vec::new(),
        };
        Ok(StartElement::new(name, attrs))
    }

    fn xml_declaration(&self, token: Token<'a>) -> Result<XmlEvent<'a>, ParseError> {
        let start = token.span.0;
        let decl_err = |message: &str| ParseError::new(ParseErrorCode::XmlDeclNotFinished, message, start);

        // Pseudo-attributes share the attribute grammar.
        let attrs = match token.content {
            Some(Cow::Borrowed(raw)) => parse_attributes(raw, token.content_start, self.tokenizer.unknown_entities())?,
            _ => Vec::new(),
        };

        let mut version = None;
        let mut encoding = None;
        let mut standalone = None;
        for attr in attrs {
            match attr.name {
                "version" => version = Some(attr.value),
                "encoding" => encoding = Some(attr.value),
                "standalone" => {
                    standalone = Some(match attr.value.as_ref() {
                        "yes" => true,
                        "no" => false,
                        _ => return Err(decl_err("standalone accepts only 'yes' or 'no'")),
                    })
                }
                _ => return Err(decl_err("Unsupported pseudo-attribute in XML declaration")),
            }
        }

        let version = version.ok_or_else(|| decl_err("Malformed declaration expecting version"))?;
        Ok(XmlEvent::XmlDeclaration {
            version,
            encoding,
            standalone,
        })
    }
}

impl<'a> Iterator for SliceReader<'a> {
    type Item = Result<XmlEvent<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.tokenizer.state() == ParseState::Done {
            return None;
        }
        match self.next_event() {
            Ok(XmlEvent::EndDocument) => None,
            other => Some(other),
        }
    }
}

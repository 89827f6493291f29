//! XML Attribute Parsing
//!
//! Parses the attribute list of a start tag.

use super::entities::{decode_attribute, UnknownEntity};
use super::scanner::{is_name_char, is_name_start_char, is_whitespace};
use crate::error::{ParseError, ParseErrorCode};
use memchr::memchr;
use std::borrow::Cow;

/// A parsed XML attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    /// Attribute name (may include namespace prefix)
    pub name: &'a str,
    /// Attribute value (entities decoded, whitespace normalised)
    pub value: Cow<'a, str>,
    /// Local name (after colon, if namespaced)
    pub local_name: &'a str,
    /// Namespace prefix (before colon), if any
    pub prefix: Option<&'a str>,
}

impl<'a> Attribute<'a> {
    pub fn new(name: &'a str, value: Cow<'a, str>) -> Self {
        let (prefix, local_name) = split_name(name);
        Attribute {
            name,
            value,
            local_name,
            prefix,
        }
    }

    /// Namespace declaration carried by this attribute: `Some(None)` for
    /// `xmlns`, `Some(Some(p))` for `xmlns:p`, `None` otherwise.
    pub fn namespace_declaration(&self) -> Option<Option<&'a str>> {
        match self.prefix {
            None if self.name == "xmlns" => Some(None),
            Some("xmlns") => Some(Some(self.local_name)),
            _ => None,
        }
    }
}

/// A name with a colon needs a non-empty prefix and local part
pub fn is_qname(name: &str) -> bool {
    match memchr(b':', name.as_bytes()) {
        Some(colon) => colon > 0 && colon + 1 < name.len(),
        None => true,
    }
}

/// Split a qualified name into prefix and local name at the colon
pub fn split_name(name: &str) -> (Option<&str>, &str) {
    match memchr(b':', name.as_bytes()) {
        Some(colon) if colon > 0 && colon + 1 < name.len() => (Some(&name[..colon]), &name[colon + 1..]),
        _ => (None, name),
    }
}

/// Parse attributes from raw tag content (after the element name, before
/// '>' or '/>'). Whitespace is required between attributes but not before
/// the first one. `offset` is where `input` starts in the document.
pub fn parse_attributes(input: &str, offset: usize, unknown: UnknownEntity) -> Result<Vec<Attribute<'_>>, ParseError> {
    let bytes = input.as_bytes();
    let mut attrs: Vec<Attribute<'_>> = Vec::new();
    let mut pos = 0;

    let err = |code, message: &str, at: usize| ParseError::new(code, message, offset + at);

    loop {
        let ws_start = pos;
        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }
        if pos == ws_start && !attrs.is_empty() {
            return Err(err(ParseErrorCode::AttributeWithoutValue, "attributes construct error", pos));
        }

        // Parse attribute name
        let name_start = pos;
        if !is_name_start_char(bytes[pos]) {
            return Err(err(ParseErrorCode::NameRequired, "error parsing attribute name", pos));
        }
        pos += 1;
        while pos < bytes.len() && is_name_char(bytes[pos]) {
            pos += 1;
        }
        let name = &input[name_start..pos];
        if !is_qname(name) {
            return Err(ParseError::new(
                ParseErrorCode::NameRequired,
                format!("Failed to parse QName '{}'", name),
                offset + name_start,
            ));
        }

        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }
        if bytes.get(pos) != Some(&b'=') {
            return Err(ParseError::new(
                ParseErrorCode::AttributeWithoutValue,
                format!("attribute {} has no value", name),
                offset + pos,
            ));
        }
        pos += 1; // Skip '='
        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }

        let quote = match bytes.get(pos) {
            Some(&q @ (b'"' | b'\'')) => q,
            _ => return Err(err(ParseErrorCode::AttributeNotStarted, "AttValue: \" or ' expected", pos)),
        };
        pos += 1;
        let value_start = pos;
        let close = memchr(quote, &bytes[pos..])
            .ok_or_else(|| err(ParseErrorCode::AttributeNotFinished, "AttValue: ' expected", value_start))?;
        let raw = &input[value_start..value_start + close];

        if let Some(lt) = memchr(b'<', raw.as_bytes()) {
            return Err(err(
                ParseErrorCode::LtInAttributeValue,
                "Unescaped '<' not allowed in attributes values",
                value_start + lt,
            ));
        }

        let value = decode_attribute(raw, offset + value_start, unknown)?;
        if attrs.iter().any(|a| a.name == name) {
            return Err(ParseError::new(
                ParseErrorCode::AttributeRedefined,
                format!("Attribute {} redefined", name),
                offset + name_start,
            ));
        }
        let attr = Attribute::new(name, value);
        if attr.prefix == Some("xmlns") && attr.value.is_empty() {
            return Err(ParseError::new(
                ParseErrorCode::NameRequired,
                format!("{}: empty namespace URI is not allowed", name),
                offset + name_start,
            ));
        }
        attrs.push(attr);
        pos = value_start + close + 1;
    }

    Ok(attrs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<Vec<Attribute<'_>>, ParseError> {
        parse_attributes(input, 0, UnknownEntity::Reject)
    }

    #[test]
    fn test_simple_attributes() {
        let attrs = parse(" id=\"test\" class=\"foo\"").unwrap();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].name, "id");
        assert_eq!(attrs[0].value, "test");
        assert_eq!(attrs[1].name, "class");
        assert_eq!(attrs[1].value, "foo");
    }

    #[test]
    fn test_single_quoted() {
        let attrs = parse(" id='te\"st'").unwrap();
        assert_eq!(attrs[0].value, "te\"st");
    }

    #[test]
    fn test_namespaced_attribute() {
        let attrs = parse(" xmlns:xlink=\"http://www.w3.org/1999/xlink\" xlink:href='#a'").unwrap();
        assert_eq!(attrs[0].prefix, Some("xmlns"));
        assert_eq!(attrs[0].local_name, "xlink");
        assert_eq!(attrs[0].namespace_declaration(), Some(Some("xlink")));
        assert_eq!(attrs[1].prefix, Some("xlink"));
        assert_eq!(attrs[1].namespace_declaration(), None);
    }

    #[test]
    fn test_default_namespace_declaration() {
        let attrs = parse(" xmlns='urn:x'").unwrap();
        assert_eq!(attrs[0].namespace_declaration(), Some(None));
    }

    #[test]
    fn test_entity_in_value() {
        let attrs = parse(" title=\"&lt;hello&gt;\"").unwrap();
        assert_eq!(attrs[0].value, "<hello>");
    }

    #[test]
    fn test_empty_attributes() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("   ").unwrap().is_empty());
    }

    #[test]
    fn test_whitespace_handling() {
        let attrs = parse("  id  =  \"test\"  ").unwrap();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].name, "id");
        assert_eq!(attrs[0].value, "test");
    }

    #[test]
    fn test_errors() {
        let cases = [
            (" a", ParseErrorCode::AttributeWithoutValue),
            (" a=b", ParseErrorCode::AttributeNotStarted),
            (" a=\"b", ParseErrorCode::AttributeNotFinished),
            (" a=\"<\"", ParseErrorCode::LtInAttributeValue),
            (" a='1' a='2'", ParseErrorCode::AttributeRedefined),
            (" a='1'b='2'", ParseErrorCode::AttributeWithoutValue),
            (" 1a='x'", ParseErrorCode::NameRequired),
            (" :a='x'", ParseErrorCode::NameRequired),
            (" a:='x'", ParseErrorCode::NameRequired),
            (" xmlns:p=''", ParseErrorCode::NameRequired),
        ];
        for (input, code) in cases {
            assert_eq!(parse(input).unwrap_err().code, code, "input: {:?}", input);
        }
    }

    #[test]
    fn test_empty_default_namespace_allowed() {
        let attrs = parse(" xmlns=''").unwrap();
        assert_eq!(attrs[0].namespace_declaration(), Some(None));
        assert_eq!(attrs[0].value, "");
    }

    #[test]
    fn test_error_offset() {
        let err = parse_attributes(" a=\"<\"", 10, UnknownEntity::Reject).unwrap_err();
        assert_eq!(err.position, 14);
    }

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("a:b"), (Some("a"), "b"));
        assert_eq!(split_name("plain"), (None, "plain"));
        assert_eq!(split_name(":odd"), (None, ":odd"));
    }
}

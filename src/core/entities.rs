//! XML Entity Decoding
//!
//! Handles decoding of XML entities:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//!
//! Uses Cow for zero-copy when no entities are present.

use crate::error::{ParseError, ParseErrorCode};
use memchr::{memchr, memchr3};
use std::borrow::Cow;

/// What to do with a reference to an entity that is not predefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownEntity {
    /// Fail with `UndeclaredEntity`.
    Reject,
    /// Keep `&name;` verbatim. Used when a DOCTYPE may declare it.
    Keep,
}

/// Decode character data, handling entity references.
///
/// `offset` is the position of `input` in the document and is only used
/// for error reporting.
#[inline]
pub fn decode_text(input: &str, offset: usize, unknown: UnknownEntity) -> Result<Cow<'_, str>, ParseError> {
    // Fast path: check if there are any entities using SIMD
    if memchr(b'&', input.as_bytes()).is_none() {
        return Ok(Cow::Borrowed(input));
    }
    decode_entities(input, offset, unknown, false).map(Cow::Owned)
}

/// Decode an attribute value. Literal tab and newline characters are
/// normalised to spaces; the same characters written as references are kept.
pub fn decode_attribute(input: &str, offset: usize, unknown: UnknownEntity) -> Result<Cow<'_, str>, ParseError> {
    if memchr3(b'&', b'\t', b'\n', input.as_bytes()).is_none() {
        return Ok(Cow::Borrowed(input));
    }
    decode_entities(input, offset, unknown, true).map(Cow::Owned)
}

fn decode_entities(input: &str, offset: usize, unknown: UnknownEntity, normalize: bool) -> Result<String, ParseError> {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;
    let mut pos = 0;

    while let Some(amp) = memchr(b'&', rest.as_bytes()) {
        push_literal(&mut result, &rest[..amp], normalize);
        let after = &rest[amp + 1..];
        let at = offset + pos + amp;

        let semi = memchr(b';', after.as_bytes()).ok_or_else(|| {
            ParseError::new(
                ParseErrorCode::EntityRefSemicolonMissing,
                "EntityRef: expecting ';'",
                at,
            )
        })?;
        let entity = &after[..semi];

        match decode_entity(entity) {
            Some(c) => result.push(c),
            None if entity.starts_with('#') => {
                return Err(ParseError::new(
                    ParseErrorCode::InvalidCharRef,
                    format!("Invalid character reference '&{};'", entity),
                    at,
                ));
            }
            None if !super::scanner::is_valid_name(entity) => {
                return Err(ParseError::new(ParseErrorCode::NameRequired, "EntityRef: no name", at));
            }
            None => match unknown {
                UnknownEntity::Keep => {
                    result.push('&');
                    result.push_str(entity);
                    result.push(';');
                }
                UnknownEntity::Reject => {
                    return Err(ParseError::new(
                        ParseErrorCode::UndeclaredEntity,
                        format!("Entity '{}' not defined", entity),
                        at,
                    ));
                }
            },
        }

        let consumed = amp + 1 + semi + 1;
        rest = &rest[consumed..];
        pos += consumed;
    }
    push_literal(&mut result, rest, normalize);

    Ok(result)
}

#[inline]
fn push_literal(out: &mut String, s: &str, normalize: bool) {
    if normalize && memchr3(b'\t', b'\n', b'\r', s.as_bytes()).is_some() {
        out.extend(s.chars().map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c }));
    } else {
        out.push_str(s);
    }
}

/// Decode a single entity (without & and ;)
fn decode_entity(entity: &str) -> Option<char> {
    if let Some(num) = entity.strip_prefix('#') {
        return decode_numeric_entity(num);
    }
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => None,
    }
}

/// Decode a numeric character reference, rejecting code points that are
/// not XML 1.0 characters.
fn decode_numeric_entity(entity: &str) -> Option<char> {
    let codepoint = match entity.strip_prefix('x') {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None if entity.bytes().all(|b| b.is_ascii_digit()) => entity.parse::<u32>().ok()?,
        None => return None,
    };
    if !is_valid_xml_char(codepoint) {
        return None;
    }
    char::from_u32(codepoint)
}

/// Check if a code point is a valid XML 1.0 Char
/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
pub fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}

/// Escape character data for output.
pub fn escape_text(input: &str) -> Cow<'_, str> {
    if !input.bytes().any(|b| matches!(b, b'<' | b'>' | b'&' | b'\r')) {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '\r' => result.push_str("&#13;"),
            _ => result.push(c),
        }
    }
    Cow::Owned(result)
}

/// Escape an attribute value for output inside double quotes. Whitespace
/// that attribute-value normalisation would fold is written as references.
pub fn escape_attribute(input: &str) -> Cow<'_, str> {
    if !input
        .bytes()
        .any(|b| matches!(b, b'<' | b'>' | b'&' | b'"' | b'\t' | b'\n' | b'\r'))
    {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '\t' => result.push_str("&#9;"),
            '\n' => result.push_str("&#10;"),
            '\r' => result.push_str("&#13;"),
            _ => result.push(c),
        }
    }
    Cow::Owned(result)
}

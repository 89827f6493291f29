//! XML Encoding Detection and Conversion
//!
//! Turns raw input bytes into the `&str` the tokenizer works on: detects a
//! byte order mark, transcodes UTF-16, validates UTF-8 and XML characters,
//! and normalises line endings.

use crate::error::{ParseError, ParseErrorCode};
use memchr::memchr;
use std::borrow::Cow;

/// Detect the encoding of XML input based on BOM or byte patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl XmlEncoding {
    /// Detect encoding from byte order mark or initial bytes
    pub fn detect(input: &[u8]) -> Self {
        match input {
            [0xFF, 0xFE, ..] | [b'<', 0x00, ..] => XmlEncoding::Utf16Le,
            [0xFE, 0xFF, ..] | [0x00, b'<', ..] => XmlEncoding::Utf16Be,
            _ => XmlEncoding::Utf8,
        }
    }
}

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Produce validated, newline-normalised text from raw document bytes.
pub fn decode_input(input: &[u8]) -> Result<Cow<'_, str>, ParseError> {
    let text: Cow<'_, str> = match XmlEncoding::detect(input) {
        XmlEncoding::Utf8 => {
            let bytes = input.strip_prefix(UTF8_BOM).unwrap_or(input);
            match std::str::from_utf8(bytes) {
                Ok(s) => Cow::Borrowed(s),
                Err(e) => {
                    return Err(ParseError::new(
                        ParseErrorCode::InvalidEncoding,
                        "Input is not proper UTF-8",
                        e.valid_up_to(),
                    ))
                }
            }
        }
        XmlEncoding::Utf16Le => Cow::Owned(convert_utf16(input, u16::from_le_bytes, &[0xFF, 0xFE])?),
        XmlEncoding::Utf16Be => Cow::Owned(convert_utf16(input, u16::from_be_bytes, &[0xFE, 0xFF])?),
    };

    validate_chars(&text)?;
    Ok(normalize_line_endings(text))
}

fn convert_utf16(input: &[u8], unit: fn([u8; 2]) -> u16, bom: &[u8]) -> Result<String, ParseError> {
    let bytes = input.strip_prefix(bom).unwrap_or(input);
    if bytes.len() % 2 != 0 {
        return Err(ParseError::new(
            ParseErrorCode::InvalidEncoding,
            "Invalid UTF-16: odd number of bytes",
            input.len(),
        ));
    }

    let code_units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|chunk| unit([chunk[0], chunk[1]]))
        .collect();

    String::from_utf16(&code_units)
        .map_err(|e| ParseError::new(ParseErrorCode::InvalidEncoding, format!("Invalid UTF-16: {}", e), 0))
}

/// Reject characters outside the XML 1.0 `Char` production.
fn validate_chars(text: &str) -> Result<(), ParseError> {
    let bad = text.char_indices().find(|&(_, c)| {
        let cp = c as u32;
        (cp < 0x20 && !matches!(c, '\t' | '\n' | '\r')) || cp == 0xFFFE || cp == 0xFFFF
    });
    match bad {
        Some((pos, c)) => Err(ParseError::new(
            ParseErrorCode::InvalidChar,
            format!("Char 0x{:X} out of allowed range", c as u32),
            pos,
        )),
        None => Ok(()),
    }
}

/// Replace `\r\n` and lone `\r` with `\n`.
pub fn normalize_line_endings(text: Cow<'_, str>) -> Cow<'_, str> {
    if memchr(b'\r', text.as_bytes()).is_none() {
        return text;
    }
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    Cow::Owned(normalized)
}

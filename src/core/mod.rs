//! Core XML parsing primitives
//!
//! The building blocks the event reader is made of:
//! - Scanner: SIMD-accelerated delimiter detection using memchr
//! - Tokenizer: state machine for XML token extraction
//! - Entities: entity decoding with Cow (zero-copy when possible) and escaping
//! - Attributes: attribute list parsing and value normalisation
//! - Encoding: BOM handling, UTF-16 transcoding, line-ending normalisation

pub mod attributes;
pub mod encoding;
pub mod entities;
pub mod scanner;
pub mod tokenizer;

//! Option structs for parsing, writing and XPath evaluation.
//!
//! All of them implement `Default` and serde's traits with `#[serde(default)]`
//! so a host can load partial settings from any serde format.

use serde::{Deserialize, Serialize};

/// Parser settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Drop text nodes that contain only whitespace.
    pub ignore_whitespace_text: bool,
    /// Maximum element nesting depth.
    pub max_depth: u16,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            ignore_whitespace_text: false,
            max_depth: 256,
        }
    }
}

/// Serializer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    /// Indent element-only content and end each top-level node with a newline.
    pub formatted: bool,
    /// Emit `<?xml version="1.0" encoding="UTF-8"?>` before the first node.
    pub declaration: bool,
    /// Write childless elements as `<a></a>` instead of `<a/>`.
    pub expand_empty_elements: bool,
    /// Indentation unit used when `formatted` is set.
    pub indent: String,
}

impl WriteOptions {
    /// Compact output with no added whitespace.
    pub fn compact() -> Self {
        Self::default()
    }

    /// Indented output.
    pub fn formatted() -> Self {
        Self {
            formatted: true,
            ..Self::default()
        }
    }
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            formatted: false,
            declaration: false,
            expand_empty_elements: false,
            indent: "  ".to_string(),
        }
    }
}

/// XPath engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XPathOptions {
    /// Number of compiled expressions kept in the LRU cache. Zero disables caching.
    pub cache_capacity: usize,
}

impl Default for XPathOptions {
    fn default() -> Self {
        Self { cache_capacity: 128 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = WriteOptions::default();
        assert!(!opts.formatted);
        assert!(!opts.declaration);
        assert_eq!(opts.indent, "  ");
        assert_eq!(ParseOptions::default().max_depth, 256);
        assert_eq!(XPathOptions::default().cache_capacity, 128);
    }

    #[test]
    fn test_formatted_shorthand() {
        let opts = WriteOptions::formatted();
        assert!(opts.formatted);
        assert!(!opts.expand_empty_elements);
    }
}

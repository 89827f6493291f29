//! XML Event Types
//!
//! Event types for pull-parser style XML processing.

use crate::core::attributes::{split_name, Attribute};
use std::borrow::Cow;

/// XML parsing event
#[derive(Debug, Clone, PartialEq)]
pub enum XmlEvent<'a> {
    /// Start of an element: <name attrs...>
    StartElement(StartElement<'a>),
    /// End of an element: </name>
    EndElement(EndElement<'a>),
    /// Empty element: <name attrs.../>
    EmptyElement(StartElement<'a>),
    /// Text content between tags
    Text(Cow<'a, str>),
    /// CDATA section content
    CData(Cow<'a, str>),
    /// Comment content
    Comment(Cow<'a, str>),
    /// Processing instruction: <?target data?>
    ProcessingInstruction {
        target: &'a str,
        data: Option<Cow<'a, str>>,
    },
    /// XML declaration: <?xml version="1.0"?>
    XmlDeclaration {
        version: Cow<'a, str>,
        encoding: Option<Cow<'a, str>>,
        standalone: Option<bool>,
    },
    /// DOCTYPE declaration, body kept raw
    DocType {
        name: &'a str,
        body: Option<Cow<'a, str>>,
    },
    /// End of document
    EndDocument,
}

/// Start element event data
#[derive(Debug, Clone, PartialEq)]
pub struct StartElement<'a> {
    /// Full element name (may include prefix)
    pub name: &'a str,
    /// Local name (after colon)
    pub local_name: &'a str,
    /// Namespace prefix (before colon), if any
    pub prefix: Option<&'a str>,
    /// Element attributes, namespace declarations included
    pub attributes: Vec<Attribute<'a>>,
}

impl<'a> StartElement<'a> {
    pub fn new(name: &'a str, attributes: Vec<Attribute<'a>>) -> Self {
        let (prefix, local_name) = split_name(name);
        StartElement {
            name,
            local_name,
            prefix,
            attributes,
        }
    }

    /// Get an attribute value by qualified name
    pub fn get_attribute_value(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_ref())
    }
}

/// End element event data
#[derive(Debug, Clone, PartialEq)]
pub struct EndElement<'a> {
    /// Full element name
    pub name: &'a str,
}

impl<'a> EndElement<'a> {
    pub fn new(name: &'a str) -> Self {
        EndElement { name }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_element_split() {
        let elem = StartElement::new("svg:rect", vec![]);
        assert_eq!(elem.prefix, Some("svg"));
        assert_eq!(elem.local_name, "rect");
    }

    #[test]
    fn test_get_attribute_value() {
        let elem = StartElement::new("a", vec![Attribute::new("href", Cow::Borrowed("#top"))]);
        assert_eq!(elem.get_attribute_value("href"), Some("#top"));
        assert_eq!(elem.get_attribute_value("rel"), None);
    }
}

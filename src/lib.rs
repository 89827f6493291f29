//! stxml - XML documents with a builder, serializer and XPath 1.0
//!
//! Layers, bottom up:
//! - `core`: memchr scanner, tokenizer, entities, attributes, encoding
//! - `reader`: zero-copy event reader over the decoded input
//! - `dom`: arena document, borrowed node handles, filtering, builder, serializer
//! - `xpath`: lexer, parser, compiler and evaluator, with a cached engine
//!
//! ```
//! use stxml::{DocumentBuilder, WriteOptions, XmlDocument};
//!
//! let doc = XmlDocument::parse(b"<a><b/><c><d>e</d></c><f/></a>").unwrap();
//! let root = doc.root_element().unwrap();
//! assert_eq!(root.name(), Some("a"));
//!
//! let d = doc.evaluate("//a/c/d").unwrap().into_nodeset().unwrap();
//! assert_eq!(d.first().unwrap().content().unwrap(), "e");
//!
//! let mut builder = DocumentBuilder::new();
//! builder
//!     .add_child_element(Some("foo"), Some("http://chikachow.org/foo"), "a")
//!     .add_text_node("bar");
//! assert_eq!(
//!     builder.to_bytes(&WriteOptions::default()),
//!     b"<foo:a xmlns:foo=\"http://chikachow.org/foo\">bar</foo:a>"
//! );
//! ```

pub mod config;
pub mod core;
pub mod dom;
pub mod error;
pub mod reader;
pub mod xpath;

pub use config::{ParseOptions, WriteOptions, XPathOptions};
pub use dom::{
    has_name, BuilderNamespace, DocumentBuilder, ElementBuilder, Namespace, Node, NodeId, NodeKind, Nodes, Visit,
    XmlDocument,
};
pub use error::{Error, ErrorKind, ParseError, ParseErrorCode, Result, XPathError, XPathErrorCode};
pub use xpath::{Namespaces, NodeSet, XPathEngine, XPathResult};

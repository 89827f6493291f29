//! DOM Module - Arena-based XML Document
//!
//! Implements an owned DOM representation using:
//! - Arena allocation for nodes, attributes included
//! - NodeId (u32) indices for cache-friendly traversal
//! - String interning for names and character data
//! - Namespace resolution stack
//!
//! `Node<'d>` handles borrow the document, so they cannot outlive it.

pub mod builder;
pub mod document;
pub mod filter;
pub mod handle;
pub mod namespace;
pub mod node;
pub mod serializer;
pub mod strings;

pub use builder::{BuilderNamespace, DocumentBuilder, ElementBuilder};
pub use document::XmlDocument;
pub use filter::{has_name, Visit};
pub use handle::{Namespace, Node, Nodes};
pub use node::{NodeId, NodeKind, XmlNode};
pub use strings::StringPool;

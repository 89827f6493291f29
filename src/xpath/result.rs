//! Public XPath results
//!
//! Node-sets borrow the document they were selected from, so results hand
//! out [`Node`] handles rather than raw ids.

use super::value::{format_number, XPathValue};
use crate::dom::{Node, NodeId, XmlDocument};
use std::fmt;

/// Result of evaluating an XPath expression
#[derive(Debug, Clone, PartialEq)]
pub enum XPathResult<'d> {
    NodeSet(NodeSet<'d>),
    Boolean(bool),
    Number(f64),
    String(String),
}

impl<'d> XPathResult<'d> {
    pub(crate) fn from_value(doc: &'d XmlDocument, value: XPathValue) -> Self {
        match value {
            XPathValue::NodeSet(ids) => XPathResult::NodeSet(NodeSet { doc, ids }),
            XPathValue::Boolean(b) => XPathResult::Boolean(b),
            XPathValue::Number(n) => XPathResult::Number(n),
            XPathValue::String(s) => XPathResult::String(s),
        }
    }

    pub fn as_nodeset(&self) -> Option<&NodeSet<'d>> {
        match self {
            XPathResult::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }

    pub fn into_nodeset(self) -> Option<NodeSet<'d>> {
        match self {
            XPathResult::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            XPathResult::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            XPathResult::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            XPathResult::String(s) => Some(s),
            _ => None,
        }
    }

    /// The result converted with XPath `string()` rules
    pub fn to_string_value(&self) -> String {
        match self {
            XPathResult::NodeSet(nodes) => nodes
                .first()
                .and_then(|n| n.content())
                .map(|c| c.into_owned())
                .unwrap_or_default(),
            XPathResult::Boolean(b) => b.to_string(),
            XPathResult::Number(n) => format_number(*n),
            XPathResult::String(s) => s.clone(),
        }
    }
}

/// Nodes selected by an expression, in document order without duplicates
#[derive(Clone)]
pub struct NodeSet<'d> {
    doc: &'d XmlDocument,
    ids: Vec<NodeId>,
}

impl<'d> NodeSet<'d> {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Node<'d>> {
        self.ids.get(index).map(|&id| Node::new(self.doc, id))
    }

    pub fn first(&self) -> Option<Node<'d>> {
        self.get(0)
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    pub fn iter(&self) -> impl Iterator<Item = Node<'d>> + '_ {
        let doc = self.doc;
        self.ids.iter().map(move |&id| Node::new(doc, id))
    }
}

impl PartialEq for NodeSet<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.ids == other.ids
    }
}

impl fmt::Debug for NodeSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'d> IntoIterator for NodeSet<'d> {
    type Item = Node<'d>;
    type IntoIter = NodeSetIntoIter<'d>;

    fn into_iter(self) -> Self::IntoIter {
        NodeSetIntoIter {
            doc: self.doc,
            inner: self.ids.into_iter(),
        }
    }
}

impl<'a, 'd> IntoIterator for &'a NodeSet<'d> {
    type Item = Node<'d>;
    type IntoIter = Box<dyn Iterator<Item = Node<'d>> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// Owning iterator over a [`NodeSet`]
pub struct NodeSetIntoIter<'d> {
    doc: &'d XmlDocument,
    inner: std::vec::IntoIter<NodeId>,
}

impl<'d> Iterator for NodeSetIntoIter<'d> {
    type Item = Node<'d>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|id| Node::new(self.doc, id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

//! Borrowed node handles
//!
//! A `Node<'d>` pairs a document reference with a node id. It is `Copy`,
//! cheap to pass around, and cannot outlive the document it points into.

use super::document::{ChildIter, XmlDocument};
use super::node::{NodeId, NodeKind};
use std::borrow::Cow;
use std::fmt;

/// A node of an [`XmlDocument`]
#[derive(Clone, Copy)]
pub struct Node<'d> {
    doc: &'d XmlDocument,
    id: NodeId,
}

/// Namespace of an element or attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Namespace<'d> {
    pub prefix: Option<&'d str>,
    pub href: &'d str,
}

impl<'d> Node<'d> {
    pub(crate) fn new(doc: &'d XmlDocument, id: NodeId) -> Self {
        Node { doc, id }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    pub fn document(&self) -> &'d XmlDocument {
        self.doc
    }

    pub fn kind(&self) -> NodeKind {
        self.doc.node_kind(self.id).unwrap_or(NodeKind::Document)
    }

    /// DOM node type number
    pub fn type_code(&self) -> u8 {
        self.kind().type_code()
    }

    pub fn is_element(&self) -> bool {
        self.kind() == NodeKind::Element
    }

    /// Local name of an element or attribute, PI target, or DOCTYPE root name
    pub fn name(&self) -> Option<&'d str> {
        self.doc.node_name(self.id)
    }

    pub fn prefix(&self) -> Option<&'d str> {
        self.doc.node_prefix(self.id)
    }

    /// Name as written in the source, `prefix:local` when prefixed
    pub fn qualified_name(&self) -> Option<Cow<'d, str>> {
        self.doc.qualified_name(self.id)
    }

    /// Resolved namespace of an element or attribute
    pub fn namespace(&self) -> Option<Namespace<'d>> {
        let href = self.doc.node_namespace_uri(self.id)?;
        Some(Namespace {
            prefix: self.prefix(),
            href,
        })
    }

    /// Text of character data, comments and attributes, PI data, or the
    /// concatenated descendant text of elements and the document.
    pub fn content(&self) -> Option<Cow<'d, str>> {
        self.doc.content(self.id)
    }

    /// Parent node; the owner element for attributes
    pub fn parent(&self) -> Option<Node<'d>> {
        self.doc.parent_id(self.id).map(|id| Node::new(self.doc, id))
    }

    pub fn next_sibling(&self) -> Option<Node<'d>> {
        let id = self.doc.get_node(self.id)?.next_sibling?;
        Some(Node::new(self.doc, id))
    }

    pub fn prev_sibling(&self) -> Option<Node<'d>> {
        let id = self.doc.get_node(self.id)?.prev_sibling?;
        Some(Node::new(self.doc, id))
    }

    pub fn first_child(&self) -> Option<Node<'d>> {
        let id = self.doc.get_node(self.id)?.first_child?;
        Some(Node::new(self.doc, id))
    }

    /// Child nodes in document order. Attributes are not children.
    pub fn children(&self) -> Nodes<'d> {
        Nodes {
            doc: self.doc,
            inner: self.doc.child_ids(self.id),
        }
    }

    /// Attribute nodes of an element, in source order
    pub fn attributes(&self) -> Nodes<'d> {
        Nodes {
            doc: self.doc,
            inner: self.doc.attribute_ids(self.id),
        }
    }

    /// Value of the attribute with the given qualified name
    pub fn attribute(&self, name: &str) -> Option<&'d str> {
        self.doc
            .attribute_ids(self.id)
            .find(|&a| self.doc.qualified_name(a).as_deref() == Some(name))
            .and_then(|a| self.doc.node_value(a))
    }

    /// All descendants in document order, excluding attributes
    pub fn descendants(&self) -> impl Iterator<Item = Node<'d>> + 'd {
        let doc = self.doc;
        doc.descendant_ids(self.id).map(move |id| Node::new(doc, id))
    }

    /// URI bound to `prefix` in scope at this node
    pub fn lookup_namespace(&self, prefix: &str) -> Option<&'d str> {
        self.doc.lookup_namespace(self.id, prefix)
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Node");
        s.field("id", &self.id).field("kind", &self.kind());
        if let Some(name) = self.qualified_name() {
            s.field("name", &name);
        }
        s.finish()
    }
}

/// Iterator over children or attributes as handles
pub struct Nodes<'d> {
    doc: &'d XmlDocument,
    inner: ChildIter<'d>,
}

impl<'d> Iterator for Nodes<'d> {
    type Item = Node<'d>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|id| Node::new(self.doc, id))
    }
}

impl XmlDocument {
    /// The document node, parent of the root element and prolog nodes
    pub fn document_node(&self) -> Node<'_> {
        Node::new(self, 0)
    }

    /// The single top-level element
    pub fn root_element(&self) -> Option<Node<'_>> {
        self.root_element_id().map(|id| Node::new(self, id))
    }

    /// Top-level nodes in source order: prolog, root element, epilog
    pub fn children(&self) -> Nodes<'_> {
        self.document_node().children()
    }

    /// Handle for a node id
    pub fn node(&self, id: NodeId) -> Option<Node<'_>> {
        self.get_node(id).map(|_| Node::new(self, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_name() {
        let doc = XmlDocument::parse_str("<foo/>").unwrap();
        assert_eq!(doc.root_element().unwrap().name(), Some("foo"));
    }

    #[test]
    fn test_namespaced_root() {
        let doc = XmlDocument::parse_str("<foo:foo xmlns:foo=\"http://example.org/foo\"/>").unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(root.name(), Some("foo"));
        assert_eq!(root.qualified_name().unwrap(), "foo:foo");
        assert_eq!(
            root.namespace(),
            Some(Namespace {
                prefix: Some("foo"),
                href: "http://example.org/foo"
            })
        );
    }

    #[test]
    fn test_navigation() {
        let doc = XmlDocument::parse_str("<r><a/>t<b/></r>").unwrap();
        let root = doc.root_element().unwrap();
        let a = root.first_child().unwrap();
        let t = a.next_sibling().unwrap();
        assert_eq!(t.kind(), NodeKind::Text);
        assert_eq!(t.type_code(), 3);
        assert_eq!(t.prev_sibling(), Some(a));
        assert_eq!(t.parent(), Some(root));
        assert_eq!(root.parent(), Some(doc.document_node()));
        assert_eq!(doc.document_node().parent(), None);
    }

    #[test]
    fn test_attribute_lookup() {
        let doc = XmlDocument::parse_str("<r xmlns:x='urn:x' id='1' x:id='2'/>").unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(root.attribute("id"), Some("1"));
        assert_eq!(root.attribute("x:id"), Some("2"));
        assert_eq!(root.attribute("xmlns:x"), None);
        assert_eq!(root.attributes().count(), 2);
        let attr = root.attributes().next().unwrap();
        assert_eq!(attr.parent(), Some(root));
        assert_eq!(attr.content().unwrap(), "1");
    }

    #[test]
    fn test_handles_from_different_documents_differ() {
        let a = XmlDocument::parse_str("<r/>").unwrap();
        let b = XmlDocument::parse_str("<r/>").unwrap();
        assert_ne!(a.root_element(), b.root_element());
        assert_eq!(a.root_element(), a.node(1));
    }
}

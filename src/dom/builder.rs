//! Programmatic document construction
//!
//! A [`DocumentBuilder`] owns the document being built. Adding an element
//! returns an [`ElementBuilder`] that borrows the document mutably and acts
//! as the insertion point for that element's content, so nested calls chain:
//!
//! ```
//! use stxml::{DocumentBuilder, WriteOptions};
//!
//! let mut builder = DocumentBuilder::new();
//! builder
//!     .add_child_element(Some("foo"), Some("http://chikachow.org/foo"), "a")
//!     .add_text_node("bar");
//! assert_eq!(
//!     builder.to_bytes(&WriteOptions::default()),
//!     b"<foo:a xmlns:foo=\"http://chikachow.org/foo\">bar</foo:a>".to_vec()
//! );
//! ```

use super::document::XmlDocument;
use super::node::{NodeId, NodeKind, NsDecl, XmlNode};
use crate::config::WriteOptions;
use tracing::warn;

/// A namespace binding as seen from the builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderNamespace {
    /// `None` for the default namespace
    pub prefix: Option<String>,
    pub href: String,
}

/// Builds an [`XmlDocument`] node by node
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    doc: XmlDocument,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        DocumentBuilder { doc: XmlDocument::new() }
    }

    /// Append a top-level element, declaring `prefix` -> `href` on it when given.
    /// A document has one root element; a second one is appended with a warning.
    pub fn add_child_element(&mut self, prefix: Option<&str>, href: Option<&str>, name: &str) -> ElementBuilder<'_> {
        let id = append_element(&mut self.doc, 0, prefix, href, name);
        ElementBuilder { doc: &mut self.doc, id }
    }

    /// Append a top-level element in a namespace obtained from another builder call
    pub fn add_child_element_with_namespace(&mut self, ns: Option<&BuilderNamespace>, name: &str) -> ElementBuilder<'_> {
        let (prefix, href) = split_namespace(ns);
        self.add_child_element(prefix, href, name)
    }

    /// Append a top-level comment
    pub fn add_comment(&mut self, content: &str) -> &mut Self {
        append_character_data(&mut self.doc, 0, NodeKind::Comment, content);
        self
    }

    /// Append a top-level processing instruction
    pub fn add_processing_instruction(&mut self, target: &str, data: Option<&str>) -> &mut Self {
        append_processing_instruction(&mut self.doc, 0, target, data);
        self
    }

    /// Resume building inside an element added earlier
    pub fn element(&mut self, id: NodeId) -> Option<ElementBuilder<'_>> {
        match self.doc.node_kind(id) {
            Some(NodeKind::Element) => Some(ElementBuilder { doc: &mut self.doc, id }),
            _ => None,
        }
    }

    /// The document built so far
    pub fn document(&self) -> &XmlDocument {
        &self.doc
    }

    /// Serialize the document built so far
    pub fn to_bytes(&self, options: &WriteOptions) -> Vec<u8> {
        self.doc.to_bytes(options)
    }

    pub fn finish(self) -> XmlDocument {
        self.doc
    }
}

/// Insertion point inside an element
#[derive(Debug)]
pub struct ElementBuilder<'b> {
    doc: &'b mut XmlDocument,
    id: NodeId,
}

impl<'b> ElementBuilder<'b> {
    /// Id of the element being built
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Declare a namespace on this element. A `None` prefix declares the
    /// default namespace.
    pub fn add_namespace(&mut self, prefix: Option<&str>, href: &str) -> BuilderNamespace {
        declare(self.doc, self.id, prefix.unwrap_or(""), href);
        BuilderNamespace {
            prefix: prefix.map(str::to_string),
            href: href.to_string(),
        }
    }

    /// Namespace bound to `prefix` on this element or an ancestor
    pub fn namespace_for_prefix(&self, prefix: Option<&str>) -> Option<BuilderNamespace> {
        let href = self.doc.lookup_namespace(self.id, prefix.unwrap_or(""))?;
        Some(BuilderNamespace {
            prefix: prefix.filter(|p| !p.is_empty()).map(str::to_string),
            href: href.to_string(),
        })
    }

    /// Namespace in scope whose URI is `href`
    pub fn namespace_for_href(&self, href: &str) -> Option<BuilderNamespace> {
        let prefix = self.doc.lookup_prefix(self.id, href)?;
        Some(BuilderNamespace {
            prefix: (!prefix.is_empty()).then(|| prefix.to_string()),
            href: href.to_string(),
        })
    }

    /// Add an attribute. Attributes never take the default namespace, so a
    /// namespace without a prefix is matched to a prefixed binding of the
    /// same URI when one is in scope.
    pub fn add_attribute(&mut self, ns: Option<&BuilderNamespace>, name: &str, value: &str) -> &mut Self {
        let depth = self.depth().saturating_add(1);
        let name_id = self.doc.strings.intern(name);
        let value_id = self.doc.strings.intern(value);
        let mut attr = XmlNode::attribute(name_id, value_id, self.id, depth);

        if let Some(ns) = ns {
            let prefix = match ns.prefix.as_deref() {
                Some(prefix) => {
                    if self.doc.lookup_namespace(self.id, prefix) != Some(ns.href.as_str()) {
                        declare(self.doc, self.id, prefix, &ns.href);
                    }
                    Some(prefix.to_string())
                }
                None => self
                    .doc
                    .lookup_prefix(self.id, &ns.href)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string),
            };
            match prefix {
                Some(prefix) => {
                    attr.prefix_id = self.doc.strings.intern(&prefix);
                    attr.namespace_id = self.doc.strings.intern(&ns.href);
                }
                None => warn!(name, href = %ns.href, "no prefix bound for attribute namespace"),
            }
        }

        self.doc.append_attribute(self.id, attr);
        self
    }

    /// Append a child element and return it as the new insertion point
    pub fn add_child_element(&mut self, prefix: Option<&str>, href: Option<&str>, name: &str) -> ElementBuilder<'_> {
        let id = append_element(self.doc, self.id, prefix, href, name);
        ElementBuilder { doc: &mut *self.doc, id }
    }

    pub fn add_child_element_with_namespace(&mut self, ns: Option<&BuilderNamespace>, name: &str) -> ElementBuilder<'_> {
        let (prefix, href) = split_namespace(ns);
        self.add_child_element(prefix, href, name)
    }

    /// Append a text node. Consecutive text nodes stay separate siblings.
    pub fn add_text_node(&mut self, content: &str) -> &mut Self {
        append_character_data(self.doc, self.id, NodeKind::Text, content);
        self
    }

    pub fn add_cdata(&mut self, content: &str) -> &mut Self {
        append_character_data(self.doc, self.id, NodeKind::CData, content);
        self
    }

    pub fn add_comment(&mut self, content: &str) -> &mut Self {
        append_character_data(self.doc, self.id, NodeKind::Comment, content);
        self
    }

    pub fn add_processing_instruction(&mut self, target: &str, data: Option<&str>) -> &mut Self {
        append_processing_instruction(self.doc, self.id, target, data);
        self
    }

    fn depth(&self) -> u16 {
        self.doc.get_node(self.id).map_or(0, |n| n.depth)
    }
}

fn split_namespace(ns: Option<&BuilderNamespace>) -> (Option<&str>, Option<&str>) {
    match ns {
        Some(ns) => (ns.prefix.as_deref(), Some(ns.href.as_str())),
        None => (None, None),
    }
}

fn child_depth(doc: &XmlDocument, parent: NodeId) -> u16 {
    doc.get_node(parent).map_or(0, |n| n.depth).saturating_add(1)
}

/// Record `prefix` -> `href` on `element`, replacing an earlier binding of
/// the same prefix on that element. An empty prefix is the default namespace.
fn declare(doc: &mut XmlDocument, element: NodeId, prefix: &str, href: &str) {
    let prefix_id = doc.strings.intern(prefix);
    let uri_id = doc.strings.intern(href);
    if let Some(node) = doc.get_node_mut(element) {
        match node.namespaces.iter_mut().find(|d| d.prefix_id == prefix_id) {
            Some(decl) => decl.uri_id = uri_id,
            None => node.namespaces.push(NsDecl { prefix_id, uri_id }),
        }
    }
}

fn append_element(doc: &mut XmlDocument, parent: NodeId, prefix: Option<&str>, href: Option<&str>, name: &str) -> NodeId {
    let prefix = prefix.filter(|p| !p.is_empty());
    let name_id = doc.strings.intern(name);
    let node = XmlNode::element(name_id, parent, child_depth(doc, parent));
    let id = doc.append_child(parent, node);

    if parent == 0 {
        match doc.root_element_id() {
            Some(_) => warn!(name, "document already has a root element; appending another"),
            None => doc.set_root_element(id),
        }
    }

    let in_scope = doc.lookup_namespace(parent, prefix.unwrap_or("")).map(str::to_string);
    let namespace = match (prefix, href) {
        (_, Some(href)) => {
            if in_scope.as_deref() != Some(href) {
                declare(doc, id, prefix.unwrap_or(""), href);
            }
            Some(href.to_string())
        }
        (Some(prefix), None) => {
            if in_scope.is_none() {
                warn!(prefix, name, "namespace prefix is not bound");
            }
            in_scope
        }
        (None, None) => {
            // Step out of an inherited default namespace
            if in_scope.is_some() {
                declare(doc, id, "", "");
            }
            None
        }
    };

    let prefix_id = prefix.map_or(0, |p| doc.strings.intern(p));
    let namespace_id = namespace.map_or(0, |ns| doc.strings.intern(&ns));
    if let Some(node) = doc.get_node_mut(id) {
        node.prefix_id = prefix_id;
        node.namespace_id = namespace_id;
    }
    id
}

fn append_character_data(doc: &mut XmlDocument, parent: NodeId, kind: NodeKind, content: &str) {
    let value_id = doc.strings.intern(content);
    let node = XmlNode::character_data(kind, value_id, parent, child_depth(doc, parent));
    doc.append_child(parent, node);
}

fn append_processing_instruction(doc: &mut XmlDocument, parent: NodeId, target: &str, data: Option<&str>) {
    let target_id = doc.strings.intern(target);
    let data_id = data.map(|d| doc.strings.intern(d));
    let node = XmlNode::processing_instruction(target_id, data_id, parent, child_depth(doc, parent));
    doc.append_child(parent, node);
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOO: &str = "http://chikachow.org/foo";

    #[test]
    fn test_declares_namespace_once() {
        let mut builder = DocumentBuilder::new();
        {
            let mut root = builder.add_child_element(Some("foo"), Some(FOO), "a");
            root.add_child_element(Some("foo"), Some(FOO), "b");
        }
        let doc = builder.finish();
        let root = doc.root_element().unwrap();
        let child = root.first_child().unwrap();
        assert_eq!(doc.get_node(root.id()).unwrap().namespaces.len(), 1);
        assert!(doc.get_node(child.id()).unwrap().namespaces.is_empty());
        assert_eq!(child.namespace().unwrap().href, FOO);
    }

    #[test]
    fn test_prefix_resolved_from_ancestors() {
        let mut builder = DocumentBuilder::new();
        builder
            .add_child_element(Some("foo"), Some(FOO), "a")
            .add_child_element(Some("foo"), None, "b");
        let doc = builder.finish();
        let child = doc.root_element().unwrap().first_child().unwrap();
        assert_eq!(child.qualified_name().unwrap(), "foo:b");
        assert_eq!(child.namespace().unwrap().href, FOO);
    }

    #[test]
    fn test_text_nodes_stay_separate() {
        let mut builder = DocumentBuilder::new();
        builder.add_child_element(None, None, "a").add_text_node("x").add_text_node("y");
        let doc = builder.finish();
        let root = doc.root_element().unwrap();
        assert_eq!(root.children().count(), 2);
        assert_eq!(root.content().unwrap(), "xy");
    }

    #[test]
    fn test_namespace_lookups() {
        let mut builder = DocumentBuilder::new();
        let mut root = builder.add_child_element(None, None, "r");
        let ns = root.add_namespace(Some("p"), "urn:p");
        let child = root.add_child_element_with_namespace(Some(&ns), "c");
        assert_eq!(child.namespace_for_prefix(Some("p")), Some(ns.clone()));
        assert_eq!(child.namespace_for_href("urn:p"), Some(ns));
        assert_eq!(child.namespace_for_prefix(Some("q")), None);
    }

    #[test]
    fn test_attribute_namespace_declared_on_demand() {
        let mut builder = DocumentBuilder::new();
        let ns = BuilderNamespace {
            prefix: Some("x".to_string()),
            href: "urn:x".to_string(),
        };
        builder
            .add_child_element(None, None, "r")
            .add_attribute(Some(&ns), "id", "1")
            .add_attribute(None, "plain", "2");
        let doc = builder.finish();
        let root = doc.root_element().unwrap();
        assert_eq!(root.attribute("x:id"), Some("1"));
        assert_eq!(root.attribute("plain"), Some("2"));
        assert_eq!(root.lookup_namespace("x"), Some("urn:x"));
    }

    #[test]
    fn test_default_namespace_undeclared_for_plain_child() {
        let mut builder = DocumentBuilder::new();
        builder
            .add_child_element(None, Some("urn:d"), "r")
            .add_child_element(None, None, "plain");
        let doc = builder.finish();
        let plain = doc.root_element().unwrap().first_child().unwrap();
        assert_eq!(plain.namespace(), None);
        assert_eq!(plain.lookup_namespace(""), None);
    }

    #[test]
    fn test_second_root_is_appended() {
        let mut builder = DocumentBuilder::new();
        builder.add_child_element(None, None, "a");
        builder.add_child_element(None, None, "b");
        let doc = builder.finish();
        assert_eq!(doc.root_element().unwrap().name(), Some("a"));
        assert_eq!(doc.children().count(), 2);
    }

    #[test]
    fn test_resume_element() {
        let mut builder = DocumentBuilder::new();
        let root = builder.add_child_element(None, None, "r").id();
        builder.add_comment("after");
        builder.element(root).unwrap().add_text_node("late");
        assert!(builder.element(0).is_none());
        let doc = builder.finish();
        assert_eq!(doc.root_element().unwrap().content().unwrap(), "late");
    }
}

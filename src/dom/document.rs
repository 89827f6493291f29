//! XML Document - Arena-based DOM representation
//!
//! Efficient DOM storage with:
//! - Arena allocation for nodes (attributes included)
//! - NodeId indices for traversal
//! - String interning for names and character data
//!
//! The document owns everything it references, so it is `Send + Sync` and
//! can be shared between threads for concurrent reads.

use super::namespace::NamespaceResolver;
use super::node::{NodeId, NodeKind, NsDecl, XmlNode};
use super::strings::StringPool;
use crate::config::ParseOptions;
use crate::core::encoding::decode_input;
use crate::core::tokenizer::is_blank;
use crate::error::{ParseError, ParseErrorCode};
use crate::reader::events::{StartElement, XmlEvent};
use crate::reader::slice::SliceReader;
use std::borrow::Cow;
use tracing::{debug, warn};

/// An XML document stored in arena format
#[derive(Debug, Clone)]
pub struct XmlDocument {
    /// Arena of nodes; index 0 is the document node
    nodes: Vec<XmlNode>,
    /// Interned strings
    pub(crate) strings: StringPool,
    /// Root element node ID (not document node)
    root_element: Option<NodeId>,
    version: Option<String>,
    encoding: Option<String>,
    standalone: Option<bool>,
    /// Node ids increase in document order. Parsing always keeps this;
    /// out-of-order building clears it.
    ids_in_order: bool,
}

impl Default for XmlDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlDocument {
    /// An empty document holding only the document node
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(64);
        nodes.push(XmlNode::document());
        XmlDocument {
            nodes,
            strings: StringPool::new(),
            root_element: None,
            version: None,
            encoding: None,
            standalone: None,
            ids_in_order: true,
        }
    }

    /// Parse an XML document from bytes with default options
    pub fn parse(input: &[u8]) -> crate::Result<Self> {
        Self::parse_with_options(input, &ParseOptions::default())
    }

    /// Parse an XML document from a string
    pub fn parse_str(input: &str) -> crate::Result<Self> {
        Self::parse(input.as_bytes())
    }

    /// Parse an XML document from bytes
    pub fn parse_with_options(input: &[u8], options: &ParseOptions) -> crate::Result<Self> {
        let result = decode_input(input).and_then(|text| {
            let mut doc = XmlDocument::new();
            doc.build_from_events(&text, options)?;
            Ok(doc)
        });

        match result {
            Ok(doc) => {
                debug!(bytes = input.len(), nodes = doc.node_count(), "parsed document");
                Ok(doc)
            }
            Err(err) => {
                debug!(code = err.code.value(), position = err.position, "parse failed: {}", err.message);
                Err(err.into())
            }
        }
    }

    /// Build DOM from XML events, enforcing document-level well-formedness
    fn build_from_events(&mut self, input: &str, options: &ParseOptions) -> Result<(), ParseError> {
        let mut reader = SliceReader::new(input);
        let mut resolver = NamespaceResolver::new(&mut self.strings);
        let mut stack: Vec<NodeId> = vec![0]; // Start with document node
        let mut tags: Vec<&str> = Vec::new(); // Qualified names for end-tag matching

        let mut seen_doctype = false;

        loop {
            let event = reader.next_event()?;
            let at = reader.last_span().0;
            let at_top = stack.len() == 1;

            match event {
                XmlEvent::StartElement(elem) | XmlEvent::EmptyElement(elem) if at_top && self.root_element.is_some() => {
                    return Err(ParseError::new(
                        ParseErrorCode::ExtraContent,
                        format!("Extra content at the end of the document: <{}>", elem.name),
                        at,
                    ));
                }

                XmlEvent::StartElement(elem) => {
                    let name = elem.name;
                    let id = self.handle_element(elem, &stack, &mut resolver, options, at)?;
                    stack.push(id);
                    tags.push(name);
                }

                XmlEvent::EmptyElement(elem) => {
                    self.handle_element(elem, &stack, &mut resolver, options, at)?;
                    resolver.pop_scope();
                }

                XmlEvent::EndElement(end) => match tags.pop() {
                    Some(open) if open == end.name => {
                        stack.pop();
                        resolver.pop_scope();
                    }
                    Some(open) => {
                        return Err(ParseError::new(
                            ParseErrorCode::TagNameMismatch,
                            format!("Opening and ending tag mismatch: {} and {}", open, end.name),
                            at,
                        ));
                    }
                    None => {
                        let code = if self.root_element.is_some() {
                            ParseErrorCode::ExtraContent
                        } else {
                            ParseErrorCode::DocumentEmpty
                        };
                        return Err(ParseError::new(code, format!("Unexpected end tag </{}>", end.name), at));
                    }
                },

                XmlEvent::Text(content) => {
                    if at_top {
                        if is_blank(&content) {
                            continue;
                        }
                        return Err(self.top_level_content_error("text", at));
                    }
                    if options.ignore_whitespace_text && is_blank(&content) {
                        continue;
                    }
                    self.append_character_data(&stack, NodeKind::Text, &content);
                }

                XmlEvent::CData(content) => {
                    if at_top {
                        return Err(self.top_level_content_error("CDATA section", at));
                    }
                    self.append_character_data(&stack, NodeKind::CData, &content);
                }

                XmlEvent::Comment(content) => {
                    self.append_character_data(&stack, NodeKind::Comment, &content);
                }

                XmlEvent::ProcessingInstruction { target, data } => {
                    let parent = current(&stack);
                    let target_id = self.strings.intern(target);
                    let data_id = data.map(|d| self.strings.intern(&d));
                    let node = XmlNode::processing_instruction(target_id, data_id, parent, depth_of(&stack));
                    self.append_child(parent, node);
                }

                XmlEvent::DocType { name, body } => {
                    if !at_top || self.root_element.is_some() {
                        return Err(ParseError::new(
                            ParseErrorCode::ExtraContent,
                            "DOCTYPE is only allowed before the root element",
                            at,
                        ));
                    }
                    if seen_doctype {
                        return Err(ParseError::new(
                            ParseErrorCode::DoctypeNotFinished,
                            "Multiple DOCTYPE declarations",
                            at,
                        ));
                    }
                    seen_doctype = true;
                    let name_id = self.strings.intern(name);
                    let body_id = body.map(|b| self.strings.intern(&b));
                    self.append_child(0, XmlNode::document_type(name_id, body_id));
                }

                XmlEvent::XmlDeclaration {
                    version,
                    encoding,
                    standalone,
                } => {
                    self.version = Some(version.into_owned());
                    self.encoding = encoding.map(Cow::into_owned);
                    self.standalone = standalone;
                }

                XmlEvent::EndDocument => break,
            }
        }

        if let Some(open) = tags.first() {
            return Err(ParseError::new(
                ParseErrorCode::TagNotFinished,
                format!("Premature end of data in tag {}", open),
                input.len(),
            ));
        }
        if self.root_element.is_none() {
            return Err(ParseError::new(
                ParseErrorCode::DocumentEmpty,
                "Document is empty",
                input.len(),
            ));
        }

        Ok(())
    }

    fn top_level_content_error(&self, what: &str, at: usize) -> ParseError {
        if self.root_element.is_some() {
            ParseError::new(
                ParseErrorCode::ExtraContent,
                format!("Extra content at the end of the document: {}", what),
                at,
            )
        } else {
            ParseError::new(
                ParseErrorCode::DocumentEmpty,
                format!("Start tag expected, found {}", what),
                at,
            )
        }
    }

    /// Handle start/empty element. Opens a namespace scope the caller must close.
    fn handle_element(
        &mut self,
        elem: StartElement<'_>,
        stack: &[NodeId],
        resolver: &mut NamespaceResolver,
        options: &ParseOptions,
        at: usize,
    ) -> Result<NodeId, ParseError> {
        let parent_id = current(stack);
        let depth = match u16::try_from(stack.len()) {
            Ok(depth) if depth <= options.max_depth => depth,
            _ => {
                return Err(ParseError::new(
                    ParseErrorCode::DepthLimitExceeded,
                    format!("Excessive depth in document: {} use ParseOptions::max_depth", stack.len()),
                    at,
                ));
            }
        };

        resolver.push_scope();

        // Namespace declarations first: they apply to the element's own name
        let mut namespaces = Vec::new();
        for attr in &elem.attributes {
            if let Some(prefix) = attr.namespace_declaration() {
                let prefix_id = prefix.map_or(0, |p| self.strings.intern(p));
                let uri_id = self.strings.intern(&attr.value);
                if resolver.declare(prefix_id, uri_id) {
                    namespaces.push(NsDecl { prefix_id, uri_id });
                }
            }
        }

        let mut node = XmlNode::element(self.strings.intern(elem.local_name), parent_id, depth);
        node.namespaces = namespaces;
        match elem.prefix {
            Some(prefix) => {
                node.prefix_id = self.strings.intern(prefix);
                node.namespace_id = self.resolve_prefix(resolver, prefix, elem.name, node.prefix_id);
            }
            None => node.namespace_id = resolver.resolve_default().unwrap_or(0),
        }

        let node_id = self.append_child(parent_id, node);
        if self.root_element.is_none() && parent_id == 0 {
            self.root_element = Some(node_id);
        }

        for attr in elem.attributes.iter().filter(|a| a.namespace_declaration().is_none()) {
            let name_id = self.strings.intern(attr.local_name);
            let value_id = self.strings.intern(&attr.value);
            let mut xml_attr = XmlNode::attribute(name_id, value_id, node_id, depth.saturating_add(1));
            if let Some(prefix) = attr.prefix {
                xml_attr.prefix_id = self.strings.intern(prefix);
                xml_attr.namespace_id = self.resolve_prefix(resolver, prefix, attr.name, xml_attr.prefix_id);
            }
            self.append_attribute(node_id, xml_attr);
        }

        Ok(node_id)
    }

    fn resolve_prefix(&self, resolver: &NamespaceResolver, prefix: &str, name: &str, prefix_id: u32) -> u32 {
        match resolver.resolve(prefix_id) {
            Some(uri) => uri,
            None => {
                warn!(prefix, name, "namespace prefix is not bound");
                0
            }
        }
    }

    fn append_character_data(&mut self, stack: &[NodeId], kind: NodeKind, content: &str) {
        let parent = current(stack);
        let value_id = self.strings.intern(content);
        self.append_child(parent, XmlNode::character_data(kind, value_id, parent, depth_of(stack)));
    }

    /// Add a node to the arena as the last child of `parent_id`
    pub(crate) fn append_child(&mut self, parent_id: NodeId, node: XmlNode) -> NodeId {
        let child_id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        self.link_child(parent_id, child_id);
        child_id
    }

    /// Link a child node to its parent
    fn link_child(&mut self, parent_id: NodeId, child_id: NodeId) {
        if self.ids_in_order && !self.is_last_in_order(parent_id) {
            self.ids_in_order = false;
        }

        let last_child_opt = self.nodes[parent_id as usize].last_child;
        if let Some(last_child_id) = last_child_opt {
            self.nodes[child_id as usize].prev_sibling = Some(last_child_id);
            self.nodes[last_child_id as usize].next_sibling = Some(child_id);
        } else {
            self.nodes[parent_id as usize].first_child = Some(child_id);
        }
        self.nodes[parent_id as usize].last_child = Some(child_id);
    }

    /// Add an attribute node after the existing attributes of `owner`
    pub(crate) fn append_attribute(&mut self, owner: NodeId, node: XmlNode) -> NodeId {
        let attr_id = self.nodes.len() as NodeId;
        self.nodes.push(node);

        if self.ids_in_order && (self.nodes[owner as usize].has_children() || !self.is_last_in_order(owner)) {
            self.ids_in_order = false;
        }

        let last_opt = self.nodes[owner as usize].last_attribute;
        if let Some(last_id) = last_opt {
            self.nodes[attr_id as usize].prev_sibling = Some(last_id);
            self.nodes[last_id as usize].next_sibling = Some(attr_id);
        } else {
            self.nodes[owner as usize].first_attribute = Some(attr_id);
        }
        self.nodes[owner as usize].last_attribute = Some(attr_id);
        attr_id
    }

    /// True if nothing follows `id` or its ancestors in document order
    fn is_last_in_order(&self, mut id: NodeId) -> bool {
        loop {
            let node = &self.nodes[id as usize];
            if node.next_sibling.is_some() {
                return false;
            }
            match node.parent {
                Some(parent) => id = parent,
                None => return true,
            }
        }
    }

    pub(crate) fn get_node_mut(&mut self, id: NodeId) -> Option<&mut XmlNode> {
        self.nodes.get_mut(id as usize)
    }

    pub(crate) fn set_root_element(&mut self, id: NodeId) {
        self.root_element = Some(id);
    }

    /// Get the root element node ID
    pub fn root_element_id(&self) -> Option<NodeId> {
        self.root_element
    }

    /// Get a node by ID
    #[inline]
    pub fn get_node(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id as usize)
    }

    /// Kind of a node, if the id exists
    #[inline]
    pub fn node_kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get_node(id).map(|n| n.kind)
    }

    /// Local name of elements and attributes, target of PIs, root name of a DOCTYPE
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Element | NodeKind::Attribute | NodeKind::ProcessingInstruction | NodeKind::DocumentType => {
                Some(self.strings.get(node.name_id))
            }
            _ => None,
        }
    }

    /// Namespace prefix, if the node was written with one
    pub fn node_prefix(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        (node.prefix_id != 0).then(|| self.strings.get(node.prefix_id))
    }

    /// Resolved namespace URI of an element or attribute
    pub fn node_namespace_uri(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        (node.namespace_id != 0).then(|| self.strings.get(node.namespace_id))
    }

    /// `prefix:local` or `local`
    pub fn qualified_name(&self, id: NodeId) -> Option<Cow<'_, str>> {
        let local = self.node_name(id)?;
        Some(match self.node_prefix(id) {
            Some(prefix) => Cow::Owned(format!("{}:{}", prefix, local)),
            None => Cow::Borrowed(local),
        })
    }

    /// Stored value: character data, attribute value, PI data or DOCTYPE body
    pub fn node_value(&self, id: NodeId) -> Option<&str> {
        self.get_node(id)?.value_id.map(|v| self.strings.get(v))
    }

    /// Content as exposed by node handles: the stored value for leaves, the
    /// string-value for elements and the document.
    pub fn content(&self, id: NodeId) -> Option<Cow<'_, str>> {
        match self.node_kind(id)? {
            NodeKind::Element | NodeKind::Document => Some(self.string_value(id)),
            NodeKind::Text | NodeKind::CData | NodeKind::Comment | NodeKind::Attribute => {
                Some(Cow::Borrowed(self.node_value(id).unwrap_or("")))
            }
            NodeKind::ProcessingInstruction | NodeKind::DocumentType => self.node_value(id).map(Cow::Borrowed),
        }
    }

    /// XPath string-value: descendant text and CDATA for elements and the
    /// document, the stored value otherwise.
    pub fn string_value(&self, id: NodeId) -> Cow<'_, str> {
        match self.node_kind(id) {
            Some(NodeKind::Element | NodeKind::Document) => {
                let mut texts = self
                    .descendant_ids(id)
                    .filter(|&d| self.nodes[d as usize].kind.is_character_data())
                    .map(|d| self.node_value(d).unwrap_or(""));
                let Some(first) = texts.next() else {
                    return Cow::Borrowed("");
                };
                match texts.next() {
                    None => Cow::Borrowed(first),
                    Some(second) => {
                        let mut out = String::with_capacity(first.len() + second.len());
                        out.push_str(first);
                        out.push_str(second);
                        texts.for_each(|t| out.push_str(t));
                        Cow::Owned(out)
                    }
                }
            }
            Some(_) => Cow::Borrowed(self.node_value(id).unwrap_or("")),
            None => Cow::Borrowed(""),
        }
    }

    /// Look up the URI bound to `prefix` on `id` or its ancestors. An empty
    /// prefix asks for the default namespace.
    pub fn lookup_namespace(&self, id: NodeId, prefix: &str) -> Option<&str> {
        let prefix_id = self.strings.lookup(prefix)?;
        self.ancestors_or_self(id)
            .flat_map(|a| self.nodes[a as usize].namespaces.iter())
            .find(|decl| decl.prefix_id == prefix_id)
            .and_then(|decl| (decl.uri_id != 0).then(|| self.strings.get(decl.uri_id)))
    }

    /// Look up a prefix in scope at `id` that is bound to `uri`. `Some("")`
    /// means the default namespace.
    pub fn lookup_prefix(&self, id: NodeId, uri: &str) -> Option<&str> {
        let uri_id = self.strings.lookup(uri)?;
        for ancestor in self.ancestors_or_self(id) {
            for decl in &self.nodes[ancestor as usize].namespaces {
                if decl.uri_id == uri_id {
                    let prefix = self.strings.get(decl.prefix_id);
                    // Shadowed by a closer declaration of the same prefix
                    if self.lookup_namespace(id, prefix) == Some(uri) {
                        return Some(prefix);
                    }
                }
            }
        }
        None
    }

    /// Parent of a node; for attributes the owner element
    #[inline]
    pub fn parent_id(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.parent
    }

    /// Iterate the node and its ancestors up to the document node
    pub fn ancestors_or_self(&self, id: NodeId) -> AncestorIter<'_> {
        AncestorIter {
            doc: self,
            next: self.get_node(id).map(|_| id),
        }
    }

    /// Iterate over children
    pub fn child_ids(&self, id: NodeId) -> ChildIter<'_> {
        let first = self.get_node(id).and_then(|n| n.first_child);
        ChildIter { doc: self, next: first }
    }

    /// Iterate over attributes of an element
    pub fn attribute_ids(&self, id: NodeId) -> ChildIter<'_> {
        let first = self.get_node(id).and_then(|n| n.first_attribute);
        ChildIter { doc: self, next: first }
    }

    /// Iterate over descendants in document order (excluding self and attributes)
    pub fn descendant_ids(&self, id: NodeId) -> DescendantIter<'_> {
        let mut iter = DescendantIter {
            doc: self,
            stack: Vec::new(),
        };
        iter.push_children(id);
        iter
    }

    /// Number of nodes, including the document node and attributes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// `version` from the XML declaration
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// `encoding` from the XML declaration
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// `standalone` from the XML declaration
    pub fn standalone(&self) -> Option<bool> {
        self.standalone
    }

    /// Sort node ids into document order and drop duplicates
    pub fn sort_document_order(&self, ids: &mut Vec<NodeId>) {
        if ids.len() > 1 {
            if self.ids_in_order {
                ids.sort_unstable();
            } else {
                let positions = self.document_positions();
                ids.sort_unstable_by_key(|&id| positions.get(id as usize).copied().unwrap_or(u32::MAX));
            }
        }
        ids.dedup();
    }

    /// Document-order rank of every node: element, its attributes, then its children
    fn document_positions(&self) -> Vec<u32> {
        let mut positions = vec![u32::MAX; self.nodes.len()];
        let mut next = 0u32;
        let mut stack = vec![0 as NodeId];
        while let Some(id) = stack.pop() {
            positions[id as usize] = next;
            next += 1;
            for attr in self.attribute_ids(id) {
                positions[attr as usize] = next;
                next += 1;
            }
            let mut child = self.nodes[id as usize].last_child;
            while let Some(c) = child {
                stack.push(c);
                child = self.nodes[c as usize].prev_sibling;
            }
        }
        positions
    }
}

#[inline]
fn current(stack: &[NodeId]) -> NodeId {
    stack.last().copied().unwrap_or(0)
}

/// Depth of a node appended under the open elements, saturating at `u16::MAX`
fn depth_of(stack: &[NodeId]) -> u16 {
    u16::try_from(stack.len()).unwrap_or(u16::MAX)
}

/// Iterator over child nodes (or attributes, which share the sibling links)
pub struct ChildIter<'d> {
    doc: &'d XmlDocument,
    next: Option<NodeId>,
}

impl<'d> Iterator for ChildIter<'d> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.get_node(current).and_then(|n| n.next_sibling);
        Some(current)
    }
}

/// Iterator over descendant nodes (depth-first, document order)
pub struct DescendantIter<'d> {
    doc: &'d XmlDocument,
    stack: Vec<NodeId>,
}

impl<'d> DescendantIter<'d> {
    // Children go on in reverse so the first child is popped first
    fn push_children(&mut self, id: NodeId) {
        let mut child_id = self.doc.get_node(id).and_then(|n| n.last_child);
        while let Some(c) = child_id {
            self.stack.push(c);
            child_id = self.doc.get_node(c).and_then(|n| n.prev_sibling);
        }
    }
}

impl<'d> Iterator for DescendantIter<'d> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        self.push_children(current);
        Some(current)
    }
}

/// Iterator from a node up to the document node
pub struct AncestorIter<'d> {
    doc: &'d XmlDocument,
    next: Option<NodeId>,
}

impl<'d> Iterator for AncestorIter<'d> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.parent_id(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn parse(input: &str) -> XmlDocument {
        XmlDocument::parse_str(input).unwrap()
    }

    fn parse_code(input: &str) -> ParseErrorCode {
        match XmlDocument::parse_str(input) {
            Err(Error::Parse(err)) => err.code,
            other => panic!("expected parse error for {:?}, got {:?}", input, other.map(|d| d.node_count())),
        }
    }

    #[test]
    fn test_parse_simple() {
        let doc = parse("<root>hello</root>");
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.node_name(root), Some("root"));
        assert_eq!(doc.content(root).unwrap(), "hello");
    }

    #[test]
    fn test_parse_nested() {
        let doc = parse("<a><b><c/></b></a>");
        let root = doc.root_element_id().unwrap();
        let children: Vec<_> = doc.child_ids(root).collect();
        assert_eq!(children.len(), 1);
    }

    #[test]
    fn test_descendants() {
        let doc = parse("<root><a/><b><c/></b></root>");
        let root = doc.root_element_id().unwrap();
        let names: Vec<_> = doc.descendant_ids(root).filter_map(|id| doc.node_name(id)).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn test_siblings() {
        let doc = parse("<root><a/><b/><c/></root>");
        let root = doc.root_element_id().unwrap();
        let children: Vec<_> = doc.child_ids(root).collect();
        assert_eq!(children.len(), 3);

        let first = doc.get_node(children[0]).unwrap();
        assert!(first.prev_sibling.is_none());
        assert_eq!(first.next_sibling, Some(children[1]));
    }

    #[test]
    fn test_attributes_are_nodes() {
        let doc = parse("<a x='1' y='2'><b/></a>");
        let root = doc.root_element_id().unwrap();
        let attrs: Vec<_> = doc.attribute_ids(root).collect();
        assert_eq!(attrs.len(), 2);
        assert_eq!(doc.node_kind(attrs[0]), Some(NodeKind::Attribute));
        assert_eq!(doc.node_name(attrs[1]), Some("y"));
        assert_eq!(doc.node_value(attrs[1]), Some("2"));
        assert_eq!(doc.parent_id(attrs[0]), Some(root));
        // attributes are not children
        assert_eq!(doc.child_ids(root).count(), 1);
    }

    #[test]
    fn test_namespaces_resolved() {
        let doc = parse("<r xmlns='urn:d' xmlns:p='urn:p'><p:a p:x='1' y='2'/><b/></r>");
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.node_namespace_uri(root), Some("urn:d"));
        assert_eq!(doc.attribute_ids(root).count(), 0);

        let kids: Vec<_> = doc.child_ids(root).collect();
        assert_eq!(doc.node_name(kids[0]), Some("a"));
        assert_eq!(doc.node_prefix(kids[0]), Some("p"));
        assert_eq!(doc.node_namespace_uri(kids[0]), Some("urn:p"));
        assert_eq!(doc.qualified_name(kids[0]).unwrap(), "p:a");
        assert_eq!(doc.node_namespace_uri(kids[1]), Some("urn:d"));

        let attrs: Vec<_> = doc.attribute_ids(kids[0]).collect();
        assert_eq!(doc.node_namespace_uri(attrs[0]), Some("urn:p"));
        // unprefixed attributes take no default namespace
        assert_eq!(doc.node_namespace_uri(attrs[1]), None);

        assert_eq!(doc.lookup_namespace(kids[1], "p"), Some("urn:p"));
        assert_eq!(doc.lookup_prefix(kids[1], "urn:p"), Some("p"));
        assert_eq!(doc.lookup_namespace(kids[1], "q"), None);
    }

    #[test]
    fn test_unbound_prefix_is_kept() {
        let doc = parse("<q:a/>");
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.node_prefix(root), Some("q"));
        assert_eq!(doc.node_namespace_uri(root), None);
    }

    #[test]
    fn test_prolog_nodes() {
        let doc = parse("<?xml version='1.0' encoding='UTF-8' standalone='yes'?><?qux quux=\"quuux\"?><!--bar--><foo/>");
        assert_eq!(doc.version(), Some("1.0"));
        assert_eq!(doc.encoding(), Some("UTF-8"));
        assert_eq!(doc.standalone(), Some(true));

        let top: Vec<_> = doc.child_ids(0).collect();
        assert_eq!(top.len(), 3);
        assert_eq!(doc.node_kind(top[0]), Some(NodeKind::ProcessingInstruction));
        assert_eq!(doc.node_name(top[0]), Some("qux"));
        assert_eq!(doc.content(top[0]).unwrap(), "quux=\"quuux\"");
        assert_eq!(doc.content(top[1]).unwrap(), "bar");
        assert_eq!(doc.content(top[2]).unwrap(), "");
    }

    #[test]
    fn test_string_value_concatenates() {
        let doc = parse("<a>x<b>y<![CDATA[z]]></b><!--no-->w</a>");
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.string_value(root), "xyzw");
        assert_eq!(doc.string_value(0), "xyzw");
    }

    #[test]
    fn test_whitespace_options() {
        let input = "<a>\n  <b/>\n</a>";
        let keep = parse(input);
        assert_eq!(keep.child_ids(keep.root_element_id().unwrap()).count(), 3);

        let options = ParseOptions {
            ignore_whitespace_text: true,
            ..ParseOptions::default()
        };
        let drop = XmlDocument::parse_with_options(input.as_bytes(), &options).unwrap();
        assert_eq!(drop.child_ids(drop.root_element_id().unwrap()).count(), 1);
    }

    #[test]
    fn test_doctype_passthrough() {
        let doc = parse("<!DOCTYPE a [<!ENTITY e 'x'>]><a>&e;</a>");
        let top: Vec<_> = doc.child_ids(0).collect();
        assert_eq!(doc.node_kind(top[0]), Some(NodeKind::DocumentType));
        assert_eq!(doc.node_name(top[0]), Some("a"));
        assert_eq!(doc.content(top[1]).unwrap(), "&e;");
    }

    #[test]
    fn test_structure_errors() {
        let cases = [
            ("", ParseErrorCode::DocumentEmpty),
            ("  \n\t ", ParseErrorCode::DocumentEmpty),
            ("<!-- only -->", ParseErrorCode::DocumentEmpty),
            ("text", ParseErrorCode::DocumentEmpty),
            ("<a/><b/>", ParseErrorCode::ExtraContent),
            ("<a/>tail", ParseErrorCode::ExtraContent),
            ("<a/></a>", ParseErrorCode::ExtraContent),
            ("<a><![CDATA[x]]></a><![CDATA[y]]>", ParseErrorCode::ExtraContent),
            ("<a></b>", ParseErrorCode::TagNameMismatch),
            ("<a><b></a>", ParseErrorCode::TagNameMismatch),
            ("<a><b>", ParseErrorCode::TagNotFinished),
            ("<a>&bogus;</a>", ParseErrorCode::UndeclaredEntity),
            ("<a/><!DOCTYPE a>", ParseErrorCode::ExtraContent),
            ("<!DOCTYPE a><!DOCTYPE a><a/>", ParseErrorCode::DoctypeNotFinished),
            ("<:a/>", ParseErrorCode::NameRequired),
            ("<a:/>", ParseErrorCode::NameRequired),
            ("<a :b='1'/>", ParseErrorCode::NameRequired),
            ("<a xmlns:p=''/>", ParseErrorCode::NameRequired),
        ];
        for (input, code) in cases {
            assert_eq!(parse_code(input), code, "input: {:?}", input);
        }
    }

    #[test]
    fn test_depth_limit() {
        let options = ParseOptions {
            max_depth: 3,
            ..ParseOptions::default()
        };
        assert!(XmlDocument::parse_with_options(b"<a><b><c/></b></a>", &options).is_ok());
        let err = XmlDocument::parse_with_options(b"<a><b><c><d/></c></b></a>", &options).unwrap_err();
        assert_eq!(err.code(), ParseErrorCode::DepthLimitExceeded.value());
    }

    #[test]
    fn test_depth_beyond_u16_is_rejected() {
        let options = ParseOptions {
            max_depth: u16::MAX,
            ..ParseOptions::default()
        };
        let levels = 70_000;
        let input = format!("{}{}", "<a>".repeat(levels), "</a>".repeat(levels));
        let err = XmlDocument::parse_with_options(input.as_bytes(), &options).unwrap_err();
        assert_eq!(err.code(), ParseErrorCode::DepthLimitExceeded.value());

        let levels = usize::from(u16::MAX);
        let input = format!("{}x{}", "<a>".repeat(levels), "</a>".repeat(levels));
        let doc = XmlDocument::parse_with_options(input.as_bytes(), &options).unwrap();
        let deepest = doc.get_node((doc.node_count() - 1) as NodeId).unwrap();
        assert_eq!(deepest.depth, u16::MAX);
    }

    #[test]
    fn test_document_order_after_out_of_order_append() {
        let mut doc = XmlDocument::new();
        let root_name = doc.strings.intern("r");
        let root = doc.append_child(0, XmlNode::element(root_name, 0, 1));
        let a = doc.append_child(root, XmlNode::element(root_name, root, 2));
        let b = doc.append_child(root, XmlNode::element(root_name, root, 2));
        assert!(doc.ids_in_order);

        let late = doc.append_child(a, XmlNode::element(root_name, a, 3));
        assert!(!doc.ids_in_order);

        let mut ids = vec![b, late, a, late];
        doc.sort_document_order(&mut ids);
        assert_eq!(ids, vec![a, late, b]);
    }

    #[test]
    fn test_document_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<XmlDocument>();
    }
}

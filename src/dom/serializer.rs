//! XML serialization
//!
//! Writes a document or subtree back to markup. Traversal uses an explicit
//! stack so deeply nested documents cannot overflow the call stack.

use super::document::XmlDocument;
use super::handle::Node;
use super::node::{NodeId, NodeKind};
use crate::config::WriteOptions;
use crate::core::entities::{escape_attribute, escape_text};
use std::fmt;
use tracing::trace;

/// Where a node sits in formatted output
#[derive(Clone, Copy)]
enum Layout {
    /// Written exactly where it falls, no whitespace added
    Inline,
    /// On its own line at `level`; `newline` is false for the first line
    Block { level: usize, newline: bool },
}

enum StackEntry {
    Enter(NodeId, Layout),
    /// Closing tag, with the indent level when it goes on its own line
    Close(NodeId, Option<usize>),
}

struct Writer<'d, 'o> {
    doc: &'d XmlDocument,
    options: &'o WriteOptions,
    buf: String,
}

impl<'d, 'o> Writer<'d, 'o> {
    fn new(doc: &'d XmlDocument, options: &'o WriteOptions) -> Self {
        Writer {
            doc,
            options,
            buf: String::with_capacity(1024),
        }
    }

    fn declaration(&mut self) {
        self.buf.push_str("<?xml version=\"");
        self.buf.push_str(self.doc.version().unwrap_or("1.0"));
        self.buf.push_str("\" encoding=\"UTF-8\"");
        if let Some(standalone) = self.doc.standalone() {
            self.buf.push_str(if standalone { " standalone=\"yes\"" } else { " standalone=\"no\"" });
        }
        self.buf.push_str("?>\n");
    }

    fn document(&mut self) {
        if self.options.declaration {
            self.declaration();
        }
        let doc = self.doc;
        for child in doc.child_ids(0) {
            let layout = if self.options.formatted {
                Layout::Block { level: 0, newline: false }
            } else {
                Layout::Inline
            };
            self.subtree(child, layout);
            if self.options.formatted {
                self.buf.push('\n');
            }
        }
    }

    fn newline(&mut self, level: usize) {
        self.buf.push('\n');
        for _ in 0..level {
            self.buf.push_str(&self.options.indent);
        }
    }

    fn subtree(&mut self, id: NodeId, layout: Layout) {
        let doc = self.doc;
        let mut stack: Vec<StackEntry> = Vec::with_capacity(64);
        stack.push(StackEntry::Enter(id, layout));

        while let Some(entry) = stack.pop() {
            match entry {
                StackEntry::Close(id, level) => {
                    if let Some(level) = level {
                        self.newline(level);
                    }
                    self.buf.push_str("</");
                    self.qualified_name(id);
                    self.buf.push('>');
                }
                StackEntry::Enter(id, layout) => {
                    let Some(node) = doc.get_node(id) else {
                        continue;
                    };
                    if let Layout::Block { level, newline: true } = layout {
                        self.newline(level);
                    }

                    match node.kind {
                        NodeKind::Element => {
                            self.start_tag(id);
                            if node.first_child.is_none() {
                                if self.options.expand_empty_elements {
                                    self.buf.push_str("></");
                                    self.qualified_name(id);
                                    self.buf.push('>');
                                } else {
                                    self.buf.push_str("/>");
                                }
                                continue;
                            }
                            self.buf.push('>');

                            let mixed = doc
                                .child_ids(id)
                                .any(|c| doc.node_kind(c).map_or(false, NodeKind::is_character_data));
                            let (child_layout, close) = match layout {
                                Layout::Block { level, .. } if !mixed => (
                                    Layout::Block {
                                        level: level + 1,
                                        newline: true,
                                    },
                                    Some(level),
                                ),
                                _ => (Layout::Inline, None),
                            };

                            stack.push(StackEntry::Close(id, close));
                            let mut child_id = node.last_child;
                            while let Some(cid) = child_id {
                                stack.push(StackEntry::Enter(cid, child_layout));
                                child_id = doc.get_node(cid).and_then(|n| n.prev_sibling);
                            }
                        }
                        NodeKind::Text => {
                            let content = doc.node_value(id).unwrap_or("");
                            self.buf.push_str(&escape_text(content));
                        }
                        NodeKind::CData => {
                            let content = doc.node_value(id).unwrap_or("");
                            self.buf.push_str("<![CDATA[");
                            self.buf.push_str(&content.replace("]]>", "]]]]><![CDATA[>"));
                            self.buf.push_str("]]>");
                        }
                        NodeKind::Comment => {
                            self.buf.push_str("<!--");
                            self.buf.push_str(doc.node_value(id).unwrap_or(""));
                            self.buf.push_str("-->");
                        }
                        NodeKind::ProcessingInstruction => {
                            self.buf.push_str("<?");
                            self.buf.push_str(doc.node_name(id).unwrap_or(""));
                            if let Some(data) = doc.node_value(id) {
                                self.buf.push(' ');
                                self.buf.push_str(data);
                            }
                            self.buf.push_str("?>");
                        }
                        NodeKind::DocumentType => {
                            self.buf.push_str("<!DOCTYPE ");
                            self.buf.push_str(doc.node_name(id).unwrap_or(""));
                            if let Some(body) = doc.node_value(id) {
                                self.buf.push(' ');
                                self.buf.push_str(body);
                            }
                            self.buf.push('>');
                        }
                        NodeKind::Attribute => {
                            self.attribute(id);
                        }
                        NodeKind::Document => {
                            let mut child_id = node.last_child;
                            while let Some(cid) = child_id {
                                stack.push(StackEntry::Enter(cid, layout));
                                child_id = doc.get_node(cid).and_then(|n| n.prev_sibling);
                            }
                        }
                    }
                }
            }
        }
    }

    fn qualified_name(&mut self, id: NodeId) {
        if let Some(prefix) = self.doc.node_prefix(id) {
            self.buf.push_str(prefix);
            self.buf.push(':');
        }
        self.buf.push_str(self.doc.node_name(id).unwrap_or(""));
    }

    fn start_tag(&mut self, id: NodeId) {
        self.buf.push('<');
        self.qualified_name(id);

        let doc = self.doc;
        if let Some(node) = doc.get_node(id) {
            for decl in &node.namespaces {
                self.buf.push_str(" xmlns");
                if decl.prefix_id != 0 {
                    self.buf.push(':');
                    self.buf.push_str(doc.strings.get(decl.prefix_id));
                }
                self.buf.push_str("=\"");
                self.buf.push_str(&escape_attribute(doc.strings.get(decl.uri_id)));
                self.buf.push('"');
            }
        }

        for attr in doc.attribute_ids(id) {
            self.buf.push(' ');
            self.attribute(attr);
        }
    }

    fn attribute(&mut self, id: NodeId) {
        self.qualified_name(id);
        self.buf.push_str("=\"");
        self.buf.push_str(&escape_attribute(self.doc.node_value(id).unwrap_or("")));
        self.buf.push('"');
    }
}

impl XmlDocument {
    /// Serialize the whole document
    pub fn to_xml_string(&self, options: &WriteOptions) -> String {
        let mut writer = Writer::new(self, options);
        writer.document();
        trace!(bytes = writer.buf.len(), formatted = options.formatted, "serialized document");
        writer.buf
    }

    /// Serialize the whole document as UTF-8 bytes
    pub fn to_bytes(&self, options: &WriteOptions) -> Vec<u8> {
        self.to_xml_string(options).into_bytes()
    }
}

impl fmt::Display for XmlDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xml_string(&WriteOptions::default()))
    }
}

impl<'d> Node<'d> {
    /// Serialize this node and its subtree. Namespace declarations inherited
    /// from ancestors are not repeated.
    pub fn to_xml(&self, options: &WriteOptions) -> String {
        let mut writer = Writer::new(self.document(), options);
        let layout = if options.formatted {
            Layout::Block { level: 0, newline: false }
        } else {
            Layout::Inline
        };
        writer.subtree(self.id(), layout);
        writer.buf
    }
}

impl fmt::Display for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xml(&WriteOptions::default()))
    }
}

//! XML Node representation
//!
//! Uses NodeId (u32) for compact, cache-friendly node references.

use serde::{Deserialize, Serialize};

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// Type of XML node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Document root
    Document,
    /// Element node
    Element,
    /// Attribute of an element
    Attribute,
    /// Text content
    Text,
    /// CDATA section
    CData,
    /// Comment
    Comment,
    /// Processing instruction
    ProcessingInstruction,
    /// DOCTYPE declaration, kept for pass-through
    DocumentType,
}

impl NodeKind {
    /// DOM node type number (1 = element, 2 = attribute, 3 = text, ...)
    pub fn type_code(self) -> u8 {
        match self {
            NodeKind::Element => 1,
            NodeKind::Attribute => 2,
            NodeKind::Text => 3,
            NodeKind::CData => 4,
            NodeKind::ProcessingInstruction => 7,
            NodeKind::Comment => 8,
            NodeKind::Document => 9,
            NodeKind::DocumentType => 10,
        }
    }

    /// Text or CDATA
    #[inline]
    pub fn is_character_data(self) -> bool {
        matches!(self, NodeKind::Text | NodeKind::CData)
    }
}

/// A namespace declared on an element (`xmlns` or `xmlns:prefix`).
/// Prefix id 0 is the default namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NsDecl {
    pub prefix_id: u32,
    pub uri_id: u32,
}

/// An XML node in the arena
#[derive(Debug, Clone)]
pub struct XmlNode {
    /// Type of this node
    pub kind: NodeKind,
    /// Parent node (None for the document node). For attributes, the owner element.
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    /// Sibling links. Attributes are chained to the other attributes of their owner.
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub first_attribute: Option<NodeId>,
    pub last_attribute: Option<NodeId>,
    /// Local name (elements, attributes), target (PIs) or root name (DOCTYPE)
    pub name_id: u32,
    /// Index into string pool for namespace prefix, or 0
    pub prefix_id: u32,
    /// Index into string pool for namespace URI, or 0
    pub namespace_id: u32,
    /// Character data, attribute value, PI data or DOCTYPE body
    pub value_id: Option<u32>,
    /// Namespace declarations carried by this element
    pub namespaces: Vec<NsDecl>,
    /// Depth in document tree
    pub depth: u16,
}

impl XmlNode {
    fn new(kind: NodeKind, parent: Option<NodeId>, depth: u16) -> Self {
        XmlNode {
            kind,
            parent,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            first_attribute: None,
            last_attribute: None,
            name_id: 0,
            prefix_id: 0,
            namespace_id: 0,
            value_id: None,
            namespaces: Vec::new(),
            depth,
        }
    }

    /// Create a new document root node
    pub fn document() -> Self {
        Self::new(NodeKind::Document, None, 0)
    }

    /// Create a new element node
    pub fn element(name_id: u32, parent: NodeId, depth: u16) -> Self {
        XmlNode {
            name_id,
            ..Self::new(NodeKind::Element, Some(parent), depth)
        }
    }

    /// Create an attribute owned by `owner`
    pub fn attribute(name_id: u32, value_id: u32, owner: NodeId, depth: u16) -> Self {
        XmlNode {
            name_id,
            value_id: Some(value_id),
            ..Self::new(NodeKind::Attribute, Some(owner), depth)
        }
    }

    /// Create a text, CDATA or comment node
    pub fn character_data(kind: NodeKind, value_id: u32, parent: NodeId, depth: u16) -> Self {
        debug_assert!(matches!(kind, NodeKind::Text | NodeKind::CData | NodeKind::Comment));
        XmlNode {
            value_id: Some(value_id),
            ..Self::new(kind, Some(parent), depth)
        }
    }

    /// Create a processing instruction node
    pub fn processing_instruction(target_id: u32, data_id: Option<u32>, parent: NodeId, depth: u16) -> Self {
        XmlNode {
            name_id: target_id,
            value_id: data_id,
            ..Self::new(NodeKind::ProcessingInstruction, Some(parent), depth)
        }
    }

    /// Create a DOCTYPE node
    pub fn document_type(name_id: u32, body_id: Option<u32>) -> Self {
        XmlNode {
            name_id,
            value_id: body_id,
            ..Self::new(NodeKind::DocumentType, Some(0), 1)
        }
    }

    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }

    #[inline]
    pub fn has_attributes(&self) -> bool {
        self.first_attribute.is_some()
    }
}

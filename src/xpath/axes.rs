//! XPath Axes Implementation
//!
//! Every axis collects into a caller-owned buffer in axis order: reverse
//! axes (ancestor, preceding, preceding-sibling, parent) yield the nearest
//! node first. Attribute nodes have no siblings; their following and
//! preceding nodes are those of the owner element, with the owner's
//! descendants counting as following. The namespace axis is always empty.

use super::parser::{Axis, NodeTest};
use crate::dom::{NodeId, NodeKind, XmlDocument, XmlNode};
use std::collections::HashMap;

/// Prefix to namespace URI bindings used by prefixed name tests
pub type Namespaces = HashMap<String, String>;

/// Append the nodes on `axis` from `context` to `out`
pub fn collect(doc: &XmlDocument, context: NodeId, axis: Axis, out: &mut Vec<NodeId>) {
    match axis {
        Axis::Child => out.extend(doc.child_ids(context)),
        Axis::Descendant => out.extend(doc.descendant_ids(context)),
        Axis::DescendantOrSelf => {
            out.push(context);
            out.extend(doc.descendant_ids(context));
        }
        Axis::Parent => out.extend(doc.parent_id(context)),
        Axis::Ancestor => out.extend(doc.ancestors_or_self(context).skip(1)),
        Axis::AncestorOrSelf => out.extend(doc.ancestors_or_self(context)),
        Axis::FollowingSibling => {
            if !is_attribute(doc, context) {
                out.extend(siblings(doc, context, |n| n.next_sibling));
            }
        }
        Axis::PrecedingSibling => {
            if !is_attribute(doc, context) {
                out.extend(siblings(doc, context, |n| n.prev_sibling));
            }
        }
        Axis::Following => following(doc, context, out),
        Axis::Preceding => preceding(doc, context, out),
        Axis::Self_ => out.push(context),
        Axis::Attribute => out.extend(doc.attribute_ids(context)),
        Axis::Namespace => {}
    }
}

fn is_attribute(doc: &XmlDocument, id: NodeId) -> bool {
    doc.node_kind(id) == Some(NodeKind::Attribute)
}

fn siblings<'d>(
    doc: &'d XmlDocument,
    start: NodeId,
    step: fn(&XmlNode) -> Option<NodeId>,
) -> impl Iterator<Item = NodeId> + 'd {
    std::iter::successors(doc.get_node(start).and_then(step), move |&id| {
        doc.get_node(id).and_then(step)
    })
}

fn following(doc: &XmlDocument, context: NodeId, out: &mut Vec<NodeId>) {
    // An attribute is followed by its owner's content
    let mut anchor = context;
    if is_attribute(doc, context) {
        let Some(owner) = doc.parent_id(context) else {
            return;
        };
        out.extend(doc.descendant_ids(owner));
        anchor = owner;
    }

    for node in doc.ancestors_or_self(anchor) {
        for sibling in siblings(doc, node, |n| n.next_sibling) {
            out.push(sibling);
            out.extend(doc.descendant_ids(sibling));
        }
    }
}

fn preceding(doc: &XmlDocument, context: NodeId, out: &mut Vec<NodeId>) {
    let anchor = if is_attribute(doc, context) {
        match doc.parent_id(context) {
            Some(owner) => owner,
            None => return,
        }
    } else {
        context
    };

    // Walk up; at each level the preceding siblings' subtrees come in reverse
    for node in doc.ancestors_or_self(anchor) {
        for sibling in siblings(doc, node, |n| n.prev_sibling) {
            let start = out.len();
            out.push(sibling);
            out.extend(doc.descendant_ids(sibling));
            out[start..].reverse();
        }
    }
}

/// Principal node type: attributes on the attribute axis, elements elsewhere
fn principal_kind(axis: Axis) -> NodeKind {
    if axis == Axis::Attribute {
        NodeKind::Attribute
    } else {
        NodeKind::Element
    }
}

/// Check a node against a node test. Prefixed tests compare namespace URIs
/// when `namespaces` binds the prefix and the literal prefix otherwise.
pub fn matches_node_test(
    doc: &XmlDocument,
    node_id: NodeId,
    axis: Axis,
    test: &NodeTest,
    namespaces: Option<&Namespaces>,
) -> bool {
    let Some(kind) = doc.node_kind(node_id) else {
        return false;
    };

    let prefix_matches = |prefix: &str| match namespaces.and_then(|ns| ns.get(prefix)) {
        Some(uri) => doc.node_namespace_uri(node_id) == Some(uri.as_str()),
        None => doc.node_prefix(node_id) == Some(prefix),
    };

    match test {
        NodeTest::Any => kind == principal_kind(axis),
        NodeTest::Name(name) => kind == principal_kind(axis) && doc.node_name(node_id) == Some(name.as_str()),
        NodeTest::QName(prefix, local) => {
            kind == principal_kind(axis) && doc.node_name(node_id) == Some(local.as_str()) && prefix_matches(prefix)
        }
        NodeTest::NamespaceWildcard(prefix) => kind == principal_kind(axis) && prefix_matches(prefix),
        NodeTest::Node => kind != NodeKind::DocumentType,
        NodeTest::Text => kind.is_character_data(),
        NodeTest::Comment => kind == NodeKind::Comment,
        NodeTest::ProcessingInstruction(target) => {
            kind == NodeKind::ProcessingInstruction
                && target.as_deref().map_or(true, |t| doc.node_name(node_id) == Some(t))
        }
    }
}

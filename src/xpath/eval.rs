//! XPath Evaluation Engine
//!
//! Runs compiled op lists against an [`XmlDocument`] with a value stack.

use super::axes::{self, matches_node_test, Namespaces};
use super::compiler::{CompiledExpr, Op, Predicate};
use super::functions;
use super::parser::{Axis, BinaryOp, NodeTest};
use super::value::XPathValue;
use crate::dom::{NodeId, XmlDocument};
use crate::error::{XPathError, XPathErrorCode};

/// Evaluation context
pub struct EvalContext<'a> {
    pub doc: &'a XmlDocument,
    pub node: NodeId,
    pub position: usize,
    pub size: usize,
    /// Prefix bindings for prefixed name tests
    pub namespaces: Option<&'a Namespaces>,
}

impl<'a> EvalContext<'a> {
    pub fn new(doc: &'a XmlDocument, node: NodeId, namespaces: Option<&'a Namespaces>) -> Self {
        EvalContext {
            doc,
            node,
            position: 1,
            size: 1,
            namespaces,
        }
    }

    fn at(&self, node: NodeId, position: usize, size: usize) -> Self {
        EvalContext {
            doc: self.doc,
            node,
            position,
            size,
            namespaces: self.namespaces,
        }
    }
}

fn pop(stack: &mut Vec<XPathValue>) -> Result<XPathValue, XPathError> {
    stack
        .pop()
        .ok_or_else(|| XPathError::new(XPathErrorCode::ExpressionError, "Stack underflow"))
}

fn pop_nodeset(stack: &mut Vec<XPathValue>, what: &str) -> Result<Vec<NodeId>, XPathError> {
    match pop(stack)? {
        XPathValue::NodeSet(nodes) => Ok(nodes),
        other => Err(XPathError::new(
            XPathErrorCode::InvalidType,
            format!("{} requires a node-set, got a {}", what, other.type_name()),
        )),
    }
}

/// Evaluate a compiled expression
pub fn evaluate_compiled(expr: &CompiledExpr, ctx: &EvalContext<'_>) -> Result<XPathValue, XPathError> {
    let doc = ctx.doc;
    let mut stack: Vec<XPathValue> = Vec::new();

    for op in &expr.ops {
        match op {
            Op::Root => stack.push(XPathValue::single_node(0)),

            Op::Context => stack.push(XPathValue::single_node(ctx.node)),

            Op::Step { axis, test, predicates } => {
                let nodes = pop_nodeset(&mut stack, "A location step")?;
                let result = apply_step(ctx, &nodes, *axis, test, predicates)?;
                stack.push(XPathValue::NodeSet(result));
            }

            Op::Filter(pred) => {
                let nodes = pop_nodeset(&mut stack, "A predicate")?;
                stack.push(XPathValue::NodeSet(apply_predicate(ctx, nodes, pred)?));
            }

            Op::Union => {
                let right = pop_nodeset(&mut stack, "Union")?;
                let mut left = pop_nodeset(&mut stack, "Union")?;
                left.extend(right);
                doc.sort_document_order(&mut left);
                stack.push(XPathValue::NodeSet(left));
            }

            Op::Number(n) => stack.push(XPathValue::Number(*n)),

            Op::Literal(s) => stack.push(XPathValue::String(s.clone())),

            Op::Negate => {
                let val = pop(&mut stack)?;
                stack.push(XPathValue::Number(-val.to_number(doc)));
            }

            Op::Binary(op) => {
                let right = pop(&mut stack)?;
                let left = pop(&mut stack)?;

                let result = match op {
                    BinaryOp::Or => XPathValue::Boolean(left.to_boolean() || right.to_boolean()),
                    BinaryOp::And => XPathValue::Boolean(left.to_boolean() && right.to_boolean()),
                    BinaryOp::Eq
                    | BinaryOp::NotEq
                    | BinaryOp::Lt
                    | BinaryOp::LtEq
                    | BinaryOp::Gt
                    | BinaryOp::GtEq => XPathValue::Boolean(compare(doc, *op, &left, &right)),
                    BinaryOp::Add => XPathValue::Number(left.to_number(doc) + right.to_number(doc)),
                    BinaryOp::Sub => XPathValue::Number(left.to_number(doc) - right.to_number(doc)),
                    BinaryOp::Mul => XPathValue::Number(left.to_number(doc) * right.to_number(doc)),
                    BinaryOp::Div => XPathValue::Number(left.to_number(doc) / right.to_number(doc)),
                    BinaryOp::Mod => XPathValue::Number(left.to_number(doc) % right.to_number(doc)),
                };
                stack.push(result);
            }

            Op::Call(func, arg_count) => {
                if stack.len() < *arg_count {
                    return Err(XPathError::new(XPathErrorCode::ExpressionError, "Stack underflow"));
                }
                let args = stack.split_off(stack.len() - arg_count);
                stack.push(functions::call(*func, args, ctx)?);
            }
        }
    }

    pop(&mut stack)
}

/// Apply one step to every input node. Predicates run per input node over
/// the axis-ordered candidates; the union is returned in document order.
fn apply_step(
    ctx: &EvalContext<'_>,
    input: &[NodeId],
    axis: Axis,
    test: &NodeTest,
    predicates: &[Predicate],
) -> Result<Vec<NodeId>, XPathError> {
    let doc = ctx.doc;
    let mut result = Vec::new();
    let mut candidates = Vec::new();

    for &node in input {
        candidates.clear();
        axes::collect(doc, node, axis, &mut candidates);
        candidates.retain(|&c| matches_node_test(doc, c, axis, test, ctx.namespaces));

        if predicates.is_empty() {
            result.extend_from_slice(&candidates);
            continue;
        }
        let mut selected = std::mem::take(&mut candidates);
        for pred in predicates {
            selected = apply_predicate(ctx, selected, pred)?;
        }
        result.extend_from_slice(&selected);
        candidates = selected;
    }

    // A single forward traversal is already ordered and duplicate free
    if input.len() > 1 || axis.is_reverse() {
        doc.sort_document_order(&mut result);
    }
    Ok(result)
}

/// Keep the nodes for which the predicate holds. A numeric result is
/// compared with the proximity position.
fn apply_predicate(ctx: &EvalContext<'_>, nodes: Vec<NodeId>, pred: &Predicate) -> Result<Vec<NodeId>, XPathError> {
    match pred {
        Predicate::Position(pos) => Ok(pos
            .checked_sub(1)
            .and_then(|i| nodes.get(i))
            .map(|&n| vec![n])
            .unwrap_or_default()),
        Predicate::Expr(expr) => {
            let size = nodes.len();
            let mut filtered = Vec::new();
            for (i, &node) in nodes.iter().enumerate() {
                let pred_ctx = ctx.at(node, i + 1, size);
                let include = match evaluate_compiled(expr, &pred_ctx)? {
                    XPathValue::Number(n) => n == (i + 1) as f64,
                    other => other.to_boolean(),
                };
                if include {
                    filtered.push(node);
                }
            }
            Ok(filtered)
        }
    }
}

/// XPath 1.0 comparison. Node-sets compare true when any member satisfies
/// the comparison; a node-set against a boolean compares its truth value.
fn compare(doc: &XmlDocument, op: BinaryOp, left: &XPathValue, right: &XPathValue) -> bool {
    let node_string = |id: NodeId| XPathValue::String(doc.string_value(id).into_owned());

    match (left, right) {
        (XPathValue::NodeSet(_), XPathValue::Boolean(_)) | (XPathValue::Boolean(_), XPathValue::NodeSet(_)) => {
            compare_atomic(doc, op, &XPathValue::Boolean(left.to_boolean()), &XPathValue::Boolean(right.to_boolean()))
        }
        (XPathValue::NodeSet(l), XPathValue::NodeSet(r)) => {
            let rights: Vec<XPathValue> = r.iter().map(|&id| node_string(id)).collect();
            l.iter().any(|&id| {
                let lv = node_string(id);
                rights.iter().any(|rv| compare_atomic(doc, op, &lv, rv))
            })
        }
        (XPathValue::NodeSet(l), other) => l.iter().any(|&id| compare_atomic(doc, op, &node_string(id), other)),
        (other, XPathValue::NodeSet(r)) => r.iter().any(|&id| compare_atomic(doc, op, other, &node_string(id))),
        _ => compare_atomic(doc, op, left, right),
    }
}

fn compare_atomic(doc: &XmlDocument, op: BinaryOp, left: &XPathValue, right: &XPathValue) -> bool {
    let boolean = |v: &XPathValue| matches!(v, XPathValue::Boolean(_));
    let number = |v: &XPathValue| matches!(v, XPathValue::Number(_));

    match op {
        BinaryOp::Eq | BinaryOp::NotEq => {
            let equal = if boolean(left) || boolean(right) {
                left.to_boolean() == right.to_boolean()
            } else if number(left) || number(right) {
                left.to_number(doc) == right.to_number(doc)
            } else {
                left.to_string_value(doc) == right.to_string_value(doc)
            };
            if op == BinaryOp::Eq {
                equal
            } else {
                !equal
            }
        }
        _ => {
            let (l, r) = (left.to_number(doc), right.to_number(doc));
            match op {
                BinaryOp::Lt => l < r,
                BinaryOp::LtEq => l <= r,
                BinaryOp::Gt => l > r,
                _ => l >= r,
            }
        }
    }
}

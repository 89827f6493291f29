//! XPath Expression Compiler
//!
//! Lowers the AST to a postfix op list run by the evaluator. Function names,
//! arity and variable references are resolved here, so a compiled
//! expression only fails at run time on argument types.

use super::functions::Function;
use super::parser::{self, Axis, BinaryOp, Expr, NodeTest, Step};
use crate::error::{XPathError, XPathErrorCode};

/// Compiled XPath expression
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpr {
    pub ops: Vec<Op>,
}

/// Compiled operation
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Push the document node
    Root,
    /// Push the context node
    Context,
    /// Replace the node-set on top of the stack with the nodes reached
    /// through a step. Predicates see proximity positions along the axis.
    Step {
        axis: Axis,
        test: NodeTest,
        predicates: Vec<Predicate>,
    },
    /// Filter the node-set on top of the stack in document order
    Filter(Predicate),
    Union,
    Number(f64),
    Literal(String),
    Call(Function, usize),
    Binary(BinaryOp),
    Negate,
}

/// A compiled predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Fast path: `[n]` with a literal positive integer
    Position(usize),
    Expr(CompiledExpr),
}

impl CompiledExpr {
    /// Compile a parsed expression
    pub fn compile(expr: &Expr) -> Result<Self, XPathError> {
        let mut ops = Vec::new();
        Self::compile_expr(expr, &mut ops)?;
        Ok(CompiledExpr { ops })
    }

    fn compile_expr(expr: &Expr, ops: &mut Vec<Op>) -> Result<(), XPathError> {
        match expr {
            Expr::Root => ops.push(Op::Root),
            Expr::Number(n) => ops.push(Op::Number(*n)),
            Expr::Literal(s) => ops.push(Op::Literal(s.clone())),
            Expr::Variable(name) => {
                return Err(XPathError::new(
                    XPathErrorCode::UndefinedVariable,
                    format!("Undefined variable ${}", name),
                ));
            }
            Expr::Negate(inner) => {
                Self::compile_expr(inner, ops)?;
                ops.push(Op::Negate);
            }
            Expr::Binary(left, op, right) => {
                Self::compile_expr(left, ops)?;
                Self::compile_expr(right, ops)?;
                ops.push(Op::Binary(*op));
            }
            Expr::Union(left, right) => {
                Self::compile_expr(left, ops)?;
                Self::compile_expr(right, ops)?;
                ops.push(Op::Union);
            }
            Expr::Path(base, step) => {
                Self::compile_expr(base, ops)?;
                Self::compile_step(step, ops)?;
            }
            Expr::Step(step) => {
                ops.push(Op::Context);
                Self::compile_step(step, ops)?;
            }
            Expr::Filter(base, pred) => {
                Self::compile_expr(base, ops)?;
                ops.push(Op::Filter(Self::compile_predicate(pred)?));
            }
            Expr::Function(name, args) => {
                let func = Function::from_name(name).ok_or_else(|| {
                    XPathError::new(XPathErrorCode::UnknownFunction, format!("Unknown function: {}", name))
                })?;
                if !func.accepts(args.len()) {
                    return Err(XPathError::new(
                        XPathErrorCode::InvalidArity,
                        format!("{}() does not take {} argument(s)", name, args.len()),
                    ));
                }
                for arg in args {
                    Self::compile_expr(arg, ops)?;
                }
                ops.push(Op::Call(func, args.len()));
            }
        }
        Ok(())
    }

    fn compile_step(step: &Step, ops: &mut Vec<Op>) -> Result<(), XPathError> {
        let predicates = step
            .predicates
            .iter()
            .map(Self::compile_predicate)
            .collect::<Result<Vec<_>, _>>()?;

        // descendant-or-self::node()/child::x is descendant::x when there are
        // no predicates to observe the difference in positions
        let fuse = step.axis == Axis::Child
            && predicates.is_empty()
            && matches!(
                ops.last(),
                Some(Op::Step {
                    axis: Axis::DescendantOrSelf,
                    test: NodeTest::Node,
                    predicates,
                }) if predicates.is_empty()
            );
        if fuse {
            ops.pop();
            ops.push(Op::Step {
                axis: Axis::Descendant,
                test: step.node_test.clone(),
                predicates,
            });
            return Ok(());
        }

        ops.push(Op::Step {
            axis: step.axis,
            test: step.node_test.clone(),
            predicates,
        });
        Ok(())
    }

    fn compile_predicate(expr: &Expr) -> Result<Predicate, XPathError> {
        if let Expr::Number(n) = expr {
            if *n >= 1.0 && n.fract() == 0.0 && *n <= usize::MAX as f64 {
                return Ok(Predicate::Position(*n as usize));
            }
        }
        Ok(Predicate::Expr(CompiledExpr::compile(expr)?))
    }
}

/// Compile an XPath expression string
pub fn compile(xpath: &str) -> Result<CompiledExpr, XPathError> {
    let expr = parser::parse(xpath)?;
    CompiledExpr::compile(&expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_absolute() {
        let compiled = compile("/root").unwrap();
        assert_eq!(compiled.ops[0], Op::Root);
        assert!(matches!(compiled.ops[1], Op::Step { axis: Axis::Child, .. }));
    }

    #[test]
    fn test_descendant_fusion() {
        let compiled = compile("//item").unwrap();
        assert_eq!(
            compiled.ops,
            vec![
                Op::Root,
                Op::Step {
                    axis: Axis::Descendant,
                    test: NodeTest::Name("item".to_string()),
                    predicates: vec![],
                }
            ]
        );

        // Positional predicates keep the two steps apart
        let compiled = compile("//item[1]").unwrap();
        assert_eq!(compiled.ops.len(), 3);
    }

    #[test]
    fn test_position_fast_path() {
        let compiled = compile("a[2][position() = 1]").unwrap();
        let Op::Step { predicates, .. } = &compiled.ops[1] else {
            panic!("expected a step");
        };
        assert_eq!(predicates[0], Predicate::Position(2));
        assert!(matches!(predicates[1], Predicate::Expr(_)));
    }

    #[test]
    fn test_compile_errors() {
        assert_eq!(compile("$v").unwrap_err().code, XPathErrorCode::UndefinedVariable);
        assert_eq!(compile("frobnicate()").unwrap_err().code, XPathErrorCode::UnknownFunction);
        assert_eq!(compile("count()").unwrap_err().code, XPathErrorCode::InvalidArity);
        assert_eq!(compile("true(1)").unwrap_err().code, XPathErrorCode::InvalidArity);
        assert_eq!(compile("a[$v]").unwrap_err().code, XPathErrorCode::UndefinedVariable);
    }
}

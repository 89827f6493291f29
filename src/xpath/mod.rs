//! XPath 1.0 Engine
//!
//! Expressions go through lexer, parser and compiler into a postfix op list,
//! which the evaluator runs against an [`XmlDocument`](crate::XmlDocument).
//! - All axes but `namespace`, which selects nothing
//! - The 27 core functions
//! - Compiled expressions cached per engine

pub mod axes;
pub mod compiler;
pub mod engine;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parallel;
pub mod parser;
pub mod result;
pub mod value;

pub use axes::Namespaces;
pub use compiler::{compile, CompiledExpr};
pub use engine::XPathEngine;
pub use result::{NodeSet, NodeSetIntoIter, XPathResult};
pub use value::XPathValue;

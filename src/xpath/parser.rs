//! XPath Parser
//!
//! Recursive descent parser for XPath 1.0 expressions.

use super::lexer::{Lexer, Token};
use crate::error::{XPathError, XPathErrorCode};

/// XPath expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// The document node (`/`)
    Root,
    /// Union of two expressions (`|`)
    Union(Box<Expr>, Box<Expr>),
    /// A step applied to every node of a node-set expression
    Path(Box<Expr>, Box<Step>),
    /// A step taken from the context node
    Step(Box<Step>),
    /// Filter expression with predicate
    Filter(Box<Expr>, Box<Expr>),
    Function(String, Vec<Expr>),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    Negate(Box<Expr>),
    Number(f64),
    Literal(String),
    Variable(String),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Location step in a path
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub node_test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    fn new(axis: Axis, node_test: NodeTest) -> Self {
        Step {
            axis,
            node_test,
            predicates: Vec::new(),
        }
    }

    /// `descendant-or-self::node()`, the expansion of `//`
    fn descendant_or_self() -> Self {
        Step::new(Axis::DescendantOrSelf, NodeTest::Node)
    }
}

/// XPath axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
    Self_,
    Attribute,
    Namespace,
}

impl Axis {
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "child" => Some(Axis::Child),
            "descendant" => Some(Axis::Descendant),
            "descendant-or-self" => Some(Axis::DescendantOrSelf),
            "parent" => Some(Axis::Parent),
            "ancestor" => Some(Axis::Ancestor),
            "ancestor-or-self" => Some(Axis::AncestorOrSelf),
            "following-sibling" => Some(Axis::FollowingSibling),
            "preceding-sibling" => Some(Axis::PrecedingSibling),
            "following" => Some(Axis::Following),
            "preceding" => Some(Axis::Preceding),
            "self" => Some(Axis::Self_),
            "attribute" => Some(Axis::Attribute),
            "namespace" => Some(Axis::Namespace),
            _ => None,
        }
    }

    /// Reverse axes number proximity positions from the context node backwards
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Axis::Parent | Axis::Ancestor | Axis::AncestorOrSelf | Axis::PrecedingSibling | Axis::Preceding
        )
    }
}

/// Node test in a location step
#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    /// `*`, any node of the axis' principal type
    Any,
    /// Unprefixed name, matched against the local name
    Name(String),
    /// `prefix:local`
    QName(String, String),
    /// `prefix:*`
    NamespaceWildcard(String),
    Node,
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
}

/// Deepest nesting of brackets, predicates, argument lists and negations
const MAX_NESTING: usize = 128;
/// Deepest expression tree, counting every operator, step and union link
const MAX_DEPTH: usize = 1024;

/// XPath parser
pub struct Parser {
    tokens: Vec<(Token, usize)>,
    index: usize,
    nesting: usize,
    depth: usize,
}

impl Parser {
    pub fn new(input: &str) -> Result<Self, XPathError> {
        Ok(Parser {
            tokens: Lexer::new(input).tokenize()?,
            index: 0,
            nesting: 0,
            depth: 0,
        })
    }

    /// Parse a complete expression; trailing tokens are an error
    pub fn parse(&mut self) -> Result<Expr, XPathError> {
        let expr = self.parse_or_expr()?;
        if *self.current() != Token::Eof {
            return Err(self.unexpected());
        }
        Ok(expr)
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.index).map(|(t, _)| t).unwrap_or(&Token::Eof)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.index)
            .or_else(|| self.tokens.last())
            .map_or(0, |(_, p)| *p)
    }

    fn advance(&mut self) {
        if self.index < self.tokens.len() {
            self.index += 1;
        }
    }

    fn unexpected(&self) -> XPathError {
        XPathError::new(
            XPathErrorCode::ExpressionError,
            format!("Unexpected token {:?}", self.current()),
        )
        .at(self.position())
    }

    fn too_deep(&self) -> XPathError {
        XPathError::new(XPathErrorCode::ExpressionError, "Expression is nested too deeply").at(self.position())
    }

    /// Account for one more level of expression tree below the current one
    fn deepen(&mut self) -> Result<(), XPathError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.too_deep());
        }
        Ok(())
    }

    /// Run a production that recurses back into the expression grammar
    fn nested<T, F>(&mut self, parse: F) -> Result<T, XPathError>
    where
        F: FnOnce(&mut Self) -> Result<T, XPathError>,
    {
        if self.nesting >= MAX_NESTING {
            return Err(self.too_deep());
        }
        let depth = self.depth;
        self.nesting += 1;
        self.deepen()?;
        let result = parse(self);
        self.nesting -= 1;
        self.depth = depth;
        result
    }

    fn expect_closing(&mut self, token: Token) -> Result<(), XPathError> {
        if *self.current() == token {
            self.advance();
            Ok(())
        } else {
            let what = if token == Token::RightParen { ")" } else { "]" };
            Err(XPathError::new(XPathErrorCode::Unclosed, format!("Expected {}", what)).at(self.position()))
        }
    }

    fn binary_level<F>(&mut self, next: F, ops: &[(Token, BinaryOp)]) -> Result<Expr, XPathError>
    where
        F: Fn(&mut Self) -> Result<Expr, XPathError>,
    {
        let depth = self.depth;
        let mut left = next(self)?;
        while let Some(&(_, op)) = ops.iter().find(|(t, _)| t == self.current()) {
            self.advance();
            self.deepen()?;
            let right = next(self)?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_or_expr(&mut self) -> Result<Expr, XPathError> {
        self.binary_level(Self::parse_and_expr, &[(Token::Or, BinaryOp::Or)])
    }

    fn parse_and_expr(&mut self) -> Result<Expr, XPathError> {
        self.binary_level(Self::parse_equality_expr, &[(Token::And, BinaryOp::And)])
    }

    fn parse_equality_expr(&mut self) -> Result<Expr, XPathError> {
        self.binary_level(
            Self::parse_relational_expr,
            &[(Token::Eq, BinaryOp::Eq), (Token::NotEq, BinaryOp::NotEq)],
        )
    }

    fn parse_relational_expr(&mut self) -> Result<Expr, XPathError> {
        self.binary_level(
            Self::parse_additive_expr,
            &[
                (Token::Lt, BinaryOp::Lt),
                (Token::LtEq, BinaryOp::LtEq),
                (Token::Gt, BinaryOp::Gt),
                (Token::GtEq, BinaryOp::GtEq),
            ],
        )
    }

    fn parse_additive_expr(&mut self) -> Result<Expr, XPathError> {
        self.binary_level(
            Self::parse_multiplicative_expr,
            &[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)],
        )
    }

    fn parse_multiplicative_expr(&mut self) -> Result<Expr, XPathError> {
        self.binary_level(
            Self::parse_unary_expr,
            &[
                (Token::Multiply, BinaryOp::Mul),
                (Token::Div, BinaryOp::Div),
                (Token::Mod, BinaryOp::Mod),
            ],
        )
    }

    fn parse_unary_expr(&mut self) -> Result<Expr, XPathError> {
        if *self.current() == Token::Minus {
            self.advance();
            let expr = self.nested(Self::parse_unary_expr)?;
            Ok(Expr::Negate(Box::new(expr)))
        } else {
            self.parse_union_expr()
        }
    }

    fn parse_union_expr(&mut self) -> Result<Expr, XPathError> {
        let depth = self.depth;
        let mut left = self.parse_path_expr()?;
        while *self.current() == Token::Pipe {
            self.advance();
            self.deepen()?;
            let right = self.parse_path_expr()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.current(),
            Token::Name(_)
                | Token::NameTest(_)
                | Token::NodeType(_)
                | Token::Star
                | Token::At
                | Token::Dot
                | Token::DoubleDot
                | Token::Axis(_)
        )
    }

    fn parse_path_expr(&mut self) -> Result<Expr, XPathError> {
        match self.current() {
            Token::Slash => {
                self.advance();
                if !self.starts_step() {
                    return Ok(Expr::Root);
                }
                let step = self.parse_step()?;
                self.parse_relative_path(Expr::Path(Box::new(Expr::Root), Box::new(step)))
            }
            Token::DoubleSlash => {
                self.advance();
                let base = Expr::Path(Box::new(Expr::Root), Box::new(Step::descendant_or_self()));
                let step = self.parse_step()?;
                self.parse_relative_path(Expr::Path(Box::new(base), Box::new(step)))
            }
            _ if self.starts_step() => {
                let step = self.parse_step()?;
                self.parse_relative_path(Expr::Step(Box::new(step)))
            }
            _ => {
                let filter = self.parse_filter_expr()?;
                self.parse_relative_path(filter)
            }
        }
    }

    /// Continue a path with `/step` and `//step` segments
    fn parse_relative_path(&mut self, mut expr: Expr) -> Result<Expr, XPathError> {
        let depth = self.depth;
        loop {
            match self.current() {
                Token::Slash => {
                    self.advance();
                    self.deepen()?;
                    let step = self.parse_step()?;
                    expr = Expr::Path(Box::new(expr), Box::new(step));
                }
                Token::DoubleSlash => {
                    self.advance();
                    self.deepen()?;
                    self.deepen()?;
                    expr = Expr::Path(Box::new(expr), Box::new(Step::descendant_or_self()));
                    let step = self.parse_step()?;
                    expr = Expr::Path(Box::new(expr), Box::new(step));
                }
                _ => {
                    self.depth = depth;
                    return Ok(expr);
                }
            }
        }
    }

    fn parse_filter_expr(&mut self) -> Result<Expr, XPathError> {
        let depth = self.depth;
        let mut expr = self.parse_primary_expr()?;
        while *self.current() == Token::LeftBracket {
            self.deepen()?;
            let pred = self.parse_predicate()?;
            expr = Expr::Filter(Box::new(expr), Box::new(pred));
        }
        self.depth = depth;
        Ok(expr)
    }

    fn parse_predicate(&mut self) -> Result<Expr, XPathError> {
        self.advance();
        let pred = self.nested(Self::parse_or_expr)?;
        self.expect_closing(Token::RightBracket)?;
        Ok(pred)
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, XPathError> {
        let expr = match self.current().clone() {
            Token::Number(n) => Expr::Number(n),
            Token::Literal(s) => Expr::Literal(s),
            Token::Variable(name) => Expr::Variable(name),
            Token::LeftParen => {
                self.advance();
                let expr = self.nested(Self::parse_or_expr)?;
                self.expect_closing(Token::RightParen)?;
                return Ok(expr);
            }
            Token::FunctionName(name) => {
                self.advance();
                self.advance(); // (
                let args = self.nested(Self::parse_function_args)?;
                return Ok(Expr::Function(name, args));
            }
            _ => return Err(self.unexpected()),
        };
        self.advance();
        Ok(expr)
    }

    fn parse_step(&mut self) -> Result<Step, XPathError> {
        match self.current() {
            Token::Dot => {
                self.advance();
                return Ok(Step::new(Axis::Self_, NodeTest::Node));
            }
            Token::DoubleDot => {
                self.advance();
                return Ok(Step::new(Axis::Parent, NodeTest::Node));
            }
            _ => {}
        }

        let mut axis = Axis::Child;
        match self.current() {
            Token::At => {
                axis = Axis::Attribute;
                self.advance();
            }
            Token::Axis(name) => {
                axis = Axis::from_name(name).ok_or_else(|| {
                    XPathError::new(XPathErrorCode::ExpressionError, format!("Unknown axis: {}", name))
                        .at(self.position())
                })?;
                self.advance();
                self.advance(); // ::
            }
            _ => {}
        }

        let node_test = self.parse_node_test()?;
        let mut step = Step::new(axis, node_test);
        while *self.current() == Token::LeftBracket {
            step.predicates.push(self.parse_predicate()?);
        }
        Ok(step)
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, XPathError> {
        let test = match self.current().clone() {
            Token::Star => NodeTest::Any,
            Token::Name(name) => NodeTest::Name(name),
            Token::NameTest(qname) => match qname.split_once(':') {
                Some((prefix, "*")) => NodeTest::NamespaceWildcard(prefix.to_string()),
                Some((prefix, local)) => NodeTest::QName(prefix.to_string(), local.to_string()),
                None => NodeTest::Name(qname),
            },
            Token::NodeType(name) => {
                self.advance();
                self.advance(); // (
                let target = match self.current().clone() {
                    Token::Literal(s) if name == "processing-instruction" => {
                        self.advance();
                        Some(s)
                    }
                    _ => None,
                };
                self.expect_closing(Token::RightParen)?;
                return Ok(match name.as_str() {
                    "node" => NodeTest::Node,
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    _ => NodeTest::ProcessingInstruction(target),
                });
            }
            _ => return Err(self.unexpected()),
        };
        self.advance();
        Ok(test)
    }

    fn parse_function_args(&mut self) -> Result<Vec<Expr>, XPathError> {
        let mut args = Vec::new();
        if *self.current() != Token::RightParen {
            args.push(self.parse_or_expr()?);
            while *self.current() == Token::Comma {
                self.advance();
                args.push(self.parse_or_expr()?);
            }
        }
        self.expect_closing(Token::RightParen)?;
        Ok(args)
    }
}

/// Parse an XPath expression string
pub fn parse(input: &str) -> Result<Expr, XPathError> {
    Parser::new(input)?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(name: &str) -> Step {
        Step::new(Axis::Child, NodeTest::Name(name.to_string()))
    }

    fn code(input: &str) -> XPathErrorCode {
        parse(input).unwrap_err().code
    }

    #[test]
    fn test_absolute_path() {
        let expr = parse("/root/child").unwrap();
        let expected = Expr::Path(
            Box::new(Expr::Path(Box::new(Expr::Root), Box::new(child("root")))),
            Box::new(child("child")),
        );
        assert_eq!(expr, expected);
    }

    #[test]
    fn test_root_only() {
        assert_eq!(parse("/").unwrap(), Expr::Root);
        assert!(matches!(parse("/ | a").unwrap(), Expr::Union(..)));
    }

    #[test]
    fn test_step_predicates_stay_on_step() {
        let expr = parse("item[@id='test'][2]").unwrap();
        let Expr::Step(step) = expr else {
            panic!("expected a step");
        };
        assert_eq!(step.predicates.len(), 2);
        assert_eq!(step.predicates[1], Expr::Number(2.0));
    }

    #[test]
    fn test_filter_expression() {
        let expr = parse("(//a)[1]/b").unwrap();
        let Expr::Path(base, step) = expr else {
            panic!("expected a path");
        };
        assert!(matches!(*base, Expr::Filter(..)));
        assert_eq!(*step, child("b"));
    }

    #[test]
    fn test_abbreviations() {
        let Expr::Path(base, step) = parse("../@x").unwrap() else {
            panic!("expected a path");
        };
        assert_eq!(*base, Expr::Step(Box::new(Step::new(Axis::Parent, NodeTest::Node))));
        assert_eq!(step.axis, Axis::Attribute);
    }

    #[test]
    fn test_explicit_axes() {
        let Expr::Step(step) = parse("preceding-sibling::processing-instruction('t')").unwrap() else {
            panic!("expected a step");
        };
        assert_eq!(step.axis, Axis::PrecedingSibling);
        assert_eq!(step.node_test, NodeTest::ProcessingInstruction(Some("t".to_string())));
    }

    #[test]
    fn test_operator_precedence() {
        let expr = parse("1 + 2 * 3 = 7 or false()").unwrap();
        let Expr::Binary(left, BinaryOp::Or, _) = expr else {
            panic!("expected or at the top");
        };
        let Expr::Binary(sum, BinaryOp::Eq, _) = *left else {
            panic!("expected equality");
        };
        assert!(matches!(*sum, Expr::Binary(_, BinaryOp::Add, _)));
    }

    #[test]
    fn test_function() {
        let expr = parse("count(//item)").unwrap();
        assert!(matches!(expr, Expr::Function(name, args) if name == "count" && args.len() == 1));
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(code("a/"), XPathErrorCode::ExpressionError);
        assert_eq!(code("a b"), XPathErrorCode::ExpressionError);
        assert_eq!(code("count(a"), XPathErrorCode::Unclosed);
        assert_eq!(code("a[1"), XPathErrorCode::Unclosed);
        assert_eq!(code("foo::a"), XPathErrorCode::ExpressionError);
        assert_eq!(code(""), XPathErrorCode::ExpressionError);
        assert_eq!(code("'open"), XPathErrorCode::UnfinishedLiteral);
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let nested = |n: usize, open: &str, close: &str| format!("{}1{}", open.repeat(n), close.repeat(n));

        assert!(parse(&nested(100, "(", ")")).is_ok());
        assert_eq!(parse(&nested(10_000, "(", ")")).unwrap_err().code, XPathErrorCode::ExpressionError);
        assert_eq!(parse(&nested(10_000, "a[", "]")).unwrap_err().code, XPathErrorCode::ExpressionError);
        assert_eq!(parse(&nested(10_000, "count(", ")")).unwrap_err().code, XPathErrorCode::ExpressionError);
        assert_eq!(code(&format!("{}1", "-".repeat(10_000))), XPathErrorCode::ExpressionError);
    }

    #[test]
    fn test_long_chains_are_bounded() {
        let steps = vec!["a"; 500].join("/");
        assert!(parse(&steps).is_ok());

        let sum = vec!["1"; 100_000].join("+");
        assert_eq!(code(&sum), XPathErrorCode::ExpressionError);
        let path = vec!["a"; 100_000].join("//");
        assert_eq!(code(&path), XPathErrorCode::ExpressionError);
        let union = vec!["a"; 100_000].join("|");
        assert_eq!(code(&union), XPathErrorCode::ExpressionError);
    }

    #[test]
    fn test_error_position() {
        let err = parse("a b").unwrap_err();
        assert_eq!(err.position, Some(2));
    }
}

//! XPath 1.0 Functions
//!
//! The core function library:
//!
//! Node Set Functions:
//! - position(), last(), count(), id(), local-name(), namespace-uri(), name()
//!
//! String Functions:
//! - string(), concat(), starts-with(), contains(), substring(),
//!   substring-before(), substring-after(), string-length(),
//!   normalize-space(), translate()
//!
//! Boolean Functions:
//! - boolean(), not(), true(), false(), lang()
//!
//! Number Functions:
//! - number(), sum(), floor(), ceiling(), round()
//!
//! Names and arity are checked when an expression is compiled; argument
//! types are checked on evaluation.

use super::eval::EvalContext;
use super::value::{parse_number, XPathValue};
use crate::dom::{NodeId, NodeKind};
use crate::error::{XPathError, XPathErrorCode};

/// A core library function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Last,
    Position,
    Count,
    Id,
    LocalName,
    NamespaceUri,
    Name,
    String,
    Concat,
    StartsWith,
    Contains,
    SubstringBefore,
    SubstringAfter,
    Substring,
    StringLength,
    NormalizeSpace,
    Translate,
    Boolean,
    Not,
    True,
    False,
    Lang,
    Number,
    Sum,
    Floor,
    Ceiling,
    Round,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "last" => Function::Last,
            "position" => Function::Position,
            "count" => Function::Count,
            "id" => Function::Id,
            "local-name" => Function::LocalName,
            "namespace-uri" => Function::NamespaceUri,
            "name" => Function::Name,
            "string" => Function::String,
            "concat" => Function::Concat,
            "starts-with" => Function::StartsWith,
            "contains" => Function::Contains,
            "substring-before" => Function::SubstringBefore,
            "substring-after" => Function::SubstringAfter,
            "substring" => Function::Substring,
            "string-length" => Function::StringLength,
            "normalize-space" => Function::NormalizeSpace,
            "translate" => Function::Translate,
            "boolean" => Function::Boolean,
            "not" => Function::Not,
            "true" => Function::True,
            "false" => Function::False,
            "lang" => Function::Lang,
            "number" => Function::Number,
            "sum" => Function::Sum,
            "floor" => Function::Floor,
            "ceiling" => Function::Ceiling,
            "round" => Function::Round,
            _ => return None,
        })
    }

    /// Minimum and maximum argument count; `None` is unbounded
    pub fn arity(self) -> (usize, Option<usize>) {
        match self {
            Function::Last | Function::Position | Function::True | Function::False => (0, Some(0)),
            Function::LocalName
            | Function::NamespaceUri
            | Function::Name
            | Function::String
            | Function::StringLength
            | Function::NormalizeSpace
            | Function::Number => (0, Some(1)),
            Function::Count
            | Function::Id
            | Function::Boolean
            | Function::Not
            | Function::Lang
            | Function::Sum
            | Function::Floor
            | Function::Ceiling
            | Function::Round => (1, Some(1)),
            Function::StartsWith | Function::Contains | Function::SubstringBefore | Function::SubstringAfter => {
                (2, Some(2))
            }
            Function::Substring => (2, Some(3)),
            Function::Translate => (3, Some(3)),
            Function::Concat => (2, None),
        }
    }

    pub fn accepts(self, count: usize) -> bool {
        let (min, max) = self.arity();
        count >= min && max.map_or(true, |max| count <= max)
    }
}

/// Evaluate a function call
pub fn call(func: Function, args: Vec<XPathValue>, ctx: &EvalContext<'_>) -> Result<XPathValue, XPathError> {
    let doc = ctx.doc;
    let string_arg = |i: usize| -> String {
        match args.get(i) {
            Some(v) => v.to_string_value(doc),
            None => doc.string_value(ctx.node).into_owned(),
        }
    };
    let number_arg = |i: usize| args.get(i).map_or(f64::NAN, |v| v.to_number(doc));

    let value = match func {
        // Node Set Functions
        Function::Last => XPathValue::Number(ctx.size as f64),
        Function::Position => XPathValue::Number(ctx.position as f64),
        Function::Count => XPathValue::Number(nodeset_arg(func, &args, 0)?.len() as f64),
        Function::Id => fn_id(&args, ctx),
        Function::LocalName => {
            let name = subject_node(func, &args, ctx)?.and_then(|n| doc.node_name(n)).unwrap_or("");
            XPathValue::from(name)
        }
        Function::NamespaceUri => {
            let uri = subject_node(func, &args, ctx)?
                .and_then(|n| doc.node_namespace_uri(n))
                .unwrap_or("");
            XPathValue::from(uri)
        }
        Function::Name => {
            let name = subject_node(func, &args, ctx)?
                .and_then(|n| doc.qualified_name(n))
                .map(|n| n.into_owned())
                .unwrap_or_default();
            XPathValue::String(name)
        }

        // String Functions
        Function::String => XPathValue::String(string_arg(0)),
        Function::Concat => XPathValue::String(args.iter().map(|a| a.to_string_value(doc)).collect()),
        Function::StartsWith => XPathValue::Boolean(string_arg(0).starts_with(&string_arg(1))),
        Function::Contains => XPathValue::Boolean(string_arg(0).contains(&string_arg(1))),
        Function::SubstringBefore => {
            let s = string_arg(0);
            let pattern = string_arg(1);
            XPathValue::String(s.find(&pattern).map(|pos| s[..pos].to_string()).unwrap_or_default())
        }
        Function::SubstringAfter => {
            let s = string_arg(0);
            let pattern = string_arg(1);
            XPathValue::String(
                s.find(&pattern)
                    .map(|pos| s[pos + pattern.len()..].to_string())
                    .unwrap_or_default(),
            )
        }
        Function::Substring => {
            let length = if args.len() == 3 { Some(number_arg(2)) } else { None };
            XPathValue::String(substring(&string_arg(0), number_arg(1), length))
        }
        Function::StringLength => XPathValue::Number(string_arg(0).chars().count() as f64),
        Function::NormalizeSpace => {
            let s = string_arg(0);
            let words: Vec<&str> = s.split(is_xml_space).filter(|w| !w.is_empty()).collect();
            XPathValue::String(words.join(" "))
        }
        Function::Translate => XPathValue::String(translate(&string_arg(0), &string_arg(1), &string_arg(2))),

        // Boolean Functions
        Function::Boolean => XPathValue::Boolean(args.first().is_some_and(XPathValue::to_boolean)),
        Function::Not => XPathValue::Boolean(!args.first().is_some_and(XPathValue::to_boolean)),
        Function::True => XPathValue::Boolean(true),
        Function::False => XPathValue::Boolean(false),
        Function::Lang => XPathValue::Boolean(fn_lang(&string_arg(0), ctx)),

        // Number Functions
        Function::Number => XPathValue::Number(match args.first() {
            Some(v) => v.to_number(doc),
            None => parse_number(&doc.string_value(ctx.node)),
        }),
        Function::Sum => {
            let nodes = nodeset_arg(func, &args, 0)?;
            // Start from +0; `Iterator::sum` for f64 starts from -0
            let total = nodes
                .iter()
                .map(|&n| parse_number(&doc.string_value(n)))
                .fold(0.0, |acc, x| acc + x);
            XPathValue::Number(total)
        }
        Function::Floor => XPathValue::Number(number_arg(0).floor()),
        Function::Ceiling => XPathValue::Number(number_arg(0).ceil()),
        Function::Round => XPathValue::Number(round(number_arg(0))),
    };
    Ok(value)
}

fn type_error(func: Function, expected: &str, got: &XPathValue) -> XPathError {
    XPathError::new(
        XPathErrorCode::InvalidType,
        format!("{:?}() expects a {}, got a {}", func, expected, got.type_name()),
    )
}

fn nodeset_arg(func: Function, args: &[XPathValue], index: usize) -> Result<&[NodeId], XPathError> {
    match args.get(index) {
        Some(XPathValue::NodeSet(nodes)) => Ok(nodes),
        Some(other) => Err(type_error(func, "node-set", other)),
        None => Ok(&[]),
    }
}

/// The node a name function looks at: the first node of its argument, or
/// the context node when called without one
fn subject_node(func: Function, args: &[XPathValue], ctx: &EvalContext<'_>) -> Result<Option<NodeId>, XPathError> {
    if args.is_empty() {
        return Ok(Some(ctx.node));
    }
    Ok(nodeset_arg(func, args, 0)?.first().copied())
}

fn is_xml_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Elements whose `xml:id` matches one of the whitespace-separated tokens
fn fn_id(args: &[XPathValue], ctx: &EvalContext<'_>) -> XPathValue {
    let doc = ctx.doc;
    let text = match args.first() {
        Some(XPathValue::NodeSet(nodes)) => nodes
            .iter()
            .map(|&n| doc.string_value(n).into_owned())
            .collect::<Vec<_>>()
            .join(" "),
        Some(other) => other.to_string_value(doc),
        None => String::new(),
    };
    let wanted: Vec<&str> = text.split(is_xml_space).filter(|t| !t.is_empty()).collect();
    if wanted.is_empty() {
        return XPathValue::empty_nodeset();
    }

    let found = doc
        .descendant_ids(0)
        .filter(|&n| doc.node_kind(n) == Some(NodeKind::Element))
        .filter(|&n| {
            doc.attribute_ids(n).any(|a| {
                doc.node_prefix(a) == Some("xml")
                    && doc.node_name(a) == Some("id")
                    && doc.node_value(a).is_some_and(|v| wanted.contains(&v))
            })
        })
        .collect();
    XPathValue::NodeSet(found)
}

/// Nearest `xml:lang` on the context node or an ancestor, matched case
/// insensitively, either exactly or as a `-` separated prefix
fn fn_lang(lang: &str, ctx: &EvalContext<'_>) -> bool {
    let doc = ctx.doc;
    let declared = doc.ancestors_or_self(ctx.node).find_map(|n| {
        doc.attribute_ids(n)
            .find(|&a| doc.node_prefix(a) == Some("xml") && doc.node_name(a) == Some("lang"))
            .and_then(|a| doc.node_value(a))
    });
    let Some(declared) = declared else {
        return false;
    };
    let declared = declared.to_lowercase();
    let lang = lang.to_lowercase();
    declared == lang || (declared.starts_with(&lang) && declared.as_bytes().get(lang.len()) == Some(&b'-'))
}

/// Characters at 1-based positions `p` with `round(start) <= p < round(start) + round(length)`
fn substring(s: &str, start: f64, length: Option<f64>) -> String {
    let first = round(start);
    let end = match length {
        Some(len) => first + round(len),
        None => f64::INFINITY,
    };
    s.chars()
        .enumerate()
        .filter(|&(i, _)| {
            let p = (i + 1) as f64;
            p >= first && p < end
        })
        .map(|(_, c)| c)
        .collect()
}

fn translate(s: &str, from: &str, to: &str) -> String {
    let from: Vec<char> = from.chars().collect();
    let to: Vec<char> = to.chars().collect();
    s.chars()
        .filter_map(|c| match from.iter().position(|&f| f == c) {
            Some(pos) => to.get(pos).copied(),
            None => Some(c),
        })
        .collect()
}

/// Round half towards positive infinity, keeping NaN, infinities and -0
fn round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() || n.fract() == 0.0 {
        n
    } else if (-0.5..0.0).contains(&n) {
        -0.0
    } else {
        (n + 0.5).floor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDocument;

    fn ctx(doc: &XmlDocument, node: NodeId) -> EvalContext<'_> {
        EvalContext {
            doc,
            node,
            position: 2,
            size: 5,
            namespaces: None,
        }
    }

    fn run(doc: &XmlDocument, node: NodeId, name: &str, args: Vec<XPathValue>) -> XPathValue {
        let func = Function::from_name(name).unwrap();
        assert!(func.accepts(args.len()));
        call(func, args, &ctx(doc, node)).unwrap()
    }

    fn s(v: &str) -> XPathValue {
        XPathValue::from(v)
    }

    #[test]
    fn test_lookup_and_arity() {
        assert_eq!(Function::from_name("starts-with"), Some(Function::StartsWith));
        assert_eq!(Function::from_name("matches"), None);
        assert!(Function::Concat.accepts(7));
        assert!(!Function::Concat.accepts(1));
        assert!(Function::Substring.accepts(3));
        assert!(!Function::True.accepts(1));
    }

    #[test]
    fn test_context_functions() {
        let doc = XmlDocument::parse_str("<r> a  b </r>").unwrap();
        let r = doc.root_element_id().unwrap();
        assert_eq!(run(&doc, r, "position", vec![]), XPathValue::Number(2.0));
        assert_eq!(run(&doc, r, "last", vec![]), XPathValue::Number(5.0));
        assert_eq!(run(&doc, r, "string-length", vec![]), XPathValue::Number(6.0));
        assert_eq!(run(&doc, r, "normalize-space", vec![]), s("a b"));
        assert_eq!(run(&doc, r, "name", vec![]), s("r"));
    }

    #[test]
    fn test_string_functions() {
        let doc = XmlDocument::new();
        assert_eq!(run(&doc, 0, "concat", vec![s("a"), s("-"), XPathValue::Number(1.0)]), s("a-1"));
        assert_eq!(run(&doc, 0, "substring-before", vec![s("1999/04/01"), s("/")]), s("1999"));
        assert_eq!(run(&doc, 0, "substring-after", vec![s("1999/04/01"), s("/")]), s("04/01"));
        assert_eq!(run(&doc, 0, "translate", vec![s("--aaa--"), s("abc-"), s("ABC")]), s("AAA"));
        assert_eq!(run(&doc, 0, "contains", vec![s("hello"), s("")]), XPathValue::Boolean(true));
    }

    #[test]
    fn test_substring_rounding() {
        assert_eq!(substring("12345", 2.0, Some(3.0)), "234");
        assert_eq!(substring("12345", 1.5, Some(2.6)), "234");
        assert_eq!(substring("12345", 0.0, Some(3.0)), "12");
        assert_eq!(substring("12345", f64::NAN, Some(3.0)), "");
        assert_eq!(substring("12345", 1.0, Some(f64::NAN)), "");
        assert_eq!(substring("12345", -42.0, Some(f64::INFINITY)), "12345");
        assert_eq!(substring("12345", f64::NEG_INFINITY, Some(f64::INFINITY)), "");
        assert_eq!(substring("12345", 2.0, None), "2345");
    }

    #[test]
    fn test_round() {
        assert_eq!(round(2.5), 3.0);
        assert_eq!(round(-2.5), -2.0);
        assert_eq!(round(1.4), 1.0);
        assert!(round(-0.2).is_sign_negative());
        assert!(round(f64::NAN).is_nan());
    }

    #[test]
    fn test_node_set_functions() {
        let doc = XmlDocument::parse_str("<r xmlns:ns='urn:n'><ns:c>4</ns:c><v>6</v></r>").unwrap();
        let r = doc.root_element_id().unwrap();
        let kids: Vec<_> = doc.child_ids(r).collect();

        assert_eq!(run(&doc, r, "count", vec![XPathValue::NodeSet(kids.clone())]), XPathValue::Number(2.0));
        assert_eq!(run(&doc, r, "sum", vec![XPathValue::NodeSet(kids.clone())]), XPathValue::Number(10.0));
        assert_eq!(run(&doc, r, "name", vec![XPathValue::NodeSet(kids.clone())]), s("ns:c"));
        assert_eq!(run(&doc, r, "local-name", vec![XPathValue::NodeSet(kids.clone())]), s("c"));
        assert_eq!(run(&doc, r, "namespace-uri", vec![XPathValue::NodeSet(kids)]), s("urn:n"));
        assert_eq!(run(&doc, r, "local-name", vec![XPathValue::empty_nodeset()]), s(""));
    }

    #[test]
    fn test_sum_of_nothing_is_positive_zero() {
        let doc = XmlDocument::parse_str("<r/>").unwrap();
        let XPathValue::Number(total) = run(&doc, 0, "sum", vec![XPathValue::empty_nodeset()]) else {
            panic!("sum() must return a number");
        };
        assert_eq!(total, 0.0);
        assert!(total.is_sign_positive());
    }

    #[test]
    fn test_type_errors() {
        let doc = XmlDocument::new();
        let err = call(Function::Count, vec![s("x")], &ctx(&doc, 0)).unwrap_err();
        assert_eq!(err.code, XPathErrorCode::InvalidType);
        let err = call(Function::Name, vec![XPathValue::Number(1.0)], &ctx(&doc, 0)).unwrap_err();
        assert_eq!(err.code, XPathErrorCode::InvalidType);
    }

    #[test]
    fn test_lang() {
        let doc = XmlDocument::parse_str("<r xml:lang='en-US'><c/><d xml:lang='de'/></r>").unwrap();
        let r = doc.root_element_id().unwrap();
        let kids: Vec<_> = doc.child_ids(r).collect();
        assert_eq!(run(&doc, kids[0], "lang", vec![s("EN")]), XPathValue::Boolean(true));
        assert_eq!(run(&doc, kids[0], "lang", vec![s("en-us")]), XPathValue::Boolean(true));
        assert_eq!(run(&doc, kids[0], "lang", vec![s("e")]), XPathValue::Boolean(false));
        assert_eq!(run(&doc, kids[1], "lang", vec![s("en")]), XPathValue::Boolean(false));
    }

    #[test]
    fn test_id() {
        let doc = XmlDocument::parse_str("<r><a xml:id='x'/><b xml:id='y'/><c id='z'/></r>").unwrap();
        let r = doc.root_element_id().unwrap();
        let XPathValue::NodeSet(found) = run(&doc, r, "id", vec![s(" y x z ")]) else {
            panic!("expected a node-set");
        };
        let names: Vec<_> = found.iter().filter_map(|&n| doc.node_name(n)).collect();
        assert_eq!(names, ["a", "b"]);
    }
}

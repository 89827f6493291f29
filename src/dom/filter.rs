//! Predicate-driven selection over the direct children or attributes of a node.

use super::handle::Node;

/// Verdict returned by a selection predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Keep the node and continue
    Match,
    /// Drop the node and continue
    Skip,
    /// Keep the node and stop
    MatchAndStop,
    /// Drop the node and stop
    Stop,
}

impl Visit {
    #[inline]
    fn keeps(self) -> bool {
        matches!(self, Visit::Match | Visit::MatchAndStop)
    }

    #[inline]
    fn stops(self) -> bool {
        matches!(self, Visit::MatchAndStop | Visit::Stop)
    }
}

impl From<bool> for Visit {
    fn from(matched: bool) -> Self {
        if matched {
            Visit::Match
        } else {
            Visit::Skip
        }
    }
}

fn select<'d, I, F, V>(nodes: I, mut predicate: F) -> Vec<Node<'d>>
where
    I: Iterator<Item = Node<'d>>,
    F: FnMut(Node<'d>) -> V,
    V: Into<Visit>,
{
    let mut out = Vec::new();
    for node in nodes {
        let visit = predicate(node).into();
        if visit.keeps() {
            out.push(node);
        }
        if visit.stops() {
            break;
        }
    }
    out
}

impl<'d> Node<'d> {
    /// Direct children accepted by `predicate`, in document order.
    ///
    /// ```
    /// use stxml::{Visit, XmlDocument};
    ///
    /// let doc = XmlDocument::parse_str("<r><a/><b/><c/></r>").unwrap();
    /// let root = doc.root_element().unwrap();
    /// let first = root.children_passing_test(|_| Visit::MatchAndStop);
    /// assert_eq!(first[0].name(), Some("a"));
    /// assert_eq!(first.len(), 1);
    /// ```
    pub fn children_passing_test<F, V>(&self, predicate: F) -> Vec<Node<'d>>
    where
        F: FnMut(Node<'d>) -> V,
        V: Into<Visit>,
    {
        select(self.children(), predicate)
    }

    /// Attributes accepted by `predicate`, in source order.
    pub fn attributes_passing_test<F, V>(&self, predicate: F) -> Vec<Node<'d>>
    where
        F: FnMut(Node<'d>) -> V,
        V: Into<Visit>,
    {
        select(self.attributes(), predicate)
    }
}

/// Predicate matching nodes by local name
pub fn has_name<'n>(name: &'n str) -> impl Fn(Node<'_>) -> bool + 'n {
    move |node| node.name() == Some(name)
}

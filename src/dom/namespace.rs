//! Namespace Resolution
//!
//! Prefix bindings in scope while the parser walks down the element tree.
//! Bindings live on one stack; each open element records where its own
//! declarations start, so closing it truncates back to that mark.

use super::strings::StringPool;

/// Well-known namespace URIs
pub mod ns {
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
}

/// In-scope `(prefix, uri)` string ids. Prefix 0 is the default namespace.
#[derive(Debug)]
pub struct NamespaceResolver {
    bindings: Vec<(u32, u32)>,
    scope_marks: Vec<usize>,
    reserved: [u32; 2],
}

impl NamespaceResolver {
    /// Resolver with the `xml` and `xmlns` prefixes pre-bound
    pub fn new(strings: &mut StringPool) -> Self {
        let xml = strings.intern("xml");
        let xmlns = strings.intern("xmlns");
        let bindings = vec![(xml, strings.intern(ns::XML)), (xmlns, strings.intern(ns::XMLNS))];
        NamespaceResolver {
            bindings,
            scope_marks: Vec::with_capacity(32),
            reserved: [xml, xmlns],
        }
    }

    pub fn push_scope(&mut self) {
        self.scope_marks.push(self.bindings.len());
    }

    /// Close the innermost element, dropping what it declared
    pub fn pop_scope(&mut self) {
        if let Some(mark) = self.scope_marks.pop() {
            self.bindings.truncate(mark);
        }
    }

    /// Bind a prefix in the innermost scope. `xml` and `xmlns` cannot be
    /// rebound; such declarations are ignored and return false.
    pub fn declare(&mut self, prefix_id: u32, uri_id: u32) -> bool {
        if self.reserved.contains(&prefix_id) {
            return false;
        }
        self.bindings.push((prefix_id, uri_id));
        true
    }

    /// Innermost URI bound to a prefix. `xmlns=""` shows up as `Some(0)`.
    pub fn resolve(&self, prefix_id: u32) -> Option<u32> {
        self.bindings
            .iter()
            .rev()
            .find_map(|&(prefix, uri)| (prefix == prefix_id).then_some(uri))
    }

    /// Default namespace in scope, if any
    pub fn resolve_default(&self) -> Option<u32> {
        self.resolve(0).filter(|&uri| uri != 0)
    }
}

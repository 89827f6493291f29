//! Compiled-expression cache and evaluation entry points
//!
//! Expressions are compiled once and kept in an LRU cache keyed by their
//! source text. Namespace bindings are applied at evaluation time, so one
//! cached expression serves every binding.

use super::axes::Namespaces;
use super::compiler::{self, CompiledExpr};
use super::eval::{evaluate_compiled, EvalContext};
use super::result::XPathResult;
use crate::config::XPathOptions;
use crate::dom::{Node, NodeId, XmlDocument};
use crate::error::XPathError;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing::{debug, trace};

static GLOBAL_ENGINE: OnceLock<XPathEngine> = OnceLock::new();

/// XPath compiler with an LRU cache of compiled expressions
pub struct XPathEngine {
    cache: Option<Mutex<LruCache<String, Arc<CompiledExpr>>>>,
}

impl XPathEngine {
    /// Create an engine; a capacity of zero disables caching
    pub fn new(options: &XPathOptions) -> Self {
        let cache = NonZeroUsize::new(options.cache_capacity).map(|cap| Mutex::new(LruCache::new(cap)));
        XPathEngine { cache }
    }

    /// Process-wide engine with default options
    pub fn global() -> &'static XPathEngine {
        GLOBAL_ENGINE.get_or_init(|| XPathEngine::new(&XPathOptions::default()))
    }

    /// Compile `xpath`, reusing a cached compilation when there is one
    pub fn compile(&self, xpath: &str) -> Result<Arc<CompiledExpr>, XPathError> {
        let Some(cache) = &self.cache else {
            return Self::compile_uncached(xpath).map(Arc::new);
        };

        // The cache only holds finished compilations, so a poisoned lock is safe to reuse
        if let Some(hit) = cache.lock().unwrap_or_else(PoisonError::into_inner).get(xpath) {
            trace!(xpath, "xpath cache hit");
            return Ok(Arc::clone(hit));
        }

        trace!(xpath, "xpath cache miss");
        let compiled = Arc::new(Self::compile_uncached(xpath)?);
        cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(xpath.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }

    fn compile_uncached(xpath: &str) -> Result<CompiledExpr, XPathError> {
        compiler::compile(xpath).map_err(|err| {
            debug!(xpath, code = err.code.value(), position = ?err.position, "xpath compile failed");
            err
        })
    }

    /// Number of cached compilations
    pub fn cached_len(&self) -> usize {
        self.cache
            .as_ref()
            .map_or(0, |c| c.lock().unwrap_or_else(PoisonError::into_inner).len())
    }

    fn run<'d>(
        &self,
        doc: &'d XmlDocument,
        context: NodeId,
        xpath: &str,
        namespaces: Option<&Namespaces>,
    ) -> crate::Result<XPathResult<'d>> {
        let compiled = self.compile(xpath)?;
        let ctx = EvalContext::new(doc, context, namespaces);
        let value = evaluate_compiled(&compiled, &ctx)?;
        Ok(XPathResult::from_value(doc, value))
    }

    /// Evaluate against the document node
    pub fn evaluate<'d>(&self, doc: &'d XmlDocument, xpath: &str) -> crate::Result<XPathResult<'d>> {
        self.run(doc, 0, xpath, None)
    }

    /// Evaluate against the document node, resolving prefixed name tests
    /// through `namespaces`
    pub fn evaluate_with_namespaces<'d>(
        &self,
        doc: &'d XmlDocument,
        xpath: &str,
        namespaces: &Namespaces,
    ) -> crate::Result<XPathResult<'d>> {
        self.run(doc, 0, xpath, Some(namespaces))
    }

    /// Evaluate with `node` as the context node
    pub fn evaluate_from<'d>(
        &self,
        node: Node<'d>,
        xpath: &str,
        namespaces: Option<&Namespaces>,
    ) -> crate::Result<XPathResult<'d>> {
        self.run(node.document(), node.id(), xpath, namespaces)
    }
}

impl Default for XPathEngine {
    fn default() -> Self {
        XPathEngine::new(&XPathOptions::default())
    }
}

impl XmlDocument {
    /// Evaluate an XPath 1.0 expression with the document node as context.
    ///
    /// ```
    /// use stxml::XmlDocument;
    ///
    /// let doc = XmlDocument::parse_str("<a><b/><c><d>e</d></c><f/></a>").unwrap();
    /// let found = doc.evaluate("//a/c/d").unwrap().into_nodeset().unwrap();
    /// assert_eq!(found.first().unwrap().content().unwrap(), "e");
    /// ```
    pub fn evaluate(&self, xpath: &str) -> crate::Result<XPathResult<'_>> {
        XPathEngine::global().evaluate(self, xpath)
    }

    /// Evaluate with prefix bindings for prefixed name tests
    pub fn evaluate_with_namespaces(&self, xpath: &str, namespaces: &Namespaces) -> crate::Result<XPathResult<'_>> {
        XPathEngine::global().evaluate_with_namespaces(self, xpath, namespaces)
    }
}

impl<'d> Node<'d> {
    /// Evaluate an XPath expression relative to this node
    pub fn evaluate(&self, xpath: &str) -> crate::Result<XPathResult<'d>> {
        XPathEngine::global().evaluate_from(*self, xpath, None)
    }

    /// Evaluate relative to this node with prefix bindings
    pub fn evaluate_with_namespaces(&self, xpath: &str, namespaces: &Namespaces) -> crate::Result<XPathResult<'d>> {
        XPathEngine::global().evaluate_from(*self, xpath, Some(namespaces))
    }
}

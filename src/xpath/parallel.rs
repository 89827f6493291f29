//! Batch XPath evaluation on the rayon pool
//!
//! Documents are immutable once parsed, so any number of expressions can be
//! evaluated against one concurrently.

use super::engine::XPathEngine;
use super::result::XPathResult;
use crate::dom::XmlDocument;
use rayon::prelude::*;

impl XPathEngine {
    /// Evaluate several expressions in parallel, results in input order
    pub fn evaluate_all<'d>(&self, doc: &'d XmlDocument, xpaths: &[&str]) -> Vec<crate::Result<XPathResult<'d>>> {
        xpaths.par_iter().map(|xpath| self.evaluate(doc, xpath)).collect()
    }

    /// Evaluate `(key, xpath)` pairs in parallel; the first failure wins
    pub fn evaluate_keyed<'d>(
        &self,
        doc: &'d XmlDocument,
        queries: &[(&str, &str)],
    ) -> crate::Result<Vec<(String, XPathResult<'d>)>> {
        queries
            .par_iter()
            .map(|(key, xpath)| self.evaluate(doc, xpath).map(|v| (key.to_string(), v)))
            .collect()
    }
}

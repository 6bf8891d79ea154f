//! Name and label canonicalization.
//!
//! A name that the symbol table recognizes is replaced by the decimal form of
//! its identifier; any other name passes through unchanged. Label values are
//! never rewritten.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::key::{InstanceKey, LabelSet};
use crate::symbols::{NoSymbols, SymbolTable};

/// Produces cache-stable forms of metric names and label names.
#[derive(Clone)]
pub struct Canonicalizer {
    symbols: Arc<dyn SymbolTable>,
}

impl Canonicalizer {
    /// Create a canonicalizer backed by a symbol table.
    pub fn new(symbols: Arc<dyn SymbolTable>) -> Self {
        Self { symbols }
    }

    /// The symbol table in use.
    pub fn symbols(&self) -> &Arc<dyn SymbolTable> {
        &self.symbols
    }

    /// Canonical form of a metric name.
    pub fn metric_name<'a>(&self, raw: &'a str) -> Cow<'a, str> {
        match self.symbols.parse_metric_name(raw) {
            Some(id) => Cow::Owned(id.to_string()),
            None => Cow::Borrowed(raw),
        }
    }

    /// Canonical form of a label name.
    pub fn label_name<'a>(&self, raw: &'a str) -> Cow<'a, str> {
        match self.symbols.parse_label_name(raw) {
            Some(id) => Cow::Owned(id.to_string()),
            None => Cow::Borrowed(raw),
        }
    }

    /// Canonicalize the label names of a request.
    ///
    /// `metric` is only used for error reporting.
    pub fn labels<L, K, V>(&self, metric: &str, labels: L) -> Result<LabelSet>
    where
        L: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut set = LabelSet::new();
        for (name, value) in labels {
            let name = self.label_name(name.as_ref()).into_owned();
            if !set.insert(name.clone(), value.as_ref().to_owned()) {
                return Err(Error::DuplicateLabel {
                    name: metric.to_owned(),
                    label: name,
                });
            }
        }
        Ok(set)
    }

    /// Build the instance key for a raw (name, labels) request.
    pub fn instance_key<L, K, V>(&self, name: &str, labels: L) -> Result<InstanceKey>
    where
        L: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let labels = self.labels(name, labels)?;
        Ok(InstanceKey::new(self.metric_name(name), labels))
    }
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Self::new(Arc::new(NoSymbols))
    }
}

impl fmt::Debug for Canonicalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canonicalizer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::SymbolMap;
    use std::collections::HashMap;

    fn canonicalizer() -> Canonicalizer {
        Canonicalizer::new(Arc::new(
            SymbolMap::new()
                .with_metric_name("requests_total", 12)
                .with_label_name("method", 3)
                .with_label_name("code", 40),
        ))
    }

    #[test]
    fn test_known_metric_name_becomes_identifier() {
        let c = canonicalizer();
        assert_eq!(c.metric_name("requests_total"), "12");
        assert!(matches!(c.metric_name("requests_total"), Cow::Owned(_)));
    }

    #[test]
    fn test_unknown_names_pass_through() {
        let c = canonicalizer();
        assert!(matches!(c.metric_name("adhoc_metric"), Cow::Borrowed("adhoc_metric")));
        assert_eq!(c.label_name("region"), "region");
        // Label symbols do not apply to metric names.
        assert_eq!(c.metric_name("method"), "method");
    }

    #[test]
    fn test_default_is_identity() {
        let c = Canonicalizer::default();
        assert_eq!(c.metric_name("requests_total"), "requests_total");
        assert_eq!(c.label_name("method"), "method");
    }

    #[test]
    fn test_labels_canonicalize_names_not_values() {
        let c = canonicalizer();
        let set = c
            .labels("requests_total", [("method", "method"), ("region", "eu")])
            .unwrap();

        assert_eq!(set.get("3"), Some("method"));
        assert_eq!(set.get("region"), Some("eu"));
        assert_eq!(set.get("method"), None);
    }

    #[test]
    fn test_symbol_and_numeric_spellings_match() {
        let c = canonicalizer();
        let by_symbol = c.instance_key("requests_total", [("method", "GET")]).unwrap();
        let by_number = c.instance_key("12", [("3", "GET")]).unwrap();
        assert_eq!(by_symbol, by_number);
    }

    #[test]
    fn test_map_iteration_order_is_irrelevant() {
        let c = canonicalizer();
        let mut forward = HashMap::new();
        let mut backward = HashMap::new();
        let pairs = [("method", "GET"), ("code", "200"), ("region", "eu"), ("zone", "a")];
        for (k, v) in pairs {
            forward.insert(k.to_string(), v.to_string());
        }
        for (k, v) in pairs.iter().rev() {
            backward.insert(k.to_string(), v.to_string());
        }

        let a = c.instance_key("requests_total", &forward).unwrap();
        let b = c.instance_key("requests_total", &backward).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_colliding_label_spellings_rejected() {
        let c = canonicalizer();
        let err = c
            .labels("requests_total", [("method", "GET"), ("3", "POST")])
            .unwrap_err();

        match err {
            Error::DuplicateLabel { name, label } => {
                assert_eq!(name, "requests_total");
                assert_eq!(label, "3");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

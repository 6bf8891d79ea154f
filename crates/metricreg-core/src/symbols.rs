//! Symbolic name tables.
//!
//! A symbol table maps well-known metric and label names to stable numeric
//! identifiers. The registry consults it to canonicalize names; anything the
//! table does not know is used verbatim.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Lookup from names to stable numeric identifiers.
///
/// Both lookups must be pure: the same input always yields the same answer.
pub trait SymbolTable: Send + Sync {
    /// Resolve a metric name to its identifier, if it is a known symbol.
    fn parse_metric_name(&self, name: &str) -> Option<i32>;

    /// Resolve a label name to its identifier, if it is a known symbol.
    fn parse_label_name(&self, name: &str) -> Option<i32>;
}

/// Symbol table that knows no symbols.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSymbols;

impl SymbolTable for NoSymbols {
    fn parse_metric_name(&self, _name: &str) -> Option<i32> {
        None
    }

    fn parse_label_name(&self, _name: &str) -> Option<i32> {
        None
    }
}

/// In-memory symbol table.
///
/// Can be assembled in code or loaded from JSON of the form
/// `{"metric_names": {"requests_total": 1}, "label_names": {"method": 4}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolMap {
    #[serde(default)]
    metric_names: HashMap<String, i32>,
    #[serde(default)]
    label_names: HashMap<String, i32>,
}

impl SymbolMap {
    /// Create an empty symbol map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a metric name symbol.
    pub fn with_metric_name(mut self, name: impl Into<String>, id: i32) -> Self {
        self.metric_names.insert(name.into(), id);
        self
    }

    /// Add a label name symbol.
    pub fn with_label_name(mut self, name: impl Into<String>, id: i32) -> Self {
        self.label_names.insert(name.into(), id);
        self
    }

    /// Load a symbol map from its JSON representation.
    ///
    /// Fails if two symbols of the same kind share an identifier.
    pub fn from_json(json: &str) -> Result<Self> {
        let map: Self = serde_json::from_str(json)?;
        map.validate()?;
        Ok(map)
    }

    /// Check that identifiers are unique within each kind.
    pub fn validate(&self) -> Result<()> {
        check_unique("metric", &self.metric_names)?;
        check_unique("label", &self.label_names)
    }

    /// Number of metric name symbols.
    pub fn metric_name_count(&self) -> usize {
        self.metric_names.len()
    }

    /// Number of label name symbols.
    pub fn label_name_count(&self) -> usize {
        self.label_names.len()
    }
}

fn check_unique(kind: &str, symbols: &HashMap<String, i32>) -> Result<()> {
    let mut seen: HashMap<i32, &str> = HashMap::with_capacity(symbols.len());
    for (name, id) in symbols {
        if let Some(other) = seen.insert(*id, name) {
            return Err(Error::Config(format!(
                "{kind} symbols `{other}` and `{name}` share identifier {id}"
            )));
        }
    }
    Ok(())
}

impl SymbolTable for SymbolMap {
    fn parse_metric_name(&self, name: &str) -> Option<i32> {
        self.metric_names.get(name).copied()
    }

    fn parse_label_name(&self, name: &str) -> Option<i32> {
        self.label_names.get(name).copied()
    }
}

//! Cache keys.
//!
//! Families are keyed by canonical metric name. Instances are keyed by the
//! canonical name together with the canonical label set. Keys are stored in
//! full, so map lookups compare the whole key and never rely on the hash alone.

use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

/// Canonical label set.
///
/// Label names are canonical, values are untouched. Iteration is ordered
/// by label name, so two sets with the same pairs always compare, hash and
/// iterate identically regardless of how the caller built them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelSet {
    pairs: BTreeMap<String, String>,
}

impl LabelSet {
    /// Create an empty label set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a canonical pair. Returns false if the name was already present,
    /// in which case the set is left unchanged.
    pub(crate) fn insert(&mut self, name: String, value: String) -> bool {
        match self.pairs.entry(name) {
            btree_map::Entry::Vacant(entry) => {
                entry.insert(value);
                true
            }
            btree_map::Entry::Occupied(_) => false,
        }
    }

    /// Value of a label by canonical name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs.get(name).map(String::as_str)
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the set has no labels.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Canonical label names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pairs.keys().map(String::as_str)
    }

    /// Label values in label-name order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.pairs.values().map(String::as_str)
    }

    /// (name, value) pairs in label-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{name}={value:?}")?;
        }
        f.write_str("}")
    }
}

/// Identity of one metric instance.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InstanceKey {
    name: String,
    labels: LabelSet,
}

impl InstanceKey {
    /// Create a key from a canonical name and canonical labels.
    pub fn new(name: impl Into<String>, labels: LabelSet) -> Self {
        Self {
            name: name.into(),
            labels,
        }
    }

    /// Canonical metric name, which is also the family key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical labels.
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.labels)
    }
}

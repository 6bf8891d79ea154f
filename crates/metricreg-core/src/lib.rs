//! metricreg core - deduplicating registry of metric families and instances.
//!
//! Instrumentation call sites ask the registry for a metric by name and label
//! set. The registry makes sure the backend sees exactly one family per
//! canonical name and exactly one instance per canonical (name, labels) pair,
//! building each lazily on first use.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use metricreg_core::{MetricsRegistry, SymbolMap};
//!
//! let registry = MetricsRegistry::new(backend, factory)
//!     .with_symbols(Arc::new(SymbolMap::new().with_label_name("method", 2)));
//!
//! let get = registry.get("requests_total", [("method", "GET")], ())?;
//! let again = registry.get("requests_total", [("method", "GET")], ())?;
//! assert!(Arc::ptr_eq(&get, &again));
//! ```

pub mod backend;
pub mod canonical;
pub mod config;
pub mod error;
pub mod key;
pub mod registry;
pub mod symbols;

pub use backend::{FamilyDescriptor, FamilyFactory, MetricFamily};
pub use canonical::Canonicalizer;
pub use config::RegistryConfig;
pub use error::{Error, Result};
pub use key::{InstanceKey, LabelSet};
pub use registry::MetricsRegistry;
pub use symbols::{NoSymbols, SymbolMap, SymbolTable};

//! Registry error types.

use thiserror::Error;

/// Errors surfaced by the registry and its backends.
///
/// None of these are transient. Each one reflects a usage or configuration
/// defect, so the registry never retries on its own.
#[derive(Debug, Error)]
pub enum Error {
    /// The backend already knows a collector under this name.
    #[error("metric family `{name}` is already registered with the backend")]
    AlreadyRegistered {
        /// Canonical family name.
        name: String,
    },

    /// The label names do not match the dimensions the family was declared with.
    #[error("label set for `{name}` does not match family dimensions: expected {expected:?}, found {found:?}")]
    LabelMismatch {
        /// Canonical family name.
        name: String,
        /// Canonical label names declared by the family.
        expected: Vec<String>,
        /// Canonical label names supplied by the caller.
        found: Vec<String>,
    },

    /// Two raw label names in one request collapsed onto the same canonical name.
    #[error("label `{label}` appears more than once for `{name}` after canonicalization")]
    DuplicateLabel {
        /// Raw metric name.
        name: String,
        /// Canonical label name.
        label: String,
    },

    /// Invalid registry configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Symbol table could not be loaded.
    #[error("symbol table error: {0}")]
    Symbols(#[from] serde_json::Error),

    /// Any other backend failure.
    #[error("backend error for `{name}`: {message}")]
    Backend {
        /// Canonical family name.
        name: String,
        /// Backend-provided description.
        message: String,
    },
}

/// Result alias for registry operations.
pub type Result<T> = std::result::Result<T, Error>;

//! # Error Types
//!
//! Errors raised while constructing core primitives: parsing enumerations,
//! timestamps and identifiers, and loading the engine configuration.
//! Validation failures on whole documents are not errors of this crate;
//! they are collected as issues by `bsff-validation`.

use thiserror::Error;

/// Top-level error type for core primitives.
#[derive(Error, Debug)]
pub enum BsffError {
    /// An enumerated value was not recognised.
    #[error("unknown {kind} value: {value:?}")]
    UnknownVariant {
        /// Name of the enumeration (e.g. "operation code").
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// A timestamp could not be parsed.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// An identifier failed its format check.
    #[error("invalid {kind}: {value:?}")]
    InvalidIdentifier {
        /// Identifier namespace (e.g. "SIRET").
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// The engine configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// YAML deserialization error.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

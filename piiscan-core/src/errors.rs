//! errors.rs - Custom error types for the piiscan-core library.
//!
//! This module defines a structured error enum for the library, providing
//! specific, actionable error types that can be handled programmatically.
//!
//! License: MIT OR APACHE 2.0

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = PiiScanError> = std::result::Result<T, E>;

/// This enum represents all possible error types in the `piiscan-core` library.
///
/// By using `#[non_exhaustive]`, we signal to consumers of this library that
/// new variants may be added in future versions.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PiiScanError {
    #[error("Failed to compile rule pattern '{0}': {1}")]
    RuleCompilationError(String, regex::Error),

    #[error("Rule pattern length ({0}) exceeds maximum allowed ({1})")]
    PatternLengthExceeded(usize, usize),

    /// Missing files, conflicting rule sources, empty rule directories and the like.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yml::Error,
    },

    #[error("Failed to serialize rule: {0}")]
    SerializationError(String),

    /// A pattern could not be derived from the supplied failure.
    #[error("Cannot generate pattern: {0}")]
    PatternGeneration(String),

    /// A single report row could not be turned back into a `Failure`.
    #[error("Could not decode report row {row}: {reason}")]
    Decode { row: String, reason: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Socket classifier {endpoint} failed: {reason}")]
    Socket { endpoint: String, reason: String },

    #[error("Invalid report delimiter '{0}': the delimiter must be a single byte")]
    InvalidDelimiter(String),

    #[error("Could not find the stored text of the rule in {0}; the file was left unchanged")]
    RuleTextNotFound(PathBuf),

    #[error("The rule store is read-only")]
    ReadOnlyStore,

    #[error("An unexpected I/O error occurred: {0}")]
    IoError(#[from] std::io::Error),
}

impl PiiScanError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        PiiScanError::Configuration(msg.into())
    }

    pub(crate) fn yaml(path: impl Into<PathBuf>, source: serde_yml::Error) -> Self {
        PiiScanError::Yaml { path: path.into(), source }
    }
}

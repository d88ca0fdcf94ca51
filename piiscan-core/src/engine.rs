// piiscan-core/src/engine.rs
//! Defines the core `ClassificationEngine` trait and related data structures.
//!
//! A classification engine answers one question per scanned unit: given a field
//! name and its value, which fragments of the value are identifiable? The data
//! source (CSV file, database table, document store) is the caller's business;
//! the engine only ever sees `(field name, field value)` pairs.
//!
//! License: MIT OR APACHE 2.0

use std::fmt;

use crate::errors::Result;
use crate::failure::{Failure, FailurePart};

/// A snapshot of an engine's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Parts returned over the engine's lifetime, cached results included.
    pub parts_found: u64,
}

impl ValidationStats {
    pub fn lookups(&self) -> u64 {
        self.cache_hits + self.cache_misses
    }
}

impl fmt::Display for ValidationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cache hits: {}, cache misses: {}, parts found: {}",
            self.cache_hits, self.cache_misses, self.parts_found
        )
    }
}

/// A trait that defines the core functionality of a classification engine.
///
/// Implementations must be safe to call from many threads at once, including for
/// values of the same field.
pub trait ClassificationEngine: Send + Sync {
    /// Returns every identifiable fragment found in `field_value`, possibly none.
    ///
    /// Errors only come from rules that delegate to external classifiers.
    fn validate(&self, field_name: &str, field_value: &str) -> Result<Vec<FailurePart>>;

    /// Counters accumulated since the engine was built.
    fn stats(&self) -> ValidationStats;

    /// Validates one value and wraps any parts found in a [`Failure`].
    fn classify(
        &self,
        resource: &str,
        resource_primary_key: Option<&str>,
        field_name: &str,
        field_value: &str,
    ) -> Result<Option<Failure>> {
        let parts = self.validate(field_name, field_value)?;
        let chars: Vec<char> = field_value.chars().collect();
        // Parts are found on the normalised value (`^` read as a space), so take
        // each word back from the raw value to keep offsets valid against it.
        let parts = parts
            .into_iter()
            .map(|mut part| {
                if let Some(raw) = chars.get(part.offset..part.end()) {
                    part.word = raw.iter().collect();
                }
                part
            })
            .collect();
        Ok(Failure::new(
            resource,
            resource_primary_key.map(str::to_string),
            field_name,
            field_value,
            parts,
        ))
    }
}

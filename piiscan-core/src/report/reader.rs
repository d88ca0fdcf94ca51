// piiscan-core/src/report/reader.rs
//! Cursor over the failures loaded from a report.
//!
//! License: MIT OR APACHE 2.0

use std::path::Path;

use crate::errors::Result;
use crate::failure::Failure;
use crate::report::decode::{deserialize_failures, DecodeOptions};

/// Walks a loaded report one failure at a time.
///
/// The cursor starts before the first failure; call [`ReportReader::next`] to move onto it.
#[derive(Debug, Clone)]
pub struct ReportReader {
    failures: Vec<Failure>,
    current: Option<usize>,
    rows_processed: usize,
    problems: usize,
}

impl ReportReader {
    pub fn open(path: &Path, options: &DecodeOptions<'_>) -> Result<Self> {
        let outcome = deserialize_failures(path, options)?;
        Ok(Self {
            failures: outcome.failures,
            current: None,
            rows_processed: outcome.rows_processed,
            problems: outcome.problems,
        })
    }

    pub fn from_failures(failures: Vec<Failure>) -> Self {
        let rows_processed = failures.len();
        Self {
            failures,
            current: None,
            rows_processed,
            problems: 0,
        }
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn rows_processed(&self) -> usize {
        self.rows_processed
    }

    /// Rows skipped because they could not be decoded.
    pub fn problems(&self) -> usize {
        self.problems
    }

    /// Advances the cursor. Returns `false` once it has run past the last failure.
    pub fn next(&mut self) -> bool {
        let next = self.current.map_or(0, |i| i + 1).min(self.failures.len());
        self.current = Some(next);
        next < self.failures.len()
    }

    /// Moves the cursor to `index`, clamped to `0..=len`.
    pub fn go_to(&mut self, index: usize) {
        self.current = Some(index.min(self.failures.len()));
    }

    /// The failure under the cursor, if any.
    pub fn current(&self) -> Option<&Failure> {
        self.current.and_then(|i| self.failures.get(i))
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn is_exhausted(&self) -> bool {
        self.current.map_or(self.failures.is_empty(), |i| i >= self.failures.len())
    }

    /// `"{current}/{total}"`, with `-1` before the first call to `next`.
    pub fn describe_progress(&self) -> String {
        match self.current {
            Some(i) => format!("{}/{}", i, self.failures.len()),
            None => format!("-1/{}", self.failures.len()),
        }
    }
}

// piiscan-core/src/failure.rs
//! Core data structures describing what was found in a scanned value, plus the
//! PII-safe logging helpers used whenever a matched fragment has to be logged.
//!
//! License: MIT OR APACHE 2.0

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use log::debug;
use serde::{Deserialize, Serialize};

lazy_static! {
    /// A static boolean that is initialized once to determine if PII is allowed in debug logs.
    static ref PII_DEBUG_ALLOWED: bool = {
        std::env::var("PIISCAN_ALLOW_DEBUG_PII")
            .map(|s| s.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    };
}

/// What kind of identifiable information a fragment is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Classification {
    #[default]
    None,
    Location,
    Person,
    Organization,
    Money,
    Percent,
    Date,
    Time,
    PixelText,
    Postcode,
    PrivateIdentifier,
}

impl Classification {
    pub const ALL: [Classification; 11] = [
        Classification::None,
        Classification::Location,
        Classification::Person,
        Classification::Organization,
        Classification::Money,
        Classification::Percent,
        Classification::Date,
        Classification::Time,
        Classification::PixelText,
        Classification::Postcode,
        Classification::PrivateIdentifier,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Location => "Location",
            Self::Person => "Person",
            Self::Organization => "Organization",
            Self::Money => "Money",
            Self::Percent => "Percent",
            Self::Date => "Date",
            Self::Time => "Time",
            Self::PixelText => "PixelText",
            Self::Postcode => "Postcode",
            Self::PrivateIdentifier => "PrivateIdentifier",
        }
    }

    pub fn is_none(&self) -> bool {
        *self == Classification::None
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive, so reports written by other tools still load.
impl FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Invalid failure classification '{}'", s))
    }
}

/// One contiguous matched span inside a field value.
///
/// `offset` counts Unicode scalar values (chars), not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FailurePart {
    pub word: String,
    pub classification: Classification,
    pub offset: usize,
}

impl FailurePart {
    pub fn new(word: impl Into<String>, classification: Classification, offset: usize) -> Self {
        Self {
            word: word.into(),
            classification,
            offset,
        }
    }

    /// Length of `word` in chars.
    pub fn len(&self) -> usize {
        self.word.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.word.is_empty()
    }

    /// Exclusive end of the span, in chars.
    pub fn end(&self) -> usize {
        self.offset + self.len()
    }

    /// Builds a part from a byte-indexed regex match inside `value`.
    pub(crate) fn from_byte_match(
        value: &str,
        word: &str,
        byte_start: usize,
        classification: Classification,
    ) -> Self {
        let offset = value[..byte_start].chars().count();
        Self::new(word, classification, offset)
    }
}

/// The classification outcome for one field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Logical origin, e.g. a table name or file path.
    pub resource: String,
    /// Identifier of the owning record. `None` when the source has no key.
    pub resource_primary_key: Option<String>,
    pub problem_field: String,
    pub problem_value: String,
    pub parts: Vec<FailurePart>,
}

impl Failure {
    /// Returns `None` when `parts` is empty; a failure always has at least one part.
    pub fn new(
        resource: impl Into<String>,
        resource_primary_key: Option<String>,
        problem_field: impl Into<String>,
        problem_value: impl Into<String>,
        parts: Vec<FailurePart>,
    ) -> Option<Self> {
        if parts.is_empty() {
            return None;
        }
        Some(Self {
            resource: resource.into(),
            resource_primary_key,
            problem_field: problem_field.into(),
            problem_value: problem_value.into(),
            parts,
        })
    }

    /// Length of `problem_value` in chars.
    pub fn value_len(&self) -> usize {
        self.problem_value.chars().count()
    }

    /// Merges overlapping or touching parts (ordered by offset) into contiguous literals.
    pub fn conflate_parts(&self) -> Vec<String> {
        let mut sorted: Vec<&FailurePart> = self.parts.iter().collect();
        sorted.sort_by_key(|p| p.offset);

        let mut groups: Vec<String> = Vec::new();
        let mut current: Option<(String, usize)> = None;

        for part in sorted {
            match current.as_mut() {
                Some((text, end)) if part.offset <= *end => {
                    let overlap = *end - part.offset;
                    text.extend(part.word.chars().skip(overlap));
                    *end = (*end).max(part.end());
                }
                _ => {
                    if let Some((text, _)) = current.take() {
                        groups.push(text);
                    }
                    current = Some((part.word.clone(), part.end()));
                }
            }
        }

        if let Some((text, _)) = current {
            groups.push(text);
        }
        groups
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failure({}|{}|{}|{} parts)",
            self.resource,
            self.resource_primary_key.as_deref().unwrap_or(""),
            self.problem_field,
            self.parts.len()
        )
    }
}

pub fn redact_sensitive(s: &str) -> String {
    const MAX_LEN: usize = 8;
    let len = s.chars().count();
    if len <= MAX_LEN {
        "[REDACTED]".to_string()
    } else {
        format!("[REDACTED: {} chars]", len)
    }
}

/// Returns `sensitive_content` verbatim only when `PIISCAN_ALLOW_DEBUG_PII=true`.
pub fn loggable(sensitive_content: &str) -> String {
    if *PII_DEBUG_ALLOWED {
        sensitive_content.to_string()
    } else {
        redact_sensitive(sensitive_content)
    }
}

pub fn log_failure_part_debug(module_path: &str, field: &str, part: &FailurePart) {
    debug!(
        "{} Found FailurePart: Field='{}', Classification='{}', Offset={}, Word='{}'",
        module_path,
        field,
        part.classification,
        part.offset,
        loggable(&part.word)
    );
}

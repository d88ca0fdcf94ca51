//! compiler.rs - Compiles and caches the regular expressions behind rules.
//!
//! Rule patterns are compiled once per (pattern, case-sensitivity) pair and
//! shared through a process-wide cache, so that cloned rules and rules
//! regenerated from the same failure do not pay for compilation again.
//!
//! License: MIT OR APACHE 2.0

use lazy_static::lazy_static;
use log::debug;
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::errors::{PiiScanError, Result};

/// Maximum allowed length for a rule pattern string.
///
/// Whole-value patterns embed the scanned value, so this is generous.
pub const MAX_PATTERN_LENGTH: usize = 16 * 1024;

/// Entries beyond this are dropped wholesale rather than evicted one by one.
const MAX_CACHED_PATTERNS: usize = 4096;

lazy_static! {
    static ref COMPILED_PATTERN_CACHE: RwLock<HashMap<(String, bool), Regex>> = RwLock::new(HashMap::new());
}

/// Compiles `pattern`, case-insensitively unless `case_sensitive` is set.
pub fn compile_pattern(pattern: &str, case_sensitive: bool) -> Result<Regex> {
    let key = (pattern.to_string(), case_sensitive);

    {
        let cache = COMPILED_PATTERN_CACHE.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(regex) = cache.get(&key) {
            return Ok(regex.clone());
        }
    }

    if pattern.len() > MAX_PATTERN_LENGTH {
        return Err(PiiScanError::PatternLengthExceeded(pattern.len(), MAX_PATTERN_LENGTH));
    }

    let regex = RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .size_limit(10 * (1 << 20)) // 10 MB limit for compiled regex
        .build()
        .map_err(|e| PiiScanError::RuleCompilationError(pattern.to_string(), e))?;

    debug!(target: "piiscan_core::compiler", "Compiled pattern '{}' (case_sensitive={}).", pattern, case_sensitive);

    let mut cache = COMPILED_PATTERN_CACHE.write().unwrap_or_else(PoisonError::into_inner);
    if cache.len() >= MAX_CACHED_PATTERNS {
        cache.clear();
    }
    cache.insert(key, regex.clone());
    Ok(regex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_compilation_is_case_insensitive() {
        let re = compile_pattern("fred", false).unwrap();
        assert!(re.is_match("FRED"));
        let re = compile_pattern("fred", true).unwrap();
        assert!(!re.is_match("FRED"));
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let err = compile_pattern("(unclosed", false).unwrap_err();
        assert!(matches!(err, PiiScanError::RuleCompilationError(p, _) if p == "(unclosed"));
    }

    #[test]
    fn test_overlong_pattern_is_rejected() {
        let pattern = "a".repeat(MAX_PATTERN_LENGTH + 1);
        assert!(matches!(
            compile_pattern(&pattern, false),
            Err(PiiScanError::PatternLengthExceeded(_, MAX_PATTERN_LENGTH))
        ));
    }
}

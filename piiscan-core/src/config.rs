//! Configuration management for `piiscan-core`.
//!
//! [`ScannerOptions`] mirrors the options file of a scanning run: where rules come
//! from, which detectors are switched off, which columns are skipped and how the
//! failure report is written. It is read from YAML with PascalCase keys.
//!
//! License: MIT OR APACHE 2.0

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::errors::{PiiScanError, Result};
use crate::rules::RuleSource;

/// Default capacity of each per-field validation cache.
pub const DEFAULT_VALIDATION_CACHE_LIMIT: usize = 1_000_000;

/// Default number of failures buffered before a report flush.
pub const DEFAULT_MAX_CACHE_SIZE: usize = 10_000;

fn default_validation_cache_limit() -> usize {
    DEFAULT_VALIDATION_CACHE_LIMIT
}

fn default_max_cache_size() -> usize {
    DEFAULT_MAX_CACHE_SIZE
}

fn default_separator() -> String {
    ",".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ScannerOptions {
    pub rules_file: Option<PathBuf>,
    pub rules_directory: Option<PathBuf>,
    /// CSV file whose first column lists values that are never reported.
    pub allow_list_file: Option<PathBuf>,
    pub ignore_postcodes: bool,
    pub ignore_dates_in_text: bool,
    /// Comma separated, case-insensitive.
    pub skip_columns: Option<String>,
    /// Capacity of each per-field cache. 0 disables caching.
    #[serde(default = "default_validation_cache_limit")]
    pub validation_cache_limit: usize,
    /// Failures buffered before the report is flushed.
    #[serde(default = "default_max_cache_size")]
    pub max_cache_size: usize,
    /// Report delimiter; `\t`, `\r` and `\n` escapes are expanded.
    #[serde(default = "default_separator")]
    pub destination_csv_separator: String,
    pub strip_whitespace_on_write: bool,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            rules_file: None,
            rules_directory: None,
            allow_list_file: None,
            ignore_postcodes: false,
            ignore_dates_in_text: false,
            skip_columns: None,
            validation_cache_limit: DEFAULT_VALIDATION_CACHE_LIMIT,
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            destination_csv_separator: default_separator(),
            strip_whitespace_on_write: false,
        }
    }
}

impl ScannerOptions {
    /// Loads options from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading scanner options from: {}", path.display());
        let text = fs::read_to_string(path)
            .map_err(|e| PiiScanError::config(format!("Failed to read options file {}: {}", path.display(), e)))?;
        let options: ScannerOptions = serde_yml::from_str(&text).map_err(|e| PiiScanError::yaml(path, e))?;
        debug!("Scanner options: {:?}", options);
        Ok(options)
    }

    /// Lower-cased, trimmed column names from `skip_columns`.
    pub fn skip_columns_set(&self) -> HashSet<String> {
        self.skip_columns
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect()
    }

    /// The configured rule source; exactly one of file or directory must be set.
    pub fn rule_source(&self) -> Result<RuleSource> {
        RuleSource::from_paths(self.rules_file.as_deref(), self.rules_directory.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_keys_are_missing() {
        let options: ScannerOptions = serde_yml::from_str("RulesFile: rules.yaml\n").unwrap();
        assert_eq!(options.rules_file, Some(PathBuf::from("rules.yaml")));
        assert_eq!(options.validation_cache_limit, DEFAULT_VALIDATION_CACHE_LIMIT);
        assert_eq!(options.destination_csv_separator, ",");
        assert!(!options.ignore_postcodes);
    }

    #[test]
    fn test_skip_columns_are_normalised() {
        let options = ScannerOptions {
            skip_columns: Some(" PatientID, ,studydate ".to_string()),
            ..Default::default()
        };
        let set = options.skip_columns_set();
        assert_eq!(set.len(), 2);
        assert!(set.contains("patientid"));
        assert!(set.contains("studydate"));
    }

    #[test]
    fn test_rule_source_conflict() {
        let options = ScannerOptions {
            rules_file: Some("a.yaml".into()),
            rules_directory: Some("rules".into()),
            ..Default::default()
        };
        assert!(matches!(options.rule_source(), Err(PiiScanError::Configuration(_))));
    }
}

// piiscan-core/src/allowlist.rs
//! Exact-match allow-lists: values that are never reported, whatever the rules say.
//!
//! License: MIT OR APACHE 2.0

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::info;

use crate::errors::{PiiScanError, Result};

/// Something that can enumerate allow-listed values.
pub trait AllowListSource {
    fn values(&self) -> Result<Vec<String>>;
}

/// The first column of every record in a header-less CSV file.
#[derive(Debug, Clone)]
pub struct CsvAllowList {
    path: PathBuf,
}

impl CsvAllowList {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AllowListSource for CsvAllowList {
    fn values(&self) -> Result<Vec<String>> {
        if !self.path.is_file() {
            return Err(PiiScanError::config(format!(
                "Allow list file not found: {}",
                self.path.display()
            )));
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)?;

        let mut values = Vec::new();
        for record in reader.records() {
            if let Some(first) = record?.get(0) {
                let first = first.trim();
                if !first.is_empty() {
                    values.push(first.to_string());
                }
            }
        }
        info!("Loaded {} allow list entries from {}", values.len(), self.path.display());
        Ok(values)
    }
}

/// Values already held in memory, such as a column read from a database.
#[derive(Debug, Clone, Default)]
pub struct StaticAllowList(pub Vec<String>);

impl AllowListSource for StaticAllowList {
    fn values(&self) -> Result<Vec<String>> {
        Ok(self.0.clone())
    }
}

/// Lower-cased, trimmed set used for case-insensitive lookups.
pub fn load_allow_list(source: &dyn AllowListSource) -> Result<HashSet<String>> {
    Ok(source
        .values()?
        .into_iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect())
}

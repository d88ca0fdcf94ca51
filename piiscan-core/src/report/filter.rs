// piiscan-core/src/report/filter.rs
//! Part filters applied while a report is being read back.
//!
//! License: MIT OR APACHE 2.0

use std::sync::atomic::{AtomicUsize, Ordering};

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::failure::{Classification, FailurePart};
use crate::rules::compiler::compile_pattern;
use crate::rules::RegexRule;

/// Drops parts from decoded failures. Every filter that is set must match.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PartPatternFilterRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_column: Option<String>,
    /// Pattern the part's word must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_part_pattern: Option<String>,
    /// Pattern the whole problem value must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_pattern: Option<String>,
    #[serde(rename = "As", default, skip_serializing_if = "Classification::is_none")]
    pub as_classification: Classification,
    #[serde(skip)]
    used: AtomicUsize,
    #[serde(skip)]
    part_regex: OnceCell<Regex>,
    #[serde(skip)]
    value_regex: OnceCell<Regex>,
}

impl Clone for PartPatternFilterRule {
    fn clone(&self) -> Self {
        Self {
            if_column: self.if_column.clone(),
            if_part_pattern: self.if_part_pattern.clone(),
            if_pattern: self.if_pattern.clone(),
            as_classification: self.as_classification,
            used: AtomicUsize::new(self.used()),
            part_regex: self.part_regex.clone(),
            value_regex: self.value_regex.clone(),
        }
    }
}

fn regex_for<'a>(cell: &'a OnceCell<Regex>, pattern: &Option<String>) -> Result<Option<&'a Regex>> {
    match pattern {
        None => Ok(None),
        Some(p) => cell.get_or_try_init(|| compile_pattern(p, false)).map(Some),
    }
}

impl PartPatternFilterRule {
    pub fn for_part_pattern(pattern: impl Into<String>) -> Self {
        Self {
            if_part_pattern: Some(pattern.into()),
            ..Default::default()
        }
    }

    /// Restricts the filter to parts of one classification.
    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.as_classification = classification;
        self
    }

    pub fn validate(&self) -> Result<()> {
        regex_for(&self.part_regex, &self.if_part_pattern)?;
        regex_for(&self.value_regex, &self.if_pattern)?;
        Ok(())
    }

    /// True when the filter is restricted to no column or to `field_name`.
    pub fn applies_to_column(&self, field_name: &str) -> bool {
        RegexRule::column_applies(
            self.if_column.as_deref().filter(|c| !c.trim().is_empty()),
            field_name,
        )
    }

    /// True when `part`, found in `problem_value`, should be dropped.
    pub fn covers(&self, part: &FailurePart, problem_value: &str) -> Result<bool> {
        if !self.as_classification.is_none() && self.as_classification != part.classification {
            return Ok(false);
        }
        if let Some(re) = regex_for(&self.value_regex, &self.if_pattern)? {
            if !re.is_match(problem_value) {
                return Ok(false);
            }
        }
        match regex_for(&self.part_regex, &self.if_part_pattern)? {
            Some(re) => Ok(re.is_match(&part.word)),
            None => Ok(self.if_pattern.is_some() || !self.as_classification.is_none()),
        }
    }

    pub fn increment_used(&self) {
        self.used.fetch_add(1, Ordering::Relaxed);
    }

    /// How many parts this filter has removed.
    pub fn used(&self) -> usize {
        self.used.load(Ordering::Relaxed)
    }
}

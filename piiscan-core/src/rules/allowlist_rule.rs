// piiscan-core/src/rules/allowlist_rule.rs
//! Second-pass suppression of parts that an earlier `Report` rule produced.
//!
//! License: MIT OR APACHE 2.0

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::failure::{Classification, FailurePart};
use crate::rules::compiler::compile_pattern;
use crate::rules::regex_rule::{is_false, RegexRule};
use crate::rules::{AppliableRule, RuleAction, RuleOutcome};

fn default_action() -> RuleAction {
    RuleAction::Ignore
}

fn is_ignore(action: &RuleAction) -> bool {
    *action == RuleAction::Ignore
}

/// Matches an individual [`FailurePart`]. Every filter that is set must match
/// for the rule's action to apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AllowlistRule {
    #[serde(default = "default_action", skip_serializing_if = "is_ignore")]
    pub action: RuleAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_column: Option<String>,
    /// Pattern the whole field value must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_pattern: Option<String>,
    /// Pattern the part's word must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_part_pattern: Option<String>,
    /// Only parts of this classification are matched; `None` matches all.
    #[serde(rename = "As", default, skip_serializing_if = "Classification::is_none")]
    pub as_classification: Classification,
    #[serde(default, skip_serializing_if = "is_false")]
    pub case_sensitive: bool,
    #[serde(skip)]
    value_regex: OnceCell<Regex>,
    #[serde(skip)]
    part_regex: OnceCell<Regex>,
}

impl Default for AllowlistRule {
    fn default() -> Self {
        Self {
            action: default_action(),
            if_column: None,
            if_pattern: None,
            if_part_pattern: None,
            as_classification: Classification::None,
            case_sensitive: false,
            value_regex: OnceCell::new(),
            part_regex: OnceCell::new(),
        }
    }
}

impl PartialEq for AllowlistRule {
    fn eq(&self, other: &Self) -> bool {
        self.action == other.action
            && self.if_column == other.if_column
            && self.if_pattern == other.if_pattern
            && self.if_part_pattern == other.if_part_pattern
            && self.as_classification == other.as_classification
            && self.case_sensitive == other.case_sensitive
    }
}

impl AllowlistRule {
    /// An ignore rule for parts whose word matches `part_pattern`.
    pub fn for_part_pattern(part_pattern: impl Into<String>) -> Self {
        Self {
            if_part_pattern: Some(part_pattern.into()),
            ..Default::default()
        }
    }

    fn cached<'a>(&self, cell: &'a OnceCell<Regex>, pattern: &Option<String>) -> Result<Option<&'a Regex>> {
        match pattern {
            None => Ok(None),
            Some(p) => cell.get_or_try_init(|| compile_pattern(p, self.case_sensitive)).map(Some),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.cached(&self.value_regex, &self.if_pattern)?;
        self.cached(&self.part_regex, &self.if_part_pattern)?;
        Ok(())
    }

    /// Decides what should happen to `part`, found in `field_value` of column `field_name`.
    pub fn apply_to_part(&self, field_name: &str, field_value: &str, part: &FailurePart) -> Result<RuleAction> {
        if self.action == RuleAction::None {
            return Ok(RuleAction::None);
        }
        if !RegexRule::column_applies(self.if_column.as_deref(), field_name) {
            return Ok(RuleAction::None);
        }
        if !self.as_classification.is_none() && self.as_classification != part.classification {
            return Ok(RuleAction::None);
        }
        if let Some(re) = self.cached(&self.value_regex, &self.if_pattern)? {
            if !re.is_match(field_value) {
                return Ok(RuleAction::None);
            }
        }
        if let Some(re) = self.cached(&self.part_regex, &self.if_part_pattern)? {
            if !re.is_match(&part.word) {
                return Ok(RuleAction::None);
            }
        }
        Ok(self.action)
    }
}

/// Applied to a whole value, an allowlist rule only looks at the column and value
/// filters and never reports anything itself.
impl AppliableRule for AllowlistRule {
    fn apply(&self, field_name: &str, field_value: &str) -> Result<RuleOutcome> {
        if self.action != RuleAction::Ignore
            || self.if_part_pattern.is_some()
            || !self.as_classification.is_none()
            || !RegexRule::column_applies(self.if_column.as_deref(), field_name)
        {
            return Ok((RuleAction::None, Vec::new()));
        }
        match self.cached(&self.value_regex, &self.if_pattern)? {
            Some(re) if re.is_match(field_value) => Ok((RuleAction::Ignore, Vec::new())),
            _ => Ok((RuleAction::None, Vec::new())),
        }
    }
}

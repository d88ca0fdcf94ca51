// piiscan-core/src/rules/regex_rule.rs
//! The basic pattern rule: report or ignore values matching a regular expression,
//! optionally restricted to a single column.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::failure::{Classification, Failure, FailurePart};
use crate::rules::compiler::compile_pattern;
use crate::rules::{AppliableRule, RuleAction, RuleOutcome};

pub(crate) fn is_false(b: &bool) -> bool {
    !*b
}

/// A pattern rule. Default-valued fields are omitted when written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegexRule {
    #[serde(default, skip_serializing_if = "RuleAction::is_none")]
    pub action: RuleAction,
    /// Restricts the rule to one column; `None` applies it to every column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_pattern: Option<String>,
    /// Classification given to reported parts.
    #[serde(rename = "As", default, skip_serializing_if = "Classification::is_none")]
    pub as_classification: Classification,
    #[serde(default, skip_serializing_if = "is_false")]
    pub case_sensitive: bool,
    #[serde(skip)]
    pub(crate) compiled: OnceCell<Regex>,
}

impl PartialEq for RegexRule {
    fn eq(&self, other: &Self) -> bool {
        self.action == other.action
            && self.if_column == other.if_column
            && self.if_pattern == other.if_pattern
            && self.as_classification == other.as_classification
            && self.case_sensitive == other.case_sensitive
    }
}

impl RegexRule {
    pub fn new(action: RuleAction, if_column: Option<String>, if_pattern: impl Into<String>) -> Self {
        Self {
            action,
            if_column,
            if_pattern: Some(if_pattern.into()),
            ..Default::default()
        }
    }

    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.as_classification = classification;
        self
    }

    /// Two rules are equivalent when column filter, pattern and action agree.
    pub fn is_equivalent(&self, other: &RegexRule) -> bool {
        self.action == other.action
            && self.if_column == other.if_column
            && self.if_pattern == other.if_pattern
    }

    /// The compiled `if_pattern`, if the rule has one.
    pub fn regex(&self) -> Result<Option<&Regex>> {
        match &self.if_pattern {
            None => Ok(None),
            Some(pattern) => self
                .compiled
                .get_or_try_init(|| compile_pattern(pattern, self.case_sensitive))
                .map(Some),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.regex().map(|_| ())
    }

    pub(crate) fn column_applies(if_column: Option<&str>, field_name: &str) -> bool {
        if_column.map_or(true, |c| c.eq_ignore_ascii_case(field_name))
    }

    /// True when the rule produces any action for the failure's field and value.
    pub fn covers(&self, failure: &Failure) -> Result<bool> {
        let (action, _) = self.apply(&failure.problem_field, &failure.problem_value)?;
        Ok(action != RuleAction::None)
    }

    /// Reports each participating capture group when the pattern has groups,
    /// otherwise the whole match.
    fn matched_parts(&self, regex: &Regex, field_value: &str) -> Vec<FailurePart> {
        let mut parts = Vec::new();
        for caps in regex.captures_iter(field_value) {
            let groups: Vec<regex::Match<'_>> = if caps.len() > 1 {
                caps.iter().skip(1).flatten().collect()
            } else {
                caps.get(0).into_iter().collect()
            };
            for m in groups.into_iter().filter(|m| !m.as_str().is_empty()) {
                parts.push(FailurePart::from_byte_match(
                    field_value,
                    m.as_str(),
                    m.start(),
                    self.as_classification,
                ));
            }
        }
        parts
    }
}

impl AppliableRule for RegexRule {
    fn apply(&self, field_name: &str, field_value: &str) -> Result<RuleOutcome> {
        if self.action == RuleAction::None {
            return Ok((RuleAction::None, Vec::new()));
        }

        if !Self::column_applies(self.if_column.as_deref(), field_name) {
            return Ok((RuleAction::None, Vec::new()));
        }

        let parts = match self.regex()? {
            Some(regex) => {
                if !regex.is_match(field_value) {
                    return Ok((RuleAction::None, Vec::new()));
                }
                if self.action == RuleAction::Report {
                    self.matched_parts(regex, field_value)
                } else {
                    Vec::new()
                }
            }
            // A column-only rule covers the entire value.
            None if self.action == RuleAction::Report => {
                vec![FailurePart::new(field_value, self.as_classification, 0)]
            }
            None => Vec::new(),
        };

        Ok((self.action, parts))
    }
}

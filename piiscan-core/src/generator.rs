// piiscan-core/src/generator.rs
//! Derives `IfPattern` expressions from an observed [`Failure`], so that a reviewer
//! can turn a finding into a rule without writing a regular expression by hand.
//!
//! Anchoring depends only on where the failing spans sit in the original value:
//! a pattern starts with `^` when a part begins at offset 0 and ends with `$`
//! when a part reaches the end of the value.
//!
//! License: MIT OR APACHE 2.0

use crate::errors::{PiiScanError, Result};
use crate::failure::{Classification, Failure};
use crate::rules::{RegexRule, RuleAction};

/// How aggressively [`symbols_pattern`] generalises characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymbolsRuleMode {
    /// Digits become `\d` and letters become `[A-Z]` / `[a-z]`.
    #[default]
    All,
    /// Only letters are generalised.
    CharactersOnly,
    /// Only digits are generalised.
    DigitsOnly,
}

/// Which pattern a [`RegexRuleGenerator`] produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternStrategy {
    WholeValue,
    Parts,
    Symbols(SymbolsRuleMode),
}

/// `^<escaped value>$`: matches the full problem value and nothing else.
pub fn whole_value_pattern(failure: &Failure) -> String {
    format!("^{}$", regex::escape(&failure.problem_value))
}

/// Matches only the failing spans, with anything allowed between them.
pub fn parts_pattern(failure: &Failure) -> Result<String> {
    anchored_groups(failure, |literal| regex::escape(literal))
}

/// Like [`parts_pattern`] but each span is expressed as a character-class shape.
pub fn symbols_pattern(failure: &Failure, mode: SymbolsRuleMode) -> Result<String> {
    anchored_groups(failure, |literal| symbolise(literal, mode))
}

fn symbolise(literal: &str, mode: SymbolsRuleMode) -> String {
    let mut out = String::with_capacity(literal.len() * 4);
    for c in literal.chars() {
        if c.is_ascii_digit() && mode != SymbolsRuleMode::CharactersOnly {
            out.push_str(r"\d");
        } else if c.is_ascii_alphabetic() && mode != SymbolsRuleMode::DigitsOnly {
            out.push_str(if c.is_ascii_uppercase() { "[A-Z]" } else { "[a-z]" });
        } else {
            let mut buf = [0u8; 4];
            out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
        }
    }
    out
}

fn anchored_groups(failure: &Failure, render: impl Fn(&str) -> String) -> Result<String> {
    let (Some(min_offset), Some(max_end)) = (
        failure.parts.iter().map(|p| p.offset).min(),
        failure.parts.iter().map(|p| p.end()).max(),
    ) else {
        return Err(PiiScanError::PatternGeneration(format!("{} has no parts", failure)));
    };

    let groups: Vec<String> = failure
        .conflate_parts()
        .iter()
        .map(|literal| format!("({})", render(literal)))
        .collect();

    let mut pattern = String::new();
    if min_offset == 0 {
        pattern.push('^');
    }
    pattern.push_str(&groups.join(".*"));
    if max_end == failure.value_len() {
        pattern.push('$');
    }
    Ok(pattern)
}

/// Produces rules of one action from failures, using a fixed [`PatternStrategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegexRuleGenerator {
    pub strategy: PatternStrategy,
    pub action: RuleAction,
}

impl RegexRuleGenerator {
    pub fn new(strategy: PatternStrategy, action: RuleAction) -> Self {
        Self { strategy, action }
    }

    pub fn if_pattern_for(&self, failure: &Failure) -> Result<String> {
        match self.strategy {
            PatternStrategy::WholeValue => Ok(whole_value_pattern(failure)),
            PatternStrategy::Parts => parts_pattern(failure),
            PatternStrategy::Symbols(mode) => symbols_pattern(failure, mode),
        }
    }

    /// A rule for the failure's column. Ignore rules carry no classification.
    pub fn generate_for(&self, failure: &Failure) -> Result<RegexRule> {
        let classification = match self.action {
            RuleAction::Ignore => Classification::None,
            _ => failure.parts.first().map(|p| p.classification).unwrap_or_default(),
        };
        let rule = RegexRule::new(self.action, Some(failure.problem_field.clone()), self.if_pattern_for(failure)?)
            .with_classification(classification);
        Ok(rule)
    }
}

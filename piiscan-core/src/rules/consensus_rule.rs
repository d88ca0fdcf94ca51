// piiscan-core/src/rules/consensus_rule.rs
//! Combines several rules and only acts when all of them agree.
//!
//! License: MIT OR APACHE 2.0

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::failure::FailurePart;
use crate::rules::{AppliableRule, Rule, RuleAction, RuleOutcome};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConsensusRule {
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl AppliableRule for ConsensusRule {
    fn apply(&self, field_name: &str, field_value: &str) -> Result<RuleOutcome> {
        if self.rules.is_empty() {
            return Ok((RuleAction::None, Vec::new()));
        }

        let outcomes = self
            .rules
            .iter()
            .map(|r| r.apply(field_name, field_value))
            .collect::<Result<Vec<RuleOutcome>>>()?;

        if outcomes.iter().all(|(a, _)| *a == RuleAction::Ignore) {
            return Ok((RuleAction::Ignore, Vec::new()));
        }
        if !outcomes.iter().all(|(a, _)| *a == RuleAction::Report) {
            return Ok((RuleAction::None, Vec::new()));
        }

        let mut iter = outcomes.into_iter().map(|(_, parts)| parts);
        let first = iter.next().unwrap_or_default();
        let rest: Vec<Vec<FailurePart>> = iter.collect();
        let agreed: Vec<FailurePart> = first
            .into_iter()
            .filter(|p| rest.iter().all(|other| other.contains(p)))
            .collect();

        if agreed.is_empty() {
            Ok((RuleAction::None, Vec::new()))
        } else {
            Ok((RuleAction::Report, agreed))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::Classification;
    use crate::rules::RegexRule;

    fn report(pattern: &str) -> Rule {
        Rule::RegexRule(RegexRule::new(RuleAction::Report, None, pattern).with_classification(Classification::Person))
    }

    fn ignore(pattern: &str) -> Rule {
        Rule::RegexRule(RegexRule::new(RuleAction::Ignore, None, pattern))
    }

    #[test]
    fn test_reports_only_parts_found_by_every_rule() {
        let rule = ConsensusRule {
            rules: vec![report(r"\b[A-Z][a-z]+\b"), report("Smith|Jones")],
        };
        let (action, parts) = rule.apply("Notes", "Saw Smith today").unwrap();
        assert_eq!(action, RuleAction::Report);
        assert_eq!(parts, vec![FailurePart::new("Smith", Classification::Person, 4)]);
    }

    #[test]
    fn test_disagreement_yields_none() {
        let rule = ConsensusRule {
            rules: vec![report("Smith"), ignore("Smith")],
        };
        assert_eq!(rule.apply("Notes", "Smith").unwrap().0, RuleAction::None);

        let rule = ConsensusRule {
            rules: vec![report("Smith"), report("Jones")],
        };
        assert_eq!(rule.apply("Notes", "Smith").unwrap().0, RuleAction::None);
    }

    #[test]
    fn test_unanimous_ignore() {
        let rule = ConsensusRule {
            rules: vec![ignore("Smith"), ignore("S")],
        };
        assert_eq!(rule.apply("Notes", "Smith").unwrap(), (RuleAction::Ignore, vec![]));
    }
}

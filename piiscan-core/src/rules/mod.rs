// piiscan-core/src/rules/mod.rs
//! Rule variants and the capability they share.
//!
//! Every rule answers the same question: given a `(field name, field value)` pair,
//! which [`RuleAction`] applies and which fragments (if any) should be reported.
//! Rules are persisted in YAML; the variant is chosen by an explicit tag
//! (`!RegexRule`, `!AllowlistRule`, `!ConsensusRule`, `!SocketRule`) or by the
//! `RuleSet` key a rule is listed under.
//!
//! License: MIT OR APACHE 2.0

pub mod allowlist_rule;
pub mod compiler;
pub mod consensus_rule;
pub mod regex_rule;
pub mod rule_set;
pub mod socket_rule;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::failure::FailurePart;

pub use allowlist_rule::AllowlistRule;
pub use consensus_rule::ConsensusRule;
pub use regex_rule::RegexRule;
pub use rule_set::{RuleSet, RuleSource};
pub use socket_rule::SocketRule;

/// What should happen to a value a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RuleAction {
    /// The rule has no opinion.
    #[default]
    None,
    /// The value is a known false positive; no other classifier may report it.
    Ignore,
    /// The value contains identifiable data.
    Report,
}

impl RuleAction {
    pub fn is_none(&self) -> bool {
        *self == RuleAction::None
    }
}

/// The action a rule produced together with any parts it wants reported.
pub type RuleOutcome = (RuleAction, Vec<FailurePart>);

/// Anything that can classify a field value.
pub trait AppliableRule: Send + Sync {
    /// Applies the rule to one field value.
    ///
    /// Only `Report` outcomes carry parts.
    fn apply(&self, field_name: &str, field_value: &str) -> Result<RuleOutcome>;
}

/// Evaluation order of custom rules. Lower bands run first; ties keep configuration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PriorityBand {
    Ignore,
    Report,
    Generic,
    Consensus,
    Socket,
    /// Rules whose action is `None` can never fire.
    Inert,
}

/// A rule of any kind, as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Rule {
    RegexRule(RegexRule),
    AllowlistRule(AllowlistRule),
    ConsensusRule(ConsensusRule),
    SocketRule(SocketRule),
}

impl Rule {
    pub fn priority_band(&self) -> PriorityBand {
        match self {
            Rule::RegexRule(r) => match r.action {
                RuleAction::Ignore => PriorityBand::Ignore,
                RuleAction::Report => PriorityBand::Report,
                RuleAction::None => PriorityBand::Inert,
            },
            Rule::AllowlistRule(_) => PriorityBand::Generic,
            Rule::ConsensusRule(_) => PriorityBand::Consensus,
            Rule::SocketRule(_) => PriorityBand::Socket,
        }
    }

    /// Compiles every pattern the rule carries so that bad configuration fails early.
    pub fn validate(&self) -> Result<()> {
        match self {
            Rule::RegexRule(r) => r.validate(),
            Rule::AllowlistRule(r) => r.validate(),
            Rule::ConsensusRule(r) => r.rules.iter().try_for_each(Rule::validate),
            Rule::SocketRule(_) => Ok(()),
        }
    }
}

impl AppliableRule for Rule {
    fn apply(&self, field_name: &str, field_value: &str) -> Result<RuleOutcome> {
        match self {
            Rule::RegexRule(r) => r.apply(field_name, field_value),
            Rule::AllowlistRule(r) => r.apply(field_name, field_value),
            Rule::ConsensusRule(r) => r.apply(field_name, field_value),
            Rule::SocketRule(r) => r.apply(field_name, field_value),
        }
    }
}

/// Stable sort into evaluation order.
pub fn sort_by_priority(rules: &mut [Rule]) {
    rules.sort_by_key(Rule::priority_band);
}

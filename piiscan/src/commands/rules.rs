// piiscan/src/commands/rules.rs
//! `piiscan rules`: grow and prune rule files.

use anyhow::{bail, Context, Result};
use log::debug;

use piiscan_core::report::expand_delimiter;
use piiscan_core::store::serialize_rule;
use piiscan_core::{
    DecodeOptions, PatternStrategy, RegexRule, RegexRuleGenerator, ReportReader, RuleAction, RuleStore, SystemClock,
};

use crate::cli::{RulesAddCommand, RulesDeleteCommand};
use crate::ui::output_format::{info_msg, success_msg, warn_msg};

pub fn run_rules_add(cmd: &RulesAddCommand, quiet: bool) -> Result<()> {
    let decode = DecodeOptions {
        delimiter: expand_delimiter(&cmd.separator)?,
        ..Default::default()
    };
    let mut reader = ReportReader::open(&cmd.failures, &decode)
        .with_context(|| format!("Failed to read failures from {}", cmd.failures.display()))?;
    reader.go_to(cmd.row);
    let Some(failure) = reader.current() else {
        bail!(
            "Row {} is out of range; {} has {} failures",
            cmd.row,
            cmd.failures.display(),
            reader.len()
        );
    };
    debug!("Generating rule for {}", failure);

    let generator = RegexRuleGenerator::new(PatternStrategy::from(cmd.mode), RuleAction::from(cmd.action));
    let mut store = RuleStore::open(&cmd.rules_file, generator, Box::new(SystemClock), true)
        .with_context(|| format!("Failed to open rules file {}", cmd.rules_file.display()))?;

    if let Some(existing) = store.has_rule_covering(failure)? {
        warn_msg(format!(
            "An existing rule already covers this failure: {}",
            existing.if_pattern.as_deref().unwrap_or_default()
        ));
    }

    let rule = store.default_rule_for(failure)?;
    let yaml = serialize_rule(&rule)?;
    if cmd.dry_run {
        print!("{}", yaml);
        return Ok(());
    }

    if store.add(rule)? {
        if !quiet {
            print!("{}", yaml);
        }
        success_msg(format!("Rule added to {}", cmd.rules_file.display()));
    } else if !quiet {
        info_msg("An equivalent rule is already stored; nothing was written");
    }
    Ok(())
}

pub fn run_rules_delete(cmd: &RulesDeleteCommand, quiet: bool) -> Result<()> {
    let generator = RegexRuleGenerator::new(PatternStrategy::WholeValue, RuleAction::from(cmd.action));
    let mut store = RuleStore::open(&cmd.rules_file, generator, Box::new(SystemClock), false)
        .with_context(|| format!("Failed to open rules file {}", cmd.rules_file.display()))?;

    let rule = RegexRule::new(RuleAction::from(cmd.action), cmd.column.clone(), cmd.pattern.clone());
    if !store.delete(&rule)? {
        bail!("No rule with pattern '{}' found in {}", cmd.pattern, cmd.rules_file.display());
    }
    if !quiet {
        success_msg(format!("Rule deleted from {}", cmd.rules_file.display()));
    }
    Ok(())
}

// piiscan/src/commands/review.rs
//! `piiscan review`: unattended review of a failure report.

use std::io;

use anyhow::{Context, Result};

use piiscan_core::report::expand_delimiter;
use piiscan_core::{
    DecodeOptions, FailureStoreReport, PatternStrategy, RegexRuleGenerator, ReportReader, RuleAction, RuleStore,
    ScannerOptions, UnattendedReviewer,
};

use crate::cli::ReviewCommand;
use crate::ui::output_format::{info_msg, success_msg, warn_msg};
use crate::ui::summary::{print_table, review_table, rule_usage_table};

fn open_store(path: &std::path::Path, action: RuleAction) -> Result<RuleStore> {
    let generator = RegexRuleGenerator::new(PatternStrategy::WholeValue, action);
    RuleStore::open_read_only(path, generator)
        .with_context(|| format!("Failed to load rules from {}", path.display()))
}

pub fn run_review(cmd: &ReviewCommand, quiet: bool) -> Result<()> {
    let report_store = open_store(&cmd.report_rules, RuleAction::Report)?;
    let ignore_store = open_store(&cmd.ignore_rules, RuleAction::Ignore)?;

    let decode = DecodeOptions {
        stop_at_first_error: cmd.stop_at_first_error,
        delimiter: expand_delimiter(&cmd.separator)?,
        ..Default::default()
    };
    let reader = ReportReader::open(&cmd.failures, &decode)
        .with_context(|| format!("Failed to read failures from {}", cmd.failures.display()))?;
    if reader.problems() > 0 {
        warn_msg(format!(
            "{} of {} report rows could not be read and were skipped",
            reader.problems(),
            reader.rows_processed()
        ));
    }
    if !quiet {
        info_msg(format!("Reviewing {} failures", reader.len()));
    }

    let output_options = ScannerOptions {
        destination_csv_separator: cmd.separator.clone(),
        ..Default::default()
    };
    let output = FailureStoreReport::from_options(&output_options, &cmd.output)
        .with_context(|| format!("Failed to create output report {}", cmd.output.display()))?;
    let summary = UnattendedReviewer::new(reader, report_store, ignore_store, output).run()?;

    for error in &summary.errors {
        warn_msg(error);
    }
    if !quiet {
        let mut stdout = io::stdout();
        print_table(&mut stdout, &review_table(&summary))?;
        if !summary.update_rules_used.is_empty() {
            print_table(&mut stdout, &rule_usage_table("Report rules", &summary.update_rules_used))?;
        }
        if !summary.ignore_rules_used.is_empty() {
            print_table(&mut stdout, &rule_usage_table("Ignore rules", &summary.ignore_rules_used))?;
        }
        success_msg(format!(
            "{} unresolved failures written to {}",
            summary.unresolved,
            cmd.output.display()
        ));
    }
    Ok(())
}

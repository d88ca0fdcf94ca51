// piiscan-core/src/reviewer.rs
//! Batch review of a failure report against two rule stores, with no operator.
//!
//! Each failure is checked against the report store (true positives that should be
//! redacted) and then the ignore store (false positives). Failures neither store
//! covers are copied to an output report so that someone can look at them later.
//!
//! License: MIT OR APACHE 2.0

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, error, info};

use crate::errors::Result;
use crate::failure::Failure;
use crate::report::{FailureStoreReport, ReportReader};
use crate::rules::RegexRule;
use crate::store::RuleStore;

fn rule_key(rule: &RegexRule) -> String {
    format!(
        "{}:{}",
        rule.if_column.as_deref().unwrap_or("*"),
        rule.if_pattern.as_deref().unwrap_or("")
    )
}

/// What a review run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewSummary {
    /// Failures covered by a report rule.
    pub updates: usize,
    /// Failures covered by an ignore rule.
    pub ignores: usize,
    /// Failures written to the output report.
    pub unresolved: usize,
    /// Failures reviewed without error.
    pub total: usize,
    /// Messages for failures that could not be reviewed.
    pub errors: Vec<String>,
    /// Matches per report rule, keyed by `column:pattern`.
    pub update_rules_used: BTreeMap<String, usize>,
    /// Matches per ignore rule, keyed by `column:pattern`.
    pub ignore_rules_used: BTreeMap<String, usize>,
}

impl fmt::Display for ReviewSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failures: {} updates, {} ignored, {} unresolved, {} errors",
            self.total,
            self.updates,
            self.ignores,
            self.unresolved,
            self.errors.len()
        )
    }
}

enum Verdict {
    Update(String),
    Ignore(String),
    Unresolved,
}

pub struct UnattendedReviewer {
    reader: ReportReader,
    report_store: RuleStore,
    ignore_store: RuleStore,
    output: FailureStoreReport,
}

impl UnattendedReviewer {
    pub fn new(
        reader: ReportReader,
        report_store: RuleStore,
        ignore_store: RuleStore,
        output: FailureStoreReport,
    ) -> Self {
        Self {
            reader,
            report_store,
            ignore_store,
            output,
        }
    }

    fn judge(&self, failure: &Failure) -> Result<Verdict> {
        if let Some(rule) = self.report_store.has_rule_covering(failure)? {
            return Ok(Verdict::Update(rule_key(rule)));
        }
        if let Some(rule) = self.ignore_store.has_rule_covering(failure)? {
            return Ok(Verdict::Ignore(rule_key(rule)));
        }
        self.output.add(failure)?;
        Ok(Verdict::Unresolved)
    }

    /// Reviews every remaining failure and closes the output report.
    pub fn run(mut self) -> Result<ReviewSummary> {
        let mut summary = ReviewSummary::default();

        while self.reader.next() {
            let Some(failure) = self.reader.current() else {
                break;
            };
            match self.judge(failure) {
                Ok(Verdict::Update(key)) => {
                    summary.total += 1;
                    summary.updates += 1;
                    *summary.update_rules_used.entry(key).or_default() += 1;
                }
                Ok(Verdict::Ignore(key)) => {
                    summary.total += 1;
                    summary.ignores += 1;
                    *summary.ignore_rules_used.entry(key).or_default() += 1;
                }
                Ok(Verdict::Unresolved) => {
                    summary.total += 1;
                    summary.unresolved += 1;
                }
                Err(e) => {
                    error!("Could not review {}: {}", failure, e);
                    summary.errors.push(format!("{}: {}", failure, e));
                }
            }
            debug!("Reviewed {}", self.reader.describe_progress());
        }

        self.output.close_report()?;

        for (rule, count) in &summary.update_rules_used {
            info!("Report rule {} matched {} failures", rule, count);
        }
        for (rule, count) in &summary.ignore_rules_used {
            info!("Ignore rule {} matched {} failures", rule, count);
        }
        info!("Review finished: {}", summary);
        Ok(summary)
    }
}

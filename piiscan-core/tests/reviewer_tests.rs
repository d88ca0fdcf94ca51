// piiscan-core/tests/reviewer_tests.rs
use std::fs;
use std::io;

use anyhow::Result;
use tempfile::tempdir;

use piiscan_core::report::{deserialize_failures, ReportRecord};
use piiscan_core::{
    Classification, DecodeOptions, Failure, FailurePart, FailureStoreReport, PatternStrategy, PiiScanError, RegexRule,
    RegexRuleGenerator, ReportDestination, ReportReader, RuleAction, RuleStore, ScannerOptions, SystemClock,
    UnattendedReviewer,
};

fn failures() -> Vec<Failure> {
    let make = |pk: &str, field: &str, value: &str, word: &str, offset: usize| {
        Failure::new(
            "Patients",
            Some(pk.to_string()),
            field,
            value,
            vec![FailurePart::new(word, Classification::Person, offset)],
        )
        .unwrap()
    };
    vec![
        make("1", "Notes", "seen by Dr Jones", "Jones", 11),
        make("2", "Notes", "Parkinson disease", "Parkinson", 0),
        make("3", "Notes", "letter to Mrs Patel", "Patel", 14),
        make("4", "Notes", "seen by Dr Jones again", "Jones", 11),
    ]
}

fn store(path: &std::path::Path, rules: Vec<RegexRule>, action: RuleAction) -> Result<RuleStore> {
    let generator = RegexRuleGenerator::new(PatternStrategy::Parts, action);
    let mut store = RuleStore::open(path, generator, Box::new(SystemClock), true)?;
    for rule in rules {
        store.add(rule)?;
    }
    Ok(store)
}

#[test_log::test]
fn test_review_sorts_failures_into_updates_ignores_and_unresolved() -> Result<()> {
    let dir = tempdir()?;
    let report_store = store(
        &dir.path().join("report.yaml"),
        vec![RegexRule::new(RuleAction::Report, Some("Notes".into()), "Dr (Jones)").with_classification(Classification::Person)],
        RuleAction::Report,
    )?;
    let ignore_store = store(
        &dir.path().join("ignore.yaml"),
        vec![RegexRule::new(RuleAction::Ignore, Some("Notes".into()), "^Parkinson disease$")],
        RuleAction::Ignore,
    )?;

    let output_path = dir.path().join("unresolved.csv");
    let output = FailureStoreReport::from_options(&ScannerOptions::default(), &output_path)?;
    let reader = ReportReader::from_failures(failures());

    let summary = UnattendedReviewer::new(reader, report_store, ignore_store, output).run()?;

    assert_eq!(summary.total, 4);
    assert_eq!(summary.updates, 2);
    assert_eq!(summary.ignores, 1);
    assert_eq!(summary.unresolved, 1);
    assert!(summary.errors.is_empty());
    assert_eq!(summary.update_rules_used.get("Notes:Dr (Jones)"), Some(&2));
    assert_eq!(summary.ignore_rules_used.get("Notes:^Parkinson disease$"), Some(&1));

    let unresolved = deserialize_failures(&output_path, &DecodeOptions::default())?;
    assert_eq!(unresolved.failures, vec![failures()[2].clone()]);
    Ok(())
}

#[test_log::test]
fn test_review_with_empty_stores_leaves_everything_unresolved() -> Result<()> {
    let dir = tempdir()?;
    let report_store = store(&dir.path().join("report.yaml"), vec![], RuleAction::Report)?;
    let ignore_store = store(&dir.path().join("ignore.yaml"), vec![], RuleAction::Ignore)?;
    let output_path = dir.path().join("out.csv");
    let output = FailureStoreReport::from_options(&ScannerOptions::default(), &output_path)?;

    let summary =
        UnattendedReviewer::new(ReportReader::from_failures(failures()), report_store, ignore_store, output).run()?;

    assert_eq!(summary.unresolved, 4);
    assert_eq!(summary.to_string(), "4 failures: 0 updates, 0 ignored, 4 unresolved, 0 errors");
    assert_eq!(fs::read_to_string(&output_path)?.lines().count(), 5);
    Ok(())
}

/// Rejects the first batch it is given and accepts everything after that.
#[derive(Default)]
struct FlakyDestination {
    failed_once: bool,
}

impl ReportDestination for FlakyDestination {
    fn write_header(&mut self, _headers: &[&str]) -> piiscan_core::errors::Result<()> {
        Ok(())
    }

    fn write_items(&mut self, _rows: &[ReportRecord]) -> piiscan_core::errors::Result<()> {
        if self.failed_once {
            return Ok(());
        }
        self.failed_once = true;
        Err(PiiScanError::IoError(io::Error::other("disk full")))
    }

    fn flush(&mut self) -> piiscan_core::errors::Result<()> {
        Ok(())
    }
}

#[test_log::test]
fn test_failures_that_cannot_be_reviewed_are_not_counted_in_total() -> Result<()> {
    let dir = tempdir()?;
    let report_store = store(
        &dir.path().join("report.yaml"),
        vec![RegexRule::new(RuleAction::Report, Some("Notes".into()), "Dr (Jones)").with_classification(Classification::Person)],
        RuleAction::Report,
    )?;
    let ignore_store = store(
        &dir.path().join("ignore.yaml"),
        vec![RegexRule::new(RuleAction::Ignore, Some("Notes".into()), "^Parkinson disease$")],
        RuleAction::Ignore,
    )?;
    let output = FailureStoreReport::new(1);
    output.add_destination(Box::new(FlakyDestination::default()))?;

    let summary =
        UnattendedReviewer::new(ReportReader::from_failures(failures()), report_store, ignore_store, output).run()?;

    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("disk full"));
    assert_eq!(summary.total, 3);
    assert_eq!(summary.to_string(), "3 failures: 2 updates, 1 ignored, 0 unresolved, 1 errors");
    Ok(())
}

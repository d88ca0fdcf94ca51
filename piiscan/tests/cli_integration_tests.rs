// piiscan/tests/cli_integration_tests.rs
//! Command-line integration tests for the `piiscan` binary.
//!
//! Each test runs the real executable through `assert_cmd` against files in a
//! temporary directory and checks the files it writes as well as its output.

use anyhow::Result;
use assert_cmd::Command;
#[allow(unused_imports)]
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

use piiscan_core::store::serialize_rule;
use piiscan_core::{RegexRule, RuleAction};

const PEOPLE_CSV: &str = "Id,Name,Notes\n\
1,Fred Smith,Patient lives at DD3 7LB\n\
2,Jane Doe,hey there 0101010101 excited to see you\n\
3,Tom Jones,nothing to see here\n";

fn piiscan() -> Command {
    let mut cmd = Command::cargo_bin("piiscan").unwrap();
    cmd.env("RUST_LOG", "debug");
    cmd
}

fn write(dir: &Path, name: &str, content: &str) -> Result<String> {
    let path = dir.join(name);
    fs::write(&path, content)?;
    Ok(path.to_string_lossy().into_owned())
}

#[test]
fn test_no_arguments_prints_help() {
    piiscan()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_scan_writes_failure_report() -> Result<()> {
    let dir = tempdir()?;
    let input = write(dir.path(), "people.csv", PEOPLE_CSV)?;
    let report = dir.path().join("failures.csv");

    piiscan()
        .args(["scan", "--input", input.as_str(), "--report"])
        .arg(&report)
        .args(["--primary-key", "Id", "--skip-columns", "Id"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Postcode"))
        .stdout(predicate::str::contains("PrivateIdentifier"));

    let text = fs::read_to_string(&report)?;
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("Resource,ResourcePrimaryKey,ProblemField,ProblemValue,PartWords,PartClassifications,PartOffsets")
    );
    assert!(text.contains("people.csv,1,Notes,Patient lives at DD3 7LB,DD3 7LB,Postcode,17"));
    assert!(text.contains("people.csv,2,Notes,hey there 0101010101 excited to see you,0101010101,PrivateIdentifier,10"));
    assert_eq!(text.lines().count(), 3);
    Ok(())
}

#[test]
fn test_scan_with_rules_file_and_toggles() -> Result<()> {
    let dir = tempdir()?;
    let input = write(dir.path(), "people.csv", PEOPLE_CSV)?;
    let rules = write(
        dir.path(),
        "rules.yaml",
        "BasicRules:\n  - Action: Report\n    IfColumn: Name\n    IfPattern: ^(Fred)\n    As: Person\n",
    )?;
    let report = dir.path().join("failures.csv");

    piiscan()
        .args(["--quiet", "scan", "--input", input.as_str(), "--rules-file", rules.as_str(), "--ignore-postcodes", "--report"])
        .arg(&report)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let text = fs::read_to_string(&report)?;
    assert!(text.contains("Name,Fred Smith,Fred,Person,0"));
    assert!(!text.contains("Postcode"));
    Ok(())
}

#[test]
fn test_scan_rejects_both_rule_sources() -> Result<()> {
    let dir = tempdir()?;
    let input = write(dir.path(), "people.csv", PEOPLE_CSV)?;
    let rules = write(dir.path(), "rules.yaml", "BasicRules: []\n")?;

    piiscan()
        .args(["scan", "--input", input.as_str(), "--report", "out.csv", "--rules-file", rules.as_str(), "--rules-dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
    Ok(())
}

#[test]
fn test_rules_add_then_review() -> Result<()> {
    let dir = tempdir()?;
    let failures = write(
        dir.path(),
        "failures.csv",
        "Resource,ResourcePrimaryKey,ProblemField,ProblemValue,PartWords,PartClassifications,PartOffsets\n\
         people.csv,1,Notes,Patient lives at DD3 7LB,DD3 7LB,Postcode,17\n\
         people.csv,2,Notes,Parkinson disease,Parkinson,Person,0\n",
    )?;
    let ignore_rules = dir.path().join("ignore.yaml");
    let report_rules = dir.path().join("report.yaml");

    piiscan()
        .args(["rules", "add", "--failures", failures.as_str(), "--row", "1", "--action", "ignore", "--rules-file"])
        .arg(&ignore_rules)
        .assert()
        .success()
        .stdout(predicate::str::contains("^Parkinson disease$"));

    // Adding the same rule again writes nothing.
    piiscan()
        .args(["rules", "add", "--failures", failures.as_str(), "--row", "1", "--rules-file"])
        .arg(&ignore_rules)
        .assert()
        .success();
    assert_eq!(fs::read_to_string(&ignore_rules)?.matches("IfPattern").count(), 1);

    fs::write(&report_rules, "")?;
    let output = dir.path().join("unresolved.csv");
    piiscan()
        .args(["review", "--failures", failures.as_str(), "--ignore-rules"])
        .arg(&ignore_rules)
        .arg("--report-rules")
        .arg(&report_rules)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Unresolved"))
        .stdout(predicate::str::contains("Notes:^Parkinson disease$"));

    let unresolved = fs::read_to_string(&output)?;
    assert!(unresolved.contains("DD3 7LB"));
    assert!(!unresolved.contains("Parkinson"));
    Ok(())
}

#[test]
fn test_tab_separated_report_can_be_reviewed_and_mined() -> Result<()> {
    let dir = tempdir()?;
    let input = write(dir.path(), "people.csv", PEOPLE_CSV)?;
    let report = dir.path().join("failures.tsv");

    piiscan()
        .args(["--quiet", "scan", "--input", input.as_str(), "--separator", "\\t", "--skip-columns", "Id", "--report"])
        .arg(&report)
        .assert()
        .success();
    assert!(fs::read_to_string(&report)?.contains("Notes\tPatient lives at DD3 7LB\tDD3 7LB\tPostcode\t17"));

    let ignore_rules = write(dir.path(), "ignore.yaml", "")?;
    let report_rules = write(dir.path(), "report.yaml", "")?;
    let output = dir.path().join("unresolved.tsv");
    piiscan()
        .args(["review", "--separator", "\\t", "--ignore-rules", ignore_rules.as_str(), "--report-rules", report_rules.as_str(), "--failures"])
        .arg(&report)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stderr(predicate::str::contains("could not be read").not());

    let unresolved = fs::read_to_string(&output)?;
    assert!(unresolved.contains("DD3 7LB\tPostcode\t17"));
    assert!(unresolved.contains("0101010101\tPrivateIdentifier\t10"));

    piiscan()
        .args(["rules", "add", "--separator", "\\t", "--row", "1", "--dry-run", "--rules-file", ignore_rules.as_str(), "--failures"])
        .arg(&report)
        .assert()
        .success()
        .stdout(predicate::str::contains("^hey there 0101010101 excited to see you$"));
    Ok(())
}

#[test]
fn test_rules_add_parts_mode_dry_run() -> Result<()> {
    let dir = tempdir()?;
    let failures = write(
        dir.path(),
        "failures.csv",
        "Resource,ResourcePrimaryKey,ProblemField,ProblemValue,PartWords,PartClassifications,PartOffsets\n\
         letters,9,Body,Dorothy from Kansas with dog Toto,Kansas###Toto,Location###Person,13###29\n",
    )?;
    let rules = dir.path().join("report.yaml");

    piiscan()
        .args(["rules", "add", "--failures", failures.as_str(), "--mode", "parts", "--action", "report", "--dry-run", "--rules-file"])
        .arg(&rules)
        .assert()
        .success()
        .stdout(predicate::str::contains("(Kansas).*(Toto)$"))
        .stdout(predicate::str::contains("Location"));

    assert!(fs::read_to_string(&rules).map(|t| t.trim().is_empty()).unwrap_or(true));
    Ok(())
}

#[test]
fn test_rules_add_row_out_of_range() -> Result<()> {
    let dir = tempdir()?;
    let failures = write(
        dir.path(),
        "failures.csv",
        "Resource,ResourcePrimaryKey,ProblemField,ProblemValue,PartWords,PartClassifications,PartOffsets\n",
    )?;
    let rules = dir.path().join("r.yaml");
    piiscan()
        .args(["rules", "add", "--failures", failures.as_str(), "--row", "3", "--rules-file"])
        .arg(&rules)
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
    Ok(())
}

#[test]
fn test_rules_delete_removes_rule() -> Result<()> {
    let dir = tempdir()?;
    let rule = RegexRule::new(RuleAction::Ignore, Some("Notes".into()), "^fine$");
    let rules = write(dir.path(), "ignore.yaml", &serialize_rule(&rule)?)?;

    piiscan()
        .args(["rules", "delete", "--rules-file", rules.as_str(), "--column", "Notes", "--pattern", "^fine$"])
        .assert()
        .success();
    let text = fs::read_to_string(&rules)?;
    assert!(!text.contains("IfPattern"));
    assert!(text.contains("# Rule deleted by"));

    piiscan()
        .args(["rules", "delete", "--rules-file", rules.as_str(), "--pattern", "^fine$"])
        .assert()
        .failure();
    Ok(())
}

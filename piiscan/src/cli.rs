// piiscan/src/cli.rs
//! This file defines the command-line interface (CLI) for the piiscan application,
//! including all available commands and their arguments.
//! License: MIT OR APACHE 2.0

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use piiscan_core::{PatternStrategy, RuleAction, SymbolsRuleMode};

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "piiscan",
    author = "Relay",
    version = env!("CARGO_PKG_VERSION"),
    about = "Find identifiable data in CSV files",
    long_about = "piiscan classifies every cell of a CSV file, writes what it finds to a failure report, and helps reviewers turn those findings into report or ignore rules so that later scans get more accurate.",
    arg_required_else_help = true,
)]
pub struct Cli {
    /// Disable informational messages
    #[arg(long, short = 'q', global = true, help = "Suppress all informational and debug messages.")]
    pub quiet: bool,

    /// Enable debug logging (overrides RUST_LOG)
    #[arg(long, short = 'd', global = true, help = "Enable debug logging.")]
    pub debug: bool,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// All available commands for the `piiscan` CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scans every cell of a CSV file and writes a failure report.
    #[command(about = "Scans every cell of a CSV file and writes a failure report.")]
    Scan(ScanCommand),

    /// Reviews a failure report against report and ignore rules without an operator.
    #[command(about = "Reviews a failure report against report and ignore rules.")]
    Review(ReviewCommand),

    /// Manages rule files.
    #[command(subcommand, about = "Manages rule files.")]
    Rules(RulesCommand),
}

/// Arguments for the `scan` command.
#[derive(Parser, Debug)]
pub struct ScanCommand {
    /// CSV file to scan. The first row must hold column names.
    #[arg(long, short = 'i', value_name = "FILE", help = "CSV file to scan.")]
    pub input: PathBuf,

    /// Where to write the failure report.
    #[arg(long, short = 'r', value_name = "FILE", help = "Where to write the failure report.")]
    pub report: PathBuf,

    /// Scanner options file (YAML). Command-line flags override its values.
    #[arg(long = "options", value_name = "FILE", help = "Scanner options file (YAML).")]
    pub options: Option<PathBuf>,

    /// A single rules file.
    #[arg(long = "rules-file", value_name = "FILE", conflicts_with = "rules_dir", help = "A single rules file.")]
    pub rules_file: Option<PathBuf>,

    /// A directory of rules files.
    #[arg(long = "rules-dir", value_name = "DIR", help = "A directory of YAML rules files.")]
    pub rules_dir: Option<PathBuf>,

    /// Column holding each row's primary key.
    #[arg(long = "primary-key", value_name = "COLUMN", help = "Column holding each row's primary key.")]
    pub primary_key: Option<String>,

    /// CSV file whose first column lists values that are never reported.
    #[arg(long = "allowlist", value_name = "FILE", help = "CSV file of values that are never reported.")]
    pub allowlist: Option<PathBuf>,

    #[arg(long = "ignore-postcodes", help = "Do not report postcodes.")]
    pub ignore_postcodes: bool,

    #[arg(long = "ignore-dates", help = "Do not report dates found in free text.")]
    pub ignore_dates: bool,

    /// Columns to skip (comma-separated).
    #[arg(long = "skip-columns", value_name = "COLUMNS", help = "Columns to skip (comma-separated).")]
    pub skip_columns: Option<String>,

    /// Capacity of each per-column validation cache; 0 disables caching.
    #[arg(long = "cache-limit", value_name = "N", help = "Capacity of each per-column validation cache (0 disables caching).")]
    pub cache_limit: Option<usize>,

    /// Report delimiter. `\t` is accepted.
    #[arg(long = "separator", value_name = "SEP", help = "Delimiter used in the failure report.")]
    pub separator: Option<String>,
}

/// Arguments for the `review` command.
#[derive(Parser, Debug)]
pub struct ReviewCommand {
    /// Failure report to review.
    #[arg(long, short = 'f', value_name = "FILE", help = "Failure report to review.")]
    pub failures: PathBuf,

    /// Rules for known false positives.
    #[arg(long = "ignore-rules", value_name = "FILE", help = "Rules for known false positives.")]
    pub ignore_rules: PathBuf,

    /// Rules for confirmed identifiable data.
    #[arg(long = "report-rules", value_name = "FILE", help = "Rules for confirmed identifiable data.")]
    pub report_rules: PathBuf,

    /// Where failures no rule covers are written.
    #[arg(long, short = 'o', value_name = "FILE", help = "Where failures no rule covers are written.")]
    pub output: PathBuf,

    /// Abort on the first row of the report that cannot be read.
    #[arg(long = "stop-at-first-error", help = "Abort on the first unreadable report row.")]
    pub stop_at_first_error: bool,

    /// Delimiter of the failure report, also used for the output. `\t` is accepted.
    #[arg(long = "separator", value_name = "SEP", default_value = ",", help = "Delimiter of the failure report and the output.")]
    pub separator: String,
}

/// Subcommands for the `rules` command.
#[derive(Subcommand, Debug)]
pub enum RulesCommand {
    /// Generates a rule from one failure in a report and appends it to a rules file.
    #[command(about = "Generates a rule from a reported failure and appends it to a rules file.")]
    Add(RulesAddCommand),

    /// Removes a rule from a rules file.
    #[command(about = "Removes a rule matching the given column and pattern.")]
    Delete(RulesDeleteCommand),
}

#[derive(Parser, Debug)]
pub struct RulesAddCommand {
    #[arg(long, short = 'f', value_name = "FILE", help = "Failure report to take the failure from.")]
    pub failures: PathBuf,

    /// Delimiter of the failure report. `\t` is accepted.
    #[arg(long = "separator", value_name = "SEP", default_value = ",", help = "Delimiter of the failure report.")]
    pub separator: String,

    /// Zero-based index of the failure in the report.
    #[arg(long, value_name = "N", default_value_t = 0, help = "Zero-based index of the failure in the report.")]
    pub row: usize,

    #[arg(long = "rules-file", value_name = "FILE", help = "Rules file to append to (created if missing).")]
    pub rules_file: PathBuf,

    #[arg(long, value_enum, default_value = "ignore", help = "Action of the generated rule.")]
    pub action: ActionChoice,

    #[arg(long, value_enum, default_value = "whole", help = "How the pattern is derived from the failure.")]
    pub mode: ModeChoice,

    /// Print the rule without writing it.
    #[arg(long = "dry-run", help = "Print the generated rule without writing it.")]
    pub dry_run: bool,
}

#[derive(Parser, Debug)]
pub struct RulesDeleteCommand {
    #[arg(long = "rules-file", value_name = "FILE", help = "Rules file to delete from.")]
    pub rules_file: PathBuf,

    #[arg(long, value_enum, default_value = "ignore", help = "Action of the rule to delete.")]
    pub action: ActionChoice,

    #[arg(long, value_name = "COLUMN", help = "Column the rule is restricted to.")]
    pub column: Option<String>,

    #[arg(long, value_name = "REGEX", help = "The rule's pattern.")]
    pub pattern: String,
}

/// Action of a rule created from the command line.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ActionChoice {
    /// The value is a false positive.
    Ignore,
    /// The value is identifiable.
    Report,
}

impl From<ActionChoice> for RuleAction {
    fn from(choice: ActionChoice) -> Self {
        match choice {
            ActionChoice::Ignore => RuleAction::Ignore,
            ActionChoice::Report => RuleAction::Report,
        }
    }
}

/// Pattern generation strategy.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ModeChoice {
    /// Match the whole value literally.
    Whole,
    /// Match only the failing parts literally.
    Parts,
    /// Match the shape of the failing parts.
    Symbols,
    /// Match the shape of digits only.
    Digits,
    /// Match the shape of letters only.
    Characters,
}

impl From<ModeChoice> for PatternStrategy {
    fn from(choice: ModeChoice) -> Self {
        match choice {
            ModeChoice::Whole => PatternStrategy::WholeValue,
            ModeChoice::Parts => PatternStrategy::Parts,
            ModeChoice::Symbols => PatternStrategy::Symbols(SymbolsRuleMode::All),
            ModeChoice::Digits => PatternStrategy::Symbols(SymbolsRuleMode::DigitsOnly),
            ModeChoice::Characters => PatternStrategy::Symbols(SymbolsRuleMode::CharactersOnly),
        }
    }
}

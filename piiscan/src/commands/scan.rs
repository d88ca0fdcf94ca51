// piiscan/src/commands/scan.rs
//! `piiscan scan`: classify every cell of a CSV file and write a failure report.

use std::collections::HashSet;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info, warn};

use piiscan_core::{
    load_allow_list, ClassificationEngine, CsvAllowList, FailureStoreReport, RuleEngine, RuleSet, ScannerOptions,
};

use crate::cli::ScanCommand;
use crate::ui::output_format::{info_msg, success_msg};
use crate::ui::summary::{print_table, scan_table, ScanSummary};

/// Options file first, then command-line flags on top.
pub fn resolve_options(cmd: &ScanCommand) -> Result<ScannerOptions> {
    let mut options = match &cmd.options {
        Some(path) => ScannerOptions::load_from_file(path)
            .with_context(|| format!("Failed to load scanner options from {}", path.display()))?,
        None => ScannerOptions::default(),
    };

    if cmd.rules_file.is_some() || cmd.rules_dir.is_some() {
        options.rules_file = cmd.rules_file.clone();
        options.rules_directory = cmd.rules_dir.clone();
    }
    if let Some(path) = &cmd.allowlist {
        options.allow_list_file = Some(path.clone());
    }
    options.ignore_postcodes |= cmd.ignore_postcodes;
    options.ignore_dates_in_text |= cmd.ignore_dates;
    if let Some(columns) = &cmd.skip_columns {
        options.skip_columns = Some(columns.clone());
    }
    if let Some(limit) = cmd.cache_limit {
        options.validation_cache_limit = limit;
    }
    if let Some(separator) = &cmd.separator {
        options.destination_csv_separator = separator.clone();
    }
    Ok(options)
}

/// Builds the engine. With no rule source configured only the built-in detectors run.
pub fn build_engine(options: &ScannerOptions) -> Result<RuleEngine> {
    if options.rules_file.is_some() || options.rules_directory.is_some() {
        return RuleEngine::from_options(options).context("Failed to build the classification engine");
    }
    warn!("No rules file or directory configured; only the built-in detectors will run");
    let allow_list = match &options.allow_list_file {
        Some(path) => load_allow_list(&CsvAllowList::new(path))?,
        None => HashSet::new(),
    };
    Ok(RuleEngine::with_options(RuleSet::default(), options, allow_list)?)
}

fn resource_name(input: &Path) -> String {
    input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string())
}

/// Scans `cmd.input` and returns what was found.
pub fn scan_file(engine: &dyn ClassificationEngine, cmd: &ScanCommand, report: &FailureStoreReport) -> Result<ScanSummary> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(&cmd.input)
        .with_context(|| format!("Failed to open input file {}", cmd.input.display()))?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let key_index = match &cmd.primary_key {
        Some(column) => Some(
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(column))
                .with_context(|| format!("Primary key column '{}' not found in {}", column, cmd.input.display()))?,
        ),
        None => None,
    };

    let resource = resource_name(&cmd.input);
    let mut summary = ScanSummary::default();

    for record in reader.records() {
        let record = record.with_context(|| format!("Failed to read row {} of {}", summary.rows + 1, cmd.input.display()))?;
        summary.rows += 1;
        let key = key_index.and_then(|i| record.get(i));

        for (column, value) in headers.iter().zip(record.iter()) {
            summary.values += 1;
            if let Some(failure) = engine.classify(&resource, key, column, value)? {
                for part in &failure.parts {
                    summary.count_part(part.classification);
                }
                summary.failures += 1;
                report.add(&failure)?;
            }
        }
        debug!("Scanned row {}", summary.rows);
    }
    Ok(summary)
}

pub fn run_scan(cmd: &ScanCommand, quiet: bool) -> Result<()> {
    let options = resolve_options(cmd)?;
    let engine = build_engine(&options)?;
    let report = FailureStoreReport::from_options(&options, &cmd.report)
        .with_context(|| format!("Failed to create report {}", cmd.report.display()))?;

    if !quiet {
        info_msg(format!("Scanning {}", cmd.input.display()));
    }
    let summary = scan_file(&engine, cmd, &report)?;
    report.close_report()?;
    info!(
        "Scanned {} values in {} rows; {} failures",
        summary.values, summary.rows, summary.failures
    );

    if !quiet {
        print_table(&mut io::stdout(), &scan_table(&summary, &engine.stats()))?;
        success_msg(format!(
            "{} failures written to {}",
            summary.failures,
            cmd.report.display()
        ));
    }
    Ok(())
}

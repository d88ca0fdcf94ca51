// piiscan/src/ui/summary.rs
//! Summary tables printed at the end of a command.

use std::collections::BTreeMap;
use std::io::{self, Write};

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};

use piiscan_core::{Classification, ReviewSummary, ValidationStats};

/// Counters gathered while scanning one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub rows: usize,
    pub values: usize,
    pub failures: usize,
    pub parts_by_classification: BTreeMap<String, usize>,
}

impl ScanSummary {
    pub fn count_part(&mut self, classification: Classification) {
        *self
            .parts_by_classification
            .entry(classification.to_string())
            .or_default() += 1;
    }
}

fn new_table(headers: [&str; 2]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(h)));
    table
}

fn add_count(table: &mut Table, label: &str, value: impl ToString) {
    table.add_row(vec![
        Cell::new(label),
        Cell::new(value.to_string()).set_alignment(CellAlignment::Right),
    ]);
}

pub fn scan_table(summary: &ScanSummary, stats: &ValidationStats) -> Table {
    let mut table = new_table(["Scan", "Count"]);
    add_count(&mut table, "Rows", summary.rows);
    add_count(&mut table, "Values scanned", summary.values);
    add_count(&mut table, "Failures", summary.failures);
    for (classification, count) in &summary.parts_by_classification {
        add_count(&mut table, &format!("  {}", classification), count);
    }
    add_count(&mut table, "Cache hits", stats.cache_hits);
    add_count(&mut table, "Cache misses", stats.cache_misses);
    table
}

pub fn review_table(summary: &ReviewSummary) -> Table {
    let mut table = new_table(["Review", "Count"]);
    add_count(&mut table, "Failures", summary.total);
    add_count(&mut table, "Updates", summary.updates);
    add_count(&mut table, "Ignored", summary.ignores);
    add_count(&mut table, "Unresolved", summary.unresolved);
    add_count(&mut table, "Errors", summary.errors.len());
    table
}

/// Rules and how many failures each matched.
pub fn rule_usage_table(title: &str, usage: &BTreeMap<String, usize>) -> Table {
    let mut table = new_table([title, "Matches"]);
    for (rule, count) in usage {
        add_count(&mut table, rule, count);
    }
    table
}

pub fn print_table(writer: &mut dyn Write, table: &Table) -> io::Result<()> {
    writeln!(writer, "{}", table)
}

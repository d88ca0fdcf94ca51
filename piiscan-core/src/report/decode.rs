// piiscan-core/src/report/decode.rs
//! Reading failure reports back into [`Failure`]s.
//!
//! License: MIT OR APACHE 2.0

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::errors::{PiiScanError, Result};
use crate::failure::{Failure, FailurePart};
use crate::report::filter::PartPatternFilterRule;
use crate::report::repair::repair_part;
use crate::report::{ReportRecord, PIXEL_DATA_FIELD, SEPARATOR};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// How a report is read back.
pub struct DecodeOptions<'a> {
    /// Decode rows on the rayon thread pool.
    pub parallel: bool,
    /// Abort on the first bad row instead of counting it and moving on.
    pub stop_at_first_error: bool,
    pub part_filters: &'a [PartPatternFilterRule],
    /// Called periodically with the number of rows processed so far, and once at the end.
    pub on_progress: Option<&'a (dyn Fn(usize) + Sync)>,
    pub delimiter: u8,
}

impl Default for DecodeOptions<'_> {
    fn default() -> Self {
        Self {
            parallel: true,
            stop_at_first_error: false,
            part_filters: &[],
            on_progress: None,
            delimiter: b',',
        }
    }
}

/// The failures read from a report plus bookkeeping about the rows.
#[derive(Debug, Default)]
pub struct DecodeOutcome {
    pub failures: Vec<Failure>,
    pub rows_processed: usize,
    /// Rows that could not be decoded and were skipped.
    pub problems: usize,
}

fn decode_error(record: &ReportRecord, reason: impl Into<String>) -> PiiScanError {
    PiiScanError::Decode {
        row: record.to_string(),
        reason: reason.into(),
    }
}

fn parse_parts(record: &ReportRecord) -> Result<Vec<FailurePart>> {
    let words: Vec<&str> = record.part_words.split(SEPARATOR).collect();
    let classifications: Vec<&str> = record.part_classifications.split(SEPARATOR).collect();
    let offsets: Vec<&str> = record.part_offsets.split(SEPARATOR).collect();

    if words.len() != classifications.len() || words.len() != offsets.len() {
        return Err(decode_error(
            record,
            format!(
                "part lists differ in length ({} words, {} classifications, {} offsets)",
                words.len(),
                classifications.len(),
                offsets.len()
            ),
        ));
    }

    words
        .iter()
        .zip(classifications.iter())
        .zip(offsets.iter())
        .map(|((word, classification), offset)| {
            let classification = classification.parse().map_err(|e: String| decode_error(record, e))?;
            let offset = offset
                .trim()
                .parse::<usize>()
                .map_err(|_| decode_error(record, format!("Invalid offset '{}'", record.part_offsets)))?;
            Ok(FailurePart::new(*word, classification, offset))
        })
        .collect()
}

/// Turns one row into a failure. `Ok(None)` means every part was filtered away.
pub fn decode_record(record: &ReportRecord, filters: &[PartPatternFilterRule]) -> Result<Option<Failure>> {
    let Some(value) = record.problem_value.as_deref() else {
        return Err(decode_error(record, "ProblemValue was null"));
    };

    let mut parts = parse_parts(record)?;

    if record.problem_field != PIXEL_DATA_FIELD {
        parts = parts
            .iter()
            .map(|p| {
                repair_part(value, p)
                    .ok_or_else(|| decode_error(record, format!("could not locate part at offset {}", p.offset)))
            })
            .collect::<Result<Vec<_>>>()?;
    }

    for filter in filters.iter().filter(|f| f.applies_to_column(&record.problem_field)) {
        let mut kept = Vec::with_capacity(parts.len());
        for part in parts {
            if filter.covers(&part, value)? {
                filter.increment_used();
            } else {
                kept.push(part);
            }
        }
        parts = kept;
    }

    let primary_key = Some(record.resource_primary_key.clone()).filter(|k| !k.is_empty());
    Ok(Failure::new(
        record.resource.clone(),
        primary_key,
        record.problem_field.clone(),
        value,
        parts,
    ))
}

/// Runs `work` while a helper thread reports progress every [`PROGRESS_INTERVAL`].
fn with_progress<T>(counter: &AtomicUsize, on_progress: Option<&(dyn Fn(usize) + Sync)>, work: impl FnOnce() -> T) -> T {
    let Some(callback) = on_progress else {
        return work();
    };
    let done = AtomicBool::new(false);
    let result = thread::scope(|scope| {
        scope.spawn(|| {
            while !done.load(Ordering::Acquire) {
                callback(counter.load(Ordering::Relaxed));
                thread::sleep(PROGRESS_INTERVAL);
            }
        });
        let result = work();
        done.store(true, Ordering::Release);
        result
    });
    callback(counter.load(Ordering::Relaxed));
    result
}

/// Decodes a report from any reader. The first row must be the header.
pub fn deserialize_from_reader<R: Read>(input: R, options: &DecodeOptions<'_>) -> Result<DecodeOutcome> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .flexible(true)
        .from_reader(input);

    let rows: Vec<csv::Result<ReportRecord>> = reader.deserialize().collect();
    debug!("Read {} report rows", rows.len());

    let processed = AtomicUsize::new(0);
    let decode = |row: csv::Result<ReportRecord>| -> Result<Option<Failure>> {
        let result = row.map_err(PiiScanError::from).and_then(|r| decode_record(&r, options.part_filters));
        processed.fetch_add(1, Ordering::Relaxed);
        result
    };

    let results: Vec<Result<Option<Failure>>> = with_progress(&processed, options.on_progress, || {
        if options.parallel {
            rows.into_par_iter().map(decode).collect()
        } else {
            rows.into_iter().map(decode).collect()
        }
    });

    let mut outcome = DecodeOutcome {
        rows_processed: processed.load(Ordering::Relaxed),
        ..Default::default()
    };
    for result in results {
        match result {
            Ok(Some(failure)) => outcome.failures.push(failure),
            Ok(None) => {}
            Err(e) if options.stop_at_first_error => return Err(e),
            Err(e) => {
                warn!("Skipping report row: {}", e);
                outcome.problems += 1;
            }
        }
    }

    if outcome.problems > 0 {
        warn!("Problem with {}/{} records", outcome.problems, outcome.rows_processed);
    }
    Ok(outcome)
}

/// Decodes the report file at `path`.
pub fn deserialize_failures(path: &Path, options: &DecodeOptions<'_>) -> Result<DecodeOutcome> {
    let file = File::open(path)
        .map_err(|e| PiiScanError::config(format!("Could not open failures file {}: {}", path.display(), e)))?;
    let outcome = deserialize_from_reader(file, options)?;
    info!(
        "Loaded {} failures from {} ({} rows)",
        outcome.failures.len(),
        path.display(),
        outcome.rows_processed
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::Classification;

    fn record(value: Option<&str>, words: &str, classes: &str, offsets: &str) -> ReportRecord {
        ReportRecord {
            resource: "People".into(),
            resource_primary_key: "".into(),
            problem_field: "Notes".into(),
            problem_value: value.map(str::to_string),
            part_words: words.into(),
            part_classifications: classes.into(),
            part_offsets: offsets.into(),
        }
    }

    #[test]
    fn test_null_value_is_an_error() {
        let err = decode_record(&record(None, "x", "Person", "0"), &[]).unwrap_err();
        assert!(matches!(err, PiiScanError::Decode { .. }));
    }

    #[test]
    fn test_mismatched_part_lists_are_an_error() {
        let r = record(Some("Smith Jones"), "Smith###Jones", "Person", "0###6");
        assert!(matches!(decode_record(&r, &[]), Err(PiiScanError::Decode { .. })));
    }

    #[test]
    fn test_empty_primary_key_becomes_none() {
        let f = decode_record(&record(Some("Smith"), "Smith", "person", "0"), &[]).unwrap().unwrap();
        assert_eq!(f.resource_primary_key, None);
        assert_eq!(f.parts, vec![FailurePart::new("Smith", Classification::Person, 0)]);
    }

    #[test]
    fn test_pixel_data_skips_repair() {
        let mut r = record(Some("scanned text"), "SMITH", "PixelText", "40");
        r.problem_field = PIXEL_DATA_FIELD.into();
        let f = decode_record(&r, &[]).unwrap().unwrap();
        assert_eq!(f.parts[0].offset, 40);
    }

    #[test]
    fn test_filtered_failure_is_dropped() {
        let filters = [PartPatternFilterRule::for_part_pattern("^Smith$")];
        let r = record(Some("Smith"), "Smith", "Person", "0");
        assert_eq!(decode_record(&r, &filters).unwrap(), None);
        assert_eq!(filters[0].used(), 1);
    }
}

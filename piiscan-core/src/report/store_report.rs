// piiscan-core/src/report/store_report.rs
//! Buffered writer that fans failures out to one or more report destinations.
//!
//! License: MIT OR APACHE 2.0

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use log::{debug, info};

use crate::config::ScannerOptions;
use crate::errors::{PiiScanError, Result};
use crate::failure::Failure;
use crate::report::destination::{CsvDestination, ReportDestination};
use crate::report::{ReportRecord, HEADERS};

#[derive(Default)]
struct ReportState {
    pending: Vec<ReportRecord>,
    destinations: Vec<Box<dyn ReportDestination>>,
    done_rows: usize,
    written_rows: usize,
}

impl ReportState {
    fn flush_pending(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        for destination in self.destinations.iter_mut() {
            destination.write_items(&self.pending)?;
        }
        self.written_rows += self.pending.len();
        debug!("Flushed {} report rows", self.pending.len());
        self.pending.clear();
        Ok(())
    }
}

/// Collects failures and writes them in batches of `max_size` rows.
///
/// Safe to share between threads; adds are serialized internally.
pub struct FailureStoreReport {
    state: Mutex<ReportState>,
    max_size: usize,
}

impl FailureStoreReport {
    pub fn new(max_size: usize) -> Self {
        Self {
            state: Mutex::new(ReportState::default()),
            max_size: max_size.max(1),
        }
    }

    /// A report writing to a single CSV file, configured from `options`.
    pub fn from_options(options: &ScannerOptions, path: &Path) -> Result<Self> {
        let report = Self::new(options.max_cache_size);
        let destination = CsvDestination::create(
            path,
            &options.destination_csv_separator,
            options.strip_whitespace_on_write,
        )?;
        report.add_destination(Box::new(destination))?;
        info!("Writing failure report to {}", path.display());
        Ok(report)
    }

    fn lock(&self) -> Result<MutexGuard<'_, ReportState>> {
        self.state
            .lock()
            .map_err(|_| PiiScanError::config("failure report lock poisoned"))
    }

    /// Registers a destination and writes the header to it.
    pub fn add_destination(&self, mut destination: Box<dyn ReportDestination>) -> Result<()> {
        destination.write_header(&HEADERS)?;
        self.lock()?.destinations.push(destination);
        Ok(())
    }

    pub fn add(&self, failure: &Failure) -> Result<()> {
        let mut state = self.lock()?;
        state.pending.push(ReportRecord::from_failure(failure));
        state.done_rows += 1;
        if state.pending.len() >= self.max_size {
            state.flush_pending()?;
        }
        Ok(())
    }

    /// Failures added so far.
    pub fn done_rows(&self) -> usize {
        self.lock().map(|s| s.done_rows).unwrap_or_default()
    }

    /// Writes anything still buffered and flushes every destination.
    pub fn close_report(&self) -> Result<()> {
        let mut state = self.lock()?;
        state.flush_pending()?;
        for destination in state.destinations.iter_mut() {
            destination.flush()?;
        }
        info!("Failure report closed after {} rows", state.written_rows);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::failure::{Classification, FailurePart};

    /// Records what it was asked to write.
    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl ReportDestination for Recorder {
        fn write_header(&mut self, headers: &[&str]) -> Result<()> {
            self.0.lock().unwrap().push(format!("header:{}", headers.len()));
            Ok(())
        }

        fn write_items(&mut self, rows: &[ReportRecord]) -> Result<()> {
            self.0.lock().unwrap().push(format!("batch:{}", rows.len()));
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            self.0.lock().unwrap().push("flush".into());
            Ok(())
        }
    }

    fn failure() -> Failure {
        Failure::new(
            "People",
            None,
            "Name",
            "Smith",
            vec![FailurePart::new("Smith", Classification::Person, 0)],
        )
        .unwrap()
    }

    #[test]
    fn test_batches_flush_at_max_size() {
        let recorder = Recorder::default();
        let report = FailureStoreReport::new(2);
        report.add_destination(Box::new(recorder.clone())).unwrap();
        for _ in 0..5 {
            report.add(&failure()).unwrap();
        }
        report.close_report().unwrap();

        assert_eq!(report.done_rows(), 5);
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec!["header:7", "batch:2", "batch:2", "batch:1", "flush"]
        );
    }

    #[test]
    fn test_close_without_rows_only_flushes() {
        let recorder = Recorder::default();
        let report = FailureStoreReport::new(10);
        report.add_destination(Box::new(recorder.clone())).unwrap();
        report.close_report().unwrap();
        assert_eq!(*recorder.0.lock().unwrap(), vec!["header:7", "flush"]);
    }
}

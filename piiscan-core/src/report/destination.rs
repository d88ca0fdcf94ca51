// piiscan-core/src/report/destination.rs
//! Output adapters for failure reports.
//!
//! License: MIT OR APACHE 2.0

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use csv::{QuoteStyle, WriterBuilder};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{PiiScanError, Result};
use crate::report::ReportRecord;

static WHITESPACE_RUNS: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"[\t\r\n]|[ ]{2,}").ok());

/// Removes tabs, line breaks and runs of two or more spaces.
pub fn strip_whitespace(value: &str) -> Cow<'_, str> {
    match WHITESPACE_RUNS.as_ref() {
        Some(re) => re.replace_all(value, ""),
        None => Cow::Borrowed(value),
    }
}

/// Turns a configured separator into a single delimiter byte.
///
/// `\t`, `\r` and `\n` escapes are expanded. A blank separator means comma.
pub fn expand_delimiter(separator: &str) -> Result<u8> {
    if separator.trim().is_empty() || separator.trim() == "," {
        return Ok(b',');
    }
    let expanded = separator.replace("\\t", "\t").replace("\\r", "\r").replace("\\n", "\n");
    match expanded.as_bytes() {
        [b] => Ok(*b),
        _ => Err(PiiScanError::InvalidDelimiter(separator.to_string())),
    }
}

/// Somewhere report rows can be written.
pub trait ReportDestination: Send {
    /// Writes the column names. Only the first call has any effect.
    fn write_header(&mut self, headers: &[&str]) -> Result<()>;

    fn write_items(&mut self, rows: &[ReportRecord]) -> Result<()>;

    fn flush(&mut self) -> Result<()>;
}

/// Writes report rows as delimited text.
///
/// A delimiter other than comma turns quoting off, so values must not contain it.
pub struct CsvDestination<W: Write> {
    writer: csv::Writer<W>,
    header_written: bool,
    strip_whitespace: bool,
}

impl CsvDestination<File> {
    /// Creates (or truncates) the file at `path`.
    pub fn create(path: &Path, separator: &str, strip_whitespace: bool) -> Result<Self> {
        let file = File::create(path)?;
        Self::from_writer(file, separator, strip_whitespace)
    }
}

impl<W: Write> CsvDestination<W> {
    pub fn from_writer(writer: W, separator: &str, strip_whitespace: bool) -> Result<Self> {
        let delimiter = expand_delimiter(separator)?;
        let quote_style = if delimiter == b',' {
            QuoteStyle::Necessary
        } else {
            QuoteStyle::Never
        };
        let writer = WriterBuilder::new()
            .delimiter(delimiter)
            .quote_style(quote_style)
            .has_headers(false)
            .from_writer(writer);
        Ok(Self {
            writer,
            header_written: false,
            strip_whitespace,
        })
    }

    fn write_row<'a>(&mut self, cells: impl IntoIterator<Item = &'a str>) -> Result<()> {
        let strip = self.strip_whitespace;
        let cells: Vec<Cow<'a, str>> = cells
            .into_iter()
            .map(|c| if strip { strip_whitespace(c) } else { Cow::Borrowed(c) })
            .collect();
        self.writer.write_record(cells.iter().map(|c| c.as_bytes()))?;
        Ok(())
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| PiiScanError::IoError(io::Error::new(e.error().kind(), e.error().to_string())))
    }
}

impl<W: Write + Send> ReportDestination for CsvDestination<W> {
    fn write_header(&mut self, headers: &[&str]) -> Result<()> {
        if self.header_written {
            return Ok(());
        }
        self.header_written = true;
        self.write_row(headers.iter().copied())
    }

    fn write_items(&mut self, rows: &[ReportRecord]) -> Result<()> {
        if !self.header_written {
            self.write_header(&crate::report::HEADERS)?;
        }
        for row in rows {
            self.write_row(row.fields())?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::HEADERS;

    fn record(value: &str) -> ReportRecord {
        ReportRecord {
            resource: "People".into(),
            resource_primary_key: "1".into(),
            problem_field: "Notes".into(),
            problem_value: Some(value.into()),
            part_words: "Smith".into(),
            part_classifications: "Person".into(),
            part_offsets: "0".into(),
        }
    }

    fn written(dest: CsvDestination<Vec<u8>>) -> String {
        String::from_utf8(dest.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_delimiter_expansion() {
        assert_eq!(expand_delimiter("").unwrap(), b',');
        assert_eq!(expand_delimiter(" , ").unwrap(), b',');
        assert_eq!(expand_delimiter("\\t").unwrap(), b'\t');
        assert_eq!(expand_delimiter("|").unwrap(), b'|');
        assert!(matches!(expand_delimiter("||"), Err(PiiScanError::InvalidDelimiter(_))));
    }

    #[test]
    fn test_header_is_written_once() {
        let mut dest = CsvDestination::from_writer(Vec::new(), ",", false).unwrap();
        dest.write_header(&HEADERS).unwrap();
        dest.write_header(&HEADERS).unwrap();
        dest.write_items(&[record("Smith, John")]).unwrap();
        let text = written(dest);
        assert_eq!(text.matches("Resource,").count(), 1);
        assert!(text.contains("\"Smith, John\""));
    }

    #[test]
    fn test_non_comma_delimiter_disables_quoting() {
        let mut dest = CsvDestination::from_writer(Vec::new(), "\\t", false).unwrap();
        dest.write_items(&[record("Smith, \"John\"")]).unwrap();
        let text = written(dest);
        assert!(text.starts_with("Resource\tResourcePrimaryKey\t"));
        assert!(text.contains("\tSmith, \"John\"\t"));
    }

    #[test]
    fn test_strip_whitespace_on_write() {
        let mut dest = CsvDestination::from_writer(Vec::new(), ",", true).unwrap();
        dest.write_items(&[record("Smith\r\nlives  here\t")]).unwrap();
        let text = written(dest);
        assert!(text.contains(",Smithliveshere,"));
    }
}

// piiscan-core/src/report/mod.rs
//! The failure report: a flat CSV table that stores [`Failure`]s losslessly so that
//! they can be reloaded later, e.g. for review.
//!
//! Each row holds one failure. The per-part columns (`PartWords`,
//! `PartClassifications`, `PartOffsets`) are parallel lists joined with `###`.
//!
//! License: MIT OR APACHE 2.0

pub mod decode;
pub mod destination;
pub mod filter;
pub mod reader;
pub mod repair;
pub mod store_report;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::failure::{Failure, FailurePart};

pub use decode::{deserialize_failures, deserialize_from_reader, DecodeOptions, DecodeOutcome};
pub use destination::{expand_delimiter, CsvDestination, ReportDestination};
pub use filter::PartPatternFilterRule;
pub use reader::ReportReader;
pub use repair::{html_encode, repair_part};
pub use store_report::FailureStoreReport;

/// Column names, in order.
pub const HEADERS: [&str; 7] = [
    "Resource",
    "ResourcePrimaryKey",
    "ProblemField",
    "ProblemValue",
    "PartWords",
    "PartClassifications",
    "PartOffsets",
];

/// Joins the per-part values inside a single cell.
pub const SEPARATOR: &str = "###";

/// Field name whose values come from OCR and carry no reliable offsets.
pub const PIXEL_DATA_FIELD: &str = "PixelData";

fn join_parts(failure: &Failure, cell: impl Fn(&FailurePart) -> String) -> String {
    failure.parts.iter().map(cell).collect::<Vec<_>>().join(SEPARATOR)
}

/// One report row as it appears on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReportRecord {
    pub resource: String,
    #[serde(default)]
    pub resource_primary_key: String,
    pub problem_field: String,
    #[serde(default)]
    pub problem_value: Option<String>,
    pub part_words: String,
    pub part_classifications: String,
    pub part_offsets: String,
}

impl ReportRecord {
    pub fn from_failure(failure: &Failure) -> Self {
        Self {
            resource: failure.resource.clone(),
            resource_primary_key: failure.resource_primary_key.clone().unwrap_or_default(),
            problem_field: failure.problem_field.clone(),
            problem_value: Some(failure.problem_value.clone()),
            part_words: join_parts(failure, |p| p.word.clone()),
            part_classifications: join_parts(failure, |p| p.classification.to_string()),
            part_offsets: join_parts(failure, |p| p.offset.to_string()),
        }
    }

    /// The cells in [`HEADERS`] order.
    pub fn fields(&self) -> [&str; 7] {
        [
            self.resource.as_str(),
            self.resource_primary_key.as_str(),
            self.problem_field.as_str(),
            self.problem_value.as_deref().unwrap_or_default(),
            self.part_words.as_str(),
            self.part_classifications.as_str(),
            self.part_offsets.as_str(),
        ]
    }
}

impl fmt::Display for ReportRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failure({})", self.fields().join("|"))
    }
}

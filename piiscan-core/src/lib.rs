// piiscan-core/src/lib.rs
//! # piiscan Core Library
//!
//! `piiscan-core` decides whether individual field values contain personally identifiable
//! information, keeps the human-curated rules that refine those decisions, and stores the
//! findings in a report that can be read back for review.
//!
//! The library does not know where values come from. Callers feed it `(field name, value)`
//! pairs and get back the identifiable fragments, if any.
//!
//! ## Modules
//!
//! * `failure`: `Failure` and `FailurePart`, the outcome of classifying one value.
//! * `rules`: rule variants (`RegexRule`, `AllowlistRule`, `ConsensusRule`, `SocketRule`) and rule files.
//! * `engine`: the `ClassificationEngine` trait.
//! * `engines`: the rule-driven engine and its built-in detectors.
//! * `generator`: derives `IfPattern` expressions from observed failures.
//! * `store`: the YAML-backed rule store with attribution and undo.
//! * `report`: the CSV failure report, its writer and its reader.
//! * `reviewer`: unattended review of a report against two rule stores.
//! * `allowlist`: exact-match allow lists.
//! * `config`: options shared by the engine and the report writer.
//! * `errors`: the `PiiScanError` type.
//!
//! ## Usage Example
//!
//! ```rust
//! use piiscan_core::{ClassificationEngine, Classification, RuleEngine, RuleSet};
//!
//! let engine = RuleEngine::new(RuleSet::default());
//! let parts = engine.validate("Notes", "Patient lives at DD3 7LB").unwrap();
//! assert_eq!(parts.len(), 1);
//! assert_eq!(parts[0].classification, Classification::Postcode);
//! assert_eq!(parts[0].offset, 17);
//! ```
//!
//! ## Error Handling
//!
//! Fallible operations return [`errors::Result`], whose error type is [`PiiScanError`].
//!
//! ---
//! License: MIT OR APACHE 2.0

pub mod allowlist;
pub mod config;
pub mod engine;
pub mod engines;
pub mod errors;
pub mod failure;
pub mod generator;
pub mod report;
pub mod reviewer;
pub mod rules;
pub mod store;

/// Re-exports the data model.
pub use failure::{Classification, Failure, FailurePart};

/// Re-exports the error type.
pub use errors::PiiScanError;

/// Re-exports the classification engine trait and its implementation.
pub use engine::{ClassificationEngine, ValidationStats};
pub use engines::rule_engine::RuleEngine;

/// Re-exports rule types.
pub use rules::{
    AllowlistRule, AppliableRule, ConsensusRule, RegexRule, Rule, RuleAction, RuleSet, RuleSource, SocketRule,
};

pub use allowlist::{load_allow_list, AllowListSource, CsvAllowList, StaticAllowList};
pub use config::ScannerOptions;
pub use generator::{PatternStrategy, RegexRuleGenerator, SymbolsRuleMode};
pub use report::{
    CsvDestination, DecodeOptions, FailureStoreReport, PartPatternFilterRule, ReportDestination, ReportReader,
};
pub use reviewer::{ReviewSummary, UnattendedReviewer};
pub use store::{Clock, FixedClock, RuleStore, SystemClock};

// piiscan-core/src/engines/mod.rs
//! Classification engine implementations.
//!
//! Each engine implements the `ClassificationEngine` trait. The built-in
//! detectors live alongside them so that any engine can reuse them.
//!
//! License: MIT OR APACHE 2.0

pub mod detectors;
pub mod rule_engine;

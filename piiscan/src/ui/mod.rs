// piiscan/src/ui/mod.rs
//! Terminal output: status messages and summary tables.

pub mod output_format;
pub mod summary;

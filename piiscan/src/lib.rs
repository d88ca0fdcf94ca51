// piiscan/src/lib.rs
//! # piiscan CLI Application
//!
//! Command-line front end for `piiscan-core`: scan CSV files for identifiable data,
//! review failure reports against rule stores and turn findings into rules.

pub mod cli;
pub mod commands;
pub mod logger;
pub mod ui;

// piiscan/src/commands/mod.rs
//! Implementations of the CLI subcommands.

pub mod review;
pub mod rules;
pub mod scan;

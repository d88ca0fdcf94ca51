// piiscan/src/logger.rs
//! Logger setup for the CLI.

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Initialises `env_logger`.
///
/// `level` overrides `RUST_LOG` when given; otherwise `RUST_LOG` decides and
/// warnings are shown by default. Safe to call more than once.
pub fn init_logger(level: Option<LevelFilter>) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("warn"));
    if let Some(level) = level {
        builder.filter_level(level);
    }
    builder.format_timestamp(None).target(env_logger::Target::Stderr);
    let _ = builder.try_init();
}

/// The level implied by `--quiet` / `--debug`. Quiet wins.
pub fn level_from_flags(quiet: bool, debug: bool) -> Option<LevelFilter> {
    if quiet {
        Some(LevelFilter::Error)
    } else if debug {
        Some(LevelFilter::Debug)
    } else {
        None
    }
}

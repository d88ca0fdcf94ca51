// piiscan/src/main.rs
//! piiscan entry point.
//!
//! Parses the command line, sets up logging and dispatches to the subcommand.

use anyhow::Result;
use clap::Parser;

use piiscan::cli::{Cli, Commands, RulesCommand};
use piiscan::commands::{review, rules, scan};
use piiscan::logger;

fn main() -> Result<()> {
    let args = Cli::parse();
    logger::init_logger(logger::level_from_flags(args.quiet, args.debug));

    match &args.command {
        Commands::Scan(cmd) => scan::run_scan(cmd, args.quiet),
        Commands::Review(cmd) => review::run_review(cmd, args.quiet),
        Commands::Rules(RulesCommand::Add(cmd)) => rules::run_rules_add(cmd, args.quiet),
        Commands::Rules(RulesCommand::Delete(cmd)) => rules::run_rules_delete(cmd, args.quiet),
    }
}

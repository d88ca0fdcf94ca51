// piiscan/src/ui/output_format.rs
//! Coloured status messages on stderr.

use std::io::{self, Write};

use is_terminal::IsTerminal;
use owo_colors::{AnsiColors, OwoColorize};

fn print_message(writer: &mut dyn Write, prefix: &str, msg: &str, color: AnsiColors, use_color: bool) -> io::Result<()> {
    if use_color {
        writeln!(writer, "{} {}", prefix.color(color).bold(), msg)
    } else {
        writeln!(writer, "{} {}", prefix, msg)
    }
}

pub fn print_info_message(writer: &mut dyn Write, msg: &str, use_color: bool) -> io::Result<()> {
    print_message(writer, "[info]", msg, AnsiColors::Cyan, use_color)
}

pub fn print_success_message(writer: &mut dyn Write, msg: &str, use_color: bool) -> io::Result<()> {
    print_message(writer, "[ok]", msg, AnsiColors::Green, use_color)
}

pub fn print_warn_message(writer: &mut dyn Write, msg: &str, use_color: bool) -> io::Result<()> {
    print_message(writer, "[warn]", msg, AnsiColors::Yellow, use_color)
}

/// Helper for printing info messages to stderr.
pub fn info_msg(msg: impl AsRef<str>) {
    let use_color = io::stderr().is_terminal();
    let _ = print_info_message(&mut io::stderr(), msg.as_ref(), use_color);
}

/// Helper for printing success messages to stderr.
pub fn success_msg(msg: impl AsRef<str>) {
    let use_color = io::stderr().is_terminal();
    let _ = print_success_message(&mut io::stderr(), msg.as_ref(), use_color);
}

/// Helper for printing warning messages to stderr.
pub fn warn_msg(msg: impl AsRef<str>) {
    let use_color = io::stderr().is_terminal();
    let _ = print_warn_message(&mut io::stderr(), msg.as_ref(), use_color);
}

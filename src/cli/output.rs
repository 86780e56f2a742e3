//! Handles all user-facing output for the CLI.
//!
//! Colored text goes through `termcolor` so it degrades to plain text when
//! the stream is not a terminal. Generated code is always written uncolored
//! to stdout so it can be redirected.

use std::io::Write;

use difference::{Changeset, Difference};
use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::errors::GenerationWarning;
use crate::source::SourceUnit;

// ============================================================================
// DIAGNOSTICS
// ============================================================================

/// Prints non-fatal warnings to stderr.
pub fn print_warnings(warnings: &[GenerationWarning]) {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    for warning in warnings {
        let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true));
        let _ = write!(stderr, "warning");
        let _ = stderr.reset();
        let _ = writeln!(stderr, ": {}", warning);
    }
}

/// Prints a one-line status message to stderr.
pub fn print_status(message: &str, ok: bool) {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    let color = if ok { Color::Green } else { Color::Red };
    let _ = stderr.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    let _ = writeln!(stderr, "{}", message);
    let _ = stderr.reset();
}

/// Prints a line diff from `old` to `new` with colored additions and removals.
pub fn print_diff(old: &str, new: &str) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let changeset = Changeset::new(old, new, "\n");
    for diff in &changeset.diffs {
        let (marker, color, text) = match diff {
            Difference::Same(x) => (' ', None, x),
            Difference::Add(x) => ('+', Some(Color::Green), x),
            Difference::Rem(x) => ('-', Some(Color::Red), x),
        };
        let _ = stdout.set_color(ColorSpec::new().set_fg(color));
        for line in text.split('\n') {
            let _ = writeln!(stdout, "{}{}", marker, line);
        }
    }
    let _ = stdout.reset();
}

// ============================================================================
// REPORTS
// ============================================================================

/// Lists every class, method and case with its canonical notation.
pub fn print_inspection(units: &[SourceUnit]) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    for unit in units {
        let _ = stdout.set_color(ColorSpec::new().set_bold(true));
        let _ = writeln!(
            stdout,
            "{} (line {}, {} cases)",
            unit.qualified_name,
            unit.line,
            unit.case_count()
        );
        let _ = stdout.reset();
        for method in &unit.methods {
            let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)));
            let _ = writeln!(stdout, "  {}", method.name);
            let _ = stdout.reset();
            for case in &method.cases {
                let marker = if case.is_incomplete() { '~' } else { ' ' };
                let _ = writeln!(
                    stdout,
                    "   {} {:>4}: {}",
                    marker,
                    case.source_line,
                    case.render_line()
                );
            }
        }
    }
}

/// One row of the `scan` report.
pub fn print_scan_row(path: &str, classes: usize, cases: usize) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let color = if cases > 0 { Color::Green } else { Color::White };
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(color)));
    let _ = write!(stdout, "{:>5} cases", cases);
    let _ = stdout.reset();
    let _ = writeln!(stdout, "  {:>3} classes  {}", classes, path);
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    println!("{}", text);
    Ok(())
}

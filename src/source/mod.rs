//! Python source handling.
//!
//! The generator never evaluates Python. It tokenizes the file, rebuilds the
//! block structure from indentation, and reads the docstrings attached to
//! methods. That is enough to locate test-case notation and to reject files
//! Python itself would refuse to compile for structural reasons.

use serde::Serialize;

use crate::dsl::TestCase;

pub mod extract;
pub mod lexer;
pub mod outline;

pub use extract::{extract_units, ExtractedSource};

/// Byte range within the source text.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn point(at: usize) -> Self {
        Self { start: at, end: at }
    }
}

/// A class with at least one documented test case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceUnit {
    pub name: String,
    /// Dotted path from module scope, e.g. `Outer.Inner`.
    pub qualified_name: String,
    pub line: usize,
    pub methods: Vec<MethodRecord>,
}

impl SourceUnit {
    /// Top-level name that must be imported to reach this class.
    pub fn import_name(&self) -> &str {
        self.qualified_name
            .split('.')
            .next()
            .unwrap_or(&self.qualified_name)
    }

    pub fn case_count(&self) -> usize {
        self.methods.iter().map(|m| m.cases.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodRecord {
    pub name: String,
    /// Docstring text, cleaned the way `inspect.cleandoc` does it.
    pub doc: String,
    pub line: usize,
    pub cases: Vec<TestCase>,
}

/// One physical line of a docstring, with its absolute line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocLine {
    pub line: usize,
    pub text: String,
}

/// Normalizes line endings and drops a leading byte-order mark.
pub fn normalize_source(text: &str) -> String {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Mirrors `inspect.cleandoc`: strip the common margin of every line after
/// the first, then trim leading and trailing blank lines.
pub fn clean_docstring(raw: &str) -> String {
    let expanded: Vec<String> = raw.split('\n').map(expand_tabs).collect();
    let margin = expanded
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut lines: Vec<&str> = Vec::with_capacity(expanded.len());
    for (i, line) in expanded.iter().enumerate() {
        if i == 0 {
            lines.push(line.trim_start());
        } else {
            lines.push(line.get(margin..).unwrap_or_else(|| line.trim_start()));
        }
    }

    while lines.first().is_some_and(|l| l.trim().is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

fn expand_tabs(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    for ch in line.chars() {
        if ch == '\t' {
            let pad = 8 - (out.chars().count() % 8);
            out.extend(std::iter::repeat(' ').take(pad));
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleandoc_strips_margin_and_blank_edges() {
        let raw = "\n        Add two numbers.\n\n        (1, 2) -> 3\n        ";
        assert_eq!(clean_docstring(raw), "Add two numbers.\n\n(1, 2) -> 3");
    }

    #[test]
    fn cleandoc_keeps_relative_indentation() {
        let raw = "Summary.\n    first\n      nested";
        assert_eq!(clean_docstring(raw), "Summary.\nfirst\n  nested");
    }

    #[test]
    fn normalize_handles_crlf_and_bom() {
        assert_eq!(normalize_source("\u{feff}a\r\nb\rc"), "a\nb\nc");
    }
}

//! Testgen Error Handling
//!
//! Fatal conditions are represented by a single [`TestgenError`] carrying its
//! kind, the source it points into, and diagnostic metadata for `miette`.
//! Non-fatal conditions never become errors; they are collected as
//! [`GenerationWarning`] values alongside the generated output.

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceSpan};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::source::Span;

// ============================================================================
// SOURCE CONTEXT - Error reporting infrastructure
// ============================================================================

/// Source text an error can point into.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    /// Create a source context from real file content
    pub fn from_file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Create a fallback when no source text is involved (missing files, I/O).
    pub fn fallback(context: &str) -> Self {
        Self {
            name: "fallback".to_string(),
            content: format!("# {}", context),
        }
    }

    /// Convert to NamedSource for use with miette error reporting
    pub fn to_named_source(&self) -> Arc<NamedSource<String>> {
        Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))
    }
}

impl Default for SourceContext {
    fn default() -> Self {
        Self::fallback("default context")
    }
}

/// The single fatal error type.
#[derive(Debug)]
pub struct TestgenError {
    /// What went wrong
    pub kind: ErrorKind,
    /// Where it happened
    pub source_info: SourceInfo,
    /// How to help
    pub diagnostic_info: DiagnosticInfo,
}

/// Every fatal condition the generator can hit.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    // Input errors
    SourceNotFound { path: String },
    SourceSyntax { message: String },

    // Content errors
    NoMatchingClass { class: String, source: String },
    NoQualifyingContent { source: String },

    // Environment errors
    Io { operation: String, path: String, reason: String },
    InvalidConfig { path: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub source: Arc<NamedSource<String>>,
    pub primary_span: SourceSpan,
    pub phase: String,
}

#[derive(Debug, Clone)]
pub struct DiagnosticInfo {
    pub help: Option<String>,
    pub error_code: String,
}

/// Context-aware error creation. Each pipeline stage knows its own phase and source.
pub trait ErrorReporting {
    fn report(&self, kind: ErrorKind, span: SourceSpan) -> TestgenError;

    fn syntax_error(&self, message: &str, span: Span) -> TestgenError {
        self.report(
            ErrorKind::SourceSyntax {
                message: message.into(),
            },
            to_source_span(span),
        )
    }
}

impl ErrorKind {
    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::SourceNotFound { .. } => "source_not_found",
            Self::SourceSyntax { .. } => "source_syntax",
            Self::NoMatchingClass { .. } => "no_matching_class",
            Self::NoQualifyingContent { .. } => "no_qualifying_content",
            Self::Io { .. } => "io",
            Self::InvalidConfig { .. } => "invalid_config",
        }
    }

    fn default_help(&self) -> Option<String> {
        match self {
            Self::NoMatchingClass { .. } => {
                Some("class filters match the exact class name, e.g. `--class Calculator`".into())
            }
            Self::NoQualifyingContent { .. } => Some(
                "document a method with lines such as `(1, 2) -> 3` inside its docstring".into(),
            ),
            _ => None,
        }
    }
}

impl std::error::Error for TestgenError {}

impl fmt::Display for TestgenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::SourceNotFound { path } => {
                write!(f, "Source file not found: {}", path)
            }
            ErrorKind::SourceSyntax { message } => {
                write!(f, "Syntax error in source: {}", message)
            }
            ErrorKind::NoMatchingClass { class, source } => {
                write!(f, "Class '{}' not found in {}", class, source)
            }
            ErrorKind::NoQualifyingContent { source } => {
                write!(f, "No documented test cases found in {}", source)
            }
            ErrorKind::Io {
                operation,
                path,
                reason,
            } => {
                write!(f, "Failed to {} '{}': {}", operation, path, reason)
            }
            ErrorKind::InvalidConfig { path, reason } => {
                write!(f, "Invalid configuration in '{}': {}", path, reason)
            }
        }
    }
}

impl Diagnostic for TestgenError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(&self.diagnostic_info.error_code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diagnostic_info
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        if !matches!(self.kind, ErrorKind::SourceSyntax { .. }) {
            return None;
        }
        let labels = vec![LabeledSpan::new_with_span(
            Some(self.primary_label()),
            self.source_info.primary_span,
        )];
        Some(Box::new(labels.into_iter()))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&*self.source_info.source)
    }
}

impl TestgenError {
    fn primary_label(&self) -> String {
        match &self.kind {
            ErrorKind::SourceSyntax { message } => message.clone(),
            _ => String::new(),
        }
    }
}

/// Creates a placeholder span for errors not tied to a source location.
pub fn unspanned() -> SourceSpan {
    SourceSpan::from(0..0)
}

/// Converts a source [`Span`] to a miette SourceSpan.
pub fn to_source_span(span: Span) -> SourceSpan {
    SourceSpan::from(span.start..span.end)
}

/// General-purpose error creation context keyed by pipeline phase.
pub struct PhaseContext {
    pub source: SourceContext,
    pub phase: String,
}

impl PhaseContext {
    pub fn new(source: SourceContext, phase: impl Into<String>) -> Self {
        Self {
            source,
            phase: phase.into(),
        }
    }

    /// Context for failures that happen before any source text is available.
    pub fn detached(phase: impl Into<String>) -> Self {
        let phase = phase.into();
        Self {
            source: SourceContext::fallback(&phase),
            phase,
        }
    }
}

impl ErrorReporting for PhaseContext {
    fn report(&self, kind: ErrorKind, span: SourceSpan) -> TestgenError {
        let error_code = format!("testgen::{}::{}", self.phase, kind.code_suffix());
        let help = kind.default_help();

        TestgenError {
            kind,
            source_info: SourceInfo {
                source: self.source.to_named_source(),
                primary_span: span,
                phase: self.phase.clone(),
            },
            diagnostic_info: DiagnosticInfo { help, error_code },
        }
    }
}

// ============================================================================
// NON-FATAL WARNINGS
// ============================================================================

/// A condition that degrades one test case or line without stopping generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationWarning {
    pub kind: WarningKind,
    /// Absolute 1-based line in the source file.
    pub line: usize,
    pub class: String,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningKind {
    /// Looked like a test case but matched neither grammar form.
    MalformedDslLine { text: String, reason: String },
    /// A token could not be read as a literal; the case is emitted incomplete.
    DeferredValue { field: String, text: String },
    /// A `&&` segment without `=`.
    IgnoredCheck { text: String },
    /// An `@` clause without `=`; the case is kept without it.
    IgnoredInit { text: String },
}

impl fmt::Display for GenerationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} (line {}): ", self.class, self.method, self.line)?;
        match &self.kind {
            WarningKind::MalformedDslLine { text, reason } => {
                write!(f, "skipped malformed test case `{}`: {}", text, reason)
            }
            WarningKind::DeferredValue { field, text } => {
                write!(f, "{} `{}` is not a literal; complete it manually", field, text)
            }
            WarningKind::IgnoredCheck { text } => {
                write!(f, "state check `{}` has no `=` and was ignored", text)
            }
            WarningKind::IgnoredInit { text } => {
                write!(f, "initialization `@{}` has no `=` and was ignored", text)
            }
        }
    }
}

// ============================================================================
// ERROR FORMATTING UTILITIES
// ============================================================================

/// Prints a TestgenError with full miette diagnostics.
pub fn print_error(error: TestgenError) {
    use miette::Report;
    let report = Report::new(error);
    eprintln!("{report:?}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_include_phase_and_kind() {
        let ctx = PhaseContext::detached("pipeline");
        let err = ctx.report(
            ErrorKind::NoMatchingClass {
                class: "Missing".into(),
                source: "calc.py".into(),
            },
            unspanned(),
        );
        assert_eq!(
            err.diagnostic_info.error_code,
            "testgen::pipeline::no_matching_class"
        );
        assert!(err.diagnostic_info.help.is_some());
        assert_eq!(err.to_string(), "Class 'Missing' not found in calc.py");
    }

    #[test]
    fn syntax_errors_carry_a_label() {
        let ctx = PhaseContext::new(SourceContext::from_file("a.py", "class (:\n"), "source");
        let err = ctx.syntax_error("expected class name", Span { start: 6, end: 7 });
        let labels: Vec<_> = err.labels().expect("labels").collect();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].offset(), 6);
    }
}

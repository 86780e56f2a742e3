//! Test-case notation embedded in docstrings.
//!
//! A docstring line such as
//!
//! ```text
//! (5) -> (5 && value=5 && len(history)=1) @value=0 @history=[]
//! ```
//!
//! describes one call: the inputs, the expected return value, optional
//! checks on the instance afterwards, and attribute overrides applied before
//! the call. Lines that match neither form are documentation and are skipped.

use std::fmt::Write;

use serde::Serialize;
use tracing::{debug, trace};

use crate::errors::WarningKind;
use crate::source::DocLine;
use crate::value::{resolve, resolve_arguments, Arguments, Value};

pub mod parser;
pub mod token;

pub use parser::{parse_line, LineParse, LineParts, Unmatched};

// ============================================================================
// TEST CASE MODEL
// ============================================================================

/// Which form of the notation produced a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineForm {
    Compound,
    Simple,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Binding {
    pub target: String,
    pub value: Value,
}

/// Insertion-ordered bindings with dict semantics: assigning an existing
/// target replaces its value in place.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Bindings(Vec<Binding>);

impl Bindings {
    pub fn insert(&mut self, target: impl Into<String>, value: Value) {
        let target = target.into();
        match self.0.iter_mut().find(|b| b.target == target) {
            Some(existing) => existing.value = value,
            None => self.0.push(Binding { target, value }),
        }
    }

    pub fn get(&self, target: &str) -> Option<&Value> {
        self.0.iter().find(|b| b.target == target).map(|b| &b.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Bindings {
    type Item = &'a Binding;
    type IntoIter = std::slice::Iter<'a, Binding>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// One parsed test-case line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestCase {
    pub inputs: Arguments,
    pub expected: Value,
    pub state_checks: Bindings,
    pub init_overrides: Bindings,
    /// Absolute line in the source file.
    pub source_line: usize,
    pub raw_text: String,
    pub form: LineForm,
}

impl TestCase {
    /// Builds a case from a matched line, resolving every value token.
    pub fn from_parts(parts: &LineParts<'_>, form: LineForm, raw_text: &str, line: usize) -> Self {
        let mut state_checks = Bindings::default();
        for check in &parts.checks {
            state_checks.insert(check.target, resolve(check.value));
        }
        let mut init_overrides = Bindings::default();
        for init in &parts.inits {
            init_overrides.insert(init.target, resolve(init.value));
        }
        Self {
            inputs: resolve_arguments(parts.inputs),
            expected: resolve(parts.result),
            state_checks,
            init_overrides,
            source_line: line,
            raw_text: raw_text.to_string(),
            form,
        }
    }

    /// True when any part of the case could not be resolved to a literal.
    pub fn is_incomplete(&self) -> bool {
        self.inputs.is_deferred()
            || self.expected.is_deferred()
            || self.state_checks.iter().any(|b| b.value.is_deferred())
            || self.init_overrides.iter().any(|b| b.value.is_deferred())
    }

    /// Canonical notation for this case. Parsing it yields the same inputs,
    /// expected value, checks and overrides.
    pub fn render_line(&self) -> String {
        let mut out = format!("{} -> ", self.inputs);
        let expected = self.expected.to_string();
        if self.state_checks.is_empty() && !needs_group(&expected) {
            out.push_str(&expected);
        } else {
            out.push('(');
            out.push_str(&expected);
            for check in &self.state_checks {
                let _ = write!(out, " && {}={}", check.target, check.value);
            }
            out.push(')');
        }
        for init in &self.init_overrides {
            let _ = write!(out, " @{}={}", init.target, init.value);
        }
        out
    }

    /// One entry per value that stayed deferred.
    fn deferred_fields(&self) -> Vec<WarningKind> {
        let mut fields = Vec::new();
        if let Arguments::Deferred(text) = &self.inputs {
            fields.push(deferred("inputs", text));
        }
        if let Value::Deferred(text) = &self.expected {
            fields.push(deferred("expected", text));
        }
        for check in &self.state_checks {
            if let Value::Deferred(text) = &check.value {
                fields.push(deferred(&format!("state check `{}`", check.target), text));
            }
        }
        for init in &self.init_overrides {
            if let Value::Deferred(text) = &init.value {
                fields.push(deferred(&format!("init override `{}`", init.target), text));
            }
        }
        fields
    }
}

fn deferred(field: &str, text: &str) -> WarningKind {
    WarningKind::DeferredValue {
        field: field.to_string(),
        text: text.to_string(),
    }
}

/// Whether a simple-form result would be misread, so it must be wrapped in a
/// compound group to round-trip.
fn needs_group(expected: &str) -> bool {
    expected.starts_with('(')
        || expected.contains('@')
        || expected.contains('#')
        || expected.contains("&&")
}

// ============================================================================
// DOCSTRING SCANNING
// ============================================================================

/// A non-fatal finding tied to a docstring line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineIssue {
    pub line: usize,
    pub kind: WarningKind,
}

/// Cases and issues found in one docstring.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocstringCases {
    pub cases: Vec<TestCase>,
    pub issues: Vec<LineIssue>,
}

/// Scans docstring lines in order. Each line yields at most one case.
pub fn parse_docstring(lines: &[DocLine]) -> DocstringCases {
    let mut found = DocstringCases::default();
    for doc_line in lines {
        let text = doc_line.text.trim();
        if text.is_empty() {
            continue;
        }
        let (parts, form) = match parse_line(text) {
            LineParse::Compound(parts) => (parts, LineForm::Compound),
            LineParse::Simple(parts) => (parts, LineForm::Simple),
            LineParse::Unmatched(reason) => {
                if !reason.is_prose() && text.contains("->") {
                    debug!(line = doc_line.line, %reason, "skipping malformed test case");
                    found.issues.push(LineIssue {
                        line: doc_line.line,
                        kind: WarningKind::MalformedDslLine {
                            text: text.to_string(),
                            reason: reason.to_string(),
                        },
                    });
                } else {
                    trace!(line = doc_line.line, "prose line");
                }
                continue;
            }
        };

        let case = TestCase::from_parts(&parts, form, text, doc_line.line);
        for ignored in &parts.ignored_checks {
            found.issues.push(LineIssue {
                line: doc_line.line,
                kind: WarningKind::IgnoredCheck {
                    text: ignored.to_string(),
                },
            });
        }
        for ignored in &parts.ignored_inits {
            found.issues.push(LineIssue {
                line: doc_line.line,
                kind: WarningKind::IgnoredInit {
                    text: ignored.to_string(),
                },
            });
        }
        for kind in case.deferred_fields() {
            found.issues.push(LineIssue {
                line: doc_line.line,
                kind,
            });
        }
        found.cases.push(case);
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Literal;

    fn doc(lines: &[&str]) -> Vec<DocLine> {
        lines
            .iter()
            .enumerate()
            .map(|(i, text)| DocLine {
                line: 10 + i,
                text: text.to_string(),
            })
            .collect()
    }

    fn single(line: &str) -> TestCase {
        let found = parse_docstring(&doc(&[line]));
        assert_eq!(found.cases.len(), 1, "no case parsed from {:?}", line);
        found.cases.into_iter().next().unwrap()
    }

    fn int(n: i128) -> Value {
        Value::Literal(Literal::Int(n))
    }

    #[test]
    fn zero_argument_case() {
        let case = single("() -> 3");
        assert_eq!(case.inputs, Arguments::Resolved(vec![]));
        assert_eq!(case.expected, int(3));
        assert_eq!(case.form, LineForm::Simple);
    }

    #[test]
    fn positional_arguments() {
        let case = single("(1, 2) -> 3");
        assert_eq!(
            case.inputs,
            Arguments::Resolved(vec![Literal::Int(1), Literal::Int(2)])
        );
        assert_eq!(case.expected, int(3));
    }

    #[test]
    fn single_string_argument() {
        let case = single(r#"("hello") -> "olleh""#);
        assert_eq!(
            case.inputs,
            Arguments::Resolved(vec![Literal::Str("hello".into())])
        );
        assert_eq!(case.expected, Value::Literal(Literal::Str("olleh".into())));
    }

    #[test]
    fn compound_case_with_state_and_init() {
        let case = single("(5) -> (5 && value=5 && len(history)=1) @value=0 @history=[]");
        assert_eq!(case.form, LineForm::Compound);
        assert_eq!(case.inputs, Arguments::Resolved(vec![Literal::Int(5)]));
        assert_eq!(case.expected, int(5));
        assert_eq!(case.state_checks.get("value"), Some(&int(5)));
        assert_eq!(case.state_checks.get("len(history)"), Some(&int(1)));
        assert_eq!(case.init_overrides.get("value"), Some(&int(0)));
        assert_eq!(
            case.init_overrides.get("history"),
            Some(&Value::Literal(Literal::List(vec![])))
        );
    }

    #[test]
    fn type_assertion() {
        assert_eq!(single("() -> type:dict").expected, Value::Type("dict".into()));
    }

    #[test]
    fn parenthesized_pair_is_a_tuple_result() {
        let case = single("() -> (1, 2)");
        assert_eq!(case.form, LineForm::Compound);
        assert_eq!(
            case.expected,
            Value::Literal(Literal::Tuple(vec![Literal::Int(1), Literal::Int(2)]))
        );
        assert!(!case.is_incomplete());

        let found = parse_docstring(&doc(&["(1,2) -> ('a', 'b') @pair=[1], 2"]));
        assert!(found.issues.is_empty(), "{:?}", found.issues);
        let case = &found.cases[0];
        assert_eq!(
            case.expected,
            Value::Literal(Literal::Tuple(vec![
                Literal::Str("a".into()),
                Literal::Str("b".into())
            ]))
        );
        assert_eq!(
            case.init_overrides.get("pair"),
            Some(&Value::Literal(Literal::Tuple(vec![
                Literal::List(vec![Literal::Int(1)]),
                Literal::Int(2)
            ])))
        );
    }

    #[test]
    fn repeated_targets_keep_first_position_and_last_value() {
        let case = single("() -> (1 && a=1 && b=2 && a=3)");
        let targets: Vec<_> = case.state_checks.iter().map(|b| b.target.as_str()).collect();
        assert_eq!(targets, vec!["a", "b"]);
        assert_eq!(case.state_checks.get("a"), Some(&int(3)));
    }

    #[test]
    fn prose_and_blank_lines_are_skipped_silently() {
        let found = parse_docstring(&doc(&[
            "Add a value to the running total.",
            "",
            "Args:",
            "    x (int): the value",
            "(1) -> 1",
        ]));
        assert_eq!(found.cases.len(), 1);
        assert_eq!(found.cases[0].source_line, 14);
        assert!(found.issues.is_empty());
    }

    #[test]
    fn malformed_attempts_are_reported_without_dropping_others() {
        let found = parse_docstring(&doc(&["(1 -> 2", "(2) -> 4"]));
        assert_eq!(found.cases.len(), 1);
        assert_eq!(found.issues.len(), 1);
        assert_eq!(found.issues[0].line, 10);
        assert!(matches!(
            found.issues[0].kind,
            WarningKind::MalformedDslLine { .. }
        ));
    }

    #[test]
    fn deferred_values_are_flagged() {
        let found = parse_docstring(&doc(&["(x) -> (self.total && total=x * 2)"]));
        let case = &found.cases[0];
        assert!(case.is_incomplete());
        assert_eq!(case.inputs, Arguments::Deferred("x".into()));
        let fields: Vec<_> = found
            .issues
            .iter()
            .map(|issue| match &issue.kind {
                WarningKind::DeferredValue { field, .. } => field.as_str(),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(fields, vec!["inputs", "expected", "state check `total`"]);
    }

    #[test]
    fn ignored_checks_are_flagged() {
        let found = parse_docstring(&doc(&["() -> (1 && ready)"]));
        assert_eq!(found.cases.len(), 1);
        assert_eq!(
            found.issues[0].kind,
            WarningKind::IgnoredCheck {
                text: "ready".into()
            }
        );
    }

    #[test]
    fn inits_without_equals_keep_the_case() {
        let found = parse_docstring(&doc(&["(1) -> 2 @flag"]));
        assert_eq!(found.cases.len(), 1);
        assert_eq!(found.cases[0].expected, int(2));
        assert!(found.cases[0].init_overrides.is_empty());
        assert_eq!(
            found.issues,
            vec![LineIssue {
                line: 10,
                kind: WarningKind::IgnoredInit {
                    text: "flag".into()
                },
            }]
        );
    }

    #[test]
    fn raw_text_is_the_trimmed_line() {
        assert_eq!(single("    (1) -> 2   ").raw_text, "(1) -> 2");
    }

    #[test]
    fn rendering_round_trips() {
        let lines = [
            "() -> 3",
            "(1, 2) -> 3",
            r#"("hello") -> "olleh""#,
            "(5) -> (5 && value=5 && len(history)=1) @value=0 @history=[]",
            "() -> type:dict",
            "() -> (1, 2)",
            "() -> ()",
            "(-1.5, 0x10) -> ((1,) && flag=True)",
            "() -> ((a && b))",
            "() -> (a # b)",
            "(x + 1) -> self.value @count=n",
            "({'a': (1, 2)}, b'\\x00') -> {1, 2}",
            "(1) -> ( && count=1)",
        ];
        for line in lines {
            let case = single(line);
            let rendered = case.render_line();
            let again = single(&rendered);
            assert_eq!(case.inputs, again.inputs, "{} => {}", line, rendered);
            assert_eq!(case.expected, again.expected, "{} => {}", line, rendered);
            assert_eq!(case.state_checks, again.state_checks, "{} => {}", line, rendered);
            assert_eq!(case.init_overrides, again.init_overrides, "{} => {}", line, rendered);
        }
    }

    #[test]
    fn renders_canonical_spacing() {
        let case = single("(5)->(5&&value=5)@value=0");
        assert_eq!(case.render_line(), "(5) -> (5 && value=5) @value=0");
    }
}

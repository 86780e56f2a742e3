//! Collects documented test cases per class.

use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::dsl::parse_docstring;
use crate::errors::{unspanned, ErrorKind, ErrorReporting, GenerationWarning, PhaseContext, TestgenError};
use crate::source::lexer::{tokenize, StrLiteral};
use crate::source::outline::{parse_module, Block, ClassDef, FunctionDef, Statement};
use crate::source::{clean_docstring, DocLine, MethodRecord, SourceUnit};

/// Everything extracted from one source file.
#[derive(Debug, Clone, Default)]
pub struct ExtractedSource {
    pub units: Vec<SourceUnit>,
    pub warnings: Vec<GenerationWarning>,
}

/// Finds every class with at least one documented test case.
///
/// Classes are visited breadth-first. A class filter matches either the
/// plain or the dotted name and fails with `NoMatchingClass` when nothing
/// qualifies.
pub fn extract_units(
    source: &str,
    filter: Option<&str>,
    ctx: &PhaseContext,
) -> Result<ExtractedSource, TestgenError> {
    let tokens = tokenize(source, ctx)?;
    let module = parse_module(&tokens, ctx)?;

    let mut extracted = ExtractedSource::default();
    let mut queue: VecDeque<(String, &Block)> = VecDeque::new();
    queue.push_back((String::new(), &module));

    while let Some((scope, block)) = queue.pop_front() {
        for statement in &block.statements {
            match statement {
                Statement::Class(class) => {
                    let qualified = if scope.is_empty() {
                        class.name.clone()
                    } else {
                        format!("{}.{}", scope, class.name)
                    };
                    if filter.map_or(true, |f| f == class.name || f == qualified) {
                        visit_class(class, &qualified, &mut extracted);
                    }
                    queue.push_back((qualified, &class.body));
                }
                Statement::Compound { body, .. } => queue.push_back((scope.clone(), body)),
                // Classes local to a function cannot be imported.
                Statement::Function(_) | Statement::Simple { .. } => {}
            }
        }
    }

    if let Some(class) = filter {
        if extracted.units.is_empty() {
            return Err(ctx.report(
                ErrorKind::NoMatchingClass {
                    class: class.to_string(),
                    source: ctx.source.name.clone(),
                },
                unspanned(),
            ));
        }
    }
    Ok(extracted)
}

fn visit_class(class: &ClassDef, qualified: &str, extracted: &mut ExtractedSource) {
    let mut methods: Vec<MethodRecord> = Vec::new();
    for statement in &class.body.statements {
        let Statement::Function(method) = statement else {
            continue;
        };
        if method.is_async {
            trace!(class = qualified, method = %method.name, "skipping async method");
            continue;
        }
        let Some(record) = visit_method(method, qualified, &mut extracted.warnings) else {
            continue;
        };
        match methods.iter_mut().find(|m| m.name == record.name) {
            Some(existing) => *existing = record,
            None => methods.push(record),
        }
    }

    if methods.is_empty() {
        trace!(class = qualified, "no documented test cases");
        return;
    }
    debug!(
        class = qualified,
        methods = methods.len(),
        "extracted documented class"
    );

    let unit = SourceUnit {
        name: class.name.clone(),
        qualified_name: qualified.to_string(),
        line: class.line,
        methods,
    };
    // A redefinition keeps the original position with the newer methods.
    match extracted
        .units
        .iter_mut()
        .find(|u| u.qualified_name == unit.qualified_name)
    {
        Some(existing) => *existing = unit,
        None => extracted.units.push(unit),
    }
}

fn visit_method(
    method: &FunctionDef,
    class: &str,
    warnings: &mut Vec<GenerationWarning>,
) -> Option<MethodRecord> {
    let parts = method.body.docstring()?;
    let found = parse_docstring(&doc_lines(parts));

    warnings.extend(found.issues.into_iter().map(|issue| GenerationWarning {
        kind: issue.kind,
        line: issue.line,
        class: class.to_string(),
        method: method.name.clone(),
    }));

    if found.cases.is_empty() {
        return None;
    }
    trace!(class, method = %method.name, cases = found.cases.len(), "parsed docstring");

    let raw: String = parts.iter().map(|p| p.body.as_str()).collect();
    Some(MethodRecord {
        name: method.name.clone(),
        doc: clean_docstring(&raw),
        line: method.line,
        cases: found.cases,
    })
}

/// Splits docstring literals into physical lines with absolute line numbers.
fn doc_lines(parts: &[StrLiteral]) -> Vec<DocLine> {
    parts
        .iter()
        .flat_map(|part| {
            part.body.split('\n').enumerate().map(|(i, text)| DocLine {
                line: part.line + i,
                text: text.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SourceContext;
    use crate::value::{Literal, Value};

    fn extract(src: &str, filter: Option<&str>) -> Result<ExtractedSource, TestgenError> {
        let ctx = PhaseContext::new(SourceContext::from_file("calc.py", src), "extract");
        extract_units(src, filter, &ctx)
    }

    const CALC: &str = r#"
class Calculator:
    """A calculator."""

    def add(self, a, b):
        """
        Add two numbers.

        (1, 2) -> 3
        (-1, 1) -> 0
        """
        return a + b

    def reset(self):
        """Reset state."""
        self.value = 0

    async def fetch(self):
        """() -> 1"""


class Undocumented:
    def f(self):
        return 1
"#;

    #[test]
    fn collects_cases_with_absolute_lines() {
        let extracted = extract(CALC, None).unwrap();
        assert_eq!(extracted.units.len(), 1);
        let unit = &extracted.units[0];
        assert_eq!(unit.qualified_name, "Calculator");
        assert_eq!(unit.line, 2);
        assert_eq!(unit.methods.len(), 1);

        let add = &unit.methods[0];
        assert_eq!(add.name, "add");
        assert_eq!(add.line, 5);
        assert_eq!(add.doc, "Add two numbers.\n\n(1, 2) -> 3\n(-1, 1) -> 0");
        let lines: Vec<_> = add.cases.iter().map(|c| c.source_line).collect();
        assert_eq!(lines, vec![9, 10]);
        assert_eq!(add.cases[1].expected, Value::Literal(Literal::Int(0)));
    }

    #[test]
    fn filter_selects_one_class_or_fails() {
        let extracted = extract(CALC, Some("Calculator")).unwrap();
        assert_eq!(extracted.units.len(), 1);

        let err = extract(CALC, Some("Undocumented")).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::NoMatchingClass { ref class, .. } if class == "Undocumented"));
        assert!(extract(CALC, Some("Missing")).is_err());
    }

    #[test]
    fn nested_classes_use_dotted_paths_after_outer_ones() {
        let src = "class Outer:\n    class Inner:\n        def f(self):\n            \"(1) -> 1\"\n    def g(self):\n        \"() -> 2\"\n\nclass Second:\n    def h(self):\n        \"() -> 3\"\n";
        let extracted = extract(src, None).unwrap();
        let names: Vec<_> = extracted
            .units
            .iter()
            .map(|u| u.qualified_name.as_str())
            .collect();
        assert_eq!(names, vec!["Outer", "Second", "Outer.Inner"]);
        assert_eq!(extracted.units[2].import_name(), "Outer");
        assert!(extract(src, Some("Inner")).is_ok());
        assert!(extract(src, Some("Outer.Inner")).is_ok());
    }

    #[test]
    fn classes_inside_functions_are_skipped() {
        let src = "def factory():\n    class Local:\n        def f(self):\n            \"() -> 1\"\n    return Local\n";
        assert!(extract(src, None).unwrap().units.is_empty());
    }

    #[test]
    fn redefined_class_keeps_position_and_takes_new_methods() {
        let src = "class A:\n    def f(self):\n        \"() -> 1\"\nclass B:\n    def g(self):\n        \"() -> 2\"\nclass A:\n    def h(self):\n        \"() -> 3\"\n";
        let extracted = extract(src, None).unwrap();
        assert_eq!(extracted.units[0].qualified_name, "A");
        assert_eq!(extracted.units[0].methods[0].name, "h");
        assert_eq!(extracted.units[1].qualified_name, "B");
    }

    #[test]
    fn warnings_carry_class_and_method() {
        let src = "class A:\n    def f(self):\n        \"\"\"\n        (1 -> 2\n        (2) -> 4\n        \"\"\"\n";
        let extracted = extract(src, None).unwrap();
        assert_eq!(extracted.units[0].case_count(), 1);
        let warning = &extracted.warnings[0];
        assert_eq!((warning.class.as_str(), warning.method.as_str()), ("A", "f"));
        assert_eq!(warning.line, 4);
    }

    #[test]
    fn syntax_errors_are_fatal() {
        let err = extract("class A:\n    def f(self:\n        pass\n", None).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::SourceSyntax { .. }));
    }
}

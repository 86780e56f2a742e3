//! Prints the code model as Python source with four-space indentation.

use std::fmt::Write;

use crate::codegen::{Assertion, Expr, Stmt, TestFunction, TestModule, TestSuite};
use crate::value::render::str_repr;

const INDENT: &str = "    ";

pub fn print_module(module: &TestModule) -> String {
    let mut printer = Printer::default();
    printer.module(module);
    printer.out
}

#[derive(Default)]
struct Printer {
    out: String,
    depth: usize,
}

impl Printer {
    fn module(&mut self, module: &TestModule) {
        self.line("\"\"\"");
        for text in &module.header {
            self.line(&escape_docstring(text));
        }
        self.line("\"\"\"");
        self.blank();

        for import in &module.imports {
            self.line(&format!("import {}", import));
        }
        self.blank();
        self.line(&format!(
            "sys.path.insert(0, os.path.dirname(os.path.abspath({})))",
            str_repr(&module.search_path)
        ));
        self.blank();
        self.line(&format!(
            "from {} import {}",
            module.module,
            module.names.join(", ")
        ));

        for suite in &module.suites {
            self.blank();
            self.blank();
            self.suite(suite);
        }

        self.blank();
        self.blank();
        self.line("if __name__ == '__main__':");
        self.depth += 1;
        self.line("unittest.main()");
        self.depth -= 1;
    }

    fn suite(&mut self, suite: &TestSuite) {
        self.line(&format!("class {}(unittest.TestCase):", suite.name));
        self.depth += 1;
        self.line(&format!("\"\"\"{}\"\"\"", escape_docstring(&suite.doc)));
        self.blank();
        self.line("def setUp(self):");
        self.block(&suite.setup);
        for test in &suite.tests {
            self.blank();
            self.function(test);
        }
        self.depth -= 1;
    }

    fn function(&mut self, function: &TestFunction) {
        self.line(&format!("def {}(self):", function.name));
        if let Some(doc) = &function.doc {
            self.depth += 1;
            self.line(&format!("\"\"\"{}\"\"\"", escape_docstring(doc)));
            self.depth -= 1;
        }
        self.block(&function.body);
    }

    fn block(&mut self, body: &[Stmt]) {
        self.depth += 1;
        for stmt in body {
            self.stmt(stmt, "");
        }
        self.depth -= 1;
    }

    /// `prefix` is prepended after the indentation; disabled statements use
    /// it to comment themselves out.
    fn stmt(&mut self, stmt: &Stmt, prefix: &str) {
        match stmt {
            Stmt::Comment(text) => {
                let text = text.replace('\n', " ");
                self.line(&format!("{}# {}", prefix, text));
            }
            Stmt::Assign { target, value } => {
                self.line(&format!("{}{} = {}", prefix, expr(target), expr(value)));
            }
            Stmt::Assert(assertion) => {
                self.line(&format!("{}{}", prefix, assert_call(assertion)));
            }
            Stmt::Disabled(inner) => {
                let prefix = format!("{}# ", prefix);
                self.stmt(inner, &prefix);
            }
            Stmt::SubTest { case, body } => {
                self.line(&format!("{}with self.subTest(case={}):", prefix, case));
                self.depth += 1;
                for inner in body {
                    self.stmt(inner, prefix);
                }
                self.depth -= 1;
            }
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }
}

fn assert_call(assertion: &Assertion) -> String {
    match assertion {
        Assertion::Equal { actual, expected } => {
            format!("self.assertEqual({}, {})", expr(actual), expr(expected))
        }
        Assertion::IsNone(value) => format!("self.assertIsNone({})", expr(value)),
        Assertion::IsInstance { value, class } => {
            format!("self.assertIsInstance({}, {})", expr(value), expr(class))
        }
    }
}

fn expr(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(&mut out, expr);
    out
}

fn write_expr(out: &mut String, expr: &Expr) {
    match expr {
        Expr::Name(name) => out.push_str(name),
        Expr::Attr(base, name) => {
            write_expr(out, base);
            out.push('.');
            out.push_str(name);
        }
        Expr::Call(callee, args) => {
            write_expr(out, callee);
            out.push('(');
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_expr(out, arg);
            }
            out.push(')');
        }
        Expr::Literal(literal) => {
            let _ = write!(out, "{}", literal);
        }
        Expr::Raw(text) => out.push_str(text),
    }
}

fn escape_docstring(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Literal;
    use pretty_assertions::assert_eq;

    fn module(tests: Vec<TestFunction>) -> TestModule {
        TestModule {
            header: vec!["Generated.".into()],
            imports: vec!["os".into(), "sys".into(), "unittest".into()],
            search_path: "calc.py".into(),
            module: "calc".into(),
            names: vec!["Calculator".into()],
            suites: vec![TestSuite {
                name: "TestCalculator".into(),
                doc: "Cases.".into(),
                setup: vec![Stmt::Assign {
                    target: Expr::name("self").attr("instance"),
                    value: Expr::name("Calculator").call(vec![]),
                }],
                tests,
            }],
        }
    }

    fn call_add() -> Stmt {
        Stmt::Assign {
            target: Expr::name("result"),
            value: Expr::name("self")
                .attr("instance")
                .attr("add")
                .call(vec![Expr::Literal(Literal::Int(1)), Expr::Literal(Literal::Int(2))]),
        }
    }

    #[test]
    fn prints_complete_module() {
        let test = TestFunction {
            name: "test_add_1".into(),
            doc: None,
            body: vec![
                Stmt::Comment("(1, 2) -> 3  (line 9)".into()),
                call_add(),
                Stmt::Assert(Assertion::Equal {
                    actual: Expr::name("result"),
                    expected: Expr::Literal(Literal::Int(3)),
                }),
            ],
        };
        let expected = r#""""
Generated.
"""

import os
import sys
import unittest

sys.path.insert(0, os.path.dirname(os.path.abspath('calc.py')))

from calc import Calculator


class TestCalculator(unittest.TestCase):
    """Cases."""

    def setUp(self):
        self.instance = Calculator()

    def test_add_1(self):
        # (1, 2) -> 3  (line 9)
        result = self.instance.add(1, 2)
        self.assertEqual(result, 3)


if __name__ == '__main__':
    unittest.main()
"#;
        assert_eq!(print_module(&module(vec![test])), expected);
    }

    #[test]
    fn prints_subtests_and_disabled_statements() {
        let test = TestFunction {
            name: "test_add".into(),
            doc: Some("Shared.".into()),
            body: vec![Stmt::SubTest {
                case: 1,
                body: vec![
                    call_add(),
                    Stmt::Disabled(Box::new(Stmt::Assert(Assertion::IsInstance {
                        value: Expr::name("result"),
                        class: Expr::Raw("int".into()),
                    }))),
                ],
            }],
        };
        let printed = print_module(&module(vec![test]));
        let expected = "    def test_add(self):\n        \"\"\"Shared.\"\"\"\n        with self.subTest(case=1):\n            result = self.instance.add(1, 2)\n            # self.assertIsInstance(result, int)\n";
        assert!(printed.contains(expected), "{}", printed);
    }

    #[test]
    fn docstrings_are_escaped() {
        assert_eq!(escape_docstring(r#"a "b" \c"#), r#"a \"b\" \\c"#);
    }
}

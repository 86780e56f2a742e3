//! Lowers extracted classes into the test module model.

use std::collections::HashSet;

use crate::codegen::{is_identifier, mangle, Assertion, Expr, Stmt, TestFunction, TestModule, TestSuite};
use crate::config::{GeneratorConfig, InstanceMode};
use crate::dsl::TestCase;
use crate::source::{MethodRecord, SourceUnit};
use crate::value::{Arguments, Literal, Value};

const RESULT: &str = "result";

/// Builds the module for `units`. `source_path` is the path as given by the
/// caller; `module` is the import name of the source file.
pub fn lower_module(
    units: &[SourceUnit],
    source_path: &str,
    module: &str,
    config: &GeneratorConfig,
) -> TestModule {
    let mut names: Vec<String> = Vec::new();
    for unit in units {
        let name = unit.import_name().to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }

    let mut suite_names = HashSet::new();
    let suites = units
        .iter()
        .map(|unit| {
            let lowering = UnitLowering { unit, config };
            let mut suite = lowering.suite();
            suite.name = unique_name(&suite.name, &mut suite_names);
            suite
        })
        .collect();

    let file_name = source_path
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(source_path);
    TestModule {
        header: vec![
            format!("Tests generated from {} by testgen.", file_name),
            String::new(),
            "Each test exercises one documented test case; regenerate instead of editing."
                .to_string(),
        ],
        imports: vec!["os".into(), "sys".into(), "unittest".into()],
        search_path: source_path.to_string(),
        module: module.to_string(),
        names,
        suites,
    }
}

/// Suffixes `base` with a counter until no earlier suite uses it.
fn unique_name(base: &str, taken: &mut HashSet<String>) -> String {
    let mut name = base.to_string();
    let mut n = 2;
    while !taken.insert(name.clone()) {
        name = format!("{}_{}", base, n);
        n += 1;
    }
    name
}

struct UnitLowering<'a> {
    unit: &'a SourceUnit,
    config: &'a GeneratorConfig,
}

impl UnitLowering<'_> {
    fn suite(&self) -> TestSuite {
        let qualified = &self.unit.qualified_name;
        let shared = self.config.instance_mode == InstanceMode::Shared;
        let doc = if shared {
            format!(
                "Documented cases of {}. Cases of one method share an instance and run in order.",
                qualified
            )
        } else {
            format!("Documented cases of {}, each on a fresh instance.", qualified)
        };

        let class_expr = qualified
            .split('.')
            .skip(1)
            .fold(Expr::name(self.unit.import_name()), |expr, part| expr.attr(part));
        let setup = vec![Stmt::Assign {
            target: self.fixture(),
            value: class_expr.call(vec![]),
        }];

        let tests = self
            .unit
            .methods
            .iter()
            .flat_map(|method| {
                if shared {
                    vec![self.shared_test(method)]
                } else {
                    self.isolated_tests(method)
                }
            })
            .collect();

        TestSuite {
            name: format!("Test{}", qualified.replace('.', "_")),
            doc,
            setup,
            tests,
        }
    }

    fn isolated_tests(&self, method: &MethodRecord) -> Vec<TestFunction> {
        method
            .cases
            .iter()
            .enumerate()
            .map(|(i, case)| TestFunction {
                name: format!("test_{}_{}", method.name, i + 1),
                doc: None,
                body: self.case_body(method, case),
            })
            .collect()
    }

    fn shared_test(&self, method: &MethodRecord) -> TestFunction {
        let body = method
            .cases
            .iter()
            .enumerate()
            .map(|(i, case)| Stmt::SubTest {
                case: i + 1,
                body: self.case_body(method, case),
            })
            .collect();
        TestFunction {
            name: format!("test_{}", method.name),
            doc: Some(format!(
                "Cases from the docstring of {}.{}.",
                self.unit.qualified_name, method.name
            )),
            body,
        }
    }

    fn case_body(&self, method: &MethodRecord, case: &TestCase) -> Vec<Stmt> {
        let mut body = Vec::new();
        if self.config.emit_source_comments {
            body.push(Stmt::Comment(format!(
                "{}  (line {})",
                case.raw_text, case.source_line
            )));
        }

        for init in &case.init_overrides {
            match (&init.value, is_identifier(&init.target)) {
                (Value::Literal(literal), true) => body.push(Stmt::Assign {
                    target: self.attribute(&init.target),
                    value: Expr::Literal(literal.clone()),
                }),
                _ => body.push(Stmt::Comment(format!(
                    "TODO: set {} = {} before the call",
                    init.target, init.value
                ))),
            }
        }

        let callee = self.attribute(&method.name);
        let args = match &case.inputs {
            Arguments::Resolved(items) => items.iter().cloned().map(Expr::Literal).collect(),
            Arguments::Deferred(text) => {
                body.push(Stmt::Comment(format!(
                    "TODO: arguments ({}) are not literals; pass them here",
                    text
                )));
                Vec::new()
            }
        };
        body.push(Stmt::Assign {
            target: Expr::name(RESULT),
            value: callee.call(args),
        });

        let result = Expr::name(RESULT);
        match &case.expected {
            Value::Literal(Literal::None) => body.push(Stmt::Assert(Assertion::IsNone(result))),
            Value::Literal(literal) => body.push(Stmt::Assert(Assertion::Equal {
                actual: result,
                expected: Expr::Literal(literal.clone()),
            })),
            Value::Type(name) if is_type_path(name) => {
                body.push(Stmt::Assert(Assertion::IsInstance {
                    value: result,
                    class: Expr::Raw(name.clone()),
                }))
            }
            Value::Type(name) => {
                body.push(Stmt::Comment(format!(
                    "TODO: `{}` is not a plain type name; check the result type manually",
                    name
                )));
                body.push(disabled(Assertion::IsInstance {
                    value: result,
                    class: Expr::Raw(name.clone()),
                }));
            }
            Value::Deferred(text) => {
                body.push(Stmt::Comment(format!(
                    "TODO: expected value `{}` is not a literal; check it manually",
                    text
                )));
                body.push(disabled(Assertion::Equal {
                    actual: result,
                    expected: Expr::Raw(text.clone()),
                }));
            }
        }

        for check in &case.state_checks {
            body.push(Stmt::Comment(format!(
                "State check (not verified): {} == {}",
                check.target, check.value
            )));
            if is_identifier(&check.target) {
                let actual = self.attribute(&check.target);
                body.push(disabled(match &check.value {
                    Value::Literal(Literal::None) => Assertion::IsNone(actual),
                    Value::Literal(literal) => Assertion::Equal {
                        actual,
                        expected: Expr::Literal(literal.clone()),
                    },
                    Value::Type(name) => Assertion::IsInstance {
                        value: actual,
                        class: Expr::Raw(name.clone()),
                    },
                    Value::Deferred(text) => Assertion::Equal {
                        actual,
                        expected: Expr::Raw(text.clone()),
                    },
                }));
            }
        }
        body
    }

    fn fixture(&self) -> Expr {
        Expr::name("self").attr(self.config.fixture_name.as_str())
    }

    fn attribute(&self, name: &str) -> Expr {
        self.fixture().attr(mangle(&self.unit.name, name))
    }
}

fn disabled(assertion: Assertion) -> Stmt {
    Stmt::Disabled(Box::new(Stmt::Assert(assertion)))
}

fn is_type_path(name: &str) -> bool {
    name.split('.').all(is_identifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{parse_line, LineForm, LineParse};

    fn case(line: &str, source_line: usize) -> TestCase {
        let (parts, form) = match parse_line(line) {
            LineParse::Compound(p) => (p, LineForm::Compound),
            LineParse::Simple(p) => (p, LineForm::Simple),
            LineParse::Unmatched(reason) => panic!("{}", reason),
        };
        TestCase::from_parts(&parts, form, line, source_line)
    }

    fn unit(qualified: &str, method: &str, lines: &[&str]) -> SourceUnit {
        SourceUnit {
            name: qualified.rsplit('.').next().unwrap().to_string(),
            qualified_name: qualified.to_string(),
            line: 1,
            methods: vec![MethodRecord {
                name: method.to_string(),
                doc: String::new(),
                line: 2,
                cases: lines.iter().enumerate().map(|(i, l)| case(l, 3 + i)).collect(),
            }],
        }
    }

    #[test]
    fn isolated_mode_emits_one_test_per_case() {
        let units = vec![unit("Calculator", "add", &["(1, 2) -> 3", "(0, 0) -> 0"])];
        let module = lower_module(&units, "src/calc.py", "calc", &GeneratorConfig::default());
        assert_eq!(module.names, vec!["Calculator"]);
        let suite = &module.suites[0];
        assert_eq!(suite.name, "TestCalculator");
        let names: Vec<_> = suite.tests.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["test_add_1", "test_add_2"]);
        assert!(module.header[0].contains("calc.py"));
    }

    #[test]
    fn shared_mode_groups_cases_into_subtests() {
        let units = vec![unit("Calculator", "add", &["(1, 2) -> 3", "(0, 0) -> 0"])];
        let config = GeneratorConfig {
            instance_mode: InstanceMode::Shared,
            ..GeneratorConfig::default()
        };
        let module = lower_module(&units, "calc.py", "calc", &config);
        let test = &module.suites[0].tests[0];
        assert_eq!(test.name, "test_add");
        assert!(matches!(test.body[1], Stmt::SubTest { case: 2, .. }));
    }

    #[test]
    fn nested_classes_import_the_outer_name() {
        let units = vec![
            unit("Outer", "f", &["() -> 1"]),
            unit("Outer.Inner", "g", &["() -> 2"]),
        ];
        let module = lower_module(&units, "m.py", "m", &GeneratorConfig::default());
        assert_eq!(module.names, vec!["Outer"]);
        let setup = &module.suites[1].setup[0];
        assert_eq!(
            setup,
            &Stmt::Assign {
                target: Expr::name("self").attr("instance"),
                value: Expr::name("Outer").attr("Inner").call(vec![]),
            }
        );
        assert_eq!(module.suites[1].name, "TestOuter_Inner");
    }

    #[test]
    fn only_literal_inits_on_identifiers_become_assignments() {
        let units = vec![unit("A", "f", &["() -> 1 @value=0 @items[0]=1 @count=n"])];
        let config = GeneratorConfig {
            emit_source_comments: false,
            ..GeneratorConfig::default()
        };
        let module = lower_module(&units, "a.py", "a", &config);
        let body = &module.suites[0].tests[0].body;
        assert!(matches!(&body[0], Stmt::Assign { value: Expr::Literal(Literal::Int(0)), .. }));
        assert!(matches!(&body[1], Stmt::Comment(c) if c.contains("items[0] = 1")));
        assert!(matches!(&body[2], Stmt::Comment(c) if c.contains("count = n")));
    }

    #[test]
    fn unicode_names_are_assigned_directly() {
        let units = vec![unit("计算器", "加", &["(1) -> 1 @值=0"])];
        let config = GeneratorConfig {
            emit_source_comments: false,
            ..GeneratorConfig::default()
        };
        let module = lower_module(&units, "calc.py", "calc", &config);
        let body = &module.suites[0].tests[0].body;
        assert_eq!(
            body[0],
            Stmt::Assign {
                target: Expr::name("self").attr("instance").attr("值"),
                value: Expr::Literal(Literal::Int(0)),
            }
        );
    }

    #[test]
    fn none_and_types_pick_dedicated_assertions() {
        let units = vec![unit("A", "f", &["() -> None", "() -> type:dict"])];
        let module = lower_module(&units, "a.py", "a", &GeneratorConfig::default());
        let tests = &module.suites[0].tests;
        assert!(tests[0]
            .body
            .contains(&Stmt::Assert(Assertion::IsNone(Expr::name("result")))));
        assert!(tests[1].body.iter().any(|s| matches!(s, Stmt::Assert(Assertion::IsInstance { .. }))));
    }

    #[test]
    fn state_checks_are_never_executable() {
        let units = vec![unit("A", "f", &["(5) -> (5 && value=5 && len(history)=1)"])];
        let module = lower_module(&units, "a.py", "a", &GeneratorConfig::default());
        let body = &module.suites[0].tests[0].body;
        let live_asserts = body.iter().filter(|s| matches!(s, Stmt::Assert(_))).count();
        assert_eq!(live_asserts, 1);
        let disabled = body.iter().filter(|s| matches!(s, Stmt::Disabled(_))).count();
        assert_eq!(disabled, 1);
    }

    #[test]
    fn private_methods_are_mangled() {
        let units = vec![unit("Vault", "__open", &["() -> True"])];
        let module = lower_module(&units, "v.py", "v", &GeneratorConfig::default());
        let body = &module.suites[0].tests[0].body;
        let call = Expr::name("self")
            .attr("instance")
            .attr("_Vault__open")
            .call(vec![]);
        assert!(body.contains(&Stmt::Assign {
            target: Expr::name("result"),
            value: call,
        }));
    }
}

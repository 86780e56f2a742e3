//! Structured model of the emitted `unittest` module.
//!
//! Lowering turns extracted classes into this model and the printer turns
//! the model into Python source. Nothing here builds code by string
//! templating beyond single expressions.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::value::Literal;

pub mod lower;
pub mod printer;

pub use lower::lower_module;
pub use printer::print_module;

// ============================================================================
// CODE MODEL
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct TestModule {
    /// Lines of the module docstring.
    pub header: Vec<String>,
    pub imports: Vec<String>,
    /// Path whose directory is put on `sys.path`.
    pub search_path: String,
    pub module: String,
    /// Names imported from `module`, in first-use order.
    pub names: Vec<String>,
    pub suites: Vec<TestSuite>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestSuite {
    pub name: String,
    pub doc: String,
    pub setup: Vec<Stmt>,
    pub tests: Vec<TestFunction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestFunction {
    pub name: String,
    pub doc: Option<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Comment(String),
    Assign { target: Expr, value: Expr },
    Assert(Assertion),
    /// Printed commented out, as a suggestion to finish by hand.
    Disabled(Box<Stmt>),
    SubTest { case: usize, body: Vec<Stmt> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Assertion {
    Equal { actual: Expr, expected: Expr },
    IsNone(Expr),
    IsInstance { value: Expr, class: Expr },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Name(String),
    Attr(Box<Expr>, String),
    Call(Box<Expr>, Vec<Expr>),
    Literal(Literal),
    /// Source text emitted as is.
    Raw(String),
}

impl Expr {
    pub fn name(name: impl Into<String>) -> Self {
        Expr::Name(name.into())
    }

    pub fn attr(self, name: impl Into<String>) -> Self {
        Expr::Attr(Box::new(self), name.into())
    }

    pub fn call(self, args: Vec<Expr>) -> Self {
        Expr::Call(Box::new(self), args)
    }
}

// ============================================================================
// PYTHON NAMES
// ============================================================================

// Python's identifier classes, approximated by general category.
static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\p{L}\p{Nl}_][\p{L}\p{Nl}\p{Mn}\p{Mc}\p{Nd}\p{Pc}]*$")
        .expect("identifier pattern")
});

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// A Python identifier, Unicode letters included, that is not a keyword.
pub fn is_identifier(text: &str) -> bool {
    IDENTIFIER.is_match(text) && !KEYWORDS.contains(&text)
}

/// Applies Python's private-name mangling for an attribute accessed from
/// outside `class`: `__secret` on `Vault` is reached as `_Vault__secret`.
pub fn mangle(class: &str, attribute: &str) -> String {
    let class = class.trim_start_matches('_');
    if attribute.starts_with("__") && !attribute.ends_with("__") && !class.is_empty() {
        format!("_{}{}", class, attribute)
    } else {
        attribute.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_exclude_keywords_and_punctuation() {
        assert!(is_identifier("value"));
        assert!(is_identifier("_private2"));
        assert!(!is_identifier("len(history)"));
        assert!(!is_identifier("class"));
        assert!(!is_identifier("2nd"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("a-b"));
    }

    #[test]
    fn identifiers_accept_unicode_letters() {
        assert!(is_identifier("值"));
        assert!(is_identifier("计数_2"));
        assert!(is_identifier("émoji"));
        assert!(!is_identifier("２x"));
        assert!(!is_identifier("值!"));
    }

    #[test]
    fn mangles_private_names_only() {
        assert_eq!(mangle("Vault", "__secret"), "_Vault__secret");
        assert_eq!(mangle("_Vault", "__secret"), "_Vault__secret");
        assert_eq!(mangle("Vault", "__init__"), "__init__");
        assert_eq!(mangle("Vault", "_hint"), "_hint");
    }
}

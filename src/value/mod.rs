//! Value resolution.
//!
//! Every token of a test-case line is classified here, without evaluating
//! anything: a `type:` prefix is a type assertion, Python literal syntax
//! becomes a [`Literal`], and everything else is kept as deferred text for
//! the generated test to complete by hand.

use std::fmt;

use serde::Serialize;
use tracing::trace;

pub mod parser;
pub mod render;

pub use parser::{parse_arguments, parse_literal, LiteralError};

/// A Python literal value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Literal {
    None,
    Bool(bool),
    Int(i128),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Literal>),
    Tuple(Vec<Literal>),
    /// Insertion-ordered; a repeated key keeps its first position.
    Dict(Vec<(Literal, Literal)>),
    Set(Vec<Literal>),
}

/// A resolved token.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Literal(Literal),
    /// `type:<name>`: only the runtime type of the result is checked.
    Type(String),
    /// Not literal syntax; carried verbatim.
    Deferred(String),
}

impl Value {
    pub fn is_deferred(&self) -> bool {
        matches!(self, Value::Deferred(_))
    }
}

/// Renders the value the way it is written in a test-case line.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Literal(literal) => write!(f, "{}", literal),
            Value::Type(name) => write!(f, "type:{}", name),
            Value::Deferred(text) => f.write_str(text),
        }
    }
}

/// The argument list of a test case. A list is either fully literal or
/// deferred as a whole, never partially resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Arguments {
    Resolved(Vec<Literal>),
    /// Text between the parentheses, trimmed.
    Deferred(String),
}

impl Arguments {
    pub fn is_deferred(&self) -> bool {
        matches!(self, Arguments::Deferred(_))
    }
}

/// Renders the parenthesized group as written in a test-case line.
impl fmt::Display for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arguments::Resolved(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
            Arguments::Deferred(text) => write!(f, "({})", text),
        }
    }
}

/// Classifies one value token.
pub fn resolve(text: &str) -> Value {
    let text = text.trim();
    if let Some(name) = text.strip_prefix("type:") {
        let name = name.trim();
        if name.is_empty() {
            return Value::Deferred(text.to_string());
        }
        return Value::Type(name.to_string());
    }
    if text.is_empty() {
        return Value::Literal(Literal::None);
    }
    match parse_literal(text) {
        Ok(literal) => Value::Literal(literal),
        Err(reason) => {
            trace!(token = text, %reason, "deferring non-literal value");
            Value::Deferred(text.to_string())
        }
    }
}

/// Classifies the inside of an argument group.
pub fn resolve_arguments(text: &str) -> Arguments {
    let text = text.trim();
    match parse_arguments(text) {
        Ok(items) => Arguments::Resolved(items),
        Err(reason) => {
            trace!(arguments = text, %reason, "deferring non-literal arguments");
            Arguments::Deferred(text.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_prefix_wins_over_literal_syntax() {
        assert_eq!(resolve("type:dict"), Value::Type("dict".into()));
        assert_eq!(resolve("  type: int "), Value::Type("int".into()));
        assert_eq!(resolve("type:"), Value::Deferred("type:".into()));
    }

    #[test]
    fn blank_resolves_to_none() {
        assert_eq!(resolve("   "), Value::Literal(Literal::None));
        assert_eq!(resolve("None"), Value::Literal(Literal::None));
    }

    #[test]
    fn non_literals_are_deferred_verbatim() {
        assert_eq!(
            resolve(" self.value * 2 "),
            Value::Deferred("self.value * 2".into())
        );
        assert_eq!(
            resolve_arguments("x, 1"),
            Arguments::Deferred("x, 1".into())
        );
    }

    #[test]
    fn argument_groups_render_in_line_form() {
        let args = resolve_arguments("5");
        assert_eq!(args, Arguments::Resolved(vec![Literal::Int(5)]));
        assert_eq!(args.to_string(), "(5)");
        assert_eq!(resolve_arguments("").to_string(), "()");
        assert_eq!(Arguments::Deferred("a + b".into()).to_string(), "(a + b)");
    }
}

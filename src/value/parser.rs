//! Literal parser.
//!
//! Turns Python literal syntax into [`Literal`] values. This is purely
//! syntactic: nothing is evaluated, and any construct outside the grammar is
//! rejected with a [`LiteralError`].

use pest::{iterators::Pair, Parser};
use pest_derive::Parser;
use thiserror::Error;

use crate::value::Literal;

#[derive(Parser)]
#[grammar = "value/literal.pest"]
struct LiteralParser;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiteralError {
    #[error("not a literal")]
    Syntax,
    #[error("integer literal out of range: {0}")]
    IntegerOverflow(String),
    #[error("leading zeros in decimal integer literal: {0}")]
    LeadingZeros(String),
    #[error("unsupported escape sequence: {0}")]
    UnsupportedEscape(String),
    #[error("non-ASCII character in bytes literal")]
    NonAsciiBytes,
    #[error("unhashable {0} used as a dict key or set member")]
    Unhashable(&'static str),
}

type LiteralResult<T> = Result<T, LiteralError>;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parses a single literal, or a bare tuple such as `1, 2`.
pub fn parse_literal(text: &str) -> LiteralResult<Literal> {
    let root = LiteralParser::parse(Rule::value_root, text)
        .map_err(|_| LiteralError::Syntax)?
        .next()
        .ok_or(LiteralError::Syntax)?;

    let inner = root
        .into_inner()
        .find(|p| p.as_rule() != Rule::EOI)
        .ok_or(LiteralError::Syntax)?;
    build(inner)
}

/// Parses a comma-separated argument list (the inside of a call's parentheses).
pub fn parse_arguments(text: &str) -> LiteralResult<Vec<Literal>> {
    let root = LiteralParser::parse(Rule::arguments_root, text)
        .map_err(|_| LiteralError::Syntax)?
        .next()
        .ok_or(LiteralError::Syntax)?;

    root.into_inner()
        .filter(|p| p.as_rule() != Rule::EOI)
        .map(build)
        .collect()
}

// ============================================================================
// BUILDERS
// ============================================================================

fn build(pair: Pair<Rule>) -> LiteralResult<Literal> {
    match pair.as_rule() {
        Rule::none => Ok(Literal::None),
        Rule::boolean => Ok(Literal::Bool(pair.as_str() == "True")),
        Rule::number => build_number(pair),
        Rule::string => {
            let mut text = String::new();
            for part in pair.into_inner() {
                text.push_str(&build_string_part(part)?);
            }
            Ok(Literal::Str(text))
        }
        Rule::bytes => {
            let mut data = Vec::new();
            for part in pair.into_inner() {
                data.extend(build_bytes_part(part)?);
            }
            Ok(Literal::Bytes(data))
        }
        Rule::list => Ok(Literal::List(build_items(pair)?)),
        Rule::tuple | Rule::bare_tuple => Ok(Literal::Tuple(build_items(pair)?)),
        Rule::set => {
            let items = build_items(pair)?;
            let mut members: Vec<Literal> = Vec::with_capacity(items.len());
            for item in items {
                ensure_hashable(&item)?;
                if !members.contains(&item) {
                    members.push(item);
                }
            }
            Ok(Literal::Set(members))
        }
        Rule::dict => {
            let mut entries: Vec<(Literal, Literal)> = Vec::new();
            for entry in pair.into_inner() {
                let mut parts = entry.into_inner();
                let key = build(parts.next().ok_or(LiteralError::Syntax)?)?;
                let value = build(parts.next().ok_or(LiteralError::Syntax)?)?;
                ensure_hashable(&key)?;
                match entries.iter_mut().find(|(k, _)| *k == key) {
                    Some(existing) => existing.1 = value,
                    None => entries.push((key, value)),
                }
            }
            Ok(Literal::Dict(entries))
        }
        Rule::paren => build(pair.into_inner().next().ok_or(LiteralError::Syntax)?),
        _ => Err(LiteralError::Syntax),
    }
}

fn build_items(pair: Pair<Rule>) -> LiteralResult<Vec<Literal>> {
    pair.into_inner().map(build).collect()
}

fn build_number(pair: Pair<Rule>) -> LiteralResult<Literal> {
    let mut negative = false;
    let mut magnitude = None;
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::sign => negative = part.as_str() == "-",
            _ => magnitude = Some(part),
        }
    }
    let magnitude = magnitude.ok_or(LiteralError::Syntax)?;
    let text = magnitude.as_str().replace('_', "");

    if magnitude.as_rule() == Rule::float {
        let value: f64 = text.parse().map_err(|_| LiteralError::Syntax)?;
        return Ok(Literal::Float(if negative { -value } else { value }));
    }

    let (digits, radix) = match magnitude.as_rule() {
        Rule::hex_int => (&text[2..], 16),
        Rule::oct_int => (&text[2..], 8),
        Rule::bin_int => (&text[2..], 2),
        _ => {
            if text.len() > 1 && text.starts_with('0') && text.chars().any(|c| c != '0') {
                return Err(LiteralError::LeadingZeros(magnitude.as_str().to_string()));
            }
            (text.as_str(), 10)
        }
    };
    let value = i128::from_str_radix(digits, radix)
        .map_err(|_| LiteralError::IntegerOverflow(magnitude.as_str().to_string()))?;
    Ok(Literal::Int(if negative { -value } else { value }))
}

/// Returns the prefix text and the undecoded body of a quoted part.
fn split_quoted(part: Pair<Rule>) -> LiteralResult<(String, String)> {
    let mut prefix = String::new();
    let mut body = None;
    for inner in part.into_inner() {
        match inner.as_rule() {
            Rule::str_prefix | Rule::bytes_prefix => prefix = inner.as_str().to_ascii_lowercase(),
            _ => {
                let content = inner
                    .into_inner()
                    .next()
                    .map(|b| b.as_str().to_string())
                    .unwrap_or_default();
                body = Some(content);
            }
        }
    }
    Ok((prefix, body.ok_or(LiteralError::Syntax)?))
}

fn build_string_part(part: Pair<Rule>) -> LiteralResult<String> {
    let (prefix, body) = split_quoted(part)?;
    if prefix.contains('r') {
        return Ok(body);
    }
    unescape_str(&body)
}

fn build_bytes_part(part: Pair<Rule>) -> LiteralResult<Vec<u8>> {
    let (prefix, body) = split_quoted(part)?;
    if !body.is_ascii() {
        return Err(LiteralError::NonAsciiBytes);
    }
    if prefix.contains('r') {
        return Ok(body.into_bytes());
    }
    unescape_bytes(&body)
}

fn ensure_hashable(literal: &Literal) -> LiteralResult<()> {
    match literal {
        Literal::List(_) => Err(LiteralError::Unhashable("list")),
        Literal::Dict(_) => Err(LiteralError::Unhashable("dict")),
        Literal::Set(_) => Err(LiteralError::Unhashable("set")),
        Literal::Tuple(items) => items.iter().try_for_each(ensure_hashable),
        _ => Ok(()),
    }
}

// ============================================================================
// ESCAPES
// ============================================================================

fn unescape_str(body: &str) -> LiteralResult<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let Some(next) = chars.next() else {
            out.push('\\');
            break;
        };
        match next {
            '\n' => {}
            'x' => out.push(hex_escape(&mut chars, 2)?),
            'u' => out.push(hex_escape(&mut chars, 4)?),
            'U' => out.push(hex_escape(&mut chars, 8)?),
            'N' => return Err(LiteralError::UnsupportedEscape("\\N{...}".into())),
            '0'..='7' => out.push(octal_escape(next, &mut chars)?),
            other => match simple_escape(other) {
                Some(c) => out.push(c),
                None => {
                    out.push('\\');
                    out.push(other);
                }
            },
        }
    }
    Ok(out)
}

fn unescape_bytes(body: &str) -> LiteralResult<Vec<u8>> {
    let mut out = Vec::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch as u8);
            continue;
        }
        let Some(next) = chars.next() else {
            out.push(b'\\');
            break;
        };
        match next {
            '\n' => {}
            'x' => out.push(hex_escape(&mut chars, 2)? as u8),
            '0'..='7' => {
                let c = octal_escape(next, &mut chars)?;
                out.push(u8::try_from(u32::from(c)).map_err(|_| {
                    LiteralError::UnsupportedEscape(format!("\\{:o}", u32::from(c)))
                })?);
            }
            other => match simple_escape(other) {
                Some(c) => out.push(c as u8),
                None => {
                    out.push(b'\\');
                    out.push(other as u8);
                }
            },
        }
    }
    Ok(out)
}

fn simple_escape(c: char) -> Option<char> {
    Some(match c {
        '\\' => '\\',
        '\'' => '\'',
        '"' => '"',
        'a' => '\x07',
        'b' => '\x08',
        'f' => '\x0c',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'v' => '\x0b',
        _ => return None,
    })
}

fn hex_escape(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    width: usize,
) -> LiteralResult<char> {
    let digits: String = (0..width).filter_map(|_| chars.next()).collect();
    if digits.len() != width {
        return Err(LiteralError::UnsupportedEscape(format!("\\x{}", digits)));
    }
    u32::from_str_radix(&digits, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or(LiteralError::UnsupportedEscape(digits))
}

fn octal_escape(
    first: char,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> LiteralResult<char> {
    let mut digits = String::from(first);
    while digits.len() < 3 {
        match chars.peek() {
            Some(c @ '0'..='7') => {
                digits.push(*c);
                chars.next();
            }
            _ => break,
        }
    }
    u32::from_str_radix(&digits, 8)
        .ok()
        .and_then(char::from_u32)
        .ok_or(LiteralError::UnsupportedEscape(digits))
}

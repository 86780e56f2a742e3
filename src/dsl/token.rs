//! Tokenizer for a single test-case line.
//!
//! Only the characters that carry structure in the notation get their own
//! token. Everything else is collected into `Text` runs, and string literals
//! are kept whole so quotes can hide separators.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tok {
    Open(char),
    Close(char),
    Arrow,
    AndAnd,
    At,
    Eq,
    Hash,
    Str,
    Space,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: Tok,
    pub span: Range<usize>,
}

/// Byte offset where a string literal was opened but never closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnterminatedString(pub usize);

pub fn tokenize(line: &str) -> Result<Vec<Token>, UnterminatedString> {
    let bytes = line.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;
        let kind = match bytes[pos] {
            b'(' | b'[' | b'{' => {
                pos += 1;
                Tok::Open(char::from(bytes[start]))
            }
            b')' | b']' | b'}' => {
                pos += 1;
                Tok::Close(char::from(bytes[start]))
            }
            b'-' if bytes.get(pos + 1) == Some(&b'>') => {
                pos += 2;
                Tok::Arrow
            }
            b'&' if bytes.get(pos + 1) == Some(&b'&') => {
                pos += 2;
                Tok::AndAnd
            }
            b'@' => {
                pos += 1;
                Tok::At
            }
            b'=' => {
                pos += 1;
                Tok::Eq
            }
            b'#' => {
                pos += 1;
                Tok::Hash
            }
            b'\'' | b'"' => {
                pos = string_end(bytes, pos).ok_or(UnterminatedString(start))?;
                Tok::Str
            }
            b' ' | b'\t' => {
                while pos < bytes.len() && matches!(bytes[pos], b' ' | b'\t') {
                    pos += 1;
                }
                Tok::Space
            }
            _ => {
                while pos < bytes.len() && !starts_token(bytes, pos) {
                    pos += 1;
                }
                Tok::Text
            }
        };
        tokens.push(Token {
            kind,
            span: start..pos,
        });
    }
    Ok(tokens)
}

fn starts_token(bytes: &[u8], pos: usize) -> bool {
    match bytes[pos] {
        b'(' | b'[' | b'{' | b')' | b']' | b'}' | b'@' | b'=' | b'#' | b'\'' | b'"' | b' '
        | b'\t' => true,
        b'-' => bytes.get(pos + 1) == Some(&b'>'),
        b'&' => bytes.get(pos + 1) == Some(&b'&'),
        _ => false,
    }
}

/// Position just past the literal opened at `start`, honoring triple quotes
/// and backslash escapes.
fn string_end(bytes: &[u8], start: usize) -> Option<usize> {
    let quote = bytes[start];
    let triple = bytes.get(start + 1) == Some(&quote) && bytes.get(start + 2) == Some(&quote);
    let mut pos = if triple { start + 3 } else { start + 1 };
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 2,
            b if b == quote => {
                if !triple {
                    return Some(pos + 1);
                }
                if bytes.get(pos + 1) == Some(&quote) && bytes.get(pos + 2) == Some(&quote) {
                    return Some(pos + 3);
                }
                pos += 1;
            }
            _ => pos += 1,
        }
    }
    None
}

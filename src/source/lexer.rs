//! Python tokenizer.
//!
//! Produces the subset of Python's token stream the outline needs: names,
//! string literals, operators, brackets, and the NEWLINE / INDENT / DEDENT
//! structure. Numbers are kept as opaque tokens. Lexical errors are the ones
//! CPython's tokenizer reports (unterminated strings, unbalanced brackets,
//! inconsistent dedents, stray characters).

use crate::errors::{ErrorReporting, TestgenError};
use crate::source::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Name(String),
    Str(StrLiteral),
    Number,
    Op(&'static str),
    Open(char),
    Close(char),
    Newline,
    Indent,
    Dedent,
    EndMarker,
}

/// A string literal token, body kept verbatim (escapes undecoded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrLiteral {
    pub prefix: String,
    pub body: String,
    /// Line on which the body starts.
    pub line: usize,
    pub triple: bool,
}

impl StrLiteral {
    /// Bytes and f-strings cannot be docstrings.
    pub fn is_text(&self) -> bool {
        !self
            .prefix
            .chars()
            .any(|c| matches!(c, 'b' | 'B' | 'f' | 'F'))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub line: usize,
}

impl Token {
    pub fn is_name(&self, name: &str) -> bool {
        matches!(&self.kind, TokenKind::Name(n) if n == name)
    }

    pub fn is_op(&self, op: &str) -> bool {
        matches!(&self.kind, TokenKind::Op(o) if *o == op)
    }
}

// Longest first so greedy matching picks `**=` over `**`.
const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "->", ":=", "==", "!=", "<=", ">=", "**", "//", "<<", ">>",
    "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "@=", "+", "-", "*", "/", "%", "@", "&", "|",
    "^", "~", "<", ">", "=", ".", ",", ";", ":", "!",
];

const STRING_PREFIXES: &[&str] = &["r", "u", "b", "f", "br", "rb", "fr", "rf"];

pub struct Lexer<'a, R: ErrorReporting> {
    src: &'a str,
    pos: usize,
    line: usize,
    indents: Vec<usize>,
    brackets: Vec<(char, Span)>,
    tokens: Vec<Token>,
    reporter: &'a R,
}

/// Tokenizes a whole module.
pub fn tokenize<R: ErrorReporting>(src: &str, reporter: &R) -> Result<Vec<Token>, TestgenError> {
    Lexer::new(src, reporter).run()
}

impl<'a, R: ErrorReporting> Lexer<'a, R> {
    pub fn new(src: &'a str, reporter: &'a R) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            indents: vec![0],
            brackets: Vec::new(),
            tokens: Vec::new(),
            reporter,
        }
    }

    pub fn run(mut self) -> Result<Vec<Token>, TestgenError> {
        let mut at_line_start = true;

        while self.pos < self.src.len() {
            if at_line_start && self.brackets.is_empty() {
                if !self.indentation()? {
                    continue;
                }
                at_line_start = false;
            }

            let Some(ch) = self.peek() else { break };
            match ch {
                ' ' | '\t' | '\x0c' => self.bump(),
                '#' => self.skip_comment(),
                '\\' => self.continuation()?,
                '\n' => {
                    let start = self.pos;
                    self.bump();
                    if self.brackets.is_empty() {
                        self.push(TokenKind::Newline, Span::new(start, self.pos), self.line);
                        at_line_start = true;
                    }
                    self.line += 1;
                }
                '"' | '\'' => self.string(String::new(), self.pos)?,
                c if c.is_ascii_digit() => self.number(),
                '.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.number(),
                c if is_ident_start(c) => self.name()?,
                '(' | '[' | '{' => {
                    let span = Span::new(self.pos, self.pos + 1);
                    self.bump();
                    self.brackets.push((ch, span));
                    self.push(TokenKind::Open(ch), span, self.line);
                }
                ')' | ']' | '}' => self.close(ch)?,
                _ => self.operator()?,
            }
        }

        self.finish()
    }

    // =====================
    // Line structure
    // =====================

    /// Measures indentation at the start of a logical line. Returns `false`
    /// when the line was blank or comment-only and has been consumed.
    fn indentation(&mut self) -> Result<bool, TestgenError> {
        let start = self.pos;
        let mut column = 0usize;
        while let Some(ch) = self.peek() {
            match ch {
                ' ' => column += 1,
                '\t' => column = (column / 8 + 1) * 8,
                '\x0c' => column = 0,
                _ => break,
            }
            self.bump();
        }

        match self.peek() {
            None => return Ok(false),
            Some('#') => {
                self.skip_comment();
                self.skip_newline();
                return Ok(false);
            }
            Some('\n') => {
                self.skip_newline();
                return Ok(false);
            }
            _ => {}
        }

        let current = *self.indents.last().unwrap_or(&0);
        let span = Span::new(start, self.pos);
        if column > current {
            self.indents.push(column);
            self.push(TokenKind::Indent, span, self.line);
        } else if column < current {
            while self.indents.last().is_some_and(|&level| level > column) {
                self.indents.pop();
                self.push(TokenKind::Dedent, span, self.line);
            }
            if self.indents.last() != Some(&column) {
                return Err(self.reporter.syntax_error(
                    "unindent does not match any outer indentation level",
                    span,
                ));
            }
        }
        Ok(true)
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn skip_newline(&mut self) {
        if self.peek() == Some('\n') {
            self.bump();
            self.line += 1;
        }
    }

    fn continuation(&mut self) -> Result<(), TestgenError> {
        let start = self.pos;
        self.bump();
        if self.peek() == Some('\n') {
            self.bump();
            self.line += 1;
            return Ok(());
        }
        Err(self.reporter.syntax_error(
            "unexpected character after line continuation character",
            Span::new(start, self.pos),
        ))
    }

    fn finish(mut self) -> Result<Vec<Token>, TestgenError> {
        if let Some((open, span)) = self.brackets.last().copied() {
            return Err(self
                .reporter
                .syntax_error(&format!("'{}' was never closed", open), span));
        }

        let end = Span::point(self.src.len());
        let needs_newline = self
            .tokens
            .last()
            .is_some_and(|t| !matches!(t.kind, TokenKind::Newline | TokenKind::Dedent));
        if needs_newline {
            self.push(TokenKind::Newline, end, self.line);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(TokenKind::Dedent, end, self.line);
        }
        self.push(TokenKind::EndMarker, end, self.line);
        Ok(self.tokens)
    }

    // =====================
    // Tokens
    // =====================

    fn name(&mut self) -> Result<(), TestgenError> {
        let src = self.src;
        let start = self.pos;
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }
        let text = &src[start..self.pos];

        if matches!(self.peek(), Some('"' | '\''))
            && STRING_PREFIXES.contains(&text.to_ascii_lowercase().as_str())
        {
            return self.string(text.to_string(), start);
        }

        let kind = TokenKind::Name(text.to_string());
        self.push(kind, Span::new(start, self.pos), self.line);
        Ok(())
    }

    fn number(&mut self) {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' {
                let exponent = matches!(ch, 'e' | 'E');
                self.bump();
                if exponent && matches!(self.peek(), Some('+' | '-')) {
                    self.bump();
                }
            } else {
                break;
            }
        }
        self.push(TokenKind::Number, Span::new(start, self.pos), self.line);
    }

    fn string(&mut self, prefix: String, start: usize) -> Result<(), TestgenError> {
        let start_line = self.line;
        let quote = self.peek().unwrap_or('"');
        let triple = self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote);
        let delimiter = if triple { 3 } else { 1 };
        for _ in 0..delimiter {
            self.bump();
        }
        let body_start = self.pos;

        loop {
            let Some(ch) = self.peek() else {
                let message = if triple {
                    "unterminated triple-quoted string literal"
                } else {
                    "unterminated string literal"
                };
                return Err(self
                    .reporter
                    .syntax_error(message, Span::new(start, self.pos)));
            };

            match ch {
                '\\' => {
                    self.bump();
                    if self.peek() == Some('\n') {
                        self.line += 1;
                    }
                    if self.peek().is_some() {
                        self.bump();
                    }
                }
                '\n' if !triple => {
                    return Err(self
                        .reporter
                        .syntax_error("unterminated string literal", Span::new(start, self.pos)));
                }
                '\n' => {
                    self.line += 1;
                    self.bump();
                }
                c if c == quote => {
                    if !triple {
                        break;
                    }
                    if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                        break;
                    }
                    self.bump();
                }
                _ => self.bump(),
            }
        }

        let body = self.src[body_start..self.pos].to_string();
        for _ in 0..delimiter {
            self.bump();
        }
        let literal = StrLiteral {
            prefix,
            body,
            line: start_line,
            triple,
        };
        self.push(TokenKind::Str(literal), Span::new(start, self.pos), start_line);
        Ok(())
    }

    fn close(&mut self, ch: char) -> Result<(), TestgenError> {
        let span = Span::new(self.pos, self.pos + 1);
        match self.brackets.pop() {
            Some((open, _)) if matching_close(open) == ch => {
                self.bump();
                self.push(TokenKind::Close(ch), span, self.line);
                Ok(())
            }
            Some((open, _)) => Err(self.reporter.syntax_error(
                &format!(
                    "closing parenthesis '{}' does not match opening parenthesis '{}'",
                    ch, open
                ),
                span,
            )),
            None => Err(self
                .reporter
                .syntax_error(&format!("unmatched '{}'", ch), span)),
        }
    }

    fn operator(&mut self) -> Result<(), TestgenError> {
        let rest = &self.src[self.pos..];
        let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) else {
            let ch = self.peek().unwrap_or('?');
            return Err(self.reporter.syntax_error(
                &format!("invalid character '{}'", ch),
                Span::new(self.pos, self.pos + ch.len_utf8()),
            ));
        };
        let start = self.pos;
        self.pos += op.len();
        self.push(TokenKind::Op(op), Span::new(start, self.pos), self.line);
        Ok(())
    }

    // =====================
    // Cursor helpers
    // =====================

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) {
        if let Some(ch) = self.peek() {
            self.pos += ch.len_utf8();
        }
    }

    fn push(&mut self, kind: TokenKind, span: Span, line: usize) {
        self.tokens.push(Token { kind, span, line });
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

fn matching_close(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

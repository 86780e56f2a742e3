//! Recursive-descent parser for one test-case line.
//!
//! ```text
//! line     := group ARROW (compound | simple)
//! compound := group_nonblank tail
//! simple   := result tail
//! tail     := ('@' target '=' value)* ('#' comment)?
//! ```
//!
//! The compound alternative is tried first and falls back to the simple one
//! whenever its right-hand side is not exactly one parenthesized group.

use std::fmt;
use std::ops::Range;

use crate::dsl::token::{tokenize, Tok, Token};

/// Outcome of matching one line against the two forms.
#[derive(Debug, Clone, PartialEq)]
pub enum LineParse<'a> {
    Compound(LineParts<'a>),
    Simple(LineParts<'a>),
    Unmatched(Unmatched),
}

/// Raw slices of a matched line; values are resolved later.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineParts<'a> {
    /// Text between the input parentheses.
    pub inputs: &'a str,
    pub result: &'a str,
    pub checks: Vec<Clause<'a>>,
    /// `&&` segments that have no `=`.
    pub ignored_checks: Vec<&'a str>,
    pub inits: Vec<Clause<'a>>,
    /// `@` clauses that have no `=`.
    pub ignored_inits: Vec<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clause<'a> {
    pub target: &'a str,
    pub value: &'a str,
}

/// Why a line did not match either form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unmatched {
    /// Does not open with `(`; ordinary documentation text.
    Prose,
    UnterminatedString,
    UnbalancedDelimiters,
    MissingArrow,
    MissingResult,
}

impl Unmatched {
    /// Whether the line was plausibly meant as a test case.
    pub fn is_prose(&self) -> bool {
        matches!(self, Unmatched::Prose)
    }
}

impl fmt::Display for Unmatched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unmatched::Prose => f.write_str("not a test case"),
            Unmatched::UnterminatedString => f.write_str("unterminated string literal"),
            Unmatched::UnbalancedDelimiters => f.write_str("unbalanced brackets"),
            Unmatched::MissingArrow => f.write_str("expected '->' after the inputs"),
            Unmatched::MissingResult => f.write_str("expected a result after '->'"),
        }
    }
}

/// Matches a trimmed documentation line.
pub fn parse_line(line: &str) -> LineParse<'_> {
    match LineParser::new(line).and_then(|mut p| p.line()) {
        Ok(parse) => parse,
        Err(reason) => LineParse::Unmatched(reason),
    }
}

#[derive(Default)]
struct Tail<'a> {
    inits: Vec<Clause<'a>>,
    ignored: Vec<&'a str>,
}

struct LineParser<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> LineParser<'a> {
    fn new(text: &'a str) -> Result<Self, Unmatched> {
        if !text.starts_with('(') {
            return Err(Unmatched::Prose);
        }
        let tokens = tokenize(text).map_err(|_| Unmatched::UnterminatedString)?;
        Ok(Self {
            text,
            tokens,
            pos: 0,
        })
    }

    fn line(&mut self) -> Result<LineParse<'a>, Unmatched> {
        let close = self.matching_close(0)?;
        let inputs = self.slice(1, close).trim();
        self.pos = close + 1;
        self.skip_space();
        if self.peek() != Some(Tok::Arrow) {
            return Err(Unmatched::MissingArrow);
        }
        self.pos += 1;
        self.skip_space();

        let rhs = self.pos;
        if let Some(mut parts) = self.compound(rhs)? {
            parts.inputs = inputs;
            return Ok(LineParse::Compound(parts));
        }
        let mut parts = self.simple(rhs)?;
        parts.inputs = inputs;
        Ok(LineParse::Simple(parts))
    }

    /// `None` when the right-hand side is not a single non-blank group
    /// followed only by a valid tail.
    fn compound(&self, start: usize) -> Result<Option<LineParts<'a>>, Unmatched> {
        if self.kind(start) != Some(Tok::Open('(')) {
            return Ok(None);
        }
        let close = self.matching_close(start)?;
        let inner = start + 1..close;
        if self.slice(inner.start, inner.end).trim().is_empty() {
            return Ok(None);
        }
        let Ok(tail) = self.tail(close + 1) else {
            return Ok(None);
        };

        let mut segments = self.split_top_level(inner, Tok::AndAnd).into_iter();
        let result = segments
            .next()
            .map(|r| self.slice(r.start, r.end).trim())
            .unwrap_or_default();
        let mut parts = LineParts {
            result,
            inits: tail.inits,
            ignored_inits: tail.ignored,
            ..LineParts::default()
        };
        for segment in segments {
            match self.clause(segment.clone()) {
                Some(check) => parts.checks.push(check),
                None => parts
                    .ignored_checks
                    .push(self.slice(segment.start, segment.end).trim()),
            }
        }
        Ok(Some(parts))
    }

    fn simple(&self, start: usize) -> Result<LineParts<'a>, Unmatched> {
        let mut stack = Vec::new();
        let mut end = start;
        while let Some(kind) = self.kind(end) {
            match kind {
                Tok::At | Tok::Hash if stack.is_empty() => break,
                Tok::Open(c) => stack.push(c),
                Tok::Close(c) => pop_matching(&mut stack, c)?,
                _ => {}
            }
            end += 1;
        }
        if !stack.is_empty() {
            return Err(Unmatched::UnbalancedDelimiters);
        }
        let result = self.slice(start, end).trim();
        if result.is_empty() {
            return Err(Unmatched::MissingResult);
        }
        let tail = self.tail(end)?;
        Ok(LineParts {
            result,
            inits: tail.inits,
            ignored_inits: tail.ignored,
            ..LineParts::default()
        })
    }

    /// Parses `@target=value` clauses up to the end or a `#` comment.
    /// A clause without `=` is set aside rather than rejecting the line.
    fn tail(&self, start: usize) -> Result<Tail<'a>, Unmatched> {
        let mut tail = Tail::default();
        let mut pos = start;
        loop {
            match self.kind(pos) {
                None | Some(Tok::Hash) => return Ok(tail),
                Some(Tok::Space) => pos += 1,
                Some(Tok::At) => {
                    let clause_start = pos + 1;
                    let mut end = clause_start;
                    let mut stack = Vec::new();
                    while let Some(kind) = self.kind(end) {
                        match kind {
                            Tok::At | Tok::Hash if stack.is_empty() => break,
                            Tok::Open(c) => stack.push(c),
                            Tok::Close(c) => pop_matching(&mut stack, c)?,
                            _ => {}
                        }
                        end += 1;
                    }
                    if !stack.is_empty() {
                        return Err(Unmatched::UnbalancedDelimiters);
                    }
                    match self.clause(clause_start..end) {
                        Some(clause) => tail.inits.push(clause),
                        None => tail.ignored.push(self.slice(clause_start, end).trim()),
                    }
                    pos = end;
                }
                // Anything else after the result belongs to no clause.
                Some(_) => return Err(Unmatched::UnbalancedDelimiters),
            }
        }
    }

    /// Splits `target=value` at the first `=`; the target must be non-blank.
    fn clause(&self, range: Range<usize>) -> Option<Clause<'a>> {
        let eq = range
            .clone()
            .find(|&i| self.kind(i) == Some(Tok::Eq))?;
        let target = self.slice(range.start, eq).trim();
        if target.is_empty() {
            return None;
        }
        Some(Clause {
            target,
            value: self.slice(eq + 1, range.end).trim(),
        })
    }

    fn split_top_level(&self, range: Range<usize>, sep: Tok) -> Vec<Range<usize>> {
        let mut parts = Vec::new();
        let mut depth = 0usize;
        let mut start = range.start;
        for i in range.clone() {
            match self.kind(i) {
                Some(Tok::Open(_)) => depth += 1,
                Some(Tok::Close(_)) => depth = depth.saturating_sub(1),
                Some(kind) if kind == sep && depth == 0 => {
                    parts.push(start..i);
                    start = i + 1;
                }
                _ => {}
            }
        }
        parts.push(start..range.end);
        parts
    }

    /// Index of the token closing the bracket opened at `open`.
    fn matching_close(&self, open: usize) -> Result<usize, Unmatched> {
        let mut stack = Vec::new();
        for i in open..self.tokens.len() {
            match self.tokens[i].kind {
                Tok::Open(c) => stack.push(c),
                Tok::Close(c) => {
                    pop_matching(&mut stack, c)?;
                    if stack.is_empty() {
                        return Ok(i);
                    }
                }
                _ => {}
            }
        }
        Err(Unmatched::UnbalancedDelimiters)
    }

    /// Source text covered by tokens `from..to`.
    fn slice(&self, from: usize, to: usize) -> &'a str {
        let text = self.text;
        if from >= to {
            return "";
        }
        let start = self.tokens[from].span.start;
        let end = self.tokens[to - 1].span.end;
        &text[start..end]
    }

    fn kind(&self, index: usize) -> Option<Tok> {
        self.tokens.get(index).map(|t| t.kind)
    }

    fn peek(&self) -> Option<Tok> {
        self.kind(self.pos)
    }

    fn skip_space(&mut self) {
        while self.peek() == Some(Tok::Space) {
            self.pos += 1;
        }
    }
}

fn pop_matching(stack: &mut Vec<char>, close: char) -> Result<(), Unmatched> {
    let expected = match close {
        ')' => '(',
        ']' => '[',
        _ => '{',
    };
    match stack.pop() {
        Some(open) if open == expected => Ok(()),
        _ => Err(Unmatched::UnbalancedDelimiters),
    }
}

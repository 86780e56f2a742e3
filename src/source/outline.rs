//! Block outline of a Python module.
//!
//! Groups the token stream into logical lines and nests them by INDENT /
//! DEDENT. Only `class` and `def` statements are interpreted; every other
//! compound statement is kept as an anonymous block so classes nested under
//! `if` or `try` are still found.

use crate::errors::{ErrorReporting, TestgenError};
use crate::source::lexer::{StrLiteral, Token, TokenKind};
use crate::source::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Class(ClassDef),
    Function(FunctionDef),
    /// Any other compound statement (`if`, `for`, `with`, ...).
    Compound { line: usize, body: Block },
    /// A simple statement. `strings` is set when it consists solely of
    /// string literals, which is what makes it a docstring candidate.
    Simple {
        line: usize,
        strings: Option<Vec<StrLiteral>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub name: String,
    pub line: usize,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub line: usize,
    pub is_async: bool,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
}

impl Block {
    /// The docstring literals, if the first statement is a text string.
    pub fn docstring(&self) -> Option<&[StrLiteral]> {
        match self.statements.first()? {
            Statement::Simple {
                strings: Some(parts),
                ..
            } if parts.iter().all(StrLiteral::is_text) => Some(parts),
            _ => None,
        }
    }
}

/// Parses a token stream into the module's top-level block.
pub fn parse_module<R: ErrorReporting>(
    tokens: &[Token],
    reporter: &R,
) -> Result<Block, TestgenError> {
    let mut parser = OutlineParser {
        tokens,
        pos: 0,
        reporter,
    };
    let block = parser.block()?;
    match parser.peek().map(|t| &t.kind) {
        Some(TokenKind::EndMarker) | None => Ok(block),
        Some(_) => {
            let span = parser.span();
            Err(reporter.syntax_error("unexpected dedent", span))
        }
    }
}

struct OutlineParser<'a, R: ErrorReporting> {
    tokens: &'a [Token],
    pos: usize,
    reporter: &'a R,
}

impl<'a, R: ErrorReporting> OutlineParser<'a, R> {
    /// Parses statements until a DEDENT or the end of input (neither consumed).
    fn block(&mut self) -> Result<Block, TestgenError> {
        let mut block = Block::default();
        loop {
            match self.peek().map(|t| &t.kind) {
                None | Some(TokenKind::EndMarker) | Some(TokenKind::Dedent) => return Ok(block),
                Some(TokenKind::Indent) => {
                    return Err(self.reporter.syntax_error("unexpected indent", self.span()));
                }
                Some(_) => self.statement(&mut block)?,
            }
        }
    }

    fn statement(&mut self, block: &mut Block) -> Result<(), TestgenError> {
        let line = self.logical_line();
        let Some(first) = line.first() else {
            return Ok(());
        };

        let is_async = first.is_name("async") && line.get(1).is_some_and(|t| t.is_name("def"));
        if first.is_name("class") || first.is_name("def") || is_async {
            return self.definition(line, is_async, block);
        }

        if line.last().is_some_and(|t| t.is_op(":")) {
            let body = self.indented_block(first)?;
            block.statements.push(Statement::Compound {
                line: first.line,
                body,
            });
            return Ok(());
        }

        block.statements.extend(simple_statements(line));
        Ok(())
    }

    fn definition(
        &mut self,
        line: &'a [Token],
        is_async: bool,
        block: &mut Block,
    ) -> Result<(), TestgenError> {
        let keyword_index = usize::from(is_async);
        let keyword = &line[keyword_index];
        let name = match line.get(keyword_index + 1).map(|t| &t.kind) {
            Some(TokenKind::Name(name)) => name.clone(),
            _ => {
                let what = if keyword.is_name("class") {
                    "expected class name"
                } else {
                    "expected function name"
                };
                return Err(self.reporter.syntax_error(what, keyword.span));
            }
        };

        let Some(colon) = header_colon(line) else {
            return Err(self
                .reporter
                .syntax_error("expected ':'", line[line.len() - 1].span));
        };

        let inline = &line[colon + 1..];
        let body = if inline.is_empty() {
            self.indented_block(keyword)?
        } else {
            Block {
                statements: simple_statements(inline),
            }
        };

        let statement = if keyword.is_name("class") {
            Statement::Class(ClassDef {
                name,
                line: line[0].line,
                body,
            })
        } else {
            Statement::Function(FunctionDef {
                name,
                line: line[0].line,
                is_async,
                body,
            })
        };
        block.statements.push(statement);
        Ok(())
    }

    /// Parses the INDENT ... DEDENT body that must follow a header line.
    fn indented_block(&mut self, header: &Token) -> Result<Block, TestgenError> {
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Indent) => self.pos += 1,
            _ => {
                return Err(self.reporter.syntax_error(
                    &format!("expected an indented block after line {}", header.line),
                    self.span(),
                ));
            }
        }
        let body = self.block()?;
        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Dedent)) {
            self.pos += 1;
        }
        Ok(body)
    }

    /// Consumes one logical line and returns its tokens without the NEWLINE.
    fn logical_line(&mut self) -> &'a [Token] {
        let tokens = self.tokens;
        let start = self.pos;
        while let Some(token) = tokens.get(self.pos) {
            match token.kind {
                TokenKind::Newline => {
                    self.pos += 1;
                    return &tokens[start..self.pos - 1];
                }
                TokenKind::EndMarker | TokenKind::Indent | TokenKind::Dedent => break,
                _ => self.pos += 1,
            }
        }
        &tokens[start..self.pos]
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn span(&self) -> Span {
        self.peek().map(|t| t.span).unwrap_or_default()
    }
}

/// Index of the colon ending a `class`/`def` header, at bracket depth zero.
fn header_colon(line: &[Token]) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in line.iter().enumerate() {
        match token.kind {
            TokenKind::Open(_) => depth += 1,
            TokenKind::Close(_) => depth = depth.saturating_sub(1),
            TokenKind::Op(":") if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// Splits a simple line on top-level `;`.
fn simple_statements(line: &[Token]) -> Vec<Statement> {
    let mut statements = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, token) in line.iter().enumerate() {
        match token.kind {
            TokenKind::Open(_) => depth += 1,
            TokenKind::Close(_) => depth = depth.saturating_sub(1),
            TokenKind::Op(";") if depth == 0 => {
                statements.extend(simple_statement(&line[start..i]));
                start = i + 1;
            }
            _ => {}
        }
    }
    statements.extend(simple_statement(&line[start..]));
    statements
}

fn simple_statement(tokens: &[Token]) -> Option<Statement> {
    let first = tokens.first()?;
    let strings = tokens
        .iter()
        .map(|t| match &t.kind {
            TokenKind::Str(s) => Some(s.clone()),
            _ => None,
        })
        .collect::<Option<Vec<_>>>();
    Some(Statement::Simple {
        line: first.line,
        strings,
    })
}

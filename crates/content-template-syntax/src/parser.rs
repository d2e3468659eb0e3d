/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Recursive-descent parser from tokens to the node tree.

use crate::ast::{
    Block, Call, Comment, Content, Decorator, Expr, Hash, HashPair, Mustache, Partial, PathExpr,
    Program, Span, Statement,
};
use crate::error::{SyntaxError, SyntaxResult};
use crate::lexer::{ExprToken, Tag, TagKind, Token, scan, tokenize_expr};

/// Default limit on nested blocks and sub-expressions.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Parse template source into a [`Program`].
///
/// # Errors
/// Returns a [`SyntaxError`] for unclosed tags, unbalanced or mismatched
/// blocks, stray `{{else}}`/`{{/x}}` tags, malformed expressions and nesting
/// deeper than [`DEFAULT_MAX_DEPTH`].
pub fn parse(source: &str) -> SyntaxResult<Program> {
    parse_with_max_depth(source, DEFAULT_MAX_DEPTH)
}

/// Like [`parse`], with an explicit limit on block and sub-expression
/// nesting.
pub fn parse_with_max_depth(source: &str, max_depth: usize) -> SyntaxResult<Program> {
    let tokens = scan(source)?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
        depth: 0,
        max_depth,
    };
    let (program, end) = parser.parse_program(0)?;
    match end {
        Terminator::Eof => Ok(program),
        Terminator::Close(tag) => Err(parser.error(
            tag.span.start,
            format!("Unexpected closing tag {{{{/{}}}}}", tag.body.trim()),
        )),
        Terminator::Else(tag) => Err(parser.error(tag.span.start, "Unexpected {{else}}")),
    }
}

/// How a program body ended.
enum Terminator {
    Eof,
    Close(Tag),
    Else(Tag),
}

/// An opening tag's parsed expression.
struct OpenExpr {
    call: Call,
    block_params: Vec<String>,
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    /// Blocks currently open around the parse position.
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, offset: usize, message: impl Into<String>) -> SyntaxError {
        SyntaxError::at(self.source, offset, message)
    }

    fn too_deep(&self, offset: usize) -> SyntaxError {
        self.error(
            offset,
            format!("Expressions nested deeper than {} levels", self.max_depth),
        )
    }

    /// Run `parse` one nesting level deeper.
    fn nested<T>(
        &mut self,
        offset: usize,
        parse: impl FnOnce(&mut Self) -> SyntaxResult<T>,
    ) -> SyntaxResult<T> {
        if self.depth >= self.max_depth {
            return Err(self.too_deep(offset));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn parse_program(&mut self, start: usize) -> SyntaxResult<(Program, Terminator)> {
        let mut body = Vec::new();
        let mut end = start;

        let terminator = loop {
            let Some(token) = self.next() else {
                break Terminator::Eof;
            };
            let tag = match token {
                Token::Text { text, span } => {
                    end = span.end;
                    body.push(Statement::Content(Content { text, span }));
                    continue;
                }
                Token::Tag(tag) => tag,
            };
            end = tag.span.end;

            match tag.kind {
                TagKind::Close => break Terminator::Close(tag),
                TagKind::Else => break Terminator::Else(tag),
                TagKind::Comment => body.push(Statement::Comment(Comment {
                    text: tag.body,
                    span: tag.span,
                })),
                TagKind::Mustache | TagKind::Raw => {
                    let open = self.parse_open(&tag)?;
                    if !open.block_params.is_empty() {
                        return Err(self.error(tag.span.start, "Block params are only valid on blocks"));
                    }
                    body.push(Statement::Mustache(Mustache {
                        call: open.call,
                        escaped: tag.kind == TagKind::Mustache,
                        span: tag.span,
                    }));
                }
                TagKind::BlockOpen | TagKind::InverseOpen => {
                    let block = self.nested(tag.span.start, |p| p.parse_block(tag))?;
                    end = block.span.end;
                    body.push(Statement::Block(block));
                }
                TagKind::Partial => {
                    let partial = self.parse_partial(&tag, None)?;
                    body.push(Statement::Partial(partial));
                }
                TagKind::PartialBlock => {
                    let (fallback, close) =
                        self.nested(tag.span.start, |p| p.parse_program(tag.span.end))?;
                    let close = self.expect_close(&tag, close, None)?;
                    let mut partial = self.parse_partial(&tag, Some(fallback))?;
                    partial.span.end = close.span.end;
                    end = close.span.end;
                    body.push(Statement::Partial(partial));
                }
                TagKind::Decorator => body.push(Statement::Decorator(Decorator {
                    name: first_word(&tag.body),
                    span: tag.span,
                })),
                TagKind::DecoratorBlock => {
                    let (_, close) = self.nested(tag.span.start, |p| p.parse_program(tag.span.end))?;
                    let close = self.expect_close(&tag, close, None)?;
                    end = close.span.end;
                    body.push(Statement::Decorator(Decorator {
                        name: first_word(&tag.body),
                        span: Span::new(tag.span.start, close.span.end),
                    }));
                }
            }
        };

        Ok((Program::new(body, Span::new(start, end)), terminator))
    }

    fn parse_block(&mut self, open: Tag) -> SyntaxResult<Block> {
        let head = self.parse_open(&open)?;
        let name = head.call.name().to_string();
        let (program, terminator) = self.parse_program(open.span.end)?;

        let (program, inverse, close) = match terminator {
            Terminator::Else(else_tag) => {
                let (inverse, close) = self.parse_else(else_tag, &open, &name)?;
                (program, Some(inverse), close)
            }
            other => {
                let close = self.expect_close(&open, other, Some(&name))?;
                (program, None, close)
            }
        };

        // `{{^name}}` renders its body when the value is falsy.
        let (program, inverse) = if open.kind == TagKind::InverseOpen {
            let empty = Program::new(Vec::new(), Span::new(open.span.end, open.span.end));
            (inverse.unwrap_or(empty), Some(program))
        } else {
            (program, inverse)
        };

        Ok(Block {
            call: head.call,
            block_params: head.block_params,
            program,
            inverse,
            span: Span::new(open.span.start, close.span.end),
        })
    }

    /// Parse what follows `{{else}}` or `{{else helper ...}}` up to the
    /// closing tag of the enclosing block.
    fn parse_else(&mut self, else_tag: Tag, open: &Tag, name: &str) -> SyntaxResult<(Program, Tag)> {
        if else_tag.body.trim().is_empty() {
            let (inverse, terminator) = self.parse_program(else_tag.span.end)?;
            let close = match terminator {
                Terminator::Else(tag) => {
                    return Err(self.error(tag.span.start, "Multiple {{else}} sections in one block"));
                }
                other => self.expect_close(open, other, Some(name))?,
            };
            return Ok((inverse, close));
        }

        // Chained `{{else if x}}`: a nested block sharing the outer close tag.
        let head = self.parse_open(&else_tag)?;
        let (program, terminator) = self.parse_program(else_tag.span.end)?;
        let (inverse, close) = match terminator {
            Terminator::Else(next) => {
                let offset = next.span.start;
                let (inverse, close) = self.nested(offset, |p| p.parse_else(next, open, name))?;
                (Some(inverse), close)
            }
            other => (None, self.expect_close(open, other, Some(name))?),
        };
        let chained = Block {
            call: head.call,
            block_params: head.block_params,
            program,
            inverse,
            span: Span::new(else_tag.span.start, close.span.start),
        };
        let span = chained.span;
        Ok((Program::new(vec![Statement::Block(chained)], span), close))
    }

    fn expect_close(&self, open: &Tag, terminator: Terminator, name: Option<&str>) -> SyntaxResult<Tag> {
        match terminator {
            Terminator::Close(close) => {
                let closing = close.body.trim();
                let expected = match name {
                    Some(name) => name.to_string(),
                    None => first_word(&open.body),
                };
                if closing != expected {
                    return Err(self.error(
                        close.span.start,
                        format!("{} doesn't match {}", expected, closing),
                    ));
                }
                Ok(close)
            }
            Terminator::Else(tag) => Err(self.error(tag.span.start, "Unexpected {{else}}")),
            Terminator::Eof => Err(self.error(
                open.span.start,
                format!("Unclosed block {{{{#{}}}}}", open.body.trim()),
            )),
        }
    }

    fn parse_open(&self, tag: &Tag) -> SyntaxResult<OpenExpr> {
        let tokens = tokenize_expr(self.source, &tag.body, tag.body_start)?;
        if tokens.is_empty() {
            return Err(self.error(tag.span.start, "Empty expression"));
        }
        let mut cursor = ExprCursor {
            parser: self,
            tokens: &tokens,
            pos: 0,
            depth: 0,
        };
        let open = cursor.parse_open_expr()?;
        if let Some(extra) = tokens.get(cursor.pos) {
            return Err(self.error(extra.span().start, "Unexpected token in expression"));
        }
        Ok(open)
    }

    fn parse_partial(&self, tag: &Tag, fallback: Option<Program>) -> SyntaxResult<Partial> {
        let tokens = tokenize_expr(self.source, &tag.body, tag.body_start)?;
        let Some(first) = tokens.first() else {
            return Err(self.error(tag.span.start, "Partial name is missing"));
        };
        let name = match first {
            ExprToken::Word(word, _) | ExprToken::Str(word, _) => word.clone(),
            other => return Err(self.error(other.span().start, "Invalid partial name")),
        };

        let mut cursor = ExprCursor {
            parser: self,
            tokens: &tokens,
            pos: 1,
            depth: 0,
        };
        let mut context = None;
        let mut hash = Hash::default();
        while cursor.pos < tokens.len() {
            if cursor.at_hash_pair() {
                hash.pairs.push(cursor.parse_hash_pair()?);
            } else if context.is_none() && hash.is_empty() {
                context = Some(cursor.parse_expr()?);
            } else {
                let span = tokens[cursor.pos].span();
                return Err(self.error(span.start, "Unexpected token in partial"));
            }
        }

        Ok(Partial {
            name,
            context,
            hash,
            fallback,
            span: tag.span,
        })
    }
}

/// Cursor over the expression tokens of one tag.
struct ExprCursor<'p, 'a> {
    parser: &'p Parser<'a>,
    tokens: &'p [ExprToken],
    pos: usize,
    /// Open sub-expressions.
    depth: usize,
}

impl ExprCursor<'_, '_> {
    fn peek(&self) -> Option<&ExprToken> {
        self.tokens.get(self.pos)
    }

    fn error_here(&self, message: &str) -> SyntaxError {
        let offset = self
            .peek()
            .or_else(|| self.tokens.last())
            .map_or(0, |t| t.span().end);
        self.parser.error(offset, message)
    }

    fn parse_open_expr(&mut self) -> SyntaxResult<OpenExpr> {
        let head = self.parse_expr()?;
        let call = self.parse_call_rest(head, false)?;
        let mut block_params = Vec::new();

        if self.at_block_params() {
            self.pos += 2;
            loop {
                match self.peek() {
                    Some(ExprToken::Word(name, _)) => {
                        block_params.push(name.clone());
                        self.pos += 1;
                    }
                    Some(ExprToken::Pipe(_)) => {
                        self.pos += 1;
                        break;
                    }
                    _ => return Err(self.error_here("Malformed block params")),
                }
            }
        }

        Ok(OpenExpr { call, block_params })
    }

    /// Parse params and hash pairs following `head`.
    fn parse_call_rest(&mut self, head: Expr, in_parens: bool) -> SyntaxResult<Call> {
        let mut params = Vec::new();
        let mut hash = Hash::default();

        loop {
            match self.peek() {
                None => break,
                Some(ExprToken::CloseParen(_)) if in_parens => break,
                Some(ExprToken::CloseParen(_)) => return Err(self.error_here("Unbalanced parenthesis")),
                _ if self.at_block_params() => break,
                _ if self.at_hash_pair() => hash.pairs.push(self.parse_hash_pair()?),
                _ if !hash.is_empty() => {
                    return Err(self.error_here("Positional arguments must precede keyword arguments"));
                }
                _ => params.push(self.parse_expr()?),
            }
        }

        Ok(Call {
            path: head,
            params,
            hash,
        })
    }

    fn at_hash_pair(&self) -> bool {
        matches!(
            (self.tokens.get(self.pos), self.tokens.get(self.pos + 1)),
            (Some(ExprToken::Word(..)), Some(ExprToken::Equals(_)))
        )
    }

    fn at_block_params(&self) -> bool {
        matches!(
            (self.tokens.get(self.pos), self.tokens.get(self.pos + 1)),
            (Some(ExprToken::Word(word, _)), Some(ExprToken::Pipe(_))) if word == "as"
        )
    }

    fn parse_hash_pair(&mut self) -> SyntaxResult<HashPair> {
        let key = match self.peek() {
            Some(ExprToken::Word(word, _)) => word.clone(),
            _ => return Err(self.error_here("Expected keyword argument")),
        };
        self.pos += 2;
        if self.peek().is_none() {
            return Err(self.error_here("Missing keyword argument value"));
        }
        let value = self.parse_expr()?;
        Ok(HashPair { key, value })
    }

    fn parse_expr(&mut self) -> SyntaxResult<Expr> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.error_here("Expected expression"));
        };
        self.pos += 1;
        match token {
            ExprToken::Str(value, _) => Ok(Expr::String(value)),
            ExprToken::Word(word, span) => self.word_expr(&word, span),
            ExprToken::OpenParen(span) => {
                if self.parser.depth + self.depth >= self.parser.max_depth {
                    return Err(self.parser.too_deep(span.start));
                }
                self.depth += 1;
                let head = self.parse_expr()?;
                let call = self.parse_call_rest(head, true)?;
                self.depth -= 1;
                match self.peek() {
                    Some(ExprToken::CloseParen(_)) => {
                        self.pos += 1;
                        Ok(Expr::Sub(Box::new(call)))
                    }
                    _ => Err(self.error_here("Unclosed sub-expression")),
                }
            }
            ExprToken::CloseParen(span) | ExprToken::Equals(span) | ExprToken::Pipe(span) => {
                Err(self.parser.error(span.start, "Unexpected symbol in expression"))
            }
        }
    }

    fn word_expr(&self, word: &str, span: Span) -> SyntaxResult<Expr> {
        match word {
            "true" => return Ok(Expr::Boolean(true)),
            "false" => return Ok(Expr::Boolean(false)),
            "null" => return Ok(Expr::Null),
            "undefined" => return Ok(Expr::Undefined),
            _ => {}
        }
        if let Some(number) = parse_number(word) {
            return Ok(Expr::Number(number));
        }
        parse_path(word, span)
            .map(Expr::Path)
            .map_err(|message| self.parser.error(span.start, message))
    }
}

fn parse_number(word: &str) -> Option<f64> {
    let digits = word.strip_prefix('-').unwrap_or(word);
    let mut seen_dot = false;
    let valid = !digits.is_empty()
        && digits.chars().next().is_some_and(|c| c.is_ascii_digit())
        && !digits.ends_with('.')
        && digits.chars().all(|c| {
            if c == '.' && !seen_dot {
                seen_dot = true;
                true
            } else {
                c.is_ascii_digit()
            }
        });
    if valid { word.parse().ok() } else { None }
}

/// Split a path word into segments.
pub(crate) fn parse_path(word: &str, span: Span) -> Result<PathExpr, String> {
    let (data, body) = match word.strip_prefix('@') {
        Some(rest) => (true, rest),
        None => (false, word),
    };

    let mut parts = Vec::new();
    let mut depth = 0;
    let mut this_scoped = false;

    for (index, segment) in split_segments(body)?.into_iter().enumerate() {
        match segment.as_str() {
            ".." if parts.is_empty() && !this_scoped => depth += 1,
            "." | "this" if index == 0 => this_scoped = true,
            ".." | "." | "this" => {
                return Err(format!("Invalid path: {} - {}", word, segment));
            }
            "" => return Err(format!("Invalid path: {}", word)),
            _ => parts.push(unbracket(&segment)),
        }
    }

    Ok(PathExpr {
        original: word.to_string(),
        parts,
        data,
        depth,
        this_scoped,
        span,
    })
}

fn split_segments(body: &str) -> Result<Vec<String>, String> {
    if body == "." || body == "this" {
        return Ok(vec![body.to_string()]);
    }
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_bracket = false;
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '[' if !in_bracket => {
                in_bracket = true;
                current.push(c);
            }
            ']' if in_bracket => {
                in_bracket = false;
                current.push(c);
            }
            '.' if !in_bracket && current == "." && chars.peek() == Some(&'/') => {
                // `../`
                current.push('.');
            }
            '.' if !in_bracket && current.is_empty() && matches!(chars.peek(), Some('.' | '/')) => {
                current.push('.');
            }
            '.' | '/' if !in_bracket => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if in_bracket {
        return Err(format!("Unterminated path segment: {}", body));
    }
    segments.push(current);
    Ok(segments)
}

fn unbracket(segment: &str) -> String {
    segment
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(segment)
        .to_string()
}

fn first_word(body: &str) -> String {
    body.split_whitespace().next().unwrap_or_default().to_string()
}

/*
 * lexer.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Two-level tokenizer.
//!
//! [`scan`] splits source into literal text and `{{...}}` tags, applying
//! `~` whitespace control. [`tokenize_expr`] then splits the inside of a
//! single tag into expression tokens.

use crate::ast::Span;
use crate::error::{SyntaxError, SyntaxResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagKind {
    Mustache,
    Raw,
    Comment,
    BlockOpen,
    InverseOpen,
    Close,
    Else,
    Partial,
    PartialBlock,
    Decorator,
    DecoratorBlock,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Tag {
    pub kind: TagKind,
    /// Text between the kind marker and the closing braces.
    pub body: String,
    /// Byte offset of `body` in the source.
    pub body_start: usize,
    pub strip_left: bool,
    pub strip_right: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Text { text: String, span: Span },
    Tag(Tag),
}

/// Split template source into text and tag tokens.
pub(crate) fn scan(source: &str) -> SyntaxResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut text_start = 0;
    let mut pos = 0;

    while let Some(found) = source[pos..].find("{{") {
        let open = pos + found;
        let escapes = source[..open]
            .bytes()
            .rev()
            .take_while(|b| *b == b'\\')
            .count();

        if escapes % 2 == 1 {
            // `\{{` is a literal `{{`; `\\{{` is a literal backslash and a tag.
            text.push_str(&source[pos..open - 1]);
            text.push_str("{{");
            pos = open + 2;
            continue;
        }

        text.push_str(&source[pos..open - escapes / 2]);
        if !text.is_empty() {
            tokens.push(Token::Text {
                text: std::mem::take(&mut text),
                span: Span::new(text_start, open),
            });
        }

        let tag = scan_tag(source, open)?;
        pos = tag.span.end;
        text_start = pos;
        tokens.push(Token::Tag(tag));
    }

    text.push_str(&source[pos..]);
    if !text.is_empty() {
        tokens.push(Token::Text {
            text,
            span: Span::new(text_start, source.len()),
        });
    }

    apply_whitespace_control(&mut tokens);
    Ok(tokens)
}

fn scan_tag(source: &str, open: usize) -> SyntaxResult<Tag> {
    let after_open = open + 2;

    if source[after_open..].starts_with("!--") || source[after_open..].starts_with("~!--") {
        let strip_left = source[after_open..].starts_with('~');
        let body_start = after_open + usize::from(strip_left) + 3;
        let end = find_long_comment_end(source, body_start)
            .ok_or_else(|| SyntaxError::at(source, open, "Unterminated comment"))?;
        let (body_end, strip_right) = trim_tilde(source, body_start, end.0);
        let body_end = source[..body_end]
            .strip_suffix("--")
            .map_or(body_end, str::len);
        return Ok(Tag {
            kind: TagKind::Comment,
            body: source[body_start..body_end].to_string(),
            body_start,
            strip_left,
            strip_right,
            span: Span::new(open, end.1),
        });
    }

    let triple = source[after_open..].starts_with('{')
        || source[after_open..].starts_with("~{");
    let closer = if triple { "}}}" } else { "}}" };

    let mut cursor = after_open;
    let strip_left = source[cursor..].starts_with('~');
    if strip_left {
        cursor += 1;
    }

    let kind_char = source[cursor..].chars().next();
    let is_comment = kind_char == Some('!');
    let close = if is_comment {
        source[cursor..].find(closer).map(|i| cursor + i)
    } else {
        find_close(source, cursor, closer)
    }
    .ok_or_else(|| SyntaxError::at(source, open, "Unclosed expression tag"))?;
    let end = close + closer.len();
    let (body_end, strip_right) = trim_tilde(source, cursor, close);

    let (kind, marker_len) = match kind_char {
        Some('{') if triple => (TagKind::Raw, 1),
        Some('!') => (TagKind::Comment, 1),
        Some('#') => match source[cursor + 1..].chars().next() {
            Some('>') => (TagKind::PartialBlock, 2),
            Some('*') => (TagKind::DecoratorBlock, 2),
            _ => (TagKind::BlockOpen, 1),
        },
        Some('/') => (TagKind::Close, 1),
        Some('^') => {
            if source[cursor + 1..body_end].trim().is_empty() {
                (TagKind::Else, 1)
            } else {
                (TagKind::InverseOpen, 1)
            }
        }
        Some('>') => (TagKind::Partial, 1),
        Some('&') => (TagKind::Raw, 1),
        Some('*') => (TagKind::Decorator, 1),
        _ => {
            let inner = source[cursor..body_end].trim_start();
            if inner == "else" || inner.trim_end() == "else" || inner.starts_with("else ") {
                let skipped = source[cursor..body_end].len() - inner.len();
                (TagKind::Else, skipped + 4)
            } else {
                (TagKind::Mustache, 0)
            }
        }
    };

    if triple && kind != TagKind::Raw {
        return Err(SyntaxError::at(source, open, "Malformed triple-stash tag"));
    }

    let body_start = (cursor + marker_len).min(body_end);
    Ok(Tag {
        kind,
        body: source[body_start..body_end].to_string(),
        body_start,
        strip_left,
        strip_right,
        span: Span::new(open, end),
    })
}

/// Returns `(index of the "--" + closing braces, index after them)`.
fn find_long_comment_end(source: &str, from: usize) -> Option<(usize, usize)> {
    let mut search = from;
    while let Some(i) = source[search..].find("--") {
        let at = search + i;
        let rest = &source[at + 2..];
        if rest.starts_with("}}") {
            return Some((at + 2, at + 4));
        }
        if rest.starts_with("~}}") {
            return Some((at + 3, at + 5));
        }
        search = at + 1;
    }
    None
}

/// Drop a trailing `~` from a tag body, reporting whether it was present.
fn trim_tilde(source: &str, start: usize, end: usize) -> (usize, bool) {
    if end > start && source[..end].ends_with('~') {
        (end - 1, true)
    } else {
        (end, false)
    }
}

/// Find `closer`, skipping over quoted string literals.
fn find_close(source: &str, from: usize, closer: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, ch) in source[from..].char_indices() {
        let at = from + i;
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            _ if source[at..].starts_with(closer) => return Some(at),
            _ => {}
        }
    }
    None
}

fn apply_whitespace_control(tokens: &mut Vec<Token>) {
    for i in 0..tokens.len() {
        let (strip_left, strip_right) = match &tokens[i] {
            Token::Tag(tag) => (tag.strip_left, tag.strip_right),
            Token::Text { .. } => continue,
        };
        if strip_left && i > 0 {
            if let Token::Text { text, .. } = &mut tokens[i - 1] {
                let trimmed = text.trim_end().len();
                text.truncate(trimmed);
            }
        }
        if strip_right && i + 1 < tokens.len() {
            if let Token::Text { text, .. } = &mut tokens[i + 1] {
                *text = text.trim_start().to_string();
            }
        }
    }
    tokens.retain(|t| !matches!(t, Token::Text { text, .. } if text.is_empty()));
}

/// A token inside a tag.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ExprToken {
    /// A path, keyword or number, as written.
    Word(String, Span),
    Str(String, Span),
    OpenParen(Span),
    CloseParen(Span),
    Equals(Span),
    Pipe(Span),
}

impl ExprToken {
    pub fn span(&self) -> Span {
        match self {
            ExprToken::Word(_, s)
            | ExprToken::Str(_, s)
            | ExprToken::OpenParen(s)
            | ExprToken::CloseParen(s)
            | ExprToken::Equals(s)
            | ExprToken::Pipe(s) => *s,
        }
    }
}

/// Tokenize the body of a tag. `base` is the body's offset in `source`.
pub(crate) fn tokenize_expr(source: &str, body: &str, base: usize) -> SyntaxResult<Vec<ExprToken>> {
    let mut tokens = Vec::new();
    let mut chars = body.char_indices().peekable();

    while let Some(&(i, ch)) = chars.peek() {
        let at = base + i;
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(ExprToken::OpenParen(Span::new(at, at + 1)));
            }
            ')' => {
                chars.next();
                tokens.push(ExprToken::CloseParen(Span::new(at, at + 1)));
            }
            '=' => {
                chars.next();
                tokens.push(ExprToken::Equals(Span::new(at, at + 1)));
            }
            '|' => {
                chars.next();
                tokens.push(ExprToken::Pipe(Span::new(at, at + 1)));
            }
            '"' | '\'' => {
                chars.next();
                let mut value = String::new();
                let mut closed = None;
                while let Some((j, c)) = chars.next() {
                    if c == '\\' {
                        if let Some((_, next)) = chars.next() {
                            value.push(next);
                        }
                    } else if c == ch {
                        closed = Some(j);
                        break;
                    } else {
                        value.push(c);
                    }
                }
                let end = closed
                    .ok_or_else(|| SyntaxError::at(source, at, "Unterminated string literal"))?;
                tokens.push(ExprToken::Str(value, Span::new(at, base + end + 1)));
            }
            _ => {
                let mut word = String::new();
                let mut end = i;
                let mut in_bracket = false;
                while let Some(&(j, c)) = chars.peek() {
                    if in_bracket {
                        in_bracket = c != ']';
                    } else if c == '[' {
                        in_bracket = true;
                    } else if c.is_whitespace() || matches!(c, '(' | ')' | '=' | '|' | '"' | '\'') {
                        break;
                    }
                    word.push(c);
                    end = j + c.len_utf8();
                    chars.next();
                }
                if in_bracket {
                    return Err(SyntaxError::at(source, at, "Unterminated path segment"));
                }
                tokens.push(ExprToken::Word(word, Span::new(at, base + end)));
            }
        }
    }

    Ok(tokens)
}

/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error type for template syntax.

use thiserror::Error;

/// A malformed expression in template source.
///
/// Syntax errors are always fatal: no partial tree is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Parse error on line {line}, column {column}: {message}")]
pub struct SyntaxError {
    /// Human-readable description of the problem.
    pub message: String,
    /// Byte offset into the source where the problem was detected.
    pub offset: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column number (in characters).
    pub column: usize,
}

impl SyntaxError {
    /// Create an error at `offset`, computing line and column from `source`.
    pub fn at(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let offset = offset.min(source.len());
        let before = &source[..floor_char_boundary(source, offset)];
        let line = before.matches('\n').count() + 1;
        let column = before
            .rsplit_once('\n')
            .map_or(before, |(_, tail)| tail)
            .chars()
            .count()
            + 1;
        Self {
            message: message.into(),
            offset,
            line,
            column,
        }
    }
}

fn floor_char_boundary(source: &str, mut offset: usize) -> usize {
    while offset > 0 && !source.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// Result type for parsing.
pub type SyntaxResult<T> = Result<T, SyntaxError>;

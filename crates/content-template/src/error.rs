/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for template parsing, schema inference and rendering.
//!
//! Only fatal conditions are errors. Missing content and deprecated syntax
//! are reported as [`Diagnostic`](crate::diagnostics::Diagnostic)s instead.

use content_template_syntax::SyntaxError;
use thiserror::Error;

/// Errors that can occur during template operations.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Malformed expression markup.
    #[error("Bad template syntax: {0}")]
    Syntax(#[from] SyntaxError),

    /// A construct the engine refuses to interpret (decorators).
    #[error("Unsupported construct `{construct}` at offset {offset}")]
    UnsupportedConstruct { construct: String, offset: usize },

    /// A helper was invoked without a mandatory keyword argument.
    #[error("Configuration error in `{{{{{helper}}}}}`: {message}")]
    Configuration { helper: String, message: String },

    /// Recursive partial inclusion detected.
    #[error("Recursive partial inclusion detected (depth > {max_depth}): {name}")]
    RecursivePartial { name: String, max_depth: usize },

    /// Missing content in strict mode.
    #[error("Missing data for {placeholder}")]
    MissingData { placeholder: String },

    /// I/O error (reading a template or partial file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TemplateError {
    pub(crate) fn configuration(helper: &str, message: impl Into<String>) -> Self {
        TemplateError::Configuration {
            helper: helper.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

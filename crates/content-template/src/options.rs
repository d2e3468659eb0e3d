/*
 * options.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Compiler configuration.

use serde::{Deserialize, Serialize};

pub use content_template_syntax::DEFAULT_MAX_DEPTH;

/// Default output format for the `date` helper: `Monday, Jan 1, 2024`.
pub const DEFAULT_DATE_FORMAT: &str = "%A, %b %-d, %Y";

/// Default maximum partial nesting depth.
pub const DEFAULT_MAX_PARTIAL_DEPTH: usize = 50;

/// Options controlling parsing and rendering.
///
/// Deserializes from camelCase JSON; absent fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompilerOptions {
    /// Render `{{context:key}}` markers for missing content.
    pub placeholders: bool,
    /// Treat missing content as an error.
    pub strict_mode: bool,
    pub max_partial_depth: usize,
    /// Deepest block or sub-expression nesting accepted by the parser.
    pub max_depth: usize,
    pub date_format: String,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            placeholders: true,
            strict_mode: false,
            max_partial_depth: DEFAULT_MAX_PARTIAL_DEPTH,
            max_depth: DEFAULT_MAX_DEPTH,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

impl CompilerOptions {
    pub fn with_placeholders(mut self, placeholders: bool) -> Self {
        self.placeholders = placeholders;
        self
    }

    pub fn with_strict_mode(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    pub fn with_max_partial_depth(mut self, depth: usize) -> Self {
        self.max_partial_depth = depth;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    /// Parse options from a JSON document.
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }
}

/*
 * diagnostics.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Non-fatal findings collected while parsing and rendering.

use content_template_syntax::Span;
use serde::Serialize;

/// What a diagnostic reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// A referenced value was absent from the content.
    MissingData,
    /// Deprecated syntax was rewritten to its canonical form.
    Deprecation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    #[serde(skip)]
    pub span: Option<Span>,
}

/// Collector for diagnostic messages.
///
/// Every diagnostic is also logged through `tracing` as it is added.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        match diagnostic.kind {
            DiagnosticKind::MissingData => {
                tracing::warn!(detail = %diagnostic.message, "Missing data")
            }
            DiagnosticKind::Deprecation => {
                tracing::warn!(detail = %diagnostic.message, "Deprecated syntax")
            }
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn deprecation_at(&mut self, message: impl Into<String>, span: Span) {
        self.add(Diagnostic {
            kind: DiagnosticKind::Deprecation,
            message: message.into(),
            span: Some(span),
        });
    }

    pub fn missing_data_at(&mut self, message: impl Into<String>, span: Option<Span>) {
        self.add(Diagnostic {
            kind: DiagnosticKind::MissingData,
            message: message.into(),
            span,
        });
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Consume the collector and return the diagnostics, sorted by source location.
    pub fn into_diagnostics(mut self) -> Vec<Diagnostic> {
        self.diagnostics
            .sort_by_key(|diag| diag.span.map_or(0, |span| span.start));
        self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }
}

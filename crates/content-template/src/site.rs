/*
 * site.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Whole-site schema inference.

use std::path::Path;

use walkdir::WalkDir;

use crate::compiler::{TemplateCompiler, template_identity};
use crate::error::TemplateResult;
use crate::schema::{Schema, SectionType};

/// Parse every `.html` template below `root` and fold their schemas.
///
/// Partial files contribute only through the templates that include them.
/// Templates are visited in file-name order, so the result is deterministic.
pub fn scan_site(compiler: &TemplateCompiler, root: &Path) -> TemplateResult<Schema> {
    let mut schema = Schema::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("html")
        {
            continue;
        }

        if template_identity(path).1 == SectionType::Partial {
            continue;
        }
        let parsed = compiler.parse_file(path)?;
        tracing::debug!(
            template = %parsed.name,
            path = %path.display(),
            sections = parsed.schema.len(),
            "Scanned template"
        );
        schema.merge(&parsed.schema);
    }
    Ok(schema)
}

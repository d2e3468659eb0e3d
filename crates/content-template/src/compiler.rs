/*
 * compiler.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The template compiler: helper registry, partials and options in one place.
//!
//! ```
//! use content_template::{SectionType, TemplateCompiler, Value};
//! use serde_json::json;
//!
//! let compiler = TemplateCompiler::new();
//! let parsed = compiler
//!     .parse("home", SectionType::Page, "<h1>{{general.title}}</h1>")
//!     .unwrap();
//! assert!(parsed.schema.get_key("setting:general").is_some());
//!
//! let html = compiler
//!     .render(
//!         "home",
//!         SectionType::Page,
//!         &parsed,
//!         &Value::from(json!({"general": {"title": "Hello"}})),
//!         &Value::Null,
//!     )
//!     .unwrap();
//! assert_eq!(html, "<h1>Hello</h1>");
//! ```

use std::path::Path;

use content_template_syntax::{Program, parse_with_max_depth};

use crate::diagnostics::{Diagnostic, DiagnosticCollector};
use crate::error::TemplateResult;
use crate::helpers::{Helper, HelperRegistry};
use crate::normalize::normalize;
use crate::options::CompilerOptions;
use crate::partials::PartialStore;
use crate::render::Renderer;
use crate::schema::{Schema, SectionType};
use crate::scope::{AliasScope, Binding};
use crate::value::Value;
use crate::walker::SchemaWalker;

/// Result of parsing one template.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTemplate {
    pub name: String,
    pub section_type: SectionType,
    /// Sections and fields this template reads.
    pub schema: Schema,
    /// The normalized node tree, reusable for rendering.
    pub tree: Program,
    pub diagnostics: Vec<Diagnostic>,
}

/// Output of [`TemplateCompiler::render_with_diagnostics`].
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub html: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// A template given as source text or as the result of
/// [`TemplateCompiler::parse`].
///
/// Only normalized trees render correctly, so a bare [`Program`] is not
/// accepted.
#[derive(Debug, Clone, Copy)]
pub enum TemplateSource<'a> {
    Text(&'a str),
    Parsed(&'a ParsedTemplate),
}

impl<'a> From<&'a str> for TemplateSource<'a> {
    fn from(text: &'a str) -> Self {
        TemplateSource::Text(text)
    }
}

impl<'a> From<&'a String> for TemplateSource<'a> {
    fn from(text: &'a String) -> Self {
        TemplateSource::Text(text)
    }
}

impl<'a> From<&'a ParsedTemplate> for TemplateSource<'a> {
    fn from(parsed: &'a ParsedTemplate) -> Self {
        TemplateSource::Parsed(parsed)
    }
}

/// Parses templates into schemas and renders them.
///
/// Helpers and partials are registered at setup (`&mut self`); parsing and
/// rendering take `&self`.
#[derive(Debug)]
pub struct TemplateCompiler {
    registry: HelperRegistry,
    partials: PartialStore,
    options: CompilerOptions,
}

impl Default for TemplateCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateCompiler {
    /// A compiler with the built-in helpers and default options.
    pub fn new() -> Self {
        Self::with_options(CompilerOptions::default())
    }

    pub fn with_options(options: CompilerOptions) -> Self {
        Self {
            registry: HelperRegistry::with_builtins(),
            partials: PartialStore::new(),
            options,
        }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn registry(&self) -> &HelperRegistry {
        &self.registry
    }

    pub fn partials(&self) -> &PartialStore {
        &self.partials
    }

    pub fn register_helper(&mut self, name: impl Into<String>, helper: impl Helper + 'static) {
        self.registry.register(name, helper);
    }

    pub fn register_partial(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.partials.add(name, source);
    }

    /// Register every `_name.html` below `root` as partial `dir/name`.
    pub fn register_partials_from_dir(&mut self, root: &Path) -> TemplateResult<usize> {
        self.partials.load_dir(root)
    }

    /// Parse a template and infer the content it reads.
    ///
    /// The template's own section `(section_type, name)` is always present in
    /// the schema, except for partials.
    pub fn parse(
        &self,
        name: &str,
        section_type: SectionType,
        source: &str,
    ) -> TemplateResult<ParsedTemplate> {
        let mut diagnostics = DiagnosticCollector::new();
        let mut tree = parse_with_max_depth(source, self.options.max_depth)?;
        normalize(&mut tree, &self.registry, &mut diagnostics)?;

        let mut schema = Schema::new();
        if section_type != SectionType::Partial {
            schema.ensure_section(name, section_type);
        }

        let scope = AliasScope::for_template(Some(Binding::new(name, section_type)));
        let mut walker = SchemaWalker {
            registry: &self.registry,
            partials: &self.partials,
            options: &self.options,
            diagnostics: &mut diagnostics,
            depth: 0,
        };
        walker.walk(&mut schema, &tree, &scope)?;
        tracing::debug!(
            template = %name,
            sections = schema.len(),
            "Inferred template schema"
        );

        Ok(ParsedTemplate {
            name: name.to_string(),
            section_type,
            schema,
            tree,
            diagnostics: diagnostics.into_diagnostics(),
        })
    }

    /// Parse a template file. Name and type come from its location.
    pub fn parse_file(&self, path: &Path) -> TemplateResult<ParsedTemplate> {
        let source = std::fs::read_to_string(path)?;
        let (name, section_type) = template_identity(path);
        self.parse(&name, section_type, &source)
    }

    /// Render a template against `context`.
    ///
    /// `side_data` is reachable only through `@name` references.
    pub fn render<'a>(
        &self,
        name: &str,
        section_type: SectionType,
        template: impl Into<TemplateSource<'a>>,
        context: &Value,
        side_data: &Value,
    ) -> TemplateResult<String> {
        self.render_with_diagnostics(name, section_type, template, context, side_data)
            .map(|rendered| rendered.html)
    }

    /// Like [`render`](Self::render), also returning non-fatal diagnostics.
    pub fn render_with_diagnostics<'a>(
        &self,
        name: &str,
        section_type: SectionType,
        template: impl Into<TemplateSource<'a>>,
        context: &Value,
        side_data: &Value,
    ) -> TemplateResult<Rendered> {
        let parsed;
        let (tree, mut diagnostics) = match template.into() {
            TemplateSource::Text(source) => {
                parsed = self.parse(name, section_type, source)?;
                (&parsed.tree, parsed.diagnostics.clone())
            }
            TemplateSource::Parsed(template) => (&template.tree, Vec::new()),
        };

        let mut renderer = Renderer::new(
            &self.registry,
            &self.partials,
            &self.options,
            context,
            side_data,
        );
        let html = renderer.render_program(tree)?;
        diagnostics.extend(renderer.diagnostics.into_diagnostics());
        Ok(Rendered { html, diagnostics })
    }

    /// Read, parse and render a template file.
    pub fn render_file(
        &self,
        path: &Path,
        context: &Value,
        side_data: &Value,
    ) -> TemplateResult<String> {
        let parsed = self.parse_file(path)?;
        self.render(
            &parsed.name,
            parsed.section_type,
            &parsed,
            context,
            side_data,
        )
    }
}

/// Name and section type implied by a template's location.
///
/// `collections/posts.html` is a collection, `_nav.html` and
/// `partials/nav.html` are partials, anything else is a page.
pub fn template_identity(path: &Path) -> (String, SectionType) {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = path
        .parent()
        .and_then(|p| p.file_name())
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();

    let section_type = if parent.ends_with("collections") {
        SectionType::Collection
    } else if name.starts_with(crate::partials::PARTIAL_PREFIX) || parent.ends_with("partials") {
        SectionType::Partial
    } else {
        SectionType::Page
    };
    (name, section_type)
}

/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Schema inference and rendering for content-expression HTML templates.
//!
//! Site authors write plain HTML with embedded expressions:
//!
//! ```html
//! <h1>{{general.title}}</h1>
//! {{#section about}}<p>{{bio}}</p>{{/section}}
//! {{#collection posts limit=3 as |post|}}
//!   <a href="{{post.url}}">{{post.title required=true}}</a>
//! {{else}}
//!   <p>No posts yet.</p>
//! {{/collection}}
//! ```
//!
//! One node tree drives two consumers:
//!
//! - **Schema inference** ([`TemplateCompiler::parse`]) discovers the content
//!   sections (`setting:about`, `collection:posts`) and their fields, so a
//!   storage layer can be built to match.
//! - **Rendering** ([`TemplateCompiler::render`]) evaluates the same tree
//!   against content with identical scoping rules.
//!
//! # Architecture
//!
//! Source text is parsed by `content-template-syntax` into a generic node
//! tree, canonicalized once by a normalization pass, then either walked for
//! the [`Schema`] or rendered. Helpers (`collection`, `section`, `if`, ...)
//! are trait objects in a [`HelperRegistry`]; custom helpers register through
//! the same [`Helper`] trait.
//!
//! Missing content and deprecated syntax are not errors. They are collected
//! as [`Diagnostic`]s and logged through `tracing`.

pub mod compiler;
pub mod diagnostics;
pub mod error;
pub mod expression;
pub mod helpers;
mod normalize;
pub mod options;
pub mod partials;
pub mod render;
pub mod schema;
pub mod scope;
pub mod site;
pub mod value;
mod walker;

// Re-export main types at crate root
pub use compiler::{ParsedTemplate, Rendered, TemplateCompiler, TemplateSource, template_identity};
pub use diagnostics::{Diagnostic, DiagnosticCollector, DiagnosticKind};
pub use error::{TemplateError, TemplateResult};
pub use expression::Leaf;
pub use helpers::{Helper, HelperRegistry};
pub use options::CompilerOptions;
pub use partials::PartialStore;
pub use render::{Frame, HelperCall, escape_html};
pub use schema::{FieldDescriptor, Options, Schema, SectionDescriptor, SectionType};
pub use scope::{AliasScope, Binding};
pub use site::scan_site;
pub use value::{Thunk, Value};

pub use content_template_syntax::{Program, SyntaxError};

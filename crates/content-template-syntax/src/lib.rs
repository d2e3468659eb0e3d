/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Parser for curly-brace content expressions embedded in HTML.
//!
//! Supported syntax:
//!
//! - Output: `{{title}}`, raw output `{{{body}}}` or `{{& body}}`
//! - Paths: `general.title`, `this.name`, `../items`, `@index`, `[odd key]`
//! - Blocks: `{{#helper arg key=value as |x i|}}...{{else}}...{{/helper}}`,
//!   chained `{{else if other}}`, inverted `{{^name}}...{{/name}}`
//! - Sub-expressions: `(eq kind "news")`
//! - Partials: `{{> name ctx key=value}}`, partial blocks `{{#> name}}...{{/name}}`
//! - Comments: `{{! note }}`, `{{!-- may contain }} --}}`
//! - Whitespace control: `{{~name~}}`
//! - Escapes: `\{{literal}}`
//!
//! Decorators (`{{* name}}`) are parsed so that consumers can reject them
//! with a precise location.
//!
//! # Example
//!
//! ```
//! use content_template_syntax::{Statement, parse};
//!
//! let program = parse("<h1>{{title}}</h1>").unwrap();
//! assert!(matches!(program.body[1], Statement::Mustache(_)));
//! ```

pub mod ast;
pub mod error;
mod lexer;
pub mod parser;

pub use ast::{
    Block, Call, Comment, Content, Decorator, Expr, Hash, HashPair, Mustache, Partial, PathExpr,
    Program, Span, Statement,
};
pub use error::{SyntaxError, SyntaxResult};
pub use parser::{DEFAULT_MAX_DEPTH, parse, parse_with_max_depth};

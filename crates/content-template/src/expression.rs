/*
 * expression.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Leaf expressions: the schema-facing view of a path reference.
//!
//! `{{item.title label="Title"}}` becomes a leaf with context `item`, key
//! `title` and options `{"label": "Title"}`. Single-segment paths have an
//! empty context (or `this` when written `this.title`).

use content_template_syntax::{Block, Call, Expr, Hash, PathExpr};
use serde_json::Value as JsonValue;

use crate::schema::Options;

#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    /// The path as written.
    pub original: String,
    pub context: String,
    pub key: String,
    pub options: Options,
    pub is_private: bool,
}

impl Leaf {
    /// Build a leaf from a path and the keyword arguments that accompany it.
    ///
    /// Returns `None` for paths with no segments (`{{this}}`).
    pub fn from_path(path: &PathExpr, hash: &Hash) -> Option<Leaf> {
        let (context, key) = match path.parts.as_slice() {
            [] => return None,
            [only] => {
                let context = if path.this_scoped { "this" } else { "" };
                (context.to_string(), only.clone())
            }
            [first, rest @ ..] => (first.clone(), rest.join(".")),
        };
        Some(Leaf {
            original: path.original.clone(),
            context,
            key,
            options: hash_to_options(hash),
            is_private: path.data,
        })
    }

    /// Leaf for a zero-argument call such as `{{title required=true}}`.
    pub fn from_call(call: &Call) -> Option<Leaf> {
        Self::from_path(call.head_path()?, &call.hash)
    }

    /// Leaf for the first argument of a block, with the block's keywords.
    pub fn from_block(block: &Block) -> Option<Leaf> {
        Self::from_path(block.first_path()?, &block.call.hash)
    }

    /// `{{context:key}}` marker used for missing content.
    pub fn placeholder(&self) -> String {
        let context = if self.context.is_empty() || self.context == "this" {
            crate::scope::GENERAL
        } else {
            &self.context
        };
        format!("{{{{{}:{}}}}}", context, self.key)
    }
}

/// Keyword arguments as JSON options. Path values keep their original text.
pub fn hash_to_options(hash: &Hash) -> Options {
    hash.pairs
        .iter()
        .map(|pair| (pair.key.clone(), expr_to_json(&pair.value)))
        .collect()
}

pub(crate) fn expr_to_json(expr: &Expr) -> JsonValue {
    match expr {
        Expr::String(s) => JsonValue::String(s.clone()),
        Expr::Number(n) => number_to_json(*n),
        Expr::Boolean(b) => JsonValue::Bool(*b),
        Expr::Path(p) => JsonValue::String(p.original.clone()),
        Expr::Sub(call) => JsonValue::String(call.name().to_string()),
        Expr::Null | Expr::Undefined => JsonValue::Null,
    }
}

fn number_to_json(n: f64) -> JsonValue {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        JsonValue::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(JsonValue::Null, JsonValue::Number)
    }
}

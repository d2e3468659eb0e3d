/*
 * helpers/section.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `{{#section about}}{{name}}{{/section}}`
//!
//! Inside the body, unqualified references belong to the section, and the
//! evaluation context is the section's content.

use content_template_syntax::{Block, Expr, Hash};

use super::Helper;
use crate::error::TemplateResult;
use crate::expression::Leaf;
use crate::render::{Frame, HelperCall};
use crate::schema::SectionType;
use crate::scope::Binding;
use crate::value::Value;

#[derive(Debug, Clone, Copy, Default)]
pub struct SectionHelper;

fn is_multiple(hash: &Hash) -> bool {
    match hash.get("multiple") {
        Some(Expr::Boolean(b)) => *b,
        Some(Expr::String(s)) => !s.is_empty() && s != "false",
        Some(Expr::Number(n)) => *n != 0.0,
        _ => false,
    }
}

fn section_type_of(hash: &Hash) -> SectionType {
    if is_multiple(hash) {
        SectionType::Collection
    } else {
        SectionType::Setting
    }
}

impl SectionHelper {
    fn binding(block: &Block) -> Option<Binding> {
        let first = block.first_path()?;
        Some(
            Binding::new(first.original.clone(), section_type_of(&block.call.hash))
                .with_private(first.data),
        )
    }
}

impl Helper for SectionHelper {
    fn run(&self, call: &mut HelperCall<'_, '_>) -> TemplateResult<Value> {
        let content = call.arg(0);
        if !content.is_truthy() && call.has_inverse() {
            return Ok(Value::Html(call.render_inverse()?));
        }

        let items = match content {
            Value::Null => vec![Value::map()],
            Value::List(items) => items,
            other => vec![other],
        };

        let section = call.arg_path(0).map(str::to_string);
        let mut out = String::new();
        for item in items {
            let mut frame = Frame::new()
                .with_context(item.clone())
                .with_block_param(item);
            if let Some(name) = &section {
                frame = frame.with_section(name.clone());
            }
            out.push_str(&call.render_body(frame)?);
        }
        Ok(Value::Html(out))
    }

    fn is_branch(&self) -> bool {
        true
    }

    fn section_type(&self, leaf: &Leaf) -> SectionType {
        let multiple = leaf
            .options
            .get("multiple")
            .is_some_and(|v| v.as_bool() == Some(true) || v.as_str() == Some("true"));
        if multiple {
            SectionType::Collection
        } else {
            SectionType::Setting
        }
    }

    fn block_param(&self, index: usize, block: &Block) -> Option<Binding> {
        if index == 0 { Self::binding(block) } else { None }
    }

    fn body_aliases(&self, block: &Block) -> Vec<(String, Binding)> {
        Self::binding(block)
            .map(|binding| vec![(String::new(), binding)])
            .unwrap_or_default()
    }
}

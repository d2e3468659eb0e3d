/*
 * helpers/collection.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `{{#collection items limit=3 as |item|}}...{{else}}...{{/collection}}`

use content_template_syntax::Block;

use super::{Helper, iterate};
use crate::error::TemplateResult;
use crate::expression::Leaf;
use crate::render::HelperCall;
use crate::schema::SectionType;
use crate::scope::Binding;
use crate::value::Value;

/// Iterates a collection section. The first argument names the section.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionHelper;

impl Helper for CollectionHelper {
    fn run(&self, call: &mut HelperCall<'_, '_>) -> TemplateResult<Value> {
        let mut items: Vec<Value> = call
            .arg(0)
            .into_list()
            .into_iter()
            .filter(Value::is_truthy)
            .collect();

        // Zero, like an absent limit, means every item.
        let limit = call.hash_value("limit").and_then(Value::as_f64);
        if let Some(limit) = limit.filter(|n| *n >= 1.0) {
            items.truncate(limit as usize);
        }

        iterate(call, items, None)
    }

    fn is_branch(&self) -> bool {
        true
    }

    fn section_type(&self, _leaf: &Leaf) -> SectionType {
        SectionType::Collection
    }

    fn block_param(&self, index: usize, block: &Block) -> Option<Binding> {
        if index != 0 {
            return None;
        }
        let first = block.first_path()?;
        Some(Binding::new(first.original.clone(), SectionType::Collection).with_private(first.data))
    }
}

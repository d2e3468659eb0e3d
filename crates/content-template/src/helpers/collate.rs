/*
 * helpers/collate.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `{{#collate posts key="category" default="Other" as |group|}}`
//!
//! Groups items by the distinct values of `key`, rendering the body once per
//! value in first-seen order. Each value is exposed as
//! `{value, name, slug}`, both as the block parameter and under the key's
//! own name (`{{category.name}}`).
//!
//! The first argument names the items as they are, `posts` being the same
//! list `{{#collection posts}}` iterates. It is neither qualified into
//! `general` nor recorded as a field, and collate opens no section.

use content_template_syntax::{Block, Expr};
use heck::ToKebabCase;

use super::Helper;
use crate::error::{TemplateError, TemplateResult};
use crate::render::{Frame, HelperCall};
use crate::scope::Binding;
use crate::value::Value;

const MISSING_KEY: &str = "You must provide a `key` to the `{{collate}}` helper.";

#[derive(Debug, Clone, Copy, Default)]
pub struct CollateHelper;

fn push_distinct(values: &mut Vec<Value>, value: Value) {
    if !values.iter().any(|v| v.deep_eq(&value)) {
        values.push(value);
    }
}

impl Helper for CollateHelper {
    fn run(&self, call: &mut HelperCall<'_, '_>) -> TemplateResult<Value> {
        let key = call
            .hash_value("key")
            .map(Value::to_text)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| TemplateError::configuration("collate", MISSING_KEY))?;
        let default = call.hash_value("default").filter(|v| v.is_truthy()).cloned();

        let source = if call.args().is_empty() {
            call.this()
        } else {
            call.arg(0)
        };

        let mut values = Vec::new();
        for record in source.into_list() {
            let found = record.get(&key).map(|v| v.unwrapped()).unwrap_or_default();
            let found = match found {
                Value::List(items) => items.iter().map(Value::unwrapped).collect(),
                other if other.is_truthy() => vec![other],
                _ => Vec::new(),
            };
            if found.is_empty() && default.is_some() {
                push_distinct(&mut values, Value::Null);
            }
            for value in found {
                push_distinct(&mut values, value);
            }
        }

        let mut out = String::new();
        for value in values {
            let name = if value.is_truthy() {
                value.clone()
            } else {
                default.clone().unwrap_or_default()
            };
            let slug = name.to_text().to_kebab_case();
            let group: Value = [
                ("value", value),
                ("name", name),
                ("slug", Value::String(slug)),
            ]
            .into_iter()
            .collect();
            let frame = Frame::new()
                .with_block_param(group.clone())
                .with_local(key.clone(), group);
            out.push_str(&call.render_body(frame)?);
        }
        Ok(Value::Html(out))
    }

    fn records_args(&self) -> bool {
        false
    }

    fn body_aliases(&self, block: &Block) -> Vec<(String, Binding)> {
        match block.call.hash.get("key") {
            Some(Expr::String(key)) => vec![(key.clone(), Binding::private(key.clone()))],
            _ => Vec::new(),
        }
    }

    fn check(&self, block: &Block) -> TemplateResult<()> {
        if block.call.hash.contains_key("key") {
            Ok(())
        } else {
            Err(TemplateError::configuration("collate", MISSING_KEY))
        }
    }
}

/*
 * helpers/link.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `{{#link cta as |l|}}<a href="{{l.url}}">{{l.name}}</a>{{/link}}`
//!
//! Link content is either a plain URL string or a record
//! `{url, name, page, isActive, isNavigation}`. The inline form
//! `{{link cta}}` prints the URL.

use super::{Helper, render_inverse_or_empty};
use crate::error::TemplateResult;
use crate::expression::Leaf;
use crate::render::{Frame, HelperCall};
use crate::value::Value;

#[derive(Debug, Clone, Copy, Default)]
pub struct LinkHelper;

fn text_of(value: Option<Value>) -> String {
    value.map(|v| v.unwrapped().to_text()).unwrap_or_default()
}

fn flag_of(value: Option<Value>) -> bool {
    value.is_some_and(|v| v.is_truthy())
}

/// Normalize link content to its record form.
pub(crate) fn normalize_link(value: &Value) -> Value {
    let (url, name, page, is_active, is_navigation) = match value.unwrapped() {
        Value::String(url) => (url.clone(), url, Value::Null, false, false),
        record @ Value::Map(_) => {
            let url = text_of(record.get("url"));
            let mut name = text_of(record.get("name"));
            if name.is_empty() {
                name = url.clone();
            }
            (
                url,
                name,
                record.get("page").map(|p| p.unwrapped()).unwrap_or_default(),
                flag_of(record.get("isActive")),
                flag_of(record.get("isNavigation")),
            )
        }
        _ => (String::new(), String::new(), Value::Null, false, false),
    };

    [
        ("url", Value::String(url)),
        ("name", Value::String(name)),
        ("page", page),
        ("isActive", Value::Bool(is_active)),
        ("isNavigation", Value::Bool(is_navigation)),
    ]
    .into_iter()
    .collect()
}

impl Helper for LinkHelper {
    fn run(&self, call: &mut HelperCall<'_, '_>) -> TemplateResult<Value> {
        let link = normalize_link(&call.arg(0));
        let url = text_of(link.get("url"));

        if !call.is_block() {
            return Ok(Value::String(url));
        }

        let name = text_of(link.get("name"));
        if url.is_empty() && name.is_empty() {
            return render_inverse_or_empty(call);
        }

        let body = call.render_body(Frame::new().with_block_param(link))?;
        Ok(Value::Html(body))
    }

    fn is_field(&self) -> bool {
        true
    }

    fn field_type(&self, _leaf: &Leaf) -> Option<String> {
        Some("link".to_string())
    }
}

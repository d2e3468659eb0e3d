/*
 * helpers/each.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `{{#each list as |item index|}}` and `{{#each map as |value key|}}`

use super::{Helper, iterate};
use crate::error::TemplateResult;
use crate::render::HelperCall;
use crate::value::Value;

/// Plain iteration with no schema role.
#[derive(Debug, Clone, Copy, Default)]
pub struct EachHelper;

impl Helper for EachHelper {
    fn run(&self, call: &mut HelperCall<'_, '_>) -> TemplateResult<Value> {
        match call.arg(0) {
            Value::Map(map) => {
                let (keys, values): (Vec<String>, Vec<Value>) = map.into_iter().unzip();
                iterate(call, values, Some(keys))
            }
            other => {
                let items = other.into_list().into_iter().filter(Value::is_truthy).collect();
                iterate(call, items, None)
            }
        }
    }
}

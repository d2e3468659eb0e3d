/*
 * helpers/conditional.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `if` and `unless`, in block and inline (ternary) form.
//!
//! ```text
//! {{#if title}}<h1>{{title}}</h1>{{else}}Untitled{{/if}}
//! <body class="{{if dark "dark" "light"}}">
//! ```

use super::{Helper, gate};
use crate::error::TemplateResult;
use crate::render::HelperCall;
use crate::value::Value;

/// Prefix of values that stand for content that could not be resolved.
pub const UNRESOLVED_MARKER: &str = "data:";

/// Truthiness for conditions: unresolved-content markers are falsy.
fn condition(value: &Value) -> bool {
    match value {
        Value::String(s) if s.starts_with(UNRESOLVED_MARKER) => false,
        other => other.is_truthy(),
    }
}

fn evaluate(call: &mut HelperCall<'_, '_>, holds: bool) -> TemplateResult<Value> {
    if call.is_block() {
        return gate(call, holds);
    }
    Ok(if holds { call.arg(1) } else { call.arg(2) })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IfHelper;

impl Helper for IfHelper {
    fn run(&self, call: &mut HelperCall<'_, '_>) -> TemplateResult<Value> {
        let holds = condition(&call.arg(0));
        evaluate(call, holds)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UnlessHelper;

impl Helper for UnlessHelper {
    fn run(&self, call: &mut HelperCall<'_, '_>) -> TemplateResult<Value> {
        let holds = !condition(&call.arg(0));
        evaluate(call, holds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_marker_is_falsy() {
        assert!(!condition(&Value::from("data:title")));
        assert!(condition(&Value::from("metadata")));
        assert!(!condition(&Value::List(vec![])));
    }
}

/*
 * helpers/eq.rs
 * Copyright (c) 2025 Posit, PBC
 */

use super::{Helper, gate};
use crate::error::TemplateResult;
use crate::render::HelperCall;
use crate::value::Value;

/// `{{#eq a b}}same{{else}}different{{/eq}}`, or `(eq a b)` as a boolean.
#[derive(Debug, Clone, Copy, Default)]
pub struct EqHelper;

impl Helper for EqHelper {
    fn run(&self, call: &mut HelperCall<'_, '_>) -> TemplateResult<Value> {
        let equal = call.arg(0).deep_eq(&call.arg(1));
        if call.is_block() {
            gate(call, equal)
        } else {
            Ok(Value::Bool(equal))
        }
    }
}

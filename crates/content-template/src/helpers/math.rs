/*
 * helpers/math.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `{{math "sum" a b}}`

use super::Helper;
use crate::error::TemplateResult;
use crate::render::HelperCall;
use crate::value::Value;

#[derive(Debug, Clone, Copy, Default)]
pub struct MathHelper;

/// Apply the named operation. Unknown operations yield `None`.
pub(crate) fn apply(method: &str, a: f64, b: f64) -> Option<f64> {
    let result = match method {
        "sum" => a + b,
        "minus" => a - b,
        "mult" => a * b,
        "div" => a / b,
        "mod" => a % b,
        "min" => a.min(b),
        "max" => a.max(b),
        "ceil" => a.ceil(),
        "floor" => a.floor(),
        _ => return None,
    };
    Some(result)
}

impl Helper for MathHelper {
    fn run(&self, call: &mut HelperCall<'_, '_>) -> TemplateResult<Value> {
        let method = call.arg(0).to_text();
        let a = call.arg(1).as_f64().unwrap_or(f64::NAN);
        let b = call.arg(2).as_f64().unwrap_or(f64::NAN);
        match apply(&method, a, b) {
            Some(n) => Ok(Value::Number(n)),
            None => {
                tracing::warn!(method = %method, "Unknown math operation");
                Ok(Value::Null)
            }
        }
    }
}

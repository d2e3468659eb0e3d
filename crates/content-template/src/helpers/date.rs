/*
 * helpers/date.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `{{date published}}` → `Monday, Jan 1, 2024`
//!
//! Accepts RFC 3339 timestamps, naive date-times, `YYYY-MM-DD` dates and
//! epoch milliseconds. The `format` keyword takes a strftime pattern.

use std::fmt::Write;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::Helper;
use crate::error::TemplateResult;
use crate::expression::Leaf;
use crate::render::{Frame, HelperCall};
use crate::value::Value;

#[derive(Debug, Clone, Copy, Default)]
pub struct DateHelper;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse stored date content.
pub(crate) fn parse_date(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Number(ms) => DateTime::from_timestamp_millis(*ms as i64).map(|d| d.naive_utc()),
        Value::String(s) | Value::Html(s) => {
            let s = s.trim();
            if let Ok(date) = DateTime::parse_from_rfc3339(s) {
                return Some(date.naive_local());
            }
            for format in NAIVE_FORMATS {
                if let Ok(date) = NaiveDateTime::parse_from_str(s, format) {
                    return Some(date);
                }
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        }
        _ => None,
    }
}

/// Format with a strftime pattern. Invalid patterns yield `None`.
pub(crate) fn format_date(date: &NaiveDateTime, format: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", date.format(format)).ok()?;
    Some(out)
}

impl Helper for DateHelper {
    fn run(&self, call: &mut HelperCall<'_, '_>) -> TemplateResult<Value> {
        let value = call.arg(0);
        let formatted = if value.is_truthy() {
            let format = call
                .hash_value("format")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| call.options().date_format.clone());
            match parse_date(&value).and_then(|d| format_date(&d, &format)) {
                Some(text) => text,
                None => {
                    tracing::warn!(value = %value.to_text(), format = %format, "Could not format date");
                    value.to_text()
                }
            }
        } else {
            String::new()
        };

        if call.is_block() {
            let body = call.render_body(Frame::new().with_block_param(formatted))?;
            return Ok(Value::Html(body));
        }
        Ok(Value::String(formatted))
    }

    fn is_field(&self) -> bool {
        true
    }

    fn field_type(&self, _leaf: &Leaf) -> Option<String> {
        Some("date".to_string())
    }
}

/*
 * value.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Content values supplied to the renderer.
//!
//! Content is usually loaded from JSON, so [`Value`] mirrors the JSON data
//! model with two additions: [`Value::Html`] marks text that must not be
//! escaped on output, and [`Value::Lazy`] defers computing a value until a
//! template actually reads it.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

/// A value that can be referenced from a template.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Null or missing.
    #[default]
    Null,

    Bool(bool),

    Number(f64),

    /// Plain text, escaped on output.
    String(String),

    /// Pre-rendered markup, emitted verbatim.
    Html(String),

    List(Vec<Value>),

    /// String keys to values, in insertion order.
    Map(IndexMap<String, Value>),

    /// A value computed on first access.
    Lazy(Thunk),
}

/// A deferred value. Forced every time it is read.
#[derive(Clone)]
pub struct Thunk(Arc<dyn Fn() -> Value + Send + Sync>);

impl Thunk {
    pub fn new(f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        Thunk(Arc::new(f))
    }

    pub fn force(&self) -> Value {
        (self.0)()
    }
}

impl fmt::Debug for Thunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Thunk(..)")
    }
}

impl PartialEq for Thunk {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Value {
    /// Wrap a computation as a lazy value.
    pub fn lazy(f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        Value::Lazy(Thunk::new(f))
    }

    pub fn html(markup: impl Into<String>) -> Self {
        Value::Html(markup.into())
    }

    pub fn map() -> Self {
        Value::Map(IndexMap::new())
    }

    /// Force lazy values until a concrete value is reached.
    pub fn resolve(&self) -> Value {
        let mut value = self.clone();
        while let Value::Lazy(thunk) = value {
            value = thunk.force();
        }
        value
    }

    /// Concrete value as seen by helpers: lazies forced and markup turned
    /// back into plain text.
    pub fn unwrapped(&self) -> Value {
        match self.resolve() {
            Value::Html(s) => Value::String(s),
            other => other,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.resolve(), Value::Null)
    }

    pub fn is_html(&self) -> bool {
        matches!(self, Value::Html(_))
    }

    /// Truthiness used by conditionals and iteration filters.
    ///
    /// Empty strings, empty lists, zero, `false` and null are falsy. Maps are
    /// always truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) | Value::Html(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(_) => true,
            Value::Lazy(thunk) => thunk.force().is_truthy(),
        }
    }

    /// Look up a single key. Lists accept numeric indices and `length`.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Value::Map(m) => m.get(key).cloned(),
            Value::List(items) => {
                if key == "length" {
                    return Some(Value::Number(items.len() as f64));
                }
                key.parse::<usize>().ok().and_then(|i| items.get(i).cloned())
            }
            Value::String(s) | Value::Html(s) if key == "length" => {
                Some(Value::Number(s.chars().count() as f64))
            }
            Value::Lazy(thunk) => thunk.force().get(key),
            _ => None,
        }
    }

    /// Get a nested value by path segments.
    pub fn get_path<S: AsRef<str>>(&self, path: &[S]) -> Option<Value> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self.clone());
        };
        self.get(first.as_ref()).and_then(|v| v.get_path(rest))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Html(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric coercion: numbers, numeric strings and booleans.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::String(s) | Value::Html(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Lazy(thunk) => thunk.force().as_f64(),
            _ => None,
        }
    }

    /// Wrap a non-list value in a one-element list. Null becomes empty.
    pub fn into_list(self) -> Vec<Value> {
        match self.resolve() {
            Value::List(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        }
    }

    /// Structural equality that looks through lazy values and treats markup
    /// and plain text with the same characters as equal.
    pub fn deep_eq(&self, other: &Value) -> bool {
        match (self.unwrapped(), other.unwrapped()) {
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(&b).all(|(x, y)| x.deep_eq(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|other| v.deep_eq(other)))
            }
            (a, b) => a == b,
        }
    }

    /// Text emitted when the value is written to the output.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null | Value::Map(_) => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) | Value::Html(s) => s.clone(),
            Value::List(items) => items
                .iter()
                .map(Value::to_text)
                .collect::<Vec<_>>()
                .join(","),
            Value::Lazy(thunk) => thunk.force().to_text(),
        }
    }
}

/// Integral numbers print without a fractional part.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(map: IndexMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Map(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(Value::Bool(true).is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::from("false").is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(Value::Number(-1.0).is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(Value::List(vec![Value::Null]).is_truthy());
        assert!(Value::map().is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(Value::lazy(|| Value::from("x")).is_truthy());
    }

    #[test]
    fn test_get_path() {
        let value = Value::from(json!({"employee": {"salary": 50000, "tags": ["a", "b"]}}));

        assert_eq!(
            value.get_path(&["employee", "salary"]),
            Some(Value::Number(50000.0))
        );
        assert_eq!(
            value.get_path(&["employee", "tags", "1"]),
            Some(Value::from("b"))
        );
        assert_eq!(
            value.get_path(&["employee", "tags", "length"]),
            Some(Value::Number(2.0))
        );
        assert_eq!(value.get_path(&["employee", "name"]), None);
        assert_eq!(value.get_path::<&str>(&[]), Some(value.clone()));
    }

    #[test]
    fn test_get_path_forces_lazy_values() {
        let value: Value = [("about", Value::lazy(|| Value::from(json!({"name": "Ada"}))))]
            .into_iter()
            .collect();
        assert_eq!(value.get_path(&["about", "name"]), Some(Value::from("Ada")));
    }

    #[test]
    fn test_unwrapped() {
        assert_eq!(Value::html("<b>x</b>").unwrapped(), Value::from("<b>x</b>"));
        assert_eq!(Value::lazy(|| Value::Number(3.0)).unwrapped(), Value::Number(3.0));
    }

    #[test]
    fn test_to_text() {
        assert_eq!(Value::Number(3.0).to_text(), "3");
        assert_eq!(Value::Number(2.5).to_text(), "2.5");
        assert_eq!(Value::Bool(false).to_text(), "false");
        assert_eq!(Value::Null.to_text(), "");
        assert_eq!(Value::from(json!(["a", 1])).to_text(), "a,1");
    }

    #[test]
    fn test_deep_eq() {
        let a = Value::from(json!({"x": [1, 2]}));
        let b: Value = [("x", Value::lazy(|| Value::from(json!([1, 2]))))]
            .into_iter()
            .collect();
        assert!(a.deep_eq(&b));
        assert!(Value::html("x").deep_eq(&Value::from("x")));
        assert!(!Value::from("1").deep_eq(&Value::Number(1.0)));
    }

    #[test]
    fn test_into_list() {
        assert_eq!(Value::Null.into_list(), Vec::<Value>::new());
        assert_eq!(Value::from("a").into_list(), vec![Value::from("a")]);
        assert_eq!(
            Value::from(json!([1, 2])).into_list(),
            vec![Value::Number(1.0), Value::Number(2.0)]
        );
    }
}

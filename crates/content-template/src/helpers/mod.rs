/*
 * helpers/mod.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Helper capability registry.
//!
//! A helper is a named implementation of [`Helper`]. Besides rendering
//! (`run`), a helper may describe how its blocks shape the schema: whether a
//! block opens a section (`is_branch`), stands for one typed field
//! (`is_field`), what its block parameters refer to and which mandatory
//! keywords it needs.
//!
//! Custom helpers are registered on the compiler at setup time:
//!
//! ```
//! use content_template::{Helper, HelperCall, TemplateCompiler, TemplateResult, Value};
//!
//! struct Shout;
//!
//! impl Helper for Shout {
//!     fn run(&self, call: &mut HelperCall<'_, '_>) -> TemplateResult<Value> {
//!         Ok(Value::from(call.arg(0).to_text().to_uppercase()))
//!     }
//! }
//!
//! let mut compiler = TemplateCompiler::new();
//! compiler.register_helper("shout", Shout);
//! ```

mod collate;
mod collection;
mod conditional;
mod date;
mod each;
mod eq;
mod link;
mod math;
mod section;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use content_template_syntax::Block;

use crate::error::TemplateResult;
use crate::expression::Leaf;
use crate::render::{Frame, HelperCall};
use crate::schema::SectionType;
use crate::scope::Binding;
use crate::value::Value;

pub use collate::CollateHelper;
pub use collection::CollectionHelper;
pub use conditional::{IfHelper, UNRESOLVED_MARKER, UnlessHelper};
pub use date::DateHelper;
pub use each::EachHelper;
pub use eq::EqHelper;
pub use link::LinkHelper;
pub use math::MathHelper;
pub use section::SectionHelper;

/// A named template helper.
pub trait Helper: Send + Sync {
    /// Produce the helper's output. Block helpers return [`Value::Html`].
    fn run(&self, call: &mut HelperCall<'_, '_>) -> TemplateResult<Value>;

    /// The block opens a schema section named by its first argument.
    fn is_branch(&self) -> bool {
        false
    }

    /// The block stands for one typed field.
    fn is_field(&self) -> bool {
        false
    }

    /// Positional arguments are content references: qualified like any
    /// other path and recorded as fields. Branches name a section instead.
    fn records_args(&self) -> bool {
        !self.is_branch()
    }

    /// Section type for a branch, given the block's leaf.
    fn section_type(&self, _leaf: &Leaf) -> SectionType {
        SectionType::Setting
    }

    /// Field type for a field helper.
    fn field_type(&self, _leaf: &Leaf) -> Option<String> {
        None
    }

    /// What block parameter `index` refers to. `None` makes it private.
    fn block_param(&self, _index: usize, _block: &Block) -> Option<Binding> {
        None
    }

    /// Aliases introduced for the block body besides block parameters.
    fn body_aliases(&self, _block: &Block) -> Vec<(String, Binding)> {
        Vec::new()
    }

    /// Validate mandatory keyword arguments.
    fn check(&self, _block: &Block) -> TemplateResult<()> {
        Ok(())
    }
}

/// Name to helper table.
#[derive(Clone, Default)]
pub struct HelperRegistry {
    helpers: HashMap<String, Arc<dyn Helper>>,
}

impl HelperRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in helper.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("collection", CollectionHelper);
        registry.register("section", SectionHelper);
        registry.register("each", EachHelper);
        registry.register("if", IfHelper);
        registry.register("unless", UnlessHelper);
        registry.register("collate", CollateHelper);
        registry.register("eq", EqHelper);
        registry.register("link", LinkHelper);
        registry.register("date", DateHelper);
        registry.register("math", MathHelper);
        registry
    }

    /// Register a helper, replacing any helper with the same name.
    pub fn register(&mut self, name: impl Into<String>, helper: impl Helper + 'static) {
        self.helpers.insert(name.into(), Arc::new(helper));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Helper> {
        self.helpers.get(name).map(|h| h.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.helpers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for HelperRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HelperRegistry")
            .field("helpers", &self.names())
            .finish()
    }
}

/// Render the body once per item, exposing iteration metadata as data
/// variables and the item (then its index or key) as block parameters.
pub(crate) fn iterate(
    call: &mut HelperCall<'_, '_>,
    items: Vec<Value>,
    keys: Option<Vec<String>>,
) -> TemplateResult<Value> {
    if items.is_empty() {
        return render_inverse_or_empty(call);
    }

    let length = items.len();
    let mut out = String::new();
    for (index, item) in items.iter().enumerate() {
        let mut frame = Frame::new()
            .with_data("index", index)
            .with_data("length", length)
            .with_data("first", index == 0)
            .with_data("last", index + 1 == length)
            .with_data("next", items.get(index + 1).cloned().unwrap_or_default())
            .with_data(
                "prev",
                index
                    .checked_sub(1)
                    .and_then(|i| items.get(i))
                    .cloned()
                    .unwrap_or_default(),
            )
            .with_block_param(item.clone());
        match keys.as_ref().and_then(|k| k.get(index)) {
            Some(key) => {
                frame = frame
                    .with_data("key", key.as_str())
                    .with_block_param(key.as_str());
            }
            None => frame = frame.with_block_param(index),
        }
        out.push_str(&call.render_body(frame)?);
    }
    Ok(Value::Html(out))
}

/// Render the inverse if present, otherwise nothing.
pub(crate) fn render_inverse_or_empty(call: &mut HelperCall<'_, '_>) -> TemplateResult<Value> {
    Ok(Value::Html(call.render_inverse()?))
}

/// Body when `condition` holds, inverse otherwise.
pub(crate) fn gate(call: &mut HelperCall<'_, '_>, condition: bool) -> TemplateResult<Value> {
    if condition {
        Ok(Value::Html(call.render_body(Frame::new())?))
    } else {
        render_inverse_or_empty(call)
    }
}

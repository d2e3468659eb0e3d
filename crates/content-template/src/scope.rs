/*
 * scope.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Alias scopes used during schema inference.
//!
//! While walking a template, every local name (block parameters, the
//! ambient default `""`, the template itself as `"this"`) is bound to the
//! schema section it stands for. Scopes form a parent chain; a child shadows
//! its parent and never mutates it.

use std::rc::Rc;

use content_template_syntax::Block;

use crate::helpers::Helper;
use crate::schema::SectionType;

/// Name of the ambient section for unqualified references.
pub const GENERAL: &str = "general";

/// What a local name refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub section_type: SectionType,
    /// Private bindings are never recorded in the schema.
    pub is_private: bool,
}

impl Binding {
    pub fn new(name: impl Into<String>, section_type: SectionType) -> Self {
        Self {
            name: name.into(),
            section_type,
            is_private: false,
        }
    }

    /// Binding for a name that has no schema counterpart.
    pub fn private(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            section_type: SectionType::Setting,
            is_private: true,
        }
    }

    pub fn with_private(mut self, is_private: bool) -> Self {
        self.is_private = is_private;
        self
    }

    /// The `general` settings section.
    pub fn general() -> Self {
        Self::new(GENERAL, SectionType::Setting)
    }
}

#[derive(Debug, Default)]
struct Frame {
    entries: Vec<(String, Binding)>,
    parent: Option<AliasScope>,
}

/// An immutable, cheaply cloned chain of alias frames.
#[derive(Debug, Clone, Default)]
pub struct AliasScope {
    frame: Rc<Frame>,
}

impl AliasScope {
    pub fn root(entries: impl IntoIterator<Item = (String, Binding)>) -> Self {
        Self {
            frame: Rc::new(Frame {
                entries: entries.into_iter().collect(),
                parent: None,
            }),
        }
    }

    /// Root scope for a template: `""` is `general`, `"this"` is the template.
    pub fn for_template(this: Option<Binding>) -> Self {
        let mut entries = vec![(String::new(), Binding::general())];
        if let Some(this) = this {
            entries.push(("this".to_string(), this));
        }
        Self::root(entries)
    }

    /// Child scope with extra bindings. Returns a clone when there are none.
    pub fn extend(&self, entries: impl IntoIterator<Item = (String, Binding)>) -> Self {
        let entries: Vec<_> = entries.into_iter().collect();
        if entries.is_empty() {
            return self.clone();
        }
        Self {
            frame: Rc::new(Frame {
                entries,
                parent: Some(self.clone()),
            }),
        }
    }

    /// Innermost binding for `token`.
    pub fn lookup(&self, token: &str) -> Option<&Binding> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some((_, binding)) = current.frame.entries.iter().rev().find(|(n, _)| n == token)
            {
                return Some(binding);
            }
            scope = current.frame.parent.as_ref();
        }
        None
    }

    /// `true` when unqualified references resolve to the `general` section.
    pub fn ambient_is_general(&self) -> bool {
        self.lookup("")
            .is_some_and(|b| b.name == GENERAL && !b.is_private)
    }
}

/// Scope for the body of `block`: its block parameters plus whatever aliases
/// the helper introduces.
///
/// Block parameters the helper does not describe are private.
pub(crate) fn block_scope(
    helper: Option<&dyn Helper>,
    block: &Block,
    scope: &AliasScope,
) -> AliasScope {
    let mut entries = Vec::new();
    for (index, name) in block.block_params.iter().enumerate() {
        let binding = helper
            .and_then(|h| h.block_param(index, block))
            .unwrap_or_else(|| Binding::private(name.clone()));
        entries.push((name.clone(), binding));
    }
    if let Some(helper) = helper {
        entries.extend(helper.body_aliases(block));
    }
    scope.extend(entries)
}

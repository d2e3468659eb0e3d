/*
 * partials.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Partial template registration and compilation.
//!
//! Partials are registered as source text. Each is parsed and normalized the
//! first time it is needed, then the tree is memoized for the lifetime of
//! the store.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use content_template_syntax::{Program, parse_with_max_depth};
use walkdir::WalkDir;

use crate::diagnostics::DiagnosticCollector;
use crate::error::TemplateResult;
use crate::helpers::HelperRegistry;
use crate::normalize::normalize;

/// Marker that identifies partial files on disk: `_header.html`.
pub const PARTIAL_PREFIX: char = '_';

#[derive(Debug)]
struct PartialEntry {
    source: String,
    tree: OnceLock<Program>,
}

/// Named partial sources with lazily compiled trees.
#[derive(Debug, Default)]
pub struct PartialStore {
    entries: HashMap<String, PartialEntry>,
}

impl PartialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a partial, replacing any partial with the same name.
    ///
    /// The name should match what templates use: `{{> header}}`.
    pub fn add(&mut self, name: impl Into<String>, source: impl Into<String>) -> &mut Self {
        self.entries.insert(
            name.into(),
            PartialEntry {
                source: source.into(),
                tree: OnceLock::new(),
            },
        );
        self
    }

    /// Create a store with the given partials.
    pub fn with_partials(
        partials: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        let mut store = Self::new();
        for (name, source) in partials {
            store.add(name, source);
        }
        store
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn source(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|e| e.source.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register every `_name.html` file below `root` as `dir/name`.
    ///
    /// Returns the number of partials registered.
    pub fn load_dir(&mut self, root: &Path) -> TemplateResult<usize> {
        let mut count = 0;
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = partial_name(root, entry.path()) else {
                continue;
            };
            let source = std::fs::read_to_string(entry.path())?;
            tracing::debug!(partial = %name, path = %entry.path().display(), "Registering partial");
            self.add(name, source);
            count += 1;
        }
        Ok(count)
    }

    /// The compiled tree for `name`, or `None` when no such partial exists.
    pub(crate) fn tree(
        &self,
        name: &str,
        registry: &HelperRegistry,
        max_depth: usize,
        diagnostics: &mut DiagnosticCollector,
    ) -> TemplateResult<Option<&Program>> {
        let Some(entry) = self.entries.get(name) else {
            return Ok(None);
        };
        if let Some(tree) = entry.tree.get() {
            return Ok(Some(tree));
        }

        tracing::debug!(partial = %name, "Compiling partial");
        let mut tree = parse_with_max_depth(&entry.source, max_depth)?;
        normalize(&mut tree, registry, diagnostics)?;
        Ok(Some(entry.tree.get_or_init(|| tree)))
    }
}

/// Registered name for a partial file, or `None` if `path` is not one.
///
/// `root/nav/_menu.html` is named `nav/menu`.
pub fn partial_name(root: &Path, path: &Path) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some("html") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?.strip_prefix(PARTIAL_PREFIX)?;
    let relative = path.strip_prefix(root).ok()?;

    let mut segments: Vec<String> = relative
        .parent()
        .into_iter()
        .flat_map(|dir| dir.components())
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    segments.push(stem.to_string());
    Some(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::DEFAULT_MAX_DEPTH;
    use std::path::PathBuf;

    #[test]
    fn test_partial_name() {
        let root = PathBuf::from("/site");
        assert_eq!(
            partial_name(&root, &root.join("_header.html")).as_deref(),
            Some("header")
        );
        assert_eq!(
            partial_name(&root, &root.join("nav").join("_menu.html")).as_deref(),
            Some("nav/menu")
        );
        assert_eq!(partial_name(&root, &root.join("index.html")), None);
        assert_eq!(partial_name(&root, &root.join("_notes.txt")), None);
    }

    #[test]
    fn test_tree_is_memoized() {
        let store = PartialStore::with_partials([("card", "<p>{{title}}</p>")]);
        let registry = HelperRegistry::with_builtins();
        let mut diagnostics = DiagnosticCollector::new();

        let first = store
            .tree("card", &registry, DEFAULT_MAX_DEPTH, &mut diagnostics)
            .unwrap()
            .unwrap();
        let second = store
            .tree("card", &registry, DEFAULT_MAX_DEPTH, &mut diagnostics)
            .unwrap()
            .unwrap();
        assert!(std::ptr::eq(first, second));
        // Only the first compilation reports the deprecated bare reference.
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_unknown_partial() {
        let store = PartialStore::new();
        let registry = HelperRegistry::with_builtins();
        let mut diagnostics = DiagnosticCollector::new();
        let tree = store.tree("missing", &registry, DEFAULT_MAX_DEPTH, &mut diagnostics);
        assert!(tree.unwrap().is_none());
    }

    #[test]
    fn test_syntax_error_in_partial() {
        let store = PartialStore::with_partials([("bad", "{{#if x}}")]);
        let registry = HelperRegistry::with_builtins();
        let mut diagnostics = DiagnosticCollector::new();
        assert!(store.tree("bad", &registry, DEFAULT_MAX_DEPTH, &mut diagnostics).is_err());
    }
}

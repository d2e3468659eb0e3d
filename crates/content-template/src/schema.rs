/*
 * schema.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The inferred content schema.
//!
//! A [`Schema`] maps `"{type}:{name}"` keys (lower-cased) to section
//! descriptors. Each section lists the fields templates read from it,
//! together with the keyword options given where those fields were
//! referenced. Serialized form:
//!
//! ```json
//! {
//!   "collection:items": {
//!     "name": "items",
//!     "type": "collection",
//!     "options": {"limit": 3},
//!     "fields": {
//!       "title": {"key": "title", "type": "text", "isPrivate": false}
//!     }
//!   }
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Keyword options attached to a section or field.
pub type Options = IndexMap<String, JsonValue>;

/// Field type used when no helper or option says otherwise.
pub const DEFAULT_FIELD_TYPE: &str = "text";

/// Kind of top-level content section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    Setting,
    Collection,
    Page,
    Form,
    Partial,
}

impl SectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionType::Setting => "setting",
            SectionType::Collection => "collection",
            SectionType::Page => "page",
            SectionType::Form => "form",
            SectionType::Partial => "partial",
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "setting" => Ok(SectionType::Setting),
            "collection" => Ok(SectionType::Collection),
            "page" => Ok(SectionType::Page),
            "form" => Ok(SectionType::Form),
            "partial" => Ok(SectionType::Partial),
            other => Err(format!("Unknown section type: {}", other)),
        }
    }
}

/// One field read by templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub key: String,
    #[serde(rename = "type", default = "default_field_type")]
    pub field_type: String,
    #[serde(flatten)]
    pub options: Options,
    #[serde(default)]
    pub is_private: bool,
}

fn default_field_type() -> String {
    DEFAULT_FIELD_TYPE.to_string()
}

impl FieldDescriptor {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            field_type: default_field_type(),
            options: Options::new(),
            is_private: false,
        }
    }

    /// Fold options from another reference to this field.
    ///
    /// Later values win. A string `type` option replaces the field type.
    pub fn merge_options(&mut self, options: &Options) {
        for (key, value) in options {
            match key.as_str() {
                "type" => {
                    if let Some(ty) = value.as_str() {
                        self.field_type = ty.to_string();
                    }
                }
                "key" | "isPrivate" => {}
                _ => {
                    self.options.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

/// A top-level content section and the fields read from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub section_type: SectionType,
    #[serde(default)]
    pub options: Options,
    #[serde(default)]
    pub fields: IndexMap<String, FieldDescriptor>,
}

impl SectionDescriptor {
    pub fn new(name: impl Into<String>, section_type: SectionType) -> Self {
        Self {
            name: name.into(),
            section_type,
            options: Options::new(),
            fields: IndexMap::new(),
        }
    }

    pub fn key(&self) -> String {
        Schema::section_key(self.section_type, &self.name)
    }

    /// Later values win.
    pub fn merge_options(&mut self, options: &Options) {
        for (key, value) in options {
            self.options.insert(key.clone(), value.clone());
        }
    }

    /// Add a field, or fold options into an existing one.
    pub fn add_field(&mut self, key: &str, options: &Options) -> &mut FieldDescriptor {
        let field = self
            .fields
            .entry(key.to_string())
            .or_insert_with(|| FieldDescriptor::new(key));
        field.merge_options(options);
        field
    }

    /// Fold another descriptor for the same section into this one.
    pub fn merge(&mut self, other: &SectionDescriptor) {
        if self.name.is_empty() {
            self.name = other.name.clone();
        }
        self.merge_options(&other.options);
        for (key, field) in &other.fields {
            let merged = self.add_field(key, &field.options);
            if field.field_type != DEFAULT_FIELD_TYPE {
                merged.field_type = field.field_type.clone();
            }
            merged.is_private |= field.is_private;
        }
    }
}

/// Sections keyed by `"{type}:{name}"`, lower-cased, in discovery order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    pub sections: IndexMap<String, SectionDescriptor>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section_key(section_type: SectionType, name: &str) -> String {
        format!("{}:{}", section_type, name).to_lowercase()
    }

    pub fn get(&self, section_type: SectionType, name: &str) -> Option<&SectionDescriptor> {
        self.sections.get(&Self::section_key(section_type, name))
    }

    /// Look up a section by its full key, e.g. `"setting:general"`.
    pub fn get_key(&self, key: &str) -> Option<&SectionDescriptor> {
        self.sections.get(&key.to_lowercase())
    }

    pub fn contains(&self, section_type: SectionType, name: &str) -> bool {
        self.get(section_type, name).is_some()
    }

    /// Get or create the section for `(section_type, name)`.
    pub fn ensure_section(
        &mut self,
        name: &str,
        section_type: SectionType,
    ) -> &mut SectionDescriptor {
        self.sections
            .entry(Self::section_key(section_type, name))
            .or_insert_with(|| SectionDescriptor::new(name, section_type))
    }

    /// Record a field on a section, creating the section if needed.
    pub fn add_field(
        &mut self,
        section: &str,
        section_type: SectionType,
        key: &str,
        options: &Options,
    ) -> &mut FieldDescriptor {
        self.ensure_section(section, section_type)
            .add_field(key, options)
    }

    /// Fold another schema into this one, as when combining every template
    /// of a site.
    pub fn merge(&mut self, other: &Schema) {
        for (key, section) in &other.sections {
            match self.sections.get_mut(key) {
                Some(existing) => existing.merge(section),
                None => {
                    self.sections.insert(key.clone(), section.clone());
                }
            }
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SectionDescriptor)> {
        self.sections.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }
}

/*
 * walker.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Schema inference over a normalized node tree.
//!
//! Every path reference becomes a field of the section its context resolves
//! to; branch helpers (`section`, `collection`) open sections of their own.
//! Partials are walked in place, as if their body were part of the template.

use content_template_syntax::{Block, Call, Expr, Partial, Program, Statement};

use crate::diagnostics::DiagnosticCollector;
use crate::error::{TemplateError, TemplateResult};
use crate::expression::Leaf;
use crate::helpers::{Helper, HelperRegistry};
use crate::options::CompilerOptions;
use crate::partials::PartialStore;
use crate::schema::{Schema, SectionType};
use crate::scope::{AliasScope, Binding, GENERAL, block_scope};

pub(crate) struct SchemaWalker<'a> {
    pub(crate) registry: &'a HelperRegistry,
    pub(crate) partials: &'a PartialStore,
    pub(crate) options: &'a CompilerOptions,
    pub(crate) diagnostics: &'a mut DiagnosticCollector,
    pub(crate) depth: usize,
}

impl SchemaWalker<'_> {
    pub(crate) fn walk(
        &mut self,
        schema: &mut Schema,
        program: &Program,
        scope: &AliasScope,
    ) -> TemplateResult<()> {
        for statement in &program.body {
            self.statement(schema, statement, scope)?;
        }
        Ok(())
    }

    fn statement(
        &mut self,
        schema: &mut Schema,
        statement: &Statement,
        scope: &AliasScope,
    ) -> TemplateResult<()> {
        match statement {
            Statement::Content(_) | Statement::Comment(_) => Ok(()),
            Statement::Mustache(mustache) => {
                self.call(schema, &mustache.call, scope);
                Ok(())
            }
            Statement::Block(block) => self.block(schema, block, scope),
            Statement::Partial(partial) => self.partial(schema, partial, scope),
            Statement::Decorator(decorator) => Err(TemplateError::UnsupportedConstruct {
                construct: format!("decorator `{}`", decorator.name),
                offset: decorator.span.start,
            }),
        }
    }

    fn call(&mut self, schema: &mut Schema, call: &Call, scope: &AliasScope) {
        if !call.params.is_empty() {
            for param in &call.params {
                self.expr(schema, param, scope);
            }
            let field = call.params[0]
                .as_path()
                .and_then(|path| Leaf::from_path(path, &call.hash));
            if let Some(helper) = self.registry.get(call.name()) {
                add_field_leaf(schema, helper, field, scope);
            }
            return;
        }
        if self.registry.contains(call.name()) {
            return;
        }
        if let Some(leaf) = Leaf::from_call(call) {
            add_to_tree(schema, &leaf, scope);
        }
    }

    fn expr(&mut self, schema: &mut Schema, expr: &Expr, scope: &AliasScope) {
        match expr {
            Expr::Path(path) => {
                if let Some(leaf) = Leaf::from_path(path, &Default::default()) {
                    add_to_tree(schema, &leaf, scope);
                }
            }
            Expr::Sub(call) => self.call(schema, call, scope),
            _ => {}
        }
    }

    fn block(&mut self, schema: &mut Schema, block: &Block, scope: &AliasScope) -> TemplateResult<()> {
        let registry = self.registry;
        let helper = registry.get(block.name());
        if let Some(helper) = helper {
            helper.check(block)?;
        }

        if helper.is_none_or(|h| h.records_args()) {
            for param in &block.call.params {
                self.expr(schema, param, scope);
            }
        }

        if let Some(helper) = helper {
            add_field_leaf(schema, helper, Leaf::from_block(block), scope);
        }

        if let Some(helper) = helper.filter(|h| h.is_branch()) {
            ensure_branch(schema, block, helper);
        }

        let child = block_scope(helper, block, scope);
        self.walk(schema, &block.program, &child)?;
        if let Some(inverse) = &block.inverse {
            self.walk(schema, inverse, &child)?;
        }
        Ok(())
    }

    fn partial(
        &mut self,
        schema: &mut Schema,
        partial: &Partial,
        scope: &AliasScope,
    ) -> TemplateResult<()> {
        let partials = self.partials;
        let tree = partials.tree(
            &partial.name,
            self.registry,
            self.options.max_depth,
            self.diagnostics,
        )?;
        if let Some(tree) = tree {
            if self.depth >= self.options.max_partial_depth {
                return Err(TemplateError::RecursivePartial {
                    name: partial.name.clone(),
                    max_depth: self.options.max_partial_depth,
                });
            }
            tracing::debug!(partial = %partial.name, depth = self.depth, "Walking partial");
            let partial_scope = AliasScope::for_template(scope.lookup("this").cloned());
            self.depth += 1;
            let result = self.walk(schema, tree, &partial_scope);
            self.depth -= 1;
            result?;
        }
        if let Some(fallback) = &partial.fallback {
            self.walk(schema, fallback, scope)?;
        }
        Ok(())
    }
}

/// Record the argument of a field helper with the helper's field type.
fn add_field_leaf(schema: &mut Schema, helper: &dyn Helper, leaf: Option<Leaf>, scope: &AliasScope) {
    let Some(mut leaf) = leaf.filter(|_| helper.is_field()) else {
        return;
    };
    if let Some(field_type) = helper.field_type(&leaf) {
        leaf.options
            .insert("type".to_string(), serde_json::Value::String(field_type));
    }
    add_to_tree(schema, &leaf, scope);
}

/// Register the section a branch block opens.
fn ensure_branch(schema: &mut Schema, block: &Block, helper: &dyn Helper) {
    let Some(leaf) = Leaf::from_block(block) else {
        return;
    };
    if leaf.is_private {
        return;
    }
    let name = if leaf.context.is_empty() {
        &leaf.key
    } else {
        &leaf.context
    };
    let section_type = helper.section_type(&leaf);
    schema
        .ensure_section(name, section_type)
        .merge_options(&leaf.options);
}

/// Record `leaf` as a field of the section its context refers to.
pub(crate) fn add_to_tree(schema: &mut Schema, leaf: &Leaf, scope: &AliasScope) {
    if leaf.is_private {
        return;
    }
    let alias = scope.lookup(&leaf.context);
    if alias.is_some_and(|a| a.is_private) {
        return;
    }
    // A bare block parameter is the item itself, not a field of it.
    if leaf.context.is_empty() && scope.lookup(&leaf.key).is_some() {
        return;
    }

    let (name, section_type) = match alias {
        Some(Binding {
            name, section_type, ..
        }) => (name.as_str(), *section_type),
        None if leaf.context.is_empty() => (GENERAL, SectionType::Setting),
        None => (leaf.context.as_str(), SectionType::Setting),
    };
    schema.add_field(name, section_type, &leaf.key, &leaf.options);
}

#[cfg(test)]
mod tests {
    use super::*;
    use content_template_syntax::{Hash, PathExpr, Span};

    fn leaf(path: &str) -> Leaf {
        let mut path_expr = PathExpr::simple(path.trim_start_matches('@'), Span::default());
        path_expr.data = path.starts_with('@');
        Leaf::from_path(&path_expr, &Hash::default()).unwrap()
    }

    #[test]
    fn test_fallback_to_context_name() {
        let mut schema = Schema::new();
        add_to_tree(&mut schema, &leaf("about.name"), &AliasScope::for_template(None));
        assert!(schema.get(SectionType::Setting, "about").unwrap().fields.contains_key("name"));
    }

    #[test]
    fn test_alias_resolves_section() {
        let scope = AliasScope::for_template(None)
            .extend([("item".to_string(), Binding::new("items", SectionType::Collection))]);
        let mut schema = Schema::new();
        add_to_tree(&mut schema, &leaf("item.title"), &scope);
        assert!(schema.contains(SectionType::Collection, "items"));
    }

    #[test]
    fn test_private_leaves_are_skipped() {
        let scope = AliasScope::for_template(None)
            .extend([("tag".to_string(), Binding::private("tag"))]);
        let mut schema = Schema::new();
        add_to_tree(&mut schema, &leaf("@index"), &scope);
        add_to_tree(&mut schema, &leaf("tag"), &scope);
        add_to_tree(&mut schema, &leaf("tag.name"), &scope);
        assert!(schema.is_empty());
    }

    #[test]
    fn test_unqualified_leaf_uses_ambient() {
        let scope = AliasScope::for_template(None)
            .extend([(String::new(), Binding::new("about", SectionType::Setting))]);
        let mut schema = Schema::new();
        add_to_tree(&mut schema, &leaf("name"), &scope);
        assert!(schema.get(SectionType::Setting, "about").unwrap().fields.contains_key("name"));
    }
}

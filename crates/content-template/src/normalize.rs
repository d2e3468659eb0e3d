/*
 * normalize.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Canonicalizing rewrites applied once to every parsed tree.
//!
//! Both the schema walker and the renderer consume the normalized tree, so
//! they always agree on what a reference means. Rewrites, in order:
//!
//! 1. `{{_secret}}` becomes `{{@secret}}` (deprecated private prefix).
//! 2. `{{#about}}...{{/about}}`, a parameterless block that names no
//!    helper, becomes `{{#section about}}...{{/section}}`.
//! 3. `{{title}}`, unqualified in the `general` ambient, not bound to an
//!    alias and not a helper name, becomes `{{general.title}}` (deprecated).
//!    Arguments of block helpers that do not record them (`collection`,
//!    `section`, `collate`) are left alone.
//!
//! References rewritten by rule 1 are private and never reach rule 3.

use content_template_syntax::{Block, Call, Expr, PathExpr, Program, Statement};

use crate::diagnostics::DiagnosticCollector;
use crate::error::{TemplateError, TemplateResult};
use crate::helpers::HelperRegistry;
use crate::scope::{AliasScope, GENERAL, block_scope};

/// Normalize `program` in place.
pub(crate) fn normalize(
    program: &mut Program,
    registry: &HelperRegistry,
    diagnostics: &mut DiagnosticCollector,
) -> TemplateResult<()> {
    let mut normalizer = Normalizer {
        registry,
        diagnostics,
    };
    normalizer.program(program, &AliasScope::for_template(None))
}

struct Normalizer<'a> {
    registry: &'a HelperRegistry,
    diagnostics: &'a mut DiagnosticCollector,
}

impl Normalizer<'_> {
    fn program(&mut self, program: &mut Program, scope: &AliasScope) -> TemplateResult<()> {
        for statement in &mut program.body {
            self.statement(statement, scope)?;
        }
        Ok(())
    }

    fn statement(&mut self, statement: &mut Statement, scope: &AliasScope) -> TemplateResult<()> {
        match statement {
            Statement::Content(_) | Statement::Comment(_) => {}
            Statement::Mustache(mustache) => self.call(&mut mustache.call, scope),
            Statement::Block(block) => self.block(block, scope)?,
            Statement::Partial(partial) => {
                if let Some(context) = &mut partial.context {
                    self.privatize_expr(context);
                }
                for pair in &mut partial.hash.pairs {
                    self.privatize_expr(&mut pair.value);
                }
                if let Some(fallback) = &mut partial.fallback {
                    self.program(fallback, scope)?;
                }
            }
            Statement::Decorator(decorator) => {
                return Err(TemplateError::UnsupportedConstruct {
                    construct: format!("decorator `{}`", decorator.name),
                    offset: decorator.span.start,
                });
            }
        }
        Ok(())
    }

    fn call(&mut self, call: &mut Call, scope: &AliasScope) {
        if let Some(head) = call.head_path_mut() {
            self.privatize(head);
        }
        if call.params.is_empty() {
            let is_helper = self.registry.contains(call.name());
            if let Some(head) = call.head_path_mut().filter(|_| !is_helper) {
                self.qualify(head, scope);
            }
        } else {
            for param in &mut call.params {
                self.expr(param, scope);
            }
        }
        for pair in &mut call.hash.pairs {
            self.privatize_expr(&mut pair.value);
        }
    }

    fn expr(&mut self, expr: &mut Expr, scope: &AliasScope) {
        match expr {
            Expr::Path(path) => {
                self.privatize(path);
                self.qualify(path, scope);
            }
            Expr::Sub(call) => self.call(call, scope),
            _ => {}
        }
    }

    fn block(&mut self, block: &mut Block, scope: &AliasScope) -> TemplateResult<()> {
        if let Some(head) = block.call.head_path_mut() {
            self.privatize(head);
        }
        for param in &mut block.call.params {
            self.privatize_expr(param);
        }

        let implicit_section = block.call.params.is_empty() && !self.registry.contains(block.name());
        if let Some(head) = block.call.head_path().cloned().filter(|_| implicit_section) {
            tracing::debug!(name = %head.original, "Treating parameterless block as a section");
            block.call.path = Expr::Path(PathExpr::simple("section", head.span));
            block.call.params.push(Expr::Path(head));
        }

        let registry = self.registry;
        let helper = registry.get(block.name());
        if helper.is_none_or(|h| h.records_args()) {
            for param in &mut block.call.params {
                self.expr(param, scope);
            }
        }

        let child = block_scope(helper, block, scope);
        self.program(&mut block.program, &child)?;
        if let Some(inverse) = &mut block.inverse {
            self.program(inverse, &child)?;
        }
        Ok(())
    }

    fn privatize_expr(&mut self, expr: &mut Expr) {
        match expr {
            Expr::Path(path) => self.privatize(path),
            Expr::Sub(call) => {
                if let Some(head) = call.head_path_mut() {
                    self.privatize(head);
                }
                for param in &mut call.params {
                    self.privatize_expr(param);
                }
                for pair in &mut call.hash.pairs {
                    self.privatize_expr(&mut pair.value);
                }
            }
            _ => {}
        }
    }

    /// `_name` → `@name`
    fn privatize(&mut self, path: &mut PathExpr) {
        if path.data || path.depth > 0 || path.this_scoped {
            return;
        }
        let renamed = match path.original.strip_prefix('_') {
            Some(stripped) if !stripped.is_empty() => format!("@{}", stripped),
            _ => return,
        };
        let found = std::mem::replace(&mut path.original, renamed);
        if let Some(first) = path.parts.first_mut() {
            if let Some(rest) = first.strip_prefix('_') {
                *first = rest.to_string();
            }
        }
        path.data = true;
        self.diagnostics.deprecation_at(
            format!(
                "Private fields must be prefixed with `@` instead of `_`. Found: {{{{{}}}}}",
                found
            ),
            path.span,
        );
    }

    /// `title` → `general.title` when the ambient section is `general` and
    /// nothing else claims the name.
    fn qualify(&mut self, path: &mut PathExpr, scope: &AliasScope) {
        if !path.is_unqualified() || !scope.ambient_is_general() {
            return;
        }
        if scope.lookup(&path.parts[0]).is_some() {
            return;
        }
        self.diagnostics.deprecation_at(
            format!(
                "Referencing values without a context is deprecated. Found: {{{{{}}}}}",
                path.original
            ),
            path.span,
        );
        path.original = format!("{}.{}", GENERAL, path.original);
        path.parts.insert(0, GENERAL.to_string());
    }
}

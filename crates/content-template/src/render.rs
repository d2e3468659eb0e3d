/*
 * render.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Rendering a normalized node tree against content.
//!
//! Paths resolve against a stack of frames. Each block helper may push a
//! frame that changes the evaluation context (`section`), binds block
//! parameters and locals, or exposes `@data` variables (`@index`).
//!
//! Resolution order for a plain path such as `title` or `item.name`:
//!
//! 1. block parameters and locals, innermost frame first;
//! 2. the current context;
//! 3. for dotted paths only (`general.title`), each enclosing context out to
//!    the root.
//!
//! A single name such as `{{title}}` inside `{{#section about}}` therefore
//! never reads another record. `this.x` reads only the current context,
//! `../x` the enclosing one, and `@x` reads data variables, then `@root`,
//! then the side data.

use indexmap::IndexMap;

use content_template_syntax::{Block, Call, Expr, Hash, Mustache, Partial, PathExpr, Program, Span, Statement};

use crate::diagnostics::DiagnosticCollector;
use crate::error::{TemplateError, TemplateResult};
use crate::expression::Leaf;
use crate::helpers::{Helper, HelperRegistry};
use crate::options::CompilerOptions;
use crate::partials::PartialStore;
use crate::value::Value;

static NULL: Value = Value::Null;
static EMPTY_HASH: Hash = Hash { pairs: Vec::new() };

/// Bindings a block helper introduces for one rendering of its body.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    context: Option<Value>,
    section: Option<String>,
    data: IndexMap<String, Value>,
    block_params: Vec<Value>,
    locals: Vec<(String, Value)>,
}

impl Frame {
    /// A frame that keeps the current context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch the evaluation context to `context`.
    pub fn with_context(mut self, context: impl Into<Value>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Name the section the new context belongs to, for placeholders.
    pub fn with_section(mut self, name: impl Into<String>) -> Self {
        self.section = Some(name.into());
        self
    }

    /// Expose `@name`.
    pub fn with_data(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(name.into(), value.into());
        self
    }

    /// Value for the next declared block parameter (`as |a b|`).
    pub fn with_block_param(mut self, value: impl Into<Value>) -> Self {
        self.block_params.push(value.into());
        self
    }

    /// Bind a local name regardless of declared block parameters.
    pub fn with_local(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.locals.push((name.into(), value.into()));
        self
    }
}

#[derive(Debug)]
struct ScopeFrame {
    this: Option<Value>,
    section: Option<String>,
    data: IndexMap<String, Value>,
    locals: Vec<(String, Value)>,
}

/// The arguments and body of one helper invocation.
pub struct HelperCall<'r, 't> {
    call: &'t Call,
    args: Vec<Value>,
    hash: IndexMap<String, Value>,
    block: Option<&'t Block>,
    renderer: &'r mut Renderer<'t>,
}

impl<'t> HelperCall<'_, 't> {
    pub fn name(&self) -> &str {
        self.call.name()
    }

    /// Positional arguments, already unwrapped.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Source text of positional argument `index` when it is a path.
    pub fn arg_path(&self, index: usize) -> Option<&str> {
        self.call
            .params
            .get(index)
            .and_then(Expr::as_path)
            .map(|path| path.original.as_str())
    }

    /// Positional argument `index`, or null.
    pub fn arg(&self, index: usize) -> Value {
        self.args.get(index).cloned().unwrap_or_default()
    }

    pub fn hash(&self) -> &IndexMap<String, Value> {
        &self.hash
    }

    pub fn hash_value(&self, key: &str) -> Option<&Value> {
        self.hash.get(key)
    }

    /// `true` when invoked as a block (`{{#name}}...{{/name}}`).
    pub fn is_block(&self) -> bool {
        self.block.is_some()
    }

    pub fn has_inverse(&self) -> bool {
        self.block.is_some_and(|b| b.inverse.is_some())
    }

    /// Block parameter names declared with `as |...|`.
    pub fn block_params(&self) -> &[String] {
        self.block
            .map(|b| b.block_params.as_slice())
            .unwrap_or_default()
    }

    /// The current evaluation context.
    pub fn this(&self) -> Value {
        self.renderer.current_this().clone()
    }

    pub fn options(&self) -> &CompilerOptions {
        self.renderer.options
    }

    /// Render the block body with `frame` pushed. Inline calls render nothing.
    pub fn render_body(&mut self, frame: Frame) -> TemplateResult<String> {
        let Some(block) = self.block else {
            return Ok(String::new());
        };
        self.renderer
            .with_frame(frame, &block.block_params, |r| r.render_program(&block.program))
    }

    /// Render the `{{else}}` branch, or nothing.
    pub fn render_inverse(&mut self) -> TemplateResult<String> {
        match self.block.and_then(|b| b.inverse.as_ref()) {
            Some(inverse) => self.renderer.render_program(inverse),
            None => Ok(String::new()),
        }
    }

    /// Report content the helper expected but did not find.
    pub fn missing_data(&mut self, message: impl Into<String>) {
        let span = self.block.map(|b| b.span);
        self.renderer.diagnostics.missing_data_at(message, span);
    }
}

pub(crate) struct Renderer<'t> {
    registry: &'t HelperRegistry,
    partials: &'t PartialStore,
    options: &'t CompilerOptions,
    side_data: &'t Value,
    frames: Vec<ScopeFrame>,
    pub(crate) diagnostics: DiagnosticCollector,
    partial_depth: usize,
}

impl<'t> Renderer<'t> {
    pub(crate) fn new(
        registry: &'t HelperRegistry,
        partials: &'t PartialStore,
        options: &'t CompilerOptions,
        context: &Value,
        side_data: &'t Value,
    ) -> Self {
        Self {
            registry,
            partials,
            options,
            side_data,
            frames: vec![ScopeFrame {
                this: Some(context.clone()),
                section: None,
                data: IndexMap::new(),
                locals: Vec::new(),
            }],
            diagnostics: DiagnosticCollector::new(),
            partial_depth: 0,
        }
    }

    pub(crate) fn render_program(&mut self, program: &'t Program) -> TemplateResult<String> {
        let mut out = String::new();
        for statement in &program.body {
            self.render_statement(statement, &mut out)?;
        }
        Ok(out)
    }

    fn render_statement(&mut self, statement: &'t Statement, out: &mut String) -> TemplateResult<()> {
        match statement {
            Statement::Content(content) => out.push_str(&content.text),
            Statement::Comment(_) => {}
            Statement::Mustache(mustache) => {
                let value = self.eval_mustache(mustache)?.resolve();
                let text = value.to_text();
                if mustache.escaped && !value.is_html() {
                    out.push_str(&escape_html(&text));
                } else {
                    out.push_str(&text);
                }
            }
            Statement::Block(block) => {
                let value = self.eval_block(block)?;
                out.push_str(&value.to_text());
            }
            Statement::Partial(partial) => self.render_partial(partial, out)?,
            Statement::Decorator(decorator) => {
                return Err(TemplateError::UnsupportedConstruct {
                    construct: format!("decorator `{}`", decorator.name),
                    offset: decorator.span.start,
                });
            }
        }
        Ok(())
    }

    /// Helper invoked by `call`, when its head is a plain registered name.
    fn helper_for(&self, call: &Call) -> Option<&'t dyn Helper> {
        let path = call.head_path()?;
        if path.data || path.depth > 0 || path.this_scoped || path.parts.len() != 1 {
            return None;
        }
        self.registry.get(&path.original)
    }

    fn eval_mustache(&mut self, mustache: &'t Mustache) -> TemplateResult<Value> {
        let call = &mustache.call;
        if let Some(helper) = self.helper_for(call) {
            return self.invoke(helper, call, None);
        }
        let Some(path) = call.head_path() else {
            return self.eval_expr(&call.path);
        };
        if !call.params.is_empty() {
            return self.missing(path, &call.hash, mustache.span, "Missing helper");
        }
        match self.lookup(path) {
            Some(value) => Ok(value),
            None => self.missing(path, &call.hash, mustache.span, "Missing data"),
        }
    }

    fn eval_block(&mut self, block: &'t Block) -> TemplateResult<Value> {
        if let Some(helper) = self.helper_for(&block.call) {
            helper.check(block)?;
            return self.invoke(helper, &block.call, Some(block));
        }

        let message = format!("Missing helper {{{{#{}}}}}", block.name());
        if self.options.strict_mode {
            return Err(TemplateError::MissingData {
                placeholder: block.name().to_string(),
            });
        }
        self.diagnostics.missing_data_at(message, Some(block.span));
        match &block.inverse {
            Some(inverse) => Ok(Value::Html(self.render_program(inverse)?)),
            None => Ok(Value::Null),
        }
    }

    fn invoke(
        &mut self,
        helper: &'t dyn Helper,
        call: &'t Call,
        block: Option<&'t Block>,
    ) -> TemplateResult<Value> {
        let mut args = Vec::with_capacity(call.params.len());
        for param in &call.params {
            args.push(self.eval_expr(param)?.unwrapped());
        }
        let mut hash = IndexMap::new();
        for pair in &call.hash.pairs {
            hash.insert(pair.key.clone(), self.eval_expr(&pair.value)?.unwrapped());
        }

        let mut helper_call = HelperCall {
            call,
            args,
            hash,
            block,
            renderer: self,
        };
        helper.run(&mut helper_call)
    }

    fn eval_expr(&mut self, expr: &'t Expr) -> TemplateResult<Value> {
        Ok(match expr {
            Expr::Path(path) => self.lookup(path).unwrap_or_default(),
            Expr::Sub(call) => return self.eval_sub(call),
            Expr::String(s) => Value::String(s.clone()),
            Expr::Number(n) => Value::Number(*n),
            Expr::Boolean(b) => Value::Bool(*b),
            Expr::Null | Expr::Undefined => Value::Null,
        })
    }

    fn eval_sub(&mut self, call: &'t Call) -> TemplateResult<Value> {
        if let Some(helper) = self.helper_for(call) {
            return self.invoke(helper, call, None);
        }
        match call.head_path() {
            Some(path) if call.params.is_empty() => Ok(self.lookup(path).unwrap_or_default()),
            Some(path) => {
                let span = path.span;
                self.missing(path, &EMPTY_HASH, span, "Missing helper")
                    .map(|_| Value::Null)
            }
            None => self.eval_expr(&call.path),
        }
    }

    /// Value for an unresolved reference: the `default` keyword, else a
    /// placeholder.
    fn missing(
        &mut self,
        path: &PathExpr,
        hash: &'t Hash,
        span: Span,
        what: &str,
    ) -> TemplateResult<Value> {
        let placeholder = Leaf::from_path(path, hash)
            .map(|mut leaf| {
                if leaf.context.is_empty() {
                    if let Some(section) = self.current_section() {
                        leaf.context = section.to_string();
                    }
                }
                leaf.placeholder()
            })
            .unwrap_or_else(|| format!("{{{{{}}}}}", path.original));
        if self.options.strict_mode {
            return Err(TemplateError::MissingData { placeholder });
        }
        self.diagnostics
            .missing_data_at(format!("{} for {}", what, placeholder), Some(span));

        if let Some(default) = hash.get("default") {
            return self.eval_expr(default);
        }
        Ok(if self.options.placeholders {
            Value::String(placeholder)
        } else {
            Value::Null
        })
    }

    fn render_partial(&mut self, partial: &'t Partial, out: &mut String) -> TemplateResult<()> {
        let partials = self.partials;
        let tree = partials.tree(
            &partial.name,
            self.registry,
            self.options.max_depth,
            &mut self.diagnostics,
        )?;

        let Some(tree) = tree else {
            match &partial.fallback {
                Some(fallback) => out.push_str(&self.render_program(fallback)?),
                None => self
                    .diagnostics
                    .missing_data_at(format!("Missing partial {}", partial.name), Some(partial.span)),
            }
            return Ok(());
        };

        if self.partial_depth >= self.options.max_partial_depth {
            return Err(TemplateError::RecursivePartial {
                name: partial.name.clone(),
                max_depth: self.options.max_partial_depth,
            });
        }

        let mut context = match &partial.context {
            Some(expr) => Some(self.eval_expr(expr)?),
            None => None,
        };
        if !partial.hash.is_empty() {
            let base = context.take().unwrap_or_else(|| self.current_this().clone());
            let mut map = match base.resolve() {
                Value::Map(map) => map,
                _ => IndexMap::new(),
            };
            for pair in &partial.hash.pairs {
                map.insert(pair.key.clone(), self.eval_expr(&pair.value)?);
            }
            context = Some(Value::Map(map));
        }

        tracing::debug!(partial = %partial.name, depth = self.partial_depth, "Rendering partial");
        let frame = Frame {
            context,
            ..Frame::default()
        };
        self.partial_depth += 1;
        let result = self.with_frame(frame, &[], |r| r.render_program(tree));
        self.partial_depth -= 1;
        out.push_str(&result?);
        Ok(())
    }

    fn with_frame(
        &mut self,
        frame: Frame,
        names: &[String],
        render: impl FnOnce(&mut Self) -> TemplateResult<String>,
    ) -> TemplateResult<String> {
        let mut locals: Vec<(String, Value)> =
            names.iter().cloned().zip(frame.block_params).collect();
        locals.extend(frame.locals);
        self.frames.push(ScopeFrame {
            this: frame.context,
            section: frame.section,
            data: frame.data,
            locals,
        });
        let result = render(self);
        self.frames.pop();
        result
    }

    fn contexts(&self) -> impl Iterator<Item = &Value> {
        self.frames.iter().rev().filter_map(|f| f.this.as_ref())
    }

    fn current_this(&self) -> &Value {
        self.contexts().next().unwrap_or(&NULL)
    }

    /// Section named by the frame that set the current context.
    fn current_section(&self) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .find(|f| f.this.is_some())
            .and_then(|f| f.section.as_deref())
    }

    fn root(&self) -> &Value {
        self.frames
            .first()
            .and_then(|f| f.this.as_ref())
            .unwrap_or(&NULL)
    }

    /// Resolve a path. `None` means the reference is missing (as opposed to
    /// present and null).
    pub(crate) fn lookup(&self, path: &PathExpr) -> Option<Value> {
        if path.data {
            return self.lookup_data(path);
        }
        if path.depth > 0 {
            let base = self.contexts().nth(path.depth).unwrap_or_else(|| self.root());
            return base.get_path(&path.parts);
        }
        if path.this_scoped {
            return self.current_this().get_path(&path.parts);
        }

        let (first, rest) = path.parts.split_first()?;
        for frame in self.frames.iter().rev() {
            if let Some((_, value)) = frame.locals.iter().rev().find(|(name, _)| name == first) {
                return value.get_path(rest);
            }
        }
        if rest.is_empty() {
            return self.current_this().get(first);
        }
        self.contexts()
            .find_map(|this| this.get(first))
            .and_then(|value| value.get_path(rest))
    }

    fn lookup_data(&self, path: &PathExpr) -> Option<Value> {
        let (first, rest) = path.parts.split_first()?;
        if first == "root" {
            return self.root().get_path(rest);
        }
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.data.get(first))
            .cloned()
            .or_else(|| self.side_data.get(first))
            .and_then(|value| value.get_path(rest))
    }
}

/// Escape text for HTML output.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '`' => out.push_str("&#x60;"),
            '=' => out.push_str("&#x3D;"),
            _ => out.push(c),
        }
    }
    out
}

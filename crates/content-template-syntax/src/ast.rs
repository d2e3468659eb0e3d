/*
 * ast.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Node tree produced by the parser.
//!
//! The tree is generic: it knows nothing about which helpers
//! exist or what they mean. Consumers (schema inference, rendering) attach
//! meaning by looking up block and call names in their own tables.

/// Byte range into the template source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A sequence of statements: the whole template, or the body of a block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub body: Vec<Statement>,
    pub span: Span,
}

impl Program {
    pub fn new(body: Vec<Statement>, span: Span) -> Self {
        Self { body, span }
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// A top-level element of a program.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Literal markup between expressions.
    Content(Content),

    /// `{{! ... }}` or `{{!-- ... --}}`
    Comment(Comment),

    /// `{{expr}}`, `{{{expr}}}` or `{{& expr}}`
    Mustache(Mustache),

    /// `{{#name ...}}...{{else}}...{{/name}}` or `{{^name}}...{{/name}}`
    Block(Block),

    /// `{{> name}}` or `{{#> name}}fallback{{/name}}`
    Partial(Partial),

    /// `{{* name}}` or `{{#* name}}...{{/name}}`
    Decorator(Decorator),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Content(c) => c.span,
            Statement::Comment(c) => c.span,
            Statement::Mustache(m) => m.span,
            Statement::Block(b) => b.span,
            Statement::Partial(p) => p.span,
            Statement::Decorator(d) => d.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mustache {
    pub call: Call,
    /// `false` for triple-stash and `{{& }}` output.
    pub escaped: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub call: Call,
    /// Names declared with `as |a b|`.
    pub block_params: Vec<String>,
    pub program: Program,
    pub inverse: Option<Program>,
    pub span: Span,
}

impl Block {
    /// Name of the helper this block invokes.
    pub fn name(&self) -> &str {
        self.call.name()
    }

    /// The first positional argument, if it is a path.
    pub fn first_path(&self) -> Option<&PathExpr> {
        self.call.params.first().and_then(Expr::as_path)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Partial {
    pub name: String,
    /// Optional context expression: `{{> card item}}`.
    pub context: Option<Expr>,
    pub hash: Hash,
    /// Body of a partial block, rendered when the partial is not registered.
    pub fallback: Option<Program>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decorator {
    pub name: String,
    pub span: Span,
}

/// A helper or value invocation: `name param1 param2 key=value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub path: Expr,
    pub params: Vec<Expr>,
    pub hash: Hash,
}

impl Call {
    /// Create a call with no arguments.
    pub fn bare(path: Expr) -> Self {
        Self {
            path,
            params: Vec::new(),
            hash: Hash::default(),
        }
    }

    /// The name used for helper lookup: the original text of the head path.
    pub fn name(&self) -> &str {
        match &self.path {
            Expr::Path(p) => &p.original,
            Expr::String(s) => s,
            _ => "",
        }
    }

    pub fn head_path(&self) -> Option<&PathExpr> {
        self.path.as_path()
    }

    pub fn head_path_mut(&mut self) -> Option<&mut PathExpr> {
        match &mut self.path {
            Expr::Path(p) => Some(p),
            _ => None,
        }
    }
}

/// Keyword arguments, in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Hash {
    pub pairs: Vec<HashPair>,
}

impl Hash {
    pub fn get(&self, key: &str) -> Option<&Expr> {
        self.pairs.iter().find(|p| p.key == key).map(|p| &p.value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HashPair {
    pub key: String,
    pub value: Expr,
}

/// An argument or call head.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Path(PathExpr),
    /// `(helper args...)`
    Sub(Box<Call>),
    String(String),
    Number(f64),
    Boolean(bool),
    Null,
    Undefined,
}

impl Expr {
    pub fn as_path(&self) -> Option<&PathExpr> {
        match self {
            Expr::Path(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        !matches!(self, Expr::Path(_) | Expr::Sub(_))
    }
}

/// A reference such as `title`, `general.title`, `this.name`, `../items`
/// or `@index`.
#[derive(Debug, Clone, PartialEq)]
pub struct PathExpr {
    /// The path as written (after any normalization rewrite).
    pub original: String,
    /// Segments, excluding `this`, `.` and `..` markers.
    pub parts: Vec<String>,
    /// `true` for `@`-prefixed (private/data) references.
    pub data: bool,
    /// Number of leading `../` segments.
    pub depth: usize,
    /// `true` when the path was explicitly scoped with `this` or `./`.
    pub this_scoped: bool,
    pub span: Span,
}

impl PathExpr {
    /// A plain, unscoped path built from dot-separated segments.
    pub fn simple(original: impl Into<String>, span: Span) -> Self {
        let original = original.into();
        let parts = original.split('.').map(str::to_string).collect();
        Self {
            original,
            parts,
            data: false,
            depth: 0,
            this_scoped: false,
            span,
        }
    }

    /// `true` for `this`, `.` and `./` with no further segments.
    pub fn is_this(&self) -> bool {
        self.parts.is_empty() && !self.data
    }

    /// Single-segment, unscoped, non-data reference such as `{{title}}`.
    pub fn is_unqualified(&self) -> bool {
        self.parts.len() == 1 && !self.data && self.depth == 0 && !self.this_scoped
    }
}

//! Syntax trees for individual top-level constructs.
//!
//! The chunker builds these while recognizing construct boundaries; the
//! typer consumes them. Every node keeps its source range — the query
//! adapters answer position questions by walking ranges.

use text_size::TextRange;

/// A possibly-qualified identifier: `u`, `M.u`, `M.N.u`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub segments: Vec<PathSeg>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSeg {
    pub name: String,
    pub range: TextRange,
}

impl Path {
    /// The final segment: the name being referred to.
    pub fn last(&self) -> &PathSeg {
        self.segments.last().expect("paths have at least one segment")
    }

    /// Module qualifier segments, i.e. everything but the last.
    pub fn qualifier(&self) -> &[PathSeg] {
        &self.segments[..self.segments.len() - 1]
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(|s| s.name.as_str())
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&seg.name)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Var { name: String, range: TextRange },
    Wildcard { range: TextRange },
    Unit { range: TextRange },
}

impl Pattern {
    pub fn range(&self) -> TextRange {
        match self {
            Pattern::Var { range, .. } | Pattern::Wildcard { range } | Pattern::Unit { range } => {
                *range
            }
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Pattern::Var { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// One `pat params = body` binding of a `let` group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub pat: Pattern,
    pub params: Vec<Pattern>,
    pub ann: Option<TypeExpr>,
    pub body: Expr,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    pub range: TextRange,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    Unit,
    Int(i64),
    Bool(bool),
    Str(String),
    /// Lowercase-terminated path: a value reference.
    Var(Path),
    /// Uppercase-terminated path: a constructor reference.
    Ctor(Path),
    Tuple(Vec<Expr>),
    App {
        func: Box<Expr>,
        arg: Box<Expr>,
    },
    Binop {
        op: String,
        op_range: TextRange,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Fun {
        params: Vec<Pattern>,
        body: Box<Expr>,
    },
    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Option<Box<Expr>>,
    },
    LetIn {
        rec_flag: bool,
        bindings: Vec<Binding>,
        body: Box<Expr>,
    },
    /// `let module M = … in e` — an inline module, never chunked.
    LetModule {
        name: String,
        name_range: TextRange,
        module: ModuleExpr,
        body: Box<Expr>,
    },
    Annot {
        expr: Box<Expr>,
        ty: TypeExpr,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleExpr {
    Struct(Vec<DefGroup>),
    Alias(Path),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeExpr {
    pub range: TextRange,
    pub kind: TypeExprKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExprKind {
    /// `'a`
    Var(String),
    /// `int`, `'a list`, `M.t`
    Name { path: Path, args: Vec<TypeExpr> },
    Arrow(Box<TypeExpr>, Box<TypeExpr>),
    Tuple(Vec<TypeExpr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: String,
    pub name_range: TextRange,
    pub params: Vec<String>,
    pub body: TypeDeclBody,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDeclBody {
    Abstract,
    Alias(TypeExpr),
    Variant(Vec<CtorDecl>),
    Record(Vec<FieldDecl>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CtorDecl {
    pub name: String,
    pub range: TextRange,
    pub arg: Option<TypeExpr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: String,
    pub range: TextRange,
    pub ty: TypeExpr,
}

/// A single top-level item. `Definition` chunks carry an ordered group of
/// these sharing one recursion flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopItem {
    Let {
        binding: Binding,
    },
    Type(TypeDecl),
    Exception {
        name: String,
        name_range: TextRange,
        arg: Option<TypeExpr>,
        range: TextRange,
    },
    Open {
        path: Path,
        range: TextRange,
    },
    Class {
        name: String,
        name_range: TextRange,
        range: TextRange,
    },
    /// `module M = N` at any level, or `module M = struct … end` when it
    /// appears *inside* an expression — the chunked form uses
    /// `EnterModule`/`LeaveModule` instead.
    Module {
        name: String,
        name_range: TextRange,
        module: ModuleExpr,
        range: TextRange,
    },
}

impl TopItem {
    pub fn range(&self) -> TextRange {
        match self {
            TopItem::Let { binding } => binding.range,
            TopItem::Type(decl) => decl.range,
            TopItem::Exception { range, .. }
            | TopItem::Open { range, .. }
            | TopItem::Class { range, .. }
            | TopItem::Module { range, .. } => *range,
        }
    }
}

/// An ordered sequence of top-level items sharing one recursion flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefGroup {
    pub rec_flag: bool,
    pub items: Vec<TopItem>,
}

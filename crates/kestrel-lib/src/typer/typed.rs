//! Typed trees: what typing a chunk leaves behind.
//!
//! Ranges everywhere — the query adapters answer position questions by
//! walking these.

use std::sync::Arc;

use text_size::TextRange;

use super::env::{ClassInfo, Entry, ExceptionInfo, ModuleInfo, ModuleSig, TypeInfo, ValueInfo};
use super::types::{Scheme, Stamp, Ty};

/// The closed set of item kinds the outline exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Value,
    Type,
    Class,
    Exception,
    Label,
    Module,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Value => "Value",
            ItemKind::Type => "Type",
            ItemKind::Class => "Class",
            ItemKind::Exception => "Exception",
            ItemKind::Label => "Label",
            ItemKind::Module => "Module",
        }
    }
}

/// A resolved identifier occurrence.
#[derive(Debug, Clone)]
pub struct TypedPath {
    pub segments: Vec<(String, TextRange)>,
    pub range: TextRange,
    /// Stamp of the declaration this occurrence resolved to.
    pub stamp: Option<Stamp>,
}

#[derive(Debug, Clone)]
pub struct TypedParam {
    pub name: Option<String>,
    pub range: TextRange,
    pub ty: Ty,
}

#[derive(Debug, Clone)]
pub struct TypedExpr {
    pub range: TextRange,
    pub ty: Ty,
    pub kind: TypedExprKind,
}

#[derive(Debug, Clone)]
pub enum TypedExprKind {
    Lit,
    Path(TypedPath),
    App {
        func: Box<TypedExpr>,
        arg: Box<TypedExpr>,
    },
    Binop {
        lhs: Box<TypedExpr>,
        rhs: Box<TypedExpr>,
    },
    Fun {
        params: Vec<TypedParam>,
        body: Box<TypedExpr>,
    },
    Tuple(Vec<TypedExpr>),
    If {
        cond: Box<TypedExpr>,
        then_branch: Box<TypedExpr>,
        else_branch: Option<Box<TypedExpr>>,
    },
    /// Local binding forms: the bound expressions plus the body.
    Let {
        defs: Vec<TypedExpr>,
        body: Box<TypedExpr>,
    },
}

impl TypedExpr {
    /// Child expressions, for range walks.
    pub fn children(&self) -> Vec<&TypedExpr> {
        match &self.kind {
            TypedExprKind::Lit | TypedExprKind::Path(_) => Vec::new(),
            TypedExprKind::App { func, arg } => vec![func, arg],
            TypedExprKind::Binop { lhs, rhs } => vec![lhs, rhs],
            TypedExprKind::Fun { body, .. } => vec![body],
            TypedExprKind::Tuple(parts) => parts.iter().collect(),
            TypedExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let mut out = vec![cond.as_ref(), then_branch.as_ref()];
                if let Some(e) = else_branch {
                    out.push(e);
                }
                out
            }
            TypedExprKind::Let { defs, body } => {
                let mut out: Vec<&TypedExpr> = defs.iter().collect();
                out.push(body);
                out
            }
        }
    }
}

/// A label exposed by a type declaration: a variant constructor or a record
/// field.
#[derive(Debug, Clone)]
pub struct TypedLabel {
    pub name: String,
    pub range: TextRange,
}

#[derive(Debug, Clone)]
pub enum TypedItem {
    Value {
        name: String,
        name_range: TextRange,
        range: TextRange,
        scheme: Scheme,
        stamp: Stamp,
        expr: Arc<TypedExpr>,
    },
    TypeDef {
        name: String,
        name_range: TextRange,
        range: TextRange,
        info: Arc<TypeInfo>,
        labels: Vec<TypedLabel>,
    },
    Exception {
        name: String,
        name_range: TextRange,
        range: TextRange,
        stamp: Stamp,
        arg: Option<Ty>,
    },
    Class {
        name: String,
        name_range: TextRange,
        range: TextRange,
        stamp: Stamp,
    },
    Open {
        path: TypedPath,
        range: TextRange,
        sig: Arc<ModuleSig>,
    },
    Module {
        name: String,
        name_range: TextRange,
        range: TextRange,
        items: Vec<TypedItem>,
        sig: Arc<ModuleSig>,
        stamp: Stamp,
    },
}

impl TypedItem {
    pub fn range(&self) -> TextRange {
        match self {
            TypedItem::Value { range, .. }
            | TypedItem::TypeDef { range, .. }
            | TypedItem::Exception { range, .. }
            | TypedItem::Class { range, .. }
            | TypedItem::Open { range, .. }
            | TypedItem::Module { range, .. } => *range,
        }
    }
}

/// Derives the signature a sequence of typed items exports.
pub fn signature_of_items(items: &[TypedItem]) -> ModuleSig {
    let mut entries = Vec::new();
    for item in items {
        match item {
            TypedItem::Value {
                name,
                scheme,
                stamp,
                ..
            } => {
                if name != "_" {
                    entries.push(Entry::Value(Arc::new(ValueInfo {
                        name: name.clone(),
                        scheme: scheme.clone(),
                        stamp: *stamp,
                    })));
                }
            }
            TypedItem::TypeDef { info, .. } => entries.push(Entry::Type(info.clone())),
            TypedItem::Exception {
                name, stamp, arg, ..
            } => entries.push(Entry::Exception(Arc::new(ExceptionInfo {
                name: name.clone(),
                stamp: *stamp,
                arg: arg.clone(),
            }))),
            TypedItem::Class { name, stamp, .. } => {
                entries.push(Entry::Class(Arc::new(ClassInfo {
                    name: name.clone(),
                    stamp: *stamp,
                })));
            }
            TypedItem::Open { sig, .. } => entries.push(Entry::Open(sig.clone())),
            TypedItem::Module {
                name, sig, stamp, ..
            } => entries.push(Entry::Module(Arc::new(ModuleInfo {
                name: name.clone(),
                stamp: *stamp,
                sig: sig.clone(),
            }))),
        }
    }
    ModuleSig { entries }
}

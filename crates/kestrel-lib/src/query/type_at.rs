//! Type-at-position: the innermost typed subtree enclosing a position.

use text_size::{TextRange, TextSize};

use crate::Buffer;
use crate::typer::State;
use crate::typer::printer::{scheme_to_string, scoped_env, type_to_string};
use crate::typer::typed::{TypedExpr, TypedItem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeAt {
    pub range: TextRange,
    pub ty: String,
}

/// The type of the innermost enclosing typed node, rendered against the
/// environment of the chunk it belongs to.
pub fn type_at(buffer: &Buffer, offset: TextSize) -> Option<TypeAt> {
    let mut best: Option<TypeAt> = None;
    for state in buffer.states() {
        for item in &state.items {
            visit_item(item, offset, state, &mut best);
        }
    }
    best
}

fn consider(range: TextRange, render: impl FnOnce() -> String, best: &mut Option<TypeAt>) {
    let better = match best {
        Some(held) => range.len() < held.range.len(),
        None => true,
    };
    if better {
        *best = Some(TypeAt {
            range,
            ty: render(),
        });
    }
}

fn visit_item(item: &TypedItem, offset: TextSize, state: &State, best: &mut Option<TypeAt>) {
    match item {
        TypedItem::Value {
            name_range,
            scheme,
            expr,
            ..
        } => {
            if name_range.contains_inclusive(offset) {
                let _scope = scoped_env(&state.env);
                consider(*name_range, || scheme_to_string(scheme), best);
            }
            visit_expr(expr, offset, state, best);
        }
        TypedItem::Module { items, .. } => {
            for child in items {
                visit_item(child, offset, state, best);
            }
        }
        _ => {}
    }
}

fn visit_expr(expr: &TypedExpr, offset: TextSize, state: &State, best: &mut Option<TypeAt>) {
    if !expr.range.contains_inclusive(offset) {
        return;
    }
    {
        let _scope = scoped_env(&state.env);
        consider(expr.range, || type_to_string(&expr.ty), best);
    }
    for child in expr.children() {
        visit_expr(child, offset, state, best);
    }
}

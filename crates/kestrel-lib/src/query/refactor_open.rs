//! Refactor-open: rewrite identifiers in the scope of an `open`.
//!
//! `unqualify` drops the opened module's prefix from references that would
//! still resolve to the same declaration without it; `qualify` does the
//! inverse for references that currently reach through the open.

use text_size::{TextRange, TextSize};

use crate::Buffer;
use crate::typer::State;
use crate::typer::env::{CtorLookup, Env, ModuleSig};
use crate::typer::typed::{TypedExpr, TypedExprKind, TypedItem, TypedPath};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAction {
    Qualify,
    Unqualify,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefactorEdit {
    pub range: TextRange,
    pub content: String,
}

/// Computes the rewrite for the `open` governing `offset`: the innermost
/// one containing the position, or the nearest one before it.
pub fn refactor_open(buffer: &Buffer, offset: TextSize, action: OpenAction) -> Vec<RefactorEdit> {
    let states: Vec<&State> = buffer.typer().iter_past().collect();

    let mut governing: Option<(usize, &TypedPath, &ModuleSig)> = None;
    for (idx, state) in states.iter().enumerate() {
        for item in &state.items {
            if let TypedItem::Open { path, range, sig } = item {
                if range.start() <= offset {
                    governing = Some((idx, path, sig.as_ref()));
                }
            }
        }
    }
    let Some((open_idx, open_path, open_sig)) = governing else {
        return Vec::new();
    };
    let prefix: Vec<&str> = open_path
        .segments
        .iter()
        .map(|(name, _)| name.as_str())
        .collect();

    let mut edits = Vec::new();
    for idx in (open_idx + 1)..states.len() {
        // The scope of an expression is the environment left by the chunk
        // before it, which includes the open.
        let scope = &states[idx - 1].env;
        let mut paths = Vec::new();
        for item in &states[idx].items {
            collect_item_paths(item, &mut paths);
        }
        for path in paths {
            match action {
                OpenAction::Unqualify => try_unqualify(buffer, scope, &prefix, path, &mut edits),
                OpenAction::Qualify => try_qualify(open_sig, &prefix, path, &mut edits),
            }
        }
    }

    edits.sort_by_key(|e| (u32::from(e.range.start()), u32::from(e.range.end())));
    edits.dedup();
    edits
}

/// Paths in the items a state produced directly. Folded module items are
/// skipped: their contents were already walked as the inner states.
fn collect_item_paths<'a>(item: &'a TypedItem, out: &mut Vec<&'a TypedPath>) {
    if let TypedItem::Value { expr, .. } = item {
        collect_expr_paths(expr, out);
    }
}

fn collect_expr_paths<'a>(expr: &'a TypedExpr, out: &mut Vec<&'a TypedPath>) {
    if let TypedExprKind::Path(path) = &expr.kind {
        out.push(path);
    }
    for child in expr.children() {
        collect_expr_paths(child, out);
    }
}

fn try_unqualify(
    buffer: &Buffer,
    scope: &Env,
    prefix: &[&str],
    path: &TypedPath,
    edits: &mut Vec<RefactorEdit>,
) {
    if path.segments.len() <= prefix.len() {
        return;
    }
    let matches_prefix = path
        .segments
        .iter()
        .zip(prefix)
        .all(|((name, _), want)| name == want);
    if !matches_prefix {
        return;
    }

    let suffix: Vec<&str> = path.segments[prefix.len()..]
        .iter()
        .map(|(name, _)| name.as_str())
        .collect();
    if resolved_stamp(scope, &suffix) != path.stamp {
        return;
    }

    let content = if buffer.line_index().is_multiline(path.range) {
        // FIXME: an identifier split across lines has nothing sensible to
        // unqualify; dropping only the head segment mirrors the historical
        // behavior and should eventually produce no edit at all.
        path.segments[1..]
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    } else {
        suffix.join(".")
    };
    edits.push(RefactorEdit {
        range: path.range,
        content,
    });
}

fn try_qualify(
    open_sig: &ModuleSig,
    prefix: &[&str],
    path: &TypedPath,
    edits: &mut Vec<RefactorEdit>,
) {
    // Already qualified under the open, or not reaching through it.
    if path
        .segments
        .first()
        .is_some_and(|(name, _)| Some(name.as_str()) == prefix.first().copied())
    {
        return;
    }
    let names: Vec<&str> = path.segments.iter().map(|(name, _)| name.as_str()).collect();
    if sig_stamp(open_sig, &names) != path.stamp {
        return;
    }
    let mut content = prefix.join(".");
    content.push('.');
    content.push_str(&names.join("."));
    edits.push(RefactorEdit {
        range: path.range,
        content,
    });
}

/// What an unqualified reference would resolve to in `scope`.
fn resolved_stamp(scope: &Env, names: &[&str]) -> Option<u64> {
    if let Some(value) = scope.lookup_value(names) {
        return Some(value.stamp);
    }
    scope.lookup_ctor(names).map(|found| match found {
        CtorLookup::Variant { ctor, .. } => ctor.stamp,
        CtorLookup::Exception(exc) => exc.stamp,
    })
}

/// What a reference reaching through the opened signature resolves to.
fn sig_stamp(sig: &ModuleSig, names: &[&str]) -> Option<u64> {
    let (last, qualifier) = names.split_last()?;
    let mut owned: Option<std::sync::Arc<ModuleSig>> = None;
    for seg in qualifier {
        let module = match &owned {
            Some(current) => current.module(seg)?,
            None => sig.module(seg)?,
        };
        owned = Some(module.sig.clone());
    }
    let target: &ModuleSig = owned.as_deref().unwrap_or(sig);
    if let Some(value) = target.value(last) {
        return Some(value.stamp);
    }
    target.ctor(last).map(|found| match found {
        CtorLookup::Variant { ctor, .. } => ctor.stamp,
        CtorLookup::Exception(exc) => exc.stamp,
    })
}

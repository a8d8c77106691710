//! Prefix completion.
//!
//! A qualified prefix (`M.u`) completes against the module's signature; a
//! bare prefix completes against everything visible at the position.
//! Shadowing follows the environment: the innermost binding of a name wins.

use indexmap::IndexMap;
use text_size::TextSize;

use crate::Buffer;
use crate::typer::env::{Entry, Env, ModuleSig};
use crate::typer::printer::scheme_to_string;
use crate::typer::typed::ItemKind;

use super::env_at;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionEntry {
    pub name: String,
    pub kind: ItemKind,
    pub ty: Option<String>,
}

/// Completes `prefix` at `offset`. Results are sorted by name.
pub fn complete(buffer: &Buffer, offset: TextSize, prefix: &str) -> Vec<CompletionEntry> {
    let env = env_at(buffer, offset);
    let (qualifier, partial) = match prefix.rfind('.') {
        Some(dot) => (Some(&prefix[..dot]), &prefix[dot + 1..]),
        None => (None, prefix),
    };

    // Innermost-first insertion: the first occurrence of a name is the one
    // in scope.
    let mut seen: IndexMap<String, CompletionEntry> = IndexMap::new();
    match qualifier {
        Some(qualifier) => {
            let path: Vec<&str> = qualifier.split('.').collect();
            if let Some(module) = env.lookup_module(&path) {
                collect_sig(&module.sig, partial, &mut seen);
            }
        }
        None => collect_env(&env, partial, &mut seen),
    }

    let mut entries: Vec<CompletionEntry> = seen.into_values().collect();
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}

fn collect_env(env: &Env, partial: &str, seen: &mut IndexMap<String, CompletionEntry>) {
    for entry in env.entries() {
        collect_entry(entry, partial, seen);
    }
}

fn collect_sig(sig: &ModuleSig, partial: &str, seen: &mut IndexMap<String, CompletionEntry>) {
    for entry in sig.entries.iter().rev() {
        collect_entry(entry, partial, seen);
    }
}

fn collect_entry(entry: &Entry, partial: &str, seen: &mut IndexMap<String, CompletionEntry>) {
    let candidate = match entry {
        Entry::Value(v) => Some(CompletionEntry {
            name: v.name.clone(),
            kind: ItemKind::Value,
            ty: Some(scheme_to_string(&v.scheme)),
        }),
        Entry::Type(t) => Some(CompletionEntry {
            name: t.name.clone(),
            kind: ItemKind::Type,
            ty: None,
        }),
        Entry::Exception(e) => Some(CompletionEntry {
            name: e.name.clone(),
            kind: ItemKind::Exception,
            ty: None,
        }),
        Entry::Class(c) => Some(CompletionEntry {
            name: c.name.clone(),
            kind: ItemKind::Class,
            ty: None,
        }),
        Entry::Module(m) => Some(CompletionEntry {
            name: m.name.clone(),
            kind: ItemKind::Module,
            ty: None,
        }),
        Entry::Open(sig) => {
            collect_sig(sig, partial, seen);
            None
        }
    };
    if let Some(candidate) = candidate {
        if candidate.name.starts_with(partial) && !candidate.name.is_empty() {
            seen.entry(candidate.name.clone()).or_insert(candidate);
        }
    }
}

//! The incremental typer.
//!
//! For every chunk the typer history records one [`State`]: the environment
//! after the chunk, the typed items the chunk produced, and the errors and
//! warnings captured while producing them. [`sync`] keeps that history
//! aligned with the chunk history: rewind to the deepest common ancestor,
//! cut the stale suffix, walk the chunk future forward one `append_step` at
//! a time.
//!
//! Error capture is layered as: per item (inside the definitions fold),
//! per chunk (an `append_step` never fails on user input), per request
//! (everything else propagates as [`Error`]).

pub mod env;
pub mod printer;
pub mod typed;
pub mod types;

mod infer;

#[cfg(test)]
mod typer_tests;
#[cfg(test)]
mod types_tests;

use kestrel_core::{History, Mark, rewind};
use text_size::TextRange;

use crate::Error;
use crate::chunk::{Chunk, ChunkItem, ChunkKind};

use env::{Env, initial_env};
use infer::{Typing, type_definitions};
use typed::{TypedItem, signature_of_items};
use types::{TypeError, Warning};

/// One element of the typer history: everything known after applying one
/// chunk.
#[derive(Debug, Clone)]
pub struct State {
    /// Environment after this chunk.
    pub env: Env,
    /// Typed items this chunk produced. Items of a closed module live in
    /// the closing state's `Module` item, not in the inner states.
    pub items: Vec<TypedItem>,
    pub errors: Vec<TypeError>,
    pub warnings: Vec<Warning>,
    /// Module nesting depth after this chunk.
    pub depth: u32,
    /// Chunk-history cursor right after the chunk this state covers.
    pub mark: Mark<Chunk>,
}

/// Counters exposed for instrumentation: incremental behavior is verified
/// by watching how much typing actually re-runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TyperStats {
    pub chunks_typed: u64,
    pub definitions_typed: u64,
}

/// Re-aligns the typer history with the chunk history.
///
/// The rewind finds the deepest typer state whose mark still denotes a live
/// chunk at or before the chunk cursor; everything after it is discarded
/// and re-typed from the chunk future.
pub fn sync(
    chunks: &mut History<Chunk>,
    typer: &mut History<State>,
    stats: &mut TyperStats,
) -> Result<(), Error> {
    rewind(|s: &State| s.mark, chunks, typer);
    typer.cutoff();
    while let Some(chunk) = chunks.next().cloned() {
        chunks.forward();
        append_step(&chunk, chunks, typer, stats)?;
    }
    Ok(())
}

/// Applies one chunk to the deepest state, inserting the produced state.
fn append_step(
    chunk: &Chunk,
    chunks: &mut History<Chunk>,
    typer: &mut History<State>,
    stats: &mut TyperStats,
) -> Result<(), Error> {
    let (env_before, depth_before) = match typer.prev() {
        Some(state) => (state.env.clone(), state.depth),
        None => (initial_env()?, 0),
    };

    let mut items = Vec::new();
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut env = env_before;
    let mut depth = depth_before;

    match chunk.item() {
        Some(ChunkItem::Definitions(group)) => {
            let mut cx = Typing {
                warnings: &mut warnings,
                errors: &mut errors,
                stats: &mut *stats,
            };
            let (typed, next) = type_definitions(&env, group, &mut cx);
            items = typed;
            env = next;
        }
        Some(ChunkItem::ModuleOpening { .. }) => {
            // The structure body types against the enclosing environment;
            // entering only deepens the nesting.
            depth = depth_before + 1;
        }
        Some(ChunkItem::ModuleClosing { name, back_offset }) => {
            let (module, outer, new_depth) =
                close_module(name, back_offset, chunk, chunks, typer, depth_before)?;
            items.push(module);
            env = outer;
            depth = new_depth;
        }
        None => {
            if let ChunkKind::SyntaxError {
                message,
                error_offset,
            } = &chunk.kind
            {
                errors.push(TypeError {
                    range: TextRange::empty(*error_offset),
                    message: message.clone(),
                });
            }
        }
    }

    let mark = Mark::at(chunks);
    typer.insert(State {
        env,
        items,
        errors,
        warnings,
        depth,
        mark,
    });
    stats.chunks_typed += 1;
    Ok(())
}

/// Resolves a `ModuleClosing` through its back-offset: recovers the
/// environment that was live outside the module, folds the inner states
/// into one typed module, and binds it there.
///
/// The back-offset points into a chunk-history prefix the typer already
/// walked past; this is exactly why chunks carry marks and the histories
/// support absolute reads.
fn close_module(
    name: &str,
    back_offset: usize,
    chunk: &Chunk,
    chunks: &History<Chunk>,
    typer: &History<State>,
    depth_before: u32,
) -> Result<(TypedItem, Env, u32), Error> {
    let outer = match back_offset.checked_sub(1) {
        Some(i) => {
            typer
                .get(i)
                .ok_or_else(|| {
                    Error::Internal(format!(
                        "module close references missing typer state {i}"
                    ))
                })?
                .env
                .clone()
        }
        None => initial_env()?,
    };

    // Direct children: states after the opening, at the depth the module
    // body ran at. Nested modules already folded into their closing state.
    let mut children = Vec::new();
    for idx in (back_offset + 1)..typer.offset() {
        if let Some(state) = typer.get(idx) {
            if state.depth == depth_before {
                children.extend(state.items.iter().cloned());
            }
        }
    }

    let name_range = match chunks.get(back_offset) {
        Some(Chunk {
            kind: ChunkKind::EnterModule { name_range, .. },
            ..
        }) => *name_range,
        _ => {
            return Err(Error::Internal(format!(
                "module close back-offset {back_offset} does not point at an opening"
            )));
        }
    };
    let open_range = chunks
        .get(back_offset)
        .map(|c| c.range)
        .unwrap_or(chunk.range);

    let sig = std::sync::Arc::new(signature_of_items(&children));
    let (env, stamp) = outer.bind_module(name, sig.clone());
    let module = TypedItem::Module {
        name: name.to_string(),
        name_range,
        range: open_range.cover(chunk.range),
        items: children,
        sig,
        stamp,
    };
    Ok((module, env, depth_before.saturating_sub(1)))
}

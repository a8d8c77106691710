//! Query adapters: read-only projections of the current typer state.
//!
//! Every adapter reads the histories through [`Buffer`] accessors and never
//! mutates them.

pub mod complete;
pub mod errors;
pub mod outline;
pub mod refactor_open;
pub mod type_at;

#[cfg(test)]
mod outline_tests;
#[cfg(test)]
mod refactor_open_tests;

use text_size::TextSize;

use crate::Buffer;
use crate::typer::env::{Env, initial_env};

/// Environment in effect at an offset: the state of the deepest chunk that
/// ends at or before it.
pub(crate) fn env_at(buffer: &Buffer, offset: TextSize) -> Env {
    let mut best: Option<Env> = None;
    for (idx, chunk) in buffer.chunks().iter_past().enumerate() {
        if chunk.range.end() <= offset {
            if let Some(state) = buffer.typer().get(idx) {
                best = Some(state.env.clone());
            }
        } else {
            break;
        }
    }
    match best {
        Some(env) => env,
        None => initial_env().unwrap_or_default(),
    }
}

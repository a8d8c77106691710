//! Chunking: carving a token stream into top-level constructs.
//!
//! The chunker recognizes one construct at a time and emits it into a chunk
//! history, so a syntax error in the middle of a buffer leaves every earlier
//! construct — and, after resynchronization, every later well-formed one —
//! available to the typer. Each chunk carries a [`Mark`] into the token
//! history; an edit rewinds both histories to the deepest point they still
//! agree on and re-parses only the suffix.

pub mod ast;

mod grammar;
mod parser;


use std::sync::Arc;

use kestrel_core::Mark;
use text_size::{TextRange, TextSize};

use crate::syntax::Token;
use ast::DefGroup;

pub use parser::{ChunkParser, Counters, resync};

/// What a chunk is. Payload-carrying variants hold the parse result so the
/// typer never re-reads tokens.
#[derive(Debug, Clone)]
pub enum ChunkKind {
    /// `module M = struct` — begins a nested structure. Any signature
    /// constraint between the name and `=` has been stripped.
    EnterModule { name: String, name_range: TextRange },
    /// `end` closing a module; `back_offset` is the chunk-history offset of
    /// the matching opening.
    LeaveModule { name: String, back_offset: usize },
    /// A completed top-level construct: a `let` group, `type` group,
    /// `exception`, `open`, `class`, or module alias.
    Definition(Arc<DefGroup>),
    /// The previous definition must be re-read together with the current
    /// tokens (`and` seen after the boundary was already emitted). Never
    /// stored: the driver consumes it to rewind and re-parse.
    Rollback,
    /// End of input in an accepting state.
    Done,
    /// End of input in the middle of a construct.
    Unterminated,
    /// The parser failed and resynchronized past the error.
    SyntaxError {
        message: String,
        error_offset: TextSize,
    },
}

/// One element of the chunk history.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub kind: ChunkKind,
    /// Tokens consumed by this chunk; `range.end()` is the end of the last
    /// consumed token.
    pub range: TextRange,
    /// Token-history cursor right after this chunk was emitted (lookahead
    /// already pushed back).
    pub mark: Mark<Token>,
}

/// The typer's view of a chunk, after post-processing the kind stream.
#[derive(Debug, Clone, Copy)]
pub enum ChunkItem<'a> {
    ModuleOpening {
        name: &'a str,
        name_range: TextRange,
    },
    Definitions(&'a DefGroup),
    ModuleClosing {
        name: &'a str,
        back_offset: usize,
    },
}

impl Chunk {
    /// Projects this chunk to what the typer consumes. `None` for chunks
    /// that carry no items (`Done`, `Unterminated`, errors).
    pub fn item(&self) -> Option<ChunkItem<'_>> {
        match &self.kind {
            ChunkKind::EnterModule { name, name_range } => Some(ChunkItem::ModuleOpening {
                name,
                name_range: *name_range,
            }),
            ChunkKind::Definition(group) => Some(ChunkItem::Definitions(group)),
            ChunkKind::LeaveModule { name, back_offset } => Some(ChunkItem::ModuleClosing {
                name,
                back_offset: *back_offset,
            }),
            _ => None,
        }
    }
}

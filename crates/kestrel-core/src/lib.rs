//! Core data structures for the kestrel analysis service.
//!
//! Two building blocks, shared by the lexer, the chunker and the typer:
//!
//! - [`History`]: a zipper sequence with a cursor separating *past* from
//!   *future*, plus [`Mark`]s that survive edits and [`rewind`] for
//!   correlated invalidation across histories.
//! - [`Pos`] / [`LineIndex`]: line/column/offset positions and the
//!   offset↔position conversion table for a buffer.

mod history;
mod position;

#[cfg(test)]
mod history_tests;
#[cfg(test)]
mod position_tests;

pub use history::{History, Mark, rewind};
pub use position::{LineIndex, Pos};

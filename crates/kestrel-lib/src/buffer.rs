//! Per-buffer analysis session.
//!
//! One buffer owns one triple of histories — tokens, chunks, typer states —
//! created on open, mutated on every edit, dropped on close. Nothing is
//! shared across buffers except the memoized initial environment.

use kestrel_core::{History, LineIndex};
use text_size::TextSize;

use crate::Error;
use crate::chunk::{self, Chunk};
use crate::syntax::Token;
use crate::typer::{self, State, TyperStats};

pub struct Buffer {
    text: String,
    line_index: LineIndex,
    tokens: History<Token>,
    chunks: History<Chunk>,
    typer: History<State>,
    stats: TyperStats,
}

impl Buffer {
    /// Opens a buffer and runs the full pipeline over its contents.
    pub fn new(text: impl Into<String>) -> Result<Buffer, Error> {
        let mut buffer = Buffer {
            text: String::new(),
            line_index: LineIndex::new(""),
            tokens: History::new(),
            chunks: History::new(),
            typer: History::new(),
            stats: TyperStats::default(),
        };
        buffer.apply(text.into(), TextSize::from(0))?;
        Ok(buffer)
    }

    /// Replaces the buffer contents.
    ///
    /// The edit point is the first byte where the revisions differ;
    /// everything left of it is replayed from the histories rather than
    /// recomputed.
    pub fn update(&mut self, text: impl Into<String>) -> Result<(), Error> {
        let text = text.into();
        if text == self.text {
            return Ok(());
        }
        let edit = divergence(&self.text, &text);
        self.apply(text, edit)
    }

    fn apply(&mut self, text: String, edit: TextSize) -> Result<(), Error> {
        self.text = text;
        self.line_index = LineIndex::new(&self.text);
        chunk::resync(&mut self.tokens, &mut self.chunks, &self.text, edit)?;
        typer::sync(&mut self.chunks, &mut self.typer, &mut self.stats)?;
        tracing::debug!(
            edit = u32::from(edit),
            chunks = self.chunks.len(),
            "buffer resynchronized"
        );
        Ok(())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    /// The typer state at the cursor: everything known about the buffer.
    pub fn state(&self) -> Option<&State> {
        self.typer.prev()
    }

    /// All typer states, oldest first.
    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.typer.iter_past()
    }

    pub fn chunks(&self) -> &History<Chunk> {
        &self.chunks
    }

    pub fn typer(&self) -> &History<State> {
        &self.typer
    }

    pub fn stats(&self) -> TyperStats {
        self.stats
    }
}

/// First byte at which two revisions differ (clamped to the shorter one).
fn divergence(old: &str, new: &str) -> TextSize {
    let common = old
        .bytes()
        .zip(new.bytes())
        .take_while(|(a, b)| a == b)
        .count();
    TextSize::from(common as u32)
}

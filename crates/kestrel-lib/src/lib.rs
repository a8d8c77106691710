//! Kestrel: an editor-facing analysis service for an ML-family language.
//!
//! Editors send buffer contents and ask for type-at-point, completions,
//! outline and refactoring edits. Buffers are usually syntactically broken —
//! the user is typing — so analysis is built around three synchronized
//! zipper histories:
//!
//! - a **token history** filled by a replaying lexer ([`syntax`]),
//! - a **chunk history** produced by a resumable top-level parser ([`chunk`]),
//! - a **typer history** keeping one environment snapshot per chunk
//!   ([`typer`]).
//!
//! An edit seeks the token history to the edit point and cuts the suffix;
//! chunker and typer then rewind to their deepest still-valid anchor and
//! rebuild only what changed. [`query`] projects the current typer state to
//! editor-friendly answers; [`Buffer`] ties one triple of histories to one
//! document.

pub mod buffer;
pub mod cache;
pub mod chunk;
pub mod config;
pub mod diagnostics;
pub mod dispatch;
pub mod protocol;
pub mod query;
pub mod syntax;
pub mod typer;

pub use buffer::Buffer;

/// Failures that abort a request instead of becoming diagnostics.
///
/// Syntax and type errors never show up here — they are data, attached to
/// chunks and typer states. This enum is for the fatal cases only.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The memoized initial environment could not be built.
    #[error("initial environment unavailable: {0}")]
    InitialEnv(String),

    /// A project configuration file was present but unusable.
    #[error("configuration rejected: {0}")]
    Config(String),

    /// An invariant of the histories was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

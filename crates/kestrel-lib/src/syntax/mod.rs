//! Lexing: raw tokens and the history-backed replay adapter.

mod replay;
mod token;

#[cfg(test)]
mod replay_tests;
#[cfg(test)]
mod token_tests;

pub use replay::{ReplayLexer, seek_to_offset};
pub use token::{Token, TokenKind, lex_one, token_text};

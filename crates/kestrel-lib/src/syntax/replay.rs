//! The history-backed lexer adapter.
//!
//! Every consumed token goes through the token history: if the cursor's
//! future already holds the token for the current lexing position it is
//! replayed, otherwise the raw lexer produces it and it is recorded at the
//! cursor. Repositioning the history therefore replays tokens without
//! rescanning; only text right of the last edit is ever lexed twice.

use std::cmp::Ordering;

use kestrel_core::History;
use text_size::TextSize;

use super::token::{Token, lex_one};

/// Seeks the token history so that every token wholly left of `offset` is in
/// the past and everything touching or beyond it is in the future.
///
/// A token *ending exactly at* the edit offset is pushed to the future too:
/// inserted text may extend it (`let` + `s` = `lets`). Callers follow up
/// with `cutoff` to discard the invalidated speculation.
pub fn seek_to_offset(history: &mut History<Token>, offset: TextSize) {
    history.seek(|t| {
        if t.range.end() < offset {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    });
}

/// Lexer wrapper that records and replays through a token history.
pub struct ReplayLexer<'h, 's> {
    history: &'h mut History<Token>,
    source: &'s str,
}

impl<'h, 's> ReplayLexer<'h, 's> {
    pub fn new(history: &'h mut History<Token>, source: &'s str) -> Self {
        Self { history, source }
    }

    /// Offset the next token must start at: the end of the last consumed one.
    pub fn offset(&self) -> TextSize {
        self.history
            .prev()
            .map_or(TextSize::from(0), |t| t.range.end())
    }

    /// Next token of any kind, trivia included.
    pub fn next_any(&mut self) -> Option<Token> {
        if let Some(&tok) = self.history.next() {
            if tok.range.start() == self.offset() {
                self.history.forward();
                return Some(tok);
            }
            // The future no longer lines up with the text; it is stale.
            self.history.cutoff();
        }
        let tok = lex_one(self.source, self.offset())?;
        self.history.insert(tok);
        Some(tok)
    }

    /// Next significant token. Skipped trivia is still recorded.
    pub fn next_token(&mut self) -> Option<Token> {
        loop {
            match self.next_any() {
                Some(t) if t.kind.is_trivia() => continue,
                other => return other,
            }
        }
    }

    /// Next significant token without consuming it.
    pub fn peek(&mut self) -> Option<Token> {
        let tok = self.next_token()?;
        self.push_back();
        Some(tok)
    }

    /// The significant token after the next one, without consuming either.
    pub fn peek_second(&mut self) -> Option<Token> {
        let first = self.next_token();
        let second = self.peek();
        if first.is_some() {
            // A failed peek at EOF leaves trailing trivia consumed; drop it
            // before returning the first token.
            while self.history.prev().is_some_and(|t| t.kind.is_trivia()) {
                self.history.backward();
            }
            self.push_back();
        }
        second
    }

    /// Returns the last consumed significant token to the stream, together
    /// with the trivia preceding it.
    ///
    /// Used when a construct boundary is recognized one token too late: the
    /// lookahead goes back so the next construct starts with it. Leading
    /// trivia goes back too, keeping chunk marks free of trailing blanks.
    pub fn push_back(&mut self) {
        self.history.backward();
        while self.history.prev().is_some_and(|t| t.kind.is_trivia()) {
            self.history.backward();
        }
    }

    pub fn history(&mut self) -> &mut History<Token> {
        self.history
    }
}

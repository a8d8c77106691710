//! The chunk parser driver: a state machine over the replaying lexer.
//!
//! Grammar steps return a tagged [`Step`] instead of unwinding: the driver
//! loop sees every emission exactly once and can always continue the parse
//! afterwards. Syntax errors resynchronize on the next top-level keyword;
//! rollbacks rewind one chunk and re-parse the extended span with the
//! suppression counter armed.

use std::cmp::Ordering;

use kestrel_core::{History, Mark, rewind};
use text_size::{TextRange, TextSize};

use crate::Error;
use crate::syntax::{ReplayLexer, Token, TokenKind, seek_to_offset};

use super::{Chunk, ChunkKind};

/// Emission counters shared between the driver and the grammar, threaded as
/// an explicit record.
#[derive(Debug, Clone, Copy, Default)]
pub struct Counters {
    /// How many prospective group boundaries to suppress. Armed by the
    /// rollback machinery to coalesce `and`-joined items.
    pub filter_first: u32,
    /// Open inline module constructs (`let module … in`). No chunk is
    /// emitted while this is positive.
    pub nesting: u32,
}

/// What one grammar step produced.
pub(super) enum Step {
    /// Nothing to emit (stray separators); keep scanning.
    Continue,
    Emit(ChunkKind, TextRange),
    Fail(ParseAbort),
}

/// A parse failure, reported without unwinding the driver.
pub(super) struct ParseAbort {
    /// Start of the construct being parsed.
    pub start: TextSize,
    /// Where the parse stopped making sense.
    pub at: TextSize,
    pub message: String,
    /// True when the input ended mid-construct.
    pub eof: bool,
}

struct OpenModule {
    name: String,
    chunk_offset: usize,
}

pub struct ChunkParser<'h, 's> {
    pub(super) lexer: ReplayLexer<'h, 's>,
    chunks: &'h mut History<Chunk>,
    pub(super) counters: Counters,
    pub(super) source: &'s str,
    pub(super) construct_start: TextSize,
    open_modules: Vec<OpenModule>,
    rollbacks: u32,
    /// Start of the construct currently being re-parsed after rollbacks.
    /// `rollbacks` holds until an emission starts elsewhere.
    rollback_start: Option<TextSize>,
}

impl<'h, 's> ChunkParser<'h, 's> {
    pub fn new(
        tokens: &'h mut History<Token>,
        chunks: &'h mut History<Chunk>,
        source: &'s str,
    ) -> Self {
        // Rebuild the open-module stack from the surviving prefix so a
        // resumed parse closes the right modules.
        let mut open_modules = Vec::new();
        for (i, chunk) in chunks.iter_past().enumerate() {
            match &chunk.kind {
                ChunkKind::EnterModule { name, .. } => open_modules.push(OpenModule {
                    name: name.clone(),
                    chunk_offset: i,
                }),
                ChunkKind::LeaveModule { .. } => {
                    open_modules.pop();
                }
                _ => {}
            }
        }
        Self {
            lexer: ReplayLexer::new(tokens, source),
            chunks,
            counters: Counters::default(),
            source,
            construct_start: TextSize::from(0),
            open_modules,
            rollbacks: 0,
            rollback_start: None,
        }
    }

    /// Runs the driver until `Done` or `Unterminated`.
    pub fn run(&mut self) -> Result<(), Error> {
        loop {
            match self.next_step() {
                Step::Continue => continue,
                Step::Emit(ChunkKind::Rollback, _) => self.roll_back()?,
                Step::Emit(kind, range) => {
                    let stop = matches!(kind, ChunkKind::Done | ChunkKind::Unterminated);
                    self.emit(kind, range);
                    if stop {
                        return Ok(());
                    }
                }
                Step::Fail(abort) => {
                    if abort.eof {
                        self.counters.nesting = 0;
                        let range = TextRange::new(abort.start, TextSize::of(self.source));
                        self.emit(ChunkKind::Unterminated, range);
                        return Ok(());
                    }
                    self.recover(abort);
                }
            }
        }
    }

    /// One cycle of the state machine: feed the next construct.
    fn next_step(&mut self) -> Step {
        let Some(tok) = self.lexer.peek() else {
            let eof = TextSize::of(self.source);
            // End of input inside an unclosed module is not an accepting
            // state.
            let kind = if self.open_modules.is_empty() {
                ChunkKind::Done
            } else {
                ChunkKind::Unterminated
            };
            return Step::Emit(kind, TextRange::empty(eof));
        };
        self.construct_start = tok.range.start();
        match tok.kind {
            TokenKind::SemiSemi => {
                self.lexer.next_token();
                Step::Continue
            }
            TokenKind::KwLet => self.step(Self::let_group),
            TokenKind::KwType => self.step(Self::type_group),
            TokenKind::KwException => self.step(Self::exception_item),
            TokenKind::KwOpen => self.step(Self::open_item),
            TokenKind::KwClass => self.step(Self::class_item),
            TokenKind::KwModule => self.step(Self::module_binding),
            TokenKind::KwEnd => self.step(Self::module_end),
            TokenKind::KwAnd => self.and_at_toplevel(tok),
            _ => {
                self.lexer.next_token();
                Step::Fail(ParseAbort {
                    start: tok.range.start(),
                    at: tok.range.start(),
                    message: "expected a definition".to_string(),
                    eof: false,
                })
            }
        }
    }

    fn step(
        &mut self,
        parse: fn(&mut Self) -> Result<(ChunkKind, TextRange), ParseAbort>,
    ) -> Step {
        match parse(self) {
            Ok((kind, range)) => Step::Emit(kind, range),
            Err(abort) => Step::Fail(abort),
        }
    }

    /// `and` at the top level extends the previous definition: signal a
    /// rollback so the driver re-reads the previous chunk together with the
    /// current tokens.
    fn and_at_toplevel(&mut self, tok: Token) -> Step {
        let extendable = matches!(
            self.chunks.prev(),
            Some(Chunk {
                kind: ChunkKind::Definition(group),
                ..
            }) if matches!(
                group.items.first(),
                Some(super::ast::TopItem::Let { .. } | super::ast::TopItem::Type(_))
            )
        );
        if extendable {
            // The `and` stays in the stream; the re-parse consumes it.
            Step::Emit(ChunkKind::Rollback, tok.range)
        } else {
            self.lexer.next_token();
            Step::Fail(ParseAbort {
                start: tok.range.start(),
                at: tok.range.start(),
                message: "`and` does not follow a definition it could extend".to_string(),
                eof: false,
            })
        }
    }

    /// Drops the previous definition, seeks the token history back to its
    /// start and re-arms the suppression counter. The next cycle re-parses
    /// the combined span.
    fn roll_back(&mut self) -> Result<(), Error> {
        let Some(prev) = self.chunks.remove() else {
            return Err(Error::Internal(
                "rollback signalled with an empty chunk history".to_string(),
            ));
        };
        self.rollbacks += 1;
        self.counters.filter_first = self.rollbacks;
        self.rollback_start = Some(prev.range.start());
        let target = prev.range.start();
        self.lexer.history().seek(|t| {
            if t.range.start() < target {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        });
        Ok(())
    }

    fn emit(&mut self, kind: ChunkKind, range: TextRange) {
        debug_assert_eq!(self.counters.nesting, 0, "emission inside an inline module");
        if let ChunkKind::EnterModule { name, .. } = &kind {
            self.open_modules.push(OpenModule {
                name: name.clone(),
                chunk_offset: self.chunks.offset(),
            });
        }
        let mark = Mark::at(self.lexer.history());
        self.chunks.insert(Chunk { kind, range, mark });
        // The emission of the rolled-back span itself keeps the counter: a
        // following `and` must re-arm one suppression deeper.
        if self.rollback_start != Some(range.start()) {
            self.rollbacks = 0;
            self.rollback_start = None;
        }
        self.counters.filter_first = 0;
    }

    /// Skips to the next synchronizing token, emits a `SyntaxError` chunk
    /// and leaves the parser in its initial state.
    fn recover(&mut self, abort: ParseAbort) {
        self.counters = Counters::default();
        let mut end = self.lexer.offset().max(abort.at);
        while let Some(tok) = self.lexer.peek() {
            if tok.kind.starts_definition()
                || tok.kind == TokenKind::KwEnd
                || tok.kind == TokenKind::SemiSemi
            {
                break;
            }
            self.lexer.next_token();
            end = tok.range.end();
        }
        let range = TextRange::new(abort.start, end.max(abort.at));
        self.emit(
            ChunkKind::SyntaxError {
                message: abort.message,
                error_offset: abort.at,
            },
            range,
        );
    }

    pub(super) fn matching_open_module(&mut self) -> Option<(String, usize)> {
        self.open_modules
            .pop()
            .map(|frame| (frame.name, frame.chunk_offset))
    }
}

/// Re-chunks after an edit at `edit_offset` (0 for a fresh buffer).
///
/// Seeks the token history to the edit, discards stale tokens, rewinds the
/// chunk history to the deepest chunk still wholly left of the edit, and
/// resumes parsing from there. Tokens between the resume point and the edit
/// are replayed from the history, so re-scanning is confined to the changed
/// suffix.
pub fn resync(
    tokens: &mut History<Token>,
    chunks: &mut History<Chunk>,
    source: &str,
    edit_offset: TextSize,
) -> Result<(), Error> {
    seek_to_offset(tokens, edit_offset);
    tokens.cutoff();
    rewind(|c: &Chunk| c.mark, tokens, chunks);
    chunks.cutoff();
    ChunkParser::new(tokens, chunks, source).run()
}

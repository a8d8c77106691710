use kestrel_core::History;
use text_size::TextSize;

use super::replay::{ReplayLexer, seek_to_offset};
use super::token::{Token, TokenKind};

fn drain(history: &mut History<Token>, source: &str) -> Vec<Token> {
    let mut lexer = ReplayLexer::new(history, source);
    let mut out = Vec::new();
    while let Some(t) = lexer.next_token() {
        out.push(t);
    }
    out
}

#[test]
fn records_trivia_while_filtering() {
    let mut history = History::new();
    let significant = drain(&mut history, "let u = ()");
    assert_eq!(
        significant.iter().map(|t| t.kind).collect::<Vec<_>>(),
        vec![
            TokenKind::KwLet,
            TokenKind::LowerIdent,
            TokenKind::Eq,
            TokenKind::LParen,
            TokenKind::RParen
        ]
    );
    // Whitespace was filtered from the stream but recorded in the history.
    assert_eq!(history.len(), 8);
}

#[test]
fn replays_after_seek_without_rescanning() {
    let source = "let u = 1";
    let mut history = History::new();
    let first = drain(&mut history, source);

    history.seek_offset(0);
    let second = drain(&mut history, source);
    assert_eq!(first, second);
    // Replay reuses elements; nothing was re-inserted.
    assert_eq!(history.len(), 7);
}

#[test]
fn peek_does_not_consume() {
    let mut history = History::new();
    let mut lexer = ReplayLexer::new(&mut history, "let u");
    assert_eq!(lexer.peek().map(|t| t.kind), Some(TokenKind::KwLet));
    assert_eq!(lexer.next_token().map(|t| t.kind), Some(TokenKind::KwLet));
    assert_eq!(lexer.next_token().map(|t| t.kind), Some(TokenKind::LowerIdent));
    assert_eq!(lexer.peek(), None);
}

#[test]
fn push_back_replays_lookahead() {
    let mut history = History::new();
    let mut lexer = ReplayLexer::new(&mut history, "let u");
    let first = lexer.next_token().unwrap();
    lexer.push_back();
    assert_eq!(lexer.next_token(), Some(first));
}

#[test]
fn edit_invalidates_token_touching_offset() {
    // "let u = 1" edited at offset 8 (inside the `1`... just before it).
    let old = "let u = 1";
    let mut history = History::new();
    drain(&mut history, old);

    let edit = TextSize::from(8);
    seek_to_offset(&mut history, edit);
    // Tokens wholly before the edit stay: `let`, ` `, `u`, ` `, `=`, ` `.
    assert_eq!(history.offset(), 6);
    history.cutoff();

    let new = "let u = 21";
    let tail = drain(&mut history, new);
    assert_eq!(tail.len(), 1);
    assert_eq!(tail[0].kind, TokenKind::Int);
    assert_eq!(tail[0].range, text_size::TextRange::new(8.into(), 10.into()));
}

#[test]
fn edit_at_token_end_invalidates_that_token() {
    // Appending `s` to `let` must re-lex `let` into `lets`.
    let mut history = History::new();
    drain(&mut history, "let u");

    seek_to_offset(&mut history, TextSize::from(3));
    assert_eq!(history.offset(), 0);
    history.cutoff();

    let tail = drain(&mut history, "lets u");
    assert_eq!(tail[0].kind, TokenKind::LowerIdent);
}

#[test]
fn stale_future_is_discarded_on_mismatch() {
    let source = "let u = 1";
    let mut history = History::new();
    drain(&mut history, source);

    // Punch a hole in the past: the future no longer lines up with the
    // lexing position, so replay must drop it and re-lex.
    history.seek_offset(2);
    history.remove();
    let before = history.len();

    let mut lexer = ReplayLexer::new(&mut history, source);
    let next = lexer.next_token().unwrap();
    assert_eq!(next.kind, TokenKind::LowerIdent);
    assert!(history.len() < before);
}

//! Tokens of the analyzed language.
//!
//! Span-based tokens without stored text — text is sliced from the source
//! when needed. Consecutive unrecognized bytes coalesce into single
//! `Garbage` tokens so malformed input stays manageable.

use logos::Logos;
use text_size::{TextRange, TextSize};

/// Grammar terminals. Comments and whitespace are real tokens: the token
/// history records them, consumers filter them.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    #[token("let")]
    KwLet,
    #[token("rec")]
    KwRec,
    #[token("and")]
    KwAnd,
    #[token("in")]
    KwIn,
    #[token("type")]
    KwType,
    #[token("exception")]
    KwException,
    #[token("module")]
    KwModule,
    #[token("struct")]
    KwStruct,
    #[token("sig")]
    KwSig,
    #[token("end")]
    KwEnd,
    #[token("open")]
    KwOpen,
    #[token("class")]
    KwClass,
    #[token("object")]
    KwObject,
    #[token("fun")]
    KwFun,
    #[token("if")]
    KwIf,
    #[token("then")]
    KwThen,
    #[token("else")]
    KwElse,
    #[token("of")]
    KwOf,
    #[token("begin")]
    KwBegin,
    #[token("val")]
    KwVal,
    #[token("true")]
    KwTrue,
    #[token("false")]
    KwFalse,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,

    #[token("->")]
    Arrow,
    #[token("=")]
    Eq,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,
    #[token(";;")]
    SemiSemi,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token("|")]
    Bar,
    #[token("*")]
    Star,

    /// Any other operator-looking run: `+`, `^`, `<=`, `@@`, …
    #[regex(r"[!$%&*+\-./:<=>?@^|~][!$%&*+\-./:<=>?@^|~]*", priority = 1)]
    Operator,

    /// `'a`, `'state`, …
    #[regex(r"'[a-z][a-zA-Z0-9_]*")]
    TypeVar,

    #[regex(r"[0-9][0-9_]*")]
    Int,

    #[regex(r#""(?:[^"\\]|\\.)*""#)]
    Str,

    #[regex(r"[a-z_][a-zA-Z0-9_']*")]
    LowerIdent,

    #[regex(r"[A-Z][a-zA-Z0-9_']*")]
    UpperIdent,

    /// `(* … *)`, nesting allowed, runs to EOF when unterminated.
    #[token("(*", lex_comment)]
    Comment,

    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    /// Coalesced unrecognized bytes.
    Garbage,
}

fn lex_comment(lex: &mut logos::Lexer<TokenKind>) -> bool {
    let bytes = lex.remainder().as_bytes();
    let mut depth = 1usize;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'(' && bytes.get(i + 1) == Some(&b'*') {
            depth += 1;
            i += 2;
        } else if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b')') {
            depth -= 1;
            i += 2;
            if depth == 0 {
                lex.bump(i);
                return true;
            }
        } else {
            i += 1;
        }
    }
    lex.bump(bytes.len());
    true
}

impl TokenKind {
    #[inline]
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::Comment)
    }

    /// Keywords that may start a top-level construct. The chunker
    /// resynchronizes on these after a syntax error.
    #[inline]
    pub fn starts_definition(self) -> bool {
        matches!(
            self,
            TokenKind::KwLet
                | TokenKind::KwType
                | TokenKind::KwException
                | TokenKind::KwModule
                | TokenKind::KwOpen
                | TokenKind::KwClass
        )
    }
}

/// Zero-copy token: kind + span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub range: TextRange,
}

impl Token {
    #[inline]
    pub fn new(kind: TokenKind, range: TextRange) -> Self {
        Self { kind, range }
    }
}

/// The text slice of a token. O(1) slice into the source.
#[inline]
pub fn token_text<'s>(source: &'s str, token: &Token) -> &'s str {
    &source[std::ops::Range::<usize>::from(token.range)]
}

fn shift(span: std::ops::Range<usize>, base: u32) -> TextRange {
    TextRange::new(
        TextSize::from(base + span.start as u32),
        TextSize::from(base + span.end as u32),
    )
}

/// Lexes the single token starting at `offset`, or `None` at end of input.
///
/// Stateless: each call builds a fresh lexer over the tail of the source, so
/// callers are free to reposition between calls. Unrecognized bytes are
/// coalesced into one `Garbage` token per run.
pub fn lex_one(source: &str, offset: TextSize) -> Option<Token> {
    let base = u32::from(offset);
    let mut lexer = TokenKind::lexer(&source[usize::from(offset)..]);
    match lexer.next()? {
        Ok(kind) => Some(Token::new(kind, shift(lexer.span(), base))),
        Err(()) => {
            let start = lexer.span().start;
            let mut end = lexer.span().end;
            while let Some(Err(())) = lexer.next() {
                end = lexer.span().end;
            }
            Some(Token::new(TokenKind::Garbage, shift(start..end, base)))
        }
    }
}

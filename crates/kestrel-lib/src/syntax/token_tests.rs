use text_size::TextSize;

use super::token::{Token, TokenKind, lex_one, token_text};

fn lex_all(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut offset = TextSize::from(0);
    while let Some(tok) = lex_one(source, offset) {
        offset = tok.range.end();
        tokens.push(tok);
    }
    tokens
}

fn kinds(source: &str) -> Vec<TokenKind> {
    lex_all(source)
        .into_iter()
        .filter(|t| !t.kind.is_trivia())
        .map(|t| t.kind)
        .collect()
}

#[test]
fn keywords_beat_identifiers() {
    use TokenKind::*;
    assert_eq!(
        kinds("let rec and module struct end open"),
        vec![KwLet, KwRec, KwAnd, KwModule, KwStruct, KwEnd, KwOpen]
    );
    // Prefix of a keyword is still an identifier.
    assert_eq!(kinds("lets ending"), vec![LowerIdent, LowerIdent]);
}

#[test]
fn qualified_path_tokens() {
    use TokenKind::*;
    assert_eq!(
        kinds("M.N.u"),
        vec![UpperIdent, Dot, UpperIdent, Dot, LowerIdent]
    );
}

#[test]
fn punctuation_and_operators() {
    use TokenKind::*;
    assert_eq!(kinds("-> = | * ;;"), vec![Arrow, Eq, Bar, Star, SemiSemi]);
    assert_eq!(kinds("+ ^ <= @@"), vec![Operator, Operator, Operator, Operator]);
}

#[test]
fn literals() {
    use TokenKind::*;
    assert_eq!(kinds(r#"42 "hi \" there" true ()"#), vec![Int, Str, KwTrue, LParen, RParen]);
}

#[test]
fn type_variables() {
    assert_eq!(kinds("'a 'state"), vec![TokenKind::TypeVar, TokenKind::TypeVar]);
}

#[test]
fn comments_nest() {
    let src = "let (* outer (* inner *) still outer *) u";
    let tokens = lex_all(src);
    let comment = tokens.iter().find(|t| t.kind == TokenKind::Comment).unwrap();
    assert_eq!(token_text(src, comment), "(* outer (* inner *) still outer *)");
    assert_eq!(kinds(src), vec![TokenKind::KwLet, TokenKind::LowerIdent]);
}

#[test]
fn unterminated_comment_runs_to_eof() {
    let src = "let u (* dangling";
    let tokens = lex_all(src);
    assert_eq!(tokens.last().unwrap().kind, TokenKind::Comment);
    assert_eq!(tokens.last().unwrap().range.end(), TextSize::of(src));
}

#[test]
fn garbage_coalesces() {
    let src = "let §§§ u";
    let tokens = lex_all(src);
    let garbage: Vec<_> = tokens.iter().filter(|t| t.kind == TokenKind::Garbage).collect();
    assert_eq!(garbage.len(), 1);
    assert_eq!(token_text(src, garbage[0]), "§§§");
}

#[test]
fn tokens_are_contiguous() {
    let src = "module M = struct\n  let u = () (* c *)\nend\n";
    let mut end = TextSize::from(0);
    for tok in lex_all(src) {
        assert_eq!(tok.range.start(), end);
        end = tok.range.end();
    }
    assert_eq!(end, TextSize::of(src));
}

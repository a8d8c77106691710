//! Construct grammar: recursive descent over the replaying lexer.
//!
//! Group boundaries go through [`ChunkParser::join_group_boundary`], the one
//! place where the shared counters decide between "extend the current group"
//! and "stop so the driver can emit".

use std::sync::Arc;

use text_size::{TextRange, TextSize};

use crate::syntax::{Token, TokenKind, token_text};

use super::ChunkKind;
use super::ast::{
    Binding, CtorDecl, DefGroup, Expr, ExprKind, FieldDecl, ModuleExpr, Path, PathSeg, Pattern,
    TopItem, TypeDecl, TypeDeclBody, TypeExpr, TypeExprKind,
};
use super::parser::{ChunkParser, ParseAbort};

fn seg(source: &str, tok: Token) -> PathSeg {
    PathSeg {
        name: token_text(source, &tok).to_string(),
        range: tok.range,
    }
}

fn single(item: TopItem) -> DefGroup {
    DefGroup {
        rec_flag: false,
        items: vec![item],
    }
}

impl ChunkParser<'_, '_> {
    fn peek_kind(&mut self) -> Option<TokenKind> {
        self.lexer.peek().map(|t| t.kind)
    }

    fn peek_second_kind(&mut self) -> Option<TokenKind> {
        self.lexer.peek_second().map(|t| t.kind)
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        match self.lexer.peek() {
            Some(t) if t.kind == kind => self.lexer.next_token(),
            _ => None,
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseAbort> {
        match self.eat(kind) {
            Some(t) => Ok(t),
            None => Err(self.abort_expected(what)),
        }
    }

    fn abort_expected(&mut self, what: &str) -> ParseAbort {
        self.abort_here(format!("expected {what}"))
    }

    fn abort_here(&mut self, message: String) -> ParseAbort {
        match self.lexer.peek() {
            Some(t) => ParseAbort {
                start: self.construct_start,
                at: t.range.start(),
                message,
                eof: false,
            },
            None => ParseAbort {
                start: self.construct_start,
                at: TextSize::of(self.source),
                message,
                eof: true,
            },
        }
    }

    fn text(&self, tok: Token) -> String {
        token_text(self.source, &tok).to_string()
    }

    /// At an `and` between two items of a group: join them, or stop so the
    /// driver can emit? Joins unconditionally inside inline modules; at the
    /// top level only while `filter_first` owes suppressions from a
    /// rollback.
    fn join_group_boundary(&mut self) -> bool {
        if self.counters.nesting > 0 {
            return true;
        }
        if self.counters.filter_first > 0 {
            self.counters.filter_first -= 1;
            return true;
        }
        false
    }

    // --- let groups ---

    pub(super) fn let_group(&mut self) -> Result<(ChunkKind, TextRange), ParseAbort> {
        let (group, range) = self.let_items()?;
        Ok((ChunkKind::Definition(Arc::new(group)), range))
    }

    fn let_items(&mut self) -> Result<(DefGroup, TextRange), ParseAbort> {
        let kw = self.expect(TokenKind::KwLet, "`let`")?;
        let rec_flag = self.eat(TokenKind::KwRec).is_some();
        let mut items = Vec::new();
        let mut end = kw.range.end();
        loop {
            let binding = self.binding()?;
            end = binding.range.end();
            items.push(TopItem::Let { binding });
            if self.peek_kind() == Some(TokenKind::KwAnd) && self.join_group_boundary() {
                self.lexer.next_token();
                continue;
            }
            break;
        }
        Ok((DefGroup { rec_flag, items }, TextRange::new(kw.range.start(), end)))
    }

    fn binding(&mut self) -> Result<Binding, ParseAbort> {
        let pat = self.pattern()?;
        let mut params = Vec::new();
        while self.at_param_start() {
            params.push(self.pattern()?);
        }
        let ann = if self.eat(TokenKind::Colon).is_some() {
            Some(self.type_expr()?)
        } else {
            None
        };
        self.expect(TokenKind::Eq, "`=` in binding")?;
        let body = self.expr()?;
        let range = TextRange::new(pat.range().start(), body.range.end());
        Ok(Binding {
            pat,
            params,
            ann,
            body,
            range,
        })
    }

    fn at_param_start(&mut self) -> bool {
        match self.peek_kind() {
            Some(TokenKind::LowerIdent) => true,
            Some(TokenKind::LParen) => self.peek_second_kind() == Some(TokenKind::RParen),
            _ => false,
        }
    }

    fn pattern(&mut self) -> Result<Pattern, ParseAbort> {
        match self.peek_kind() {
            Some(TokenKind::LowerIdent) => {
                let tok = self.expect(TokenKind::LowerIdent, "a pattern")?;
                let name = self.text(tok);
                if name == "_" {
                    Ok(Pattern::Wildcard { range: tok.range })
                } else {
                    Ok(Pattern::Var {
                        name,
                        range: tok.range,
                    })
                }
            }
            Some(TokenKind::LParen) => {
                let open = self.expect(TokenKind::LParen, "a pattern")?;
                let close = self.expect(TokenKind::RParen, "`)` in unit pattern")?;
                Ok(Pattern::Unit {
                    range: open.range.cover(close.range),
                })
            }
            _ => Err(self.abort_expected("a pattern")),
        }
    }

    // --- type groups ---

    pub(super) fn type_group(&mut self) -> Result<(ChunkKind, TextRange), ParseAbort> {
        let (group, range) = self.type_items()?;
        Ok((ChunkKind::Definition(Arc::new(group)), range))
    }

    fn type_items(&mut self) -> Result<(DefGroup, TextRange), ParseAbort> {
        let kw = self.expect(TokenKind::KwType, "`type`")?;
        let start = kw.range.start();
        let mut items = Vec::new();
        let mut decl_start = start;
        let mut end = kw.range.end();
        loop {
            let decl = self.type_decl(decl_start)?;
            end = decl.range.end();
            items.push(TopItem::Type(decl));
            if self.peek_kind() == Some(TokenKind::KwAnd) && self.join_group_boundary() {
                if let Some(and_tok) = self.lexer.next_token() {
                    decl_start = and_tok.range.start();
                }
                continue;
            }
            break;
        }
        Ok((
            DefGroup {
                rec_flag: false,
                items,
            },
            TextRange::new(start, end),
        ))
    }

    fn type_decl(&mut self, start: TextSize) -> Result<TypeDecl, ParseAbort> {
        let params = self.type_params()?;
        let name_tok = self.expect(TokenKind::LowerIdent, "a type name")?;
        let name = self.text(name_tok);
        let (body, end) = if self.eat(TokenKind::Eq).is_some() {
            let next = self.peek_kind();
            let starts_variant = next == Some(TokenKind::Bar)
                || (next == Some(TokenKind::UpperIdent)
                    && self.peek_second_kind() != Some(TokenKind::Dot));
            if starts_variant {
                self.variant_body()?
            } else if next == Some(TokenKind::LBrace) {
                self.record_body()?
            } else {
                let ty = self.type_expr()?;
                let end = ty.range.end();
                (TypeDeclBody::Alias(ty), end)
            }
        } else {
            (TypeDeclBody::Abstract, name_tok.range.end())
        };
        Ok(TypeDecl {
            name,
            name_range: name_tok.range,
            params,
            body,
            range: TextRange::new(start, end),
        })
    }

    /// `'a` or `('a, 'b)` before a type name.
    fn type_params(&mut self) -> Result<Vec<String>, ParseAbort> {
        if let Some(tok) = self.eat(TokenKind::TypeVar) {
            return Ok(vec![self.text(tok)[1..].to_string()]);
        }
        if self.peek_kind() == Some(TokenKind::LParen)
            && self.peek_second_kind() == Some(TokenKind::TypeVar)
        {
            self.lexer.next_token();
            let mut params = Vec::new();
            loop {
                let tok = self.expect(TokenKind::TypeVar, "a type parameter")?;
                params.push(self.text(tok)[1..].to_string());
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
            self.expect(TokenKind::RParen, "`)` after type parameters")?;
            return Ok(params);
        }
        Ok(Vec::new())
    }

    fn variant_body(&mut self) -> Result<(TypeDeclBody, TextSize), ParseAbort> {
        self.eat(TokenKind::Bar);
        let mut ctors = Vec::new();
        let mut end;
        loop {
            let name_tok = self.expect(TokenKind::UpperIdent, "a constructor name")?;
            end = name_tok.range.end();
            let arg = if self.eat(TokenKind::KwOf).is_some() {
                let ty = self.type_expr()?;
                end = ty.range.end();
                Some(ty)
            } else {
                None
            };
            ctors.push(CtorDecl {
                name: self.text(name_tok),
                range: name_tok.range,
                arg,
            });
            if self.eat(TokenKind::Bar).is_none() {
                break;
            }
        }
        Ok((TypeDeclBody::Variant(ctors), end))
    }

    fn record_body(&mut self) -> Result<(TypeDeclBody, TextSize), ParseAbort> {
        self.expect(TokenKind::LBrace, "`{`")?;
        let mut fields = Vec::new();
        loop {
            if self.peek_kind() == Some(TokenKind::RBrace) {
                break;
            }
            let name_tok = self.expect(TokenKind::LowerIdent, "a field name")?;
            self.expect(TokenKind::Colon, "`:` after field name")?;
            let ty = self.type_expr()?;
            fields.push(FieldDecl {
                name: self.text(name_tok),
                range: name_tok.range,
                ty,
            });
            if self.eat(TokenKind::Semi).is_none() {
                break;
            }
        }
        let close = self.expect(TokenKind::RBrace, "`}` to close record type")?;
        Ok((TypeDeclBody::Record(fields), close.range.end()))
    }

    // --- type expressions ---

    fn type_expr(&mut self) -> Result<TypeExpr, ParseAbort> {
        self.type_arrow()
    }

    fn type_arrow(&mut self) -> Result<TypeExpr, ParseAbort> {
        let lhs = self.type_tuple()?;
        if self.eat(TokenKind::Arrow).is_some() {
            let rhs = self.type_arrow()?;
            let range = lhs.range.cover(rhs.range);
            return Ok(TypeExpr {
                range,
                kind: TypeExprKind::Arrow(Box::new(lhs), Box::new(rhs)),
            });
        }
        Ok(lhs)
    }

    fn type_tuple(&mut self) -> Result<TypeExpr, ParseAbort> {
        let first = self.type_app()?;
        if self.peek_kind() != Some(TokenKind::Star) {
            return Ok(first);
        }
        let mut parts = vec![first];
        while self.eat(TokenKind::Star).is_some() {
            parts.push(self.type_app()?);
        }
        let range = parts[0].range.cover(parts[parts.len() - 1].range);
        Ok(TypeExpr {
            range,
            kind: TypeExprKind::Tuple(parts),
        })
    }

    /// Postfix constructor application: `int list`.
    fn type_app(&mut self) -> Result<TypeExpr, ParseAbort> {
        let mut acc = self.type_atom()?;
        while self.peek_kind() == Some(TokenKind::LowerIdent) {
            let tok = self.expect(TokenKind::LowerIdent, "a type name")?;
            let path = Path {
                segments: vec![seg(self.source, tok)],
                range: tok.range,
            };
            let range = acc.range.cover(tok.range);
            acc = TypeExpr {
                range,
                kind: TypeExprKind::Name {
                    path,
                    args: vec![acc],
                },
            };
        }
        Ok(acc)
    }

    fn type_atom(&mut self) -> Result<TypeExpr, ParseAbort> {
        match self.peek_kind() {
            Some(TokenKind::TypeVar) => {
                let tok = self.expect(TokenKind::TypeVar, "a type")?;
                Ok(TypeExpr {
                    range: tok.range,
                    kind: TypeExprKind::Var(self.text(tok)[1..].to_string()),
                })
            }
            Some(TokenKind::LowerIdent | TokenKind::UpperIdent) => {
                let path = self.type_path()?;
                Ok(TypeExpr {
                    range: path.range,
                    kind: TypeExprKind::Name {
                        path,
                        args: Vec::new(),
                    },
                })
            }
            Some(TokenKind::LParen) => {
                let open = self.expect(TokenKind::LParen, "a type")?;
                let inner = self.type_expr()?;
                let close = self.expect(TokenKind::RParen, "`)`")?;
                Ok(TypeExpr {
                    range: open.range.cover(close.range),
                    kind: inner.kind,
                })
            }
            _ => Err(self.abort_expected("a type")),
        }
    }

    /// `t`, `M.t`, `M.N.t` — type names end in a lowercase segment.
    fn type_path(&mut self) -> Result<Path, ParseAbort> {
        let mut segments = Vec::new();
        while self.peek_kind() == Some(TokenKind::UpperIdent)
            && self.peek_second_kind() == Some(TokenKind::Dot)
        {
            let tok = self.expect(TokenKind::UpperIdent, "a module name")?;
            segments.push(seg(self.source, tok));
            self.expect(TokenKind::Dot, "`.`")?;
        }
        let last = self.expect(TokenKind::LowerIdent, "a type name")?;
        segments.push(seg(self.source, last));
        let range = segments[0].range.cover(last.range);
        Ok(Path { segments, range })
    }

    // --- single-item definitions ---

    pub(super) fn exception_item(&mut self) -> Result<(ChunkKind, TextRange), ParseAbort> {
        let (item, range) = self.exception_def()?;
        Ok((ChunkKind::Definition(Arc::new(single(item))), range))
    }

    fn exception_def(&mut self) -> Result<(TopItem, TextRange), ParseAbort> {
        let kw = self.expect(TokenKind::KwException, "`exception`")?;
        let name_tok = self.expect(TokenKind::UpperIdent, "an exception name")?;
        let mut end = name_tok.range.end();
        let arg = if self.eat(TokenKind::KwOf).is_some() {
            let ty = self.type_expr()?;
            end = ty.range.end();
            Some(ty)
        } else {
            None
        };
        let range = TextRange::new(kw.range.start(), end);
        Ok((
            TopItem::Exception {
                name: self.text(name_tok),
                name_range: name_tok.range,
                arg,
                range,
            },
            range,
        ))
    }

    pub(super) fn open_item(&mut self) -> Result<(ChunkKind, TextRange), ParseAbort> {
        let (item, range) = self.open_def()?;
        Ok((ChunkKind::Definition(Arc::new(single(item))), range))
    }

    fn open_def(&mut self) -> Result<(TopItem, TextRange), ParseAbort> {
        let kw = self.expect(TokenKind::KwOpen, "`open`")?;
        let path = self.module_path()?;
        let range = TextRange::new(kw.range.start(), path.range.end());
        Ok((TopItem::Open { path, range }, range))
    }

    pub(super) fn class_item(&mut self) -> Result<(ChunkKind, TextRange), ParseAbort> {
        let (item, range) = self.class_def()?;
        Ok((ChunkKind::Definition(Arc::new(single(item))), range))
    }

    /// `class c = object … end`. The body is recognized but not analyzed:
    /// classes type as opaque.
    fn class_def(&mut self) -> Result<(TopItem, TextRange), ParseAbort> {
        let kw = self.expect(TokenKind::KwClass, "`class`")?;
        let name_tok = self.expect(TokenKind::LowerIdent, "a class name")?;
        self.expect(TokenKind::Eq, "`=` in class definition")?;
        self.expect(TokenKind::KwObject, "`object`")?;
        let end = self.skip_to_matching_end()?;
        let range = TextRange::new(kw.range.start(), end);
        Ok((
            TopItem::Class {
                name: self.text(name_tok),
                name_range: name_tok.range,
                range,
            },
            range,
        ))
    }

    /// Consumes tokens until the `end` matching an already-consumed opener.
    fn skip_to_matching_end(&mut self) -> Result<TextSize, ParseAbort> {
        let mut depth = 0u32;
        loop {
            let Some(tok) = self.lexer.next_token() else {
                return Err(self.abort_expected("`end`"));
            };
            match tok.kind {
                TokenKind::KwStruct
                | TokenKind::KwSig
                | TokenKind::KwObject
                | TokenKind::KwBegin => depth += 1,
                TokenKind::KwEnd => {
                    if depth == 0 {
                        return Ok(tok.range.end());
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }
    }

    // --- modules ---

    fn module_path(&mut self) -> Result<Path, ParseAbort> {
        let first = self.expect(TokenKind::UpperIdent, "a module name")?;
        let mut segments = vec![seg(self.source, first)];
        while self.peek_kind() == Some(TokenKind::Dot)
            && self.peek_second_kind() == Some(TokenKind::UpperIdent)
        {
            self.expect(TokenKind::Dot, "`.`")?;
            let tok = self.expect(TokenKind::UpperIdent, "a module name")?;
            segments.push(seg(self.source, tok));
        }
        let range = first.range.cover(segments[segments.len() - 1].range);
        Ok(Path { segments, range })
    }

    /// `module M … = struct` opens a chunked module; `module M = N` is an
    /// ordinary definition. A signature constraint before `=` is stripped.
    pub(super) fn module_binding(&mut self) -> Result<(ChunkKind, TextRange), ParseAbort> {
        let kw = self.expect(TokenKind::KwModule, "`module`")?;
        let name_tok = self.expect(TokenKind::UpperIdent, "a module name")?;
        if self.eat(TokenKind::Colon).is_some() {
            self.skip_module_type()?;
        }
        self.expect(TokenKind::Eq, "`=` in module binding")?;
        match self.peek_kind() {
            Some(TokenKind::KwStruct) => {
                let st = self.expect(TokenKind::KwStruct, "`struct`")?;
                Ok((
                    ChunkKind::EnterModule {
                        name: self.text(name_tok),
                        name_range: name_tok.range,
                    },
                    TextRange::new(kw.range.start(), st.range.end()),
                ))
            }
            Some(TokenKind::UpperIdent) => {
                let path = self.module_path()?;
                let range = TextRange::new(kw.range.start(), path.range.end());
                let item = TopItem::Module {
                    name: self.text(name_tok),
                    name_range: name_tok.range,
                    module: ModuleExpr::Alias(path),
                    range,
                };
                Ok((ChunkKind::Definition(Arc::new(single(item))), range))
            }
            _ => Err(self.abort_expected("`struct` or a module path")),
        }
    }

    fn skip_module_type(&mut self) -> Result<(), ParseAbort> {
        if self.eat(TokenKind::KwSig).is_some() {
            self.skip_to_matching_end()?;
            Ok(())
        } else {
            self.module_path().map(|_| ())
        }
    }

    pub(super) fn module_end(&mut self) -> Result<(ChunkKind, TextRange), ParseAbort> {
        let tok = self.expect(TokenKind::KwEnd, "`end`")?;
        match self.matching_open_module() {
            Some((name, back_offset)) => Ok((
                ChunkKind::LeaveModule { name, back_offset },
                tok.range,
            )),
            None => Err(ParseAbort {
                start: tok.range.start(),
                at: tok.range.start(),
                message: "unmatched `end`".to_string(),
                eof: false,
            }),
        }
    }

    /// Module expression in expression position. `struct` bumps the nesting
    /// counter: nothing inside an inline module is ever chunked.
    fn module_expr_inline(&mut self) -> Result<(ModuleExpr, TextSize), ParseAbort> {
        if self.eat(TokenKind::KwStruct).is_some() {
            self.counters.nesting += 1;
            let result = self.struct_items();
            self.counters.nesting -= 1;
            let (groups, end) = result?;
            Ok((ModuleExpr::Struct(groups), end))
        } else {
            let path = self.module_path()?;
            let end = path.range.end();
            Ok((ModuleExpr::Alias(path), end))
        }
    }

    /// Body of an inline `struct … end`, one group per construct.
    fn struct_items(&mut self) -> Result<(Vec<DefGroup>, TextSize), ParseAbort> {
        let mut groups = Vec::new();
        loop {
            match self.peek_kind() {
                None => return Err(self.abort_expected("`end`")),
                Some(TokenKind::KwEnd) => {
                    let tok = self.expect(TokenKind::KwEnd, "`end`")?;
                    return Ok((groups, tok.range.end()));
                }
                Some(TokenKind::SemiSemi) => {
                    self.lexer.next_token();
                }
                Some(TokenKind::KwLet) => {
                    let (group, _) = self.let_items()?;
                    groups.push(group);
                }
                Some(TokenKind::KwType) => {
                    let (group, _) = self.type_items()?;
                    groups.push(group);
                }
                Some(TokenKind::KwException) => {
                    let (item, _) = self.exception_def()?;
                    groups.push(single(item));
                }
                Some(TokenKind::KwOpen) => {
                    let (item, _) = self.open_def()?;
                    groups.push(single(item));
                }
                Some(TokenKind::KwClass) => {
                    let (item, _) = self.class_def()?;
                    groups.push(single(item));
                }
                Some(TokenKind::KwModule) => {
                    let (item, _) = self.module_def_inline()?;
                    groups.push(single(item));
                }
                _ => return Err(self.abort_expected("a definition or `end`")),
            }
        }
    }

    fn module_def_inline(&mut self) -> Result<(TopItem, TextRange), ParseAbort> {
        let kw = self.expect(TokenKind::KwModule, "`module`")?;
        let name_tok = self.expect(TokenKind::UpperIdent, "a module name")?;
        if self.eat(TokenKind::Colon).is_some() {
            self.skip_module_type()?;
        }
        self.expect(TokenKind::Eq, "`=` in module binding")?;
        let (module, end) = self.module_expr_inline()?;
        let range = TextRange::new(kw.range.start(), end);
        Ok((
            TopItem::Module {
                name: self.text(name_tok),
                name_range: name_tok.range,
                module,
                range,
            },
            range,
        ))
    }

    // --- expressions ---

    fn expr(&mut self) -> Result<Expr, ParseAbort> {
        match self.peek_kind() {
            Some(TokenKind::KwFun) => self.fun_expr(),
            Some(TokenKind::KwIf) => self.if_expr(),
            Some(TokenKind::KwLet) => self.let_in_expr(),
            _ => self.binop_expr(0),
        }
    }

    fn fun_expr(&mut self) -> Result<Expr, ParseAbort> {
        let kw = self.expect(TokenKind::KwFun, "`fun`")?;
        let mut params = vec![self.pattern()?];
        while self.at_param_start() {
            params.push(self.pattern()?);
        }
        self.expect(TokenKind::Arrow, "`->`")?;
        let body = self.expr()?;
        let range = TextRange::new(kw.range.start(), body.range.end());
        Ok(Expr {
            range,
            kind: ExprKind::Fun {
                params,
                body: Box::new(body),
            },
        })
    }

    fn if_expr(&mut self) -> Result<Expr, ParseAbort> {
        let kw = self.expect(TokenKind::KwIf, "`if`")?;
        let cond = self.expr()?;
        self.expect(TokenKind::KwThen, "`then`")?;
        let then_branch = self.expr()?;
        let else_branch = if self.eat(TokenKind::KwElse).is_some() {
            Some(Box::new(self.expr()?))
        } else {
            None
        };
        let end = else_branch
            .as_ref()
            .map_or(then_branch.range.end(), |e| e.range.end());
        Ok(Expr {
            range: TextRange::new(kw.range.start(), end),
            kind: ExprKind::If {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch,
            },
        })
    }

    fn let_in_expr(&mut self) -> Result<Expr, ParseAbort> {
        let kw = self.expect(TokenKind::KwLet, "`let`")?;
        if self.peek_kind() == Some(TokenKind::KwModule) {
            self.lexer.next_token();
            let name_tok = self.expect(TokenKind::UpperIdent, "a module name")?;
            if self.eat(TokenKind::Colon).is_some() {
                self.skip_module_type()?;
            }
            self.expect(TokenKind::Eq, "`=` in module binding")?;
            let (module, _) = self.module_expr_inline()?;
            self.expect(TokenKind::KwIn, "`in`")?;
            let body = self.expr()?;
            let range = TextRange::new(kw.range.start(), body.range.end());
            return Ok(Expr {
                range,
                kind: ExprKind::LetModule {
                    name: self.text(name_tok),
                    name_range: name_tok.range,
                    module,
                    body: Box::new(body),
                },
            });
        }
        let rec_flag = self.eat(TokenKind::KwRec).is_some();
        let mut bindings = vec![self.binding()?];
        while self.eat(TokenKind::KwAnd).is_some() {
            bindings.push(self.binding()?);
        }
        self.expect(TokenKind::KwIn, "`in`")?;
        let body = self.expr()?;
        let range = TextRange::new(kw.range.start(), body.range.end());
        Ok(Expr {
            range,
            kind: ExprKind::LetIn {
                rec_flag,
                bindings,
                body: Box::new(body),
            },
        })
    }

    fn binop_expr(&mut self, min_level: u8) -> Result<Expr, ParseAbort> {
        let mut lhs = self.app_expr()?;
        while let Some((level, op, op_range)) = self.peek_operator() {
            if level < min_level {
                break;
            }
            self.lexer.next_token();
            let rhs = self.binop_expr(level + 1)?;
            let range = lhs.range.cover(rhs.range);
            lhs = Expr {
                range,
                kind: ExprKind::Binop {
                    op,
                    op_range,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            };
        }
        Ok(lhs)
    }

    fn peek_operator(&mut self) -> Option<(u8, String, TextRange)> {
        let tok = self.lexer.peek()?;
        let (level, text) = match tok.kind {
            TokenKind::Eq => (1, "=".to_string()),
            TokenKind::Star => (3, "*".to_string()),
            TokenKind::Operator => {
                let text = token_text(self.source, &tok).to_string();
                let level = match text.as_bytes()[0] {
                    b'+' | b'-' | b'^' | b'@' => 2,
                    b'*' | b'/' | b'%' => 3,
                    b'<' | b'>' | b'=' | b'!' | b'&' | b'|' | b'$' => 1,
                    _ => return None,
                };
                (level, text)
            }
            _ => return None,
        };
        Some((level, text, tok.range))
    }

    fn app_expr(&mut self) -> Result<Expr, ParseAbort> {
        let mut func = self.atom_expr()?;
        while self.at_atom_start() {
            let arg = self.atom_expr()?;
            let range = func.range.cover(arg.range);
            func = Expr {
                range,
                kind: ExprKind::App {
                    func: Box::new(func),
                    arg: Box::new(arg),
                },
            };
        }
        Ok(func)
    }

    fn at_atom_start(&mut self) -> bool {
        matches!(
            self.peek_kind(),
            Some(
                TokenKind::LParen
                    | TokenKind::KwTrue
                    | TokenKind::KwFalse
                    | TokenKind::Int
                    | TokenKind::Str
                    | TokenKind::LowerIdent
                    | TokenKind::UpperIdent
                    | TokenKind::KwBegin
            )
        )
    }

    fn atom_expr(&mut self) -> Result<Expr, ParseAbort> {
        let Some(tok) = self.lexer.peek() else {
            return Err(self.abort_expected("an expression"));
        };
        match tok.kind {
            TokenKind::Int => {
                self.lexer.next_token();
                let digits = self.text(tok).replace('_', "");
                let value = digits.parse::<i64>().map_err(|_| ParseAbort {
                    start: self.construct_start,
                    at: tok.range.start(),
                    message: "integer literal out of range".to_string(),
                    eof: false,
                })?;
                Ok(Expr {
                    range: tok.range,
                    kind: ExprKind::Int(value),
                })
            }
            TokenKind::Str => {
                self.lexer.next_token();
                Ok(Expr {
                    range: tok.range,
                    kind: ExprKind::Str(unescape(&self.text(tok))),
                })
            }
            TokenKind::KwTrue | TokenKind::KwFalse => {
                self.lexer.next_token();
                Ok(Expr {
                    range: tok.range,
                    kind: ExprKind::Bool(tok.kind == TokenKind::KwTrue),
                })
            }
            TokenKind::LowerIdent => {
                self.lexer.next_token();
                let path = Path {
                    segments: vec![seg(self.source, tok)],
                    range: tok.range,
                };
                Ok(Expr {
                    range: tok.range,
                    kind: ExprKind::Var(path),
                })
            }
            TokenKind::UpperIdent => self.value_path_expr(),
            TokenKind::LParen => self.paren_expr(),
            TokenKind::KwBegin => {
                let open = self.expect(TokenKind::KwBegin, "`begin`")?;
                let inner = self.expr()?;
                let close = self.expect(TokenKind::KwEnd, "`end`")?;
                Ok(Expr {
                    range: open.range.cover(close.range),
                    kind: inner.kind,
                })
            }
            _ => Err(self.abort_expected("an expression")),
        }
    }

    /// `M.u` (a value), `M.N.u`, or `Some`/`M.Ctor` (a constructor). The
    /// qualified identifier may span lines: trivia between segments is
    /// skipped like anywhere else.
    fn value_path_expr(&mut self) -> Result<Expr, ParseAbort> {
        let first = self.expect(TokenKind::UpperIdent, "an identifier")?;
        let mut segments = vec![seg(self.source, first)];
        let mut is_value = false;
        while self.peek_kind() == Some(TokenKind::Dot) {
            match self.peek_second_kind() {
                Some(TokenKind::UpperIdent) => {
                    self.expect(TokenKind::Dot, "`.`")?;
                    let tok = self.expect(TokenKind::UpperIdent, "an identifier")?;
                    segments.push(seg(self.source, tok));
                }
                Some(TokenKind::LowerIdent) => {
                    self.expect(TokenKind::Dot, "`.`")?;
                    let tok = self.expect(TokenKind::LowerIdent, "an identifier")?;
                    segments.push(seg(self.source, tok));
                    is_value = true;
                    break;
                }
                _ => break,
            }
        }
        let range = segments[0].range.cover(segments[segments.len() - 1].range);
        let path = Path { segments, range };
        Ok(Expr {
            range,
            kind: if is_value {
                ExprKind::Var(path)
            } else {
                ExprKind::Ctor(path)
            },
        })
    }

    fn paren_expr(&mut self) -> Result<Expr, ParseAbort> {
        let open = self.expect(TokenKind::LParen, "`(`")?;
        if let Some(close) = self.eat(TokenKind::RParen) {
            return Ok(Expr {
                range: open.range.cover(close.range),
                kind: ExprKind::Unit,
            });
        }
        let first = self.expr()?;
        if self.peek_kind() == Some(TokenKind::Comma) {
            let mut parts = vec![first];
            while self.eat(TokenKind::Comma).is_some() {
                parts.push(self.expr()?);
            }
            let close = self.expect(TokenKind::RParen, "`)`")?;
            return Ok(Expr {
                range: open.range.cover(close.range),
                kind: ExprKind::Tuple(parts),
            });
        }
        if self.eat(TokenKind::Colon).is_some() {
            let ty = self.type_expr()?;
            let close = self.expect(TokenKind::RParen, "`)`")?;
            return Ok(Expr {
                range: open.range.cover(close.range),
                kind: ExprKind::Annot {
                    expr: Box::new(first),
                    ty,
                },
            });
        }
        let close = self.expect(TokenKind::RParen, "`)`")?;
        Ok(Expr {
            range: open.range.cover(close.range),
            kind: first.kind,
        })
    }
}

fn unescape(quoted: &str) -> String {
    let inner = &quoted[1..quoted.len().saturating_sub(1)];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => break,
        }
    }
    out
}

//! Typing of top-level items and expressions.
//!
//! Error capture follows the layered scheme: one item of a definition group
//! failing leaves the environment as it was and the fold moves on to the
//! remaining items; warnings accumulate independently of failure.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use text_size::TextRange;

use crate::chunk::ast::{
    Binding, DefGroup, Expr, ExprKind, ModuleExpr, Path, Pattern, TopItem, TypeDecl, TypeDeclBody,
    TypeExpr, TypeExprKind,
};

use super::TyperStats;
use super::env::{CtorInfo, CtorLookup, Env, FieldInfo, ModuleSig, TypeBody, TypeInfo, fresh_stamp};
use super::printer;
use super::typed::{
    TypedExpr, TypedExprKind, TypedItem, TypedLabel, TypedParam, TypedPath, signature_of_items,
};
use super::types::{Mismatch, Scheme, Stamp, Ty, TypeError, Unifier, Warning, substitute};

/// Shared sinks for one `append_step`.
pub(super) struct Typing<'a> {
    pub warnings: &'a mut Vec<Warning>,
    pub errors: &'a mut Vec<TypeError>,
    pub stats: &'a mut TyperStats,
}

/// Folds a definition group left to right. A failing item records its error
/// and leaves the environment untouched for the items after it.
pub(super) fn type_definitions(env: &Env, group: &DefGroup, cx: &mut Typing) -> (Vec<TypedItem>, Env) {
    if group.rec_flag {
        return type_recursive_group(env, group, cx);
    }
    let mut items = Vec::new();
    let mut env = env.clone();
    for item in &group.items {
        cx.stats.definitions_typed += 1;
        if let Some((typed, next)) = type_item(&env, item, cx) {
            env = next;
            items.push(typed);
        }
    }
    (items, env)
}

/// `let rec` groups share one unifier: every binding sees the whole group
/// through pre-bound monotypes, generalized after the fold.
fn type_recursive_group(env: &Env, group: &DefGroup, cx: &mut Typing) -> (Vec<TypedItem>, Env) {
    let mut un = Unifier::new();
    let mut inner = env.clone();
    let mut placeholders: Vec<Option<(String, Ty, Stamp)>> = Vec::new();
    for item in &group.items {
        let placeholder = match item {
            TopItem::Let { binding } => binding.pat.name().map(|name| {
                let ty = un.fresh();
                let (next, stamp) = inner.bind_value(name, Scheme::mono(ty.clone()));
                inner = next;
                (name.to_string(), ty, stamp)
            }),
            _ => None,
        };
        placeholders.push(placeholder);
    }

    let mut items = Vec::new();
    let mut out_env = env.clone();
    for (item, placeholder) in group.items.iter().zip(&placeholders) {
        cx.stats.definitions_typed += 1;
        let TopItem::Let { binding } = item else {
            // `let rec` only makes sense for bindings; anything else in the
            // group types as if non-recursive.
            if let Some((typed, next)) = type_item(&out_env, item, cx) {
                out_env = next;
                items.push(typed);
            }
            continue;
        };
        let mut infer = Infer {
            un: &mut un,
            used: HashSet::new(),
            cx: &mut *cx,
        };
        match infer.binding(&inner, binding) {
            Ok((typed_expr, ty)) => {
                if let Some((_, placeholder_ty, _)) = placeholder {
                    if let Err(m) = infer.un.unify(placeholder_ty, &ty) {
                        infer
                            .cx
                            .errors
                            .push(mismatch_error(&inner, infer.un, binding.range, m));
                        continue;
                    }
                }
                let scheme = un.generalize(&ty);
                let name = binding.pat.name().unwrap_or("_").to_string();
                let stamp = match placeholder {
                    Some((_, _, stamp)) => {
                        out_env = out_env.bind_value_stamped(&name, scheme.clone(), *stamp);
                        *stamp
                    }
                    None => fresh_stamp(),
                };
                items.push(TypedItem::Value {
                    name_range: binding.pat.range(),
                    range: binding.range,
                    name,
                    scheme,
                    stamp,
                    expr: Arc::new(resolve_typed(&un, typed_expr)),
                });
            }
            Err(e) => cx.errors.push(e),
        }
    }
    (items, out_env)
}

/// Types one item against `env`. On failure the error is recorded and
/// `None` returned; the caller keeps its environment.
fn type_item(env: &Env, item: &TopItem, cx: &mut Typing) -> Option<(TypedItem, Env)> {
    match type_item_inner(env, item, cx) {
        Ok(ok) => Some(ok),
        Err(e) => {
            cx.errors.push(e);
            None
        }
    }
}

fn type_item_inner(
    env: &Env,
    item: &TopItem,
    cx: &mut Typing,
) -> Result<(TypedItem, Env), TypeError> {
    match item {
        TopItem::Let { binding } => {
            let mut un = Unifier::new();
            let mut infer = Infer {
                un: &mut un,
                used: HashSet::new(),
                cx: &mut *cx,
            };
            let (typed_expr, ty) = infer.binding(env, binding)?;
            if matches!(binding.pat, Pattern::Unit { .. }) {
                if let Err(m) = un.unify(&Ty::Unit, &ty) {
                    return Err(mismatch_error(env, &un, binding.body.range, m));
                }
            }
            let scheme = un.generalize(&ty);
            let name = binding.pat.name().unwrap_or("_").to_string();
            let (next, stamp) = if name == "_" {
                (env.clone(), fresh_stamp())
            } else {
                env.bind_value(&name, scheme.clone())
            };
            Ok((
                TypedItem::Value {
                    name_range: binding.pat.range(),
                    range: binding.range,
                    name,
                    scheme,
                    stamp,
                    expr: Arc::new(resolve_typed(&un, typed_expr)),
                },
                next,
            ))
        }
        TopItem::Type(decl) => {
            let (info, labels) = type_declaration(env, decl)?;
            let info = Arc::new(info);
            Ok((
                TypedItem::TypeDef {
                    name: decl.name.clone(),
                    name_range: decl.name_range,
                    range: decl.range,
                    info: info.clone(),
                    labels,
                },
                env.bind_type(info),
            ))
        }
        TopItem::Exception {
            name,
            name_range,
            arg,
            range,
        } => {
            let arg_ty = match arg {
                Some(te) => Some(decl_ty(env, te, &HashMap::new(), None)?),
                None => None,
            };
            let stamp = fresh_stamp();
            let next = env.bind_exception(Arc::new(super::env::ExceptionInfo {
                name: name.clone(),
                stamp,
                arg: arg_ty.clone(),
            }));
            Ok((
                TypedItem::Exception {
                    name: name.clone(),
                    name_range: *name_range,
                    range: *range,
                    stamp,
                    arg: arg_ty,
                },
                next,
            ))
        }
        TopItem::Open { path, range } => {
            let names: Vec<&str> = path.names().collect();
            let Some(module) = env.lookup_module(&names) else {
                return Err(TypeError {
                    range: path.range,
                    message: format!("Unbound module {path}"),
                });
            };
            Ok((
                TypedItem::Open {
                    path: typed_path(path, Some(module.stamp)),
                    range: *range,
                    sig: module.sig.clone(),
                },
                env.open(module.sig.clone()),
            ))
        }
        TopItem::Class {
            name,
            name_range,
            range,
        } => {
            let (next, stamp) = env.bind_class(name);
            Ok((
                TypedItem::Class {
                    name: name.clone(),
                    name_range: *name_range,
                    range: *range,
                    stamp,
                },
                next,
            ))
        }
        TopItem::Module {
            name,
            name_range,
            module,
            range,
        } => {
            let (items, sig) = match module {
                ModuleExpr::Alias(path) => {
                    let names: Vec<&str> = path.names().collect();
                    let Some(target) = env.lookup_module(&names) else {
                        return Err(TypeError {
                            range: path.range,
                            message: format!("Unbound module {path}"),
                        });
                    };
                    (Vec::new(), target.sig.clone())
                }
                ModuleExpr::Struct(groups) => {
                    let (items, sig) = type_struct(env, groups, cx);
                    (items, Arc::new(sig))
                }
            };
            let (next, stamp) = env.bind_module(name, sig.clone());
            Ok((
                TypedItem::Module {
                    name: name.clone(),
                    name_range: *name_range,
                    range: *range,
                    items,
                    sig,
                    stamp,
                },
                next,
            ))
        }
    }
}

/// Types the body of an inline `struct … end`.
pub(super) fn type_struct(
    env: &Env,
    groups: &[DefGroup],
    cx: &mut Typing,
) -> (Vec<TypedItem>, ModuleSig) {
    let mut items = Vec::new();
    let mut inner = env.clone();
    for group in groups {
        let (typed, next) = type_definitions(&inner, group, cx);
        items.extend(typed);
        inner = next;
    }
    let sig = signature_of_items(&items);
    (items, sig)
}

fn typed_path(path: &Path, stamp: Option<Stamp>) -> TypedPath {
    TypedPath {
        segments: path
            .segments
            .iter()
            .map(|s| (s.name.clone(), s.range))
            .collect(),
        range: path.range,
        stamp,
    }
}

fn mismatch_error(env: &Env, un: &Unifier, range: TextRange, m: Mismatch) -> TypeError {
    let _scope = printer::scoped_env(env);
    TypeError {
        range,
        message: format!(
            "This expression has type {} but an expression was expected of type {}",
            printer::type_to_string(&un.resolve(&m.found)),
            printer::type_to_string(&un.resolve(&m.expected)),
        ),
    }
}

/// Applies the final substitution to a typed tree.
fn resolve_typed(un: &Unifier, expr: TypedExpr) -> TypedExpr {
    let TypedExpr { range, ty, kind } = expr;
    let kind = match kind {
        TypedExprKind::Lit => TypedExprKind::Lit,
        TypedExprKind::Path(p) => TypedExprKind::Path(p),
        TypedExprKind::App { func, arg } => TypedExprKind::App {
            func: Box::new(resolve_typed(un, *func)),
            arg: Box::new(resolve_typed(un, *arg)),
        },
        TypedExprKind::Binop { lhs, rhs } => TypedExprKind::Binop {
            lhs: Box::new(resolve_typed(un, *lhs)),
            rhs: Box::new(resolve_typed(un, *rhs)),
        },
        TypedExprKind::Fun { params, body } => TypedExprKind::Fun {
            params: params
                .into_iter()
                .map(|p| TypedParam {
                    ty: un.resolve(&p.ty),
                    ..p
                })
                .collect(),
            body: Box::new(resolve_typed(un, *body)),
        },
        TypedExprKind::Tuple(parts) => {
            TypedExprKind::Tuple(parts.into_iter().map(|p| resolve_typed(un, p)).collect())
        }
        TypedExprKind::If {
            cond,
            then_branch,
            else_branch,
        } => TypedExprKind::If {
            cond: Box::new(resolve_typed(un, *cond)),
            then_branch: Box::new(resolve_typed(un, *then_branch)),
            else_branch: else_branch.map(|e| Box::new(resolve_typed(un, *e))),
        },
        TypedExprKind::Let { defs, body } => TypedExprKind::Let {
            defs: defs.into_iter().map(|d| resolve_typed(un, d)).collect(),
            body: Box::new(resolve_typed(un, *body)),
        },
    };
    TypedExpr {
        range,
        ty: un.resolve(&ty),
        kind,
    }
}

struct Infer<'a, 'c> {
    un: &'a mut Unifier,
    used: HashSet<Stamp>,
    cx: &'a mut Typing<'c>,
}

impl Infer<'_, '_> {
    fn binding(&mut self, env: &Env, binding: &Binding) -> Result<(TypedExpr, Ty), TypeError> {
        let (params, body, ty) = self.function_like(env, &binding.params, &binding.body)?;
        if let Some(ann) = &binding.ann {
            let mut vars = HashMap::new();
            let want = self.annot_ty(env, ann, &mut vars)?;
            if let Err(m) = self.un.unify(&want, &ty) {
                return Err(mismatch_error(env, self.un, binding.body.range, m));
            }
        }
        let typed = if params.is_empty() {
            body
        } else {
            TypedExpr {
                range: binding.range,
                ty: ty.clone(),
                kind: TypedExprKind::Fun {
                    params,
                    body: Box::new(body),
                },
            }
        };
        Ok((typed, ty))
    }

    /// Binds `params`, infers `body`, folds the arrow type, and reports
    /// parameters that the body never used.
    fn function_like(
        &mut self,
        env: &Env,
        params: &[Pattern],
        body: &Expr,
    ) -> Result<(Vec<TypedParam>, TypedExpr, Ty), TypeError> {
        let mut inner = env.clone();
        let mut infos = Vec::new();
        for p in params {
            let ty = self.un.fresh();
            let mut stamp = None;
            match p {
                Pattern::Var { name, .. } => {
                    let (next, s) = inner.bind_value(name, Scheme::mono(ty.clone()));
                    inner = next;
                    stamp = Some(s);
                }
                Pattern::Unit { .. } => {
                    // () parameters are unit.
                    let _ = self.un.unify(&Ty::Unit, &ty);
                }
                Pattern::Wildcard { .. } => {}
            }
            infos.push((
                TypedParam {
                    name: p.name().map(str::to_string),
                    range: p.range(),
                    ty,
                },
                stamp,
            ));
        }
        let body = self.expr(&inner, body)?;
        for (param, stamp) in &infos {
            if let (Some(name), Some(stamp)) = (&param.name, stamp) {
                if !self.used.contains(stamp) {
                    self.cx.warnings.push(Warning {
                        range: param.range,
                        message: format!("unused variable {name}"),
                    });
                }
            }
        }
        let mut ty = body.ty.clone();
        for (param, _) in infos.iter().rev() {
            ty = Ty::arrow(param.ty.clone(), ty);
        }
        let params = infos.into_iter().map(|(p, _)| p).collect();
        Ok((params, body, ty))
    }

    fn expr(&mut self, env: &Env, e: &Expr) -> Result<TypedExpr, TypeError> {
        match &e.kind {
            ExprKind::Unit => Ok(lit(e.range, Ty::Unit)),
            ExprKind::Int(_) => Ok(lit(e.range, Ty::Int)),
            ExprKind::Bool(_) => Ok(lit(e.range, Ty::Bool)),
            ExprKind::Str(_) => Ok(lit(e.range, Ty::Str)),
            ExprKind::Var(path) => {
                let names: Vec<&str> = path.names().collect();
                let Some(value) = env.lookup_value(&names) else {
                    return Err(TypeError {
                        range: path.range,
                        message: format!("Unbound value {path}"),
                    });
                };
                self.used.insert(value.stamp);
                let ty = self.un.instantiate(&value.scheme);
                Ok(TypedExpr {
                    range: e.range,
                    ty,
                    kind: TypedExprKind::Path(typed_path(path, Some(value.stamp))),
                })
            }
            ExprKind::Ctor(path) => self.ctor(env, e.range, path),
            ExprKind::Tuple(parts) => {
                let typed: Vec<TypedExpr> = parts
                    .iter()
                    .map(|p| self.expr(env, p))
                    .collect::<Result<_, _>>()?;
                let ty = Ty::Tuple(typed.iter().map(|t| t.ty.clone()).collect());
                Ok(TypedExpr {
                    range: e.range,
                    ty,
                    kind: TypedExprKind::Tuple(typed),
                })
            }
            ExprKind::App { func, arg } => {
                let func = self.expr(env, func)?;
                let arg = self.expr(env, arg)?;
                let ty = self.apply(env, &func, &arg)?;
                Ok(TypedExpr {
                    range: e.range,
                    ty,
                    kind: TypedExprKind::App {
                        func: Box::new(func),
                        arg: Box::new(arg),
                    },
                })
            }
            ExprKind::Binop {
                op,
                op_range,
                lhs,
                rhs,
            } => {
                let Some(value) = env.lookup_value(&[op.as_str()]) else {
                    return Err(TypeError {
                        range: *op_range,
                        message: format!("Unbound operator {op}"),
                    });
                };
                let op_ty = self.un.instantiate(&value.scheme);
                let lhs = self.expr(env, lhs)?;
                let rhs = self.expr(env, rhs)?;
                let ret = self.un.fresh();
                let want = Ty::arrow(lhs.ty.clone(), Ty::arrow(rhs.ty.clone(), ret.clone()));
                if let Err(m) = self.un.unify(&op_ty, &want) {
                    return Err(mismatch_error(env, self.un, e.range, m));
                }
                Ok(TypedExpr {
                    range: e.range,
                    ty: ret,
                    kind: TypedExprKind::Binop {
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                })
            }
            ExprKind::Fun { params, body } => {
                let (params, body, ty) = self.function_like(env, params, body)?;
                Ok(TypedExpr {
                    range: e.range,
                    ty,
                    kind: TypedExprKind::Fun {
                        params,
                        body: Box::new(body),
                    },
                })
            }
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond_t = self.expr(env, cond)?;
                if let Err(m) = self.un.unify(&Ty::Bool, &cond_t.ty) {
                    return Err(mismatch_error(env, self.un, cond.range, m));
                }
                let then_t = self.expr(env, then_branch)?;
                match else_branch {
                    Some(else_e) => {
                        let else_t = self.expr(env, else_e)?;
                        if let Err(m) = self.un.unify(&then_t.ty, &else_t.ty) {
                            return Err(mismatch_error(env, self.un, else_e.range, m));
                        }
                        let ty = then_t.ty.clone();
                        Ok(TypedExpr {
                            range: e.range,
                            ty,
                            kind: TypedExprKind::If {
                                cond: Box::new(cond_t),
                                then_branch: Box::new(then_t),
                                else_branch: Some(Box::new(else_t)),
                            },
                        })
                    }
                    None => {
                        if let Err(m) = self.un.unify(&Ty::Unit, &then_t.ty) {
                            return Err(mismatch_error(env, self.un, then_branch.range, m));
                        }
                        Ok(TypedExpr {
                            range: e.range,
                            ty: Ty::Unit,
                            kind: TypedExprKind::If {
                                cond: Box::new(cond_t),
                                then_branch: Box::new(then_t),
                                else_branch: None,
                            },
                        })
                    }
                }
            }
            ExprKind::LetIn {
                rec_flag,
                bindings,
                body,
            } => self.let_in(env, e.range, *rec_flag, bindings, body),
            ExprKind::LetModule {
                name,
                name_range: _,
                module,
                body,
            } => {
                let (defs, sig) = match module {
                    ModuleExpr::Alias(path) => {
                        let names: Vec<&str> = path.names().collect();
                        let Some(target) = env.lookup_module(&names) else {
                            return Err(TypeError {
                                range: path.range,
                                message: format!("Unbound module {path}"),
                            });
                        };
                        (Vec::new(), target.sig.clone())
                    }
                    ModuleExpr::Struct(groups) => {
                        let (items, sig) = type_struct(env, groups, self.cx);
                        let defs = items
                            .iter()
                            .filter_map(|item| match item {
                                TypedItem::Value { expr, .. } => Some(expr.as_ref().clone()),
                                _ => None,
                            })
                            .collect();
                        (defs, Arc::new(sig))
                    }
                };
                let (inner, _) = env.bind_module(name, sig);
                let body_t = self.expr(&inner, body)?;
                let ty = body_t.ty.clone();
                Ok(TypedExpr {
                    range: e.range,
                    ty,
                    kind: TypedExprKind::Let {
                        defs,
                        body: Box::new(body_t),
                    },
                })
            }
            ExprKind::Annot { expr, ty } => {
                let typed = self.expr(env, expr)?;
                let mut vars = HashMap::new();
                let want = self.annot_ty(env, ty, &mut vars)?;
                if let Err(m) = self.un.unify(&want, &typed.ty) {
                    return Err(mismatch_error(env, self.un, expr.range, m));
                }
                Ok(TypedExpr {
                    range: e.range,
                    ty: want,
                    kind: typed.kind,
                })
            }
        }
    }

    fn let_in(
        &mut self,
        env: &Env,
        range: TextRange,
        rec_flag: bool,
        bindings: &[Binding],
        body: &Expr,
    ) -> Result<TypedExpr, TypeError> {
        let mut inner = env.clone();
        let mut defs = Vec::new();
        let mut bound: Vec<(String, TextRange, Stamp)> = Vec::new();
        if rec_flag {
            // Pre-bind every name, then check the bodies against the
            // placeholders.
            let mut placeholders = Vec::new();
            for b in bindings {
                let ty = self.un.fresh();
                if let Some(name) = b.pat.name() {
                    let (next, stamp) = inner.bind_value(name, Scheme::mono(ty.clone()));
                    inner = next;
                    bound.push((name.to_string(), b.pat.range(), stamp));
                }
                placeholders.push(ty);
            }
            for (b, placeholder) in bindings.iter().zip(&placeholders) {
                let (typed, ty) = self.binding(&inner, b)?;
                if let Err(m) = self.un.unify(placeholder, &ty) {
                    return Err(mismatch_error(env, self.un, b.range, m));
                }
                defs.push(typed);
            }
        } else {
            for b in bindings {
                let (typed, ty) = self.binding(&inner, b)?;
                if let Some(name) = b.pat.name() {
                    let (next, stamp) = inner.bind_value(name, Scheme::mono(ty));
                    inner = next;
                    bound.push((name.to_string(), b.pat.range(), stamp));
                }
                defs.push(typed);
            }
        }
        let body_t = self.expr(&inner, body)?;
        for (name, name_range, stamp) in &bound {
            if !self.used.contains(stamp) {
                self.cx.warnings.push(Warning {
                    range: *name_range,
                    message: format!("unused variable {name}"),
                });
            }
        }
        let ty = body_t.ty.clone();
        Ok(TypedExpr {
            range,
            ty,
            kind: TypedExprKind::Let {
                defs,
                body: Box::new(body_t),
            },
        })
    }

    fn ctor(&mut self, env: &Env, range: TextRange, path: &Path) -> Result<TypedExpr, TypeError> {
        let names: Vec<&str> = path.names().collect();
        let Some(found) = env.lookup_ctor(&names) else {
            return Err(TypeError {
                range: path.range,
                message: format!("Unbound constructor {path}"),
            });
        };
        let (ty, stamp) = match found {
            CtorLookup::Variant { ctor, owner } => {
                let args: Vec<Ty> = owner.params.iter().map(|_| self.un.fresh()).collect();
                let result = Ty::Con {
                    name: owner.name.clone(),
                    stamp: owner.stamp,
                    args: args.clone(),
                };
                let ty = match &ctor.arg {
                    Some(arg) => Ty::arrow(instantiate_params(arg, &args), result),
                    None => result,
                };
                (ty, ctor.stamp)
            }
            CtorLookup::Exception(exc) => {
                let exn = exn_type(env);
                let ty = match &exc.arg {
                    Some(arg) => Ty::arrow(arg.clone(), exn),
                    None => exn,
                };
                (ty, exc.stamp)
            }
        };
        self.used.insert(stamp);
        Ok(TypedExpr {
            range,
            ty,
            kind: TypedExprKind::Path(typed_path(path, Some(stamp))),
        })
    }

    fn apply(&mut self, env: &Env, func: &TypedExpr, arg: &TypedExpr) -> Result<Ty, TypeError> {
        match self.un.resolve(&func.ty) {
            Ty::Arrow(param, ret) => {
                if let Err(m) = self.un.unify(&param, &arg.ty) {
                    return Err(mismatch_error(env, self.un, arg.range, m));
                }
                Ok(*ret)
            }
            Ty::Var(_) => {
                let ret = self.un.fresh();
                let want = Ty::arrow(arg.ty.clone(), ret.clone());
                if let Err(m) = self.un.unify(&func.ty, &want) {
                    return Err(mismatch_error(env, self.un, func.range, m));
                }
                Ok(ret)
            }
            other => {
                let _scope = printer::scoped_env(env);
                Err(TypeError {
                    range: func.range,
                    message: format!(
                        "This expression has type {}; it is not a function and cannot be applied",
                        printer::type_to_string(&other)
                    ),
                })
            }
        }
    }

    /// Type expression in annotation position: `'a` variables are fresh,
    /// memoized per name.
    fn annot_ty(
        &mut self,
        env: &Env,
        te: &TypeExpr,
        vars: &mut HashMap<String, Ty>,
    ) -> Result<Ty, TypeError> {
        match &te.kind {
            TypeExprKind::Var(name) => Ok(vars
                .entry(name.clone())
                .or_insert_with(|| self.un.fresh())
                .clone()),
            TypeExprKind::Arrow(a, b) => Ok(Ty::arrow(
                self.annot_ty(env, a, vars)?,
                self.annot_ty(env, b, vars)?,
            )),
            TypeExprKind::Tuple(parts) => Ok(Ty::Tuple(
                parts
                    .iter()
                    .map(|p| self.annot_ty(env, p, vars))
                    .collect::<Result<_, _>>()?,
            )),
            TypeExprKind::Name { path, args } => {
                let args = args
                    .iter()
                    .map(|a| self.annot_ty(env, a, vars))
                    .collect::<Result<Vec<_>, _>>()?;
                named_type(env, path, args)
            }
        }
    }
}

fn lit(range: TextRange, ty: Ty) -> TypedExpr {
    TypedExpr {
        range,
        ty,
        kind: TypedExprKind::Lit,
    }
}

fn exn_type(env: &Env) -> Ty {
    match env.lookup_type(&["exn"]) {
        Some(info) => Ty::Con {
            name: info.name.clone(),
            stamp: info.stamp,
            args: Vec::new(),
        },
        None => Ty::Unit,
    }
}

/// Resolves a named type, expanding aliases and checking arity.
fn named_type(env: &Env, path: &Path, args: Vec<Ty>) -> Result<Ty, TypeError> {
    let names: Vec<&str> = path.names().collect();
    let Some(info) = env.lookup_type(&names) else {
        return Err(TypeError {
            range: path.range,
            message: format!("Unbound type constructor {path}"),
        });
    };
    if info.params.len() != args.len() {
        return Err(TypeError {
            range: path.range,
            message: format!(
                "The type constructor {} expects {} argument(s) but is applied to {}",
                path,
                info.params.len(),
                args.len()
            ),
        });
    }
    match &info.body {
        TypeBody::Alias(body) => Ok(instantiate_params(body, &args)),
        _ => Ok(Ty::Con {
            name: info.name.clone(),
            stamp: info.stamp,
            args,
        }),
    }
}

/// Substitutes positional parameters (`Ty::Var(i)`) of a declaration body.
fn instantiate_params(body: &Ty, args: &[Ty]) -> Ty {
    let mapping: HashMap<u32, Ty> = args
        .iter()
        .enumerate()
        .map(|(i, t)| (i as u32, t.clone()))
        .collect();
    substitute(body, &mapping)
}

/// Type expression in declaration position: `'a` must be a declared
/// parameter; the declaration may refer to itself.
fn decl_ty(
    env: &Env,
    te: &TypeExpr,
    params: &HashMap<String, u32>,
    selfref: Option<(&str, Stamp, usize)>,
) -> Result<Ty, TypeError> {
    match &te.kind {
        TypeExprKind::Var(name) => match params.get(name) {
            Some(&i) => Ok(Ty::Var(i)),
            None => Err(TypeError {
                range: te.range,
                message: format!("Unbound type parameter '{name}"),
            }),
        },
        TypeExprKind::Arrow(a, b) => Ok(Ty::arrow(
            decl_ty(env, a, params, selfref)?,
            decl_ty(env, b, params, selfref)?,
        )),
        TypeExprKind::Tuple(parts) => Ok(Ty::Tuple(
            parts
                .iter()
                .map(|p| decl_ty(env, p, params, selfref))
                .collect::<Result<_, _>>()?,
        )),
        TypeExprKind::Name { path, args } => {
            let args: Vec<Ty> = args
                .iter()
                .map(|a| decl_ty(env, a, params, selfref))
                .collect::<Result<_, _>>()?;
            if let Some((name, stamp, arity)) = selfref {
                if path.segments.len() == 1 && path.last().name == name {
                    if args.len() != arity {
                        return Err(TypeError {
                            range: path.range,
                            message: format!(
                                "The type constructor {name} expects {arity} argument(s) but is applied to {}",
                                args.len()
                            ),
                        });
                    }
                    return Ok(Ty::Con {
                        name: name.to_string(),
                        stamp,
                        args,
                    });
                }
            }
            named_type(env, path, args)
        }
    }
}

/// Builds the `TypeInfo` for a declaration, plus its outline labels.
fn type_declaration(env: &Env, decl: &TypeDecl) -> Result<(TypeInfo, Vec<TypedLabel>), TypeError> {
    let stamp = fresh_stamp();
    let params: HashMap<String, u32> = decl
        .params
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i as u32))
        .collect();
    let selfref = Some((decl.name.as_str(), stamp, decl.params.len()));
    let mut labels = Vec::new();
    let body = match &decl.body {
        TypeDeclBody::Abstract => TypeBody::Abstract,
        TypeDeclBody::Alias(te) => TypeBody::Alias(decl_ty(env, te, &params, selfref)?),
        TypeDeclBody::Variant(ctors) => {
            let mut infos = Vec::new();
            for ctor in ctors {
                let arg = match &ctor.arg {
                    Some(te) => Some(decl_ty(env, te, &params, selfref)?),
                    None => None,
                };
                labels.push(TypedLabel {
                    name: ctor.name.clone(),
                    range: ctor.range,
                });
                infos.push(CtorInfo {
                    name: ctor.name.clone(),
                    stamp: fresh_stamp(),
                    arg,
                });
            }
            TypeBody::Variant(infos)
        }
        TypeDeclBody::Record(fields) => {
            let mut infos = Vec::new();
            for field in fields {
                let ty = decl_ty(env, &field.ty, &params, selfref)?;
                labels.push(TypedLabel {
                    name: field.name.clone(),
                    range: field.range,
                });
                infos.push(FieldInfo {
                    name: field.name.clone(),
                    ty,
                });
            }
            TypeBody::Record(infos)
        }
    };
    Ok((
        TypeInfo {
            name: decl.name.clone(),
            stamp,
            params: decl.params.clone(),
            body,
        },
        labels,
    ))
}

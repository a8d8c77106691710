//! The type algebra and unification.
//!
//! A small ML core: variables, base types, arrows, tuples and named
//! constructors. Aliases are expanded when a syntactic type is converted, so
//! `Con` is always nominal and unifies by stamp.

use std::collections::HashMap;

use text_size::TextRange;

/// Identity of a binding or declaration. Fresh per declaration, compared for
/// "does this still resolve to the same thing" questions.
pub type Stamp = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ty {
    Var(u32),
    Unit,
    Int,
    Bool,
    Str,
    Char,
    Arrow(Box<Ty>, Box<Ty>),
    Tuple(Vec<Ty>),
    /// A declared type: abstract, variant or record. `name` is the declared
    /// (unqualified) name; identity is the stamp.
    Con {
        name: String,
        stamp: Stamp,
        args: Vec<Ty>,
    },
}

impl Ty {
    pub fn arrow(arg: Ty, ret: Ty) -> Ty {
        Ty::Arrow(Box::new(arg), Box::new(ret))
    }
}

/// A polymorphic type: `vars` are quantified in `ty`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheme {
    pub vars: Vec<u32>,
    pub ty: Ty,
}

impl Scheme {
    pub fn mono(ty: Ty) -> Self {
        Self {
            vars: Vec::new(),
            ty,
        }
    }
}

/// A typing failure, attached to the source range that provoked it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeError {
    pub range: TextRange,
    pub message: String,
}

/// A non-fatal observation collected alongside typing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub range: TextRange,
    pub message: String,
}

/// Unification state: fresh-variable supply plus substitution.
#[derive(Debug, Default)]
pub struct Unifier {
    next_var: u32,
    subst: HashMap<u32, Ty>,
}

/// Structural mismatch found while unifying; the caller renders it against
/// the source.
#[derive(Debug)]
pub struct Mismatch {
    pub expected: Ty,
    pub found: Ty,
}

impl Unifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> Ty {
        let v = self.next_var;
        self.next_var += 1;
        Ty::Var(v)
    }

    /// Follows the substitution one level.
    fn shallow(&self, ty: &Ty) -> Ty {
        let mut ty = ty.clone();
        while let Ty::Var(v) = ty {
            match self.subst.get(&v) {
                Some(next) => ty = next.clone(),
                None => return Ty::Var(v),
            }
        }
        ty
    }

    /// Fully applies the substitution.
    pub fn resolve(&self, ty: &Ty) -> Ty {
        match self.shallow(ty) {
            Ty::Arrow(a, b) => Ty::arrow(self.resolve(&a), self.resolve(&b)),
            Ty::Tuple(parts) => Ty::Tuple(parts.iter().map(|t| self.resolve(t)).collect()),
            Ty::Con { name, stamp, args } => Ty::Con {
                name,
                stamp,
                args: args.iter().map(|t| self.resolve(t)).collect(),
            },
            other => other,
        }
    }

    fn occurs(&self, v: u32, ty: &Ty) -> bool {
        match self.shallow(ty) {
            Ty::Var(w) => w == v,
            Ty::Arrow(a, b) => self.occurs(v, &a) || self.occurs(v, &b),
            Ty::Tuple(parts) => parts.iter().any(|t| self.occurs(v, t)),
            Ty::Con { args, .. } => args.iter().any(|t| self.occurs(v, t)),
            _ => false,
        }
    }

    pub fn unify(&mut self, expected: &Ty, found: &Ty) -> Result<(), Mismatch> {
        let a = self.shallow(expected);
        let b = self.shallow(found);
        match (&a, &b) {
            (Ty::Var(v), Ty::Var(w)) if v == w => Ok(()),
            (Ty::Var(v), _) => {
                if self.occurs(*v, &b) {
                    return Err(self.mismatch(&a, &b));
                }
                self.subst.insert(*v, b);
                Ok(())
            }
            (_, Ty::Var(w)) => {
                if self.occurs(*w, &a) {
                    return Err(self.mismatch(&a, &b));
                }
                self.subst.insert(*w, a);
                Ok(())
            }
            (Ty::Unit, Ty::Unit)
            | (Ty::Int, Ty::Int)
            | (Ty::Bool, Ty::Bool)
            | (Ty::Str, Ty::Str)
            | (Ty::Char, Ty::Char) => Ok(()),
            (Ty::Arrow(a1, r1), Ty::Arrow(a2, r2)) => {
                self.unify(a1, a2)?;
                self.unify(r1, r2)
            }
            (Ty::Tuple(p1), Ty::Tuple(p2)) if p1.len() == p2.len() => {
                for (x, y) in p1.iter().zip(p2) {
                    self.unify(x, y)?;
                }
                Ok(())
            }
            (
                Ty::Con {
                    stamp: s1,
                    args: a1,
                    ..
                },
                Ty::Con {
                    stamp: s2,
                    args: a2,
                    ..
                },
            ) if s1 == s2 && a1.len() == a2.len() => {
                for (x, y) in a1.iter().zip(a2) {
                    self.unify(x, y)?;
                }
                Ok(())
            }
            _ => Err(self.mismatch(&a, &b)),
        }
    }

    fn mismatch(&self, expected: &Ty, found: &Ty) -> Mismatch {
        Mismatch {
            expected: self.resolve(expected),
            found: self.resolve(found),
        }
    }

    /// Instantiates a scheme with fresh variables.
    pub fn instantiate(&mut self, scheme: &Scheme) -> Ty {
        if scheme.vars.is_empty() {
            return scheme.ty.clone();
        }
        let mapping: HashMap<u32, Ty> = scheme
            .vars
            .iter()
            .map(|&v| (v, self.fresh()))
            .collect();
        substitute(&scheme.ty, &mapping)
    }

    /// Quantifies every variable still free in `ty`.
    ///
    /// Top-level bindings own their inference state, so any variable left
    /// unsolved after resolving is generalizable.
    pub fn generalize(&self, ty: &Ty) -> Scheme {
        let ty = self.resolve(ty);
        let mut vars = Vec::new();
        collect_vars(&ty, &mut vars);
        Scheme { vars, ty }
    }
}

/// Replaces variables per `mapping`, leaving unmapped ones alone.
pub fn substitute(ty: &Ty, mapping: &HashMap<u32, Ty>) -> Ty {
    match ty {
        Ty::Var(v) => mapping.get(v).cloned().unwrap_or(Ty::Var(*v)),
        Ty::Arrow(a, b) => Ty::arrow(substitute(a, mapping), substitute(b, mapping)),
        Ty::Tuple(parts) => Ty::Tuple(parts.iter().map(|t| substitute(t, mapping)).collect()),
        Ty::Con { name, stamp, args } => Ty::Con {
            name: name.clone(),
            stamp: *stamp,
            args: args.iter().map(|t| substitute(t, mapping)).collect(),
        },
        other => other.clone(),
    }
}

fn collect_vars(ty: &Ty, out: &mut Vec<u32>) {
    match ty {
        Ty::Var(v) => {
            if !out.contains(v) {
                out.push(*v);
            }
        }
        Ty::Arrow(a, b) => {
            collect_vars(a, out);
            collect_vars(b, out);
        }
        Ty::Tuple(parts) => {
            for t in parts {
                collect_vars(t, out);
            }
        }
        Ty::Con { args, .. } => {
            for t in args {
                collect_vars(t, out);
            }
        }
        _ => {}
    }
}

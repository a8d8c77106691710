//! The typing environment.
//!
//! Persistent by construction: an `Env` is an `Arc`-linked chain of frames,
//! so every typer-history element shares structure with its predecessors and
//! snapshotting is a pointer copy. Bindings carry stamps; query adapters use
//! them to decide whether two references resolve to the same declaration.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::Error;

use super::types::{Scheme, Stamp, Ty};

static STAMPS: AtomicU64 = AtomicU64::new(1);

pub fn fresh_stamp() -> Stamp {
    STAMPS.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone)]
pub struct ValueInfo {
    pub name: String,
    pub scheme: Scheme,
    pub stamp: Stamp,
}

#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub name: String,
    pub stamp: Stamp,
    /// Parameter names; bodies refer to them as `Ty::Var(index)`.
    pub params: Vec<String>,
    pub body: TypeBody,
}

#[derive(Debug, Clone)]
pub enum TypeBody {
    Abstract,
    Alias(Ty),
    Variant(Vec<CtorInfo>),
    Record(Vec<FieldInfo>),
}

#[derive(Debug, Clone)]
pub struct CtorInfo {
    pub name: String,
    pub stamp: Stamp,
    pub arg: Option<Ty>,
}

#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub name: String,
    pub ty: Ty,
}

#[derive(Debug, Clone)]
pub struct ExceptionInfo {
    pub name: String,
    pub stamp: Stamp,
    pub arg: Option<Ty>,
}

#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub name: String,
    pub stamp: Stamp,
}

#[derive(Debug, Clone)]
pub struct ModuleInfo {
    pub name: String,
    pub stamp: Stamp,
    pub sig: Arc<ModuleSig>,
}

/// What a module exports, in declaration order. Later entries shadow
/// earlier ones, exactly like the environment itself.
#[derive(Debug, Clone, Default)]
pub struct ModuleSig {
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone)]
pub enum Entry {
    Value(Arc<ValueInfo>),
    Type(Arc<TypeInfo>),
    Exception(Arc<ExceptionInfo>),
    Class(Arc<ClassInfo>),
    Module(Arc<ModuleInfo>),
    /// An `open`: the signature's contents become visible here.
    Open(Arc<ModuleSig>),
}

#[derive(Debug)]
struct Frame {
    parent: Option<Arc<Frame>>,
    entry: Entry,
}

/// The environment: a persistent map from identifiers to their meanings.
#[derive(Debug, Clone, Default)]
pub struct Env {
    head: Option<Arc<Frame>>,
}

impl Env {
    pub fn empty() -> Env {
        Env { head: None }
    }

    fn push(&self, entry: Entry) -> Env {
        Env {
            head: Some(Arc::new(Frame {
                parent: self.head.clone(),
                entry,
            })),
        }
    }

    pub fn bind_value(&self, name: &str, scheme: Scheme) -> (Env, Stamp) {
        let stamp = fresh_stamp();
        (self.bind_value_stamped(name, scheme, stamp), stamp)
    }

    /// Re-binds a name under an existing stamp. Used when a recursive
    /// group's placeholder binding is replaced by its generalized form: the
    /// identity must not change.
    pub fn bind_value_stamped(&self, name: &str, scheme: Scheme, stamp: Stamp) -> Env {
        self.push(Entry::Value(Arc::new(ValueInfo {
            name: name.to_string(),
            scheme,
            stamp,
        })))
    }

    pub fn bind_type(&self, info: Arc<TypeInfo>) -> Env {
        self.push(Entry::Type(info))
    }

    pub fn bind_exception(&self, info: Arc<ExceptionInfo>) -> Env {
        self.push(Entry::Exception(info))
    }

    pub fn bind_class(&self, name: &str) -> (Env, Stamp) {
        let stamp = fresh_stamp();
        let env = self.push(Entry::Class(Arc::new(ClassInfo {
            name: name.to_string(),
            stamp,
        })));
        (env, stamp)
    }

    pub fn bind_module(&self, name: &str, sig: Arc<ModuleSig>) -> (Env, Stamp) {
        let stamp = fresh_stamp();
        let env = self.push(Entry::Module(Arc::new(ModuleInfo {
            name: name.to_string(),
            stamp,
            sig,
        })));
        (env, stamp)
    }

    pub fn open(&self, sig: Arc<ModuleSig>) -> Env {
        self.push(Entry::Open(sig))
    }

    /// Frames from the most recent binding outward.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        std::iter::successors(self.head.as_deref(), |f| f.parent.as_deref()).map(|f| &f.entry)
    }

    /// Resolves a non-empty module qualifier to the signature the final
    /// path segment should be looked up in.
    fn qualifying_sig(&self, qualifier: &[&str]) -> Option<Arc<ModuleSig>> {
        let (first, rest) = qualifier.split_first()?;
        let mut module = self.lookup_module_name(first)?;
        for seg in rest {
            module = module.sig.module(seg)?;
        }
        Some(module.sig.clone())
    }

    fn lookup_module_name(&self, name: &str) -> Option<Arc<ModuleInfo>> {
        for entry in self.entries() {
            match entry {
                Entry::Module(m) if m.name == name => return Some(m.clone()),
                Entry::Open(sig) => {
                    if let Some(m) = sig.module(name) {
                        return Some(m);
                    }
                }
                _ => {}
            }
        }
        None
    }

    pub fn lookup_value(&self, path: &[&str]) -> Option<Arc<ValueInfo>> {
        let (last, qualifier) = path.split_last()?;
        if qualifier.is_empty() {
            for entry in self.entries() {
                match entry {
                    Entry::Value(v) if v.name == *last => return Some(v.clone()),
                    Entry::Open(sig) => {
                        if let Some(v) = sig.value(last) {
                            return Some(v);
                        }
                    }
                    _ => {}
                }
            }
            None
        } else {
            self.qualifying_sig(qualifier)?.value(last)
        }
    }

    pub fn lookup_type(&self, path: &[&str]) -> Option<Arc<TypeInfo>> {
        let (last, qualifier) = path.split_last()?;
        if qualifier.is_empty() {
            for entry in self.entries() {
                match entry {
                    Entry::Type(t) if t.name == *last => return Some(t.clone()),
                    Entry::Open(sig) => {
                        if let Some(t) = sig.type_info(last) {
                            return Some(t);
                        }
                    }
                    _ => {}
                }
            }
            None
        } else {
            self.qualifying_sig(qualifier)?.type_info(last)
        }
    }

    pub fn lookup_module(&self, path: &[&str]) -> Option<Arc<ModuleInfo>> {
        let (last, qualifier) = path.split_last()?;
        if qualifier.is_empty() {
            self.lookup_module_name(last)
        } else {
            self.qualifying_sig(qualifier)?.module(last)
        }
    }

    /// Constructors live in their type declarations and in exceptions.
    pub fn lookup_ctor(&self, path: &[&str]) -> Option<CtorLookup> {
        let (last, qualifier) = path.split_last()?;
        if qualifier.is_empty() {
            for entry in self.entries() {
                if let Some(found) = entry_lookup_ctor(entry, last) {
                    return Some(found);
                }
            }
            None
        } else {
            let sig = self.qualifying_sig(qualifier)?;
            sig.entries
                .iter()
                .rev()
                .find_map(|e| entry_lookup_ctor(e, last))
        }
    }
}

/// A constructor resolution: either a variant constructor with the type it
/// belongs to, or an exception.
#[derive(Debug, Clone)]
pub enum CtorLookup {
    Variant {
        ctor: CtorInfo,
        owner: Arc<TypeInfo>,
    },
    Exception(Arc<ExceptionInfo>),
}

fn entry_lookup_ctor(entry: &Entry, name: &str) -> Option<CtorLookup> {
    match entry {
        Entry::Type(info) => {
            if let TypeBody::Variant(ctors) = &info.body {
                let ctor = ctors.iter().find(|c| c.name == name)?;
                Some(CtorLookup::Variant {
                    ctor: ctor.clone(),
                    owner: info.clone(),
                })
            } else {
                None
            }
        }
        Entry::Exception(exc) if exc.name == name => Some(CtorLookup::Exception(exc.clone())),
        Entry::Open(sig) => sig
            .entries
            .iter()
            .rev()
            .find_map(|e| entry_lookup_ctor(e, name)),
        _ => None,
    }
}

impl ModuleSig {
    /// Member lookups mirror the environment: latest entry wins, opens are
    /// transparent.
    pub fn value(&self, name: &str) -> Option<Arc<ValueInfo>> {
        self.entries.iter().rev().find_map(|e| match e {
            Entry::Value(v) if v.name == name => Some(v.clone()),
            Entry::Open(inner) => inner.value(name),
            _ => None,
        })
    }

    pub fn type_info(&self, name: &str) -> Option<Arc<TypeInfo>> {
        self.entries.iter().rev().find_map(|e| match e {
            Entry::Type(t) if t.name == name => Some(t.clone()),
            Entry::Open(inner) => inner.type_info(name),
            _ => None,
        })
    }

    pub fn module(&self, name: &str) -> Option<Arc<ModuleInfo>> {
        self.entries.iter().rev().find_map(|e| match e {
            Entry::Module(m) if m.name == name => Some(m.clone()),
            Entry::Open(inner) => inner.module(name),
            _ => None,
        })
    }

    pub fn ctor(&self, name: &str) -> Option<CtorLookup> {
        self.entries
            .iter()
            .rev()
            .find_map(|e| entry_lookup_ctor(e, name))
    }
}

/// The initial environment: the standard prelude opened against the empty
/// environment. Computed once, lazily, process-wide.
pub fn initial_env() -> Result<Env, Error> {
    static INITIAL: std::sync::OnceLock<Result<Env, Error>> = std::sync::OnceLock::new();
    INITIAL.get_or_init(build_initial).clone()
}

fn build_initial() -> Result<Env, Error> {
    let mut entries = Vec::new();

    let mut alias = |name: &str, ty: Ty| {
        entries.push(Entry::Type(Arc::new(TypeInfo {
            name: name.to_string(),
            stamp: fresh_stamp(),
            params: Vec::new(),
            body: TypeBody::Alias(ty),
        })));
    };
    alias("unit", Ty::Unit);
    alias("int", Ty::Int);
    alias("bool", Ty::Bool);
    alias("string", Ty::Str);
    alias("char", Ty::Char);

    let exn = Arc::new(TypeInfo {
        name: "exn".to_string(),
        stamp: fresh_stamp(),
        params: Vec::new(),
        body: TypeBody::Abstract,
    });
    entries.push(Entry::Type(exn.clone()));

    let list = Arc::new(TypeInfo {
        name: "list".to_string(),
        stamp: fresh_stamp(),
        params: vec!["a".to_string()],
        body: TypeBody::Abstract,
    });
    entries.push(Entry::Type(list.clone()));

    let option = Arc::new(TypeInfo {
        name: "option".to_string(),
        stamp: fresh_stamp(),
        params: vec!["a".to_string()],
        body: TypeBody::Variant(vec![
            CtorInfo {
                name: "None".to_string(),
                stamp: fresh_stamp(),
                arg: None,
            },
            CtorInfo {
                name: "Some".to_string(),
                stamp: fresh_stamp(),
                arg: Some(Ty::Var(0)),
            },
        ]),
    });
    entries.push(Entry::Type(option.clone()));

    let mut value = |name: &str, vars: Vec<u32>, ty: Ty| {
        entries.push(Entry::Value(Arc::new(ValueInfo {
            name: name.to_string(),
            scheme: Scheme { vars, ty },
            stamp: fresh_stamp(),
        })));
    };

    let int2 = Ty::arrow(Ty::Int, Ty::arrow(Ty::Int, Ty::Int));
    for op in ["+", "-", "*", "/", "mod"] {
        value(op, Vec::new(), int2.clone());
    }
    let cmp = Ty::arrow(Ty::Var(0), Ty::arrow(Ty::Var(0), Ty::Bool));
    for op in ["=", "<>", "<", ">", "<=", ">="] {
        value(op, vec![0], cmp.clone());
    }
    let bool2 = Ty::arrow(Ty::Bool, Ty::arrow(Ty::Bool, Ty::Bool));
    for op in ["&&", "||"] {
        value(op, Vec::new(), bool2.clone());
    }
    value("^", Vec::new(), Ty::arrow(Ty::Str, Ty::arrow(Ty::Str, Ty::Str)));
    value("not", Vec::new(), Ty::arrow(Ty::Bool, Ty::Bool));
    value("succ", Vec::new(), Ty::arrow(Ty::Int, Ty::Int));
    value("pred", Vec::new(), Ty::arrow(Ty::Int, Ty::Int));
    value("string_of_int", Vec::new(), Ty::arrow(Ty::Int, Ty::Str));
    value("int_of_string", Vec::new(), Ty::arrow(Ty::Str, Ty::Int));
    value("print_string", Vec::new(), Ty::arrow(Ty::Str, Ty::Unit));
    value("print_endline", Vec::new(), Ty::arrow(Ty::Str, Ty::Unit));
    value("ignore", vec![0], Ty::arrow(Ty::Var(0), Ty::Unit));

    let sig = Arc::new(ModuleSig { entries });
    let (env, _) = Env::empty().bind_module("Stdlib", sig.clone());
    Ok(env.open(sig))
}

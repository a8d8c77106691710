//! Type rendering, against a scoped "current environment".
//!
//! The printer consults a process-wide (per-thread) environment pointer to
//! decide how a declared type's name should print: a type that is shadowed
//! in the current scope gets a stamp suffix (`t/3`) so two distinct types
//! never render identically. Callers scope the pointer with
//! [`scoped_env`]; the guard restores the previous binding on every exit
//! path, panics included.

use std::cell::RefCell;

use super::env::Env;
use super::types::{Scheme, Stamp, Ty};

thread_local! {
    static CURRENT_ENV: RefCell<Option<Env>> = const { RefCell::new(None) };
}

/// Restores the previous printer environment on drop.
pub struct EnvScope {
    prev: Option<Env>,
}

/// Sets the printer's current environment for the lifetime of the guard.
#[must_use = "the environment is reset when the guard drops"]
pub fn scoped_env(env: &Env) -> EnvScope {
    let prev = CURRENT_ENV.with(|c| c.replace(Some(env.clone())));
    EnvScope { prev }
}

impl Drop for EnvScope {
    fn drop(&mut self) {
        let prev = self.prev.take();
        CURRENT_ENV.with(|c| *c.borrow_mut() = prev);
    }
}

/// Renders a type. Variables are named `'a`, `'b`, … in order of
/// appearance.
pub fn type_to_string(ty: &Ty) -> String {
    let mut printer = Printer::default();
    let mut out = String::new();
    printer.print(ty, 0, &mut out);
    out
}

/// Renders a scheme; quantification stays implicit, ML-style.
pub fn scheme_to_string(scheme: &Scheme) -> String {
    type_to_string(&scheme.ty)
}

#[derive(Default)]
struct Printer {
    vars: Vec<u32>,
}

// Precedence levels: 0 arrow, 1 tuple, 2 atom.
impl Printer {
    fn print(&mut self, ty: &Ty, prec: u8, out: &mut String) {
        match ty {
            Ty::Var(v) => out.push_str(&self.var_name(*v)),
            Ty::Unit => out.push_str("unit"),
            Ty::Int => out.push_str("int"),
            Ty::Bool => out.push_str("bool"),
            Ty::Str => out.push_str("string"),
            Ty::Char => out.push_str("char"),
            Ty::Arrow(a, b) => {
                let parens = prec > 0;
                if parens {
                    out.push('(');
                }
                self.print(a, 1, out);
                out.push_str(" -> ");
                self.print(b, 0, out);
                if parens {
                    out.push(')');
                }
            }
            Ty::Tuple(parts) => {
                let parens = prec > 1;
                if parens {
                    out.push('(');
                }
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" * ");
                    }
                    self.print(part, 2, out);
                }
                if parens {
                    out.push(')');
                }
            }
            Ty::Con { name, stamp, args } => {
                match args.as_slice() {
                    [] => {}
                    [single] => {
                        self.print(single, 2, out);
                        out.push(' ');
                    }
                    many => {
                        out.push('(');
                        for (i, arg) in many.iter().enumerate() {
                            if i > 0 {
                                out.push_str(", ");
                            }
                            self.print(arg, 0, out);
                        }
                        out.push_str(") ");
                    }
                }
                out.push_str(&con_name(name, *stamp));
            }
        }
    }

    fn var_name(&mut self, v: u32) -> String {
        let idx = match self.vars.iter().position(|&w| w == v) {
            Some(i) => i,
            None => {
                self.vars.push(v);
                self.vars.len() - 1
            }
        };
        let letter = (b'a' + (idx % 26) as u8) as char;
        if idx < 26 {
            format!("'{letter}")
        } else {
            format!("'{letter}{}", idx / 26)
        }
    }
}

/// The printed name of a declared type: bare when the current environment
/// still resolves it to the same declaration, stamp-suffixed when shadowed.
fn con_name(name: &str, stamp: Stamp) -> String {
    CURRENT_ENV.with(|c| match &*c.borrow() {
        Some(env) => match env.lookup_type(&[name]) {
            Some(info) if info.stamp == stamp => name.to_string(),
            Some(_) => format!("{name}/{stamp}"),
            None => name.to_string(),
        },
        None => name.to_string(),
    })
}

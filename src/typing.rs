//! Type inference for the calculus, as far as the matcher needs it.
//!
//! `infer` returns `Ok(None)` when a type cannot be determined (untyped
//! constants, holes without a declared type) and `Err` only for definite
//! errors such as an argument whose type is not convertible with the
//! function's domain.

use crate::env::Ctx;
use crate::evar::EvarMap;
use crate::reduce::{beta_app, whnf, Reductions};
use crate::subst::{instantiate, instantiate_many, lift};
use crate::term::{Term, TermId};
use crate::unify::Unifier;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("argument {arg:?} has type {found:?}, expected {expected:?}")]
    Mismatch {
        arg: TermId,
        expected: TermId,
        found: TermId,
    },
    #[error("{0:?} is applied but its type is not a product")]
    NotAFunction(TermId),
    #[error("{0:?} is not a type")]
    NotAType(TermId),
}

/// Infer the type of a closed term (free variables have unknown types).
pub fn infer(
    cx: Ctx<'_>,
    unifier: &dyn Unifier,
    evars: &EvarMap,
    t: TermId,
) -> Result<Option<TermId>, TypeError> {
    let mut locals = Vec::new();
    Inferer {
        cx,
        unifier,
        evars,
    }
    .infer(&mut locals, t)
}

struct Inferer<'a, 'u> {
    cx: Ctx<'a>,
    unifier: &'u dyn Unifier,
    evars: &'a EvarMap,
}

impl Inferer<'_, '_> {
    /// `locals` holds the types of the enclosing binders, innermost last.
    fn infer(&self, locals: &mut Vec<TermId>, t: TermId) -> Result<Option<TermId>, TypeError> {
        let terms = self.cx.terms;
        match terms.get(t) {
            Term::Rel(i) => {
                let depth = locals.len();
                if (i as usize) < depth {
                    Ok(Some(lift(terms, locals[depth - 1 - i as usize], 0, i + 1)))
                } else {
                    Ok(None)
                }
            }
            Term::Sort(n) => Ok(Some(terms.sort(n + 1))),
            Term::Const(c) => Ok(self.cx.env.type_of(c)),
            Term::Evar(k, args) => {
                if let Some(value) = self.evars.value(k) {
                    return self.infer(locals, instantiate_many(terms, value, &args));
                }
                let ty = self.evars.decl(k).and_then(|d| d.ty);
                Ok(ty.map(|ty| instantiate_many(terms, ty, &args)))
            }
            Term::App(head, args) => {
                let Some(mut fty) = self.infer(locals, head)? else {
                    return Ok(None);
                };
                for &arg in args.iter() {
                    let fwhnf = whnf(self.cx, self.evars, fty, Reductions::FULL);
                    match terms.get(fwhnf) {
                        Term::Pi(dom, body) => {
                            if let Some(found) = self.infer(locals, arg)? {
                                if !self.conv(found, dom) {
                                    return Err(TypeError::Mismatch {
                                        arg,
                                        expected: dom,
                                        found,
                                    });
                                }
                            }
                            fty = instantiate(terms, body, arg);
                        }
                        Term::Evar(_, _) => return Ok(None),
                        _ => return Err(TypeError::NotAFunction(head)),
                    }
                }
                Ok(Some(fty))
            }
            Term::Pi(dom, body) => {
                let s1 = self.sort_of(locals, dom)?;
                locals.push(dom);
                let s2 = self.sort_of(locals, body);
                locals.pop();
                Ok(match (s1, s2?) {
                    (_, Some(0)) => Some(terms.sort(0)),
                    (Some(a), Some(b)) => Some(terms.sort(a.max(b))),
                    _ => None,
                })
            }
            Term::Lambda(dom, body) => {
                self.sort_of(locals, dom)?;
                locals.push(dom);
                let bty = self.infer(locals, body);
                locals.pop();
                Ok(bty?.map(|bty| terms.pi(dom, bty)))
            }
            Term::LetIn(value, ty, body) => {
                if let Some(found) = self.infer(locals, value)? {
                    if !self.conv(found, ty) {
                        return Err(TypeError::Mismatch {
                            arg: value,
                            expected: ty,
                            found,
                        });
                    }
                }
                self.infer(locals, instantiate(terms, body, value))
            }
            Term::Cast(inner, ty) => {
                if let Some(found) = self.infer(locals, inner)? {
                    if !self.conv(found, ty) {
                        return Err(TypeError::Mismatch {
                            arg: inner,
                            expected: ty,
                            found,
                        });
                    }
                }
                Ok(Some(ty))
            }
            Term::Case(ret, scrutinee, branches) => {
                self.infer(locals, scrutinee)?;
                for &b in branches.iter() {
                    self.infer(locals, b)?;
                }
                Ok(Some(beta_app(terms, ret, &[scrutinee])))
            }
            Term::Fix(index, types, _) => Ok(types.get(index as usize).copied()),
        }
    }

    /// Universe level of a type, `None` when unknown.
    fn sort_of(&self, locals: &mut Vec<TermId>, ty: TermId) -> Result<Option<u32>, TypeError> {
        let Some(s) = self.infer(locals, ty)? else {
            return Ok(None);
        };
        match self.cx.terms.get(whnf(self.cx, self.evars, s, Reductions::FULL)) {
            Term::Sort(n) => Ok(Some(n)),
            Term::Evar(_, _) => Ok(None),
            _ => Err(TypeError::NotAType(ty)),
        }
    }

    fn conv(&self, a: TermId, b: TermId) -> bool {
        self.unifier.conv(self.cx, self.evars, a, b)
    }
}

#[cfg(test)]
#[path = "tests/typing.rs"]
mod tests;

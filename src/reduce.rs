//! Weak-head reduction.
//!
//! Casts are always stripped. Beta, zeta (let), delta (definitions) and
//! hole instantiation are each switched by [`Reductions`].

use crate::env::Ctx;
use crate::evar::EvarMap;
use crate::subst::{instantiate, instantiate_many};
use crate::term::{Args, Term, TermId, TermStore};

/// Which reductions `whnf` may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reductions {
    pub beta: bool,
    pub zeta: bool,
    pub delta: bool,
    pub evars: bool,
}

impl Reductions {
    /// Patterns: no unfolding of definitions or lets.
    pub const PATTERN: Reductions = Reductions {
        beta: true,
        zeta: false,
        delta: false,
        evars: true,
    };
    /// Everything except delta.
    pub const NO_DELTA: Reductions = Reductions {
        beta: true,
        zeta: true,
        delta: false,
        evars: true,
    };
    pub const FULL: Reductions = Reductions {
        beta: true,
        zeta: true,
        delta: true,
        evars: true,
    };
}

/// Apply `head` to `args`, contracting as many beta redexes as the head
/// exposes.
pub fn beta_app(terms: &TermStore, head: TermId, args: &[TermId]) -> TermId {
    let mut head = head;
    let mut used = 0;
    while used < args.len() {
        match terms.get(head) {
            Term::Lambda(_, body) => {
                head = instantiate(terms, body, args[used]);
                used += 1;
            }
            _ => break,
        }
    }
    terms.app_slice(head, &args[used..])
}

/// Reduce `t` to weak-head normal form under `flags`.
///
/// Delta steps are bounded by `config.unfold_fuel`; when the fuel runs out
/// the current term is returned as is.
pub fn whnf(cx: Ctx<'_>, evars: &EvarMap, t: TermId, flags: Reductions) -> TermId {
    let mut fuel = cx.config.unfold_fuel;
    whnf_with_fuel(cx, evars, t, flags, &mut fuel)
}

pub(crate) fn whnf_with_fuel(
    cx: Ctx<'_>,
    evars: &EvarMap,
    t: TermId,
    flags: Reductions,
    fuel: &mut u32,
) -> TermId {
    let terms = cx.terms;
    let mut t = t;
    loop {
        match terms.get(t) {
            Term::Cast(inner, _) => t = inner,
            Term::LetIn(value, _, body) if flags.zeta => t = instantiate(terms, body, value),
            Term::Evar(k, args) if flags.evars => match evars.value(k) {
                Some(value) => t = instantiate_many(terms, value, &args),
                None => return t,
            },
            Term::Const(c) if flags.delta && *fuel > 0 => match cx.env.definition(c) {
                Some(def) => {
                    *fuel -= 1;
                    t = def.body;
                }
                None => return t,
            },
            Term::App(head, args) => {
                let new_head = whnf_with_fuel(cx, evars, head, flags, fuel);
                if flags.beta && matches!(terms.get(new_head), Term::Lambda(_, _)) {
                    t = beta_app(terms, new_head, &args);
                    continue;
                }
                if new_head == head {
                    return t;
                }
                return terms.app(new_head, args);
            }
            _ => return t,
        }
    }
}

/// Weak-head spine: reduce under `flags`, then split head and arguments.
pub fn decompose(cx: Ctx<'_>, evars: &EvarMap, t: TermId, flags: Reductions) -> (TermId, Args) {
    let t = whnf(cx, evars, t, flags);
    cx.terms.spine(t)
}

/// One delta step at the head of `t`: if the head is a defined constant,
/// replace it by its body and contract the resulting beta redexes.
pub fn unfold_head(cx: Ctx<'_>, t: TermId) -> Option<TermId> {
    let (head, args) = cx.terms.spine(t);
    match cx.terms.get(head) {
        Term::Const(c) => {
            let def = cx.env.definition(c)?;
            Some(beta_app(cx.terms, def.body, &args))
        }
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/reduce.rs"]
mod tests;

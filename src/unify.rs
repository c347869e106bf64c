//! The conversion/unification oracle.
//!
//! [`Unifier`] is the seam between the matching engine and the underlying
//! equality theory. Every operation takes the store by reference and returns
//! a new one, so a failed attempt leaves the caller's store untouched.
//! [`StandardUnifier`] is the implementation shipped with the crate.

use crate::env::Ctx;
use crate::evar::{Constraint, EvarKind, EvarMap};
use crate::reduce::{unfold_head, whnf, Reductions};
use crate::subst::{abstract_rels, abstract_terms, has_loose_rel_from};
use crate::term::{EvarId, Term, TermId, TermStore};
use crate::trace::trace;
use crate::traverse::any_subterm;
use crate::typing::{self, TypeError};
use std::cmp::Ordering;

pub trait Unifier {
    /// Pure convertibility check; never assigns holes.
    fn conv(&self, cx: Ctx<'_>, evars: &EvarMap, a: TermId, b: TermId) -> bool;

    /// Non-binding equality used to count occurrences once the
    /// instantiation is fixed.
    fn unif_eq(&self, cx: Ctx<'_>, evars: &EvarMap, a: TermId, b: TermId) -> bool {
        evars.instantiate(cx.terms, a) == evars.instantiate(cx.terms, b)
    }

    /// Delta-free unification. Fails rather than postponing.
    fn unify_fo(&self, cx: Ctx<'_>, evars: &EvarMap, a: TermId, b: TermId) -> Option<EvarMap>;

    /// Full unification: may unfold definitions and postpone problems.
    fn unify_ho(&self, cx: Ctx<'_>, evars: &EvarMap, a: TermId, b: TermId) -> Option<EvarMap>;

    /// One round of solving postponed constraints.
    fn simplify_constraints(&self, cx: Ctx<'_>, evars: &EvarMap) -> Option<EvarMap>;

    /// Solve open side obligations from the environment's instances.
    fn resolve_obligations(&self, cx: Ctx<'_>, evars: &EvarMap) -> Option<EvarMap>;

    fn infer_type(
        &self,
        cx: Ctx<'_>,
        evars: &EvarMap,
        t: TermId,
    ) -> Result<Option<TermId>, TypeError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StandardUnifier;

impl Unifier for StandardUnifier {
    fn conv(&self, cx: Ctx<'_>, evars: &EvarMap, a: TermId, b: TermId) -> bool {
        let mut frozen = evars.clone();
        frozen.freeze(frozen.checkpoint());
        Unification::new(cx, frozen, Mode::Conversion).unify(a, b)
    }

    fn unify_fo(&self, cx: Ctx<'_>, evars: &EvarMap, a: TermId, b: TermId) -> Option<EvarMap> {
        Unification::new(cx, evars.clone(), Mode::FirstOrder).run(a, b)
    }

    fn unify_ho(&self, cx: Ctx<'_>, evars: &EvarMap, a: TermId, b: TermId) -> Option<EvarMap> {
        Unification::new(cx, evars.clone(), Mode::HigherOrder).run(a, b)
    }

    fn simplify_constraints(&self, cx: Ctx<'_>, evars: &EvarMap) -> Option<EvarMap> {
        let mut u = Unification::new(cx, evars.clone(), Mode::HigherOrder);
        let pending = u.evars.take_pending();
        if pending.is_empty() {
            return Some(u.evars);
        }
        let before = u.evars.version();
        for c in &pending {
            if !u.unify(c.lhs, c.rhs) {
                trace!(lhs = ?c.lhs, rhs = ?c.rhs, "constraint_failed");
                return None;
            }
        }
        let mut evars = u.evars;
        if evars.version() == before {
            // Stuck: imitate the first postponed hole problem that allows it.
            let mut solved = false;
            for c in evars.take_pending() {
                if !solved && imitate(cx.terms, &mut evars, c) {
                    solved = true;
                } else {
                    evars.defer(c);
                }
            }
        }
        Some(evars)
    }

    fn resolve_obligations(&self, cx: Ctx<'_>, evars: &EvarMap) -> Option<EvarMap> {
        let open: Vec<(EvarId, TermId)> = evars
            .iter()
            .filter(|(k, d)| d.kind == EvarKind::Obligation && evars.is_assignable(*k))
            .filter_map(|(k, d)| d.ty.map(|ty| (k, ty)))
            .collect();
        let mut evars = evars.clone();
        for (k, ty) in open {
            let solution = cx.env.instances().iter().find_map(|inst| {
                let mut next = self.unify_ho(cx, &evars, ty, inst.ty)?;
                next.assign(k, cx.terms.constant(inst.name)).then_some(next)
            });
            match solution {
                Some(next) => evars = next,
                None => {
                    trace!(hole = k.0, "obligation_unresolved");
                }
            }
        }
        Some(evars)
    }

    fn infer_type(
        &self,
        cx: Ctx<'_>,
        evars: &EvarMap,
        t: TermId,
    ) -> Result<Option<TermId>, TypeError> {
        typing::infer(cx, self, evars, t)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// No delta, no postponement.
    FirstOrder,
    /// Lazy delta, postponement of non-pattern hole problems.
    HigherOrder,
    /// Lazy delta on a frozen store.
    Conversion,
}

/// One unification problem in progress. Backtracking restores `evars`
/// from a clone taken before the alternative was tried.
struct Unification<'a> {
    cx: Ctx<'a>,
    evars: EvarMap,
    mode: Mode,
    fuel: u32,
}

impl<'a> Unification<'a> {
    fn new(cx: Ctx<'a>, evars: EvarMap, mode: Mode) -> Self {
        Self {
            cx,
            evars,
            mode,
            fuel: cx.config.unfold_fuel,
        }
    }

    fn run(mut self, a: TermId, b: TermId) -> Option<EvarMap> {
        self.unify(a, b).then_some(self.evars)
    }

    fn unify(&mut self, a: TermId, b: TermId) -> bool {
        if a == b {
            return true;
        }
        let terms = self.cx.terms;
        let a = whnf(self.cx, &self.evars, a, Reductions::NO_DELTA);
        let b = whnf(self.cx, &self.evars, b, Reductions::NO_DELTA);
        if a == b {
            return true;
        }
        let (na, nb) = (terms.get(a), terms.get(b));

        if let Term::Evar(k, args) = &na {
            if self.evars.is_assignable(*k) {
                return self.solve(*k, args, a, b, false);
            }
        }
        if let Term::Evar(k, args) = &nb {
            if self.evars.is_assignable(*k) {
                return self.solve(*k, args, b, a, false);
            }
        }

        let saved = self.evars.clone();
        if self.rigid(&na, &nb) {
            return true;
        }
        self.evars = saved.clone();
        if self.canonical(a, b) {
            return true;
        }
        self.evars = saved.clone();
        if self.canonical(b, a) {
            return true;
        }
        self.evars = saved.clone();
        if self.mode != Mode::FirstOrder && self.unfold(a, b) {
            return true;
        }
        self.evars = saved;

        if self.mode == Mode::HigherOrder && (self.is_flexible(a) || self.is_flexible(b)) {
            trace!(lhs = ?a, rhs = ?b, "unify_postponed");
            self.evars.defer(Constraint { lhs: a, rhs: b });
            return true;
        }
        trace!(lhs = ?a, rhs = ?b, "unify_mismatch");
        false
    }

    fn unify_all(&mut self, xs: &[TermId], ys: &[TermId]) -> bool {
        xs.len() == ys.len() && xs.iter().zip(ys).all(|(&x, &y)| self.unify(x, y))
    }

    /// Solve `?k[args] == t`, where `hole` is the term `?k[args]`.
    fn solve(&mut self, k: EvarId, args: &[TermId], hole: TermId, t: TermId, swapped: bool) -> bool {
        let terms = self.cx.terms;
        let t = self.evars.instantiate(terms, t);
        let node = terms.get(t);
        if let Term::Evar(k2, args2) = &node {
            if *k2 == k {
                return self.unify_all(args, args2);
            }
        }
        if occurs(terms, k, t) {
            trace!(hole = k.0, "unify_occurs_check_failed");
            return false;
        }
        if let Some(vars) = distinct_rels(terms, args) {
            if let Some(value) = abstract_rels(terms, t, &vars) {
                return self.evars.assign(k, value);
            }
        }
        if !swapped {
            if let Term::Evar(k2, args2) = &node {
                if self.evars.is_assignable(*k2) {
                    let saved = self.evars.clone();
                    if self.solve(*k2, args2, t, hole, true) {
                        return true;
                    }
                    self.evars = saved;
                }
            }
        }
        match self.mode {
            Mode::HigherOrder => {
                trace!(hole = k.0, "unify_postponed");
                self.evars.defer(Constraint { lhs: hole, rhs: t });
                true
            }
            Mode::FirstOrder | Mode::Conversion => false,
        }
    }

    /// Same constructor on both sides: compare children.
    fn rigid(&mut self, na: &Term, nb: &Term) -> bool {
        match (na, nb) {
            (Term::Rel(i), Term::Rel(j)) => i == j,
            (Term::Sort(i), Term::Sort(j)) => i == j,
            (Term::Const(c), Term::Const(d)) => c == d,
            (Term::Evar(k, xs), Term::Evar(l, ys)) => k == l && self.unify_all(xs, ys),
            (Term::App(f, xs), Term::App(g, ys)) => self.spines(*f, xs, *g, ys),
            (Term::Pi(d1, b1), Term::Pi(d2, b2)) => self.unify(*d1, *d2) && self.unify(*b1, *b2),
            (Term::Lambda(d1, b1), Term::Lambda(d2, b2)) => {
                self.unify(*d1, *d2) && self.unify(*b1, *b2)
            }
            (Term::LetIn(v1, t1, b1), Term::LetIn(v2, t2, b2)) => {
                self.unify(*t1, *t2) && self.unify(*v1, *v2) && self.unify(*b1, *b2)
            }
            (Term::Case(r1, s1, bs1), Term::Case(r2, s2, bs2)) => {
                self.unify(*r1, *r2) && self.unify(*s1, *s2) && self.unify_all(bs1, bs2)
            }
            (Term::Fix(i, ts1, bs1), Term::Fix(j, ts2, bs2)) => {
                i == j && self.unify_all(ts1, ts2) && self.unify_all(bs1, bs2)
            }
            _ => false,
        }
    }

    /// Application spines are aligned on their last arguments; the surplus
    /// prefix of the longer one is unified with the other head.
    fn spines(&mut self, f: TermId, xs: &[TermId], g: TermId, ys: &[TermId]) -> bool {
        let terms = self.cx.terms;
        match xs.len().cmp(&ys.len()) {
            Ordering::Equal => self.unify(f, g) && self.unify_all(xs, ys),
            Ordering::Less => {
                let split = ys.len() - xs.len();
                let g = terms.app_slice(g, &ys[..split]);
                self.unify(f, g) && self.unify_all(xs, &ys[split..])
            }
            Ordering::Greater => {
                let split = xs.len() - ys.len();
                let f = terms.app_slice(f, &xs[..split]);
                self.unify(f, g) && self.unify_all(&xs[split..], ys)
            }
        }
    }

    /// `proj params.. s xs..` against `head ys..` where `head` is a
    /// canonical value of `proj`.
    fn canonical(&mut self, proj_side: TermId, head_side: TermId) -> bool {
        let terms = self.cx.terms;
        let (p, xs) = terms.spine(proj_side);
        let (h, ys) = terms.spine(head_side);
        let (Term::Const(p), Term::Const(h)) = (terms.get(p), terms.get(h)) else {
            return false;
        };
        let Some(nparams) = self.cx.env.projection(p) else {
            return false;
        };
        let Some(entry) = self.cx.env.lookup_canonical(p, h).copied() else {
            return false;
        };
        if nparams == 0 || xs.len() < nparams {
            return false;
        }
        let own = &xs[nparams..];
        if ys.len() != entry.extra + own.len() {
            return false;
        }
        let structure = terms.app_slice(entry.instance, &ys[..entry.extra]);
        self.unify(xs[nparams - 1], structure) && self.unify_all(own, &ys[entry.extra..])
    }

    /// Lazy delta: unfold one side's head definition and retry.
    fn unfold(&mut self, a: TermId, b: TermId) -> bool {
        let saved = self.evars.clone();
        if self.fuel > 0 {
            if let Some(a2) = unfold_head(self.cx, a) {
                self.fuel -= 1;
                if self.unify(a2, b) {
                    return true;
                }
                self.evars = saved.clone();
            }
        }
        if self.fuel > 0 {
            if let Some(b2) = unfold_head(self.cx, b) {
                self.fuel -= 1;
                if self.unify(a, b2) {
                    return true;
                }
                self.evars = saved;
            }
        }
        false
    }

    fn is_flexible(&self, t: TermId) -> bool {
        matches!(self.cx.terms.head_evar(t), Some(k) if self.evars.is_assignable(k))
    }
}

/// Does hole `k` occur in `t`?
pub fn occurs(terms: &TermStore, k: EvarId, t: TermId) -> bool {
    any_subterm(terms, t, 0, &mut |_, node, _| {
        matches!(node, Term::Evar(k2, _) if *k2 == k)
    })
}

/// The de Bruijn indices of `args` if they are pairwise distinct variables.
fn distinct_rels(terms: &TermStore, args: &[TermId]) -> Option<Vec<u32>> {
    let mut vars = Vec::with_capacity(args.len());
    for &a in args {
        match terms.get(a) {
            Term::Rel(i) if !vars.contains(&i) => vars.push(i),
            _ => return None,
        }
    }
    Some(vars)
}

/// Solve a postponed `?k[args] == t` by abstracting the instance arguments
/// out of `t`.
fn imitate(terms: &TermStore, evars: &mut EvarMap, c: Constraint) -> bool {
    for (flex, other) in [(c.lhs, c.rhs), (c.rhs, c.lhs)] {
        let flex = evars.instantiate(terms, flex);
        let Term::Evar(k, args) = terms.get(flex) else {
            continue;
        };
        if !evars.is_assignable(k) {
            continue;
        }
        let other = evars.instantiate(terms, other);
        if occurs(terms, k, other) {
            continue;
        }
        let value = abstract_terms(terms, other, &args);
        if has_loose_rel_from(terms, value, args.len() as u32) {
            continue;
        }
        if evars.assign(k, value) {
            trace!(hole = k.0, "constraint_imitated");
            return true;
        }
    }
    false
}

#[cfg(test)]
#[path = "tests/unify.rs"]
mod tests;

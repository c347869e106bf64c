//! The substitution store (evar map).
//!
//! Holes are declared with an arity: the value of a hole of arity `n` lives
//! in a context of `n` variables, and an occurrence `?k[a0 .. an-1]` reads
//! `Rel(i)` in that value as `ai`.
//!
//! The map is persistent (`im`), so cloning it is O(1). Speculative work
//! clones the map, mutates the clone, and either returns it or drops it;
//! failure never needs an undo.

use crate::reduce::beta_app;
use crate::subst::instantiate_many;
use crate::term::{Args, EvarId, Term, TermId, TermStore};
use crate::traverse::{any_subterm, replace};
use im::{OrdMap, Vector};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvarKind {
    /// Ordinary hole, solved by unification.
    Hole,
    /// Side obligation, solved by instance resolution.
    Obligation,
    /// Stand-in for a pattern hole during first-order matching.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvarDecl {
    /// Size of the hole's context (length of every instance).
    pub arity: u32,
    /// Declared type, in the hole's context.
    pub ty: Option<TermId>,
    pub kind: EvarKind,
    pub value: Option<TermId>,
}

/// A postponed unification problem `lhs == rhs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Constraint {
    pub lhs: TermId,
    pub rhs: TermId,
}

/// Boundary between holes that existed at a checkpoint and holes created later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Scope(u32);

impl Scope {
    /// Was `k` already declared when this scope was taken?
    pub fn contains(self, k: EvarId) -> bool {
        k.0 < self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct EvarMap {
    decls: OrdMap<EvarId, EvarDecl>,
    next: u32,
    /// Holes with an id below this watermark cannot be assigned.
    frozen_below: u32,
    pending: Vector<Constraint>,
    /// Bumped on every assignment.
    version: u64,
}

impl EvarMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a new hole.
    pub fn fresh(&mut self, arity: u32, ty: Option<TermId>, kind: EvarKind) -> EvarId {
        let id = EvarId(self.next);
        self.next += 1;
        self.decls.insert(
            id,
            EvarDecl {
                arity,
                ty,
                kind,
                value: None,
            },
        );
        id
    }

    /// Declare an arity-0 hole and return it together with its term.
    pub fn fresh_hole(&mut self, terms: &TermStore, ty: Option<TermId>) -> (EvarId, TermId) {
        let id = self.fresh(0, ty, EvarKind::Hole);
        (id, terms.evar(id, Args::new()))
    }

    pub fn decl(&self, k: EvarId) -> Option<&EvarDecl> {
        self.decls.get(&k)
    }

    pub fn value(&self, k: EvarId) -> Option<TermId> {
        self.decls.get(&k).and_then(|d| d.value)
    }

    pub fn is_assigned(&self, k: EvarId) -> bool {
        self.value(k).is_some()
    }

    /// Declared, unassigned and not frozen.
    pub fn is_assignable(&self, k: EvarId) -> bool {
        k.0 >= self.frozen_below && matches!(self.decls.get(&k), Some(d) if d.value.is_none())
    }

    /// Assign a hole. Assignment is monotone: returns `false` and leaves the
    /// map unchanged if the hole is unknown, frozen or already assigned.
    pub fn assign(&mut self, k: EvarId, value: TermId) -> bool {
        if !self.is_assignable(k) {
            return false;
        }
        if let Some(decl) = self.decls.get_mut(&k) {
            decl.value = Some(value);
            self.version += 1;
            return true;
        }
        false
    }

    /// Drop a hole entirely. Only used to prune placeholders nobody refers to.
    pub(crate) fn remove(&mut self, k: EvarId) {
        self.decls.remove(&k);
    }

    /// Mark the current boundary: every hole declared so far is inside the scope.
    pub fn checkpoint(&self) -> Scope {
        Scope(self.next)
    }

    /// Make every hole inside `scope` unassignable.
    pub fn freeze(&mut self, scope: Scope) {
        self.frozen_below = scope.0;
    }

    /// Current freeze watermark.
    pub fn frozen(&self) -> Scope {
        Scope(self.frozen_below)
    }

    /// Record a postponed problem.
    pub fn defer(&mut self, constraint: Constraint) {
        self.pending.push_back(constraint);
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending(&self) -> impl Iterator<Item = &Constraint> {
        self.pending.iter()
    }

    /// Remove and return every postponed problem.
    pub fn take_pending(&mut self) -> Vec<Constraint> {
        std::mem::take(&mut self.pending).into_iter().collect()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EvarId, &EvarDecl)> {
        self.decls.iter().map(|(k, d)| (*k, d))
    }

    /// Holes declared after `scope` was taken.
    pub fn created_since(&self, scope: Scope) -> impl Iterator<Item = (EvarId, &EvarDecl)> {
        self.decls.range(EvarId(scope.0)..).map(|(k, d)| (*k, d))
    }

    /// Replace every assigned hole in `t` by its value, recursively, and
    /// beta-reduce applications whose head became a lambda that way.
    pub fn instantiate(&self, terms: &TermStore, t: TermId) -> TermId {
        if !self.mentions_assigned(terms, t) {
            return t;
        }
        replace(terms, t, 0, &mut |_, node, _| match node {
            Term::Evar(k, args) => {
                let value = self.value(*k)?;
                let args: Args = args.iter().map(|&a| self.instantiate(terms, a)).collect();
                Some(self.instantiate(terms, instantiate_many(terms, value, &args)))
            }
            Term::App(head, args) if matches!(terms.get(*head), Term::Evar(k, _) if self.is_assigned(k)) => {
                let head = self.instantiate(terms, *head);
                let args: Args = args.iter().map(|&a| self.instantiate(terms, a)).collect();
                Some(beta_app(terms, head, &args))
            }
            _ => None,
        })
    }

    fn mentions_assigned(&self, terms: &TermStore, t: TermId) -> bool {
        any_subterm(terms, t, 0, &mut |_, node, _| {
            matches!(node, Term::Evar(k, _) if self.is_assigned(*k))
        })
    }

    /// Holes occurring in `t` that are still unassigned, in visiting order.
    pub fn unassigned_in(&self, terms: &TermStore, t: TermId) -> Vec<EvarId> {
        let t = self.instantiate(terms, t);
        let mut out = Vec::new();
        any_subterm(terms, t, 0, &mut |_, node, _| {
            if let Term::Evar(k, _) = node {
                if !out.contains(k) {
                    out.push(*k);
                }
            }
            false
        });
        out
    }

    /// Rewrite every stored value to its normal form, so that lookups
    /// return values without assigned holes in them.
    pub fn normalize(&mut self, terms: &TermStore) {
        let assigned: Vec<(EvarId, TermId)> = self
            .decls
            .iter()
            .filter_map(|(k, d)| d.value.map(|v| (*k, v)))
            .collect();
        for (k, v) in assigned {
            let nf = self.instantiate(terms, v);
            if nf != v {
                if let Some(decl) = self.decls.get_mut(&k) {
                    decl.value = Some(nf);
                }
            }
        }
        let pending: Vector<Constraint> = self
            .pending
            .iter()
            .map(|c| Constraint {
                lhs: self.instantiate(terms, c.lhs),
                rhs: self.instantiate(terms, c.rhs),
            })
            .collect();
        self.pending = pending;
    }
}

#[cfg(test)]
#[path = "tests/evar.rs"]
mod tests;

//! First-order and higher-order candidate matching.
//!
//! A [`Matcher`] is the [`OccurrenceTest`] of one pass. Until an occurrence
//! is selected, every node whose head passes the keyed filter is tried
//! against each compiled pattern in order, each attempt on its own fork of
//! the base store. The first selected success fixes the instantiation;
//! from then on a node is an occurrence exactly when it is equal to the
//! matched subterm.

use crate::env::Ctx;
use crate::evar::EvarMap;
use crate::finish::Finisher;
use crate::metrics::MatchMetrics;
use crate::occurrence::OccurrenceTest;
use crate::pattern::{CompiledPattern, PatternClass};
use crate::subst::{lift, lower};
use crate::term::{Term, TermId};
use crate::trace::trace;
use crate::unify::Unifier;
use smallvec::{smallvec, SmallVec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Delta-free unification of the first-order form.
    FirstOrder,
    /// Full unification, arity-mismatched flexible heads, canonical heads.
    HigherOrder,
}

/// A successful, finished match attempt.
#[derive(Debug, Clone)]
pub struct Located {
    /// Index of the compiled pattern that matched.
    pub candidate: usize,
    pub evars: EvarMap,
    /// The matched subterm, at the target's top level.
    pub key: TermId,
    /// The instantiated payload.
    pub payload: TermId,
}

pub struct Matcher<'m, 'p> {
    cx: Ctx<'m>,
    unifier: &'m dyn Unifier,
    finisher: &'m Finisher<'m>,
    base: &'m EvarMap,
    candidates: &'m [CompiledPattern<'p>],
    pass: Pass,
    metrics: &'m MatchMetrics,
    /// Last success reported to the selector.
    pending: Option<Located>,
    located: Option<Located>,
}

impl<'m, 'p> Matcher<'m, 'p> {
    pub fn new(
        cx: Ctx<'m>,
        unifier: &'m dyn Unifier,
        finisher: &'m Finisher<'m>,
        base: &'m EvarMap,
        candidates: &'m [CompiledPattern<'p>],
        pass: Pass,
        metrics: &'m MatchMetrics,
    ) -> Self {
        Self {
            cx,
            unifier,
            finisher,
            base,
            candidates,
            pass,
            metrics,
            pending: None,
            located: None,
        }
    }

    /// The match that fixed the instantiation, if any occurrence was selected.
    pub fn into_located(self) -> Option<Located> {
        self.located
    }

    /// Try every candidate at every admissible prefix of `node`.
    fn attempt(&self, node: TermId, depth: u32) -> Option<(usize, Located)> {
        let terms = self.cx.terms;
        let (head, args) = terms.spine(node);
        for (index, pattern) in self.candidates.iter().enumerate() {
            for len in self.key_prefixes(pattern, head, args.len(), depth) {
                self.metrics.record_candidate();
                let sub = if len == args.len() {
                    node
                } else {
                    terms.app_slice(head, &args[..len])
                };
                let Some(sub) = lower(terms, sub, 0, depth) else {
                    trace!(?node, "candidate_mentions_bound_variable");
                    continue;
                };
                if let Some(located) = self.try_candidate(index, pattern, sub) {
                    return Some((len, located));
                }
            }
        }
        None
    }

    fn try_candidate(&self, index: usize, pattern: &CompiledPattern<'_>, sub: TermId) -> Option<Located> {
        let higher_order = self.pass == Pass::HigherOrder;
        self.metrics.record_attempt(higher_order);
        let evars = match self.pass {
            Pass::FirstOrder => {
                let mut evars = self.unifier.unify_fo(self.cx, self.base, pattern.fo_form, sub)?;
                for &(placeholder, hole) in &pattern.placeholders {
                    if let Some(value) = evars.value(placeholder) {
                        if !evars.assign(hole, value) {
                            return None;
                        }
                    }
                }
                self.unifier.unify_ho(self.cx, &evars, pattern.term, sub)?
            }
            Pass::HigherOrder => self.unifier.unify_ho(self.cx, self.base, pattern.term, sub)?,
        };
        let finished = match self.finisher.finish(evars, sub, pattern.payload, pattern.progress) {
            Ok(finished) => finished,
            Err(err) => {
                trace!(?sub, %err, "candidate_not_finished");
                return None;
            }
        };
        self.metrics.record_success(higher_order);
        Some(Located {
            candidate: index,
            evars: finished.evars,
            key: sub,
            payload: finished.payload,
        })
    }

    /// Keyed head filter: the spine lengths of a node with head `head` and
    /// `nargs` arguments at which `pattern` may match. Zero only applies to
    /// nodes that are not applications.
    fn key_prefixes(
        &self,
        pattern: &CompiledPattern<'_>,
        head: TermId,
        nargs: usize,
        depth: u32,
    ) -> SmallVec<[usize; 4]> {
        let terms = self.cx.terms;
        let arity = pattern.arity();
        let fits = |len: usize| if len == 0 { nargs == 0 } else { len <= nargs };
        let single = |ok: bool| -> SmallVec<[usize; 4]> {
            if ok && fits(arity) {
                smallvec![arity]
            } else {
                SmallVec::new()
            }
        };
        let node_head = terms.get(head);
        match pattern.class {
            PatternClass::Fixed => single(lift(terms, pattern.head, 0, depth) == head),
            PatternClass::HoleRef(k) => single(matches!(node_head, Term::Evar(k2, _) if k2 == k)),
            PatternClass::LetHead => single(matches!(node_head, Term::LetIn(_, _, _))),
            PatternClass::Rigid(shape) => single(node_head.shape() == shape),
            PatternClass::Flexible(_) => match self.pass {
                Pass::FirstOrder => single(true),
                Pass::HigherOrder if arity <= nargs => (arity..=nargs).collect(),
                Pass::HigherOrder => SmallVec::new(),
            },
            PatternClass::Projection { proj, nparams } => match node_head {
                Term::Const(c) if c == proj => single(true),
                Term::Const(c) if self.pass == Pass::HigherOrder => {
                    match self.cx.env.lookup_canonical(proj, c) {
                        Some(entry) => {
                            let len = entry.extra + (arity - nparams);
                            if fits(len) {
                                smallvec![len]
                            } else {
                                SmallVec::new()
                            }
                        }
                        None => SmallVec::new(),
                    }
                }
                _ => SmallVec::new(),
            },
        }
    }

    /// After the instantiation is fixed: is `node` (or a prefix of it) the
    /// matched subterm again?
    fn same_instance(&self, located: &Located, node: TermId, depth: u32) -> Option<usize> {
        let terms = self.cx.terms;
        let key = lift(terms, located.key, 0, depth);
        let (key_head, key_args) = terms.spine(key);
        let (head, args) = terms.spine(node);
        if key_args.is_empty() {
            let hit = args.is_empty() && self.unifier.unif_eq(self.cx, &located.evars, key, node);
            return hit.then_some(0);
        }
        if head != key_head || args.len() < key_args.len() {
            return None;
        }
        self.metrics.record_candidate();
        let prefix = terms.app_slice(head, &args[..key_args.len()]);
        self.unifier
            .unif_eq(self.cx, &located.evars, key, prefix)
            .then_some(key_args.len())
    }
}

impl OccurrenceTest for Matcher<'_, '_> {
    fn occurrence_at(&mut self, node: TermId, depth: u32) -> Option<usize> {
        if let Some(located) = &self.located {
            return self.same_instance(located, node, depth);
        }
        let (len, located) = self.attempt(node, depth)?;
        self.pending = Some(located);
        Some(len)
    }

    fn select(&mut self) {
        if self.located.is_none() {
            self.located = self.pending.take();
        }
    }
}

#[cfg(test)]
#[path = "tests/matching.rs"]
mod tests;

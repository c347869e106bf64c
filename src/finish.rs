//! The unification finisher: drives residual constraints and side
//! obligations of a successful match to a fixed point, then applies the
//! caller's progress predicate.

use crate::env::Ctx;
use crate::error::MatchError;
use crate::evar::{EvarKind, EvarMap, Scope};
use crate::metrics::MatchMetrics;
use crate::term::{EvarId, TermId};
use crate::trace::{debug, debug_span};
use crate::unify::Unifier;

/// Caller-supplied check run on a finished match.
pub trait ProgressCheck {
    /// `matched` is the matched subterm and `payload` the instantiated
    /// payload, both normalized under `evars`.
    fn accepts(&self, cx: Ctx<'_>, evars: &EvarMap, matched: TermId, payload: TermId) -> bool;
}

impl<F> ProgressCheck for F
where
    F: Fn(Ctx<'_>, &EvarMap, TermId, TermId) -> bool,
{
    fn accepts(&self, cx: Ctx<'_>, evars: &EvarMap, matched: TermId, payload: TermId) -> bool {
        self(cx, evars, matched, payload)
    }
}

/// Accept every match.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyProgress;

impl ProgressCheck for AnyProgress {
    fn accepts(&self, _: Ctx<'_>, _: &EvarMap, _: TermId, _: TermId) -> bool {
        true
    }
}

/// Reject a rewrite whose two sides are identical once instantiated.
#[derive(Debug, Clone, Copy)]
pub struct MustChange {
    pub from: TermId,
    pub to: TermId,
}

impl ProgressCheck for MustChange {
    fn accepts(&self, cx: Ctx<'_>, evars: &EvarMap, _: TermId, _: TermId) -> bool {
        evars.instantiate(cx.terms, self.from) != evars.instantiate(cx.terms, self.to)
    }
}

/// A finished match.
#[derive(Debug, Clone)]
pub struct Finished {
    pub evars: EvarMap,
    pub matched: TermId,
    pub payload: TermId,
}

pub struct Finisher<'a> {
    pub cx: Ctx<'a>,
    pub unifier: &'a dyn Unifier,
    /// Holes created after this scope belong to the match.
    pub scope: Scope,
    pub metrics: &'a MatchMetrics,
}

impl Finisher<'_> {
    pub fn finish(
        &self,
        evars: EvarMap,
        matched: TermId,
        payload: TermId,
        progress: &dyn ProgressCheck,
    ) -> Result<Finished, MatchError> {
        let _span = debug_span!("finish").entered();
        let mut evars = evars;
        for _ in 0..self.cx.config.retry_budget {
            self.metrics.record_finisher_round();
            let before = evars.version();
            evars = self
                .unifier
                .simplify_constraints(self.cx, &evars)
                .ok_or(MatchError::NoMatch)?;
            evars = self
                .unifier
                .resolve_obligations(self.cx, &evars)
                .ok_or(MatchError::NoMatch)?;
            evars = self.retype(&evars).ok_or(MatchError::NoMatch)?;
            if evars.version() != before {
                continue;
            }
            if evars.has_pending() {
                debug!("finish_stuck");
                return Err(MatchError::NoMatch);
            }
            return self.conclude(evars, matched, payload, progress);
        }
        debug!(budget = self.cx.config.retry_budget, "finish_budget_exhausted");
        Err(MatchError::NoMatch)
    }

    /// Re-check the type of every assigned hole of the match against its
    /// declared type, unifying the two when they are not convertible.
    fn retype(&self, evars: &EvarMap) -> Option<EvarMap> {
        let typed: Vec<(TermId, TermId)> = evars
            .created_since(self.scope)
            .filter(|(_, d)| d.arity == 0 && d.kind != EvarKind::Placeholder)
            .filter_map(|(_, d)| Some((d.value?, d.ty?)))
            .collect();
        let mut evars = evars.clone();
        for (value, ty) in typed {
            match self.unifier.infer_type(self.cx, &evars, value) {
                Ok(Some(found)) if !self.unifier.conv(self.cx, &evars, found, ty) => {
                    evars = self.unifier.unify_ho(self.cx, &evars, found, ty)?;
                }
                Ok(_) => {}
                Err(_) => return None,
            }
        }
        Some(evars)
    }

    fn conclude(
        &self,
        mut evars: EvarMap,
        matched: TermId,
        payload: TermId,
        progress: &dyn ProgressCheck,
    ) -> Result<Finished, MatchError> {
        let placeholders: Vec<EvarId> = evars
            .created_since(self.scope)
            .filter(|(_, d)| d.kind == EvarKind::Placeholder)
            .map(|(k, _)| k)
            .collect();
        for k in placeholders {
            evars.remove(k);
        }
        evars.normalize(self.cx.terms);
        let matched = evars.instantiate(self.cx.terms, matched);
        let payload = evars.instantiate(self.cx.terms, payload);
        if !progress.accepts(self.cx, &evars, matched, payload) {
            self.metrics.record_progress_rejection();
            debug!("progress_rejected");
            return Err(MatchError::NoMatch);
        }
        Ok(Finished {
            evars,
            matched,
            payload,
        })
    }
}

#[cfg(test)]
#[path = "tests/finish.rs"]
mod tests;

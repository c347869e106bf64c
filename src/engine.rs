//! Entry points of the matching engine.
//!
//! A call compiles its patterns, runs the first-order pass over the whole
//! target and, if that locates nothing, the higher-order pass. The first
//! pass that selects an occurrence wins; its store replaces the caller's.

use crate::env::Ctx;
use crate::error::MatchError;
use crate::evar::{EvarMap, Scope};
use crate::finish::{AnyProgress, Finisher, MustChange, ProgressCheck};
use crate::matching::{Located, Matcher, Pass};
use crate::metrics::{MatchMetrics, MetricsReport};
use crate::occurrence::{select_and_abstract, Abstraction, OccSpec};
use crate::pattern::{compile, CompiledPattern};
use crate::subst::{max_free_rel, MAX_FREE_REL};
use crate::term::TermId;
use crate::trace::{debug, debug_span, info_span};
use crate::unify::{StandardUnifier, Unifier};

static STANDARD: StandardUnifier = StandardUnifier;

/// Result of [`Engine::fill_occurrence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filled {
    /// Target with the selected occurrences abstracted: the body of one binder.
    pub context: TermId,
    pub matched: TermId,
    /// The pattern, instantiated.
    pub equation: TermId,
    /// Number of occurrences abstracted.
    pub occurrences: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    LeftToRight,
    RightToLeft,
}

/// An equation `lhs = rhs`, optionally with its proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteRule {
    pub lhs: TermId,
    pub rhs: TermId,
    pub proof: Option<TermId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleCandidate {
    pub rule: RewriteRule,
    pub direction: Direction,
}

impl RuleCandidate {
    /// The side that is matched and the side it is replaced by.
    fn sides(&self) -> (TermId, TermId) {
        match self.direction {
            Direction::LeftToRight => (self.rule.lhs, self.rule.rhs),
            Direction::RightToLeft => (self.rule.rhs, self.rule.lhs),
        }
    }
}

/// Result of [`Engine::match_any_rule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rewrite {
    pub direction: Direction,
    /// Index of the winning candidate.
    pub rule: usize,
    pub context: TermId,
    pub matched: TermId,
    /// The rule's proof (or matched side when it has none), instantiated.
    pub equation: TermId,
    /// The other side of the rule, instantiated.
    pub replacement: TermId,
}

struct PatternSpec<'p> {
    pattern: TermId,
    payload: TermId,
    progress: &'p dyn ProgressCheck,
}

struct Outcome {
    located: Located,
    abstraction: Abstraction,
}

pub struct Engine<'a> {
    cx: Ctx<'a>,
    unifier: &'a dyn Unifier,
    metrics: MatchMetrics,
}

impl<'a> Engine<'a> {
    /// An engine using [`StandardUnifier`].
    pub fn new(cx: Ctx<'a>) -> Self {
        Self::with_unifier(cx, &STANDARD)
    }

    pub fn with_unifier(cx: Ctx<'a>, unifier: &'a dyn Unifier) -> Self {
        Self {
            cx,
            unifier,
            metrics: MatchMetrics::new(),
        }
    }

    pub fn metrics(&self) -> MetricsReport {
        self.metrics.report()
    }

    /// Find the occurrences of `pattern` in `target` selected by `occ` and
    /// abstract them.
    ///
    /// Holes of `evars` declared before `scope` belong to the caller and are
    /// not assigned; later ones (the pattern's) are. On success `evars` is
    /// replaced by the winning store; on failure it is untouched.
    pub fn fill_occurrence(
        &self,
        evars: &mut EvarMap,
        scope: Scope,
        pattern: TermId,
        occ: &OccSpec,
        target: TermId,
        progress: &dyn ProgressCheck,
    ) -> Result<Filled, MatchError> {
        let _span = info_span!("fill_occurrence").entered();
        let specs = [PatternSpec {
            pattern,
            payload: pattern,
            progress,
        }];
        let outcome = self.run(evars, scope, &specs, occ, target)?;
        Ok(Filled {
            context: outcome.abstraction.context,
            matched: outcome.located.key,
            equation: outcome.located.payload,
            occurrences: outcome.abstraction.selected,
        })
    }

    /// [`fill_occurrence`](Self::fill_occurrence) with no progress requirement.
    pub fn fill_any(
        &self,
        evars: &mut EvarMap,
        scope: Scope,
        pattern: TermId,
        occ: &OccSpec,
        target: TermId,
    ) -> Result<Filled, MatchError> {
        self.fill_occurrence(evars, scope, pattern, occ, target, &AnyProgress)
    }

    /// Rewrite with the first rule (in list order, first-order pass before
    /// higher-order pass) that matches and makes progress.
    pub fn match_any_rule(
        &self,
        evars: &mut EvarMap,
        scope: Scope,
        candidates: &[RuleCandidate],
        occ: &OccSpec,
        target: TermId,
    ) -> Result<Rewrite, MatchError> {
        let _span = info_span!("match_any_rule", rules = candidates.len()).entered();
        let checks: Vec<MustChange> = candidates
            .iter()
            .map(|c| {
                let (from, to) = c.sides();
                MustChange { from, to }
            })
            .collect();
        let specs: Vec<PatternSpec<'_>> = candidates
            .iter()
            .zip(&checks)
            .map(|(c, check)| {
                let (from, _) = c.sides();
                PatternSpec {
                    pattern: from,
                    payload: c.rule.proof.unwrap_or(from),
                    progress: check,
                }
            })
            .collect();
        self.check_free_rels(candidates.iter().flat_map(|c| [c.rule.lhs, c.rule.rhs]))?;
        let outcome = self.run(evars, scope, &specs, occ, target)?;
        let winner = &candidates[outcome.located.candidate];
        let (_, to) = winner.sides();
        Ok(Rewrite {
            direction: winner.direction,
            rule: outcome.located.candidate,
            context: outcome.abstraction.context,
            matched: outcome.located.key,
            equation: outcome.located.payload,
            replacement: evars.instantiate(self.cx.terms, to),
        })
    }

    fn run(
        &self,
        evars: &mut EvarMap,
        scope: Scope,
        specs: &[PatternSpec<'_>],
        occ: &OccSpec,
        target: TermId,
    ) -> Result<Outcome, MatchError> {
        let terms = self.cx.terms;
        let inputs = specs.iter().flat_map(|s| [s.pattern, s.payload]);
        self.check_free_rels(std::iter::once(target).chain(inputs))?;
        let caller_frozen = evars.frozen();
        let mut base = evars.clone();
        base.freeze(scope.max(caller_frozen));
        let target = base.instantiate(terms, target);

        let compiled: Vec<CompiledPattern<'_>> = specs
            .iter()
            .map(|s| compile(self.cx, &mut base, scope, s.pattern, s.payload, s.progress))
            .collect::<Result<_, _>>()?;

        let finisher = Finisher {
            cx: self.cx,
            unifier: self.unifier,
            scope,
            metrics: &self.metrics,
        };
        let mut passes = vec![Pass::FirstOrder];
        if self.cx.config.higher_order_fallback {
            passes.push(Pass::HigherOrder);
        }

        let mut found = 0;
        for pass in passes {
            let _span = debug_span!("match_pass", ?pass).entered();
            let mut matcher = Matcher::new(
                self.cx,
                self.unifier,
                &finisher,
                &base,
                &compiled,
                pass,
                &self.metrics,
            );
            let abstraction = select_and_abstract(terms, target, occ, &mut matcher, &self.metrics);
            let Some(located) = matcher.into_located() else {
                debug!(?pass, found = abstraction.found, "pass_found_nothing");
                found = found.max(abstraction.found);
                continue;
            };
            occ.check_found(abstraction.found)?;
            self.check_dependent(&located, abstraction.context)?;
            let mut committed = located.evars.clone();
            committed.freeze(caller_frozen);
            *evars = committed;
            return Ok(Outcome {
                located,
                abstraction,
            });
        }
        occ.check_found(found)?;
        Err(MatchError::NoMatch)
    }

    /// Free variables beyond [`MAX_FREE_REL`] cannot be lifted under the
    /// abstraction binder.
    fn check_free_rels(&self, ts: impl IntoIterator<Item = TermId>) -> Result<(), MatchError> {
        for t in ts {
            match max_free_rel(self.cx.terms, t) {
                Some(i) if i > MAX_FREE_REL => return Err(MatchError::FreeRelTooLarge(i)),
                _ => {}
            }
        }
        Ok(())
    }

    /// The abstracted context must type-check with the bound variable at the
    /// matched subterm's type.
    fn check_dependent(&self, located: &Located, context: TermId) -> Result<(), MatchError> {
        if !self.cx.config.check_dependent {
            return Ok(());
        }
        let evars = &located.evars;
        let Ok(Some(ty)) = self.unifier.infer_type(self.cx, evars, located.key) else {
            return Ok(());
        };
        let abstraction = self.cx.terms.lambda(ty, context);
        self.unifier
            .infer_type(self.cx, evars, abstraction)
            .map(|_| ())
            .map_err(|err| MatchError::dependent(context, err.to_string()))
    }
}

#[cfg(test)]
#[path = "tests/engine.rs"]
mod tests;

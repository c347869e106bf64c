use crate::config::MatchConfig;
use crate::engine::{Direction, Engine, Filled, Rewrite, RewriteRule, RuleCandidate};
use crate::env::{Ctx, Env};
use crate::error::MatchResult;
use crate::evar::EvarMap;
use crate::occurrence::OccSpec;
use crate::parser::TermReader;
use crate::symbol::SymbolStore;
use crate::term::{format_term, EvarId, TermId, TermStore};

/// Stores, environment and reader shared by the unit tests.
pub(crate) struct Fixture {
    pub terms: TermStore,
    pub symbols: SymbolStore,
    pub env: Env,
    pub config: MatchConfig,
    pub evars: EvarMap,
    pub reader: TermReader,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            terms: TermStore::new(),
            symbols: SymbolStore::new(),
            env: Env::new(),
            config: MatchConfig::default(),
            evars: EvarMap::new(),
            reader: TermReader::new(),
        }
    }

    pub fn cx(&self) -> Ctx<'_> {
        Ctx::new(&self.terms, &self.env, &self.config)
    }

    pub fn parse(&mut self, src: &str) -> TermId {
        self.reader
            .read(src, &self.terms, &self.symbols, &mut self.evars)
            .unwrap_or_else(|e| panic!("failed to parse {:?}: {}", src, e))
    }

    pub fn c(&self, name: &str) -> TermId {
        self.terms.constant(self.symbols.intern(name))
    }

    pub fn hole(&self, name: &str) -> EvarId {
        self.reader
            .hole(name)
            .unwrap_or_else(|| panic!("no hole named ?{}", name))
    }

    pub fn axiom(&mut self, name: &str, ty: &str) {
        let ty = self.parse(ty);
        self.env.declare(self.symbols.intern(name), ty);
    }

    pub fn define(&mut self, name: &str, body: &str) {
        let body = self.parse(body);
        self.env.define(self.symbols.intern(name), body, None);
    }

    pub fn show(&self, t: TermId) -> String {
        format_term(t, &self.terms, &self.symbols, &[])
    }

    /// Render a context, naming the abstracted variable `X`.
    pub fn show_context(&self, t: TermId) -> String {
        format_term(t, &self.terms, &self.symbols, &["X".to_string()])
    }

    /// Read `target`, then `pattern` as the match's own holes, and run
    /// `fill_any`.
    pub fn fill(&mut self, pattern: &str, occ: &OccSpec, target: &str) -> MatchResult<Filled> {
        let target = self.parse(target);
        let scope = self.evars.checkpoint();
        let pattern = self.parse(pattern);
        let cx = Ctx::new(&self.terms, &self.env, &self.config);
        Engine::new(cx).fill_any(&mut self.evars, scope, pattern, occ, target)
    }

    /// Read `target`, then each `(lhs, rhs, direction)` rule, and run
    /// `match_any_rule`.
    pub fn rewrite(
        &mut self,
        rules: &[(&str, &str, Direction)],
        occ: &OccSpec,
        target: &str,
    ) -> MatchResult<Rewrite> {
        let target = self.parse(target);
        let scope = self.evars.checkpoint();
        let candidates: Vec<RuleCandidate> = rules
            .iter()
            .map(|&(lhs, rhs, direction)| {
                self.reader.forget_holes();
                RuleCandidate {
                    rule: RewriteRule {
                        lhs: self.parse(lhs),
                        rhs: self.parse(rhs),
                        proof: None,
                    },
                    direction,
                }
            })
            .collect();
        let cx = Ctx::new(&self.terms, &self.env, &self.config);
        Engine::new(cx).match_any_rule(&mut self.evars, scope, &candidates, occ, target)
    }
}

/// Environment for the canonical-structure scenarios:
///
/// - `op : forall (T Type) (m (monoid T)) (x T) (y T), T` is a projection
///   with two parameters
/// - `natadd : nat -> nat -> nat` is canonical for `op` with instance
///   `natMonoid` and no extra arguments
pub(crate) fn monoid_fixture() -> Fixture {
    let mut fx = Fixture::new();
    fx.axiom("nat", "Type");
    fx.axiom("monoid", "(forall (T Type) Type)");
    fx.axiom("natMonoid", "(monoid nat)");
    fx.axiom("op", "(forall (T Type) (m (monoid T)) (x T) (y T) T)");
    fx.axiom("natadd", "(forall (x nat) (y nat) nat)");
    fx.axiom("plus", "(forall (x nat) (y nat) nat)");
    fx.axiom("a", "nat");
    fx.axiom("b", "nat");
    fx.axiom("c", "nat");
    let op = fx.symbols.intern("op");
    let natadd = fx.symbols.intern("natadd");
    let instance = fx.c("natMonoid");
    fx.env.register_projection(op, 2);
    fx.env.register_canonical(op, natadd, instance, 0);
    fx
}

use super::*;
use crate::error::MatchError;
use crate::subst::instantiate;
use crate::test_utils::{monoid_fixture, Fixture};

fn dependent_fixture() -> Fixture {
    let mut fx = Fixture::new();
    fx.axiom("A", "Type");
    fx.axiom("a", "A");
    fx.axiom("eq", "(forall (x A) (y A) Prop)");
    fx.axiom("refl", "(forall (x A) (eq x x))");
    fx.axiom("P", "(forall (x A) (h (eq x x)) Prop)");
    fx
}

// ========== FILL_OCCURRENCE TESTS ==========

#[test]
fn selects_requested_occurrence() {
    let mut fx = Fixture::new();
    let occ = OccSpec::only([2]).expect("valid");
    let filled = fx.fill("(f a _)", &occ, "(plus (f a b) (f a c))").expect("match");
    assert_eq!(fx.show_context(filled.context), "(plus (f a b) X)");
    assert_eq!(fx.show(filled.matched), "(f a c)");
    assert_eq!(fx.show(filled.equation), "(f a c)");
    assert_eq!(filled.occurrences, 1);
}

#[test]
fn default_selects_the_first_and_its_copies() {
    let mut fx = Fixture::new();
    let filled = fx
        .fill("(f a _)", &OccSpec::all(), "(plus (f a b) (g (f a b)) (f a c))")
        .expect("match");
    assert_eq!(fx.show_context(filled.context), "(plus X (g X) (f a c))");
    assert_eq!(filled.occurrences, 2);
}

#[test]
fn requesting_too_many_occurrences_reports_the_count() {
    let mut fx = Fixture::new();
    let occ = OccSpec::only([5]).expect("valid");
    let err = fx.fill("(f a _)", &occ, "(plus (f a b) (f a c))").unwrap_err();
    assert_eq!(err, MatchError::MissingOccs { found: 2, requested: 5 });
}

#[test]
fn no_occurrence_at_all() {
    let mut fx = Fixture::new();
    let occ = OccSpec::only([1]).expect("valid");
    let err = fx.fill("(f _)", &occ, "(g a b)").unwrap_err();
    assert_eq!(err, MatchError::missing(0, 1));
    let err = fx.fill("(f _)", &OccSpec::all(), "(g a b)").unwrap_err();
    assert_eq!(err, MatchError::NoMatch);
}

#[test]
fn argument_free_hole_pattern_is_indeterminate() {
    let mut fx = Fixture::new();
    let err = fx.fill("?h", &OccSpec::all(), "(g a b)").unwrap_err();
    assert_eq!(err, MatchError::UndefPat);
}

#[test]
fn success_commits_the_winning_store() {
    let mut fx = Fixture::new();
    let frozen = fx.evars.frozen();
    fx.fill("(f ?x)", &OccSpec::all(), "(g (f a))").expect("match");
    let x = fx.hole("x");
    assert_eq!(fx.evars.value(x), Some(fx.c("a")));
    assert_eq!(fx.evars.frozen(), frozen);
    assert!(fx
        .evars
        .iter()
        .all(|(_, d)| d.kind != crate::evar::EvarKind::Placeholder));
}

#[test]
fn failure_leaves_the_store_untouched() {
    let mut fx = Fixture::new();
    let target = fx.parse("(g (f ?k a))");
    let scope = fx.evars.checkpoint();
    let pattern = fx.parse("(f b ?x)");
    let version = fx.evars.version();
    let len = fx.evars.len();
    let cx = Ctx::new(&fx.terms, &fx.env, &fx.config);
    let err = Engine::new(cx)
        .fill_any(&mut fx.evars, scope, pattern, &OccSpec::all(), target)
        .unwrap_err();
    assert_eq!(err, MatchError::NoMatch);
    assert_eq!(fx.evars.version(), version);
    assert_eq!(fx.evars.len(), len);
    assert!(!fx.evars.is_assigned(fx.hole("k")));
    assert!(!fx.evars.is_assigned(fx.hole("x")));
}

#[test]
fn caller_holes_are_matched_as_constants() {
    let mut fx = Fixture::new();
    fx.parse("?k");
    let filled = fx.fill("(f ?k _)", &OccSpec::all(), "(g (f ?k a))").expect("match");
    assert!(!fx.evars.is_assigned(fx.hole("k")));
    assert_eq!(fx.show_context(filled.context), "(g X)");
}

#[test]
fn context_round_trips_to_the_target() {
    let mut fx = Fixture::new();
    let target = fx.parse("(plus (f a b) (fun (y A) (f a b)) #0)");
    let target_src = fx.show(target);
    let filled = fx.fill("(f a _)", &OccSpec::all(), &target_src).expect("match");
    assert_eq!(instantiate(&fx.terms, filled.context, filled.matched), target);
}

#[test]
fn dependent_position_cannot_be_abstracted_alone() {
    let mut fx = dependent_fixture();
    let occ = OccSpec::only([1]).expect("valid");
    let err = fx.fill("a", &occ, "(P a (refl a))").unwrap_err();
    assert!(matches!(err, MatchError::Dependent { .. }), "got {:?}", err);
    assert!(err.to_string().starts_with("dependent type error"));

    let filled = fx.fill("a", &OccSpec::all(), "(P a (refl a))").expect("all occurrences");
    assert_eq!(fx.show_context(filled.context), "(P X (refl X))");
}

#[test]
fn dependent_check_can_be_disabled() {
    let mut fx = dependent_fixture();
    fx.config.check_dependent = false;
    let occ = OccSpec::only([1]).expect("valid");
    let filled = fx.fill("a", &occ, "(P a (refl a))").expect("unchecked");
    assert_eq!(fx.show_context(filled.context), "(P X (refl a))");
}

#[test]
fn first_order_match_wins_over_higher_order() {
    let mut fx = monoid_fixture();
    let filled = fx
        .fill(
            "(op nat natMonoid a ?y)",
            &OccSpec::all(),
            "(plus (natadd a b) (op nat natMonoid a c))",
        )
        .expect("match");
    assert_eq!(fx.show(filled.matched), "(op nat natMonoid a c)");
    assert_eq!(fx.show_context(filled.context), "(plus (natadd a b) X)");
}

#[test]
fn higher_order_pass_is_the_fallback() {
    let mut fx = monoid_fixture();
    let filled = fx
        .fill("(op nat natMonoid a ?y)", &OccSpec::all(), "(plus (natadd a b) c)")
        .expect("canonical match");
    assert_eq!(fx.show(filled.matched), "(natadd a b)");
    assert_eq!(fx.show(filled.equation), "(op nat natMonoid a b)");

    fx.config.higher_order_fallback = false;
    let err = fx
        .fill("(op nat natMonoid a ?z)", &OccSpec::all(), "(plus (natadd a b) c)")
        .unwrap_err();
    assert_eq!(err, MatchError::NoMatch);
}

#[test]
fn repeated_calls_are_deterministic() {
    let run = || {
        let mut fx = Fixture::new();
        let occ = OccSpec::only([2]).expect("valid");
        let filled = fx.fill("(f _ _)", &occ, "(g (f a b) (f b a) (f a b))").expect("match");
        (fx.show_context(filled.context), fx.show(filled.matched))
    };
    assert_eq!(run(), run());
}

#[test]
fn metrics_are_reported() {
    let mut fx = Fixture::new();
    let target = fx.parse("(g (f a))");
    let scope = fx.evars.checkpoint();
    let pattern = fx.parse("(f _)");
    let cx = Ctx::new(&fx.terms, &fx.env, &fx.config);
    let engine = Engine::new(cx);
    engine
        .fill_any(&mut fx.evars, scope, pattern, &OccSpec::all(), target)
        .expect("match");
    let report = engine.metrics();
    if cfg!(feature = "tracing") {
        assert_eq!(report.occurrences_abstracted, 1);
        assert!(report.fo_successes >= 1);
    } else {
        assert_eq!(report.candidates, 0);
    }
}

// ========== MATCH_ANY_RULE TESTS ==========

#[test]
fn rewrites_left_to_right() {
    let mut fx = Fixture::new();
    let rewrite = fx
        .rewrite(
            &[("(plus ?x zero)", "?x", Direction::LeftToRight)],
            &OccSpec::all(),
            "(f (plus a zero))",
        )
        .expect("rewrite");
    assert_eq!(rewrite.rule, 0);
    assert_eq!(rewrite.direction, Direction::LeftToRight);
    assert_eq!(fx.show(rewrite.matched), "(plus a zero)");
    assert_eq!(fx.show(rewrite.replacement), "a");
    assert_eq!(fx.show_context(rewrite.context), "(f X)");
    // Without a proof the equation is the matched side
    assert_eq!(fx.show(rewrite.equation), "(plus a zero)");
}

#[test]
fn rewrites_right_to_left() {
    let mut fx = Fixture::new();
    let rewrite = fx
        .rewrite(
            &[("?x", "(plus ?x zero)", Direction::RightToLeft)],
            &OccSpec::all(),
            "(f (plus a zero))",
        )
        .expect("rewrite");
    assert_eq!(rewrite.direction, Direction::RightToLeft);
    assert_eq!(fx.show(rewrite.replacement), "a");
}

#[test]
fn later_rule_applies_when_earlier_ones_do_not_match() {
    let mut fx = Fixture::new();
    let rewrite = fx
        .rewrite(
            &[
                ("(mult ?x one)", "?x", Direction::LeftToRight),
                ("(plus ?x zero)", "?x", Direction::LeftToRight),
            ],
            &OccSpec::all(),
            "(f (plus a zero))",
        )
        .expect("rewrite");
    assert_eq!(rewrite.rule, 1);
}

#[test]
fn earlier_rule_wins_at_the_same_node() {
    let mut fx = Fixture::new();
    let rewrite = fx
        .rewrite(
            &[
                ("(plus ?x ?y)", "(plus ?y ?x)", Direction::LeftToRight),
                ("(plus ?x zero)", "?x", Direction::LeftToRight),
            ],
            &OccSpec::all(),
            "(plus a zero)",
        )
        .expect("rewrite");
    assert_eq!(rewrite.rule, 0);
    assert_eq!(fx.show(rewrite.replacement), "(plus zero a)");
}

#[test]
fn rewrite_without_progress_is_rejected() {
    let mut fx = Fixture::new();
    let err = fx
        .rewrite(
            &[("(plus ?x ?y)", "(plus ?y ?x)", Direction::LeftToRight)],
            &OccSpec::all(),
            "(f (plus a a))",
        )
        .unwrap_err();
    assert_eq!(err, MatchError::NoMatch);
}

#[test]
fn rewrite_skips_nodes_without_progress() {
    let mut fx = Fixture::new();
    let rewrite = fx
        .rewrite(
            &[("(plus ?x ?y)", "(plus ?y ?x)", Direction::LeftToRight)],
            &OccSpec::all(),
            "(f (plus a a) (plus a b))",
        )
        .expect("rewrite");
    assert_eq!(fx.show(rewrite.matched), "(plus a b)");
    assert_eq!(fx.show(rewrite.replacement), "(plus b a)");
    assert_eq!(fx.show_context(rewrite.context), "(f (plus a a) X)");
}

#[test]
fn rewrite_uses_the_proof_as_equation() {
    let mut fx = Fixture::new();
    let target = fx.parse("(f (plus a zero))");
    let scope = fx.evars.checkpoint();
    let lhs = fx.parse("(plus ?x zero)");
    let rhs = fx.parse("?x");
    let proof = fx.parse("(plus_zero ?x)");
    let candidates = [RuleCandidate {
        rule: RewriteRule {
            lhs,
            rhs,
            proof: Some(proof),
        },
        direction: Direction::LeftToRight,
    }];
    let cx = Ctx::new(&fx.terms, &fx.env, &fx.config);
    let rewrite = Engine::new(cx)
        .match_any_rule(&mut fx.evars, scope, &candidates, &OccSpec::all(), target)
        .expect("rewrite");
    assert_eq!(fx.show(rewrite.equation), "(plus_zero a)");
}

#[test]
fn progress_rejection_is_reported_in_every_build() {
    let mut fx = Fixture::new();
    let target = fx.parse("(g (f a))");
    let scope = fx.evars.checkpoint();
    let lhs = fx.parse("(f a)");
    let candidates = [RuleCandidate {
        rule: RewriteRule {
            lhs,
            rhs: lhs,
            proof: None,
        },
        direction: Direction::LeftToRight,
    }];
    let cx = Ctx::new(&fx.terms, &fx.env, &fx.config);
    let engine = Engine::new(cx);
    let err = engine
        .match_any_rule(&mut fx.evars, scope, &candidates, &OccSpec::all(), target)
        .unwrap_err();
    assert_eq!(err, MatchError::NoMatch);
    let report = engine.metrics();
    assert!(report.rejected_for_progress());
    assert!(report.progress_rejections >= 1);
}

#[test]
fn plain_mismatch_is_not_a_progress_rejection() {
    let mut fx = Fixture::new();
    let target = fx.parse("(g (f a))");
    let scope = fx.evars.checkpoint();
    let pattern = fx.parse("(h _)");
    let cx = Ctx::new(&fx.terms, &fx.env, &fx.config);
    let engine = Engine::new(cx);
    let err = engine
        .fill_any(&mut fx.evars, scope, pattern, &OccSpec::all(), target)
        .unwrap_err();
    assert_eq!(err, MatchError::NoMatch);
    assert!(!engine.metrics().rejected_for_progress());
}

#[test]
fn oversized_free_variable_is_an_error() {
    let mut fx = Fixture::new();
    let (g, a) = (fx.c("g"), fx.c("a"));
    let target = fx.terms.app_slice(g, &[a, fx.terms.rel(u32::MAX)]);
    let scope = fx.evars.checkpoint();
    let cx = Ctx::new(&fx.terms, &fx.env, &fx.config);
    let err = Engine::new(cx)
        .fill_any(&mut fx.evars, scope, a, &OccSpec::all(), target)
        .unwrap_err();
    assert_eq!(err, MatchError::FreeRelTooLarge(u32::MAX));

    let filled = fx
        .fill("a", &OccSpec::all(), "(g a #2147483647)")
        .expect("largest accepted index");
    assert_eq!(fx.show_context(filled.context), "(g X #2147483647)");
}

#[test]
fn oversized_rule_side_is_an_error() {
    let mut fx = Fixture::new();
    let target = fx.parse("(g (f a))");
    let scope = fx.evars.checkpoint();
    let lhs = fx.parse("(f a)");
    let rhs = fx.terms.rel(u32::MAX);
    let candidates = [RuleCandidate {
        rule: RewriteRule {
            lhs,
            rhs,
            proof: None,
        },
        direction: Direction::LeftToRight,
    }];
    let cx = Ctx::new(&fx.terms, &fx.env, &fx.config);
    let err = Engine::new(cx)
        .match_any_rule(&mut fx.evars, scope, &candidates, &OccSpec::all(), target)
        .unwrap_err();
    assert_eq!(err, MatchError::FreeRelTooLarge(u32::MAX));
}

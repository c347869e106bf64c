use super::*;
use crate::finish::AnyProgress;
use crate::test_utils::{monoid_fixture, Fixture};

fn compile_src<'p>(fx: &mut Fixture, known: Scope, src: &str) -> Result<CompiledPattern<'p>, MatchError> {
    let t = fx.parse(src);
    let cx = Ctx::new(&fx.terms, &fx.env, &fx.config);
    compile(cx, &mut fx.evars, known, t, t, &AnyProgress)
}

#[test]
fn constant_head_is_fixed() {
    let mut fx = Fixture::new();
    let scope = fx.evars.checkpoint();
    let p = compile_src(&mut fx, scope, "(f a _)").expect("compiles");
    assert_eq!(p.class, PatternClass::Fixed);
    assert_eq!(p.head, fx.c("f"));
    assert_eq!(p.arity(), 2);
}

#[test]
fn pattern_is_put_in_weak_head_form() {
    let mut fx = Fixture::new();
    let scope = fx.evars.checkpoint();
    let p = compile_src(&mut fx, scope, "((fun (x A) (g x x)) a)").expect("compiles");
    assert_eq!(fx.show(p.term), "(g a a)");
    assert_eq!(p.class, PatternClass::Fixed);
}

#[test]
fn definitions_are_not_unfolded() {
    let mut fx = Fixture::new();
    fx.define("double", "(fun (n nat) (plus n n))");
    let scope = fx.evars.checkpoint();
    let p = compile_src(&mut fx, scope, "(double ?n)").expect("compiles");
    assert_eq!(p.head, fx.c("double"));
}

#[test]
fn new_hole_without_arguments_is_indeterminate() {
    let mut fx = Fixture::new();
    let scope = fx.evars.checkpoint();
    assert_eq!(compile_src(&mut fx, scope, "?h").unwrap_err(), MatchError::UndefPat);
}

#[test]
fn new_hole_with_arguments_is_flexible() {
    let mut fx = Fixture::new();
    let scope = fx.evars.checkpoint();
    let p = compile_src(&mut fx, scope, "(?F a)").expect("compiles");
    assert_eq!(p.class, PatternClass::Flexible(fx.hole("F")));
}

#[test]
fn known_hole_head_is_a_reference() {
    let mut fx = Fixture::new();
    fx.parse("?k");
    let k = fx.hole("k");
    let scope = fx.evars.checkpoint();
    let p = compile_src(&mut fx, scope, "?k").expect("known head is fine");
    assert_eq!(p.class, PatternClass::HoleRef(k));
    // The known hole is not replaced in the first-order form
    assert!(p.placeholders.is_empty());
    assert_eq!(p.fo_form, p.term);
}

#[test]
fn assigned_known_hole_is_resolved() {
    let mut fx = Fixture::new();
    let value = fx.parse("(g b)");
    fx.parse("?k");
    let k = fx.hole("k");
    fx.evars.assign(k, value);
    let scope = fx.evars.checkpoint();
    let p = compile_src(&mut fx, scope, "?k").expect("compiles");
    assert_eq!(p.class, PatternClass::Fixed);
    assert_eq!(p.term, value);
}

#[test]
fn binder_heads_are_rigid() {
    let mut fx = Fixture::new();
    let scope = fx.evars.checkpoint();
    let p = compile_src(&mut fx, scope, "(forall (x A) _)").expect("compiles");
    assert_eq!(p.class, PatternClass::Rigid(Shape::Pi));
    let q = compile_src(&mut fx, scope, "(let (x A a) x)").expect("compiles");
    assert_eq!(q.class, PatternClass::LetHead);
}

#[test]
fn projection_splits_parameters() {
    let mut fx = monoid_fixture();
    let scope = fx.evars.checkpoint();
    let p = compile_src(&mut fx, scope, "(op nat natMonoid a ?y)").expect("compiles");
    let op = fx.symbols.intern("op");
    assert_eq!(p.class, PatternClass::Projection { proj: op, nparams: 2 });
    assert_eq!(p.params().len(), 2);
    assert_eq!(p.own_args().len(), 2);
    assert_eq!(p.own_args()[0], fx.c("a"));
}

#[test]
fn under_applied_projection_is_fixed() {
    let mut fx = monoid_fixture();
    let scope = fx.evars.checkpoint();
    let p = compile_src(&mut fx, scope, "(op nat)").expect("compiles");
    assert_eq!(p.class, PatternClass::Fixed);
    assert!(p.params().is_empty());
}

#[test]
fn first_order_form_uses_one_placeholder_per_hole() {
    let mut fx = Fixture::new();
    let scope = fx.evars.checkpoint();
    let p = compile_src(&mut fx, scope, "(pair ?x (g ?x) ?y)").expect("compiles");
    assert_eq!(p.placeholders.len(), 2);
    let holes: Vec<EvarId> = p.placeholders.iter().map(|&(_, h)| h).collect();
    assert_eq!(holes, vec![fx.hole("x"), fx.hole("y")]);
    for &(placeholder, _) in &p.placeholders {
        assert_eq!(
            fx.evars.decl(placeholder).map(|d| d.kind),
            Some(EvarKind::Placeholder)
        );
    }
    let (_, args) = fx.terms.spine(p.fo_form);
    assert_eq!(fx.terms.head_evar(args[0]), Some(p.placeholders[0].0));
}

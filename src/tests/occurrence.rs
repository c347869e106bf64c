use super::*;
use crate::subst::{instantiate, lift};
use crate::test_utils::Fixture;

/// Occurrences are the nodes syntactically equal to `key`.
struct Syntactic<'a> {
    terms: &'a TermStore,
    key: TermId,
    selected: usize,
}

impl OccurrenceTest for Syntactic<'_> {
    fn occurrence_at(&mut self, node: TermId, depth: u32) -> Option<usize> {
        (lift(self.terms, self.key, 0, depth) == node).then(|| self.terms.spine(node).1.len())
    }

    fn select(&mut self) {
        self.selected += 1;
    }
}

fn abstract_with(fx: &Fixture, key: TermId, target: TermId, occ: &OccSpec) -> (Abstraction, usize) {
    let metrics = MatchMetrics::new();
    let mut test = Syntactic {
        terms: &fx.terms,
        key,
        selected: 0,
    };
    let result = select_and_abstract(&fx.terms, target, occ, &mut test, &metrics);
    (result, test.selected)
}

// ========== OCCURRENCE SPECIFICATION TESTS ==========

#[test]
fn all_selects_everything() {
    let occ = OccSpec::all();
    assert!(occ.is_all());
    assert!(occ.selects(1));
    assert!(occ.selects(100));
    assert_eq!(occ.max_requested(), None);
    assert_eq!(OccSpec::default(), occ);
}

#[test]
fn none_selects_nothing() {
    let occ = OccSpec::none();
    assert!(!occ.is_all());
    assert!(!occ.selects(1));
}

#[test]
fn explicit_indices_are_sorted_and_deduplicated() {
    let occ = OccSpec::only([3, 1, 3]).expect("valid");
    assert_eq!(occ.indices(), &[1, 3]);
    assert_eq!(occ.polarity(), Polarity::Select);
    assert!(occ.selects(1));
    assert!(!occ.selects(2));
    assert_eq!(occ.max_requested(), Some(3));
}

#[test]
fn complement_skips_listed_indices() {
    let occ = OccSpec::all_but([2]).expect("valid");
    assert!(occ.selects(1));
    assert!(!occ.selects(2));
    assert!(occ.selects(3));
}

#[test]
fn index_zero_is_rejected() {
    assert_eq!(OccSpec::only([0, 1]), Err(MatchError::InvalidOccurrence(0)));
}

#[test]
fn check_found_reports_missing_occurrences() {
    let occ = OccSpec::only([5]).expect("valid");
    assert_eq!(occ.check_found(2), Err(MatchError::missing(2, 5)));
    assert_eq!(occ.check_found(5), Ok(()));
    assert_eq!(OccSpec::all().check_found(0), Ok(()));
}

// ========== ABSTRACTION TESTS ==========

#[test]
fn abstracts_every_occurrence_by_default() {
    let mut fx = Fixture::new();
    let target = fx.parse("(plus (g a) (h (g a)))");
    let key = fx.parse("(g a)");
    let (result, selected) = abstract_with(&fx, key, target, &OccSpec::all());
    assert_eq!(fx.show_context(result.context), "(plus X (h X))");
    assert_eq!(result.found, 2);
    assert_eq!(result.selected, 2);
    assert_eq!(selected, 2);
}

#[test]
fn abstracts_only_selected_ordinals() {
    let mut fx = Fixture::new();
    let target = fx.parse("(plus (g a) (h (g a)))");
    let key = fx.parse("(g a)");
    let occ = OccSpec::only([2]).expect("valid");
    let (result, _) = abstract_with(&fx, key, target, &occ);
    assert_eq!(fx.show_context(result.context), "(plus (g a) (h X))");
    assert_eq!(result.found, 2);
    assert_eq!(result.selected, 1);
}

#[test]
fn no_occurrence_leaves_target_shifted() {
    let mut fx = Fixture::new();
    let target = fx.parse("(plus a #0)");
    let key = fx.parse("(g a)");
    let (result, _) = abstract_with(&fx, key, target, &OccSpec::all());
    assert_eq!(result.found, 0);
    // The free variable now skips the new binder
    assert_eq!(fx.show_context(result.context), "(plus a #0)");
    assert_eq!(result.context, fx.parse("(plus a #1)"));
}

#[test]
fn occurrences_under_binders_use_the_outer_variable() {
    let mut fx = Fixture::new();
    let target = fx.parse("(fun (y A) (f y (g a)))");
    let key = fx.parse("(g a)");
    let (result, _) = abstract_with(&fx, key, target, &OccSpec::all());
    assert_eq!(fx.show_context(result.context), "(fun (x1 A) (f x1 X))");
}

#[test]
fn selected_node_is_not_searched_further() {
    let mut fx = Fixture::new();
    // (s (s a)) contains itself only once, the inner (s a) is not counted
    let target = fx.parse("(f (s (s a)))");
    let key = fx.parse("(s (s a))");
    let (result, _) = abstract_with(&fx, key, target, &OccSpec::all());
    assert_eq!(result.found, 1);
    assert_eq!(fx.show_context(result.context), "(f X)");
}

#[test]
fn abstraction_round_trips() {
    let mut fx = Fixture::new();
    let target = fx.parse("(plus (g a) (fun (y A) (h y (g a) #0)))");
    let key = fx.parse("(g a)");
    let occ = OccSpec::only([2]).expect("valid");
    let (result, _) = abstract_with(&fx, key, target, &occ);
    assert_eq!(instantiate(&fx.terms, result.context, key), target);
}

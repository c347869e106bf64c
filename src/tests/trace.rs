use super::*;

#[test]
fn facade_macros_expand_in_statement_position() {
    let pass = "first_order";
    let _span = info_span!("fill_occurrence").entered();
    let _pass = debug_span!("match_pass", pass).entered();
    trace!(hole = 3, "unify_postponed");
    debug!(pass, "pass_found_nothing");
}

#[test]
fn log_filter_variable_name() {
    assert_eq!(LOG_ENV, "OCCMATCH_LOG");
}

#[test]
fn init_subscriber_is_idempotent() {
    init_subscriber();
    init_subscriber();
}

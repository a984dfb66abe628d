//! End-to-end scenarios exercising a full host transaction lifecycle against
//! a [`Session`], independent of any single crate's unit tests.

use packagevars::{KeyArray, Session, StoreConfig, Value};

fn session() -> Session {
    Session::new(StoreConfig::default())
}

#[test]
fn nested_rollback_preserves_outer_writes_across_two_scopes() {
    let mut s = session();
    s.begin_subtransaction();
    s.set_scalar("accounting", "balance", Some(Value::Int(100)), true).unwrap();

    s.begin_subtransaction();
    s.set_scalar("accounting", "balance", Some(Value::Int(50)), true).unwrap();
    s.begin_subtransaction();
    s.set_scalar("accounting", "balance", Some(Value::Int(0)), true).unwrap();
    s.rollback_subtransaction();
    assert_eq!(s.get_scalar("accounting", "balance", None, true).unwrap(), Some(Value::Int(50)));
    s.rollback_subtransaction();
    assert_eq!(s.get_scalar("accounting", "balance", None, true).unwrap(), Some(Value::Int(100)));

    s.commit_top();
    assert_eq!(s.current_level(), packagevars::Level::BASE);
    assert_eq!(s.get_scalar("accounting", "balance", None, true).unwrap(), Some(Value::Int(100)));
}

#[test]
fn package_resurrects_without_contents_after_removal() {
    let mut s = session();
    s.set_scalar("cache", "regular_hit_count", Some(Value::Int(1)), false).unwrap();
    s.set_scalar("cache", "pending_tx_total", Some(Value::Int(9)), true).unwrap();

    s.remove_package("cache").unwrap();
    assert!(!s.package_exists("cache"));

    s.set_scalar("cache", "regular_hit_count", Some(Value::Int(0)), false).unwrap();
    assert!(s.package_exists("cache"));
    assert_eq!(s.get_scalar("cache", "regular_hit_count", None, true).unwrap(), Some(Value::Int(0)));
    assert!(!s.variable_exists("cache", "pending_tx_total"));
}

#[test]
fn commit_folds_a_two_level_savepoint_stack_into_the_top_level() {
    let mut s = session();
    s.begin_subtransaction();
    s.set_scalar("counters", "hits", Some(Value::Int(1)), true).unwrap();
    s.begin_subtransaction();
    s.set_scalar("counters", "hits", Some(Value::Int(2)), true).unwrap();
    s.release_subtransaction();
    s.commit_top();
    assert_eq!(s.current_level(), packagevars::Level::BASE);
    assert_eq!(s.get_scalar("counters", "hits", None, true).unwrap(), Some(Value::Int(2)));
}

#[test]
fn scan_over_a_removed_variable_reports_done_rather_than_stale_rows() {
    let mut s = session();
    s.insert_row("queue", "jobs", packagevars::Row::new(vec![Value::Int(1), Value::Bool(false)]), true).unwrap();
    s.insert_row("queue", "jobs", packagevars::Row::new(vec![Value::Int(2), Value::Bool(false)]), true).unwrap();

    let mut cursor = s.select_rows("queue", "jobs").unwrap();
    s.remove_variable("queue", "jobs").unwrap();
    assert_eq!(cursor.next(), None);
}

#[test]
fn empty_package_is_garbage_collected_once_its_last_variable_is_removed() {
    let mut s = session();
    s.begin_subtransaction();
    s.set_scalar("scratch", "tmp", Some(Value::Int(1)), true).unwrap();
    s.remove_variable("scratch", "tmp").unwrap();
    s.commit_top();
    assert!(!s.list_packages_and_variables().iter().any(|p| p.name == "scratch"));
}

#[test]
fn creating_a_variable_with_the_opposite_transactionality_is_rejected() {
    let mut s = session();
    s.set_scalar("settings", "flag", Some(Value::Bool(true)), false).unwrap();
    let err = s.set_scalar("settings", "flag", Some(Value::Bool(false)), true).unwrap_err();
    assert!(matches!(err, packagevars::PgVarsError::TransactionalityConflict { .. }));
}

#[test]
fn select_rows_by_keys_skips_unmatched_keys_in_input_order() {
    let mut s = session();
    s.insert_row("directory", "users", packagevars::Row::new(vec![Value::Int(1), Value::Text("alice".into())]), true)
        .unwrap();
    s.insert_row("directory", "users", packagevars::Row::new(vec![Value::Int(2), Value::Text("bob".into())]), true)
        .unwrap();

    let cursor = s
        .select_rows_by_keys("directory", "users", KeyArray::Flat(vec![Value::Int(2), Value::Int(404), Value::Int(1)]))
        .unwrap();
    let names: Vec<String> = cursor
        .map(|r| match &r.values[1] {
            Value::Text(t) => t.clone(),
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(names, vec!["bob".to_string(), "alice".to_string()]);
}

#[test]
fn multidimensional_key_arrays_are_rejected_outright() {
    let mut s = session();
    s.insert_row("directory", "users", packagevars::Row::new(vec![Value::Int(1), Value::Text("alice".into())]), true)
        .unwrap();
    let err = s
        .select_rows_by_keys("directory", "users", KeyArray::Nested(vec![vec![Value::Int(1)]]))
        .unwrap_err();
    assert!(matches!(err, packagevars::PgVarsError::FeatureNotSupported(_)));
}

#[test]
fn abort_of_top_level_transaction_discards_everything_created_within_it() {
    let mut s = session();
    s.begin_subtransaction();
    s.set_scalar("volatile", "x", Some(Value::Int(1)), true).unwrap();
    s.abort_top();
    assert_eq!(s.current_level(), packagevars::Level::BASE);
    assert!(!s.variable_exists("volatile", "x"));
}

#[test]
fn executor_end_terminates_scans_without_touching_data() {
    let mut s = session();
    s.insert_row("queue", "jobs", packagevars::Row::new(vec![Value::Int(1), Value::Bool(false)]), true).unwrap();
    let mut cursor = s.select_rows("queue", "jobs").unwrap();
    s.executor_end();
    assert_eq!(cursor.next(), None);
    assert!(s.variable_exists("queue", "jobs"));
}

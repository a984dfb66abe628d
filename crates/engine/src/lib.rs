//! The `Session` façade: the callable surface of spec.md section 6, plus
//! the host transaction-lifecycle hooks, wired onto `packagevars-store`'s
//! object-store and transaction-engine primitives.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod cursor_stream;

pub use cursor_stream::RowCursor;

use packagevars_core::{type_ids, KeyArray, PgVarsError, Result, Row, TypeId, Value};
use packagevars_store::{PackageSummary, RecordSet, Store, StoreConfig, VariableBody};

/// A session-scoped handle exposing the store's callable surface.
///
/// Not `Sync`: one session belongs to one thread of use (spec.md section
/// 5). Constructing two sessions in the same process is fine — they share
/// no state — but a single `Session` must not be accessed concurrently.
pub struct Session {
    store: Store,
}

impl Session {
    /// A fresh session with an empty package table.
    pub fn new(config: StoreConfig) -> Self {
        Session { store: Store::new(config) }
    }

    /// The current nesting level, exposed for diagnostics and tests.
    pub fn current_level(&self) -> packagevars_core::Level {
        self.store.current_level()
    }

    // ---- callable surface (spec.md section 6) -----------------------------

    /// `set scalar`: null permitted; establishes the package and variable on
    /// first call.
    pub fn set_scalar(&mut self, package: &str, name: &str, value: Option<Value>, is_transactional: bool) -> Result<()> {
        let type_id = value.as_ref().map(Value::type_id).unwrap_or(type_ids::UNKNOWN);
        let new_value = value.unwrap_or(Value::Null(type_id));
        let body = VariableBody::Scalar { type_id, value: new_value.clone() };
        let var = self.store.create_variable(package, name, type_id, false, is_transactional, body)?;
        match var.current_body_mut() {
            VariableBody::Scalar { type_id: slot_type, value: slot } => {
                *slot_type = type_id;
                *slot = new_value;
                Ok(())
            }
            VariableBody::Record(_) => Err(PgVarsError::KindMismatch {
                package: package.to_string(),
                name: name.to_string(),
                expected: "scalar",
                actual: "record",
            }),
        }
    }

    /// `get scalar`: `TypeMismatch` on type disagreement, `UnknownVariable`
    /// when `strict` and the variable does not exist.
    pub fn get_scalar(&self, package: &str, name: &str, type_hint: Option<TypeId>, strict: bool) -> Result<Option<Value>> {
        match self.store.get_variable(package, name, type_hint, Some(false), strict)? {
            Some(var) => match var.current_body() {
                VariableBody::Scalar { value, .. } => Ok(Some(value.clone())),
                VariableBody::Record(_) => unreachable!("get_variable already enforced is_record = false"),
            },
            None => Ok(None),
        }
    }

    /// `insert row`: establishes the record variable's row descriptor on
    /// the first call.
    pub fn insert_row(&mut self, package: &str, name: &str, row: Row, is_transactional: bool) -> Result<()> {
        let type_id = row.key().type_id();
        let convert_unknownoid = self.store.config().convert_unknownoid;
        let var = self
            .store
            .create_variable(package, name, type_id, true, is_transactional, VariableBody::Record(RecordSet::new()))?;
        match var.current_body_mut() {
            VariableBody::Record(rs) => rs.insert(row, convert_unknownoid).map_err(|e| tag(e, package, name)),
            VariableBody::Scalar { .. } => Err(PgVarsError::KindMismatch {
                package: package.to_string(),
                name: name.to_string(),
                expected: "record",
                actual: "scalar",
            }),
        }
    }

    /// `update row`: true iff a row matching the key existed. Fails
    /// `UnknownVariable` if the record variable does not exist yet — unlike
    /// insert, update never establishes one.
    pub fn update_row(&mut self, package: &str, name: &str, row: Row) -> Result<bool> {
        let var = self.store.touch_variable(package, name)?;
        match var.current_body_mut() {
            VariableBody::Record(rs) => rs.update(row).map_err(|e| tag(e, package, name)),
            VariableBody::Scalar { .. } => Err(PgVarsError::KindMismatch {
                package: package.to_string(),
                name: name.to_string(),
                expected: "record",
                actual: "scalar",
            }),
        }
    }

    /// `delete row`: a null key deletes the row whose key is null.
    pub fn delete_row(&mut self, package: &str, name: &str, key: Option<Value>) -> Result<bool> {
        let var = self.store.touch_variable(package, name)?;
        match var.current_body_mut() {
            VariableBody::Record(rs) => Ok(rs.delete(key.as_ref())),
            VariableBody::Scalar { .. } => Err(PgVarsError::KindMismatch {
                package: package.to_string(),
                name: name.to_string(),
                expected: "record",
                actual: "scalar",
            }),
        }
    }

    /// `select rows`: registers a scan (spec.md section 4.5).
    pub fn select_rows(&mut self, package: &str, name: &str) -> Result<RowCursor> {
        let rows = self.record_rows(package, name)?;
        let handle = self.store.open_variable_scan(package, name);
        Ok(RowCursor::new(handle, rows))
    }

    /// `select row by key`: the single matching row, or `None`.
    pub fn select_row_by_key(&self, package: &str, name: &str, key: &Value) -> Result<Option<Row>> {
        match self.record_set(package, name)? {
            Some(rs) => Ok(rs.get(key).cloned()),
            None => Ok(None),
        }
    }

    /// `select rows by keys`: a lazy sequence over the matches for each
    /// input element; unmatched elements are skipped. Rejects
    /// multidimensional arrays with `FeatureNotSupported`.
    pub fn select_rows_by_keys(&mut self, package: &str, name: &str, keys: KeyArray) -> Result<RowCursor> {
        let keys = match keys {
            KeyArray::Flat(keys) => keys,
            KeyArray::Nested(_) => {
                return Err(PgVarsError::FeatureNotSupported(
                    "multidimensional key arrays are not supported".to_string(),
                ))
            }
        };
        let rows = match self.record_set(package, name)? {
            Some(rs) => rs.select_by_keys(&keys).cloned().collect(),
            None => Vec::new(),
        };
        let handle = self.store.open_variable_scan(package, name);
        Ok(RowCursor::new(handle, rows))
    }

    /// `variable exists`.
    pub fn variable_exists(&self, package: &str, name: &str) -> bool {
        self.store.variable_exists(package, name)
    }

    /// `package exists`.
    pub fn package_exists(&self, package: &str) -> bool {
        self.store.package_exists(package)
    }

    /// `remove variable`.
    pub fn remove_variable(&mut self, package: &str, name: &str) -> Result<()> {
        self.store.remove_variable(package, name)
    }

    /// `remove package`.
    pub fn remove_package(&mut self, package: &str) -> Result<()> {
        self.store.remove_package(package)
    }

    /// `remove all packages`: valid outside any live transaction.
    pub fn remove_all_packages(&mut self) -> Result<()> {
        self.store.remove_all_packages()
    }

    /// `list packages and variables`: skips invalid entries.
    pub fn list_packages_and_variables(&mut self) -> Vec<PackageSummary> {
        self.store.list_packages_and_variables()
    }

    /// `package stats`: a memory-footprint estimate per package.
    pub fn package_stats(&mut self) -> Vec<(String, usize)> {
        self.store.package_stats()
    }

    // ---- host transaction-lifecycle hooks ---------------------------------

    /// A subtransaction (or the enclosing top-level transaction) begins.
    pub fn begin_subtransaction(&mut self) {
        self.store.begin_subtransaction();
    }

    /// `RELEASE SAVEPOINT`.
    pub fn release_subtransaction(&mut self) {
        self.store.release_subtransaction();
    }

    /// `ROLLBACK TO SAVEPOINT`.
    pub fn rollback_subtransaction(&mut self) {
        self.store.rollback_subtransaction();
    }

    /// Called just before the top-level transaction commits.
    pub fn pre_commit_top(&mut self) {
        self.store.pre_commit_top();
    }

    /// `COMMIT` of the top-level transaction.
    pub fn commit_top(&mut self) {
        self.store.commit_top();
    }

    /// `ROLLBACK` of the top-level transaction.
    pub fn abort_top(&mut self) {
        self.store.abort_top();
    }

    /// End of the current query's execution: terminate every active scan.
    pub fn executor_end(&mut self) {
        self.store.executor_end();
    }

    /// Enter a nested autonomous-transaction boundary (spec.md section 9).
    #[cfg(feature = "autonomous")]
    pub fn begin_autonomous(&mut self) {
        self.store.begin_autonomous();
    }

    /// Exit the innermost autonomous-transaction boundary.
    #[cfg(feature = "autonomous")]
    pub fn end_autonomous(&mut self) {
        self.store.end_autonomous();
    }

    fn record_set(&self, package: &str, name: &str) -> Result<Option<&RecordSet>> {
        match self.store.get_variable(package, name, None, Some(true), true)? {
            Some(var) => match var.current_body() {
                VariableBody::Record(rs) => Ok(Some(rs)),
                VariableBody::Scalar { .. } => unreachable!("get_variable already enforced is_record = true"),
            },
            None => Ok(None),
        }
    }

    fn record_rows(&self, package: &str, name: &str) -> Result<Vec<Row>> {
        Ok(self.record_set(package, name)?.map(|rs| rs.iter().cloned().collect()).unwrap_or_default())
    }
}

fn tag(err: PgVarsError, package: &str, name: &str) -> PgVarsError {
    match err {
        PgVarsError::TypeMismatch { expected, actual, .. } => PgVarsError::TypeMismatch {
            package: package.to_string(),
            name: name.to_string(),
            expected,
            actual,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(StoreConfig::default())
    }

    #[test]
    fn set_get_round_trip() {
        let mut s = session();
        s.set_scalar("p", "v", Some(Value::Int(7)), true).unwrap();
        assert_eq!(s.get_scalar("p", "v", Some(type_ids::INT), true).unwrap(), Some(Value::Int(7)));
    }

    #[test]
    fn insert_select_by_key_round_trip() {
        let mut s = session();
        let row = Row::new(vec![Value::Int(1), Value::Text("a".into())]);
        s.insert_row("p", "t", row.clone(), true).unwrap();
        assert_eq!(s.select_row_by_key("p", "t", &Value::Int(1)).unwrap(), Some(row));
        s.delete_row("p", "t", Some(Value::Int(1))).unwrap();
        assert_eq!(s.select_row_by_key("p", "t", &Value::Int(1)).unwrap(), None);
    }

    #[test]
    fn nested_rollback_preserves_outer_writes() {
        let mut s = session();
        s.set_scalar("p", "x", Some(Value::Int(1)), true).unwrap();
        s.begin_subtransaction();
        s.set_scalar("p", "x", Some(Value::Int(2)), true).unwrap();
        s.rollback_subtransaction();
        assert_eq!(s.get_scalar("p", "x", None, true).unwrap(), Some(Value::Int(1)));
    }

    #[test]
    fn commit_folds_across_two_levels() {
        let mut s = session();
        s.begin_subtransaction();
        s.set_scalar("p", "x", Some(Value::Int(1)), true).unwrap();
        s.begin_subtransaction();
        s.set_scalar("p", "x", Some(Value::Int(2)), true).unwrap();
        s.release_subtransaction();
        s.commit_top();
        assert_eq!(s.current_level(), packagevars_core::Level::BASE);
        assert_eq!(s.get_scalar("p", "x", None, true).unwrap(), Some(Value::Int(2)));
    }

    #[test]
    fn iterator_survives_variable_removal() {
        let mut s = session();
        s.begin_subtransaction();
        s.insert_row("p", "t", Row::new(vec![Value::Int(1), Value::Bool(true)]), true).unwrap();
        let mut cursor = s.select_rows("p", "t").unwrap();
        s.remove_variable("p", "t").unwrap();
        assert_eq!(cursor.next(), None);
    }

    #[test]
    fn empty_package_gc_after_commit() {
        let mut s = session();
        s.begin_subtransaction();
        s.set_scalar("p", "t", Some(Value::Int(1)), true).unwrap();
        s.remove_variable("p", "t").unwrap();
        s.commit_top();
        assert!(!s.list_packages_and_variables().iter().any(|p| p.name == "p"));
    }

    #[test]
    fn transactionality_conflict_on_opposite_flavor() {
        let mut s = session();
        s.set_scalar("p", "x", Some(Value::Int(1)), false).unwrap();
        let err = s.set_scalar("p", "x", Some(Value::Int(1)), true).unwrap_err();
        assert!(matches!(err, PgVarsError::TransactionalityConflict { .. }));
    }

    #[test]
    fn multidimensional_key_array_is_rejected() {
        let mut s = session();
        s.insert_row("p", "t", Row::new(vec![Value::Int(1), Value::Bool(true)]), true).unwrap();
        let err = s
            .select_rows_by_keys("p", "t", KeyArray::Nested(vec![vec![Value::Int(1)]]))
            .unwrap_err();
        assert!(matches!(err, PgVarsError::FeatureNotSupported(_)));
    }
}

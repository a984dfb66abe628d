//! The keyed row table backing a record variable (spec.md section 4.2).

use packagevars_core::{type_ids, PgVarsError, Result, Row, RowDescriptor, Value};
use rustc_hash::FxHashMap;

/// A record variable's keyed row set.
///
/// Rows are keyed by their first column value. The descriptor is captured
/// from the first row ever inserted; every later insert is validated
/// attribute-by-attribute against it.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    descriptor: Option<RowDescriptor>,
    rows: FxHashMap<Value, Row>,
}

impl RecordSet {
    /// An empty record set with no descriptor yet.
    pub fn new() -> Self {
        RecordSet::default()
    }

    /// The row descriptor, if one has been captured yet.
    pub fn descriptor(&self) -> Option<&RowDescriptor> {
        self.descriptor.as_ref()
    }

    /// Number of rows currently stored.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if the row set holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Insert (or overwrite) a row, capturing or validating the descriptor.
    ///
    /// If `convert_unknownoid` is set and the row's key column is the
    /// "unknown" pseudo-type, it is silently promoted to text before
    /// descriptor capture or validation (spec.md section 4.1).
    pub fn insert(&mut self, mut row: Row, convert_unknownoid: bool) -> Result<()> {
        if convert_unknownoid && row.values[0].type_id() == type_ids::UNKNOWN {
            row.values[0] = std::mem::replace(&mut row.values[0], Value::Null(type_ids::UNKNOWN))
                .promote_unknown_to_text();
        }
        match &self.descriptor {
            None => {
                self.descriptor = Some(RowDescriptor::from_row(&row, false));
            }
            Some(desc) => {
                if !desc.matches(&row) {
                    return Err(PgVarsError::TypeMismatch {
                        package: String::new(),
                        name: String::new(),
                        expected: desc.columns.first().map(|c| c.type_id).unwrap_or(0),
                        actual: row.values.first().map(|v| v.type_id()).unwrap_or(0),
                    });
                }
            }
        }
        self.rows.insert(row.key().clone(), row);
        Ok(())
    }

    /// Update the row matching the new row's key, if one exists.
    ///
    /// Returns true iff a row with that key existed (spec.md section 6,
    /// "update row").
    pub fn update(&mut self, row: Row) -> Result<bool> {
        if let Some(desc) = &self.descriptor {
            if !desc.matches(&row) {
                return Err(PgVarsError::TypeMismatch {
                    package: String::new(),
                    name: String::new(),
                    expected: desc.columns.first().map(|c| c.type_id).unwrap_or(0),
                    actual: row.values.first().map(|v| v.type_id()).unwrap_or(0),
                });
            }
        }
        let key = row.key().clone();
        if self.rows.contains_key(&key) {
            self.rows.insert(key, row);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Delete the row matching `key`, or the row keyed by null if `key` is
    /// `None` (spec.md section 6, "delete row": "Null key deletes the row
    /// whose key is null").
    pub fn delete(&mut self, key: Option<&Value>) -> bool {
        match key {
            Some(k) => self.rows.remove(k).is_some(),
            None => {
                let null_key = self.rows.keys().find(|k| k.is_null()).cloned();
                match null_key {
                    Some(k) => self.rows.remove(&k).is_some(),
                    None => false,
                }
            }
        }
    }

    /// Look up a single row by its key.
    pub fn get(&self, key: &Value) -> Option<&Row> {
        self.rows.get(key)
    }

    /// Iterate all rows in the table's internal (unordered) order.
    pub fn iter(&self) -> impl Iterator<Item = &Row> {
        self.rows.values()
    }

    /// Lazily look up each of `keys` in turn, skipping unmatched elements
    /// (spec.md section 4.2, "Lookup-by-array").
    pub fn select_by_keys<'a>(&'a self, keys: &'a [Value]) -> impl Iterator<Item = &'a Row> + 'a {
        keys.iter().filter_map(move |k| self.rows.get(k))
    }
}

//! Variables: named, typed entries inside a package (spec.md section 3).

use crate::savepoint::{self, ReleaseOutcome, RollbackOutcome};
use crate::state::{VariableBody, VariableState};
use packagevars_core::{Level, TypeId};

/// How a variable's value is held, depending on `is_transactional`.
#[derive(Debug, Clone)]
pub enum VariableStorage {
    /// A savepoint-history stack, one state per active nesting level that
    /// has touched this variable.
    Transactional(Vec<VariableState>),
    /// A single live value body, unaffected by transaction boundaries.
    Regular(VariableBody),
}

/// A named entry inside a package.
#[derive(Debug, Clone)]
pub struct Variable {
    /// Variable name, unique within its package across both tables.
    pub name: String,
    /// Declared scalar type, or the key column's type for a record
    /// variable at the time its descriptor was captured.
    pub type_id: TypeId,
    /// True if this variable holds a keyed row set rather than a scalar.
    pub is_record: bool,
    /// True if this variable is transactional.
    pub is_transactional: bool,
    /// Set once the variable has been logically removed (its storage may
    /// still be a non-empty state stack momentarily, between the removal
    /// call and the release/rollback that finally destroys it).
    pub is_deleted: bool,
    storage: VariableStorage,
}

impl Variable {
    /// Construct a new transactional variable with an initial valid state.
    pub fn new_transactional(name: String, type_id: TypeId, is_record: bool, body: VariableBody, level: Level) -> Self {
        Variable {
            name,
            type_id,
            is_record,
            is_transactional: true,
            is_deleted: false,
            storage: VariableStorage::Transactional(vec![VariableState {
                body,
                valid: true,
                level,
            }]),
        }
    }

    /// Construct a new regular variable.
    pub fn new_regular(name: String, type_id: TypeId, is_record: bool, body: VariableBody) -> Self {
        Variable {
            name,
            type_id,
            is_record,
            is_transactional: false,
            is_deleted: false,
            storage: VariableStorage::Regular(body),
        }
    }

    /// Borrow the savepoint-history stack. Panics on a regular variable —
    /// callers must branch on `is_transactional` first.
    pub fn states(&self) -> &[VariableState] {
        match &self.storage {
            VariableStorage::Transactional(s) => s,
            VariableStorage::Regular(_) => panic!("regular variable has no savepoint history"),
        }
    }

    /// Mutably borrow the savepoint-history stack.
    pub fn states_mut(&mut self) -> &mut Vec<VariableState> {
        match &mut self.storage {
            VariableStorage::Transactional(s) => s,
            VariableStorage::Regular(_) => panic!("regular variable has no savepoint history"),
        }
    }

    /// The currently visible value body: the head state's body for a
    /// transactional variable, or the live body for a regular one.
    pub fn current_body(&self) -> &VariableBody {
        match &self.storage {
            VariableStorage::Transactional(s) => {
                &s.last().expect("transactional variable always has a head state").body
            }
            VariableStorage::Regular(b) => b,
        }
    }

    /// Mutably borrow the currently visible value body.
    pub fn current_body_mut(&mut self) -> &mut VariableBody {
        match &mut self.storage {
            VariableStorage::Transactional(s) => {
                &mut s.last_mut().expect("transactional variable always has a head state").body
            }
            VariableStorage::Regular(b) => b,
        }
    }

    /// Whether the head state is valid (always true for a regular
    /// variable, which has no invalid-tombstone concept).
    pub fn is_valid(&self) -> bool {
        match &self.storage {
            VariableStorage::Transactional(s) => s.last().map(|st| st.valid).unwrap_or(false),
            VariableStorage::Regular(_) => true,
        }
    }

    /// `changed_at_current_level` (spec.md section 4.3). Always false for a
    /// regular variable, which has no per-level state.
    pub fn changed_at_current_level(&self, current: Level) -> bool {
        match &self.storage {
            VariableStorage::Transactional(s) => savepoint::changed_at_current_level(s, current),
            VariableStorage::Regular(_) => false,
        }
    }

    /// `changed_at_upper_level` (spec.md section 4.3).
    pub fn changed_at_upper_level(&self, current: Level) -> bool {
        match &self.storage {
            VariableStorage::Transactional(s) => savepoint::changed_at_upper_level(s, current),
            VariableStorage::Regular(_) => false,
        }
    }

    /// Push a savepoint at `current`, deep-copying the head. No-op (and a
    /// bug to call) on a regular variable.
    pub fn create_savepoint(&mut self, current: Level) {
        match &mut self.storage {
            VariableStorage::Transactional(s) => savepoint::create_savepoint(s, current),
            VariableStorage::Regular(_) => {
                debug_assert!(false, "create_savepoint called on a regular variable");
            }
        }
    }

    /// Mark the head state invalid, pushing a savepoint first if this
    /// variable has not yet been touched at `current`.
    pub fn mark_invalid(&mut self, current: Level) {
        if !self.changed_at_current_level(current) {
            self.create_savepoint(current);
        }
        if let VariableStorage::Transactional(s) = &mut self.storage {
            s.last_mut().unwrap().valid = false;
        }
    }

    /// Release the subtransaction that created the head state (spec.md
    /// section 4.3). Only meaningful for transactional variables.
    pub fn release(&mut self, parent_level: Level, has_parent_frame: bool, is_top: bool) -> ReleaseOutcome {
        match &mut self.storage {
            VariableStorage::Transactional(s) => savepoint::release(s, parent_level, has_parent_frame, is_top),
            VariableStorage::Regular(_) => unreachable!("regular variables never enter the changes stack"),
        }
    }

    /// Human-readable kind of the current body ("scalar" or "record"), for
    /// [`packagevars_core::PgVarsError::KindMismatch`].
    pub fn kind_name(&self) -> &'static str {
        self.current_body().kind_name()
    }

    /// Roll back the subtransaction that created the head state.
    pub fn rollback(&mut self) -> RollbackOutcome {
        match &mut self.storage {
            VariableStorage::Transactional(s) => savepoint::rollback(s),
            VariableStorage::Regular(_) => unreachable!("regular variables never enter the changes stack"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packagevars_core::{type_ids, Value};

    fn scalar(v: i64) -> VariableBody {
        VariableBody::Scalar {
            type_id: type_ids::INT,
            value: Value::Int(v),
        }
    }

    #[test]
    fn transactional_round_trip_set_get() {
        let var = Variable::new_transactional("x".into(), type_ids::INT, false, scalar(1), Level::BASE);
        match var.current_body() {
            VariableBody::Scalar { value, .. } => assert_eq!(*value, Value::Int(1)),
            _ => panic!("expected scalar"),
        }
    }

    #[test]
    fn savepoint_then_mutate_then_rollback_restores_value() {
        let mut var = Variable::new_transactional("x".into(), type_ids::INT, false, scalar(1), Level::BASE);
        var.create_savepoint(Level::at_nest(0, 1));
        *var.current_body_mut() = scalar(2);
        match var.current_body() {
            VariableBody::Scalar { value, .. } => assert_eq!(*value, Value::Int(2)),
            _ => unreachable!(),
        }
        assert_eq!(var.rollback(), RollbackOutcome::Kept);
        match var.current_body() {
            VariableBody::Scalar { value, .. } => assert_eq!(*value, Value::Int(1)),
            _ => unreachable!(),
        }
    }
}

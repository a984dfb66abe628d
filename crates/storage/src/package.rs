//! Packages: named containers of variables (spec.md section 3).

use crate::savepoint::{self, ReleaseOutcome};
use crate::state::PackageState;
use crate::variable::Variable;
use packagevars_arena::Region;
use packagevars_core::Level;
use rustc_hash::FxHashMap;

/// A named namespace of variables.
///
/// Owns two independent variable tables (regular and transactional) plus
/// its own savepoint-history stack of [`PackageState`]s. The regular table
/// lives inside a [`Region`] so `remove_package` can drop every regular
/// variable atomically, ahead of the `Package` value itself going away
/// (spec.md section 4.1, "destroys the package's entire regular arena").
#[derive(Debug)]
pub struct Package {
    /// Package name.
    pub name: String,
    regular: Region<FxHashMap<String, Variable>>,
    transactional: FxHashMap<String, Variable>,
    states: Vec<PackageState>,
}

impl Package {
    /// Create a new package with an initial valid state at `level`.
    pub fn new(name: String, level: Level) -> Self {
        Package {
            name,
            regular: Region::new(FxHashMap::default()),
            transactional: FxHashMap::default(),
            states: vec![PackageState::initial(level)],
        }
    }

    /// Whether the head state is valid.
    pub fn is_valid(&self) -> bool {
        self.states.last().map(|s| s.valid).unwrap_or(false)
    }

    /// Current count of transactional variables with a valid head state.
    pub fn trans_var_num(&self) -> usize {
        self.states.last().map(|s| s.trans_var_num).unwrap_or(0)
    }

    /// The regular-variable table, or `None` if its region has been
    /// destroyed (the package is in the process of being removed).
    pub fn regular_vars(&self) -> Option<&FxHashMap<String, Variable>> {
        self.regular.get()
    }

    /// Mutably borrow the regular-variable table, reviving its region if a
    /// prior removal destroyed it (spec.md: "deleted packages resurrect on
    /// re-use").
    pub fn regular_vars_mut(&mut self) -> &mut FxHashMap<String, Variable> {
        if !self.regular.is_alive() {
            self.regular.reset();
        }
        self.regular.get_mut().expect("region was just reset")
    }

    /// The transactional-variable table.
    pub fn transactional_vars(&self) -> &FxHashMap<String, Variable> {
        &self.transactional
    }

    /// Mutably borrow the transactional-variable table.
    pub fn transactional_vars_mut(&mut self) -> &mut FxHashMap<String, Variable> {
        &mut self.transactional
    }

    /// True if any regular variable exists, alive or not (a destroyed
    /// region reports no variables).
    pub fn has_regular_variables(&self) -> bool {
        self.regular.get().map(|m| !m.is_empty()).unwrap_or(false)
    }

    /// Destroy the regular-variable table immediately (spec.md section 4.1,
    /// `remove_package`).
    pub fn destroy_regular_arena(&mut self) {
        self.regular.destroy();
    }

    /// Recompute and store `trans_var_num` on the head state from the
    /// current transactional table. Callers must have already ensured the
    /// head is at `current` (via [`Package::create_savepoint`]).
    pub fn recount_trans_var_num(&mut self, current: Level) {
        let count = self
            .transactional
            .values()
            .filter(|v| v.is_valid())
            .count();
        debug_assert!(self.changed_at_current_level(current));
        self.states.last_mut().unwrap().trans_var_num = count;
    }

    /// `changed_at_current_level` for the package's own state stack.
    pub fn changed_at_current_level(&self, current: Level) -> bool {
        savepoint::changed_at_current_level(&self.states, current)
    }

    /// `changed_at_upper_level` for the package's own state stack.
    pub fn changed_at_upper_level(&self, current: Level) -> bool {
        savepoint::changed_at_upper_level(&self.states, current)
    }

    /// Push a savepoint at `current` if the package hasn't already been
    /// touched there.
    pub fn ensure_savepoint(&mut self, current: Level) {
        if !self.changed_at_current_level(current) {
            savepoint::create_savepoint(&mut self.states, current);
        }
    }

    /// Mark the head state invalid (after ensuring a savepoint at
    /// `current`).
    pub fn mark_invalid(&mut self, current: Level) {
        self.ensure_savepoint(current);
        self.states.last_mut().unwrap().valid = false;
    }

    /// Resurrect a logically-removed package: promote to valid at
    /// `current` (spec.md section 4.1, `create_package`). Does not touch
    /// the transactional table — callers must separately invalidate
    /// pre-existing transactional variables, since resurrection does not
    /// resurrect contents.
    pub fn resurrect(&mut self, current: Level) {
        self.ensure_savepoint(current);
        self.states.last_mut().unwrap().valid = true;
    }

    /// Release the subtransaction that created the head state.
    pub fn release(&mut self, parent_level: Level, has_parent_frame: bool, is_top: bool) -> ReleaseOutcome {
        savepoint::release(&mut self.states, parent_level, has_parent_frame, is_top)
    }

    /// Roll back the subtransaction that created the head state, applying
    /// the package-specific survival rules of spec.md section 4.3:
    /// - if stateless but regular variables remain, synthesize a fresh
    ///   valid state so the package survives;
    /// - if stateless and empty, either drop it (top-level) or mark it
    ///   invalid and promote to the parent frame (nested).
    ///
    /// Returns `true` if the package should be dropped from the session's
    /// package table entirely.
    pub fn rollback(&mut self, parent_level: Level, is_top: bool) -> PackageRollbackOutcome {
        self.states.pop();
        if !self.states.is_empty() {
            return PackageRollbackOutcome::Kept { promoted_to_parent: false };
        }
        if self.has_regular_variables() {
            self.states.push(PackageState {
                valid: true,
                level: parent_level,
                trans_var_num: self.trans_var_num_from_table(),
            });
            return PackageRollbackOutcome::Kept { promoted_to_parent: false };
        }
        if is_top {
            PackageRollbackOutcome::Destroyed
        } else {
            self.states.push(PackageState {
                valid: false,
                level: parent_level,
                trans_var_num: 0,
            });
            PackageRollbackOutcome::Kept { promoted_to_parent: true }
        }
    }

    fn trans_var_num_from_table(&self) -> usize {
        self.transactional.values().filter(|v| v.is_valid()).count()
    }
}

/// Outcome of [`Package::rollback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageRollbackOutcome {
    /// The package has no remaining state and should be removed from the
    /// session's package table.
    Destroyed,
    /// The package survives.
    Kept {
        /// Whether it was re-linked into the parent changes-stack frame.
        promoted_to_parent: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_package_has_one_valid_state() {
        let pkg = Package::new("p".into(), Level::BASE);
        assert!(pkg.is_valid());
        assert_eq!(pkg.trans_var_num(), 0);
    }

    #[test]
    fn destroy_regular_arena_empties_table() {
        let mut pkg = Package::new("p".into(), Level::BASE);
        pkg.regular_vars_mut().insert(
            "r".into(),
            Variable::new_regular(
                "r".into(),
                packagevars_core::type_ids::INT,
                false,
                crate::state::VariableBody::Scalar {
                    type_id: packagevars_core::type_ids::INT,
                    value: packagevars_core::Value::Int(1),
                },
            ),
        );
        assert!(pkg.has_regular_variables());
        pkg.destroy_regular_arena();
        assert!(!pkg.has_regular_variables());
        assert!(pkg.regular_vars().is_none());
    }

    #[test]
    fn rollback_survives_with_regular_variables_remaining() {
        let mut pkg = Package::new("p".into(), Level::at_nest(0, 1));
        pkg.regular_vars_mut().insert(
            "r".into(),
            Variable::new_regular(
                "r".into(),
                packagevars_core::type_ids::INT,
                false,
                crate::state::VariableBody::Scalar {
                    type_id: packagevars_core::type_ids::INT,
                    value: packagevars_core::Value::Int(1),
                },
            ),
        );
        let outcome = pkg.rollback(Level::BASE, false);
        assert_eq!(outcome, PackageRollbackOutcome::Kept { promoted_to_parent: false });
        assert!(pkg.is_valid());
    }

    #[test]
    fn rollback_destroys_empty_package_at_top_level() {
        let mut pkg = Package::new("p".into(), Level::at_nest(0, 1));
        let outcome = pkg.rollback(Level::BASE, true);
        assert_eq!(outcome, PackageRollbackOutcome::Destroyed);
    }

    #[test]
    fn rollback_marks_invalid_and_promotes_when_nested() {
        let mut pkg = Package::new("p".into(), Level::at_nest(0, 1));
        let outcome = pkg.rollback(Level::BASE, false);
        assert_eq!(outcome, PackageRollbackOutcome::Kept { promoted_to_parent: true });
        assert!(!pkg.is_valid());
    }
}

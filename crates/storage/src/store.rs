//! The session-scoped store: packages, the changes stack, the cursor
//! registry, and the transaction-lifecycle hooks that drive release and
//! rollback across them (spec.md section 4, items 2 and 5).

use crate::changes::ChangesStack;
use crate::config::StoreConfig;
use crate::cursor::{CursorRegistry, ScanHandle};
use crate::package::{Package, PackageRollbackOutcome};
use crate::savepoint::{ReleaseOutcome, RollbackOutcome};
use crate::state::VariableBody;
use crate::variable::Variable;
use packagevars_core::{validate_name, Level, PgVarsError, Result, TypeId};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

/// One variable's summary entry for [`Store::list_packages_and_variables`].
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSummary {
    /// Variable name.
    pub name: String,
    /// True if the variable holds a keyed row set.
    pub is_record: bool,
    /// True if the variable is transactional.
    pub is_transactional: bool,
}

/// One package's summary entry for [`Store::list_packages_and_variables`].
#[derive(Debug, Clone, PartialEq)]
pub struct PackageSummary {
    /// Package name.
    pub name: String,
    /// Its live (valid) variables.
    pub variables: Vec<VariableSummary>,
}

#[cfg(feature = "autonomous")]
struct AutonomousFrame {
    packages: FxHashMap<String, Package>,
    changes: ChangesStack,
    cursors: CursorRegistry,
}

/// The session-lifetime singleton: package table, changes stack, cursor
/// registry, and current nesting level (spec.md section 9, "Global mutable
/// session state").
pub struct Store {
    config: StoreConfig,
    packages: FxHashMap<String, Package>,
    changes: ChangesStack,
    cursors: CursorRegistry,
    current_level: Level,
    #[cfg(feature = "autonomous")]
    autonomous_stack: Vec<AutonomousFrame>,
}

impl Store {
    /// A fresh store with no packages, at the base level.
    pub fn new(config: StoreConfig) -> Self {
        Store {
            config,
            packages: FxHashMap::default(),
            changes: ChangesStack::new(),
            cursors: CursorRegistry::new(),
            current_level: Level::BASE,
            #[cfg(feature = "autonomous")]
            autonomous_stack: Vec::new(),
        }
    }

    /// The store's configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The current nesting level.
    pub fn current_level(&self) -> Level {
        self.current_level
    }

    // ---- 4.1 object store -------------------------------------------------

    /// `get_package` (spec.md section 4.1).
    pub fn get_package(&self, name: &str, strict: bool) -> Result<Option<&Package>> {
        match self.packages.get(name) {
            Some(pkg) if pkg.is_valid() => Ok(Some(pkg)),
            _ if strict => Err(PgVarsError::UnknownPackage(name.to_string())),
            _ => Ok(None),
        }
    }

    /// True iff a valid package by this name exists.
    pub fn package_exists(&self, name: &str) -> bool {
        self.packages.get(name).map(|p| p.is_valid()).unwrap_or(false)
    }

    /// `create_package` (spec.md section 4.1): idempotent; resurrects an
    /// invalid package, invalidating its pre-existing transactional
    /// variables (resurrection does not resurrect contents).
    pub fn create_package(&mut self, name: &str) -> Result<&mut Package> {
        validate_name(name)?;
        let current = self.current_level;
        if !self.packages.contains_key(name) {
            debug!(package = name, "creating package");
            self.packages
                .insert(name.to_string(), Package::new(name.to_string(), current));
            self.changes.mark_package(name);
            return Ok(self.packages.get_mut(name).unwrap());
        }
        let pkg = self.packages.get_mut(name).unwrap();
        if !pkg.is_valid() {
            debug!(package = name, "resurrecting package");
            pkg.resurrect(current);
            let stale: Vec<String> = pkg.transactional_vars().keys().cloned().collect();
            for var_name in &stale {
                let var = pkg.transactional_vars_mut().get_mut(var_name).unwrap();
                if var.is_valid() {
                    var.mark_invalid(current);
                }
            }
            pkg.recount_trans_var_num(current);
            self.changes.mark_package(name);
            for var_name in stale {
                self.changes.mark_variable(name, &var_name);
            }
        }
        Ok(self.packages.get_mut(name).unwrap())
    }

    /// `get_variable` (spec.md section 4.1): regular table first, then
    /// transactional. Optional `type_id`/`is_record` hints are checked
    /// against the stored variable.
    pub fn get_variable(
        &self,
        package: &str,
        name: &str,
        type_id: Option<TypeId>,
        is_record: Option<bool>,
        strict: bool,
    ) -> Result<Option<&Variable>> {
        let miss = || {
            if strict {
                Err(PgVarsError::UnknownVariable {
                    package: package.to_string(),
                    name: name.to_string(),
                })
            } else {
                Ok(None)
            }
        };
        let pkg = match self.packages.get(package) {
            Some(pkg) if pkg.is_valid() => pkg,
            _ => return miss(),
        };
        let var = pkg
            .regular_vars()
            .and_then(|m| m.get(name))
            .or_else(|| pkg.transactional_vars().get(name));
        let var = match var {
            Some(v) if v.is_valid() && !v.is_deleted => v,
            _ => return miss(),
        };
        if let Some(expected) = is_record {
            if expected != var.is_record {
                return Err(PgVarsError::KindMismatch {
                    package: package.to_string(),
                    name: name.to_string(),
                    expected: if expected { "record" } else { "scalar" },
                    actual: var.kind_name(),
                });
            }
        }
        if let Some(expected) = type_id {
            if expected != var.type_id {
                return Err(PgVarsError::TypeMismatch {
                    package: package.to_string(),
                    name: name.to_string(),
                    expected,
                    actual: var.type_id,
                });
            }
        }
        Ok(Some(var))
    }

    /// True iff a valid, non-deleted variable by this name exists in either
    /// table of `package`.
    pub fn variable_exists(&self, package: &str, name: &str) -> bool {
        matches!(self.get_variable(package, name, None, None, false), Ok(Some(_)))
    }

    /// Mutably borrow a variable by name, searching the regular table then
    /// the transactional one. Does not check validity — callers that need
    /// "does this read see a live value" should use [`Store::get_variable`]
    /// first.
    pub fn get_variable_mut(&mut self, package: &str, name: &str) -> Result<&mut Variable> {
        let miss = || PgVarsError::UnknownVariable {
            package: package.to_string(),
            name: name.to_string(),
        };
        let pkg = self.packages.get_mut(package).ok_or_else(miss)?;
        if !pkg.is_valid() {
            return Err(miss());
        }
        if pkg.regular_vars().map(|m| m.contains_key(name)).unwrap_or(false) {
            return Ok(pkg.regular_vars_mut().get_mut(name).unwrap());
        }
        pkg.transactional_vars_mut().get_mut(name).ok_or_else(miss)
    }

    /// `create_variable` (spec.md section 4.1). Enforces cross-table name
    /// uniqueness and transactionality agreement; for a transactional
    /// variable not yet mutated at the current level, pushes a savepoint
    /// first (or creates the variable outright if it's new). Returns the
    /// variable so the caller can then write its value.
    #[allow(clippy::too_many_arguments)]
    pub fn create_variable(
        &mut self,
        package: &str,
        name: &str,
        type_id: TypeId,
        is_record: bool,
        is_transactional: bool,
        initial_body: VariableBody,
    ) -> Result<&mut Variable> {
        validate_name(name)?;
        let current = self.current_level;
        let pkg = self.create_package(package)?;

        let in_regular = pkg.regular_vars().map(|m| m.contains_key(name)).unwrap_or(false);
        let in_transactional = pkg.transactional_vars().contains_key(name);
        if in_regular && is_transactional {
            return Err(PgVarsError::TransactionalityConflict {
                package: package.to_string(),
                name: name.to_string(),
                existing: "regular",
            });
        }
        if in_transactional && !is_transactional {
            return Err(PgVarsError::TransactionalityConflict {
                package: package.to_string(),
                name: name.to_string(),
                existing: "transactional",
            });
        }

        if is_transactional {
            if in_transactional {
                let var = pkg.transactional_vars_mut().get_mut(name).unwrap();
                if !var.changed_at_current_level(current) {
                    var.create_savepoint(current);
                }
            } else {
                debug!(package, name, "creating transactional variable");
                let var = Variable::new_transactional(name.to_string(), type_id, is_record, initial_body, current);
                pkg.transactional_vars_mut().insert(name.to_string(), var);
            }
            self.changes.mark_variable(package, name);
            let pkg = self.packages.get_mut(package).unwrap();
            if !pkg.changed_at_current_level(current) {
                pkg.ensure_savepoint(current);
                self.changes.mark_package(package);
            }
            self.packages.get_mut(package).unwrap().recount_trans_var_num(current);
        } else if !in_regular {
            debug!(package, name, "creating regular variable");
            let var = Variable::new_regular(name.to_string(), type_id, is_record, initial_body);
            pkg.regular_vars_mut().insert(name.to_string(), var);
        }

        self.get_variable_mut(package, name)
    }

    /// Ensure a savepoint exists for `variable` at the current level before
    /// the caller overwrites its value in place (used by the callable
    /// surface's setters, which call [`Store::create_variable`] first and
    /// then mutate the returned handle directly on repeat writes).
    pub fn touch_variable(&mut self, package: &str, name: &str) -> Result<&mut Variable> {
        let current = self.current_level;
        let is_transactional = {
            let var = self.get_variable_mut(package, name)?;
            if var.is_transactional && !var.changed_at_current_level(current) {
                var.create_savepoint(current);
            }
            var.is_transactional
        };
        if is_transactional {
            self.changes.mark_variable(package, name);
        }
        self.get_variable_mut(package, name)
    }

    /// `remove_variable` (spec.md section 4.1).
    pub fn remove_variable(&mut self, package: &str, name: &str) -> Result<()> {
        let current = self.current_level;
        let pkg = self
            .packages
            .get_mut(package)
            .filter(|p| p.is_valid())
            .ok_or_else(|| PgVarsError::UnknownPackage(package.to_string()))?;

        if pkg.regular_vars().map(|m| m.contains_key(name)).unwrap_or(false) {
            debug!(package, name, "removing regular variable");
            pkg.regular_vars_mut().remove(name);
            self.cursors.terminate_for_variable(package, name);
            return Ok(());
        }

        if pkg.transactional_vars().contains_key(name) {
            debug!(package, name, "removing transactional variable");
            let var = pkg.transactional_vars_mut().get_mut(name).unwrap();
            if var.is_valid() {
                var.mark_invalid(current);
            }
            var.is_deleted = true;
            self.changes.mark_variable(package, name);
            self.cursors.terminate_for_variable(package, name);

            let pkg = self.packages.get_mut(package).unwrap();
            if !pkg.changed_at_current_level(current) {
                pkg.ensure_savepoint(current);
                self.changes.mark_package(package);
            }
            pkg.recount_trans_var_num(current);
            if pkg.trans_var_num() == 0 && !pkg.has_regular_variables() {
                pkg.mark_invalid(current);
                self.changes.mark_package(package);
            }
            return Ok(());
        }

        Err(PgVarsError::UnknownVariable {
            package: package.to_string(),
            name: name.to_string(),
        })
    }

    /// `remove_package` (spec.md section 4.1): destroys the regular arena
    /// immediately, marks every still-valid variable deleted, and marks the
    /// package state invalid at the current level.
    pub fn remove_package(&mut self, name: &str) -> Result<()> {
        let current = self.current_level;
        let pkg = self
            .packages
            .get_mut(name)
            .filter(|p| p.is_valid())
            .ok_or_else(|| PgVarsError::UnknownPackage(name.to_string()))?;

        debug!(package = name, "removing package");
        self.cursors.terminate_for_package(name);
        let pkg = self.packages.get_mut(name).unwrap();
        pkg.destroy_regular_arena();

        let var_names: Vec<String> = pkg.transactional_vars().keys().cloned().collect();
        for var_name in &var_names {
            let var = pkg.transactional_vars_mut().get_mut(var_name).unwrap();
            if var.is_valid() {
                var.mark_invalid(current);
            }
            var.is_deleted = true;
        }
        for var_name in &var_names {
            self.changes.mark_variable(name, var_name);
        }

        let pkg = self.packages.get_mut(name).unwrap();
        pkg.mark_invalid(current);
        pkg.recount_trans_var_num(current);
        self.changes.mark_package(name);
        Ok(())
    }

    /// `remove_packages` (spec.md section 4.1 and section 9 open question):
    /// outside any transaction, bypasses the changes stack and clears the
    /// table directly; inside one, marks every package invalid so commit
    /// physically frees them. Terminates cursor scans over the package
    /// table before proceeding either way.
    pub fn remove_all_packages(&mut self) -> Result<()> {
        if self.current_level == Level::BASE {
            debug!("removing all packages outside a transaction");
            self.cursors.terminate_all();
            self.packages.clear();
            return Ok(());
        }
        self.cursors.terminate_all();
        let names: Vec<String> = self
            .packages
            .iter()
            .filter(|(_, p)| p.is_valid())
            .map(|(n, _)| n.clone())
            .collect();
        for name in names {
            self.remove_package(&name)?;
        }
        Ok(())
    }

    /// `list_packages_and_variables` (spec.md section 6): skips invalid
    /// packages and variables. Registers and releases a package-table scan
    /// handle so the cursor registry's bookkeeping stays accurate even for
    /// this eagerly-collected view.
    pub fn list_packages_and_variables(&mut self) -> Vec<PackageSummary> {
        let scan = self.cursors.open_package_scan(self.current_level);
        let mut out: Vec<PackageSummary> = self
            .packages
            .iter()
            .filter(|(_, pkg)| pkg.is_valid())
            .map(|(name, pkg)| {
                let mut variables = Vec::new();
                if let Some(regular) = pkg.regular_vars() {
                    variables.extend(regular.values().map(|v| VariableSummary {
                        name: v.name.clone(),
                        is_record: v.is_record,
                        is_transactional: false,
                    }));
                }
                variables.extend(pkg.transactional_vars().values().filter(|v| v.is_valid() && !v.is_deleted).map(
                    |v| VariableSummary {
                        name: v.name.clone(),
                        is_record: v.is_record,
                        is_transactional: true,
                    },
                ));
                PackageSummary {
                    name: name.clone(),
                    variables,
                }
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        drop(scan);
        out
    }

    /// `package_stats` (spec.md section 6): a replaceable memory-footprint
    /// estimate per package (spec.md section 9 open question — the original
    /// estimator is a rough proxy; this one is equally a placeholder).
    pub fn package_stats(&mut self) -> Vec<(String, usize)> {
        let scan = self.cursors.open_package_scan(self.current_level);
        let out = self
            .packages
            .iter()
            .filter(|(_, pkg)| pkg.is_valid())
            .map(|(name, pkg)| (name.clone(), estimate_package_bytes(pkg)))
            .collect();
        drop(scan);
        out
    }

    /// Register a scan over a record variable's row set (spec.md section
    /// 4.5). The caller is responsible for checking [`ScanHandle::is_alive`]
    /// before each fetch.
    pub fn open_variable_scan(&mut self, package: &str, name: &str) -> ScanHandle {
        self.cursors.open_variable_scan(package, name, self.current_level)
    }

    // ---- transaction lifecycle (spec.md sections 4.4, 4.5) ----------------

    /// A subtransaction (or the top-level transaction itself) starts:
    /// push a new, empty changes-stack frame.
    pub fn begin_subtransaction(&mut self) {
        self.changes.push_frame();
        self.current_level = Level::at_nest(self.current_level.atx, self.current_level.nest + 1);
        trace!(level = ?self.current_level, "subtransaction begin");
    }

    /// A subtransaction commits (`RELEASE SAVEPOINT`): pop its frame and run
    /// release over every object it touched.
    pub fn release_subtransaction(&mut self) {
        self.process_release(false);
    }

    /// A subtransaction aborts (`ROLLBACK TO SAVEPOINT`): pop its frame and
    /// run rollback over every object it touched.
    pub fn rollback_subtransaction(&mut self) {
        self.process_rollback(false);
    }

    /// Called just before the top-level transaction commits. A hook point
    /// for future pre-commit validation; currently a no-op beyond logging.
    pub fn pre_commit_top(&mut self) {
        trace!(level = ?self.current_level, "pre-commit top-level transaction");
    }

    /// The top-level transaction commits: drain every remaining frame with
    /// `is_top = true`, so an invalid head with a state beneath it is still
    /// destroyed rather than folded (spec.md section 4.3).
    pub fn commit_top(&mut self) {
        debug!(level = ?self.current_level, "commit top-level transaction");
        while !self.changes.is_absent() {
            self.process_release(true);
        }
        self.current_level = Level::at_nest(self.current_level.atx, 0);
        self.cursors.terminate_all();
    }

    /// The top-level transaction aborts: drain every remaining frame with
    /// rollback semantics.
    pub fn abort_top(&mut self) {
        debug!(level = ?self.current_level, "abort top-level transaction");
        while !self.changes.is_absent() {
            self.process_rollback(true);
        }
        self.current_level = Level::at_nest(self.current_level.atx, 0);
        self.cursors.terminate_all();
    }

    /// Executor end: terminate every active scan regardless of transaction
    /// state (spec.md section 4.5).
    pub fn executor_end(&mut self) {
        self.cursors.terminate_all();
    }

    fn process_release(&mut self, is_top: bool) {
        let Some(frame) = self.changes.pop_frame() else {
            return;
        };
        let released_level = self.current_level;
        let parent_level = if released_level.nest > 0 { released_level.parent() } else { Level::BASE };
        let has_parent_frame = !self.changes.is_absent();
        self.current_level = parent_level;

        for (package, variable) in frame.changed_variables {
            let Some(pkg) = self.packages.get_mut(&package) else { continue };
            let outcome = pkg
                .transactional_vars_mut()
                .get_mut(&variable)
                .map(|var| var.release(parent_level, has_parent_frame, is_top));
            match outcome {
                Some(ReleaseOutcome::Destroyed) => {
                    pkg.transactional_vars_mut().remove(&variable);
                    self.cursors.terminate_for_variable(&package, &variable);
                }
                Some(ReleaseOutcome::Kept { promoted_to_parent: true }) => {
                    self.changes.mark_variable(&package, &variable);
                }
                _ => {}
            }
        }
        for package in frame.changed_packages {
            let Some(pkg) = self.packages.get_mut(&package) else { continue };
            match pkg.release(parent_level, has_parent_frame, is_top) {
                ReleaseOutcome::Destroyed => {
                    self.packages.remove(&package);
                    self.cursors.terminate_for_package(&package);
                }
                ReleaseOutcome::Kept { promoted_to_parent: true } => {
                    self.changes.mark_package(&package);
                }
                ReleaseOutcome::Kept { promoted_to_parent: false } => {}
            }
        }
        self.cursors.terminate_at_level(released_level);
    }

    fn process_rollback(&mut self, is_top: bool) {
        let Some(frame) = self.changes.pop_frame() else {
            return;
        };
        let rolled_back_level = self.current_level;
        let parent_level = if rolled_back_level.nest > 0 { rolled_back_level.parent() } else { Level::BASE };
        self.current_level = parent_level;

        for (package, variable) in &frame.changed_variables {
            if let Some(pkg) = self.packages.get_mut(package) {
                let destroyed = pkg
                    .transactional_vars_mut()
                    .get_mut(variable)
                    .map(|var| matches!(var.rollback(), RollbackOutcome::Destroyed))
                    .unwrap_or(false);
                if destroyed {
                    pkg.transactional_vars_mut().remove(variable);
                }
            }
            self.cursors.terminate_for_variable(package, variable);
        }
        for package in &frame.changed_packages {
            if let Some(pkg) = self.packages.get_mut(package) {
                match pkg.rollback(parent_level, is_top) {
                    PackageRollbackOutcome::Destroyed => {
                        self.packages.remove(package);
                        self.cursors.terminate_for_package(package);
                    }
                    PackageRollbackOutcome::Kept { promoted_to_parent: true } => {
                        self.changes.mark_package(package);
                    }
                    PackageRollbackOutcome::Kept { promoted_to_parent: false } => {}
                }
            }
        }
        self.cursors.terminate_at_level(rolled_back_level);
    }

    /// Enter a nested autonomous-transaction boundary (spec.md section 9,
    /// optional feature): save the changes stack, cursor registry, and
    /// package table, then install fresh empty ones.
    ///
    /// Simplification: the original swaps only the *transactional* portion
    /// of each package's state, leaving regular variables visible across
    /// the boundary. This implementation swaps the whole package table,
    /// which also hides regular variables for the boundary's duration —
    /// acceptable here since the feature is optional and unexercised by the
    /// default build; recorded in `DESIGN.md`.
    #[cfg(feature = "autonomous")]
    pub fn begin_autonomous(&mut self) {
        let frame = AutonomousFrame {
            packages: std::mem::take(&mut self.packages),
            changes: std::mem::take(&mut self.changes),
            cursors: self.cursors.suspend(),
        };
        self.autonomous_stack.push(frame);
        self.current_level = Level::at_nest(self.current_level.atx + 1, 0);
    }

    /// Exit the innermost autonomous boundary, restoring the saved state.
    #[cfg(feature = "autonomous")]
    pub fn end_autonomous(&mut self) {
        let frame = self
            .autonomous_stack
            .pop()
            .expect("end_autonomous called without a matching begin_autonomous");
        self.cursors.resume(frame.cursors);
        self.packages = frame.packages;
        let restored_nest = frame.changes.depth();
        self.changes = frame.changes;
        self.current_level = Level::at_nest(self.current_level.atx.saturating_sub(1), restored_nest);
    }
}

fn estimate_package_bytes(pkg: &Package) -> usize {
    let mut total = std::mem::size_of::<Package>();
    if let Some(regular) = pkg.regular_vars() {
        total += regular.values().map(estimate_variable_bytes).sum::<usize>();
    }
    total += pkg.transactional_vars().values().map(estimate_variable_bytes).sum::<usize>();
    total
}

fn estimate_variable_bytes(var: &Variable) -> usize {
    let base = std::mem::size_of::<Variable>();
    match var.current_body() {
        VariableBody::Scalar { .. } => base,
        VariableBody::Record(rs) => base + rs.len() * 64,
    }
}

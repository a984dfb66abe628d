//! Cursor-safety registry: keeps iterator scans alive across function calls
//! and terminates them on rollback or removal (spec.md section 4.5).

use packagevars_core::Level;
use std::cell::Cell;
use std::rc::Rc;

/// A handle a consumer holds for the lifetime of an open scan. Checking
/// [`ScanHandle::is_alive`] before each fetch is how the consumer observes
/// "this scan was terminated out from under me" without the registry
/// needing a back-pointer into the consumer's state.
#[derive(Debug, Clone)]
pub struct ScanHandle(Rc<Cell<bool>>);

impl ScanHandle {
    /// Whether this scan is still live. A fetch against a dead scan should
    /// behave as "done", never panic or read stale data.
    pub fn is_alive(&self) -> bool {
        self.0.get()
    }
}

#[derive(Debug)]
struct ScanEntry {
    id: u64,
    package: String,
    /// `None` for a scan over the top-level package hash.
    variable: Option<String>,
    level: Level,
    alive: Rc<Cell<bool>>,
}

/// Tracks every open iteration scan so it can be invalidated on rollback,
/// removal, or session-level teardown. Bounds the number of live
/// hash-sequence handles to `O(active_scans)` (spec.md section 5).
#[derive(Debug, Default)]
pub struct CursorRegistry {
    variables_stats: Vec<ScanEntry>,
    packages_stats: Vec<ScanEntry>,
    next_id: u64,
}

impl CursorRegistry {
    /// A fresh, empty registry.
    pub fn new() -> Self {
        CursorRegistry::default()
    }

    /// Register a new scan over a record variable's row set.
    pub fn open_variable_scan(&mut self, package: &str, variable: &str, level: Level) -> ScanHandle {
        let alive = Rc::new(Cell::new(true));
        let id = self.next_id;
        self.next_id += 1;
        self.variables_stats.push(ScanEntry {
            id,
            package: package.to_string(),
            variable: Some(variable.to_string()),
            level,
            alive: alive.clone(),
        });
        ScanHandle(alive)
    }

    /// Register a new scan over the top-level package hash (used by the
    /// packages-stats reporter and `list_packages_and_variables`).
    pub fn open_package_scan(&mut self, level: Level) -> ScanHandle {
        let alive = Rc::new(Cell::new(true));
        let id = self.next_id;
        self.next_id += 1;
        self.packages_stats.push(ScanEntry {
            id,
            package: String::new(),
            variable: None,
            level,
            alive: alive.clone(),
        });
        ScanHandle(alive)
    }

    /// Total number of live scans, of either kind.
    pub fn active_count(&self) -> usize {
        self.variables_stats.len() + self.packages_stats.len()
    }

    /// Terminate every live scan: executor-end, transaction commit, and
    /// transaction abort all call this (spec.md section 4.5).
    pub fn terminate_all(&mut self) {
        for entry in self.variables_stats.drain(..) {
            entry.alive.set(false);
        }
        for entry in self.packages_stats.drain(..) {
            entry.alive.set(false);
        }
    }

    /// Terminate scans whose open-level matches a finished subtransaction
    /// level (scans local to a rolled-back or committed nested scope go
    /// away regardless of commit/abort, since the scope that opened them no
    /// longer exists).
    pub fn terminate_at_level(&mut self, level: Level) {
        retain_terminating(&mut self.variables_stats, |e| e.level == level);
        retain_terminating(&mut self.packages_stats, |e| e.level == level);
    }

    /// Terminate every scan over a specific variable (it is about to be
    /// removed).
    pub fn terminate_for_variable(&mut self, package: &str, variable: &str) {
        retain_terminating(&mut self.variables_stats, |e| {
            e.package == package && e.variable.as_deref() == Some(variable)
        });
    }

    /// Terminate every variable-scan over a specific package (it is about
    /// to be removed; its regular arena is walked before being freed).
    pub fn terminate_for_package(&mut self, package: &str) {
        retain_terminating(&mut self.variables_stats, |e| e.package == package);
    }

    /// Save and clear the registry, returning what was saved, for entering
    /// an autonomous-transaction boundary (spec.md section 9): entries from
    /// the suspended scope are hidden, not destroyed.
    #[cfg(feature = "autonomous")]
    pub fn suspend(&mut self) -> CursorRegistry {
        std::mem::replace(self, CursorRegistry::new())
    }

    /// Restore a previously suspended registry on exit from an autonomous
    /// boundary, tearing down everything opened inside the boundary first.
    #[cfg(feature = "autonomous")]
    pub fn resume(&mut self, saved: CursorRegistry) {
        self.terminate_all();
        *self = saved;
    }

    #[cfg(test)]
    fn scan_ids(&self) -> Vec<u64> {
        self.variables_stats
            .iter()
            .chain(self.packages_stats.iter())
            .map(|e| e.id)
            .collect()
    }
}

fn retain_terminating<F: Fn(&ScanEntry) -> bool>(entries: &mut Vec<ScanEntry>, pred: F) {
    let mut i = 0;
    while i < entries.len() {
        if pred(&entries[i]) {
            let removed = entries.remove(i);
            removed.alive.set(false);
        } else {
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminate_all_kills_every_scan() {
        let mut reg = CursorRegistry::new();
        let h1 = reg.open_variable_scan("p", "v", Level::BASE);
        let h2 = reg.open_package_scan(Level::BASE);
        assert_eq!(reg.active_count(), 2);
        reg.terminate_all();
        assert!(!h1.is_alive());
        assert!(!h2.is_alive());
        assert_eq!(reg.active_count(), 0);
    }

    #[test]
    fn terminate_at_level_only_affects_that_level() {
        let mut reg = CursorRegistry::new();
        let outer = reg.open_variable_scan("p", "v", Level::BASE);
        let inner = reg.open_variable_scan("p", "v", Level::at_nest(0, 1));
        reg.terminate_at_level(Level::at_nest(0, 1));
        assert!(outer.is_alive());
        assert!(!inner.is_alive());
    }

    #[test]
    fn removing_a_variable_kills_only_its_scans() {
        let mut reg = CursorRegistry::new();
        let target = reg.open_variable_scan("p", "t", Level::BASE);
        let other = reg.open_variable_scan("p", "u", Level::BASE);
        reg.terminate_for_variable("p", "t");
        assert!(!target.is_alive());
        assert!(other.is_alive());
    }

    #[test]
    fn removing_a_package_kills_all_its_variable_scans() {
        let mut reg = CursorRegistry::new();
        let a = reg.open_variable_scan("p", "a", Level::BASE);
        let b = reg.open_variable_scan("p", "b", Level::BASE);
        let unrelated = reg.open_variable_scan("q", "c", Level::BASE);
        reg.terminate_for_package("p");
        assert!(!a.is_alive());
        assert!(!b.is_alive());
        assert!(unrelated.is_alive());
    }

    #[test]
    fn ids_are_unique_and_monotonic() {
        let mut reg = CursorRegistry::new();
        reg.open_variable_scan("p", "a", Level::BASE);
        reg.open_variable_scan("p", "b", Level::BASE);
        let ids = reg.scan_ids();
        assert_eq!(ids, vec![0, 1]);
    }
}

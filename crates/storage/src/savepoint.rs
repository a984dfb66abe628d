//! Generic savepoint-history mechanics (spec.md section 4.3).
//!
//! [`Variable`](crate::variable::Variable) and [`Package`](crate::package::Package)
//! each keep a stack of snapshots tagged with a [`Level`]. The decision
//! helpers and the create/release/rollback procedures are identical shape
//! for both, so they're written once here against the [`Snapshot`] trait
//! and specialized per object kind where package-specific survival rules
//! apply (see `package.rs`).

use packagevars_core::Level;

/// A single entry in an object's savepoint-history stack.
pub trait Snapshot {
    /// Nesting coordinate at which this snapshot was created.
    fn level(&self) -> Level;
    /// Retag this snapshot's nesting coordinate (used when a state is
    /// promoted or folded into its parent level).
    fn set_level(&mut self, level: Level);
    /// Whether this snapshot represents a live object.
    fn is_valid(&self) -> bool;
}

/// `top(states).level == current_level` (spec.md section 4.3).
pub fn changed_at_current_level<S: Snapshot>(states: &[S], current: Level) -> bool {
    states.last().map(|s| s.level() == current).unwrap_or(false)
}

/// Either a second state exists at `current_level - 1`, or the head is
/// already at `current_level - 1` (spec.md section 4.3).
pub fn changed_at_upper_level<S: Snapshot>(states: &[S], current: Level) -> bool {
    if current.nest == 0 {
        return false;
    }
    let parent = current.parent();
    if states.len() >= 2 && states[states.len() - 2].level() == parent {
        return true;
    }
    matches!(states.last(), Some(head) if head.level() == parent)
}

/// Push a deep copy of the head, tagged at `current`. Caller must ensure
/// `!changed_at_current_level(states, current)` first — pushing twice at the
/// same level would violate invariant 2.
pub fn create_savepoint<S: Snapshot + Clone>(states: &mut Vec<S>, current: Level) {
    let mut new_head = states
        .last()
        .expect("an object must have at least one state before a savepoint can be taken")
        .clone();
    new_head.set_level(current);
    states.push(new_head);
}

/// Outcome of releasing (committing) the subtransaction that created the
/// head state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The object had no reason to survive the commit and was destroyed.
    Destroyed,
    /// The object's state stack was folded but the object survives.
    Kept {
        /// Whether the (now-folded) head was appended to the parent
        /// changes-stack frame — the caller must do the actual append,
        /// since this module doesn't know about the changes stack.
        promoted_to_parent: bool,
    },
}

/// Release the subtransaction that created `states`'s head (spec.md section
/// 4.3, "Release savepoint").
///
/// `parent_level` is the level the object's state will carry after this
/// call. `has_parent_frame` is whether a changes-stack frame still exists
/// below the one being popped (false at the final top-level commit).
/// `is_top` additionally forces destruction of an invalid head even when a
/// state remains beneath it, since there is no further level to fold an
/// invalid tombstone into once the enclosing transaction itself commits.
pub fn release<S: Snapshot + Clone>(
    states: &mut Vec<S>,
    parent_level: Level,
    has_parent_frame: bool,
    is_top: bool,
) -> ReleaseOutcome {
    let head_valid = states
        .last()
        .map(Snapshot::is_valid)
        .unwrap_or(false);
    if !head_valid && (states.len() <= 1 || is_top) {
        states.clear();
        return ReleaseOutcome::Destroyed;
    }
    if states.len() >= 2 && states[states.len() - 2].level() == parent_level {
        states.remove(states.len() - 2);
        states.last_mut().unwrap().set_level(parent_level);
        ReleaseOutcome::Kept {
            promoted_to_parent: false,
        }
    } else {
        states.last_mut().unwrap().set_level(parent_level);
        ReleaseOutcome::Kept {
            promoted_to_parent: has_parent_frame,
        }
    }
}

/// Outcome of rolling back (aborting) the subtransaction that created the
/// head state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackOutcome {
    /// Popping the head left no state at all; the object should be
    /// destroyed (it was born inside the aborted scope).
    Destroyed,
    /// A prior state remains; the object survives with it as the new head.
    Kept,
}

/// Roll back the subtransaction that created `states`'s head (spec.md
/// section 4.3, "Rollback savepoint"): pop it, freeing its value body.
pub fn rollback<S: Snapshot>(states: &mut Vec<S>) -> RollbackOutcome {
    states.pop();
    if states.is_empty() {
        RollbackOutcome::Destroyed
    } else {
        RollbackOutcome::Kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Snap {
        level: Level,
        valid: bool,
    }

    impl Snapshot for Snap {
        fn level(&self) -> Level {
            self.level
        }
        fn set_level(&mut self, level: Level) {
            self.level = level;
        }
        fn is_valid(&self) -> bool {
            self.valid
        }
    }

    fn snap(nest: u32, valid: bool) -> Snap {
        Snap {
            level: Level::at_nest(0, nest),
            valid,
        }
    }

    #[test]
    fn changed_at_current_level_checks_head_only() {
        let states = vec![snap(0, true), snap(1, true)];
        assert!(changed_at_current_level(&states, Level::at_nest(0, 1)));
        assert!(!changed_at_current_level(&states, Level::at_nest(0, 2)));
    }

    #[test]
    fn changed_at_upper_level_checks_second_from_top_or_head() {
        let two_states = vec![snap(0, true), snap(1, true)];
        assert!(changed_at_upper_level(&two_states, Level::at_nest(0, 2)));

        let one_state = vec![snap(0, true)];
        assert!(changed_at_upper_level(&one_state, Level::at_nest(0, 1)));
        assert!(!changed_at_upper_level(&one_state, Level::at_nest(0, 2)));
    }

    #[test]
    fn release_folds_two_levels_into_one() {
        let mut states = vec![snap(0, true), snap(1, true)];
        let outcome = release(&mut states, Level::at_nest(0, 0), false, true);
        assert_eq!(outcome, ReleaseOutcome::Kept { promoted_to_parent: false });
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].level, Level::at_nest(0, 0));
    }

    #[test]
    fn release_promotes_when_parent_untouched() {
        let mut states = vec![snap(1, true)];
        let outcome = release(&mut states, Level::at_nest(0, 0), true, false);
        assert_eq!(outcome, ReleaseOutcome::Kept { promoted_to_parent: true });
        assert_eq!(states[0].level, Level::at_nest(0, 0));
    }

    #[test]
    fn release_destroys_invalid_head_with_nothing_beneath() {
        let mut states = vec![snap(1, false)];
        let outcome = release(&mut states, Level::at_nest(0, 0), false, false);
        assert_eq!(outcome, ReleaseOutcome::Destroyed);
        assert!(states.is_empty());
    }

    #[test]
    fn release_destroys_invalid_head_at_top_level_even_with_state_beneath() {
        let mut states = vec![snap(0, true), snap(1, false)];
        let outcome = release(&mut states, Level::at_nest(0, 0), false, true);
        assert_eq!(outcome, ReleaseOutcome::Destroyed);
    }

    #[test]
    fn rollback_pops_head() {
        let mut states = vec![snap(0, true), snap(1, true)];
        assert_eq!(rollback(&mut states), RollbackOutcome::Kept);
        assert_eq!(states.len(), 1);
        assert_eq!(rollback(&mut states), RollbackOutcome::Destroyed);
        assert!(states.is_empty());
    }
}

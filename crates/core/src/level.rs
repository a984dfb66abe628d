//! The `(atx_level, nest_level)` pair tagging every savepoint history entry.
//!
//! `nest_level` counts subtransaction nesting depth (0 = no enclosing
//! transaction). `atx_level` counts nested autonomous-transaction depth
//! (spec.md section 9); it stays at 0 unless the `autonomous` feature is
//! exercised by an embedder, at which point every comparison here already
//! accounts for it, so no call site needs a feature gate.

use std::cmp::Ordering;

/// Nesting coordinate of a savepoint-history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Level {
    /// Autonomous-transaction nesting depth.
    pub atx: u32,
    /// Subtransaction nesting depth within the current autonomous scope.
    pub nest: u32,
}

impl Level {
    /// The base level: no enclosing transaction, no autonomous scope.
    pub const BASE: Level = Level { atx: 0, nest: 0 };

    /// Construct a level at the given nest depth, same autonomous scope.
    pub fn at_nest(atx: u32, nest: u32) -> Self {
        Level { atx, nest }
    }

    /// The level one subtransaction shallower than `self`, within the same
    /// autonomous scope. Panics if called on a level with `nest == 0`
    /// (callers must check `self.nest > 0` first; there is no parent level
    /// at the base of an autonomous scope).
    pub fn parent(&self) -> Level {
        debug_assert!(self.nest > 0, "level {self:?} has no parent within its autonomous scope");
        Level {
            atx: self.atx,
            nest: self.nest.saturating_sub(1),
        }
    }
}

impl PartialOrd for Level {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Level {
    /// Lexicographic on `(atx, nest)`: a deeper autonomous scope always
    /// outranks any nest depth in a shallower one.
    fn cmp(&self, other: &Self) -> Ordering {
        (self.atx, self.nest).cmp(&(other.atx, other.nest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_is_zero() {
        assert_eq!(Level::BASE, Level { atx: 0, nest: 0 });
    }

    #[test]
    fn parent_decrements_nest_only() {
        let l = Level::at_nest(2, 3);
        assert_eq!(l.parent(), Level::at_nest(2, 2));
    }

    #[test]
    fn ordering_prefers_atx_over_nest() {
        assert!(Level::at_nest(1, 0) > Level::at_nest(0, 100));
    }
}

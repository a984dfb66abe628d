//! Savepoint-history entries (spec.md section 3, `VariableState` / `PackageState`).

use crate::record::RecordSet;
use crate::savepoint::Snapshot;
use packagevars_core::{Level, TypeId, Value};

/// The value body of a variable: scalar or record, dispatched on this tag
/// rather than on scattered boolean flags (spec.md section 9, "Dynamic
/// dispatch").
#[derive(Debug, Clone)]
pub enum VariableBody {
    /// A single scalar datum, plus its declared type (kept even when the
    /// value is null so type checks still apply).
    Scalar {
        /// The declared type of this variable.
        type_id: TypeId,
        /// The current value, or a typed null.
        value: Value,
    },
    /// A keyed row set.
    Record(RecordSet),
}

impl VariableBody {
    /// Human-readable kind, for [`packagevars_core::PgVarsError::KindMismatch`].
    pub fn kind_name(&self) -> &'static str {
        match self {
            VariableBody::Scalar { .. } => "scalar",
            VariableBody::Record(_) => "record",
        }
    }

    /// Deep copy this body, as required when pushing a new savepoint
    /// (spec.md section 4.3, "Create savepoint"): scalars clone by value;
    /// records get a freshly built row table.
    pub fn deep_copy(&self) -> VariableBody {
        self.clone()
    }
}

/// One entry in a transactional variable's savepoint-history stack.
#[derive(Debug, Clone)]
pub struct VariableState {
    /// The value body as of this snapshot.
    pub body: VariableBody,
    /// Whether this snapshot represents a live (non-removed) variable.
    pub valid: bool,
    /// Nesting coordinate at which this snapshot was created.
    pub level: Level,
}

/// One entry in a package's savepoint-history stack.
#[derive(Debug, Clone, Copy)]
pub struct PackageState {
    /// Whether the package is considered to exist at this snapshot.
    pub valid: bool,
    /// Nesting coordinate at which this snapshot was created.
    pub level: Level,
    /// Count of transactional variables with a valid head state, as of this
    /// snapshot (spec.md invariant 4).
    pub trans_var_num: usize,
}

impl PackageState {
    /// The initial state of a freshly created package.
    pub fn initial(level: Level) -> Self {
        PackageState {
            valid: true,
            level,
            trans_var_num: 0,
        }
    }
}

impl Snapshot for VariableState {
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

impl Snapshot for PackageState {
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

//! Object model, record table, savepoint history, changes stack, and cursor
//! registry for a packagevars session (spec.md section 4).
//!
//! [`store::Store`] is the session-lifetime singleton that ties the other
//! modules together. Everything under this crate is oblivious to the
//! callable-surface verbs (set/get/insert/...) — those live in
//! `packagevars-engine`, which drives this crate's primitives.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod changes;
pub mod config;
pub mod cursor;
pub mod package;
pub mod record;
pub mod savepoint;
pub mod state;
pub mod store;
pub mod variable;

pub use changes::{ChangesStack, ChangesStackFrame};
pub use config::StoreConfig;
pub use cursor::{CursorRegistry, ScanHandle};
pub use package::{Package, PackageRollbackOutcome};
pub use record::RecordSet;
pub use savepoint::{ReleaseOutcome, RollbackOutcome, Snapshot};
pub use state::{PackageState, VariableBody, VariableState};
pub use store::{PackageSummary, Store, VariableSummary};
pub use variable::Variable;

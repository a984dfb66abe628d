//! Session-scoped transactional key-value store organized into named
//! packages of named variables.
//!
//! This crate is a thin aggregate over its members:
//! - [`packagevars_core`] — `Value`, `Row`, `Level`, `PgVarsError`.
//! - [`packagevars_arena`] — the owning region allocator backing each
//!   package's regular-variable storage.
//! - [`packagevars_store`] — the object model, savepoint history, changes
//!   stack, and cursor registry.
//! - [`packagevars_engine`] — [`Session`], the callable surface, and the
//!   host transaction-lifecycle hooks.
//! - [`packagevars_api`] — serde-friendly DTOs for embedding a [`Session`]
//!   behind a network or CLI boundary.
//!
//! Most embedders only need [`Session`] and [`StoreConfig`], re-exported
//! here at the crate root.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use packagevars_api as api;
pub use packagevars_arena as arena;
pub use packagevars_core as core;
pub use packagevars_engine as engine;
pub use packagevars_store as store;

pub use packagevars_core::{type_ids, KeyArray, Level, PgVarsError, Result, Row, RowDescriptor, TypeId, Value};
pub use packagevars_engine::{RowCursor, Session};
pub use packagevars_store::StoreConfig;

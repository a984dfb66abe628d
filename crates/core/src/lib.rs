//! Core types shared across the packagevars store.
//!
//! This crate defines the vocabulary every other crate in the workspace
//! builds on:
//! - [`Value`]: the scalar datum type a variable or row column can hold.
//! - [`RowDescriptor`] / [`Row`]: the shape of a record variable's rows.
//! - [`Level`]: the `(atx_level, nest_level)` pair tagging every savepoint
//!   history entry.
//! - [`PgVarsError`]: the single error type surfaced to callers.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod level;
pub mod limits;
pub mod value;

pub use error::{PgVarsError, Result};
pub use level::Level;
pub use limits::{validate_name, MAX_NAME_LENGTH};
pub use value::{type_ids, ColumnDesc, KeyArray, Row, RowDescriptor, TypeId, Value};

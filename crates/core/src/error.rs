//! Error types for the packagevars store.
//!
//! One variant per user-visible failure kind in spec section 7, plus an
//! `Internal` variant for invariant violations that indicate a bug rather
//! than caller misuse. `Internal` errors are logged at `error!` before
//! being returned so they stay visible in host logs even though the
//! engine's abort path never raises them to a well-behaved caller.

use crate::value::TypeId;
use thiserror::Error;

/// Result type alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, PgVarsError>;

/// Unified error type for all packagevars operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PgVarsError {
    /// A required argument was null, overlong, or otherwise malformed.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// `strict` lookup of a package that does not exist (or is not valid).
    #[error("unknown package \"{0}\"")]
    UnknownPackage(String),

    /// `strict` lookup of a variable that does not exist (or is not valid).
    #[error("unknown variable \"{package}.{name}\"")]
    UnknownVariable {
        /// Owning package name.
        package: String,
        /// Variable name.
        name: String,
    },

    /// Stored variable's type does not match the type requested by the caller.
    #[error("type mismatch for \"{package}.{name}\": expected type {expected}, got {actual}")]
    TypeMismatch {
        /// Owning package name.
        package: String,
        /// Variable name.
        name: String,
        /// Type the caller requested.
        expected: TypeId,
        /// Type actually stored.
        actual: TypeId,
    },

    /// Stored variable is scalar but a record operation was requested, or
    /// vice versa.
    #[error("kind mismatch for \"{package}.{name}\": expected {expected}, got {actual}")]
    KindMismatch {
        /// Owning package name.
        package: String,
        /// Variable name.
        name: String,
        /// Kind the caller expected ("scalar" or "record").
        expected: &'static str,
        /// Kind actually stored.
        actual: &'static str,
    },

    /// A variable already exists with the opposite transactional-ness.
    #[error("variable \"{package}.{name}\" already exists as a {existing} variable")]
    TransactionalityConflict {
        /// Owning package name.
        package: String,
        /// Variable name.
        name: String,
        /// Description of the existing variable's transactionality.
        existing: &'static str,
    },

    /// The operation is not supported in this call context (for example, a
    /// multidimensional key array passed to a by-keys lookup).
    #[error("feature not supported: {0}")]
    FeatureNotSupported(String),

    /// An internal invariant was violated. This is always a bug in this
    /// crate, never a caller error.
    #[error("internal invariant violation: {0}")]
    Internal(String),
}

impl PgVarsError {
    /// Build an [`PgVarsError::Internal`], logging it at `error!` first so the
    /// violation is visible in host logs even when the caller only sees a
    /// generic failure.
    pub fn internal(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::error!(target: "packagevars", "internal invariant violation: {msg}");
        PgVarsError::Internal(msg)
    }
}

//! The callable surface's lazy-sequence result type for row-returning
//! verbs (spec.md section 6, "select rows" / "select rows by keys").

use packagevars_core::Row;
use packagevars_store::ScanHandle;

/// A lazy sequence of rows, backed by a cursor-registry scan handle.
///
/// Rows are snapshotted eagerly at open time (this is an in-process store,
/// not a host query executor with true pull-based fetch), but the handle
/// still governs iteration: once the scan is terminated — by a rollback,
/// by removal of the underlying variable, or by `executor_end` — further
/// calls to [`RowCursor::next`] report "done" rather than returning stale
/// rows, matching spec.md section 4.5's fetch-after-terminate contract.
pub struct RowCursor {
    handle: ScanHandle,
    rows: std::vec::IntoIter<Row>,
}

impl RowCursor {
    pub(crate) fn new(handle: ScanHandle, rows: Vec<Row>) -> Self {
        RowCursor {
            handle,
            rows: rows.into_iter(),
        }
    }

    /// Whether the backing scan is still registered.
    pub fn is_alive(&self) -> bool {
        self.handle.is_alive()
    }
}

impl Iterator for RowCursor {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        if !self.handle.is_alive() {
            return None;
        }
        self.rows.next()
    }
}

//! The row cursor contract
//!
//! A `Scan` is a stateful, single-pass cursor over a relation. It is
//! created by a plan's `open()`, positioned before the first row, advanced
//! by repeated `next()` calls until `false`, and then closed. Scans that
//! support re-entering a group of rows (sort, hash join) expose their own
//! save/restore methods on the concrete type.

use crate::record::Rid;

use super::constant::Constant;
use super::errors::{QueryError, QueryResult};

/// A cursor over the rows produced by a plan.
pub trait Scan {
    /// Positions the scan before its first row
    fn before_first(&mut self) -> QueryResult<()>;

    /// Advances to the next row; returns false when the scan is exhausted
    fn next(&mut self) -> QueryResult<bool>;

    /// Returns the value of the named field in the current row
    fn get_val(&self, field: &str) -> QueryResult<Constant>;

    /// Returns true if the scan's output contains the named field
    fn has_field(&self, field: &str) -> bool;

    /// Returns the integer value of the named field
    fn get_int(&self, field: &str) -> QueryResult<i32> {
        self.get_val(field)?
            .as_int()
            .ok_or_else(|| QueryError::not_an_int(field))
    }

    /// Returns the string value of the named field
    fn get_string(&self, field: &str) -> QueryResult<String> {
        match self.get_val(field)? {
            Constant::Str(s) => Ok(s),
            Constant::Int(_) => Err(QueryError::not_a_string(field)),
        }
    }

    /// Releases the scan's resources.
    ///
    /// Every opened scan must be closed on all exit paths; operators that
    /// own child scans close them here.
    fn close(&mut self) {}
}

/// A scan over a modifiable relation (tables and temp tables).
pub trait UpdateScan: Scan {
    /// Assigns the named field in the current row
    fn set_val(&mut self, field: &str, val: Constant) -> QueryResult<()>;

    /// Appends a new row and positions the scan on it
    fn insert(&mut self) -> QueryResult<()>;

    /// Returns the RID of the current row
    fn rid(&self) -> QueryResult<Rid>;

    /// Repositions the scan on the row with the given RID
    fn move_to_rid(&mut self, rid: Rid) -> QueryResult<()>;
}

//! The plan contract

use crate::query::{QueryResult, Scan};
use crate::record::Schema;

/// A cost-estimating, schema-bearing factory of scans.
///
/// Estimates are closed-form approximations under uniformity and
/// independence assumptions; they are available without executing the
/// query and are never exact counts.
pub trait Plan {
    /// Opens a cursor over the plan's output
    fn open(&self) -> QueryResult<Box<dyn Scan>>;

    /// Estimated number of block accesses to compute the output
    fn blocks_accessed(&self) -> usize;

    /// Estimated number of rows in the output
    fn records_output(&self) -> usize;

    /// Estimated number of distinct values of the field in the output
    fn distinct_values(&self, field: &str) -> usize;

    /// The output schema
    fn schema(&self) -> &Schema;

    /// Clones the plan behind its trait object.
    ///
    /// The planner builds several candidate plans over the same partial
    /// join tree; each candidate owns its own copy.
    fn clone_box(&self) -> Box<dyn Plan>;
}

impl Clone for Box<dyn Plan> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

//! Index metadata and cost estimates
//!
//! `IndexInfo` is how the planner sees an index: which table and field it
//! covers, how expensive a probe is, and an already-opened handle to the
//! index structure itself. Estimates are derived from the table's stats
//! at construction time so repeated planning passes stay deterministic.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::query::{CompareOp, Constant, QueryResult};
use crate::record::Rid;

use super::hash::NUM_BUCKETS;

/// Ordered traversal or flat bucket lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexType {
    BTree,
    Hash,
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexType::BTree => write!(f, "btree"),
            IndexType::Hash => write!(f, "hash"),
        }
    }
}

/// Cursor-style access to an index structure.
///
/// `before_first` positions the cursor for a probe, `next` advances to
/// the next matching entry, and `data_rid` reports where the matching
/// row lives in its table.
pub trait Index {
    fn before_first(&mut self, op: CompareOp, key: &Constant) -> QueryResult<()>;
    fn next(&mut self) -> QueryResult<bool>;
    fn data_rid(&self) -> QueryResult<Rid>;
    fn insert(&mut self, key: Constant, rid: Rid) -> QueryResult<()>;
}

/// Everything the planner needs to weigh an index against a scan.
#[derive(Clone)]
pub struct IndexInfo {
    table: String,
    field: String,
    index_type: IndexType,
    handle: Rc<RefCell<dyn Index>>,
    table_rows: usize,
    table_blocks: usize,
    field_distinct: usize,
}

impl IndexInfo {
    pub fn new(
        table: impl Into<String>,
        field: impl Into<String>,
        index_type: IndexType,
        handle: Rc<RefCell<dyn Index>>,
        table_rows: usize,
        table_blocks: usize,
        field_distinct: usize,
    ) -> Self {
        Self {
            table: table.into(),
            field: field.into(),
            index_type,
            handle,
            table_rows,
            table_blocks,
            field_distinct: field_distinct.max(1),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn index_type(&self) -> IndexType {
        self.index_type
    }

    /// The shared index structure this metadata describes.
    pub fn open(&self) -> Rc<RefCell<dyn Index>> {
        Rc::clone(&self.handle)
    }

    /// Page reads for one probe: tree height for a B-tree, one bucket's
    /// share of the table for a hash index.
    pub fn blocks_accessed(&self) -> usize {
        match self.index_type {
            IndexType::BTree => 1 + self.table_blocks.max(1).ilog2() as usize,
            IndexType::Hash => (self.table_blocks / NUM_BUCKETS).max(1),
        }
    }

    /// Matching rows for one equality probe, assuming keys spread evenly
    /// across the field's distinct values.
    pub fn records_output(&self) -> usize {
        (self.table_rows / self.field_distinct).max(1)
    }

    pub fn distinct_values(&self, field: &str) -> usize {
        if field == self.field {
            1
        } else {
            self.field_distinct
        }
    }
}

impl fmt::Debug for IndexInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexInfo")
            .field("table", &self.table)
            .field("field", &self.field)
            .field("index_type", &self.index_type)
            .field("table_rows", &self.table_rows)
            .field("table_blocks", &self.table_blocks)
            .field("field_distinct", &self.field_distinct)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::BTreeIndex;

    fn info(index_type: IndexType, rows: usize, blocks: usize, distinct: usize) -> IndexInfo {
        let handle: Rc<RefCell<dyn Index>> = Rc::new(RefCell::new(BTreeIndex::new(16)));
        IndexInfo::new("t", "f", index_type, handle, rows, blocks, distinct)
    }

    #[test]
    fn btree_probe_cost_grows_with_height() {
        let small = info(IndexType::BTree, 100, 1, 10);
        let large = info(IndexType::BTree, 100_000, 1024, 10);
        assert_eq!(small.blocks_accessed(), 1);
        assert_eq!(large.blocks_accessed(), 11);
    }

    #[test]
    fn probe_output_is_rows_per_distinct_key() {
        let ii = info(IndexType::Hash, 90, 8, 9);
        assert_eq!(ii.records_output(), 10);
        assert_eq!(ii.distinct_values("f"), 1);
        assert_eq!(ii.distinct_values("other"), 9);
    }
}

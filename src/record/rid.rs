//! Record identifiers

/// Identifies a record by its block number and slot within the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rid {
    /// Block number within the table file
    pub block: usize,
    /// Slot within the block
    pub slot: usize,
}

impl Rid {
    /// Creates a new record identifier
    pub fn new(block: usize, slot: usize) -> Self {
        Self { block, slot }
    }

    /// Converts a flat row index into a RID for the given block capacity
    pub fn from_index(index: usize, rows_per_block: usize) -> Self {
        Self {
            block: index / rows_per_block,
            slot: index % rows_per_block,
        }
    }

    /// Converts the RID back into a flat row index
    pub fn to_index(self, rows_per_block: usize) -> usize {
        self.block * rows_per_block + self.slot
    }
}

impl std::fmt::Display for Rid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.block, self.slot)
    }
}

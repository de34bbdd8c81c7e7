//! Execution configuration
//!
//! All sizing knobs are explicit values threaded through the transaction
//! handle. Plans and indexes never read ambient state, so the same query
//! over the same catalog always produces the same plan.

/// Sizing parameters for plan cost estimation and index layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionConfig {
    /// Rows per storage block, used for block-count estimates and RIDs
    pub rows_per_block: usize,
    /// Buffers the storage layer makes available to one transaction;
    /// bounds hash-partition fan-out and sort-merge pass estimates
    pub available_buffs: usize,
    /// Entries per B-tree page before a split is forced
    pub btree_page_capacity: usize,
}

impl ExecutionConfig {
    /// Returns the number of blocks needed to hold the given row count
    pub fn blocks_for(&self, rows: usize) -> usize {
        rows.div_ceil(self.rows_per_block).max(1)
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            rows_per_block: 16,
            available_buffs: 8,
            btree_page_capacity: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_for_rounds_up() {
        let cfg = ExecutionConfig {
            rows_per_block: 4,
            ..Default::default()
        };
        assert_eq!(cfg.blocks_for(0), 1);
        assert_eq!(cfg.blocks_for(4), 1);
        assert_eq!(cfg.blocks_for(5), 2);
    }
}

//! Transaction handle
//!
//! A cheap-to-clone handle over the catalog, carrying the execution
//! configuration. Plans hold a clone; all catalog access goes through it.
//! Locking and durability belong to the storage layer proper, which this
//! in-memory substrate stands in for.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::index::IndexInfo;
use crate::query::QueryResult;

use super::catalog::{Catalog, TableData};
use super::config::ExecutionConfig;
use super::stats::TableStats;

/// Handle through which plans and scans reach storage.
#[derive(Clone)]
pub struct Transaction {
    catalog: Rc<RefCell<Catalog>>,
    config: ExecutionConfig,
}

impl Transaction {
    /// Creates a transaction over the given catalog
    pub fn new(catalog: Rc<RefCell<Catalog>>, config: ExecutionConfig) -> Self {
        Self { catalog, config }
    }

    /// Returns the buffer count available to this transaction
    pub fn available_buffs(&self) -> usize {
        self.config.available_buffs
    }

    /// Returns the execution configuration
    pub fn config(&self) -> ExecutionConfig {
        self.config
    }

    /// Looks up a table by name
    pub fn table(&self, name: &str) -> QueryResult<TableData> {
        self.catalog.borrow().table(name)
    }

    /// Returns fresh statistics for the named table
    pub fn stats(&self, name: &str) -> QueryResult<TableStats> {
        self.catalog.borrow().stats(name)
    }

    /// Returns cost-annotated index metadata for the named table, keyed
    /// by indexed field in deterministic order.
    pub fn index_info(&self, table: &str) -> QueryResult<BTreeMap<String, IndexInfo>> {
        let stats = self.stats(table)?;
        let blocks = self.config.blocks_for(stats.num_rows());
        let entries = self.catalog.borrow().indexes_on(table);
        let mut out = BTreeMap::new();
        for (field, entry) in entries {
            let info = IndexInfo::new(
                table,
                &entry.field,
                entry.index_type,
                entry.handle,
                stats.num_rows(),
                blocks,
                stats.distinct_values(&field),
            );
            out.insert(field, info);
        }
        Ok(out)
    }

    /// Issues the next engine-generated temp table name
    pub fn next_temp_name(&self) -> String {
        self.catalog.borrow_mut().next_temp_name()
    }
}

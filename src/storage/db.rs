//! Session database
//!
//! Fixture-friendly front door over the catalog: create tables, load
//! rows, build indexes, open transactions.

use std::cell::RefCell;
use std::rc::Rc;

use crate::index::{BTreeIndex, HashIndex, Index, IndexType};
use crate::query::{Constant, QueryResult};
use crate::record::{Rid, Row, Schema};

use super::catalog::Catalog;
use super::config::ExecutionConfig;
use super::transaction::Transaction;

/// An in-memory database session.
pub struct Db {
    catalog: Rc<RefCell<Catalog>>,
    config: ExecutionConfig,
}

impl Db {
    /// Creates an empty database with the given configuration
    pub fn new(config: ExecutionConfig) -> Self {
        Self {
            catalog: Rc::new(RefCell::new(Catalog::new())),
            config,
        }
    }

    /// Creates an empty database with default sizing
    pub fn with_defaults() -> Self {
        Self::new(ExecutionConfig::default())
    }

    /// Creates a table with the given schema
    pub fn create_table(&mut self, name: impl Into<String>, schema: Schema) {
        self.catalog.borrow_mut().create_table(name, schema);
    }

    /// Appends a row to the named table.
    ///
    /// Any index already registered on the table is updated with the new
    /// row's RID.
    pub fn insert(&mut self, table: &str, values: Vec<Constant>) -> QueryResult<()> {
        let data = self.catalog.borrow().table(table)?;
        let rid;
        {
            let mut rows = data.rows.borrow_mut();
            rid = Rid::from_index(rows.len(), self.config.rows_per_block);
            rows.push(Row::new(values));
        }
        let indexes = self.catalog.borrow().indexes_on(table);
        for (field, entry) in indexes {
            let idx = data
                .schema
                .index_of(&field)
                .ok_or_else(|| crate::query::QueryError::UnknownField(field.clone()))?;
            let rows = data.rows.borrow();
            let key = rows[rid.to_index(self.config.rows_per_block)]
                .get(idx)
                .cloned()
                .ok_or(crate::query::QueryError::NotPositioned)?;
            drop(rows);
            entry.handle.borrow_mut().insert(key, rid)?;
        }
        Ok(())
    }

    /// Builds a B-tree index over an existing table field
    pub fn create_btree_index(&mut self, table: &str, field: &str) -> QueryResult<()> {
        let handle: Rc<RefCell<dyn Index>> = Rc::new(RefCell::new(BTreeIndex::new(
            self.config.btree_page_capacity,
        )));
        self.build_index(table, field, IndexType::BTree, handle)
    }

    /// Builds a hash index over an existing table field
    pub fn create_hash_index(&mut self, table: &str, field: &str) -> QueryResult<()> {
        let handle: Rc<RefCell<dyn Index>> = Rc::new(RefCell::new(HashIndex::new()));
        self.build_index(table, field, IndexType::Hash, handle)
    }

    fn build_index(
        &mut self,
        table: &str,
        field: &str,
        index_type: IndexType,
        handle: Rc<RefCell<dyn Index>>,
    ) -> QueryResult<()> {
        let data = self.catalog.borrow().table(table)?;
        let idx = data
            .schema
            .index_of(field)
            .ok_or_else(|| crate::query::QueryError::UnknownField(field.to_string()))?;
        {
            let rows = data.rows.borrow();
            let mut index = handle.borrow_mut();
            for (i, row) in rows.iter().enumerate() {
                let key = row
                    .get(idx)
                    .cloned()
                    .ok_or(crate::query::QueryError::NotPositioned)?;
                index.insert(key, Rid::from_index(i, self.config.rows_per_block))?;
            }
        }
        self.catalog
            .borrow_mut()
            .register_index(table, field, index_type, handle);
        Ok(())
    }

    /// Opens a transaction over this database
    pub fn transaction(&self) -> Transaction {
        Transaction::new(Rc::clone(&self.catalog), self.config)
    }
}

//! Table catalog
//!
//! Owns the named tables, their rows, and the index registry. Shared
//! between all plans of a session through `Rc`; execution is
//! single-threaded and pull-based, so interior mutability is sufficient.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::index::{Index, IndexType};
use crate::query::{QueryError, QueryResult};
use crate::record::{Row, Schema};

use super::stats::TableStats;

/// A table's schema and row storage, shared with every open scan.
#[derive(Clone)]
pub struct TableData {
    /// Field definitions
    pub schema: Rc<Schema>,
    /// Row storage; scans borrow per call, never across calls
    pub rows: Rc<RefCell<Vec<Row>>>,
}

/// One registered index on a table field.
#[derive(Clone)]
pub struct IndexEntry {
    pub field: String,
    pub index_type: IndexType,
    pub handle: Rc<RefCell<dyn Index>>,
}

/// The session catalog: tables, statistics, and indexes.
#[derive(Default)]
pub struct Catalog {
    tables: HashMap<String, TableData>,
    indexes: HashMap<String, BTreeMap<String, IndexEntry>>,
    temp_count: u64,
}

impl Catalog {
    /// Creates an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new table with the given schema
    pub fn create_table(&mut self, name: impl Into<String>, schema: Schema) {
        self.tables.insert(
            name.into(),
            TableData {
                schema: Rc::new(schema),
                rows: Rc::new(RefCell::new(Vec::new())),
            },
        );
    }

    /// Looks up a table by name
    pub fn table(&self, name: &str) -> QueryResult<TableData> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| QueryError::UnknownTable(name.to_string()))
    }

    /// Computes fresh statistics for the named table
    pub fn stats(&self, name: &str) -> QueryResult<TableStats> {
        let data = self.table(name)?;
        let rows = data.rows.borrow();
        Ok(TableStats::from_rows(&data.schema, &rows))
    }

    /// Registers an index on a table field.
    ///
    /// Fields iterate in `BTreeMap` order so index selection is
    /// deterministic.
    pub fn register_index(
        &mut self,
        table: &str,
        field: &str,
        index_type: IndexType,
        handle: Rc<RefCell<dyn Index>>,
    ) {
        self.indexes.entry(table.to_string()).or_default().insert(
            field.to_string(),
            IndexEntry {
                field: field.to_string(),
                index_type,
                handle,
            },
        );
    }

    /// Returns the indexes registered on the named table
    pub fn indexes_on(&self, table: &str) -> BTreeMap<String, IndexEntry> {
        self.indexes.get(table).cloned().unwrap_or_default()
    }

    /// Issues the next engine-generated temp table name
    pub fn next_temp_name(&mut self) -> String {
        self.temp_count += 1;
        format!("temp{}", self.temp_count)
    }
}

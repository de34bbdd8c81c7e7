//! Temporary tables
//!
//! A `TempTable` is a private row store with a catalog-issued name.
//! Materializing operators write into one through an update scan and
//! read it back through ordinary scans; nothing outside the operator
//! ever sees it.

use std::cell::RefCell;
use std::rc::Rc;

use crate::query::{Constant, QueryError, QueryResult, Scan, UpdateScan};
use crate::record::{Rid, Row, Schema};
use crate::storage::Transaction;

pub struct TempTable {
    name: String,
    schema: Rc<Schema>,
    rows: Rc<RefCell<Vec<Row>>>,
    rows_per_block: usize,
}

impl TempTable {
    pub fn new(tx: &Transaction, schema: &Schema) -> Self {
        Self {
            name: tx.next_temp_name(),
            schema: Rc::new(schema.clone()),
            rows: Rc::new(RefCell::new(Vec::new())),
            rows_per_block: tx.config().rows_per_block,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn num_rows(&self) -> usize {
        self.rows.borrow().len()
    }

    pub fn open(&self) -> TempScan {
        TempScan {
            schema: Rc::clone(&self.schema),
            rows: Rc::clone(&self.rows),
            rows_per_block: self.rows_per_block,
            pos: None,
        }
    }

}

pub struct TempScan {
    schema: Rc<Schema>,
    rows: Rc<RefCell<Vec<Row>>>,
    rows_per_block: usize,
    pos: Option<usize>,
}

impl TempScan {
    /// Cursor position as a flat row index, for later restore.
    pub fn position(&self) -> Option<usize> {
        self.pos
    }

    pub fn restore_position(&mut self, pos: Option<usize>) {
        self.pos = pos;
    }
}

impl Scan for TempScan {
    fn before_first(&mut self) -> QueryResult<()> {
        self.pos = None;
        Ok(())
    }

    fn next(&mut self) -> QueryResult<bool> {
        let next = self.pos.map_or(0, |p| p + 1);
        if next < self.rows.borrow().len() {
            self.pos = Some(next);
            Ok(true)
        } else {
            self.pos = Some(self.rows.borrow().len());
            Ok(false)
        }
    }

    fn get_val(&self, field: &str) -> QueryResult<Constant> {
        let idx = self
            .schema
            .index_of(field)
            .ok_or_else(|| QueryError::UnknownField(field.to_string()))?;
        let pos = self.pos.ok_or(QueryError::NotPositioned)?;
        let rows = self.rows.borrow();
        rows.get(pos)
            .and_then(|r| r.get(idx))
            .cloned()
            .ok_or(QueryError::NotPositioned)
    }

    fn has_field(&self, field: &str) -> bool {
        self.schema.has_field(field)
    }
}

impl UpdateScan for TempScan {
    fn set_val(&mut self, field: &str, val: Constant) -> QueryResult<()> {
        let idx = self
            .schema
            .index_of(field)
            .ok_or_else(|| QueryError::UnknownField(field.to_string()))?;
        let pos = self.pos.ok_or(QueryError::NotPositioned)?;
        let mut rows = self.rows.borrow_mut();
        let row = rows.get_mut(pos).ok_or(QueryError::NotPositioned)?;
        row.set(idx, val);
        Ok(())
    }

    fn insert(&mut self) -> QueryResult<()> {
        let mut rows = self.rows.borrow_mut();
        rows.push(Row::zeroed(&self.schema));
        self.pos = Some(rows.len() - 1);
        Ok(())
    }

    fn rid(&self) -> QueryResult<Rid> {
        let pos = self.pos.ok_or(QueryError::NotPositioned)?;
        Ok(Rid::from_index(pos, self.rows_per_block))
    }

    fn move_to_rid(&mut self, rid: Rid) -> QueryResult<()> {
        let idx = rid.to_index(self.rows_per_block);
        if idx >= self.rows.borrow().len() {
            return Err(QueryError::NotPositioned);
        }
        self.pos = Some(idx);
        Ok(())
    }
}

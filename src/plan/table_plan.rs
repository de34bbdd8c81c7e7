//! Base table access
//!
//! `TablePlan` is the leaf of every plan tree: it reads a stored table
//! through the transaction handle and reports statistics straight from
//! the catalog.

use std::cell::RefCell;
use std::rc::Rc;

use crate::query::{Constant, QueryError, QueryResult, Scan, UpdateScan};
use crate::record::{Rid, Row, Schema};
use crate::storage::{TableStats, Transaction};

use super::plan::Plan;

/// A plan over a stored table.
#[derive(Clone)]
pub struct TablePlan {
    tx: Transaction,
    table: String,
    schema: Rc<Schema>,
    rows: Rc<RefCell<Vec<Row>>>,
    stats: TableStats,
}

impl TablePlan {
    /// Creates a plan over the named table, capturing its statistics
    pub fn new(tx: &Transaction, table: &str) -> QueryResult<Self> {
        let data = tx.table(table)?;
        let stats = tx.stats(table)?;
        Ok(Self {
            tx: tx.clone(),
            table: table.to_string(),
            schema: data.schema,
            rows: data.rows,
            stats,
        })
    }

    /// Returns the table name
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Opens the concrete table scan; index operators reposition it by RID
    pub fn open_table_scan(&self) -> TableScan {
        TableScan {
            schema: Rc::clone(&self.schema),
            rows: Rc::clone(&self.rows),
            rows_per_block: self.tx.config().rows_per_block,
            pos: None,
        }
    }
}

impl Plan for TablePlan {
    fn open(&self) -> QueryResult<Box<dyn Scan>> {
        Ok(Box::new(self.open_table_scan()))
    }

    fn blocks_accessed(&self) -> usize {
        self.tx.config().blocks_for(self.stats.num_rows())
    }

    fn records_output(&self) -> usize {
        self.stats.num_rows()
    }

    fn distinct_values(&self, field: &str) -> usize {
        self.stats.distinct_values(field)
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn clone_box(&self) -> Box<dyn Plan> {
        Box::new(self.clone())
    }
}

/// Cursor over a stored table's rows in RID order.
pub struct TableScan {
    schema: Rc<Schema>,
    rows: Rc<RefCell<Vec<Row>>>,
    rows_per_block: usize,
    pos: Option<usize>,
}

impl Scan for TableScan {
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

impl UpdateScan for TableScan {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Db;

    fn dept_db() -> Db {
        let mut db = Db::with_defaults();
        let mut sch = Schema::new();
        sch.add_int_field("did");
        sch.add_string_field("dname", 10);
        db.create_table("dept", sch);
        db.insert("dept", vec![Constant::Int(10), Constant::from("cs")])
            .unwrap();
        db.insert("dept", vec![Constant::Int(20), Constant::from("ee")])
            .unwrap();
        db
    }

    #[test]
    fn test_scan_visits_all_rows() {
        let db = dept_db();
        let tx = db.transaction();
        let plan = TablePlan::new(&tx, "dept").unwrap();
        let mut s = plan.open().unwrap();
        s.before_first().unwrap();

        let mut dids = Vec::new();
        while s.next().unwrap() {
            dids.push(s.get_int("did").unwrap());
        }
        s.close();
        assert_eq!(dids, vec![10, 20]);
    }

    #[test]
    fn test_move_to_rid() {
        let db = dept_db();
        let tx = db.transaction();
        let plan = TablePlan::new(&tx, "dept").unwrap();
        let mut s = plan.open_table_scan();
        s.move_to_rid(Rid::from_index(1, tx.config().rows_per_block))
            .unwrap();
        assert_eq!(s.get_string("dname").unwrap(), "ee");
    }

    #[test]
    fn test_unknown_field_fails() {
        let db = dept_db();
        let tx = db.transaction();
        let plan = TablePlan::new(&tx, "dept").unwrap();
        let mut s = plan.open().unwrap();
        s.before_first().unwrap();
        assert!(s.next().unwrap());
        assert_eq!(
            s.get_val("nope"),
            Err(QueryError::UnknownField("nope".into()))
        );
    }
}

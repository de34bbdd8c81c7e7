//! Index join
//!
//! For each outer row, probes the inner table's index with the outer
//! join-field value. The inner side must be a stored table carrying an
//! index on the join field; equality is the only operator a probe-based
//! join supports.

use std::cell::RefCell;
use std::rc::Rc;

use crate::plan::{Plan, TablePlan, TableScan};
use crate::query::{CompareOp, QueryResult, Scan, UpdateScan};
use crate::record::Schema;

use super::info::{Index, IndexInfo};

#[derive(Clone)]
pub struct IndexJoinPlan {
    outer: Box<dyn Plan>,
    inner: TablePlan,
    info: IndexInfo,
    join_field: String,
    schema: Schema,
}

impl IndexJoinPlan {
    /// `join_field` names the outer field whose values probe the inner
    /// index.
    pub fn new(
        outer: Box<dyn Plan>,
        inner: TablePlan,
        info: IndexInfo,
        join_field: impl Into<String>,
    ) -> Self {
        let mut schema = Schema::new();
        schema.add_all(outer.schema());
        schema.add_all(inner.schema());
        Self {
            outer,
            inner,
            info,
            join_field: join_field.into(),
            schema,
        }
    }
}

impl Plan for IndexJoinPlan {
    fn open(&self) -> QueryResult<Box<dyn Scan>> {
        let scan = IndexJoinScan::new(
            self.outer.open()?,
            self.inner.open_table_scan(),
            self.info.open(),
            self.join_field.clone(),
        );
        Ok(Box::new(scan))
    }

    /// One pass over the outer side, one index probe per outer row, one
    /// block read per matching inner row.
    fn blocks_accessed(&self) -> usize {
        self.outer
            .blocks_accessed()
            .saturating_add(
                self.outer
                    .records_output()
                    .saturating_mul(self.info.blocks_accessed()),
            )
            .saturating_add(self.records_output())
    }

    fn records_output(&self) -> usize {
        self.outer
            .records_output()
            .saturating_mul(self.info.records_output())
    }

    fn distinct_values(&self, field: &str) -> usize {
        if self.outer.schema().has_field(field) {
            self.outer.distinct_values(field)
        } else {
            self.inner.distinct_values(field)
        }
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn clone_box(&self) -> Box<dyn Plan> {
        Box::new(self.clone())
    }
}

pub struct IndexJoinScan {
    outer: Box<dyn Scan>,
    inner: TableScan,
    idx: Rc<RefCell<dyn Index>>,
    join_field: String,
    /// Whether the current outer row has an active probe.
    primed: bool,
}

impl IndexJoinScan {
    fn new(
        outer: Box<dyn Scan>,
        inner: TableScan,
        idx: Rc<RefCell<dyn Index>>,
        join_field: String,
    ) -> Self {
        Self {
            outer,
            inner,
            idx,
            join_field,
            primed: false,
        }
    }

    fn probe_current(&mut self) -> QueryResult<()> {
        let key = self.outer.get_val(&self.join_field)?;
        self.idx
            .borrow_mut()
            .before_first(CompareOp::Eq, &key)?;
        self.primed = true;
        Ok(())
    }
}

impl Scan for IndexJoinScan {
    fn before_first(&mut self) -> QueryResult<()> {
        self.outer.before_first()?;
        self.primed = false;
        Ok(())
    }

    fn next(&mut self) -> QueryResult<bool> {
        loop {
            if self.primed {
                let matched = {
                    let mut idx = self.idx.borrow_mut();
                    if idx.next()? {
                        Some(idx.data_rid()?)
                    } else {
                        None
                    }
                };
                match matched {
                    Some(rid) => {
                        self.inner.move_to_rid(rid)?;
                        return Ok(true);
                    }
                    None => self.primed = false,
                }
            }
            if !self.outer.next()? {
                return Ok(false);
            }
            self.probe_current()?;
        }
    }

    fn get_val(&self, field: &str) -> QueryResult<crate::query::Constant> {
        if self.outer.has_field(field) {
            self.outer.get_val(field)
        } else {
            self.inner.get_val(field)
        }
    }

    fn has_field(&self, field: &str) -> bool {
        self.outer.has_field(field) || self.inner.has_field(field)
    }

    fn close(&mut self) {
        self.outer.close();
    }
}

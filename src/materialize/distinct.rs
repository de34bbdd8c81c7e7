//! Duplicate elimination
//!
//! Sorts the input on every output field, then drops each row equal to
//! the one before it. One materialized sort, one comparison per row.

use crate::plan::Plan;
use crate::query::{Constant, QueryResult, Scan};
use crate::record::Schema;
use crate::storage::Transaction;

use super::sort::{SortField, SortPlan};

#[derive(Clone)]
pub struct DistinctPlan {
    child: Box<dyn Plan>,
}

impl DistinctPlan {
    pub fn new(tx: &Transaction, child: Box<dyn Plan>) -> Self {
        let sort_fields: Vec<SortField> = child.schema().fields().map(SortField::asc).collect();
        let sorted = SortPlan::new(tx, child, sort_fields);
        Self {
            child: Box::new(sorted),
        }
    }

    /// For input already sorted so that equal rows are adjacent, e.g.
    /// after an ORDER BY covering every output field. Skips the internal
    /// sort that would otherwise destroy the requested order.
    pub fn over_sorted(child: Box<dyn Plan>) -> Self {
        Self { child }
    }
}

impl Plan for DistinctPlan {
    fn open(&self) -> QueryResult<Box<dyn Scan>> {
        let scan = self.child.open()?;
        let fields: Vec<String> = self.schema().fields().map(str::to_string).collect();
        Ok(Box::new(DistinctScan {
            scan,
            fields,
            prev: None,
        }))
    }

    fn blocks_accessed(&self) -> usize {
        self.child.blocks_accessed()
    }

    /// At most one row per combination of distinct field values, and
    /// never more rows than the input has.
    fn records_output(&self) -> usize {
        let combos = self
            .schema()
            .fields()
            .fold(1usize, |acc, f| acc.saturating_mul(self.distinct_values(f)));
        combos.min(self.child.records_output())
    }

    fn distinct_values(&self, field: &str) -> usize {
        self.child.distinct_values(field)
    }

    fn schema(&self) -> &Schema {
        self.child.schema()
    }

    fn clone_box(&self) -> Box<dyn Plan> {
        Box::new(self.clone())
    }
}

struct DistinctScan {
    scan: Box<dyn Scan>,
    fields: Vec<String>,
    prev: Option<Vec<Constant>>,
}

impl DistinctScan {
    fn current_key(&self) -> QueryResult<Vec<Constant>> {
        self.fields.iter().map(|f| self.scan.get_val(f)).collect()
    }
}

impl Scan for DistinctScan {
    fn before_first(&mut self) -> QueryResult<()> {
        self.prev = None;
        self.scan.before_first()
    }

    fn next(&mut self) -> QueryResult<bool> {
        while self.scan.next()? {
            let key = self.current_key()?;
            if self.prev.as_ref() != Some(&key) {
                self.prev = Some(key);
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn get_val(&self, field: &str) -> QueryResult<Constant> {
        self.scan.get_val(field)
    }

    fn has_field(&self, field: &str) -> bool {
        self.scan.has_field(field)
    }

    fn close(&mut self) {
        self.scan.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::TablePlan;
    use crate::storage::Db;

    #[test]
    fn repeated_rows_collapse_to_one() {
        let mut db = Db::with_defaults();
        let mut schema = Schema::new();
        schema.add_int_field("a");
        schema.add_int_field("b");
        db.create_table("t", schema);
        for (a, b) in [(1, 1), (2, 2), (1, 1), (2, 3), (1, 1)] {
            db.insert("t", vec![Constant::Int(a), Constant::Int(b)])
                .unwrap();
        }
        let tx = db.transaction();
        let child = Box::new(TablePlan::new(&tx, "t").unwrap());
        let plan = DistinctPlan::new(&tx, child);
        let mut scan = plan.open().unwrap();
        let mut rows = Vec::new();
        while scan.next().unwrap() {
            rows.push((scan.get_val("a").unwrap(), scan.get_val("b").unwrap()));
        }
        assert_eq!(
            rows,
            vec![
                (Constant::Int(1), Constant::Int(1)),
                (Constant::Int(2), Constant::Int(2)),
                (Constant::Int(2), Constant::Int(3)),
            ]
        );
    }

    #[test]
    fn already_unique_input_passes_through() {
        let mut db = Db::with_defaults();
        let mut schema = Schema::new();
        schema.add_int_field("a");
        db.create_table("t", schema);
        for a in [3, 1, 2] {
            db.insert("t", vec![Constant::Int(a)]).unwrap();
        }
        let tx = db.transaction();
        let child = Box::new(TablePlan::new(&tx, "t").unwrap());
        let plan = DistinctPlan::new(&tx, child);
        let mut scan = plan.open().unwrap();
        let mut count = 0;
        while scan.next().unwrap() {
            count += 1;
        }
        assert_eq!(count, 3);
    }
}

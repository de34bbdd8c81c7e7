//! Sorting
//!
//! `SortPlan` materializes its input into a temp table and orders it by
//! a list of sort fields. The sort is stable, so rows that compare equal
//! keep their input order. `SortScan` adds position save/restore on top
//! of the sorted cursor; sort-merge join uses it to re-enter a run of
//! duplicate join keys.

use std::cmp::Ordering;

use crate::plan::Plan;
use crate::query::{Constant, QueryResult, Scan, UpdateScan};
use crate::record::{Row, Schema};
use crate::storage::Transaction;

use super::temp::{TempScan, TempTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub field: String,
    pub direction: SortDirection,
}

impl SortField {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }
}

#[derive(Clone)]
pub struct SortPlan {
    child: Box<dyn Plan>,
    sort_fields: Vec<SortField>,
    tx: Transaction,
}

impl SortPlan {
    pub fn new(tx: &Transaction, child: Box<dyn Plan>, sort_fields: Vec<SortField>) -> Self {
        Self {
            child,
            sort_fields,
            tx: tx.clone(),
        }
    }

    pub fn sort_fields(&self) -> &[SortField] {
        &self.sort_fields
    }

    /// Materializes and sorts the input, returning the concrete scan so
    /// callers that need save/restore keep access to it.
    pub fn open_sorted(&self) -> QueryResult<SortScan> {
        let schema = self.child.schema();
        let mut src = self.child.open()?;
        src.before_first()?;

        let mut rows: Vec<Row> = Vec::new();
        let mut keys: Vec<Vec<Constant>> = Vec::new();
        let key_fields: Vec<(usize, SortDirection)> = self
            .sort_fields
            .iter()
            .filter_map(|sf| schema.index_of(&sf.field).map(|i| (i, sf.direction)))
            .collect();
        while src.next()? {
            let mut row = Row::zeroed(schema);
            for (i, field) in schema.fields().enumerate() {
                row.set(i, src.get_val(field)?);
            }
            keys.push(
                key_fields
                    .iter()
                    .filter_map(|(i, _)| row.get(*i).cloned())
                    .collect(),
            );
            rows.push(row);
        }
        src.close();

        let mut order: Vec<usize> = (0..rows.len()).collect();
        order.sort_by(|&a, &b| {
            for (k, (_, direction)) in key_fields.iter().enumerate() {
                let ord = match direction {
                    SortDirection::Asc => keys[a][k].cmp(&keys[b][k]),
                    SortDirection::Desc => keys[b][k].cmp(&keys[a][k]),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });

        let temp = TempTable::new(&self.tx, schema);
        let mut dst = temp.open();
        for i in order {
            dst.insert()?;
            for (j, field) in schema.fields().enumerate() {
                if let Some(v) = rows[i].get(j) {
                    dst.set_val(field, v.clone())?;
                }
            }
        }

        let mut scan = temp.open();
        scan.before_first()?;
        Ok(SortScan::new(scan))
    }
}

impl Plan for SortPlan {
    fn open(&self) -> QueryResult<Box<dyn Scan>> {
        Ok(Box::new(self.open_sorted()?))
    }

    /// Reading the materialized output; the child's own cost is paid at
    /// open time.
    fn blocks_accessed(&self) -> usize {
        self.tx.config().blocks_for(self.child.records_output())
    }

    fn records_output(&self) -> usize {
        self.child.records_output()
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

/// Sorted cursor with one saved position.
pub struct SortScan {
    scan: TempScan,
    saved: Option<Option<usize>>,
}

impl SortScan {
    fn new(scan: TempScan) -> Self {
        Self { scan, saved: None }
    }

    pub fn save_position(&mut self) {
        self.saved = Some(self.scan.position());
    }

    /// Rewinds to the saved position. The position stays saved, so a run
    /// of duplicates can be re-entered once per outer row.
    pub fn restore_position(&mut self) {
        if let Some(pos) = self.saved {
            self.scan.restore_position(pos);
        }
    }
}

impl Scan for SortScan {
    fn before_first(&mut self) -> QueryResult<()> {
        self.saved = None;
        self.scan.before_first()
    }

    fn next(&mut self) -> QueryResult<bool> {
        self.scan.next()
    }

    fn get_val(&self, field: &str) -> QueryResult<Constant> {
        self.scan.get_val(field)
    }

    fn has_field(&self, field: &str) -> bool {
        self.scan.has_field(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::TablePlan;
    use crate::storage::Db;

    fn db_with_scores() -> Db {
        let mut db = Db::with_defaults();
        let mut schema = Schema::new();
        schema.add_int_field("id");
        schema.add_int_field("score");
        db.create_table("scores", schema);
        for (id, score) in [(1, 50), (2, 30), (3, 50), (4, 10)] {
            db.insert("scores", vec![Constant::Int(id), Constant::Int(score)])
                .unwrap();
        }
        db
    }

    fn ids_in_order(db: &Db, fields: Vec<SortField>) -> Vec<i32> {
        let tx = db.transaction();
        let child = Box::new(TablePlan::new(&tx, "scores").unwrap());
        let plan = SortPlan::new(&tx, child, fields);
        let mut scan = plan.open().unwrap();
        let mut out = Vec::new();
        while scan.next().unwrap() {
            if let Constant::Int(i) = scan.get_val("id").unwrap() {
                out.push(i);
            }
        }
        out
    }

    #[test]
    fn ascending_sort_is_stable_on_ties() {
        let db = db_with_scores();
        assert_eq!(
            ids_in_order(&db, vec![SortField::asc("score")]),
            vec![4, 2, 1, 3]
        );
    }

    #[test]
    fn descending_sort_reverses_key_order_not_tie_order() {
        let db = db_with_scores();
        assert_eq!(
            ids_in_order(&db, vec![SortField::desc("score")]),
            vec![1, 3, 2, 4]
        );
    }

    #[test]
    fn save_and_restore_replays_a_position() {
        let db = db_with_scores();
        let tx = db.transaction();
        let child = Box::new(TablePlan::new(&tx, "scores").unwrap());
        let plan = SortPlan::new(&tx, child, vec![SortField::asc("score")]);
        let mut scan = plan.open_sorted().unwrap();
        assert!(scan.next().unwrap());
        scan.save_position();
        let here = scan.get_val("id").unwrap();
        assert!(scan.next().unwrap());
        assert!(scan.next().unwrap());
        scan.restore_position();
        assert_eq!(scan.get_val("id").unwrap(), here);
    }
}

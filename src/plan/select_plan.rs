//! Selection
//!
//! Filters a child plan's rows by a predicate. Cost: same blocks as the
//! child; output reduced by the predicate's reduction factor.

use crate::query::{Constant, Predicate, QueryResult, Scan};
use crate::record::Schema;

use super::plan::Plan;

/// A plan filtering its child by a conjunctive predicate.
#[derive(Clone)]
pub struct SelectPlan {
    child: Box<dyn Plan>,
    pred: Predicate,
}

impl SelectPlan {
    /// Creates a selection over the child plan
    pub fn new(child: Box<dyn Plan>, pred: Predicate) -> Self {
        Self { child, pred }
    }
}

impl Plan for SelectPlan {
    fn open(&self) -> QueryResult<Box<dyn Scan>> {
        Ok(Box::new(SelectScan {
            child: self.child.open()?,
            pred: self.pred.clone(),
        }))
    }

    fn blocks_accessed(&self) -> usize {
        self.child.blocks_accessed()
    }

    fn records_output(&self) -> usize {
        let rf = self.pred.reduction_factor(self.child.as_ref());
        if rf == usize::MAX {
            0
        } else {
            self.child.records_output() / rf.max(1)
        }
    }

    fn distinct_values(&self, field: &str) -> usize {
        if self.pred.equates_with_constant(field).is_some() {
            return 1;
        }
        let child_distinct = match self.pred.equates_with_field(field) {
            Some(other) => self
                .child
                .distinct_values(field)
                .min(self.child.distinct_values(other)),
            None => self.child.distinct_values(field),
        };
        child_distinct.min(self.records_output().max(1))
    }

    fn schema(&self) -> &Schema {
        self.child.schema()
    }

    fn clone_box(&self) -> Box<dyn Plan> {
        Box::new(self.clone())
    }
}

/// Cursor that yields only rows satisfying the predicate.
pub struct SelectScan {
    child: Box<dyn Scan>,
    pred: Predicate,
}

impl Scan for SelectScan {
    fn before_first(&mut self) -> QueryResult<()> {
        self.child.before_first()
    }

    fn next(&mut self) -> QueryResult<bool> {
        while self.child.next()? {
            if self.pred.is_satisfied(self.child.as_ref())? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn get_val(&self, field: &str) -> QueryResult<Constant> {
        self.child.get_val(field)
    }

    fn has_field(&self, field: &str) -> bool {
        self.child.has_field(field)
    }

    fn close(&mut self) {
        self.child.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::TablePlan;
    use crate::query::{CompareOp, Expression, Term};
    use crate::storage::Db;

    #[test]
    fn test_filters_rows() {
        let mut db = Db::with_defaults();
        let mut sch = Schema::new();
        sch.add_int_field("sid");
        db.create_table("student", sch);
        for sid in 1..=5 {
            db.insert("student", vec![Constant::Int(sid)]).unwrap();
        }
        let tx = db.transaction();

        let pred = Predicate::new(Term::new(
            Expression::field("sid"),
            Expression::constant(3),
            CompareOp::Ge,
        ));
        let plan = SelectPlan::new(Box::new(TablePlan::new(&tx, "student").unwrap()), pred);

        let mut s = plan.open().unwrap();
        s.before_first().unwrap();
        let mut out = Vec::new();
        while s.next().unwrap() {
            out.push(s.get_int("sid").unwrap());
        }
        s.close();
        assert_eq!(out, vec![3, 4, 5]);
    }
}

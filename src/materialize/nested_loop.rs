//! Nested-loop join
//!
//! The one join algorithm with no precondition: any comparison operator,
//! no index, no sort order. For each outer row the inner relation is
//! rescanned from the start, so its cost grows with the product of the
//! input sizes; the planner only picks it when nothing cheaper applies
//! or the operator rules out the equality-based algorithms.

use crate::plan::Plan;
use crate::query::{CompareOp, Constant, QueryResult, Scan};
use crate::record::Schema;

#[derive(Clone)]
pub struct NestedLoopJoinPlan {
    outer: Box<dyn Plan>,
    inner: Box<dyn Plan>,
    f1: String,
    op: CompareOp,
    f2: String,
    schema: Schema,
}

impl NestedLoopJoinPlan {
    /// Joins on `outer.f1 <op> inner.f2`.
    pub fn new(
        outer: Box<dyn Plan>,
        inner: Box<dyn Plan>,
        f1: impl Into<String>,
        op: CompareOp,
        f2: impl Into<String>,
    ) -> Self {
        let mut schema = Schema::new();
        schema.add_all(outer.schema());
        schema.add_all(inner.schema());
        Self {
            outer,
            inner,
            f1: f1.into(),
            op,
            f2: f2.into(),
            schema,
        }
    }
}

impl Plan for NestedLoopJoinPlan {
    fn open(&self) -> QueryResult<Box<dyn Scan>> {
        Ok(Box::new(NestedLoopJoinScan {
            outer: self.outer.open()?,
            inner: self.inner.open()?,
            f1: self.f1.clone(),
            op: self.op,
            f2: self.f2.clone(),
            outer_positioned: false,
        }))
    }

    /// One outer pass plus one full inner pass per outer row.
    fn blocks_accessed(&self) -> usize {
        self.outer.blocks_accessed().saturating_add(
            self.outer
                .records_output()
                .saturating_mul(self.inner.blocks_accessed()),
        )
    }

    fn records_output(&self) -> usize {
        let factor = self
            .outer
            .distinct_values(&self.f1)
            .max(self.inner.distinct_values(&self.f2))
            .max(1);
        self.outer
            .records_output()
            .saturating_mul(self.inner.records_output())
            / factor
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

struct NestedLoopJoinScan {
    outer: Box<dyn Scan>,
    inner: Box<dyn Scan>,
    f1: String,
    op: CompareOp,
    f2: String,
    /// False until the outer cursor sits on a row.
    outer_positioned: bool,
}

impl Scan for NestedLoopJoinScan {
    fn before_first(&mut self) -> QueryResult<()> {
        self.outer.before_first()?;
        self.inner.before_first()?;
        self.outer_positioned = false;
        Ok(())
    }

    fn next(&mut self) -> QueryResult<bool> {
        loop {
            if !self.outer_positioned {
                if !self.outer.next()? {
                    return Ok(false);
                }
                self.outer_positioned = true;
                self.inner.before_first()?;
            }
            let v1 = self.outer.get_val(&self.f1)?;
            while self.inner.next()? {
                let v2 = self.inner.get_val(&self.f2)?;
                if self.op.evaluate(v1.cmp(&v2)) {
                    return Ok(true);
                }
            }
            // Inner exhausted; advance the outer cursor and rewind.
            self.outer_positioned = false;
        }
    }

    fn get_val(&self, field: &str) -> QueryResult<Constant> {
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
        self.inner.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::TablePlan;
    use crate::storage::Db;

    fn dept_course_db() -> Db {
        let mut db = Db::with_defaults();
        let mut dept = Schema::new();
        dept.add_int_field("did");
        dept.add_string_field("dname", 8);
        db.create_table("dept", dept);
        db.insert("dept", vec![Constant::Int(10), Constant::from("cs")])
            .unwrap();
        db.insert("dept", vec![Constant::Int(20), Constant::from("ee")])
            .unwrap();
        let mut course = Schema::new();
        course.add_int_field("cid");
        course.add_int_field("deptid");
        db.create_table("course", course);
        for (cid, deptid) in [(1, 10), (2, 10), (3, 20)] {
            db.insert(
                "course",
                vec![Constant::Int(cid), Constant::Int(deptid)],
            )
            .unwrap();
        }
        db
    }

    fn join_pairs(db: &Db, op: CompareOp) -> Vec<(i32, i32)> {
        let tx = db.transaction();
        let outer = Box::new(TablePlan::new(&tx, "dept").unwrap());
        let inner = Box::new(TablePlan::new(&tx, "course").unwrap());
        let plan = NestedLoopJoinPlan::new(outer, inner, "did", op, "deptid");
        let mut scan = plan.open().unwrap();
        scan.before_first().unwrap();
        let mut pairs = Vec::new();
        while scan.next().unwrap() {
            let did = match scan.get_val("did").unwrap() {
                Constant::Int(i) => i,
                other => panic!("unexpected {other}"),
            };
            let cid = match scan.get_val("cid").unwrap() {
                Constant::Int(i) => i,
                other => panic!("unexpected {other}"),
            };
            pairs.push((did, cid));
        }
        pairs.sort_unstable();
        pairs
    }

    #[test]
    fn equality_join_matches_key_pairs() {
        let db = dept_course_db();
        assert_eq!(
            join_pairs(&db, CompareOp::Eq),
            vec![(10, 1), (10, 2), (20, 3)]
        );
    }

    #[test]
    fn less_than_join_keeps_strictly_smaller_outer_rows() {
        let db = dept_course_db();
        assert_eq!(join_pairs(&db, CompareOp::Lt), vec![(10, 3)]);
    }
}

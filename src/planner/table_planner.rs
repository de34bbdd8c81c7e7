//! Per-table planning
//!
//! `TablePlanner` owns one table's base plan, the slice of the query
//! predicate that concerns it, and its index catalog entries. It builds
//! the table's standalone selection plan and, given the partial join
//! plan built so far, one candidate plan per join algorithm. Candidates
//! that need a join condition the predicate does not supply come back as
//! `None`; the cross product is always buildable.

use std::collections::BTreeMap;

use crate::index::{IndexInfo, IndexJoinPlan, IndexSelectPlan, IndexType};
use crate::materialize::{HashJoinPlan, MergeJoinPlan, NestedLoopJoinPlan};
use crate::plan::{Plan, ProductPlan, SelectPlan, TablePlan};
use crate::query::{CompareOp, Predicate};
use crate::record::Schema;
use crate::storage::Transaction;

use super::errors::PlannerResult;
use super::trace::IndexUse;

pub struct TablePlanner {
    table: String,
    plan: TablePlan,
    pred: Predicate,
    schema: Schema,
    indexes: BTreeMap<String, IndexInfo>,
    tx: Transaction,
}

impl TablePlanner {
    pub fn new(tx: &Transaction, table: &str, pred: Predicate) -> PlannerResult<Self> {
        let plan = TablePlan::new(tx, table)?;
        let schema = plan.schema().clone();
        let indexes = tx.index_info(table)?;
        Ok(Self {
            table: table.to_string(),
            plan,
            pred,
            schema,
            indexes,
            tx: tx.clone(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The standalone access plan for this table: an index select when a
    /// usable index matches a constant comparison, otherwise a full
    /// scan, with the table's selection predicate layered on top either
    /// way.
    pub fn make_select_plan(&self) -> (Box<dyn Plan>, Option<IndexUse>) {
        // BTreeMap order makes the field choice deterministic.
        for (field, info) in &self.indexes {
            let Some((op, val)) = self.pred.compares_with_constant(field) else {
                continue;
            };
            if info.index_type() == IndexType::Hash
                && (op != CompareOp::Eq || self.pred.has_nonequality_on(field))
            {
                // hash indexes cannot serve range predicates; fall
                // through to the table scan
                continue;
            }
            let plan = IndexSelectPlan::new(self.plan.clone(), info.clone(), op, val.clone());
            let used = IndexUse {
                table: self.table.clone(),
                field: field.clone(),
                index_type: info.index_type(),
            };
            return (self.add_select_pred(Box::new(plan)), Some(used));
        }
        (self.add_select_pred(Box::new(self.plan.clone())), None)
    }

    /// Index join: the partial plan's rows probe an index on this
    /// table's side of an equality join term.
    pub fn make_index_join_plan(
        &self,
        current: &dyn Plan,
    ) -> Option<(Box<dyn Plan>, IndexUse)> {
        let join_pred = self.pred.join_sub_pred(&self.schema, current.schema())?;
        for (field, info) in &self.indexes {
            let Some(outer_field) = join_pred.equates_with_field(field) else {
                continue;
            };
            if !current.schema().has_field(outer_field) {
                continue;
            }
            let plan = IndexJoinPlan::new(
                current.clone_box(),
                self.plan.clone(),
                info.clone(),
                outer_field,
            );
            let used = IndexUse {
                table: self.table.clone(),
                field: field.clone(),
                index_type: info.index_type(),
            };
            let plan = self.add_select_pred(Box::new(plan));
            return Some((self.add_join_pred(plan, current.schema()), used));
        }
        None
    }

    pub fn make_sort_merge_plan(&self, current: &dyn Plan) -> Option<Box<dyn Plan>> {
        let (outer_field, my_field, op) = self.join_fields(current.schema())?;
        if op != CompareOp::Eq {
            return None;
        }
        let plan = MergeJoinPlan::new(
            &self.tx,
            current.clone_box(),
            Box::new(self.plan.clone()),
            outer_field,
            my_field,
        );
        let plan = self.add_select_pred(Box::new(plan));
        Some(self.add_join_pred(plan, current.schema()))
    }

    /// The only candidate that accepts a non-equality join operator.
    pub fn make_nested_loop_plan(&self, current: &dyn Plan) -> Option<Box<dyn Plan>> {
        let (outer_field, my_field, op) = self.join_fields(current.schema())?;
        let plan = NestedLoopJoinPlan::new(
            current.clone_box(),
            Box::new(self.plan.clone()),
            outer_field,
            op,
            my_field,
        );
        let plan = self.add_select_pred(Box::new(plan));
        Some(self.add_join_pred(plan, current.schema()))
    }

    pub fn make_hash_join_plan(&self, current: &dyn Plan) -> Option<Box<dyn Plan>> {
        let (outer_field, my_field, op) = self.join_fields(current.schema())?;
        if op != CompareOp::Eq {
            return None;
        }
        let plan = HashJoinPlan::new(
            &self.tx,
            current.clone_box(),
            Box::new(self.plan.clone()),
            outer_field,
            my_field,
        );
        let plan = self.add_select_pred(Box::new(plan));
        Some(self.add_join_pred(plan, current.schema()))
    }

    /// Always applicable; the planner's fallback when no join term
    /// connects this table.
    pub fn make_product_plan(&self, current: &dyn Plan) -> Box<dyn Plan> {
        let plan = ProductPlan::new(current.clone_box(), Box::new(self.plan.clone()));
        self.add_select_pred(Box::new(plan))
    }

    /// Whether any join term connects this table to the given schema,
    /// and whether some connecting term is an equality.
    pub fn join_connection(&self, other: &Schema) -> Option<CompareOp> {
        self.join_fields(other).map(|(_, _, op)| op)
    }

    /// The first join term connecting this table with `other`, oriented
    /// as `(other_field, my_field, op)` with the operator applied to the
    /// other side's field on the left.
    fn join_fields(&self, other: &Schema) -> Option<(String, String, CompareOp)> {
        let join_pred = self.pred.join_sub_pred(&self.schema, other)?;
        for term in join_pred.terms() {
            let (Some(lhs), Some(rhs)) = (
                term.lhs().as_field_name(),
                term.rhs().as_field_name(),
            ) else {
                continue;
            };
            if other.has_field(lhs) && self.schema.has_field(rhs) {
                return Some((lhs.to_string(), rhs.to_string(), term.op()));
            }
            if self.schema.has_field(lhs) && other.has_field(rhs) {
                return Some((rhs.to_string(), lhs.to_string(), flip(term.op())));
            }
        }
        None
    }

    fn add_select_pred(&self, plan: Box<dyn Plan>) -> Box<dyn Plan> {
        match self.pred.select_sub_pred(&self.schema) {
            Some(sel) => Box::new(SelectPlan::new(plan, sel)),
            None => plan,
        }
    }

    /// Wrapping filter for composite join conditions that the chosen
    /// algorithm only partially enforces.
    fn add_join_pred(&self, plan: Box<dyn Plan>, other: &Schema) -> Box<dyn Plan> {
        match self.pred.join_sub_pred(&self.schema, other) {
            Some(join) => Box::new(SelectPlan::new(plan, join)),
            None => plan,
        }
    }
}

fn flip(op: CompareOp) -> CompareOp {
    match op {
        CompareOp::Lt => CompareOp::Gt,
        CompareOp::Le => CompareOp::Ge,
        CompareOp::Gt => CompareOp::Lt,
        CompareOp::Ge => CompareOp::Le,
        CompareOp::Eq | CompareOp::Ne => op,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Expression, Term};
    use crate::storage::Db;

    fn dept_course_db() -> Db {
        let mut db = Db::with_defaults();
        let mut dept = Schema::new();
        dept.add_int_field("did");
        dept.add_string_field("dname", 8);
        db.create_table("dept", dept);
        db.insert("dept", vec![10.into(), "cs".into()]).unwrap();
        db.insert("dept", vec![20.into(), "ee".into()]).unwrap();
        let mut course = Schema::new();
        course.add_int_field("cid");
        course.add_int_field("deptid");
        db.create_table("course", course);
        for (cid, deptid) in [(1, 10), (2, 10), (3, 20)] {
            db.insert("course", vec![cid.into(), deptid.into()])
                .unwrap();
        }
        db
    }

    fn join_pred() -> Predicate {
        Predicate::new(Term::eq(
            Expression::field("did"),
            Expression::field("deptid"),
        ))
    }

    #[test]
    fn select_plan_uses_btree_index_for_range_term() {
        let mut db = dept_course_db();
        db.create_btree_index("course", "deptid").unwrap();
        let tx = db.transaction();
        let pred = Predicate::new(Term::new(
            Expression::field("deptid"),
            Expression::constant(15),
            CompareOp::Gt,
        ));
        let tp = TablePlanner::new(&tx, "course", pred).unwrap();
        let (_, used) = tp.make_select_plan();
        let used = used.unwrap();
        assert_eq!(used.field, "deptid");
        assert_eq!(used.index_type, IndexType::BTree);
    }

    #[test]
    fn hash_index_is_rejected_for_range_term() {
        let mut db = dept_course_db();
        db.create_hash_index("course", "deptid").unwrap();
        let tx = db.transaction();
        let pred = Predicate::new(Term::new(
            Expression::field("deptid"),
            Expression::constant(15),
            CompareOp::Gt,
        ));
        let tp = TablePlanner::new(&tx, "course", pred).unwrap();
        let (_, used) = tp.make_select_plan();
        assert!(used.is_none());
    }

    #[test]
    fn hash_index_serves_pure_equality() {
        let mut db = dept_course_db();
        db.create_hash_index("course", "deptid").unwrap();
        let tx = db.transaction();
        let pred = Predicate::new(Term::eq(
            Expression::field("deptid"),
            Expression::constant(10),
        ));
        let tp = TablePlanner::new(&tx, "course", pred).unwrap();
        let (_, used) = tp.make_select_plan();
        assert_eq!(used.unwrap().index_type, IndexType::Hash);
    }

    #[test]
    fn equality_join_offers_all_algorithms() {
        let mut db = dept_course_db();
        db.create_btree_index("course", "deptid").unwrap();
        let tx = db.transaction();
        let tp = TablePlanner::new(&tx, "course", join_pred()).unwrap();
        let current: Box<dyn Plan> = Box::new(TablePlan::new(&tx, "dept").unwrap());
        assert!(tp.make_index_join_plan(current.as_ref()).is_some());
        assert!(tp.make_sort_merge_plan(current.as_ref()).is_some());
        assert!(tp.make_nested_loop_plan(current.as_ref()).is_some());
        assert!(tp.make_hash_join_plan(current.as_ref()).is_some());
    }

    #[test]
    fn non_equality_join_offers_only_nested_loop() {
        let db = dept_course_db();
        let tx = db.transaction();
        let pred = Predicate::new(Term::new(
            Expression::field("did"),
            Expression::field("deptid"),
            CompareOp::Lt,
        ));
        let tp = TablePlanner::new(&tx, "course", pred).unwrap();
        let current: Box<dyn Plan> = Box::new(TablePlan::new(&tx, "dept").unwrap());
        assert!(tp.make_sort_merge_plan(current.as_ref()).is_none());
        assert!(tp.make_hash_join_plan(current.as_ref()).is_none());
        assert!(tp.make_nested_loop_plan(current.as_ref()).is_some());
        assert_eq!(tp.join_connection(current.schema()), Some(CompareOp::Lt));
    }

    #[test]
    fn unconnected_table_has_no_join_candidates() {
        let db = dept_course_db();
        let tx = db.transaction();
        let tp = TablePlanner::new(&tx, "course", Predicate::empty()).unwrap();
        let current: Box<dyn Plan> = Box::new(TablePlan::new(&tx, "dept").unwrap());
        assert!(tp.join_connection(current.schema()).is_none());
        assert!(tp.make_nested_loop_plan(current.as_ref()).is_none());
        let product = tp.make_product_plan(current.as_ref());
        assert_eq!(product.records_output(), 6);
    }
}

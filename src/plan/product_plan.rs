//! Cross product
//!
//! Pairs every row of the left input with every row of the right input.
//! The planner uses it as the guaranteed-available fallback when no join
//! predicate connects a table to the partial plan.

use crate::query::{Constant, QueryResult, Scan};
use crate::record::Schema;

use super::plan::Plan;

/// A plan producing the Cartesian product of its children.
#[derive(Clone)]
pub struct ProductPlan {
    p1: Box<dyn Plan>,
    p2: Box<dyn Plan>,
    schema: Schema,
}

impl ProductPlan {
    /// Creates a product of the two plans
    pub fn new(p1: Box<dyn Plan>, p2: Box<dyn Plan>) -> Self {
        let mut schema = Schema::new();
        schema.add_all(p1.schema());
        schema.add_all(p2.schema());
        Self { p1, p2, schema }
    }
}

impl Plan for ProductPlan {
    fn open(&self) -> QueryResult<Box<dyn Scan>> {
        let mut s1 = self.p1.open()?;
        let mut s2 = self.p2.open()?;
        s1.before_first()?;
        s2.before_first()?;
        let more1 = s1.next()?;
        Ok(Box::new(ProductScan { s1, s2, more1 }))
    }

    fn blocks_accessed(&self) -> usize {
        self.p1
            .blocks_accessed()
            .saturating_add(self.p1.records_output().saturating_mul(self.p2.blocks_accessed()))
    }

    fn records_output(&self) -> usize {
        self.p1
            .records_output()
            .saturating_mul(self.p2.records_output())
    }

    fn distinct_values(&self, field: &str) -> usize {
        if self.p1.schema().has_field(field) {
            self.p1.distinct_values(field)
        } else {
            self.p2.distinct_values(field)
        }
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn clone_box(&self) -> Box<dyn Plan> {
        Box::new(self.clone())
    }
}

/// Cursor that rewinds the right input for every left row.
pub struct ProductScan {
    s1: Box<dyn Scan>,
    s2: Box<dyn Scan>,
    more1: bool,
}

impl Scan for ProductScan {
    fn before_first(&mut self) -> QueryResult<()> {
        self.s1.before_first()?;
        self.s2.before_first()?;
        self.more1 = self.s1.next()?;
        Ok(())
    }

    fn next(&mut self) -> QueryResult<bool> {
        while self.more1 {
            if self.s2.next()? {
                return Ok(true);
            }
            self.s2.before_first()?;
            self.more1 = self.s1.next()?;
        }
        Ok(false)
    }

    fn get_val(&self, field: &str) -> QueryResult<Constant> {
        if self.s1.has_field(field) {
            self.s1.get_val(field)
        } else {
            self.s2.get_val(field)
        }
    }

    fn has_field(&self, field: &str) -> bool {
        self.s1.has_field(field) || self.s2.has_field(field)
    }

    fn close(&mut self) {
        self.s1.close();
        self.s2.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::TablePlan;
    use crate::storage::Db;

    #[test]
    fn test_full_pairing() {
        let mut db = Db::with_defaults();
        let mut s1 = Schema::new();
        s1.add_int_field("a");
        let mut s2 = Schema::new();
        s2.add_int_field("b");
        db.create_table("t1", s1);
        db.create_table("t2", s2);
        for v in [1, 2] {
            db.insert("t1", vec![Constant::Int(v)]).unwrap();
        }
        for v in [10, 20, 30] {
            db.insert("t2", vec![Constant::Int(v)]).unwrap();
        }
        let tx = db.transaction();

        let plan = ProductPlan::new(
            Box::new(TablePlan::new(&tx, "t1").unwrap()),
            Box::new(TablePlan::new(&tx, "t2").unwrap()),
        );
        assert_eq!(plan.records_output(), 6);

        let mut s = plan.open().unwrap();
        let mut pairs = Vec::new();
        while s.next().unwrap() {
            pairs.push((s.get_int("a").unwrap(), s.get_int("b").unwrap()));
        }
        s.close();
        assert_eq!(pairs.len(), 6);
        assert!(pairs.contains(&(1, 30)));
        assert!(pairs.contains(&(2, 10)));
    }
}

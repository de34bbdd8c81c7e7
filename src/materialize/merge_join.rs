//! Sort-merge join
//!
//! Sorts both inputs on their join fields, then zips the sorted streams.
//! When the left side repeats a join value, the right cursor rewinds to
//! the start of the matching run via the sorted scan's saved position,
//! so every pairing inside a duplicate run is produced exactly once.
//! Equality joins only.

use crate::plan::Plan;
use crate::query::{Constant, QueryResult, Scan};
use crate::record::Schema;
use crate::storage::Transaction;

use super::sort::{SortField, SortPlan, SortScan};

#[derive(Clone)]
pub struct MergeJoinPlan {
    lhs: SortPlan,
    rhs: SortPlan,
    f1: String,
    f2: String,
    schema: Schema,
    tx: Transaction,
}

impl MergeJoinPlan {
    pub fn new(
        tx: &Transaction,
        lhs: Box<dyn Plan>,
        rhs: Box<dyn Plan>,
        f1: impl Into<String>,
        f2: impl Into<String>,
    ) -> Self {
        let f1 = f1.into();
        let f2 = f2.into();
        let mut schema = Schema::new();
        schema.add_all(lhs.schema());
        schema.add_all(rhs.schema());
        Self {
            lhs: SortPlan::new(tx, lhs, vec![SortField::asc(f1.clone())]),
            rhs: SortPlan::new(tx, rhs, vec![SortField::asc(f2.clone())]),
            f1,
            f2,
            schema,
            tx: tx.clone(),
        }
    }

    /// External-sort cost for `blocks` input blocks: two block transfers
    /// per pass, one initial run-formation pass plus the merge passes a
    /// buffer pool of this size needs.
    fn sort_cost(&self, blocks: usize) -> usize {
        let buffs = self.tx.available_buffs();
        if buffs < 3 {
            return blocks.saturating_mul(2);
        }
        let mut runs = blocks.div_ceil(buffs).max(1);
        let fan_in = buffs - 1;
        let mut passes = 1usize;
        while runs > 1 {
            runs = runs.div_ceil(fan_in);
            passes += 1;
        }
        blocks.saturating_mul(2).saturating_mul(passes)
    }
}

impl Plan for MergeJoinPlan {
    fn open(&self) -> QueryResult<Box<dyn Scan>> {
        let lhs = self.lhs.open_sorted()?;
        let rhs = self.rhs.open_sorted()?;
        Ok(Box::new(MergeJoinScan {
            lhs,
            rhs,
            f1: self.f1.clone(),
            f2: self.f2.clone(),
            join_val: None,
        }))
    }

    fn blocks_accessed(&self) -> usize {
        let b1 = self.tx.config().blocks_for(self.lhs.records_output());
        let b2 = self.tx.config().blocks_for(self.rhs.records_output());
        self.sort_cost(b1).saturating_add(self.sort_cost(b2))
    }

    fn records_output(&self) -> usize {
        let matching = self
            .lhs
            .distinct_values(&self.f1)
            .max(self.rhs.distinct_values(&self.f2))
            .max(1);
        self.lhs
            .records_output()
            .saturating_mul(self.rhs.records_output())
            / matching
    }

    fn distinct_values(&self, field: &str) -> usize {
        if self.lhs.schema().has_field(field) {
            self.lhs.distinct_values(field)
        } else {
            self.rhs.distinct_values(field)
        }
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn clone_box(&self) -> Box<dyn Plan> {
        Box::new(self.clone())
    }
}

struct MergeJoinScan {
    lhs: SortScan,
    rhs: SortScan,
    f1: String,
    f2: String,
    /// Join value of the run currently being paired.
    join_val: Option<Constant>,
}

impl Scan for MergeJoinScan {
    fn before_first(&mut self) -> QueryResult<()> {
        self.join_val = None;
        self.lhs.before_first()?;
        self.rhs.before_first()
    }

    fn next(&mut self) -> QueryResult<bool> {
        // Continue the current run on the right.
        let mut has_rhs = self.rhs.next()?;
        if has_rhs {
            if let Some(jv) = &self.join_val {
                if self.rhs.get_val(&self.f2)? == *jv {
                    return Ok(true);
                }
            }
        }
        // Right run exhausted: a duplicate on the left re-enters it.
        let mut has_lhs = self.lhs.next()?;
        if has_lhs {
            if let Some(jv) = &self.join_val {
                if self.lhs.get_val(&self.f1)? == *jv {
                    self.rhs.restore_position();
                    return Ok(true);
                }
            }
        }
        // Otherwise advance both sides to the next common value.
        while has_lhs && has_rhs {
            let v1 = self.lhs.get_val(&self.f1)?;
            let v2 = self.rhs.get_val(&self.f2)?;
            match v1.cmp(&v2) {
                std::cmp::Ordering::Less => has_lhs = self.lhs.next()?,
                std::cmp::Ordering::Greater => has_rhs = self.rhs.next()?,
                std::cmp::Ordering::Equal => {
                    self.rhs.save_position();
                    self.join_val = Some(v2);
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn get_val(&self, field: &str) -> QueryResult<Constant> {
        if self.lhs.has_field(field) {
            self.lhs.get_val(field)
        } else {
            self.rhs.get_val(field)
        }
    }

    fn has_field(&self, field: &str) -> bool {
        self.lhs.has_field(field) || self.rhs.has_field(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::TablePlan;
    use crate::storage::Db;

    #[test]
    fn duplicate_runs_pair_completely() {
        let mut db = Db::with_defaults();
        let mut left = Schema::new();
        left.add_int_field("lid");
        left.add_int_field("k");
        db.create_table("l", left);
        for (lid, k) in [(1, 7), (2, 7), (3, 9)] {
            db.insert("l", vec![Constant::Int(lid), Constant::Int(k)])
                .unwrap();
        }
        let mut right = Schema::new();
        right.add_int_field("rid");
        right.add_int_field("j");
        db.create_table("r", right);
        for (rid, j) in [(10, 7), (11, 7), (12, 8)] {
            db.insert("r", vec![Constant::Int(rid), Constant::Int(j)])
                .unwrap();
        }

        let tx = db.transaction();
        let lhs = Box::new(TablePlan::new(&tx, "l").unwrap());
        let rhs = Box::new(TablePlan::new(&tx, "r").unwrap());
        let plan = MergeJoinPlan::new(&tx, lhs, rhs, "k", "j");
        let mut scan = plan.open().unwrap();
        scan.before_first().unwrap();
        let mut pairs = Vec::new();
        while scan.next().unwrap() {
            pairs.push((scan.get_val("lid").unwrap(), scan.get_val("rid").unwrap()));
        }
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                (Constant::Int(1), Constant::Int(10)),
                (Constant::Int(1), Constant::Int(11)),
                (Constant::Int(2), Constant::Int(10)),
                (Constant::Int(2), Constant::Int(11)),
            ]
        );
    }

    #[test]
    fn disjoint_keys_produce_nothing() {
        let mut db = Db::with_defaults();
        let mut left = Schema::new();
        left.add_int_field("a");
        db.create_table("l", left);
        db.insert("l", vec![Constant::Int(1)]).unwrap();
        let mut right = Schema::new();
        right.add_int_field("b");
        db.create_table("r", right);
        db.insert("r", vec![Constant::Int(2)]).unwrap();

        let tx = db.transaction();
        let lhs = Box::new(TablePlan::new(&tx, "l").unwrap());
        let rhs = Box::new(TablePlan::new(&tx, "r").unwrap());
        let plan = MergeJoinPlan::new(&tx, lhs, rhs, "a", "b");
        let mut scan = plan.open().unwrap();
        scan.before_first().unwrap();
        assert!(!scan.next().unwrap());
    }
}

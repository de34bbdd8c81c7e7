//! Grace hash join
//!
//! Two phases. Partitioning hashes each side into `k` temp-table
//! buckets, `k` sized from the available buffer count, so that matching
//! keys land in the same bucket pair. Probing walks bucket pairs one at
//! a time: the left bucket is rehashed into an in-memory table with a
//! fresh modulus, then every right-bucket row probes it, resuming a
//! linear probe from its saved cell position so duplicate keys yield
//! every pairing. At no point does more than one bucket pair need to be
//! in memory.
//!
//! Equality joins only; the hash function cannot serve range operators.

use crate::plan::Plan;
use crate::query::{Constant, QueryError, QueryResult, Scan, UpdateScan};
use crate::record::Schema;
use crate::storage::Transaction;

use super::temp::{TempScan, TempTable};

#[derive(Clone)]
pub struct HashJoinPlan {
    lhs: Box<dyn Plan>,
    rhs: Box<dyn Plan>,
    f1: String,
    f2: String,
    schema: Schema,
    tx: Transaction,
}

impl HashJoinPlan {
    /// Joins on `lhs.f1 = rhs.f2`.
    pub fn new(
        tx: &Transaction,
        lhs: Box<dyn Plan>,
        rhs: Box<dyn Plan>,
        f1: impl Into<String>,
        f2: impl Into<String>,
    ) -> Self {
        let mut schema = Schema::new();
        schema.add_all(lhs.schema());
        schema.add_all(rhs.schema());
        Self {
            lhs,
            rhs,
            f1: f1.into(),
            f2: f2.into(),
            schema,
            tx: tx.clone(),
        }
    }

    /// Partition fan-out: one buffer stays reserved for the input scan.
    fn fan_out(&self) -> usize {
        self.tx.available_buffs().saturating_sub(1).max(2)
    }

    fn partition(&self, side: &dyn Plan, field: &str, k: usize) -> QueryResult<Vec<TempTable>> {
        let buckets: Vec<TempTable> = (0..k)
            .map(|_| TempTable::new(&self.tx, side.schema()))
            .collect();
        let mut writers: Vec<TempScan> = buckets.iter().map(TempTable::open).collect();
        let mut src = side.open()?;
        src.before_first()?;
        while src.next()? {
            let bucket = src.get_val(field)?.bucket(k);
            let dst = &mut writers[bucket];
            dst.insert()?;
            for f in side.schema().fields() {
                dst.set_val(f, src.get_val(f)?)?;
            }
        }
        src.close();
        Ok(buckets)
    }
}

impl Plan for HashJoinPlan {
    fn open(&self) -> QueryResult<Box<dyn Scan>> {
        let k = self.fan_out();
        let lhs_parts = self.partition(self.lhs.as_ref(), &self.f1, k)?;
        let rhs_parts = self.partition(self.rhs.as_ref(), &self.f2, k)?;
        let lhs_fields: Vec<String> = self.lhs.schema().fields().map(str::to_string).collect();
        let key_idx = lhs_fields
            .iter()
            .position(|f| *f == self.f1)
            .ok_or_else(|| QueryError::UnknownField(self.f1.clone()))?;
        Ok(Box::new(HashJoinScan {
            lhs_parts,
            rhs_parts,
            lhs_fields,
            key_idx,
            f2: self.f2.clone(),
            // The rehash modulus differs from the partition fan-out so a
            // bucket larger than one pass can still spread out.
            k2: self.tx.available_buffs().max(2),
            bucket: 0,
            table: Vec::new(),
            inner: None,
            probe: None,
            current_outer: None,
        }))
    }

    /// Write both sides out, read both back, plus the initial reads.
    fn blocks_accessed(&self) -> usize {
        (self.lhs.blocks_accessed().saturating_add(self.rhs.blocks_accessed()))
            .saturating_mul(3)
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

struct HashJoinScan {
    lhs_parts: Vec<TempTable>,
    rhs_parts: Vec<TempTable>,
    lhs_fields: Vec<String>,
    /// Index of the join field within `lhs_fields`.
    key_idx: usize,
    f2: String,
    k2: usize,
    /// Next partition pair to load.
    bucket: usize,
    /// In-memory rehash of the current left bucket, `k2` cells of rows.
    table: Vec<Vec<Vec<Constant>>>,
    inner: Option<TempScan>,
    /// Resume point for the current inner row's linear probe.
    probe: Option<(usize, usize)>,
    current_outer: Option<Vec<Constant>>,
}

impl HashJoinScan {
    fn load_bucket(&mut self) -> QueryResult<()> {
        self.table = vec![Vec::new(); self.k2];
        let mut src = self.lhs_parts[self.bucket].open();
        src.before_first()?;
        while src.next()? {
            let row: Vec<Constant> = self
                .lhs_fields
                .iter()
                .map(|f| src.get_val(f))
                .collect::<QueryResult<_>>()?;
            let cell = row[self.key_idx].bucket(self.k2);
            self.table[cell].push(row);
        }
        let mut inner = self.rhs_parts[self.bucket].open();
        inner.before_first()?;
        self.inner = Some(inner);
        Ok(())
    }
}

impl Scan for HashJoinScan {
    fn before_first(&mut self) -> QueryResult<()> {
        self.bucket = 0;
        self.table.clear();
        self.inner = None;
        self.probe = None;
        self.current_outer = None;
        Ok(())
    }

    fn next(&mut self) -> QueryResult<bool> {
        loop {
            // Resume the probe of the current inner row.
            if let (Some(inner), Some((cell, pos))) = (self.inner.as_ref(), self.probe) {
                let key = inner.get_val(&self.f2)?;
                let found = self.table[cell][pos..]
                    .iter()
                    .position(|row| row[self.key_idx] == key);
                match found {
                    Some(offset) => {
                        let at = pos + offset;
                        self.probe = Some((cell, at + 1));
                        self.current_outer = Some(self.table[cell][at].clone());
                        return Ok(true);
                    }
                    None => self.probe = None,
                }
            }
            // Advance to the next inner row of this bucket pair.
            if let Some(inner) = self.inner.as_mut() {
                if inner.next()? {
                    let cell = inner.get_val(&self.f2)?.bucket(self.k2);
                    self.probe = Some((cell, 0));
                    continue;
                }
                self.inner = None;
            }
            // Next bucket pair.
            if self.bucket >= self.lhs_parts.len() {
                self.current_outer = None;
                return Ok(false);
            }
            self.load_bucket()?;
            self.bucket += 1;
        }
    }

    fn get_val(&self, field: &str) -> QueryResult<Constant> {
        if let Some(i) = self.lhs_fields.iter().position(|f| f == field) {
            return self
                .current_outer
                .as_ref()
                .and_then(|row| row.get(i).cloned())
                .ok_or(QueryError::NotPositioned);
        }
        match self.inner.as_ref() {
            Some(inner) => inner.get_val(field),
            None => Err(QueryError::NotPositioned),
        }
    }

    fn has_field(&self, field: &str) -> bool {
        self.lhs_fields.iter().any(|f| f == field)
            || self.rhs_parts.first().is_some_and(|t| t.schema().has_field(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::TablePlan;
    use crate::storage::Db;

    fn join_pairs(db: &Db) -> Vec<(Constant, Constant)> {
        let tx = db.transaction();
        let lhs = Box::new(TablePlan::new(&tx, "dept").unwrap());
        let rhs = Box::new(TablePlan::new(&tx, "course").unwrap());
        let plan = HashJoinPlan::new(&tx, lhs, rhs, "did", "deptid");
        let mut scan = plan.open().unwrap();
        scan.before_first().unwrap();
        let mut pairs = Vec::new();
        while scan.next().unwrap() {
            pairs.push((scan.get_val("did").unwrap(), scan.get_val("cid").unwrap()));
        }
        pairs.sort();
        pairs
    }

    #[test]
    fn bucket_pairs_cover_every_match() {
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
        for (cid, deptid) in [(1, 10), (2, 10), (3, 20), (4, 99)] {
            db.insert(
                "course",
                vec![Constant::Int(cid), Constant::Int(deptid)],
            )
            .unwrap();
        }
        assert_eq!(
            join_pairs(&db),
            vec![
                (Constant::Int(10), Constant::Int(1)),
                (Constant::Int(10), Constant::Int(2)),
                (Constant::Int(20), Constant::Int(3)),
            ]
        );
    }

    #[test]
    fn duplicate_keys_on_both_sides_pair_fully() {
        let mut db = Db::with_defaults();
        db.create_table("dept", {
            let mut s = Schema::new();
            s.add_int_field("did");
            s
        });
        db.insert("dept", vec![Constant::Int(7)]).unwrap();
        db.insert("dept", vec![Constant::Int(7)]).unwrap();
        db.create_table("course", {
            let mut s = Schema::new();
            s.add_int_field("cid");
            s.add_int_field("deptid");
            s
        });
        db.insert("course", vec![Constant::Int(1), Constant::Int(7)])
            .unwrap();
        db.insert("course", vec![Constant::Int(2), Constant::Int(7)])
            .unwrap();
        assert_eq!(join_pairs(&db).len(), 4);
    }

    #[test]
    fn string_keys_hash_into_matching_buckets() {
        let mut db = Db::with_defaults();
        db.create_table("dept", {
            let mut s = Schema::new();
            s.add_string_field("did", 8);
            s
        });
        db.insert("dept", vec![Constant::from("cs")]).unwrap();
        db.insert("dept", vec![Constant::from("ee")]).unwrap();
        db.create_table("course", {
            let mut s = Schema::new();
            s.add_int_field("cid");
            s.add_string_field("deptid", 8);
            s
        });
        db.insert("course", vec![Constant::Int(1), Constant::from("ee")])
            .unwrap();
        assert_eq!(
            join_pairs(&db),
            vec![(Constant::from("ee"), Constant::Int(1))]
        );
    }
}

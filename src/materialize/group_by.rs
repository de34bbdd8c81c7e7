//! Grouped aggregation
//!
//! Sorts the input on the grouping fields, then folds each run of equal
//! group values through one accumulator per aggregate. The output holds
//! the grouping fields followed by the aggregate fields; an empty input
//! produces no groups at all.

use crate::plan::Plan;
use crate::query::{Constant, QueryError, QueryResult, Scan};
use crate::record::{FieldType, Schema};
use crate::storage::Transaction;

use super::aggregate::{AggregateSpec, AggregationFn};
use super::sort::{SortField, SortPlan};

#[derive(Clone)]
pub struct GroupByPlan {
    sorted: SortPlan,
    group_fields: Vec<String>,
    specs: Vec<AggregateSpec>,
    schema: Schema,
}

impl GroupByPlan {
    pub fn new(
        tx: &Transaction,
        child: Box<dyn Plan>,
        group_fields: Vec<String>,
        specs: Vec<AggregateSpec>,
    ) -> QueryResult<Self> {
        let mut schema = Schema::new();
        for f in &group_fields {
            let ftype = child
                .schema()
                .field_type(f)
                .ok_or_else(|| QueryError::UnknownField(f.clone()))?;
            match ftype {
                FieldType::Int => schema.add_int_field(f.clone()),
                FieldType::Varchar(len) => schema.add_string_field(f.clone(), len),
            }
        }
        for spec in &specs {
            schema.add_int_field(spec.output_name());
        }
        let sort_fields = group_fields.iter().map(SortField::asc).collect();
        Ok(Self {
            sorted: SortPlan::new(tx, child, sort_fields),
            group_fields,
            specs,
            schema,
        })
    }
}

impl Plan for GroupByPlan {
    fn open(&self) -> QueryResult<Box<dyn Scan>> {
        let mut scan = self.sorted.open()?;
        scan.before_first()?;
        let more = scan.next()?;
        Ok(Box::new(GroupByScan {
            scan,
            group_fields: self.group_fields.clone(),
            specs: self.specs.clone(),
            more,
            group_vals: Vec::new(),
            agg_vals: Vec::new(),
        }))
    }

    fn blocks_accessed(&self) -> usize {
        self.sorted.blocks_accessed()
    }

    /// One row per combination of grouping values, capped by input size.
    fn records_output(&self) -> usize {
        let combos = self
            .group_fields
            .iter()
            .fold(1usize, |acc, f| {
                acc.saturating_mul(self.sorted.distinct_values(f))
            });
        combos.min(self.sorted.records_output()).max(1)
    }

    fn distinct_values(&self, field: &str) -> usize {
        if self.group_fields.iter().any(|f| f == field) {
            self.sorted.distinct_values(field)
        } else {
            self.records_output()
        }
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn clone_box(&self) -> Box<dyn Plan> {
        Box::new(self.clone())
    }
}

struct GroupByScan {
    scan: Box<dyn Scan>,
    group_fields: Vec<String>,
    specs: Vec<AggregateSpec>,
    /// Lookahead: the underlying scan sits on the first row of the next
    /// group, or past the end.
    more: bool,
    group_vals: Vec<Constant>,
    agg_vals: Vec<Constant>,
}

impl GroupByScan {
    fn key_of(&self) -> QueryResult<Vec<Constant>> {
        self.group_fields
            .iter()
            .map(|f| self.scan.get_val(f))
            .collect()
    }
}

impl Scan for GroupByScan {
    fn before_first(&mut self) -> QueryResult<()> {
        self.scan.before_first()?;
        self.more = self.scan.next()?;
        self.group_vals.clear();
        self.agg_vals.clear();
        Ok(())
    }

    fn next(&mut self) -> QueryResult<bool> {
        if !self.more {
            return Ok(false);
        }
        self.group_vals = self.key_of()?;
        let mut fns = self
            .specs
            .iter()
            .map(|spec| AggregationFn::start(spec, self.scan.as_ref()))
            .collect::<QueryResult<Vec<_>>>()?;
        loop {
            if !self.scan.next()? {
                self.more = false;
                break;
            }
            if self.key_of()? != self.group_vals {
                break;
            }
            for (f, spec) in fns.iter_mut().zip(&self.specs) {
                f.absorb(spec, self.scan.as_ref())?;
            }
        }
        self.agg_vals = fns.iter().map(AggregationFn::value).collect();
        Ok(true)
    }

    fn get_val(&self, field: &str) -> QueryResult<Constant> {
        if let Some(i) = self.group_fields.iter().position(|f| f == field) {
            return self
                .group_vals
                .get(i)
                .cloned()
                .ok_or(QueryError::NotPositioned);
        }
        self.specs
            .iter()
            .position(|s| s.output_name() == field)
            .and_then(|i| self.agg_vals.get(i).cloned())
            .ok_or_else(|| QueryError::UnknownField(field.to_string()))
    }

    fn has_field(&self, field: &str) -> bool {
        self.group_fields.iter().any(|f| f == field)
            || self.specs.iter().any(|s| s.output_name() == field)
    }

    fn close(&mut self) {
        self.scan.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materialize::AggregateKind;
    use crate::plan::TablePlan;
    use crate::storage::Db;

    fn db_with_sales() -> Db {
        let mut db = Db::with_defaults();
        let mut schema = Schema::new();
        schema.add_string_field("region", 8);
        schema.add_int_field("amount");
        db.create_table("sales", schema);
        for (region, amount) in [
            ("east", 10),
            ("west", 5),
            ("east", 20),
            ("west", 7),
            ("east", 30),
        ] {
            db.insert(
                "sales",
                vec![Constant::from(region), Constant::Int(amount)],
            )
            .unwrap();
        }
        db
    }

    #[test]
    fn groups_fold_runs_of_equal_keys() {
        let db = db_with_sales();
        let tx = db.transaction();
        let child = Box::new(TablePlan::new(&tx, "sales").unwrap());
        let plan = GroupByPlan::new(
            &tx,
            child,
            vec!["region".to_string()],
            vec![
                AggregateSpec::new(AggregateKind::Count, "amount"),
                AggregateSpec::new(AggregateKind::Sum, "amount"),
            ],
        )
        .unwrap();
        let mut scan = plan.open().unwrap();
        let mut out = Vec::new();
        while scan.next().unwrap() {
            out.push((
                scan.get_val("region").unwrap(),
                scan.get_val("countofamount").unwrap(),
                scan.get_val("sumofamount").unwrap(),
            ));
        }
        assert_eq!(
            out,
            vec![
                (Constant::from("east"), Constant::Int(3), Constant::Int(60)),
                (Constant::from("west"), Constant::Int(2), Constant::Int(12)),
            ]
        );
    }

    #[test]
    fn empty_input_yields_no_groups() {
        let mut db = Db::with_defaults();
        let mut schema = Schema::new();
        schema.add_int_field("g");
        schema.add_int_field("v");
        db.create_table("t", schema);
        let tx = db.transaction();
        let child = Box::new(TablePlan::new(&tx, "t").unwrap());
        let plan = GroupByPlan::new(
            &tx,
            child,
            vec!["g".to_string()],
            vec![AggregateSpec::new(AggregateKind::Count, "v")],
        )
        .unwrap();
        let mut scan = plan.open().unwrap();
        assert!(!scan.next().unwrap());
    }

    #[test]
    fn unknown_group_field_fails_at_plan_time() {
        let db = db_with_sales();
        let tx = db.transaction();
        let child = Box::new(TablePlan::new(&tx, "sales").unwrap());
        let err = GroupByPlan::new(
            &tx,
            child,
            vec!["nope".to_string()],
            vec![],
        )
        .map(|_| ())
        .unwrap_err();
        assert!(matches!(err, QueryError::UnknownField(_)));
    }
}

//! Aggregation
//!
//! Whole-input aggregates without grouping: the plan's output is exactly
//! one row whose fields are named `<kind>of<field>` (for example
//! `countofsid`). The per-kind accumulator is shared with
//! [`GroupByPlan`](super::GroupByPlan), which runs one accumulator per
//! group instead of one overall.
//!
//! `count` counts rows whatever the field holds, `sum` and `avg` require
//! integer fields, `avg` truncates toward zero like integer division,
//! and `min`/`max` follow [`Constant`] ordering.

use std::fmt;

use crate::plan::Plan;
use crate::query::{Constant, QueryError, QueryResult, Scan};
use crate::record::Schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Count,
    Min,
    Max,
    Sum,
    Avg,
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AggregateKind::Count => "count",
            AggregateKind::Min => "min",
            AggregateKind::Max => "max",
            AggregateKind::Sum => "sum",
            AggregateKind::Avg => "avg",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSpec {
    pub kind: AggregateKind,
    pub field: String,
}

impl AggregateSpec {
    pub fn new(kind: AggregateKind, field: impl Into<String>) -> Self {
        Self {
            kind,
            field: field.into(),
        }
    }

    /// Output field name, e.g. `maxofgrade`.
    pub fn output_name(&self) -> String {
        format!("{}of{}", self.kind, self.field)
    }
}

/// Accumulator state for one aggregate over one run of rows.
pub(super) enum AggregationFn {
    Count(usize),
    Extreme {
        best: Constant,
        take_max: bool,
    },
    Sum(i64),
    Avg {
        sum: i64,
        count: usize,
    },
}

impl AggregationFn {
    pub(super) fn start(spec: &AggregateSpec, scan: &dyn Scan) -> QueryResult<Self> {
        let state = match spec.kind {
            AggregateKind::Count => AggregationFn::Count(1),
            AggregateKind::Min | AggregateKind::Max => AggregationFn::Extreme {
                best: scan.get_val(&spec.field)?,
                take_max: spec.kind == AggregateKind::Max,
            },
            AggregateKind::Sum => AggregationFn::Sum(int_of(scan, &spec.field)? as i64),
            AggregateKind::Avg => AggregationFn::Avg {
                sum: int_of(scan, &spec.field)? as i64,
                count: 1,
            },
        };
        Ok(state)
    }

    pub(super) fn absorb(&mut self, spec: &AggregateSpec, scan: &dyn Scan) -> QueryResult<()> {
        match self {
            AggregationFn::Count(n) => *n += 1,
            AggregationFn::Extreme { best, take_max } => {
                let v = scan.get_val(&spec.field)?;
                let better = if *take_max { v > *best } else { v < *best };
                if better {
                    *best = v;
                }
            }
            AggregationFn::Sum(total) => *total += int_of(scan, &spec.field)? as i64,
            AggregationFn::Avg { sum, count } => {
                *sum += int_of(scan, &spec.field)? as i64;
                *count += 1;
            }
        }
        Ok(())
    }

    pub(super) fn value(&self) -> Constant {
        match self {
            AggregationFn::Count(n) => Constant::Int((*n).min(i32::MAX as usize) as i32),
            AggregationFn::Extreme { best, .. } => best.clone(),
            AggregationFn::Sum(total) => Constant::Int(clamp_to_int(*total)),
            AggregationFn::Avg { sum, count } => Constant::Int(clamp_to_int(sum / *count as i64)),
        }
    }

    /// The value an aggregate reports over zero rows.
    pub(super) fn empty_value(spec: &AggregateSpec) -> Constant {
        match spec.kind {
            AggregateKind::Count => Constant::Int(0),
            _ => Constant::Int(0),
        }
    }
}

/// Sums accumulate in 64 bits; clamp to the value range instead of
/// wrapping on the way out.
fn clamp_to_int(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

fn int_of(scan: &dyn Scan, field: &str) -> QueryResult<i32> {
    match scan.get_val(field)? {
        Constant::Int(i) => Ok(i),
        Constant::Str(_) => Err(QueryError::not_an_int(field)),
    }
}

#[derive(Clone)]
pub struct AggregatePlan {
    child: Box<dyn Plan>,
    specs: Vec<AggregateSpec>,
    schema: Schema,
}

impl AggregatePlan {
    pub fn new(child: Box<dyn Plan>, specs: Vec<AggregateSpec>) -> Self {
        let mut schema = Schema::new();
        for spec in &specs {
            schema.add_int_field(spec.output_name());
        }
        Self {
            child,
            specs,
            schema,
        }
    }
}

impl Plan for AggregatePlan {
    fn open(&self) -> QueryResult<Box<dyn Scan>> {
        let mut src = self.child.open()?;
        src.before_first()?;
        let mut fns: Option<Vec<AggregationFn>> = None;
        while src.next()? {
            match fns.as_mut() {
                None => {
                    let started = self
                        .specs
                        .iter()
                        .map(|spec| AggregationFn::start(spec, src.as_ref()))
                        .collect::<QueryResult<Vec<_>>>()?;
                    fns = Some(started);
                }
                Some(fns) => {
                    for (f, spec) in fns.iter_mut().zip(&self.specs) {
                        f.absorb(spec, src.as_ref())?;
                    }
                }
            }
        }
        src.close();
        let values = match fns {
            Some(fns) => fns.iter().map(AggregationFn::value).collect(),
            None => self.specs.iter().map(AggregationFn::empty_value).collect(),
        };
        Ok(Box::new(AggregateScan {
            fields: self.specs.iter().map(AggregateSpec::output_name).collect(),
            values,
            pos: None,
        }))
    }

    fn blocks_accessed(&self) -> usize {
        self.child.blocks_accessed()
    }

    fn records_output(&self) -> usize {
        1
    }

    fn distinct_values(&self, _field: &str) -> usize {
        1
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn clone_box(&self) -> Box<dyn Plan> {
        Box::new(self.clone())
    }
}

/// The single result row.
struct AggregateScan {
    fields: Vec<String>,
    values: Vec<Constant>,
    pos: Option<bool>,
}

impl Scan for AggregateScan {
    fn before_first(&mut self) -> QueryResult<()> {
        self.pos = None;
        Ok(())
    }

    fn next(&mut self) -> QueryResult<bool> {
        match self.pos {
            None => {
                self.pos = Some(true);
                Ok(true)
            }
            Some(_) => {
                self.pos = Some(false);
                Ok(false)
            }
        }
    }

    fn get_val(&self, field: &str) -> QueryResult<Constant> {
        if self.pos != Some(true) {
            return Err(QueryError::NotPositioned);
        }
        self.fields
            .iter()
            .position(|f| f == field)
            .map(|i| self.values[i].clone())
            .ok_or_else(|| QueryError::UnknownField(field.to_string()))
    }

    fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }
}

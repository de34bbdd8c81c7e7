//! Parsed query data
//!
//! `QueryData` is the planner's input: the field list, table list, and
//! predicate a SQL frontend would produce, plus the optional grouping,
//! aggregation, ordering, and distinct clauses. Built with chained
//! setters so test fixtures read close to the query they describe.

use crate::materialize::{AggregateSpec, SortField};
use crate::query::Predicate;

#[derive(Debug, Clone, Default)]
pub struct QueryData {
    fields: Vec<String>,
    tables: Vec<String>,
    pred: Predicate,
    group_fields: Option<Vec<String>>,
    agg_specs: Vec<AggregateSpec>,
    sort_fields: Vec<SortField>,
    distinct: bool,
}

impl QueryData {
    pub fn new(fields: Vec<String>, tables: Vec<String>, pred: Predicate) -> Self {
        Self {
            fields,
            tables,
            pred,
            ..Default::default()
        }
    }

    pub fn group_by(mut self, fields: Vec<String>) -> Self {
        self.group_fields = Some(fields);
        self
    }

    pub fn aggregate(mut self, spec: AggregateSpec) -> Self {
        self.agg_specs.push(spec);
        self
    }

    pub fn order_by(mut self, fields: Vec<SortField>) -> Self {
        self.sort_fields = fields;
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn pred(&self) -> &Predicate {
        &self.pred
    }

    pub fn group_fields(&self) -> Option<&[String]> {
        self.group_fields.as_deref()
    }

    pub fn agg_specs(&self) -> &[AggregateSpec] {
        &self.agg_specs
    }

    pub fn sort_fields(&self) -> &[SortField] {
        &self.sort_fields
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }
}

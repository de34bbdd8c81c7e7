//! Projection
//!
//! Restricts a child plan's output to the requested fields. Creation
//! fails fast on a field the child schema does not contain.

use crate::query::{Constant, QueryError, QueryResult, Scan};
use crate::record::Schema;

use super::plan::Plan;

/// A plan projecting its child onto a field list.
#[derive(Clone)]
pub struct ProjectPlan {
    child: Box<dyn Plan>,
    schema: Schema,
}

impl ProjectPlan {
    /// Creates a projection onto the given fields
    pub fn new(child: Box<dyn Plan>, fields: &[String]) -> QueryResult<Self> {
        let mut schema = Schema::new();
        for f in fields {
            let ftype = child
                .schema()
                .field_type(f)
                .ok_or_else(|| QueryError::UnknownField(f.clone()))?;
            schema.add_field(f.clone(), ftype);
        }
        Ok(Self { child, schema })
    }
}

impl Plan for ProjectPlan {
    fn open(&self) -> QueryResult<Box<dyn Scan>> {
        Ok(Box::new(ProjectScan {
            child: self.child.open()?,
            schema: self.schema.clone(),
        }))
    }

    fn blocks_accessed(&self) -> usize {
        self.child.blocks_accessed()
    }

    fn records_output(&self) -> usize {
        self.child.records_output()
    }

    fn distinct_values(&self, field: &str) -> usize {
        self.child.distinct_values(field)
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn clone_box(&self) -> Box<dyn Plan> {
        Box::new(self.clone())
    }
}

/// Cursor exposing only the projected fields.
pub struct ProjectScan {
    child: Box<dyn Scan>,
    schema: Schema,
}

impl Scan for ProjectScan {
    fn before_first(&mut self) -> QueryResult<()> {
        self.child.before_first()
    }

    fn next(&mut self) -> QueryResult<bool> {
        self.child.next()
    }

    fn get_val(&self, field: &str) -> QueryResult<Constant> {
        if !self.schema.has_field(field) {
            return Err(QueryError::UnknownField(field.to_string()));
        }
        self.child.get_val(field)
    }

    fn has_field(&self, field: &str) -> bool {
        self.schema.has_field(field)
    }

    fn close(&mut self) {
        self.child.close();
    }
}

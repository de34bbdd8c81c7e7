//! Positional rows

use crate::query::Constant;

use super::schema::{FieldType, Schema};

/// A single row of constants, positionally matched to a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    values: Vec<Constant>,
}

impl Row {
    /// Creates a row from the given values
    pub fn new(values: Vec<Constant>) -> Self {
        Self { values }
    }

    /// Creates a row of type-appropriate zero values for the schema.
    ///
    /// Used by update scans that insert first and assign fields afterwards.
    pub fn zeroed(schema: &Schema) -> Self {
        let values = schema
            .fields()
            .map(|f| match schema.field_type(f) {
                Some(FieldType::Varchar(_)) => Constant::Str(String::new()),
                _ => Constant::Int(0),
            })
            .collect();
        Self { values }
    }

    /// Returns the value at the given position
    pub fn get(&self, idx: usize) -> Option<&Constant> {
        self.values.get(idx)
    }

    /// Replaces the value at the given position
    pub fn set(&mut self, idx: usize, val: Constant) {
        if idx < self.values.len() {
            self.values[idx] = val;
        }
    }

    /// Returns the number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row holds no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<Constant>> for Row {
    fn from(values: Vec<Constant>) -> Self {
        Self::new(values)
    }
}

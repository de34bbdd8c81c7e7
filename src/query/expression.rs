//! Expressions
//!
//! An expression is either a field reference or a literal constant.

use std::fmt;

use crate::record::Schema;

use super::constant::Constant;
use super::errors::QueryResult;
use super::scan::Scan;

/// One side of a comparison term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    /// A reference to a named field
    Field(String),
    /// A literal constant
    Const(Constant),
}

impl Expression {
    /// Creates a field-reference expression
    pub fn field(name: impl Into<String>) -> Self {
        Expression::Field(name.into())
    }

    /// Creates a constant expression
    pub fn constant(val: impl Into<Constant>) -> Self {
        Expression::Const(val.into())
    }

    /// Evaluates the expression against the scan's current row
    pub fn evaluate(&self, s: &dyn Scan) -> QueryResult<Constant> {
        match self {
            Expression::Field(name) => s.get_val(name),
            Expression::Const(val) => Ok(val.clone()),
        }
    }

    /// Returns true if the expression is a field reference
    pub fn is_field_name(&self) -> bool {
        matches!(self, Expression::Field(_))
    }

    /// Returns the field name, if the expression is a field reference
    pub fn as_field_name(&self) -> Option<&str> {
        match self {
            Expression::Field(name) => Some(name),
            Expression::Const(_) => None,
        }
    }

    /// Returns the constant, if the expression is a literal
    pub fn as_constant(&self) -> Option<&Constant> {
        match self {
            Expression::Field(_) => None,
            Expression::Const(val) => Some(val),
        }
    }

    /// Returns true if every field the expression mentions is in the schema
    pub fn applies_to(&self, schema: &Schema) -> bool {
        match self {
            Expression::Field(name) => schema.has_field(name),
            Expression::Const(_) => true,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Field(name) => write!(f, "{}", name),
            Expression::Const(val) => write!(f, "{}", val),
        }
    }
}

//! Query execution error types

use thiserror::Error;

/// Result type for scan and plan operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised while building or driving scans
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("field '{field}' is not of type {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
    },

    #[error("scan is not positioned on a row")]
    NotPositioned,

    #[error("index does not support operator {0}")]
    UnsupportedIndexOp(String),

    #[error("index structure corrupted: {0}")]
    CorruptIndex(String),
}

impl QueryError {
    /// Create a type mismatch error for an integer access
    pub fn not_an_int(field: impl Into<String>) -> Self {
        QueryError::TypeMismatch {
            field: field.into(),
            expected: "int",
        }
    }

    /// Create a type mismatch error for a string access
    pub fn not_a_string(field: impl Into<String>) -> Self {
        QueryError::TypeMismatch {
            field: field.into(),
            expected: "string",
        }
    }
}

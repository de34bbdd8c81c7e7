//! Planner errors

use thiserror::Error;

use crate::query::QueryError;

pub type PlannerResult<T> = Result<T, PlannerError>;

#[derive(Debug, Error)]
pub enum PlannerError {
    /// A select, sort, or group list names a field no planned table has
    #[error("unknown field in query: {0}")]
    UnknownField(String),

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    /// A planning invariant was violated; indicates a planner bug
    #[error("internal planner error: {0}")]
    Internal(String),
}

//! Query condition language for quilldb
//!
//! Defines the boolean condition language evaluated against row cursors:
//! constants, expressions, comparison terms, and AND-only predicates.
//! Also defines the [`Scan`] cursor contract that every physical operator
//! implements.
//!
//! # Design Principles
//!
//! - Predicates are conjunctions of terms; no OR, no negation
//! - All ordering goes through `Constant`'s total order
//! - Every row-touching operation returns a `QueryResult`; unknown fields
//!   fail fast instead of returning garbage

mod constant;
mod errors;
mod expression;
mod predicate;
mod scan;
mod term;

pub use constant::Constant;
pub use errors::{QueryError, QueryResult};
pub use expression::Expression;
pub use predicate::Predicate;
pub use scan::{Scan, UpdateScan};
pub use term::{CompareOp, Term};

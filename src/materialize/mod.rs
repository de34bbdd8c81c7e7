//! Materializing operators for quilldb
//!
//! Operators here copy their input into temporary tables before (or
//! while) producing output: external-style sort, duplicate elimination,
//! grouping and aggregation, and the join algorithms that rely on
//! materialized or re-readable input (sort-merge, partitioned hash,
//! block nested-loop).
//!
//! # Design Principles
//!
//! - Temporary tables are ordinary row stores named by the catalog's
//!   temp counter, so runs are reproducible
//! - Sorting is stable with ties broken in input order; every downstream
//!   operator may rely on that
//! - Cost estimates never execute anything

mod aggregate;
mod distinct;
mod group_by;
mod hash_join;
mod merge_join;
mod nested_loop;
mod sort;
mod temp;

pub use aggregate::{AggregateKind, AggregatePlan, AggregateSpec};
pub use distinct::DistinctPlan;
pub use group_by::GroupByPlan;
pub use hash_join::HashJoinPlan;
pub use merge_join::MergeJoinPlan;
pub use nested_loop::NestedLoopJoinPlan;
pub use sort::{SortDirection, SortField, SortPlan, SortScan};
pub use temp::TempTable;

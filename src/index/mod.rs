//! Index subsystem for quilldb
//!
//! An ordered B-tree index with page splitting and overflow chaining, a
//! flat hash index for equality lookups, and the index-driven access
//! plans (index select, index join). Index metadata reaches the planner
//! as [`IndexInfo`], which carries cost estimates alongside an opened
//! handle.
//!
//! # Invariants
//!
//! - Leaf keys are non-decreasing within a page and along overflow chains
//! - A run of duplicate keys grows an overflow chain, never the directory
//! - Hash indexes serve equality only; the planner must not offer them
//!   range predicates

mod btree;
mod hash;
mod info;
mod join_plan;
mod select_plan;

pub use btree::{BTreeIndex, DirEntry};
pub use hash::HashIndex;
pub use info::{Index, IndexInfo, IndexType};
pub use join_plan::{IndexJoinPlan, IndexJoinScan};
pub use select_plan::{IndexSelectPlan, IndexSelectScan};

//! quilldb - a deterministic relational query execution core
//!
//! Cost-based heuristic planning over five physical join algorithms,
//! B-tree and hash indexing, and materializing sort/group/distinct
//! operators, all behind a Plan/Scan iterator abstraction.

pub mod index;
pub mod materialize;
pub mod observability;
pub mod plan;
pub mod planner;
pub mod query;
pub mod record;
pub mod storage;

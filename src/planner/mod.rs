//! Query planning for quilldb
//!
//! The heuristic planner turns parsed query data into an executable
//! [`Plan`](crate::plan::Plan) tree. It picks a left-deep join order
//! greedily, chooses the cheapest join algorithm at every step by the
//! `blocks_accessed() + records_output()` metric, and wires in index
//! access where an index beats a scan. Every decision is recorded in a
//! [`PlanTrace`] returned alongside the plan, and logged as structured
//! events.
//!
//! # Design Principles
//!
//! - Planning is deterministic: same query plus same statistics means
//!   the same plan, always
//! - Unknown fields and tables fail before any row is produced
//! - A cross product is always available as the join of last resort

mod ast;
mod errors;
mod heuristic;
mod table_planner;
mod trace;

pub use ast::QueryData;
pub use errors::{PlannerError, PlannerResult};
pub use heuristic::HeuristicQueryPlanner;
pub use table_planner::TablePlanner;
pub use trace::{IndexUse, JoinAlgorithm, JoinStep, PlanTrace};

//! Relational plans for quilldb
//!
//! A [`Plan`] is an immutable, composable description of how to compute a
//! relation: it estimates its cost without executing anything, exposes its
//! output schema, and acts as a factory for [`Scan`](crate::query::Scan)
//! cursors. This module holds the base access plans; joins and
//! materializing operators live in [`crate::materialize`] and
//! [`crate::index`].

mod plan;
mod product_plan;
mod project_plan;
mod select_plan;
mod table_plan;

pub use plan::Plan;
pub use product_plan::ProductPlan;
pub use project_plan::ProjectPlan;
pub use select_plan::SelectPlan;
pub use table_plan::{TablePlan, TableScan};

//! Plan explanation
//!
//! A structured record of every decision the planner made: the seed
//! table, each join step with its algorithm and estimated cost, and any
//! index chosen for selection. Serializes to JSON for tooling and
//! renders a human-readable summary via `Display`.

use std::fmt;

use serde::Serialize;

use crate::index::IndexType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinAlgorithm {
    Index,
    SortMerge,
    NestedLoop,
    Hash,
    Product,
}

impl JoinAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinAlgorithm::Index => "index",
            JoinAlgorithm::SortMerge => "sortmerge",
            JoinAlgorithm::NestedLoop => "nestedloop",
            JoinAlgorithm::Hash => "hash",
            JoinAlgorithm::Product => "product",
        }
    }
}

impl fmt::Display for JoinAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An index the planner decided to use, and for what.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexUse {
    pub table: String,
    pub field: String,
    pub index_type: IndexType,
}

/// One step of the greedy join-order construction.
#[derive(Debug, Clone, Serialize)]
pub struct JoinStep {
    pub table: String,
    pub algorithm: JoinAlgorithm,
    /// `blocks_accessed() + records_output()` of the chosen candidate.
    pub cost: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanTrace {
    pub seed_table: String,
    pub steps: Vec<JoinStep>,
    pub indexes_used: Vec<IndexUse>,
}

impl PlanTrace {
    pub fn join_order(&self) -> Vec<&str> {
        let mut order = vec![self.seed_table.as_str()];
        order.extend(self.steps.iter().map(|s| s.table.as_str()));
        order
    }

    /// One-object JSON rendering, used by the completion log event.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl fmt::Display for PlanTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seed {}", self.seed_table)?;
        for step in &self.steps {
            write!(
                f,
                ", join {} via {} (cost {})",
                step.table, step.algorithm, step.cost
            )?;
        }
        for iu in &self.indexes_used {
            write!(f, "; index {} on {}.{}", iu.index_type, iu.table, iu.field)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_renders_order_and_indexes() {
        let trace = PlanTrace {
            seed_table: "dept".into(),
            steps: vec![JoinStep {
                table: "course".into(),
                algorithm: JoinAlgorithm::Index,
                cost: 12,
            }],
            indexes_used: vec![IndexUse {
                table: "course".into(),
                field: "deptid".into(),
                index_type: IndexType::BTree,
            }],
        };
        assert_eq!(trace.join_order(), vec!["dept", "course"]);
        let text = trace.to_string();
        assert!(text.contains("join course via index (cost 12)"));
        assert!(text.contains("index btree on course.deptid"));
    }

    #[test]
    fn trace_serializes_to_json() {
        let trace = PlanTrace {
            seed_table: "t".into(),
            steps: vec![],
            indexes_used: vec![],
        };
        let json = trace.to_json();
        assert!(json.contains("\"seed_table\":\"t\""));
    }
}

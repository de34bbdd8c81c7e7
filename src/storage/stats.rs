//! Table statistics
//!
//! Per-table row and distinct-value counts used for cost estimation.
//! Statistics are computed straight from the stored rows, so repeated
//! planning over an unchanged catalog is deterministic.

use std::collections::{HashMap, HashSet};

use crate::record::{Row, Schema};

/// Cardinality statistics for one table.
#[derive(Debug, Clone, Default)]
pub struct TableStats {
    num_rows: usize,
    distinct: HashMap<String, usize>,
}

impl TableStats {
    /// Computes statistics over the given rows
    pub fn from_rows(schema: &Schema, rows: &[Row]) -> Self {
        let mut distinct = HashMap::new();
        for (idx, field) in schema.fields().enumerate() {
            let vals: HashSet<_> = rows.iter().filter_map(|r| r.get(idx)).collect();
            distinct.insert(field.to_string(), vals.len());
        }
        Self {
            num_rows: rows.len(),
            distinct,
        }
    }

    /// Returns the number of rows in the table
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Returns the estimated number of distinct values of the field.
    ///
    /// Unknown fields fall back to the classic one-third guess so cost
    /// estimation never divides by zero.
    pub fn distinct_values(&self, field: &str) -> usize {
        match self.distinct.get(field) {
            Some(&n) => n.max(1),
            None => 1 + self.num_rows / 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Constant;

    #[test]
    fn test_from_rows_counts_distincts() {
        let mut sch = Schema::new();
        sch.add_int_field("deptid");
        let rows = vec![
            Row::new(vec![Constant::Int(10)]),
            Row::new(vec![Constant::Int(10)]),
            Row::new(vec![Constant::Int(20)]),
        ];
        let stats = TableStats::from_rows(&sch, &rows);
        assert_eq!(stats.num_rows(), 3);
        assert_eq!(stats.distinct_values("deptid"), 2);
    }

    #[test]
    fn test_distinct_never_zero() {
        let sch = Schema::new();
        let stats = TableStats::from_rows(&sch, &[]);
        assert!(stats.distinct_values("missing") >= 1);
    }
}

//! Heuristic query planner
//!
//! Greedy left-deep join ordering. The seed is the table whose
//! standalone selection plan promises the fewest rows; each growth step
//! joins in the remaining table with the globally cheapest candidate
//! plan under the `blocks_accessed() + records_output()` metric.
//! Candidate algorithms are tried in a fixed order (index, sort-merge,
//! nested-loop, hash, product) and ties keep the first one seen, which
//! makes plan choice fully deterministic.

use crate::materialize::{AggregatePlan, DistinctPlan, GroupByPlan, SortField, SortPlan};
use crate::observability::Logger;
use crate::plan::{Plan, ProjectPlan};
use crate::query::Expression;
use crate::record::Schema;
use crate::storage::Transaction;

use super::ast::QueryData;
use super::errors::{PlannerError, PlannerResult};
use super::table_planner::TablePlanner;
use super::trace::{IndexUse, JoinAlgorithm, JoinStep, PlanTrace};

pub struct HeuristicQueryPlanner;

fn cost(p: &dyn Plan) -> usize {
    p.blocks_accessed().saturating_add(p.records_output())
}

impl HeuristicQueryPlanner {
    /// The sole entry point: a plan for the query plus the trace of the
    /// decisions that produced it.
    pub fn create_query_plan(
        tx: &Transaction,
        data: &QueryData,
    ) -> PlannerResult<(Box<dyn Plan>, PlanTrace)> {
        if data.tables().is_empty() {
            return Err(PlannerError::Internal("query references no tables".into()));
        }
        let mut planners: Vec<TablePlanner> = data
            .tables()
            .iter()
            .map(|t| TablePlanner::new(tx, t, data.pred().clone()))
            .collect::<PlannerResult<_>>()?;
        Self::validate_fields(data, &planners)?;

        let mut trace = PlanTrace::default();

        // Seed: lowest standalone output estimate; ties keep query order.
        let mut seed_idx = 0;
        let mut seed_plan: Option<(Box<dyn Plan>, Option<IndexUse>)> = None;
        for (i, tp) in planners.iter().enumerate() {
            let (plan, used) = tp.make_select_plan();
            let better = match &seed_plan {
                None => true,
                Some((best, _)) => plan.records_output() < best.records_output(),
            };
            if better {
                seed_idx = i;
                seed_plan = Some((plan, used));
            }
        }
        let (mut current, seed_index_use) = match seed_plan {
            Some(p) => p,
            None => return Err(PlannerError::Internal("no seed plan".into())),
        };
        let seed = planners.remove(seed_idx);
        trace.seed_table = seed.table().to_string();
        Logger::trace(
            "planner_seed",
            &[
                ("table", seed.table()),
                ("records", &current.records_output().to_string()),
            ],
        );
        if let Some(used) = seed_index_use {
            Logger::trace(
                "planner_index_select",
                &[
                    ("field", &used.field),
                    ("index_type", used.index_type.to_string().as_str()),
                    ("table", &used.table),
                ],
            );
            trace.indexes_used.push(used);
        }

        // Grow: cheapest candidate across all remaining tables.
        while !planners.is_empty() {
            let mut best: Option<(usize, Box<dyn Plan>, JoinAlgorithm, Option<IndexUse>)> = None;
            for (i, tp) in planners.iter().enumerate() {
                for (plan, algorithm, used) in Self::candidates(tp, current.as_ref()) {
                    let better = match &best {
                        None => true,
                        Some((_, b, _, _)) => cost(plan.as_ref()) < cost(b.as_ref()),
                    };
                    if better {
                        best = Some((i, plan, algorithm, used));
                    }
                }
            }
            let (idx, plan, algorithm, used) = match best {
                Some(b) => b,
                None => {
                    return Err(PlannerError::Internal(
                        "no join candidate; product fallback missing".into(),
                    ))
                }
            };
            let tp = planners.remove(idx);
            let step = JoinStep {
                table: tp.table().to_string(),
                algorithm,
                cost: cost(plan.as_ref()),
            };
            Logger::trace(
                "planner_join_step",
                &[
                    ("algorithm", algorithm.as_str()),
                    ("cost", &step.cost.to_string()),
                    ("table", &step.table),
                ],
            );
            trace.steps.push(step);
            if let Some(used) = used {
                trace.indexes_used.push(used);
            }
            current = plan;
        }

        let plan = Self::finish(tx, data, current)?;
        Logger::info(
            "planner_complete",
            &[
                ("join_order", &trace.join_order().join(",")),
                ("trace", &trace.to_json()),
            ],
        );
        Ok((plan, trace))
    }

    /// Candidate plans for joining `tp`'s table onto the partial plan,
    /// in tie-break order. Equality joins consider every algorithm,
    /// non-equality joins only nested-loop, unconnected tables only the
    /// cross product.
    fn candidates(
        tp: &TablePlanner,
        current: &dyn Plan,
    ) -> Vec<(Box<dyn Plan>, JoinAlgorithm, Option<IndexUse>)> {
        let mut out = Vec::new();
        match tp.join_connection(current.schema()) {
            Some(op) if op.is_equality() => {
                if let Some((plan, used)) = tp.make_index_join_plan(current) {
                    out.push((plan, JoinAlgorithm::Index, Some(used)));
                }
                if let Some(plan) = tp.make_sort_merge_plan(current) {
                    out.push((plan, JoinAlgorithm::SortMerge, None));
                }
                if let Some(plan) = tp.make_nested_loop_plan(current) {
                    out.push((plan, JoinAlgorithm::NestedLoop, None));
                }
                if let Some(plan) = tp.make_hash_join_plan(current) {
                    out.push((plan, JoinAlgorithm::Hash, None));
                }
            }
            Some(_) => {
                if let Some(plan) = tp.make_nested_loop_plan(current) {
                    out.push((plan, JoinAlgorithm::NestedLoop, None));
                }
            }
            None => {}
        }
        if out.is_empty() {
            out.push((tp.make_product_plan(current), JoinAlgorithm::Product, None));
        }
        out
    }

    /// Output stages: aggregation or grouping, projection, then the
    /// distinct/order-by combination.
    fn finish(
        tx: &Transaction,
        data: &QueryData,
        mut plan: Box<dyn Plan>,
    ) -> PlannerResult<Box<dyn Plan>> {
        if let Some(group_fields) = data.group_fields() {
            plan = Box::new(GroupByPlan::new(
                tx,
                plan,
                group_fields.to_vec(),
                data.agg_specs().to_vec(),
            )?);
        } else if !data.agg_specs().is_empty() {
            plan = Box::new(AggregatePlan::new(plan, data.agg_specs().to_vec()));
        }

        if !data.fields().is_empty() {
            let schema = plan.schema().clone();
            plan = Box::new(
                ProjectPlan::new(plan, data.fields())
                    .map_err(|_| Self::first_missing_field(data, schema))?,
            );
        }

        if !data.sort_fields().is_empty() {
            // Append any projected field missing from the sort list so a
            // following Distinct sees equal rows adjacent.
            let mut sort_fields = data.sort_fields().to_vec();
            for field in plan.schema().fields() {
                if !sort_fields.iter().any(|sf| sf.field == field) {
                    sort_fields.push(SortField::asc(field));
                }
            }
            plan = Box::new(SortPlan::new(tx, plan, sort_fields));
            if data.is_distinct() {
                plan = Box::new(DistinctPlan::over_sorted(plan));
            }
        } else if data.is_distinct() {
            plan = Box::new(DistinctPlan::new(tx, plan));
        }
        Ok(plan)
    }

    fn first_missing_field(data: &QueryData, schema: Schema) -> PlannerError {
        for f in data.fields() {
            if !schema.has_field(f) {
                return PlannerError::UnknownField(f.clone());
            }
        }
        PlannerError::Internal("projection failed on known fields".into())
    }

    /// Fail-fast validation: every field the query names must exist in
    /// some referenced table (aggregate output names are synthesized
    /// later and checked against the post-aggregation schema).
    fn validate_fields(data: &QueryData, planners: &[TablePlanner]) -> PlannerResult<()> {
        let mut union = Schema::new();
        for tp in planners {
            union.add_all(tp.schema());
        }
        let mut out_names: Vec<String> =
            data.agg_specs().iter().map(|s| s.output_name()).collect();
        if let Some(group_fields) = data.group_fields() {
            out_names.extend(group_fields.iter().cloned());
        }

        for term in data.pred().terms() {
            for expr in [term.lhs(), term.rhs()] {
                if let Expression::Field(f) = expr {
                    if !union.has_field(f) {
                        return Err(PlannerError::UnknownField(f.clone()));
                    }
                }
            }
        }
        for spec in data.agg_specs() {
            if !union.has_field(&spec.field) {
                return Err(PlannerError::UnknownField(spec.field.clone()));
            }
        }
        if let Some(group_fields) = data.group_fields() {
            for f in group_fields {
                if !union.has_field(f) {
                    return Err(PlannerError::UnknownField(f.clone()));
                }
            }
        }
        for f in data.fields() {
            if !union.has_field(f) && !out_names.iter().any(|n| n == f) {
                return Err(PlannerError::UnknownField(f.clone()));
            }
        }
        for sf in data.sort_fields() {
            if !union.has_field(&sf.field) && !out_names.iter().any(|n| *n == sf.field) {
                return Err(PlannerError::UnknownField(sf.field.clone()));
            }
        }
        Ok(())
    }
}

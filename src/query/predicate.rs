//! Conjunctive predicates
//!
//! A predicate is an AND-only conjunction of terms. It can be split into
//! the part resolvable within a single schema (the selection sub-predicate)
//! and the part connecting two schemas (the join sub-predicate); the
//! planner relies on this decomposition to place filters and choose join
//! algorithms.

use std::fmt;

use crate::plan::Plan;
use crate::record::Schema;

use super::constant::Constant;
use super::errors::QueryResult;
use super::scan::Scan;
use super::term::{CompareOp, Term};

/// A conjunction of comparison terms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    terms: Vec<Term>,
}

impl Predicate {
    /// Creates an empty (always-true) predicate
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a predicate with a single term
    pub fn new(term: Term) -> Self {
        Self { terms: vec![term] }
    }

    /// Creates a predicate from a list of terms
    pub fn from_terms(terms: Vec<Term>) -> Self {
        Self { terms }
    }

    /// Adds a term to the conjunction
    pub fn and_term(mut self, term: Term) -> Self {
        self.terms.push(term);
        self
    }

    /// Returns the terms of the conjunction
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Returns true if the predicate has no terms
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Returns true if every term holds for the scan's current row
    pub fn is_satisfied(&self, s: &dyn Scan) -> QueryResult<bool> {
        for t in &self.terms {
            if !t.is_satisfied(s)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Estimates the combined reduction factor of all terms
    pub fn reduction_factor(&self, p: &dyn Plan) -> usize {
        self.terms
            .iter()
            .fold(1usize, |acc, t| acc.saturating_mul(t.reduction_factor(p)))
    }

    /// Returns the sub-predicate of terms fully resolvable within the
    /// schema, or `None` if no term applies.
    pub fn select_sub_pred(&self, schema: &Schema) -> Option<Predicate> {
        let terms: Vec<Term> = self
            .terms
            .iter()
            .filter(|t| t.applies_to(schema))
            .cloned()
            .collect();
        if terms.is_empty() {
            None
        } else {
            Some(Predicate::from_terms(terms))
        }
    }

    /// Returns the sub-predicate of terms connecting the two schemas:
    /// terms that resolve in the union of the schemas but in neither one
    /// alone. Returns `None` if no such term exists.
    pub fn join_sub_pred(&self, sch1: &Schema, sch2: &Schema) -> Option<Predicate> {
        let mut union = Schema::new();
        union.add_all(sch1);
        union.add_all(sch2);
        let terms: Vec<Term> = self
            .terms
            .iter()
            .filter(|t| !t.applies_to(sch1) && !t.applies_to(sch2) && t.applies_to(&union))
            .cloned()
            .collect();
        if terms.is_empty() {
            None
        } else {
            Some(Predicate::from_terms(terms))
        }
    }

    /// If some term equates the named field with a constant, returns the
    /// constant.
    pub fn equates_with_constant(&self, field: &str) -> Option<&Constant> {
        self.terms.iter().find_map(|t| t.equates_with_constant(field))
    }

    /// If some term compares the named field with a constant under any
    /// operator, returns the operator (applied to the field on the left)
    /// and the constant.
    pub fn compares_with_constant(&self, field: &str) -> Option<(CompareOp, &Constant)> {
        self.terms
            .iter()
            .find_map(|t| t.compares_with_constant(field))
    }

    /// If some term equates the named field with another field, returns
    /// the other field's name.
    pub fn equates_with_field(&self, field: &str) -> Option<&str> {
        self.terms.iter().find_map(|t| t.equates_with_field(field))
    }

    /// Returns true if any term on the named field uses a non-equality
    /// operator. Hash indexes cannot serve such predicates.
    pub fn has_nonequality_on(&self, field: &str) -> bool {
        self.terms.iter().any(|t| {
            !t.op().is_equality()
                && (t.lhs().as_field_name() == Some(field)
                    || t.rhs().as_field_name() == Some(field))
        })
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.terms.iter().map(|t| t.to_string()).collect();
        write!(f, "{}", parts.join(" and "))
    }
}

//! Comparison terms
//!
//! A term compares two expressions with one of the supported operators.
//! A term whose sides are both field references is a *join term*; any
//! other shape is a *selection term*.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use crate::plan::Plan;
use crate::record::Schema;

use super::constant::Constant;
use super::errors::QueryResult;
use super::expression::Expression;
use super::scan::Scan;

/// The comparison operators of the condition language.
///
/// `<>` and `!=` are accepted as spellings of [`CompareOp::Ne`]; the
/// canonical printed form is `<>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<>` / `!=`
    Ne,
}

impl CompareOp {
    /// Parses an operator token
    pub fn from_symbol(sym: &str) -> Option<Self> {
        match sym {
            "=" => Some(CompareOp::Eq),
            "<" => Some(CompareOp::Lt),
            "<=" => Some(CompareOp::Le),
            ">" => Some(CompareOp::Gt),
            ">=" => Some(CompareOp::Ge),
            "<>" | "!=" => Some(CompareOp::Ne),
            _ => None,
        }
    }

    /// Returns the canonical token for this operator
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Ne => "<>",
        }
    }

    /// Applies the operator to an ordering between lhs and rhs
    pub fn evaluate(&self, ord: Ordering) -> bool {
        match self {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Le => ord != Ordering::Greater,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Ge => ord != Ordering::Less,
            CompareOp::Ne => ord != Ordering::Equal,
        }
    }

    /// Returns true if this is the equality operator
    pub fn is_equality(&self) -> bool {
        matches!(self, CompareOp::Eq)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A comparison between two expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    lhs: Expression,
    rhs: Expression,
    op: CompareOp,
}

impl Term {
    /// Creates a term comparing the two expressions with the operator
    pub fn new(lhs: Expression, rhs: Expression, op: CompareOp) -> Self {
        Self { lhs, rhs, op }
    }

    /// Creates an equality term
    pub fn eq(lhs: Expression, rhs: Expression) -> Self {
        Self::new(lhs, rhs, CompareOp::Eq)
    }

    /// Returns the left-hand expression
    pub fn lhs(&self) -> &Expression {
        &self.lhs
    }

    /// Returns the right-hand expression
    pub fn rhs(&self) -> &Expression {
        &self.rhs
    }

    /// Returns the comparison operator
    pub fn op(&self) -> CompareOp {
        self.op
    }

    /// Returns true if the term holds for the scan's current row
    pub fn is_satisfied(&self, s: &dyn Scan) -> QueryResult<bool> {
        let lhsval = self.lhs.evaluate(s)?;
        let rhsval = self.rhs.evaluate(s)?;
        Ok(self.op.evaluate(lhsval.cmp(&rhsval)))
    }

    /// Returns true if both sides are field references
    pub fn is_join_term(&self) -> bool {
        self.lhs.is_field_name() && self.rhs.is_field_name()
    }

    /// Estimates the factor by which selecting on this term reduces the
    /// number of rows output by the plan.
    ///
    /// Field-to-field terms reduce by the larger distinct-value count;
    /// field-to-constant terms by the field's distinct-value count; a
    /// constant-to-constant term reduces to everything or nothing.
    pub fn reduction_factor(&self, p: &dyn Plan) -> usize {
        match (self.lhs.as_field_name(), self.rhs.as_field_name()) {
            (Some(l), Some(r)) => p.distinct_values(l).max(p.distinct_values(r)),
            (Some(l), None) => p.distinct_values(l),
            (None, Some(r)) => p.distinct_values(r),
            (None, None) => {
                if self.lhs.as_constant() == self.rhs.as_constant() {
                    1
                } else {
                    usize::MAX
                }
            }
        }
    }

    /// If this is an equality between the named field and a constant,
    /// returns the constant.
    pub fn equates_with_constant(&self, field: &str) -> Option<&Constant> {
        if !self.op.is_equality() {
            return None;
        }
        self.compares_with_constant(field).map(|(_, c)| c)
    }

    /// If this term compares the named field with a constant under any
    /// operator, returns the operator and the constant. The operator is
    /// reported as applied to the field on the left-hand side.
    pub fn compares_with_constant(&self, field: &str) -> Option<(CompareOp, &Constant)> {
        match (&self.lhs, &self.rhs) {
            (Expression::Field(f), Expression::Const(c)) if f == field => Some((self.op, c)),
            (Expression::Const(c), Expression::Field(f)) if f == field => {
                Some((flip(self.op), c))
            }
            _ => None,
        }
    }

    /// If this is an equality between the named field and another field,
    /// returns the other field's name.
    pub fn equates_with_field(&self, field: &str) -> Option<&str> {
        if !self.op.is_equality() {
            return None;
        }
        match (&self.lhs, &self.rhs) {
            (Expression::Field(l), Expression::Field(r)) if l == field => Some(r),
            (Expression::Field(l), Expression::Field(r)) if r == field => Some(l),
            _ => None,
        }
    }

    /// Returns true if both expressions resolve within the schema
    pub fn applies_to(&self, schema: &Schema) -> bool {
        self.lhs.applies_to(schema) && self.rhs.applies_to(schema)
    }
}

/// Mirrors an operator across its operands: `c op F` becomes `F op' c`.
fn flip(op: CompareOp) -> CompareOp {
    match op {
        CompareOp::Lt => CompareOp::Gt,
        CompareOp::Le => CompareOp::Ge,
        CompareOp::Gt => CompareOp::Lt,
        CompareOp::Ge => CompareOp::Le,
        CompareOp::Eq | CompareOp::Ne => op,
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.op, self.rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_symbols_round_trip() {
        for sym in ["=", "<", "<=", ">", ">=", "<>"] {
            let op = CompareOp::from_symbol(sym).unwrap();
            assert_eq!(op.symbol(), sym);
        }
        // both not-equal spellings parse to the same operator
        assert_eq!(CompareOp::from_symbol("!="), Some(CompareOp::Ne));
    }

    #[test]
    fn test_compares_with_constant_flips() {
        // 5 < f is the same condition as f > 5
        let t = Term::new(
            Expression::constant(5),
            Expression::field("f"),
            CompareOp::Lt,
        );
        let (op, c) = t.compares_with_constant("f").unwrap();
        assert_eq!(op, CompareOp::Gt);
        assert_eq!(c, &Constant::Int(5));
    }

    #[test]
    fn test_equates_with_field_requires_equality() {
        let eq = Term::eq(Expression::field("a"), Expression::field("b"));
        assert_eq!(eq.equates_with_field("a"), Some("b"));
        assert_eq!(eq.equates_with_field("b"), Some("a"));

        let lt = Term::new(
            Expression::field("a"),
            Expression::field("b"),
            CompareOp::Lt,
        );
        assert_eq!(lt.equates_with_field("a"), None);
        assert!(lt.is_join_term());
    }
}

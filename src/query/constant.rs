//! Typed constants
//!
//! A `Constant` is a literal integer or string value. The derived ordering
//! is total across both variants (integers sort before strings), so mixed
//! comparisons are defined even though well-typed queries never produce
//! them.

use std::fmt;

use serde::Serialize;

/// A literal value appearing in a query or stored in a row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Constant {
    /// Integer value
    Int(i32),
    /// String value
    Str(String),
}

impl Constant {
    /// Returns the integer value, if this constant is an integer
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Constant::Int(i) => Some(*i),
            Constant::Str(_) => None,
        }
    }

    /// Returns the string value, if this constant is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Constant::Int(_) => None,
            Constant::Str(s) => Some(s),
        }
    }

    /// Maps the constant onto one of `k` hash buckets.
    ///
    /// Integers bucket by value modulo `k`; strings by a deterministic
    /// byte hash modulo `k`. The hash must be stable across runs so that
    /// partitioned joins and their tests are reproducible.
    pub fn bucket(&self, k: usize) -> usize {
        debug_assert!(k > 0);
        match self {
            Constant::Int(i) => (*i as i64).rem_euclid(k as i64) as usize,
            Constant::Str(s) => {
                // djb2
                let mut h: u64 = 5381;
                for b in s.as_bytes() {
                    h = h.wrapping_mul(33).wrapping_add(u64::from(*b));
                }
                (h % k as u64) as usize
            }
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(i) => write!(f, "{}", i),
            Constant::Str(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<i32> for Constant {
    fn from(v: i32) -> Self {
        Constant::Int(v)
    }
}

impl From<&str> for Constant {
    fn from(v: &str) -> Self {
        Constant::Str(v.to_string())
    }
}

impl From<String> for Constant {
    fn from(v: String) -> Self {
        Constant::Str(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_order() {
        assert!(Constant::Int(-5) < Constant::Int(3));
        assert!(Constant::Str("abc".into()) < Constant::Str("abd".into()));
        // ints sort before strings
        assert!(Constant::Int(i32::MAX) < Constant::Str(String::new()));
    }

    #[test]
    fn test_bucket_deterministic() {
        let c = Constant::Str("deptid".into());
        assert_eq!(c.bucket(7), c.bucket(7));

        assert_eq!(Constant::Int(10).bucket(4), 2);
        // negative values still land in [0, k)
        assert_eq!(Constant::Int(-1).bucket(4), 3);
    }
}

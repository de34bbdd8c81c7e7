//! Static hash index
//!
//! A fixed number of buckets, each an insertion-ordered list of
//! (key, rid) pairs. Probes rehash the search key and walk one bucket.
//! Only equality probes make sense here; anything else is rejected so
//! the planner's mistake surfaces instead of silently scanning wrong.

use crate::query::{CompareOp, Constant, QueryError, QueryResult};
use crate::record::Rid;

use super::info::Index;

pub(super) const NUM_BUCKETS: usize = 8;

struct Probe {
    key: Constant,
    bucket: usize,
    /// Slot of the current match, once `next` has found one.
    current: Option<usize>,
    next_pos: usize,
}

pub struct HashIndex {
    buckets: Vec<Vec<(Constant, Rid)>>,
    probe: Option<Probe>,
}

impl HashIndex {
    pub fn new() -> Self {
        Self {
            buckets: vec![Vec::new(); NUM_BUCKETS],
            probe: None,
        }
    }
}

impl Default for HashIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl Index for HashIndex {
    fn before_first(&mut self, op: CompareOp, key: &Constant) -> QueryResult<()> {
        if !op.is_equality() {
            return Err(QueryError::UnsupportedIndexOp(op.symbol().to_string()));
        }
        self.probe = Some(Probe {
            key: key.clone(),
            bucket: key.bucket(NUM_BUCKETS),
            current: None,
            next_pos: 0,
        });
        Ok(())
    }

    fn next(&mut self) -> QueryResult<bool> {
        let probe = self.probe.as_mut().ok_or(QueryError::NotPositioned)?;
        let bucket = &self.buckets[probe.bucket];
        for pos in probe.next_pos..bucket.len() {
            if bucket[pos].0 == probe.key {
                probe.current = Some(pos);
                probe.next_pos = pos + 1;
                return Ok(true);
            }
        }
        probe.current = None;
        probe.next_pos = bucket.len();
        Ok(false)
    }

    fn data_rid(&self) -> QueryResult<Rid> {
        let probe = self.probe.as_ref().ok_or(QueryError::NotPositioned)?;
        let pos = probe.current.ok_or(QueryError::NotPositioned)?;
        Ok(self.buckets[probe.bucket][pos].1)
    }

    fn insert(&mut self, key: Constant, rid: Rid) -> QueryResult<()> {
        let bucket = key.bucket(NUM_BUCKETS);
        self.buckets[bucket].push((key, rid));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_returns_only_matching_keys() {
        let mut idx = HashIndex::new();
        // 3 and 11 share bucket 3 under modulo-8 hashing
        idx.insert(Constant::Int(3), Rid::new(0, 0)).unwrap();
        idx.insert(Constant::Int(11), Rid::new(0, 1)).unwrap();
        idx.insert(Constant::Int(3), Rid::new(0, 2)).unwrap();

        idx.before_first(CompareOp::Eq, &Constant::Int(3)).unwrap();
        let mut slots = Vec::new();
        while idx.next().unwrap() {
            slots.push(idx.data_rid().unwrap().slot);
        }
        assert_eq!(slots, vec![0, 2]);
    }

    #[test]
    fn range_probe_is_rejected() {
        let mut idx = HashIndex::new();
        let err = idx
            .before_first(CompareOp::Lt, &Constant::Int(5))
            .unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedIndexOp(_)));
    }

    #[test]
    fn missing_key_yields_nothing() {
        let mut idx = HashIndex::new();
        idx.insert(Constant::from("x"), Rid::new(0, 0)).unwrap();
        idx.before_first(CompareOp::Eq, &Constant::from("y"))
            .unwrap();
        assert!(!idx.next().unwrap());
    }
}

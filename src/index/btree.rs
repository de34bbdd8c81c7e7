//! B-tree index with overflow chaining
//!
//! Pages live in an arena indexed by block number. Block 0 is always the
//! root directory; it starts with a single sentinel entry pointing at an
//! empty leaf, so descent never has to special-case an empty tree.
//!
//! Duplicate keys are the interesting part. When a page split would land
//! inside a run of equal keys the split point slides off the run, and
//! when an entire page holds one key the page sprouts an overflow chain
//! instead of splitting. Scans follow chains through each page's flag.
//!
//! # Design Principles
//!
//! - Directory entries are non-decreasing; descent picks the rightmost
//!   entry whose key does not exceed the search key
//! - Equal keys never straddle a directory boundary
//! - Overflow pages hold exactly one key value and no directory entry
//!   points at them
//! - Leaves link to their right sibling; range scans cross page
//!   boundaries through the link and stop at the first invalid key

use crate::query::{CompareOp, Constant, QueryError, QueryResult};
use crate::record::Rid;

use super::info::Index;

/// Split summary handed back to the parent directory page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub key: Constant,
    pub block: usize,
}

/// Sentinel smaller than every real key; `Constant::Int` orders before
/// `Constant::Str`, so this covers string-keyed indexes too.
fn sentinel() -> Constant {
    Constant::Int(i32::MIN)
}

struct DirPage {
    entries: Vec<(Constant, usize)>,
    level: u32,
}

struct LeafPage {
    entries: Vec<(Constant, Rid)>,
    /// Block number of the overflow continuation, or -1 for none.
    overflow: i64,
    /// Right sibling leaf, or -1 at the right edge. Only leaves the
    /// directory points at participate; overflow pages stay out.
    next_leaf: i64,
}

enum Page {
    Dir(DirPage),
    Leaf(LeafPage),
}

struct Cursor {
    op: CompareOp,
    key: Constant,
    block: usize,
    slot: isize,
    /// Directory-reachable leaf the scan is on; `block` may be one of
    /// its overflow pages.
    home: usize,
}

pub struct BTreeIndex {
    pages: Vec<Page>,
    capacity: usize,
    cursor: Option<Cursor>,
}

const ROOT: usize = 0;

impl BTreeIndex {
    /// A new empty index whose pages hold at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        let root = Page::Dir(DirPage {
            entries: vec![(sentinel(), 1)],
            level: 0,
        });
        let leaf = Page::Leaf(LeafPage {
            entries: Vec::new(),
            overflow: -1,
            next_leaf: -1,
        });
        Self {
            pages: vec![root, leaf],
            capacity: capacity.max(2),
            cursor: None,
        }
    }

    /// Fan-out of the root directory. Stays at one while inserts only
    /// grow overflow chains.
    pub fn root_children(&self) -> usize {
        match &self.pages[ROOT] {
            Page::Dir(d) => d.entries.len(),
            Page::Leaf(_) => 0,
        }
    }

    /// Levels of directory above the leaves.
    pub fn height(&self) -> u32 {
        match &self.pages[ROOT] {
            Page::Dir(d) => d.level + 1,
            Page::Leaf(_) => 0,
        }
    }

    fn leaf(&self, block: usize) -> QueryResult<&LeafPage> {
        match self.pages.get(block) {
            Some(Page::Leaf(p)) => Ok(p),
            _ => Err(QueryError::CorruptIndex(format!(
                "block {block} is not a leaf page"
            ))),
        }
    }

    fn leaf_mut(&mut self, block: usize) -> QueryResult<&mut LeafPage> {
        match self.pages.get_mut(block) {
            Some(Page::Leaf(p)) => Ok(p),
            _ => Err(QueryError::CorruptIndex(format!(
                "block {block} is not a leaf page"
            ))),
        }
    }

    fn dir_mut(&mut self, block: usize) -> QueryResult<&mut DirPage> {
        match self.pages.get_mut(block) {
            Some(Page::Dir(p)) => Ok(p),
            _ => Err(QueryError::CorruptIndex(format!(
                "block {block} is not a directory page"
            ))),
        }
    }

    fn alloc_leaf(&mut self, entries: Vec<(Constant, Rid)>, overflow: i64, next_leaf: i64) -> usize {
        self.pages.push(Page::Leaf(LeafPage {
            entries,
            overflow,
            next_leaf,
        }));
        self.pages.len() - 1
    }

    fn alloc_dir(&mut self, entries: Vec<(Constant, usize)>, level: u32) -> usize {
        self.pages.push(Page::Dir(DirPage { entries, level }));
        self.pages.len() - 1
    }

    /// Child slot for `key`: the rightmost entry not exceeding it. The
    /// sentinel guarantees at least one candidate.
    fn child_index(d: &DirPage, key: &Constant) -> usize {
        d.entries
            .iter()
            .rposition(|(k, _)| k <= key)
            .unwrap_or(0)
    }

    /// Leaf block reached by descending toward `key`, recording the
    /// directory blocks visited along the way.
    fn descend(&self, key: &Constant, path: &mut Vec<usize>) -> QueryResult<usize> {
        let mut block = ROOT;
        loop {
            match &self.pages[block] {
                Page::Dir(d) => {
                    if d.entries.is_empty() {
                        return Err(QueryError::CorruptIndex(format!(
                            "directory block {block} is empty"
                        )));
                    }
                    path.push(block);
                    block = d.entries[Self::child_index(d, key)].1;
                }
                Page::Leaf(_) => return Ok(block),
            }
        }
    }

    fn leftmost_leaf(&self) -> QueryResult<usize> {
        let mut block = ROOT;
        loop {
            match &self.pages[block] {
                Page::Dir(d) => match d.entries.first() {
                    Some(&(_, child)) => block = child,
                    None => {
                        return Err(QueryError::CorruptIndex(format!(
                            "directory block {block} is empty"
                        )))
                    }
                },
                Page::Leaf(_) => return Ok(block),
            }
        }
    }

    /// A key is valid while entries at or past it can still satisfy the
    /// operator; once validity fails, nothing later on this leaf or its
    /// chain can match.
    fn is_valid(op: CompareOp, val: &Constant, key: &Constant) -> bool {
        match op {
            CompareOp::Eq => val == key,
            CompareOp::Lt => val < key,
            CompareOp::Le => val <= key,
            CompareOp::Gt | CompareOp::Ge => val >= key,
            CompareOp::Ne => true,
        }
    }

    /// Overflow continuation if the current page's first key still
    /// validates; otherwise the scan is over.
    fn overflow_target(
        &self,
        block: usize,
        op: CompareOp,
        key: &Constant,
    ) -> QueryResult<Option<usize>> {
        let page = self.leaf(block)?;
        if page.overflow < 0 {
            return Ok(None);
        }
        match page.entries.first() {
            Some((first, _)) if Self::is_valid(op, first, key) => Ok(Some(page.overflow as usize)),
            _ => Ok(None),
        }
    }

    fn insert_into_leaf(
        &mut self,
        block: usize,
        key: &Constant,
        rid: Rid,
    ) -> QueryResult<Option<DirEntry>> {
        let capacity = self.capacity;

        // A chained page whose first key exceeds the new one belongs
        // entirely to a later duplicate run. Move its contents to a
        // fresh block, keep the new entry here, and hand the run's key
        // up to the directory.
        let continuation = {
            let page = self.leaf_mut(block)?;
            if page.overflow >= 0 && page.entries.first().is_some_and(|(k, _)| k > key) {
                let first_key = page.entries[0].0.clone();
                let moved: Vec<_> = page.entries.drain(..).collect();
                let chain = page.overflow;
                let next = page.next_leaf;
                page.overflow = -1;
                page.entries.push((key.clone(), rid));
                Some((first_key, moved, chain, next))
            } else {
                None
            }
        };
        if let Some((first_key, moved, chain, next)) = continuation {
            let new_block = self.alloc_leaf(moved, chain, next);
            self.leaf_mut(block)?.next_leaf = new_block as i64;
            return Ok(Some(DirEntry {
                key: first_key,
                block: new_block,
            }));
        }

        let page = self.leaf_mut(block)?;
        let pos = page
            .entries
            .iter()
            .position(|(k, _)| k >= key)
            .unwrap_or(page.entries.len());
        page.entries.insert(pos, (key.clone(), rid));
        if page.entries.len() <= capacity {
            return Ok(None);
        }

        let first = page.entries[0].0.clone();
        let last = page
            .entries
            .last()
            .map(|(k, _)| k.clone())
            .ok_or_else(|| QueryError::CorruptIndex("split of empty leaf".into()))?;

        if first == last {
            // One key fills the page: chain everything past the first
            // entry instead of splitting.
            let moved: Vec<_> = page.entries.drain(1..).collect();
            let chain = page.overflow;
            let new_block = self.alloc_leaf(moved, chain, -1);
            self.leaf_mut(block)?.overflow = new_block as i64;
            return Ok(None);
        }

        // Slide the split point off any duplicate run so equal keys stay
        // on one side of the boundary.
        let mut split_pos = page.entries.len() / 2;
        let mut split_key = page.entries[split_pos].0.clone();
        if split_key == first {
            while page.entries[split_pos].0 == split_key {
                split_pos += 1;
            }
            split_key = page.entries[split_pos].0.clone();
        } else {
            while page.entries[split_pos - 1].0 == split_key {
                split_pos -= 1;
            }
        }
        let moved: Vec<_> = page.entries.drain(split_pos..).collect();
        let next = page.next_leaf;
        let new_block = self.alloc_leaf(moved, -1, next);
        self.leaf_mut(block)?.next_leaf = new_block as i64;
        Ok(Some(DirEntry {
            key: split_key,
            block: new_block,
        }))
    }

    fn insert_into_dir(&mut self, block: usize, entry: DirEntry) -> QueryResult<Option<DirEntry>> {
        let capacity = self.capacity;
        let page = self.dir_mut(block)?;
        let pos = page
            .entries
            .iter()
            .position(|(k, _)| *k > entry.key)
            .unwrap_or(page.entries.len());
        page.entries.insert(pos, (entry.key, entry.block));
        if page.entries.len() <= capacity {
            return Ok(None);
        }

        let level = page.level;
        let split_pos = page.entries.len() / 2;
        let moved: Vec<_> = page.entries.drain(split_pos..).collect();
        let split_key = moved[0].0.clone();
        let new_block = self.alloc_dir(moved, level);
        Ok(Some(DirEntry {
            key: split_key,
            block: new_block,
        }))
    }

    /// The root keeps its block number; its old contents move to a fresh
    /// page one level down and the root points at both halves.
    fn grow_root(&mut self, entry: DirEntry) -> QueryResult<()> {
        let (first_key, level, moved) = {
            let d = self.dir_mut(ROOT)?;
            let first_key = d
                .entries
                .first()
                .map(|(k, _)| k.clone())
                .ok_or_else(|| QueryError::CorruptIndex("root directory is empty".into()))?;
            let moved: Vec<_> = d.entries.drain(..).collect();
            (first_key, d.level, moved)
        };
        let new_block = self.alloc_dir(moved, level);
        let d = self.dir_mut(ROOT)?;
        d.entries = vec![(first_key, new_block), (entry.key, entry.block)];
        d.entries.sort_by(|a, b| a.0.cmp(&b.0));
        d.level = level + 1;
        Ok(())
    }
}

impl Index for BTreeIndex {
    fn before_first(&mut self, op: CompareOp, key: &Constant) -> QueryResult<()> {
        // Operators that can match below the key start at the leftmost
        // leaf; the rest descend directly to the key's page.
        let block = match op {
            CompareOp::Lt | CompareOp::Le | CompareOp::Ne => self.leftmost_leaf()?,
            CompareOp::Eq | CompareOp::Gt | CompareOp::Ge => {
                self.descend(key, &mut Vec::new())?
            }
        };
        let slot = match op {
            CompareOp::Lt | CompareOp::Le | CompareOp::Ne => -1,
            CompareOp::Eq | CompareOp::Gt | CompareOp::Ge => {
                let page = self.leaf(block)?;
                page.entries.iter().filter(|(k, _)| k < key).count() as isize - 1
            }
        };
        self.cursor = Some(Cursor {
            op,
            key: key.clone(),
            block,
            slot,
            home: block,
        });
        Ok(())
    }

    fn next(&mut self) -> QueryResult<bool> {
        let (op, key, mut block, mut slot, mut home) = match &self.cursor {
            Some(c) => (c.op, c.key.clone(), c.block, c.slot, c.home),
            None => return Err(QueryError::NotPositioned),
        };
        let found = loop {
            slot += 1;
            let page = self.leaf(block)?;
            match page.entries.get(slot as usize) {
                Some((k, _)) if Self::is_valid(op, k, &key) => {
                    if op.evaluate(k.cmp(&key)) {
                        break true;
                    }
                }
                // An invalid key ends the page's contribution; later
                // keys only grow. A still-valid first key may chain
                // duplicates worth visiting first.
                Some(_) => match self.overflow_target(block, op, &key)? {
                    Some(next_block) => {
                        block = next_block;
                        slot = -1;
                    }
                    None => break false,
                },
                None => {
                    // Off the end of the page: an overflow continuation
                    // restarts the scan there, otherwise the home
                    // leaf's right sibling picks it up.
                    match self.overflow_target(block, op, &key)? {
                        Some(next_block) => {
                            block = next_block;
                            slot = -1;
                        }
                        None => {
                            let sibling = self.leaf(home)?.next_leaf;
                            if sibling < 0 {
                                break false;
                            }
                            home = sibling as usize;
                            block = home;
                            slot = -1;
                        }
                    }
                }
            }
        };
        if let Some(c) = self.cursor.as_mut() {
            c.block = block;
            c.slot = slot;
            c.home = home;
        }
        Ok(found)
    }

    fn data_rid(&self) -> QueryResult<Rid> {
        let c = self.cursor.as_ref().ok_or(QueryError::NotPositioned)?;
        if c.slot < 0 {
            return Err(QueryError::NotPositioned);
        }
        let page = self.leaf(c.block)?;
        page.entries
            .get(c.slot as usize)
            .map(|(_, rid)| *rid)
            .ok_or(QueryError::NotPositioned)
    }

    fn insert(&mut self, key: Constant, rid: Rid) -> QueryResult<()> {
        let mut path = Vec::new();
        let leaf_block = self.descend(&key, &mut path)?;
        let mut pending = self.insert_into_leaf(leaf_block, &key, rid)?;
        while let Some(entry) = pending {
            pending = match path.pop() {
                Some(dir_block) => self.insert_into_dir(dir_block, entry)?,
                None => {
                    self.grow_root(entry)?;
                    None
                }
            };
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rid(n: usize) -> Rid {
        Rid::new(0, n)
    }

    fn collect(idx: &mut BTreeIndex, op: CompareOp, key: i32) -> Vec<usize> {
        idx.before_first(op, &Constant::Int(key)).unwrap();
        let mut out = Vec::new();
        while idx.next().unwrap() {
            out.push(idx.data_rid().unwrap().slot);
        }
        out
    }

    #[test]
    fn equality_finds_every_inserted_key() {
        let mut idx = BTreeIndex::new(4);
        for i in 0..20 {
            idx.insert(Constant::Int(i), rid(i as usize)).unwrap();
        }
        for i in 0..20 {
            assert_eq!(collect(&mut idx, CompareOp::Eq, i), vec![i as usize]);
        }
        assert!(idx.height() > 1, "twenty keys at capacity 4 must split");
    }

    #[test]
    fn duplicates_grow_overflow_chain_not_directory() {
        let mut idx = BTreeIndex::new(4);
        for n in 0..13 {
            idx.insert(Constant::Int(7), rid(n)).unwrap();
        }
        let mut found = collect(&mut idx, CompareOp::Eq, 7);
        found.sort_unstable();
        assert_eq!(found, (0..13).collect::<Vec<_>>());
        assert_eq!(idx.root_children(), 1);
        assert_eq!(idx.height(), 1);
    }

    #[test]
    fn duplicate_run_survives_later_smaller_key() {
        let mut idx = BTreeIndex::new(4);
        for n in 0..6 {
            idx.insert(Constant::Int(9), rid(n)).unwrap();
        }
        idx.insert(Constant::Int(3), rid(100)).unwrap();
        assert_eq!(collect(&mut idx, CompareOp::Eq, 3), vec![100]);
        let mut nines = collect(&mut idx, CompareOp::Eq, 9);
        nines.sort_unstable();
        assert_eq!(nines, (0..6).collect::<Vec<_>>());
    }

    #[test]
    fn range_scan_stops_at_validity_window() {
        let mut idx = BTreeIndex::new(16);
        for i in 1..=10 {
            idx.insert(Constant::Int(i), rid(i as usize)).unwrap();
        }
        assert_eq!(collect(&mut idx, CompareOp::Le, 4), vec![1, 2, 3, 4]);
        assert_eq!(collect(&mut idx, CompareOp::Lt, 4), vec![1, 2, 3]);
        assert_eq!(
            collect(&mut idx, CompareOp::Ge, 8),
            vec![8, 9, 10]
        );
        assert_eq!(collect(&mut idx, CompareOp::Gt, 8), vec![9, 10]);
    }

    #[test]
    fn range_scans_cross_leaf_boundaries() {
        let mut idx = BTreeIndex::new(4);
        for i in 1..=12 {
            idx.insert(Constant::Int(i), rid(i as usize)).unwrap();
        }
        assert!(idx.height() > 1, "twelve keys at capacity 4 must split");
        let all = |lo: usize, hi: usize| (lo..=hi).collect::<Vec<_>>();
        assert_eq!(collect(&mut idx, CompareOp::Le, 10), all(1, 10));
        assert_eq!(collect(&mut idx, CompareOp::Lt, 6), all(1, 5));
        assert_eq!(collect(&mut idx, CompareOp::Ge, 3), all(3, 12));
        assert_eq!(collect(&mut idx, CompareOp::Gt, 6), all(7, 12));
        assert_eq!(
            collect(&mut idx, CompareOp::Ne, 5),
            vec![1, 2, 3, 4, 6, 7, 8, 9, 10, 11, 12]
        );
    }

    #[test]
    fn range_scan_gathers_chained_duplicates_on_a_later_leaf() {
        let mut idx = BTreeIndex::new(4);
        for n in 0..6 {
            idx.insert(Constant::Int(5), rid(n)).unwrap();
        }
        idx.insert(Constant::Int(1), rid(100)).unwrap();
        idx.insert(Constant::Int(2), rid(101)).unwrap();
        idx.insert(Constant::Int(9), rid(102)).unwrap();

        let found = collect(&mut idx, CompareOp::Le, 7);
        assert_eq!(found.len(), 8);
        assert_eq!(&found[..2], &[100, 101]);
        let mut fives = found[2..].to_vec();
        fives.sort_unstable();
        assert_eq!(fives, (0..6).collect::<Vec<_>>());
    }

    #[test]
    fn not_equal_scans_everything_but_the_key() {
        let mut idx = BTreeIndex::new(16);
        for i in 1..=5 {
            idx.insert(Constant::Int(i), rid(i as usize)).unwrap();
        }
        assert_eq!(collect(&mut idx, CompareOp::Ne, 3), vec![1, 2, 4, 5]);
    }

    #[test]
    fn next_without_positioning_is_an_error() {
        let mut idx = BTreeIndex::new(4);
        assert!(matches!(idx.next(), Err(QueryError::NotPositioned)));
    }

    #[test]
    fn string_keys_order_lexically() {
        let mut idx = BTreeIndex::new(4);
        for (n, s) in ["delta", "alpha", "charlie", "bravo"].iter().enumerate() {
            idx.insert(Constant::from(*s), rid(n)).unwrap();
        }
        idx.before_first(CompareOp::Le, &Constant::from("bravo"))
            .unwrap();
        let mut out = Vec::new();
        while idx.next().unwrap() {
            out.push(idx.data_rid().unwrap().slot);
        }
        out.sort_unstable();
        assert_eq!(out, vec![1, 3]);
    }
}

use crate::scan::cell::{store_cmp, Cell};
use crate::scan::error::ScanError;
use crate::scan::sub_scanner::SubScanner;

/// Merges a handful of `SubScanner`s in `store_cmp` order.
///
/// Backed by a `Vec` and a linear scan for the minimum rather than
/// `std::collections::BinaryHeap`: a column family typically merges a
/// handful of SSTables plus one memstore, so the O(n) minimum search costs
/// nothing in practice and keeps `reopen_after_flush`'s membership surgery
/// (dropping/inserting scanners mid-scan) straightforward — `BinaryHeap`
/// offers no efficient "remove this specific element" operation.
pub struct MergeHeap {
    members: Vec<Box<dyn SubScanner>>,
}

impl MergeHeap {
    pub fn new(members: Vec<Box<dyn SubScanner>>) -> Self {
        MergeHeap { members }
    }

    pub fn is_empty(&self) -> bool {
        self.members.iter().all(|m| m.peek().is_none())
    }

    /// Index of the member currently holding the least cell, if any member
    /// has one.
    fn top_index(&self) -> Option<usize> {
        let mut best: Option<(usize, &Cell)> = None;
        for (i, m) in self.members.iter().enumerate() {
            if let Some(c) = m.peek() {
                best = match best {
                    None => Some((i, c)),
                    Some((_, b)) if store_cmp(c, b) == std::cmp::Ordering::Less => Some((i, c)),
                    Some(prev) => Some(prev),
                };
            }
        }
        best.map(|(i, _)| i)
    }

    pub fn peek(&self) -> Option<&Cell> {
        self.top_index().and_then(|i| self.members[i].peek())
    }

    pub fn advance(&mut self) -> Result<(), ScanError> {
        if let Some(i) = self.top_index() {
            self.members[i].advance()?;
        }
        Ok(())
    }

    pub fn seek(&mut self, key: &Cell) -> Result<(), ScanError> {
        for m in self.members.iter_mut() {
            m.seek(key)?;
        }
        Ok(())
    }

    pub fn reseek(&mut self, key: &Cell) -> Result<(), ScanError> {
        for m in self.members.iter_mut() {
            if m.peek().is_some_and(|c| store_cmp(c, key) != std::cmp::Ordering::Less) {
                continue;
            }
            m.reseek(key)?;
        }
        Ok(())
    }

    pub fn request_seek(&mut self, key: &Cell, forward: bool, use_bloom: bool) -> Result<(), ScanError> {
        for m in self.members.iter_mut() {
            m.request_seek(key, forward, use_bloom)?;
        }
        Ok(())
    }

    /// The current top member's index-block hint, if it has one. Only the
    /// top matters: that is the scanner `StoreScanner` is about to
    /// seek-or-skip past.
    pub fn next_indexed_key(&self) -> Option<Cell> {
        self.top_index().and_then(|i| self.members[i].next_indexed_key())
    }

    pub fn shipped(&mut self) {
        for m in self.members.iter_mut() {
            m.shipped();
        }
    }

    pub fn push(&mut self, member: Box<dyn SubScanner>) {
        self.members.push(member);
    }

    pub fn members(&self) -> &[Box<dyn SubScanner>] {
        &self.members
    }

    /// Hand back ownership of every member, emptying this heap. Used by
    /// `reopen_after_flush`/`switch_to_stream` to rebuild membership without
    /// ever leaving the heap half-mutated if a rebuild step fails.
    pub fn take_all(&mut self) -> Vec<Box<dyn SubScanner>> {
        std::mem::take(&mut self.members)
    }

    pub fn close_all(&mut self) {
        for m in self.members.iter_mut() {
            m.close();
        }
    }
}

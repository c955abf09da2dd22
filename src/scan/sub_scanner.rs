use std::path::Path;

use crate::scan::cell::Cell;
use crate::scan::error::ScanError;
use crate::scan::spec::ScanSpec;

/// One merge source: either a file (SSTable) or the memstore. `MergeHeap`
/// only ever touches the current top of each `SubScanner`; it never holds
/// more than one cell of any source in flight at a time.
pub trait SubScanner: Send {
    /// The current cell, if any. Must not advance anything.
    fn peek(&self) -> Option<&Cell>;

    /// Move past the current cell.
    fn advance(&mut self) -> Result<(), ScanError>;

    /// Position at the first cell at or after `key`, wherever the scanner
    /// currently sits (may move backwards, though the merge loop never
    /// asks for that).
    fn seek(&mut self, key: &Cell) -> Result<(), ScanError>;

    /// Like `seek`, but the caller guarantees `key` is at or after the
    /// current position — lets file-backed scanners search forward from
    /// where they are instead of restarting from the top.
    fn reseek(&mut self, key: &Cell) -> Result<(), ScanError> {
        self.seek(key)
    }

    /// A lazy variant used for explicit-column scans: the scanner may defer
    /// the actual positioning work (e.g. consult a bloom filter first) but
    /// must behave as `reseek` by the time `peek`/`advance` are next called.
    fn request_seek(&mut self, key: &Cell, _forward: bool, _use_bloom: bool) -> Result<(), ScanError> {
        self.reseek(key)
    }

    /// The first key of the next sparse-index block after the current
    /// position, if known. `None` means no index hint is available (e.g.
    /// last block, or a scanner with no index at all), which forces the
    /// seek-vs-skip heuristic to fall back to an explicit seek.
    fn next_indexed_key(&self) -> Option<Cell> {
        None
    }

    fn is_file_scanner(&self) -> bool;

    /// Whether this scanner could possibly contribute to `scan`, used by
    /// `SubScannerSelector` to prune sources up front (row-range, time-range
    /// and TTL pruning stand in here for what a real store would answer
    /// with bloom filters and file metadata).
    fn should_use(&self, scan: &ScanSpec, ttl_cutoff: i64) -> bool;

    /// The on-disk path backing this scanner, if it is file-backed. Used by
    /// the pread→stream read-mode switch to reopen the same file under a
    /// different access pattern.
    fn source_path(&self) -> Option<&Path> {
        None
    }

    /// Release any resources. Called only after `shipped()` to keep
    /// already-returned cell references valid.
    fn close(&mut self) {}

    /// Called once a batch of cells produced while this scanner was live
    /// has been handed off to the caller. Default no-op; file scanners use
    /// it as the trigger point for their own internal housekeeping.
    fn shipped(&mut self) {}
}

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::api::Timestamp;
use crate::scan::cell::{cell_size, create_last_on_row, next_column_key, store_cmp, Cell};
use crate::scan::error::ScanError;
use crate::scan::file_scanner::FileSubScanner;
use crate::scan::flush::FlushChannel;
use crate::scan::heap::MergeHeap;
use crate::scan::match_policy::{MatchCode, MatchPolicy};
use crate::scan::progress::{LimitScope, NextState, ScanProgress};
use crate::scan::spec::{ReadType, ScanInfo, ScanSpec};
use crate::scan::sub_scanner::SubScanner;

/// Merges a column family's file and memstore scanners in store order,
/// applying a `MatchPolicy` cell by cell. One `StoreScanner` instance
/// backs both user `scan()`/`get()` calls and compaction, distinguished by
/// `is_compaction` (which disables flush observation and pread/stream
/// switching — a compaction reads everything once, start to finish, and
/// cares about neither).
pub struct StoreScanner {
    scan: ScanSpec,
    scan_info: ScanInfo,
    family: String,
    policy: Box<dyn MatchPolicy>,
    heap: MergeHeap,
    flush: Option<(FlushChannel, Arc<Mutex<Vec<FlushChannel>>>)>,
    is_compaction: bool,
    done: bool,
    kvs_scanned: u64,
    bytes_since_open: u64,
    stream_mode: bool,
    row_size_row: Option<Vec<u8>>,
    row_bytes: u64,
    /// Scanners retired from `heap` by a flush-driven reopen but not yet
    /// closed: cells already appended to a caller's `out` may still borrow
    /// from their buffers until `shipped()` acknowledges those cells are
    /// safe (deep-copied or otherwise released).
    delayed_close: Vec<Box<dyn SubScanner>>,
    closing: bool,
}

impl StoreScanner {
    pub fn new(
        scan: ScanSpec,
        scan_info: ScanInfo,
        family: String,
        policy: Box<dyn MatchPolicy>,
        heap: MergeHeap,
        flush: Option<(FlushChannel, Arc<Mutex<Vec<FlushChannel>>>)>,
        is_compaction: bool,
    ) -> Self {
        let stream_mode = is_compaction || matches!(scan.read_type, ReadType::Stream);
        StoreScanner {
            scan,
            scan_info,
            family,
            policy,
            heap,
            flush,
            is_compaction,
            done: false,
            kvs_scanned: 0,
            bytes_since_open: 0,
            stream_mode,
            row_size_row: None,
            row_bytes: 0,
            delayed_close: Vec::new(),
            closing: false,
        }
    }

    pub fn peek(&self) -> Option<&Cell> {
        self.heap.peek()
    }

    pub fn seek(&mut self, key: &Cell) -> Result<(), ScanError> {
        self.heap.seek(key)
    }

    pub fn reseek(&mut self, key: &Cell) -> Result<(), ScanError> {
        self.heap.reseek(key)
    }

    pub fn read_point(&self) -> Timestamp {
        Timestamp::MAX
    }

    pub fn estimated_kvs_scanned(&self) -> u64 {
        self.kvs_scanned
    }

    pub fn close(&mut self) {
        self.closing = true;
        for mut s in self.delayed_close.drain(..) {
            s.close();
        }
        self.heap.close_all();
        if let Some((channel, registry)) = &self.flush {
            let mut reg = registry.lock().unwrap();
            reg.retain(|c| !Arc::ptr_eq(c, channel));
        }
    }

    /// Pull the next batch of cells into `results`, appending rather than
    /// clearing it, so a caller can call `next` repeatedly against the same
    /// buffer until it sees `NoMoreValues`. Returns why it stopped.
    pub fn next(&mut self, results: &mut Vec<Cell>, progress: &mut ScanProgress) -> Result<NextState, ScanError> {
        progress.reset_counters();
        progress.update_time_progress();

        if self.done {
            return Ok(NextState::NoMoreValues);
        }
        if !self.is_compaction {
            self.check_flushed()?;
        }

        let start_len = results.len();

        loop {
            if self.kvs_scanned % self.scan_info.heartbeat_cells == 0 {
                progress.update_time_progress();
                if progress.check_time_limit(LimitScope::BetweenCells) {
                    return Ok(NextState::TimeLimitReached);
                }
            }

            let cell = match self.heap.peek() {
                None => {
                    self.done = true;
                    break;
                }
                Some(c) => c.clone(),
            };

            let code = self.policy.match_cell(&cell);
            self.kvs_scanned += 1;

            match code {
                MatchCode::Include | MatchCode::IncludeAndSeekNextCol | MatchCode::IncludeAndSeekNextRow => {
                    let size = cell_size(&cell);
                    self.bytes_since_open += size;
                    progress.add_emitted(size);
                    if self.row_size_row.as_deref() != Some(cell.row.as_slice()) {
                        self.row_size_row = Some(cell.row.clone());
                        self.row_bytes = 0;
                    }
                    self.row_bytes += size;
                    results.push(cell.clone());
                    self.heap.advance()?;
                    if !self.is_compaction && self.row_bytes > self.scan_info.max_row_size_bytes {
                        return Err(ScanError::RowTooBig { row: cell.row.clone(), limit: self.scan_info.max_row_size_bytes });
                    }
                    match code {
                        MatchCode::IncludeAndSeekNextCol => self.seek_or_skip_to_next_column(&cell)?,
                        MatchCode::IncludeAndSeekNextRow => self.seek_or_skip_to_next_row(&cell)?,
                        _ => {}
                    }
                    if progress.check_batch_limit(LimitScope::BetweenCells) {
                        return Ok(NextState::BatchLimitReached);
                    }
                    if progress.check_size_limit(LimitScope::BetweenCells) {
                        return Ok(NextState::SizeLimitReached);
                    }
                }
                MatchCode::Skip => {
                    self.heap.advance()?;
                }
                MatchCode::SeekNextCol => {
                    self.seek_or_skip_to_next_column(&cell)?;
                }
                MatchCode::SeekNextRow => {
                    self.seek_or_skip_to_next_row(&cell)?;
                }
                MatchCode::SeekUsingHint => {
                    if let Some(hint) = self.policy.seek_hint() {
                        self.heap.request_seek(&hint, true, true)?;
                    } else {
                        self.heap.advance()?;
                    }
                }
                MatchCode::Done => {
                    self.seek_or_skip_to_next_row(&cell)?;
                    if self.scan.get || results.len() > start_len {
                        if self.scan.get {
                            self.done = true;
                        }
                        break;
                    }
                }
                MatchCode::DoneScan => {
                    self.done = true;
                    break;
                }
            }

            if progress.check_batch_limit(LimitScope::BetweenRows) {
                return Ok(NextState::BatchLimitReached);
            }
            if progress.check_size_limit(LimitScope::BetweenRows) {
                return Ok(NextState::SizeLimitReached);
            }
        }

        if results.len() > start_len {
            Ok(NextState::MoreValues)
        } else {
            Ok(NextState::NoMoreValues)
        }
    }

    pub fn shipped(&mut self) -> Result<(), ScanError> {
        for mut s in self.delayed_close.drain(..) {
            s.close();
        }
        self.heap.shipped();
        if self.is_compaction {
            return Ok(());
        }
        self.check_flushed()?;
        self.maybe_switch_to_stream();
        Ok(())
    }

    /// Decide whether crossing `boundary` should be a direct seek or a
    /// cell-by-cell skip: with no index hint there is no way to tell how far
    /// a skip would have to read, so a missing hint always forces a seek.
    /// With a hint, skip only when `boundary` still falls within the
    /// current index block (`boundary <= hint`); once the boundary would
    /// cross into the next block, seeking directly is no more expensive and
    /// avoids reading the rest of the current block cell by cell.
    fn should_seek_to(&self, boundary: &Cell) -> bool {
        match self.heap.next_indexed_key() {
            None => true,
            Some(hint) => store_cmp(boundary, &hint) == std::cmp::Ordering::Greater,
        }
    }

    fn seek_or_skip_to_next_row(&mut self, from: &Cell) -> Result<(), ScanError> {
        let boundary = create_last_on_row(from);
        if self.should_seek_to(&boundary) {
            self.heap.reseek(&boundary)?;
        } else {
            while let Some(top) = self.heap.peek() {
                if top.row == from.row {
                    self.heap.advance()?;
                } else {
                    break;
                }
            }
        }
        Ok(())
    }

    fn seek_or_skip_to_next_column(&mut self, from: &Cell) -> Result<(), ScanError> {
        let boundary = next_column_key(from);
        if self.should_seek_to(&boundary) {
            self.heap.reseek(&boundary)?;
        } else {
            while let Some(top) = self.heap.peek() {
                if top.row == from.row && top.qualifier == from.qualifier {
                    self.heap.advance()?;
                } else {
                    break;
                }
            }
        }
        Ok(())
    }

    fn check_flushed(&mut self) -> Result<(), ScanError> {
        if self.closing {
            return Ok(());
        }
        let Some((channel, _)) = &self.flush else { return Ok(()) };

        let (new_files, new_mem_cells) = {
            let mut state = channel.lock().unwrap();
            if !state.flushed {
                return Ok(());
            }
            state.flushed = false;
            (std::mem::take(&mut state.pending_files), state.pending_memstore.take())
        };

        self.reopen_after_flush(new_files, new_mem_cells)
    }

    /// Rebuild heap membership around newly flushed files, preserving the
    /// current scan position. All fallible work (opening and seeking the
    /// new file scanners) happens before any existing membership is
    /// disturbed, so a failure here leaves the scan exactly where it was.
    fn reopen_after_flush(
        &mut self,
        new_files: Vec<PathBuf>,
        new_mem_cells: Option<Vec<Cell>>,
    ) -> Result<(), ScanError> {
        if new_files.is_empty() && new_mem_cells.is_none() {
            return Ok(());
        }
        let current_pos = self.heap.peek().cloned();

        let mut new_members: Vec<Box<dyn SubScanner>> = Vec::with_capacity(new_files.len() + 1);
        for path in &new_files {
            let mut fs = FileSubScanner::open(path, &self.family, self.scan_info.block_size_cells)?;
            if let Some(pos) = &current_pos {
                fs.seek(pos)?;
            }
            new_members.push(Box::new(fs));
        }
        if let Some(cells) = new_mem_cells {
            let mut ms = crate::scan::mem_scanner::MemSubScanner::new(cells);
            if let Some(pos) = &current_pos {
                ms.seek(pos)?;
            }
            new_members.push(Box::new(ms));
        }

        // Retire trailing memstore scanners superseded by this flush. They are
        // not closed here — cells already handed to the caller from this
        // batch may still borrow their buffers — only moved aside until the
        // caller's next `shipped()` call closes them.
        let mut members = self.heap.take_all();
        while let Some(last) = members.last() {
            if last.is_file_scanner() {
                break;
            }
            self.delayed_close.push(members.pop().unwrap());
        }
        members.extend(new_members);
        self.heap = MergeHeap::new(members);
        Ok(())
    }

    fn maybe_switch_to_stream(&mut self) {
        if self.stream_mode {
            return;
        }
        if self.bytes_since_open <= self.scan_info.pread_max_bytes {
            return;
        }
        match self.switch_to_stream() {
            Ok(()) => self.stream_mode = true,
            Err(e) => log::warn!("store scanner: failed to switch to stream read mode, staying in pread mode: {e}"),
        }
    }

    /// Reopen every file-backed member at its current position. Builds all
    /// replacements first; only commits (via `heap.take_all`) once every
    /// open/seek has succeeded, so a failure partway through never leaves
    /// the heap with a mix of old and new scanners.
    fn switch_to_stream(&mut self) -> Result<(), ScanError> {
        let mut rebuilt: Vec<Option<Box<dyn SubScanner>>> = Vec::with_capacity(self.heap.members().len());
        for member in self.heap.members() {
            if !member.is_file_scanner() {
                rebuilt.push(None);
                continue;
            }
            let path = member
                .source_path()
                .ok_or_else(|| ScanError::Assertion("file scanner reports no source path".into()))?
                .to_path_buf();
            let pos = member.peek().cloned();
            let mut fs = FileSubScanner::open(&path, &self.family, self.scan_info.block_size_cells)?;
            if let Some(p) = &pos {
                fs.seek(p)?;
            }
            rebuilt.push(Some(Box::new(fs)));
        }

        let mut members = self.heap.take_all();
        for (slot, replacement) in members.iter_mut().zip(rebuilt.into_iter()) {
            if let Some(r) = replacement {
                *slot = r;
            }
        }
        self.heap = MergeHeap::new(members);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::CellValue;
    use crate::scan::flush::new_flush_channel;
    use crate::scan::match_policy::UserScanPolicy;
    use crate::scan::test_support::VecSubScanner;

    fn put(row: &str, col: &str, ts: u64, val: &str) -> Cell {
        Cell::from_value(
            row.as_bytes().to_vec(),
            "cf",
            col.as_bytes().to_vec(),
            ts,
            &CellValue::Put(val.as_bytes().to_vec()),
        )
    }

    fn delete_column(row: &str, col: &str, ts: u64) -> Cell {
        Cell::from_value(row.as_bytes().to_vec(), "cf", col.as_bytes().to_vec(), ts, &CellValue::DeleteColumn(None))
    }

    fn scanner(sources: Vec<Vec<Cell>>, scan: ScanSpec, scan_info: ScanInfo) -> StoreScanner {
        let members: Vec<Box<dyn SubScanner>> =
            sources.into_iter().map(|c| Box::new(VecSubScanner::new(c, true)) as Box<dyn SubScanner>).collect();
        let heap = MergeHeap::new(members);
        let policy = UserScanPolicy::new(scan.clone(), &scan_info, "cf".into());
        let mut s = StoreScanner::new(scan, scan_info, "cf".into(), Box::new(policy), heap, None, false);
        let start = Cell::min_key(Vec::new(), "cf");
        s.seek(&start).unwrap();
        s
    }

    fn drain(s: &mut StoreScanner) -> Vec<Cell> {
        let mut out = Vec::new();
        let mut progress = ScanProgress::new();
        loop {
            let state = s.next(&mut out, &mut progress).unwrap();
            s.shipped().unwrap();
            if state == NextState::NoMoreValues {
                break;
            }
        }
        out
    }

    #[test]
    fn s1_merges_two_file_sources_in_store_order() {
        let a = vec![put("row1", "a", 10, "a1"), put("row3", "a", 10, "a3")];
        let b = vec![put("row2", "a", 10, "a2")];
        let mut s = scanner(vec![a, b], ScanSpec::full_scan(), ScanInfo::default());
        let out = drain(&mut s);
        let rows: Vec<_> = out.iter().map(|c| c.row.clone()).collect();
        assert_eq!(rows, vec![b"row1".to_vec(), b"row2".to_vec(), b"row3".to_vec()]);
    }

    #[test]
    fn s2_max_versions_limits_emitted_versions_per_column() {
        let cells = vec![put("row1", "a", 30, "v3"), put("row1", "a", 20, "v2"), put("row1", "a", 10, "v1")];
        let scan = ScanSpec { max_versions: 2, ..ScanSpec::full_scan() };
        let mut s = scanner(vec![cells], scan, ScanInfo::default());
        let out = drain(&mut s);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].value, b"v3".to_vec());
        assert_eq!(out[1].value, b"v2".to_vec());
    }

    #[test]
    fn s3_delete_column_shadows_older_puts_in_same_scan() {
        let cells = vec![delete_column("row1", "a", 20), put("row1", "a", 10, "old"), put("row1", "a", 30, "new")];
        let mut s = scanner(vec![cells], ScanSpec::full_scan(), ScanInfo::default());
        let out = drain(&mut s);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].value, b"new");
    }

    #[test]
    fn s4_missing_index_hint_forces_seek_past_skipped_row() {
        let cells = vec![
            put("row1", "a", 10, "a1"),
            put("row1", "b", 10, "b1"),
            put("row2", "a", 10, "a2"),
        ];
        let scan = ScanSpec { store_limit: 1, ..ScanSpec::full_scan() };
        let mut s = scanner(vec![cells], scan, ScanInfo::default());
        let out = drain(&mut s);
        let rows: Vec<_> = out.iter().map(|c| c.row.clone()).collect();
        assert_eq!(rows, vec![b"row1".to_vec(), b"row2".to_vec()]);
    }

    #[test]
    fn s5_reopen_after_flush_picks_up_newly_flushed_file() {
        let existing = vec![put("row1", "a", 10, "a1")];
        let members: Vec<Box<dyn SubScanner>> = vec![Box::new(VecSubScanner::new(existing, true))];
        let heap = MergeHeap::new(members);
        let scan = ScanSpec::full_scan();
        let scan_info = ScanInfo::default();
        let policy = UserScanPolicy::new(scan.clone(), &scan_info, "cf".into());
        let channel = new_flush_channel();
        let registry = Arc::new(Mutex::new(vec![channel.clone()]));
        let mut s = StoreScanner::new(
            scan,
            scan_info,
            "cf".into(),
            Box::new(policy),
            heap,
            Some((channel.clone(), registry)),
            false,
        );
        s.seek(&Cell::min_key(Vec::new(), "cf")).unwrap();

        let flushed_cells = vec![put("row2", "a", 10, "a2")];
        {
            let mut state = channel.lock().unwrap();
            state.flushed = true;
            state.pending_memstore = Some(flushed_cells);
        }

        let out = drain(&mut s);
        let rows: Vec<_> = out.iter().map(|c| c.row.clone()).collect();
        assert_eq!(rows, vec![b"row1".to_vec(), b"row2".to_vec()]);
    }

    #[test]
    fn s6_store_offset_skips_then_store_limit_bounds_per_row() {
        let cells = vec![
            put("row1", "a", 10, "a"),
            put("row1", "b", 10, "b"),
            put("row1", "c", 10, "c"),
        ];
        let scan = ScanSpec { store_offset: 1, store_limit: 1, ..ScanSpec::full_scan() };
        let mut s = scanner(vec![cells], scan, ScanInfo::default());
        let out = drain(&mut s);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].qualifier, b"b");
    }

    #[test]
    fn row_too_big_errors_once_running_row_bytes_cross_the_limit() {
        let cells = vec![
            put("row1", "a", 10, "aaaaaaaaaa"),
            put("row1", "b", 10, "bbbbbbbbbb"),
            put("row1", "c", 10, "cccccccccc"),
        ];
        let scan_info = ScanInfo { max_row_size_bytes: 40, ..ScanInfo::default() };
        let mut s = scanner(vec![cells], ScanSpec::full_scan(), scan_info);
        let mut out = Vec::new();
        let mut progress = ScanProgress::new();
        let err = s.next(&mut out, &mut progress).unwrap_err();
        assert!(matches!(err, ScanError::RowTooBig { .. }));
        assert_eq!(out.len(), 2, "the emitted prefix before the limit tripped stays in `out`");
    }

    #[test]
    fn reopen_after_flush_delays_closing_stale_memstore_scanner_until_shipped() {
        let existing = vec![put("row1", "a", 10, "a1")];
        let members: Vec<Box<dyn SubScanner>> = vec![Box::new(VecSubScanner::new(existing, false))];
        let heap = MergeHeap::new(members);
        let scan = ScanSpec::full_scan();
        let scan_info = ScanInfo::default();
        let policy = UserScanPolicy::new(scan.clone(), &scan_info, "cf".into());
        let channel = new_flush_channel();
        let registry = Arc::new(Mutex::new(vec![channel.clone()]));
        let mut s = StoreScanner::new(
            scan,
            scan_info,
            "cf".into(),
            Box::new(policy),
            heap,
            Some((channel.clone(), registry)),
            false,
        );
        s.seek(&Cell::min_key(Vec::new(), "cf")).unwrap();

        {
            let mut state = channel.lock().unwrap();
            state.flushed = true;
            state.pending_memstore = Some(vec![put("row2", "a", 10, "a2")]);
        }

        let mut out = Vec::new();
        let mut progress = ScanProgress::new();
        s.next(&mut out, &mut progress).unwrap();
        assert_eq!(s.delayed_close.len(), 1, "stale memstore scanner held until shipped(), not dropped immediately");
        s.shipped().unwrap();
        assert!(s.delayed_close.is_empty(), "shipped() closes everything retired by the reopen");
    }
}

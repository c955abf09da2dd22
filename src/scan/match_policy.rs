use std::collections::BTreeSet;

use crate::api::{Column, RowKey, Timestamp};
use crate::filter::FilterSet;
use crate::scan::cell::{Cell, CellType};
use crate::scan::spec::{ttl_cutoff_millis, ScanInfo, ScanSpec};

/// What `MatchPolicy::match_cell` tells the merge loop to do with the
/// current top-of-heap cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchCode {
    /// Emit the cell, then advance past it.
    Include,
    /// Emit the cell, then skip the rest of its (row, qualifier).
    IncludeAndSeekNextCol,
    /// Emit the cell, then skip the rest of its row.
    IncludeAndSeekNextRow,
    /// Drop the cell, then advance past it.
    Skip,
    /// Drop the cell, then skip the rest of its (row, qualifier).
    SeekNextCol,
    /// Drop the cell, then skip the rest of its row.
    SeekNextRow,
    /// Drop the cell; the policy wants a specific seek target rather than a
    /// plain skip-to-next-column/row (used for explicit-column scans).
    SeekUsingHint,
    /// This row is finished (e.g. `store_limit` reached); move to the next
    /// row without emitting.
    Done,
    /// The whole scan is finished (past `stop_row`).
    DoneScan,
}

/// Decides, cell by cell, what a merge scan does with the current top of
/// the heap. Implementations are stateful across a single forward pass:
/// they track the active row, the active column-family/column tombstones,
/// and per-column version counts.
pub trait MatchPolicy: Send {
    fn match_cell(&mut self, cell: &Cell) -> MatchCode;

    /// Called whenever the merge loop moves to a new row, so per-row state
    /// (tombstones, version counts, offsets) resets even if `match_cell`
    /// itself never observed a row-boundary cell (e.g. the row has no
    /// visible cells at all).
    fn reset_row(&mut self) {}

    /// The first key the scan should seek to before matching begins.
    fn start_key(&self) -> Cell;

    /// A seek target to use for `SeekUsingHint`, if the last `match_cell`
    /// call returned it.
    fn seek_hint(&self) -> Option<Cell> {
        None
    }
}

/// Core logic shared by `UserScanPolicy` and `LegacyCompactionPolicy`: both
/// walk a store in the same direction, applying column-family/column/cell
/// tombstones, version limits, TTL expiry, and an optional filter, then a
/// per-row offset/limit. They differ only in name, matching this crate's
/// three-policy vocabulary without duplicating the match logic itself.
struct StandardMatchPolicy {
    family: String,
    scan: ScanSpec,
    ttl_cutoff: i64,
    min_versions: usize,

    current_row: Option<RowKey>,
    current_qualifier: Option<Column>,
    version_count: usize,
    offset_remaining: usize,
    emitted_this_row: i64,

    family_delete: Option<(Timestamp, Option<u64>)>,
    column_delete: Option<(Timestamp, Option<u64>)>,
    cell_deletes: BTreeSet<Timestamp>,

    hint: Option<Cell>,
}

impl StandardMatchPolicy {
    fn new(scan: ScanSpec, scan_info: &ScanInfo, family: String) -> Self {
        let ttl_cutoff = ttl_cutoff_millis(scan_info);
        StandardMatchPolicy {
            family,
            offset_remaining: scan.store_offset,
            min_versions: scan_info.min_versions,
            scan,
            ttl_cutoff,
            current_row: None,
            current_qualifier: None,
            version_count: 0,
            emitted_this_row: 0,
            family_delete: None,
            column_delete: None,
            cell_deletes: BTreeSet::new(),
            hint: None,
        }
    }

    fn start_key(&self) -> Cell {
        let mut row = self.scan.start_row.clone();
        if !self.scan.start_row_inclusive {
            row.push(0);
        }
        Cell::min_key(row, &self.family)
    }

    fn begin_row(&mut self, row: &RowKey) {
        self.current_row = Some(row.clone());
        self.current_qualifier = None;
        self.version_count = 0;
        self.offset_remaining = self.scan.store_offset;
        self.emitted_this_row = 0;
        self.family_delete = None;
        self.column_delete = None;
        self.cell_deletes.clear();
    }

    fn begin_column(&mut self, qualifier: &Column) {
        self.current_qualifier = Some(qualifier.clone());
        self.version_count = 0;
        self.column_delete = None;
        self.cell_deletes.clear();
    }

    fn past_stop(&self, row: &RowKey) -> bool {
        match &self.scan.stop_row {
            None => false,
            Some(stop) => {
                if self.scan.stop_row_inclusive {
                    row.as_slice() > stop.as_slice()
                } else {
                    row.as_slice() >= stop.as_slice()
                }
            }
        }
    }

    fn is_expired(&self, cell: &Cell) -> bool {
        if self.min_versions > 0 {
            return false;
        }
        self.ttl_cutoff > i64::MIN && (cell.timestamp as i64) < self.ttl_cutoff
    }

    fn match_cell(&mut self, cell: &Cell) -> MatchCode {
        self.hint = None;

        if self.past_stop(&cell.row) {
            return MatchCode::DoneScan;
        }

        if self.current_row.as_ref() != Some(&cell.row) {
            self.begin_row(&cell.row);
        }
        if self.current_qualifier.as_ref() != Some(&cell.qualifier) {
            self.begin_column(&cell.qualifier);
        }

        if self.scan.raw {
            return self.emit_or_stop(cell);
        }

        match cell.cell_type {
            CellType::DeleteFamily => {
                // `Skip` (unlike `SeekNextCol`) doesn't jump past the rest of the
                // row, so every DeleteFamily tombstone for this row is visited in
                // descending-timestamp order; only the first (newest) one counts.
                self.family_delete.get_or_insert((cell.timestamp, cell.delete_ttl));
                return MatchCode::Skip;
            }
            CellType::DeleteColumn => {
                self.column_delete = Some((cell.timestamp, cell.delete_ttl));
                return MatchCode::SeekNextCol;
            }
            CellType::DeleteCell => {
                self.cell_deletes.insert(cell.timestamp);
                return MatchCode::Skip;
            }
            CellType::Put => {}
        }

        if let Some((ts, ttl)) = self.family_delete {
            if cell.timestamp <= ts && !Self::tombstone_expired(ts, ttl) {
                return MatchCode::Skip;
            }
        }
        if let Some((ts, ttl)) = self.column_delete {
            if cell.timestamp <= ts && !Self::tombstone_expired(ts, ttl) {
                return MatchCode::SeekNextCol;
            }
        }
        if self.cell_deletes.contains(&cell.timestamp) {
            return MatchCode::Skip;
        }

        if self.is_expired(cell) {
            return MatchCode::Skip;
        }

        if let Some(columns) = &self.scan.columns {
            if !columns.contains(&cell.qualifier) {
                self.hint = Some(Cell {
                    row: cell.row.clone(),
                    family: cell.family.clone(),
                    qualifier: cell.qualifier.clone(),
                    timestamp: Timestamp::MAX,
                    cell_type: CellType::DeleteFamily,
                    value: Vec::new(),
                    delete_ttl: None,
                });
                return MatchCode::SeekUsingHint;
            }
        }

        if let Some(filter) = &self.scan.filter {
            if !filter.column_passes(&cell.qualifier, cell.timestamp, &cell.value) {
                return MatchCode::Skip;
            }
        }

        self.version_count += 1;
        if self.version_count > self.scan.max_versions {
            return MatchCode::SeekNextCol;
        }

        self.emit_or_stop(cell)
    }

    fn tombstone_expired(ts: Timestamp, ttl: Option<u64>) -> bool {
        match ttl {
            None => false,
            Some(ttl_ms) => {
                let now = chrono::Utc::now().timestamp_millis() as u64;
                ts + ttl_ms <= now
            }
        }
    }

    fn emit_or_stop(&mut self, _cell: &Cell) -> MatchCode {
        if self.offset_remaining > 0 {
            self.offset_remaining -= 1;
            return MatchCode::Skip;
        }
        if self.scan.store_limit >= 0 && self.emitted_this_row >= self.scan.store_limit {
            return MatchCode::Done;
        }
        self.emitted_this_row += 1;
        if self.version_count >= self.scan.max_versions && !self.scan.raw {
            MatchCode::IncludeAndSeekNextCol
        } else {
            MatchCode::Include
        }
    }
}

/// Drives a normal user `scan`/`get`.
pub struct UserScanPolicy {
    inner: StandardMatchPolicy,
}

impl UserScanPolicy {
    pub fn new(scan: ScanSpec, scan_info: &ScanInfo, family: String) -> Self {
        UserScanPolicy { inner: StandardMatchPolicy::new(scan, scan_info, family) }
    }

    pub fn start_key(&self) -> Cell {
        self.inner.start_key()
    }
}

impl MatchPolicy for UserScanPolicy {
    fn match_cell(&mut self, cell: &Cell) -> MatchCode {
        self.inner.match_cell(cell)
    }

    fn start_key(&self) -> Cell {
        self.inner.start_key()
    }

    fn seek_hint(&self) -> Option<Cell> {
        self.inner.hint.clone()
    }
}

/// Matches the behavior the old in-place compaction filter used for
/// compactions that don't request the extra version/age/tombstone cleanup
/// `CompactionOptions` exposes: same shadowing rules as a user scan, with
/// `raw = true` semantics disabled so deletes still act as tombstones, but
/// without per-row limits or an externally supplied filter.
pub struct LegacyCompactionPolicy {
    inner: StandardMatchPolicy,
}

impl LegacyCompactionPolicy {
    pub fn new(family: String) -> Self {
        let scan = ScanSpec { raw: false, ..ScanSpec::full_scan() };
        let scan_info = ScanInfo::default();
        LegacyCompactionPolicy { inner: StandardMatchPolicy::new(scan, &scan_info, family) }
    }
}

impl MatchPolicy for LegacyCompactionPolicy {
    fn match_cell(&mut self, cell: &Cell) -> MatchCode {
        self.inner.match_cell(cell)
    }

    fn start_key(&self) -> Cell {
        self.inner.start_key()
    }
}

/// Drives `ColumnFamily::compact_with_options`. Unlike `StandardMatchPolicy`
/// this keeps *all* delete markers and versions by default, pruning only
/// what `CompactionOptions` explicitly asks for (`max_versions`,
/// `max_age_ms`, `cleanup_tombstones`) — a compaction that doesn't ask for
/// cleanup should lose nothing, including tombstones a running user scan
/// might still need to shadow a value in an uncompacted file.
///
/// No live-reader tracking exists in this engine, so `smallest_read_point`
/// is fixed at `Timestamp::MAX`: no cell is protected purely by being
/// "recent enough to matter to a concurrent scanner". See DESIGN.md.
pub struct CompactionPolicy {
    family: String,
    smallest_read_point: Timestamp,
    cleanup_tombstones: bool,
    max_versions: Option<usize>,
    max_age_ms: Option<u64>,
    drop_deletes_range: Option<(RowKey, RowKey)>,

    current_row: Option<RowKey>,
    current_qualifier: Option<Column>,
    version_count: usize,
    seen_put_for_column: bool,
}

impl CompactionPolicy {
    pub fn new(
        smallest_read_point: Timestamp,
        cleanup_tombstones: bool,
        max_versions: Option<usize>,
        max_age_ms: Option<u64>,
        drop_deletes_range: Option<(RowKey, RowKey)>,
    ) -> Self {
        CompactionPolicy {
            family: String::new(),
            smallest_read_point,
            cleanup_tombstones,
            max_versions,
            max_age_ms,
            drop_deletes_range,
            current_row: None,
            current_qualifier: None,
            version_count: 0,
            seen_put_for_column: false,
        }
    }

    fn in_drop_range(&self, row: &RowKey) -> bool {
        match &self.drop_deletes_range {
            None => true,
            Some((lo, hi)) => row.as_slice() >= lo.as_slice() && row.as_slice() < hi.as_slice(),
        }
    }
}

impl MatchPolicy for CompactionPolicy {
    fn match_cell(&mut self, cell: &Cell) -> MatchCode {
        if self.current_row.as_ref() != Some(&cell.row) {
            self.current_row = Some(cell.row.clone());
            self.current_qualifier = None;
        }
        if self.current_qualifier.as_ref() != Some(&cell.qualifier) {
            self.current_qualifier = Some(cell.qualifier.clone());
            self.version_count = 0;
            self.seen_put_for_column = false;
        }

        if (cell.timestamp as i64) >= self.smallest_read_point as i64 {
            return MatchCode::Include;
        }

        let now = chrono::Utc::now().timestamp_millis() as u64;

        if cell.is_delete() {
            if !self.cleanup_tombstones || !self.in_drop_range(&cell.row) {
                return MatchCode::Include;
            }
            let drop = match cell.delete_ttl {
                Some(ttl_ms) => cell.timestamp + ttl_ms <= now,
                None => self.seen_put_for_column,
            };
            return if drop { MatchCode::Skip } else { MatchCode::Include };
        }

        self.seen_put_for_column = true;
        self.version_count += 1;

        if let Some(max) = self.max_versions {
            if self.version_count > max {
                return MatchCode::SeekNextCol;
            }
        }
        if let Some(max_age) = self.max_age_ms {
            if now.saturating_sub(cell.timestamp) > max_age {
                return MatchCode::Skip;
            }
        }
        MatchCode::Include
    }

    fn start_key(&self) -> Cell {
        Cell::min_key(Vec::new(), &self.family)
    }
}

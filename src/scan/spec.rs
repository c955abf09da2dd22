use std::collections::BTreeSet;

use crate::api::{Column, RowKey};
use crate::filter::FilterSet;
use crate::scan::error::ScanError;

/// Whether the underlying file scanners should be opened for random
/// (`Pread`) or sequential (`Stream`) access. `Default` lets
/// `StoreScanner` decide for itself, switching to `Stream` once it has
/// read past `ScanInfo::pread_max_bytes` for this scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadType {
    Default,
    Pread,
    Stream,
}

/// A single scan or get request, translated into the merge loop's terms.
#[derive(Debug, Clone)]
pub struct ScanSpec {
    pub start_row: RowKey,
    pub start_row_inclusive: bool,
    pub stop_row: Option<RowKey>,
    pub stop_row_inclusive: bool,
    pub columns: Option<BTreeSet<Column>>,
    pub filter: Option<FilterSet>,
    pub max_versions: usize,
    /// Maximum cells to return per row (after `store_offset`); `-1` means
    /// unbounded.
    pub store_limit: i64,
    pub store_offset: usize,
    /// Raw scans surface delete markers and bypass tombstone shadowing and
    /// version limiting; they may not also request explicit columns.
    pub raw: bool,
    pub read_type: ReadType,
    /// True for a point `get()` against a single row: once that row's data
    /// is exhausted (`Done`), the whole scan is done too.
    pub get: bool,
}

impl ScanSpec {
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.raw && self.columns.as_ref().is_some_and(|c| !c.is_empty()) {
            return Err(ScanError::InvalidScan(
                "raw scans cannot also specify explicit columns".into(),
            ));
        }
        if let Some(stop) = &self.stop_row {
            if stop.as_slice() < self.start_row.as_slice() {
                return Err(ScanError::InvalidScan("stop row precedes start row".into()));
            }
        }
        Ok(())
    }

    /// A scan with no row or column bounds, used to drive compaction over
    /// an entire store.
    pub fn full_scan() -> Self {
        ScanSpec {
            start_row: Vec::new(),
            start_row_inclusive: true,
            stop_row: None,
            stop_row_inclusive: false,
            columns: None,
            filter: None,
            max_versions: usize::MAX,
            store_limit: -1,
            store_offset: 0,
            raw: true,
            read_type: ReadType::Default,
            get: false,
        }
    }
}

/// Per-column-family scan tunables. Constructed with `Default` and
/// overridable by whoever opens the `ColumnFamily` — there is no external
/// config file format in this crate; everything is a constructor argument.
#[derive(Debug, Clone)]
pub struct ScanInfo {
    /// Cell time-to-live; cells older than `now - ttl_ms` are invisible to
    /// user scans unless `min_versions` protects them. `None` disables TTL
    /// expiry entirely.
    pub ttl_ms: Option<u64>,
    /// Minimum versions to keep regardless of TTL.
    pub min_versions: usize,
    pub max_row_size_bytes: u64,
    /// How many cells between heartbeat time-limit checks.
    pub heartbeat_cells: u64,
    /// Bytes read before a pread-mode scan switches its file scanners to
    /// stream mode.
    pub pread_max_bytes: u64,
    pub parallel_seek_enabled: bool,
    pub lazy_seek_enabled: bool,
    /// Cells per simulated index block in `FileSubScanner`, standing in for
    /// a real sparse block index.
    pub block_size_cells: usize,
}

impl Default for ScanInfo {
    fn default() -> Self {
        ScanInfo {
            ttl_ms: None,
            min_versions: 0,
            max_row_size_bytes: 32 * 1024 * 1024,
            heartbeat_cells: 10_000,
            pread_max_bytes: 4 * 128 * 1024,
            parallel_seek_enabled: false,
            lazy_seek_enabled: true,
            block_size_cells: 64,
        }
    }
}

pub fn ttl_cutoff_millis(scan_info: &ScanInfo) -> i64 {
    if scan_info.min_versions > 0 {
        return i64::MIN;
    }
    match scan_info.ttl_ms {
        None => i64::MIN,
        Some(ttl) => chrono::Utc::now().timestamp_millis() - ttl as i64,
    }
}

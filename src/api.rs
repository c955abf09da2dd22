use std::{
    collections::{BTreeMap, BTreeSet},
    fs, io,
    io::Result as IoResult,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};
use serde::{Deserialize, Serialize};

use crate::memstore::{MemStore, WalEntry};
use crate::storage::{SSTable, SSTableReader};
use crate::filter::{Filter, FilterSet};
use crate::aggregation::{AggregationSet, AggregationResult};
use crate::scan::cell::{store_cmp, Cell, CellType};
use crate::scan::error::ScanError;
use crate::scan::file_scanner::FileSubScanner;
use crate::scan::flush::{new_flush_channel, FlushChannel};
use crate::scan::heap::MergeHeap;
use crate::scan::match_policy::{CompactionPolicy, UserScanPolicy};
use crate::scan::mem_scanner::MemSubScanner;
use crate::scan::progress::{NextState, ScanProgress};
use crate::scan::selector::SubScannerSelector;
use crate::scan::spec::{ttl_cutoff_millis, ReadType, ScanInfo, ScanSpec};
use crate::scan::store_scanner::StoreScanner;
use crate::scan::sub_scanner::SubScanner;

pub type RowKey = Vec<u8>;
pub type Column = Vec<u8>;
pub type Timestamp = u64;

/// A cell is either a Put (with actual bytes) or one of three delete
/// markers, each with an optional TTL (time-to-live in milliseconds) after
/// which the tombstone itself can be removed during compaction.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    /// Put operation with data bytes
    Put(Vec<u8>),
    /// Shadows every column of the row at or before this tombstone's timestamp.
    DeleteFamily(Option<u64>),
    /// Shadows every earlier version of this (row, column) at or before this
    /// tombstone's timestamp. This is what `delete`/`delete_with_ttl` write.
    DeleteColumn(Option<u64>),
    /// Shadows exactly the (row, column, timestamp) it names.
    DeleteCell(Option<u64>),
}

impl CellValue {
    pub fn is_delete(&self) -> bool {
        !matches!(self, CellValue::Put(_))
    }
}

/// Compaction type: minor (merge some SSTables) or major (merge all SSTables)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactionType {
    /// Minor compaction: merge a subset of SSTables
    Minor,
    /// Major compaction: merge all SSTables
    Major,
}

/// Compaction options for controlling the compaction process
#[derive(Debug, Clone)]
pub struct CompactionOptions {
    /// Type of compaction to perform
    pub compaction_type: CompactionType,
    /// Maximum number of versions to keep per cell
    pub max_versions: Option<usize>,
    /// Maximum age of versions to keep (in milliseconds)
    pub max_age_ms: Option<u64>,
    /// Whether to clean up expired tombstones
    pub cleanup_tombstones: bool,
    /// Row range `[from, to)` within which tombstones may be dropped
    /// outright even if `cleanup_tombstones` would otherwise keep them
    /// (e.g. because they carry no TTL). `None` applies no such range.
    pub drop_deletes_range: Option<(RowKey, RowKey)>,
}

impl Default for CompactionOptions {
    fn default() -> Self {
        CompactionOptions {
            compaction_type: CompactionType::Minor,
            max_versions: None,
            max_age_ms: None,
            cleanup_tombstones: true,
            drop_deletes_range: None,
        }
    }
}

/// Lexicographically‐ordered key for each versioned cell: (row, column, timestamp).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EntryKey {
    pub row: RowKey,
    pub column: Column,
    pub timestamp: Timestamp,
}

/// An Entry couples an EntryKey with a CellValue (Put or Delete).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Entry {
    pub key: EntryKey,
    pub value: CellValue,
}

/// A single ColumnFamily inside a Table, with MVCC support and version filtering.
///
/// - *MemStore*: in‐memory BTreeMap + WAL (append‐only).
/// - *SSTables*: on‐disk files (immutable, each is a sorted list of (EntryKey, CellValue)).
/// - *Compaction*: runs periodically to merge SSTables (we keep all versions in compaction).
/// - *MVCC reads*: get_versions(...) and scan_row_versions(...) let you fetch multiple versions.
#[derive(Clone)]
pub struct ColumnFamily {
    name: String,
    path: PathBuf,
    memstore: Arc<Mutex<MemStore>>,
    sst_files: Arc<Mutex<Vec<PathBuf>>>,
    scan_info: ScanInfo,
    flush_observers: Arc<Mutex<Vec<FlushChannel>>>,
}

impl ColumnFamily {
    /// Open (or create) a column family at table_path/colfam_name.
    ///
    /// Spawns a background thread that runs compact() every 60 seconds.
    pub fn open(table_path: &Path, colfam_name: &str) -> IoResult<Self> {
        let cf_path = table_path.join(colfam_name);
        fs::create_dir_all(&cf_path)?;

        let mem = MemStore::open(&cf_path.join("wal.log"))?;

        let mut sst_files = Vec::new();
        for entry in fs::read_dir(&cf_path)? {
            let e = entry?;
            if let Some(ext) = e.path().extension() {
                if ext == "sst" {
                    sst_files.push(e.path());
                }
            }
        }
        sst_files.sort();

        let cf = ColumnFamily {
            name: colfam_name.to_string(),
            path: cf_path.clone(),
            memstore: Arc::new(Mutex::new(mem)),
            sst_files: Arc::new(Mutex::new(sst_files)),
            scan_info: ScanInfo::default(),
            flush_observers: Arc::new(Mutex::new(Vec::new())),
        };

        {
            let cf_clone = cf.clone();
            thread::spawn(move || {
                loop {
                    thread::sleep(Duration::from_secs(60));
                    if let Err(err) = cf_clone.compact() {
                        eprintln!(
                            "[ColumnFamily::compact] error in CF '{}': {:?}",
                            cf_clone.name, err
                        );
                    }
                }
            });
        }

        Ok(cf)
    }

    /// Override this column family's scan tunables (TTL, heartbeat interval,
    /// pread/stream switch threshold, ...). Intended to be called right
    /// after `open`, before any scanner has been opened.
    pub fn with_scan_info(mut self, scan_info: ScanInfo) -> Self {
        self.scan_info = scan_info;
        self
    }

    /// Write a new versioned cell (row, column) = value with a fresh timestamp.
    pub fn put(&self, row: RowKey, column: Column, value: Vec<u8>) -> IoResult<()> {
        let ts = chrono::Utc::now().timestamp_millis() as u64;
        let entry = Entry {
            key: EntryKey { row, column, timestamp: ts },
            value: CellValue::Put(value),
        };
        let mut ms = self.memstore.lock().unwrap();
        ms.append(entry)?;
        if ms.len() > 10_000 {
            drop(ms);
            self.flush()?;
        }
        Ok(())
    }

    /// Mark (row, column) as deleted by writing a tombstone at the current timestamp.
    /// The tombstone will never expire (no TTL).
    pub fn delete(&self, row: RowKey, column: Column) -> IoResult<()> {
        self.delete_with_ttl(row, column, None)
    }

    /// Mark (row, column) as deleted by writing a tombstone with a specified TTL.
    /// After the TTL expires, the tombstone can be removed during compaction.
    /// 
    /// # Arguments
    /// * `row` - The row key
    /// * `column` - The column name
    /// * `ttl_ms` - Optional TTL in milliseconds. If None, the tombstone never expires.
    pub fn delete_with_ttl(&self, row: RowKey, column: Column, ttl_ms: Option<u64>) -> IoResult<()> {
        let ts = chrono::Utc::now().timestamp_millis() as u64;
        let entry = Entry {
            key: EntryKey { row, column, timestamp: ts },
            value: CellValue::DeleteColumn(ttl_ms),
        };
        let mut ms = self.memstore.lock().unwrap();
        ms.append(entry)?;
        if ms.len() > 10_000 {
            drop(ms);
            self.flush()?;
        }
        Ok(())
    }

    /// Mark every column of `row` as deleted as of now, never expiring.
    pub fn delete_family(&self, row: RowKey) -> IoResult<()> {
        self.delete_family_with_ttl(row, None)
    }

    /// Mark every column of `row` as deleted as of now, with an optional TTL
    /// after which the family tombstone itself may be cleaned up.
    pub fn delete_family_with_ttl(&self, row: RowKey, ttl_ms: Option<u64>) -> IoResult<()> {
        let ts = chrono::Utc::now().timestamp_millis() as u64;
        let entry = Entry {
            // Empty column sorts first within the row, so the family
            // tombstone is always seen before any of the row's real columns
            // when entries are iterated in key order.
            key: EntryKey { row, column: Vec::new(), timestamp: ts },
            value: CellValue::DeleteFamily(ttl_ms),
        };
        let mut ms = self.memstore.lock().unwrap();
        ms.append(entry)?;
        if ms.len() > 10_000 {
            drop(ms);
            self.flush()?;
        }
        Ok(())
    }

    /// Shadow exactly the version of (row, column) written at `timestamp`,
    /// leaving other versions of that column untouched.
    pub fn delete_exact_version(&self, row: RowKey, column: Column, timestamp: Timestamp) -> IoResult<()> {
        let entry = Entry {
            key: EntryKey { row, column, timestamp },
            value: CellValue::DeleteCell(None),
        };
        let mut ms = self.memstore.lock().unwrap();
        ms.append(entry)?;
        if ms.len() > 10_000 {
            drop(ms);
            self.flush()?;
        }
        Ok(())
    }

    /// Build a single-column, single-row `ScanSpec` for `get`/`get_versions`:
    /// a row range of exactly `row`, restricted to `column` when given.
    fn point_scan(row: &[u8], column: Option<&[u8]>, max_versions: usize, get: bool) -> ScanSpec {
        ScanSpec {
            start_row: row.to_vec(),
            start_row_inclusive: true,
            stop_row: Some(row.to_vec()),
            stop_row_inclusive: true,
            columns: column.map(|c| BTreeSet::from([c.to_vec()])),
            filter: None,
            max_versions,
            store_limit: -1,
            store_offset: 0,
            raw: false,
            read_type: ReadType::Default,
            get,
        }
    }

    /// Drive `scanner` to exhaustion through the `next`/`shipped` protocol
    /// real callers use, collecting every emitted cell.
    fn drain_scan(scanner: &mut StoreScanner) -> Result<Vec<Cell>, ScanError> {
        let mut out = Vec::new();
        let mut progress = ScanProgress::new();
        loop {
            let state = scanner.next(&mut out, &mut progress)?;
            scanner.shipped()?;
            if state == NextState::NoMoreValues {
                break;
            }
        }
        Ok(out)
    }

    /// *Get* the single latest value for (row, column).
    /// If the latest version is a tombstone, returns Ok(None).
    /// Otherwise returns Ok(Some(value_bytes)).
    pub fn get(&self, row: &[u8], column: &[u8]) -> IoResult<Option<Vec<u8>>> {
        let scan = Self::point_scan(row, Some(column), 1, true);
        let mut scanner = self.open_user_scanner(scan).map_err(io::Error::from)?;
        let cells = Self::drain_scan(&mut scanner).map_err(io::Error::from)?;
        scanner.close();
        Ok(cells.into_iter().find_map(|c| match c.cell_type {
            CellType::Put => Some(c.value),
            _ => None,
        }))
    }

    /// *MVCC read*: return up to max_versions recent (timestamp, value) for (row, column).
    /// - Versions are sorted descending by timestamp.
    /// - Tombstone versions (CellValue::Delete) are skipped entirely.
    pub fn get_versions(
        &self,
        row: &[u8],
        column: &[u8],
        max_versions: usize,
    ) -> IoResult<Vec<(Timestamp, Vec<u8>)>> {
        let scan = Self::point_scan(row, Some(column), max_versions, false);
        let mut scanner = self.open_user_scanner(scan).map_err(io::Error::from)?;
        let cells = Self::drain_scan(&mut scanner).map_err(io::Error::from)?;
        scanner.close();

        let result = cells
            .into_iter()
            .filter_map(|c| match c.cell_type {
                CellType::Put => Some((c.timestamp, c.value)),
                _ => None,
            })
            .take(max_versions)
            .collect();

        Ok(result)
    }

    /// *MVCC scan*: for each column under row, return up to max_versions_per_column recent (timestamp, value).
    /// - Tombstone versions are skipped.
    /// - If a column has fewer than max_versions_per_column puts, you get as many as exist.
    pub fn scan_row_versions(
        &self,
        row: &[u8],
        max_versions_per_column: usize,
    ) -> IoResult<BTreeMap<Column, Vec<(Timestamp, Vec<u8>)>>> {
        let scan = Self::point_scan(row, None, max_versions_per_column, false);
        let mut scanner = self.open_user_scanner(scan).map_err(io::Error::from)?;
        let cells = Self::drain_scan(&mut scanner).map_err(io::Error::from)?;
        scanner.close();

        let mut per_column: BTreeMap<Column, Vec<(Timestamp, Vec<u8>)>> = BTreeMap::new();
        for cell in cells {
            if let CellType::Put = cell.cell_type {
                per_column.entry(cell.qualifier).or_default().push((cell.timestamp, cell.value));
            }
        }
        Ok(per_column)
    }

    /// Flush the MemStore into a new SSTable file, then clear the MemStore + WAL.
    pub fn flush(&self) -> IoResult<()> {
        let mut ms = self.memstore.lock().unwrap();
        if ms.is_empty() {
            return Ok(());
        }

        let sst_seq = {
            let existing = self.sst_files.lock().unwrap();
            existing.len() + 1
        };
        let sst_name = format!("{:010}.sst", sst_seq as u64);
        let sst_path = self.path.join(&sst_name);

        let entries = ms.drain_all()?;
        SSTable::create(&sst_path, &entries)?;

        self.sst_files.lock().unwrap().push(sst_path);
        Ok(())
    }


    /// *Compact* all on-disk SSTables into one, preserving all versions (no dropping).
    /// After merging, the old SSTables are deleted, and replaced by a single new .sst.
    /// 
    /// This is a convenience method that calls compact_with_options with default options.
    pub fn compact(&self) -> IoResult<()> {
        self.compact_with_options(CompactionOptions::default())
    }

    /// Run a major compaction that merges all SSTables into one.
    /// This is more aggressive than the default compact() method, which only does minor compaction.
    pub fn major_compact(&self) -> IoResult<()> {
        let mut options = CompactionOptions::default();
        options.compaction_type = CompactionType::Major;
        self.compact_with_options(options)
    }

    /// Run a compaction with version cleanup, keeping only the specified number of versions.
    /// 
    /// # Arguments
    /// * `max_versions` - Maximum number of versions to keep per cell
    pub fn compact_with_max_versions(&self, max_versions: usize) -> IoResult<()> {
        let mut options = CompactionOptions::default();
        options.max_versions = Some(max_versions);
        self.compact_with_options(options)
    }

    /// Run a compaction with age-based cleanup, removing versions older than the specified age.
    /// 
    /// # Arguments
    /// * `max_age_ms` - Maximum age of versions to keep (in milliseconds)
    pub fn compact_with_max_age(&self, max_age_ms: u64) -> IoResult<()> {
        let mut options = CompactionOptions::default();
        options.max_age_ms = Some(max_age_ms);
        self.compact_with_options(options)
    }

    /// Get a value with a filter applied
    /// 
    /// # Arguments
    /// * `row` - The row key
    /// * `column` - The column name
    /// * `filter` - The filter to apply to the value
    pub fn get_with_filter(&self, row: &[u8], column: &[u8], filter: &Filter) -> IoResult<Option<Vec<u8>>> {
        let value = self.get(row, column)?;

        if let Some(data) = value {
            if filter.matches(&data) {
                Ok(Some(data))
            } else {
                Ok(None)
            }
        } else {
            Ok(None)
        }
    }

    /// Scan a row with a filter set applied
    /// 
    /// # Arguments
    /// * `row` - The row key
    /// * `filter_set` - The filter set to apply
    pub fn scan_row_with_filter(
        &self,
        row: &[u8],
        filter_set: &FilterSet,
    ) -> IoResult<BTreeMap<Column, Vec<(Timestamp, Vec<u8>)>>> {
        let max_versions = filter_set.max_versions.unwrap_or(usize::MAX);
        let mut result = self.scan_row_versions(row, max_versions)?;

        if !filter_set.column_filters.is_empty() {
            let filter_columns: Vec<Vec<u8>> = filter_set.column_filters
                .iter()
                .map(|cf| cf.column.clone())
                .collect();

            result.retain(|column, _| filter_columns.contains(column));
        }

        for column_filter in &filter_set.column_filters {
            if let Some(versions) = result.get_mut(&column_filter.column) {
                let filtered_versions: Vec<(Timestamp, Vec<u8>)> = versions
                    .iter()
                    .filter(|(ts, value)| {
                        filter_set.timestamp_matches(*ts) && column_filter.filter.matches(value)
                    })
                    .cloned()
                    .collect();

                if filtered_versions.is_empty() {
                    result.remove(&column_filter.column);
                } else {
                    *versions = filtered_versions;
                }
            }
        }

        Ok(result)
    }

    /// Scan multiple rows with a filter set applied
    /// 
    /// # Arguments
    /// * `start_row` - The starting row key (inclusive)
    /// * `end_row` - The ending row key (inclusive)
    /// * `filter_set` - The filter set to apply
    pub fn scan_with_filter(
        &self,
        start_row: &[u8],
        end_row: &[u8],
        filter_set: &FilterSet,
    ) -> IoResult<BTreeMap<RowKey, BTreeMap<Column, Vec<(Timestamp, Vec<u8>)>>>> {
        let mut result = BTreeMap::new();

        let mut row_keys = self.get_row_keys_in_range(start_row, end_row)?;

        for row_key in row_keys {
            let row_result = self.scan_row_with_filter(&row_key, filter_set)?;
            if !row_result.is_empty() {
                result.insert(row_key, row_result);
            }
        }

        Ok(result)
    }

    /// Helper method to get all row keys in a range
    fn get_row_keys_in_range(&self, start_row: &[u8], end_row: &[u8]) -> IoResult<Vec<RowKey>> {
        let mut row_keys = BTreeMap::new();

        {
            let ms = self.memstore.lock().unwrap();
            let keys = ms.get_row_keys_in_range(start_row, end_row);
            for row_key in keys {
                row_keys.insert(row_key, ());
            }
        }

        let sst_list = self.sst_files.lock().unwrap();
        for sst_path in sst_list.iter() {
            let mut reader = SSTableReader::open(sst_path)?;
            for row_key in reader.get_row_keys_in_range(start_row, end_row)? {
                row_keys.insert(row_key, ());
            }
        }

        Ok(row_keys.into_keys().collect())
    }

    /// Perform aggregations on query results
    /// 
    /// # Arguments
    /// * `row` - The row key
    /// * `filter_set` - Optional filter set to apply before aggregation
    /// * `aggregation_set` - The aggregations to perform
    pub fn aggregate(
        &self,
        row: &[u8],
        filter_set: Option<&FilterSet>,
        aggregation_set: &AggregationSet,
    ) -> IoResult<BTreeMap<Column, AggregationResult>> {
        let data = if let Some(fs) = filter_set {
            self.scan_row_with_filter(row, fs)?
        } else {
            self.scan_row_versions(row, usize::MAX)?
        };

        Ok(aggregation_set.apply(&data))
    }

    /// Perform aggregations on multiple rows
    /// 
    /// # Arguments
    /// * `start_row` - The starting row key (inclusive)
    /// * `end_row` - The ending row key (inclusive)
    /// * `filter_set` - Optional filter set to apply before aggregation
    /// * `aggregation_set` - The aggregations to perform
    pub fn aggregate_range(
        &self,
        start_row: &[u8],
        end_row: &[u8],
        filter_set: Option<&FilterSet>,
        aggregation_set: &AggregationSet,
    ) -> IoResult<BTreeMap<RowKey, BTreeMap<Column, AggregationResult>>> {
        let mut result = BTreeMap::new();

        let row_keys = self.get_row_keys_in_range(start_row, end_row)?;

        for row_key in row_keys {
            let row_result = self.aggregate(&row_key, filter_set, aggregation_set)?;
            if !row_result.is_empty() {
                result.insert(row_key, row_result);
            }
        }

        Ok(result)
    }

    /// *Compact* SSTables with the specified options.
    ///
    /// Drives a `StoreScanner` wired up with a `CompactionPolicy` over the
    /// tables being merged, rather than hand-filtering a flat `Vec<Entry>`:
    /// the policy applies the same version/age/tombstone rules the old
    /// fold-based implementation did, but as a streaming merge that the
    /// rest of this crate's scan machinery can also drive (parallel seeks,
    /// seek-vs-skip optimization, and so on).
    ///
    /// # Arguments
    /// * `options` - Options controlling the compaction process
    pub fn compact_with_options(&self, options: CompactionOptions) -> IoResult<()> {
        let current_paths = {
            let guard = self.sst_files.lock().unwrap();
            guard.clone()
        };

        if current_paths.len() <= 1 && options.compaction_type == CompactionType::Minor {
            return Ok(());
        }

        let mut max_seq: u64 = 0;
        for path in current_paths.iter() {
            if let Some(fname) = path.file_name().and_then(|os| os.to_str()) {
                if let Some(stripped) = fname.strip_suffix(".sst") {
                    if let Ok(seq) = stripped.parse::<u64>() {
                        max_seq = max_seq.max(seq);
                    }
                }
            }
        }
        let new_seq = max_seq + 1;
        let new_fname = format!("{:010}.sst", new_seq);
        let new_sst_path = self.path.join(&new_fname);

        let tables_to_compact = match options.compaction_type {
            CompactionType::Major => current_paths.clone(),
            CompactionType::Minor => {
                let mut tables = current_paths.clone();
                tables.sort();
                let count = (tables.len() / 2).max(2).min(tables.len());
                tables[0..count].to_vec()
            }
        };

        if tables_to_compact.is_empty() {
            return Ok(());
        }

        let mut scanner = self
            .open_compaction_scanner(&tables_to_compact, &options)
            .map_err(io::Error::from)?;

        let mut merged: Vec<Entry> = Vec::new();
        let mut progress = crate::scan::progress::ScanProgress::new();
        loop {
            let mut batch = Vec::new();
            let state = scanner.next(&mut batch, &mut progress).map_err(io::Error::from)?;
            merged.extend(batch.into_iter().map(cell_to_entry));
            scanner.shipped().map_err(io::Error::from)?;
            if state == crate::scan::progress::NextState::NoMoreValues {
                break;
            }
        }
        scanner.close();

        SSTable::create(&new_sst_path, &merged)?;

        let mut list_guard = self.sst_files.lock().unwrap();

        // Remove old SSTable files using iterators
        tables_to_compact.iter().for_each(|old_path| {
            let _ = std::fs::remove_file(old_path);
        });

        if options.compaction_type == CompactionType::Major {
            *list_guard = vec![new_sst_path];
        } else {
            list_guard.retain(|path| !tables_to_compact.contains(path));
            list_guard.push(new_sst_path);
            list_guard.sort();
        }

        Ok(())
    }

    /// Build a `StoreScanner` over exactly `paths`, driven by a
    /// `CompactionPolicy`. This engine has no live-scanner read-point
    /// tracking, so `smallest_read_point` is conservatively `Timestamp::MAX`
    /// — no cell is protected purely by recency; cleanup is governed
    /// entirely by `options` (see DESIGN.md).
    fn open_compaction_scanner(
        &self,
        paths: &[PathBuf],
        options: &CompactionOptions,
    ) -> Result<StoreScanner, ScanError> {
        let mut candidates: Vec<Box<dyn SubScanner>> = Vec::new();
        for path in paths {
            candidates.push(Box::new(FileSubScanner::open(path, &self.name, self.scan_info.block_size_cells)?));
        }
        let scan = ScanSpec::full_scan();
        let mut candidates = SubScannerSelector::select(candidates, &scan, i64::MIN);
        let start = Cell::min_key(Vec::new(), &self.name);
        for c in candidates.iter_mut() {
            c.seek(&start)?;
        }
        let policy = CompactionPolicy::new(
            Timestamp::MAX,
            options.cleanup_tombstones,
            options.max_versions,
            options.max_age_ms,
            options.drop_deletes_range.clone(),
        );
        let heap = MergeHeap::new(candidates);
        Ok(StoreScanner::new(scan, self.scan_info.clone(), self.name.clone(), Box::new(policy), heap, None, true))
    }

    /// Open a scanner over this column family's current files and memstore,
    /// driven by a `UserScanPolicy`, merging all sources in store order.
    pub fn open_user_scanner(&self, scan: ScanSpec) -> Result<StoreScanner, ScanError> {
        scan.validate()?;
        let ttl_cutoff = ttl_cutoff_millis(&self.scan_info);

        let mut candidates: Vec<Box<dyn SubScanner>> = Vec::new();
        {
            let sst_list = self.sst_files.lock().unwrap();
            for path in sst_list.iter() {
                candidates.push(Box::new(FileSubScanner::open(path, &self.name, self.scan_info.block_size_cells)?));
            }
        }
        {
            let ms = self.memstore.lock().unwrap();
            let cells = snapshot_to_cells(ms.snapshot_all(), &self.name);
            candidates.push(Box::new(MemSubScanner::new(cells)));
        }

        let mut candidates = SubScannerSelector::select(candidates, &scan, ttl_cutoff);
        let explicit_columns = scan.columns.is_some();
        let use_parallel = self.scan_info.parallel_seek_enabled && candidates.len() > 1 && !explicit_columns;

        let policy = UserScanPolicy::new(scan.clone(), &self.scan_info, self.name.clone());
        let start_key = policy.start_key();

        if explicit_columns && self.scan_info.lazy_seek_enabled {
            for c in candidates.iter_mut() {
                c.request_seek(&start_key, true, true)?;
            }
        } else if use_parallel {
            crate::scan::parallel_seek::ParallelSeeker::seek_all(&mut candidates, &start_key)?;
        } else {
            for c in candidates.iter_mut() {
                c.seek(&start_key)?;
            }
        }

        let heap = MergeHeap::new(candidates);
        let (channel, registry) = self.register_flush_observer();
        Ok(StoreScanner::new(
            scan,
            self.scan_info.clone(),
            self.name.clone(),
            Box::new(policy),
            heap,
            Some((channel, registry)),
            false,
        ))
    }

    /// Paths of this column family's current on-disk SSTables, oldest first.
    pub fn storefiles(&self) -> Vec<PathBuf> {
        self.sst_files.lock().unwrap().clone()
    }

    pub fn storefiles_count(&self) -> usize {
        self.sst_files.lock().unwrap().len()
    }

    /// The merge order used across this column family's scanners.
    pub fn comparator(&self) -> fn(&Cell, &Cell) -> std::cmp::Ordering {
        store_cmp
    }

    fn register_flush_observer(&self) -> (FlushChannel, Arc<Mutex<Vec<FlushChannel>>>) {
        let channel = new_flush_channel();
        self.flush_observers.lock().unwrap().push(channel.clone());
        (channel, self.flush_observers.clone())
    }

    fn notify_flush(&self, new_files: Vec<PathBuf>) {
        let observers = self.flush_observers.lock().unwrap();
        for obs in observers.iter() {
            let mut state = obs.lock().unwrap();
            state.flushed = true;
            state.pending_files.extend(new_files.clone());
            state.pending_memstore = Some(Vec::new());
        }
    }
}

fn snapshot_to_cells(entries: Vec<(EntryKey, CellValue)>, family: &str) -> Vec<Cell> {
    let mut cells: Vec<Cell> = entries
        .into_iter()
        .map(|(k, v)| Cell::from_value(k.row, family, k.column, k.timestamp, &v))
        .collect();
    cells.sort_by(store_cmp);
    cells
}

fn cell_to_entry(cell: Cell) -> Entry {
    let value = match cell.cell_type {
        crate::scan::cell::CellType::Put => CellValue::Put(cell.value),
        crate::scan::cell::CellType::DeleteFamily => CellValue::DeleteFamily(cell.delete_ttl),
        crate::scan::cell::CellType::DeleteColumn => CellValue::DeleteColumn(cell.delete_ttl),
        crate::scan::cell::CellType::DeleteCell => CellValue::DeleteCell(cell.delete_ttl),
    };
    Entry {
        key: EntryKey { row: cell.row, column: cell.qualifier, timestamp: cell.timestamp },
        value,
    }
}

/// A Table is a directory containing one or more ColumnFamily subdirectories.
#[derive(Clone)]
pub struct Table {
    path: PathBuf,
    column_families: BTreeMap<String, ColumnFamily>,
}

impl Table {
    /// Open (or create) a table directory.
    pub fn open(table_dir: impl AsRef<Path>) -> IoResult<Self> {
        let tbl_path = table_dir.as_ref().to_path_buf();
        fs::create_dir_all(&tbl_path)?;
        // Process directory entries using iterators
        let mut cfs = BTreeMap::new();

        // Use try_fold to handle errors properly
        fs::read_dir(&tbl_path)?.try_for_each(|entry_result| -> IoResult<()> {
            let entry = entry_result?;
            if entry.file_type()?.is_dir() {
                let name = entry.file_name().into_string().unwrap();
                let cf = ColumnFamily::open(&tbl_path, &name)?;
                cfs.insert(name, cf);
            }
            Ok(())
        })?;

        Ok(Table {
            path: tbl_path,
            column_families: cfs,
        })
    }

    /// Create a new column family named cf_name. Fails if it already exists.
    pub fn create_cf(&mut self, cf_name: &str) -> IoResult<()> {
        if self.column_families.contains_key(cf_name) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("ColumnFamily {} already exists", cf_name),
            ));
        }
        let cf = ColumnFamily::open(&self.path, cf_name)?;
        self.column_families.insert(cf_name.to_string(), cf);
        Ok(())
    }

    /// Retrieve a handle to an existing ColumnFamily (or None if it doesn’t exist).
    pub fn cf(&self, cf_name: &str) -> Option<ColumnFamily> {
        self.column_families.get(cf_name).cloned()
    }
}

use bincode;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::{File, OpenOptions},
    io::{BufReader, Read, Result as IoResult, Seek, SeekFrom, Write},
    path::Path,
};
use crate::api::{CellValue, Entry, EntryKey, Timestamp};

/// A single WAL record: binary‐encoded Entry.
#[derive(Serialize, Deserialize, Debug)]
pub struct WalEntry(Entry);

/// MemStore holds an in‐memory BTreeMap<EntryKey, CellValue> plus an append‐only WAL file.
pub struct MemStore {
    map: BTreeMap<EntryKey, CellValue>,
    wal: File,
    wal_path: String,
}

impl MemStore {
    /// Open (or create) a WAL at wal_path and replay it to rebuild map.
    pub fn open(wal_path: impl AsRef<Path>) -> IoResult<Self> {
        let path_str = wal_path.as_ref().to_string_lossy().into_owned();
        let wal = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&wal_path)?;
        let mut store = MemStore {
            map: BTreeMap::new(),
            wal,
            wal_path: path_str.clone(),
        };

        // Replay existing WAL
        let mut reader = BufReader::new(store.wal.try_clone()?);
        loop {
            let mut len_buf = [0u8; 4];
            if reader.read_exact(&mut len_buf).is_err() {
                break;
            }
            let len = u32::from_be_bytes(len_buf) as usize;
            let mut buf = vec![0u8; len];
            reader.read_exact(&mut buf)?;
            let WalEntry(entry) = bincode::deserialize(&buf).unwrap();
            store.map.insert(entry.key, entry.value);
        }
        // Seek to end so future appends go there
        store.wal.seek(SeekFrom::End(0))?;
        Ok(store)
    }

    /// Number of entries in the in-memory map
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Append one Entry to both the WAL file (on disk) and map (in memory).
    pub fn append(&mut self, entry: Entry) -> IoResult<()> {
        let buf = bincode::serialize(&WalEntry(entry.clone())).unwrap();
        let len = (buf.len() as u32).to_be_bytes();
        self.wal.write_all(&len)?;
        self.wal.write_all(&buf)?;
        self.wal.flush()?;

        self.map.insert(entry.key, entry.value);
        Ok(())
    }

    /// Get the *latest* CellValue for (row, column) from in‐memory map (if any).
    pub fn get_full(&self, row: &[u8], column: &[u8]) -> Option<&CellValue> {
        // Range from (row, column, 0) to (row, column, u64::MAX), then take .last()
        let range_start = EntryKey {
            row: row.to_vec(),
            column: column.to_vec(),
            timestamp: 0,
        };
        let range_end = EntryKey {
            row: row.to_vec(),
            column: column.to_vec(),
            timestamp: u64::MAX,
        };
        self.map
            .range(range_start..=range_end)
            .last()
            .map(|(_k, v)| v)
    }

    /// *MVCC helper*: return all versions (timestamp + CellValue) for (row, column), sorted descending by timestamp.
    pub fn get_versions_full(&self, row: &[u8], column: &[u8]) -> Vec<(Timestamp, CellValue)> {
        let mut versions = Vec::new();
        let range_start = EntryKey {
            row: row.to_vec(),
            column: column.to_vec(),
            timestamp: 0,
        };
        let range_end = EntryKey {
            row: row.to_vec(),
            column: column.to_vec(),
            timestamp: u64::MAX,
        };
        for (k, v) in self.map.range(range_start..=range_end) {
            versions.push((k.timestamp, v.clone()));
        }
        versions.sort_by(|a, b| b.0.cmp(&a.0));
        versions
    }

    pub fn drain_all(&mut self) -> IoResult<Vec<Entry>> {
        let mut all = Vec::with_capacity(self.map.len());
        for (k, v) in self.map.iter() {
            all.push(Entry {
                key: k.clone(),
                value: v.clone(),
            });
        }
        all.sort_by(|a, b| a.key.cmp(&b.key));
        self.map.clear();

        drop(&self.wal);
        std::fs::remove_file(&self.wal_path)?;
        self.wal = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.wal_path)?;
        Ok(all)
    }

    /// For scanning: return all (EntryKey, CellValue) for a given row (in-memory).  
    /// Useful to merge with SSTables when doing versioned scans.
    pub fn scan_row_full(&self, row: &[u8]) -> Vec<(EntryKey, CellValue)> {
        let mut result = Vec::new();
        let range_start = EntryKey {
            row: row.to_vec(),
            column: vec![],
            timestamp: 0,
        };
        let range_end = EntryKey {
            row: row.to_vec(),
            column: vec![0xFF],
            timestamp: u64::MAX,
        };
        for (k, v) in self.map.range(range_start..=range_end) {
            if k.row == row {
                result.push((k.clone(), v.clone()));
            }
        }
        result
    }

    /// Scan a range of rows and return all (EntryKey, CellValue) pairs.
    /// The range is inclusive of start_row and end_row.
    pub fn scan_range(&self, start_row: &[u8], end_row: &[u8]) -> Vec<(EntryKey, CellValue)> {
        let mut result = Vec::new();

        let range_start = EntryKey {
            row: start_row.to_vec(),
            column: vec![],
            timestamp: 0,
        };
        let range_end = EntryKey {
            row: end_row.to_vec(),
            column: vec![0xFF],
            timestamp: u64::MAX,
        };

        for (k, v) in self.map.range(range_start..=range_end) {
            if k.row.as_slice() >= start_row && k.row.as_slice() <= end_row {
                result.push((k.clone(), v.clone()));
            }
        }

        result
    }

    /// *Return ALL (EntryKey, CellValue) pairs* currently held in memory, in
    /// key order. Used to build a merge-scanner source over the memstore.
    pub fn snapshot_all(&self) -> Vec<(EntryKey, CellValue)> {
        self.map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    /// Get all unique row keys in a range.
    pub fn get_row_keys_in_range(&self, start_row: &[u8], end_row: &[u8]) -> Vec<Vec<u8>> {
        let mut row_keys = std::collections::BTreeSet::new();

        for (k, _) in self.scan_range(start_row, end_row) {
            row_keys.insert(k.row);
        }

        row_keys.into_iter().collect()
    }
}

use crate::api::{Entry, EntryKey, CellValue, Column, Timestamp};
use bincode;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Result as IoResult, Write},
    path::Path,
};

/// An on-disk SSTable.
/// Format (all big-endian u32 for lengths):
///
/// 1) [u32: number_of_entries]
/// 2) For each entry:
///    a) [u32: length of serialized EntryKey]
///    b) [bytes: bincode(serialized EntryKey)]
///    c) [u32: length of serialized CellValue]
///    d) [bytes: bincode(serialized CellValue)]
pub struct SSTable;

impl SSTable {
    /// Create an SSTable at path from a sorted slice of Entry.
    pub fn create(path: impl AsRef<Path>, entries: &[Entry]) -> IoResult<()> {
        let f = File::create(path)?;
        let mut w = BufWriter::new(f);

        // 1) Write number of entries
        let count = (entries.len() as u32).to_be_bytes();
        w.write_all(&count)?;

        for entry in entries {
            // Serialize and write EntryKey
            let key_ser = bincode::serialize(&entry.key).unwrap();
            let key_len = (key_ser.len() as u32).to_be_bytes();
            w.write_all(&key_len)?;
            w.write_all(&key_ser)?;

            // Serialize and write CellValue (Put or Delete)
            let val_ser = bincode::serialize(&entry.value).unwrap();
            let val_len = (val_ser.len() as u32).to_be_bytes();
            w.write_all(&val_len)?;
            w.write_all(&val_ser)?;
        }
        w.flush()?;
        Ok(())
    }
}

/// A reader for a single SSTable. For simplicity, we load all entries into memory on open().
#[derive(Clone)]
pub struct SSTableReader {
    entries: Vec<(EntryKey, CellValue)>,
}

impl SSTableReader {
    /// Open an SSTable file, read all entries (key + CellValue) into memory.
    pub fn open(path: impl AsRef<Path>) -> IoResult<Self> {
        let f = File::open(path)?;
        let mut r = BufReader::new(f);

        // 1) Read number_of_entries
        let mut buf4 = [0u8; 4];
        r.read_exact(&mut buf4)?;
        let count = u32::from_be_bytes(buf4) as usize;

        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            // a) Read EntryKey
            r.read_exact(&mut buf4)?;
            let key_len = u32::from_be_bytes(buf4) as usize;
            let mut key_buf = vec![0u8; key_len];
            r.read_exact(&mut key_buf)?;
            let key: EntryKey = bincode::deserialize(&key_buf).unwrap();

            // b) Read CellValue
            r.read_exact(&mut buf4)?;
            let val_len = u32::from_be_bytes(buf4) as usize;
            let mut val_buf = vec![0u8; val_len];
            r.read_exact(&mut val_buf)?;
            let cell: CellValue = bincode::deserialize(&val_buf).unwrap();

            entries.push((key, cell));
        }
        Ok(SSTableReader { entries })
    }

    /// Look up the latest CellValue for (row, column) by scanning backwards.
    pub fn get_full(&mut self, row: &[u8], column: &[u8]) -> IoResult<Option<CellValue>> {
        for (key, cell) in self.entries.iter().rev() {
            if key.row.as_slice() == row && key.column.as_slice() == column {
                return Ok(Some(cell.clone()));
            }
        }
        Ok(None)
    }

    /// *MVCC helper*: return all versions (timestamp + CellValue) for (row, column), sorted descending by timestamp.
    pub fn get_versions_full(&mut self, row: &[u8], column: &[u8]) -> IoResult<Vec<(Timestamp, CellValue)>> {
        let mut versions = Vec::new();

        // Collect all entries for the given row and column
        for (key, cell) in self.entries.iter() {
            if key.row.as_slice() == row && key.column.as_slice() == column {
                versions.push((key.timestamp, cell.clone()));
            }
        }

        // Sort descending by timestamp
        versions.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(versions)
    }

    /// Scan all entries for a given row, returning (column, timestamp, CellValue) tuples.
    pub fn scan_row_full(
        &mut self,
        row: &[u8],
    ) -> IoResult<impl Iterator<Item = (Column, Timestamp, CellValue)>> {
        let mut matches = Vec::new();
        for (key, cell) in self.entries.iter() {
            if key.row.as_slice() == row {
                matches.push((key.column.clone(), key.timestamp, cell.clone()));
            }
        }
        Ok(matches.into_iter())
    }

    /// *Return ALL (EntryKey, CellValue) pairs* from this SSTable.
    /// Used by the compaction routine.
    pub fn scan_all(&self) -> IoResult<Vec<(EntryKey, CellValue)>> {
        Ok(self.entries.clone())
    }

    /// Scan a range of rows and return all entries within that range.
    /// The range is inclusive of start_row and end_row.
    pub fn scan_range(&mut self, start_row: &[u8], end_row: &[u8]) -> IoResult<Vec<(EntryKey, CellValue)>> {
        let mut result = Vec::new();

        for (key, cell) in &self.entries {
            if key.row.as_slice() >= start_row && key.row.as_slice() <= end_row {
                result.push((key.clone(), cell.clone()));
            }
        }

        Ok(result)
    }

    /// Get all unique row keys in a range.
    pub fn get_row_keys_in_range(&mut self, start_row: &[u8], end_row: &[u8]) -> IoResult<Vec<Vec<u8>>> {
        let mut row_keys = std::collections::BTreeSet::new();

        for (key, _) in self.scan_range(start_row, end_row)? {
            row_keys.insert(key.row);
        }

        Ok(row_keys.into_iter().collect())
    }
}

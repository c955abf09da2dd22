use std::cmp::Ordering;

use crate::api::{CellValue, Column, RowKey, Timestamp};

/// Mirrors `CellValue`'s tag, plus a fixed order used only to break exact
/// (row, qualifier, timestamp) ties in `store_cmp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CellType {
    DeleteFamily,
    DeleteColumn,
    DeleteCell,
    Put,
}

/// The merge loop's working unit. Built from a `(EntryKey, CellValue)` pair
/// read off a `SubScanner`; `family` is constant for a given scanner and
/// carried along mostly so synthetic seek keys can be constructed without
/// needing the owning `ColumnFamily` in scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub row: RowKey,
    pub family: String,
    pub qualifier: Column,
    pub timestamp: Timestamp,
    pub cell_type: CellType,
    pub value: Vec<u8>,
    /// TTL carried by a delete marker, if any. `None` for `Put` cells.
    pub delete_ttl: Option<u64>,
}

impl Cell {
    pub fn from_value(row: RowKey, family: &str, qualifier: Column, timestamp: Timestamp, v: &CellValue) -> Self {
        let (cell_type, value, delete_ttl) = match v {
            CellValue::Put(bytes) => (CellType::Put, bytes.clone(), None),
            CellValue::DeleteFamily(ttl) => (CellType::DeleteFamily, Vec::new(), *ttl),
            CellValue::DeleteColumn(ttl) => (CellType::DeleteColumn, Vec::new(), *ttl),
            CellValue::DeleteCell(ttl) => (CellType::DeleteCell, Vec::new(), *ttl),
        };
        Cell { row, family: family.to_string(), qualifier, timestamp, cell_type, value, delete_ttl }
    }

    pub fn is_delete(&self) -> bool {
        !matches!(self.cell_type, CellType::Put)
    }

    /// The smallest possible cell for `row` under `store_cmp`: empty
    /// qualifier sorts first, `Timestamp::MAX` sorts first under descending
    /// timestamp order, and `DeleteFamily` is the lowest type. Used as a
    /// seek target to land on the first real cell of `row` (or later).
    pub fn min_key(row: RowKey, family: &str) -> Cell {
        Cell {
            row,
            family: family.to_string(),
            qualifier: Vec::new(),
            timestamp: Timestamp::MAX,
            cell_type: CellType::DeleteFamily,
            value: Vec::new(),
            delete_ttl: None,
        }
    }

    /// The smallest possible cell belonging to the row immediately after
    /// `row` — i.e. `row` with a zero byte appended. Any real cell with
    /// `row` sorts before it; any cell with a later, distinct row sorts at
    /// or after it. Used to skip past the remainder of a row without
    /// knowing its last qualifier/timestamp.
    pub fn row_successor_key(row: RowKey, family: &str) -> Cell {
        let mut successor = row;
        successor.push(0);
        Cell::min_key(successor, family)
    }
}

/// Approximate on-wire/in-heap size of a cell, used for `ScanProgress`'s
/// size-based limits and the per-row `RowTooBig` guard.
pub fn cell_size(cell: &Cell) -> u64 {
    (cell.row.len() + cell.qualifier.len() + cell.value.len() + 16) as u64
}

/// The store comparator: row ascending, qualifier ascending, timestamp
/// descending (newest version first), then `CellType` order to break exact
/// ties deterministically.
pub fn store_cmp(a: &Cell, b: &Cell) -> Ordering {
    a.row
        .cmp(&b.row)
        .then_with(|| a.qualifier.cmp(&b.qualifier))
        .then_with(|| b.timestamp.cmp(&a.timestamp))
        .then_with(|| a.cell_type.cmp(&b.cell_type))
}

/// The lowest possible key that still sorts at or after every cell of the
/// row `cell` belongs to — i.e. the first key of the next row.
pub fn create_last_on_row(cell: &Cell) -> Cell {
    Cell::row_successor_key(cell.row.clone(), &cell.family)
}

/// The lowest possible key that still sorts at or after every remaining
/// version of `cell`'s (row, qualifier) — i.e. the first key of the next
/// qualifier in this row.
pub fn next_column_key(cell: &Cell) -> Cell {
    let mut qualifier = cell.qualifier.clone();
    qualifier.push(0);
    Cell {
        row: cell.row.clone(),
        family: cell.family.clone(),
        qualifier,
        timestamp: Timestamp::MAX,
        cell_type: CellType::DeleteFamily,
        value: Vec::new(),
        delete_ttl: None,
    }
}
